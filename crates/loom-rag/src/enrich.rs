//! Prompt enrichment from linked web pages.
//!
//! URLs in a prompt are fetched concurrently and the main article body
//! (`div#bodyContent`) of each page is extracted. Enrichment is best-effort:
//! failures are logged and contribute nothing.

use std::sync::LazyLock;
use std::time::Duration;

use futures_util::future::join_all;
use regex::Regex;
use scraper::{Html, Selector};
use tracing::{debug, warn};

use crate::error::Result;

static URL_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"https?://\S+").expect("Invalid regex"));

pub fn extract_urls(text: &str) -> Vec<String> {
    URL_PATTERN.find_iter(text).map(|m| m.as_str().to_string()).collect()
}

/// Text content of `div#bodyContent`, or an empty string when the page has none.
pub fn parse_inner_text(html: &str) -> String {
    let Ok(selector) = Selector::parse("div#bodyContent") else {
        return String::new();
    };
    let document = Html::parse_document(html);
    match document.select(&selector).next() {
        Some(element) => element.text().collect::<String>(),
        None => {
            warn!("Page has no bodyContent element");
            String::new()
        }
    }
}

#[derive(Clone)]
pub struct UrlEnricher {
    client: reqwest::Client,
}

impl UrlEnricher {
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { client })
    }

    async fn fetch(&self, url: &str) -> Result<String> {
        let html = self.client.get(url).send().await?.error_for_status()?.text().await?;
        Ok(parse_inner_text(&html))
    }

    /// Concatenated page text for every URL in `prompt`, space separated.
    /// Never fails; an empty string means nothing usable was found.
    pub async fn enrich(&self, prompt: &str) -> String {
        let urls = extract_urls(prompt);
        if urls.is_empty() {
            return String::new();
        }
        debug!("Fetching {} url(s) for prompt enrichment", urls.len());

        let results = join_all(urls.iter().map(|url| self.fetch(url))).await;

        let mut pages = Vec::with_capacity(results.len());
        for (url, result) in urls.iter().zip(results) {
            match result {
                Ok(text) if !text.trim().is_empty() => pages.push(text),
                Ok(_) => warn!("No content extracted from {}", url),
                Err(e) => warn!("Failed to fetch {}: {}", url, e),
            }
        }
        pages.join(" ")
    }
}
