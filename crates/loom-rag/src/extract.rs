use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::error::{RagError, Result};

/// Sibling text artifact for an uploaded document: `report.pdf` -> `report.pdf.txt`.
pub fn text_artifact_path(pdf_path: &Path) -> PathBuf {
    let mut name = pdf_path.as_os_str().to_owned();
    name.push(".txt");
    PathBuf::from(name)
}

/// Join per-page text, skipping pages that produced nothing. Each kept page
/// is followed by a blank line.
pub fn join_pages<S: AsRef<str>>(pages: &[S]) -> String {
    let mut content = String::new();
    for page in pages {
        let page = page.as_ref();
        if page.trim().is_empty() {
            continue;
        }
        content.push_str(page);
        content.push_str("\n\n");
    }
    content
}

/// Extract the text of every page of `pdf_path` and write it next to the
/// source as a `.txt` artifact. Malformed documents are an error and no
/// artifact is written.
pub async fn extract_text(pdf_path: &Path) -> Result<String> {
    let bytes = tokio::fs::read(pdf_path).await?;

    let pages = tokio::task::spawn_blocking(move || {
        pdf_extract::extract_text_from_mem_by_pages(&bytes).map_err(|e| RagError::Pdf(e.to_string()))
    })
    .await??;

    debug!("Extracted {} page(s) from {}", pages.len(), pdf_path.display());
    let content = join_pages(&pages);

    let artifact = text_artifact_path(pdf_path);
    tokio::fs::write(&artifact, &content).await?;
    info!("Wrote text artifact {} ({} bytes)", artifact.display(), content.len());

    Ok(content)
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Minimal PDF with one Helvetica text line per page. An empty string
    /// gives a page with an empty content stream.
    fn pdf_with_pages(pages: &[&str]) -> Vec<u8> {
        let font_id = 3;
        let first_page_id = 4;
        let kids: Vec<String> = (0..pages.len())
            .map(|i| format!("{} 0 R", first_page_id + 2 * i))
            .collect();

        let mut objects = vec![
            "<< /Type /Catalog /Pages 2 0 R >>".to_string(),
            format!("<< /Type /Pages /Kids [{}] /Count {} >>", kids.join(" "), pages.len()),
            "<< /Type /Font /Subtype /Type1 /BaseFont /Helvetica >>".to_string(),
        ];
        for (i, text) in pages.iter().enumerate() {
            let content_id = first_page_id + 2 * i + 1;
            objects.push(format!(
                "<< /Type /Page /Parent 2 0 R /MediaBox [0 0 612 792] \
                 /Resources << /Font << /F1 {} 0 R >> >> /Contents {} 0 R >>",
                font_id, content_id
            ));
            let stream = if text.is_empty() {
                String::new()
            } else {
                format!("BT /F1 12 Tf 72 720 Td ({}) Tj ET", text)
            };
            objects.push(format!(
                "<< /Length {} >>\nstream\n{}\nendstream",
                stream.len(),
                stream
            ));
        }

        let mut out = b"%PDF-1.4\n".to_vec();
        let mut offsets = Vec::with_capacity(objects.len());
        for (i, body) in objects.iter().enumerate() {
            offsets.push(out.len());
            out.extend_from_slice(format!("{} 0 obj\n{}\nendobj\n", i + 1, body).as_bytes());
        }

        let xref_at = out.len();
        out.extend_from_slice(format!("xref\n0 {}\n0000000000 65535 f \n", objects.len() + 1).as_bytes());
        for offset in offsets {
            out.extend_from_slice(format!("{:010} 00000 n \n", offset).as_bytes());
        }
        out.extend_from_slice(
            format!(
                "trailer\n<< /Size {} /Root 1 0 R >>\nstartxref\n{}\n%%EOF\n",
                objects.len() + 1,
                xref_at
            )
            .as_bytes(),
        );
        out
    }

    #[test]
    fn artifact_sits_next_to_source() {
        assert_eq!(
            text_artifact_path(Path::new("uploads/report.pdf")),
            PathBuf::from("uploads/report.pdf.txt")
        );
        assert_eq!(
            text_artifact_path(Path::new("pdfs/pdf-guide.pdf")),
            PathBuf::from("pdfs/pdf-guide.pdf.txt")
        );
    }

    #[test]
    fn artifact_never_collides_with_a_txt_named_upload() {
        let source = Path::new("uploads/notes.txt");
        let artifact = text_artifact_path(source);
        assert_ne!(artifact, source);
        assert_eq!(artifact, PathBuf::from("uploads/notes.txt.txt"));
    }

    #[tokio::test]
    async fn pages_are_extracted_and_blank_ones_dropped() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("guide.pdf");
        std::fs::write(&path, pdf_with_pages(&["Hello first page", "", "Third page here"])).unwrap();

        let text = extract_text(&path).await.unwrap();
        let first = text.find("Hello first page").unwrap();
        let third = text.find("Third page here").unwrap();
        assert!(first < third);
        assert!(text.ends_with("\n\n"));
        let words: Vec<&str> = text.split_whitespace().collect();
        assert_eq!(words, ["Hello", "first", "page", "Third", "page", "here"]);

        let artifact = std::fs::read_to_string(text_artifact_path(&path)).unwrap();
        assert_eq!(artifact, text);
    }

    #[tokio::test]
    async fn extracting_a_txt_named_pdf_keeps_the_source() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notes.txt");
        let pdf = pdf_with_pages(&["Only page"]);
        std::fs::write(&path, &pdf).unwrap();

        extract_text(&path).await.unwrap();
        assert_eq!(std::fs::read(&path).unwrap(), pdf);
        assert!(dir.path().join("notes.txt.txt").exists());
    }

    #[test]
    fn blank_pages_are_skipped() {
        let pages = ["first page", "", "   \n", "third page"];
        assert_eq!(join_pages(&pages), "first page\n\nthird page\n\n");
    }

    #[test]
    fn no_text_yields_empty_content() {
        let pages: [&str; 2] = ["", ""];
        assert_eq!(join_pages(&pages), "");
    }

    #[tokio::test]
    async fn malformed_pdf_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.pdf");
        std::fs::write(&path, b"this is not a pdf document").unwrap();

        let result = extract_text(&path).await;
        assert!(result.is_err());
        assert!(!text_artifact_path(&path).exists());
    }

    #[tokio::test]
    async fn missing_file_is_an_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let result = extract_text(&dir.path().join("absent.pdf")).await;
        assert!(matches!(result, Err(RagError::Io(_))));
    }
}
