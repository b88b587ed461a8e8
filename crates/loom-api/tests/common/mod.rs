#![allow(dead_code)]

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use axum::{
    Router,
    body::Body,
    http::{Request, Response, header},
};
use http_body_util::BodyExt;
use tempfile::TempDir;
use tower::ServiceExt;

use loom_api::auth::{AuthService, TokenIssuer};
use loom_api::middleware::UsageLog;
use loom_api::{AppContext, AppState, Settings};
use loom_db::Database;
use loom_inference::{
    AudioClip, AudioModelHandle, Generator, ImageModel, ImageModelHandle, ModelLoader, ModelRegistry, RawImage,
    RawVideo, TextModel, TextModelHandle, VideoModelHandle, VoicePreset,
};
use loom_rag::{Embedder, Ingestor, MemoryIndex, Retriever, UrlEnricher, VectorIndex};

pub const COLLECTION: &str = "knowledgebase";
pub const VECTOR_DIM: usize = 4;

/// Text model that answers with the prompt it was given.
pub struct Echo {
    pub prompts: Arc<Mutex<Vec<String>>>,
}

#[async_trait]
impl TextModelHandle for Echo {
    async fn generate(&self, prompt: &str, _temperature: f32) -> loom_inference::Result<String> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        Ok(format!("echo {}", prompt))
    }
}

struct Beep;

#[async_trait]
impl AudioModelHandle for Beep {
    async fn generate(&self, _prompt: &str, _preset: VoicePreset) -> loom_inference::Result<AudioClip> {
        Ok(AudioClip {
            samples: vec![0.0, 0.5, -0.5, 0.0],
            sample_rate: 24_000,
        })
    }
}

struct Gray;

#[async_trait]
impl ImageModelHandle for Gray {
    async fn generate(&self, _prompt: &str, width: u32, height: u32, _steps: u32) -> loom_inference::Result<RawImage> {
        RawImage::new(width, height, vec![128; (width * height * 3) as usize])
    }
}

struct Frozen;

#[async_trait]
impl VideoModelHandle for Frozen {
    async fn generate(&self, image: &RawImage, num_frames: u32) -> loom_inference::Result<RawVideo> {
        Ok(RawVideo {
            width: image.width,
            height: image.height,
            fps: 7,
            frames: vec![image.pixels.clone(); num_frames as usize],
        })
    }
}

pub struct FakeLoader {
    pub prompts: Arc<Mutex<Vec<String>>>,
}

#[async_trait]
impl ModelLoader for FakeLoader {
    async fn load_text(&self, _model: TextModel) -> loom_inference::Result<Arc<dyn TextModelHandle>> {
        Ok(Arc::new(Echo {
            prompts: self.prompts.clone(),
        }))
    }

    async fn load_audio(&self) -> loom_inference::Result<Arc<dyn AudioModelHandle>> {
        Ok(Arc::new(Beep))
    }

    async fn load_image(&self, _model: ImageModel) -> loom_inference::Result<Arc<dyn ImageModelHandle>> {
        Ok(Arc::new(Gray))
    }

    async fn load_video(&self) -> loom_inference::Result<Arc<dyn VideoModelHandle>> {
        Ok(Arc::new(Frozen))
    }
}

/// Counts the letters a, b, c and d.
pub struct LetterEmbedder;

#[async_trait]
impl Embedder for LetterEmbedder {
    async fn embed(&self, text: &str) -> loom_rag::Result<Vec<f32>> {
        let mut v = vec![0.0; VECTOR_DIM];
        for c in text.chars() {
            match c {
                'a' => v[0] += 1.0,
                'b' => v[1] += 1.0,
                'c' => v[2] += 1.0,
                'd' => v[3] += 1.0,
                _ => {}
            }
        }
        Ok(v)
    }

    fn dimensions(&self) -> usize {
        VECTOR_DIM
    }

    fn name(&self) -> &str {
        "letters"
    }
}

pub struct TestApp {
    pub router: Router,
    pub state: AppState,
    pub index: Arc<MemoryIndex>,
    pub prompts: Arc<Mutex<Vec<String>>>,
    pub dir: TempDir,
}

impl TestApp {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let db = Arc::new(Database::open_in_memory().unwrap());
        let auth = AuthService::new(
            db.clone(),
            TokenIssuer::new("integration-secret", "loom", chrono::Duration::minutes(30)),
        );

        let prompts = Arc::new(Mutex::new(Vec::new()));
        let loader = FakeLoader {
            prompts: prompts.clone(),
        };
        let generator = Generator::new(Arc::new(ModelRegistry::new(Arc::new(loader))));

        let embedder: Arc<dyn Embedder> = Arc::new(LetterEmbedder);
        let index = Arc::new(MemoryIndex::new());
        let dyn_index: Arc<dyn VectorIndex> = index.clone();

        let settings = Settings {
            upload_dir: dir.path().join("uploads"),
            chunk_size: 8,
            collection: COLLECTION.to_string(),
            vector_dim: VECTOR_DIM,
            rag_top_k: 3,
        };

        let state: AppState = Arc::new(AppContext {
            db,
            auth,
            generator,
            ingestor: Ingestor::new(embedder.clone(), dyn_index.clone()),
            retriever: Retriever::new(embedder, dyn_index, COLLECTION),
            enricher: UrlEnricher::new(Duration::from_secs(2)).unwrap(),
            usage_log: UsageLog::new(dir.path().join("usage.csv")),
            settings,
        });

        Self {
            router: loom_api::router::build(state.clone()),
            state,
            index,
            prompts,
            dir,
        }
    }

    pub async fn send(&self, request: Request<Body>) -> Response<Body> {
        self.router.clone().oneshot(request).await.unwrap()
    }
}

pub fn json_request(method: &str, uri: &str, body: serde_json::Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

pub fn empty_request(method: &str, uri: &str) -> Request<Body> {
    Request::builder().method(method).uri(uri).body(Body::empty()).unwrap()
}

pub struct Part<'a> {
    pub name: &'a str,
    pub filename: Option<&'a str>,
    pub content_type: Option<&'a str>,
    pub data: &'a [u8],
}

const BOUNDARY: &str = "loom-test-boundary";

pub fn multipart_request(uri: &str, parts: &[Part<'_>]) -> Request<Body> {
    let mut body = Vec::new();
    for part in parts {
        body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
        let mut disposition = format!("Content-Disposition: form-data; name=\"{}\"", part.name);
        if let Some(filename) = part.filename {
            disposition.push_str(&format!("; filename=\"{}\"", filename));
        }
        body.extend_from_slice(disposition.as_bytes());
        body.extend_from_slice(b"\r\n");
        if let Some(content_type) = part.content_type {
            body.extend_from_slice(format!("Content-Type: {}\r\n", content_type).as_bytes());
        }
        body.extend_from_slice(b"\r\n");
        body.extend_from_slice(part.data);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());

    Request::builder()
        .method("POST")
        .uri(uri)
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={}", BOUNDARY),
        )
        .body(Body::from(bytes::Bytes::from(body)))
        .unwrap()
}

/// Minimal PDF with one Helvetica text line per page.
pub fn pdf_with_pages(pages: &[&str]) -> Vec<u8> {
    let mut objects = vec![
        "<< /Type /Catalog /Pages 2 0 R >>".to_string(),
        format!(
            "<< /Type /Pages /Kids [{}] /Count {} >>",
            (0..pages.len())
                .map(|i| format!("{} 0 R", 4 + 2 * i))
                .collect::<Vec<_>>()
                .join(" "),
            pages.len()
        ),
        "<< /Type /Font /Subtype /Type1 /BaseFont /Helvetica >>".to_string(),
    ];
    for (i, text) in pages.iter().enumerate() {
        objects.push(format!(
            "<< /Type /Page /Parent 2 0 R /MediaBox [0 0 612 792] \
             /Resources << /Font << /F1 3 0 R >> >> /Contents {} 0 R >>",
            5 + 2 * i
        ));
        let stream = format!("BT /F1 12 Tf 72 720 Td ({}) Tj ET", text);
        objects.push(format!("<< /Length {} >>\nstream\n{}\nendstream", stream.len(), stream));
    }

    let mut out = b"%PDF-1.4\n".to_vec();
    let mut offsets = Vec::new();
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

pub async fn body_bytes(response: Response<Body>) -> Vec<u8> {
    response.into_body().collect().await.unwrap().to_bytes().to_vec()
}

pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    serde_json::from_slice(&body_bytes(response).await).unwrap()
}
