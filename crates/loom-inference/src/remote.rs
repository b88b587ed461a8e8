//! HTTP-backed model loader.
//!
//! Text models are served by Ollama. Audio, image and video models are
//! served by an inference server speaking a small JSON protocol:
//!
//! - `POST /models/load {"task", "model"}` warms a model,
//! - `POST /audio {"prompt", "preset"}` -> `{"sample_rate", "samples"}`,
//! - `POST /image {"model", "prompt", "width", "height", "num_inference_steps"}` -> image,
//! - `POST /video {"image", "num_frames"}` -> `{"width", "height", "fps", "frames"}`,
//!
//! where an image is `{"width", "height", "pixels"}`. `samples` is base64
//! little-endian f32 PCM, `pixels` and `frames` are base64 RGB8.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, info};

use crate::backend::{
    AudioClip, AudioModelHandle, ImageModelHandle, ModelLoader, RawImage, RawVideo, TextModelHandle,
    VideoModelHandle,
};
use crate::catalog::{AUDIO_MODEL, ImageModel, TextModel, VIDEO_MODEL, VoicePreset};
use crate::error::{InferenceError, Result};

#[derive(Clone)]
struct Endpoint {
    client: reqwest::Client,
    base_url: String,
}

impl Endpoint {
    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn post<B: Serialize + ?Sized>(&self, path: &str, body: &B) -> Result<reqwest::Response> {
        let response = self.client.post(self.url(path)).json(body).send().await?;
        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(InferenceError::Backend(format!("{} returned HTTP {} {}", path, status, text)));
        }
        Ok(response)
    }
}

/// Loads handles backed by Ollama (text) and the inference server (media).
pub struct RemoteLoader {
    ollama: Endpoint,
    inference: Endpoint,
}

impl RemoteLoader {
    pub fn new(ollama_url: &str, inference_url: &str, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            ollama: Endpoint {
                client: client.clone(),
                base_url: ollama_url.trim_end_matches('/').to_string(),
            },
            inference: Endpoint {
                client,
                base_url: inference_url.trim_end_matches('/').to_string(),
            },
        })
    }

    async fn warm(&self, task: &str, model: &str) -> Result<()> {
        self.inference.post("/models/load", &json!({ "task": task, "model": model })).await?;
        info!("Inference server loaded {} model {}", task, model);
        Ok(())
    }
}

#[async_trait]
impl ModelLoader for RemoteLoader {
    async fn load_text(&self, model: TextModel) -> Result<Arc<dyn TextModelHandle>> {
        let tag = model.ollama_tag();
        let response = self
            .ollama
            .client
            .post(self.ollama.url("/api/show"))
            .json(&json!({ "name": tag }))
            .send()
            .await?;

        match response.status() {
            s if s.is_success() => debug!("Ollama already has {}", tag),
            StatusCode::NOT_FOUND => {
                info!("Pulling {} into Ollama", tag);
                self.ollama
                    .post("/api/pull", &json!({ "name": tag, "stream": false }))
                    .await?;
            }
            s => return Err(InferenceError::Backend(format!("Ollama /api/show returned HTTP {}", s))),
        }

        Ok(Arc::new(OllamaText {
            endpoint: self.ollama.clone(),
            tag,
        }))
    }

    async fn load_audio(&self) -> Result<Arc<dyn AudioModelHandle>> {
        self.warm("audio", AUDIO_MODEL).await?;
        Ok(Arc::new(RemoteAudio {
            endpoint: self.inference.clone(),
        }))
    }

    async fn load_image(&self, model: ImageModel) -> Result<Arc<dyn ImageModelHandle>> {
        self.warm("image", model.repository()).await?;
        Ok(Arc::new(RemoteImage {
            endpoint: self.inference.clone(),
            model,
        }))
    }

    async fn load_video(&self) -> Result<Arc<dyn VideoModelHandle>> {
        self.warm("video", VIDEO_MODEL).await?;
        Ok(Arc::new(RemoteVideo {
            endpoint: self.inference.clone(),
        }))
    }
}

struct OllamaText {
    endpoint: Endpoint,
    tag: &'static str,
}

#[derive(Deserialize)]
struct GenerateResponse {
    response: String,
}

#[async_trait]
impl TextModelHandle for OllamaText {
    async fn generate(&self, prompt: &str, temperature: f32) -> Result<String> {
        let body = json!({
            "model": self.tag,
            "prompt": prompt,
            "stream": false,
            "options": { "temperature": temperature },
        });
        let parsed: GenerateResponse = self.endpoint.post("/api/generate", &body).await?.json().await?;
        Ok(parsed.response)
    }
}

#[derive(Serialize, Deserialize)]
pub(crate) struct WireImage {
    pub width: u32,
    pub height: u32,
    pub pixels: String,
}

impl WireImage {
    pub(crate) fn encode(image: &RawImage) -> Self {
        Self {
            width: image.width,
            height: image.height,
            pixels: STANDARD.encode(&image.pixels),
        }
    }

    pub(crate) fn decode(self) -> Result<RawImage> {
        let pixels = decode_b64(&self.pixels)?;
        RawImage::new(self.width, self.height, pixels)
    }
}

#[derive(Deserialize)]
pub(crate) struct WireAudio {
    pub sample_rate: u32,
    pub samples: String,
}

impl WireAudio {
    pub(crate) fn decode(self) -> Result<AudioClip> {
        let bytes = decode_b64(&self.samples)?;
        if bytes.len() % 4 != 0 {
            return Err(InferenceError::Backend("audio payload is not f32 aligned".to_string()));
        }
        let samples = bytes
            .chunks_exact(4)
            .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
            .collect();
        Ok(AudioClip {
            samples,
            sample_rate: self.sample_rate,
        })
    }
}

#[derive(Deserialize)]
pub(crate) struct WireVideo {
    pub width: u32,
    pub height: u32,
    pub fps: u32,
    pub frames: Vec<String>,
}

impl WireVideo {
    pub(crate) fn decode(self) -> Result<RawVideo> {
        let frame_len = self.width as usize * self.height as usize * 3;
        let frames = self
            .frames
            .iter()
            .map(|f| {
                let bytes = decode_b64(f)?;
                if bytes.len() != frame_len {
                    return Err(InferenceError::Backend(format!(
                        "video frame has {} bytes, expected {}",
                        bytes.len(),
                        frame_len
                    )));
                }
                Ok(bytes)
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(RawVideo {
            width: self.width,
            height: self.height,
            fps: self.fps,
            frames,
        })
    }
}

fn decode_b64(data: &str) -> Result<Vec<u8>> {
    STANDARD
        .decode(data)
        .map_err(|e| InferenceError::Backend(format!("invalid base64 payload: {}", e)))
}

struct RemoteAudio {
    endpoint: Endpoint,
}

#[async_trait]
impl AudioModelHandle for RemoteAudio {
    async fn generate(&self, prompt: &str, preset: VoicePreset) -> Result<AudioClip> {
        let body = json!({ "prompt": prompt, "preset": preset.as_str() });
        let wire: WireAudio = self.endpoint.post("/audio", &body).await?.json().await?;
        wire.decode()
    }
}

struct RemoteImage {
    endpoint: Endpoint,
    model: ImageModel,
}

#[async_trait]
impl ImageModelHandle for RemoteImage {
    async fn generate(&self, prompt: &str, width: u32, height: u32, steps: u32) -> Result<RawImage> {
        let body = json!({
            "model": self.model.repository(),
            "prompt": prompt,
            "width": width,
            "height": height,
            "num_inference_steps": steps,
        });
        let wire: WireImage = self.endpoint.post("/image", &body).await?.json().await?;
        wire.decode()
    }
}

struct RemoteVideo {
    endpoint: Endpoint,
}

#[async_trait]
impl VideoModelHandle for RemoteVideo {
    async fn generate(&self, image: &RawImage, num_frames: u32) -> Result<RawVideo> {
        let body = json!({ "image": WireImage::encode(image), "num_frames": num_frames });
        let wire: WireVideo = self.endpoint.post("/video", &body).await?.json().await?;
        wire.decode()
    }
}
