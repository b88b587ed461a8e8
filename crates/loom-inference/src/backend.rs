//! Model handle traits and raw inference outputs.

use std::sync::Arc;

use async_trait::async_trait;

use crate::catalog::{ImageModel, TextModel, VoicePreset};
use crate::error::{InferenceError, Result};

/// Mono PCM samples in `[-1.0, 1.0]`.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioClip {
    pub samples: Vec<f32>,
    pub sample_rate: u32,
}

/// Packed RGB8 pixels, row-major.
#[derive(Debug, Clone, PartialEq)]
pub struct RawImage {
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<u8>,
}

impl RawImage {
    pub fn new(width: u32, height: u32, pixels: Vec<u8>) -> Result<Self> {
        let expected = width as usize * height as usize * 3;
        if pixels.len() != expected {
            return Err(InferenceError::Backend(format!(
                "image {}x{} needs {} bytes, got {}",
                width,
                height,
                expected,
                pixels.len()
            )));
        }
        Ok(Self { width, height, pixels })
    }
}

/// Equally sized RGB8 frames played back at `fps`.
#[derive(Debug, Clone, PartialEq)]
pub struct RawVideo {
    pub width: u32,
    pub height: u32,
    pub fps: u32,
    pub frames: Vec<Vec<u8>>,
}

#[async_trait]
pub trait TextModelHandle: Send + Sync {
    async fn generate(&self, prompt: &str, temperature: f32) -> Result<String>;
}

#[async_trait]
pub trait AudioModelHandle: Send + Sync {
    async fn generate(&self, prompt: &str, preset: VoicePreset) -> Result<AudioClip>;
}

#[async_trait]
pub trait ImageModelHandle: Send + Sync {
    async fn generate(&self, prompt: &str, width: u32, height: u32, steps: u32) -> Result<RawImage>;
}

#[async_trait]
pub trait VideoModelHandle: Send + Sync {
    async fn generate(&self, image: &RawImage, num_frames: u32) -> Result<RawVideo>;
}

/// Loads model handles. Called at most once per model by the registry
/// unless a previous load failed.
#[async_trait]
pub trait ModelLoader: Send + Sync {
    async fn load_text(&self, model: TextModel) -> Result<Arc<dyn TextModelHandle>>;

    async fn load_audio(&self) -> Result<Arc<dyn AudioModelHandle>>;

    async fn load_image(&self, model: ImageModel) -> Result<Arc<dyn ImageModelHandle>>;

    async fn load_video(&self) -> Result<Arc<dyn VideoModelHandle>>;
}
