use std::sync::Arc;

use tracing::debug;

use crate::catalog::{
    ImageModel, TextModel, VoicePreset, validate_image_request, validate_num_frames, validate_prompt,
    validate_temperature,
};
use crate::encode::{decode_image, mp4_bytes, png_bytes, wav_bytes};
use crate::error::Result;
use crate::registry::ModelRegistry;

#[derive(Debug, Clone)]
pub struct TextOutput {
    pub model: TextModel,
    pub content: String,
}

/// Validates requests, resolves model handles and encodes outputs.
#[derive(Clone)]
pub struct Generator {
    registry: Arc<ModelRegistry>,
}

impl Generator {
    pub fn new(registry: Arc<ModelRegistry>) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &ModelRegistry {
        &self.registry
    }

    /// Generate text for `prompt`. A non-empty `context` (retrieved or
    /// scraped text) is appended to the prompt before inference.
    pub async fn text(&self, model: &str, prompt: &str, context: &str, temperature: f32) -> Result<TextOutput> {
        let model: TextModel = model.parse()?;
        validate_prompt(prompt)?;
        validate_temperature(temperature)?;

        let full_prompt = if context.trim().is_empty() {
            prompt.to_string()
        } else {
            format!("{} {}", prompt, context)
        };

        let handle = self.registry.text(model).await?;
        let content = handle.generate(&full_prompt, temperature).await?;
        debug!("{} produced {} chars", model, content.len());
        Ok(TextOutput { model, content })
    }

    /// WAV audio for `prompt` spoken with `preset`.
    pub async fn audio(&self, prompt: &str, preset: &str) -> Result<Vec<u8>> {
        let preset: VoicePreset = preset.parse()?;
        validate_prompt(prompt)?;

        let handle = self.registry.audio().await?;
        let clip = handle.generate(prompt, preset).await?;
        wav_bytes(&clip)
    }

    /// PNG image for `prompt`.
    pub async fn image(&self, prompt: &str, model: &str, width: u32, height: u32, steps: u32) -> Result<Vec<u8>> {
        let model: ImageModel = model.parse()?;
        validate_prompt(prompt)?;
        validate_image_request(model, width, height, steps)?;

        let handle = self.registry.image(model).await?;
        let image = handle.generate(prompt, width, height, steps).await?;
        png_bytes(&image)
    }

    /// MP4 animating the uploaded still image.
    pub async fn video(&self, image: &[u8], num_frames: u32) -> Result<Vec<u8>> {
        validate_num_frames(num_frames)?;
        let still = decode_image(image)?;

        let handle = self.registry.video().await?;
        let video = handle.generate(&still, num_frames).await?;
        mp4_bytes(&video).await
    }
}
