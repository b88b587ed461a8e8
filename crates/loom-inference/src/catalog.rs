//! Supported models, voice presets, prices and request validation.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{InferenceError, Result};

pub const MAX_PROMPT_CHARS: usize = 4000;
pub const MAX_VIDEO_FRAMES: u32 = 128;
pub const TINYSD_MAX_STEPS: u32 = 2000;
pub const IMAGE_SIZES: [u32; 2] = [512, 1024];

/// Image-to-video model served by the inference backend.
pub const VIDEO_MODEL: &str = "stabilityai/stable-video-diffusion-img2vid";
/// Text-to-speech model serving the voice presets.
pub const AUDIO_MODEL: &str = "suno/bark-small";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TextModel {
    #[serde(rename = "tinyLlama")]
    TinyLlama,
    #[serde(rename = "gemma2b")]
    Gemma2b,
}

impl TextModel {
    pub fn as_str(&self) -> &'static str {
        match self {
            TextModel::TinyLlama => "tinyLlama",
            TextModel::Gemma2b => "gemma2b",
        }
    }

    /// Tag the model is published under on the Ollama registry.
    pub fn ollama_tag(&self) -> &'static str {
        match self {
            TextModel::TinyLlama => "tinyllama",
            TextModel::Gemma2b => "gemma:2b",
        }
    }

    pub fn price_per_token(&self) -> f64 {
        match self {
            TextModel::TinyLlama => 0.0030,
            TextModel::Gemma2b => 0.0200,
        }
    }

    pub fn cost(&self, tokens: usize) -> f64 {
        self.price_per_token() * tokens as f64
    }
}

impl FromStr for TextModel {
    type Err = InferenceError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "tinyLlama" => Ok(TextModel::TinyLlama),
            "gemma2b" => Ok(TextModel::Gemma2b),
            other => Err(InferenceError::UnsupportedModel(other.to_string())),
        }
    }
}

impl fmt::Display for TextModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ImageModel {
    TinySd,
    Sd15,
}

impl ImageModel {
    pub fn as_str(&self) -> &'static str {
        match self {
            ImageModel::TinySd => "tinysd",
            ImageModel::Sd15 => "sd1.5",
        }
    }

    pub fn repository(&self) -> &'static str {
        match self {
            ImageModel::TinySd => "segmind/tiny-sd",
            ImageModel::Sd15 => "runwayml/stable-diffusion-v1-5",
        }
    }
}

impl FromStr for ImageModel {
    type Err = InferenceError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "tinysd" => Ok(ImageModel::TinySd),
            "sd1.5" => Ok(ImageModel::Sd15),
            other => Err(InferenceError::UnsupportedModel(other.to_string())),
        }
    }
}

impl fmt::Display for ImageModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum VoicePreset {
    #[default]
    EnSpeaker1,
    EnSpeaker9,
}

impl VoicePreset {
    pub fn as_str(&self) -> &'static str {
        match self {
            VoicePreset::EnSpeaker1 => "v2/en_speaker_1",
            VoicePreset::EnSpeaker9 => "v2/en_speaker_9",
        }
    }
}

impl FromStr for VoicePreset {
    type Err = InferenceError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "v2/en_speaker_1" => Ok(VoicePreset::EnSpeaker1),
            "v2/en_speaker_9" => Ok(VoicePreset::EnSpeaker9),
            other => Err(InferenceError::invalid(format!("Unknown voice preset {}", other))),
        }
    }
}

pub fn validate_prompt(prompt: &str) -> Result<()> {
    let len = prompt.chars().count();
    if len == 0 || len > MAX_PROMPT_CHARS {
        return Err(InferenceError::invalid(format!(
            "Prompt must be between 1 and {} characters",
            MAX_PROMPT_CHARS
        )));
    }
    Ok(())
}

pub fn validate_temperature(temperature: f32) -> Result<()> {
    if !(0.0..=1.0).contains(&temperature) {
        return Err(InferenceError::invalid(format!(
            "Temperature must be between 0.0 and 1.0, got {}",
            temperature
        )));
    }
    Ok(())
}

/// Output must be square, 512 or 1024 pixels, and tinysd is capped at
/// 2000 inference steps.
pub fn validate_image_request(model: ImageModel, width: u32, height: u32, steps: u32) -> Result<()> {
    if width != height {
        return Err(InferenceError::invalid("Only square images are supported"));
    }
    if !IMAGE_SIZES.contains(&width) {
        return Err(InferenceError::invalid(format!(
            "Invalid output size: ({}, {}) - expected 512 or 1024",
            width, height
        )));
    }
    if steps == 0 {
        return Err(InferenceError::invalid("num_inference_steps must be positive"));
    }
    if model == ImageModel::TinySd && steps > TINYSD_MAX_STEPS {
        return Err(InferenceError::invalid(
            "TinySD model cannot have more than 2000 inference steps",
        ));
    }
    Ok(())
}

pub fn validate_num_frames(num_frames: u32) -> Result<()> {
    if num_frames == 0 || num_frames > MAX_VIDEO_FRAMES {
        return Err(InferenceError::invalid(format!(
            "num_frames must be between 1 and {}",
            MAX_VIDEO_FRAMES
        )));
    }
    Ok(())
}
