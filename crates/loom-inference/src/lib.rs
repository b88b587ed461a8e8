//! Generation façade over remote inference models.
//!
//! Model identifiers are validated against a fixed catalog, model handles
//! are loaded lazily through a [`ModelLoader`] and cached for the lifetime of
//! the process, and raw outputs are encoded into transport formats (WAV,
//! PNG, MP4).

pub mod backend;
pub mod catalog;
pub mod encode;
pub mod error;
pub mod facade;
pub mod registry;
pub mod remote;

pub use backend::{
    AudioClip, AudioModelHandle, ImageModelHandle, ModelLoader, RawImage, RawVideo, TextModelHandle,
    VideoModelHandle,
};
pub use catalog::{ImageModel, TextModel, VoicePreset};
pub use error::{InferenceError, Result};
pub use facade::{Generator, TextOutput};
pub use registry::{ModelCache, ModelRegistry};
pub use remote::RemoteLoader;
