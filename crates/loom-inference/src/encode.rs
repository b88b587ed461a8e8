//! Encoders from raw inference outputs to transport formats.

use std::io::Cursor;
use std::process::Stdio;

use image::{ImageFormat, RgbImage};
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::{debug, warn};

use crate::backend::{AudioClip, RawImage, RawVideo};
use crate::error::{InferenceError, Result};

/// 16-bit mono PCM WAV.
pub fn wav_bytes(clip: &AudioClip) -> Result<Vec<u8>> {
    if clip.sample_rate == 0 {
        return Err(InferenceError::Encode("sample rate must be positive".to_string()));
    }
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate: clip.sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };

    let mut buffer = Vec::new();
    {
        let mut writer = hound::WavWriter::new(Cursor::new(&mut buffer), spec)?;
        for sample in &clip.samples {
            let clamped = sample.clamp(-1.0, 1.0);
            writer.write_sample((clamped * i16::MAX as f32) as i16)?;
        }
        writer.finalize()?;
    }
    Ok(buffer)
}

pub fn png_bytes(image: &RawImage) -> Result<Vec<u8>> {
    let buffer = RgbImage::from_raw(image.width, image.height, image.pixels.clone())
        .ok_or_else(|| InferenceError::Encode("pixel buffer does not match image size".to_string()))?;

    let mut out = Vec::new();
    buffer.write_to(&mut Cursor::new(&mut out), ImageFormat::Png)?;
    Ok(out)
}

/// Decode an uploaded PNG/JPEG into RGB8 pixels.
pub fn decode_image(bytes: &[u8]) -> Result<RawImage> {
    let decoded = image::load_from_memory(bytes)
        .map_err(|e| InferenceError::invalid(format!("Unreadable image: {}", e)))?
        .to_rgb8();
    let (width, height) = decoded.dimensions();
    RawImage::new(width, height, decoded.into_raw())
}

/// Fragmented MP4 (H.264) produced by piping raw frames through `ffmpeg`.
pub async fn mp4_bytes(video: &RawVideo) -> Result<Vec<u8>> {
    if video.frames.is_empty() {
        return Err(InferenceError::Encode("video has no frames".to_string()));
    }
    let frame_len = video.width as usize * video.height as usize * 3;
    if video.frames.iter().any(|f| f.len() != frame_len) {
        return Err(InferenceError::Encode("frame size does not match video dimensions".to_string()));
    }

    let size = format!("{}x{}", video.width, video.height);
    let fps = video.fps.max(1).to_string();
    let mut child = Command::new("ffmpeg")
        .args(["-hide_banner", "-loglevel", "error"])
        .args(["-f", "rawvideo", "-pix_fmt", "rgb24", "-s", &size, "-r", &fps, "-i", "-"])
        .args(["-vf", "scale=trunc(iw/2)*2:trunc(ih/2)*2"])
        .args(["-c:v", "libx264", "-pix_fmt", "yuv420p"])
        .args(["-movflags", "frag_keyframe+empty_moov", "-f", "mp4", "-"])
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .map_err(|e| InferenceError::Encode(format!("failed to start ffmpeg: {}", e)))?;

    let mut stdin = child
        .stdin
        .take()
        .ok_or_else(|| InferenceError::Encode("ffmpeg stdin unavailable".to_string()))?;
    let frames = video.frames.clone();
    let writer = tokio::spawn(async move {
        for frame in &frames {
            stdin.write_all(frame).await?;
        }
        stdin.shutdown().await
    });

    let output = child.wait_with_output().await?;
    match writer.await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => warn!("ffmpeg stdin closed early: {}", e),
        Err(e) => warn!("ffmpeg writer task failed: {}", e),
    }

    if !output.status.success() {
        return Err(InferenceError::Encode(format!(
            "ffmpeg exited with {}: {}",
            output.status,
            String::from_utf8_lossy(&output.stderr).trim()
        )));
    }
    debug!("Encoded {} frame(s) into {} bytes of mp4", video.frames.len(), output.stdout.len());
    Ok(output.stdout)
}
