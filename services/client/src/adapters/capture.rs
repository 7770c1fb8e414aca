//! services/client/src/adapters/capture.rs
//!
//! This module contains the adapter for rasterizing the interview view. The
//! console build has no composited window tree to rasterize, so a configured
//! still frame stands in for the rendered view; an unset frame reads as "the
//! region is not mounted" and observations skip the cycle.

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use image::codecs::webp::WebPEncoder;
use image::GenericImageView;
use interview_buddy_core::domain::{CaptureRegion, VisualSnapshot};
use interview_buddy_core::ports::{PortError, PortResult, ScreenCaptureService};
use std::path::PathBuf;

pub struct FrameCaptureAdapter {
    frame_path: Option<PathBuf>,
}

impl FrameCaptureAdapter {
    pub fn new(frame_path: Option<PathBuf>) -> Self {
        Self { frame_path }
    }
}

fn encode_frame(path: PathBuf, region: CaptureRegion) -> PortResult<VisualSnapshot> {
    let frame = image::open(&path)
        .map_err(|e| PortError::Unexpected(format!("loading {}: {}", path.display(), e)))?;

    // The editor pane occupies the right half of the interview layout.
    let frame = match region {
        CaptureRegion::InterviewRoot => frame,
        CaptureRegion::CodeEditor => {
            let (width, height) = frame.dimensions();
            frame.crop_imm(width / 2, 0, width - width / 2, height)
        }
    };

    let rgba = frame.to_rgba8();
    let (width, height) = rgba.dimensions();
    let mut encoded = Vec::new();
    WebPEncoder::new_lossless(&mut encoded)
        .encode(rgba.as_raw(), width, height, image::ColorType::Rgba8)
        .map_err(|e| PortError::Unexpected(format!("webp encoding: {}", e)))?;

    Ok(VisualSnapshot::webp(BASE64.encode(&encoded)))
}

#[async_trait]
impl ScreenCaptureService for FrameCaptureAdapter {
    async fn capture(&self, region: CaptureRegion) -> PortResult<Option<VisualSnapshot>> {
        let Some(path) = self.frame_path.clone() else {
            return Ok(None);
        };
        if !path.exists() {
            return Ok(None);
        }
        // Image decode and re-encode is CPU-bound; keep it off the runtime.
        let snapshot = tokio::task::spawn_blocking(move || encode_frame(path, region))
            .await
            .map_err(|e| PortError::Unexpected(format!("capture task failed: {}", e)))??;
        Ok(Some(snapshot))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use interview_buddy_core::domain::WEBP_MIME;

    fn frame_file(width: u32, height: u32) -> (tempfile::TempDir, PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("frame.png");
        let img = image::RgbaImage::from_pixel(width, height, image::Rgba([10, 20, 30, 255]));
        img.save(&path).unwrap();
        (dir, path)
    }

    #[tokio::test]
    async fn unset_frame_reads_as_not_mounted() {
        let capture = FrameCaptureAdapter::new(None);
        let result = capture.capture(CaptureRegion::InterviewRoot).await.unwrap();
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn missing_frame_file_reads_as_not_mounted() {
        let dir = tempfile::tempdir().unwrap();
        let capture = FrameCaptureAdapter::new(Some(dir.path().join("gone.png")));
        let result = capture.capture(CaptureRegion::InterviewRoot).await.unwrap();
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn capture_produces_base64_webp() {
        let (_dir, path) = frame_file(8, 4);
        let capture = FrameCaptureAdapter::new(Some(path));

        let snapshot = capture
            .capture(CaptureRegion::InterviewRoot)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(snapshot.mime, WEBP_MIME);
        let decoded = BASE64.decode(snapshot.data.as_bytes()).unwrap();
        // RIFF....WEBP container magic.
        assert_eq!(&decoded[..4], b"RIFF");
        assert_eq!(&decoded[8..12], b"WEBP");
    }

    #[tokio::test]
    async fn code_editor_region_crops_the_right_half() {
        let (_dir, path) = frame_file(8, 4);
        let capture = FrameCaptureAdapter::new(Some(path));

        let snapshot = capture
            .capture(CaptureRegion::CodeEditor)
            .await
            .unwrap()
            .unwrap();
        let decoded = BASE64.decode(snapshot.data.as_bytes()).unwrap();
        let cropped = image::load_from_memory(&decoded).unwrap();
        assert_eq!(cropped.dimensions(), (4, 4));
    }
}
