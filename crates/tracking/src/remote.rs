//! Remote vision-reasoning detection strategy.
//!
//! Downsamples the current frame to a fixed resolution, JPEG-encodes it,
//! and posts it base64-encoded to the remote vision service. The response
//! carries a bounding box (and optionally named sub-landmarks) in the
//! downsampled coordinate frame; everything is rescaled into native frame
//! coordinates before use.

use std::io::Cursor;
use std::time::Duration;

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use image::{imageops::FilterType, DynamicImage, ImageFormat, RgbImage};
use serde::{Deserialize, Serialize};

use overmark_core::{DetectionBox, DetectionOrigin, Landmarks, PixelPoint};

use crate::detector::DetectError;
use crate::frame::VideoFrame;

/// Fixed downsample resolution sent to the vision service.
pub const DOWNSAMPLE_WIDTH: u32 = 640;
pub const DOWNSAMPLE_HEIGHT: u32 = 480;

/// Default cadence between remote detection calls.
pub const DEFAULT_CADENCE: Duration = Duration::from_secs(2);

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Request mode understood by the vision service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DetectionMode {
    /// Bounding box plus named sub-landmarks.
    Full,
    /// Bounding box only, cheaper and faster.
    Fast,
}

impl DetectionMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Full => "full",
            Self::Fast => "fast",
        }
    }
}

/// Configuration for the remote strategy.
#[derive(Debug, Clone)]
pub struct RemoteDetectorConfig {
    /// Detection endpoint, e.g. `http://host:8000/detect-target`.
    pub endpoint: String,
    pub downsample_width: u32,
    pub downsample_height: u32,
    /// Interval between calls. The first call fires immediately on
    /// activation.
    pub cadence: Duration,
    pub mode: DetectionMode,
}

impl RemoteDetectorConfig {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            downsample_width: DOWNSAMPLE_WIDTH,
            downsample_height: DOWNSAMPLE_HEIGHT,
            cadence: DEFAULT_CADENCE,
            mode: DetectionMode::Full,
        }
    }

    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                 | Default                                  |
    /// |-------------------------|------------------------------------------|
    /// | `REMOTE_DETECT_URL`     | `http://127.0.0.1:8000/detect-target`    |
    /// | `REMOTE_DETECT_CADENCE_MS` | `2000`                                |
    pub fn from_env() -> Self {
        let endpoint = std::env::var("REMOTE_DETECT_URL")
            .unwrap_or_else(|_| "http://127.0.0.1:8000/detect-target".into());
        let cadence_ms: u64 = std::env::var("REMOTE_DETECT_CADENCE_MS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(DEFAULT_CADENCE.as_millis() as u64);

        let mut config = Self::new(endpoint);
        config.cadence = Duration::from_millis(cadence_ms);
        config
    }
}

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
struct DetectRequest<'a> {
    /// Base64-encoded JPEG at downsample resolution.
    image: &'a str,
    mode: &'a str,
}

/// Response from the vision service, coordinates in downsample space.
#[derive(Debug, Clone, Deserialize)]
pub struct RemoteDetection {
    pub detected: bool,
    pub bbox: RemoteBBox,
    #[serde(default)]
    pub confidence: f64,
    #[serde(default)]
    pub parts: Option<RemoteParts>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RemoteBBox {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RemoteParts {
    pub cap: RemotePoint,
    pub middle: RemotePoint,
    pub bottom: RemotePoint,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RemotePoint {
    pub x: f64,
    pub y: f64,
}

// ---------------------------------------------------------------------------
// Detector
// ---------------------------------------------------------------------------

/// HTTP client for the remote detection call.
pub struct RemoteDetector {
    client: reqwest::Client,
    config: RemoteDetectorConfig,
}

impl RemoteDetector {
    pub fn new(config: RemoteDetectorConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            config,
        }
    }

    pub fn config(&self) -> &RemoteDetectorConfig {
        &self.config
    }

    /// Run one remote detection cycle against a frame.
    ///
    /// Returns `Ok(None)` when the service reports nothing found; network
    /// and decoding failures surface as `Err` so the status machine can
    /// report `Lost`, but the pipeline's box output treats both the same.
    pub async fn detect(
        &self,
        frame: &VideoFrame,
    ) -> Result<Option<(DetectionBox, Option<Landmarks>)>, DetectError> {
        let encoded = encode_downsampled(
            frame,
            self.config.downsample_width,
            self.config.downsample_height,
        )?;

        let request = DetectRequest {
            image: &encoded,
            mode: self.config.mode.as_str(),
        };

        let response = self
            .client
            .post(&self.config.endpoint)
            .json(&request)
            .send()
            .await
            .map_err(|e| DetectError::Remote(format!("request failed: {e}")))?
            .error_for_status()
            .map_err(|e| DetectError::Remote(format!("service error: {e}")))?
            .json::<RemoteDetection>()
            .await
            .map_err(|e| DetectError::Remote(format!("invalid response body: {e}")))?;

        Ok(convert_detection(
            &response,
            frame.width,
            frame.height,
            self.config.downsample_width,
            self.config.downsample_height,
        ))
    }
}

/// Downsample a frame and return it as base64-encoded JPEG.
fn encode_downsampled(frame: &VideoFrame, width: u32, height: u32) -> Result<String, DetectError> {
    let img = RgbImage::from_raw(frame.width, frame.height, frame.rgb.clone())
        .ok_or_else(|| DetectError::Remote("frame buffer does not match dimensions".into()))?;

    let resized = image::imageops::resize(&img, width, height, FilterType::Triangle);

    let mut jpeg = Vec::new();
    DynamicImage::ImageRgb8(resized)
        .write_to(&mut Cursor::new(&mut jpeg), ImageFormat::Jpeg)
        .map_err(|e| DetectError::Remote(format!("JPEG encoding failed: {e}")))?;

    Ok(BASE64.encode(&jpeg))
}

/// Map a service response into native-frame coordinates.
///
/// Rescales box and landmarks by `(native / downsample)` per axis. A
/// not-detected response or a degenerate box maps to `None`.
pub fn convert_detection(
    response: &RemoteDetection,
    native_width: u32,
    native_height: u32,
    downsample_width: u32,
    downsample_height: u32,
) -> Option<(DetectionBox, Option<Landmarks>)> {
    if !response.detected {
        return None;
    }

    let sx = native_width as f64 / downsample_width as f64;
    let sy = native_height as f64 / downsample_height as f64;

    let bbox = DetectionBox {
        x: response.bbox.x,
        y: response.bbox.y,
        width: response.bbox.width,
        height: response.bbox.height,
        category: "bottle".into(),
        confidence: response.confidence,
        origin: DetectionOrigin::Remote,
    }
    .scaled(sx, sy);

    if !bbox.is_usable() {
        return None;
    }

    let landmarks = response.parts.as_ref().map(|parts| {
        Landmarks {
            cap: PixelPoint::new(parts.cap.x, parts.cap.y),
            middle: PixelPoint::new(parts.middle.x, parts.middle.y),
            bottom: PixelPoint::new(parts.bottom.x, parts.bottom.y),
        }
        .scaled(sx, sy)
    });

    Some((bbox, landmarks))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn response(json: &str) -> RemoteDetection {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn parse_full_response() {
        let r = response(
            r#"{"detected":true,"bbox":{"x":160,"y":120,"width":50,"height":50},"confidence":0.8,
                "parts":{"cap":{"x":180,"y":125},"middle":{"x":180,"y":145},"bottom":{"x":180,"y":165}}}"#,
        );
        assert!(r.detected);
        assert_eq!(r.bbox.x, 160.0);
        assert!(r.parts.is_some());
    }

    #[test]
    fn parse_fast_response_without_parts() {
        let r = response(
            r#"{"detected":true,"bbox":{"x":1,"y":2,"width":3,"height":4},"confidence":0.5}"#,
        );
        assert!(r.parts.is_none());
    }

    #[test]
    fn convert_rescales_box_into_native_frame() {
        // (160,120,50,50) at 320x240 downsample, 1280x720 native
        // -> (640,360,200,150).
        let r = response(
            r#"{"detected":true,"bbox":{"x":160,"y":120,"width":50,"height":50},"confidence":0.9}"#,
        );
        let (bbox, landmarks) = convert_detection(&r, 1280, 720, 320, 240).unwrap();
        assert_eq!(bbox.x, 640.0);
        assert_eq!(bbox.y, 360.0);
        assert_eq!(bbox.width, 200.0);
        assert_eq!(bbox.height, 150.0);
        assert_eq!(bbox.origin, DetectionOrigin::Remote);
        assert!(landmarks.is_none());
    }

    #[test]
    fn convert_rescales_landmarks_with_box() {
        let r = response(
            r#"{"detected":true,"bbox":{"x":0,"y":0,"width":100,"height":100},"confidence":0.9,
                "parts":{"cap":{"x":10,"y":20},"middle":{"x":10,"y":50},"bottom":{"x":10,"y":80}}}"#,
        );
        let (_, landmarks) = convert_detection(&r, 1280, 960, 640, 480).unwrap();
        let landmarks = landmarks.unwrap();
        assert_eq!(landmarks.cap, PixelPoint::new(20.0, 40.0));
        assert_eq!(landmarks.bottom, PixelPoint::new(20.0, 160.0));
    }

    #[test]
    fn not_detected_converts_to_none() {
        let r = response(
            r#"{"detected":false,"bbox":{"x":0,"y":0,"width":0,"height":0},"confidence":0.0}"#,
        );
        assert!(convert_detection(&r, 1280, 720, 640, 480).is_none());
    }

    #[test]
    fn degenerate_bbox_converts_to_none() {
        let r = response(
            r#"{"detected":true,"bbox":{"x":5,"y":5,"width":0,"height":10},"confidence":0.7}"#,
        );
        assert!(convert_detection(&r, 1280, 720, 640, 480).is_none());
    }

    #[test]
    fn encode_downsampled_produces_base64_jpeg() {
        let frame = VideoFrame::new(8, 8, vec![128; 8 * 8 * 3]).unwrap();
        let encoded = encode_downsampled(&frame, 4, 4).unwrap();
        let decoded = BASE64.decode(encoded).unwrap();
        // JPEG SOI marker.
        assert_eq!(&decoded[..2], &[0xFF, 0xD8]);
    }
}
