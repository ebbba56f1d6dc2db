//! Video frames, frame sources, and the scoped camera guard.
//!
//! The capture device is an exclusive resource: it is acquired when an
//! overlay session becomes active and must be released on every exit path,
//! including error paths. [`CameraGuard`] enforces this with RAII -- the
//! wrapped source is released when the guard drops, however the session
//! ends.

/// A single captured video frame, tightly-packed RGB8.
#[derive(Debug, Clone)]
pub struct VideoFrame {
    pub width: u32,
    pub height: u32,
    /// `width * height * 3` bytes, row-major RGB.
    pub rgb: Vec<u8>,
}

impl VideoFrame {
    /// Construct a frame, validating the buffer length against the
    /// dimensions.
    pub fn new(width: u32, height: u32, rgb: Vec<u8>) -> Result<Self, FrameError> {
        let expected = width as usize * height as usize * 3;
        if rgb.len() != expected {
            return Err(FrameError::Capture(format!(
                "frame buffer is {} bytes, expected {expected} for {width}x{height} RGB",
                rgb.len()
            )));
        }
        Ok(Self { width, height, rgb })
    }
}

/// Errors from frame acquisition.
#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    /// The capture device could not be opened. Fatal to the overlay
    /// session; there is no automatic retry.
    #[error("Camera acquisition failed: {0}")]
    Acquisition(String),

    /// A single frame grab failed. The detection cycle treats this like a
    /// failed detection attempt and continues.
    #[error("Frame capture failed: {0}")]
    Capture(String),
}

/// Boundary trait for the camera / video feed.
///
/// Implementations wrap whatever capture backend the embedding environment
/// provides. `acquire` opens the device, `grab` returns the latest frame,
/// `release` stops the underlying tracks. `release` must be idempotent.
pub trait FrameSource: Send {
    fn acquire(&mut self) -> Result<(), FrameError>;

    fn grab(&mut self) -> Result<VideoFrame, FrameError>;

    fn release(&mut self);
}

/// RAII wrapper holding an acquired [`FrameSource`].
///
/// Construction acquires the device; dropping the guard releases it. An
/// acquisition failure surfaces immediately and leaves nothing held.
pub struct CameraGuard {
    source: Box<dyn FrameSource>,
    released: bool,
}

impl std::fmt::Debug for CameraGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CameraGuard")
            .field("released", &self.released)
            .finish_non_exhaustive()
    }
}

impl CameraGuard {
    /// Acquire the capture device.
    pub fn acquire(source: impl FrameSource + 'static) -> Result<Self, FrameError> {
        let mut source: Box<dyn FrameSource> = Box::new(source);
        source.acquire()?;
        tracing::debug!("Capture device acquired");
        Ok(Self {
            source,
            released: false,
        })
    }

    /// Grab the latest frame from the held device.
    pub fn grab(&mut self) -> Result<VideoFrame, FrameError> {
        self.source.grab()
    }

    /// Release the device early. Subsequent drops are no-ops.
    pub fn release(&mut self) {
        if !self.released {
            self.source.release();
            self.released = true;
            tracing::debug!("Capture device released");
        }
    }
}

impl Drop for CameraGuard {
    fn drop(&mut self) {
        self.release();
    }
}
