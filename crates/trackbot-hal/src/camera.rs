//! Generic `Camera` trait for the frame source feeding the capture thread.

use trackbot_types::{Frame, TrackError};

/// A camera or image-capture device.
pub trait Camera: Send {
    /// Stable identifier for this camera, e.g. `"usb0"`.
    fn id(&self) -> &str;

    /// Capture and return the next available frame.
    ///
    /// # Errors
    ///
    /// Returns [`TrackError::Capture`] if the frame cannot be captured
    /// (e.g. the device is disconnected or the read timed out).
    fn capture(&mut self) -> Result<Frame, TrackError>;

    /// Release and reopen the device after repeated capture failures.
    fn reconnect(&mut self) -> Result<(), TrackError> {
        Ok(())
    }
}
