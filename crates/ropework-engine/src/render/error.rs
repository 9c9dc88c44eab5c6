use std::fmt;

/// Failures surfaced by the render layer.
///
/// Capacity growth and ring wrap-around are handled internally and never show
/// up here; only requests the device cannot satisfy at all do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenderError {
    /// A single upload needs more bytes than the device allows per buffer.
    BufferTooLarge { requested: u64, max: u64 },
    /// A previously uploaded range was invalidated by a later reset of its buffer.
    StaleBufferRange { range_generation: u64, buffer_generation: u64 },
}

impl fmt::Display for RenderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RenderError::BufferTooLarge { requested, max } => write!(
                f,
                "upload of {requested} bytes exceeds the device buffer limit of {max} bytes"
            ),
            RenderError::StaleBufferRange { range_generation, buffer_generation } => write!(
                f,
                "buffer range from generation {range_generation} used after reset (now {buffer_generation})"
            ),
        }
    }
}

impl std::error::Error for RenderError {}
