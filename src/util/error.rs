//! Error types for normxcorr.

use thiserror::Error;

/// Result alias for normxcorr operations.
pub type CorrelationResult<T> = std::result::Result<T, CorrelationError>;

/// Errors that can occur when running correlations.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum CorrelationError {
    /// The input data or parameters are invalid.
    #[error("invalid input: {0}")]
    InvalidInput(&'static str),
    /// The template is longer than the image it is scanned over.
    #[error("template length {template_len} exceeds image length {image_len}")]
    TemplateTooLong {
        /// Samples per template.
        template_len: usize,
        /// Samples per image.
        image_len: usize,
    },
    /// The transform length would let circular wraparound reach valid offsets.
    #[error("transform length {fft_len} is shorter than the required {needed}")]
    TransformTooShort {
        /// Requested transform length.
        fft_len: usize,
        /// Minimum length that keeps the valid region clean.
        needed: usize,
    },
    /// A caller-supplied buffer has the wrong length.
    #[error("buffer has {got} elements, expected {needed}")]
    BufferSize {
        /// Expected number of elements.
        needed: usize,
        /// Provided number of elements.
        got: usize,
    },
    /// A workspace buffer could not be allocated.
    #[error("failed to allocate {bytes} bytes of workspace")]
    Allocation {
        /// Size of the failed request in bytes.
        bytes: usize,
    },
    /// The FFT backend rejected a buffer.
    #[error("transform failed: {0}")]
    Transform(String),
    /// The worker pool could not be started.
    #[error("failed to build worker pool: {0}")]
    ThreadPool(String),
    /// One or more channels of a batch failed; the others completed.
    #[error("{} channel(s) failed: {first}", .failed.len())]
    ChannelsFailed {
        /// Indices of the failed channels in ascending order.
        failed: Vec<usize>,
        /// Error reported by the lowest failed channel.
        first: Box<CorrelationError>,
    },
}

impl CorrelationError {
    /// Returns the integer status used by the C-style calling convention.
    ///
    /// Success is status 0 and is never produced here. A batch failure reports
    /// the number of failed channels, every other error reports 1.
    pub fn status(&self) -> i32 {
        match self {
            CorrelationError::ChannelsFailed { failed, .. } => {
                i32::try_from(failed.len()).unwrap_or(i32::MAX)
            }
            _ => 1,
        }
    }
}

impl From<realfft::FftError> for CorrelationError {
    fn from(err: realfft::FftError) -> Self {
        CorrelationError::Transform(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::CorrelationError;

    #[test]
    fn status_is_nonzero_for_every_error() {
        assert_eq!(CorrelationError::InvalidInput("x").status(), 1);
        assert_eq!(CorrelationError::Allocation { bytes: 8 }.status(), 1);
        let batch = CorrelationError::ChannelsFailed {
            failed: vec![1, 4, 7],
            first: Box::new(CorrelationError::Transform("bad".into())),
        };
        assert_eq!(batch.status(), 3);
    }

    #[test]
    fn channels_failed_message_counts_channels() {
        let err = CorrelationError::ChannelsFailed {
            failed: vec![2, 5],
            first: Box::new(CorrelationError::InvalidInput("image length mismatch")),
        };
        let msg = err.to_string();
        assert!(msg.starts_with("2 channel(s) failed"));
        assert!(msg.contains("image length mismatch"));
    }
}
