//! Borrowed views over multi-channel images.
//!
//! `ImageView` is a channels x samples view into a 1D buffer with an explicit
//! stride. The stride counts samples between the starts of consecutive
//! channels, so a stride larger than the channel length represents padded rows.

use crate::util::{CorrelationError, CorrelationResult};

/// Borrowed multi-channel image view with an explicit stride.
#[derive(Copy, Clone, Debug)]
pub struct ImageView<'a> {
    data: &'a [f32],
    len: usize,
    channels: usize,
    stride: usize,
}

impl<'a> ImageView<'a> {
    /// Creates a contiguous view; the channel count is `data.len() / len`.
    pub fn from_slice(data: &'a [f32], len: usize) -> CorrelationResult<Self> {
        if len == 0 {
            return Err(CorrelationError::InvalidInput("image length must be non-zero"));
        }
        if data.is_empty() || data.len() % len != 0 {
            return Err(CorrelationError::InvalidInput(
                "image buffer is not a whole number of channels",
            ));
        }
        Self::new(data, len, data.len() / len, len)
    }

    /// Creates a view with an explicit stride.
    pub fn new(
        data: &'a [f32],
        len: usize,
        channels: usize,
        stride: usize,
    ) -> CorrelationResult<Self> {
        let needed = required_len(len, channels, stride)?;
        if data.len() < needed {
            return Err(CorrelationError::BufferSize {
                needed,
                got: data.len(),
            });
        }
        Ok(Self {
            data,
            len,
            channels,
            stride,
        })
    }

    /// Returns the number of samples per channel.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Always false; views hold at least one sample.
    pub fn is_empty(&self) -> bool {
        false
    }

    /// Returns the number of channels.
    pub fn channels(&self) -> usize {
        self.channels
    }

    /// Returns the stride in samples between channel starts.
    pub fn stride(&self) -> usize {
        self.stride
    }

    /// Returns the samples of channel `c`.
    pub fn channel(&self, c: usize) -> Option<&'a [f32]> {
        if c >= self.channels {
            return None;
        }
        let start = c.checked_mul(self.stride)?;
        let end = start.checked_add(self.len)?;
        self.data.get(start..end)
    }
}

fn required_len(len: usize, channels: usize, stride: usize) -> CorrelationResult<usize> {
    if len == 0 || channels == 0 {
        return Err(CorrelationError::InvalidInput(
            "image needs at least one channel and one sample",
        ));
    }
    if stride < len {
        return Err(CorrelationError::InvalidInput(
            "image stride is shorter than the channel length",
        ));
    }
    (channels - 1)
        .checked_mul(stride)
        .and_then(|v| v.checked_add(len))
        .ok_or(CorrelationError::InvalidInput("image shape overflows usize"))
}
