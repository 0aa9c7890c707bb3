//! normxcorr computes normalized cross-correlation between batches of short
//! templates and long continuous signals.
//!
//! The main path correlates in the frequency domain and normalizes with a
//! sliding-window recurrence, producing one coefficient in `[-1, 1]` per
//! template and alignment offset. A time-domain kernel serves as the reference
//! for short windows, and a batch driver fans channels out over a worker pool
//! (with the `rayon` feature).

pub mod batch;
pub mod image;
pub mod kernel;
pub mod lowlevel;
pub mod template;
mod trace;
pub mod util;

pub use batch::{correlate_channels, correlate_multi_channel, BatchConfig};
pub use image::ImageView;
pub use kernel::fft::{correlate, CorrelationPlan, CorrelationShape, Workspace};
pub use kernel::{correlate_direct, correlate_direct_batch, DEFAULT_MIN_VAR};
pub use template::TemplateBank;
pub use util::math::{fft_len_for, next_fast_len};
pub use util::{CorrelationError, CorrelationResult};
