//! Low-level building blocks for custom correlation pipelines.
//!
//! These expose the time-domain kernels and the normalization pieces behind
//! the high-level functions. Most users should prefer [`correlate`](crate::correlate)
//! and [`correlate_multi_channel`](crate::correlate_multi_channel).

pub use crate::kernel::normalize::{Normalizer, RunningStats};
pub use crate::kernel::scalar::DirectScalar;
#[cfg(feature = "simd")]
pub use crate::kernel::simd::DirectSimd;
pub use crate::kernel::Kernel;
pub use crate::template::TemplatePlan;
