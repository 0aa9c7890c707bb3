//! Sliding-window normalization of raw frequency-domain correlations.
//!
//! The window statistics depend only on the image, so one mean/variance pair
//! is maintained per offset and shared by every template in the batch. All
//! accumulation is done in `f64`; single-precision running sums drift visibly
//! over long sweeps with large variance.

/// Mean and population variance of a fixed-length window sliding over an image.
#[derive(Clone, Copy, Debug)]
pub struct RunningStats {
    len: f64,
    mean: f64,
    var: f64,
}

impl RunningStats {
    /// Computes the statistics of `window` directly.
    pub fn from_window(window: &[f32]) -> Self {
        let len = window.len() as f64;
        let mean = window.iter().map(|&v| v as f64).sum::<f64>() / len;
        let var = window
            .iter()
            .map(|&v| {
                let d = v as f64 - mean;
                d * d / len
            })
            .sum();
        Self { len, mean, var }
    }

    /// Advances the window by one sample.
    ///
    /// `incoming` enters at the end of the window and `outgoing` leaves at its start.
    #[inline]
    pub fn slide(&mut self, incoming: f32, outgoing: f32) {
        let new = incoming as f64;
        let old = outgoing as f64;
        let old_mean = self.mean;
        self.mean += (new - old) / self.len;
        self.var += (new - old) * (new - self.mean + old - old_mean) / self.len;
    }

    /// Returns the window mean.
    pub fn mean(&self) -> f64 {
        self.mean
    }

    /// Returns the window population variance.
    pub fn variance(&self) -> f64 {
        self.var
    }

    /// Returns the window standard deviation.
    pub fn stdev(&self) -> f64 {
        self.var.sqrt()
    }
}

/// Converts raw batch correlations into normalized coefficients.
#[derive(Clone, Copy, Debug)]
pub struct Normalizer {
    template_len: usize,
    row_stride: usize,
    gain: f64,
    min_var: f64,
}

impl Normalizer {
    /// Creates a normalizer for raw rows spaced `row_stride` apart.
    ///
    /// `gain` is the scale the inverse transform leaves on the raw values.
    pub fn new(template_len: usize, row_stride: usize, gain: f64, min_var: f64) -> Self {
        Self {
            template_len,
            row_stride,
            gain,
            min_var,
        }
    }

    /// Returns a copy using a different degenerate-window threshold.
    pub fn with_min_var(self, min_var: f64) -> Self {
        Self { min_var, ..self }
    }

    /// Returns the variance at or below which a window scores 0.
    pub fn min_var(&self) -> f64 {
        self.min_var
    }

    /// Writes one row of coefficients per template into `out`.
    ///
    /// Row `t` of `raw` holds the circular correlation of template `t`; the
    /// valid offsets start at index `template_len - 1`.
    pub fn normalize(&self, raw: &[f64], norm_sums: &[f64], image: &[f32], out: &mut [f32]) {
        let len = self.template_len;
        let steps = image.len() - len + 1;
        let start = len - 1;
        debug_assert_eq!(out.len(), steps * norm_sums.len());

        let mut stats = RunningStats::from_window(&image[..len]);
        for offset in 0..steps {
            if offset > 0 {
                stats.slide(image[offset + len - 1], image[offset - 1]);
            }
            if stats.variance() <= self.min_var {
                for t in 0..norm_sums.len() {
                    out[t * steps + offset] = 0.0;
                }
                continue;
            }

            let mean = stats.mean();
            let stdev = stats.stdev();
            for (t, &norm_sum) in norm_sums.iter().enumerate() {
                let raw_value = raw[t * self.row_stride + start + offset] / self.gain;
                out[t * steps + offset] = ((raw_value - norm_sum * mean) / stdev) as f32;
            }
        }
    }
}
