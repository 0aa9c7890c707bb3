//! Multi-channel batch driver.
//!
//! Channels are split into contiguous blocks, one per worker. Every worker
//! owns a private [`Workspace`] allocated before any work starts, and all
//! workers execute the same immutable [`CorrelationPlan`]. Each block writes
//! only to its own slice of the output matrix. A failing channel does not stop
//! the others; failures are reported together once the batch completes.

use crate::image::ImageView;
use crate::kernel::fft::{CorrelationPlan, CorrelationShape, Workspace};
use crate::kernel::DEFAULT_MIN_VAR;
use crate::template::TemplateBank;
use crate::trace::{trace_event, trace_span, trace_warn};
use crate::util::{CorrelationError, CorrelationResult};

#[cfg(feature = "rayon")]
use rayon::prelude::*;

/// Configuration for multi-channel correlation.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct BatchConfig {
    /// Worker count; `None` queries the platform when the batch starts.
    pub workers: Option<usize>,
    /// Variance at or below which an image window scores 0.
    pub min_var: f64,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            workers: None,
            min_var: DEFAULT_MIN_VAR,
        }
    }
}

impl BatchConfig {
    /// Returns a copy with an explicit worker count.
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = Some(workers);
        self
    }

    /// Returns a copy with a different degenerate-window threshold.
    pub fn with_min_var(mut self, min_var: f64) -> Self {
        self.min_var = min_var;
        self
    }

    /// Resolves the worker count, never returning 0.
    pub fn resolved_workers(&self) -> usize {
        match self.workers {
            Some(workers) => workers.max(1),
            None => default_workers(),
        }
    }
}

#[cfg(feature = "rayon")]
fn default_workers() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}

#[cfg(not(feature = "rayon"))]
fn default_workers() -> usize {
    1
}

/// Correlates one template bank against every channel of `images`.
///
/// `out` is `channels x templates x steps`, row-major, and fully overwritten.
pub fn correlate_multi_channel(
    bank: &TemplateBank,
    images: ImageView<'_>,
    fft_len: usize,
    cfg: &BatchConfig,
    out: &mut [f32],
) -> CorrelationResult<()> {
    let _span = trace_span!(
        "correlate_multi_channel",
        channels = images.channels(),
        templates = bank.len()
    )
    .entered();
    run_batch(|_| bank, bank, images, fft_len, cfg, out)
}

/// Correlates `banks[c]` against channel `c` of `images`.
///
/// All banks must share one template length and template count. The output
/// layout matches [`correlate_multi_channel`].
pub fn correlate_channels(
    banks: &[TemplateBank],
    images: ImageView<'_>,
    fft_len: usize,
    cfg: &BatchConfig,
    out: &mut [f32],
) -> CorrelationResult<()> {
    let _span = trace_span!("correlate_channels", channels = images.channels()).entered();
    let first = banks
        .first()
        .ok_or(CorrelationError::InvalidInput("no template banks given"))?;
    if banks.len() != images.channels() {
        return Err(CorrelationError::InvalidInput(
            "need exactly one template bank per channel",
        ));
    }
    if banks
        .iter()
        .any(|b| b.template_len() != first.template_len() || b.len() != first.len())
    {
        return Err(CorrelationError::InvalidInput(
            "template banks differ in shape",
        ));
    }
    run_batch(|c| &banks[c], first, images, fft_len, cfg, out)
}

fn run_batch<'b, F>(
    bank_for: F,
    reference: &TemplateBank,
    images: ImageView<'_>,
    fft_len: usize,
    cfg: &BatchConfig,
    out: &mut [f32],
) -> CorrelationResult<()>
where
    F: Fn(usize) -> &'b TemplateBank + Sync,
{
    let channels = images.channels();
    let shape = CorrelationShape::new(
        reference.template_len(),
        reference.len(),
        images.len(),
        fft_len,
    )?;
    let row_len = shape.output_len();
    let needed = row_len
        .checked_mul(channels)
        .ok_or(CorrelationError::InvalidInput("output size overflows usize"))?;
    if out.len() != needed {
        return Err(CorrelationError::BufferSize {
            needed,
            got: out.len(),
        });
    }

    let workers = cfg.resolved_workers().min(channels);
    let per_block = channels.div_ceil(workers);
    let blocks = channels.div_ceil(per_block);

    // Plans are built here, once; workers only ever execute them.
    let plan = CorrelationPlan::new(shape).with_min_var(cfg.min_var);
    let mut workspaces = (0..blocks)
        .map(|_| plan.workspace())
        .collect::<CorrelationResult<Vec<_>>>()?;
    trace_event!(
        "batch_start",
        channels = channels,
        workers = blocks,
        per_block = per_block
    );

    let block_len = per_block * row_len;
    let run = |block: usize, ws: &mut Workspace, out_block: &mut [f32]| {
        run_block(&plan, ws, &bank_for, images, block * per_block, row_len, out_block)
    };

    #[cfg(feature = "rayon")]
    let mut failures: Vec<(usize, CorrelationError)> = {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(blocks)
            .build()
            .map_err(|e| CorrelationError::ThreadPool(e.to_string()))?;
        pool.install(|| {
            workspaces
                .par_iter_mut()
                .zip(out.par_chunks_mut(block_len))
                .enumerate()
                .flat_map_iter(|(block, (ws, out_block))| run(block, ws, out_block))
                .collect()
        })
    };

    #[cfg(not(feature = "rayon"))]
    let mut failures: Vec<(usize, CorrelationError)> = workspaces
        .iter_mut()
        .zip(out.chunks_mut(block_len))
        .enumerate()
        .flat_map(|(block, (ws, out_block))| run(block, ws, out_block))
        .collect();

    if failures.is_empty() {
        return Ok(());
    }
    failures.sort_by_key(|(channel, _)| *channel);
    trace_warn!("batch_failed", failed = failures.len(), channels = channels);
    let failed = failures.iter().map(|(channel, _)| *channel).collect();
    let (_, first) = failures.swap_remove(0);
    Err(CorrelationError::ChannelsFailed {
        failed,
        first: Box::new(first),
    })
}

/// Runs the channels of one block sequentially on one workspace.
fn run_block<'b, F>(
    plan: &CorrelationPlan,
    ws: &mut Workspace,
    bank_for: &F,
    images: ImageView<'_>,
    first_channel: usize,
    row_len: usize,
    out_block: &mut [f32],
) -> Vec<(usize, CorrelationError)>
where
    F: Fn(usize) -> &'b TemplateBank,
{
    let mut failures = Vec::new();
    for (i, ncc) in out_block.chunks_exact_mut(row_len).enumerate() {
        let channel = first_channel + i;
        let result = match images.channel(channel) {
            Some(image) => plan.execute(ws, bank_for(channel), image, ncc),
            None => Err(CorrelationError::InvalidInput("channel index out of range")),
        };
        if let Err(err) = result {
            ncc.fill(0.0);
            failures.push((channel, err));
        }
    }
    failures
}
