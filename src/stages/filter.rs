use crate::series::{Context, Sample, TimeSeries};

/// Index selection policy applied to a context.
///
/// The same policies serve the reference and the evaluation role. Keeping the
/// two selections disjoint is up to whoever configures them.
#[derive(Clone, Debug, PartialEq)]
pub enum SampleFilter {
    /// Every index of the context.
    All,
    /// The first `length` indices.
    Leading { length: usize },
    /// The last `length` indices.
    Trailing { length: usize },
    /// `start + offset + j * k` for `j = 0, 1, ...`.
    EveryKth { k: usize, offset: usize },
    /// Indices whose value lies in `[min, max]`.
    ValueRange { min: f64, max: f64 },
}

impl SampleFilter {
    pub const POLICIES: [&'static str; 5] = ["all", "leading", "trailing", "every_kth", "value_range"];

    pub fn name(&self) -> &'static str {
        match self {
            SampleFilter::All => "all",
            SampleFilter::Leading { .. } => "leading",
            SampleFilter::Trailing { .. } => "trailing",
            SampleFilter::EveryKth { .. } => "every_kth",
            SampleFilter::ValueRange { .. } => "value_range",
        }
    }

    pub fn select(&self, ctx: Context, series: &TimeSeries<'_>) -> Sample {
        let indices: Vec<usize> = match *self {
            SampleFilter::All => ctx.range().collect(),
            SampleFilter::Leading { length } => {
                let end = ctx.start + length.min(ctx.len());
                (ctx.start..end).collect()
            }
            SampleFilter::Trailing { length } => {
                let start = ctx.end - length.min(ctx.len());
                (start..ctx.end).collect()
            }
            SampleFilter::EveryKth { k, offset } => (ctx.start + offset..ctx.end)
                .step_by(k.max(1))
                .collect(),
            SampleFilter::ValueRange { min, max } => {
                let values = series.values();
                ctx.range()
                    .filter(|&i| values[i] >= min && values[i] <= max)
                    .collect()
            }
        };
        Sample::from_indices(series, indices)
    }

    /// Sample size guaranteed for every context of length `window`, if it does
    /// not depend on the data.
    pub fn guaranteed_len(&self, window: usize) -> Option<usize> {
        match *self {
            SampleFilter::All => Some(window),
            SampleFilter::Leading { length } | SampleFilter::Trailing { length } => {
                Some(length.min(window))
            }
            SampleFilter::EveryKth { k, offset } => {
                if offset >= window || k == 0 {
                    Some(0)
                } else {
                    Some((window - offset).div_ceil(k))
                }
            }
            SampleFilter::ValueRange { .. } => None,
        }
    }
}
