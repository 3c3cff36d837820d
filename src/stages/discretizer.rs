use std::str::FromStr;

use crate::error::{ScoringError, ScoringResult};
use crate::stages::representation::Features;

pub(crate) const SECTION: &str = "discretization";
pub(crate) const DEFAULT_BINS: usize = 10;
pub(crate) const DEFAULT_MARGIN: f64 = 0.25;

/// Largest accepted bin count; histograms are allocated per context.
pub const MAX_BINS: usize = 1 << 16;

/// How bin boundaries are placed over the reference values.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Binning {
    #[default]
    EqualWidth,
    EqualFrequency,
}

impl FromStr for Binning {
    type Err = ScoringError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "equal_width" => Ok(Binning::EqualWidth),
            "equal_frequency" => Ok(Binning::EqualFrequency),
            other => Err(ScoringError::configuration(
                SECTION,
                format!("unknown method '{other}' (expected equal_width or equal_frequency)"),
            )),
        }
    }
}

/// Bins assigned to the tied reference elements sharing one value, in original order.
#[derive(Clone, Debug, PartialEq)]
struct Level {
    value: f64,
    bins: Vec<usize>,
}

#[derive(Clone, Debug, PartialEq)]
enum Boundaries {
    EqualWidth { lower: f64, upper: f64 },
    EqualFrequency { levels: Vec<Level> },
}

/// Bin boundaries fitted on one reference, plus that reference's own histogram.
///
/// Immutable once fitted; applying it never changes it.
#[derive(Clone, Debug, PartialEq)]
pub struct DiscretizationModel {
    bins: usize,
    boundaries: Boundaries,
    reference_counts: Vec<usize>,
}

impl DiscretizationModel {
    pub fn bins(&self) -> usize {
        self.bins
    }

    /// Per-bin counts of the reference discretized against this model.
    pub fn reference_counts(&self) -> &[usize] {
        &self.reference_counts
    }

    /// Fitted `[lower, upper]` range of the reference values.
    pub fn range(&self) -> (f64, f64) {
        match &self.boundaries {
            Boundaries::EqualWidth { lower, upper } => (*lower, *upper),
            Boundaries::EqualFrequency { levels } => (
                levels.first().map_or(0.0, |l| l.value),
                levels.last().map_or(0.0, |l| l.value),
            ),
        }
    }

    fn assign(&self, values: &[f64]) -> Vec<usize> {
        match &self.boundaries {
            Boundaries::EqualWidth { lower, upper } => values
                .iter()
                .map(|&x| equal_width_bin(x, *lower, *upper, self.bins))
                .collect(),
            Boundaries::EqualFrequency { levels } => assign_by_levels(values, levels),
        }
    }
}

fn equal_width_bin(x: f64, lower: f64, upper: f64, bins: usize) -> usize {
    let last = bins - 1;
    let span = upper - lower;
    if span <= 0.0 {
        return if x <= lower { 0 } else { last };
    }
    let pos = ((x - lower) / span * bins as f64).floor();
    if pos <= 0.0 {
        0
    } else {
        (pos as usize).min(last)
    }
}

fn assign_by_levels(values: &[f64], levels: &[Level]) -> Vec<usize> {
    // exact matches first, so tied occurrences can be spread in order
    let exact: Vec<Option<usize>> = values
        .iter()
        .map(|&x| {
            let p = levels.partition_point(|l| l.value < x);
            (p < levels.len() && levels[p].value == x).then_some(p)
        })
        .collect();

    let mut totals = vec![0usize; levels.len()];
    for level in exact.iter().flatten() {
        totals[*level] += 1;
    }

    let mut seen = vec![0usize; levels.len()];
    values
        .iter()
        .zip(exact)
        .map(|(&x, hit)| match hit {
            Some(level) => {
                let tied = &levels[level].bins;
                let j = seen[level];
                seen[level] += 1;
                tied[j * tied.len() / totals[level]]
            }
            None => nearest_level_bin(x, levels),
        })
        .collect()
}

fn nearest_level_bin(x: f64, levels: &[Level]) -> usize {
    let p = levels.partition_point(|l| l.value < x);
    if p == 0 {
        return levels[0].bins[0];
    }
    let below = &levels[p - 1];
    let below_bin = below.bins[below.bins.len() - 1];
    if p == levels.len() {
        return below_bin;
    }
    let above = &levels[p];
    if x - below.value <= above.value - x {
        below_bin
    } else {
        above.bins[0]
    }
}

/// Discrete symbols for one feature vector.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Symbols {
    bins: usize,
    symbols: Vec<usize>,
}

impl Symbols {
    pub fn bins(&self) -> usize {
        self.bins
    }

    pub fn as_slice(&self) -> &[usize] {
        &self.symbols
    }

    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }

    pub fn counts(&self) -> Vec<usize> {
        bin_counts(&self.symbols, self.bins)
    }
}

fn bin_counts(symbols: &[usize], bins: usize) -> Vec<usize> {
    let mut counts = vec![0usize; bins];
    for &s in symbols {
        counts[s] += 1;
    }
    counts
}

/// Histogram quantizer: fitted on reference features, applied read-only to others.
///
/// With equal-width binning the fitted range is the reference `[min, max]`
/// widened by `margin * (max - min)` on both sides. A margin of at least
/// `1 / (bins - 2)` keeps both edge bins empty in the reference, so clamped
/// out-of-range values land in bins the reference never used.
#[derive(Clone, Debug, PartialEq)]
pub struct Discretizer {
    binning: Binning,
    bins: usize,
    min_distinct: usize,
    margin: f64,
}

impl Default for Discretizer {
    fn default() -> Self {
        Discretizer {
            binning: Binning::default(),
            bins: DEFAULT_BINS,
            min_distinct: 1,
            margin: DEFAULT_MARGIN,
        }
    }
}

impl Discretizer {
    pub fn new(
        binning: Binning,
        bins: usize,
        min_distinct: usize,
        margin: f64,
    ) -> ScoringResult<Self> {
        if bins == 0 || bins > MAX_BINS {
            return Err(ScoringError::configuration(
                SECTION,
                format!("bins must be in 1..={MAX_BINS}; got {bins}"),
            ));
        }
        if min_distinct == 0 {
            return Err(ScoringError::configuration(SECTION, "min_distinct must be >= 1"));
        }
        if !margin.is_finite() || margin < 0.0 {
            return Err(ScoringError::configuration(
                SECTION,
                format!("margin must be finite and >= 0; got {margin}"),
            ));
        }
        Ok(Discretizer {
            binning,
            bins,
            min_distinct,
            margin,
        })
    }

    pub fn min_distinct(&self) -> usize {
        self.min_distinct
    }

    pub fn margin(&self) -> f64 {
        self.margin
    }

    pub fn binning(&self) -> Binning {
        self.binning
    }

    pub fn bins(&self) -> usize {
        self.bins
    }

    pub fn fit(&self, reference: &Features) -> ScoringResult<DiscretizationModel> {
        let values = reference.to_vec();
        if values.is_empty() {
            return Err(ScoringError::insufficient_data(
                "cannot fit discretizer on an empty reference",
            ));
        }

        let mut sorted = values.clone();
        sorted.sort_by(f64::total_cmp);
        let mut distinct = sorted.clone();
        distinct.dedup();
        if distinct.len() < self.min_distinct {
            return Err(ScoringError::insufficient_data(format!(
                "reference has {} distinct value(s), at least {} required",
                distinct.len(),
                self.min_distinct
            )));
        }

        let boundaries = match self.binning {
            Binning::EqualWidth => {
                let (min, max) = (sorted[0], sorted[sorted.len() - 1]);
                let pad = (max - min) * self.margin;
                Boundaries::EqualWidth {
                    lower: min - pad,
                    upper: max + pad,
                }
            }
            Binning::EqualFrequency => Boundaries::EqualFrequency {
                levels: rank_levels(&values, self.bins),
            },
        };

        let mut model = DiscretizationModel {
            bins: self.bins,
            boundaries,
            reference_counts: Vec::new(),
        };
        model.reference_counts = bin_counts(&model.assign(&values), self.bins);
        Ok(model)
    }

    /// Maps every feature into a fitted bin; out-of-range values clamp to the edge bins.
    pub fn apply(&self, model: &DiscretizationModel, features: &Features) -> Symbols {
        let symbols = match features.as_slice() {
            Some(values) => model.assign(values),
            None => model.assign(&features.to_vec()),
        };
        Symbols {
            bins: model.bins,
            symbols,
        }
    }
}

/// Equal-frequency ranking; ties keep their original order, so the earlier
/// index gets the lower bin.
fn rank_levels(values: &[f64], bins: usize) -> Vec<Level> {
    let m = values.len();
    let mut order: Vec<usize> = (0..m).collect();
    // stable: equal values stay in index order
    order.sort_by(|&a, &b| values[a].total_cmp(&values[b]));

    let mut levels: Vec<Level> = Vec::new();
    for (rank, &pos) in order.iter().enumerate() {
        let bin = rank * bins / m;
        let value = values[pos];
        match levels.last_mut() {
            Some(level) if level.value == value => level.bins.push(bin),
            _ => levels.push(Level {
                value,
                bins: vec![bin],
            }),
        }
    }
    levels
}
