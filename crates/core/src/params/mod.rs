use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::{MandalaError, PatternSpec, RandomSource, Result};

/// Upper limits on sampled counts, matching the interactive sliders.
pub const MAX_LINE_COUNT: u32 = 10;
pub const MAX_CURVE_POINTS: u32 = 10;
pub const MAX_RADIAL_REPETITIONS: u32 = 20;

/// Inclusive `[min, max]` range a count is sampled from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CountRange {
    pub min: u32,
    pub max: u32,
}

impl CountRange {
    pub const fn new(min: u32, max: u32) -> Self {
        Self { min, max }
    }

    pub const fn fixed(value: u32) -> Self {
        Self::new(value, value)
    }

    pub fn validate(&self, name: &str, limit: u32) -> Result<()> {
        if self.min > self.max {
            return Err(MandalaError::bounds(name, self.min as f64, self.max as f64));
        }
        if self.max > limit {
            return Err(MandalaError::CountLimit {
                name: name.to_string(),
                max: self.max,
                limit,
            });
        }
        Ok(())
    }

    pub fn sample(&self, rng: &mut RandomSource) -> Result<u32> {
        rng.int_between(self.min, self.max)
    }
}

/// Working parameters of the generator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Parameters {
    pub line_count: CountRange,
    pub curve_points: CountRange,
    pub radial_repetitions: CountRange,
    pub do_fill: bool,
    pub animation_time_ms: u64,
}

impl Default for Parameters {
    fn default() -> Self {
        Self {
            line_count: CountRange::new(2, 3),
            curve_points: CountRange::new(2, 3),
            radial_repetitions: CountRange::new(3, 7),
            do_fill: false,
            animation_time_ms: 10_000,
        }
    }
}

impl Parameters {
    pub fn validate(&self) -> Result<()> {
        self.line_count.validate("line count", MAX_LINE_COUNT)?;
        self.curve_points.validate("curve points", MAX_CURVE_POINTS)?;
        self.radial_repetitions
            .validate("radial repetitions", MAX_RADIAL_REPETITIONS)?;
        Ok(())
    }

    pub fn animation_time(&self) -> Duration {
        Duration::from_millis(self.animation_time_ms)
    }

    /// Copy of `self` with every key present in `update` overwritten.
    pub fn merged(&self, update: &ParameterUpdate) -> Self {
        let mut next = self.clone();
        let merge = |range: &mut CountRange, min: Option<u32>, max: Option<u32>| {
            if let Some(min) = min {
                range.min = min;
            }
            if let Some(max) = max {
                range.max = max;
            }
        };
        merge(&mut next.line_count, update.line_count_min, update.line_count_max);
        merge(&mut next.curve_points, update.curve_points_min, update.curve_points_max);
        merge(
            &mut next.radial_repetitions,
            update.radial_repetitions_min,
            update.radial_repetitions_max,
        );
        if let Some(do_fill) = update.do_fill {
            next.do_fill = do_fill;
        }
        if let Some(ms) = update.animation_time_ms {
            next.animation_time_ms = ms;
        }
        next
    }
}

/// Partial parameter change; absent keys keep their previous value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParameterUpdate {
    pub line_count_min: Option<u32>,
    pub line_count_max: Option<u32>,
    pub curve_points_min: Option<u32>,
    pub curve_points_max: Option<u32>,
    pub radial_repetitions_min: Option<u32>,
    pub radial_repetitions_max: Option<u32>,
    pub do_fill: Option<bool>,
    pub animation_time_ms: Option<u64>,
}

impl ParameterUpdate {
    /// Later keys win over earlier ones.
    pub fn then(self, later: ParameterUpdate) -> Self {
        Self {
            line_count_min: later.line_count_min.or(self.line_count_min),
            line_count_max: later.line_count_max.or(self.line_count_max),
            curve_points_min: later.curve_points_min.or(self.curve_points_min),
            curve_points_max: later.curve_points_max.or(self.curve_points_max),
            radial_repetitions_min: later.radial_repetitions_min.or(self.radial_repetitions_min),
            radial_repetitions_max: later.radial_repetitions_max.or(self.radial_repetitions_max),
            do_fill: later.do_fill.or(self.do_fill),
            animation_time_ms: later.animation_time_ms.or(self.animation_time_ms),
        }
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// Current parameters plus the counts sampled for the pattern on screen.
#[derive(Debug, Clone, Default)]
pub struct ParameterModel {
    params: Parameters,
    current: Option<PatternSpec>,
}

impl ParameterModel {
    pub fn new(params: Parameters) -> Result<Self> {
        params.validate()?;
        Ok(Self {
            params,
            current: None,
        })
    }

    pub fn parameters(&self) -> &Parameters {
        &self.params
    }

    /// Counts drawn by the last [`ParameterModel::sample`].
    pub fn current(&self) -> Option<&PatternSpec> {
        self.current.as_ref()
    }

    /// Merges `update` into the parameters. An update that would leave any
    /// range inverted is rejected and nothing changes.
    pub fn set_parameters(&mut self, update: &ParameterUpdate) -> Result<()> {
        let next = self.params.merged(update);
        next.validate()?;
        self.params = next;
        Ok(())
    }

    /// Draws fresh counts from every range.
    pub fn sample(&mut self, rng: &mut RandomSource) -> Result<PatternSpec> {
        let spec = PatternSpec {
            curve_points: self.params.curve_points.sample(rng)?,
            radial_repetitions: self.params.radial_repetitions.sample(rng)?,
            line_count: self.params.line_count.sample(rng)?,
            do_fill: self.params.do_fill,
        };
        self.current = Some(spec);
        Ok(spec)
    }
}
