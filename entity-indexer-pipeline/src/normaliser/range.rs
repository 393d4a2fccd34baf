use entity_indexer_shared::{ComponentConfig, ComponentError, IndexingComponent};

use super::ScoreNormaliser;

pub const PARAM_MAX: &str = "max";
pub const PARAM_MAX_EXPECTED: &str = "max-expected";
pub const DEFAULT_MAX: f64 = 1.0;

/// Linear rescale of non-negative scores into `[0, max]`.
///
/// With a configured `max_expected` a score is mapped to
/// `score / max_expected * max` and larger scores are clamped to `max`.
/// Without it the largest score seen so far is used instead, so the first
/// score always maps to `max`.
///
/// The calibrating form depends on the order in which scores arrive: the same
/// score is mapped differently before and after a larger one has been seen, and
/// re-running a job over a reordered source changes the indexed values. Set
/// `max-expected` whenever scores must be reproducible across runs.
#[derive(Debug, Clone)]
pub struct RangeNormaliser {
    max: f64,
    max_expected: Option<f64>,
    observed_max: Option<f64>,
}

impl RangeNormaliser {
    pub fn new(max: f64) -> Self {
        Self {
            max,
            max_expected: None,
            observed_max: None,
        }
    }

    pub fn with_max_expected(mut self, max_expected: f64) -> Self {
        self.max_expected = Some(max_expected);
        self
    }

    pub fn max(&self) -> f64 {
        self.max
    }

    fn upper_bound(&mut self, score: f64) -> f64 {
        match self.max_expected {
            Some(expected) => expected,
            None => {
                let upper = self.observed_max.map_or(score, |seen| seen.max(score));
                self.observed_max = Some(upper);
                upper
            }
        }
    }
}

impl Default for RangeNormaliser {
    fn default() -> Self {
        Self::new(DEFAULT_MAX)
    }
}

impl IndexingComponent for RangeNormaliser {
    fn name(&self) -> &str {
        "RangeNormaliser"
    }

    fn configure(&mut self, config: &ComponentConfig) -> Result<(), ComponentError> {
        if let Some(max) = config.get_f64(PARAM_MAX)? {
            if max <= 0.0 {
                return Err(ComponentError::invalid(PARAM_MAX, "must be greater than 0"));
            }
            self.max = max;
        }
        if let Some(expected) = config.get_f64(PARAM_MAX_EXPECTED)? {
            if expected <= 0.0 {
                return Err(ComponentError::invalid(
                    PARAM_MAX_EXPECTED,
                    "must be greater than 0",
                ));
            }
            self.max_expected = Some(expected);
        }
        Ok(())
    }
}

impl ScoreNormaliser for RangeNormaliser {
    fn normalise(&mut self, score: Option<f64>) -> Option<f64> {
        let score = score?;
        if score < 0.0 {
            return Some(score);
        }
        let upper = self.upper_bound(score);
        if upper <= 0.0 {
            return Some(0.0);
        }
        Some((score / upper).min(1.0) * self.max)
    }
}
