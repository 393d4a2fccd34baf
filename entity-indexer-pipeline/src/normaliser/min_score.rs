use entity_indexer_shared::{ComponentConfig, ComponentError, IndexingComponent};

use super::ScoreNormaliser;

pub const PARAM_MIN: &str = "min";
pub const PARAM_INCLUSIVE: &str = "inclusive";

/// Marks scores below a threshold as excluded (`-1.0`).
///
/// With `inclusive` (the default) a score equal to `min` is kept.
#[derive(Debug, Clone)]
pub struct MinScoreNormaliser {
    min: f64,
    inclusive: bool,
}

impl MinScoreNormaliser {
    pub fn new(min: f64) -> Self {
        Self {
            min,
            inclusive: true,
        }
    }

    pub fn exclusive(mut self) -> Self {
        self.inclusive = false;
        self
    }
}

impl Default for MinScoreNormaliser {
    fn default() -> Self {
        Self::new(0.0)
    }
}

impl IndexingComponent for MinScoreNormaliser {
    fn name(&self) -> &str {
        "MinScoreNormaliser"
    }

    fn configure(&mut self, config: &ComponentConfig) -> Result<(), ComponentError> {
        if let Some(min) = config.get_f64(PARAM_MIN)? {
            self.min = min;
        } else {
            return Err(ComponentError::missing(PARAM_MIN));
        }
        if let Some(inclusive) = config.get_bool(PARAM_INCLUSIVE)? {
            self.inclusive = inclusive;
        }
        Ok(())
    }
}

impl ScoreNormaliser for MinScoreNormaliser {
    fn normalise(&mut self, score: Option<f64>) -> Option<f64> {
        let score = score?;
        if score < 0.0 {
            return Some(score);
        }
        let excluded = if self.inclusive {
            score < self.min
        } else {
            score <= self.min
        };
        Some(if excluded { -1.0 } else { score })
    }
}
