use entity_indexer_shared::IndexingComponent;

use super::ScoreNormaliser;

/// `ln(1 + score)` for non-negative scores.
#[derive(Debug, Default, Clone, Copy)]
pub struct NaturalLogNormaliser;

impl IndexingComponent for NaturalLogNormaliser {
    fn name(&self) -> &str {
        "NaturalLogNormaliser"
    }
}

impl ScoreNormaliser for NaturalLogNormaliser {
    fn normalise(&mut self, score: Option<f64>) -> Option<f64> {
        score.map(|s| if s < 0.0 { s } else { s.ln_1p() })
    }
}
