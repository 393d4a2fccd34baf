//! Score normalisers.
//!
//! A normaliser maps an optional raw score to an optional normalised score.
//! Normalisers are combined into a [`NormaliserChain`]: every link holds the
//! links listed after it as its successor and evaluates that successor first,
//! so the chain `[Range, NaturalLog]` computes `range(log1p(raw))`.
//!
//! Negative scores mark an entity as excluded; every built-in normaliser
//! passes them through unchanged. `None` always stays `None`.

mod min_score;
mod natural_log;
mod range;

use entity_indexer_shared::IndexingComponent;

pub use min_score::MinScoreNormaliser;
pub use natural_log::NaturalLogNormaliser;
pub use range::RangeNormaliser;

/// A single score transform.
pub trait ScoreNormaliser: IndexingComponent {
    /// Normalise one score. Takes `&mut self` so links may calibrate on the
    /// scores they have seen.
    fn normalise(&mut self, score: Option<f64>) -> Option<f64>;
}

/// Identity normaliser.
#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultNormaliser;

impl IndexingComponent for DefaultNormaliser {
    fn name(&self) -> &str {
        "DefaultNormaliser"
    }
}

impl ScoreNormaliser for DefaultNormaliser {
    fn normalise(&mut self, score: Option<f64>) -> Option<f64> {
        score
    }
}

/// Ordered chain of normalisers, outermost link first.
#[derive(Default)]
pub struct NormaliserChain {
    links: Vec<Box<dyn ScoreNormaliser>>,
}

impl NormaliserChain {
    /// The empty chain, which returns every score unchanged.
    pub fn identity() -> Self {
        Self::default()
    }

    /// Build a chain from links in configuration order.
    pub fn new(links: Vec<Box<dyn ScoreNormaliser>>) -> Self {
        Self { links }
    }

    /// Append a link. It becomes the innermost link and is evaluated first.
    pub fn with(mut self, link: impl ScoreNormaliser + 'static) -> Self {
        self.links.push(Box::new(link));
        self
    }

    pub fn len(&self) -> usize {
        self.links.len()
    }

    pub fn is_empty(&self) -> bool {
        self.links.is_empty()
    }

    /// Names of the links in configuration order.
    pub fn names(&self) -> Vec<&str> {
        self.links.iter().map(|link| link.name()).collect()
    }

    /// Run the score through the chain, innermost link first.
    pub fn normalise(&mut self, score: Option<f64>) -> Option<f64> {
        self.links
            .iter_mut()
            .rev()
            .fold(score, |score, link| link.normalise(score))
    }
}

impl std::fmt::Debug for NormaliserChain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.names()).finish()
    }
}
