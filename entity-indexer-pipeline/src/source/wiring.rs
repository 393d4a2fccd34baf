//! Selection of the ingestion mode from the configured source components.

use std::fmt;

use tracing::info;

use super::{
    EntityDataIterator, EntityDataProvider, EntityIterator, EntityIteratorScoreProvider,
    EntityScoreProvider,
};
use crate::errors::PipelineError;
use crate::lifecycle::{close_component, initialise_component};

/// How entities are pulled from the source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceMode {
    /// Records are iterated; scores come from a score provider.
    DataIterating,
    /// `(id, score)` pairs are iterated; records come from a data provider.
    IdIterating,
    /// Records are iterated; scores come from a drained entity iterator.
    Adapted,
}

impl fmt::Display for SourceMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::DataIterating => "data-iterating",
            Self::IdIterating => "id-iterating",
            Self::Adapted => "data-iterating (adapted entity iterator)",
        };
        f.write_str(name)
    }
}

/// The source components named by a job configuration, before wiring.
#[derive(Default)]
pub struct SourceComponents {
    pub data_iterator: Option<Box<dyn EntityDataIterator>>,
    pub score_provider: Option<Box<dyn EntityScoreProvider>>,
    pub entity_iterator: Option<Box<dyn EntityIterator>>,
    pub data_provider: Option<Box<dyn EntityDataProvider>>,
}

impl SourceComponents {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_data_iterator(mut self, iterator: Box<dyn EntityDataIterator>) -> Self {
        self.data_iterator = Some(iterator);
        self
    }

    pub fn with_score_provider(mut self, provider: Box<dyn EntityScoreProvider>) -> Self {
        self.score_provider = Some(provider);
        self
    }

    pub fn with_entity_iterator(mut self, iterator: Box<dyn EntityIterator>) -> Self {
        self.entity_iterator = Some(iterator);
        self
    }

    pub fn with_data_provider(mut self, provider: Box<dyn EntityDataProvider>) -> Self {
        self.data_provider = Some(provider);
        self
    }

    fn describe(&self) -> String {
        let present: Vec<&str> = [
            ("data iterator", self.data_iterator.is_some()),
            ("score provider", self.score_provider.is_some()),
            ("entity iterator", self.entity_iterator.is_some()),
            ("data provider", self.data_provider.is_some()),
        ]
        .into_iter()
        .filter_map(|(name, set)| set.then_some(name))
        .collect();
        if present.is_empty() {
            "none".to_string()
        } else {
            present.join(", ")
        }
    }
}

/// A fully wired entity source.
pub enum EntitySource {
    DataIterating {
        iterator: Box<dyn EntityDataIterator>,
        scores: Box<dyn EntityScoreProvider>,
    },
    IdIterating {
        iterator: Box<dyn EntityIterator>,
        data: Box<dyn EntityDataProvider>,
    },
    Adapted {
        iterator: Box<dyn EntityDataIterator>,
        scores: EntityIteratorScoreProvider,
    },
}

impl EntitySource {
    pub fn data_iterating(
        iterator: Box<dyn EntityDataIterator>,
        scores: Box<dyn EntityScoreProvider>,
    ) -> Self {
        Self::DataIterating { iterator, scores }
    }

    pub fn id_iterating(iterator: Box<dyn EntityIterator>, data: Box<dyn EntityDataProvider>) -> Self {
        Self::IdIterating { iterator, data }
    }

    /// Pair a data iterator with an entity iterator used only for its scores.
    pub fn adapted(iterator: Box<dyn EntityDataIterator>, scores: Box<dyn EntityIterator>) -> Self {
        Self::Adapted {
            iterator,
            scores: EntityIteratorScoreProvider::new(scores),
        }
    }

    /// Derive the single valid wiring from the configured components.
    ///
    /// Accepted combinations are data iterator + score provider, entity
    /// iterator + data provider, and data iterator + entity iterator. Anything
    /// else, including a valid pair with leftover components, is rejected.
    pub fn resolve(components: SourceComponents) -> Result<Self, PipelineError> {
        let described = components.describe();
        let source = match components {
            SourceComponents {
                data_iterator: Some(iterator),
                score_provider: Some(scores),
                entity_iterator: None,
                data_provider: None,
            } => Self::data_iterating(iterator, scores),
            SourceComponents {
                data_iterator: None,
                score_provider: None,
                entity_iterator: Some(iterator),
                data_provider: Some(data),
            } => Self::id_iterating(iterator, data),
            SourceComponents {
                data_iterator: Some(iterator),
                score_provider: None,
                entity_iterator: Some(scores),
                data_provider: None,
            } => Self::adapted(iterator, scores),
            _ => {
                return Err(PipelineError::configuration(format!(
                    "cannot derive an entity source from the configured components ({}); \
                     expected data iterator + score provider, entity iterator + data provider \
                     or data iterator + entity iterator",
                    described
                )))
            }
        };
        info!(mode = %source.mode(), "Resolved entity source");
        Ok(source)
    }

    pub fn mode(&self) -> SourceMode {
        match self {
            Self::DataIterating { .. } => SourceMode::DataIterating,
            Self::IdIterating { .. } => SourceMode::IdIterating,
            Self::Adapted { .. } => SourceMode::Adapted,
        }
    }

    /// Initialise every source component that asks for it.
    ///
    /// Returns the name of the failing component with the error.
    pub(crate) async fn initialise(&mut self) -> Result<(), PipelineError> {
        match self {
            Self::DataIterating { iterator, scores } => {
                initialise_component(iterator.as_mut()).await?;
                initialise_component(scores.as_mut()).await
            }
            Self::IdIterating { iterator, data } => {
                initialise_component(iterator.as_mut()).await?;
                initialise_component(data.as_mut()).await
            }
            Self::Adapted { iterator, scores } => {
                initialise_component(iterator.as_mut()).await?;
                initialise_component(scores).await
            }
        }
    }

    /// Close every source component. Errors are logged.
    pub(crate) async fn close(&mut self) {
        match self {
            Self::DataIterating { iterator, scores } => {
                close_component(iterator.as_mut()).await;
                close_component(scores.as_mut()).await;
            }
            Self::IdIterating { iterator, data } => {
                close_component(iterator.as_mut()).await;
                close_component(data.as_mut()).await;
            }
            Self::Adapted { iterator, scores } => {
                close_component(iterator.as_mut()).await;
                close_component(scores).await;
            }
        }
    }
}
