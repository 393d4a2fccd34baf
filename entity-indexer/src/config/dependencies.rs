//! Dependency initialization and wiring for the entity indexer.

use std::env;

use tracing::{error, info};

use crate::config::{ComponentRegistry, IndexingJobConfig};
use crate::IndexingError;
use entity_indexer_pipeline::normaliser::NormaliserChain;
use entity_indexer_pipeline::source::{EntitySource, SourceComponents};
use entity_indexer_pipeline::{Indexer, IndexerConfig, IndexingStats, PipelineError};
use entity_indexer_repository::{DestinationConfig, IndexingDestination};

/// Default location of the job definition.
pub const DEFAULT_CONFIG_PATH: &str = "indexing/config.json";

/// Environment variable overriding [`DEFAULT_CONFIG_PATH`].
pub const CONFIG_PATH_VAR: &str = "INDEXING_CONFIG";

/// Container for all initialized dependencies.
pub struct Dependencies {
    /// The assembled indexer, ready to run.
    pub indexer: Indexer,
    skip_indexing: bool,
    skip_post_processing: bool,
}

impl Dependencies {
    /// Assemble the job named by the environment with the built-in components.
    ///
    /// # Environment Variables
    ///
    /// - `INDEXING_CONFIG`: path of the JSON job definition (default: indexing/config.json)
    pub fn from_env() -> Result<Self, IndexingError> {
        let path = env::var(CONFIG_PATH_VAR).unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
        info!(config = %path, "Loading indexing job");

        let job = IndexingJobConfig::from_file(&path)?;
        Self::from_config(&job, &ComponentRegistry::with_defaults())
    }

    /// Assemble a job, resolving component identifiers through the registry.
    ///
    /// Every component is created and configured here, so misconfiguration is
    /// reported before anything is initialised.
    pub fn from_config(
        job: &IndexingJobConfig,
        registry: &ComponentRegistry,
    ) -> Result<Self, IndexingError> {
        let mut components = SourceComponents::new();
        if let Some(spec) = &job.data_iterator {
            components = components.with_data_iterator(registry.build_data_iterator(spec)?);
        }
        if let Some(spec) = &job.score_provider {
            components = components.with_score_provider(registry.build_score_provider(spec)?);
        }
        if let Some(spec) = &job.entity_iterator {
            components = components.with_entity_iterator(registry.build_entity_iterator(spec)?);
        }
        if let Some(spec) = &job.data_provider {
            components = components.with_data_provider(registry.build_data_provider(spec)?);
        }
        let source = EntitySource::resolve(components)?;

        let normaliser = match &job.score_normaliser {
            Some(definition) => registry.build_normaliser_chain(definition)?,
            None => NormaliserChain::identity(),
        };
        let processors = registry.build_processors(&job.processors)?;
        let post_processors = registry.build_processors(&job.post_processors)?;

        let destination_config = match job.max_batch_size {
            Some(max) => DestinationConfig::with_max_batch_size(max),
            None => DestinationConfig::default(),
        };
        let destination =
            IndexingDestination::with_config(registry.build_store(&job.destination)?, destination_config);

        let mut config = IndexerConfig::default().with_index_all_entities(job.index_all_entities);
        if let Some(chunk_size) = job.chunk_size {
            config = config.with_chunk_size(chunk_size);
        }
        if let Some(path) = &job.ledger_path {
            config = config.with_ledger_path(path.clone());
        }

        info!(
            job = %job.name,
            mode = %source.mode(),
            normalisers = ?normaliser,
            processors = ?processors.names(),
            post_processors = ?post_processors.names(),
            store = %job.destination.kind,
            "Assembled indexing job"
        );

        let indexer = Indexer::with_config(job.name.clone(), source, destination, config)
            .with_normaliser(normaliser)
            .with_processors(processors)
            .with_post_processors(post_processors);

        Ok(Self {
            indexer,
            skip_indexing: job.skip_indexing,
            skip_post_processing: job.skip_post_processing,
        })
    }

    /// Run every phase of the job and release its components.
    pub async fn run(&mut self) -> Result<IndexingStats, IndexingError> {
        if let Err(e) = self.run_phases().await {
            error!(
                job = %self.indexer.name(),
                state = %self.indexer.state(),
                error = %e,
                "Indexing job failed"
            );
            self.indexer.close().await;
            return Err(e.into());
        }
        Ok(self.indexer.stats())
    }

    async fn run_phases(&mut self) -> Result<(), PipelineError> {
        if !self.skip_indexing && !self.skip_post_processing {
            return self.indexer.index().await;
        }

        self.indexer.initialise_indexing().await?;
        if self.skip_indexing {
            self.indexer.skip_index_entities().await?;
        } else {
            self.indexer.index_entities().await?;
        }
        if self.skip_post_processing {
            self.indexer.skip_post_process_entities().await?;
        } else {
            self.indexer.post_process_entities().await?;
        }
        self.indexer.finalise_indexing().await
    }
}
