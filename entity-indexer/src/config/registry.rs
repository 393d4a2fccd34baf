//! Registry mapping component identifiers to constructors.

use std::collections::HashMap;

use tracing::debug;

use crate::config::ComponentSpec;
use crate::IndexingError;
use entity_indexer_pipeline::normaliser::{
    DefaultNormaliser, MinScoreNormaliser, NaturalLogNormaliser, NormaliserChain, RangeNormaliser,
    ScoreNormaliser,
};
use entity_indexer_pipeline::processor::{
    EntityProcessor, FieldFilterProcessor, NamespaceMappingProcessor, ProcessorChain,
    ValueConverterProcessor,
};
use entity_indexer_pipeline::source::{
    EntityDataIterator, EntityDataProvider, EntityIterator, EntityScoreProvider,
    FieldScoreProvider, JsonLinesEntityDataIterator, JsonLinesEntityDataProvider,
    LineBasedEntityIterator,
};
use entity_indexer_repository::{EntityStore, InMemoryStore};
use entity_indexer_shared::{ComponentConfig, IndexingComponent};

/// Separates the links of a normaliser chain definition.
pub const CHAIN_SEPARATOR: char = ';';

type Factory<T> = Box<dyn Fn() -> Box<T> + Send + Sync>;

struct Factories<T: ?Sized> {
    kind: &'static str,
    entries: HashMap<String, Factory<T>>,
}

impl<T: ?Sized + IndexingComponent> Factories<T> {
    fn new(kind: &'static str) -> Self {
        Self {
            kind,
            entries: HashMap::new(),
        }
    }

    fn register(&mut self, name: String, factory: Factory<T>) {
        if self.entries.insert(name.clone(), factory).is_some() {
            debug!(kind = self.kind, component = %name, "Replaced registered component");
        }
    }

    fn build(&self, name: &str, config: &ComponentConfig) -> Result<Box<T>, IndexingError> {
        let factory = self.entries.get(name).ok_or_else(|| {
            IndexingError::config(format!("unknown {} '{}'", self.kind, name))
        })?;
        let mut component = factory();
        component
            .configure(config)
            .map_err(|e| IndexingError::component(name, e))?;
        debug!(kind = self.kind, component = name, "Built component");
        Ok(component)
    }

    fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.entries.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

/// Constructors for every pluggable component, keyed by identifier.
///
/// Components are created with their defaults and then configured from the
/// parameters of the job. Unknown identifiers are configuration errors.
pub struct ComponentRegistry {
    data_iterators: Factories<dyn EntityDataIterator>,
    score_providers: Factories<dyn EntityScoreProvider>,
    entity_iterators: Factories<dyn EntityIterator>,
    data_providers: Factories<dyn EntityDataProvider>,
    normalisers: Factories<dyn ScoreNormaliser>,
    processors: Factories<dyn EntityProcessor>,
    stores: Factories<dyn EntityStore>,
}

impl Default for ComponentRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}

impl ComponentRegistry {
    /// A registry without any component.
    pub fn empty() -> Self {
        Self {
            data_iterators: Factories::new("data iterator"),
            score_providers: Factories::new("score provider"),
            entity_iterators: Factories::new("entity iterator"),
            data_providers: Factories::new("data provider"),
            normalisers: Factories::new("score normaliser"),
            processors: Factories::new("entity processor"),
            stores: Factories::new("entity store"),
        }
    }

    /// A registry with all built-in components.
    pub fn with_defaults() -> Self {
        let mut registry = Self::empty();
        registry
            .register_data_iterator("JsonLinesEntityDataIterator", || {
                Box::new(JsonLinesEntityDataIterator::new(""))
            })
            .register_score_provider("FieldScoreProvider", || {
                Box::new(FieldScoreProvider::default())
            })
            .register_entity_iterator("LineBasedEntityIterator", || {
                Box::new(LineBasedEntityIterator::new(""))
            })
            .register_data_provider("JsonLinesEntityDataProvider", || {
                Box::new(JsonLinesEntityDataProvider::new(""))
            })
            .register_normaliser("DefaultNormaliser", || Box::new(DefaultNormaliser))
            .register_normaliser("RangeNormaliser", || Box::new(RangeNormaliser::default()))
            .register_normaliser("NaturalLogNormaliser", || Box::new(NaturalLogNormaliser))
            .register_normaliser("MinScoreNormaliser", || {
                Box::new(MinScoreNormaliser::default())
            })
            .register_processor("FieldFilterProcessor", || {
                Box::new(FieldFilterProcessor::new())
            })
            .register_processor("NamespaceMappingProcessor", || {
                Box::new(NamespaceMappingProcessor::new())
            })
            .register_processor("ValueConverterProcessor", || {
                Box::new(ValueConverterProcessor::new())
            })
            .register_store("InMemoryStore", || Box::new(InMemoryStore::new()));
        registry
    }

    pub fn register_data_iterator<F>(&mut self, name: impl Into<String>, factory: F) -> &mut Self
    where
        F: Fn() -> Box<dyn EntityDataIterator> + Send + Sync + 'static,
    {
        self.data_iterators.register(name.into(), Box::new(factory));
        self
    }

    pub fn register_score_provider<F>(&mut self, name: impl Into<String>, factory: F) -> &mut Self
    where
        F: Fn() -> Box<dyn EntityScoreProvider> + Send + Sync + 'static,
    {
        self.score_providers.register(name.into(), Box::new(factory));
        self
    }

    pub fn register_entity_iterator<F>(&mut self, name: impl Into<String>, factory: F) -> &mut Self
    where
        F: Fn() -> Box<dyn EntityIterator> + Send + Sync + 'static,
    {
        self.entity_iterators.register(name.into(), Box::new(factory));
        self
    }

    pub fn register_data_provider<F>(&mut self, name: impl Into<String>, factory: F) -> &mut Self
    where
        F: Fn() -> Box<dyn EntityDataProvider> + Send + Sync + 'static,
    {
        self.data_providers.register(name.into(), Box::new(factory));
        self
    }

    pub fn register_normaliser<F>(&mut self, name: impl Into<String>, factory: F) -> &mut Self
    where
        F: Fn() -> Box<dyn ScoreNormaliser> + Send + Sync + 'static,
    {
        self.normalisers.register(name.into(), Box::new(factory));
        self
    }

    pub fn register_processor<F>(&mut self, name: impl Into<String>, factory: F) -> &mut Self
    where
        F: Fn() -> Box<dyn EntityProcessor> + Send + Sync + 'static,
    {
        self.processors.register(name.into(), Box::new(factory));
        self
    }

    pub fn register_store<F>(&mut self, name: impl Into<String>, factory: F) -> &mut Self
    where
        F: Fn() -> Box<dyn EntityStore> + Send + Sync + 'static,
    {
        self.stores.register(name.into(), Box::new(factory));
        self
    }

    pub fn build_data_iterator(
        &self,
        spec: &ComponentSpec,
    ) -> Result<Box<dyn EntityDataIterator>, IndexingError> {
        self.data_iterators.build(&spec.kind, &spec.config())
    }

    pub fn build_score_provider(
        &self,
        spec: &ComponentSpec,
    ) -> Result<Box<dyn EntityScoreProvider>, IndexingError> {
        self.score_providers.build(&spec.kind, &spec.config())
    }

    pub fn build_entity_iterator(
        &self,
        spec: &ComponentSpec,
    ) -> Result<Box<dyn EntityIterator>, IndexingError> {
        self.entity_iterators.build(&spec.kind, &spec.config())
    }

    pub fn build_data_provider(
        &self,
        spec: &ComponentSpec,
    ) -> Result<Box<dyn EntityDataProvider>, IndexingError> {
        self.data_providers.build(&spec.kind, &spec.config())
    }

    pub fn build_store(&self, spec: &ComponentSpec) -> Result<Box<dyn EntityStore>, IndexingError> {
        self.stores.build(&spec.kind, &spec.config())
    }

    /// Build a processor chain, keeping the order of the definitions.
    pub fn build_processors(&self, specs: &[ComponentSpec]) -> Result<ProcessorChain, IndexingError> {
        let processors = specs
            .iter()
            .map(|spec| self.processors.build(&spec.kind, &spec.config()))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(ProcessorChain::new(processors))
    }

    /// Parse a chain definition such as `RangeNormaliser,max:10;NaturalLogNormaliser`.
    ///
    /// Links are listed outermost first, so the last one sees the raw score.
    /// An empty definition yields the identity chain.
    pub fn build_normaliser_chain(&self, definition: &str) -> Result<NormaliserChain, IndexingError> {
        let links = definition
            .split(CHAIN_SEPARATOR)
            .map(str::trim)
            .filter(|entry| !entry.is_empty())
            .map(|entry| {
                let (name, config) = ComponentConfig::parse_entry(entry);
                self.normalisers.build(&name, &config)
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(NormaliserChain::new(links))
    }

    /// Registered normaliser identifiers, sorted.
    pub fn normaliser_names(&self) -> Vec<&str> {
        self.normalisers.names()
    }

    /// Registered processor identifiers, sorted.
    pub fn processor_names(&self) -> Vec<&str> {
        self.processors.names()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use entity_indexer_shared::{ComponentError, EntityRecord};

    #[test]
    fn test_chain_from_definition() {
        let registry = ComponentRegistry::with_defaults();
        let mut chain = registry
            .build_normaliser_chain("RangeNormaliser,max:10;NaturalLogNormaliser")
            .unwrap();

        assert_eq!(chain.names(), vec!["RangeNormaliser", "NaturalLogNormaliser"]);
        assert_eq!(chain.normalise(Some(10_000.0)), Some(10.0));
        assert_eq!(chain.normalise(None), None);
    }

    #[test]
    fn test_chain_with_expected_maximum_is_reproducible() {
        let registry = ComponentRegistry::with_defaults();
        let definition = "RangeNormaliser,max:10,max-expected:1000";

        let mut chain = registry.build_normaliser_chain(definition).unwrap();
        assert_eq!(chain.normalise(Some(500.0)), Some(5.0));
        assert_eq!(chain.normalise(Some(100.0)), Some(1.0));

        let mut reordered = registry.build_normaliser_chain(definition).unwrap();
        assert_eq!(reordered.normalise(Some(100.0)), Some(1.0));
        assert_eq!(reordered.normalise(Some(500.0)), Some(5.0));
    }

    #[test]
    fn test_empty_chain_is_identity() {
        let registry = ComponentRegistry::with_defaults();
        let mut chain = registry.build_normaliser_chain(" ; ").unwrap();
        assert!(chain.is_empty());
        assert_eq!(chain.normalise(Some(-2.5)), Some(-2.5));
    }

    #[test]
    fn test_unknown_identifier() {
        let registry = ComponentRegistry::with_defaults();
        let err = registry
            .build_normaliser_chain("RangeNormaliser;SquareRootNormaliser")
            .unwrap_err();
        assert!(matches!(err, IndexingError::ConfigError(msg) if msg.contains("SquareRootNormaliser")));

        assert!(matches!(
            registry.build_store(&ComponentSpec::new("OpenSearchStore")),
            Err(IndexingError::ConfigError(_))
        ));
    }

    #[test]
    fn test_invalid_parameters_fail_when_built() {
        let registry = ComponentRegistry::with_defaults();
        let err = registry
            .build_normaliser_chain("RangeNormaliser,max:ten")
            .unwrap_err();
        assert!(matches!(
            err,
            IndexingError::ComponentError {
                source: ComponentError::InvalidParameter { .. },
                ..
            }
        ));

        assert!(matches!(
            registry.build_data_iterator(&ComponentSpec::new("JsonLinesEntityDataIterator")),
            Err(IndexingError::ComponentError {
                source: ComponentError::MissingParameter(_),
                ..
            })
        ));
    }

    #[test]
    fn test_processors_keep_definition_order() {
        let registry = ComponentRegistry::with_defaults();
        let chain = registry
            .build_processors(&[
                ComponentSpec::new("NamespaceMappingProcessor").with_param("mappings", "dbp:=dbpedia:"),
                ComponentSpec::new("FieldFilterProcessor").with_param("exclude", "raw*"),
            ])
            .unwrap();
        assert_eq!(
            chain.names(),
            vec!["NamespaceMappingProcessor", "FieldFilterProcessor"]
        );

        let record = chain
            .process(
                EntityRecord::new("urn:a")
                    .with_value("dbp:label", "A")
                    .with_value("raw-score", 3.0),
            )
            .unwrap();
        assert!(record.contains("dbpedia:label"));
        assert!(!record.contains("raw-score"));
    }

    #[test]
    fn test_custom_components() {
        struct Halve;

        impl IndexingComponent for Halve {}

        impl ScoreNormaliser for Halve {
            fn normalise(&mut self, score: Option<f64>) -> Option<f64> {
                score.map(|s| s / 2.0)
            }
        }

        let mut registry = ComponentRegistry::empty();
        registry.register_normaliser("Halve", || Box::new(Halve));
        assert_eq!(registry.normaliser_names(), vec!["Halve"]);
        assert!(registry.processor_names().is_empty());

        let mut chain = registry.build_normaliser_chain("Halve;Halve").unwrap();
        assert_eq!(chain.normalise(Some(8.0)), Some(2.0));
    }
}
