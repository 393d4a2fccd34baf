use tracing::debug;

use super::EntityProcessor;
use crate::errors::{PipelineError, ProcessorError};
use crate::lifecycle::{close_component, initialise_component};
use entity_indexer_shared::{EntityRecord, FieldValue, SCORE_FIELD};

/// Ordered list of processors applied one after the other.
///
/// The chain guards the record ID and the [`SCORE_FIELD`]: a processor that
/// changes the ID fails the record, changes to the score field are reverted.
#[derive(Default)]
pub struct ProcessorChain {
    processors: Vec<Box<dyn EntityProcessor>>,
    closed: bool,
}

impl ProcessorChain {
    pub fn new(processors: Vec<Box<dyn EntityProcessor>>) -> Self {
        Self {
            processors,
            closed: false,
        }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn with(mut self, processor: impl EntityProcessor + 'static) -> Self {
        self.processors.push(Box::new(processor));
        self
    }

    pub fn len(&self) -> usize {
        self.processors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.processors.is_empty()
    }

    pub fn names(&self) -> Vec<&str> {
        self.processors.iter().map(|p| p.name()).collect()
    }

    /// Run the record through every processor in order.
    pub fn process(&self, mut record: EntityRecord) -> Result<EntityRecord, ProcessorError> {
        if self.processors.is_empty() {
            return Ok(record);
        }
        let id = record.id().to_string();
        let score: Vec<FieldValue> = record.get(SCORE_FIELD).to_vec();

        for processor in &self.processors {
            record = processor.process(record)?;
            if record.id() != id {
                return Err(ProcessorError::IdChanged {
                    processor: processor.name().to_string(),
                    expected: id,
                    actual: record.id().to_string(),
                });
            }
            if record.get(SCORE_FIELD) != score.as_slice() {
                debug!(
                    processor = %processor.name(),
                    entity_id = %id,
                    "Restoring score field changed by processor"
                );
                record.set_values(SCORE_FIELD, score.clone());
            }
        }
        Ok(record)
    }

    pub(crate) async fn initialise(&mut self) -> Result<(), PipelineError> {
        for processor in &mut self.processors {
            initialise_component(processor.as_mut()).await?;
        }
        Ok(())
    }

    /// Close all processors once; later calls do nothing.
    pub(crate) async fn close(&mut self) {
        if self.closed {
            return;
        }
        for processor in &mut self.processors {
            close_component(processor.as_mut()).await;
        }
        self.closed = true;
    }
}
