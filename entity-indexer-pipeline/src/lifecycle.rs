//! Helpers driving the lifecycle hooks of pipeline components.

use tracing::{debug, warn};

use crate::errors::PipelineError;
use entity_indexer_shared::IndexingComponent;

/// Initialise the component if it asks for it.
pub(crate) async fn initialise_component<C>(component: &mut C) -> Result<(), PipelineError>
where
    C: IndexingComponent + ?Sized,
{
    if !component.needs_initialisation() {
        return Ok(());
    }
    let name = component.name().to_string();
    debug!(component = %name, "Initialising component");
    component
        .initialise()
        .await
        .map_err(|e| PipelineError::component(name, e))
}

/// Close the component, logging instead of propagating failures.
pub(crate) async fn close_component<C>(component: &mut C)
where
    C: IndexingComponent + ?Sized,
{
    if let Err(e) = component.close().await {
        warn!(component = %component.name(), error = %e, "Failed to close component");
    }
}
