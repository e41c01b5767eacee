use std::sync::Arc;

use crate::config::Config;
use crate::generation::FragmentProducer;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    /// Producer used by `/api/v1/generate`. Default: the Claude-backed `LlmProducer`.
    pub producer: Arc<dyn FragmentProducer>,
}
