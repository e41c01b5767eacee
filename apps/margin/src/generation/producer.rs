//! Fragment producer contract — the one external call a generation round makes.
//!
//! Two realizations of the same contract: [`FragmentProducer`] is awaited on the
//! tokio runtime, [`BlockingProducer`] blocks the calling thread. In both the
//! producer call is the only point where a round can suspend.

#![allow(dead_code)]

use async_trait::async_trait;
use thiserror::Error;

use crate::constraints::ConstraintSet;
use crate::llm_client::LlmError;
use crate::tracker::Snapshot;

/// Everything a producer is given for one round.
#[derive(Debug, Clone, Copy)]
pub struct RoundRequest<'a> {
    pub instruction: &'a str,
    /// Text accumulated over all previous rounds.
    pub generated_so_far: &'a str,
    pub snapshot: &'a Snapshot,
    /// The snapshot rendered as a margin panel.
    pub margin: &'a str,
    pub constraints: &'a ConstraintSet,
    /// Token budget for this round. Never zero.
    pub max_tokens: u64,
}

/// One produced fragment. Empty `text` signals end of output.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Fragment {
    pub text: String,
    /// Actual token cost as reported by the producer, if known.
    pub tokens_used: Option<u64>,
}

impl Fragment {
    pub fn new(text: impl Into<String>, tokens_used: Option<u64>) -> Self {
        Self {
            text: text.into(),
            tokens_used,
        }
    }

    pub fn end_of_output() -> Self {
        Self::default()
    }
}

#[derive(Debug, Error)]
pub enum ProducerError {
    #[error("LLM error: {0}")]
    Llm(#[from] LlmError),

    #[error("Producer unavailable: {0}")]
    Unavailable(String),
}

/// Awaitable producer. Carried as `Arc<dyn FragmentProducer>` in the app state.
#[async_trait]
pub trait FragmentProducer: Send + Sync {
    async fn produce(&self, request: &RoundRequest<'_>) -> Result<Fragment, ProducerError>;
}

/// Thread-blocking producer.
pub trait BlockingProducer {
    fn produce(&mut self, request: &RoundRequest<'_>) -> Result<Fragment, ProducerError>;
}

impl<F> BlockingProducer for F
where
    F: FnMut(&RoundRequest<'_>) -> Result<Fragment, ProducerError>,
{
    fn produce(&mut self, request: &RoundRequest<'_>) -> Result<Fragment, ProducerError> {
        self(request)
    }
}
