// Generation loop: producer contracts, the session state machine and its
// sync/async drivers, and the Claude-backed producer used by the HTTP API.

pub mod llm_producer;
pub mod producer;
pub mod prompts;
pub mod session;

pub use llm_producer::LlmProducer;
pub use producer::FragmentProducer;
pub use session::{run, GenerationOutcome, TokenBudget};
