use async_trait::async_trait;
use tracing::debug;

use crate::generation::producer::{Fragment, FragmentProducer, ProducerError, RoundRequest};
use crate::generation::prompts::{build_continue_prompt, build_initial_prompt, GENERATION_SYSTEM};
use crate::llm_client::{LlmClient, LlmResponse};

/// Produces fragments with Claude, one Messages API call per round.
#[derive(Clone)]
pub struct LlmProducer {
    llm: LlmClient,
}

impl LlmProducer {
    pub fn new(llm: LlmClient) -> Self {
        Self { llm }
    }
}

#[async_trait]
impl FragmentProducer for LlmProducer {
    async fn produce(&self, request: &RoundRequest<'_>) -> Result<Fragment, ProducerError> {
        let prompt = build_prompt(request);
        let max_tokens = u32::try_from(request.max_tokens).unwrap_or(u32::MAX);

        let response = self.llm.call(&prompt, GENERATION_SYSTEM, max_tokens).await?;
        debug!(
            requested = request.max_tokens,
            output_tokens = response.usage.output_tokens,
            stop_reason = ?response.stop_reason,
            "Fragment produced"
        );
        Ok(fragment_from_response(&response))
    }
}

fn build_prompt(request: &RoundRequest<'_>) -> String {
    if request.generated_so_far.is_empty() {
        build_initial_prompt(request.instruction, request.constraints, request.margin)
    } else {
        build_continue_prompt(request.instruction, request.generated_so_far, request.margin)
    }
}

/// Missing text content maps to an empty fragment, i.e. end of output.
fn fragment_from_response(response: &LlmResponse) -> Fragment {
    Fragment::new(
        response.text().unwrap_or_default(),
        Some(u64::from(response.usage.output_tokens)),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constraints::extract;
    use crate::margin::render_margin;
    use crate::tracker::StructureTracker;

    fn response(json: &str) -> LlmResponse {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_fragment_uses_reported_output_tokens() {
        let fragment = fragment_from_response(&response(
            r#"{"content":[{"type":"text","text":"Roses are red\n"}],
                "usage":{"input_tokens":80,"output_tokens":5}}"#,
        ));
        assert_eq!(fragment, Fragment::new("Roses are red\n", Some(5)));
    }

    #[test]
    fn test_missing_text_is_end_of_output() {
        let fragment = fragment_from_response(&response(
            r#"{"content":[],"usage":{"input_tokens":80,"output_tokens":0}}"#,
        ));
        assert!(fragment.text.is_empty());
    }

    #[test]
    fn test_prompt_switches_after_first_round() {
        let constraints = extract("Write 4 lines");
        let mut tracker = StructureTracker::new();
        tracker.set_constraints(constraints.clone());
        let snapshot = tracker.snapshot();
        let margin = render_margin(&snapshot);

        let mut request = RoundRequest {
            instruction: "Write 4 lines",
            generated_so_far: "",
            snapshot: &snapshot,
            margin: &margin,
            constraints: &constraints,
            max_tokens: 50,
        };
        let first = build_prompt(&request);
        assert!(first.starts_with("You are generating a response to: Write 4 lines"));
        assert!(first.contains("Constraints to satisfy"));
        assert!(first.contains("GENERATION STATE"));

        request.generated_so_far = "A first line\n";
        let later = build_prompt(&request);
        assert!(later.starts_with("You are continuing"));
        assert!(later.contains("A first line\n"));
    }
}
