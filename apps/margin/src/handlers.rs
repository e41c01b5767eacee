use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::info;
use uuid::Uuid;

use crate::constraints::{extract, ConstraintSet};
use crate::errors::AppError;
use crate::generation::{run, GenerationOutcome, TokenBudget};
use crate::margin::render_margin;
use crate::state::AppState;
use crate::tracker::{Snapshot, StructureTracker};

#[derive(Debug, Deserialize)]
pub struct ExtractRequest {
    pub instruction: String,
}

#[derive(Debug, Serialize)]
pub struct ExtractResponse {
    pub constraints: ConstraintSet,
}

#[derive(Debug, Deserialize)]
pub struct AnalyzeRequest {
    pub text: String,
    /// Explicit constraints in wire form; takes precedence over `instruction`.
    #[serde(default)]
    pub constraints: Option<Value>,
    #[serde(default)]
    pub instruction: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct AnalyzeResponse {
    pub snapshot: Snapshot,
    pub margin: String,
}

#[derive(Debug, Deserialize)]
pub struct GenerateRequest {
    pub instruction: String,
    #[serde(default)]
    pub constraints: Option<Value>,
    #[serde(default)]
    pub max_tokens: Option<u64>,
    #[serde(default)]
    pub chunk_size: Option<u64>,
}

#[derive(Debug, Serialize)]
pub struct GenerateResponse {
    pub session_id: Uuid,
    #[serde(flatten)]
    pub outcome: GenerationOutcome,
    pub margin: String,
}

/// POST /api/v1/constraints/extract
pub async fn handle_extract(
    Json(req): Json<ExtractRequest>,
) -> Result<Json<ExtractResponse>, AppError> {
    require_instruction(&req.instruction)?;
    Ok(Json(ExtractResponse {
        constraints: extract(&req.instruction),
    }))
}

/// POST /api/v1/structure/analyze
pub async fn handle_analyze(
    Json(req): Json<AnalyzeRequest>,
) -> Result<Json<AnalyzeResponse>, AppError> {
    let constraints = match (&req.constraints, &req.instruction) {
        (Some(value), _) => ConstraintSet::from_json(value),
        (None, Some(instruction)) => extract(instruction),
        (None, None) => ConstraintSet::new(),
    };

    let mut tracker = StructureTracker::new();
    tracker.set_constraints(constraints);
    tracker.ingest(&req.text, None);

    let snapshot = tracker.snapshot();
    let margin = render_margin(&snapshot);
    Ok(Json(AnalyzeResponse { snapshot, margin }))
}

/// POST /api/v1/generate
pub async fn handle_generate(
    State(state): State<AppState>,
    Json(req): Json<GenerateRequest>,
) -> Result<Json<GenerateResponse>, AppError> {
    require_instruction(&req.instruction)?;
    let budget = TokenBudget {
        max_tokens: positive("max_tokens", req.max_tokens, state.config.max_tokens)?,
        chunk_size: positive("chunk_size", req.chunk_size, state.config.chunk_size)?,
    };
    let constraints = req.constraints.as_ref().map(ConstraintSet::from_json);

    let session_id = Uuid::new_v4();
    info!(%session_id, "Generation requested");

    let outcome = run(&req.instruction, constraints, budget, state.producer.as_ref()).await;
    let margin = render_margin(&outcome.snapshot);

    info!(
        %session_id,
        stop_reason = ?outcome.stop_reason,
        "Generation finished"
    );

    Ok(Json(GenerateResponse {
        session_id,
        outcome,
        margin,
    }))
}

fn require_instruction(instruction: &str) -> Result<(), AppError> {
    if instruction.trim().is_empty() {
        return Err(AppError::Validation(
            "instruction must not be empty".to_string(),
        ));
    }
    Ok(())
}

fn positive(field: &str, value: Option<u64>, default: u64) -> Result<u64, AppError> {
    match value {
        Some(0) => Err(AppError::Validation(format!(
            "{field} must be greater than zero"
        ))),
        Some(v) => Ok(v),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    use async_trait::async_trait;
    use serde_json::json;

    use super::*;
    use crate::config::Config;
    use crate::constraints::Dimension;
    use crate::generation::producer::{Fragment, FragmentProducer, ProducerError, RoundRequest};
    use crate::generation::session::StopReason;

    /// Emits one line per call; fails on the call numbered `fail_on`, if set.
    struct LineProducer {
        calls: AtomicU32,
        fail_on: Option<u32>,
    }

    #[async_trait]
    impl FragmentProducer for LineProducer {
        async fn produce(&self, _request: &RoundRequest<'_>) -> Result<Fragment, ProducerError> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            if Some(call) == self.fail_on {
                return Err(ProducerError::Unavailable("upstream overloaded".to_string()));
            }
            Ok(Fragment::new(format!("Line number {call}\n"), Some(4)))
        }
    }

    fn state(fail_on: Option<u32>) -> AppState {
        AppState {
            config: Config {
                anthropic_api_key: "sk-test".to_string(),
                port: 0,
                rust_log: "info".to_string(),
                max_tokens: 2048,
                chunk_size: 50,
            },
            producer: Arc::new(LineProducer {
                calls: AtomicU32::new(0),
                fail_on,
            }),
        }
    }

    fn generate_request(instruction: &str) -> GenerateRequest {
        GenerateRequest {
            instruction: instruction.to_string(),
            constraints: None,
            max_tokens: None,
            chunk_size: None,
        }
    }

    #[tokio::test]
    async fn test_extract_returns_wire_constraints() {
        let Json(resp) = handle_extract(Json(ExtractRequest {
            instruction: "Write a poem with 4 lines".to_string(),
        }))
        .await
        .unwrap();
        assert_eq!(
            serde_json::to_value(&resp).unwrap(),
            json!({"constraints": {"lines": {"target": 4, "tolerance": 0}}})
        );
    }

    #[tokio::test]
    async fn test_extract_rejects_blank_instruction() {
        let err = handle_extract(Json(ExtractRequest {
            instruction: "   ".to_string(),
        }))
        .await
        .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[tokio::test]
    async fn test_analyze_with_explicit_constraints() {
        let Json(resp) = handle_analyze(Json(AnalyzeRequest {
            text: "one two\nthree\n".to_string(),
            constraints: Some(json!({"lines": {"target": 2}})),
            instruction: Some("Write 9 lines".to_string()),
        }))
        .await
        .unwrap();
        assert_eq!(resp.snapshot.line_count, 2);
        assert_eq!(resp.snapshot.total_words, 3);
        assert!(resp.snapshot.complete);
        assert!(resp.margin.contains("Status: COMPLETE"));
    }

    #[tokio::test]
    async fn test_analyze_falls_back_to_instruction() {
        let Json(resp) = handle_analyze(Json(AnalyzeRequest {
            text: "just one line".to_string(),
            constraints: None,
            instruction: Some("Write 3 lines".to_string()),
        }))
        .await
        .unwrap();
        assert_eq!(resp.snapshot.satisfaction.get(&Dimension::Lines), Some(&false));
        assert!(!resp.snapshot.complete);
    }

    #[tokio::test]
    async fn test_analyze_without_constraints() {
        let Json(resp) = handle_analyze(Json(AnalyzeRequest {
            text: "free text".to_string(),
            constraints: None,
            instruction: None,
        }))
        .await
        .unwrap();
        assert!(resp.snapshot.constraints.is_empty());
        assert!(!resp.snapshot.complete);
    }

    #[tokio::test]
    async fn test_generate_stops_when_satisfied() {
        let Json(resp) = handle_generate(State(state(None)), Json(generate_request("Write 3 lines")))
            .await
            .unwrap();
        assert_eq!(resp.outcome.stop_reason, StopReason::ConstraintsSatisfied);
        assert_eq!(resp.outcome.rounds, 3);
        assert_eq!(
            resp.outcome.text,
            "Line number 1\nLine number 2\nLine number 3\n"
        );

        let body = serde_json::to_value(&resp).unwrap();
        assert_eq!(body["stop_reason"]["kind"], "constraints_satisfied");
        assert_eq!(body["tokens_spent"], 12);
        assert!(body["session_id"].is_string());
        assert!(body["margin"].as_str().unwrap().contains("Lines: 3/3"));
    }

    #[tokio::test]
    async fn test_generate_reports_producer_failure_in_body() {
        let Json(resp) = handle_generate(State(state(Some(2))), Json(generate_request("Write 3 lines")))
            .await
            .unwrap();
        assert_eq!(resp.outcome.text, "Line number 1\n");
        assert!(matches!(
            resp.outcome.stop_reason,
            StopReason::ProducerFailed { .. }
        ));
    }

    #[tokio::test]
    async fn test_generate_honours_request_budget() {
        let mut req = generate_request("Keep writing");
        req.max_tokens = Some(8);
        req.chunk_size = Some(4);
        let Json(resp) = handle_generate(State(state(None)), Json(req)).await.unwrap();
        assert_eq!(resp.outcome.stop_reason, StopReason::BudgetExhausted);
        assert_eq!(resp.outcome.rounds, 2);
    }

    #[tokio::test]
    async fn test_generate_rejects_zero_budget() {
        let mut req = generate_request("Write 3 lines");
        req.chunk_size = Some(0);
        let err = handle_generate(State(state(None)), Json(req)).await.unwrap_err();
        assert!(matches!(err, AppError::Validation(msg) if msg.contains("chunk_size")));

        let err = handle_generate(State(state(None)), Json(generate_request("")))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }
}
