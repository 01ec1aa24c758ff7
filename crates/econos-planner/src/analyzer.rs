use async_trait::async_trait;
use econos_capability::CapabilitySummary;
use econos_types::TaskType;

use crate::error::PlannerError;

/// Where a step's input comes from, as reported by the external analyzer —
/// the planner turns this into a concrete `InputMapping` once it knows
/// each step's position in the plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputSource {
    User,
    Previous,
}

#[derive(Debug, Clone)]
pub struct AnalyzedStep {
    pub order: u32,
    pub service_type: String,
    pub description: String,
    pub input_source: InputSource,
    pub input_field: Option<String>,
}

/// The external analyzer's decomposition of a free-form request, per
/// `spec.md` §4.6 step 1. The analyzer itself (a pluggable NL planner) is
/// an external collaborator; only its input/output contract lives here.
#[derive(Debug, Clone)]
pub struct AnalyzerOutput {
    pub is_single_agent: bool,
    pub steps: Vec<AnalyzedStep>,
    pub reasoning: String,
    pub confidence: f64,
}

/// The pluggable natural-language planner's contract. Out of scope per
/// `spec.md` §1 beyond this trait; `StubAnalyzer` is the only
/// implementation carried here, used when no real planner is configured.
#[async_trait]
pub trait PlanAnalyzer: Send + Sync {
    async fn analyze(
        &self,
        request_text: &str,
        capabilities: &CapabilitySummary,
    ) -> Result<AnalyzerOutput, PlannerError>;
}

/// Always emits a single step bound to a pre-declared task type, ignoring
/// the request text and capability summary. Used for `/hire`-style
/// requests that already name a `taskType`, and as the planner's fallback
/// when no real analyzer is wired in.
pub struct StubAnalyzer {
    task_type: TaskType,
}

impl StubAnalyzer {
    pub fn new(task_type: TaskType) -> Self {
        Self { task_type }
    }
}

#[async_trait]
impl PlanAnalyzer for StubAnalyzer {
    async fn analyze(
        &self,
        _request_text: &str,
        _capabilities: &CapabilitySummary,
    ) -> Result<AnalyzerOutput, PlannerError> {
        Ok(AnalyzerOutput {
            is_single_agent: true,
            steps: vec![AnalyzedStep {
                order: 0,
                service_type: self.task_type.label().to_string(),
                description: format!("single-step {} request", self.task_type.label()),
                input_source: InputSource::User,
                input_field: None,
            }],
            reasoning: "stub analyzer: single declared task type, no decomposition".to_string(),
            confidence: 1.0,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn stub_analyzer_emits_one_user_sourced_step() {
        let analyzer = StubAnalyzer::new(TaskType::SummaryGeneration);
        let out = analyzer
            .analyze("ignored", &CapabilitySummary::default())
            .await
            .unwrap();
        assert!(out.is_single_agent);
        assert_eq!(out.steps.len(), 1);
        assert_eq!(out.steps[0].service_type, "summary-generation");
        assert_eq!(out.steps[0].input_source, InputSource::User);
    }
}
