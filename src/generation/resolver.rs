use std::collections::HashMap;

use crate::generation::{
    AssistedStep, GenerationMode, StandardStep, StepId, StepResult, TabSlot,
};

pub const SAMPLE_DATA_PENDING: &str = "_Sample data has not been generated yet._";
pub const API_EXAMPLES_PENDING: &str = "_API examples have not been generated yet._";

/// Static step-to-slot mapping. Total over the typed vocabularies; unknown
/// wire step names never reach this function because they fail parsing at the
/// adapter boundary.
pub fn slot_for(step: StepId) -> TabSlot {
    match step {
        StepId::Standard(StandardStep::Schema) => TabSlot::Schema,
        StepId::Standard(StandardStep::SampleData) => TabSlot::Implementation,
        StepId::Standard(StandardStep::ApiExamples) => TabSlot::Implementation,
        StepId::Standard(StandardStep::Visualization) => TabSlot::Visualization,
        StepId::Assisted(AssistedStep::Requirements) => TabSlot::Requirements,
        StepId::Assisted(AssistedStep::Schema) => TabSlot::Schema,
        StepId::Assisted(AssistedStep::Implementation) => TabSlot::Implementation,
        StepId::Assisted(AssistedStep::Quality) => TabSlot::Quality,
    }
}

/// The standard pipeline delivers the implementation tab as two separate
/// sub-documents. Both are kept as structured fields and the combined tab
/// document is re-rendered from them on every change, so arrival order never
/// matters and real content never regresses to a placeholder.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImplementationParts {
    pub sample_data: Option<StepResult>,
    pub api_examples: Option<StepResult>,
}

impl ImplementationParts {
    pub fn absorb(&mut self, step: StepId, result: StepResult) -> bool {
        match step {
            StepId::Standard(StandardStep::SampleData) => {
                self.sample_data = Some(result);
                true
            }
            StepId::Standard(StandardStep::ApiExamples) => {
                self.api_examples = Some(result);
                true
            }
            _ => false,
        }
    }

    pub fn is_complete(&self) -> bool {
        self.sample_data.is_some() && self.api_examples.is_some()
    }

    pub fn merged(&self) -> StepResult {
        let sample = self
            .sample_data
            .as_ref()
            .map(|part| part.content.as_str())
            .unwrap_or(SAMPLE_DATA_PENDING);
        let api = self
            .api_examples
            .as_ref()
            .map(|part| part.content.as_str())
            .unwrap_or(API_EXAMPLES_PENDING);
        let agent = self
            .api_examples
            .as_ref()
            .and_then(|part| part.agent.clone())
            .or_else(|| self.sample_data.as_ref().and_then(|part| part.agent.clone()));
        let reasoning = [&self.sample_data, &self.api_examples]
            .into_iter()
            .flatten()
            .map(|part| part.reasoning.trim())
            .filter(|text| !text.is_empty())
            .collect::<Vec<_>>()
            .join("\n");
        StepResult {
            title: "Implementation Package".to_string(),
            content: format!("## Sample Data\n\n{sample}\n\n## API Examples\n\n{api}"),
            reasoning,
            agent,
        }
    }
}

/// Named fallback policy for slots a pipeline does not natively produce.
/// Standard mode fabricates requirements alongside the schema step and a
/// quality report alongside the final visualization step; assisted mode
/// fabricates a visualization entry once every native step has completed.
/// Callers must not overwrite an already-populated slot with a stub.
pub fn synthesized_after(
    mode: GenerationMode,
    step: StepId,
    prompt: &str,
    db_type: &str,
    raw_steps: &HashMap<StepId, StepResult>,
) -> Vec<(TabSlot, StepResult)> {
    match (mode, step) {
        (GenerationMode::Standard, StepId::Standard(StandardStep::Schema)) => {
            vec![(TabSlot::Requirements, requirements_stub(prompt, db_type))]
        }
        (GenerationMode::Standard, StepId::Standard(StandardStep::Visualization)) => {
            vec![(TabSlot::Quality, quality_stub(db_type))]
        }
        (GenerationMode::Assisted, _) => {
            let native_done = AssistedStep::ALL
                .iter()
                .all(|native| raw_steps.contains_key(&StepId::Assisted(*native)));
            if native_done {
                vec![(TabSlot::Visualization, visualization_stub())]
            } else {
                Vec::new()
            }
        }
        _ => Vec::new(),
    }
}

pub fn requirements_stub(prompt: &str, db_type: &str) -> StepResult {
    StepResult {
        title: "Requirements Analysis".to_string(),
        content: format!(
            "## Requirements Analysis\n\nTarget database type: {db_type}.\n\n\
             Original request:\n\n{prompt}\n\n\
             The schema tab was derived directly from this request; review it \
             against the request before implementation."
        ),
        reasoning: "Summarized the original request as a requirements baseline.".to_string(),
        agent: Some("Requirements Analyst".to_string()),
    }
}

pub fn quality_stub(db_type: &str) -> StepResult {
    StepResult {
        title: "Quality Report".to_string(),
        content: format!(
            "## Quality Report\n\nThe standard pipeline does not run a dedicated \
             quality agent. Spot-check the generated schema for normalization, \
             indexes on foreign keys, and {db_type}-appropriate column types."
        ),
        reasoning: "Filled the quality tab with a review checklist.".to_string(),
        agent: Some("Quality Reviewer".to_string()),
    }
}

pub fn visualization_stub() -> StepResult {
    StepResult {
        title: "Visualization".to_string(),
        content: "## Visualization\n\nThe assisted pipeline does not emit a diagram \
                  step. Render the schema tab with your preferred ER tool to \
                  visualize table relationships."
            .to_string(),
        reasoning: "Filled the visualization tab with rendering guidance.".to_string(),
        agent: Some("Visualization Assistant".to_string()),
    }
}

#[cfg(test)]
#[path = "../../tests/unit/resolver_tests.rs"]
mod tests;
