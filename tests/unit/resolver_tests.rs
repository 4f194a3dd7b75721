use super::*;

fn result(content: &str, agent: Option<&str>) -> StepResult {
    StepResult {
        title: "step".to_string(),
        content: content.to_string(),
        reasoning: String::new(),
        agent: agent.map(str::to_string),
    }
}

#[test]
fn maps_standard_steps_to_slots() {
    assert_eq!(
        slot_for(StepId::Standard(StandardStep::Schema)),
        TabSlot::Schema
    );
    assert_eq!(
        slot_for(StepId::Standard(StandardStep::SampleData)),
        TabSlot::Implementation
    );
    assert_eq!(
        slot_for(StepId::Standard(StandardStep::ApiExamples)),
        TabSlot::Implementation
    );
    assert_eq!(
        slot_for(StepId::Standard(StandardStep::Visualization)),
        TabSlot::Visualization
    );
}

#[test]
fn maps_assisted_steps_to_slots() {
    assert_eq!(
        slot_for(StepId::Assisted(AssistedStep::Requirements)),
        TabSlot::Requirements
    );
    assert_eq!(
        slot_for(StepId::Assisted(AssistedStep::Schema)),
        TabSlot::Schema
    );
    assert_eq!(
        slot_for(StepId::Assisted(AssistedStep::Implementation)),
        TabSlot::Implementation
    );
    assert_eq!(
        slot_for(StepId::Assisted(AssistedStep::Quality)),
        TabSlot::Quality
    );
}

#[test]
fn merged_shows_placeholders_for_missing_halves() {
    let parts = ImplementationParts::default();
    let merged = parts.merged();
    assert!(merged.content.contains(SAMPLE_DATA_PENDING));
    assert!(merged.content.contains(API_EXAMPLES_PENDING));
    assert_eq!(merged.title, "Implementation Package");
    assert!(merged.agent.is_none());
}

#[test]
fn merged_replaces_placeholder_with_real_content() {
    let mut parts = ImplementationParts::default();
    assert!(parts.absorb(
        StepId::Standard(StandardStep::SampleData),
        result("INSERT INTO users VALUES (1);", Some("Data Specialist")),
    ));
    let merged = parts.merged();
    assert!(merged.content.contains("INSERT INTO users VALUES (1);"));
    assert!(!merged.content.contains(SAMPLE_DATA_PENDING));
    assert!(merged.content.contains(API_EXAMPLES_PENDING));
    assert_eq!(merged.agent.as_deref(), Some("Data Specialist"));
}

#[test]
fn merged_prefers_api_examples_agent() {
    let mut parts = ImplementationParts::default();
    parts.absorb(
        StepId::Standard(StandardStep::SampleData),
        result("rows", Some("Data Specialist")),
    );
    parts.absorb(
        StepId::Standard(StandardStep::ApiExamples),
        result("GET /users", Some("API Designer")),
    );
    assert_eq!(parts.merged().agent.as_deref(), Some("API Designer"));
}

#[test]
fn absorb_rejects_non_implementation_steps() {
    let mut parts = ImplementationParts::default();
    assert!(!parts.absorb(
        StepId::Standard(StandardStep::Schema),
        result("CREATE TABLE", None),
    ));
    assert!(!parts.absorb(
        StepId::Assisted(AssistedStep::Implementation),
        result("full package", None),
    ));
    assert_eq!(parts, ImplementationParts::default());
}

#[test]
fn standard_schema_step_synthesizes_requirements_with_prompt() {
    let prompt = "a library lending system";
    let stubs = synthesized_after(
        GenerationMode::Standard,
        StepId::Standard(StandardStep::Schema),
        prompt,
        "PostgreSQL",
        &HashMap::new(),
    );
    assert_eq!(stubs.len(), 1);
    let (slot, stub) = &stubs[0];
    assert_eq!(*slot, TabSlot::Requirements);
    assert!(stub.content.contains(prompt));
    assert!(stub.content.contains("PostgreSQL"));
    assert_eq!(stub.agent.as_deref(), Some("Requirements Analyst"));
}

#[test]
fn standard_visualization_step_synthesizes_quality_report() {
    let stubs = synthesized_after(
        GenerationMode::Standard,
        StepId::Standard(StandardStep::Visualization),
        "prompt",
        "MySQL",
        &HashMap::new(),
    );
    assert_eq!(stubs.len(), 1);
    assert_eq!(stubs[0].0, TabSlot::Quality);
    assert_eq!(stubs[0].1.agent.as_deref(), Some("Quality Reviewer"));
}

#[test]
fn standard_middle_steps_synthesize_nothing() {
    for step in [StandardStep::SampleData, StandardStep::ApiExamples] {
        let stubs = synthesized_after(
            GenerationMode::Standard,
            StepId::Standard(step),
            "prompt",
            "PostgreSQL",
            &HashMap::new(),
        );
        assert!(stubs.is_empty());
    }
}

#[test]
fn assisted_synthesizes_visualization_only_when_all_steps_done() {
    let mut raw_steps = HashMap::new();
    for step in [
        AssistedStep::Requirements,
        AssistedStep::Schema,
        AssistedStep::Implementation,
    ] {
        raw_steps.insert(StepId::Assisted(step), result("content", None));
        let stubs = synthesized_after(
            GenerationMode::Assisted,
            StepId::Assisted(step),
            "prompt",
            "PostgreSQL",
            &raw_steps,
        );
        assert!(stubs.is_empty());
    }

    raw_steps.insert(
        StepId::Assisted(AssistedStep::Quality),
        result("report", None),
    );
    let stubs = synthesized_after(
        GenerationMode::Assisted,
        StepId::Assisted(AssistedStep::Quality),
        "prompt",
        "PostgreSQL",
        &raw_steps,
    );
    assert_eq!(stubs.len(), 1);
    assert_eq!(stubs[0].0, TabSlot::Visualization);
    assert_eq!(stubs[0].1.agent.as_deref(), Some("Visualization Assistant"));
}
