use super::*;

fn progress_only(step: StepId) -> ProgressEvent {
    ProgressEvent {
        step,
        agent: Some("Schema Architect".to_string()),
        reasoning: "Designing tables".to_string(),
        current_step: Some(1),
        total_steps: Some(4),
        completion: None,
    }
}

fn completed(step: StepId, content: &str) -> ProgressEvent {
    ProgressEvent {
        step,
        agent: Some("Schema Architect".to_string()),
        reasoning: "Done".to_string(),
        current_step: None,
        total_steps: None,
        completion: Some(StepResult {
            title: step.wire_name().to_string(),
            content: content.to_string(),
            reasoning: String::new(),
            agent: Some("Schema Architect".to_string()),
        }),
    }
}

fn started_standard(prompt: &str) -> (Orchestrator, u64) {
    let mut orchestrator = Orchestrator::default();
    let session_id = orchestrator
        .start(prompt, "PostgreSQL", GenerationMode::Standard)
        .expect("start should succeed");
    (orchestrator, session_id)
}

#[test]
fn start_rejects_empty_prompt() {
    let mut orchestrator = Orchestrator::default();
    let err = orchestrator
        .start("   ", "PostgreSQL", GenerationMode::Standard)
        .expect_err("empty prompt should be rejected");
    assert_eq!(err, GenerationError::EmptyPrompt);
    assert_eq!(orchestrator.session().phase(), Phase::Idle);
}

#[test]
fn start_seeds_transcript_with_user_entry() {
    let (orchestrator, _) = started_standard("a blog with posts");
    let entries = orchestrator.session().reasoning();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].author, ReasoningAuthor::User);
    assert_eq!(entries[0].text, "a blog with posts");
    assert!(orchestrator.is_generating());
}

#[test]
fn schema_completion_populates_schema_and_synthesized_requirements() {
    let prompt = "a blog with posts and comments";
    let (mut orchestrator, sid) = started_standard(prompt);
    let newly = orchestrator.apply(
        sid,
        completed(StepId::Standard(StandardStep::Schema), "CREATE TABLE posts"),
    );
    assert_eq!(newly, vec![TabSlot::Schema, TabSlot::Requirements]);

    let session = orchestrator.session();
    assert!(session.is_complete(TabSlot::Schema));
    assert!(session.is_complete(TabSlot::Requirements));
    let requirements = session
        .tab_content(TabSlot::Requirements)
        .expect("requirements stub should exist");
    assert!(requirements.content.contains(prompt));
    assert!(orchestrator.is_generating());
}

#[test]
fn standard_run_completes_exactly_when_all_five_slots_are_filled() {
    let (mut orchestrator, sid) = started_standard("a blog with posts and comments");
    let steps = [
        StepId::Standard(StandardStep::Schema),
        StepId::Standard(StandardStep::SampleData),
        StepId::Standard(StandardStep::ApiExamples),
    ];
    for step in steps {
        orchestrator.apply(sid, completed(step, "content"));
        assert!(orchestrator.is_generating());
    }
    orchestrator.apply(
        sid,
        completed(StepId::Standard(StandardStep::Visualization), "erDiagram"),
    );
    assert!(!orchestrator.is_generating());
    assert_eq!(orchestrator.session().phase(), Phase::Completed);
    assert_eq!(orchestrator.session().completed().len(), 5);
    assert!(orchestrator.session().is_complete(TabSlot::Quality));
}

#[test]
fn implementation_sub_steps_merge_in_either_order() {
    let (mut orchestrator, sid) = started_standard("an inventory tracker");
    orchestrator.apply(
        sid,
        completed(StepId::Standard(StandardStep::ApiExamples), "GET /items"),
    );
    let halfway = orchestrator
        .session()
        .tab_content(TabSlot::Implementation)
        .expect("implementation should exist")
        .clone();
    assert!(halfway.content.contains("GET /items"));
    assert!(halfway.content.contains(resolver::SAMPLE_DATA_PENDING));
    assert!(!orchestrator.session().is_complete(TabSlot::Implementation));

    orchestrator.apply(
        sid,
        completed(StepId::Standard(StandardStep::SampleData), "INSERT INTO items"),
    );
    let merged = orchestrator
        .session()
        .tab_content(TabSlot::Implementation)
        .expect("implementation should exist");
    assert!(merged.content.contains("INSERT INTO items"));
    assert!(merged.content.contains("GET /items"));
    assert!(!merged.content.contains(resolver::SAMPLE_DATA_PENDING));
    assert!(!merged.content.contains(resolver::API_EXAMPLES_PENDING));
    assert!(orchestrator.session().is_complete(TabSlot::Implementation));
}

#[test]
fn late_implementation_half_keeps_the_session_open() {
    let (mut orchestrator, sid) = started_standard("a blog");
    orchestrator.apply(
        sid,
        completed(StepId::Standard(StandardStep::Schema), "CREATE TABLE posts"),
    );
    orchestrator.apply(
        sid,
        completed(StepId::Standard(StandardStep::SampleData), "INSERT INTO posts"),
    );
    orchestrator.apply(
        sid,
        completed(StepId::Standard(StandardStep::Visualization), "erDiagram"),
    );
    assert!(orchestrator.is_generating());
    assert!(!orchestrator.session().is_complete(TabSlot::Implementation));

    let newly = orchestrator.apply(
        sid,
        completed(StepId::Standard(StandardStep::ApiExamples), "GET /posts"),
    );
    assert_eq!(newly, vec![TabSlot::Implementation]);
    assert_eq!(orchestrator.session().phase(), Phase::Completed);
    let merged = orchestrator
        .session()
        .tab_content(TabSlot::Implementation)
        .expect("implementation should exist");
    assert!(merged.content.contains("INSERT INTO posts"));
    assert!(merged.content.contains("GET /posts"));
    assert!(!merged.content.contains(resolver::API_EXAMPLES_PENDING));
}

#[test]
fn completion_without_content_is_rejected_and_logged() {
    let (mut orchestrator, sid) = started_standard("a blog");
    let newly = orchestrator.apply(
        sid,
        completed(StepId::Standard(StandardStep::Schema), "   "),
    );
    assert!(newly.is_empty());

    let session = orchestrator.session();
    assert!(!session.is_complete(TabSlot::Schema));
    assert!(session.tab_content(TabSlot::Schema).is_none());
    assert!(
        session
            .reasoning()
            .iter()
            .any(|entry| entry.text.contains("carried no content"))
    );

    let newly = orchestrator.apply(
        sid,
        completed(StepId::Standard(StandardStep::Schema), "CREATE TABLE posts"),
    );
    assert_eq!(newly, vec![TabSlot::Schema, TabSlot::Requirements]);
}

#[test]
fn progress_only_events_never_touch_tab_content() {
    let (mut orchestrator, sid) = started_standard("a todo app");
    let newly = orchestrator.apply(sid, progress_only(StepId::Standard(StandardStep::Schema)));
    assert!(newly.is_empty());

    let session = orchestrator.session();
    assert_eq!(session.current_step, Some(TabSlot::Schema));
    assert_eq!(session.current_agent.as_deref(), Some("Schema Architect"));
    assert!(session.completed().is_empty());
    assert!(session.tab_content(TabSlot::Schema).is_none());
    assert!(
        session
            .reasoning()
            .iter()
            .any(|entry| entry.text == "Designing tables")
    );
}

#[test]
fn duplicate_step_completion_is_ignored_and_logged() {
    let (mut orchestrator, sid) = started_standard("a todo app");
    orchestrator.apply(
        sid,
        completed(StepId::Standard(StandardStep::Schema), "first result"),
    );
    let newly = orchestrator.apply(
        sid,
        completed(StepId::Standard(StandardStep::Schema), "second result"),
    );
    assert!(newly.is_empty());

    let session = orchestrator.session();
    let schema = session
        .tab_content(TabSlot::Schema)
        .expect("schema should exist");
    assert_eq!(schema.content, "first result");
    assert!(
        session
            .reasoning()
            .iter()
            .any(|entry| entry.text.contains("Duplicate completion"))
    );
}

#[test]
fn wrong_pipeline_step_is_ignored_and_logged() {
    let (mut orchestrator, sid) = started_standard("a todo app");
    let newly = orchestrator.apply(
        sid,
        completed(StepId::Assisted(AssistedStep::Quality), "quality report"),
    );
    assert!(newly.is_empty());
    assert!(orchestrator.session().completed().is_empty());
    assert!(
        orchestrator
            .session()
            .reasoning()
            .iter()
            .any(|entry| entry.text.contains("wrong pipeline"))
    );
}

#[test]
fn stale_session_events_are_dropped() {
    let (mut orchestrator, old_sid) = started_standard("first prompt");
    orchestrator.reset();
    let newly = orchestrator.apply(
        old_sid,
        completed(StepId::Standard(StandardStep::Schema), "stale"),
    );
    assert!(newly.is_empty());
    assert!(orchestrator.session().tab_content(TabSlot::Schema).is_none());
}

#[test]
fn reset_then_start_carries_nothing_over() {
    let (mut orchestrator, sid) = started_standard("first prompt");
    orchestrator.apply(
        sid,
        completed(StepId::Standard(StandardStep::Schema), "old schema"),
    );
    let max_old_id = orchestrator
        .session()
        .reasoning()
        .iter()
        .map(|entry| entry.id)
        .max()
        .expect("entries exist");

    orchestrator.reset();
    assert_eq!(orchestrator.session().phase(), Phase::Idle);
    assert!(orchestrator.session().reasoning().is_empty());

    let new_sid = orchestrator
        .start("second prompt", "MySQL", GenerationMode::Assisted)
        .expect("restart should succeed");
    assert_ne!(new_sid, sid);
    let session = orchestrator.session();
    assert_eq!(session.prompt, "second prompt");
    assert_eq!(session.db_type, "MySQL");
    assert!(session.completed().is_empty());
    assert!(session.tab_content(TabSlot::Schema).is_none());
    assert!(session.reasoning()[0].id > max_old_id);
}

#[test]
fn reasoning_entry_ids_are_unique_and_ordered_within_a_burst() {
    let (mut orchestrator, sid) = started_standard("a todo app");
    for _ in 0..20 {
        orchestrator.apply(sid, progress_only(StepId::Standard(StandardStep::Schema)));
    }
    let ids: Vec<u64> = orchestrator
        .session()
        .reasoning()
        .iter()
        .map(|entry| entry.id)
        .collect();
    let mut sorted = ids.clone();
    sorted.sort_unstable();
    sorted.dedup();
    assert_eq!(ids.len(), sorted.len());
    assert!(ids.windows(2).all(|pair| pair[0] < pair[1]));
}

#[test]
fn fail_keeps_partial_tab_content_visible() {
    let (mut orchestrator, sid) = started_standard("a todo app");
    orchestrator.apply(
        sid,
        completed(StepId::Standard(StandardStep::Schema), "CREATE TABLE todos"),
    );
    orchestrator.fail(sid, GenerationError::Connectivity);

    let session = orchestrator.session();
    assert_eq!(session.phase(), Phase::Failed);
    assert_eq!(session.error, Some(GenerationError::Connectivity));
    assert!(session.tab_content(TabSlot::Schema).is_some());
    assert!(session.current_step.is_none());
    assert!(
        session
            .reasoning()
            .iter()
            .any(|entry| entry.text.contains("Generation stopped"))
    );
}

#[test]
fn fail_with_stale_session_id_is_ignored() {
    let (mut orchestrator, sid) = started_standard("a todo app");
    orchestrator.fail(sid + 1, GenerationError::Connectivity);
    assert!(orchestrator.is_generating());
}

#[test]
fn assisted_run_synthesizes_visualization_only_after_all_native_steps() {
    let mut orchestrator = Orchestrator::default();
    let sid = orchestrator
        .start("a crm", "PostgreSQL", GenerationMode::Assisted)
        .expect("start should succeed");

    let first_three = [
        StepId::Assisted(AssistedStep::Requirements),
        StepId::Assisted(AssistedStep::Schema),
        StepId::Assisted(AssistedStep::Implementation),
    ];
    for step in first_three {
        orchestrator.apply(sid, completed(step, "content"));
        assert!(!orchestrator.session().is_complete(TabSlot::Visualization));
    }

    let newly = orchestrator.apply(
        sid,
        completed(StepId::Assisted(AssistedStep::Quality), "report"),
    );
    assert_eq!(newly, vec![TabSlot::Quality, TabSlot::Visualization]);
    assert!(!orchestrator.is_generating());
    assert_eq!(orchestrator.session().completed().len(), 5);
}

#[test]
fn note_appends_regardless_of_phase() {
    let mut orchestrator = Orchestrator::default();
    orchestrator.note("Service: warming up");
    assert_eq!(orchestrator.session().reasoning().len(), 1);
    assert_eq!(
        orchestrator.session().reasoning()[0].author,
        ReasoningAuthor::Assistant
    );
}
