use super::*;

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::generation::{
    GenerationMode, Orchestrator, ProgressEvent, StandardStep, StepId,
};

static DIR_COUNTER: AtomicU64 = AtomicU64::new(0);

struct TempDirGuard {
    path: PathBuf,
}

impl TempDirGuard {
    fn new(label: &str) -> Self {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_nanos())
            .unwrap_or(0);
        let count = DIR_COUNTER.fetch_add(1, Ordering::SeqCst);
        let path = std::env::temp_dir().join(format!("schemastudio-{label}-{nanos}-{count}"));
        fs::create_dir_all(&path).expect("temp dir should be creatable");
        Self { path }
    }
}

impl Drop for TempDirGuard {
    fn drop(&mut self) {
        let _ = fs::remove_dir_all(&self.path);
    }
}

fn step_result(content: &str, agent: Option<&str>) -> StepResult {
    StepResult {
        title: "Schema".to_string(),
        content: content.to_string(),
        reasoning: String::new(),
        agent: agent.map(str::to_string),
    }
}

fn completion(step: StepId, content: &str) -> ProgressEvent {
    ProgressEvent {
        step,
        agent: None,
        reasoning: String::new(),
        current_step: None,
        total_steps: None,
        completion: Some(step_result(content, Some("Schema Architect"))),
    }
}

#[test]
fn export_slot_writes_named_markdown_document() {
    let guard = TempDirGuard::new("slot");
    let result = step_result("CREATE TABLE posts (id bigint);\n\n", Some("Schema Architect"));
    let path = export_slot(&guard.path, TabSlot::Schema, &result).expect("export should succeed");

    assert_eq!(path, guard.path.join("schema.md"));
    let written = read_text_file(&path).expect("file should read back");
    assert_eq!(
        written,
        "# Schema\n\nGenerated by Schema Architect.\n\nCREATE TABLE posts (id bigint);\n"
    );
}

#[test]
fn export_slot_omits_agent_line_when_unknown() {
    let guard = TempDirGuard::new("noagent");
    let result = step_result("content", None);
    let path = export_slot(&guard.path, TabSlot::Quality, &result).expect("export should succeed");
    let written = read_text_file(&path).expect("file should read back");
    assert_eq!(written, "# Quality\n\ncontent\n");
}

#[test]
fn export_slot_creates_missing_directories() {
    let guard = TempDirGuard::new("nested");
    let nested = guard.path.join("a").join("b");
    let result = step_result("content", None);
    let path = export_slot(&nested, TabSlot::Schema, &result).expect("export should succeed");
    assert!(path.exists());
}

#[test]
fn export_session_writes_every_populated_tab() {
    let guard = TempDirGuard::new("session");
    let mut orchestrator = Orchestrator::default();
    let sid = orchestrator
        .start("a blog", "PostgreSQL", GenerationMode::Standard)
        .expect("start should succeed");
    orchestrator.apply(
        sid,
        completion(StepId::Standard(StandardStep::Schema), "CREATE TABLE posts"),
    );

    let written =
        export_session(&guard.path, orchestrator.session()).expect("export should succeed");
    let mut names: Vec<String> = written
        .iter()
        .filter_map(|path| path.file_name())
        .map(|name| name.to_string_lossy().into_owned())
        .collect();
    names.sort();
    assert_eq!(names, vec!["requirements.md", "schema.md"]);
}

#[test]
fn write_then_read_round_trips_text() {
    let guard = TempDirGuard::new("roundtrip");
    let path = guard.path.join("notes.md");
    write_text_file(&path, "line one\nline two\n").expect("write should succeed");
    assert_eq!(
        read_text_file(&path).expect("read should succeed"),
        "line one\nline two\n"
    );
}

#[test]
fn clipboard_escape_wraps_base64_payload() {
    let escaped = clipboard_osc52("hello");
    assert_eq!(escaped, "\x1b]52;c;aGVsbG8=\x07");
    assert!(escaped.starts_with("\x1b]52;c;"));
    assert!(escaped.ends_with('\x07'));
}
