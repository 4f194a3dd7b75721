use std::fs::{self, File};
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;

use crate::generation::{GenerationSession, StepResult, TabSlot};

pub fn read_text_file(path: &Path) -> io::Result<String> {
    let file = File::open(path)?;
    let mut reader = BufReader::new(file);
    let mut text = String::new();
    reader.read_to_string(&mut text)?;
    Ok(text)
}

pub fn write_text_file(path: &Path, text: &str) -> io::Result<()> {
    let file = File::create(path)?;
    let mut writer = BufWriter::new(file);
    writer.write_all(text.as_bytes())?;
    writer.flush()
}

/// Writes one tab document to `<dir>/<slot>.md` and returns the path.
pub fn export_slot(dir: &Path, slot: TabSlot, result: &StepResult) -> io::Result<PathBuf> {
    fs::create_dir_all(dir)?;
    let path = dir.join(format!("{}.md", slot.file_stem()));
    write_text_file(&path, &export_document(slot, result))?;
    Ok(path)
}

/// Writes every populated tab of the session. Returns the written paths.
pub fn export_session(dir: &Path, session: &GenerationSession) -> io::Result<Vec<PathBuf>> {
    let mut written = Vec::new();
    for (slot, result) in session.populated_tabs() {
        written.push(export_slot(dir, slot, result)?);
    }
    Ok(written)
}

fn export_document(slot: TabSlot, result: &StepResult) -> String {
    let mut text = format!("# {}\n\n", slot.title());
    if let Some(agent) = result.agent.as_deref() {
        text.push_str(&format!("Generated by {agent}.\n\n"));
    }
    text.push_str(result.content.trim_end());
    text.push('\n');
    text
}

/// OSC 52 clipboard escape. The hosting terminal performs the copy, so this
/// works over ssh where no clipboard utility is installed.
pub fn clipboard_osc52(text: &str) -> String {
    format!("\x1b]52;c;{}\x07", STANDARD.encode(text.as_bytes()))
}

#[cfg(test)]
#[path = "../tests/unit/export_tests.rs"]
mod tests;
