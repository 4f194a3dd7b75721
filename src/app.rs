use std::path::PathBuf;

use crate::backend::{ServiceEvent, WireErrorCode, WireProgress};
use crate::chat::{ChatReply, ChatState, ContextType, OutboundMessage};
use crate::generation::{
    GenerationError, GenerationMode, Orchestrator, ProgressEvent, ReasoningAuthor, StepId,
    StepResult, TabSlot,
};
use crate::services::GenerationRequest;
use crate::text_layout::wrap_word_with_positions;

const COMMAND_INDEX: [(&str, &str); 10] = [
    ("/generate", "Generate a database design from a prompt"),
    ("/mode", "Switch pipeline: standard or assisted"),
    ("/dbtype", "Set the target database type"),
    ("/reset", "Discard the current generation"),
    ("/export", "Export tabs to markdown files"),
    ("/copy", "Copy a tab to the clipboard"),
    ("/new", "Start a new conversation"),
    ("/title", "Rename the current conversation"),
    ("/delete", "Delete the current conversation"),
    ("/quit", "Quit app"),
];

const NOTICE_TICKS: u16 = 300;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommandSuggestion {
    pub command: &'static str,
    pub description: &'static str,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pane {
    Transcript,
    Chat,
    Results,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Generate(String),
    Mode(String),
    DbType(String),
    Reset,
    Export(Option<String>),
    Copy(Option<String>),
    NewConversation(String),
    Title(String),
    DeleteConversation,
    Quit,
}

impl Command {
    pub fn parse(message: &str) -> Option<Self> {
        let trimmed = message.trim();
        if !trimmed.starts_with('/') {
            return None;
        }
        let (head, rest) = match trimmed.split_once(char::is_whitespace) {
            Some((head, rest)) => (head, rest.trim()),
            None => (trimmed, ""),
        };
        match head.to_ascii_lowercase().as_str() {
            "/generate" => Some(Self::Generate(rest.to_string())),
            "/mode" => Some(Self::Mode(rest.to_string())),
            "/dbtype" => Some(Self::DbType(rest.to_string())),
            "/reset" => Some(Self::Reset),
            "/export" => Some(Self::Export(optional_arg(rest))),
            "/copy" => Some(Self::Copy(optional_arg(rest))),
            "/new" => Some(Self::NewConversation(rest.to_string())),
            "/title" => Some(Self::Title(rest.to_string())),
            "/delete" => Some(Self::DeleteConversation),
            "/quit" | "/exit" => Some(Self::Quit),
            _ => None,
        }
    }
}

fn optional_arg(rest: &str) -> Option<String> {
    let rest = rest.trim();
    if rest.is_empty() {
        None
    } else {
        Some(rest.to_string())
    }
}

/// What the main loop must do after a composer submit. The app itself never
/// performs IO or talks to a service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
    Idle,
    Quit,
    StartGeneration(GenerationRequest),
    CancelGeneration,
    SendChat(OutboundMessage),
    /// Export one named tab, or the whole session when `None`.
    ExportTabs(Option<TabSlot>),
    CopyText(String),
}

#[derive(Debug)]
pub struct App {
    pub running: bool,
    pub ticks: u64,
    pub active_pane: Pane,
    pub active_tab: TabSlot,
    transcript_scroll: u16,
    chat_scroll: u16,
    results_scroll: u16,
    chat_input: String,
    chat_cursor: usize,
    chat_cursor_goal_col: Option<u16>,
    notice: Option<String>,
    notice_ticks_left: u16,
    pub mode: GenerationMode,
    pub db_type: String,
    pub export_dir: PathBuf,
    orchestrator: Orchestrator,
    pub chat: ChatState,
}

impl Default for App {
    fn default() -> Self {
        let mut chat = ChatState::default();
        chat.create_conversation("Design chat", ContextType::Database);
        Self {
            running: true,
            ticks: 0,
            active_pane: Pane::Chat,
            active_tab: TabSlot::Schema,
            transcript_scroll: 0,
            chat_scroll: 0,
            results_scroll: 0,
            chat_input: String::new(),
            chat_cursor: 0,
            chat_cursor_goal_col: None,
            notice: None,
            notice_ticks_left: 0,
            mode: GenerationMode::Standard,
            db_type: "PostgreSQL".to_string(),
            export_dir: PathBuf::from("exports"),
            orchestrator: Orchestrator::default(),
            chat,
        }
    }
}

impl App {
    pub fn on_tick(&mut self) {
        self.ticks = self.ticks.saturating_add(1);
        if self.notice_ticks_left > 0 {
            self.notice_ticks_left -= 1;
            if self.notice_ticks_left == 0 {
                self.notice = None;
            }
        }
    }

    pub fn quit(&mut self) {
        self.running = false;
    }

    pub fn orchestrator(&self) -> &Orchestrator {
        &self.orchestrator
    }

    pub fn is_generating(&self) -> bool {
        self.orchestrator.is_generating()
    }

    pub fn notice(&self) -> Option<&str> {
        self.notice.as_deref()
    }

    pub fn set_notice(&mut self, text: impl Into<String>) {
        self.notice = Some(text.into());
        self.notice_ticks_left = NOTICE_TICKS;
    }

    pub fn next_pane(&mut self) {
        self.active_pane = match self.active_pane {
            Pane::Transcript => Pane::Chat,
            Pane::Chat => Pane::Results,
            Pane::Results => Pane::Transcript,
        };
    }

    pub fn prev_pane(&mut self) {
        self.active_pane = match self.active_pane {
            Pane::Transcript => Pane::Results,
            Pane::Chat => Pane::Transcript,
            Pane::Results => Pane::Chat,
        };
    }

    pub fn next_tab(&mut self) {
        let next = (self.active_tab.index() + 1) % TabSlot::ALL.len();
        self.select_tab(next);
    }

    pub fn prev_tab(&mut self) {
        let count = TabSlot::ALL.len();
        let prev = (self.active_tab.index() + count - 1) % count;
        self.select_tab(prev);
    }

    pub fn select_tab(&mut self, index: usize) {
        if let Some(slot) = TabSlot::from_index(index) {
            self.active_tab = slot;
            self.results_scroll = 0;
        }
    }

    pub fn input_char(&mut self, c: char) {
        let byte_idx = char_to_byte_idx(&self.chat_input, self.chat_cursor);
        self.chat_input.insert(byte_idx, c);
        self.chat_cursor = self.chat_cursor.saturating_add(1);
        self.chat_cursor_goal_col = None;
    }

    pub fn backspace_input(&mut self) {
        if self.chat_cursor == 0 {
            return;
        }
        let start = char_to_byte_idx(&self.chat_input, self.chat_cursor.saturating_sub(1));
        let end = char_to_byte_idx(&self.chat_input, self.chat_cursor);
        self.chat_input.drain(start..end);
        self.chat_cursor = self.chat_cursor.saturating_sub(1);
        self.chat_cursor_goal_col = None;
    }

    pub fn move_cursor_left(&mut self) {
        self.chat_cursor = self.chat_cursor.saturating_sub(1);
        self.chat_cursor_goal_col = None;
    }

    pub fn move_cursor_right(&mut self) {
        let char_len = self.chat_input.chars().count();
        self.chat_cursor = (self.chat_cursor + 1).min(char_len);
        self.chat_cursor_goal_col = None;
    }

    pub fn move_cursor_up(&mut self, width: u16) {
        let width = width.max(1);
        let positions = wrap_word_with_positions(&self.chat_input, width).positions;
        let (line, col) = positions[self.chat_cursor];
        if line == 0 {
            return;
        }
        let goal_col = self.chat_cursor_goal_col.unwrap_or(col);
        self.chat_cursor = nearest_index_for_line_col(&positions, line - 1, goal_col);
        self.chat_cursor_goal_col = Some(goal_col);
    }

    pub fn move_cursor_down(&mut self, width: u16) {
        let width = width.max(1);
        let positions = wrap_word_with_positions(&self.chat_input, width).positions;
        let (line, col) = positions[self.chat_cursor];
        let max_line = positions.iter().map(|(l, _)| *l).max().unwrap_or(0);
        if line >= max_line {
            return;
        }
        let goal_col = self.chat_cursor_goal_col.unwrap_or(col);
        self.chat_cursor = nearest_index_for_line_col(&positions, line + 1, goal_col);
        self.chat_cursor_goal_col = Some(goal_col);
    }

    pub fn chat_input(&self) -> &str {
        &self.chat_input
    }

    pub fn set_chat_input(&mut self, text: String) {
        self.chat_cursor = text.chars().count();
        self.chat_input = text;
        self.chat_cursor_goal_col = None;
    }

    pub fn chat_cursor_line_col(&self, width: u16) -> (u16, u16) {
        let positions = wrap_word_with_positions(&self.chat_input, width.max(1)).positions;
        positions[self.chat_cursor]
    }

    pub fn command_suggestions(&self) -> Vec<CommandSuggestion> {
        let Some(query) = command_query(&self.chat_input) else {
            return Vec::new();
        };
        COMMAND_INDEX
            .iter()
            .filter(|(command, _)| command.starts_with(query))
            .map(|(command, description)| CommandSuggestion {
                command,
                description,
            })
            .collect()
    }

    pub fn should_show_command_index(&self) -> bool {
        !self.command_suggestions().is_empty()
    }

    pub fn autocomplete_top_command(&mut self) -> bool {
        let Some(top) = self.command_suggestions().first().copied() else {
            return false;
        };
        self.chat_input = top.command.to_string();
        self.chat_cursor = self.chat_input.chars().count();
        self.chat_cursor_goal_col = None;
        true
    }

    pub fn transcript_scroll(&self) -> u16 {
        self.transcript_scroll
    }

    pub fn chat_scroll(&self) -> u16 {
        self.chat_scroll
    }

    pub fn results_scroll(&self) -> u16 {
        self.results_scroll
    }

    pub fn scroll_up(&mut self) {
        let scroll = self.scroll_mut(self.active_pane);
        *scroll = scroll.saturating_sub(1);
    }

    pub fn scroll_down(&mut self, max_scroll: u16) {
        let scroll = self.scroll_mut(self.active_pane);
        *scroll = (*scroll + 1).min(max_scroll);
    }

    pub fn scroll_chat_up(&mut self) {
        self.chat_scroll = self.chat_scroll.saturating_sub(1);
    }

    pub fn scroll_chat_down(&mut self, max_scroll: u16) {
        self.chat_scroll = (self.chat_scroll + 1).min(max_scroll);
    }

    pub fn scroll_results_up(&mut self) {
        self.results_scroll = self.results_scroll.saturating_sub(1);
    }

    pub fn scroll_results_down(&mut self, max_scroll: u16) {
        self.results_scroll = (self.results_scroll + 1).min(max_scroll);
    }

    pub fn set_chat_scroll(&mut self, scroll: u16) {
        self.chat_scroll = scroll;
    }

    fn scroll_mut(&mut self, pane: Pane) -> &mut u16 {
        match pane {
            Pane::Transcript => &mut self.transcript_scroll,
            Pane::Chat => &mut self.chat_scroll,
            Pane::Results => &mut self.results_scroll,
        }
    }

    /// Consumes the composer and turns it into a main-loop action. Slash
    /// commands run locally; anything else goes to the chat service.
    pub fn submit(&mut self) -> SubmitOutcome {
        let message = self.chat_input.trim().to_string();
        self.chat_input.clear();
        self.chat_cursor = 0;
        self.chat_cursor_goal_col = None;
        if message.is_empty() {
            return SubmitOutcome::Idle;
        }
        if message.starts_with('/') {
            let Some(command) = Command::parse(&message) else {
                self.set_notice(format!("Unknown command: {message}"));
                return SubmitOutcome::Idle;
            };
            return self.run_command(command);
        }
        match self.chat.begin_send(&message) {
            Ok(outbound) => SubmitOutcome::SendChat(outbound),
            Err(err) => {
                self.set_notice(err.to_string());
                self.set_chat_input(message);
                SubmitOutcome::Idle
            }
        }
    }

    fn run_command(&mut self, command: Command) -> SubmitOutcome {
        match command {
            Command::Generate(prompt) => match self.start_generation(&prompt) {
                Ok(request) => SubmitOutcome::StartGeneration(request),
                Err(err) => {
                    self.set_notice(err.to_string());
                    SubmitOutcome::Idle
                }
            },
            Command::Mode(raw) => {
                if self.is_generating() {
                    self.set_notice("Cannot switch modes while generating. Use /reset first.");
                    return SubmitOutcome::Idle;
                }
                match GenerationMode::parse(&raw) {
                    Some(mode) => {
                        self.mode = mode;
                        self.set_notice(format!("Mode set to {}.", mode.label()));
                    }
                    None => self.set_notice("Usage: /mode <standard|assisted>"),
                }
                SubmitOutcome::Idle
            }
            Command::DbType(raw) => {
                let raw = raw.trim();
                if raw.is_empty() {
                    self.set_notice("Usage: /dbtype <type>");
                } else {
                    self.db_type = raw.to_string();
                    self.set_notice(format!("Database type set to {raw}."));
                }
                SubmitOutcome::Idle
            }
            Command::Reset => {
                self.orchestrator.reset();
                self.set_notice("Generation state reset.");
                SubmitOutcome::CancelGeneration
            }
            Command::Export(slot_arg) => match self.export_selection(slot_arg.as_deref()) {
                Ok(selection) => SubmitOutcome::ExportTabs(selection),
                Err(notice) => {
                    self.set_notice(notice);
                    SubmitOutcome::Idle
                }
            },
            Command::Copy(slot_arg) => {
                let slot = match slot_arg.as_deref() {
                    Some(raw) => match TabSlot::parse(raw) {
                        Some(slot) => slot,
                        None => {
                            self.set_notice(format!("Unknown tab: {raw}"));
                            return SubmitOutcome::Idle;
                        }
                    },
                    None => self.active_tab,
                };
                let content = self
                    .orchestrator
                    .session()
                    .tab_content(slot)
                    .map(|result| result.content.clone());
                match content {
                    Some(content) => {
                        self.set_notice(format!("Copied {} to clipboard.", slot.title()));
                        SubmitOutcome::CopyText(content)
                    }
                    None => {
                        self.set_notice(format!("{} has no content yet.", slot.title()));
                        SubmitOutcome::Idle
                    }
                }
            }
            Command::NewConversation(title) => {
                self.chat.create_conversation(&title, ContextType::Database);
                self.set_notice("Started a new conversation.");
                SubmitOutcome::Idle
            }
            Command::Title(text) => {
                match self.chat.current_id() {
                    Some(id) if self.chat.update_title(id, &text) => {
                        self.set_notice("Conversation renamed.");
                    }
                    Some(_) => self.set_notice("Usage: /title <text>"),
                    None => self.set_notice("No conversation is selected."),
                }
                SubmitOutcome::Idle
            }
            Command::DeleteConversation => {
                match self.chat.current_id() {
                    Some(id) => {
                        self.chat.delete_conversation(id);
                        self.set_notice("Conversation deleted.");
                    }
                    None => self.set_notice("No conversation is selected."),
                }
                SubmitOutcome::Idle
            }
            Command::Quit => SubmitOutcome::Quit,
        }
    }

    fn export_selection(&self, slot_arg: Option<&str>) -> Result<Option<TabSlot>, String> {
        let session = self.orchestrator.session();
        match slot_arg {
            Some(raw) => {
                let slot = TabSlot::parse(raw).ok_or_else(|| format!("Unknown tab: {raw}"))?;
                if session.tab_content(slot).is_none() {
                    return Err(format!("{} has no content yet.", slot.title()));
                }
                Ok(Some(slot))
            }
            None => {
                if session.populated_tabs().next().is_none() {
                    Err("Nothing to export yet.".to_string())
                } else {
                    Ok(None)
                }
            }
        }
    }

    pub fn start_generation(&mut self, prompt: &str) -> Result<GenerationRequest, GenerationError> {
        let session_id = self.orchestrator.start(prompt, &self.db_type, self.mode)?;
        Ok(GenerationRequest {
            session_id,
            prompt: prompt.trim().to_string(),
            db_type: self.db_type.clone(),
            mode: self.mode,
        })
    }

    pub fn fail_generation(&mut self, session_id: u64, error: GenerationError) {
        self.orchestrator.fail(session_id, error);
    }

    /// Folds one generator subprocess event into the orchestrator.
    pub fn on_generation_event(&mut self, event: ServiceEvent) {
        let session_id = self.orchestrator.session_id();
        match event {
            ServiceEvent::Progress(progress) => self.on_generation_progress(session_id, progress),
            ServiceEvent::System(line) => self.orchestrator.note(format!("Service: {line}")),
            ServiceEvent::Failed { code, message } => {
                self.orchestrator
                    .fail(session_id, map_wire_error(code, &message));
            }
            ServiceEvent::ChatReply { .. } => {
                self.orchestrator
                    .note("Ignoring chat reply on the generation stream.");
            }
            ServiceEvent::Completed { success, exit_code } => {
                if !self.orchestrator.is_generating() {
                    return;
                }
                let error = if success {
                    GenerationError::Other(
                        "generator exited before completing all steps".to_string(),
                    )
                } else {
                    GenerationError::Other(format!(
                        "generator exited with status code {exit_code}"
                    ))
                };
                self.orchestrator.fail(session_id, error);
            }
        }
    }

    fn on_generation_progress(&mut self, session_id: u64, progress: WireProgress) {
        let mode = self.orchestrator.session().mode;
        let Some(step) = StepId::parse(mode, &progress.step) else {
            self.orchestrator
                .note(format!("Ignoring unknown step \"{}\".", progress.step));
            return;
        };
        let completion = if progress.is_complete {
            let result = progress.result.as_ref();
            Some(StepResult {
                title: result
                    .map(|r| r.title.trim().to_string())
                    .filter(|t| !t.is_empty())
                    .unwrap_or_else(|| step.wire_name().to_string()),
                content: result.map(|r| r.content.clone()).unwrap_or_default(),
                reasoning: result
                    .map(|r| r.reasoning.clone())
                    .filter(|r| !r.trim().is_empty())
                    .unwrap_or_else(|| progress.reasoning.clone()),
                agent: progress.agent.clone(),
            })
        } else {
            None
        };
        let newly = self.orchestrator.apply(
            session_id,
            ProgressEvent {
                step,
                agent: progress.agent,
                reasoning: progress.reasoning,
                current_step: progress.current_step,
                total_steps: progress.total_steps,
                completion,
            },
        );
        if let Some(first) = newly.first() {
            self.active_tab = *first;
            self.results_scroll = 0;
        }
    }

    /// Folds one chat subprocess event into the chat reducer.
    pub fn on_chat_event(&mut self, event: ServiceEvent) {
        match event {
            ServiceEvent::ChatReply {
                content,
                tokens_used,
                processing_time_ms,
            } => {
                self.chat.complete_send(ChatReply {
                    content,
                    tokens_used,
                    processing_time_ms,
                });
            }
            ServiceEvent::Failed { code, message } => {
                let text = map_wire_error(code, &message).to_string();
                self.restore_failed_send(&text);
            }
            ServiceEvent::System(line) => {
                self.orchestrator.note(format!("Chat service: {line}"));
            }
            ServiceEvent::Progress(_) => {
                self.orchestrator
                    .note("Ignoring progress event on the chat stream.");
            }
            ServiceEvent::Completed { success, exit_code } => {
                if !success && self.chat.is_typing() {
                    self.restore_failed_send(&format!(
                        "Chat service exited with status code {exit_code}."
                    ));
                }
            }
        }
    }

    fn restore_failed_send(&mut self, error: &str) {
        if let Some(text) = self.chat.fail_send(error) {
            self.set_chat_input(text);
        }
        self.set_notice(error.to_string());
    }

    pub fn transcript_lines(&self) -> Vec<String> {
        self.orchestrator
            .session()
            .reasoning()
            .iter()
            .map(|entry| match entry.author {
                ReasoningAuthor::User => format!("You: {}", entry.text),
                ReasoningAuthor::Assistant => match entry.agent.as_deref() {
                    Some(agent) => format!("{agent}: {}", entry.text),
                    None => format!("Studio: {}", entry.text),
                },
            })
            .collect()
    }

    pub fn chat_lines(&self) -> Vec<String> {
        let mut lines: Vec<String> = self
            .chat
            .display_messages()
            .iter()
            .map(|message| match message.role {
                crate::chat::MessageRole::User => format!("You: {}", message.content),
                crate::chat::MessageRole::Assistant => format!("Assistant: {}", message.content),
                crate::chat::MessageRole::System => format!("System: {}", message.content),
            })
            .collect();
        if self.chat.is_typing() {
            lines.push("Assistant is typing...".to_string());
        }
        if let Some(error) = self.chat.error.as_deref() {
            lines.push(format!("System: {error}"));
        }
        lines
    }

    pub fn tab_label(&self, slot: TabSlot) -> String {
        let session = self.orchestrator.session();
        if session.is_complete(slot) {
            format!("\u{2713} {}", slot.title())
        } else if session.current_step == Some(slot) {
            format!("\u{2026} {}", slot.title())
        } else {
            slot.title().to_string()
        }
    }

    pub fn results_markdown(&self) -> String {
        match self.orchestrator.session().tab_content(self.active_tab) {
            Some(result) => result.content.clone(),
            None => format!(
                "# {}\n\nNo content yet. Run `/generate <prompt>` to fill this tab.",
                self.active_tab.title()
            ),
        }
    }
}

fn map_wire_error(code: WireErrorCode, message: &str) -> GenerationError {
    match code {
        WireErrorCode::Connectivity => GenerationError::Connectivity,
        WireErrorCode::RateLimited => GenerationError::RateLimited,
        WireErrorCode::Internal => {
            let message = message.trim();
            if message.is_empty() {
                GenerationError::Other("the service reported an internal error".to_string())
            } else {
                GenerationError::Other(message.to_string())
            }
        }
    }
}

fn char_to_byte_idx(s: &str, char_idx: usize) -> usize {
    s.char_indices()
        .nth(char_idx)
        .map(|(byte_idx, _)| byte_idx)
        .unwrap_or_else(|| s.len())
}

fn nearest_index_for_line_col(positions: &[(u16, u16)], target_line: u16, goal_col: u16) -> usize {
    let mut best: Option<(usize, u16)> = None;
    let mut fallback: Option<usize> = None;

    for (idx, (line, col)) in positions.iter().copied().enumerate() {
        if line != target_line {
            continue;
        }
        if fallback.is_none() {
            fallback = Some(idx);
        }
        if col <= goal_col {
            best = match best {
                Some((_, best_col)) if best_col >= col => best,
                _ => Some((idx, col)),
            };
        }
    }

    if let Some((idx, _)) = best {
        idx
    } else {
        fallback.unwrap_or(positions.len().saturating_sub(1))
    }
}

fn command_query(input: &str) -> Option<&str> {
    let trimmed = input.trim_start();
    if !trimmed.starts_with('/') {
        return None;
    }
    Some(trimmed.split_whitespace().next().unwrap_or(trimmed))
}

#[cfg(test)]
#[path = "../tests/unit/app_tests.rs"]
mod tests;
