use std::io::{self, Write};
use std::path::PathBuf;
use std::time::{Duration, Instant};

use clap::{Parser, Subcommand};
use crossterm::cursor::SetCursorStyle;
use crossterm::event::{DisableMouseCapture, EnableMouseCapture};
use crossterm::execute;
use crossterm::terminal::{
    EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode,
};
use ratatui::prelude::*;

mod app;
mod backend;
mod chat;
mod config;
mod events;
mod export;
mod generation;
mod services;
mod text_layout;
mod theme;
mod ui;

use app::{App, Pane, SubmitOutcome};
use chat::MessageRole;
use config::StudioConfig;
use events::AppEvent;
use generation::{GenerationError, GenerationMode, TabSlot};
use services::{
    ChatService, CommandChatService, CommandGenerationService, GenerationRequest,
    GenerationService,
};
use theme::Theme;

const MAX_SERVICE_EVENTS_PER_LOOP: usize = 128;
const MAX_HISTORY_CONTEXT_MESSAGES: usize = 10;

#[derive(Debug, Parser)]
#[command(name = "schemastudio", about = "Terminal studio for AI database design")]
struct LaunchOptions {
    /// Path to the studio config file.
    #[arg(long, default_value = "studio.toml")]
    config: PathBuf,
    /// Override the default generation mode (standard or assisted).
    #[arg(long)]
    mode: Option<String>,
    /// Override the default database type.
    #[arg(long)]
    db_type: Option<String>,
    /// Start a generation immediately from a prompt file.
    #[arg(long)]
    prompt_file: Option<PathBuf>,
    #[command(subcommand)]
    command: Option<LaunchCommand>,
}

#[derive(Debug, Subcommand)]
enum LaunchCommand {
    /// Check generator connectivity and exit.
    Probe,
}

fn main() -> io::Result<()> {
    let options = LaunchOptions::parse();
    let config = StudioConfig::load(&options.config)?;
    let mode = options
        .mode
        .as_deref()
        .and_then(GenerationMode::parse)
        .unwrap_or(config.default_mode);

    if let Some(LaunchCommand::Probe) = options.command {
        return run_probe(&config, mode);
    }

    let startup_prompt = match &options.prompt_file {
        Some(path) => Some(export::read_text_file(path)?),
        None => None,
    };

    let mut app = App::default();
    app.mode = mode;
    app.db_type = options
        .db_type
        .clone()
        .unwrap_or_else(|| config.default_db_type.clone());
    app.export_dir = PathBuf::from(&config.export_dir);

    enable_raw_mode()?;

    let mut stdout = io::stdout();
    execute!(
        stdout,
        EnterAlternateScreen,
        EnableMouseCapture,
        SetCursorStyle::SteadyBar
    )?;

    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;
    terminal.clear()?;
    let theme = Theme::load_or_default("theme.toml");
    let result = run_app(
        &mut terminal,
        app,
        &theme,
        &config,
        startup_prompt.as_deref(),
    );

    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        SetCursorStyle::DefaultUserShape,
        DisableMouseCapture,
        LeaveAlternateScreen
    )?;
    terminal.show_cursor()?;

    result
}

fn run_probe(config: &StudioConfig, mode: GenerationMode) -> io::Result<()> {
    let service = CommandGenerationService::new(config.generator_command(mode));
    if service.test_connection() {
        println!("generator ({}): ok", mode.label());
        Ok(())
    } else {
        println!("generator ({}): unreachable", mode.label());
        std::process::exit(1);
    }
}

fn run_app(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    mut app: App,
    theme: &Theme,
    config: &StudioConfig,
    startup_prompt: Option<&str>,
) -> io::Result<()> {
    let mut generation_service = CommandGenerationService::new(config.generator_command(app.mode));
    let mut chat_service = CommandChatService::new(config.chat_command());
    let mut generation_deadline: Option<Instant> = None;

    if let Some(prompt) = startup_prompt {
        match app.start_generation(prompt) {
            Ok(request) => begin_generation(
                &mut app,
                &mut generation_service,
                config,
                &mut generation_deadline,
                request,
            ),
            Err(err) => app.set_notice(err.to_string()),
        }
    }

    while app.running {
        for event in generation_service.drain_events(MAX_SERVICE_EVENTS_PER_LOOP) {
            app.on_generation_event(event);
        }
        if generation_deadline.is_some() && !app.is_generating() {
            generation_deadline = None;
            generation_service.cancel();
        }
        if let Some(deadline) = generation_deadline
            && Instant::now() >= deadline
            && app.is_generating()
        {
            generation_service.cancel();
            let session_id = app.orchestrator().session_id();
            app.fail_generation(
                session_id,
                GenerationError::TimedOut(config.generation_timeout_secs),
            );
            generation_deadline = None;
        }
        for event in chat_service.drain_events(MAX_SERVICE_EVENTS_PER_LOOP) {
            app.on_chat_event(event);
        }

        terminal.draw(|frame| ui::render(frame, &app, theme))?;
        let size = terminal.size()?;
        let screen = Rect::new(0, 0, size.width, size.height);

        match events::next_event()? {
            AppEvent::Tick => app.on_tick(),
            AppEvent::Quit => app.quit(),
            AppEvent::NextPane => app.next_pane(),
            AppEvent::PrevPane => app.prev_pane(),
            AppEvent::MoveUp => {
                if app.active_pane == Pane::Chat {
                    app.move_cursor_up(ui::chat_input_text_width(screen));
                } else {
                    app.scroll_up();
                }
            }
            AppEvent::MoveDown => {
                if app.active_pane == Pane::Chat {
                    app.move_cursor_down(ui::chat_input_text_width(screen));
                } else {
                    app.scroll_down(active_pane_max_scroll(screen, &app));
                }
            }
            AppEvent::CursorLeft => app.move_cursor_left(),
            AppEvent::CursorRight => app.move_cursor_right(),
            AppEvent::ScrollChatUp => app.scroll_chat_up(),
            AppEvent::ScrollChatDown => {
                let max = ui::chat_max_scroll(screen, &app);
                app.scroll_chat_down(max);
            }
            AppEvent::ScrollResultsUp => app.scroll_results_up(),
            AppEvent::ScrollResultsDown => {
                let max = ui::results_max_scroll(screen, &app);
                app.scroll_results_down(max);
            }
            AppEvent::NextTab => app.next_tab(),
            AppEvent::PrevTab => app.prev_tab(),
            AppEvent::SelectTab(index) => app.select_tab(index as usize),
            AppEvent::InputChar(c) => app.input_char(c),
            AppEvent::Backspace => app.backspace_input(),
            AppEvent::Autocomplete => {
                if !app.autocomplete_top_command() {
                    app.next_pane();
                }
            }
            AppEvent::Submit => {
                let outcome = app.submit();
                handle_submit_outcome(
                    &mut app,
                    outcome,
                    &mut generation_service,
                    &mut chat_service,
                    config,
                    &mut generation_deadline,
                )?;
            }
            AppEvent::MouseScrollUp => app.scroll_up(),
            AppEvent::MouseScrollDown => {
                app.scroll_down(active_pane_max_scroll(screen, &app));
            }
            AppEvent::MouseLeftClick(x, y) => {
                if let Some(index) = ui::tab_hit_test(screen, &app, x, y) {
                    app.active_pane = Pane::Results;
                    app.select_tab(index);
                } else if let Some(pane) = ui::pane_hit_test(screen, x, y) {
                    app.active_pane = pane;
                }
            }
        }
    }

    Ok(())
}

fn active_pane_max_scroll(screen: Rect, app: &App) -> u16 {
    match app.active_pane {
        Pane::Transcript => ui::transcript_max_scroll(screen, app),
        Pane::Chat => ui::chat_max_scroll(screen, app),
        Pane::Results => ui::results_max_scroll(screen, app),
    }
}

fn handle_submit_outcome(
    app: &mut App,
    outcome: SubmitOutcome,
    generation_service: &mut CommandGenerationService,
    chat_service: &mut CommandChatService,
    config: &StudioConfig,
    generation_deadline: &mut Option<Instant>,
) -> io::Result<()> {
    match outcome {
        SubmitOutcome::Idle => {}
        SubmitOutcome::Quit => app.quit(),
        SubmitOutcome::StartGeneration(request) => {
            begin_generation(app, generation_service, config, generation_deadline, request);
        }
        SubmitOutcome::CancelGeneration => {
            generation_service.cancel();
            *generation_deadline = None;
        }
        SubmitOutcome::SendChat(outbound) => {
            if outbound.include_schema_context
                && let Some(schema) = app.orchestrator().session().tab_content(TabSlot::Schema)
            {
                chat_service.add_schema_context(&schema.content);
            }
            if outbound.include_history_context {
                let history = recent_user_messages(app, outbound.conversation_id);
                if !history.is_empty() {
                    chat_service.add_query_history_context(&history);
                }
            }
            chat_service.send_message(&outbound);
        }
        SubmitOutcome::ExportTabs(selection) => {
            let dir = app.export_dir.clone();
            let written = {
                let session = app.orchestrator().session();
                match selection {
                    Some(slot) => match session.tab_content(slot) {
                        Some(result) => {
                            export::export_slot(&dir, slot, result).map(|path| vec![path])
                        }
                        None => Ok(Vec::new()),
                    },
                    None => export::export_session(&dir, session),
                }
            };
            match written {
                Ok(paths) => {
                    app.set_notice(format!(
                        "Exported {} tab(s) to {}.",
                        paths.len(),
                        dir.display()
                    ));
                }
                Err(err) => app.set_notice(format!("Export failed: {err}")),
            }
        }
        SubmitOutcome::CopyText(text) => {
            let mut stdout = io::stdout();
            stdout.write_all(export::clipboard_osc52(&text).as_bytes())?;
            stdout.flush()?;
        }
    }
    Ok(())
}

/// Most recent user messages of the conversation, oldest first, for the chat
/// service's query-history context block.
fn recent_user_messages(app: &App, conversation_id: u64) -> Vec<String> {
    let mut history: Vec<String> = app
        .chat
        .messages(conversation_id)
        .iter()
        .rev()
        .filter(|message| message.role == MessageRole::User)
        .take(MAX_HISTORY_CONTEXT_MESSAGES)
        .map(|message| message.content.clone())
        .collect();
    history.reverse();
    history
}

/// Probes connectivity, then hands the request to the generator subprocess.
/// A failed probe surfaces as a connectivity failure on the session that was
/// just started.
fn begin_generation(
    app: &mut App,
    generation_service: &mut CommandGenerationService,
    config: &StudioConfig,
    generation_deadline: &mut Option<Instant>,
    request: GenerationRequest,
) {
    generation_service.set_command(config.generator_command(request.mode));
    if !generation_service.test_connection() {
        app.fail_generation(request.session_id, GenerationError::Connectivity);
        *generation_deadline = None;
        return;
    }
    generation_service.begin(&request);
    *generation_deadline =
        Some(Instant::now() + Duration::from_secs(config.generation_timeout_secs));
}
