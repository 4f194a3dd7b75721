use ratatui::prelude::*;
use ratatui::text::{Line, Span, Text};
use ratatui::widgets::{Block, Clear, Padding, Paragraph, Tabs};

use crate::app::{App, CommandSuggestion, Pane};
use crate::generation::TabSlot;
use crate::text_layout::wrap_word_with_positions;
use crate::theme::Theme;

const MAX_INPUT_TEXT_LINES: u16 = 5;
const TEXT_PADDING: u16 = 1;
const STATUS_HEIGHT: u16 = 3;
const TITLE_BAR_HEIGHT: u16 = 3;
const ACTIVE_TITLE_BG: Color = Color::Rgb(90, 145, 200);
const ACTIVE_TITLE_FG: Color = Color::Black;
const STATUS_HELP_TEXT: &str =
    "Shift+Tab focus | F1-F5 or Ctrl+Left/Right tabs | PgUp/PgDn scroll results | /generate to start";

fn body_areas(screen: Rect) -> (Rect, Rect, Rect, Rect) {
    let [body, status] =
        Layout::vertical([Constraint::Min(0), Constraint::Length(STATUS_HEIGHT)]).areas(screen);
    let [left, right] =
        Layout::horizontal([Constraint::Percentage(50), Constraint::Percentage(50)]).areas(body);
    let [transcript, chat] =
        Layout::vertical([Constraint::Percentage(50), Constraint::Percentage(50)]).areas(left);
    (transcript, chat, right, status)
}

pub fn chat_input_text_width(screen: Rect) -> u16 {
    let (_, chat, _, _) = body_areas(screen);
    let [_title_bar, content] =
        Layout::vertical([Constraint::Length(TITLE_BAR_HEIGHT), Constraint::Min(0)]).areas(chat);
    content.width.saturating_sub(TEXT_PADDING * 2).max(1)
}

pub fn chat_max_scroll(screen: Rect, app: &App) -> u16 {
    let (_, chat, _, _) = body_areas(screen);
    let [_title_bar, content] =
        Layout::vertical([Constraint::Length(TITLE_BAR_HEIGHT), Constraint::Min(0)]).areas(chat);
    if content.width < 1 || content.height < 2 {
        return 0;
    }

    let input_text_width = content.width.saturating_sub(TEXT_PADDING * 2).max(1);
    let input_text_lines = wrap_word_with_positions(app.chat_input(), input_text_width).line_count;
    let max_input_height = content.height.saturating_sub(1).max(1);
    let (input_height, _) = input_box_metrics(input_text_lines, 0, max_input_height);
    let [messages_area, _input_area] =
        Layout::vertical([Constraint::Min(1), Constraint::Length(input_height)]).areas(content);

    let visible_message_lines = messages_area.height.saturating_sub(TEXT_PADDING * 2);
    let total_message_lines =
        wrapped_line_count(&app.chat_lines(), input_text_width);
    total_message_lines.saturating_sub(visible_message_lines)
}

pub fn transcript_max_scroll(screen: Rect, app: &App) -> u16 {
    let (transcript, _, _, _) = body_areas(screen);
    let [_title_bar, content] = Layout::vertical([
        Constraint::Length(TITLE_BAR_HEIGHT),
        Constraint::Min(0),
    ])
    .areas(transcript);
    if content.width < 1 || content.height < 1 {
        return 0;
    }
    let width = content.width.saturating_sub(TEXT_PADDING * 2).max(1);
    let total = wrapped_line_count(&app.transcript_lines(), width);
    let visible = content.height.saturating_sub(TEXT_PADDING * 2);
    total.saturating_sub(visible)
}

pub fn results_max_scroll(screen: Rect, app: &App) -> u16 {
    let (_, _, right, _) = body_areas(screen);
    let [_tab_bar, content] =
        Layout::vertical([Constraint::Length(TITLE_BAR_HEIGHT), Constraint::Min(0)]).areas(right);
    if content.width < 1 || content.height < 1 {
        return 0;
    }
    let markdown = app.results_markdown();
    let total = markdown_text(&markdown).lines.len() as u16;
    let visible = content.height.saturating_sub(TEXT_PADDING * 2);
    total.saturating_sub(visible)
}

pub fn pane_hit_test(screen: Rect, x: u16, y: u16) -> Option<Pane> {
    let (transcript, chat, right, _) = body_areas(screen);
    if point_in_rect(transcript, x, y) {
        return Some(Pane::Transcript);
    }
    if point_in_rect(chat, x, y) {
        return Some(Pane::Chat);
    }
    if point_in_rect(right, x, y) {
        return Some(Pane::Results);
    }
    None
}

/// Maps a click inside the tab bar to a tab index, mirroring the spacing the
/// `Tabs` widget renders with (one space of padding around each title and a
/// one-cell divider between them).
pub fn tab_hit_test(screen: Rect, app: &App, x: u16, y: u16) -> Option<usize> {
    let (_, _, right, _) = body_areas(screen);
    let [tab_bar, _content] =
        Layout::vertical([Constraint::Length(TITLE_BAR_HEIGHT), Constraint::Min(0)]).areas(right);
    let inner = tab_bar.inner(Margin {
        horizontal: TEXT_PADDING,
        vertical: TEXT_PADDING,
    });
    if !point_in_rect(inner, x, y) {
        return None;
    }
    let mut offset = inner.x;
    for (idx, slot) in TabSlot::ALL.into_iter().enumerate() {
        let cell_width = app.tab_label(slot).chars().count() as u16 + 2;
        let end = offset.saturating_add(cell_width);
        if x >= offset && x < end {
            return Some(idx);
        }
        offset = end.saturating_add(1);
    }
    None
}

pub fn render(frame: &mut Frame, app: &App, theme: &Theme) {
    let (transcript, chat, right, status) = body_areas(frame.area());

    render_transcript_pane(frame, transcript, app, app.active_pane == Pane::Transcript, theme);
    render_chat_pane(frame, chat, app, app.active_pane == Pane::Chat, theme);
    render_results_pane(frame, right, app, app.active_pane == Pane::Results, theme);

    frame.render_widget(
        Block::default().style(Style::default().bg(theme.status_bg)),
        status,
    );
    let help = Paragraph::new(status_line_text(app))
        .style(Style::default().bg(theme.status_bg).fg(theme.muted_fg))
        .block(
            Block::default()
                .style(Style::default().bg(theme.status_bg))
                .padding(Padding::uniform(TEXT_PADDING)),
        );
    frame.render_widget(help, status);
}

fn render_transcript_pane(frame: &mut Frame, area: Rect, app: &App, active: bool, theme: &Theme) {
    let [title_area, content_area] =
        Layout::vertical([Constraint::Length(TITLE_BAR_HEIGHT), Constraint::Min(0)]).areas(area);
    render_title_bar(frame, title_area, "Reasoning", theme.transcript_bg, active, theme);

    let width = content_area.width.saturating_sub(TEXT_PADDING * 2).max(1);
    let mut rendered = String::new();
    for line in app.transcript_lines() {
        rendered.push_str(&wrap_word_with_positions(&line, width).rendered);
        rendered.push('\n');
    }
    frame.render_widget(
        Paragraph::new(rendered)
            .style(Style::default().bg(theme.transcript_bg).fg(theme.text_fg))
            .scroll((app.transcript_scroll(), 0))
            .block(
                Block::default()
                    .style(Style::default().bg(theme.transcript_bg))
                    .padding(Padding::uniform(TEXT_PADDING)),
            ),
        content_area,
    );
}

fn render_chat_pane(frame: &mut Frame, area: Rect, app: &App, active: bool, theme: &Theme) {
    let [title_area, content] =
        Layout::vertical([Constraint::Length(TITLE_BAR_HEIGHT), Constraint::Min(0)]).areas(area);
    let title = match app.chat.current_conversation() {
        Some(conversation) => format!("Chat: {}", conversation.title),
        None => "Chat".to_string(),
    };
    render_title_bar(frame, title_area, &title, theme.chat_bg, active, theme);

    frame.render_widget(
        Block::default().style(Style::default().bg(theme.chat_bg)),
        content,
    );
    if content.width < 1 || content.height < 2 {
        return;
    }

    let input_text_width = content.width.saturating_sub(TEXT_PADDING * 2).max(1);
    let wrapped_input_layout = wrap_word_with_positions(app.chat_input(), input_text_width);
    let input_text_lines = wrapped_input_layout.line_count;
    let (cursor_line, cursor_col) = app.chat_cursor_line_col(input_text_width);
    let max_input_height = content.height.saturating_sub(1).max(1);
    let (input_height, input_scroll) =
        input_box_metrics(input_text_lines, cursor_line, max_input_height);

    let [messages_area, input_area] =
        Layout::vertical([Constraint::Min(1), Constraint::Length(input_height)]).areas(content);

    let message_text = chat_text(&app.chat_lines(), input_text_width, theme);
    let messages = Paragraph::new(message_text)
        .scroll((
            app.chat_scroll().min(chat_max_scroll(frame.area(), app)),
            0,
        ))
        .style(Style::default().bg(theme.chat_bg).fg(theme.text_fg))
        .block(
            Block::default()
                .style(Style::default().bg(theme.chat_bg))
                .padding(Padding::uniform(TEXT_PADDING)),
        );
    frame.render_widget(messages, messages_area);

    let input = Paragraph::new(wrapped_input_layout.rendered)
        .block(
            Block::default()
                .style(Style::default().bg(theme.input_bg))
                .padding(Padding::uniform(TEXT_PADDING)),
        )
        .style(Style::default().bg(theme.input_bg).fg(theme.text_fg))
        .scroll((input_scroll, 0));
    frame.render_widget(input, input_area);
    if app.should_show_command_index() {
        render_command_index(
            frame,
            app.command_suggestions(),
            messages_area,
            input_area,
            theme,
        );
    }

    if active {
        let input_inner = input_area.inner(Margin {
            horizontal: TEXT_PADDING,
            vertical: TEXT_PADDING,
        });
        if input_inner.width > 0 && input_inner.height > 0 {
            let visible_cursor_line = cursor_line.saturating_sub(input_scroll);
            if visible_cursor_line < input_inner.height {
                frame.set_cursor_position((
                    input_inner
                        .x
                        .saturating_add(cursor_col.min(input_inner.width.saturating_sub(1))),
                    input_inner.y.saturating_add(visible_cursor_line),
                ));
            }
        }
    }
}

fn render_results_pane(frame: &mut Frame, area: Rect, app: &App, active: bool, theme: &Theme) {
    let [tab_area, content_area] =
        Layout::vertical([Constraint::Length(TITLE_BAR_HEIGHT), Constraint::Min(0)]).areas(area);
    let tab_bg = title_bar_bg(theme.results_bg, active);
    frame.render_widget(
        Block::default().style(Style::default().bg(tab_bg)),
        tab_area,
    );
    let titles: Vec<Line> = TabSlot::ALL
        .into_iter()
        .map(|slot| {
            let complete = app.orchestrator().session().is_complete(slot);
            let fg = if complete {
                theme.accent_fg
            } else if active {
                ACTIVE_TITLE_FG
            } else {
                theme.muted_fg
            };
            Line::from(Span::styled(app.tab_label(slot), Style::default().fg(fg)))
        })
        .collect();
    let tabs = Tabs::new(titles)
        .select(app.active_tab.index())
        .highlight_style(
            Style::default()
                .fg(theme.active_fg)
                .add_modifier(Modifier::BOLD),
        )
        .block(
            Block::default()
                .style(Style::default().bg(tab_bg))
                .padding(Padding::uniform(TEXT_PADDING)),
        );
    frame.render_widget(tabs, tab_area);

    let markdown = app.results_markdown();
    let text = markdown_text(&markdown);
    frame.render_widget(
        Paragraph::new(text)
            .style(Style::default().bg(theme.results_bg).fg(theme.text_fg))
            .scroll((
                app.results_scroll()
                    .min(results_max_scroll(frame.area(), app)),
                0,
            ))
            .block(
                Block::default()
                    .style(Style::default().bg(theme.results_bg))
                    .padding(Padding::uniform(TEXT_PADDING)),
            ),
        content_area,
    );
}

fn render_title_bar(
    frame: &mut Frame,
    area: Rect,
    title: &str,
    base_bg: Color,
    active: bool,
    theme: &Theme,
) {
    let bg = title_bar_bg(base_bg, active);
    let fg = if active {
        ACTIVE_TITLE_FG
    } else {
        theme.muted_fg
    };
    frame.render_widget(Block::default().style(Style::default().bg(bg)), area);
    frame.render_widget(
        Paragraph::new(title.to_string())
            .style(Style::default().bg(bg).fg(fg))
            .block(
                Block::default()
                    .style(Style::default().bg(bg))
                    .padding(Padding::uniform(TEXT_PADDING)),
            ),
        area,
    );
}

fn render_command_index(
    frame: &mut Frame,
    suggestions: Vec<CommandSuggestion>,
    messages_area: Rect,
    input_area: Rect,
    theme: &Theme,
) {
    if suggestions.is_empty() || messages_area.height == 0 || input_area.width == 0 {
        return;
    }
    let max_items = messages_area.height.saturating_sub(2).max(1) as usize;
    let shown = suggestions.into_iter().take(max_items).collect::<Vec<_>>();
    let overlay_height = (shown.len() as u16)
        .saturating_add(2)
        .min(messages_area.height.max(1));
    let y = input_area
        .y
        .saturating_sub(overlay_height)
        .max(messages_area.y);
    let overlay = Rect::new(input_area.x, y, input_area.width, overlay_height);

    let mut lines = Vec::with_capacity(shown.len() + 1);
    for (idx, item) in shown.iter().enumerate() {
        let style = if idx == 0 {
            Style::default().fg(theme.active_fg)
        } else {
            Style::default().fg(theme.text_fg)
        };
        lines.push(Line::from(vec![
            Span::styled(item.command.to_string(), style),
            Span::raw(" "),
            Span::styled(
                item.description.to_string(),
                Style::default().fg(theme.muted_fg),
            ),
        ]));
    }

    frame.render_widget(Clear, overlay);
    frame.render_widget(
        Paragraph::new(lines)
            .style(Style::default().bg(theme.input_bg))
            .block(
                Block::default()
                    .style(Style::default().bg(theme.input_bg))
                    .padding(Padding::uniform(TEXT_PADDING)),
            ),
        overlay,
    );
}

/// tui-markdown emits ratatui-core text while the widgets here come from the
/// ratatui facade, and the two crates' text types do not convert into each
/// other. Colors and modifiers share the same value layout, so the bridge is
/// a field-by-field copy.
fn markdown_text(markdown: &str) -> Text<'static> {
    let source = tui_markdown::from_str(markdown);
    Text::from(
        source
            .lines
            .iter()
            .map(markdown_line)
            .collect::<Vec<Line<'static>>>(),
    )
}

fn markdown_line(line: &ratatui_core::text::Line) -> Line<'static> {
    let spans: Vec<Span<'static>> = line
        .spans
        .iter()
        .map(|span| Span::styled(span.content.to_string(), markdown_style(span.style)))
        .collect();
    let mut converted = Line::from(spans);
    converted.style = markdown_style(line.style);
    converted.alignment = line.alignment.map(markdown_alignment);
    converted
}

fn markdown_style(style: ratatui_core::style::Style) -> Style {
    let mut converted = Style::default();
    converted.fg = style.fg.map(markdown_color);
    converted.bg = style.bg.map(markdown_color);
    converted.add_modifier = Modifier::from_bits_truncate(style.add_modifier.bits());
    converted.sub_modifier = Modifier::from_bits_truncate(style.sub_modifier.bits());
    converted
}

fn markdown_alignment(alignment: ratatui_core::layout::Alignment) -> Alignment {
    match alignment {
        ratatui_core::layout::Alignment::Left => Alignment::Left,
        ratatui_core::layout::Alignment::Center => Alignment::Center,
        ratatui_core::layout::Alignment::Right => Alignment::Right,
    }
}

fn markdown_color(color: ratatui_core::style::Color) -> Color {
    use ratatui_core::style::Color as MdColor;
    match color {
        MdColor::Reset => Color::Reset,
        MdColor::Black => Color::Black,
        MdColor::Red => Color::Red,
        MdColor::Green => Color::Green,
        MdColor::Yellow => Color::Yellow,
        MdColor::Blue => Color::Blue,
        MdColor::Magenta => Color::Magenta,
        MdColor::Cyan => Color::Cyan,
        MdColor::Gray => Color::Gray,
        MdColor::DarkGray => Color::DarkGray,
        MdColor::LightRed => Color::LightRed,
        MdColor::LightGreen => Color::LightGreen,
        MdColor::LightYellow => Color::LightYellow,
        MdColor::LightBlue => Color::LightBlue,
        MdColor::LightMagenta => Color::LightMagenta,
        MdColor::LightCyan => Color::LightCyan,
        MdColor::White => Color::White,
        MdColor::Rgb(r, g, b) => Color::Rgb(r, g, b),
        MdColor::Indexed(index) => Color::Indexed(index),
    }
}

fn status_line_text(app: &App) -> String {
    let mut text = format!(
        "mode: {} | db: {} | {STATUS_HELP_TEXT}",
        app.mode.label(),
        app.db_type
    );
    if app.is_generating() {
        text = format!("{text} | Generating {}", working_dots(app.ticks));
    }
    if let Some(notice) = app.notice() {
        text = format!("{text} | {notice}");
    }
    text
}

fn working_dots(ticks: u64) -> &'static str {
    const FRAMES: [&str; 6] = ["[   ]", "[.  ]", "[.. ]", "[...]", "[ ..]", "[  .]"];
    FRAMES[((ticks / 2) as usize) % FRAMES.len()]
}

fn wrapped_line_count(lines: &[String], width: u16) -> u16 {
    lines
        .iter()
        .map(|line| wrap_word_with_positions(line, width).line_count)
        .sum()
}

fn chat_text(messages: &[String], width: u16, theme: &Theme) -> Text<'static> {
    let mut out_lines = Vec::new();
    for (idx, message) in messages.iter().enumerate() {
        let (label, label_style) = if message.starts_with("You:") {
            ("You:", Style::default().fg(Color::Rgb(80, 190, 100)))
        } else if message.starts_with("Assistant:") {
            ("Assistant:", Style::default().fg(Color::Rgb(230, 150, 60)))
        } else if message.starts_with("System:") {
            (
                "System:",
                Style::default().fg(theme.muted_fg).add_modifier(Modifier::DIM),
            )
        } else {
            ("", Style::default())
        };
        let body = message.strip_prefix(label).unwrap_or(message).trim_start();
        let body_width = (width as usize)
            .saturating_sub(label.chars().count() + 1)
            .max(1) as u16;
        let wrapped = wrap_word_with_positions(body, body_width).rendered;
        for (line_idx, line) in wrapped.split('\n').enumerate() {
            if label.is_empty() {
                out_lines.push(Line::from(Span::raw(line.to_string())));
            } else if line_idx == 0 {
                out_lines.push(Line::from(vec![
                    Span::styled(label.to_string(), label_style),
                    Span::raw(" "),
                    Span::raw(line.to_string()),
                ]));
            } else {
                out_lines.push(Line::from(vec![
                    Span::raw(" ".repeat(label.chars().count() + 1)),
                    Span::raw(line.to_string()),
                ]));
            }
        }
        if idx + 1 < messages.len() {
            out_lines.push(Line::from(Span::styled(
                "\u{2500}".repeat(width as usize),
                Style::default().fg(separator_color(theme)),
            )));
        }
    }
    Text::from(out_lines)
}

fn separator_color(theme: &Theme) -> Color {
    match theme.chat_bg {
        Color::Rgb(r, g, b) => Color::Rgb(
            r.saturating_add(12),
            g.saturating_add(12),
            b.saturating_add(12),
        ),
        _ => theme.muted_fg,
    }
}

fn input_box_metrics(input_text_lines: u16, cursor_line: u16, max_input_height: u16) -> (u16, u16) {
    let capped_text_lines = input_text_lines.clamp(1, MAX_INPUT_TEXT_LINES);
    let desired_height = capped_text_lines.saturating_add(TEXT_PADDING * 2);
    let input_height = desired_height.clamp(1, max_input_height.max(1));
    let visible_text_lines = input_height.saturating_sub(TEXT_PADDING * 2).max(1);
    let max_scroll = input_text_lines.saturating_sub(visible_text_lines);
    let middle_line = visible_text_lines / 2;
    let input_scroll = cursor_line.saturating_sub(middle_line).min(max_scroll);
    (input_height, input_scroll)
}

fn title_bar_bg(base: Color, active: bool) -> Color {
    if active {
        return ACTIVE_TITLE_BG;
    }
    match base {
        Color::Rgb(r, g, b) => {
            let delta = -12;
            Color::Rgb(
                adjust_channel(r, delta),
                adjust_channel(g, delta),
                adjust_channel(b, delta),
            )
        }
        _ => base,
    }
}

fn point_in_rect(rect: Rect, x: u16, y: u16) -> bool {
    x >= rect.x
        && x < rect.x.saturating_add(rect.width)
        && y >= rect.y
        && y < rect.y.saturating_add(rect.height)
}

fn adjust_channel(channel: u8, delta: i16) -> u8 {
    let value = channel as i16 + delta;
    value.clamp(0, 255) as u8
}

#[cfg(test)]
#[path = "../tests/unit/ui_tests.rs"]
mod tests;
