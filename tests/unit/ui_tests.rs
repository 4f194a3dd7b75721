use super::*;

use ratatui::Terminal;
use ratatui::backend::TestBackend;

use crate::backend::{ServiceEvent, WireProgress, WireStepResult};

fn screen() -> Rect {
    Rect::new(0, 0, 100, 40)
}

fn generating_app() -> App {
    let mut app = App::default();
    app.set_chat_input("/generate a blog with posts".to_string());
    app.submit();
    app.on_generation_event(ServiceEvent::Progress(WireProgress {
        step: "schema".to_string(),
        agent: Some("Schema Architect".to_string()),
        reasoning: "Designing tables".to_string(),
        current_step: Some(1),
        total_steps: Some(4),
        is_complete: true,
        result: Some(WireStepResult {
            title: "Schema".to_string(),
            content: "## Tables\n\n```sql\nCREATE TABLE posts (id bigint);\n```".to_string(),
            reasoning: String::new(),
        }),
    }));
    app
}

#[test]
fn renders_default_app_without_panicking() {
    let backend = TestBackend::new(100, 40);
    let mut terminal = Terminal::new(backend).expect("terminal");
    let app = App::default();
    let theme = Theme::default();
    terminal
        .draw(|frame| render(frame, &app, &theme))
        .expect("draw should succeed");
}

#[test]
fn renders_populated_session_and_command_index() {
    let backend = TestBackend::new(100, 40);
    let mut terminal = Terminal::new(backend).expect("terminal");
    let mut app = generating_app();
    app.set_chat_input("/ex".to_string());
    assert!(app.should_show_command_index());
    let theme = Theme::default();
    terminal
        .draw(|frame| render(frame, &app, &theme))
        .expect("draw should succeed");
}

#[test]
fn renders_on_a_tiny_terminal() {
    let backend = TestBackend::new(8, 5);
    let mut terminal = Terminal::new(backend).expect("terminal");
    let app = generating_app();
    let theme = Theme::default();
    terminal
        .draw(|frame| render(frame, &app, &theme))
        .expect("draw should succeed");
}

#[test]
fn chat_input_width_subtracts_padding() {
    assert_eq!(chat_input_text_width(screen()), 48);
    assert_eq!(chat_input_text_width(Rect::new(0, 0, 4, 10)), 1);
}

#[test]
fn pane_hit_test_resolves_quadrants() {
    let screen = screen();
    assert_eq!(pane_hit_test(screen, 10, 5), Some(Pane::Transcript));
    assert_eq!(pane_hit_test(screen, 10, 30), Some(Pane::Chat));
    assert_eq!(pane_hit_test(screen, 75, 10), Some(Pane::Results));
    assert_eq!(pane_hit_test(screen, 10, 38), None);
}

#[test]
fn tab_hit_test_maps_clicks_to_tab_indices() {
    let app = App::default();
    let screen = screen();
    assert_eq!(tab_hit_test(screen, &app, 51, 1), Some(0));
    assert_eq!(tab_hit_test(screen, &app, 66, 1), Some(1));
    assert_eq!(tab_hit_test(screen, &app, 51, 0), None);
    assert_eq!(tab_hit_test(screen, &app, 10, 1), None);
}

#[test]
fn input_box_grows_with_text_up_to_the_cap() {
    let (height, scroll) = input_box_metrics(1, 0, 20);
    assert_eq!(height, 3);
    assert_eq!(scroll, 0);

    let (height, _) = input_box_metrics(3, 2, 20);
    assert_eq!(height, 5);

    let (height, _) = input_box_metrics(12, 0, 20);
    assert_eq!(height, MAX_INPUT_TEXT_LINES + TEXT_PADDING * 2);
}

#[test]
fn input_box_scrolls_to_keep_the_cursor_visible() {
    let (height, scroll) = input_box_metrics(12, 11, 20);
    let visible = height - TEXT_PADDING * 2;
    assert!(scroll + visible > 11);
    assert_eq!(scroll, 12 - visible);

    let (_, top_scroll) = input_box_metrics(12, 0, 20);
    assert_eq!(top_scroll, 0);
}

#[test]
fn status_line_reflects_mode_and_activity() {
    let app = App::default();
    let text = status_line_text(&app);
    assert!(text.contains("mode: standard"));
    assert!(text.contains("db: PostgreSQL"));
    assert!(!text.contains("Generating"));

    let generating = generating_app();
    assert!(status_line_text(&generating).contains("Generating"));
}

#[test]
fn working_dots_cycle_through_frames() {
    assert_eq!(working_dots(0), "[   ]");
    assert_eq!(working_dots(2), "[.  ]");
    assert_eq!(working_dots(12), "[   ]");
}

#[test]
fn max_scroll_is_zero_when_content_fits() {
    let app = App::default();
    let screen = screen();
    assert_eq!(transcript_max_scroll(screen, &app), 0);
    assert_eq!(chat_max_scroll(screen, &app), 0);
}

#[test]
fn results_scroll_covers_long_documents() {
    let mut app = generating_app();
    let long = (0..200)
        .map(|i| format!("line {i}"))
        .collect::<Vec<_>>()
        .join("\n\n");
    app.on_generation_event(ServiceEvent::Progress(WireProgress {
        step: "sample_data".to_string(),
        agent: None,
        reasoning: String::new(),
        current_step: None,
        total_steps: None,
        is_complete: true,
        result: Some(WireStepResult {
            title: "Sample Data".to_string(),
            content: long,
            reasoning: String::new(),
        }),
    }));
    app.active_tab = crate::generation::TabSlot::Implementation;
    assert!(results_max_scroll(screen(), &app) > 0);
}

#[test]
fn markdown_conversion_keeps_text_and_styling() {
    let text = markdown_text("# Title\n\nplain *emphasis*\n\n- item one\n- item two");
    assert!(text.lines.len() >= 2);

    let flattened: String = text
        .lines
        .iter()
        .flat_map(|line| line.spans.iter())
        .map(|span| span.content.as_ref())
        .collect::<Vec<&str>>()
        .join(" ");
    assert!(flattened.contains("Title"));
    assert!(flattened.contains("emphasis"));
    assert!(flattened.contains("item two"));

    let styled = text.lines.iter().any(|line| {
        line.style != Style::default()
            || line.spans.iter().any(|span| span.style != Style::default())
    });
    assert!(styled);
}

#[test]
fn point_in_rect_excludes_edges_past_the_extent() {
    let rect = Rect::new(2, 2, 4, 3);
    assert!(point_in_rect(rect, 2, 2));
    assert!(point_in_rect(rect, 5, 4));
    assert!(!point_in_rect(rect, 6, 4));
    assert!(!point_in_rect(rect, 2, 5));
}

#[test]
fn title_bar_dims_inactive_rgb_backgrounds() {
    assert_eq!(title_bar_bg(Color::Rgb(50, 52, 56), true), ACTIVE_TITLE_BG);
    assert_eq!(
        title_bar_bg(Color::Rgb(50, 52, 56), false),
        Color::Rgb(38, 40, 44)
    );
    assert_eq!(title_bar_bg(Color::Reset, false), Color::Reset);
}
