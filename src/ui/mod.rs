pub mod components;

use std::sync::OnceLock;
use chrono::Utc;
use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph, Wrap},
    Frame,
};

use crate::app::{App, Popup};
use crate::config::ThemeConfig;
use crate::queue::LandState;
use crate::theme::Theme;
use components::{queue_item_lines, QueueItemView};

static THEME: OnceLock<Theme> = OnceLock::new();

/// Load colours once at startup; later calls are ignored
pub fn init_theme(overrides: &ThemeConfig) {
    let _ = THEME.set(Theme::load(overrides));
}

fn theme() -> &'static Theme {
    THEME.get_or_init(Theme::default)
}

pub fn draw(f: &mut Frame, app: &App) {
    let area = f.area();

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .margin(0)
        .constraints([
            Constraint::Length(1), // Info line
            Constraint::Min(4),    // Queue
            Constraint::Length(1), // Footer
        ])
        .split(area);

    draw_info_line(f, app, chunks[0]);
    draw_queue_box(f, app, chunks[1]);
    draw_footer(f, app, chunks[2]);

    // Draw popups on top
    match app.popup {
        Popup::None => {}
        Popup::Help => draw_help_popup(f),
        Popup::Confirm => draw_confirm_popup(f, app),
        Popup::Alert => draw_alert_popup(f, app),
    }
}

fn draw_info_line(f: &mut Frame, app: &App, area: Rect) {
    let theme = theme();

    // Priority: status message > queue summary
    let line = if let Some(ref status) = app.status_message {
        Line::from(Span::styled(status.clone(), Style::default().fg(theme.warning)))
    } else if !app.loaded {
        Line::from(Span::styled(
            format!("Connecting to {}...", app.server_url()),
            Style::default().fg(theme.text_dim),
        ))
    } else {
        let running = app.items.iter().filter(|i| i.status().state == LandState::Running).count();
        let queued = app.items.iter().filter(|i| i.status().state == LandState::Queued).count();
        Line::from(vec![
            Span::styled(app.server_url().to_string(), Style::default().fg(theme.text_dim)),
            Span::styled(" │ ", Style::default().fg(theme.inactive)),
            Span::styled(format!("{} running", running), Style::default().fg(theme.text)),
            Span::styled(" │ ", Style::default().fg(theme.inactive)),
            Span::styled(format!("{} queued", queued), Style::default().fg(theme.text)),
        ])
    };

    let info = Paragraph::new(line).alignment(Alignment::Center);
    f.render_widget(info, area);
}

fn draw_queue_box(f: &mut Frame, app: &App, area: Rect) {
    let theme = theme();

    let block = Block::default()
        .title(Span::styled(
            " Land Queue ",
            Style::default().fg(theme.accent).add_modifier(Modifier::BOLD),
        ))
        .borders(Borders::ALL)
        .border_style(Style::default().fg(theme.inactive));

    if app.items.is_empty() {
        let message = if app.loaded { "  Queue is empty" } else { "  Loading..." };
        let empty = Paragraph::new(Line::from(Span::styled(
            message,
            Style::default().fg(theme.text_dim),
        )))
        .block(block);
        f.render_widget(empty, area);
        return;
    }

    let now = Utc::now();
    let mut lines: Vec<Line> = Vec::new();
    let mut lines_before_selected = 0;

    for (i, item) in app.items.iter().enumerate() {
        if i == app.selected {
            lines_before_selected = lines.len();
        }
        let view = QueueItemView {
            item,
            queue: Some(app.queue.as_slice()),
            users: &app.users,
            bitbucket_base_url: &app.config.bitbucket_base_url,
            now,
            selected: i == app.selected,
            joined: i > 0,
        };
        lines.extend(queue_item_lines(&view, theme));
    }

    // Keep the selected item in view, a little below the top edge.
    // Scrolling counts rows after wrapping, so measure the wrapped height.
    let inner_width = area.width.saturating_sub(2);
    let selected_start = Paragraph::new(lines[..lines_before_selected].to_vec())
        .wrap(Wrap { trim: false })
        .line_count(inner_width);
    let visible = area.height.saturating_sub(2) as usize;
    let scroll = selected_start.saturating_sub(visible / 3);

    let queue = Paragraph::new(lines)
        .block(block)
        .wrap(Wrap { trim: false })
        .scroll((scroll.min(u16::MAX as usize) as u16, 0));

    f.render_widget(queue, area);
}

fn draw_footer(f: &mut Frame, app: &App, area: Rect) {
    let theme = theme();

    let selected = app.selected_item();
    let open = selected.is_some_and(|i| i.is_expanded() || i.is_loading());
    let toggle_hint = if open { "Less" } else { "More" };
    let mut hints: Vec<(&str, &str)> = vec![("↑↓", "Nav"), ("Space", toggle_hint)];
    if let Some(action) = selected.and_then(|i| i.available_action()) {
        hints.push(("d", action.label()));
    }
    hints.extend([("r", "Refresh"), ("h", "Help"), ("q", "Quit")]);

    // Responsive: show fewer hints on narrow terminals
    let max_hints = if area.width < 60 { 4 } else { hints.len() };

    let hint_spans: Vec<Span> = hints
        .iter()
        .take(max_hints)
        .flat_map(|(key, action)| {
            vec![
                Span::styled(*key, Style::default().fg(theme.accent)),
                Span::styled(format!(" {} │ ", action), Style::default().fg(theme.text_dim)),
            ]
        })
        .collect();

    let footer = Paragraph::new(Line::from(hint_spans)).alignment(Alignment::Center);
    f.render_widget(footer, area);
}

fn draw_help_popup(f: &mut Frame) {
    let theme = theme();
    let area = f.area();
    let popup_area = centered_rect(
        if area.width < 80 { 95 } else { 70 },
        if area.height < 30 { 95 } else { 70 },
        area,
    );

    f.render_widget(Clear, popup_area);

    let heading = |text: &'static str| {
        Line::from(Span::styled(
            text,
            Style::default().fg(theme.accent).add_modifier(Modifier::BOLD),
        ))
    };
    let binding = |key: &'static str, what: &'static str| {
        Line::from(vec![
            Span::styled(key, Style::default().fg(theme.accent)),
            Span::raw(what),
        ])
    };

    let help_text = vec![
        heading("═══ Navigation ═══"),
        binding("  ↑/↓ j/k   ", "Move between queue items"),
        binding("  Space     ", "Show more / show less (status history)"),
        Line::from(""),
        heading("═══ Actions ═══"),
        binding("  d         ", "Remove a queued request, cancel a running one"),
        binding("  r         ", "Refresh the queue"),
        Line::from(""),
        heading("═══ Scripting ═══"),
        binding("  landq --status        ", "Queue as JSON"),
        binding("  landq --history ID    ", "Status history of a request"),
        binding("  landq --remove ID     ", "Remove a queued request"),
        binding("  landq --cancel ID     ", "Cancel a running request"),
        Line::from(""),
        Line::from(vec![
            Span::styled("  Press ", Style::default().fg(theme.text_dim)),
            Span::styled("h", Style::default().fg(theme.accent)),
            Span::styled("/", Style::default().fg(theme.text_dim)),
            Span::styled("?", Style::default().fg(theme.accent)),
            Span::styled("/", Style::default().fg(theme.text_dim)),
            Span::styled("Esc", Style::default().fg(theme.accent)),
            Span::styled(" to close", Style::default().fg(theme.text_dim)),
        ]),
    ];

    let help = Paragraph::new(help_text)
        .block(
            Block::default()
                .title(Span::styled(" landq Help ", Style::default().fg(theme.accent)))
                .borders(Borders::ALL)
                .border_style(Style::default().fg(theme.accent)),
        )
        .wrap(Wrap { trim: false });

    f.render_widget(help, popup_area);
}

fn draw_confirm_popup(f: &mut Frame, app: &App) {
    let theme = theme();
    let popup_area = centered_rect(50, 20, f.area());

    f.render_widget(Clear, popup_area);

    let message = app.confirm_message.as_deref().unwrap_or("Confirm?");

    let confirm = Paragraph::new(vec![
        Line::from(""),
        Line::from(Span::styled(message, Style::default().fg(theme.warning))),
        Line::from(""),
        Line::from(vec![
            Span::styled(
                "  y",
                Style::default().fg(theme.lozenge_success.fg).add_modifier(Modifier::BOLD),
            ),
            Span::raw(" Yes   "),
            Span::styled("n", Style::default().fg(theme.danger).add_modifier(Modifier::BOLD)),
            Span::raw(" No"),
        ]),
    ])
    .block(
        Block::default()
            .title(Span::styled(" Confirm ", Style::default().fg(theme.warning)))
            .borders(Borders::ALL)
            .border_style(Style::default().fg(theme.warning)),
    )
    .alignment(Alignment::Center)
    .wrap(Wrap { trim: true });

    f.render_widget(confirm, popup_area);
}

fn draw_alert_popup(f: &mut Frame, app: &App) {
    let theme = theme();
    let popup_area = centered_rect(60, 25, f.area());

    f.render_widget(Clear, popup_area);

    let message = app.alert_message.as_deref().unwrap_or("Unknown error");

    let alert = Paragraph::new(vec![
        Line::from(""),
        Line::from(Span::styled(message, Style::default().fg(theme.text))),
        Line::from(""),
        Line::from(vec![
            Span::styled("Enter", Style::default().fg(theme.accent).add_modifier(Modifier::BOLD)),
            Span::styled(" OK", Style::default().fg(theme.text_dim)),
        ]),
    ])
    .block(
        Block::default()
            .title(Span::styled(
                " Error ",
                Style::default().fg(theme.danger).add_modifier(Modifier::BOLD),
            ))
            .borders(Borders::ALL)
            .border_style(Style::default().fg(theme.danger)),
    )
    .alignment(Alignment::Center)
    .wrap(Wrap { trim: true });

    f.render_widget(alert, popup_area);
}

fn centered_rect(percent_x: u16, percent_y: u16, r: Rect) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(r);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(popup_layout[1])[1]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::LandQueueClient;
    use crate::app::AppEvent;
    use crate::config::AppConfig;
    use crate::queue::item::QueueAction;
    use crate::queue::tests::status;
    use crate::queue::ActionResponse;
    use ratatui::{backend::TestBackend, Terminal};

    fn screen(terminal: &Terminal<TestBackend>) -> String {
        let buffer = terminal.backend().buffer();
        let mut out = String::new();
        for y in 0..buffer.area.height {
            for x in 0..buffer.area.width {
                out.push_str(buffer[(x, y)].symbol());
            }
            out.push('\n');
        }
        out
    }

    fn app_with_queue() -> App {
        let mut config = AppConfig::default();
        config.users.insert("aaid-1".to_string(), "Ada".to_string());
        let client = LandQueueClient::new("http://127.0.0.1:9", 1).unwrap();
        let mut app = App::new(config, client);
        let generation = app.start_refresh(false);
        app.apply_event(AppEvent::QueueLoaded {
            generation,
            result: Ok(vec![
                status("r1", 41, LandState::Running),
                status("r2", 42, LandState::Queued),
            ]),
        });
        app
    }

    #[tokio::test]
    async fn test_draw_queue() {
        let app = app_with_queue();
        let mut terminal = Terminal::new(TestBackend::new(120, 30)).unwrap();

        terminal.draw(|f| draw(f, &app)).unwrap();
        let screen = screen(&terminal);

        assert!(screen.contains("Land Queue"));
        assert!(screen.contains("[PR #41] Pull request 41"));
        assert!(screen.contains("[PR #42] Pull request 42"));
        assert!(screen.contains("1 running"));
        assert!(screen.contains("d Cancel"));
    }

    #[tokio::test]
    async fn test_draw_alert_popup() {
        let mut app = app_with_queue();
        app.apply_event(AppEvent::ActionFinished {
            request_id: "r2".to_string(),
            action: QueueAction::Remove,
            result: Ok(ActionResponse { error: Some("Request already running".to_string()) }),
        });

        let mut terminal = Terminal::new(TestBackend::new(120, 30)).unwrap();
        terminal.draw(|f| draw(f, &app)).unwrap();
        let screen = screen(&terminal);

        assert!(screen.contains("Error"));
        assert!(screen.contains("Request already running"));
    }

    #[tokio::test]
    async fn test_selected_item_visible_when_rows_wrap() {
        let client = LandQueueClient::new("http://127.0.0.1:9", 1).unwrap();
        let mut app = App::new(AppConfig::default(), client);
        let statuses = (0..6)
            .map(|i| status(&format!("r{}", i), 40 + i, LandState::Queued))
            .collect();
        let generation = app.start_refresh(false);
        app.apply_event(AppEvent::QueueLoaded { generation, result: Ok(statuses) });
        app.selected = 5;

        // Status rows wrap over several lines at this width
        let mut terminal = Terminal::new(TestBackend::new(40, 14)).unwrap();
        terminal.draw(|f| draw(f, &app)).unwrap();
        let screen = screen(&terminal);

        assert!(screen.contains("[PR #45]"), "{}", screen);
    }

    #[test]
    fn test_draw_tiny_terminal_does_not_panic() {
        let client = LandQueueClient::new("http://127.0.0.1:9", 1).unwrap();
        let app = App::new(AppConfig::default(), client);
        let mut terminal = Terminal::new(TestBackend::new(20, 6)).unwrap();
        assert!(terminal.draw(|f| draw(f, &app)).is_ok());
    }
}
