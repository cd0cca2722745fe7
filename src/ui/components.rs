//! Building blocks for a queue item: lozenges, titled status slots and the
//! full set of lines for one entry.

use chrono::{DateTime, Utc};
use ratatui::{
    style::{Modifier, Style},
    text::{Line, Span},
};

use crate::queue::format::{self, Appearance};
use crate::queue::item::{Detail, QueueItem};
use crate::queue::StatusUpdate;
use crate::theme::Theme;
use crate::users::{author_name, UserResolver};

const DETAIL_INDENT: &str = "  ";

/// Everything needed to draw one queue entry
pub struct QueueItemView<'a> {
    pub item: &'a QueueItem,
    /// Whole queue, for resolving `dependsOn` ids to PR numbers
    pub queue: Option<&'a [StatusUpdate]>,
    pub users: &'a dyn UserResolver,
    pub bitbucket_base_url: &'a str,
    pub now: DateTime<Utc>,
    pub selected: bool,
    /// Drawn hanging off the previous entry
    pub joined: bool,
}

/// Small coloured badge, e.g. ` RUNNING `
pub fn lozenge(text: &str, appearance: Appearance, theme: &Theme) -> Span<'static> {
    let colors = theme.lozenge(appearance);
    Span::styled(
        format!(" {} ", text.to_uppercase()),
        Style::default()
            .fg(colors.fg)
            .bg(colors.bg)
            .add_modifier(Modifier::BOLD),
    )
}

/// Lozenge plus its title as a dim hint (terminals have no hover)
pub fn lozenge_with_title(
    text: &str,
    appearance: Appearance,
    title: Option<&str>,
    theme: &Theme,
) -> Vec<Span<'static>> {
    let mut spans = vec![lozenge(text, appearance, theme)];
    if let Some(title) = title.filter(|t| *t != text) {
        spans.push(Span::styled(
            format!(" ({})", title),
            Style::default().fg(theme.text_dim),
        ));
    }
    spans
}

/// A labelled slot: dim title followed by its content
pub fn status_item(title: &str, content: Vec<Span<'static>>, theme: &Theme) -> Vec<Span<'static>> {
    let mut spans = Vec::with_capacity(content.len() + 1);
    spans.push(Span::styled(
        format!("{} ", title),
        Style::default().fg(theme.text_dim),
    ));
    spans.extend(content);
    spans
}

fn plain(text: impl Into<String>, theme: &Theme) -> Span<'static> {
    Span::styled(text.into(), Style::default().fg(theme.text))
}

fn gutter(view: &QueueItemView, theme: &Theme) -> Span<'static> {
    if view.selected {
        Span::styled("▌ ", Style::default().fg(theme.accent))
    } else {
        Span::raw("  ")
    }
}

/// Join several slots into one row with a gap between them
fn row(
    view: &QueueItemView,
    indent: bool,
    slots: Vec<Vec<Span<'static>>>,
    theme: &Theme,
) -> Line<'static> {
    let mut spans = vec![gutter(view, theme)];
    if indent {
        spans.push(Span::raw(DETAIL_INDENT));
    }
    for (i, slot) in slots.into_iter().enumerate() {
        if i > 0 {
            spans.push(Span::raw("   "));
        }
        spans.extend(slot);
    }
    Line::from(spans)
}

pub fn queue_item_lines(view: &QueueItemView, theme: &Theme) -> Vec<Line<'static>> {
    let status = view.item.status();
    let request = &status.request;
    let pull_request = &request.pull_request;
    let depends_on = format::resolve_dependencies(request.depends_on.as_deref(), view.queue);

    let mut lines = Vec::new();

    if view.joined {
        lines.push(Line::from(Span::styled(
            "  │",
            Style::default().fg(theme.inactive),
        )));
    }

    // Title and action button
    let mut title = vec![
        gutter(view, theme),
        Span::styled(
            format!("[PR #{}]", request.pull_request_id),
            Style::default().fg(theme.link).add_modifier(Modifier::UNDERLINED),
        ),
        Span::raw(" "),
        Span::styled(
            pull_request.title.clone(),
            Style::default().fg(theme.text).add_modifier(Modifier::BOLD),
        ),
    ];
    if let Some(action) = view.item.available_action() {
        title.push(Span::raw("   "));
        title.push(Span::styled(
            format!("[{}]", action.label()),
            Style::default().fg(theme.danger).add_modifier(Modifier::BOLD),
        ));
    }
    lines.push(Line::from(title));

    // Status, author, branch, time since transition
    let mut slots = vec![
        status_item(
            "Status:",
            vec![lozenge(format::label(status.state), format::appearance(status.state), theme)],
            theme,
        ),
        status_item(
            "Author:",
            vec![lozenge(
                &author_name(view.users, &pull_request.author_aaid),
                Appearance::Default,
                theme,
            )],
            theme,
        ),
    ];
    if let Some(branch) = pull_request.target_branch.as_deref() {
        slots.push(status_item(
            "Target Branch:",
            lozenge_with_title(
                branch,
                format::target_branch_appearance(Some(branch)),
                Some(branch),
                theme,
            ),
            theme,
        ));
    }
    slots.push(status_item(
        &format!("{}:", format::past_tense(status.state)),
        vec![plain(format::time_ago(status.date, view.now), theme)],
        theme,
    ));
    lines.push(row(view, false, slots, theme));

    if status.state.is_active() && !depends_on.is_empty() {
        lines.push(row(
            view,
            false,
            vec![status_item(
                "Build depends on:",
                vec![plain(depends_on.join(", "), theme)],
                theme,
            )],
            theme,
        ));
    }

    // Show more / show less
    let (icon, toggle_text) = match view.item.detail() {
        Detail::Collapsed => ("+", "Show more..."),
        Detail::Loading { .. } => ("…", "Loading"),
        Detail::Expanded(_) => ("×", "Show less"),
    };
    lines.push(Line::from(vec![
        gutter(view, theme),
        Span::raw(DETAIL_INDENT),
        Span::styled(format!("{} ", icon), Style::default().fg(theme.accent)),
        Span::styled(toggle_text, Style::default().fg(theme.text_dim)),
    ]));

    if let Some(history) = view.item.history() {
        lines.extend(more_info_lines(view, status, history, &depends_on, theme));
    }

    lines
}

fn more_info_lines(
    view: &QueueItemView,
    status: &StatusUpdate,
    history: &[StatusUpdate],
    depends_on: &[String],
    theme: &Theme,
) -> Vec<Line<'static>> {
    let mut lines = Vec::new();

    if let Some(build_id) = status.request.build_id {
        lines.push(row(
            view,
            true,
            vec![status_item(
                "Pipelines link:",
                vec![
                    Span::styled(format!("#{}", build_id), Style::default().fg(theme.link)),
                    Span::styled(
                        format!(" {}", format::build_url(view.bitbucket_base_url, build_id)),
                        Style::default().fg(theme.text_dim),
                    ),
                ],
                theme,
            )],
            theme,
        ));
    }

    let transitions = history
        .iter()
        .enumerate()
        .map(|(index, entry)| {
            let title = if index == 0 {
                "Status History:".to_string()
            } else {
                format!("— {} →", format::duration_between(&history[index - 1], entry))
            };
            status_item(
                &title,
                lozenge_with_title(
                    format::label(entry.state),
                    format::appearance(entry.state),
                    entry.reason.as_deref(),
                    theme,
                ),
                theme,
            )
        })
        .collect();
    lines.push(row(view, true, transitions, theme));

    if let Some(reason) = status.reason.as_deref() {
        let slot = status_item("Reason:", vec![plain(reason, theme)], theme);
        lines.push(row(view, true, vec![slot], theme));
    }

    if status.state.is_terminal() && !depends_on.is_empty() {
        lines.push(row(
            view,
            true,
            vec![status_item("Depended On:", vec![plain(depends_on.join(", "), theme)], theme)],
            theme,
        ));
    }

    lines
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queue::item::{TicketCounter, Toggle};
    use crate::queue::tests::status;
    use crate::queue::{LandRequestInfo, LandState};
    use crate::users::UserDirectory;
    use chrono::Duration;
    use std::collections::HashMap;

    fn text(lines: &[Line]) -> Vec<String> {
        lines
            .iter()
            .map(|line| line.spans.iter().map(|s| s.content.as_ref()).collect::<String>())
            .collect()
    }

    fn users() -> UserDirectory {
        let mut names = HashMap::new();
        names.insert("aaid-1".to_string(), "Ada".to_string());
        UserDirectory::new(&names)
    }

    fn render(item: &QueueItem, queue: Option<&[StatusUpdate]>) -> Vec<String> {
        let users = users();
        let view = QueueItemView {
            item,
            queue,
            users: &users,
            bitbucket_base_url: "https://bitbucket.org/team/repo",
            now: item.status().date + Duration::minutes(5),
            selected: false,
            joined: false,
        };
        text(&queue_item_lines(&view, &Theme::default()))
    }

    #[test]
    fn test_collapsed_queued_item() {
        let mut queued = status("r1", 42, LandState::Queued);
        queued.request.pull_request.target_branch = Some("master".to_string());
        queued.request.depends_on = Some("r0,r9".to_string());
        let queue = vec![status("r0", 41, LandState::Running), queued.clone()];

        let lines = render(&QueueItem::new(queued), Some(queue.as_slice()));

        assert_eq!(lines.len(), 4);
        assert!(lines[0].contains("[PR #42] Pull request 42"));
        assert!(lines[0].contains("[Remove]"));
        assert!(lines[1].contains("Status:  IN QUEUE "));
        assert!(lines[1].contains("Author:  ADA "));
        assert!(lines[1].contains("Target Branch:  MASTER "));
        assert!(!lines[1].contains("(master)"));
        assert!(lines[1].contains("Told To Land: 5 minutes ago"));
        assert!(lines[2].contains("Build depends on: #41, ??"));
        assert!(lines[3].contains("+ Show more..."));
    }

    #[test]
    fn test_unknown_author_falls_back_to_id() {
        let mut running = status("r1", 7, LandState::Running);
        running.request.pull_request.author_aaid = "557058:abc".to_string();

        let lines = render(&QueueItem::new(running), None);
        assert!(lines[0].contains("[Cancel]"));
        assert!(lines[1].contains("Author:  557058:ABC "));
    }

    #[test]
    fn test_terminal_item_has_no_action_or_dependency_row() {
        let mut failed = status("r1", 7, LandState::Fail);
        failed.request.depends_on = Some("r0".to_string());
        let queue = vec![status("r0", 6, LandState::Running)];

        let lines = render(&QueueItem::new(failed), Some(queue.as_slice()));
        assert_eq!(lines.len(), 3);
        assert!(!lines[0].contains("Remove") && !lines[0].contains("Cancel"));
        assert!(lines[1].contains("Failed: 5 minutes ago"));
    }

    #[test]
    fn test_expanded_item_shows_history() {
        let mut queued = status("r1", 42, LandState::Queued);
        queued.is_latest = false;
        let mut failed = status("r1", 42, LandState::Fail);
        failed.date = queued.date + Duration::seconds(125);
        failed.reason = Some("Build failed".to_string());
        failed.request.build_id = Some(99);
        failed.request.depends_on = Some("r0".to_string());
        let queue = vec![status("r0", 41, LandState::Running)];

        let mut item = QueueItem::new(queued.clone());
        let Toggle::Fetch(ticket) = item.toggle(&mut TicketCounter::default()) else {
            panic!("expected fetch");
        };
        item.apply_detail(ticket, LandRequestInfo { statuses: vec![queued, failed] });

        let lines = render(&item, Some(queue.as_slice()));
        let joined = lines.join("\n");

        assert!(joined.contains("× Show less"));
        assert!(joined.contains(
            "Pipelines link: #99 https://bitbucket.org/team/repo/addon/pipelines/home#!/results/99"
        ));
        assert!(joined.contains("Status History:  IN QUEUE "));
        assert!(joined.contains("— 2m 5s →  FAILED  (Build failed)"));
        assert!(joined.contains("Reason: Build failed"));
        assert!(joined.contains("Depended On: #41"));
        assert!(!joined.contains("Build depends on"));
    }

    #[test]
    fn test_loading_and_joined() {
        let mut item = QueueItem::new(status("r1", 42, LandState::Queued));
        item.toggle(&mut TicketCounter::default());
        let users = users();
        let view = QueueItemView {
            item: &item,
            queue: None,
            users: &users,
            bitbucket_base_url: "",
            now: item.status().date,
            selected: true,
            joined: true,
        };

        let lines = text(&queue_item_lines(&view, &Theme::default()));
        assert_eq!(lines[0], "  │");
        assert!(lines[1].starts_with("▌ "));
        assert!(lines.last().is_some_and(|l| l.contains("… Loading")));
    }
}
