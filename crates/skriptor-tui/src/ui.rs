use ratatui::{
    Frame,
    layout::{Constraint, Layout, Rect},
    style::{Color, Modifier, Style, Stylize},
    text::{Line, Span, Text},
    widgets::{Block, Borders, Clear, Paragraph, Wrap},
};
use skriptor_core::preview::PREVIEW_PLACEHOLDER;
use skriptor_core::{Badge, BadgeTier, ChatRole, PreviewPane, SessionPhase, StatusView};

use crate::app::{App, Confirm, FocusPane, InputMode};
use crate::markup;

const SPINNER: [&str; 4] = ["|", "/", "-", "\\"];

fn tier_color(tier: BadgeTier) -> Color {
    match tier {
        BadgeTier::Neutral => Color::Gray,
        BadgeTier::Success => Color::Green,
        BadgeTier::Warning => Color::Yellow,
        BadgeTier::Danger => Color::Red,
    }
}

fn badge_span(badge: &Badge) -> Span<'static> {
    Span::styled(
        format!(" {} ", badge.label),
        Style::default().bg(tier_color(badge.tier)).fg(Color::Black).bold(),
    )
}

/// Rows a set of lines occupies once wrapped to `width` columns.
fn wrapped_height(lines: &[Line<'_>], width: u16) -> u16 {
    let width = width.max(1) as usize;
    let rows: usize = lines
        .iter()
        .map(|line| line.width().max(1).div_ceil(width))
        .sum();
    rows.min(u16::MAX as usize) as u16
}

fn centered(area: Rect, width: u16, height: u16) -> Rect {
    let width = width.min(area.width.saturating_sub(4));
    let height = height.min(area.height.saturating_sub(2));
    Rect::new(
        area.x + (area.width.saturating_sub(width)) / 2,
        area.y + (area.height.saturating_sub(height)) / 2,
        width,
        height,
    )
}

pub fn render(app: &mut App, frame: &mut Frame) {
    let area = frame.area();

    // Main layout: header, body, footer
    let [header_area, body_area, footer_area] = Layout::vertical([
        Constraint::Length(1),
        Constraint::Min(0),
        Constraint::Length(1),
    ])
    .areas(area);

    render_header(app, frame, header_area);

    let [chat_column, side_column] = Layout::horizontal([
        Constraint::Percentage(55),
        Constraint::Percentage(45),
    ])
    .areas(body_area);

    let [chat_area, input_area] = Layout::vertical([
        Constraint::Min(0),
        Constraint::Length(3),
    ])
    .areas(chat_column);

    let [preview_area, status_area] = Layout::vertical([
        Constraint::Min(0),
        Constraint::Length(12),
    ])
    .areas(side_column);

    render_chat(app, frame, chat_area);
    render_input(app, frame, input_area);
    render_preview(app, frame, preview_area);
    render_statuses(app, frame, status_area);
    render_footer(app, frame, footer_area);

    // Render popups (in order of priority)
    if let Some(message) = app.notifier.current_alert() {
        render_alert(frame, area, &message);
    } else if let Some(confirm) = app.confirm {
        render_confirm(frame, area, confirm);
    } else if let Some(label) = app.notifier.busy_label() {
        render_busy(app, frame, area, &label);
    }
}

fn render_header(app: &App, frame: &mut Frame, area: Rect) {
    let phase = match app.snapshot.phase() {
        SessionPhase::Uninitialized => " not connected ",
        SessionPhase::Active { has_script: false } => " in conversation ",
        SessionPhase::Active { has_script: true } => " script ready ",
    };
    let count = app
        .snapshot
        .generated_count
        .map_or_else(|| "-".to_string(), |c| c.to_string());

    let title = Line::from(vec![
        Span::styled(" Skriptor ", Style::default().fg(Color::Cyan).bold()),
        Span::styled(phase, Style::default().fg(Color::White)),
        Span::styled(
            format!(" format: {} ", app.snapshot.format),
            Style::default().fg(Color::DarkGray),
        ),
        Span::styled(format!(" scripts: {} ", count), Style::default().fg(Color::White)),
        badge_span(&app.snapshot.stats_badge),
        Span::raw(" "),
        Span::styled(
            format!("v{}", env!("CARGO_PKG_VERSION")),
            Style::default().fg(Color::DarkGray),
        ),
    ]);

    let header = Paragraph::new(title).style(Style::default().bg(Color::DarkGray));
    frame.render_widget(header, area);
}

fn render_chat(app: &mut App, frame: &mut Frame, area: Rect) {
    app.chat_area = Some(area);
    app.chat_height = area.height.saturating_sub(2);
    let inner_width = area.width.saturating_sub(2);

    let border_color = if app.focus == FocusPane::Chat { Color::Cyan } else { Color::DarkGray };
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border_color))
        .title(" Conversation ");

    let mut lines: Vec<Line<'static>> = Vec::new();
    for turn in &app.snapshot.turns {
        let (who, color) = match turn.role() {
            ChatRole::User => ("You", Color::Cyan),
            ChatRole::Assistant => ("Assistant", Color::Yellow),
        };
        lines.push(Line::from(vec![
            Span::styled(who, Style::default().fg(color).add_modifier(Modifier::BOLD)),
            Span::styled(
                format!("  {}", turn.timestamp().format("%H:%M:%S")),
                Style::default().fg(Color::DarkGray),
            ),
        ]));
        lines.extend(markup::to_lines(turn.markup()));
        lines.push(Line::default());
    }

    if app.awaiting_reply() {
        // Animated ellipsis while the assistant answers
        let dots = ".".repeat((app.animation_frame as usize % 3) + 1);
        lines.push(Line::from(Span::styled(
            format!("Thinking{}", dots),
            Style::default().fg(Color::DarkGray).add_modifier(Modifier::ITALIC),
        )));
    }

    app.chat_lines = wrapped_height(&lines, inner_width);
    let max_scroll = app.chat_lines.saturating_sub(app.chat_height);
    if app.follow_chat || app.chat_scroll > max_scroll {
        app.chat_scroll = max_scroll;
    }

    let chat = Paragraph::new(Text::from(lines))
        .block(block)
        .wrap(Wrap { trim: false })
        .scroll((app.chat_scroll, 0));
    frame.render_widget(chat, area);
}

fn render_input(app: &App, frame: &mut Frame, area: Rect) {
    let enabled = app.snapshot.controls.input;
    let editing = app.input_mode == InputMode::Editing && enabled;

    let border_color = if editing {
        Color::Yellow
    } else if enabled {
        Color::DarkGray
    } else {
        Color::Black
    };
    let title = if enabled { " Message (i to type, Enter to send) " } else { " Message (disabled) " };

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border_color))
        .title(title);

    let text = if app.input.is_empty() && !editing {
        Span::styled("Type your answer...", Style::default().fg(Color::DarkGray))
    } else {
        Span::raw(app.input.clone())
    };
    frame.render_widget(Paragraph::new(text).block(block), area);

    if editing {
        let before: String = app.input.chars().take(app.input_cursor).collect();
        let x = area.x + 1 + Line::from(before).width() as u16;
        frame.set_cursor_position((x.min(area.right().saturating_sub(2)), area.y + 1));
    }
}

fn render_preview(app: &mut App, frame: &mut Frame, area: Rect) {
    app.preview_area = Some(area);

    let border_color = if app.focus == FocusPane::Preview { Color::Cyan } else { Color::DarkGray };
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border_color))
        .title(format!(" Preview ({}) ", app.snapshot.format.display_name()));

    let text = match &app.snapshot.preview {
        PreviewPane::Placeholder => Text::from(Span::styled(
            PREVIEW_PLACEHOLDER,
            Style::default().fg(Color::DarkGray),
        )),
        PreviewPane::Document(doc) => Text::from(markup::to_lines(&doc.markup)),
    };

    let preview = Paragraph::new(text)
        .block(block)
        .wrap(Wrap { trim: false })
        .scroll((app.preview_scroll, 0));
    frame.render_widget(preview, area);
}

fn status_lines(title: &str, view: &StatusView) -> Vec<Line<'static>> {
    let mut lines = vec![Line::from(vec![
        Span::styled(format!("{} ", title), Style::default().bold()),
        badge_span(&view.badge()),
    ])];

    match view {
        StatusView::Checking => {}
        StatusView::Report(status) => {
            for (label, value) in &status.details {
                lines.push(Line::from(vec![
                    Span::styled(format!("  {}: ", label), Style::default().fg(Color::DarkGray)),
                    Span::raw(value.clone()),
                ]));
            }
            if let Some(hint) = &status.hint {
                lines.push(Line::from(Span::styled(
                    format!("  {}", hint),
                    Style::default().fg(Color::Yellow).add_modifier(Modifier::ITALIC),
                )));
            }
        }
        StatusView::Failed(message) => {
            lines.push(Line::from(Span::styled(
                format!("  Status check failed: {}", message),
                Style::default().fg(Color::Red),
            )));
        }
    }
    lines
}

fn render_statuses(app: &App, frame: &mut Frame, area: Rect) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::DarkGray))
        .title(" Services (s to refresh) ");

    let mut lines = Vec::new();
    for (i, poller) in app.statuses.iter().enumerate() {
        if i > 0 {
            lines.push(Line::default());
        }
        lines.extend(status_lines(poller.probe().title(), poller.view()));
    }

    let statuses = Paragraph::new(Text::from(lines))
        .block(block)
        .wrap(Wrap { trim: true });
    frame.render_widget(statuses, area);
}

fn render_footer(app: &App, frame: &mut Frame, area: Rect) {
    let mode_style = match app.input_mode {
        InputMode::Normal => Style::default().bg(Color::Blue).fg(Color::White),
        InputMode::Editing => Style::default().bg(Color::Yellow).fg(Color::Black),
    };
    let mode_text = match app.input_mode {
        InputMode::Normal => " NORMAL ",
        InputMode::Editing => " INSERT ",
    };

    // Key style: dark background with bright text for visibility on both light/dark terminals
    let key_style = Style::default().bg(Color::DarkGray).fg(Color::White);
    let label_style = Style::default().bg(Color::Black).fg(Color::White);
    let off_style = Style::default().bg(Color::Black).fg(Color::DarkGray);

    let controls = app.snapshot.controls;
    let hint = |key: &'static str, label: &'static str, enabled: bool| {
        vec![
            Span::styled(format!(" {} ", key), key_style),
            Span::styled(format!(" {} ", label), if enabled { label_style } else { off_style }),
        ]
    };

    let mut spans = vec![Span::styled(mode_text, mode_style)];
    match app.input_mode {
        InputMode::Editing => {
            spans.extend(hint("Enter", "send", controls.send));
            spans.extend(hint("Esc", "done", true));
        }
        InputMode::Normal => {
            if app.snapshot.phase() == SessionPhase::Uninitialized {
                spans.extend(hint("n", "start", controls.start));
            }
            spans.extend(hint("i", "type", controls.input));
            spans.extend(hint("r", "reset", controls.reset));
            spans.extend(hint("d", "download", controls.download));
            spans.extend(hint("p", "preview", controls.preview));
            spans.extend(hint("f", "format", true));
            spans.extend(hint("x", "reindex", controls.reindex));
            spans.extend(hint("a", "abort", app.notifier.is_busy()));
            spans.extend(hint("Tab", "pane", true));
            spans.extend(hint("q", "quit", true));
        }
    }

    frame.render_widget(Paragraph::new(Line::from(spans)), area);
}

fn render_alert(frame: &mut Frame, area: Rect, message: &str) {
    let popup_area = centered(area, 60, 9);
    frame.render_widget(Clear, popup_area);

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Red))
        .title(" Notice (Enter to close) ");

    let alert = Paragraph::new(message.to_string())
        .block(block)
        .wrap(Wrap { trim: true });
    frame.render_widget(alert, popup_area);
}

fn render_confirm(frame: &mut Frame, area: Rect, confirm: Confirm) {
    let question = match confirm {
        Confirm::Reindex => {
            "Reindex all documents? This can take a while and starts the conversation over."
        }
    };

    let popup_area = centered(area, 56, 6);
    frame.render_widget(Clear, popup_area);

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Yellow))
        .title(" Confirm (y/n) ");

    let prompt = Paragraph::new(question)
        .block(block)
        .wrap(Wrap { trim: true });
    frame.render_widget(prompt, popup_area);
}

fn render_busy(app: &App, frame: &mut Frame, area: Rect, label: &str) {
    let spinner = SPINNER[app.animation_frame as usize % SPINNER.len()];
    let text = format!(" {} {} ", spinner, label);

    let popup_area = centered(area, text.chars().count() as u16 + 4, 3);
    frame.render_widget(Clear, popup_area);

    let busy = Paragraph::new(Span::styled(text, Style::default().fg(Color::Cyan)))
        .block(Block::default().borders(Borders::ALL).border_style(Style::default().fg(Color::Cyan)));
    frame.render_widget(busy, popup_area);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wrapped_height_counts_wrapped_rows() {
        let lines = vec![Line::from("a".repeat(25)), Line::default(), Line::from("short")];
        assert_eq!(wrapped_height(&lines, 10), 3 + 1 + 1);
    }

    #[test]
    fn test_centered_stays_inside_area() {
        let area = Rect::new(0, 0, 40, 10);
        let popup = centered(area, 100, 100);
        assert!(popup.width <= 36);
        assert!(popup.height <= 8);
        assert!(popup.x + popup.width <= area.width);
    }

    #[test]
    fn test_failed_status_has_distinct_line() {
        let lines = status_lines("Language model", &StatusView::Failed("502".to_string()));
        let text: Vec<String> = lines.iter().map(markup::line_text).collect();
        assert_eq!(text.len(), 2);
        assert!(text[1].contains("Status check failed: 502"));
    }
}
