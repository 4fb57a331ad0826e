use crate::connection::ConnectionState;
use crate::state::{Notice, NoticeLevel};
use crate::types::{Message, Role};
use crate::ui::input_metrics::{
    char_display_width, cursor_row_col, truncate_to_display_width, wrap_rows,
};
use ratatui::{
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::Paragraph,
    Frame,
};

const THINKING_PLACEHOLDER: &str = "  ...";

pub fn input_visual_rows(input: &str, width: usize) -> usize {
    wrap_rows(input, width).len().max(1)
}

/// `![alt](url)` on a line of its own becomes a readable image reference.
pub fn describe_image_line(line: &str) -> Option<String> {
    let body = line.trim().strip_prefix("![")?.strip_suffix(')')?;
    let (alt, url) = body.split_once("](")?;
    Some(format!("[image: {alt}] {url}"))
}

fn role_label(role: Role) -> Line<'static> {
    match role {
        Role::User => Line::styled(
            "you",
            Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
        ),
        Role::Assistant => Line::styled(
            "assistant",
            Style::default()
                .fg(Color::Green)
                .add_modifier(Modifier::BOLD),
        ),
    }
}

/// Shown instead of the history while the transcript is empty.
pub fn overview_lines() -> Vec<Line<'static>> {
    let dim = Style::default().fg(Color::DarkGray);
    vec![
        Line::styled(
            "Welcome to wschat!",
            Style::default().add_modifier(Modifier::BOLD),
        ),
        Line::from("Hey! I'm your friendly chat assistant. What would you like to do today?"),
        Line::from(""),
        Line::from(vec![
            Span::styled("Chat now     ", Style::default().fg(Color::Cyan)),
            Span::styled("type a message and press Enter", dim),
        ]),
        Line::from(vec![
            Span::styled("Upload a file", Style::default().fg(Color::Cyan)),
            Span::styled("  /upload <path> to talk about its contents", dim),
        ]),
        Line::from(vec![
            Span::styled("Find an image", Style::default().fg(Color::Cyan)),
            Span::styled("  /image <query>", dim),
        ]),
    ]
}

/// Flattens the transcript into display lines, one block per message.
pub fn transcript_lines(messages: &[Message], loading: bool) -> Vec<Line<'static>> {
    if messages.is_empty() && !loading {
        return overview_lines();
    }

    let mut lines = Vec::new();
    for message in messages {
        lines.push(role_label(message.role));
        for raw in message.content.lines() {
            let text = match describe_image_line(raw) {
                Some(image) => Line::styled(format!("  {image}"), Style::default().fg(Color::Magenta)),
                None => Line::from(format!("  {raw}")),
            };
            lines.push(text);
        }
        lines.push(Line::from(""));
    }
    if loading {
        lines.push(role_label(Role::Assistant));
        lines.push(Line::styled(
            THINKING_PLACEHOLDER,
            Style::default().fg(Color::DarkGray),
        ));
    }
    lines
}

/// Breaks display lines into rows of at most `width` columns, keeping span
/// styles. Drawing and scroll bounds both go through this, so they agree.
pub fn wrap_history_lines(lines: &[Line<'_>], width: usize) -> Vec<Line<'static>> {
    let width = width.max(1);
    let mut rows = Vec::with_capacity(lines.len());
    for line in lines {
        let mut row: Vec<Span<'static>> = Vec::new();
        let mut used = 0usize;
        for span in &line.spans {
            let mut chunk = String::new();
            for ch in span.content.chars() {
                let ch_width = char_display_width(ch);
                if used + ch_width > width && used > 0 {
                    if !chunk.is_empty() {
                        row.push(Span::styled(std::mem::take(&mut chunk), span.style));
                    }
                    rows.push(Line::from(std::mem::take(&mut row)).style(line.style));
                    used = 0;
                }
                chunk.push(ch);
                used += ch_width;
            }
            if !chunk.is_empty() {
                row.push(Span::styled(chunk, span.style));
            }
        }
        rows.push(Line::from(row).style(line.style));
    }
    rows
}

/// Rows the history occupies once wrapped to `width`.
pub fn history_visual_line_count(lines: &[Line<'_>], width: usize) -> usize {
    wrap_history_lines(lines, width).len()
}

pub fn render_header(frame: &mut Frame<'_>, area: Rect, endpoint: &str, state: ConnectionState) {
    if area.height == 0 || area.width == 0 {
        return;
    }
    let state_color = match state {
        ConnectionState::Connected => Color::Green,
        ConnectionState::Connecting => Color::Yellow,
        ConnectionState::Disconnected | ConnectionState::Error => Color::Red,
    };
    let header = Line::from(vec![
        Span::styled("wschat ", Style::default().add_modifier(Modifier::BOLD)),
        Span::styled(endpoint.to_string(), Style::default().fg(Color::DarkGray)),
        Span::raw(" "),
        Span::styled(format!("[{}]", state.label()), Style::default().fg(state_color)),
    ]);
    frame.render_widget(Paragraph::new(header), area);
}

pub fn render_history(frame: &mut Frame<'_>, area: Rect, lines: Vec<Line<'static>>, scroll: usize) {
    if area.height == 0 || area.width == 0 {
        return;
    }
    let rows = wrap_history_lines(&lines, area.width as usize);
    let paragraph = Paragraph::new(rows)
        .style(Style::default().fg(Color::White))
        .scroll((scroll.min(u16::MAX as usize) as u16, 0));
    frame.render_widget(paragraph, area);
}

pub fn render_status_line(frame: &mut Frame<'_>, area: Rect, status: &str, notice: Option<&Notice>) {
    if area.height == 0 || area.width == 0 {
        return;
    }

    let (text, style) = match notice {
        Some(notice) => {
            let color = match notice.level {
                NoticeLevel::Success => Color::Green,
                NoticeLevel::Error => Color::Red,
            };
            (notice.text.as_str(), Style::default().fg(color))
        }
        None => (status, Style::default().fg(Color::DarkGray)),
    };
    frame.render_widget(
        Paragraph::new(truncate_to_display_width(text, area.width as usize)).style(style),
        area,
    );
}

pub fn render_input(frame: &mut Frame<'_>, area: Rect, input: &str, cursor_byte: usize) {
    if area.height == 0 || area.width <= 2 {
        return;
    }

    let input_width = area.width.saturating_sub(2).max(1) as usize;
    let rows = wrap_rows(input, input_width);
    let (cursor_row, cursor_col) = cursor_row_col(input, cursor_byte, input_width);
    let visible_rows = area.height as usize;
    let window_start = cursor_row.saturating_add(1).saturating_sub(visible_rows);

    let rendered: Vec<Line<'_>> = (0..visible_rows)
        .map(|offset| {
            let row_index = window_start + offset;
            let prefix = if row_index == 0 { "> " } else { "  " };
            let row = rows.get(row_index).cloned().unwrap_or_default();
            Line::from(format!("{prefix}{row}"))
        })
        .collect();

    frame.render_widget(
        Paragraph::new(rendered).style(Style::default().fg(Color::Gray).bg(Color::Rgb(24, 24, 24))),
        area,
    );

    let cursor_y = area
        .y
        .saturating_add(cursor_row.saturating_sub(window_start) as u16);
    let cursor_x = area
        .x
        .saturating_add(2 + cursor_col as u16)
        .min(area.x.saturating_add(area.width.saturating_sub(1)));
    frame.set_cursor_position((cursor_x, cursor_y));
}
