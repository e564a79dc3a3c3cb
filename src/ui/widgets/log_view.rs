// src/ui/widgets/log_view.rs

use crate::app::App;
use ratatui::{
    prelude::*,
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Scrollbar, ScrollbarOrientation},
};

/// Renders the activity feed: one line per finished domain, newest at the bottom.
///
/// Only the lines that fit are shown. Long lines scroll horizontally with ← →.
pub fn render_log_view(frame: &mut Frame, app: &mut App, area: Rect) {
    let block = Block::default()
        .title("Activity (scroll with ← →)")
        .borders(Borders::ALL);

    let inner_area = block.inner(area);
    frame.render_widget(block, area);

    // Leave the last row for the scrollbar.
    let visible = inner_area.height.saturating_sub(1) as usize;
    let skip = app.activity.len().saturating_sub(visible);

    // A line looks like "[3/10] domain (n issues)": the counter is dimmed.
    let log_lines: Vec<Line> = app.activity[skip..].iter().map(|line_str| {
        match line_str.split_once(' ') {
            Some((counter, rest)) => Line::from(vec![
                Span::styled(counter.to_string(), Style::default().fg(Color::DarkGray)),
                Span::raw(format!(" {}", rest)),
            ]),
            None => Line::from(line_str.as_str()),
        }
    }).collect();

    let log_paragraph = Paragraph::new(log_lines)
        .scroll((0, app.activity_scroll as u16));
    frame.render_widget(log_paragraph, inner_area);

    let scrollbar = Scrollbar::new(ScrollbarOrientation::HorizontalBottom)
        .thumb_symbol("■");

    let scrollbar_area = Rect {
        x: inner_area.x,
        y: inner_area.y + inner_area.height.saturating_sub(1),
        width: inner_area.width,
        height: 1,
    };

    frame.render_stateful_widget(
        scrollbar,
        scrollbar_area,
        &mut app.activity_scroll_state,
    );
}
