// src/ui/widgets/summary.rs

use crate::app::{App, AppState, ExportStatus};
use ratatui::{
    prelude::*,
    text::Line,
    widgets::{Block, Borders, Gauge, Paragraph, Wrap},
};

/// Renders the progress panel: a gauge of finished domains and the issue counts per kind,
/// updated as each domain finishes.
///
/// # Arguments
/// * `frame` - The `Frame` used for rendering the UI.
/// * `app` - The application state holding the running summary.
/// * `area` - The `Rect` defining the drawable area for this widget.
pub fn render_summary(frame: &mut Frame, app: &App, area: Rect) {
    let summary_container = Block::default().borders(Borders::ALL).title("Progress");
    frame.render_widget(summary_container, area);

    let summary_chunks = Layout::default()
        .direction(Direction::Vertical)
        .margin(1)
        .constraints([
            Constraint::Length(1), // Gauge
            Constraint::Length(1), // Spacer
            Constraint::Length(4), // Counts
            Constraint::Min(0),    // Export status
        ])
        .split(area);

    if matches!(app.state, AppState::Idle) {
        frame.render_widget(
            Paragraph::new("No scan running.").alignment(Alignment::Center),
            summary_chunks[0],
        );
        return;
    }

    // --- Gauge ---
    let summary = &app.summary;
    let ratio = if summary.total == 0 {
        1.0
    } else {
        summary.completed as f64 / summary.total as f64
    };
    let gauge = Gauge::default()
        .ratio(ratio.clamp(0.0, 1.0))
        .label(format!("{}/{} domains", summary.completed, summary.total))
        .gauge_style(Style::default().fg(Color::Cyan));
    frame.render_widget(gauge, summary_chunks[0]);

    // --- Counts ---
    let counts = &summary.counts;
    let vuln_style = if counts.vuln > 0 {
        Style::default().fg(Color::Red).bold()
    } else {
        Style::default().fg(Color::Green)
    };
    let counts_text = Text::from(vec![
        Line::from(vec![Span::raw("Request issues: "), Span::styled(counts.request.to_string(), Style::default().fg(Color::Yellow))]),
        Line::from(vec![Span::raw("DNS issues: "), Span::styled(counts.dns.to_string(), Style::default().fg(Color::Yellow))]),
        Line::from(vec![Span::raw("Potential vulnerabilities: "), Span::styled(counts.vuln.to_string(), vuln_style)]),
        cancelled_line(app),
    ]);
    frame.render_widget(Paragraph::new(counts_text), summary_chunks[2]);

    // --- Export Status ---
    let export_line = match &app.export_status {
        ExportStatus::Idle => Line::from(""),
        ExportStatus::Success(path) => Line::from(format!("Exported to {}", path)).fg(Color::Green),
        ExportStatus::Error(e) => Line::from(format!("Export failed: {}", e)).fg(Color::Red),
    };
    frame.render_widget(Paragraph::new(export_line).wrap(Wrap { trim: true }), summary_chunks[3]);
}

fn cancelled_line(app: &App) -> Line<'static> {
    match &app.scan_report {
        Some(report) if report.cancelled => Line::from("Scan was cancelled.".italic().fg(Color::DarkGray)),
        _ => Line::from(""),
    }
}
