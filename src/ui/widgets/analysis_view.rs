// src/ui/widgets/analysis_view.rs

use crate::app::{App, AppState, SPINNER_CHARS};
use ratatui::{
    prelude::*,
    widgets::{Block, Borders, List, ListItem, Paragraph, Wrap},
    text::Line,
};
use subtocheck_rs::core::models::{Issue, IssueKind};

fn kind_prefix(kind: IssueKind) -> (&'static str, Color) {
    match kind {
        IssueKind::Request => ("[REQUEST] ", Color::Yellow),
        IssueKind::Dns => ("[DNS] ", Color::Cyan),
        IssueKind::Vuln => ("[VULN] ", Color::Red),
    }
}

pub fn render_analysis_view(frame: &mut Frame, app: &mut App, area: Rect) {
    let main_block = Block::default()
        .borders(Borders::ALL)
        .title("Findings (Navigate with ↑ ↓)");

    if !matches!(app.state, AppState::Finished) {
        let content = match app.state {
            AppState::Idle => Paragraph::new(vec![
                Line::from(""),
                Line::from("Enter the path of a domain list, one domain per line."),
                Line::from("Findings will appear here once the scan is done."),
            ])
            .alignment(Alignment::Center),
            AppState::Scanning => {
                let spinner_char = SPINNER_CHARS[app.spinner_frame];
                Paragraph::new(
                    Line::from(vec![
                        Span::styled(format!("{} ", spinner_char), Style::default().fg(Color::Cyan)),
                        Span::raw(format!(
                            "Scanning... {}/{} domains checked.",
                            app.summary.completed, app.summary.total
                        )),
                    ])
                ).alignment(Alignment::Center)
            },
            AppState::Finished => Paragraph::new(""),
        };
        frame.render_widget(content.block(main_block), area);
        return;
    }

    let inner_area = main_block.inner(area);
    frame.render_widget(main_block, area);

    let findings: Vec<Issue> = app.findings().into_iter().cloned().collect();
    if findings.is_empty() {
        render_clean_scan(frame, inner_area);
        return;
    }

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage(50),
            Constraint::Min(0),
        ])
        .split(inner_area);

    let items: Vec<ListItem> = findings.iter().map(|issue| {
        let (prefix, color) = kind_prefix(issue.kind);
        ListItem::new(Line::from(vec![
            Span::styled(prefix, Style::default().fg(color)),
            Span::raw(issue.domain.clone()),
        ]))
    }).collect();

    let findings_list = List::new(items)
        .block(Block::default())
        .highlight_style(Style::new().bg(Color::DarkGray).add_modifier(Modifier::BOLD));

    frame.render_stateful_widget(findings_list, chunks[0], &mut app.findings_list_state);

    let detail_block = Block::default().borders(Borders::TOP).title("Details");
    let selected = app
        .findings_list_state
        .selected()
        .and_then(|index| findings.get(index));

    let Some(issue) = selected else {
        let p = Paragraph::new("Select an item above to see details.")
            .alignment(Alignment::Center)
            .block(detail_block);
        frame.render_widget(p, chunks[1]);
        return;
    };

    let mut text = vec![
        Line::from(""),
        Line::from(issue.kind.title().yellow().bold()),
        Line::from(vec!["Domain: ".bold(), Span::raw(issue.domain.clone())]),
    ];
    if let Some(url) = &issue.url {
        text.push(Line::from(vec!["URL: ".bold(), Span::raw(url.clone())]));
    }
    text.push(Line::from(vec!["Cause: ".bold(), Span::raw(issue.cause.clone())]));

    // Vulnerabilities carry the platform, which leads back to its remediation note.
    let remediation = issue
        .platform
        .as_deref()
        .and_then(|platform| app.catalog.find(platform))
        .map(|pattern| pattern.remediation.as_str())
        .filter(|note| !note.is_empty());
    if let Some(note) = remediation {
        text.push(Line::from(""));
        text.push(Line::from("HOW TO FIX:".yellow().bold()));
        text.push(Line::from(note.to_string()));
    }

    let p = Paragraph::new(text).wrap(Wrap { trim: true }).block(detail_block);
    frame.render_widget(p, chunks[1]);
}

fn render_clean_scan(frame: &mut Frame, area: Rect) {
    let placeholder_text = Text::from(vec![
        Line::from(""),
        Line::from("✓ NO ISSUES FOUND".bold().fg(Color::Green)),
        Line::from(""),
        Line::from("Every domain resolved and none matched a takeover fingerprint."),
    ]);

    let p = Paragraph::new(placeholder_text).alignment(Alignment::Center);
    frame.render_widget(p, area);
}
