// src/app.rs

use std::path::Path;

use ratatui::widgets::{ListState, ScrollbarState};
use tokio::sync::{mpsc, oneshot, watch};
use tracing::{error, info};

use subtocheck_rs::config::ScanConfig;
use subtocheck_rs::core::export::export_report;
use subtocheck_rs::core::models::{Issue, IssueCounts, IssueKind, ScanEvent, ScanReport};
use subtocheck_rs::core::patterns::PatternCatalog;
use subtocheck_rs::core::scanner::run_full_scan;
use subtocheck_rs::core::scanner::scheduler::ScanControl;
use subtocheck_rs::core::targets::load_domains;
use subtocheck_rs::logging::get_data_dir;

pub const SPINNER_CHARS: &[char] = &['⠋', '⠙', '⠹', '⠸', '⠼', '⠴', '⠦', '⠧', '⠇', '⠏'];

pub enum ExportStatus {
    Idle,
    Success(String),
    Error(String),
}

pub enum AppState {
    Idle,
    Scanning,
    Finished,
}

#[derive(Debug, Default)]
pub struct ScanSummary {
    pub completed: usize,
    pub total: usize,
    /// Updated live from progress events, then replaced by the report's tally.
    pub counts: IssueCounts,
}

/// The channels connecting the UI to a scan running on a background task.
pub struct ScanSession {
    events: mpsc::UnboundedReceiver<ScanEvent>,
    outcome: oneshot::Receiver<Result<ScanReport, String>>,
    cancel: watch::Sender<bool>,
}

pub struct App {
    pub should_quit: bool,
    pub show_disclaimer: bool,
    pub state: AppState,
    pub input: String,
    pub config: ScanConfig,
    pub catalog: PatternCatalog,
    pub scan_report: Option<ScanReport>,
    pub summary: ScanSummary,
    pub activity: Vec<String>,
    pub activity_scroll: usize,
    pub activity_scroll_state: ScrollbarState,
    pub findings_list_state: ListState,
    pub export_status: ExportStatus,
    pub error: Option<String>,
    pub spinner_frame: usize,
    session: Option<ScanSession>,
}

impl App {
    pub fn new(input: String, config: ScanConfig) -> Self {
        let catalog = PatternCatalog::with_extra(config.patterns.iter().cloned());
        Self {
            should_quit: false,
            show_disclaimer: true,
            state: AppState::Idle,
            input,
            config,
            catalog,
            scan_report: None,
            summary: ScanSummary::default(),
            activity: Vec::new(),
            activity_scroll: 0,
            activity_scroll_state: ScrollbarState::default(),
            findings_list_state: ListState::default(),
            export_status: ExportStatus::Idle,
            error: None,
            spinner_frame: 0,
            session: None,
        }
    }

    /// Loads the domain list named in the input box and starts scanning it in the background.
    pub fn start_scan(&mut self) {
        if self.input.is_empty() {
            return;
        }
        let domains = match load_domains(Path::new(&self.input)) {
            Ok(domains) => domains,
            Err(e) => {
                error!(error = %e, "Cannot start scan.");
                self.error = Some(e.to_string());
                return;
            }
        };

        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let (outcome_tx, outcome_rx) = oneshot::channel();
        let (cancel_tx, cancel_rx) = watch::channel(false);
        let control = ScanControl::default()
            .with_events(event_tx)
            .with_cancel(cancel_rx);
        let config = self.config.clone();

        self.summary = ScanSummary {
            total: domains.len(),
            ..ScanSummary::default()
        };
        self.activity.clear();
        self.activity_scroll = 0;
        self.activity_scroll_state = ScrollbarState::default();
        self.error = None;
        self.state = AppState::Scanning;
        info!(path = %self.input, domains = domains.len(), "Scan requested from the UI.");

        tokio::spawn(async move {
            let outcome = run_full_scan(domains, &config, control)
                .await
                .map_err(|e| e.to_string());
            let _ = outcome_tx.send(outcome);
        });

        self.session = Some(ScanSession {
            events: event_rx,
            outcome: outcome_rx,
            cancel: cancel_tx,
        });
    }

    /// Drains progress events and picks up the report once the scan task is done.
    pub fn poll_scan(&mut self) {
        let Some(mut session) = self.session.take() else {
            return;
        };

        while let Ok(event) = session.events.try_recv() {
            self.on_scan_event(event);
        }

        match session.outcome.try_recv() {
            Ok(Ok(report)) => self.finish(report),
            Ok(Err(message)) => {
                self.error = Some(message);
                self.state = AppState::Idle;
            }
            Err(oneshot::error::TryRecvError::Empty) => self.session = Some(session),
            Err(oneshot::error::TryRecvError::Closed) => {
                self.error = Some("the scan task ended without a report".to_string());
                self.state = AppState::Idle;
            }
        }
    }

    pub fn on_scan_event(&mut self, event: ScanEvent) {
        let ScanEvent::DomainFinished {
            index,
            total,
            domain,
            counts,
        } = event;
        self.summary.completed = index;
        self.summary.total = total;
        self.summary.counts += counts;
        self.activity
            .push(format!("[{}/{}] {} ({} issues)", index, total, domain, counts.total()));

        let max_width = self.activity.iter().map(|l| l.chars().count()).max().unwrap_or(0);
        self.activity_scroll_state = self.activity_scroll_state.content_length(max_width);
    }

    pub fn finish(&mut self, report: ScanReport) {
        self.summary.completed = report.domains_completed;
        self.summary.total = report.domains_total;
        self.summary.counts = IssueCounts {
            request: report.findings.count(IssueKind::Request),
            dns: report.findings.count(IssueKind::Dns),
            vuln: report.findings.count(IssueKind::Vuln),
        };

        let selected = (!report.findings.is_empty()).then_some(0);
        self.findings_list_state = ListState::default().with_selected(selected);
        self.scan_report = Some(report);
        self.state = AppState::Finished;
    }

    /// Findings in display order: grouped by kind.
    pub fn findings(&self) -> Vec<&Issue> {
        self.scan_report
            .as_ref()
            .map(|r| r.findings.grouped())
            .unwrap_or_default()
    }

    pub fn selected_finding(&self) -> Option<&Issue> {
        let index = self.findings_list_state.selected()?;
        self.findings().get(index).copied()
    }

    pub fn select_next(&mut self) {
        let count = self.findings().len();
        if count == 0 {
            return;
        }
        let next = self
            .findings_list_state
            .selected()
            .map_or(0, |i| (i + 1).min(count - 1));
        self.findings_list_state.select(Some(next));
    }

    pub fn select_previous(&mut self) {
        if self.findings().is_empty() {
            return;
        }
        let previous = self
            .findings_list_state
            .selected()
            .map_or(0, |i| i.saturating_sub(1));
        self.findings_list_state.select(Some(previous));
    }

    pub fn scroll_left(&mut self) {
        self.activity_scroll = self.activity_scroll.saturating_sub(1);
        self.activity_scroll_state = self.activity_scroll_state.position(self.activity_scroll);
    }

    pub fn scroll_right(&mut self) {
        self.activity_scroll = self.activity_scroll.saturating_add(1);
        self.activity_scroll_state = self.activity_scroll_state.position(self.activity_scroll);
    }

    pub fn export(&mut self) {
        let Some(report) = &self.scan_report else {
            return;
        };
        self.export_status = match export_report(report, &get_data_dir()) {
            Ok(path) => ExportStatus::Success(path.display().to_string()),
            Err(e) => ExportStatus::Error(e.to_string()),
        };
    }

    /// Asks a running scan to stop before its next domain.
    pub fn cancel_scan(&mut self) {
        if let Some(session) = &self.session {
            let _ = session.cancel.send(true);
        }
    }

    pub fn on_tick(&mut self) {
        if matches!(self.state, AppState::Scanning) {
            self.spinner_frame = (self.spinner_frame + 1) % SPINNER_CHARS.len();
        }
    }

    pub fn quit(&mut self) {
        self.cancel_scan();
        self.should_quit = true;
    }

    pub fn reset(&mut self) {
        self.state = AppState::Idle;
        self.scan_report = None;
        self.summary = ScanSummary::default();
        self.activity.clear();
        self.activity_scroll = 0;
        self.activity_scroll_state = ScrollbarState::default();
        self.findings_list_state = ListState::default();
        self.export_status = ExportStatus::Idle;
        self.error = None;
        self.session = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use subtocheck_rs::core::models::{Findings, Protocol};

    fn app() -> App {
        App::new("domains.txt".to_string(), ScanConfig::default())
    }

    fn report() -> ScanReport {
        let now = Utc::now();
        ScanReport {
            findings: Findings::new(vec![
                Issue::vuln("live404.example.com", "http://live404.example.com/", "S3"),
                Issue::dns("dead.example.com", "no answer"),
                Issue::request("slow.example.com", Some("https://slow.example.com/"), "timed out"),
            ]),
            domains_total: 3,
            domains_completed: 3,
            protocols: Protocol::all(),
            started_at: now,
            finished_at: now,
            cancelled: false,
        }
    }

    #[test]
    fn events_advance_progress() {
        let mut app = app();
        app.on_scan_event(ScanEvent::DomainFinished {
            index: 1,
            total: 4,
            domain: "dead.example.com".to_string(),
            counts: IssueCounts { request: 0, dns: 1, vuln: 0 },
        });
        app.on_scan_event(ScanEvent::DomainFinished {
            index: 2,
            total: 4,
            domain: "live404.example.com".to_string(),
            counts: IssueCounts { request: 1, dns: 0, vuln: 1 },
        });
        assert_eq!(app.summary.completed, 2);
        assert_eq!(app.summary.total, 4);
        assert_eq!(app.summary.counts, IssueCounts { request: 1, dns: 1, vuln: 1 });
        assert_eq!(
            app.activity,
            vec![
                "[1/4] dead.example.com (1 issues)",
                "[2/4] live404.example.com (2 issues)",
            ]
        );
    }

    #[test]
    fn finishing_counts_issues_and_selects_first() {
        let mut app = app();
        app.finish(report());
        assert!(matches!(app.state, AppState::Finished));
        assert_eq!(app.summary.counts, IssueCounts { request: 1, dns: 1, vuln: 1 });
        assert_eq!(app.selected_finding().map(|i| i.kind), Some(IssueKind::Request));
    }

    #[test]
    fn selection_stays_in_bounds() {
        let mut app = app();
        app.finish(report());
        for _ in 0..5 {
            app.select_next();
        }
        assert_eq!(app.findings_list_state.selected(), Some(2));
        assert_eq!(app.selected_finding().map(|i| i.kind), Some(IssueKind::Vuln));
        for _ in 0..5 {
            app.select_previous();
        }
        assert_eq!(app.findings_list_state.selected(), Some(0));
    }

    #[test]
    fn missing_domain_list_stays_idle_with_error() {
        let mut app = App::new(
            std::env::temp_dir()
                .join("subtocheck-rs-absent.txt")
                .display()
                .to_string(),
            ScanConfig::default(),
        );
        app.start_scan();
        assert!(matches!(app.state, AppState::Idle));
        assert!(app.error.as_deref().is_some_and(|e| e.contains("could not be found")));
    }

    #[test]
    fn reset_clears_the_report() {
        let mut app = app();
        app.finish(report());
        app.reset();
        assert!(app.scan_report.is_none());
        assert!(app.findings().is_empty());
        assert!(matches!(app.state, AppState::Idle));
    }
}
