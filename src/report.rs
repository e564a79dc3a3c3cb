// src/report.rs

use std::fmt::Write;

use strum::IntoEnumIterator;

use crate::core::models::{Issue, IssueKind, ScanReport};

/// One display line for an issue. Vulnerabilities lead with the URL that matched.
pub fn issue_line(issue: &Issue) -> String {
    match (issue.kind, issue.url.as_deref()) {
        (IssueKind::Vuln, Some(url)) => format!("{} {}", url, issue.cause),
        _ => issue.cause.clone(),
    }
}

/// Renders the plain-text report: one section per issue kind.
pub fn render_plain(report: &ScanReport) -> String {
    let mut out = String::new();

    if report.findings.is_empty() {
        let _ = writeln!(out, "\nNo issues found.");
    } else {
        for kind in IssueKind::iter() {
            let title = kind.title();
            let _ = writeln!(out, "\n{}\n{}", title, "-".repeat(title.len()));
            let mut any = false;
            for issue in report.findings.of_kind(kind) {
                any = true;
                let _ = writeln!(out, "{}", issue_line(issue));
            }
            if !any {
                let _ = writeln!(out, "none found");
            }
        }
    }

    if report.cancelled {
        let _ = writeln!(
            out,
            "\nScan cancelled after {}/{} domains.",
            report.domains_completed, report.domains_total
        );
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::{Findings, Protocol};
    use chrono::Utc;

    fn report(issues: Vec<Issue>) -> ScanReport {
        let now = Utc::now();
        ScanReport {
            findings: Findings::new(issues),
            domains_total: 3,
            domains_completed: 3,
            protocols: Protocol::all(),
            started_at: now,
            finished_at: now,
            cancelled: false,
        }
    }

    #[test]
    fn clean_scan_says_so() {
        assert_eq!(render_plain(&report(Vec::new())), "\nNo issues found.\n");
    }

    #[test]
    fn sections_are_rendered_in_order_with_placeholders() {
        let text = render_plain(&report(vec![Issue::vuln(
            "live404.example.com",
            "http://live404.example.com/",
            "S3",
        )]));
        let expected = "\nRequest issues\n--------------\nnone found\n\
                        \nDNS issues\n----------\nnone found\n\
                        \nPotential vulnerabilities\n-------------------------\n\
                        http://live404.example.com/ matches fingerprint for platform S3\n";
        assert_eq!(text, expected);
    }

    #[test]
    fn cancelled_scan_is_noted() {
        let mut cancelled = report(vec![Issue::dns("dead.example.com", "no answer")]);
        cancelled.cancelled = true;
        cancelled.domains_completed = 1;
        assert!(render_plain(&cancelled).ends_with("Scan cancelled after 1/3 domains.\n"));
    }
}
