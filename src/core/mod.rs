// src/core/mod.rs

/// Data structures shared across the pipeline: issues, findings, reports and events.
pub mod models;

/// The fingerprint catalog used to recognise unclaimed-resource error pages.
pub mod patterns;

/// The scan pipeline: resolver, prober, matcher, per-domain checker and worker pool.
pub mod scanner;

/// Reading the domain list a scan starts from.
pub mod targets;

/// Writing a finished report to disk.
pub mod export;
