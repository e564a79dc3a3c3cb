// src/ui/widgets/mod.rs

pub mod analysis_view; // Findings list with a detail pane.
pub mod disclaimer_popup;
pub mod footer;
pub mod input; // Domain list path.
pub mod log_view; // Activity feed of finished domains.
pub mod summary;
