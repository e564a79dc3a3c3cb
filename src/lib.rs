// src/lib.rs

//! Detects dangling DNS records that are open to subdomain takeover.
//!
//! A domain is flagged when it still resolves but its HTTP response matches the
//! "unclaimed resource" error page of a known hosting platform.

pub mod config;
pub mod core;
pub mod logging;
pub mod report;
