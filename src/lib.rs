//! Scheduled visual-regression monitor.
//!
//! Each run captures every configured page as a full-page screenshot,
//! compares it with the stored baseline by structural similarity, alerts
//! with an annotated diff when the score drops below the threshold, and then
//! replaces the baseline with the new capture.

pub mod alert;
pub mod browser;
pub mod cli;
pub mod diff;
pub mod error;
pub mod monitor;
pub mod page;
pub mod report;
pub mod store;
pub mod trace;
