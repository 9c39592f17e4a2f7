//! rankwatch-poller - Best-Seller Rank Polling Service
//!
//! Polls the ranking data provider for the tracked product set, resolves
//! each identifier to per-category rank observations, appends them to the
//! history store, and delivers a day-over-day digest to the configured
//! notification channel. Invoked by an external trigger (cron or operator).

pub mod services;
pub mod workflow;

pub use workflow::Pipeline;
