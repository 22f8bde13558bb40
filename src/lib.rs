//! Scrape Gateway
//!
//! Exposes a synchronous "fetch content for this URL" API on top of an
//! asynchronous job-queue worker pool. The gateway submits a job, waits
//! for it with a bounded timeout, always removes it from the queue, bills
//! the owning team exactly once per delivered result, and emits a
//! fire-and-forget audit record.

pub mod app_state;
pub mod config;
pub mod db;
pub mod models;
pub mod routes;
pub mod services;
