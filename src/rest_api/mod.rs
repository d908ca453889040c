//! HTTP endpoints for health probes and Prometheus scraping

mod handlers;
mod server;

pub use server::{router, run_server};
