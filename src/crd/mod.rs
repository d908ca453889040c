//! Custom Resource Definitions for the AppShare operator

mod app_share;
pub mod types;

#[cfg(test)]
mod tests;

pub use app_share::{AppShare, AppShareSpec, AppShareStatus, SpecValidationError};
pub use types::*;
