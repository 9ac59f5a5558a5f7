//! Data API service library.
//!
//! One generic validate -> resolve -> fetch -> aggregate -> shape pipeline
//! serves every dataset; datasets themselves are YAML declarations loaded
//! into the registry at startup, so adding one is a config edit.

pub mod config;
pub mod format;
pub mod handlers;
pub mod pipeline;
pub mod state;
