#![forbid(unsafe_code)]
#![deny(
    unreachable_pub,
    rustdoc::broken_intra_doc_links,
    rustdoc::bare_urls,
    missing_docs
)]
#![allow(clippy::redundant_pub_crate)]

//! Administrative CLI for an XNAT research-data server.
//!
//! Layout:
//! - `cli.rs`: argument parsing and command dispatch
//! - `commands/`: command handlers grouped by concern
//! - `client.rs`: shared session, HTTP plumbing, and error types
//! - `credentials.rs`: pure credential resolution from CLI fields
//! - `batch.rs`: worklist reading and the sequential row processor
//! - `output.rs`: delimited headers and formatting helpers
//! - `main.rs`: thin entrypoint delegating to `run()`

pub(crate) mod batch;
pub(crate) mod cli;
pub(crate) mod client;
pub(crate) mod commands;
pub(crate) mod credentials;
pub(crate) mod output;

pub use cli::run;
