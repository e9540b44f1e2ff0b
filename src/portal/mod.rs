//! Client for the TINETZ customer portal.
//!
//! Covers the whole exchange of a run: login, contract and meter selection,
//! export requests, and reading the exported CSV.

mod client;
mod contracts;
mod export;
mod helper;
mod payload;

pub use client::Session;
pub use export::ExportWindow;
pub use payload::parse_export;
