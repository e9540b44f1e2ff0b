//! Consolidated test utilities and helpers for the consumption forwarder.
//!
//! This module provides a centralized location for test configurations,
//! portal page fixtures, export payloads and mock sinks used throughout
//! the codebase.

#![cfg(test)]

pub mod fixtures;
pub mod html;
pub mod mocks;
