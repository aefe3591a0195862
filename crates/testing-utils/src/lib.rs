//! # MindForge Testing Utils
//!
//! Shared testing utilities for the scheduling engine crates.
//!
//! - **Handlers**: scripted, gated and panicking task handlers
//! - **Collaborators**: recording notifier and metrics sink, static queue status
//! - **Builders**: task and parameter builders
//! - **Helpers**: async polling with timeout
//!
//! Add this crate as a dev-dependency:
//!
//! ```toml
//! [dev-dependencies]
//! mindforge-testing-utils = { path = "../testing-utils" }
//! ```

pub mod builders;
pub mod helpers;
pub mod mocks;

pub use builders::*;
pub use helpers::*;
pub use mocks::*;
