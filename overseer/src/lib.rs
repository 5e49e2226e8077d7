//! Program graph discovery and status aggregation.
//!
//! Given a parent issue that represents a multi-part body of work, this crate
//! reconstructs the sub-issues under it, their dependencies and linked pull
//! requests from free-text and file-based evidence, then derives progress,
//! phase, blockers, risks, active work, an ETA, and next steps.
//!
//! - **[`core`]**: Pure, deterministic logic (discovery strategies, linkage,
//!   graph, status rules, ETA). No I/O, fully testable in isolation.
//! - **[`io`]**: Side-effecting collaborators (`gh`, `tmux`, local state files,
//!   config). Traits at the seams enable scripted fakes in tests.
//!
//! [`discover`] coordinates one read-only reconstruction; [`format`] renders
//! the outcome.

pub mod core;
pub mod discover;
pub mod exit_codes;
pub mod format;
pub mod io;
pub mod logging;
#[cfg(any(test, feature = "test-support"))]
pub mod test_support;
