//! Deterministic, pure logic for program reconstruction.
//!
//! Core modules must be free of I/O side effects. They operate on in-memory
//! evidence and return deterministic outputs suitable for tests.

pub mod discovery;
pub mod eta;
pub mod evidence;
pub mod graph;
pub mod linkage;
pub mod status;
pub mod types;
