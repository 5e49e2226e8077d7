//! Side-effecting collaborators: child processes, the issue tracker, local
//! state files, and configuration.

pub mod cache;
pub mod config;
pub mod github;
pub mod layout;
pub mod metrics;
pub mod post;
pub mod process;
pub mod sessions;
pub mod state_items;
