//! End-to-end tests for self-updater.
//!
//! These tests drive the GitHub release source and the update driver against
//! a mock GitHub API served by `wiremock`.

mod github_source;
mod update_flow;

pub use harness::{MockGitHub, TAG_SHA};
