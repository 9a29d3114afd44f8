//! Shared fixtures for integration tests

#![allow(dead_code)]

pub mod mock_generation;
pub mod scripted_service;
pub mod stub_tasks;
pub mod test_workspace;

pub use mock_generation::*;
pub use scripted_service::*;
pub use stub_tasks::*;
pub use test_workspace::*;
