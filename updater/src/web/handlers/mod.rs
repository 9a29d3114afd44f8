//! HTTP request handlers, organized by domain:
//! - `common` - Response envelope and shared helpers
//! - `scheduler` - Run trigger, status, start/stop
//! - `banners` - Banner inventory and configuration
//! - `health` - Liveness probe

pub mod banners;
pub mod common;
pub mod health;
pub mod scheduler;

pub use banners::*;
pub use health::*;
pub use scheduler::*;
