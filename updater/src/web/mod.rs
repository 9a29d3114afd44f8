//! HTTP control surface for the scheduler.
//!
//! Thin caller of the scheduler and the banner inventory; it owns no run state.

pub mod handlers;
pub mod server;

pub use server::{create_router, start_web_server};

use std::sync::Arc;

use crate::config::Config;
use crate::scheduler::UpdateScheduler;

// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub scheduler: Arc<UpdateScheduler>,
}

impl AppState {
    pub fn new(config: Arc<Config>, scheduler: Arc<UpdateScheduler>) -> Self {
        Self { config, scheduler }
    }
}
