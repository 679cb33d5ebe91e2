pub mod api;
pub mod builds;
pub mod config;
pub mod dashboard;
pub mod env;
pub mod error;
pub mod events;
pub mod logging;
pub mod nav;
pub mod remote;
pub mod sanitize;
pub mod ui;

pub use error::{Error, Result};
