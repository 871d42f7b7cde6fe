// Library surface for headless/integration tests and reuse.
// Terminal setup and argument parsing stay in main.rs.
pub mod app;
pub mod app_dirs;
pub mod clock;
pub mod config;
pub mod controller;
pub mod recipe;
pub mod runtime;
pub mod session;
pub mod status;
pub mod step;
pub mod timeline;
pub mod ui;
pub mod util;

pub use app::{App, AppState, Flow};
