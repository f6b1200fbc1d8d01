//! Application-level orchestration utilities.
//!
//! This module owns the create-and-launch session, its lifecycle control (start/cancel/quit)
//! and post-session processing such as remembering the user's choices. UI/CLI layers call
//! into this module to keep responsibilities separated.

mod controller;
mod post_process;
mod session;

#[cfg_attr(not(feature = "tui"), allow(unused_imports))]
pub(crate) use controller::{run_controller, SessionDeps, UiCommand};
pub(crate) use post_process::process_session_completion;
pub use session::Session;
