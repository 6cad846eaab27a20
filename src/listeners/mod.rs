//! # Job lifecycle fan-out.
//!
//! External collaborators observe job lifecycle transitions through
//! [`JobListener`]; [`ListenerSet`] holds the registered listeners and fires
//! them synchronously. [`LogListener`] is a predefined stdout implementation
//! for development and demos.

mod listener;
mod log;
mod set;

pub use listener::JobListener;
pub use log::LogListener;
pub use set::ListenerSet;
