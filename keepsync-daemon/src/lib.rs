//! Daemon runtime: one polling loop per repository, desktop/console
//! notifications, and an orderly final pass on shutdown.

mod error;
pub mod notifier;
mod runtime;
pub mod scheduler;

pub use error::DaemonError;
pub use notifier::{DesktopNotifier, Notifier};
pub use runtime::{init_tracing, load, run, run_once, start_blocking};
pub use scheduler::{Scheduler, TickReport};
