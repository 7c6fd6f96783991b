//! One-line notifications for outcomes worth surfacing.

use std::ffi::OsString;
use std::io::{self, Write};
use std::process::{Command, Stdio};

/// Fire-and-forget delivery of a human-readable line. Implementations must
/// swallow their own failures.
pub trait Notifier: Send + Sync + 'static {
    fn notify(&self, message: &str);
}

const NOTIFY_SEND: &str = "notify-send";

/// Prints to stdout, logs, and optionally pops a desktop notification via
/// `notify-send`.
#[derive(Debug, Clone)]
pub struct DesktopNotifier {
    desktop: bool,
    program: OsString,
}

impl DesktopNotifier {
    pub fn new(desktop: bool) -> Self {
        Self {
            desktop,
            program: OsString::from(NOTIFY_SEND),
        }
    }

    pub fn console_only() -> Self {
        Self::new(false)
    }

    /// Use `program` instead of `notify-send` for desktop delivery.
    pub fn with_program(mut self, program: impl Into<OsString>) -> Self {
        self.program = program.into();
        self
    }

    /// Deliver `message` to `console` and then the desktop. A broken
    /// console never prevents the desktop notification.
    fn deliver<W: Write>(&self, console: &mut W, message: &str) {
        tracing::info!(text = message, "notification");
        if let Err(err) = writeln!(console, "{message}").and_then(|()| console.flush()) {
            tracing::debug!(error = %err, "console notification failed");
        }

        if !self.desktop {
            return;
        }
        let sent = Command::new(&self.program)
            .arg(message)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status();
        match sent {
            Ok(status) if status.success() => {}
            Ok(status) => tracing::debug!(%status, "notify-send failed"),
            Err(err) => tracing::debug!(error = %err, "notify-send unavailable"),
        }
    }
}

impl Notifier for DesktopNotifier {
    fn notify(&self, message: &str) {
        self.deliver(&mut io::stdout().lock(), message);
    }
}
