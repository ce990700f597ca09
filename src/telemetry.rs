//! Telemetry utilities: standard spans and panic logging.

use std::backtrace::Backtrace;
use std::panic::PanicHookInfo;

/// Install a panic hook that reports panics through `tracing`.
///
/// Handler panics are caught at the dispatch boundary; this hook is where
/// their location and call stack end up in the log.
pub fn install_panic_hook() {
    std::panic::set_hook(Box::new(|info: &PanicHookInfo<'_>| {
        let backtrace = Backtrace::force_capture();
        let location = info
            .location()
            .map(|l| format!("{}:{}:{}", l.file(), l.line(), l.column()))
            .unwrap_or_else(|| "<unknown>".to_string());
        let thread = std::thread::current();
        tracing::error!(
            thread = thread.name().unwrap_or("<unnamed>"),
            location = %location,
            payload = %panic_message(info.payload()),
            backtrace = %backtrace,
            "Panic"
        );
    }));
}

/// Extract a printable message from a panic payload.
pub fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "<non-string panic payload>".to_string()
    }
}

/// Standardized span constructors for bot observability.
pub mod spans {
    use tracing::{Span, debug_span, info_span};

    /// Create a span for one supervised server connection.
    pub fn network(name: &str, endpoint: &str) -> Span {
        info_span!("network", name = %name, endpoint = %endpoint)
    }

    /// Create a span for one live socket of a supervised connection.
    pub fn connection(generation: u64) -> Span {
        info_span!("connection", generation)
    }

    /// Create a span for one handler invocation.
    pub fn dispatch(command: &str, source: &str) -> Span {
        debug_span!("dispatch", command = %command, source = %source)
    }
}
