#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};

use capturing_logger::{CaptureLogger, CapturedEvent, LoggerRegistry, Settings};

/// Installs the capturing logger once per test binary.
pub fn init_capture_once() {
    static INIT: std::sync::Once = std::sync::Once::new();
    INIT.call_once(|| CaptureLogger::global().init());
}

/// A registry owned by a single test.
pub fn registry(settings: Settings) -> &'static LoggerRegistry {
    Box::leak(Box::new(LoggerRegistry::new(settings)))
}

/// A logger name no other test uses.
pub fn unique_name(prefix: &str) -> String {
    static NEXT: AtomicUsize = AtomicUsize::new(0);
    format!("{prefix}.{}", NEXT.fetch_add(1, Ordering::Relaxed))
}

pub fn messages(events: &[CapturedEvent]) -> Vec<String> {
    events.iter().map(CapturedEvent::formatted_message).collect()
}
