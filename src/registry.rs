//! The name to logger registry.

use std::{
    any::type_name,
    sync::{
        Arc,
        atomic::{AtomicU8, Ordering},
    },
};

use indexmap::IndexMap;
use once_cell::sync::OnceCell;
use parking_lot::RwLock;

use crate::{
    CapturedEvent, CapturingLogger, ContextMap, Level, Result, Settings,
    guard::{CleanupGuard, CleanupStage},
};

const PRINT_OFF: u8 = u8::MAX;

/// State every logger of a registry reads when capturing.
#[derive(Debug)]
pub(crate) struct Shared {
    capture_level: AtomicU8,
    print_level: AtomicU8,
    pub(crate) context_map: ContextMap,
}

impl Shared {
    fn new(settings: &Settings) -> Self {
        Self {
            capture_level: AtomicU8::new(settings.capture_level.to_u8()),
            print_level: AtomicU8::new(settings.print_level.map_or(PRINT_OFF, Level::to_u8)),
            context_map: ContextMap::new(settings.context_map),
        }
    }

    pub(crate) fn capture_level(&self) -> Level {
        Level::from_u8(self.capture_level.load(Ordering::Acquire)).unwrap_or(Level::Trace)
    }

    pub(crate) fn print_level(&self) -> Option<Level> {
        Level::from_u8(self.print_level.load(Ordering::Acquire))
    }
}

static GLOBAL: OnceCell<LoggerRegistry> = OnceCell::new();

/// Hands out one [`CapturingLogger`] per name and manages their state in bulk.
///
/// Most code uses the process-wide registry through [`LoggerRegistry::global`]; tests of
/// this crate and of code that wants full isolation can build their own with
/// [`LoggerRegistry::new`].
///
/// ```
/// use capturing_logger::{CapturedEvent, LoggerRegistry, Settings, Value};
///
/// let registry = LoggerRegistry::new(Settings::default());
/// let logger = registry.logger("svc");
/// logger.warn("disk at {}%", &[91.into()]);
///
/// assert!(std::sync::Arc::ptr_eq(&logger, &registry.logger("svc")));
/// assert_eq!(
///     registry.logging_events(),
///     vec![CapturedEvent::warn("disk at {}%", [Value::from(91)])]
/// );
/// ```
#[derive(Debug)]
pub struct LoggerRegistry {
    settings: Settings,
    shared: Arc<Shared>,
    loggers: RwLock<IndexMap<String, Arc<CapturingLogger>>>,
}

impl LoggerRegistry {
    #[must_use]
    pub fn new(settings: Settings) -> Self {
        Self {
            settings,
            shared: Arc::new(Shared::new(&settings)),
            loggers: RwLock::new(IndexMap::new()),
        }
    }

    /// The process-wide registry, configured from the environment on first access.
    ///
    /// # Errors
    ///
    /// Returns an error if the environment holds invalid settings, see
    /// [`Settings::from_env`].
    pub fn try_global() -> Result<&'static Self> {
        GLOBAL.get_or_try_init(|| Settings::from_env().map(Self::new))
    }

    /// The process-wide registry, configured from the environment on first access.
    ///
    /// # Panics
    ///
    /// Panics if the environment holds invalid settings, see [`Settings::from_env`].
    #[must_use]
    pub fn global() -> &'static Self {
        match Self::try_global() {
            Ok(registry) => registry,
            Err(err) => panic!("invalid capturing logger settings: {err}"),
        }
    }

    /// Returns the logger named `name`, creating it on first request.
    pub fn logger(&self, name: &str) -> Arc<CapturingLogger> {
        if let Some(logger) = self.loggers.read().get(name) {
            return Arc::clone(logger);
        }
        let mut loggers = self.loggers.write();
        Arc::clone(loggers.entry(name.to_owned()).or_insert_with(|| {
            Arc::new(CapturingLogger::new(name.to_owned(), Arc::clone(&self.shared)))
        }))
    }

    /// Returns the logger named after the fully qualified path of `T`.
    pub fn logger_for<T: ?Sized>(&self) -> Arc<CapturingLogger> {
        self.logger(type_name::<T>())
    }

    /// Every registered logger, in registration order.
    #[must_use]
    pub fn all_loggers(&self) -> IndexMap<String, Arc<CapturingLogger>> {
        self.loggers.read().clone()
    }

    fn snapshot(&self) -> Vec<Arc<CapturingLogger>> {
        self.loggers.read().values().cloned().collect()
    }

    /// Events logged by the calling thread on every logger, logger by logger.
    #[must_use]
    pub fn logging_events(&self) -> Vec<CapturedEvent> {
        self.snapshot()
            .iter()
            .flat_map(|logger| logger.logging_events())
            .collect()
    }

    /// Events logged by any thread on every logger, logger by logger.
    #[must_use]
    pub fn all_logging_events(&self) -> Vec<CapturedEvent> {
        self.snapshot()
            .iter()
            .flat_map(|logger| logger.all_logging_events())
            .collect()
    }

    /// Clears the calling thread's events and level overrides on every logger.
    pub fn clear_loggers(&self) {
        for logger in self.snapshot() {
            logger.clear();
        }
    }

    /// Clears every logger's events and level overrides, for all threads.
    pub fn clear_all(&self) {
        for logger in self.snapshot() {
            logger.clear_all();
        }
    }

    /// Clears everything and forgets the loggers themselves.
    ///
    /// Loggers obtained before keep working but are no longer returned by
    /// [`logger`](Self::logger).
    pub fn clear_all_loggers(&self) {
        let removed = std::mem::take(&mut *self.loggers.write());
        for logger in removed.values() {
            logger.clear_all();
        }
    }

    /// Returns the registry to its freshly constructed state.
    pub fn reset(&self) {
        self.clear_all_loggers();
        self.set_capture_level(self.settings.capture_level);
        self.set_print_level(self.settings.print_level);
        self.shared.context_map.clear_all_threads();
    }

    #[must_use]
    pub fn capture_level(&self) -> Level {
        self.shared.capture_level()
    }

    /// Sets the lowest level captured by loggers without an explicit level override.
    pub fn set_capture_level(&self, level: Level) {
        self.shared
            .capture_level
            .store(level.to_u8(), Ordering::Release);
    }

    #[must_use]
    pub fn print_level(&self) -> Option<Level> {
        self.shared.print_level()
    }

    /// Sets the lowest level echoed to the console; `None` disables the echo.
    pub fn set_print_level(&self, level: Option<Level>) {
        self.shared
            .print_level
            .store(level.map_or(PRINT_OFF, Level::to_u8), Ordering::Release);
    }

    /// The diagnostic context captured with every event of this registry.
    #[must_use]
    pub fn context_map(&self) -> &ContextMap {
        &self.shared.context_map
    }

    /// Cleans this registry at the given stage of a test.
    pub fn cleanup_guard(&self, stage: CleanupStage) -> CleanupGuard<'_> {
        CleanupGuard::new(self, stage)
    }
}
