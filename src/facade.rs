//! Glue between the [`log`] façade and the registry.

use crate::{ContextMap, Level, LoggerRegistry, Result, Value, event::EventParts};

/// A [`log::Log`] implementation that captures records into a [`LoggerRegistry`].
///
/// Each record is routed to the registry logger named by its target, which is the
/// module path unless the call site sets `target:` explicitly. The formatted message
/// becomes the event message, and the record's key-value pairs are kept.
///
/// # Example
///
/// ```
/// use capturing_logger::{CaptureLogger, LoggerRegistry};
///
/// CaptureLogger::global().try_init()?;
///
/// log::info!(target: "payments", order_id = 42; "order accepted");
///
/// let events = LoggerRegistry::global().logger("payments").logging_events();
/// assert_eq!(events[0].message(), "order accepted");
/// assert_eq!(events[0].key_value_pairs()[0].0, "order_id");
/// # Ok::<(), capturing_logger::Error>(())
/// ```
#[derive(Debug, Clone, Copy)]
pub struct CaptureLogger {
    registry: &'static LoggerRegistry,
}

impl CaptureLogger {
    /// Creates a logger that captures into `registry`.
    #[must_use]
    pub const fn new(registry: &'static LoggerRegistry) -> Self {
        Self { registry }
    }

    /// Creates a logger that captures into the process-wide registry.
    ///
    /// # Panics
    ///
    /// Panics if the environment holds invalid settings, see [`LoggerRegistry::global`].
    #[must_use]
    pub fn global() -> Self {
        Self::new(LoggerRegistry::global())
    }

    /// Installs this logger as the global [`log`] logger.
    ///
    /// This should be called early in the execution of a test binary. Records logged
    /// before initialization are not captured.
    ///
    /// # Panics
    ///
    /// Panics if a logger has already been set.
    pub fn init(self) {
        self.try_init()
            .expect("CaptureLogger::init should not be called after logger initialization");
    }

    /// Installs this logger as the global [`log`] logger.
    ///
    /// # Errors
    ///
    /// Returns an error if a logger has already been set.
    pub fn try_init(self) -> Result<()> {
        log::set_max_level(log::LevelFilter::Trace);
        log::set_boxed_logger(Box::new(self))?;
        Ok(())
    }
}

/// The diagnostic context of the process-wide registry.
///
/// # Panics
///
/// Panics if the environment holds invalid settings, see [`LoggerRegistry::global`].
#[must_use]
pub fn context_map() -> &'static ContextMap {
    LoggerRegistry::global().context_map()
}

impl log::Log for CaptureLogger {
    fn enabled(&self, metadata: &log::Metadata) -> bool {
        self.registry
            .logger(metadata.target())
            .is_enabled(metadata.level().into())
    }

    fn log(&self, record: &log::Record) {
        let logger = self.registry.logger(record.target());
        let level = Level::from(record.level());
        if !logger.is_enabled(level) {
            return;
        }

        let mut pairs = KeyValues::default();
        if let Err(err) = record.key_values().visit(&mut pairs) {
            // We can't use `log::error!` here because we are in the middle of logging and
            // this invocation becomes recursive.
            eprintln!("Error collecting record key-values: {err}");
        }

        let message = record.args().to_string();
        logger.record(level, &message, EventParts {
            key_value_pairs: pairs.0,
            ..EventParts::default()
        });
    }

    fn flush(&self) {}
}

#[derive(Default)]
struct KeyValues(Vec<(String, Value)>);

impl<'kvs> log::kv::VisitSource<'kvs> for KeyValues {
    fn visit_pair(
        &mut self,
        key: log::kv::Key<'kvs>,
        value: log::kv::Value<'kvs>,
    ) -> Result<(), log::kv::Error> {
        self.0
            .push((key.as_str().to_owned(), Value::from_log_value(&value)));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use log::Log as _;
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::{CapturedEvent, Settings};

    fn capture() -> CaptureLogger {
        CaptureLogger::new(Box::leak(Box::new(LoggerRegistry::new(Settings::default()))))
    }

    #[test]
    fn test_records_route_by_target() {
        let logger = capture();
        logger.log(
            &log::Record::builder()
                .level(log::Level::Warn)
                .target("billing")
                .args(format_args!("charged {} cents", 250))
                .build(),
        );

        assert_eq!(
            logger.registry.logger("billing").logging_events(),
            vec![CapturedEvent::warn("charged 250 cents", [])]
        );
        assert!(logger.registry.logger("other").logging_events().is_empty());
    }

    #[test]
    fn test_key_values_are_captured() {
        let logger = capture();
        let kvs = [("user", "alice")];
        logger.log(
            &log::Record::builder()
                .level(log::Level::Info)
                .target("auth")
                .args(format_args!("signed in"))
                .key_values(&kvs)
                .build(),
        );

        let events = logger.registry.logger("auth").logging_events();
        assert_eq!(events.len(), 1);
        assert_eq!(
            events[0].key_value_pairs(),
            [("user".to_owned(), Value::from("alice"))]
        );
        assert_eq!(events[0].creating_logger(), Some("auth"));
    }

    #[test]
    fn test_numeric_key_values_equal_hand_built_events() {
        let logger = capture();
        let kvs = [("count", 91_i32)];
        logger.log(
            &log::Record::builder()
                .level(log::Level::Warn)
                .target("disk")
                .args(format_args!("disk almost full"))
                .key_values(&kvs)
                .build(),
        );
        let unsigned = [("count", 91_u8)];
        logger.log(
            &log::Record::builder()
                .level(log::Level::Warn)
                .target("disk")
                .args(format_args!("disk almost full"))
                .key_values(&unsigned)
                .build(),
        );

        let expected = CapturedEvent::warn("disk almost full", []).with_key_value("count", 91);
        assert_eq!(
            logger.registry.logger("disk").logging_events(),
            vec![expected.clone(), expected]
        );
    }

    #[test]
    fn test_disabled_levels_are_skipped() {
        let logger = capture();
        logger
            .registry
            .logger("quiet")
            .set_enabled_levels(Level::Error);

        let metadata = log::Metadata::builder()
            .level(log::Level::Info)
            .target("quiet")
            .build();
        assert!(!logger.enabled(&metadata));

        logger.log(
            &log::Record::builder()
                .level(log::Level::Info)
                .target("quiet")
                .args(format_args!("dropped"))
                .build(),
        );
        assert!(logger.registry.logger("quiet").logging_events().is_empty());
    }

    #[test]
    fn test_events_carry_the_context_map() {
        let logger = capture();
        logger.registry.context_map().put("request", "r-7");
        logger.log(
            &log::Record::builder()
                .level(log::Level::Debug)
                .target("ctx")
                .args(format_args!("with context"))
                .build(),
        );

        assert_eq!(
            logger.registry.logger("ctx").logging_events(),
            vec![CapturedEvent::debug("with context", []).with_mdc([("request", "r-7")])]
        );
    }
}
