//! Fluent construction of a single event.

use std::fmt;

use crate::{CapturedEvent, CapturingLogger, Level, Marker, Throwable, Value, event::EventParts};

/// A value supplied either up front or by a closure run when the event is emitted.
enum Deferred<'a, T> {
    Ready(T),
    Supplier(Box<dyn FnOnce() -> T + 'a>),
}

impl<T> Deferred<'_, T> {
    fn resolve(self) -> T {
        match self {
            Self::Ready(value) => value,
            Self::Supplier(supplier) => supplier(),
        }
    }
}

/// Builds one event through a [`CapturingLogger`], attaching parts incrementally.
///
/// Suppliers passed to [`message_with`](Self::message_with),
/// [`argument_with`](Self::argument_with) and [`key_value_with`](Self::key_value_with)
/// run once, when [`log`](Self::log) emits the event, and not at all if the level is
/// disabled by then.
///
/// ```
/// use capturing_logger::{LoggerRegistry, Settings, Value};
///
/// let registry = LoggerRegistry::new(Settings::default());
/// let logger = registry.logger("orders");
/// logger
///     .at_info()
///     .key_value("order_id", 17)
///     .argument(3)
///     .log_message("shipped {} parcels");
///
/// let events = logger.logging_events();
/// assert_eq!(events[0].formatted_message(), "shipped 3 parcels");
/// assert_eq!(events[0].key_value_pairs()[0].1, Value::from(17));
/// ```
#[must_use = "an event builder does nothing until `log` is called"]
pub struct EventBuilder<'a> {
    logger: &'a CapturingLogger,
    level: Level,
    markers: Vec<Marker>,
    throwable: Option<Throwable>,
    message: Option<Deferred<'a, String>>,
    arguments: Vec<Deferred<'a, Value>>,
    key_value_pairs: Vec<(String, Deferred<'a, Value>)>,
}

impl<'a> EventBuilder<'a> {
    pub(crate) const fn new(logger: &'a CapturingLogger, level: Level) -> Self {
        Self {
            logger,
            level,
            markers: Vec::new(),
            throwable: None,
            message: None,
            arguments: Vec::new(),
            key_value_pairs: Vec::new(),
        }
    }

    pub fn marker(mut self, marker: Marker) -> Self {
        self.markers.push(marker);
        self
    }

    pub fn cause(mut self, cause: impl Into<Throwable>) -> Self {
        self.throwable = Some(cause.into());
        self
    }

    pub fn message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(Deferred::Ready(message.into()));
        self
    }

    pub fn message_with<F>(mut self, supplier: F) -> Self
    where
        F: FnOnce() -> String + 'a,
    {
        self.message = Some(Deferred::Supplier(Box::new(supplier)));
        self
    }

    pub fn argument(mut self, argument: impl Into<Value>) -> Self {
        self.arguments.push(Deferred::Ready(argument.into()));
        self
    }

    pub fn argument_with<F, V>(mut self, supplier: F) -> Self
    where
        F: FnOnce() -> V + 'a,
        V: Into<Value>,
    {
        self.arguments
            .push(Deferred::Supplier(Box::new(move || supplier().into())));
        self
    }

    pub fn key_value(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.key_value_pairs
            .push((key.into(), Deferred::Ready(value.into())));
        self
    }

    pub fn key_value_with<F, V>(mut self, key: impl Into<String>, supplier: F) -> Self
    where
        F: FnOnce() -> V + 'a,
        V: Into<Value>,
    {
        self.key_value_pairs.push((
            key.into(),
            Deferred::Supplier(Box::new(move || supplier().into())),
        ));
        self
    }

    /// Emits the event if its level is enabled for the calling thread.
    pub fn log(self) {
        if self.logger.is_enabled(self.level) {
            let logger = self.logger;
            logger.append(self.into_event());
        }
    }

    /// Sets the message and emits the event.
    pub fn log_message(self, message: impl Into<String>) {
        self.message(message).log();
    }

    /// Builds the event without logging it, resolving every supplier.
    #[must_use]
    pub fn into_event(self) -> CapturedEvent {
        let message = self.message.map(Deferred::resolve).unwrap_or_default();
        let parts = EventParts {
            markers: self.markers,
            throwable: self.throwable,
            arguments: self.arguments.into_iter().map(Deferred::resolve).collect(),
            key_value_pairs: self
                .key_value_pairs
                .into_iter()
                .map(|(key, value)| (key, value.resolve()))
                .collect(),
            ..EventParts::default()
        };
        self.logger.event(self.level, message, parts)
    }
}

impl fmt::Debug for EventBuilder<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBuilder")
            .field("logger", &self.logger.name())
            .field("level", &self.level)
            .field("markers", &self.markers)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;

    use pretty_assertions::assert_eq;

    use crate::{Level, LoggerRegistry, Marker, Settings, Value};

    #[test]
    fn test_suppliers_resolve_at_emission() {
        let registry = LoggerRegistry::new(Settings::default());
        let logger = registry.logger("builder");
        let counter = Cell::new(1);

        let builder = logger
            .at_warn()
            .argument_with(|| counter.get())
            .key_value_with("count", || counter.get())
            .message_with(|| format!("count is {{}} (read {})", counter.get()));
        counter.set(5);
        builder.log();

        let events = logger.logging_events();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].arguments(), [Value::from(5)]);
        assert_eq!(events[0].key_value_pairs()[0].1, Value::from(5));
        assert_eq!(events[0].formatted_message(), "count is 5 (read 5)");
    }

    #[test]
    fn test_disabled_level_skips_suppliers() {
        let registry = LoggerRegistry::new(Settings::default());
        let logger = registry.logger("builder.disabled");
        logger.set_enabled_levels(Level::Error);

        let called = Cell::new(false);
        logger
            .at_debug()
            .message_with(|| {
                called.set(true);
                "expensive".to_owned()
            })
            .log();

        assert!(!called.get());
        assert!(logger.logging_events().is_empty());
    }

    #[test]
    fn test_builder_attaches_markers_and_cause() {
        let registry = LoggerRegistry::new(Settings::default());
        let logger = registry.logger("builder.parts");

        logger
            .at_error()
            .marker(Marker::new("ALERT"))
            .marker(Marker::new("PAGER"))
            .cause("disk failure")
            .key_value("disk", "sda")
            .key_value("disk", "sdb")
            .log_message("raid degraded");

        let events = logger.logging_events();
        let event = &events[0];
        assert_eq!(
            event.markers(),
            [Marker::new("ALERT"), Marker::new("PAGER")]
        );
        assert_eq!(event.throwable().map(crate::Throwable::message), Some("disk failure"));
        assert_eq!(event.key_value_pairs().len(), 2);
        assert_eq!(event.creating_logger(), Some("builder.parts"));
    }

    #[test]
    fn test_into_event_does_not_log() {
        let registry = LoggerRegistry::new(Settings::default());
        let logger = registry.logger("builder.preview");

        let event = logger.at_info().message("preview").into_event();

        assert_eq!(event.message(), "preview");
        assert!(logger.logging_events().is_empty());
    }
}
