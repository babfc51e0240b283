//! Captured log events.

use std::{
    collections::BTreeMap,
    hash::{Hash, Hasher},
    io::Write as _,
    thread::{self, ThreadId},
};

use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;

use crate::{Level, Marker, Throwable, Value, format::format_message};

/// Snapshot of a diagnostic context at the moment of capture.
pub type Mdc = BTreeMap<String, String>;

/// One logging call, as recorded by a [`CapturingLogger`](crate::CapturingLogger).
///
/// Events are immutable. Equality and hashing consider the level, diagnostic context,
/// markers, key-value pairs, throwable, message template and arguments. The timestamp,
/// thread, and creating logger describe where the event came from and are ignored, so
/// an expectation built by hand compares equal to the captured event.
///
/// # Examples
///
/// ```
/// use capturing_logger::{CapturedEvent, Level, Value};
///
/// let event = CapturedEvent::new(Level::Info, "hello {}", [Value::from("world")]);
/// assert_eq!(event.formatted_message(), "hello world");
/// assert_eq!(event, CapturedEvent::info("hello {}", [Value::from("world")]));
/// ```
#[derive(Debug, Clone, Serialize)]
pub struct CapturedEvent {
    level: Level,
    markers: Vec<Marker>,
    message: String,
    arguments: Vec<Value>,
    throwable: Option<Throwable>,
    key_value_pairs: Vec<(String, Value)>,
    mdc: Mdc,
    timestamp: DateTime<Utc>,
    thread_name: String,
    #[serde(skip)]
    thread_id: ThreadId,
    creating_logger: Option<String>,
}

/// The parts of a logging call, before normalization.
#[derive(Debug, Default)]
pub(crate) struct EventParts {
    pub markers: Vec<Marker>,
    pub throwable: Option<Throwable>,
    pub arguments: Vec<Value>,
    pub key_value_pairs: Vec<(String, Value)>,
    pub mdc: Mdc,
    pub creating_logger: Option<String>,
}

impl CapturedEvent {
    /// Builds an event from every shape of logging call.
    ///
    /// When no throwable was given and the last argument is an error, that argument
    /// becomes the throwable.
    pub(crate) fn assemble(level: Level, message: String, parts: EventParts) -> Self {
        let EventParts {
            markers,
            mut throwable,
            mut arguments,
            key_value_pairs,
            mdc,
            creating_logger,
        } = parts;

        if throwable.is_none() && arguments.last().is_some_and(|arg| arg.as_throwable().is_some()) {
            throwable = arguments.pop().and_then(|arg| match arg {
                Value::Error(throwable) => Some(throwable),
                _ => None,
            });
        }

        let current = thread::current();
        Self {
            level,
            markers,
            message,
            arguments,
            throwable,
            key_value_pairs,
            mdc,
            timestamp: Utc::now(),
            thread_name: current
                .name()
                .map_or_else(|| format!("{:?}", current.id()), str::to_owned),
            thread_id: current.id(),
            creating_logger,
        }
    }

    pub fn new<I>(level: Level, message: impl Into<String>, arguments: I) -> Self
    where
        I: IntoIterator<Item = Value>,
    {
        let parts = EventParts {
            arguments: arguments.into_iter().collect(),
            ..EventParts::default()
        };
        Self::assemble(level, message.into(), parts)
    }

    pub fn with_throwable<I>(
        level: Level,
        throwable: impl Into<Throwable>,
        message: impl Into<String>,
        arguments: I,
    ) -> Self
    where
        I: IntoIterator<Item = Value>,
    {
        let parts = EventParts {
            throwable: Some(throwable.into()),
            arguments: arguments.into_iter().collect(),
            ..EventParts::default()
        };
        Self::assemble(level, message.into(), parts)
    }

    pub fn trace<I: IntoIterator<Item = Value>>(message: impl Into<String>, arguments: I) -> Self {
        Self::new(Level::Trace, message, arguments)
    }

    pub fn debug<I: IntoIterator<Item = Value>>(message: impl Into<String>, arguments: I) -> Self {
        Self::new(Level::Debug, message, arguments)
    }

    pub fn info<I: IntoIterator<Item = Value>>(message: impl Into<String>, arguments: I) -> Self {
        Self::new(Level::Info, message, arguments)
    }

    pub fn warn<I: IntoIterator<Item = Value>>(message: impl Into<String>, arguments: I) -> Self {
        Self::new(Level::Warn, message, arguments)
    }

    pub fn error<I: IntoIterator<Item = Value>>(message: impl Into<String>, arguments: I) -> Self {
        Self::new(Level::Error, message, arguments)
    }

    /// Returns a copy of this event with `marker` appended.
    #[must_use]
    pub fn with_marker(mut self, marker: Marker) -> Self {
        self.markers.push(marker);
        self
    }

    /// Returns a copy of this event with the given diagnostic context.
    #[must_use]
    pub fn with_mdc<K, V>(mut self, mdc: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        self.mdc = mdc.into_iter().map(|(k, v)| (k.into(), v.into())).collect();
        self
    }

    /// Returns a copy of this event with a key-value pair appended.
    #[must_use]
    pub fn with_key_value(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.key_value_pairs.push((key.into(), value.into()));
        self
    }

    /// Returns a copy of this event attributed to the logger `name`.
    #[must_use]
    pub fn from_logger(mut self, name: impl Into<String>) -> Self {
        self.creating_logger = Some(name.into());
        self
    }

    #[must_use]
    pub const fn level(&self) -> Level {
        self.level
    }

    #[must_use]
    pub fn markers(&self) -> &[Marker] {
        &self.markers
    }

    /// The message template, with placeholders unresolved.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    #[must_use]
    pub fn arguments(&self) -> &[Value] {
        &self.arguments
    }

    #[must_use]
    pub const fn throwable(&self) -> Option<&Throwable> {
        self.throwable.as_ref()
    }

    #[must_use]
    pub fn key_value_pairs(&self) -> &[(String, Value)] {
        &self.key_value_pairs
    }

    #[must_use]
    pub const fn mdc(&self) -> &Mdc {
        &self.mdc
    }

    #[must_use]
    pub const fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    #[must_use]
    pub fn thread_name(&self) -> &str {
        &self.thread_name
    }

    #[must_use]
    pub const fn thread_id(&self) -> ThreadId {
        self.thread_id
    }

    #[must_use]
    pub fn creating_logger(&self) -> Option<&str> {
        self.creating_logger.as_deref()
    }

    /// The message with its arguments substituted.
    #[must_use]
    pub fn formatted_message(&self) -> String {
        format_message(&self.message, &self.arguments)
    }

    /// Renders the event as a single console line.
    #[must_use]
    pub fn render(&self) -> String {
        let logger = self
            .creating_logger
            .as_deref()
            .map(|name| format!(" {name}"))
            .unwrap_or_default();
        format!(
            "{} [{}] {}{} - {}",
            self.timestamp.to_rfc3339_opts(SecondsFormat::Millis, true),
            self.thread_name,
            self.level,
            logger,
            self.formatted_message()
        )
    }

    /// Echoes the event to stderr for `WARN` and `ERROR`, stdout otherwise.
    pub(crate) fn print(&self) {
        let mut line = self.render();
        if let Some(throwable) = &self.throwable {
            line.push('\n');
            line.push_str(&throwable.render());
        }

        // The event is already captured; a console that can not be written to is ignored.
        let _ = if self.level >= Level::Warn {
            writeln!(std::io::stderr().lock(), "{line}")
        } else {
            writeln!(std::io::stdout().lock(), "{line}")
        };
    }
}

impl PartialEq for CapturedEvent {
    fn eq(&self, other: &Self) -> bool {
        self.level == other.level
            && self.mdc == other.mdc
            && self.markers == other.markers
            && self.key_value_pairs == other.key_value_pairs
            && self.throwable == other.throwable
            && self.message == other.message
            && self.arguments == other.arguments
    }
}

impl Eq for CapturedEvent {}

impl Hash for CapturedEvent {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.level.hash(state);
        self.mdc.hash(state);
        self.markers.hash(state);
        self.key_value_pairs.hash(state);
        self.throwable.hash(state);
        self.message.hash(state);
        self.arguments.hash(state);
    }
}

#[cfg(test)]
mod tests {
    use std::{
        collections::hash_map::DefaultHasher,
        hash::{Hash, Hasher},
    };

    use pretty_assertions::assert_eq;

    use super::*;

    fn hash_of(event: &CapturedEvent) -> u64 {
        let mut hasher = DefaultHasher::new();
        event.hash(&mut hasher);
        hasher.finish()
    }

    #[test]
    fn test_identical_inputs_are_equal() {
        let first = CapturedEvent::new(Level::Info, "hello {}", [Value::from("world")]);
        std::thread::sleep(std::time::Duration::from_millis(2));
        let second = CapturedEvent::new(Level::Info, "hello {}", [Value::from("world")]);

        assert_eq!(first.formatted_message(), "hello world");
        assert_eq!(first, second);
        assert_eq!(hash_of(&first), hash_of(&second));
        assert!(second.timestamp() > first.timestamp());
    }

    #[test]
    fn test_every_payload_field_takes_part_in_equality() {
        let base = CapturedEvent::warn("disk at {}%", [Value::from(91)]);

        assert_ne!(base, CapturedEvent::error("disk at {}%", [Value::from(91)]));
        assert_ne!(base, CapturedEvent::warn("disk at {}%", [Value::from(92)]));
        assert_ne!(base, base.clone().with_marker(Marker::new("OPS")));
        assert_ne!(base, base.clone().with_mdc([("host", "a")]));
        assert_ne!(base, base.clone().with_key_value("disk", "sda"));
        assert_ne!(
            base,
            CapturedEvent::with_throwable(Level::Warn, "full", "disk at {}%", [Value::from(91)])
        );
        assert_eq!(base, base.clone().from_logger("svc"));
    }

    #[test]
    fn test_trailing_error_argument_becomes_throwable() {
        let error = std::io::Error::other("broken pipe");
        let event =
            CapturedEvent::error("write {} failed", [Value::from("f"), Value::error(&error)]);

        assert_eq!(event.arguments(), [Value::from("f")]);
        assert_eq!(event.throwable().map(Throwable::message), Some("broken pipe"));
        assert_eq!(event.formatted_message(), "write f failed");
    }

    #[test]
    fn test_explicit_throwable_keeps_error_argument() {
        let event = CapturedEvent::with_throwable(
            Level::Error,
            "explicit",
            "{}",
            [Value::from(Throwable::new("argument"))],
        );

        assert_eq!(event.throwable().map(Throwable::message), Some("explicit"));
        assert_eq!(event.arguments().len(), 1);
    }

    #[test]
    fn test_duplicate_key_values_are_kept_in_order() {
        let event = CapturedEvent::info("kv", [])
            .with_key_value("k", 1)
            .with_key_value("k", 2);

        assert_eq!(
            event.key_value_pairs(),
            [
                ("k".to_owned(), Value::from(1)),
                ("k".to_owned(), Value::from(2))
            ]
        );
    }

    #[test]
    fn test_render() {
        let event = CapturedEvent::info("hello {}", [Value::from("world")]).from_logger("svc");
        let line = event.render();

        assert!(line.ends_with("INFO svc - hello world"), "{line}");
        assert!(line.contains(&format!("[{}]", event.thread_name())));
        // Millisecond precision, UTC.
        assert_eq!(line.split(' ').next().map(str::len), Some(24));
    }

    #[test]
    fn test_serialize() {
        let event = CapturedEvent::warn("disk at {}%", [Value::from(91)])
            .with_key_value("mount", "/var")
            .from_logger("svc");
        let json = serde_json::to_value(&event).unwrap();

        assert_eq!(json["level"], "WARN");
        assert_eq!(json["message"], "disk at {}%");
        assert_eq!(json["arguments"][0], 91);
        assert_eq!(json["key_value_pairs"][0][1], "/var");
        assert_eq!(json["creating_logger"], "svc");
    }
}
