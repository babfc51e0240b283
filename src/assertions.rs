//! Fluent assertions over captured events.
//!
//! Every assertion panics with a description of what was expected and what the logger
//! actually holds, so it reads like `assert_eq!` in test output.
//!
//! ```
//! use capturing_logger::{
//!     Level, LoggerRegistry, Settings, Value,
//!     assertions::{EventPredicate, assert_that},
//! };
//!
//! let registry = LoggerRegistry::new(Settings::default());
//! let logger = registry.logger("orders");
//! logger.info("order {} accepted", &[Value::from(7)]);
//!
//! assert_that(&logger)
//!     .has_logged(Level::Info, "order {} accepted", [Value::from(7)])
//!     .has_not_logged(Level::Warn, "order {} accepted", [Value::from(7)])
//!     .has_logged_matching(EventPredicate::a_log().with_message("order {} accepted"));
//! assert_that(&logger).has_level(Level::Info).has_number_of_logs(1);
//! ```

use std::fmt::{self, Write as _};

use regex::Regex;

use crate::{CapturedEvent, CapturingLogger, Level, Marker, Throwable, Value, event::Mdc};

/// Starts assertions over the events captured by `logger` on the calling thread.
#[must_use]
pub const fn assert_that(logger: &CapturingLogger) -> LoggerAssert<'_> {
    LoggerAssert {
        logger,
        any_thread: false,
        mdc_comparator: MdcComparator::Exact,
    }
}

/// How the diagnostic context of an expected event is compared with a captured one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MdcComparator {
    /// The context is not compared.
    Ignoring,
    /// The captured context must hold exactly the expected entries.
    #[default]
    Exact,
    /// The captured context must hold at least the expected entries.
    Containing,
}

impl MdcComparator {
    #[must_use]
    pub fn matches(self, actual: &Mdc, expected: &Mdc) -> bool {
        match self {
            Self::Ignoring => true,
            Self::Exact => actual == expected,
            Self::Containing => expected
                .iter()
                .all(|(key, value)| actual.get(key) == Some(value)),
        }
    }
}

/// Anything an event can be tested against.
pub trait EventMatcher {
    fn matches(&self, event: &CapturedEvent) -> bool;
}

impl<F> EventMatcher for F
where
    F: Fn(&CapturedEvent) -> bool,
{
    fn matches(&self, event: &CapturedEvent) -> bool {
        self(event)
    }
}

type Check = Box<dyn Fn(&CapturedEvent) -> bool + Send + Sync>;

/// A composable description of an event, built with [`EventPredicate::a_log`].
///
/// Aspects that were never constrained match anything. Setting the same aspect twice
/// keeps the last constraint.
#[derive(Default)]
pub struct EventPredicate {
    level: Option<Check>,
    markers: Option<Check>,
    message: Option<Check>,
    arguments: Option<Check>,
    throwable: Option<Check>,
    mdc: Option<Check>,
}

impl EventPredicate {
    /// A predicate matching every event.
    #[must_use]
    pub fn a_log() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_level(mut self, level: Level) -> Self {
        self.level = Some(Box::new(move |event| event.level() == level));
        self
    }

    /// Requires `marker` to be the only marker of the event.
    #[must_use]
    pub fn with_marker(self, marker: Marker) -> Self {
        self.with_markers([marker])
    }

    /// Requires the event to carry exactly `markers`, in order.
    #[must_use]
    pub fn with_markers(mut self, markers: impl IntoIterator<Item = Marker>) -> Self {
        let markers: Vec<_> = markers.into_iter().collect();
        self.markers = Some(Box::new(move |event| event.markers() == markers.as_slice()));
        self
    }

    #[must_use]
    pub fn with_message(self, message: impl Into<String>) -> Self {
        let message = message.into();
        self.with_message_matching(move |actual| actual == message)
    }

    /// Tests the message template with `predicate`.
    #[must_use]
    pub fn with_message_matching<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&str) -> bool + Send + Sync + 'static,
    {
        self.message = Some(Box::new(move |event| predicate(event.message())));
        self
    }

    #[must_use]
    pub fn with_arguments(self, arguments: impl IntoIterator<Item = Value>) -> Self {
        let arguments: Vec<_> = arguments.into_iter().collect();
        self.with_arguments_matching(move |actual| actual == arguments.as_slice())
    }

    #[must_use]
    pub fn with_arguments_matching<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&[Value]) -> bool + Send + Sync + 'static,
    {
        self.arguments = Some(Box::new(move |event| predicate(event.arguments())));
        self
    }

    /// Requires the event's throwable to equal `throwable`; `None` requires no throwable.
    #[must_use]
    pub fn with_throwable(self, throwable: Option<Throwable>) -> Self {
        self.with_throwable_matching(move |actual| actual == throwable.as_ref())
    }

    #[must_use]
    pub fn with_throwable_matching<F>(mut self, predicate: F) -> Self
    where
        F: Fn(Option<&Throwable>) -> bool + Send + Sync + 'static,
    {
        self.throwable = Some(Box::new(move |event| predicate(event.throwable())));
        self
    }

    #[must_use]
    pub fn with_mdc(mut self, mdc: Mdc, comparator: MdcComparator) -> Self {
        self.mdc = Some(Box::new(move |event| comparator.matches(event.mdc(), &mdc)));
        self
    }

    /// The predicate matching events equal to `expected`, comparing contexts with
    /// `comparator`.
    fn like(expected: &CapturedEvent, comparator: MdcComparator) -> Self {
        Self::a_log()
            .with_level(expected.level())
            .with_markers(expected.markers().to_vec())
            .with_message(expected.message())
            .with_arguments(expected.arguments().to_vec())
            .with_throwable(expected.throwable().cloned())
            .with_mdc(expected.mdc().clone(), comparator)
    }
}

impl EventMatcher for EventPredicate {
    fn matches(&self, event: &CapturedEvent) -> bool {
        [
            &self.level,
            &self.markers,
            &self.message,
            &self.arguments,
            &self.throwable,
            &self.mdc,
        ]
        .into_iter()
        .flatten()
        .all(|check| check(event))
    }
}

impl fmt::Debug for EventPredicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventPredicate")
            .field("level", &self.level.is_some())
            .field("markers", &self.markers.is_some())
            .field("message", &self.message.is_some())
            .field("arguments", &self.arguments.is_some())
            .field("throwable", &self.throwable.is_some())
            .field("mdc", &self.mdc.is_some())
            .finish()
    }
}

/// Assertions over one logger, created by [`assert_that`].
#[derive(Debug, Clone, Copy)]
pub struct LoggerAssert<'a> {
    logger: &'a CapturingLogger,
    any_thread: bool,
    mdc_comparator: MdcComparator,
}

impl<'a> LoggerAssert<'a> {
    /// Looks at the events of every thread instead of the calling thread only.
    #[must_use]
    pub const fn any_thread(mut self) -> Self {
        self.any_thread = true;
        self
    }

    /// Changes how diagnostic contexts are compared, [`MdcComparator::Exact`] by default.
    #[must_use]
    pub const fn using_mdc_comparator(mut self, comparator: MdcComparator) -> Self {
        self.mdc_comparator = comparator;
        self
    }

    /// # Panics
    ///
    /// Panics if no such event was captured.
    #[track_caller]
    pub fn has_logged(
        self,
        level: Level,
        message: &str,
        arguments: impl IntoIterator<Item = Value>,
    ) -> Self {
        self.has_logged_event(&CapturedEvent::new(level, message, arguments))
    }

    /// # Panics
    ///
    /// Panics if no such event was captured.
    #[track_caller]
    pub fn has_logged_with_throwable(
        self,
        throwable: impl Into<Throwable>,
        level: Level,
        message: &str,
        arguments: impl IntoIterator<Item = Value>,
    ) -> Self {
        self.has_logged_event(&CapturedEvent::with_throwable(
            level, throwable, message, arguments,
        ))
    }

    /// # Panics
    ///
    /// Panics if no event like `expected` was captured.
    #[track_caller]
    pub fn has_logged_event(self, expected: &CapturedEvent) -> Self {
        let predicate = EventPredicate::like(expected, self.mdc_comparator);
        self.expect_found(&predicate, || {
            format!("Failed to find event:\n  {}", describe(expected))
        })
    }

    /// # Panics
    ///
    /// Panics if no captured event satisfies `predicate`.
    #[track_caller]
    pub fn has_logged_matching(self, predicate: impl EventMatcher) -> Self {
        self.expect_found(&predicate, || {
            "Failed to find log matching predicate".to_owned()
        })
    }

    /// # Panics
    ///
    /// Panics if such an event was captured.
    #[track_caller]
    pub fn has_not_logged(
        self,
        level: Level,
        message: &str,
        arguments: impl IntoIterator<Item = Value>,
    ) -> Self {
        self.has_not_logged_event(&CapturedEvent::new(level, message, arguments))
    }

    /// # Panics
    ///
    /// Panics if such an event was captured.
    #[track_caller]
    pub fn has_not_logged_with_throwable(
        self,
        throwable: impl Into<Throwable>,
        level: Level,
        message: &str,
        arguments: impl IntoIterator<Item = Value>,
    ) -> Self {
        self.has_not_logged_event(&CapturedEvent::with_throwable(
            level, throwable, message, arguments,
        ))
    }

    /// # Panics
    ///
    /// Panics if an event like `unexpected` was captured.
    #[track_caller]
    pub fn has_not_logged_event(self, unexpected: &CapturedEvent) -> Self {
        self.has_not_logged_matching(EventPredicate::like(unexpected, self.mdc_comparator))
    }

    /// # Panics
    ///
    /// Panics if a captured event satisfies `predicate`.
    #[track_caller]
    pub fn has_not_logged_matching(self, predicate: impl EventMatcher) -> Self {
        if let Some(found) = self.events().iter().find(|event| predicate.matches(event)) {
            panic!("Found {}, even though we expected not to", describe(found));
        }
        self
    }

    /// Continues with assertions over the events of one level.
    #[must_use]
    pub const fn has_level(self, level: Level) -> LevelAssert<'a> {
        LevelAssert {
            logger: self.logger,
            level,
            any_thread: self.any_thread,
        }
    }

    fn events(&self) -> Vec<CapturedEvent> {
        events_of(self.logger, self.any_thread)
    }

    #[track_caller]
    fn expect_found(self, predicate: &dyn EventMatcher, failure: impl FnOnce() -> String) -> Self {
        let events = self.events();
        if !events.iter().any(|event| predicate.matches(event)) {
            panic!(
                "{}\n\nThe logger contained the following events:\n{}",
                failure(),
                list(&events)
            );
        }
        self
    }
}

/// Assertions over the events of one level, created by [`LoggerAssert::has_level`].
#[derive(Debug, Clone, Copy)]
pub struct LevelAssert<'a> {
    logger: &'a CapturingLogger,
    level: Level,
    any_thread: bool,
}

impl LevelAssert<'_> {
    /// # Panics
    ///
    /// Panics if the level does not hold exactly `expected` events.
    #[track_caller]
    pub fn has_number_of_logs(self, expected: usize) -> Self {
        let count = self.events().len();
        assert!(
            count == expected,
            "Expected level {} to have {expected} log messages available, but {count} were found",
            self.level,
        );
        self
    }

    /// # Panics
    ///
    /// Panics if no event of the level has a message template containing `substring`.
    #[track_caller]
    pub fn has_message_containing(self, substring: &str) -> Self {
        let events = self.events();
        if !events.iter().any(|event| event.message().contains(substring)) {
            panic!(
                "Expected level {} to contain a log message containing `{substring}`, \
                 but it did not.\n\nLog messages found:\n{}",
                self.level,
                list(&events)
            );
        }
        self
    }

    /// Requires the whole message template of some event of the level to match `pattern`.
    ///
    /// # Panics
    ///
    /// Panics if `pattern` is not a valid regular expression, or if no event of the level
    /// matches it.
    #[track_caller]
    pub fn has_message_matching(self, pattern: &str) -> Self {
        let regex = match Regex::new(&format!("^(?:{pattern})$")) {
            Ok(regex) => regex,
            Err(err) => panic!("Invalid message pattern `{pattern}`: {err}"),
        };
        let events = self.events();
        if !events.iter().any(|event| regex.is_match(event.message())) {
            panic!(
                "Expected level {} to contain a log message matching regex `{pattern}`, \
                 but it did not.\n\nLog messages found:\n{}",
                self.level,
                list(&events)
            );
        }
        self
    }

    fn events(&self) -> Vec<CapturedEvent> {
        let mut events = events_of(self.logger, self.any_thread);
        events.retain(|event| event.level() == self.level);
        events
    }
}

fn events_of(logger: &CapturingLogger, any_thread: bool) -> Vec<CapturedEvent> {
    if any_thread {
        logger.all_logging_events()
    } else {
        logger.logging_events()
    }
}

fn describe(event: &CapturedEvent) -> String {
    let mut out = format!("{} {:?}", event.level(), event.message());
    if !event.arguments().is_empty() {
        let arguments: Vec<_> = event.arguments().iter().map(ToString::to_string).collect();
        let _ = write!(out, " arguments=[{}]", arguments.join(", "));
    }
    if !event.markers().is_empty() {
        let markers: Vec<_> = event.markers().iter().map(ToString::to_string).collect();
        let _ = write!(out, " markers=[{}]", markers.join(", "));
    }
    if let Some(throwable) = event.throwable() {
        let _ = write!(out, " throwable={throwable}");
    }
    if !event.mdc().is_empty() {
        let _ = write!(out, " mdc={:?}", event.mdc());
    }
    out
}

fn list(events: &[CapturedEvent]) -> String {
    if events.is_empty() {
        return "  <none>".to_owned();
    }
    events
        .iter()
        .map(|event| format!("  - {}", describe(event)))
        .collect::<Vec<_>>()
        .join("\n")
}
