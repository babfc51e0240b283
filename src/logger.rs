//! The per-name capturing logger.

use std::{error::Error as StdError, fmt, sync::Arc};

use parking_lot::{Mutex, RwLock};

use crate::{
    CapturedEvent, Level, LevelSet, Marker, Throwable, Value,
    builder::EventBuilder,
    event::EventParts,
    registry::Shared,
    scoped::ScopedCell,
};

/// A logger that records every enabled call in memory.
///
/// Events are stored twice: in a buffer private to the calling thread, read by
/// [`logging_events`](Self::logging_events), and in a buffer shared by all threads,
/// read by [`all_logging_events`](Self::all_logging_events). Tests that only look at
/// their own thread's events can therefore run in parallel while logging through
/// loggers of the same name.
///
/// Levels are filtered per thread. The effective set of enabled levels for a thread
/// is the union of the thread's own override ([`set_enabled_levels`]) and the
/// override for all threads ([`set_enabled_levels_for_all_threads`]). When neither
/// is set, every level at or above the registry's capture level is enabled.
///
/// [`set_enabled_levels`]: Self::set_enabled_levels
/// [`set_enabled_levels_for_all_threads`]: Self::set_enabled_levels_for_all_threads
pub struct CapturingLogger {
    name: String,
    shared: Arc<Shared>,
    events: ScopedCell<Vec<CapturedEvent>>,
    all_events: Mutex<Vec<CapturedEvent>>,
    enabled_levels: ScopedCell<Option<LevelSet>>,
    enabled_levels_all_threads: RwLock<Option<LevelSet>>,
}

macro_rules! level_methods {
    (
        $level:expr,
        $is_enabled:ident,
        $is_enabled_for:ident,
        $log:ident,
        $log_cause:ident,
        $log_marker:ident,
        $log_marker_cause:ident,
        $at:ident
    ) => {
        #[must_use]
        pub fn $is_enabled(&self) -> bool {
            self.is_enabled($level)
        }

        /// The marker does not take part in the decision.
        #[must_use]
        pub fn $is_enabled_for(&self, _marker: &Marker) -> bool {
            self.is_enabled($level)
        }

        pub fn $log(&self, message: &str, arguments: &[Value]) {
            self.log_at($level, message, arguments);
        }

        pub fn $log_cause(&self, message: &str, cause: &dyn StdError) {
            self.record($level, message, EventParts {
                throwable: Some(Throwable::from_error(cause)),
                ..EventParts::default()
            });
        }

        pub fn $log_marker(&self, marker: &Marker, message: &str, arguments: &[Value]) {
            self.record($level, message, EventParts {
                markers: vec![marker.clone()],
                arguments: arguments.to_vec(),
                ..EventParts::default()
            });
        }

        pub fn $log_marker_cause(&self, marker: &Marker, message: &str, cause: &dyn StdError) {
            self.record($level, message, EventParts {
                markers: vec![marker.clone()],
                throwable: Some(Throwable::from_error(cause)),
                ..EventParts::default()
            });
        }

        pub fn $at(&self) -> EventBuilder<'_> {
            self.at_level($level)
        }
    };
}

impl CapturingLogger {
    pub(crate) fn new(name: String, shared: Arc<Shared>) -> Self {
        Self {
            name,
            shared,
            events: ScopedCell::new(Vec::new),
            all_events: Mutex::new(Vec::new()),
            enabled_levels: ScopedCell::new(|| None),
            enabled_levels_all_threads: RwLock::new(None),
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The levels enabled for the calling thread.
    #[must_use]
    pub fn enabled_levels(&self) -> LevelSet {
        let this_thread = self.enabled_levels.get();
        let all_threads = *self.enabled_levels_all_threads.read();
        match (this_thread, all_threads) {
            (Some(this_thread), Some(all_threads)) => this_thread.union(all_threads),
            (Some(levels), None) | (None, Some(levels)) => levels,
            (None, None) => LevelSet::at_or_above(self.shared.capture_level()),
        }
    }

    #[must_use]
    pub fn is_enabled(&self, level: Level) -> bool {
        self.enabled_levels().contains(level)
    }

    /// Overrides the enabled levels for the calling thread only.
    ///
    /// Levels are not hierarchical: pass every level that should be enabled.
    pub fn set_enabled_levels(&self, levels: impl Into<LevelSet>) {
        self.enabled_levels.set(Some(levels.into()));
    }

    /// Overrides the enabled levels for every thread.
    ///
    /// Threads with their own override see the union of both sets.
    pub fn set_enabled_levels_for_all_threads(&self, levels: impl Into<LevelSet>) {
        *self.enabled_levels_all_threads.write() = Some(levels.into());
    }

    /// Events logged on this logger by the calling thread.
    #[must_use]
    pub fn logging_events(&self) -> Vec<CapturedEvent> {
        self.events.get()
    }

    /// Events logged on this logger by any thread, in append order.
    #[must_use]
    pub fn all_logging_events(&self) -> Vec<CapturedEvent> {
        self.all_events.lock().clone()
    }

    /// Forgets the calling thread's events and level override.
    pub fn clear(&self) {
        self.events.remove();
        self.enabled_levels.remove();
    }

    /// Forgets every event and every level override, for all threads.
    pub fn clear_all(&self) {
        self.all_events.lock().clear();
        self.events.clear_all();
        self.enabled_levels.clear_all();
        *self.enabled_levels_all_threads.write() = None;
    }

    pub fn log_at(&self, level: Level, message: &str, arguments: &[Value]) {
        self.record(level, message, EventParts {
            arguments: arguments.to_vec(),
            ..EventParts::default()
        });
    }

    /// Starts a fluent event at `level`.
    pub const fn at_level(&self, level: Level) -> EventBuilder<'_> {
        EventBuilder::new(self, level)
    }

    /// Appends a prebuilt event, bypassing level filtering.
    pub fn log(&self, event: CapturedEvent) {
        self.append(event);
    }

    level_methods!(
        Level::Trace,
        is_trace_enabled,
        is_trace_enabled_for,
        trace,
        trace_with_cause,
        trace_with_marker,
        trace_with_marker_and_cause,
        at_trace
    );

    level_methods!(
        Level::Debug,
        is_debug_enabled,
        is_debug_enabled_for,
        debug,
        debug_with_cause,
        debug_with_marker,
        debug_with_marker_and_cause,
        at_debug
    );

    level_methods!(
        Level::Info,
        is_info_enabled,
        is_info_enabled_for,
        info,
        info_with_cause,
        info_with_marker,
        info_with_marker_and_cause,
        at_info
    );

    level_methods!(
        Level::Warn,
        is_warn_enabled,
        is_warn_enabled_for,
        warn,
        warn_with_cause,
        warn_with_marker,
        warn_with_marker_and_cause,
        at_warn
    );

    level_methods!(
        Level::Error,
        is_error_enabled,
        is_error_enabled_for,
        error,
        error_with_cause,
        error_with_marker,
        error_with_marker_and_cause,
        at_error
    );

    /// Every public logging call ends up here.
    pub(crate) fn record(&self, level: Level, message: &str, parts: EventParts) {
        if self.is_enabled(level) {
            self.append(self.event(level, message.to_owned(), parts));
        }
    }

    pub(crate) fn event(
        &self,
        level: Level,
        message: String,
        mut parts: EventParts,
    ) -> CapturedEvent {
        parts.mdc = self.shared.context_map.snapshot();
        parts.creating_logger = Some(self.name.clone());
        CapturedEvent::assemble(level, message, parts)
    }

    pub(crate) fn append(&self, event: CapturedEvent) {
        let echo = self
            .shared
            .print_level()
            .is_some_and(|print_level| event.level() >= print_level);

        self.events.with_mut(|events| events.push(event.clone()));
        self.all_events.lock().push(event.clone());
        if echo {
            event.print();
        }
    }
}

impl fmt::Debug for CapturingLogger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CapturingLogger")
            .field("name", &self.name)
            .field("enabled_levels", &self.enabled_levels())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use std::{
        sync::{Barrier, mpsc},
        thread,
    };

    use pretty_assertions::assert_eq;

    use super::*;
    use crate::{LoggerRegistry, Settings};

    fn registry() -> LoggerRegistry {
        LoggerRegistry::new(Settings::default())
    }

    #[test]
    fn test_events_in_call_order() {
        let registry = registry();
        let logger = registry.logger("svc");

        logger.info("first", &[]);
        logger.warn("disk at {}%", &[91.into()]);
        logger.error("third {} {}", &["a".into(), "b".into()]);

        let expected = vec![
            CapturedEvent::info("first", []),
            CapturedEvent::warn("disk at {}%", [Value::from(91)]),
            CapturedEvent::error("third {} {}", [Value::from("a"), Value::from("b")]),
        ];
        assert_eq!(logger.logging_events(), expected);
        assert_eq!(logger.all_logging_events(), expected);
    }

    #[test]
    fn test_call_shapes_normalize_to_one_event() {
        let registry = registry();
        let logger = registry.logger("shapes");
        let marker = Marker::new("AUDIT");
        let error = std::io::Error::other("denied");

        logger.trace_with_cause("trace", &error);
        logger.debug_with_marker(&marker, "debug {}", &[1.into()]);
        logger.info_with_marker_and_cause(&marker, "info", &error);
        logger.warn("warn {}", &[Value::error(&error)]);

        let events = logger.logging_events();
        assert_eq!(events.len(), 4);
        assert_eq!(
            events[0],
            CapturedEvent::with_throwable(Level::Trace, "denied", "trace", [])
        );
        assert_eq!(
            events[1],
            CapturedEvent::debug("debug {}", [Value::from(1)]).with_marker(marker.clone())
        );
        assert_eq!(
            events[2],
            CapturedEvent::with_throwable(Level::Info, "denied", "info", []).with_marker(marker)
        );
        // The trailing error argument is extracted as the throwable.
        assert!(events[3].arguments().is_empty());
        assert_eq!(events[3].formatted_message(), "warn {}");
        assert_eq!(events[3].throwable(), Some(&Throwable::new("denied")));
    }

    #[test]
    fn test_thread_override_filters_levels() {
        let registry = registry();
        let logger = registry.logger("filtered");
        logger.set_enabled_levels(Level::Error);

        logger.warn("dropped", &[]);
        logger.error("kept", &[]);

        assert!(!logger.is_warn_enabled());
        assert!(logger.is_error_enabled_for(&Marker::new("ANY")));
        assert_eq!(logger.logging_events(), vec![CapturedEvent::error("kept", [])]);
    }

    #[test]
    fn test_all_threads_override_applies_everywhere() {
        let registry = registry();
        let logger = registry.logger("global.filter");
        logger.set_enabled_levels_for_all_threads(Level::Error);

        let worker = Arc::clone(&logger);
        thread::spawn(move || {
            worker.warn("dropped", &[]);
            worker.error("kept", &[]);
        })
        .join()
        .unwrap();

        assert_eq!(
            logger.all_logging_events(),
            vec![CapturedEvent::error("kept", [])]
        );
    }

    #[test]
    fn test_effective_levels_are_a_union() {
        let registry = registry();
        let logger = registry.logger("union");
        logger.set_enabled_levels_for_all_threads(Level::Error);
        logger.set_enabled_levels([Level::Debug]);

        assert_eq!(
            logger.enabled_levels(),
            LevelSet::from([Level::Debug, Level::Error])
        );
        assert!(!logger.is_info_enabled());
    }

    #[test]
    fn test_threads_see_only_their_events() {
        let registry = Arc::new(registry());
        let barrier = Arc::new(Barrier::new(2));

        let handles: Vec<_> = ["t1", "t2"]
            .into_iter()
            .map(|name| {
                let registry = Arc::clone(&registry);
                let barrier = Arc::clone(&barrier);
                thread::spawn(move || {
                    let logger = registry.logger("shared");
                    logger.info(name, &[]);
                    barrier.wait();
                    logger.logging_events()
                })
            })
            .collect();
        let seen: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();

        assert_eq!(seen[0], vec![CapturedEvent::info("t1", [])]);
        assert_eq!(seen[1], vec![CapturedEvent::info("t2", [])]);

        let logger = registry.logger("shared");
        assert!(logger.logging_events().is_empty());
        assert_eq!(logger.all_logging_events().len(), 2);
    }

    #[test]
    fn test_shared_buffer_follows_append_order_across_threads() {
        let registry = registry();
        let logger = registry.logger("handoff");
        let (to_worker, worker_turn) = mpsc::channel::<()>();
        let (to_main, main_turn) = mpsc::channel::<()>();

        let worker_logger = Arc::clone(&logger);
        let worker = thread::spawn(move || {
            for i in 0..3 {
                worker_turn.recv().unwrap();
                worker_logger.info("worker {}", &[i.into()]);
                to_main.send(()).unwrap();
            }
            worker_logger.logging_events()
        });

        for i in 0..3 {
            logger.info("main {}", &[i.into()]);
            to_worker.send(()).unwrap();
            main_turn.recv().unwrap();
        }
        let worker_events = worker.join().unwrap();

        let order: Vec<_> = logger
            .all_logging_events()
            .iter()
            .map(CapturedEvent::formatted_message)
            .collect();
        assert_eq!(
            order,
            ["main 0", "worker 0", "main 1", "worker 1", "main 2", "worker 2"]
        );
        assert_eq!(worker_events.len(), 3);
        assert_eq!(logger.logging_events().len(), 3);
    }

    #[test]
    fn test_echo_keeps_both_buffers() {
        let registry = registry();
        registry.set_print_level(Some(Level::Trace));
        let logger = registry.logger("echoed");

        logger.warn("echoed {}", &[1.into()]);

        let expected = vec![CapturedEvent::warn("echoed {}", [Value::from(1)])];
        assert_eq!(logger.logging_events(), expected);
        assert_eq!(logger.all_logging_events(), expected);
    }

    #[test]
    fn test_clear_only_touches_calling_thread() {
        let registry = registry();
        let logger = registry.logger("clear");
        logger.set_enabled_levels(Level::Error);
        logger.error("main", &[]);

        let worker = Arc::clone(&logger);
        thread::spawn(move || worker.info("worker", &[])).join().unwrap();

        logger.clear();
        assert!(logger.logging_events().is_empty());
        assert_eq!(logger.enabled_levels(), LevelSet::all());
        assert_eq!(logger.all_logging_events().len(), 2);
    }

    #[test]
    fn test_clear_all_resets_every_thread() {
        let registry = registry();
        let logger = registry.logger("clear.all");
        logger.set_enabled_levels_for_all_threads([Level::Info, Level::Error]);
        logger.info("main", &[]);

        let worker = Arc::clone(&logger);
        let worker_handle = thread::spawn(move || {
            worker.info("worker", &[]);
            worker
        });
        let worker = worker_handle.join().unwrap();

        logger.clear_all();
        assert!(logger.logging_events().is_empty());
        assert!(logger.all_logging_events().is_empty());
        assert_eq!(logger.enabled_levels(), LevelSet::all());

        thread::spawn(move || assert!(worker.logging_events().is_empty()))
            .join()
            .unwrap();
    }

    #[test]
    fn test_log_bypasses_filtering() {
        let registry = registry();
        let logger = registry.logger("inject");
        logger.set_enabled_levels(LevelSet::empty());

        logger.info("filtered", &[]);
        logger.log(CapturedEvent::debug("injected", []));

        assert_eq!(logger.logging_events(), vec![CapturedEvent::debug("injected", [])]);
        assert_eq!(logger.all_logging_events().len(), 1);
    }

    #[test]
    fn test_capture_level_is_the_default_filter() {
        let registry = LoggerRegistry::new(Settings {
            capture_level: Level::Info,
            ..Settings::default()
        });
        let logger = registry.logger("capture.level");

        logger.debug("dropped", &[]);
        logger.info("kept", &[]);
        assert_eq!(logger.logging_events(), vec![CapturedEvent::info("kept", [])]);

        logger.set_enabled_levels(Level::Debug);
        logger.debug("override", &[]);
        assert_eq!(logger.logging_events().len(), 2);
    }

    #[test]
    fn test_events_carry_metadata() {
        let registry = registry();
        registry.context_map().put("request", "r-1");
        let logger = registry.logger("metadata");

        logger.info("with context", &[]);
        registry.context_map().put("request", "r-2");

        let event = &logger.logging_events()[0];
        assert_eq!(event.mdc().get("request").map(String::as_str), Some("r-1"));
        assert_eq!(event.creating_logger(), Some("metadata"));
        assert_eq!(event.thread_id(), thread::current().id());
    }
}
