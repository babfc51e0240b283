use capturing_logger::{CapturedEvent, Level, LoggerRegistry, Value, assert_that, context_map};

use crate::common::{init_capture_once, unique_name};

pub mod common;

#[test]
fn test_smoke() {
    init_capture_once();

    let target = unique_name("smoke");
    context_map().put("answer", "42");
    log::warn!(target: target.as_str(), "Smoke on the water, fire in the sky");
    context_map().remove("answer");

    let logger = LoggerRegistry::global().logger(&target);
    let expected = CapturedEvent::warn("Smoke on the water, fire in the sky", [])
        .with_mdc([("answer", "42")]);
    assert_that(&logger).has_logged_event(&expected);
}

#[test]
fn test_key_values_and_levels() {
    init_capture_once();

    let target = unique_name("smoke.kv");
    let logger = LoggerRegistry::global().logger(&target);
    logger.set_enabled_levels([Level::Info, Level::Error]);

    log::debug!(target: target.as_str(), "not captured");
    log::info!(target: target.as_str(), attempt = 3, ok = true; "retried {} times", 3);
    log::error!(target: target.as_str(), "gave up");

    let events = logger.logging_events();
    assert_eq!(events.len(), 2);
    assert_eq!(events[0].message(), "retried 3 times");
    let pairs: Vec<_> = events[0]
        .key_value_pairs()
        .iter()
        .map(|(key, value)| (key.as_str(), value.to_string()))
        .collect();
    assert_eq!(pairs, [("attempt", "3".to_owned()), ("ok", "true".to_owned())]);
    assert_eq!(events[0].key_value_pairs()[1].1, Value::from(true));
    assert_eq!(events[1], CapturedEvent::error("gave up", []));
}

#[test]
fn test_threads_are_isolated_through_the_facade() {
    init_capture_once();

    let target = unique_name("smoke.threads");
    let worker_target = target.clone();
    std::thread::spawn(move || log::info!(target: worker_target.as_str(), "from worker"))
        .join()
        .unwrap();
    log::info!(target: target.as_str(), "from test");

    assert_that(&LoggerRegistry::global().logger(&target))
        .has_logged(Level::Info, "from test", [])
        .has_not_logged(Level::Info, "from worker", [])
        .any_thread()
        .has_logged(Level::Info, "from worker", []);
}
