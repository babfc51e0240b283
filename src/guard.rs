//! Scope guards for diagnostic contexts and test cleanup.

use std::marker::PhantomData;

use crate::{ContextMap, LoggerRegistry, context_map::ForkedContext, event::Mdc};

/// A guard representing a forked diagnostic context installed on the current thread.
///
/// When the guard is dropped, the map that was installed before is restored.
/// This is returned by the [`ForkedContext::enter`] method.
///
/// # Examples
///
/// ```
/// use capturing_logger::{ContextMap, ContextMapConfig};
///
/// let mdc = ContextMap::new(ContextMapConfig {
///     inherit_across_fork: true,
///     ..ContextMapConfig::default()
/// });
/// mdc.put("user_id", "42");
/// let fork = mdc.fork();
///
/// mdc.put("user_id", "43");
/// {
///     // Enter the fork: the map as it was when forking is installed.
///     let _guard = fork.enter();
///     assert_eq!(mdc.get("user_id").as_deref(), Some("42"));
/// }
/// // When `_guard` goes out of scope, the previous map is back.
/// assert_eq!(mdc.get("user_id").as_deref(), Some("43"));
/// ```
#[non_exhaustive]
#[derive(Debug)]
pub struct ContextGuard<'a> {
    map: &'a ContextMap,
    previous: Option<Option<Mdc>>,
    // Make this guard unsendable.
    _marker: PhantomData<*mut ()>,
}

impl<'a> ContextGuard<'a> {
    pub(crate) fn enter(fork: ForkedContext<'a>) -> Self {
        let previous = fork.map.install(fork.values);
        Self {
            map: fork.map,
            previous: Some(previous),
            _marker: PhantomData,
        }
    }
}

impl Drop for ContextGuard<'_> {
    fn drop(&mut self) {
        if let Some(previous) = self.previous.take() {
            self.map.install(previous);
        }
    }
}

/// The point of a test at which captured state is cleaned up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CleanupStage {
    /// Clear the calling thread's state when the guard is created.
    #[default]
    BeforeTest,
    /// Clear the state of every thread when the guard is dropped.
    AfterTest,
}

/// Cleans a [`LoggerRegistry`] at the start or the end of a test.
///
/// Created by [`LoggerRegistry::cleanup_guard`]. With
/// [`CleanupStage::BeforeTest`] it calls [`LoggerRegistry::clear_loggers`] right away;
/// with [`CleanupStage::AfterTest`] it calls [`LoggerRegistry::clear_all`] on drop.
///
/// ```
/// use capturing_logger::{CleanupStage, LoggerRegistry, Settings};
///
/// let registry = LoggerRegistry::new(Settings::default());
/// {
///     let _cleanup = registry.cleanup_guard(CleanupStage::AfterTest);
///     registry.logger("test").info("captured", &[]);
///     assert_eq!(registry.all_logging_events().len(), 1);
/// }
/// assert!(registry.all_logging_events().is_empty());
/// ```
#[derive(Debug)]
#[must_use = "dropping the guard immediately runs an after-test cleanup"]
pub struct CleanupGuard<'a> {
    registry: &'a LoggerRegistry,
    stage: CleanupStage,
}

impl<'a> CleanupGuard<'a> {
    pub(crate) fn new(registry: &'a LoggerRegistry, stage: CleanupStage) -> Self {
        if stage == CleanupStage::BeforeTest {
            registry.clear_loggers();
        }
        Self { registry, stage }
    }
}

impl Drop for CleanupGuard<'_> {
    fn drop(&mut self) {
        if self.stage == CleanupStage::AfterTest {
            self.registry.clear_all();
        }
    }
}
