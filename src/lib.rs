//! # Overview
//!
#![doc = include_utils::include_md!("README.md:description")]
//!
//! Tests often need to check what code under test logged, not just what it returned.
//! This library makes that straightforward by:
//!
//! - Recording every enabled logging call in memory, per logger name.
//! - Keeping a separate record for each thread, so tests running in parallel do not see
//!   each other's events.
//! - Capturing a per-thread diagnostic context ([`ContextMap`]) with every event.
//! - Filtering levels per logger and per thread at run time.
//! - Offering fluent [`assertions`] over the captured events.
//!
//! Code that logs through the [`log`] façade is captured by installing [`CaptureLogger`];
//! code can also log directly through a [`CapturingLogger`] obtained from a
//! [`LoggerRegistry`].
//!
//! ## Basic example
//!
#![doc = include_utils::include_md!("README.md:basic_example")]
//!
//! ## Async Context Propagation
//!
#![doc = include_utils::include_md!("README.md:async_example")]

pub use self::{
    assertions::{LoggerAssert, MdcComparator, assert_that},
    builder::EventBuilder,
    context_map::{ContextMap, ContextMapConfig, ForkedContext},
    error::{Error, Result},
    event::{CapturedEvent, Mdc},
    facade::{CaptureLogger, context_map},
    format::format_message,
    future::FutureExt,
    guard::{CleanupGuard, CleanupStage, ContextGuard},
    level::{Level, LevelSet},
    logger::CapturingLogger,
    marker::Marker,
    registry::LoggerRegistry,
    scoped::ScopedCell,
    settings::{ENV_PREFIX, Settings},
    value::{Throwable, Value},
};

pub mod assertions;
mod builder;
mod context_map;
mod error;
mod event;
mod facade;
mod format;
pub mod future;
pub mod guard;
mod level;
mod logger;
mod marker;
mod registry;
mod scoped;
mod settings;
mod value;
