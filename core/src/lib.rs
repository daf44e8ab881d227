//! Translates batches of raw OT operations into typed domain events.
//!
//! A batch flows through [`classifier`], [`builder`] and [`merge`] in arrival order, then
//! through [`aggregate`] (concurrently, per event kind) and out via a [`publisher::Publisher`].

pub mod aggregate;
pub mod builder;
pub mod bus;
pub mod classifier;
pub mod config;
pub mod context;
pub mod error;
pub mod interpreter;
pub mod merge;
pub mod publisher;
pub mod task;
pub mod translator;

pub use aggregate::{BulkAggregator, BulkMerge, GroupAggregator};
pub use bus::{EventBus, ListenerGuard};
pub use config::TranslatorConfig;
pub use context::{BatchContext, ContextProvider};
pub use interpreter::{InterpreterRegistry, OpInterpreter};
pub use publisher::Publisher;
pub use translator::{TranslateReport, Translator};

pub use opscribe_proto as proto;
