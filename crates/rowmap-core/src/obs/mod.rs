//! Observability: session-scoped metrics events and sink abstractions.
//!
//! The engine emits events; it never installs a logger or a sink of its
//! own. Binaries and tests decide where events go.

mod sink;

pub use sink::{MetricsEvent, MetricsSink, NoopSink};
