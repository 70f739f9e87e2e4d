use ulid::Ulid;

///
/// MetricsSink
///
/// Receiver for engine telemetry. Sessions hold one sink and record an
/// event per executed flush or query; the default sink drops everything.
///

pub trait MetricsSink {
    fn record(&self, event: &MetricsEvent);
}

///
/// MetricsEvent
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum MetricsEvent {
    /// A flush completed; counts cover executed operations only.
    Flush {
        flush_id: Ulid,
        inserts: usize,
        updates: usize,
        deletes: usize,
        elapsed_micros: u128,
    },

    /// A select executed (query or key lookup).
    Query {
        type_name: String,
        rows: usize,
        elapsed_micros: u128,
    },
}

///
/// NoopSink
///

#[derive(Clone, Copy, Debug, Default)]
pub struct NoopSink;

impl MetricsSink for NoopSink {
    fn record(&self, _event: &MetricsEvent) {}
}
