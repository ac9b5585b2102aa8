//! Conditional tracing macros (zero-cost when the feature is disabled).

/// Create an info-level span for a major pipeline stage.
///
/// Expands to `tracing::info_span!` with the `tracing` feature, and to a
/// no-op guard otherwise.
#[cfg(feature = "tracing")]
macro_rules! trace_span {
    ($name:expr $(, $($field:tt)*)?) => {
        tracing::info_span!($name $(, $($field)*)?)
    };
}

#[cfg(not(feature = "tracing"))]
macro_rules! trace_span {
    ($name:expr $(, $($field:tt)*)?) => {
        $crate::trace::NoopSpan
    };
}

/// Emit an info-level event for key measurements.
#[cfg(feature = "tracing")]
macro_rules! trace_event {
    ($name:expr, $($key:ident = $value:expr),+ $(,)?) => {
        tracing::info!(name: $name, $($key = $value),+)
    };
}

#[cfg(not(feature = "tracing"))]
macro_rules! trace_event {
    ($name:expr, $($key:ident = $value:expr),+ $(,)?) => {
        // Evaluate the expressions to keep them warning-free, discard results.
        let _ = ($($value,)+);
    };
}

/// No-op span guard standing in for `tracing::Span` when disabled.
#[cfg(not(feature = "tracing"))]
pub(crate) struct NoopSpan;

#[cfg(not(feature = "tracing"))]
impl NoopSpan {
    /// Returns self, mimicking `Span::entered()`.
    #[inline]
    pub(crate) fn entered(self) -> Self {
        self
    }
}
