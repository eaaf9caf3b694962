//! Worker parameters forwarded to the relay.

/// Immutable parameters read once when the worker is constructed.
///
/// The only recognised option controls whether the relay captures
/// process-level side effects (stray writes to stdout) while requests are
/// handled. The dispatch loop never inspects it; it is forwarded verbatim to
/// the transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorkerParams {
    intercept_side_effects: bool,
}

impl WorkerParams {
    /// Builds parameters with an explicit interception setting.
    #[must_use]
    pub const fn new(intercept_side_effects: bool) -> Self {
        Self {
            intercept_side_effects,
        }
    }

    /// Whether the relay should redirect process-level side effects.
    #[must_use]
    pub const fn intercept_side_effects(self) -> bool {
        self.intercept_side_effects
    }
}

impl Default for WorkerParams {
    fn default() -> Self {
        Self::new(crate::DEFAULT_INTERCEPT_SIDE_EFFECTS)
    }
}
