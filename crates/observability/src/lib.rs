//! Process-wide tracing setup shared by binaries and tests.

pub mod tracing;

/// Install the JSON subscriber. Calls after the first are no-ops.
pub fn init() {
    tracing::init();
}
