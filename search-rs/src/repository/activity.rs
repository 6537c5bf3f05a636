//! Search activity auditing

use tracing::info;

/// Fire-and-forget audit sink for search invocations
#[cfg_attr(test, mockall::automock)]
pub trait ActivityLog: Send + Sync {
    fn record(&self, user: &str, action: &str, params: &str);
}

/// Writes activity as structured events on the `activity` target
#[derive(Debug, Default, Clone)]
pub struct TracingActivityLog;

impl ActivityLog for TracingActivityLog {
    fn record(&self, user: &str, action: &str, params: &str) {
        info!(target: "activity", user = user, action = action, params = params, "search activity");
    }
}
