//! Tracing wrapper for store operations

use strata_core::StrataResult;
use tracing::{debug, debug_span};

/// Run `f` inside a `strata::kv` span tagged with `op` and `resource`
///
/// Failures are logged at debug level with their error code; the result is
/// returned unchanged.
pub(crate) fn traced<T>(
    op: &'static str,
    resource: &str,
    f: impl FnOnce() -> StrataResult<T>,
) -> StrataResult<T> {
    let span = debug_span!(target: "strata::kv", "kv", op, resource);
    let _enter = span.enter();

    let result = f();
    if let Err(e) = &result {
        debug!(target: "strata::kv", code = %e.code(), error = %e, "operation failed");
    }
    result
}
