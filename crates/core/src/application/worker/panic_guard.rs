// Panic isolation for worker safety (ADR-002)
use tokio::task::JoinError;

/// Describe why a spawned delivery did not return normally
///
/// A panicking sender must not take the worker down with it, so the
/// delivery call runs in its own task and the join error is turned into a
/// plain message here.
pub fn describe_join_error(err: JoinError) -> String {
    if !err.is_panic() {
        return format!("delivery task cancelled: {}", err);
    }

    let panic_info = err.into_panic();
    if let Some(s) = panic_info.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = panic_info.downcast_ref::<String>() {
        s.clone()
    } else {
        "Unknown panic".to_string()
    }
}
