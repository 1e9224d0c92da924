// Worker constants (ADR: No magic values)
use std::time::Duration;

/// Sleep duration when the queue has nothing visible (100ms)
pub const IDLE_SLEEP_DURATION: Duration = Duration::from_millis(100);

/// Sleep duration after a failed receive before polling again (1s)
pub const ERROR_RECOVERY_SLEEP_DURATION: Duration = Duration::from_secs(1);

/// Visibility extension applied after a failed delivery (5 minutes)
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_secs(5 * 60);

/// Default number of workers in a pool
pub const DEFAULT_WORKER_COUNT: usize = 4;

/// Default visibility window for queue adapters (60 seconds)
///
/// Must outlast a whole delivery attempt, including the sender's timeout.
pub const DEFAULT_VISIBILITY_TIMEOUT: Duration = Duration::from_secs(60);
