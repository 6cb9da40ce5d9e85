//! Protocol constants shared by broker, workers and clients

use std::time::Duration;

/// Header tag carried by client frames
pub const MDPC_CLIENT: &[u8] = b"MDPC01";

/// Header tag carried by worker frames
pub const MDPW_WORKER: &[u8] = b"MDPW01";

/// Service-name prefix reserved for broker-internal management services
pub const MMI_PREFIX: &str = "mmi.";

/// Internal service reporting whether a named service has workers
pub const MMI_SERVICE: &str = "mmi.service";

/// `mmi.service`: service exists and has at least one worker
pub const MMI_STATUS_OK: &str = "200";

/// `mmi.service`: no worker bound to the service
pub const MMI_STATUS_NOT_FOUND: &str = "404";

/// Any other `mmi.*` name
pub const MMI_STATUS_NOT_IMPLEMENTED: &str = "501";

/// Length of a transport-generated peer identity
pub const IDENTITY_LEN: usize = 17;

/// Default heartbeat interval
pub const DEFAULT_HEARTBEAT_INTERVAL: Duration = Duration::from_millis(2500);

/// Missed heartbeats before the broker purges a worker
pub const DEFAULT_BROKER_LIVENESS: u32 = 3;

/// Missed heartbeats before a worker reconnects
pub const DEFAULT_WORKER_LIVENESS: u32 = 5;

/// Default per-call receive timeout for clients and workers
pub const DEFAULT_RECV_TIMEOUT: Duration = Duration::from_millis(2500);

/// Default delay before a worker reconnects
pub const DEFAULT_RECONNECT_DELAY: Duration = Duration::from_millis(2500);

/// Largest frame accepted by the codec (16MB)
pub const DEFAULT_MAX_FRAME_SIZE: usize = 16 * 1024 * 1024;

/// Returns true if `name` is in the reserved internal namespace
pub fn is_internal(name: &[u8]) -> bool {
    name.starts_with(MMI_PREFIX.as_bytes())
}
