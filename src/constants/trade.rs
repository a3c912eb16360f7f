//! Default timing, fee, and budget constants.

use std::time::Duration;

pub const DEFAULT_SLIPPAGE_PERCENT: f64 = 0.5;
pub const DEFAULT_PROTOCOL_FEE_PERCENT: f64 = 1.0;
pub const MAX_SLIPPAGE_BPS: u64 = 500;
pub const DEFAULT_COMPUTE_UNITS: u32 = 200_000;
pub const DEFAULT_PRIORITY_FEE_MICRO_LAMPORTS: u64 = 5_000;
pub const LAMPORTS_PER_SOL: u64 = 1_000_000_000;

pub const DEFAULT_RPC_TIMEOUT: Duration = Duration::from_secs(10);
pub const CONFIRMATION_TIMEOUT: Duration = Duration::from_secs(45);
pub const BALANCE_FETCH_TIMEOUT: Duration = Duration::from_secs(5);
pub const PRICE_FETCH_TIMEOUT: Duration = Duration::from_secs(10);
pub const GLOBAL_ACCOUNT_FETCH_TIMEOUT: Duration = Duration::from_secs(10);
pub const METADATA_API_FETCH_TIMEOUT: Duration = Duration::from_secs(10);
pub const CURVE_STATE_TTL: Duration = Duration::from_millis(400);
pub const TOKEN_METADATA_TTL: Duration = Duration::from_secs(5 * 60);
pub const RPC_HEALTH_LOG_INTERVAL: Duration = Duration::from_secs(30);
pub const DEFAULT_MONITOR_INTERVAL: Duration = Duration::from_secs(5);

pub const MAX_RETRIES: u32 = 3;
pub const RETRY_DELAY: Duration = Duration::from_secs(1);

/// Token decimals assumed when the on-chain mint lookup fails.
pub const FALLBACK_TOKEN_DECIMALS: u8 = 6;

/// Shutdown grace period for the monitoring session.
pub const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);
