pub const POSITION_ID_DOMAIN: &[u8] = b"farm-vault/position";

pub const BPS_DENOMINATOR: u64 = 10_000;

/// Fixed-point scale used when reporting price per share.
pub const PRICE_PRECISION: u64 = 1_000_000_000;

pub const DEFAULT_LOCK_DURATION_SECS: u64 = 7 * 86_400;
pub const DEFAULT_HARVEST_LOCK_DURATION_SECS: u64 = 86_400;
pub const DEFAULT_CONVERSION_DEADLINE_SECS: u64 = 600;

pub const MIN_DEPOSIT_AMOUNT: u64 = 1;
pub const MIN_STAKE_AMOUNT: u64 = 1;
