//! Tracking number generation.

use chrono::Utc;
use rand::Rng;

/// Prefix for all tracking numbers.
pub const TRACKING_PREFIX: &str = "DEL";

/// Upper bound on unique-allocation attempts before giving up.
pub const MAX_ALLOCATION_ATTEMPTS: u32 = 10;

/// Generates a candidate tracking number: `DEL-YYYYMMDD-XXXX`.
///
/// The 4-digit suffix is random, so candidates can collide; callers
/// must check uniqueness against the store and regenerate on collision.
pub fn generate_tracking_number() -> String {
    let date = Utc::now().format("%Y%m%d");
    let random: u32 = rand::rng().random_range(0..10_000);
    format!("{TRACKING_PREFIX}-{date}-{random:04}")
}
