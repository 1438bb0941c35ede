//! Postal code extraction and distance scoring
//!
//! Distances are plain numeric differences between 5-digit postal codes. They
//! are a coarse proximity proxy, not geographic distances.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// Distance assigned to items whose address carries no usable postal code
pub const SENTINEL_DISTANCE: f64 = 100_000.0;

static DIGIT_RUN: Lazy<Regex> = Lazy::new(|| Regex::new(r"[0-9]+").expect("valid regex"));

/// Parse a caller supplied postal code. Only exactly five ASCII digits
/// (surrounding whitespace ignored) are accepted.
pub fn parse_postal_code(raw: &str) -> Option<u32> {
    let trimmed = raw.trim();
    if trimmed.len() == 5 && trimmed.bytes().all(|b| b.is_ascii_digit()) {
        trimmed.parse().ok()
    } else {
        None
    }
}

/// Extract the first run of exactly five consecutive digits from an address.
///
/// Longer digit runs (phone numbers, 9-digit zips written without a dash) are
/// skipped rather than truncated.
pub fn extract_postal_code(address: &str) -> Option<u32> {
    DIGIT_RUN
        .find_iter(address)
        .find(|m| m.as_str().len() == 5)
        .and_then(|m| m.as_str().parse().ok())
}

/// Distance between the query postal code and an item's address, or the
/// sentinel when the address has no postal code.
pub fn postal_distance(origin: u32, address: Option<&str>) -> f64 {
    match address.and_then(extract_postal_code) {
        Some(code) => (i64::from(code) - i64::from(origin)).unsigned_abs() as f64,
        None => SENTINEL_DISTANCE,
    }
}

/// Whether a distance value is a real measurement rather than the sentinel
pub fn is_real_distance(distance: f64) -> bool {
    distance.is_finite() && distance >= 0.0 && distance < SENTINEL_DISTANCE
}

/// Decreasing curve turning a postal distance into a multiplicative factor.
///
/// `factor = max(floor, 1 - distance / scale)^2`, so the result lies in
/// `[floor^2, 1]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DistanceDecay {
    /// Postal code of the query
    pub origin: u32,
    /// Distance at which the linear part reaches zero
    pub scale: f64,
    /// Lower bound of the linear part
    pub floor: f64,
}

impl DistanceDecay {
    pub fn new(origin: u32, scale: f64, floor: f64) -> Self {
        Self {
            origin,
            scale,
            floor,
        }
    }

    /// Multiplicative factor for an already computed distance
    pub fn factor(&self, distance: f64) -> f64 {
        let linear = (1.0 - distance / self.scale).max(self.floor).max(0.0);
        linear * linear
    }

    /// Distance of an item address from the origin
    pub fn distance_to(&self, address: Option<&str>) -> f64 {
        postal_distance(self.origin, address)
    }
}
