//! Level and pitch conversions.
//!
//! # Level Conversions
//!
//! - [`db_to_linear`] / [`linear_to_db`] - Convert between dB and linear gain
//!
//! # Interval Conversions
//!
//! - [`cents_to_ratio`] / [`ratio_to_cents`] - Convert between cents and frequency ratios

/// Convert decibels to linear gain.
///
/// # Example
/// ```rust
/// use tessitura_core::db_to_linear;
///
/// assert!((db_to_linear(0.0) - 1.0).abs() < 0.001);
/// assert!((db_to_linear(-6.02) - 0.5).abs() < 0.01);
/// ```
#[inline]
pub fn db_to_linear(db: f32) -> f32 {
    // 10^(dB/20) = e^(dB * ln(10)/20)
    const FACTOR: f32 = std::f32::consts::LN_10 / 20.0;
    (db * FACTOR).exp()
}

/// Convert linear gain to decibels.
///
/// Inputs at or below `1e-10` are clamped so silence maps to -200 dB instead
/// of negative infinity.
///
/// # Example
/// ```rust
/// use tessitura_core::linear_to_db;
///
/// assert!((linear_to_db(1.0) - 0.0).abs() < 0.001);
/// assert!((linear_to_db(0.5) - (-6.02)).abs() < 0.01);
/// ```
#[inline]
pub fn linear_to_db(linear: f32) -> f32 {
    const FACTOR: f32 = 20.0 / std::f32::consts::LN_10;
    linear.max(1e-10).ln() * FACTOR
}

/// Convert an interval in cents to a frequency ratio.
///
/// 1200 cents is one octave, so `cents_to_ratio(1200.0) == 2.0`.
#[inline]
pub fn cents_to_ratio(cents: f64) -> f64 {
    (cents / 1200.0).exp2()
}

/// Convert a frequency ratio to cents.
#[inline]
pub fn ratio_to_cents(ratio: f64) -> f64 {
    1200.0 * ratio.log2()
}
