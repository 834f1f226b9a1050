//! Python-like numeric operations used by the condition evaluator.
//!
//! Key behaviors:
//! - `floor_div_*`: rounds toward negative infinity (Python `//`).
//! - `mod_*`: remainder has the sign of the divisor (Python `%`).
//! - `pow_i64`: exact for non-negative exponents, `None` on overflow so the caller can report it.
//! - Zero division returns `None`; callers turn that into [`crate::ZERO_DIVISION_MSG`].
//!
//! ## Examples
//!
//! ```rust
//! use nbvalx_core::num::{floor_div_i64, mod_i64, mod_f64};
//!
//! assert_eq!(floor_div_i64(-7, 3), Some(-3));
//! assert_eq!(mod_i64(-7, 3), Some(2));
//! assert!((mod_f64(-7.0, 3.0).unwrap() - 2.0).abs() < 1e-10);
//! ```

/// Python-style floor division for integers.
pub fn floor_div_i64(a: i64, b: i64) -> Option<i64> {
    if b == 0 {
        return None;
    }
    let q = a.checked_div(b)?;
    let r = a % b;
    if r != 0 && ((r < 0) != (b < 0)) { Some(q - 1) } else { Some(q) }
}

/// Python-style modulo for integers.
pub fn mod_i64(a: i64, b: i64) -> Option<i64> {
    if b == 0 {
        return None;
    }
    let r = a.wrapping_rem(b);
    if (r > 0 && b < 0) || (r < 0 && b > 0) { Some(r + b) } else { Some(r) }
}

/// Python-style floor division for floats.
pub fn floor_div_f64(a: f64, b: f64) -> Option<f64> {
    if b == 0.0 {
        return None;
    }
    Some((a / b).floor())
}

/// Python-style modulo for floats.
pub fn mod_f64(a: f64, b: f64) -> Option<f64> {
    if b == 0.0 {
        return None;
    }
    let r = a % b;
    if (r > 0.0 && b < 0.0) || (r < 0.0 && b > 0.0) { Some(r + b) } else { Some(r) }
}

/// True division (`/`), which always yields a float.
pub fn true_div(a: f64, b: f64) -> Option<f64> {
    if b == 0.0 { None } else { Some(a / b) }
}

/// Integer power for a non-negative exponent.
///
/// Returns `None` when the exponent is negative or the result overflows `i64`.
pub fn pow_i64(base: i64, exp: i64) -> Option<i64> {
    let exp = u32::try_from(exp).ok()?;
    base.checked_pow(exp)
}
