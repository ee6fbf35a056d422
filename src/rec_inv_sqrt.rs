//! Fixed-point reciprocal square root, and the control law built on it.
//!
//! The drop rate grows with the square root of the drop count, which would
//! naively require a division and a square root per drop. Instead, an
//! estimate of `1/sqrt(count)` is refined by one Newton-Raphson step every
//! time `count` is incremented, and the next drop time is obtained with a
//! multiply and a shift.
//!
//! Shift amounts:
//! - The estimate is stored in 16 bits.
//! - Shifting the stored value left by [REC_INV_SQRT_SHIFT] yields a Q0.32
//!   fraction, which is the working precision of both operations.

use crate::time::Timestamp;

const REC_INV_SQRT_BITS: u32 = u16::BITS;

/// Shift from the stored 16 bit estimate to a Q0.32 fraction.
pub const REC_INV_SQRT_SHIFT: u32 = 32 - REC_INV_SQRT_BITS;

/// An approximation of `1/sqrt(count)`, as the high 16 bits of a Q0.32
/// fraction.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub struct RecInvSqrt(u16);

impl Default for RecInvSqrt {
    fn default() -> Self {
        Self::MAX
    }
}

impl RecInvSqrt {
    /// The largest representable estimate, just below 1.0.
    pub const MAX: RecInvSqrt = RecInvSqrt(u16::MAX);

    /// Builds an estimate from its stored 16 bit form.
    pub const fn from_raw(raw: u16) -> Self {
        Self(raw)
    }

    /// The stored 16 bit form of the estimate.
    pub const fn as_raw(self) -> u16 {
        self.0
    }

    /// The estimate widened to a Q0.32 fraction.
    pub const fn as_q32(self) -> u32 {
        (self.0 as u32) << REC_INV_SQRT_SHIFT
    }

    /// The estimate as a float, for diagnostics only.
    pub fn as_f64(self) -> f64 {
        f64::from(self.as_q32()) / (1u64 << 32) as f64
    }

    /// Runs one Newton-Raphson refinement of the estimate for `count`.
    ///
    /// The fixed point of `x -> x * (3 - count * x^2) / 2` is
    /// `1/sqrt(count)`. Must run exactly once per increment of `count`.
    #[must_use]
    pub fn newton_step(self, count: u32) -> RecInvSqrt {
        let invsqrt = u64::from(self.as_q32());
        let invsqrt2 = (invsqrt * invsqrt) >> 32;
        let mut val = (3u64 << 32).wrapping_sub(u64::from(count) * invsqrt2);

        // Avoid overflow in the following multiply.
        val >>= 2;
        let val = (u128::from(val) * u128::from(invsqrt)) >> (32 - 2 + 1);

        // The stored estimate must stay in (0, 2^16).
        let raw = (val >> REC_INV_SQRT_SHIFT) as u16;
        RecInvSqrt(raw.max(1))
    }
}

/// Returns the time of the next drop: `t + interval / sqrt(count)`.
pub fn control_law(t: Timestamp, interval: u64, rec_inv_sqrt: RecInvSqrt) -> Timestamp {
    let scaled = (u128::from(interval) * u128::from(rec_inv_sqrt.as_q32())) >> 32;
    t.saturating_add(scaled as u64)
}
