//! Scalar arithmetic leaves shared by the kernels: the small-modulus
//! reducer and the pieces of a 64x64 -> 128-bit product.
//!
//! Every function here has a lane-parallel counterpart in the
//! [`Simd`](crate::simd::Simd) backends, and the portable backend
//! is built directly on top of these.

const LO_MASK: u64 = 0xffff_ffff;

/// Reduces `x < FACTOR * modulus` into `[0, modulus)` using `log2(FACTOR)`
/// conditional subtractions.
///
/// The subtraction is expressed as an unsigned minimum: if `x < m`,
/// `x - m` wraps around to a value larger than `x` and the minimum keeps `x`.
/// This compiles to a select rather than a branch.
#[inline(always)]
pub(crate) fn small_mod<const FACTOR: u64>(x: u64, modulus: u64, twice_modulus: u64) -> u64 {
    match FACTOR {
        1 => x,
        2 => x.min(x.wrapping_sub(modulus)),
        4 => {
            let x = x.min(x.wrapping_sub(twice_modulus));
            x.min(x.wrapping_sub(modulus))
        }
        _ => unreachable!("input mod factor is 1, 2 or 4"),
    }
}

/// Low 64 bits of `x * y`.
#[inline(always)]
pub(crate) const fn mul_lo(x: u64, y: u64) -> u64 {
    x.wrapping_mul(y)
}

/// High 64 bits of `x * y`.
#[inline(always)]
pub(crate) const fn mul_hi(x: u64, y: u64) -> u64 {
    ((x as u128 * y as u128) >> 64) as u64
}

/// High 64 bits of `x * y`, computed from 32-bit partial products while
/// skipping `lo(x) * lo(y)`.
///
/// The carry out of the two cross products is kept, so the result is
/// never larger than [`mul_hi`] and at most one smaller.
#[inline(always)]
pub(crate) const fn mul_hi_approx(x: u64, y: u64) -> u64 {
    let (x_lo, x_hi) = (x & LO_MASK, x >> 32);
    let (y_lo, y_hi) = (y & LO_MASK, y >> 32);

    let lo_hi = x_lo * y_hi;
    let hi_lo = x_hi * y_lo;
    let hi_hi = x_hi * y_hi;

    let cross = (lo_hi & LO_MASK) + (hi_lo & LO_MASK);
    hi_hi + (lo_hi >> 32) + (hi_lo >> 32) + (cross >> 32)
}

/// Low 64 bits of the 128-bit value `hi:lo` shifted right by `shift`,
/// where `0 < shift < 64`.
#[inline(always)]
pub(crate) const fn shift_right_wide(lo: u64, hi: u64, shift: u32) -> u64 {
    (lo >> shift) | (hi << (64 - shift))
}

/// Low 64 bits of `floor((hi * 2^64 + lo) / divisor)`.
#[inline(always)]
pub(crate) const fn div_wide_lo(hi: u64, lo: u64, divisor: u64) -> u64 {
    ((((hi as u128) << 64) | lo as u128) / divisor as u128) as u64
}
