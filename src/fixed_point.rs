//! Barrett-style reduction of 128-bit products using a precomputed
//! 64-bit approximate reciprocal of the modulus.
//!
//! For a modulus `q` of bit length `N` we set `L = 63 + N`, so that
//! `L - N + 1 = 64`, and precompute `barr_lo = floor(2^L / q) mod 2^64`.
//! For a product `d = x * y` the quotient `floor(d / q)` is then estimated as
//! ```text
//! c1 = d >> (N - 1)               (fits in 63 bits)
//! c3 = (c1 * barr_lo) >> 64       (approximately)
//! ```
//! and `d - c3 * q` is computed in wrapping 64-bit arithmetic, since the
//! true value is known to be small.
//!
//! The estimate is low by less than `3.5`: dropping the low bits of `d`
//! costs less than one, truncating the reciprocal less than one half
//! (because `c1 < 2^63`), flooring the product less than one, and
//! [`mul_hi_approx`](crate::arith::mul_hi_approx) at most one more
//! (including its truncated fraction, less than two). The candidate thus
//! lies in `[0, 3.5 q)` and two masked subtractions finish the reduction.
//!
//! `c1 < 2^63` requires `d < 2^(N + 62)`. For operands bounded by
//! `f * q` this holds whenever `2 log2(f) + N < 63`; otherwise the operands
//! are reduced below `q` before multiplying.
//!
//! For a power of two `q = 2^k` the reciprocal `2^(63 + k + 1) / q` would
//! need 65 bits, so such moduli use `N = k` instead. All of the bounds
//! above still hold since `q >= 2^(N - 1)`.
//!
//! Every reachable bit length has its own monomorphized loop, so the
//! shift amounts are compile-time constants.

use crate::arith::div_wide_lo;
use crate::definition::{InputModFactor, VECTOR_WIDTH, bit_length};
use crate::dispatch;
use crate::error::{Kernel, Result};
use crate::simd::Simd;

/// Number of vectors processed per iteration of the unrolled loops.
const UNROLL: usize = 16;

/// Per-call constants of the reduction.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct Barrett {
    pub(crate) modulus: u64,
    pub(crate) bits: u32,
    pub(crate) barr_lo: u64,
}

impl Barrett {
    pub(crate) fn new(modulus: u64) -> Self {
        // Equal to the bit length of the modulus unless it is a power of
        // two, where this keeps the reciprocal below 2^64.
        let bits = bit_length(modulus - 1);
        // 2^L with L = 63 + bits, split into 64-bit halves.
        let barr_lo = div_wide_lo(1 << (bits - 1), 0, modulus);
        Self {
            modulus,
            bits,
            barr_lo,
        }
    }
}

/// Whether products of operands below `factor * modulus` can overflow
/// the shifted 64-bit quotient estimate, requiring explicit reduction
/// of the operands.
#[inline(always)]
#[must_use]
pub(crate) const fn requires_input_reduction(bits: u32, factor: InputModFactor) -> bool {
    2 * factor.log2() + bits >= 63
}

/// Broadcast form of [`Barrett`].
struct Lanes<S: Simd> {
    modulus: S::U64s,
    twice_modulus: S::U64s,
    barr_lo: S::U64s,
}

impl<S: Simd> Lanes<S> {
    #[inline(always)]
    fn new(simd: S, barrett: &Barrett) -> Self {
        Self {
            modulus: simd.splat(barrett.modulus),
            twice_modulus: simd.splat(2 * barrett.modulus),
            barr_lo: simd.splat(barrett.barr_lo),
        }
    }
}

#[inline(always)]
fn reduce<S: Simd, const BITS: u32, const FACTOR: u64>(
    simd: S,
    k: &Lanes<S>,
    x: S::U64s,
    y: S::U64s,
) -> S::U64s {
    let x = simd.small_mod::<FACTOR>(x, k.modulus, k.twice_modulus);
    let y = simd.small_mod::<FACTOR>(y, k.modulus, k.twice_modulus);

    let hi = simd.mul_hi(x, y);
    let lo = simd.mul_lo(x, y);

    let c1 = simd.shift_right_wide(lo, hi, BITS - 1);
    let c3 = simd.mul_hi_approx(c1, k.barr_lo);

    // In [0, 4q).
    let r = simd.sub(lo, simd.mul_lo(c3, k.modulus));
    simd.small_mod::<4>(r, k.modulus, k.twice_modulus)
}

#[inline(always)]
unsafe fn loop_default<S: Simd, const BITS: u32, const FACTOR: u64>(
    simd: S,
    k: &Lanes<S>,
    mut result: *mut u64,
    mut operand1: *const u64,
    mut operand2: *const u64,
    n: usize,
) {
    for _ in 0..n / VECTOR_WIDTH {
        let x = simd.load(operand1);
        let y = simd.load(operand2);
        simd.store(result, reduce::<S, BITS, FACTOR>(simd, k, x, y));

        operand1 = operand1.add(VECTOR_WIDTH);
        operand2 = operand2.add(VECTOR_WIDTH);
        result = result.add(VECTOR_WIDTH);
    }
}

/// Same computation as [`loop_default`] on exactly `COEFF_COUNT` elements,
/// interleaving the steps of [`UNROLL`] independent vectors.
#[inline(always)]
unsafe fn loop_unrolled<S: Simd, const BITS: u32, const FACTOR: u64, const COEFF_COUNT: usize>(
    simd: S,
    k: &Lanes<S>,
    mut result: *mut u64,
    mut operand1: *const u64,
    mut operand2: *const u64,
) {
    const { assert!(COEFF_COUNT > 0 && COEFF_COUNT % (UNROLL * VECTOR_WIDTH) == 0) };

    for _ in 0..COEFF_COUNT / (UNROLL * VECTOR_WIDTH) {
        let x: [S::U64s; UNROLL] =
            core::array::from_fn(|j| simd.load(operand1.add(j * VECTOR_WIDTH)));
        let y: [S::U64s; UNROLL] =
            core::array::from_fn(|j| simd.load(operand2.add(j * VECTOR_WIDTH)));

        let x = x.map(|x| simd.small_mod::<FACTOR>(x, k.modulus, k.twice_modulus));
        let y = y.map(|y| simd.small_mod::<FACTOR>(y, k.modulus, k.twice_modulus));

        let hi: [S::U64s; UNROLL] = core::array::from_fn(|j| simd.mul_hi(x[j], y[j]));
        let lo: [S::U64s; UNROLL] = core::array::from_fn(|j| simd.mul_lo(x[j], y[j]));

        let c1: [S::U64s; UNROLL] =
            core::array::from_fn(|j| simd.shift_right_wide(lo[j], hi[j], BITS - 1));
        let c3 = c1.map(|c1| simd.mul_hi_approx(c1, k.barr_lo));

        let r: [S::U64s; UNROLL] =
            core::array::from_fn(|j| simd.sub(lo[j], simd.mul_lo(c3[j], k.modulus)));

        for (j, r) in r.into_iter().enumerate() {
            let r = simd.small_mod::<4>(r, k.modulus, k.twice_modulus);
            simd.store(result.add(j * VECTOR_WIDTH), r);
        }

        operand1 = operand1.add(UNROLL * VECTOR_WIDTH);
        operand2 = operand2.add(UNROLL * VECTOR_WIDTH);
        result = result.add(UNROLL * VECTOR_WIDTH);
    }
}

/// A fixed-point loop specialized for one bit length and operand bound.
///
/// # Safety
/// `n` must be a multiple of [`VECTOR_WIDTH`], all pointers must be valid
/// for `n` elements, and `result` may only alias an operand exactly.
/// The operands must be below `FACTOR * modulus`.
pub(crate) type Loop<S> = unsafe fn(S, &Barrett, *mut u64, *const u64, *const u64, usize);

unsafe fn run<S: Simd, const BITS: u32, const FACTOR: u64>(
    simd: S,
    barrett: &Barrett,
    result: *mut u64,
    operand1: *const u64,
    operand2: *const u64,
    n: usize,
) {
    debug_assert_eq!(barrett.bits, BITS);
    debug_assert_eq!(n % VECTOR_WIDTH, 0);

    simd.vectorize(move || {
        let k = Lanes::new(simd, barrett);
        match n {
            1024 => loop_unrolled::<S, BITS, FACTOR, 1024>(simd, &k, result, operand1, operand2),
            2048 => loop_unrolled::<S, BITS, FACTOR, 2048>(simd, &k, result, operand1, operand2),
            4096 => loop_unrolled::<S, BITS, FACTOR, 4096>(simd, &k, result, operand1, operand2),
            8192 => loop_unrolled::<S, BITS, FACTOR, 8192>(simd, &k, result, operand1, operand2),
            16384 => loop_unrolled::<S, BITS, FACTOR, 16384>(simd, &k, result, operand1, operand2),
            32768 => loop_unrolled::<S, BITS, FACTOR, 32768>(simd, &k, result, operand1, operand2),
            _ => loop_default::<S, BITS, FACTOR>(simd, &k, result, operand1, operand2, n),
        }
    })
}

/// Looks up the loop for a modulus of `bits` bits whose operands are
/// bounded by `factor * modulus` inside the kernel.
///
/// A fixed-point modulus satisfies `4 q >= 2^50 - 1` and `q < 2^62`,
/// so `bits` lies in `48..=62`, with 48 only reached by `q = 2^48`.
/// Operand reduction is only folded in where [`requires_input_reduction`]
/// demands it, which is `59..=62` for a factor of four and `61..=62` for a
/// factor of two.
pub(crate) fn select<S: Simd>(bits: u32, factor: InputModFactor) -> Loop<S> {
    macro_rules! table {
        ($factor:literal: $($bits:literal)*) => {
            match bits {
                $($bits => run::<S, $bits, $factor> as Loop<S>,)*
                _ => unreachable!(
                    "no {}-bit fixed-point loop for input mod factor {}",
                    bits, $factor
                ),
            }
        };
    }

    match factor {
        InputModFactor::One => table!(1: 48 49 50 51 52 53 54 55 56 57 58 59 60 61 62),
        InputModFactor::Two => table!(2: 61 62),
        InputModFactor::Four => table!(4: 59 60 61 62),
    }
}

/// Computes `result[i] = operand1[i] * operand2[i] mod modulus` with the
/// fixed-point kernel regardless of what [`crate::multiply_mod`] would
/// choose.
///
/// Besides the preconditions of [`crate::multiply_mod`],
/// `input_mod_factor * modulus` must be at least
/// [`FLOAT_MODULUS_BOUND`](crate::FLOAT_MODULUS_BOUND).
///
/// ```
/// use mulmod_vec::{fixed_point, InputModFactor};
///
/// let modulus = 1152921504606830593;
/// let mut result = [0; 2];
/// let (x, y) = ([modulus - 1, 2], [modulus - 1, 3]);
/// fixed_point::multiply_mod(&mut result, &x, &y, modulus, InputModFactor::One).unwrap();
/// assert_eq!(result, [1, 6]);
/// ```
pub fn multiply_mod(
    result: &mut [u64],
    operand1: &[u64],
    operand2: &[u64],
    modulus: u64,
    input_mod_factor: InputModFactor,
) -> Result<()> {
    dispatch::multiply_mod(
        result,
        operand1,
        operand2,
        modulus,
        input_mod_factor,
        Some(Kernel::FixedPoint),
    )
}

/// In-place form of [`multiply_mod`]: `lhs[i] = lhs[i] * rhs[i] mod modulus`.
pub fn multiply_mod_assign(
    lhs: &mut [u64],
    rhs: &[u64],
    modulus: u64,
    input_mod_factor: InputModFactor,
) -> Result<()> {
    dispatch::multiply_mod_assign(lhs, rhs, modulus, input_mod_factor, Some(Kernel::FixedPoint))
}
