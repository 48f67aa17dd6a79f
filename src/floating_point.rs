//! Reduction through a double-precision reciprocal, for moduli below
//! [`FLOAT_MODULUS_BOUND`].
//!
//! With `x, y < 2^50` the product is split exactly into `h = x * y`
//! rounded and the residual `l = x * y - h` using one fused operation.
//! The quotient estimate `c = floor(h * ubar)` with `ubar = (1 + eps) / q`
//! never exceeds the true quotient by more than one, so
//! `g = (h - c * q) + l` lies in `(-q, q)` and a single conditional
//! addition of `q` finishes the reduction.
//!
//! The bound on `g` requires the true quotient to stay below `2^51`.
//! Operands bounded by `f * q` are therefore only used unreduced when
//! `f^2 * q < 2^51`.
//!
//! [`FLOAT_MODULUS_BOUND`]: crate::FLOAT_MODULUS_BOUND

use crate::definition::{InputModFactor, VECTOR_WIDTH};
use crate::dispatch;
use crate::error::{Kernel, Result};
use crate::simd::Simd;

/// Number of vectors processed per iteration of the unrolled loops.
const UNROLL: usize = 4;

/// Per-call constants of the reduction.
#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) struct Reciprocal {
    pub(crate) modulus: u64,
    pub(crate) p: f64,
    pub(crate) ubar: f64,
}

impl Reciprocal {
    pub(crate) fn new(modulus: u64) -> Self {
        let p = modulus as f64;
        Self {
            modulus,
            p,
            ubar: (1.0 + f64::EPSILON) / p,
        }
    }
}

/// Whether operands below `factor * modulus` must be reduced before
/// the product is formed.
#[inline(always)]
#[must_use]
pub(crate) const fn requires_input_reduction(modulus: u64, factor: InputModFactor) -> bool {
    factor.get() * factor.get() * modulus >= 1 << 51
}

/// Broadcast form of [`Reciprocal`].
struct Lanes<S: Simd> {
    modulus: S::U64s,
    twice_modulus: S::U64s,
    p: S::F64s,
    ubar: S::F64s,
}

impl<S: Simd> Lanes<S> {
    #[inline(always)]
    fn new(simd: S, reciprocal: &Reciprocal) -> Self {
        Self {
            modulus: simd.splat(reciprocal.modulus),
            twice_modulus: simd.splat(2 * reciprocal.modulus),
            p: simd.splat_f64(reciprocal.p),
            ubar: simd.splat_f64(reciprocal.ubar),
        }
    }
}

#[inline(always)]
fn reduce<S: Simd, const FACTOR: u64>(simd: S, k: &Lanes<S>, x: S::U64s, y: S::U64s) -> S::U64s {
    let x = simd.small_mod::<FACTOR>(x, k.modulus, k.twice_modulus);
    let y = simd.small_mod::<FACTOR>(y, k.modulus, k.twice_modulus);

    let x = simd.to_f64(x);
    let y = simd.to_f64(y);

    let h = simd.mul_f64(x, y);
    let l = simd.mul_sub_f64(x, y, h);

    let c = simd.floor_f64(simd.mul_f64(h, k.ubar));
    let d = simd.neg_mul_add_f64(c, k.p, h);

    // In (-q, q).
    let g = simd.add_f64(d, l);
    simd.to_u64(simd.add_if_negative_f64(g, k.p))
}

#[inline(always)]
unsafe fn loop_default<S: Simd, const FACTOR: u64>(
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
        simd.store(result, reduce::<S, FACTOR>(simd, k, x, y));

        operand1 = operand1.add(VECTOR_WIDTH);
        operand2 = operand2.add(VECTOR_WIDTH);
        result = result.add(VECTOR_WIDTH);
    }
}

#[inline(always)]
unsafe fn loop_unrolled<S: Simd, const FACTOR: u64, const COEFF_COUNT: usize>(
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

        let x = x.map(|x| simd.to_f64(simd.small_mod::<FACTOR>(x, k.modulus, k.twice_modulus)));
        let y = y.map(|y| simd.to_f64(simd.small_mod::<FACTOR>(y, k.modulus, k.twice_modulus)));

        let h: [S::F64s; UNROLL] = core::array::from_fn(|j| simd.mul_f64(x[j], y[j]));
        let l: [S::F64s; UNROLL] = core::array::from_fn(|j| simd.mul_sub_f64(x[j], y[j], h[j]));

        let c = h.map(|h| simd.floor_f64(simd.mul_f64(h, k.ubar)));
        let g: [S::F64s; UNROLL] =
            core::array::from_fn(|j| simd.add_f64(simd.neg_mul_add_f64(c[j], k.p, h[j]), l[j]));

        for (j, g) in g.into_iter().enumerate() {
            let r = simd.to_u64(simd.add_if_negative_f64(g, k.p));
            simd.store(result.add(j * VECTOR_WIDTH), r);
        }

        operand1 = operand1.add(UNROLL * VECTOR_WIDTH);
        operand2 = operand2.add(UNROLL * VECTOR_WIDTH);
        result = result.add(UNROLL * VECTOR_WIDTH);
    }
}

/// A floating-point loop specialized for one operand bound.
///
/// # Safety
/// Same as [`fixed_point::Loop`](crate::fixed_point::Loop).
pub(crate) type Loop<S> = unsafe fn(S, &Reciprocal, *mut u64, *const u64, *const u64, usize);

unsafe fn run<S: Simd, const FACTOR: u64>(
    simd: S,
    reciprocal: &Reciprocal,
    result: *mut u64,
    operand1: *const u64,
    operand2: *const u64,
    n: usize,
) {
    debug_assert_eq!(n % VECTOR_WIDTH, 0);

    simd.vectorize(move || {
        let k = Lanes::new(simd, reciprocal);
        match n {
            1024 => loop_unrolled::<S, FACTOR, 1024>(simd, &k, result, operand1, operand2),
            2048 => loop_unrolled::<S, FACTOR, 2048>(simd, &k, result, operand1, operand2),
            4096 => loop_unrolled::<S, FACTOR, 4096>(simd, &k, result, operand1, operand2),
            8192 => loop_unrolled::<S, FACTOR, 8192>(simd, &k, result, operand1, operand2),
            16384 => loop_unrolled::<S, FACTOR, 16384>(simd, &k, result, operand1, operand2),
            32768 => loop_unrolled::<S, FACTOR, 32768>(simd, &k, result, operand1, operand2),
            _ => loop_default::<S, FACTOR>(simd, &k, result, operand1, operand2, n),
        }
    })
}

/// Looks up the loop reducing operands bounded by `factor * modulus`
/// inside the kernel.
pub(crate) fn select<S: Simd>(factor: InputModFactor) -> Loop<S> {
    match factor {
        InputModFactor::One => run::<S, 1> as Loop<S>,
        InputModFactor::Two => run::<S, 2> as Loop<S>,
        InputModFactor::Four => run::<S, 4> as Loop<S>,
    }
}

/// Computes `result[i] = operand1[i] * operand2[i] mod modulus` with the
/// floating-point kernel regardless of what [`crate::multiply_mod`]
/// would choose.
///
/// Besides the preconditions of [`crate::multiply_mod`], the modulus must be
/// below [`FLOAT_MODULUS_BOUND`](crate::FLOAT_MODULUS_BOUND).
///
/// ```
/// use mulmod_vec::{floating_point, InputModFactor};
///
/// let mut result = [0; 3];
/// let (x, y) = ([3, 4, 5], [5, 6, 7]);
/// floating_point::multiply_mod(&mut result, &x, &y, 11, InputModFactor::One).unwrap();
/// assert_eq!(result, [4, 2, 2]);
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
        Some(Kernel::FloatingPoint),
    )
}

/// In-place form of [`multiply_mod`]: `lhs[i] = lhs[i] * rhs[i] mod modulus`.
pub fn multiply_mod_assign(
    lhs: &mut [u64],
    rhs: &[u64],
    modulus: u64,
    input_mod_factor: InputModFactor,
) -> Result<()> {
    dispatch::multiply_mod_assign(lhs, rhs, modulus, input_mod_factor, Some(Kernel::FloatingPoint))
}
