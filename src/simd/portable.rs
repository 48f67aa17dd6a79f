use crate::arith;
use crate::definition::VECTOR_WIDTH;

use super::Simd;

type U64s = [u64; VECTOR_WIDTH];
type F64s = [f64; VECTOR_WIDTH];

/// Backend operating on plain arrays, one scalar operation per lane.
#[derive(Clone, Copy, Debug, Default)]
pub(crate) struct Portable;

#[inline(always)]
fn map<T: Copy, U>(a: [T; VECTOR_WIDTH], f: impl Fn(T) -> U) -> [U; VECTOR_WIDTH] {
    core::array::from_fn(|i| f(a[i]))
}

#[inline(always)]
fn zip<T: Copy, U>(
    a: [T; VECTOR_WIDTH],
    b: [T; VECTOR_WIDTH],
    f: impl Fn(T, T) -> U,
) -> [U; VECTOR_WIDTH] {
    core::array::from_fn(|i| f(a[i], b[i]))
}

impl Simd for Portable {
    type U64s = U64s;
    type F64s = F64s;

    #[inline(always)]
    fn vectorize<R>(self, op: impl FnOnce() -> R) -> R {
        op()
    }

    #[inline(always)]
    unsafe fn load(self, ptr: *const u64) -> U64s {
        (ptr as *const U64s).read_unaligned()
    }

    #[inline(always)]
    unsafe fn store(self, ptr: *mut u64, value: U64s) {
        (ptr as *mut U64s).write_unaligned(value)
    }

    #[inline(always)]
    fn splat(self, value: u64) -> U64s {
        [value; VECTOR_WIDTH]
    }

    #[inline(always)]
    fn splat_f64(self, value: f64) -> F64s {
        [value; VECTOR_WIDTH]
    }

    #[inline(always)]
    fn sub(self, a: U64s, b: U64s) -> U64s {
        zip(a, b, u64::wrapping_sub)
    }

    #[inline(always)]
    fn min(self, a: U64s, b: U64s) -> U64s {
        zip(a, b, u64::min)
    }

    #[inline(always)]
    fn mul_lo(self, a: U64s, b: U64s) -> U64s {
        zip(a, b, arith::mul_lo)
    }

    #[inline(always)]
    fn mul_hi(self, a: U64s, b: U64s) -> U64s {
        zip(a, b, arith::mul_hi)
    }

    #[inline(always)]
    fn mul_hi_approx(self, a: U64s, b: U64s) -> U64s {
        zip(a, b, arith::mul_hi_approx)
    }

    #[inline(always)]
    fn shift_right_wide(self, lo: U64s, hi: U64s, shift: u32) -> U64s {
        zip(lo, hi, |lo, hi| arith::shift_right_wide(lo, hi, shift))
    }

    // Inputs never exceed 2^52, so the conversion is exact and the
    // rounding direction is irrelevant.
    #[inline(always)]
    fn to_f64(self, a: U64s) -> F64s {
        map(a, |x| x as f64)
    }

    // The floating-point kernel only converts integral values.
    #[inline(always)]
    fn to_u64(self, a: F64s) -> U64s {
        map(a, |x| x.ceil() as u64)
    }

    #[inline(always)]
    fn mul_f64(self, a: F64s, b: F64s) -> F64s {
        zip(a, b, |a, b| a * b)
    }

    #[inline(always)]
    fn add_f64(self, a: F64s, b: F64s) -> F64s {
        zip(a, b, |a, b| a + b)
    }

    #[inline(always)]
    fn mul_sub_f64(self, a: F64s, b: F64s, c: F64s) -> F64s {
        core::array::from_fn(|i| a[i].mul_add(b[i], -c[i]))
    }

    #[inline(always)]
    fn neg_mul_add_f64(self, a: F64s, b: F64s, c: F64s) -> F64s {
        core::array::from_fn(|i| (-a[i]).mul_add(b[i], c[i]))
    }

    #[inline(always)]
    fn floor_f64(self, a: F64s) -> F64s {
        map(a, f64::floor)
    }

    #[inline(always)]
    fn add_if_negative_f64(self, a: F64s, b: F64s) -> F64s {
        zip(a, b, |a, b| if a < 0.0 { a + b } else { a })
    }
}
