use core::arch::x86_64::*;

use super::Simd;
use super::x86_lookup::has_avx512;

/// Backend built on AVX-512F and AVX-512DQ intrinsics.
///
/// Only obtainable through [`Avx512::try_new`], so holding a value proves
/// the running CPU supports both extensions.
#[derive(Clone, Copy, Debug)]
pub(crate) struct Avx512 {
    _private: (),
}

impl Avx512 {
    #[inline(always)]
    pub(crate) fn try_new() -> Option<Self> {
        has_avx512().then_some(Self { _private: () })
    }
}

#[target_feature(enable = "avx512f,avx512dq")]
unsafe fn vectorized<R>(op: impl FnOnce() -> R) -> R {
    op()
}

const LO_MASK: i64 = 0xffff_ffff;

// SAFETY (all methods below): An `Avx512` value only exists if the CPU
// supports AVX-512F and AVX-512DQ.
impl Simd for Avx512 {
    type U64s = __m512i;
    type F64s = __m512d;

    #[inline(always)]
    fn vectorize<R>(self, op: impl FnOnce() -> R) -> R {
        unsafe { vectorized(op) }
    }

    #[inline(always)]
    unsafe fn load(self, ptr: *const u64) -> __m512i {
        (ptr as *const __m512i).read_unaligned()
    }

    #[inline(always)]
    unsafe fn store(self, ptr: *mut u64, value: __m512i) {
        (ptr as *mut __m512i).write_unaligned(value)
    }

    #[inline(always)]
    fn splat(self, value: u64) -> __m512i {
        unsafe { _mm512_set1_epi64(value as i64) }
    }

    #[inline(always)]
    fn splat_f64(self, value: f64) -> __m512d {
        unsafe { _mm512_set1_pd(value) }
    }

    #[inline(always)]
    fn sub(self, a: __m512i, b: __m512i) -> __m512i {
        unsafe { _mm512_sub_epi64(a, b) }
    }

    #[inline(always)]
    fn min(self, a: __m512i, b: __m512i) -> __m512i {
        unsafe { _mm512_min_epu64(a, b) }
    }

    #[inline(always)]
    fn mul_lo(self, a: __m512i, b: __m512i) -> __m512i {
        unsafe { _mm512_mullo_epi64(a, b) }
    }

    #[inline(always)]
    fn mul_hi(self, a: __m512i, b: __m512i) -> __m512i {
        unsafe {
            let mask = _mm512_set1_epi64(LO_MASK);
            let a_hi = _mm512_srli_epi64::<32>(a);
            let b_hi = _mm512_srli_epi64::<32>(b);

            let lo_lo = _mm512_mul_epu32(a, b);
            let lo_hi = _mm512_mul_epu32(a, b_hi);
            let hi_lo = _mm512_mul_epu32(a_hi, b);
            let hi_hi = _mm512_mul_epu32(a_hi, b_hi);

            let cross = _mm512_add_epi64(
                _mm512_srli_epi64::<32>(lo_lo),
                _mm512_add_epi64(
                    _mm512_and_si512(lo_hi, mask),
                    _mm512_and_si512(hi_lo, mask),
                ),
            );
            _mm512_add_epi64(
                _mm512_add_epi64(hi_hi, _mm512_srli_epi64::<32>(cross)),
                _mm512_add_epi64(
                    _mm512_srli_epi64::<32>(lo_hi),
                    _mm512_srli_epi64::<32>(hi_lo),
                ),
            )
        }
    }

    #[inline(always)]
    fn mul_hi_approx(self, a: __m512i, b: __m512i) -> __m512i {
        unsafe {
            let mask = _mm512_set1_epi64(LO_MASK);
            let a_hi = _mm512_srli_epi64::<32>(a);
            let b_hi = _mm512_srli_epi64::<32>(b);

            let lo_hi = _mm512_mul_epu32(a, b_hi);
            let hi_lo = _mm512_mul_epu32(a_hi, b);
            let hi_hi = _mm512_mul_epu32(a_hi, b_hi);

            let cross = _mm512_add_epi64(
                _mm512_and_si512(lo_hi, mask),
                _mm512_and_si512(hi_lo, mask),
            );
            _mm512_add_epi64(
                _mm512_add_epi64(hi_hi, _mm512_srli_epi64::<32>(cross)),
                _mm512_add_epi64(
                    _mm512_srli_epi64::<32>(lo_hi),
                    _mm512_srli_epi64::<32>(hi_lo),
                ),
            )
        }
    }

    #[inline(always)]
    fn shift_right_wide(self, lo: __m512i, hi: __m512i, shift: u32) -> __m512i {
        unsafe {
            let lo = _mm512_srlv_epi64(lo, _mm512_set1_epi64(shift as i64));
            let hi = _mm512_sllv_epi64(hi, _mm512_set1_epi64(64 - shift as i64));
            _mm512_or_si512(lo, hi)
        }
    }

    #[inline(always)]
    fn to_f64(self, a: __m512i) -> __m512d {
        unsafe { _mm512_cvt_roundepu64_pd::<{ _MM_FROUND_TO_POS_INF | _MM_FROUND_NO_EXC }>(a) }
    }

    #[inline(always)]
    fn to_u64(self, a: __m512d) -> __m512i {
        unsafe { _mm512_cvt_roundpd_epu64::<{ _MM_FROUND_TO_POS_INF | _MM_FROUND_NO_EXC }>(a) }
    }

    #[inline(always)]
    fn mul_f64(self, a: __m512d, b: __m512d) -> __m512d {
        unsafe { _mm512_mul_pd(a, b) }
    }

    #[inline(always)]
    fn add_f64(self, a: __m512d, b: __m512d) -> __m512d {
        unsafe { _mm512_add_pd(a, b) }
    }

    #[inline(always)]
    fn mul_sub_f64(self, a: __m512d, b: __m512d, c: __m512d) -> __m512d {
        unsafe { _mm512_fmsub_pd(a, b, c) }
    }

    #[inline(always)]
    fn neg_mul_add_f64(self, a: __m512d, b: __m512d, c: __m512d) -> __m512d {
        unsafe { _mm512_fnmadd_pd(a, b, c) }
    }

    #[inline(always)]
    fn floor_f64(self, a: __m512d) -> __m512d {
        unsafe { _mm512_roundscale_pd::<{ _MM_FROUND_TO_NEG_INF | _MM_FROUND_NO_EXC }>(a) }
    }

    #[inline(always)]
    fn add_if_negative_f64(self, a: __m512d, b: __m512d) -> __m512d {
        unsafe {
            let negative = _mm512_cmp_pd_mask::<_CMP_LT_OQ>(a, _mm512_setzero_pd());
            _mm512_mask_add_pd(a, negative, a, b)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::InputModFactor;
    use crate::definition::VECTOR_WIDTH;
    use crate::fixed_point::{self, Barrett};
    use crate::floating_point::{self, Reciprocal};
    use crate::simd::Portable;

    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    fn lanes(simd: Avx512, x: [u64; VECTOR_WIDTH]) -> __m512i {
        unsafe { simd.load(x.as_ptr()) }
    }

    fn unpack(simd: Avx512, x: __m512i) -> [u64; VECTOR_WIDTH] {
        let mut out = [0; VECTOR_WIDTH];
        unsafe { simd.store(out.as_mut_ptr(), x) };
        out
    }

    #[test]
    fn products_match_portable() {
        let Some(simd) = Avx512::try_new() else {
            return;
        };

        let mut rng = StdRng::seed_from_u64(512);
        for _ in 0..1000 {
            let a: [u64; VECTOR_WIDTH] = core::array::from_fn(|_| rng.r#gen());
            let b: [u64; VECTOR_WIDTH] = core::array::from_fn(|_| rng.r#gen());
            let (va, vb) = (lanes(simd, a), lanes(simd, b));

            assert_eq!(unpack(simd, simd.mul_lo(va, vb)), Portable.mul_lo(a, b));
            assert_eq!(unpack(simd, simd.mul_hi(va, vb)), Portable.mul_hi(a, b));
            assert_eq!(unpack(simd, simd.mul_hi_approx(va, vb)), Portable.mul_hi_approx(a, b));
            for shift in [1, 31, 48, 61] {
                assert_eq!(
                    unpack(simd, simd.shift_right_wide(va, vb, shift)),
                    Portable.shift_right_wide(a, b, shift)
                );
            }
        }
    }

    #[test]
    fn extreme_products() {
        let Some(simd) = Avx512::try_new() else {
            return;
        };

        let a = [u64::MAX, u64::MAX, 0, 1, 1 << 32, (1 << 32) - 1, 1 << 63, 3];
        let b = [u64::MAX, 1, u64::MAX, u64::MAX, 1 << 32, (1 << 32) - 1, 2, 1 << 62];
        let (va, vb) = (lanes(simd, a), lanes(simd, b));
        assert_eq!(unpack(simd, simd.mul_hi(va, vb)), Portable.mul_hi(a, b));
        assert_eq!(unpack(simd, simd.mul_hi_approx(va, vb)), Portable.mul_hi_approx(a, b));
    }

    #[test]
    fn floating_point_kernel_matches_portable() {
        let Some(simd) = Avx512::try_new() else {
            return;
        };

        let modulus = 1099511627791;
        let mut rng = StdRng::seed_from_u64(1);
        let x: Vec<u64> = (0..4096).map(|_| rng.gen_range(0..4 * modulus)).collect();
        let y: Vec<u64> = (0..4096).map(|_| rng.gen_range(0..4 * modulus)).collect();

        let reciprocal = Reciprocal::new(modulus);
        let run = |len: usize, vector: bool| {
            let mut result = vec![0; len];
            unsafe {
                if vector {
                    floating_point::select::<Avx512>(InputModFactor::Four)(
                        simd, &reciprocal, result.as_mut_ptr(), x.as_ptr(), y.as_ptr(), len,
                    )
                } else {
                    floating_point::select::<Portable>(InputModFactor::Four)(
                        Portable, &reciprocal, result.as_mut_ptr(), x.as_ptr(), y.as_ptr(), len,
                    )
                }
            };
            result
        };

        for len in [8, 1024, 4096] {
            assert_eq!(run(len, true), run(len, false), "length {len}");
        }
    }

    #[test]
    fn fixed_point_kernel_matches_portable() {
        let Some(simd) = Avx512::try_new() else {
            return;
        };

        let mut rng = StdRng::seed_from_u64(2);
        for modulus in [(1 << 50) + 55, 1152921504606830593, (1 << 61) - 1] {
            let x: Vec<u64> = (0..2048).map(|_| rng.gen_range(0..4 * modulus)).collect();
            let y: Vec<u64> = (0..2048).map(|_| rng.gen_range(0..4 * modulus)).collect();

            let barrett = Barrett::new(modulus);
            let reduce = fixed_point::requires_input_reduction(barrett.bits, InputModFactor::Four);
            let factor = if reduce {
                InputModFactor::Four
            } else {
                InputModFactor::One
            };

            for len in [8, 136, 2048] {
                let mut vector = vec![0; len];
                let mut portable = vec![0; len];
                unsafe {
                    fixed_point::select::<Avx512>(barrett.bits, factor)(
                        simd, &barrett, vector.as_mut_ptr(), x.as_ptr(), y.as_ptr(), len,
                    );
                    fixed_point::select::<Portable>(barrett.bits, factor)(
                        Portable, &barrett, portable.as_mut_ptr(), x.as_ptr(), y.as_ptr(), len,
                    );
                }
                assert_eq!(vector, portable, "modulus {modulus}, length {len}");
            }
        }
    }
}
