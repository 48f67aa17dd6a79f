//! Lane backends the kernels are written against.
//!
//! Both kernels are expressed once, generically over [`Simd`], which
//! provides the arithmetic leaves of the reductions on eight 64-bit lanes
//! at a time: wrapping integer subtraction, the unsigned minimum used for
//! branch-free conditional subtraction, the halves of a 64x64 -> 128-bit
//! product, a double-word shift, and the handful of double-precision
//! operations the floating-point kernel needs.
//!
//! Two backends exist:
//! * [`Portable`], built on `[u64; 8]` arrays. Always available, and
//!   written so that the compiler may auto-vectorize it.
//! * `Avx512`, built on AVX-512F/DQ intrinsics. Only compiled with the
//!   `avx512` feature on x86_64, and only constructible once the running
//!   CPU has been verified to support it.
//!
//! Every operation is exact or rounds identically on both backends,
//! so results are bit-for-bit identical.

mod portable;

pub(crate) use portable::Portable;

cfg_if::cfg_if! {
    if #[cfg(all(feature = "avx512", target_arch = "x86_64", not(miri)))] {
        mod avx512;
        mod x86_lookup;

        pub(crate) use avx512::Avx512;
    }
}

/// Identifies the backend the dispatcher runs the vector kernels on.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Backend {
    /// Array-based lanes in plain Rust.
    Portable,
    /// AVX-512F/DQ intrinsics.
    Avx512,
}

/// Returns the backend used for the vectorized part of each call.
#[must_use]
pub fn backend() -> Backend {
    #[cfg(all(feature = "avx512", target_arch = "x86_64", not(miri)))]
    if Avx512::try_new().is_some() {
        return Backend::Avx512;
    }

    Backend::Portable
}

/// Eight lanes of 64-bit integers and doubles.
///
/// Implementors are zero-sized tokens. Holding one proves the
/// operations can execute on the running CPU.
pub(crate) trait Simd: Copy {
    type U64s: Copy;
    type F64s: Copy;

    /// Runs `op` in a context where the backend's instructions are enabled,
    /// so that the inlined operations compile to them.
    fn vectorize<R>(self, op: impl FnOnce() -> R) -> R;

    /// Reads `VECTOR_WIDTH` consecutive values starting at `ptr`.
    ///
    /// # Safety
    /// `ptr` must be valid for reading `VECTOR_WIDTH` values.
    unsafe fn load(self, ptr: *const u64) -> Self::U64s;

    /// Writes `VECTOR_WIDTH` consecutive values starting at `ptr`.
    ///
    /// # Safety
    /// `ptr` must be valid for writing `VECTOR_WIDTH` values.
    unsafe fn store(self, ptr: *mut u64, value: Self::U64s);

    fn splat(self, value: u64) -> Self::U64s;
    fn splat_f64(self, value: f64) -> Self::F64s;

    fn sub(self, a: Self::U64s, b: Self::U64s) -> Self::U64s;
    fn min(self, a: Self::U64s, b: Self::U64s) -> Self::U64s;

    fn mul_lo(self, a: Self::U64s, b: Self::U64s) -> Self::U64s;
    fn mul_hi(self, a: Self::U64s, b: Self::U64s) -> Self::U64s;
    /// See [`crate::arith::mul_hi_approx`].
    fn mul_hi_approx(self, a: Self::U64s, b: Self::U64s) -> Self::U64s;
    /// Low 64 bits of `hi:lo >> shift`, with `0 < shift < 64`.
    fn shift_right_wide(self, lo: Self::U64s, hi: Self::U64s, shift: u32) -> Self::U64s;

    /// Conversion of values below `2^53`, rounding toward positive infinity.
    fn to_f64(self, a: Self::U64s) -> Self::F64s;
    /// Conversion of non-negative values, rounding toward positive infinity.
    fn to_u64(self, a: Self::F64s) -> Self::U64s;
    fn mul_f64(self, a: Self::F64s, b: Self::F64s) -> Self::F64s;
    fn add_f64(self, a: Self::F64s, b: Self::F64s) -> Self::F64s;
    /// `a * b - c` with a single rounding.
    fn mul_sub_f64(self, a: Self::F64s, b: Self::F64s, c: Self::F64s) -> Self::F64s;
    /// `c - a * b` with a single rounding.
    fn neg_mul_add_f64(self, a: Self::F64s, b: Self::F64s, c: Self::F64s) -> Self::F64s;
    fn floor_f64(self, a: Self::F64s) -> Self::F64s;
    /// Adds `b` to the lanes of `a` that are negative.
    fn add_if_negative_f64(self, a: Self::F64s, b: Self::F64s) -> Self::F64s;

    /// See [`crate::arith::small_mod`].
    #[inline(always)]
    fn small_mod<const FACTOR: u64>(
        self,
        x: Self::U64s,
        modulus: Self::U64s,
        twice_modulus: Self::U64s,
    ) -> Self::U64s {
        match FACTOR {
            1 => x,
            2 => self.min(x, self.sub(x, modulus)),
            4 => {
                let x = self.min(x, self.sub(x, twice_modulus));
                self.min(x, self.sub(x, modulus))
            }
            _ => unreachable!("input mod factor is 1, 2 or 4"),
        }
    }
}
