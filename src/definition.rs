//! Definition of the [`InputModFactor`] type as well as the
//! numeric bounds shared by all kernels.

use core::fmt;

use crate::error::Error;

/// Number of 64-bit lanes processed together by the vector kernels.
/// Inputs whose length is not a multiple of this are partially
/// handled by the scalar fallback.
pub const VECTOR_WIDTH: usize = 8;

/// Exclusive upper bound on the modulus.
pub const MODULUS_BOUND: u64 = 1 << 62;

/// Exclusive upper bound on `input_mod_factor * modulus`.
pub const FACTOR_MODULUS_BOUND: u64 = 1 << 63;

/// Largest 50-bit value. Moduli strictly below it are handled by the
/// floating-point kernel, for which double precision carries enough
/// mantissa bits to represent the product split exactly.
pub const FLOAT_MODULUS_BOUND: u64 = (1 << 50) - 1;

/// Array lengths for which the kernels have manually unrolled loops.
pub const UNROLLED_LENGTHS: [usize; 6] = [1024, 2048, 4096, 8192, 16384, 32768];

/// Bound multiplier on operand values.
///
/// Operands passed alongside a factor `f` must be strictly less than
/// `f * modulus`, allowing upstream stages to skip their final reduction.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(u64)]
pub enum InputModFactor {
    /// Operands are fully reduced.
    #[default]
    One = 1,
    /// Operands lie in `[0, 2 * modulus)`.
    Two = 2,
    /// Operands lie in `[0, 4 * modulus)`.
    Four = 4,
}

impl InputModFactor {
    /// Returns the numeric value of the factor.
    #[inline(always)]
    #[must_use]
    pub const fn get(self) -> u64 {
        self as u64
    }

    /// Returns `log2` of the factor.
    #[inline(always)]
    #[must_use]
    pub const fn log2(self) -> u32 {
        match self {
            Self::One => 0,
            Self::Two => 1,
            Self::Four => 2,
        }
    }

    /// Returns the exclusive bound `self * modulus` on operand values,
    /// or `None` if it does not fit in a `u64`.
    #[inline(always)]
    #[must_use]
    pub const fn checked_bound(self, modulus: u64) -> Option<u64> {
        self.get().checked_mul(modulus)
    }

    /// Unchecked form of [`checked_bound`](Self::checked_bound) for moduli
    /// that already passed validation.
    #[inline(always)]
    #[must_use]
    pub(crate) const fn bound(self, modulus: u64) -> u64 {
        self.get() * modulus
    }
}

impl TryFrom<u64> for InputModFactor {
    type Error = Error;

    fn try_from(value: u64) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(Self::One),
            2 => Ok(Self::Two),
            4 => Ok(Self::Four),
            _ => Err(Error::InvalidInputModFactor(value)),
        }
    }
}

impl fmt::Display for InputModFactor {
    #[inline(always)]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        <u64 as fmt::Display>::fmt(&self.get(), f)
    }
}

/// Bit length `N` of the modulus, i.e. `floor(log2(modulus)) + 1`.
#[inline(always)]
#[must_use]
pub(crate) const fn bit_length(modulus: u64) -> u32 {
    u64::BITS - modulus.leading_zeros()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn factor_round_trips_through_u64() {
        for factor in [InputModFactor::One, InputModFactor::Two, InputModFactor::Four] {
            assert_eq!(InputModFactor::try_from(factor.get()), Ok(factor));
            assert_eq!(1 << factor.log2(), factor.get());
        }
    }

    #[test]
    fn factor_rejects_other_values() {
        for value in [0, 3, 5, 8, u64::MAX] {
            assert_eq!(
                InputModFactor::try_from(value),
                Err(Error::InvalidInputModFactor(value))
            );
        }
    }

    #[test]
    fn checked_bound_detects_overflow() {
        assert_eq!(InputModFactor::Four.checked_bound(1 << 62), None);
        assert_eq!(InputModFactor::Two.checked_bound(u64::MAX), None);
        assert_eq!(InputModFactor::Four.checked_bound(1 << 61), Some(1 << 63));
        assert_eq!(InputModFactor::One.checked_bound(u64::MAX), Some(u64::MAX));
    }

    #[test]
    fn bit_length_matches_definition() {
        assert_eq!(bit_length(2), 2);
        assert_eq!(bit_length(3), 2);
        assert_eq!(bit_length(1099511627791), 41);
        assert_eq!(bit_length(FLOAT_MODULUS_BOUND), 50);
        assert_eq!(bit_length(MODULUS_BOUND - 1), 62);
    }
}
