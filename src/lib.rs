//! Element-wise modular multiplication of `u64` arrays for moduli
//! below `2^62`. Aimed at the ring arithmetic of lattice-based
//! homomorphic encryption.
//!
//! ## Usage
//!
//! The main entry point is [`multiply_mod`], which computes
//! `result[i] = operand1[i] * operand2[i] mod modulus`.
//!
//! ```
//! use mulmod_vec::*;
//!
//! let modulus = 1099511627791;
//! let x = [0, 1, 2, 3, 4, 5, 6, 7];
//! let mut result = [0; 8];
//!
//! multiply_mod(&mut result, &x, &x, modulus, InputModFactor::One)?;
//! assert_eq!(result, [0, 1, 4, 9, 16, 25, 36, 49]);
//! # Ok::<(), mulmod_vec::Error>(())
//! ```
//!
//! Operands do not need to be fully reduced. With an [`InputModFactor`]
//! of `f`, every operand may take any value below `f * modulus`, which lets
//! earlier stages skip their final reduction. The output is always fully
//! reduced. In-place updates are provided by [`multiply_mod_assign`], also
//! reachable through the [`MultiplyMod`] trait.
//!
//! ```
//! use mulmod_vec::*;
//!
//! let modulus = 1152921504606830593;
//! let mut x = vec![2 * modulus - 1; 17];
//! let y = vec![modulus + 2; 17];
//!
//! x.multiply_mod_assign(&y, modulus, InputModFactor::Two)?;
//! assert!(x.iter().all(|&r| r == modulus - 2));
//! # Ok::<(), mulmod_vec::Error>(())
//! ```
//!
//! Calls with a modulus outside `(1, 2^62)`, mismatched lengths or operands
//! exceeding their bound are rejected with an [`Error`] before anything is
//! written.
//!
//! ## Kernels
//!
//! Two reduction strategies are implemented, see [`fixed_point`] and
//! [`floating_point`]. The dispatcher picks the floating-point kernel for
//! moduli below [`FLOAT_MODULUS_BOUND`] and the fixed-point kernel for all
//! others. Both may also be invoked directly.
//!
//! Elements are processed [`VECTOR_WIDTH`] at a time. Leftover elements at
//! the front of the arrays are handled by a scalar routine. Lengths found in
//! [`UNROLLED_LENGTHS`] use loops that interleave several vectors per
//! iteration.
//!
//! This crate comes with one feature:
//! * `avx512`, which enables the AVX-512F/DQ backend on `x86_64`, selected
//!   at runtime if the CPU supports it. See [`backend`]. Disabled by default.
//!
//! ## Logging
//!
//! Every call opens a `TRACE`-level [`tracing`] span recording the length,
//! the modulus and the input mod factor, and emits an event naming the
//! selected kernel. No subscriber is installed by this crate.

#![allow(unsafe_op_in_unsafe_fn)]

mod arith;
mod definition;
mod dispatch;
mod error;
mod fallback;
pub mod fixed_point;
pub mod floating_point;
mod simd;

pub use crate::definition::{
    FLOAT_MODULUS_BOUND, InputModFactor, MODULUS_BOUND, UNROLLED_LENGTHS, VECTOR_WIDTH,
};
pub use crate::error::{Buffer, Error, Kernel, Result};
pub use crate::simd::{Backend, backend};

/// Computes `result[i] = operand1[i] * operand2[i] mod modulus` for every `i`.
///
/// # Errors
/// * [`Error::InvalidModulus`] unless `1 < modulus < 2^62`.
/// * [`Error::FactorBoundOverflow`] unless `input_mod_factor * modulus < 2^63`.
/// * [`Error::LengthMismatch`] if `result` or `operand2` differs in length
///   from `operand1`.
/// * [`Error::OperandOutOfBounds`] for the first operand that is not below
///   `input_mod_factor * modulus`.
#[inline]
pub fn multiply_mod(
    result: &mut [u64],
    operand1: &[u64],
    operand2: &[u64],
    modulus: u64,
    input_mod_factor: InputModFactor,
) -> Result<()> {
    dispatch::multiply_mod(result, operand1, operand2, modulus, input_mod_factor, None)
}

/// Computes `lhs[i] = lhs[i] * rhs[i] mod modulus` for every `i`.
///
/// # Errors
/// Same as [`multiply_mod`], with `lhs` in the role of `operand1`.
#[inline]
pub fn multiply_mod_assign(
    lhs: &mut [u64],
    rhs: &[u64],
    modulus: u64,
    input_mod_factor: InputModFactor,
) -> Result<()> {
    dispatch::multiply_mod_assign(lhs, rhs, modulus, input_mod_factor, None)
}

/// Helper trait for making the in-place multiplication accessible
/// using the dot operator.
pub trait MultiplyMod {
    /// Replaces every element of `self` by its product with the
    /// corresponding element of `rhs`, modulo `modulus`.
    ///
    /// # Errors
    /// See [`multiply_mod_assign`].
    fn multiply_mod_assign(
        &mut self,
        rhs: &Self,
        modulus: u64,
        input_mod_factor: InputModFactor,
    ) -> Result<()>;
}

impl MultiplyMod for [u64] {
    #[inline(always)]
    fn multiply_mod_assign(
        &mut self,
        rhs: &Self,
        modulus: u64,
        input_mod_factor: InputModFactor,
    ) -> Result<()> {
        multiply_mod_assign(self, rhs, modulus, input_mod_factor)
    }
}
