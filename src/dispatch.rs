//! Validation and kernel selection shared by all entry points.
//!
//! Every precondition is checked before the first write, so a rejected
//! call leaves the output untouched. After that, elements that do not
//! fill a whole vector are handed to the scalar fallback, and the rest
//! goes through the [`Plan`] chosen for the modulus.

use crate::definition::{
    FACTOR_MODULUS_BOUND, FLOAT_MODULUS_BOUND, InputModFactor, MODULUS_BOUND, VECTOR_WIDTH,
};
use crate::error::{Buffer, Error, Kernel, Result};
use crate::fallback;
use crate::fixed_point::{self, Barrett};
use crate::floating_point::{self, Reciprocal};
use crate::simd::{Portable, Simd};

/// The kernel loop a call runs, along with its constants.
#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) enum Plan {
    FixedPoint {
        barrett: Barrett,
        /// Operand bound folded into the loop.
        factor: InputModFactor,
    },
    FloatingPoint {
        reciprocal: Reciprocal,
        factor: InputModFactor,
    },
}

impl Plan {
    /// Picks the kernel for a validated modulus. With `kernel` set, that
    /// kernel is forced and its range is checked instead.
    pub(crate) fn new(
        modulus: u64,
        factor: InputModFactor,
        kernel: Option<Kernel>,
    ) -> Result<Self> {
        let kernel = match kernel {
            Some(kernel) => {
                let supported = match kernel {
                    Kernel::FixedPoint => factor.bound(modulus) >= FLOAT_MODULUS_BOUND,
                    Kernel::FloatingPoint => modulus < FLOAT_MODULUS_BOUND,
                };
                if !supported {
                    return Err(Error::UnsupportedModulus {
                        modulus,
                        input_mod_factor: factor,
                        kernel,
                    });
                }
                kernel
            }
            None if modulus < FLOAT_MODULUS_BOUND => Kernel::FloatingPoint,
            None => Kernel::FixedPoint,
        };

        Ok(match kernel {
            Kernel::FixedPoint => Self::fixed_point(modulus, factor),
            Kernel::FloatingPoint => Self::floating_point(modulus, factor),
        })
    }

    fn fixed_point(modulus: u64, factor: InputModFactor) -> Self {
        let barrett = Barrett::new(modulus);
        let factor = if fixed_point::requires_input_reduction(barrett.bits, factor) {
            factor
        } else {
            InputModFactor::One
        };
        Self::FixedPoint { barrett, factor }
    }

    fn floating_point(modulus: u64, factor: InputModFactor) -> Self {
        let factor = if floating_point::requires_input_reduction(modulus, factor) {
            factor
        } else {
            InputModFactor::One
        };
        Self::FloatingPoint {
            reciprocal: Reciprocal::new(modulus),
            factor,
        }
    }

    /// # Safety
    /// See [`fixed_point::Loop`].
    unsafe fn run<S: Simd>(
        &self,
        simd: S,
        result: *mut u64,
        operand1: *const u64,
        operand2: *const u64,
        n: usize,
    ) {
        match self {
            Self::FixedPoint { barrett, factor } => {
                let run = fixed_point::select::<S>(barrett.bits, *factor);
                run(simd, barrett, result, operand1, operand2, n)
            }
            Self::FloatingPoint { reciprocal, factor } => {
                let run = floating_point::select::<S>(*factor);
                run(simd, reciprocal, result, operand1, operand2, n)
            }
        }
    }
}

/// Validates the modulus and factor, returning the operand bound.
fn check_parameters(modulus: u64, factor: InputModFactor) -> Result<u64> {
    if modulus <= 1 || modulus >= MODULUS_BOUND {
        return Err(Error::InvalidModulus(modulus));
    }
    match factor.checked_bound(modulus) {
        Some(bound) if bound < FACTOR_MODULUS_BOUND => Ok(bound),
        _ => Err(Error::FactorBoundOverflow {
            modulus,
            input_mod_factor: factor,
        }),
    }
}

fn check_length(buffer: Buffer, expected: usize, actual: usize) -> Result<()> {
    if expected != actual {
        return Err(Error::LengthMismatch {
            buffer,
            expected,
            actual,
        });
    }
    Ok(())
}

fn check_operand(buffer: Buffer, operand: &[u64], bound: u64) -> Result<()> {
    match operand.iter().position(|&value| value >= bound) {
        Some(index) => Err(Error::OperandOutOfBounds {
            buffer,
            index,
            value: operand[index],
            bound,
        }),
        None => Ok(()),
    }
}

/// # Safety
/// See [`fallback::multiply_mod`].
unsafe fn execute(
    plan: &Plan,
    mut result: *mut u64,
    mut operand1: *const u64,
    mut operand2: *const u64,
    mut n: usize,
    modulus: u64,
    factor: InputModFactor,
) {
    let head = n % VECTOR_WIDTH;
    if head != 0 {
        fallback::multiply_mod(result, operand1, operand2, head, modulus, factor);
        result = result.add(head);
        operand1 = operand1.add(head);
        operand2 = operand2.add(head);
        n -= head;
    }
    if n == 0 {
        return;
    }

    #[cfg(all(feature = "avx512", target_arch = "x86_64", not(miri)))]
    if let Some(simd) = crate::simd::Avx512::try_new() {
        return plan.run(simd, result, operand1, operand2, n);
    }

    plan.run(Portable, result, operand1, operand2, n)
}

/// Checks a call whose output holds `result_len` elements and picks its
/// plan. Nothing has been written when this returns an error.
fn prepare(
    result_len: usize,
    operand1: &[u64],
    operand2: &[u64],
    modulus: u64,
    factor: InputModFactor,
    kernel: Option<Kernel>,
) -> Result<Plan> {
    let bound = check_parameters(modulus, factor)?;
    let plan = Plan::new(modulus, factor, kernel)?;
    check_length(Buffer::Result, operand1.len(), result_len)?;
    check_length(Buffer::Operand2, operand1.len(), operand2.len())?;
    check_operand(Buffer::Operand1, operand1, bound)?;
    check_operand(Buffer::Operand2, operand2, bound)?;

    tracing::trace!(?plan, "selected kernel");
    Ok(plan)
}

#[inline(always)]
fn debug_assert_reduced(result: &[u64], modulus: u64) {
    debug_assert!(
        result.iter().all(|&r| r < modulus),
        "result not reduced modulo {modulus}"
    );
}

pub(crate) fn multiply_mod(
    result: &mut [u64],
    operand1: &[u64],
    operand2: &[u64],
    modulus: u64,
    factor: InputModFactor,
    kernel: Option<Kernel>,
) -> Result<()> {
    let n = operand1.len();
    let _span = tracing::trace_span!(
        "multiply_mod",
        n,
        modulus,
        input_mod_factor = factor.get()
    )
    .entered();

    let plan = prepare(result.len(), operand1, operand2, modulus, factor, kernel)?;

    // SAFETY: All three slices have length `n`, and `result` is a unique
    // borrow, so it cannot overlap the operands.
    unsafe {
        execute(
            &plan,
            result.as_mut_ptr(),
            operand1.as_ptr(),
            operand2.as_ptr(),
            n,
            modulus,
            factor,
        )
    };

    debug_assert_reduced(result, modulus);
    Ok(())
}

pub(crate) fn multiply_mod_assign(
    lhs: &mut [u64],
    rhs: &[u64],
    modulus: u64,
    factor: InputModFactor,
    kernel: Option<Kernel>,
) -> Result<()> {
    let n = lhs.len();
    let _span = tracing::trace_span!(
        "multiply_mod_assign",
        n,
        modulus,
        input_mod_factor = factor.get()
    )
    .entered();

    let plan = prepare(n, lhs, rhs, modulus, factor, kernel)?;

    // SAFETY: Both slices have length `n`. The output aliases `lhs`
    // exactly, and every kernel reads an element before writing it.
    unsafe {
        let ptr = lhs.as_mut_ptr();
        execute(&plan, ptr, ptr, rhs.as_ptr(), n, modulus, factor)
    };

    debug_assert_reduced(lhs, modulus);
    Ok(())
}
