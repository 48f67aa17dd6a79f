//! Precondition violations reported by the entry points.

use core::fmt;

use crate::definition::InputModFactor;

/// Names one of the three buffers of a call.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Buffer {
    /// The output buffer.
    Result,
    /// The first input buffer.
    Operand1,
    /// The second input buffer.
    Operand2,
}

impl fmt::Display for Buffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Buffer::Result => "result",
            Buffer::Operand1 => "operand1",
            Buffer::Operand2 => "operand2",
        })
    }
}

/// The two reduction strategies.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Kernel {
    /// Barrett-style reduction using a precomputed 64-bit reciprocal.
    FixedPoint,
    /// Reduction through a double-precision reciprocal.
    FloatingPoint,
}

impl fmt::Display for Kernel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Kernel::FixedPoint => "fixed-point",
            Kernel::FloatingPoint => "floating-point",
        })
    }
}

/// A rejected call. No output has been written when one of these is returned.
#[derive(Clone, Debug, PartialEq, Eq)]
#[non_exhaustive]
pub enum Error {
    /// The input mod factor is not one of 1, 2 or 4.
    InvalidInputModFactor(u64),
    /// The modulus is not in `(1, 2^62)`.
    InvalidModulus(u64),
    /// `input_mod_factor * modulus` is not below `2^63`.
    FactorBoundOverflow {
        modulus: u64,
        input_mod_factor: InputModFactor,
    },
    /// The modulus lies outside the regime of a directly invoked kernel.
    UnsupportedModulus {
        modulus: u64,
        input_mod_factor: InputModFactor,
        kernel: Kernel,
    },
    /// A buffer's length differs from the length of `operand1`.
    LengthMismatch {
        buffer: Buffer,
        expected: usize,
        actual: usize,
    },
    /// An operand is not below `input_mod_factor * modulus`.
    OperandOutOfBounds {
        buffer: Buffer,
        index: usize,
        value: u64,
        bound: u64,
    },
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::InvalidInputModFactor(factor) => {
                write!(f, "input mod factor {factor} is not 1, 2 or 4")
            }
            Error::InvalidModulus(modulus) => {
                write!(f, "modulus {modulus} is not in (1, 2^62)")
            }
            Error::FactorBoundOverflow {
                modulus,
                input_mod_factor,
            } => write!(
                f,
                "input mod factor {input_mod_factor} times modulus {modulus} is not below 2^63"
            ),
            Error::UnsupportedModulus {
                modulus,
                input_mod_factor,
                kernel,
            } => write!(
                f,
                "modulus {modulus} with input mod factor {input_mod_factor} \
                 is outside the {kernel} kernel's range"
            ),
            Error::LengthMismatch {
                buffer,
                expected,
                actual,
            } => write!(f, "{buffer} has length {actual}, expected {expected}"),
            Error::OperandOutOfBounds {
                buffer,
                index,
                value,
                bound,
            } => write!(f, "{buffer}[{index}] = {value} exceeds bound {bound}"),
        }
    }
}

impl std::error::Error for Error {}

/// Result type of the fallible entry points.
pub type Result<T> = core::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_name_the_offending_buffer() {
        let err = Error::OperandOutOfBounds {
            buffer: Buffer::Operand2,
            index: 3,
            value: 40,
            bound: 34,
        };
        assert_eq!(err.to_string(), "operand2[3] = 40 exceeds bound 34");

        let err = Error::LengthMismatch {
            buffer: Buffer::Result,
            expected: 8,
            actual: 7,
        };
        assert_eq!(err.to_string(), "result has length 7, expected 8");
    }

    #[test]
    fn messages_name_the_kernel() {
        let err = Error::UnsupportedModulus {
            modulus: 17,
            input_mod_factor: InputModFactor::Two,
            kernel: Kernel::FixedPoint,
        };
        assert_eq!(
            err.to_string(),
            "modulus 17 with input mod factor 2 is outside the fixed-point kernel's range"
        );
    }
}
