//! Scalar version of the multiplication, used for the elements
//! that do not fill a whole vector and as the baseline in tests.
//!
//! Each operand is first brought below the modulus with the same
//! conditional subtractions the vector kernels use. The product is then
//! reduced exactly through a 128-bit remainder, which is slow but
//! obviously correct.

use crate::arith::small_mod;
use crate::definition::InputModFactor;

/// `x * y mod modulus` for arbitrary `x` and `y`.
#[inline(always)]
pub(crate) const fn mul_mod(x: u64, y: u64, modulus: u64) -> u64 {
    ((x as u128 * y as u128) % modulus as u128) as u64
}

#[inline(always)]
fn reduce_operand(x: u64, modulus: u64, factor: InputModFactor) -> u64 {
    let twice_modulus = 2 * modulus;
    match factor {
        InputModFactor::One => small_mod::<1>(x, modulus, twice_modulus),
        InputModFactor::Two => small_mod::<2>(x, modulus, twice_modulus),
        InputModFactor::Four => small_mod::<4>(x, modulus, twice_modulus),
    }
}

/// Multiplies the first `n` elements.
///
/// # Safety
/// All pointers must be valid for `n` elements, and `result` may only
/// alias an operand exactly. The operands must be below
/// `factor * modulus`.
pub(crate) unsafe fn multiply_mod(
    result: *mut u64,
    operand1: *const u64,
    operand2: *const u64,
    n: usize,
    modulus: u64,
    factor: InputModFactor,
) {
    for i in 0..n {
        let x = reduce_operand(operand1.add(i).read(), modulus, factor);
        let y = reduce_operand(operand2.add(i).read(), modulus, factor);
        result.add(i).write(mul_mod(x, y, modulus));
    }
}
