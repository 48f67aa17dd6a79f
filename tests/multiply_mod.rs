//! End-to-end checks of the public entry points against an
//! arbitrary-precision reference.

use mulmod_vec::{
    Buffer, Error, FLOAT_MODULUS_BOUND, InputModFactor, MODULUS_BOUND, MultiplyMod,
    UNROLLED_LENGTHS, fixed_point, floating_point, multiply_mod, multiply_mod_assign,
};
use num_bigint::BigUint;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

const FACTORS: [InputModFactor; 3] = [
    InputModFactor::One,
    InputModFactor::Two,
    InputModFactor::Four,
];

fn reference(operand1: &[u64], operand2: &[u64], modulus: u64) -> Vec<u64> {
    let modulus = BigUint::from(modulus);
    operand1
        .iter()
        .zip(operand2)
        .map(|(&x, &y)| {
            let product = (BigUint::from(x) % &modulus) * (BigUint::from(y) % &modulus);
            let digits = (product % &modulus).to_u64_digits();
            digits.first().copied().unwrap_or(0)
        })
        .collect()
}

fn random_operands(len: usize, bound: u64, rng: &mut StdRng) -> Vec<u64> {
    (0..len).map(|_| rng.gen_range(0..bound)).collect()
}

/// A modulus of exactly `bits` bits that `factor` may be combined with.
fn modulus_with_bits(bits: u32, factor: InputModFactor, rng: &mut StdRng) -> Option<u64> {
    let lowest = (1u64 << (bits - 1)) + 1;
    let highest = ((1u64 << bits) - 1)
        .min(MODULUS_BOUND - 1)
        .min(((1u64 << 63) - 1) / factor.get());
    (lowest <= highest).then(|| rng.gen_range(lowest..=highest) | 1)
}

#[test]
fn squares_of_small_integers() {
    let modulus = 1099511627791;
    let x: Vec<u64> = (0..8).collect();
    let mut result = vec![0; 8];
    multiply_mod(&mut result, &x, &x, modulus, InputModFactor::One).unwrap();
    assert_eq!(result, [0, 1, 4, 9, 16, 25, 36, 49]);
}

#[test]
fn in_place_matches_separate_output() {
    let modulus = 1152921504606830593;
    let x = vec![modulus - 1; 17];

    let mut separate = vec![0; 17];
    multiply_mod(&mut separate, &x, &x, modulus, InputModFactor::One).unwrap();

    let mut in_place = x.clone();
    multiply_mod_assign(&mut in_place, &x, modulus, InputModFactor::One).unwrap();

    assert_eq!(in_place, separate);
    assert_eq!(separate, vec![1; 17]);
}

#[test]
fn in_place_through_the_trait() {
    let mut rng = StdRng::seed_from_u64(17);
    for modulus in [97, 1099511627791, 1152921504606830593] {
        let bound = InputModFactor::Two.checked_bound(modulus).unwrap();
        let mut x = random_operands(1024, bound, &mut rng);
        let y = random_operands(1024, bound, &mut rng);
        let expected = reference(&x, &y, modulus);
        x.multiply_mod_assign(&y, modulus, InputModFactor::Two).unwrap();
        assert_eq!(x, expected, "modulus {modulus}");
    }
}

#[test]
fn lengths_that_do_not_fill_a_vector() {
    let mut rng = StdRng::seed_from_u64(13);
    for modulus in [1099511627791, (1 << 62) - 57] {
        for len in [1, 7, 13, 31, 1023, 1025] {
            let x = random_operands(len, modulus, &mut rng);
            let y = random_operands(len, modulus, &mut rng);
            let mut result = vec![0; len];
            multiply_mod(&mut result, &x, &y, modulus, InputModFactor::One).unwrap();
            assert_eq!(result, reference(&x, &y, modulus), "modulus {modulus}, length {len}");
        }
    }
}

#[test]
fn unrolled_lengths() {
    let mut rng = StdRng::seed_from_u64(1024);
    for modulus in [(1 << 30) + 3, FLOAT_MODULUS_BOUND - 2, 1152921504606830593] {
        for len in UNROLLED_LENGTHS {
            let bound = InputModFactor::Four.checked_bound(modulus).unwrap();
            let x = random_operands(len, bound, &mut rng);
            let y = random_operands(len, bound, &mut rng);
            let mut result = vec![0; len];
            multiply_mod(&mut result, &x, &y, modulus, InputModFactor::Four).unwrap();
            assert_eq!(result, reference(&x, &y, modulus), "modulus {modulus}, length {len}");
        }
    }
}

#[test]
fn boundary_bit_widths() {
    let mut rng = StdRng::seed_from_u64(62);
    for bits in [2, 30, 48, 49, 50, 51, 52, 58, 59, 60, 61, 62] {
        for factor in FACTORS {
            let Some(modulus) = modulus_with_bits(bits, factor, &mut rng) else {
                continue;
            };
            let bound = factor.checked_bound(modulus).unwrap();
            let mut x = random_operands(40, bound, &mut rng);
            let mut y = random_operands(40, bound, &mut rng);
            x[..9].fill(bound - 1);
            y[..5].fill(bound - 1);

            let mut result = vec![0; 40];
            multiply_mod(&mut result, &x, &y, modulus, factor).unwrap();
            assert_eq!(result, reference(&x, &y, modulus), "modulus {modulus}, factor {factor}");
            assert!(result.iter().all(|&r| r < modulus));
        }
    }
}

#[test]
fn moduli_around_the_kernel_threshold() {
    let mut rng = StdRng::seed_from_u64(50);
    let moduli = [
        FLOAT_MODULUS_BOUND - 2,
        FLOAT_MODULUS_BOUND,
        FLOAT_MODULUS_BOUND + 2,
        1 << 50,
    ];
    for modulus in moduli {
        for factor in FACTORS {
            let bound = factor.checked_bound(modulus).unwrap();
            let x = random_operands(64, bound, &mut rng);
            let mut result = vec![0; 64];
            multiply_mod(&mut result, &x, &x, modulus, factor).unwrap();
            assert_eq!(result, reference(&x, &x, modulus), "modulus {modulus}, factor {factor}");
        }
    }
}

#[test]
fn kernels_agree_where_both_apply() {
    let mut rng = StdRng::seed_from_u64(4);
    for _ in 0..50 {
        let modulus = rng.gen_range((1 << 48) + 1..FLOAT_MODULUS_BOUND);
        let factor = InputModFactor::Four;
        let bound = factor.checked_bound(modulus).unwrap();
        let x = random_operands(72, bound, &mut rng);
        let y = random_operands(72, bound, &mut rng);

        let mut fixed = vec![0; 72];
        let mut float = vec![0; 72];
        fixed_point::multiply_mod(&mut fixed, &x, &y, modulus, factor).unwrap();
        floating_point::multiply_mod(&mut float, &x, &y, modulus, factor).unwrap();
        assert_eq!(fixed, float, "modulus {modulus}");
    }
}

#[test]
fn rejected_calls_leave_the_result_untouched() {
    let modulus = 1099511627791;
    let valid = vec![1; 16];
    let mut too_large = valid.clone();
    too_large[11] = modulus;

    let cases: [(u64, InputModFactor, &[u64], &[u64], usize, Error); 5] = [
        (1, InputModFactor::One, &valid[..], &valid[..], 16, Error::InvalidModulus(1)),
        (1 << 62, InputModFactor::One, &valid[..], &valid[..], 16, Error::InvalidModulus(1 << 62)),
        (
            (1 << 61) + 1,
            InputModFactor::Four,
            &valid[..],
            &valid[..],
            16,
            Error::FactorBoundOverflow {
                modulus: (1 << 61) + 1,
                input_mod_factor: InputModFactor::Four,
            },
        ),
        (
            modulus,
            InputModFactor::One,
            &valid[..],
            &too_large[..],
            16,
            Error::OperandOutOfBounds {
                buffer: Buffer::Operand2,
                index: 11,
                value: modulus,
                bound: modulus,
            },
        ),
        (
            modulus,
            InputModFactor::One,
            &valid[..],
            &valid[..],
            15,
            Error::LengthMismatch {
                buffer: Buffer::Result,
                expected: 16,
                actual: 15,
            },
        ),
    ];

    for (modulus, factor, operand1, operand2, len, error) in cases {
        let mut result = vec![u64::MAX; len];
        assert_eq!(multiply_mod(&mut result, operand1, operand2, modulus, factor), Err(error));
        assert!(result.iter().all(|&r| r == u64::MAX));
    }
}

#[test]
fn operand_bound_is_checked() {
    assert_eq!(InputModFactor::Two.checked_bound(97), Some(194));
    assert_eq!(InputModFactor::Four.checked_bound(MODULUS_BOUND), None);
}

#[test]
fn factor_is_parsed_from_integers() {
    assert_eq!(InputModFactor::try_from(4), Ok(InputModFactor::Four));
    assert_eq!(InputModFactor::try_from(3), Err(Error::InvalidInputModFactor(3)));
    assert_eq!(
        Error::InvalidInputModFactor(3).to_string(),
        "input mod factor 3 is not 1, 2 or 4"
    );
}

#[test]
fn reported_backend_is_stable() {
    assert_eq!(mulmod_vec::backend(), mulmod_vec::backend());
}
