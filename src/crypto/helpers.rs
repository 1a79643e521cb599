//! Interpolation Helpers
//!
//! Field arithmetic shared by the TVRF engine, the dealer and share
//! rerandomization.
//!
//! ## Functions
//!
//! - **Lagrange interpolation**: coefficients over the selected index set
//! - **Polynomial evaluation**: Horner's method over the scalar field

use crate::error::CombineError;
use secp256kfun::prelude::*;

// ============================================================================
// Lagrange Interpolation
// ============================================================================

/// λ_i(0) = Π_{j ∈ S, j ≠ i} j / (j - i) over the index set `S`.
///
/// Index 0 names the secret, never a party. A repeated index makes some
/// `j - i` vanish and is reported as `ZeroDenominator(i)`.
pub fn lagrange_coefficient_at_zero(
    party_index: u32,
    all_indices: &[u32],
) -> Result<Scalar<Secret, Zero>, CombineError> {
    if party_index == 0 {
        return Err(CombineError::ZeroDenominator(0));
    }
    if all_indices.iter().filter(|&&j| j == party_index).count() > 1 {
        return Err(CombineError::ZeroDenominator(party_index));
    }
    let i: Scalar<Public, Zero> = Scalar::from(party_index);

    let (numerator, denominator) = all_indices
        .iter()
        .filter(|&&j| j != party_index)
        .fold(
            (Scalar::<Public, Zero>::from(1u32), Scalar::<Public, Zero>::from(1u32)),
            |(num, den), &j| {
                let j: Scalar<Public, Zero> = Scalar::from(j);
                (s!(num * j).public(), s!(den * (j - i)).public())
            },
        );

    let inverse = denominator
        .non_zero()
        .ok_or(CombineError::ZeroDenominator(party_index))?
        .invert();
    Ok(s!(numerator * inverse).secret())
}

// ============================================================================
// Polynomials
// ============================================================================

/// Evaluate f(x) = Σ coeff_k · x^k at `x` using Horner's method.
pub fn evaluate_polynomial(coefficients: &[Scalar<Secret, Zero>], x: u32) -> Scalar<Secret, Zero> {
    let x_scalar: Scalar<Public, Zero> = Scalar::from(x);
    let mut result: Scalar<Secret, Zero> = Scalar::zero();

    // Start from highest degree coefficient
    for coeff in coefficients.iter().rev() {
        result = s!(result * x_scalar + { *coeff });
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lagrange_coefficient_at_zero_sum() {
        // Fundamental property: Lagrange coefficients at x=0 sum to 1
        let indices = vec![1u32, 2, 3];

        let mut sum: Scalar<Secret, Zero> = Scalar::zero();
        for &i in &indices {
            let coeff = lagrange_coefficient_at_zero(i, &indices).unwrap();
            sum = s!(sum + coeff);
        }

        let one: Scalar<Secret, Zero> = Scalar::from(1u32);
        assert_eq!(sum.to_bytes(), one.to_bytes());
    }

    #[test]
    fn test_lagrange_known_values() {
        // indices {1, 2, 3} at x=0: λ1 = 3, λ2 = -3, λ3 = 1
        let indices = vec![1u32, 2, 3];
        let three: Scalar<Secret, Zero> = Scalar::from(3u32);
        let one: Scalar<Secret, Zero> = Scalar::from(1u32);

        let l1 = lagrange_coefficient_at_zero(1, &indices).unwrap();
        let l2 = lagrange_coefficient_at_zero(2, &indices).unwrap();
        let l3 = lagrange_coefficient_at_zero(3, &indices).unwrap();

        assert_eq!(l1.to_bytes(), three.to_bytes());
        assert_eq!(l2.to_bytes(), s!(-three).to_bytes());
        assert_eq!(l3.to_bytes(), one.to_bytes());
    }

    #[test]
    fn test_lagrange_large_party_count() {
        let indices: Vec<u32> = (1..=64).collect();

        let mut sum: Scalar<Secret, Zero> = Scalar::zero();
        for &i in &indices {
            let coeff = lagrange_coefficient_at_zero(i, &indices).unwrap();
            sum = s!(sum + coeff);
        }

        let one: Scalar<Secret, Zero> = Scalar::from(1u32);
        assert_eq!(sum.to_bytes(), one.to_bytes());
    }

    #[test]
    fn test_lagrange_rejects_index_zero() {
        assert_eq!(
            lagrange_coefficient_at_zero(0, &[0, 1, 2]),
            Err(CombineError::ZeroDenominator(0))
        );
    }

    #[test]
    fn test_lagrange_duplicate_index_fails() {
        assert!(lagrange_coefficient_at_zero(1, &[1, 2, 2]).is_ok());
        assert_eq!(
            lagrange_coefficient_at_zero(2, &[1, 2, 2]),
            Err(CombineError::ZeroDenominator(2))
        );
    }

    #[test]
    fn test_evaluate_polynomial() {
        // f(x) = 5 + 2x + 3x^2, f(4) = 5 + 8 + 48 = 61
        let coefficients: Vec<Scalar<Secret, Zero>> =
            vec![Scalar::from(5u32), Scalar::from(2u32), Scalar::from(3u32)];
        let expected: Scalar<Secret, Zero> = Scalar::from(61u32);
        assert_eq!(
            evaluate_polynomial(&coefficients, 4).to_bytes(),
            expected.to_bytes()
        );
        assert_eq!(
            evaluate_polynomial(&coefficients, 0).to_bytes(),
            coefficients[0].to_bytes()
        );
    }
}
