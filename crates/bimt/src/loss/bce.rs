//! # Binary cross-entropy with logits.
//!
//! Computes BCE directly from unbounded logits, using the standard
//! log-sum-exp stabilization:
//!
//! ```text
//! m = max(-x, 0)
//! bce(x, t) = x - x*t + m + log(exp(-m) + exp(-x - m))
//! ```
//!
//! This is algebraically ``-[t*log(sigmoid(x)) + (1-t)*log(1-sigmoid(x))]``,
//! but never exponentiates a large positive value.

use burn::prelude::{Backend, Tensor};

/// Elementwise binary cross-entropy between logits and float targets.
///
/// # Arguments
///
/// - `logits`: unbounded predictions; do not pre-apply a sigmoid.
/// - `targets`: per-element labels, same shape as `logits`.
///
/// # Returns
///
/// The elementwise loss, shaped like `logits`.
///
/// # Panics
///
/// If `targets` and `logits` differ in shape.
pub fn binary_cross_entropy_with_logits_no_reduction<B: Backend, const D: usize>(
    logits: Tensor<B, D>,
    targets: Tensor<B, D>,
) -> Tensor<B, D> {
    assert_eq!(
        targets.dims(),
        logits.dims(),
        "Target size {:?} must be the same as input size {:?}",
        targets.dims(),
        logits.dims(),
    );

    let max_val = logits.clone().neg().clamp_min(0.0);

    logits.clone() - logits.clone() * targets
        + max_val.clone()
        + (max_val.clone().neg().exp() + (logits.neg() - max_val).exp()).log()
}

/// Mean binary cross-entropy between logits and float targets.
///
/// See [`binary_cross_entropy_with_logits_no_reduction`].
///
/// # Panics
///
/// If `targets` and `logits` differ in shape.
pub fn binary_cross_entropy_with_logits<B: Backend, const D: usize>(
    logits: Tensor<B, D>,
    targets: Tensor<B, D>,
) -> Tensor<B, 1> {
    binary_cross_entropy_with_logits_no_reduction(logits, targets).mean()
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;
    use burn::nn::Sigmoid;

    type B = NdArray<f32>;

    /// Reference implementation; stable enough for small logits.
    fn naive_bce(
        logits: Tensor<B, 2>,
        targets: Tensor<B, 2>,
    ) -> Tensor<B, 1> {
        let p = Sigmoid::new().forward(logits);
        let loss = targets.clone() * p.clone().log()
            + (targets.neg() + 1.0) * (p.neg() + 1.0).log();
        loss.neg().mean()
    }

    #[test]
    fn test_matches_naive_formula() {
        let device = Default::default();

        let logits: Tensor<B, 2> =
            Tensor::from_data([[-3.0, -0.5, 0.0], [0.25, 1.0, 4.0]], &device);
        let targets: Tensor<B, 2> = Tensor::from_data([[0.0, 1.0, 0.0], [1.0, 1.0, 0.0]], &device);

        let expected: f32 = naive_bce(logits.clone(), targets.clone()).into_scalar();
        let actual: f32 = binary_cross_entropy_with_logits(logits, targets).into_scalar();

        assert!(
            (expected - actual).abs() < 1e-5,
            "expected {expected}, got {actual}"
        );
    }

    #[test]
    fn test_stable_for_large_logits() {
        let device = Default::default();

        // exp(100) overflows f32; the stabilized form must not.
        let logits: Tensor<B, 2> = Tensor::from_data([[100.0, -100.0]], &device);
        let targets: Tensor<B, 2> = Tensor::from_data([[1.0, 0.0]], &device);

        let loss: f32 = binary_cross_entropy_with_logits(logits, targets).into_scalar();

        assert!(loss.is_finite());
        assert!(loss.abs() < 1e-5, "confident correct predictions: {loss}");
    }

    #[test]
    #[should_panic(expected = "must be the same as input size")]
    fn test_shape_mismatch_panics() {
        let device = Default::default();

        let logits: Tensor<B, 2> = Tensor::zeros([2, 3], &device);
        let targets: Tensor<B, 2> = Tensor::zeros([2, 4], &device);

        let _ = binary_cross_entropy_with_logits(logits, targets);
    }
}
