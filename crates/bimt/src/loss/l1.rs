//! # L1 (mean absolute error) loss.
//!
//! Used for the cycle-consistency and identity terms of translation
//! training; follows the API shape of [`burn::nn::loss::MseLoss`].

use burn::nn::loss::Reduction;
use burn::prelude::{Backend, Tensor};

/// L1 loss over elementwise prediction/target differences.
#[derive(Debug, Clone, Default)]
pub struct L1Loss {}

impl L1Loss {
    /// Create the loss.
    pub fn new() -> Self {
        Self {}
    }

    /// Compute the reduced loss.
    ///
    /// [`Reduction::Auto`] reduces by mean.
    ///
    /// # Panics
    ///
    /// If `predictions` and `targets` differ in shape.
    pub fn forward<B: Backend, const D: usize>(
        &self,
        predictions: Tensor<B, D>,
        targets: Tensor<B, D>,
        reduction: Reduction,
    ) -> Tensor<B, 1> {
        let loss = self.forward_no_reduction(predictions, targets);
        match reduction {
            Reduction::Mean | Reduction::Auto => loss.mean(),
            Reduction::Sum => loss.sum(),
        }
    }

    /// Compute the elementwise loss ``|predictions - targets|``.
    ///
    /// # Panics
    ///
    /// If `predictions` and `targets` differ in shape.
    pub fn forward_no_reduction<B: Backend, const D: usize>(
        &self,
        predictions: Tensor<B, D>,
        targets: Tensor<B, D>,
    ) -> Tensor<B, D> {
        assert_eq!(
            targets.dims(),
            predictions.dims(),
            "Target size {:?} must be the same as input size {:?}",
            targets.dims(),
            predictions.dims(),
        );
        (predictions - targets).abs()
    }
}
