//! # GAN objectives.
//!
//! [`GanLoss`] abstracts over the three usual adversarial objectives;
//! it builds the target label tensor to match the prediction, so callers
//! only pass the discriminator output and a real/fake flag.
//!
//! Do not put a sigmoid at the end of the discriminator:
//! [`GanLossMode::Lsgan`] needs none, and [`GanLossMode::Vanilla`]
//! folds it into the logits-form cross-entropy.

use crate::loss::bce::binary_cross_entropy_with_logits;
use anyhow::bail;
use burn::nn::loss::{MseLoss, Reduction};
use burn::prelude::{Backend, Config, Tensor};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The adversarial objective to optimize.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GanLossMode {
    /// Least-squares GAN; mean squared error against the label tensor.
    Lsgan,

    /// Standard GAN; binary cross-entropy with logits against the label tensor.
    Vanilla,

    /// Wasserstein critic loss (the gradient-penalty term is a training
    /// concern, not part of this objective).
    WganGp,
}

impl FromStr for GanLossMode {
    type Err = anyhow::Error;

    /// Parse a mode name.
    ///
    /// Accepts ``"lsgan"``, ``"vanilla"``, and ``"wgangp"``; the historical
    /// misspelling ``"vanila"`` is kept as an alias so existing
    /// configuration strings continue to parse.
    fn from_str(name: &str) -> Result<Self, Self::Err> {
        match name {
            "lsgan" => Ok(GanLossMode::Lsgan),
            "vanilla" | "vanila" => Ok(GanLossMode::Vanilla),
            "wgangp" => Ok(GanLossMode::WganGp),
            _ => bail!("gan mode [{name}] is not implemented"),
        }
    }
}

impl fmt::Display for GanLossMode {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.write_str(match self {
            GanLossMode::Lsgan => "lsgan",
            GanLossMode::Vanilla => "vanilla",
            GanLossMode::WganGp => "wgangp",
        })
    }
}

/// [`GanLoss`] Config.
#[derive(Config, Debug)]
pub struct GanLossConfig {
    /// The adversarial objective.
    pub mode: GanLossMode,

    /// Label value for real images.
    #[config(default = 1.0)]
    pub real_label: f64,

    /// Label value for fake images.
    #[config(default = 0.0)]
    pub fake_label: f64,
}

impl GanLossConfig {
    /// Initialize a [`GanLoss`].
    pub fn init(&self) -> GanLoss {
        GanLoss {
            mode: self.mode,
            real_label: self.real_label,
            fake_label: self.fake_label,
        }
    }
}

/// Adversarial loss over discriminator predictions.
///
/// Stateless beyond its configuration.
#[derive(Debug, Clone)]
pub struct GanLoss {
    /// The adversarial objective.
    pub mode: GanLossMode,

    /// Label value for real images.
    pub real_label: f64,

    /// Label value for fake images.
    pub fake_label: f64,
}

impl GanLoss {
    /// Create the loss with default labels (real 1.0, fake 0.0).
    pub fn new(mode: GanLossMode) -> Self {
        GanLossConfig::new(mode).init()
    }

    /// Build a label tensor shaped like the prediction.
    pub fn target_tensor<B: Backend, const D: usize>(
        &self,
        prediction: &Tensor<B, D>,
        target_is_real: bool,
    ) -> Tensor<B, D> {
        let label = if target_is_real {
            self.real_label
        } else {
            self.fake_label
        };
        prediction.ones_like().mul_scalar(label)
    }

    /// Compute the loss for a batch of discriminator predictions.
    ///
    /// # Arguments
    ///
    /// - `prediction`: discriminator output; a prediction map or any
    ///   other shape.
    /// - `target_is_real`: whether the ground truth labels the batch
    ///   as real.
    ///
    /// # Returns
    ///
    /// A scalar loss tensor.
    pub fn forward<B: Backend, const D: usize>(
        &self,
        prediction: Tensor<B, D>,
        target_is_real: bool,
    ) -> Tensor<B, 1> {
        match self.mode {
            GanLossMode::Lsgan => {
                let target = self.target_tensor(&prediction, target_is_real);
                MseLoss::new().forward(prediction, target, Reduction::Mean)
            }
            GanLossMode::Vanilla => {
                let target = self.target_tensor(&prediction, target_is_real);
                binary_cross_entropy_with_logits(prediction, target)
            }
            GanLossMode::WganGp => {
                if target_is_real {
                    prediction.mean().neg()
                } else {
                    prediction.mean()
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;
    use hamcrest::prelude::*;

    type B = NdArray<f32>;

    #[test]
    fn test_mode_parsing() {
        assert_eq!("lsgan".parse::<GanLossMode>().unwrap(), GanLossMode::Lsgan);
        assert_eq!(
            "vanilla".parse::<GanLossMode>().unwrap(),
            GanLossMode::Vanilla
        );
        // Legacy alias.
        assert_eq!(
            "vanila".parse::<GanLossMode>().unwrap(),
            GanLossMode::Vanilla
        );
        assert_eq!(
            "wgangp".parse::<GanLossMode>().unwrap(),
            GanLossMode::WganGp
        );

        assert!("dcgan".parse::<GanLossMode>().is_err());
        assert!("".parse::<GanLossMode>().is_err());
    }

    #[test]
    fn test_mode_display() {
        assert_eq!(GanLossMode::Lsgan.to_string(), "lsgan");
        // Display always emits the corrected spelling.
        assert_eq!(GanLossMode::Vanilla.to_string(), "vanilla");
        assert_eq!(GanLossMode::WganGp.to_string(), "wgangp");
    }

    #[test]
    fn test_target_tensor() {
        let device = Default::default();
        let loss = GanLoss::new(GanLossMode::Lsgan);

        let prediction: Tensor<B, 3> = Tensor::zeros([2, 3, 4], &device);

        let real = loss.target_tensor(&prediction, true);
        real.to_data()
            .assert_eq(&prediction.ones_like().to_data(), true);

        let fake = loss.target_tensor(&prediction, false);
        fake.to_data()
            .assert_eq(&prediction.zeros_like().to_data(), true);
    }

    #[test]
    fn test_lsgan_zero_at_target() {
        let device = Default::default();
        let loss = GanLoss::new(GanLossMode::Lsgan);

        // Predictions exactly at the real label.
        let prediction: Tensor<B, 4> = Tensor::ones([2, 1, 3, 3], &device);
        let value: f32 = loss.forward(prediction, true).into_scalar();

        assert_that!(value as f64, is(close_to(0.0, 1e-7)));
    }

    #[test]
    fn test_lsgan_squared_error() {
        let device = Default::default();
        let loss = GanLoss::new(GanLossMode::Lsgan);

        // Predictions at the real label, scored against the fake label.
        let prediction: Tensor<B, 2> = Tensor::ones([2, 2], &device);
        let value: f32 = loss.forward(prediction, false).into_scalar();

        assert_that!(value as f64, is(close_to(1.0, 1e-6)));
    }

    #[test]
    fn test_wgangp_signed_mean() {
        let device = Default::default();
        let loss = GanLoss::new(GanLossMode::WganGp);

        let prediction: Tensor<B, 2> =
            Tensor::from_data([[1.0, 2.0], [3.0, -2.0]], &device);
        let mean: f32 = prediction.clone().mean().into_scalar();

        let real: f32 = loss.forward(prediction.clone(), true).into_scalar();
        let fake: f32 = loss.forward(prediction, false).into_scalar();

        assert_that!(real as f64, is(close_to(-mean as f64, 1e-6)));
        assert_that!(fake as f64, is(close_to(mean as f64, 1e-6)));
    }

    #[test]
    fn test_vanilla_matches_explicit_bce() {
        let device = Default::default();
        let loss = GanLoss::new(GanLossMode::Vanilla);

        let prediction: Tensor<B, 2> =
            Tensor::from_data([[-1.0, 0.5], [2.0, 0.0]], &device);

        let expected: f32 = binary_cross_entropy_with_logits(
            prediction.clone(),
            prediction.ones_like(),
        )
        .into_scalar();

        let actual: f32 = loss.forward(prediction, true).into_scalar();

        assert_that!(actual as f64, is(close_to(expected as f64, 1e-6)));
    }

    #[test]
    fn test_custom_labels() {
        let device = Default::default();
        let loss = GanLossConfig::new(GanLossMode::Lsgan)
            .with_real_label(0.9)
            .with_fake_label(0.1)
            .init();

        let prediction: Tensor<B, 2> = Tensor::zeros([1, 4], &device);

        let target = loss.target_tensor(&prediction, true);
        let value: f32 = target.mean().into_scalar();
        assert_that!(value as f64, is(close_to(0.9, 1e-6)));

        let target = loss.target_tensor(&prediction, false);
        let value: f32 = target.mean().into_scalar();
        assert_that!(value as f64, is(close_to(0.1, 1e-6)));
    }
}
