#![warn(missing_docs)]
//!# bimt - Burn Image Translation Models
//!
//! Model components for CycleGAN-style image-to-image translation.
//!
//! ## Notable Components
//!
//! * [`layers`] - reusable neural network modules.
//!   * [`layers::activation`] - activation layer abstraction wrapper.
//!   * [`layers::norm`] - norm layer abstraction wrapper.
//!   * [`layers::blocks`] - miscellaneous blocks.
//!     * [`layers::blocks::conv_norm_act`] - ``Conv2d + Norm + Act`` block.
//!     * [`layers::blocks::deconv_norm_act`] - ``ConvTranspose2d + Norm + Act`` block.
//! * [`loss`] - adversarial and reconstruction losses.
//!   * [`loss::gan`] - lsgan / vanilla / wgan-gp adversarial objectives.
//!   * [`loss::bce`] - stable binary cross-entropy with logits.
//!   * [`loss::l1`] - mean absolute error.
//! * [`models`] - complete model families.
//!   * [`models::cyclegan`] - translation generator and discriminators.

/// Test-only macro import.
#[cfg(test)]
#[allow(unused_imports)]
#[macro_use]
extern crate hamcrest;

pub mod layers;
pub mod loss;
pub mod models;
