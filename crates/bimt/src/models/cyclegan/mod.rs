//! # `CycleGAN` translation networks.
//!
//! * [`generator`] - resnet-bottleneck translation generator.
//! * [`resnet_block`] - the generator's residual unit.
//! * [`discriminator`] - `PatchGAN` and per-pixel discriminators.
//!
//! The adversarial objectives these train against live in
//! [`crate::loss::gan`].

pub mod discriminator;
pub mod generator;
pub mod resnet_block;
