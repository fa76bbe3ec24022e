//! Adversarial and reconstruction losses.
pub mod bce;
pub mod gan;
pub mod l1;
