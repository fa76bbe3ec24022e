//! Complete model families.
pub mod cyclegan;
