//! Common low-level modules for composing translation networks in Burn.
pub mod activation;
pub mod blocks;
pub mod norm;
