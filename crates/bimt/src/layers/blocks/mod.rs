//! Composite conv blocks.
pub mod conv_norm_act;
pub mod deconv_norm_act;
