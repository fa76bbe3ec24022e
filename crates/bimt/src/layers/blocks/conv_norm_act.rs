//! # `ConvNormAct2d` - conv/norm/activation block.
//!
//! A [`ConvNormAct2d`] module is:
//! * a [`Conv2d`] layer,
//! * a [`Normalization`] layer,
//! * an [`Activation`] layer.
//!
//! With support for hooking the forward method,
//! to run code between the norm and activation layers.

use crate::layers::activation::{Activation, ActivationConfig};
use crate::layers::norm::{Normalization, NormalizationConfig};
use bimm_contracts::{assert_shape_contract_periodically, unpack_shape_contract};
use burn::nn::conv::{Conv2d, Conv2dConfig};
use burn::prelude::{Backend, Config, Module, Tensor};

/// Norm/activation policy for [`ConvNormAct2d`] blocks.
///
/// Models that stack several [`ConvNormAct2d`] blocks share one policy
/// and lift it onto each [`Conv2dConfig`]; the norm feature size is
/// rebound to the conv's output channels.
#[derive(Config, Debug)]
pub struct NormActPolicyConfig {
    /// The [`Normalization`] config.
    #[config(default = "NormalizationConfig::instance()")]
    pub norm: NormalizationConfig,

    /// The [`Activation`] config.
    #[config(default = "ActivationConfig::Relu")]
    pub act: ActivationConfig,
}

impl NormActPolicyConfig {
    /// Lift this policy onto a [`Conv2dConfig`].
    pub fn with_conv(
        &self,
        conv: Conv2dConfig,
    ) -> ConvNormAct2dConfig {
        ConvNormAct2dConfig {
            conv,
            norm: self.norm.clone(),
            act: self.act.clone(),
        }
        .match_norm_features()
    }
}

/// [`ConvNormAct2d`] Meta.
pub trait ConvNormAct2dMeta {
    /// Number of input channels.
    fn in_channels(&self) -> usize;

    /// Number of output channels.
    fn out_channels(&self) -> usize;

    /// Get the stride.
    fn stride(&self) -> [usize; 2];
}

/// [`ConvNormAct2d`] Config.
///
/// Implements [`ConvNormAct2dMeta`].
#[derive(Config, Debug)]
pub struct ConvNormAct2dConfig {
    /// The [`Conv2d`] config.
    pub conv: Conv2dConfig,

    /// The [`Normalization`] config.
    #[config(default = "NormalizationConfig::instance()")]
    pub norm: NormalizationConfig,

    /// The [`Activation`] config.
    #[config(default = "ActivationConfig::Relu")]
    pub act: ActivationConfig,
}

impl ConvNormAct2dMeta for ConvNormAct2dConfig {
    fn in_channels(&self) -> usize {
        self.conv.channels[0]
    }

    fn out_channels(&self) -> usize {
        self.conv.channels[1]
    }

    fn stride(&self) -> [usize; 2] {
        self.conv.stride
    }
}

impl ConvNormAct2dConfig {
    /// Initialize a [`ConvNormAct2d`].
    ///
    /// Auto-matches the norm layer feature size
    /// to the conv layer's output channels.
    pub fn init<B: Backend>(
        self,
        device: &B::Device,
    ) -> ConvNormAct2d<B> {
        let cfg = self.match_norm_features();
        ConvNormAct2d {
            conv: cfg.conv.init(device),
            norm: cfg.norm.init(device),
            act: cfg.act.init(device),
        }
    }

    /// Adjust the norm features to match the conv output size.
    ///
    /// [`ConvNormAct2dConfig::init`] does this automatically.
    pub fn match_norm_features(self) -> Self {
        let features = self.out_channels();
        let norm = self.norm.with_num_features(features);
        Self { norm, ..self }
    }
}

/// Sequenced conv/norm/activation block.
///
/// Implements [`ConvNormAct2dMeta`].
#[derive(Module, Debug)]
pub struct ConvNormAct2d<B: Backend> {
    /// Internal Conv2d layer.
    pub conv: Conv2d<B>,

    /// Internal Norm layer.
    pub norm: Normalization<B>,

    /// Activation layer.
    pub act: Activation<B>,
}

impl<B: Backend> ConvNormAct2dMeta for ConvNormAct2d<B> {
    fn in_channels(&self) -> usize {
        self.conv.weight.shape().dims[1] * self.conv.groups
    }

    fn out_channels(&self) -> usize {
        self.conv.weight.shape().dims[0]
    }

    fn stride(&self) -> [usize; 2] {
        self.conv.stride
    }
}

impl<B: Backend> ConvNormAct2d<B> {
    /// Forward Pass.
    ///
    /// # Arguments
    ///
    /// - `input`: \
    ///   ``[batch, in_channels, in_height=out_height*stride, in_width=out_width*stride]``.
    ///
    /// # Returns
    ///
    /// ``[batch, out_channels, out_height, out_width]``
    pub fn forward(
        &self,
        input: Tensor<B, 4>,
    ) -> Tensor<B, 4> {
        self.hook_forward(input, |x| x)
    }

    /// Hooked Forward Pass.
    ///
    /// Applies the hook after normalization but before activation:
    ///
    /// ```rust,ignore
    /// let x = self.conv.forward(input);
    /// let x = self.norm.forward(x);
    /// let x = hook(x);
    /// self.act.forward(x)
    /// ```
    ///
    /// Residual blocks use the hook to fold the identity back in
    /// ahead of the activation.
    pub fn hook_forward<F>(
        &self,
        input: Tensor<B, 4>,
        hook: F,
    ) -> Tensor<B, 4>
    where
        F: FnOnce(Tensor<B, 4>) -> Tensor<B, 4>,
    {
        let [batch, out_height, out_width] = unpack_shape_contract!(
            [
                "batch",
                "in_channels",
                "in_height" = "out_height" * "height_stride",
                "in_width" = "out_width" * "width_stride"
            ],
            &input,
            &["batch", "out_height", "out_width"],
            &[
                ("in_channels", self.in_channels()),
                ("height_stride", self.stride()[0]),
                ("width_stride", self.stride()[1]),
            ]
        );

        let x = self.conv.forward(input);
        let x = self.norm.forward(x);
        let x = hook(x);
        let x = self.act.forward(x);

        assert_shape_contract_periodically!(
            ["batch", "out_channels", "out_height", "out_width"],
            &x,
            &[
                ("batch", batch),
                ("out_channels", self.out_channels()),
                ("out_height", out_height),
                ("out_width", out_width)
            ]
        );

        x
    }
}
