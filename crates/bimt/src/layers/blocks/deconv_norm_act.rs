//! # `DeconvNormAct2d` - transposed-conv/norm/activation block.
//!
//! The upsampling counterpart of
//! [`ConvNormAct2d`](crate::layers::blocks::conv_norm_act::ConvNormAct2d):
//! a [`ConvTranspose2d`] layer, a [`Normalization`] layer, and an
//! [`Activation`] layer in sequence.
//!
//! With kernel 3, stride 2, padding 1, and output padding 1, the block
//! exactly doubles spatial resolution; the generator's up-path relies on
//! this to undo its stride-2 down-path.

use crate::layers::activation::{Activation, ActivationConfig};
use crate::layers::norm::{Normalization, NormalizationConfig};
use bimm_contracts::{assert_shape_contract_periodically, unpack_shape_contract};
use burn::nn::conv::{ConvTranspose2d, ConvTranspose2dConfig};
use burn::prelude::{Backend, Config, Module, Tensor};

/// [`DeconvNormAct2d`] Meta.
pub trait DeconvNormAct2dMeta {
    /// Number of input channels.
    fn in_channels(&self) -> usize;

    /// Number of output channels.
    fn out_channels(&self) -> usize;

    /// Get the stride.
    fn stride(&self) -> [usize; 2];
}

/// [`DeconvNormAct2d`] Config.
///
/// Implements [`DeconvNormAct2dMeta`].
#[derive(Config, Debug)]
pub struct DeconvNormAct2dConfig {
    /// The [`ConvTranspose2d`] config.
    pub deconv: ConvTranspose2dConfig,

    /// The [`Normalization`] config.
    #[config(default = "NormalizationConfig::instance()")]
    pub norm: NormalizationConfig,

    /// The [`Activation`] config.
    #[config(default = "ActivationConfig::Relu")]
    pub act: ActivationConfig,
}

impl DeconvNormAct2dMeta for DeconvNormAct2dConfig {
    fn in_channels(&self) -> usize {
        self.deconv.channels[0]
    }

    fn out_channels(&self) -> usize {
        self.deconv.channels[1]
    }

    fn stride(&self) -> [usize; 2] {
        self.deconv.stride
    }
}

impl DeconvNormAct2dConfig {
    /// A resolution-doubling config: kernel 3, stride 2, padding 1,
    /// output padding 1.
    pub fn upsample_2x(channels: [usize; 2]) -> Self {
        Self::new(
            ConvTranspose2dConfig::new(channels, [3, 3])
                .with_stride([2, 2])
                .with_padding([1, 1])
                .with_padding_out([1, 1]),
        )
    }

    /// Initialize a [`DeconvNormAct2d`].
    ///
    /// Auto-matches the norm layer feature size
    /// to the deconv layer's output channels.
    pub fn init<B: Backend>(
        self,
        device: &B::Device,
    ) -> DeconvNormAct2d<B> {
        let channels = self.deconv.channels;
        let stride = self.deconv.stride;
        DeconvNormAct2d {
            channels,
            stride,
            deconv: self.deconv.init(device),
            norm: self.norm.with_num_features(channels[1]).init(device),
            act: self.act.init(device),
        }
    }
}

/// Sequenced transposed-conv/norm/activation block.
///
/// Implements [`DeconvNormAct2dMeta`].
#[derive(Module, Debug)]
pub struct DeconvNormAct2d<B: Backend> {
    /// ``[in_channels, out_channels]``.
    pub channels: [usize; 2],

    /// The deconv stride.
    pub stride: [usize; 2],

    /// Internal ConvTranspose2d layer.
    pub deconv: ConvTranspose2d<B>,

    /// Internal Norm layer.
    pub norm: Normalization<B>,

    /// Activation layer.
    pub act: Activation<B>,
}

impl<B: Backend> DeconvNormAct2dMeta for DeconvNormAct2d<B> {
    fn in_channels(&self) -> usize {
        self.channels[0]
    }

    fn out_channels(&self) -> usize {
        self.channels[1]
    }

    fn stride(&self) -> [usize; 2] {
        self.stride
    }
}

impl<B: Backend> DeconvNormAct2d<B> {
    /// Forward Pass.
    ///
    /// Assumes a resolution-multiplying deconv configuration
    /// (see [`DeconvNormAct2dConfig::upsample_2x`]).
    ///
    /// # Arguments
    ///
    /// - `input`: ``[batch, in_channels, in_height, in_width]``.
    ///
    /// # Returns
    ///
    /// ``[batch, out_channels, in_height*stride, in_width*stride]``
    pub fn forward(
        &self,
        input: Tensor<B, 4>,
    ) -> Tensor<B, 4> {
        let [batch, in_height, in_width] = unpack_shape_contract!(
            ["batch", "in_channels", "in_height", "in_width"],
            &input,
            &["batch", "in_height", "in_width"],
            &[("in_channels", self.in_channels())]
        );

        let x = self.deconv.forward(input);
        let x = self.norm.forward(x);
        let x = self.act.forward(x);

        assert_shape_contract_periodically!(
            [
                "batch",
                "out_channels",
                "out_height" = "in_height" * "height_stride",
                "out_width" = "in_width" * "width_stride"
            ],
            &x,
            &[
                ("batch", batch),
                ("out_channels", self.out_channels()),
                ("in_height", in_height),
                ("in_width", in_width),
                ("height_stride", self.stride()[0]),
                ("width_stride", self.stride()[1]),
            ]
        );

        x
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bimm_contracts::assert_shape_contract;
    use burn::backend::{Autodiff, NdArray};
    use burn::tensor::Distribution;

    #[test]
    fn test_upsample_config() {
        let config = DeconvNormAct2dConfig::upsample_2x([4, 2]);

        assert_eq!(config.in_channels(), 4);
        assert_eq!(config.out_channels(), 2);
        assert_eq!(config.stride(), [2, 2]);
    }

    #[test]
    fn test_deconv_norm_act_doubles_resolution() {
        type B = Autodiff<NdArray<f32>>;
        let device = Default::default();

        let layer: DeconvNormAct2d<B> = DeconvNormAct2dConfig::upsample_2x([4, 2]).init(&device);
        assert_eq!(layer.in_channels(), 4);
        assert_eq!(layer.out_channels(), 2);
        assert_eq!(layer.norm.num_features(), 2);

        let input = Tensor::random([2, 4, 5, 7], Distribution::Default, &device);
        let output = layer.forward(input);

        assert_shape_contract!(
            ["batch", "out_channels", "out_height", "out_width"],
            &output,
            &[
                ("batch", 2),
                ("out_channels", 2),
                ("out_height", 10),
                ("out_width", 14)
            ],
        );
    }
}
