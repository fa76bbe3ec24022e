//! # Resnet translation generator.
//!
//! [`ResnetGenerator`] maps an image to a translated image of the same
//! shape: a 7x7 stem, two stride-2 downsampling stages, a stack of
//! residual blocks at the bottleneck width, two stride-2 upsampling
//! stages, and a 7x7 head with a tanh saturation; the pipeline output is
//! added to the input (a global skip connection).
//!
//! The skip connection pins the contract: `input_nc == output_nc`, and
//! spatial size must be a multiple of the total downsampling stride (4).

use crate::layers::activation::{Activation, ActivationConfig};
use crate::layers::blocks::conv_norm_act::{ConvNormAct2d, NormActPolicyConfig};
use crate::layers::blocks::deconv_norm_act::{DeconvNormAct2d, DeconvNormAct2dConfig};
use crate::layers::norm::NormalizationConfig;
use crate::models::cyclegan::resnet_block::{ResnetBlock, ResnetBlockConfig};
use bimm_contracts::{assert_shape_contract_periodically, unpack_shape_contract};
use burn::nn::conv::{Conv2d, Conv2dConfig};
use burn::nn::PaddingConfig2d;
use burn::prelude::{Backend, Config, Module, Tensor};

/// Number of stride-2 stages on each side of the bottleneck.
const NUM_SCALE_STAGES: usize = 2;

/// Total spatial downsampling factor at the bottleneck.
const SCALE_FACTOR: usize = 1 << NUM_SCALE_STAGES;

/// [`ResnetGenerator`] Meta trait.
pub trait ResnetGeneratorMeta {
    /// Input image channel count.
    fn input_nc(&self) -> usize;

    /// Output image channel count.
    ///
    /// Equals `input_nc`; the global skip connection adds the input
    /// to the pipeline output.
    fn output_nc(&self) -> usize;

    /// Base filter count.
    fn ngf(&self) -> usize;

    /// Number of residual blocks at the bottleneck.
    fn n_blocks(&self) -> usize;

    /// Channel count at the bottleneck.
    ///
    /// ``bottleneck_channels = ngf * 4``
    fn bottleneck_channels(&self) -> usize {
        self.ngf() * SCALE_FACTOR
    }
}

/// [`ResnetGenerator`] Config.
///
/// Implements [`ResnetGeneratorMeta`].
#[derive(Config, Debug)]
pub struct ResnetGeneratorConfig {
    /// Input image channel count.
    pub input_nc: usize,

    /// Output image channel count; must equal `input_nc`.
    pub output_nc: usize,

    /// Base filter count.
    #[config(default = 64)]
    pub ngf: usize,

    /// Number of residual blocks at the bottleneck.
    #[config(default = 6)]
    pub n_blocks: usize,

    /// Insert dropout inside the residual blocks.
    #[config(default = true)]
    pub use_dropout: bool,

    /// Norm layer config; feature size is rebound per stage.
    #[config(default = "NormalizationConfig::instance()")]
    pub norm: NormalizationConfig,

    /// Activation for the stem and scale stages.
    #[config(default = "ActivationConfig::Relu")]
    pub act: ActivationConfig,
}

impl ResnetGeneratorMeta for ResnetGeneratorConfig {
    fn input_nc(&self) -> usize {
        self.input_nc
    }

    fn output_nc(&self) -> usize {
        self.output_nc
    }

    fn ngf(&self) -> usize {
        self.ngf
    }

    fn n_blocks(&self) -> usize {
        self.n_blocks
    }
}

impl ResnetGeneratorConfig {
    /// Initialize a [`ResnetGenerator`].
    ///
    /// # Panics
    ///
    /// If `input_nc != output_nc`; the skip connection requires matching
    /// channel counts.
    pub fn init<B: Backend>(
        self,
        device: &B::Device,
    ) -> ResnetGenerator<B> {
        assert_eq!(
            self.input_nc, self.output_nc,
            "the generator's skip connection requires input_nc == output_nc",
        );

        let ngf = self.ngf;

        let policy = NormActPolicyConfig::new()
            .with_norm(self.norm.clone())
            .with_act(self.act.clone());

        let stem = policy.with_conv(
            Conv2dConfig::new([self.input_nc, ngf], [7, 7])
                .with_padding(PaddingConfig2d::Explicit(3, 3)),
        );

        let down = (0..NUM_SCALE_STAGES)
            .map(|i| {
                let mult = 1 << i;
                policy.with_conv(
                    Conv2dConfig::new([ngf * mult, ngf * mult * 2], [3, 3])
                        .with_stride([2, 2])
                        .with_padding(PaddingConfig2d::Explicit(1, 1)),
                )
            })
            .collect::<Vec<_>>();

        let blocks = (0..self.n_blocks)
            .map(|_| {
                ResnetBlockConfig::new(self.bottleneck_channels())
                    .with_use_dropout(self.use_dropout)
                    .with_norm(self.norm.clone())
                    .with_act(self.act.clone())
            })
            .collect::<Vec<_>>();

        let up = (0..NUM_SCALE_STAGES)
            .map(|i| {
                let mult = 1 << (NUM_SCALE_STAGES - i);
                DeconvNormAct2dConfig::upsample_2x([ngf * mult, ngf * mult / 2])
                    .with_norm(self.norm.clone())
                    .with_act(self.act.clone())
            })
            .collect::<Vec<_>>();

        let head = Conv2dConfig::new([ngf, self.output_nc], [7, 7])
            .with_padding(PaddingConfig2d::Explicit(3, 3));

        ResnetGenerator {
            input_nc: self.input_nc,
            n_blocks: self.n_blocks,

            stem: stem.init(device),
            down: down.into_iter().map(|cfg| cfg.init(device)).collect(),
            blocks: blocks.into_iter().map(|cfg| cfg.init(device)).collect(),
            up: up.into_iter().map(|cfg| cfg.init(device)).collect(),
            head: head.init(device),
            saturate: ActivationConfig::Tanh.init(device),
        }
    }
}

/// Resnet translation generator.
///
/// Implements [`ResnetGeneratorMeta`].
#[derive(Module, Debug)]
pub struct ResnetGenerator<B: Backend> {
    /// Input image channel count.
    pub input_nc: usize,

    /// Number of residual blocks.
    pub n_blocks: usize,

    /// 7x7 stem conv/norm/act.
    pub stem: ConvNormAct2d<B>,

    /// Stride-2 downsampling stages.
    pub down: Vec<ConvNormAct2d<B>>,

    /// Residual blocks at the bottleneck width.
    pub blocks: Vec<ResnetBlock<B>>,

    /// Stride-2 upsampling stages.
    pub up: Vec<DeconvNormAct2d<B>>,

    /// 7x7 head conv to the output channel count.
    pub head: Conv2d<B>,

    /// Saturating output activation (tanh).
    pub saturate: Activation<B>,
}

impl<B: Backend> ResnetGeneratorMeta for ResnetGenerator<B> {
    fn input_nc(&self) -> usize {
        self.input_nc
    }

    fn output_nc(&self) -> usize {
        self.head.weight.shape().dims[0]
    }

    fn ngf(&self) -> usize {
        self.head.weight.shape().dims[1]
    }

    fn n_blocks(&self) -> usize {
        self.n_blocks
    }
}

impl<B: Backend> ResnetGenerator<B> {
    /// Forward Pass.
    ///
    /// # Arguments
    ///
    /// - `input`: ``[batch, input_nc, height, width]``; `height` and
    ///   `width` must be multiples of 4 (two stride-2 stages each way).
    ///
    /// # Returns
    ///
    /// ``input + pipeline(input)``; a ``[batch, output_nc, height, width]``
    /// tensor.
    pub fn forward(
        &self,
        input: Tensor<B, 4>,
    ) -> Tensor<B, 4> {
        let [batch, base_height, base_width] = unpack_shape_contract!(
            [
                "batch",
                "channels",
                "height" = "base_height" * "scale",
                "width" = "base_width" * "scale"
            ],
            &input,
            &["batch", "base_height", "base_width"],
            &[("channels", self.input_nc()), ("scale", SCALE_FACTOR)],
        );

        let mut x = self.stem.forward(input.clone());

        for stage in &self.down {
            x = stage.forward(x);
        }
        for block in &self.blocks {
            x = block.forward(x);
        }
        for stage in &self.up {
            x = stage.forward(x);
        }

        let x = self.head.forward(x);
        let x = self.saturate.forward(x);

        assert_shape_contract_periodically!(
            [
                "batch",
                "channels",
                "height" = "base_height" * "scale",
                "width" = "base_width" * "scale"
            ],
            &x,
            &[
                ("batch", batch),
                ("channels", self.output_nc()),
                ("base_height", base_height),
                ("base_width", base_width),
                ("scale", SCALE_FACTOR),
            ]
        );

        input + x
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bimm_contracts::assert_shape_contract;
    use burn::backend::{Autodiff, NdArray};
    use burn::tensor::Distribution;

    #[test]
    fn test_generator_config() {
        let config = ResnetGeneratorConfig::new(3, 3);
        assert_eq!(config.input_nc(), 3);
        assert_eq!(config.output_nc(), 3);
        assert_eq!(config.ngf(), 64);
        assert_eq!(config.n_blocks(), 6);
        assert_eq!(config.bottleneck_channels(), 256);
        assert!(config.use_dropout);

        let config = config.with_ngf(8).with_n_blocks(2).with_use_dropout(false);
        assert_eq!(config.bottleneck_channels(), 32);
        assert!(!config.use_dropout);
    }

    #[test]
    #[should_panic(expected = "input_nc == output_nc")]
    fn test_channel_mismatch_panics() {
        type B = NdArray<f32>;
        let device = Default::default();

        let _gen: ResnetGenerator<B> = ResnetGeneratorConfig::new(3, 1).init(&device);
    }

    #[test]
    fn test_generator_preserves_shape() {
        type B = Autodiff<NdArray<f32>>;
        let device = Default::default();

        let generator: ResnetGenerator<B> = ResnetGeneratorConfig::new(3, 3)
            .with_ngf(4)
            .with_n_blocks(2)
            .init(&device);

        assert_eq!(generator.input_nc(), 3);
        assert_eq!(generator.output_nc(), 3);
        assert_eq!(generator.ngf(), 4);
        assert_eq!(generator.n_blocks(), 2);
        assert_eq!(generator.blocks.len(), 2);

        let input = Tensor::random([2, 3, 8, 12], Distribution::Default, &device);
        let output = generator.forward(input);

        assert_shape_contract!(
            ["batch", "channels", "height", "width"],
            &output,
            &[("batch", 2), ("channels", 3), ("height", 8), ("width", 12)],
        );
    }

    #[test]
    fn test_record_roundtrip() {
        type B = NdArray<f32>;
        let device = Default::default();

        let config = ResnetGeneratorConfig::new(3, 3)
            .with_ngf(2)
            .with_n_blocks(1)
            .with_use_dropout(false);
        let source: ResnetGenerator<B> = config.clone().init(&device);

        let input = Tensor::random([1, 3, 8, 8], Distribution::Default, &device);
        let output1 = source.forward(input.clone());

        let record = source.into_record();
        let reloaded: ResnetGenerator<B> = config.init(&device).load_record(record);
        let output2 = reloaded.forward(input);

        output1.to_data().assert_eq(&output2.to_data(), true);
    }

    #[test]
    fn test_generator_output_is_input_plus_saturated_pipeline() {
        type B = NdArray<f32>;
        let device = Default::default();

        let generator: ResnetGenerator<B> = ResnetGeneratorConfig::new(1, 1)
            .with_ngf(2)
            .with_n_blocks(1)
            .with_use_dropout(false)
            .init(&device);

        let input = Tensor::random([1, 1, 4, 4], Distribution::Default, &device);
        let output = generator.forward(input.clone());

        // The pipeline output is tanh-bounded, so the result stays within
        // 1.0 of the input everywhere.
        let deviation: f32 = (output - input).abs().max().into_scalar();
        assert!(deviation <= 1.0 + 1e-6, "deviation {deviation}");
    }
}
