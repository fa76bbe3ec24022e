//! # Residual block for the translation generator.
//!
//! [`ResnetBlock`] is two channel-preserving 3x3 conv/norm stages with an
//! identity skip connection. The first stage carries an activation; the
//! second does not (the block output is ``input + stage2(stage1(input))``
//! with no trailing nonlinearity). Optional dropout sits between the
//! stages.
//!
//! [`ResnetBlockConfig`] implements [`Config`], and provides
//! [`ResnetBlockConfig::init`] to initialize a [`ResnetBlock`].

use crate::layers::activation::ActivationConfig;
use crate::layers::blocks::conv_norm_act::{
    ConvNormAct2d, ConvNormAct2dConfig, ConvNormAct2dMeta, NormActPolicyConfig,
};
use crate::layers::norm::NormalizationConfig;
use bimm_contracts::{assert_shape_contract_periodically, unpack_shape_contract};
use burn::nn::conv::Conv2dConfig;
use burn::nn::{Dropout, DropoutConfig, PaddingConfig2d};
use burn::prelude::{Backend, Config, Module, Tensor};

/// [`ResnetBlock`] Meta trait.
pub trait ResnetBlockMeta {
    /// The feature channel count; preserved by the block.
    fn channels(&self) -> usize;
}

/// [`ResnetBlock`] Config.
///
/// Implements [`ResnetBlockMeta`].
#[derive(Config, Debug)]
pub struct ResnetBlockConfig {
    /// The feature channel count.
    pub channels: usize,

    /// Insert a dropout layer between the two conv stages.
    #[config(default = false)]
    pub use_dropout: bool,

    /// Dropout probability, when enabled.
    #[config(default = 0.5)]
    pub dropout_prob: f64,

    /// Norm layer config; feature size is rebound per stage.
    #[config(default = "NormalizationConfig::instance()")]
    pub norm: NormalizationConfig,

    /// Activation for the first stage.
    #[config(default = "ActivationConfig::Relu")]
    pub act: ActivationConfig,
}

impl ResnetBlockMeta for ResnetBlockConfig {
    fn channels(&self) -> usize {
        self.channels
    }
}

impl ResnetBlockConfig {
    /// Initialize a [`ResnetBlock`].
    pub fn init<B: Backend>(
        self,
        device: &B::Device,
    ) -> ResnetBlock<B> {
        let conv = || {
            Conv2dConfig::new([self.channels, self.channels], [3, 3])
                .with_padding(PaddingConfig2d::Explicit(1, 1))
        };

        let policy = NormActPolicyConfig::new()
            .with_norm(self.norm.clone())
            .with_act(self.act.clone());

        ResnetBlock {
            cna1: policy.with_conv(conv()).init(device),

            dropout: self
                .use_dropout
                .then(|| DropoutConfig::new(self.dropout_prob).init()),

            cna2: ConvNormAct2dConfig::new(conv())
                .with_norm(self.norm)
                .with_act(ActivationConfig::Identity)
                .init(device),
        }
    }
}

/// Residual block; output shape equals input shape.
///
/// Implements [`ResnetBlockMeta`].
#[derive(Module, Debug)]
pub struct ResnetBlock<B: Backend> {
    /// First conv/norm/act stage.
    pub cna1: ConvNormAct2d<B>,

    /// Optional dropout between the stages.
    pub dropout: Option<Dropout>,

    /// Second conv/norm stage; identity activation.
    pub cna2: ConvNormAct2d<B>,
}

impl<B: Backend> ResnetBlockMeta for ResnetBlock<B> {
    fn channels(&self) -> usize {
        self.cna1.in_channels()
    }
}

impl<B: Backend> ResnetBlock<B> {
    /// Forward Pass.
    ///
    /// # Arguments
    ///
    /// - `input`: ``[batch, channels, height, width]``.
    ///
    /// # Returns
    ///
    /// ``input + block(input)``; a ``[batch, channels, height, width]`` tensor.
    pub fn forward(
        &self,
        input: Tensor<B, 4>,
    ) -> Tensor<B, 4> {
        let [batch, height, width] = unpack_shape_contract!(
            ["batch", "channels", "height", "width"],
            &input,
            &["batch", "height", "width"],
            &[("channels", self.channels())],
        );

        let identity = input.clone();

        let x = self.cna1.forward(input);

        let x = match &self.dropout {
            Some(dropout) => dropout.forward(x),
            None => x,
        };

        // The skip add lands between norm and (identity) activation.
        let x = self.cna2.hook_forward(x, |x| x + identity);

        assert_shape_contract_periodically!(
            ["batch", "channels", "height", "width"],
            &x,
            &[
                ("batch", batch),
                ("channels", self.channels()),
                ("height", height),
                ("width", width)
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

    #[test]
    fn test_resnet_block_config() {
        let config = ResnetBlockConfig::new(8);
        assert_eq!(config.channels(), 8);
        assert!(!config.use_dropout);
        assert_eq!(config.dropout_prob, 0.5);

        let config = config.with_use_dropout(true);
        assert!(config.use_dropout);
    }

    #[test]
    fn test_resnet_block_preserves_shape() {
        type B = Autodiff<NdArray<f32>>;
        let device = Default::default();

        let channels = 4;
        let block: ResnetBlock<B> = ResnetBlockConfig::new(channels).init(&device);
        assert_eq!(block.channels(), channels);
        assert!(block.dropout.is_none());

        let input = Tensor::ones([2, channels, 7, 5], &device);
        let output = block.forward(input);

        assert_shape_contract!(
            ["batch", "channels", "height", "width"],
            &output,
            &[
                ("batch", 2),
                ("channels", channels),
                ("height", 7),
                ("width", 5)
            ],
        );
    }

    #[test]
    fn test_resnet_block_with_dropout() {
        type B = NdArray<f32>;
        let device = Default::default();

        let channels = 2;
        let block: ResnetBlock<B> = ResnetBlockConfig::new(channels)
            .with_use_dropout(true)
            .init(&device);
        assert!(block.dropout.is_some());

        let input = Tensor::ones([1, channels, 4, 4], &device);
        let output = block.forward(input);

        assert_shape_contract!(
            ["batch", "channels", "height", "width"],
            &output,
            &[
                ("batch", 1),
                ("channels", channels),
                ("height", 4),
                ("width", 4)
            ],
        );
    }

    #[test]
    fn test_record_roundtrip() {
        type B = NdArray<f32>;
        let device = Default::default();

        let config = ResnetBlockConfig::new(3);
        let source: ResnetBlock<B> = config.clone().init(&device);

        let input = Tensor::random([2, 3, 6, 6], burn::tensor::Distribution::Default, &device);
        let output1 = source.forward(input.clone());

        let record = source.into_record();
        let reloaded: ResnetBlock<B> = config.init(&device).load_record(record);
        let output2 = reloaded.forward(input);

        output1.to_data().assert_eq(&output2.to_data(), true);
    }

    #[test]
    fn test_second_stage_has_no_activation() {
        type B = NdArray<f32>;
        let device = Default::default();

        let block: ResnetBlock<B> = ResnetBlockConfig::new(2).init(&device);

        // Residual output must be able to go negative; an activation on
        // stage two would clamp it.
        let input = Tensor::from_data(
            [[
                [[-2.0, -2.0], [-2.0, -2.0]],
                [[-2.0, -2.0], [-2.0, -2.0]],
            ]],
            &device,
        );
        let output = block.forward(input);

        let min: f32 = output.min().into_scalar();
        assert!(min < 0.0, "expected negative values, min was {min}");
    }
}
