//! # Translation discriminators.
//!
//! Two architectures, selected by [`DiscriminatorConfig`]:
//!
//! * [`PatchDiscriminator`] - the `PatchGAN`: a stack of stride-2 4x4
//!   convs producing a single-channel prediction map, each cell scoring
//!   one receptive-field patch of the input.
//! * [`PixelDiscriminator`] - 1x1 convs only; scores every pixel
//!   independently, preserving spatial size.
//!
//! [`DiscriminatorConfig::from_name`] maps the conventional
//! configuration names (``"basic"``, ``"n_layers"``, ``"pixel"``) onto
//! these; unrecognized names fail there, at configuration time.
//!
//! Higher output values read as "more real"; scale and sign conventions
//! come from the [`crate::loss::gan::GanLossMode`] trained against.
//! Do not append a sigmoid (see [`crate::loss::gan`]).

use crate::layers::activation::{Activation, ActivationConfig};
use crate::layers::blocks::conv_norm_act::{ConvNormAct2d, NormActPolicyConfig};
use crate::layers::norm::NormalizationConfig;
use anyhow::bail;
use bimm_contracts::{assert_shape_contract_periodically, unpack_shape_contract};
use burn::nn::PaddingConfig2d;
use burn::nn::conv::{Conv2d, Conv2dConfig};
use burn::prelude::{Backend, Config, Module, Tensor};

/// Channel growth cap, in multiples of `ndf`.
const MAX_NDF_MULT: usize = 8;

/// Discriminator Meta trait.
pub trait DiscriminatorMeta {
    /// Input image channel count.
    fn in_channels(&self) -> usize;

    /// Base filter count.
    fn ndf(&self) -> usize;

    /// Output resolution of the prediction map for a given input
    /// resolution.
    ///
    /// # Panics
    ///
    /// If the input resolution falls below the architecture's minimum;
    /// each 4x4 / padding-1 conv needs at least a 2x2 input.
    fn output_resolution(
        &self,
        input_resolution: [usize; 2],
    ) -> [usize; 2];
}

/// [`PatchDiscriminator`] Config.
///
/// Implements [`DiscriminatorMeta`].
#[derive(Config, Debug)]
pub struct PatchDiscriminatorConfig {
    /// Input image channel count.
    pub in_channels: usize,

    /// Base filter count.
    #[config(default = 64)]
    pub ndf: usize,

    /// Number of stride-2 conv/norm stages after the stem.
    #[config(default = 3)]
    pub n_layers: usize,

    /// Norm layer config; feature size is rebound per stage.
    #[config(default = "NormalizationConfig::instance()")]
    pub norm: NormalizationConfig,

    /// Activation after each conv except the final one.
    #[config(default = "ActivationConfig::leaky_relu(0.2)")]
    pub act: ActivationConfig,
}

/// Conv output size for the 4x4 / padding-1 kernels used here.
///
/// # Panics
///
/// If the padded size is smaller than the kernel.
fn conv4_output_size(
    size: usize,
    stride: usize,
) -> usize {
    let padded = size + 2;
    assert!(
        padded >= 4,
        "spatial size {size} is too small for a 4x4 conv with padding 1",
    );
    (padded - 4) / stride + 1
}

impl DiscriminatorMeta for PatchDiscriminatorConfig {
    fn in_channels(&self) -> usize {
        self.in_channels
    }

    fn ndf(&self) -> usize {
        self.ndf
    }

    fn output_resolution(
        &self,
        input_resolution: [usize; 2],
    ) -> [usize; 2] {
        let mut res = input_resolution;
        // Stem plus n_layers stages, all stride 2.
        for _ in 0..=self.n_layers {
            res = res.map(|s| conv4_output_size(s, 2));
        }
        // Stride-1 head.
        res.map(|s| conv4_output_size(s, 1))
    }
}

impl PatchDiscriminatorConfig {
    /// Initialize a [`PatchDiscriminator`].
    pub fn init<B: Backend>(
        self,
        device: &B::Device,
    ) -> PatchDiscriminator<B> {
        let ndf = self.ndf;

        let policy = NormActPolicyConfig::new()
            .with_norm(self.norm.clone())
            .with_act(self.act.clone());

        let stem = Conv2dConfig::new([self.in_channels, ndf], [4, 4])
            .with_stride([2, 2])
            .with_padding(PaddingConfig2d::Explicit(1, 1));

        let mut stages = Vec::with_capacity(self.n_layers);
        let mut nf_mult = 1;
        for n in 1..=self.n_layers {
            let nf_mult_prev = nf_mult;
            nf_mult = (1 << n).min(MAX_NDF_MULT);
            stages.push(policy.with_conv(
                Conv2dConfig::new([ndf * nf_mult_prev, ndf * nf_mult], [4, 4])
                    .with_stride([2, 2])
                    .with_padding(PaddingConfig2d::Explicit(1, 1))
                    .with_bias(false),
            ));
        }

        let head = Conv2dConfig::new([ndf * nf_mult, 1], [4, 4])
            .with_padding(PaddingConfig2d::Explicit(1, 1));

        PatchDiscriminator {
            in_channels: self.in_channels,
            ndf,
            n_layers: self.n_layers,

            stem: stem.init(device),
            stem_act: self.act.init(device),
            stages: stages.into_iter().map(|cfg| cfg.init(device)).collect(),
            head: head.init(device),
        }
    }
}

/// `PatchGAN` discriminator.
///
/// Implements [`DiscriminatorMeta`].
#[derive(Module, Debug)]
pub struct PatchDiscriminator<B: Backend> {
    /// Input image channel count.
    pub in_channels: usize,

    /// Base filter count.
    pub ndf: usize,

    /// Number of conv/norm stages after the stem.
    pub n_layers: usize,

    /// Stride-2 stem conv; activation only, no norm.
    pub stem: Conv2d<B>,

    /// Stem activation.
    pub stem_act: Activation<B>,

    /// Stride-2 conv/norm/act stages with the doubling channel schedule.
    pub stages: Vec<ConvNormAct2d<B>>,

    /// Stride-1 head conv to the single-channel prediction map.
    pub head: Conv2d<B>,
}

impl<B: Backend> DiscriminatorMeta for PatchDiscriminator<B> {
    fn in_channels(&self) -> usize {
        self.in_channels
    }

    fn ndf(&self) -> usize {
        self.ndf
    }

    fn output_resolution(
        &self,
        input_resolution: [usize; 2],
    ) -> [usize; 2] {
        let mut res = input_resolution;
        for _ in 0..=self.n_layers {
            res = res.map(|s| conv4_output_size(s, 2));
        }
        res.map(|s| conv4_output_size(s, 1))
    }
}

impl<B: Backend> PatchDiscriminator<B> {
    /// Forward Pass.
    ///
    /// # Arguments
    ///
    /// - `input`: ``[batch, in_channels, height, width]``.
    ///
    /// # Returns
    ///
    /// A ``[batch, 1, out_height, out_width]`` prediction map; see
    /// [`DiscriminatorMeta::output_resolution`].
    pub fn forward(
        &self,
        input: Tensor<B, 4>,
    ) -> Tensor<B, 4> {
        let [batch, in_height, in_width] = unpack_shape_contract!(
            ["batch", "in_channels", "in_height", "in_width"],
            &input,
            &["batch", "in_height", "in_width"],
            &[("in_channels", self.in_channels())],
        );

        let x = self.stem.forward(input);
        let mut x = self.stem_act.forward(x);

        for stage in &self.stages {
            x = stage.forward(x);
        }

        let x = self.head.forward(x);

        let [out_height, out_width] = self.output_resolution([in_height, in_width]);
        assert_shape_contract_periodically!(
            ["batch", "one", "out_height", "out_width"],
            &x,
            &[
                ("batch", batch),
                ("one", 1),
                ("out_height", out_height),
                ("out_width", out_width)
            ]
        );

        x
    }
}

/// [`PixelDiscriminator`] Config.
///
/// Implements [`DiscriminatorMeta`].
#[derive(Config, Debug)]
pub struct PixelDiscriminatorConfig {
    /// Input image channel count.
    pub in_channels: usize,

    /// Base filter count.
    #[config(default = 64)]
    pub ndf: usize,

    /// Norm layer config; feature size is rebound per stage.
    #[config(default = "NormalizationConfig::instance()")]
    pub norm: NormalizationConfig,

    /// Activation after each conv except the final one.
    #[config(default = "ActivationConfig::leaky_relu(0.2)")]
    pub act: ActivationConfig,
}

impl DiscriminatorMeta for PixelDiscriminatorConfig {
    fn in_channels(&self) -> usize {
        self.in_channels
    }

    fn ndf(&self) -> usize {
        self.ndf
    }

    fn output_resolution(
        &self,
        input_resolution: [usize; 2],
    ) -> [usize; 2] {
        // 1x1 convs, stride 1; spatial size is preserved.
        input_resolution
    }
}

impl PixelDiscriminatorConfig {
    /// Initialize a [`PixelDiscriminator`].
    pub fn init<B: Backend>(
        self,
        device: &B::Device,
    ) -> PixelDiscriminator<B> {
        let ndf = self.ndf;

        let stem = Conv2dConfig::new([self.in_channels, ndf], [1, 1]);

        let mid = NormActPolicyConfig::new()
            .with_norm(self.norm.clone())
            .with_act(self.act.clone())
            .with_conv(Conv2dConfig::new([ndf, ndf * 2], [1, 1]).with_bias(false));

        let head = Conv2dConfig::new([ndf * 2, 1], [1, 1]).with_bias(false);

        PixelDiscriminator {
            in_channels: self.in_channels,
            ndf,

            stem: stem.init(device),
            stem_act: self.act.init(device),
            mid: mid.init(device),
            head: head.init(device),
        }
    }
}

/// Per-pixel discriminator; scores each pixel independently.
///
/// Implements [`DiscriminatorMeta`].
#[derive(Module, Debug)]
pub struct PixelDiscriminator<B: Backend> {
    /// Input image channel count.
    pub in_channels: usize,

    /// Base filter count.
    pub ndf: usize,

    /// 1x1 stem conv; activation only, no norm.
    pub stem: Conv2d<B>,

    /// Stem activation.
    pub stem_act: Activation<B>,

    /// 1x1 conv/norm/act stage.
    pub mid: ConvNormAct2d<B>,

    /// 1x1 head conv to the single-channel prediction map.
    pub head: Conv2d<B>,
}

impl<B: Backend> DiscriminatorMeta for PixelDiscriminator<B> {
    fn in_channels(&self) -> usize {
        self.in_channels
    }

    fn ndf(&self) -> usize {
        self.ndf
    }

    fn output_resolution(
        &self,
        input_resolution: [usize; 2],
    ) -> [usize; 2] {
        input_resolution
    }
}

impl<B: Backend> PixelDiscriminator<B> {
    /// Forward Pass.
    ///
    /// # Arguments
    ///
    /// - `input`: ``[batch, in_channels, height, width]``.
    ///
    /// # Returns
    ///
    /// A ``[batch, 1, height, width]`` prediction map.
    pub fn forward(
        &self,
        input: Tensor<B, 4>,
    ) -> Tensor<B, 4> {
        let [batch, height, width] = unpack_shape_contract!(
            ["batch", "in_channels", "height", "width"],
            &input,
            &["batch", "height", "width"],
            &[("in_channels", self.in_channels())],
        );

        let x = self.stem.forward(input);
        let x = self.stem_act.forward(x);
        let x = self.mid.forward(x);
        let x = self.head.forward(x);

        assert_shape_contract_periodically!(
            ["batch", "one", "height", "width"],
            &x,
            &[
                ("batch", batch),
                ("one", 1),
                ("height", height),
                ("width", width)
            ]
        );

        x
    }
}

/// Discriminator architecture selection.
///
/// Implements [`DiscriminatorMeta`].
#[derive(Config, Debug)]
pub enum DiscriminatorConfig {
    /// A [`PatchDiscriminator`].
    Patch(PatchDiscriminatorConfig),

    /// A [`PixelDiscriminator`].
    Pixel(PixelDiscriminatorConfig),
}

impl From<PatchDiscriminatorConfig> for DiscriminatorConfig {
    fn from(config: PatchDiscriminatorConfig) -> Self {
        Self::Patch(config)
    }
}

impl From<PixelDiscriminatorConfig> for DiscriminatorConfig {
    fn from(config: PixelDiscriminatorConfig) -> Self {
        Self::Pixel(config)
    }
}

impl DiscriminatorConfig {
    /// Select an architecture by its conventional configuration name.
    ///
    /// * ``"basic"``: the 3-layer `PatchGAN`; `n_layers` is ignored.
    /// * ``"n_layers"``: a `PatchGAN` with the given `n_layers`.
    /// * ``"pixel"``: the per-pixel discriminator; `n_layers` is ignored.
    ///
    /// # Errors
    ///
    /// Any other name is not implemented.
    pub fn from_name(
        name: &str,
        in_channels: usize,
        ndf: usize,
        n_layers: usize,
    ) -> anyhow::Result<Self> {
        Ok(match name {
            "basic" => PatchDiscriminatorConfig::new(in_channels)
                .with_ndf(ndf)
                .into(),
            "n_layers" => PatchDiscriminatorConfig::new(in_channels)
                .with_ndf(ndf)
                .with_n_layers(n_layers)
                .into(),
            "pixel" => PixelDiscriminatorConfig::new(in_channels)
                .with_ndf(ndf)
                .into(),
            _ => bail!("discriminator model name [{name}] is not recognized"),
        })
    }

    /// Initialize a [`Discriminator`].
    pub fn init<B: Backend>(
        self,
        device: &B::Device,
    ) -> Discriminator<B> {
        match self {
            DiscriminatorConfig::Patch(config) => Discriminator::Patch(config.init(device)),
            DiscriminatorConfig::Pixel(config) => Discriminator::Pixel(config.init(device)),
        }
    }
}

impl DiscriminatorMeta for DiscriminatorConfig {
    fn in_channels(&self) -> usize {
        match self {
            Self::Patch(config) => config.in_channels(),
            Self::Pixel(config) => config.in_channels(),
        }
    }

    fn ndf(&self) -> usize {
        match self {
            Self::Patch(config) => config.ndf(),
            Self::Pixel(config) => config.ndf(),
        }
    }

    fn output_resolution(
        &self,
        input_resolution: [usize; 2],
    ) -> [usize; 2] {
        match self {
            Self::Patch(config) => config.output_resolution(input_resolution),
            Self::Pixel(config) => config.output_resolution(input_resolution),
        }
    }
}

/// Discriminator architecture wrapper.
///
/// Implements [`DiscriminatorMeta`].
#[derive(Module, Debug)]
pub enum Discriminator<B: Backend> {
    /// A [`PatchDiscriminator`].
    Patch(PatchDiscriminator<B>),

    /// A [`PixelDiscriminator`].
    Pixel(PixelDiscriminator<B>),
}

impl<B: Backend> Discriminator<B> {
    /// Forward Pass.
    ///
    /// Dispatches to the wrapped architecture; returns a
    /// ``[batch, 1, out_height, out_width]`` prediction map.
    pub fn forward(
        &self,
        input: Tensor<B, 4>,
    ) -> Tensor<B, 4> {
        match self {
            Discriminator::Patch(disc) => disc.forward(input),
            Discriminator::Pixel(disc) => disc.forward(input),
        }
    }
}

impl<B: Backend> DiscriminatorMeta for Discriminator<B> {
    fn in_channels(&self) -> usize {
        match self {
            Self::Patch(disc) => disc.in_channels(),
            Self::Pixel(disc) => disc.in_channels(),
        }
    }

    fn ndf(&self) -> usize {
        match self {
            Self::Patch(disc) => disc.ndf(),
            Self::Pixel(disc) => disc.ndf(),
        }
    }

    fn output_resolution(
        &self,
        input_resolution: [usize; 2],
    ) -> [usize; 2] {
        match self {
            Self::Patch(disc) => disc.output_resolution(input_resolution),
            Self::Pixel(disc) => disc.output_resolution(input_resolution),
        }
    }
}
