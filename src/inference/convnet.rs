//! Convolutional X-ray classifier evaluated with candle.
//!
//! Architecture (input NCHW `[1, 3, 64, 64]`):
//!
//! ```text
//! conv1  3x3, 3 -> 32, relu    [1, 32, 62, 62]
//! pool   2x2                   [1, 32, 31, 31]
//! conv2  3x3, 32 -> 32, relu   [1, 32, 29, 29]
//! pool   2x2                   [1, 32, 14, 14]
//! flatten                      [1, 6272]
//! fc1    6272 -> 128, relu
//! fc2    128 -> 1, sigmoid
//! ```
//!
//! Weights are read from a safetensors file with tensors named
//! `conv1.{weight,bias}`, `conv2.{weight,bias}`, `fc1.{weight,bias}` and
//! `fc2.{weight,bias}`. `fc1.weight` expects channel-major (NCHW) flattening.

use std::path::Path;

use candle_core::{DType, Device, Module, Tensor};
use candle_nn::{conv2d, linear, Conv2d, Conv2dConfig, Linear, VarBuilder};
use tracing::info;

use crate::error::InferenceError;

use super::preprocess::{ModelInput, INPUT_CHANNELS, INPUT_SIZE};
use super::service::ScoringModel;

const CONV_FILTERS: usize = 32;
const KERNEL_SIZE: usize = 3;
const HIDDEN_UNITS: usize = 128;

/// Spatial side length after two conv(3x3, valid) + maxpool(2) stages.
const FEATURE_SIDE: usize = (((INPUT_SIZE as usize - 2) / 2) - 2) / 2;

struct ConvNet {
    conv1: Conv2d,
    conv2: Conv2d,
    fc1: Linear,
    fc2: Linear,
}

impl ConvNet {
    fn new(vb: VarBuilder) -> candle_core::Result<Self> {
        let conv1 = conv2d(
            INPUT_CHANNELS,
            CONV_FILTERS,
            KERNEL_SIZE,
            Conv2dConfig::default(),
            vb.pp("conv1"),
        )?;
        let conv2 = conv2d(
            CONV_FILTERS,
            CONV_FILTERS,
            KERNEL_SIZE,
            Conv2dConfig::default(),
            vb.pp("conv2"),
        )?;
        let fc1 = linear(
            CONV_FILTERS * FEATURE_SIDE * FEATURE_SIDE,
            HIDDEN_UNITS,
            vb.pp("fc1"),
        )?;
        let fc2 = linear(HIDDEN_UNITS, 1, vb.pp("fc2"))?;
        Ok(Self {
            conv1,
            conv2,
            fc1,
            fc2,
        })
    }

    fn forward(&self, xs: &Tensor) -> candle_core::Result<Tensor> {
        let xs = self.conv1.forward(xs)?.relu()?.max_pool2d(2)?;
        let xs = self.conv2.forward(&xs)?.relu()?.max_pool2d(2)?;
        let xs = xs.flatten_from(1)?;
        let xs = self.fc1.forward(&xs)?.relu()?;
        candle_nn::ops::sigmoid(&self.fc2.forward(&xs)?)
    }
}

/// Production [`ScoringModel`] backed by a candle convolutional network.
pub struct ConvNetScorer {
    net: ConvNet,
    device: Device,
}

impl ConvNetScorer {
    /// Load weights from a safetensors file on the CPU.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, InferenceError> {
        let path = path.as_ref();
        let load_error = |e: candle_core::Error| InferenceError::ModelLoad {
            path: path.display().to_string(),
            message: e.to_string(),
        };

        if !path.is_file() {
            return Err(InferenceError::ModelLoad {
                path: path.display().to_string(),
                message: "file not found".to_string(),
            });
        }

        let device = Device::Cpu;
        // SAFETY: the weights file is opened read-only and not modified while mapped.
        let vb = unsafe { VarBuilder::from_mmaped_safetensors(&[path], DType::F32, &device) }
            .map_err(load_error)?;
        let scorer = Self::from_var_builder(vb, device).map_err(load_error)?;

        info!(path = %path.display(), "Loaded classifier weights");
        Ok(scorer)
    }

    /// Build the network from an arbitrary variable source.
    pub fn from_var_builder(vb: VarBuilder, device: Device) -> candle_core::Result<Self> {
        let net = ConvNet::new(vb)?;
        Ok(Self { net, device })
    }

    fn run(&self, input: &ModelInput) -> candle_core::Result<f32> {
        let xs = Tensor::from_slice(input.as_slice(), input.shape(), &self.device)?
            .permute((0, 3, 1, 2))?
            .contiguous()?;
        let ys = self.net.forward(&xs)?.flatten_all()?.to_vec1::<f32>()?;
        ys.first()
            .copied()
            .ok_or_else(|| candle_core::Error::Msg("model produced no output".to_string()))
    }
}

impl ScoringModel for ConvNetScorer {
    fn score(&self, input: &ModelInput) -> Result<f32, InferenceError> {
        self.run(input)
            .map_err(|e| InferenceError::Model(e.to_string()))
    }
}
