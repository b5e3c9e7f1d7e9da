//! Raster preprocessing for the scoring model.

use image::imageops::{self, FilterType};
use image::RgbImage;

/// Side length of the square model input, in pixels.
pub const INPUT_SIZE: u32 = 64;

/// Number of color channels fed to the model.
pub const INPUT_CHANNELS: usize = 3;

/// A preprocessed, batched model input.
///
/// Values are laid out NHWC (`[1, INPUT_SIZE, INPUT_SIZE, 3]`) and scaled to
/// `[-1, 1]`, matching the normalization the classifier was trained with.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelInput {
    data: Vec<f32>,
}

impl ModelInput {
    /// Tensor shape as `(batch, height, width, channels)`.
    pub fn shape(&self) -> (usize, usize, usize, usize) {
        let side = INPUT_SIZE as usize;
        (1, side, side, INPUT_CHANNELS)
    }

    /// Flat NHWC values.
    pub fn as_slice(&self) -> &[f32] {
        &self.data
    }

    /// Consume the input and return the flat NHWC values.
    pub fn into_vec(self) -> Vec<f32> {
        self.data
    }
}

/// Resize to the model's fixed resolution and normalize.
///
/// Resizing uses nearest-neighbour sampling so pixel values pass through
/// unchanged; each channel value `x` becomes `x / 127.5 - 1.0`.
pub fn preprocess(image: &RgbImage) -> ModelInput {
    let resized = if image.dimensions() == (INPUT_SIZE, INPUT_SIZE) {
        image.clone()
    } else {
        imageops::resize(image, INPUT_SIZE, INPUT_SIZE, FilterType::Nearest)
    };

    let data = resized
        .into_raw()
        .into_iter()
        .map(|v| f32::from(v) / 127.5 - 1.0)
        .collect();

    ModelInput { data }
}
