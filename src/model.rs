// SPDX-License-Identifier: MPL-2.0
//! ONNX Runtime wrapper around the NAFNet restoration network.
//!
//! [`RestorationModel`] owns a resolved [`ModelConfig`] and an optional ONNX
//! session. The session is loaded lazily: constructing the wrapper never
//! touches the runtime, so a processor can be built and inspected before the
//! first inference call.

use crate::error::{Error, Result};
use crate::registry::{ModelConfig, NetworkParams};
use image_rs::DynamicImage;
use ndarray::Array4;
use ort::session::{builder::GraphOptimizationLevel, Session};

/// Encoder stride assumed when a configuration carries no network
/// hyperparameters (four stages, each halving dimensions).
const DEFAULT_STRIDE: u32 = 16;

/// Inference wrapper for one resolved model configuration.
pub struct RestorationModel {
    config: ModelConfig,
    session: Option<Session>,
}

impl RestorationModel {
    /// Creates a wrapper from a device-adjusted configuration. No session is
    /// loaded yet.
    #[must_use]
    pub fn new(config: ModelConfig) -> Self {
        Self {
            config,
            session: None,
        }
    }

    /// Returns the configuration this wrapper was built from.
    #[must_use]
    pub fn config(&self) -> &ModelConfig {
        &self.config
    }

    /// Checks if the ONNX session is loaded and ready.
    #[must_use]
    pub fn is_session_ready(&self) -> bool {
        self.session.is_some()
    }

    /// Loads the ONNX session from the configured weight file.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ModelNotFound`] when the weight file is absent and
    /// [`Error::Inference`] when the session fails to initialize.
    pub fn load_session(&mut self) -> Result<()> {
        if !self.config.model_path.exists() {
            return Err(Error::ModelNotFound(self.config.model_path.clone()));
        }

        let session = Session::builder()
            .map_err(|e| Error::Inference(e.to_string()))?
            .with_optimization_level(GraphOptimizationLevel::Level3)
            .map_err(|e| Error::Inference(e.to_string()))?
            .commit_from_file(&self.config.model_path)
            .map_err(|e| Error::Inference(e.to_string()))?;

        self.session = Some(session);
        Ok(())
    }

    /// Runs restoration inference on an image, loading the session on first
    /// use. Synchronous and blocking; one image in, one restored image out.
    ///
    /// # Errors
    ///
    /// Returns an error when the session cannot be loaded, preprocessing
    /// fails, or the ONNX run fails.
    pub fn predict(&mut self, image: &DynamicImage) -> Result<DynamicImage> {
        if self.session.is_none() {
            self.load_session()?;
        }

        let stride = self
            .config
            .network
            .as_ref()
            .map_or(DEFAULT_STRIDE, NetworkParams::encoder_stride);

        let session = self.session.as_mut().ok_or(Error::SessionNotInitialized)?;

        // Original dimensions, for cropping after inference.
        let original_width = image.width();
        let original_height = image.height();

        // Preprocess: DynamicImage -> NCHW tensor (RGB, normalized 0-1, padded
        // to the encoder stride).
        let input_tensor = preprocess_image(image, stride)?;
        let input_tensor = input_tensor.as_standard_layout().into_owned();

        // NAFNet exports use 'lq' for the low-quality input.
        let input_name = session
            .inputs
            .first()
            .map_or_else(|| "lq".to_string(), |i| i.name.clone());

        let input_ref = ort::value::TensorRef::from_array_view(&input_tensor)
            .map_err(|e| Error::Inference(e.to_string()))?;

        let outputs = session
            .run(ort::inputs![input_name.as_str() => input_ref])
            .map_err(|e| Error::Inference(e.to_string()))?;

        postprocess_output(&outputs, original_width, original_height)
    }

    /// Validates the model by running a test inference on a synthetic gray
    /// image.
    ///
    /// # Errors
    ///
    /// Propagates any [`predict`](Self::predict) failure.
    pub fn validate(&mut self) -> Result<()> {
        let mut img = image_rs::RgbImage::new(256, 256);
        for pixel in img.pixels_mut() {
            *pixel = image_rs::Rgb([128, 128, 128]);
        }
        let _result = self.predict(&DynamicImage::ImageRgb8(img))?;
        Ok(())
    }
}

/// Rounds `size` up to the next multiple of `stride`.
fn padded_dimension(size: u32, stride: u32) -> u32 {
    size.div_ceil(stride) * stride
}

/// Preprocesses an image for NAFNet inference.
///
/// Converts to NCHW format (batch=1, channels=3, height, width), RGB color
/// order, normalized to the 0-1 range. Dimensions that are not a multiple of
/// the encoder stride are padded with edge reflection.
fn preprocess_image(img: &DynamicImage, stride: u32) -> Result<Array4<f32>> {
    if stride == 0 {
        return Err(Error::Preprocessing("Encoder stride is zero".to_string()));
    }

    let rgb = img.to_rgb8();
    let (width, height) = rgb.dimensions();

    if width == 0 || height == 0 {
        return Err(Error::Preprocessing("Empty input image".to_string()));
    }

    let padded_width = padded_dimension(width, stride);
    let padded_height = padded_dimension(height, stride);

    let padded_rgb = if padded_width != width || padded_height != height {
        pad_image_reflect(&rgb, padded_width, padded_height)
    } else {
        rgb
    };

    let mut tensor = Array4::<f32>::zeros((1, 3, padded_height as usize, padded_width as usize));

    for (x, y, pixel) in padded_rgb.enumerate_pixels() {
        let [r, g, b] = pixel.0;
        tensor[[0, 0, y as usize, x as usize]] = f32::from(r) / 255.0;
        tensor[[0, 1, y as usize, x as usize]] = f32::from(g) / 255.0;
        tensor[[0, 2, y as usize, x as usize]] = f32::from(b) / 255.0;
    }

    Ok(tensor)
}

/// Pads an image using edge reflection to reach target dimensions.
fn pad_image_reflect(
    img: &image_rs::RgbImage,
    target_width: u32,
    target_height: u32,
) -> image_rs::RgbImage {
    let (src_width, src_height) = img.dimensions();
    let mut padded = image_rs::RgbImage::new(target_width, target_height);

    for y in 0..target_height {
        for x in 0..target_width {
            let src_x = if x < src_width {
                x
            } else {
                let overflow = x - src_width;
                if overflow < src_width {
                    src_width - 1 - overflow
                } else {
                    0
                }
            };
            let src_y = if y < src_height {
                y
            } else {
                let overflow = y - src_height;
                if overflow < src_height {
                    src_height - 1 - overflow
                } else {
                    0
                }
            };
            padded.put_pixel(x, y, *img.get_pixel(src_x, src_y));
        }
    }

    padded
}

/// Postprocesses network output back to an image.
///
/// Converts from NCHW format (RGB order), denormalizes from 0-1 to 0-255,
/// clips values, and crops back to the original dimensions when padding was
/// applied.
fn postprocess_output(
    outputs: &ort::session::SessionOutputs<'_>,
    original_width: u32,
    original_height: u32,
) -> Result<DynamicImage> {
    let (_, output) = outputs
        .iter()
        .next()
        .ok_or_else(|| Error::Postprocessing("No output tensor".to_string()))?;

    let (shape, data) = output
        .try_extract_tensor::<f32>()
        .map_err(|e: ort::Error| Error::Postprocessing(e.to_string()))?;

    // Shape is NCHW: [batch, channels, height, width]
    if shape.len() != 4 {
        return Err(Error::Postprocessing(format!(
            "Expected 4D tensor, got {}D",
            shape.len()
        )));
    }

    #[allow(clippy::cast_sign_loss)]
    let height = shape[2] as usize;
    #[allow(clippy::cast_sign_loss)]
    let width = shape[3] as usize;
    let channel_size = height * width;

    let mut pixels = Vec::with_capacity(width * height * 3);

    for y in 0..height {
        for x in 0..width {
            let idx = y * width + x;
            #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
            {
                let r = (data[idx] * 255.0).clamp(0.0, 255.0) as u8;
                let g = (data[channel_size + idx] * 255.0).clamp(0.0, 255.0) as u8;
                let b = (data[2 * channel_size + idx] * 255.0).clamp(0.0, 255.0) as u8;
                pixels.push(r);
                pixels.push(g);
                pixels.push(b);
            }
        }
    }

    #[allow(clippy::cast_possible_truncation)]
    let rgb_image = image_rs::RgbImage::from_raw(width as u32, height as u32, pixels)
        .ok_or_else(|| Error::Postprocessing("Failed to create image".to_string()))?;

    let result = DynamicImage::ImageRgb8(rgb_image);

    #[allow(clippy::cast_possible_truncation)]
    if width as u32 != original_width || height as u32 != original_height {
        Ok(result.crop_imm(0, 0, original_width, original_height))
    } else {
        Ok(result)
    }
}
