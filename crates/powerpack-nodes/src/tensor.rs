//! Pixel and latent buffers exchanged between nodes
//!
//! The host's tensor runtime is opaque to this crate; these types carry just
//! enough shape information for saving images and seeding latents.

use serde::{Deserialize, Serialize};

use crate::error::{PowerpackError, Result};

/// Channel count of the latent space handed to the sampler
pub const LATENT_CHANNELS: usize = 4;

/// Spatial downscale between pixels and latents
pub const LATENT_SCALE: u32 = 8;

/// A batch of float images, BHWC layout, values nominally in 0..1
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageBatch {
    pub batch: usize,
    pub height: usize,
    pub width: usize,
    pub channels: usize,
    pub data: Vec<f32>,
}

impl ImageBatch {
    /// Build a batch, checking that `data` matches the declared shape.
    pub fn new(
        batch: usize,
        height: usize,
        width: usize,
        channels: usize,
        data: Vec<f32>,
    ) -> Result<Self> {
        let image = Self {
            batch,
            height,
            width,
            channels,
            data,
        };
        image.validate()?;
        Ok(image)
    }

    /// Check shape consistency (values arriving from a host are not trusted)
    pub fn validate(&self) -> Result<()> {
        if self.batch == 0 || self.height == 0 || self.width == 0 {
            return Err(PowerpackError::Image(format!(
                "empty image batch {}x{}x{}",
                self.batch, self.height, self.width
            )));
        }
        if !matches!(self.channels, 1 | 3 | 4) {
            return Err(PowerpackError::Image(format!(
                "unsupported channel count {}",
                self.channels
            )));
        }
        let expected = self
            .batch
            .checked_mul(self.height)
            .and_then(|n| n.checked_mul(self.width))
            .and_then(|n| n.checked_mul(self.channels))
            .ok_or_else(|| {
                PowerpackError::Image(format!(
                    "image shape {}x{}x{}x{} is too large",
                    self.batch, self.height, self.width, self.channels
                ))
            })?;
        if self.data.len() != expected {
            return Err(PowerpackError::Image(format!(
                "pixel buffer has {} values, shape needs {}",
                self.data.len(),
                expected
            )));
        }
        Ok(())
    }

    /// First image of the batch as 8-bit samples: `clamp(v * 255, 0, 255)`,
    /// truncated.
    pub fn first_as_u8(&self) -> Result<Vec<u8>> {
        self.validate()?;
        let len = self.height * self.width * self.channels;
        Ok(self.data[..len]
            .iter()
            .map(|v| (v * 255.0).clamp(0.0, 255.0) as u8)
            .collect())
    }
}

/// Zero-filled latent batch, BCHW layout in latent units
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LatentBatch {
    pub batch: usize,
    pub channels: usize,
    pub height: usize,
    pub width: usize,
    pub samples: Vec<f32>,
}

impl LatentBatch {
    /// Empty latent for an image of `width` x `height` pixels.
    pub fn zeros_for_image(batch: usize, width: u32, height: u32) -> Self {
        let h = (height / LATENT_SCALE) as usize;
        let w = (width / LATENT_SCALE) as usize;
        Self {
            batch,
            channels: LATENT_CHANNELS,
            height: h,
            width: w,
            samples: vec![0.0; batch * LATENT_CHANNELS * h * w],
        }
    }

    /// `[batch, channels, height, width]`
    pub fn shape(&self) -> [usize; 4] {
        [self.batch, self.channels, self.height, self.width]
    }
}
