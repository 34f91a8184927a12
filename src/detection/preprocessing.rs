use image::{DynamicImage, GrayImage, Luma};

use crate::error::SheetError;

/// Foreground value in a [`Bitmap`].
pub const FILLED: u8 = 255;

/// Convert image to grayscale
pub fn to_grayscale(img: &DynamicImage) -> GrayImage {
    img.to_luma8()
}

/// Thresholded sheet: ink is foreground (255), paper is background (0).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bitmap {
    image: GrayImage,
}

impl Bitmap {
    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    /// Out-of-bounds cells read as unfilled.
    pub fn is_filled(&self, x: u32, y: u32) -> bool {
        self.image
            .get_pixel_checked(x, y)
            .is_some_and(|p| p[0] == FILLED)
    }

    /// Foreground-as-white view, the shape `imageproc` labelling expects.
    pub fn as_image(&self) -> &GrayImage {
        &self.image
    }
}

/// Threshold a grayscale raster. A pixel at or below `threshold` becomes
/// foreground, so dark ink on light paper is "filled".
pub fn binarize(gray: &GrayImage, threshold: u8) -> Result<Bitmap, SheetError> {
    let (width, height) = gray.dimensions();
    if width == 0 || height == 0 {
        return Err(SheetError::InvalidRaster(format!(
            "empty raster ({}x{})",
            width, height
        )));
    }

    let image = GrayImage::from_fn(width, height, |x, y| {
        if gray.get_pixel(x, y)[0] <= threshold {
            Luma([FILLED])
        } else {
            Luma([0])
        }
    });
    Ok(Bitmap { image })
}
