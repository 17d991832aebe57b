use std::path::Path;

use anyhow::{ensure, Context, Result};
use bytes::Bytes;
use image::{imageops::FilterType, DynamicImage, RgbImage};
use npubench_core::{DType, Shape, Tensor};

/// Element type an image tensor is built as, picked from the model's
/// input type descriptor.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InputKind {
    F32,
    U16,
    U8,
}

impl InputKind {
    /// `float` anywhere in the descriptor wins, then `uint16`; anything
    /// else is fed as `u8`.
    pub fn from_descriptor(descriptor: &str) -> Self {
        if descriptor.contains("float") {
            InputKind::F32
        } else if descriptor.contains("uint16") {
            InputKind::U16
        } else {
            InputKind::U8
        }
    }
}

pub fn preprocess_image(
    path: impl AsRef<Path>,
    height: u32,
    width: u32,
    descriptor: &str,
) -> Result<Tensor> {
    let path = path.as_ref();
    let image =
        image::open(path).with_context(|| format!("failed to decode image {}", path.display()))?;
    preprocess(&image, height, width, descriptor)
}

/// RGB, resized to `width` x `height`, laid out as `[1, 3, height, width]`.
pub fn preprocess(
    image: &DynamicImage,
    height: u32,
    width: u32,
    descriptor: &str,
) -> Result<Tensor> {
    ensure!(
        height > 0 && width > 0,
        "cannot resize to {width}x{height}"
    );

    let rgb = image.to_rgb8();
    let resized = image::imageops::resize(&rgb, width, height, FilterType::CatmullRom);
    let planes = to_chw(&resized);
    let shape = Shape::from_slice(&[1, 3, height as usize, width as usize]);

    match InputKind::from_descriptor(descriptor) {
        InputKind::F32 => {
            let values: Vec<f32> = planes.iter().map(|&v| f32::from(v) / 255.0).collect();
            Tensor::from_values(shape, &values)
        }
        InputKind::U16 => {
            let values: Vec<u16> = planes.iter().map(|&v| u16::from(v)).collect();
            Tensor::from_values(shape, &values)
        }
        InputKind::U8 => Ok(Tensor::from_cpu_bytes(DType::U8, shape, Bytes::from(planes))),
    }
}

fn to_chw(image: &RgbImage) -> Vec<u8> {
    let (width, height) = (image.width() as usize, image.height() as usize);
    let plane = width * height;
    let mut out = vec![0u8; plane * 3];

    for (x, y, pixel) in image.enumerate_pixels() {
        let offset = y as usize * width + x as usize;
        for (c, &value) in pixel.0.iter().enumerate() {
            out[c * plane + offset] = value;
        }
    }

    out
}
