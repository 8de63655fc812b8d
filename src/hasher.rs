use clap::ValueEnum;
use image::{imageops::FilterType, DynamicImage, GenericImageView};
use serde::{Deserialize, Serialize};

use crate::fingerprint::Fingerprint;
use crate::linalg;

const HASH_IMAGE_SIZE: usize = 32;
const REDUCED_DCT2_SIZE: usize = 8;
const HASH_LENGTH: usize = REDUCED_DCT2_SIZE * REDUCED_DCT2_SIZE;

/// Which fingerprint generator to run over a thumbnail.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum HashAlgorithm {
    #[default]
    #[value(name = "phash")]
    PHash,
    #[value(name = "dhash")]
    DHash,
}

impl HashAlgorithm {
    /// `None` for images with no pixels left to hash.
    pub fn fingerprint(self, image: &DynamicImage) -> Option<Fingerprint> {
        match self {
            HashAlgorithm::PHash => phash(image),
            HashAlgorithm::DHash => dhash(image),
        }
    }
}

/// DCT based perceptual hash of a card thumbnail.
///
/// The thumbnail is cropped to drop UI overlays, scaled to 32x32 grayscale and
/// run through a 2-D DCT-II. The DC term is zeroed so flat brightness does not
/// count, then each of the 64 lowest frequency coefficients sets its bit when
/// it is above the mean of that 8x8 block. Bit `63 - (x * 8 + y)` holds the
/// coefficient in column `x`, row `y`.
pub fn phash(image: &DynamicImage) -> Option<Fingerprint> {
    let cropped = crop_thumbnail_for_hash(image)?;

    let gray = cropped
        .resize_exact(
            HASH_IMAGE_SIZE as u32,
            HASH_IMAGE_SIZE as u32,
            FilterType::Triangle,
        )
        .to_luma8();
    let pixels: Vec<f32> = gray.as_raw().iter().map(|&p| p as f32 / 255.0).collect();

    let mut coefficients = linalg::dct2_2d(&pixels, HASH_IMAGE_SIZE);
    coefficients[0] = 0.0;

    let reduced: Vec<f32> = (0..REDUCED_DCT2_SIZE)
        .flat_map(|y| {
            let row = y * HASH_IMAGE_SIZE;
            coefficients[row..row + REDUCED_DCT2_SIZE].iter().copied()
        })
        .collect();
    let average = linalg::mean(&reduced)?;

    let bits = reduced
        .iter()
        .enumerate()
        .filter(|(_, &value)| value > average)
        .fold(0u64, |hash, (i, _)| {
            let (y, x) = (i / REDUCED_DCT2_SIZE, i % REDUCED_DCT2_SIZE);
            hash | (1 << (HASH_LENGTH - 1 - (x * REDUCED_DCT2_SIZE + y)))
        });
    Some(Fingerprint(bits))
}

/// Difference hash: one bit per horizontally adjacent pixel pair of a 9x8
/// grayscale copy, set when the right pixel is brighter. First bit is the MSB.
pub fn dhash_with(image: &DynamicImage, filter: FilterType) -> Option<Fingerprint> {
    if image.width() == 0 || image.height() == 0 {
        return None;
    }

    let mut hash = 0u64;
    let gray = image.resize_exact(9, 8, filter).to_luma8();
    for (_, mut row) in gray.enumerate_rows() {
        if let Some((_, _, mut prev)) = row.next() {
            for (_, _, pixel) in row {
                hash = (hash << 1) | u64::from(pixel.0 > prev.0);
                prev = pixel;
            }
        }
    }
    Some(Fingerprint(hash))
}

pub fn dhash(image: &DynamicImage) -> Option<Fingerprint> {
    dhash_with(image, FilterType::Triangle)
}

/// Crops a thumbnail to a region that isn't affected by UI elements. This removes:
///
/// - 10% from the top
/// - 40% from the bottom
/// - 25% from the left
/// - 10% from the right
fn crop_thumbnail_for_hash(image: &DynamicImage) -> Option<DynamicImage> {
    let (w, h) = image.dimensions();

    let top = (h as f32 * 0.1).floor() as u32;
    let bot = (h as f32 * 0.4).floor() as u32;
    let left = (w as f32 * 0.25).floor() as u32;
    let right = (w as f32 * 0.1).floor() as u32;

    let width = w.checked_sub(left + right)?;
    let height = h.checked_sub(top + bot)?;
    if width == 0 || height == 0 {
        return None;
    }
    Some(image.crop_imm(left, top, width, height))
}
