//! Augmentation generator: 30 deterministic views of one artwork crop.
//!
//! Each view is described by a [`Recipe`]: an ordered list of
//! [`Transform`]s applied to the crop before letterboxing (`pre`), and
//! another applied to the letterboxed tile (`post`). The table is fixed
//! and ordered; view *n* is always rendered by `RECIPES[n]`.
//!
//! Views 0-19 only transform the crop (geometric and photometric
//! changes that interact with resampling). Views 20-29 perturb the
//! letterboxed tile at the pixel level (noise, contrast, desaturation).
//!
//! Noise is seeded per view from [`FingerprintConfig::noise_seed`] and the
//! view index, so rendering the same crop twice gives identical views.

use serde::{Deserialize, Serialize};

use crate::adjust;
use crate::blur::gaussian_blur_rgb;
use crate::geometry::letterbox;
use crate::types::{FingerprintConfig, PipelineError, RgbImage};

use self::Transform::{
    Brightness, Contrast, Desaturate, GaussianBlur, GaussianNoise, HorizontalFlip, Identity,
    Rotate, Saturation,
};

/// Number of views produced for every card.
pub const VIEW_COUNT: usize = 30;

/// One tagged image transform with its parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Transform {
    /// Leave the image unchanged.
    Identity,
    /// Rotate about the center, counter-clockwise positive.
    Rotate {
        /// Angle in degrees.
        degrees: f32,
    },
    /// Scale brightness.
    Brightness {
        /// 1.0 leaves the image unchanged.
        factor: f32,
    },
    /// Scale color saturation.
    Saturation {
        /// 1.0 leaves the image unchanged.
        factor: f32,
    },
    /// Mirror left to right.
    HorizontalFlip,
    /// Gaussian blur.
    GaussianBlur {
        /// Kernel standard deviation in pixels.
        sigma: f32,
    },
    /// Additive zero-mean Gaussian noise.
    GaussianNoise {
        /// Standard deviation in 8-bit intensity units.
        sigma: f32,
    },
    /// Scale contrast around 128.
    Contrast {
        /// 1.0 leaves the image unchanged.
        factor: f32,
    },
    /// Blend toward grayscale.
    Desaturate {
        /// 0.0 leaves the image unchanged, 1.0 is fully gray.
        amount: f64,
    },
}

impl Transform {
    /// Apply the transform. `seed` is only consulted by noise.
    #[must_use = "returns the transformed image"]
    pub fn apply(&self, image: &RgbImage, seed: u64) -> RgbImage {
        match *self {
            Self::Identity => image.clone(),
            Self::Rotate { degrees } => adjust::rotate(image, degrees),
            Self::Brightness { factor } => adjust::brightness(image, factor),
            Self::Saturation { factor } => adjust::saturation(image, factor),
            Self::HorizontalFlip => adjust::flip_horizontal(image),
            Self::GaussianBlur { sigma } => gaussian_blur_rgb(image, sigma),
            Self::GaussianNoise { sigma } => adjust::gaussian_noise(image, sigma, seed),
            Self::Contrast { factor } => adjust::contrast(image, factor),
            Self::Desaturate { amount } => adjust::desaturate(image, amount),
        }
    }
}

/// A named view recipe.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Recipe {
    /// Short name used in logs and diagnostics.
    pub name: &'static str,
    /// Applied in order to the crop before letterboxing.
    pub pre: &'static [Transform],
    /// Applied in order to the letterboxed tile.
    pub post: &'static [Transform],
}

impl Recipe {
    /// Render this recipe from `crop` into a `size`×`size` tile.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::ZeroArea`] if the crop has no pixels.
    pub fn render(
        &self,
        crop: &RgbImage,
        size: u32,
        seed: u64,
    ) -> Result<RgbImage, PipelineError> {
        let prepared = apply_all(self.pre, crop, seed);
        let tile = letterbox(&prepared, size)?;
        Ok(apply_all(self.post, &tile, seed))
    }
}

fn apply_all(transforms: &[Transform], image: &RgbImage, seed: u64) -> RgbImage {
    transforms
        .iter()
        .fold(image.clone(), |img, t| t.apply(&img, seed))
}

const fn recipe(name: &'static str, pre: &'static [Transform]) -> Recipe {
    Recipe { name, pre, post: &[] }
}

const fn pixel_recipe(
    name: &'static str,
    pre: &'static [Transform],
    post: &'static [Transform],
) -> Recipe {
    Recipe { name, pre, post }
}

/// The fixed, ordered view table.
pub const RECIPES: [Recipe; VIEW_COUNT] = [
    recipe("identity", &[Identity]),
    recipe("rotate_cw10", &[Rotate { degrees: -10.0 }]),
    recipe("rotate_ccw10", &[Rotate { degrees: 10.0 }]),
    recipe("bright", &[Brightness { factor: 1.3 }]),
    recipe(
        "dark_blur",
        &[Brightness { factor: 0.7 }, GaussianBlur { sigma: 1.5 }],
    ),
    recipe("hflip", &[HorizontalFlip]),
    recipe(
        "bright_desat",
        &[Brightness { factor: 1.15 }, Saturation { factor: 0.85 }],
    ),
    recipe("very_bright", &[Brightness { factor: 1.5 }]),
    recipe("very_dark", &[Brightness { factor: 0.5 }]),
    recipe(
        "cool",
        &[Brightness { factor: 0.9 }, Saturation { factor: 0.8 }],
    ),
    recipe(
        "warm",
        &[Brightness { factor: 1.2 }, Saturation { factor: 1.1 }],
    ),
    recipe("blur", &[GaussianBlur { sigma: 2.0 }]),
    recipe("rotate_cw20", &[Rotate { degrees: -20.0 }]),
    recipe("rotate_ccw20", &[Rotate { degrees: 20.0 }]),
    recipe("flip_bright", &[HorizontalFlip, Brightness { factor: 1.3 }]),
    recipe("flip_dark", &[HorizontalFlip, Brightness { factor: 0.7 }]),
    recipe("high_sat", &[Saturation { factor: 1.4 }]),
    recipe("low_sat", &[Saturation { factor: 0.5 }]),
    recipe(
        "bright_rot5",
        &[Rotate { degrees: -5.0 }, Brightness { factor: 1.2 }],
    ),
    recipe(
        "dark_rot_neg5",
        &[Rotate { degrees: 5.0 }, Brightness { factor: 0.8 }],
    ),
    pixel_recipe("noise15", &[Identity], &[GaussianNoise { sigma: 15.0 }]),
    pixel_recipe("low_contrast", &[Identity], &[Contrast { factor: 0.7 }]),
    pixel_recipe("desat30", &[Identity], &[Desaturate { amount: 0.3 }]),
    pixel_recipe("noise25", &[Identity], &[GaussianNoise { sigma: 25.0 }]),
    pixel_recipe("high_contrast", &[Identity], &[Contrast { factor: 1.4 }]),
    pixel_recipe("desat60", &[Identity], &[Desaturate { amount: 0.6 }]),
    pixel_recipe(
        "dark_noise20",
        &[Brightness { factor: 0.7 }],
        &[GaussianNoise { sigma: 20.0 }],
    ),
    pixel_recipe(
        "bright_noise15",
        &[Brightness { factor: 1.3 }],
        &[GaussianNoise { sigma: 15.0 }],
    ),
    pixel_recipe(
        "flat_desat",
        &[Identity],
        &[Contrast { factor: 0.8 }, Desaturate { amount: 0.2 }],
    ),
    pixel_recipe(
        "flip_noise15",
        &[HorizontalFlip],
        &[GaussianNoise { sigma: 15.0 }],
    ),
];

/// Noise seed for view `index`.
#[must_use]
pub const fn view_seed(base: u64, index: usize) -> u64 {
    base ^ (index as u64 + 1).wrapping_mul(0x9E37_79B9_7F4A_7C15)
}

/// Render view `index` of `crop`. Returns `None` when `index` is not
/// below [`VIEW_COUNT`].
///
/// # Errors
///
/// The inner result is [`PipelineError::ZeroArea`] if the crop has no
/// pixels.
pub fn render_view(
    crop: &RgbImage,
    index: usize,
    config: &FingerprintConfig,
) -> Option<Result<RgbImage, PipelineError>> {
    let recipe = RECIPES.get(index)?;
    log::trace!("rendering view {index} ({})", recipe.name);
    Some(recipe.render(crop, config.input_size, view_seed(config.noise_seed, index)))
}

/// The augmented views of one card, in recipe order.
///
/// Only [`augment`] constructs a batch, so it always holds exactly
/// [`VIEW_COUNT`] tiles.
#[derive(Debug, Clone)]
pub struct ViewBatch {
    views: Vec<RgbImage>,
}

impl ViewBatch {
    /// Number of views (always [`VIEW_COUNT`]).
    #[must_use]
    pub fn len(&self) -> usize {
        self.views.len()
    }

    /// Always `false`.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.views.is_empty()
    }

    /// The rendered tiles, in recipe order.
    #[must_use]
    pub fn views(&self) -> &[RgbImage] {
        &self.views
    }

    /// Consume the batch, returning the tiles.
    #[must_use]
    pub fn into_views(self) -> Vec<RgbImage> {
        self.views
    }
}

/// Render all [`VIEW_COUNT`] views of `crop`.
///
/// # Errors
///
/// Returns [`PipelineError::ZeroArea`] if the crop has no pixels.
pub fn augment(crop: &RgbImage, config: &FingerprintConfig) -> Result<ViewBatch, PipelineError> {
    let views = RECIPES
        .iter()
        .enumerate()
        .map(|(index, recipe)| {
            log::trace!("rendering view {index} ({})", recipe.name);
            recipe.render(crop, config.input_size, view_seed(config.noise_seed, index))
        })
        .collect::<Result<Vec<_>, _>>()?;
    Ok(ViewBatch { views })
}
