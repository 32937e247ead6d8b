//! Downsampling of the shadow framebuffer onto the target grid.
//!
//! A separable two-pass convolution: every source row is reduced to the
//! target width, then every target column is reduced to the target
//! height. Filter weights depend only on the source and target sizes,
//! so they are computed once per remote geometry and reused on every
//! commit.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::mirror::framebuffer::ShadowFramebuffer;
use crate::mirror::types::{Color, TargetGrid};

// ── ResampleFilter ───────────────────────────────────────────────

/// Reconstruction filter used when shrinking the remote display.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResampleFilter {
    /// Triangle filter widened by the scale factor.
    #[default]
    Bilinear,
    /// Plain area average over each cell's footprint.
    Box,
    /// Sample the source pixel under each cell centre.
    Nearest,
}

impl ResampleFilter {
    /// Filter radius at unit scale.
    fn support(self) -> f64 {
        match self {
            ResampleFilter::Bilinear => 1.0,
            ResampleFilter::Box | ResampleFilter::Nearest => 0.5,
        }
    }

    fn weight(self, x: f64) -> f64 {
        match self {
            ResampleFilter::Bilinear => {
                let x = x.abs();
                if x < 1.0 { 1.0 - x } else { 0.0 }
            }
            ResampleFilter::Box | ResampleFilter::Nearest => {
                if (-0.5..0.5).contains(&x) {
                    1.0
                } else {
                    0.0
                }
            }
        }
    }
}

impl fmt::Display for ResampleFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ResampleFilter::Bilinear => "bilinear",
            ResampleFilter::Box => "box",
            ResampleFilter::Nearest => "nearest",
        })
    }
}

impl FromStr for ResampleFilter {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "bilinear" | "linear" => Ok(ResampleFilter::Bilinear),
            "box" | "area" => Ok(ResampleFilter::Box),
            "nearest" => Ok(ResampleFilter::Nearest),
            _ => Err(ConfigError::InvalidValue {
                key: "filter",
                value: s.to_string(),
            }),
        }
    }
}

// ── Taps ─────────────────────────────────────────────────────────

/// Contributing source samples for one output coordinate.
#[derive(Debug, Clone)]
struct Taps {
    start: usize,
    weights: Vec<f32>,
}

/// Weight tables for one axis.
fn axis_taps(in_size: usize, out_size: usize, filter: ResampleFilter) -> Vec<Taps> {
    let scale = in_size as f64 / out_size as f64;

    if filter == ResampleFilter::Nearest {
        return (0..out_size)
            .map(|i| {
                let center = (i as f64 + 0.5) * scale;
                Taps {
                    start: (center as usize).min(in_size - 1),
                    weights: vec![1.0],
                }
            })
            .collect();
    }

    // Upscaling keeps the unit-width kernel.
    let filter_scale = scale.max(1.0);
    let support = filter.support() * filter_scale;

    (0..out_size)
        .map(|i| {
            let center = (i as f64 + 0.5) * scale;
            let min = ((center - support + 0.5).floor().max(0.0) as usize).min(in_size - 1);
            let max = ((center + support + 0.5).floor() as usize).clamp(min + 1, in_size);

            let mut weights: Vec<f64> = (min..max)
                .map(|x| filter.weight((x as f64 - center + 0.5) / filter_scale))
                .collect();
            let total: f64 = weights.iter().sum();
            if total > 0.0 {
                weights.iter_mut().for_each(|w| *w /= total);
            } else {
                // Degenerate footprint: fall back to the nearest sample.
                weights.iter_mut().for_each(|w| *w = 0.0);
                let nearest = (center as usize).clamp(min, max - 1);
                weights[nearest - min] = 1.0;
            }

            Taps {
                start: min,
                weights: weights.into_iter().map(|w| w as f32).collect(),
            }
        })
        .collect()
}

struct AxisCache {
    source_width: usize,
    source_height: usize,
    horizontal: Vec<Taps>,
    vertical: Vec<Taps>,
}

// ── Resampler ────────────────────────────────────────────────────

/// Reduces a [`ShadowFramebuffer`] to a fixed-size [`TargetGrid`].
pub struct Resampler {
    target_width: u32,
    target_height: u32,
    filter: ResampleFilter,
    cache: Option<AxisCache>,
}

impl Resampler {
    /// Create a resampler for a `target_width × target_height` grid.
    ///
    /// Dimensions are validated by the session configuration.
    pub fn new(target_width: u32, target_height: u32, filter: ResampleFilter) -> Self {
        Self {
            target_width,
            target_height,
            filter,
            cache: None,
        }
    }

    pub fn filter(&self) -> ResampleFilter {
        self.filter
    }

    /// Target grid dimensions `(width, height)`.
    pub fn target_size(&self) -> (u32, u32) {
        (self.target_width, self.target_height)
    }

    /// Resample the whole framebuffer into a new grid on `layer`.
    ///
    /// An empty framebuffer or zero-sized target yields an all-black grid.
    pub fn resample(&mut self, source: &ShadowFramebuffer, layer: u32) -> TargetGrid {
        let (tw, th) = (self.target_width as usize, self.target_height as usize);
        let (sw, sh) = (source.width(), source.height());
        if sw == 0 || sh == 0 || tw == 0 || th == 0 {
            return TargetGrid::filled(self.target_width, self.target_height, layer, Color::BLACK);
        }

        let filter = self.filter;
        let cache = match self.cache.take() {
            Some(c) if c.source_width == sw && c.source_height == sh => c,
            _ => AxisCache {
                source_width: sw,
                source_height: sh,
                horizontal: axis_taps(sw, tw, filter),
                vertical: axis_taps(sh, th, filter),
            },
        };

        // Pass 1: every source row → target width.
        let mut rows = vec![[0f32; 3]; sh * tw];
        for y in 0..sh {
            let src = source.row(y);
            let dst = &mut rows[y * tw..(y + 1) * tw];
            for (out, taps) in dst.iter_mut().zip(&cache.horizontal) {
                let mut acc = [0f32; 3];
                for (k, &w) in taps.weights.iter().enumerate() {
                    let c = src[taps.start + k];
                    acc[0] += c.r as f32 * w;
                    acc[1] += c.g as f32 * w;
                    acc[2] += c.b as f32 * w;
                }
                *out = acc;
            }
        }

        // Pass 2: every target column → target height.
        let mut pixels = Vec::with_capacity(tw * th);
        for taps in &cache.vertical {
            for x in 0..tw {
                let mut acc = [0f32; 3];
                for (k, &w) in taps.weights.iter().enumerate() {
                    let v = rows[(taps.start + k) * tw + x];
                    acc[0] += v[0] * w;
                    acc[1] += v[1] * w;
                    acc[2] += v[2] * w;
                }
                pixels.push(Color::new(quantize(acc[0]), quantize(acc[1]), quantize(acc[2])));
            }
        }

        self.cache = Some(cache);

        TargetGrid {
            width: self.target_width,
            height: self.target_height,
            layer,
            pixels,
        }
    }
}

fn quantize(v: f32) -> u8 {
    v.round().clamp(0.0, 255.0) as u8
}

// ── Tests ────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    const FILTERS: [ResampleFilter; 3] = [
        ResampleFilter::Bilinear,
        ResampleFilter::Box,
        ResampleFilter::Nearest,
    ];

    fn uniform(w: u32, h: u32, c: Color) -> ShadowFramebuffer {
        let mut fb = ShadowFramebuffer::new(w, h);
        fb.apply_fill(0, 0, w, h, c);
        fb
    }

    #[test]
    fn weights_are_normalised() {
        for filter in FILTERS {
            for (input, output) in [(640, 45), (480, 35), (45, 45), (10, 37), (7, 3)] {
                for taps in axis_taps(input, output, filter) {
                    let sum: f32 = taps.weights.iter().sum();
                    assert!((sum - 1.0).abs() < 1e-4, "{filter}: {input}->{output} sum {sum}");
                    assert!(taps.start + taps.weights.len() <= input);
                }
            }
        }
    }

    #[test]
    fn uniform_source_gives_uniform_grid() {
        let colors = [Color::new(255, 0, 0), Color::new(17, 200, 93), Color::WHITE, Color::BLACK];
        let sizes = [(640, 480, 45, 35), (800, 600, 1, 1), (20, 10, 45, 35), (45, 35, 45, 35)];
        for filter in FILTERS {
            for &(sw, sh, tw, th) in &sizes {
                for &c in &colors {
                    let fb = uniform(sw, sh, c);
                    let grid = Resampler::new(tw, th, filter).resample(&fb, 0);
                    assert_eq!(grid.pixels.len(), (tw * th) as usize);
                    assert!(
                        grid.pixels.iter().all(|&p| p == c),
                        "{filter} {sw}x{sh} -> {tw}x{th} not uniform {c:?}"
                    );
                }
            }
        }
    }

    #[test]
    fn identity_size_is_exact_copy() {
        let mut fb = ShadowFramebuffer::new(4, 2);
        let px: Vec<Color> = (0..8).map(|i| Color::new(i * 30, 255 - i * 30, i)).collect();
        fb.apply_raw(0, 0, 4, 2, &px);
        for filter in FILTERS {
            let grid = Resampler::new(4, 2, filter).resample(&fb, 3);
            assert_eq!(grid.pixels, px, "{filter}");
            assert_eq!(grid.layer, 3);
        }
    }

    #[test]
    fn halves_average_into_cells() {
        // Left half white, right half black, reduced to 2x1.
        let mut fb = ShadowFramebuffer::new(8, 4);
        fb.apply_fill(0, 0, 4, 4, Color::WHITE);
        let grid = Resampler::new(2, 1, ResampleFilter::Box).resample(&fb, 0);
        assert_eq!(grid.pixels, vec![Color::WHITE, Color::BLACK]);
    }

    #[test]
    fn deterministic_across_calls() {
        let mut fb = ShadowFramebuffer::new(97, 61);
        let px: Vec<Color> = (0..97 * 61)
            .map(|i| Color::new((i * 7 % 256) as u8, (i * 13 % 256) as u8, (i % 256) as u8))
            .collect();
        fb.apply_raw(0, 0, 97, 61, &px);

        let mut resampler = Resampler::new(45, 35, ResampleFilter::Bilinear);
        let first = resampler.resample(&fb, 0);
        let second = resampler.resample(&fb, 0);
        let fresh = Resampler::new(45, 35, ResampleFilter::Bilinear).resample(&fb, 0);
        assert_eq!(first, second);
        assert_eq!(first, fresh);
    }

    #[test]
    fn cache_follows_source_geometry() {
        let mut resampler = Resampler::new(4, 4, ResampleFilter::Bilinear);
        let a = resampler.resample(&uniform(64, 64, Color::RED), 0);
        let b = resampler.resample(&uniform(10, 300, Color::BLUE), 0);
        assert!(a.pixels.iter().all(|&p| p == Color::RED));
        assert!(b.pixels.iter().all(|&p| p == Color::BLUE));
    }

    #[test]
    fn empty_source_gives_black_grid() {
        let fb = ShadowFramebuffer::new(0, 0);
        let grid = Resampler::new(3, 2, ResampleFilter::Bilinear).resample(&fb, 1);
        assert_eq!(grid, TargetGrid::filled(3, 2, 1, Color::BLACK));
    }

    #[test]
    fn filter_names_parse() {
        assert_eq!("bilinear".parse::<ResampleFilter>().unwrap(), ResampleFilter::Bilinear);
        assert_eq!("AREA".parse::<ResampleFilter>().unwrap(), ResampleFilter::Box);
        assert_eq!("nearest".parse::<ResampleFilter>().unwrap(), ResampleFilter::Nearest);
        assert!("lanczos".parse::<ResampleFilter>().is_err());
    }
}
