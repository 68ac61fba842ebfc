//! Raster adapter for ISODATA classification
//!
//! Feeds a stack of band rasters through the [`Isodata`] engine and
//! maps the result back onto the grid: a class raster with 1-based
//! labels, per-cluster summary statistics for a results table, and a
//! display color per class.

use ndarray::Array2;

use crate::classification::isodata::{Isodata, IsodataParams};
use crate::classification::sample_store::StorageWidth;
use gridclass_core::raster::Raster;
use gridclass_core::{Error, Result};

/// Parameters for raster classification
#[derive(Debug, Clone)]
pub struct ClassifyParams {
    /// Engine configuration
    pub engine: IsodataParams,
    /// Z-score normalize each band before clustering, so bands with
    /// large value ranges do not dominate the distance metric.
    /// Reported means and standard deviations are mapped back to raw
    /// band units.
    pub normalize: bool,
    /// Storage width for the sample store
    pub storage: StorageWidth,
}

impl Default for ClassifyParams {
    fn default() -> Self {
        Self {
            engine: IsodataParams::default(),
            normalize: false,
            storage: StorageWidth::F32,
        }
    }
}

/// RGB display color with components in 0..=255.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }
}

/// Per-cluster statistics for the results table
#[derive(Debug, Clone)]
pub struct ClusterSummary {
    /// 1-based class label as written into the class raster
    pub class: usize,
    /// Number of member pixels
    pub count: usize,
    /// Mean member distance to the cluster center, in engine space
    /// (normalized units when normalization is enabled)
    pub avg_distance: f64,
    /// Per-band mean, in raw band units
    pub mean: Vec<f64>,
    /// Per-band standard deviation, in raw band units
    pub std_dev: Vec<f64>,
}

/// Result of [`isodata_classify`]
#[derive(Debug)]
pub struct IsodataClassification {
    /// Class labels (1..k); excluded pixels are NaN
    pub classes: Raster<f64>,
    /// One entry per class, ordered by label
    pub summary: Vec<ClusterSummary>,
    /// One display color per class, ordered by label
    pub colors: Vec<Rgb>,
}

/// ISODATA unsupervised classification on a stack of bands.
///
/// Pixels where any band is non-finite or no-data are excluded from
/// clustering and stay NaN in the output raster.
///
/// # Arguments
/// * `bands` - One raster per band, all with the same dimensions
/// * `params` - Classification parameters
pub fn isodata_classify(
    bands: &[&Raster<f64>],
    params: &ClassifyParams,
) -> Result<IsodataClassification> {
    if bands.is_empty() {
        return Err(Error::Algorithm(
            "ISODATA classification requires at least 1 band".into(),
        ));
    }

    let n_bands = bands.len();
    let (rows, cols) = bands[0].shape();

    for band in bands.iter().skip(1) {
        if band.shape() != (rows, cols) {
            return Err(Error::SizeMismatch {
                er: rows,
                ec: cols,
                ar: band.rows(),
                ac: band.cols(),
            });
        }
    }

    // Collect pixels where every band carries a usable value
    let mut samples: Vec<Vec<f64>> = Vec::new();
    let mut valid_mask = vec![false; rows * cols];

    for r in 0..rows {
        for c in 0..cols {
            let mut vals = Vec::with_capacity(n_bands);
            let mut all_valid = true;
            for band in bands {
                let v = unsafe { band.get_unchecked(r, c) };
                if !v.is_finite() || band.is_nodata(v) {
                    all_valid = false;
                    break;
                }
                vals.push(v);
            }
            if all_valid {
                valid_mask[r * cols + c] = true;
                samples.push(vals);
            }
        }
    }

    if samples.is_empty() {
        return Err(Error::Algorithm(
            "No valid pixels found across all bands".into(),
        ));
    }

    // Per-band offset/scale for optional z-score normalization
    let mut offsets = vec![0.0; n_bands];
    let mut scales = vec![1.0; n_bands];
    if params.normalize {
        let n = samples.len() as f64;
        for (b, offset) in offsets.iter_mut().enumerate() {
            *offset = samples.iter().map(|s| s[b]).sum::<f64>() / n;
        }
        for (b, scale) in scales.iter_mut().enumerate() {
            let var = samples
                .iter()
                .map(|s| (s[b] - offsets[b]).powi(2))
                .sum::<f64>()
                / n;
            let sd = var.sqrt();
            if sd > 0.0 {
                *scale = sd;
            }
        }
    }

    let mut engine = Isodata::new(n_bands, params.storage)?;
    engine.set_max_iterations(params.engine.max_iterations)?;
    engine.set_max_clusters(params.engine.max_clusters)?;
    engine.set_ini_clusters(params.engine.ini_clusters);
    engine.set_min_samples(params.engine.min_samples)?;
    engine.set_max_std_dev(params.engine.max_std_dev);
    engine.set_max_distance(params.engine.max_distance);

    let mut features = vec![0.0; n_bands];
    for sample in &samples {
        for b in 0..n_bands {
            features[b] = (sample[b] - offsets[b]) / scales[b];
        }
        engine.add_sample(&features)?;
    }

    engine.run()?;

    let k = engine.cluster_count();

    // Map assignments back onto the grid as 1-based labels
    let mut data = vec![f64::NAN; rows * cols];
    let mut sample_idx = 0;
    for (rc, &valid) in valid_mask.iter().enumerate() {
        if valid {
            data[rc] = (engine.cluster_of(sample_idx) + 1) as f64;
            sample_idx += 1;
        }
    }

    let mut classes = bands[0].with_same_meta::<f64>(rows, cols);
    classes.set_nodata(Some(f64::NAN));
    *classes.data_mut() =
        Array2::from_shape_vec((rows, cols), data).map_err(|e| Error::Other(e.to_string()))?;

    let mut summary = Vec::with_capacity(k);
    for c in 0..k {
        let mean = (0..n_bands)
            .map(|b| engine.mean(c, b) * scales[b] + offsets[b])
            .collect();
        let std_dev = (0..n_bands)
            .map(|b| engine.std_dev(c, b) * scales[b])
            .collect();
        summary.push(ClusterSummary {
            class: c + 1,
            count: engine.member_count(c),
            avg_distance: engine.avg_distance(c),
            mean,
            std_dev,
        });
    }

    let colors = class_colors(k);

    Ok(IsodataClassification {
        classes,
        summary,
        colors,
    })
}

// ─── Class color ramp ──────────────────────────────────────────────────

const CLASS_STOPS: &[(f64, Rgb)] = &[
    (0.00, Rgb::new(230, 25, 75)),
    (0.20, Rgb::new(245, 130, 48)),
    (0.40, Rgb::new(255, 225, 25)),
    (0.60, Rgb::new(60, 180, 75)),
    (0.80, Rgb::new(0, 130, 200)),
    (1.00, Rgb::new(145, 30, 180)),
];

fn lerp(a: f64, b: f64, t: f64) -> f64 {
    a + (b - a) * t
}

fn lerp_color(c1: Rgb, c2: Rgb, t: f64) -> Rgb {
    Rgb::new(
        lerp(c1.r as f64, c2.r as f64, t).round() as u8,
        lerp(c1.g as f64, c2.g as f64, t).round() as u8,
        lerp(c1.b as f64, c2.b as f64, t).round() as u8,
    )
}

fn ramp(t: f64) -> Rgb {
    if t <= 0.0 {
        return CLASS_STOPS[0].1;
    }
    if t >= 1.0 {
        return CLASS_STOPS[CLASS_STOPS.len() - 1].1;
    }
    for i in 1..CLASS_STOPS.len() {
        if t <= CLASS_STOPS[i].0 {
            let ratio = (t - CLASS_STOPS[i - 1].0) / (CLASS_STOPS[i].0 - CLASS_STOPS[i - 1].0);
            return lerp_color(CLASS_STOPS[i - 1].1, CLASS_STOPS[i].1, ratio);
        }
    }
    CLASS_STOPS[CLASS_STOPS.len() - 1].1
}

/// One display color per class, spread evenly over the class ramp.
fn class_colors(n: usize) -> Vec<Rgb> {
    (0..n)
        .map(|c| {
            let t = if n > 1 {
                c as f64 / (n - 1) as f64
            } else {
                0.0
            };
            ramp(t)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use gridclass_core::GeoTransform;

    fn make_band(rows: usize, cols: usize, top: f64, bottom: f64) -> Raster<f64> {
        let mut r = Raster::new(rows, cols);
        r.set_transform(GeoTransform::new(0.0, rows as f64, 1.0, -1.0));
        for row in 0..rows {
            for col in 0..cols {
                let v = if row < rows / 2 { top } else { bottom };
                r.set(row, col, v).unwrap();
            }
        }
        r
    }

    #[test]
    fn test_classify_two_groups() {
        let b1 = make_band(20, 20, 10.0, 100.0);
        let b2 = make_band(20, 20, 15.0, 90.0);

        let result = isodata_classify(&[&b1, &b2], &ClassifyParams::default()).unwrap();

        let top = result.classes.get(0, 0).unwrap();
        let bottom = result.classes.get(19, 0).unwrap();
        assert!(top.is_finite());
        assert!(bottom.is_finite());
        assert_ne!(top, bottom, "distinct groups should have different labels");

        assert_eq!(result.summary.len(), 2);
        assert_eq!(result.colors.len(), 2);
        let total: usize = result.summary.iter().map(|s| s.count).sum();
        assert_eq!(total, 400);
        for (i, s) in result.summary.iter().enumerate() {
            assert_eq!(s.class, i + 1);
            assert_eq!(s.mean.len(), 2);
        }
    }

    #[test]
    fn test_nodata_pixels_stay_nan() {
        let mut b1 = make_band(20, 20, 10.0, 100.0);
        let b2 = make_band(20, 20, 15.0, 90.0);
        b1.set(3, 3, f64::NAN).unwrap();

        let result = isodata_classify(&[&b1, &b2], &ClassifyParams::default()).unwrap();

        assert!(result.classes.get(3, 3).unwrap().is_nan());
        let total: usize = result.summary.iter().map(|s| s.count).sum();
        assert_eq!(total, 399);
    }

    #[test]
    fn test_normalized_stats_in_raw_units() {
        let b1 = make_band(10, 10, 1.0, 2.0);
        let b2 = make_band(10, 10, 1000.0, 2000.0);

        let params = ClassifyParams {
            normalize: true,
            storage: StorageWidth::F64,
            ..Default::default()
        };
        let result = isodata_classify(&[&b1, &b2], &params).unwrap();

        assert_eq!(result.summary.len(), 2);
        let mut means: Vec<f64> = result.summary.iter().map(|s| s.mean[1]).collect();
        means.sort_by(|a, b| a.partial_cmp(b).unwrap());
        assert_relative_eq!(means[0], 1000.0, epsilon = 1e-6);
        assert_relative_eq!(means[1], 2000.0, epsilon = 1e-6);
    }

    #[test]
    fn test_shape_mismatch() {
        let b1 = make_band(10, 10, 1.0, 2.0);
        let b2 = make_band(10, 12, 1.0, 2.0);
        assert!(isodata_classify(&[&b1, &b2], &ClassifyParams::default()).is_err());
    }

    #[test]
    fn test_empty_bands() {
        assert!(isodata_classify(&[], &ClassifyParams::default()).is_err());
    }

    #[test]
    fn test_class_colors_distinct() {
        let colors = class_colors(6);
        assert_eq!(colors.len(), 6);
        for i in 0..colors.len() {
            for j in (i + 1)..colors.len() {
                assert_ne!(colors[i], colors[j]);
            }
        }
        assert_eq!(class_colors(1).len(), 1);
        assert!(class_colors(0).is_empty());
    }
}
