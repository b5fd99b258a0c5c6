use serde::Serialize;

use crate::frame::Frame;

pub const DEFAULT_BINS: usize = 30;
pub const DEFAULT_IQR_MULTIPLIER: f64 = 1.5;

// ---------------------------------------------------------------------------
// Missing values
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MissingCount {
    pub column: String,
    pub missing: usize,
}

/// Missing cells per column, in header order.
pub fn missing_values(frame: &Frame) -> Vec<MissingCount> {
    frame
        .headers()
        .iter()
        .enumerate()
        .map(|(idx, column)| MissingCount {
            column: column.clone(),
            missing: frame
                .rows()
                .iter()
                .filter(|r| r.get(idx).map_or(true, |c| c.is_none()))
                .count(),
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Descriptive statistics
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Describe {
    pub count: usize,
    pub mean: Option<f64>,
    pub std: Option<f64>,
    pub min: Option<f64>,
    pub q25: Option<f64>,
    pub q50: Option<f64>,
    pub q75: Option<f64>,
    pub max: Option<f64>,
}

fn present_sorted(values: &[Option<f64>]) -> Vec<f64> {
    let mut v: Vec<f64> = values.iter().flatten().copied().collect();
    v.sort_by(|a, b| a.total_cmp(b));
    v
}

/// Quantile of already-sorted data using linear interpolation between the
/// two nearest ranks, `h = (n - 1) * q`.
pub fn quantile_sorted(sorted: &[f64], q: f64) -> Option<f64> {
    if sorted.is_empty() {
        return None;
    }
    let h = (sorted.len() - 1) as f64 * q.clamp(0.0, 1.0);
    let lo = h.floor() as usize;
    let hi = h.ceil() as usize;
    let frac = h - lo as f64;
    Some(sorted[lo] + (sorted[hi] - sorted[lo]) * frac)
}

/// count, mean, sample std, min, quartiles and max over the non-missing values.
pub fn describe(values: &[Option<f64>]) -> Describe {
    let sorted = present_sorted(values);
    let n = sorted.len();
    if n == 0 {
        return Describe::default();
    }
    let mean = sorted.iter().sum::<f64>() / n as f64;
    let std = if n > 1 {
        let ss: f64 = sorted.iter().map(|v| (v - mean).powi(2)).sum();
        Some((ss / (n - 1) as f64).sqrt())
    } else {
        None
    };
    Describe {
        count: n,
        mean: Some(mean),
        std,
        min: sorted.first().copied(),
        q25: quantile_sorted(&sorted, 0.25),
        q50: quantile_sorted(&sorted, 0.50),
        q75: quantile_sorted(&sorted, 0.75),
        max: sorted.last().copied(),
    }
}

// ---------------------------------------------------------------------------
// Outliers (Tukey's fences)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Fences {
    pub q1: f64,
    pub q3: f64,
    pub iqr: f64,
    pub lower: f64,
    pub upper: f64,
}

impl Fences {
    pub fn from_quartiles(q1: f64, q3: f64, multiplier: f64) -> Fences {
        let iqr = q3 - q1;
        Fences {
            q1,
            q3,
            iqr,
            lower: q1 - multiplier * iqr,
            upper: q3 + multiplier * iqr,
        }
    }

    /// Strictly outside the fences.
    pub fn is_outlier(&self, value: f64) -> bool {
        value < self.lower || value > self.upper
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OutlierReport {
    pub column: String,
    pub fences: Option<Fences>,
    pub count: usize,
    pub total: usize,
    pub percentage: f64,
}

/// Count values outside `[Q1 - k*IQR, Q3 + k*IQR]`. The percentage is taken
/// over every row, missing cells included.
pub fn outliers(column: &str, values: &[Option<f64>], multiplier: f64) -> OutlierReport {
    let sorted = present_sorted(values);
    let total = values.len();
    let fences = match (quantile_sorted(&sorted, 0.25), quantile_sorted(&sorted, 0.75)) {
        (Some(q1), Some(q3)) => Some(Fences::from_quartiles(q1, q3, multiplier)),
        _ => None,
    };
    let count = fences
        .map(|f| sorted.iter().filter(|v| f.is_outlier(**v)).count())
        .unwrap_or(0);
    let percentage = if total == 0 {
        0.0
    } else {
        count as f64 / total as f64 * 100.0
    };
    OutlierReport {
        column: column.to_string(),
        fences,
        count,
        total,
        percentage,
    }
}

// ---------------------------------------------------------------------------
// Histogram and density overlay
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Bin {
    pub start: f64,
    pub end: f64,
    pub count: usize,
}

impl Bin {
    pub fn center(&self) -> f64 {
        (self.start + self.end) / 2.0
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Histogram {
    pub bins: Vec<Bin>,
    /// Expected count per bin from a Gaussian KDE, one entry per bin.
    /// Empty unless requested with [`Histogram::with_density`].
    pub density: Vec<f64>,
}

impl Histogram {
    pub fn total(&self) -> usize {
        self.bins.iter().map(|b| b.count).sum()
    }

    pub fn max_count(&self) -> usize {
        self.bins.iter().map(|b| b.count).max().unwrap_or(0)
    }

    pub fn bin_width(&self) -> f64 {
        self.bins.first().map_or(0.0, |b| b.end - b.start)
    }

    /// Attach a KDE overlay evaluated at the bin centres.
    pub fn with_density(mut self, values: &[Option<f64>]) -> Histogram {
        let data = finite(values);
        let centers: Vec<f64> = self.bins.iter().map(Bin::center).collect();
        let scale = data.len() as f64 * self.bin_width();
        self.density = gaussian_kde(&data, &centers)
            .into_iter()
            .map(|d| d * scale)
            .collect();
        self
    }
}

fn finite(values: &[Option<f64>]) -> Vec<f64> {
    values.iter().flatten().copied().filter(|v| v.is_finite()).collect()
}

/// Equal-width bins over `[min, max]`; the last bin is closed on the right.
/// Non-finite values are left out.
pub fn histogram(values: &[Option<f64>], nbins: usize) -> Histogram {
    let data = finite(values);
    let nbins = nbins.max(1);
    let (Some(min), Some(max)) = (
        data.iter().copied().reduce(f64::min),
        data.iter().copied().reduce(f64::max),
    ) else {
        return Histogram::default();
    };

    if min == max {
        return Histogram {
            bins: vec![Bin {
                start: min - 0.5,
                end: min + 0.5,
                count: data.len(),
            }],
            density: Vec::new(),
        };
    }

    let width = (max - min) / nbins as f64;
    let mut bins: Vec<Bin> = (0..nbins)
        .map(|i| Bin {
            start: min + width * i as f64,
            end: if i + 1 == nbins {
                max
            } else {
                min + width * (i + 1) as f64
            },
            count: 0,
        })
        .collect();
    for v in data {
        let idx = (((v - min) / width).floor() as usize).min(nbins - 1);
        bins[idx].count += 1;
    }
    Histogram {
        bins,
        density: Vec::new(),
    }
}

/// Gaussian kernel density at `points`, bandwidth by Scott's rule.
/// Degenerate data (fewer than two points or zero spread) gives zeros.
pub fn gaussian_kde(data: &[f64], points: &[f64]) -> Vec<f64> {
    let n = data.len();
    if n < 2 {
        return vec![0.0; points.len()];
    }
    let mean = data.iter().sum::<f64>() / n as f64;
    let var = data.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (n - 1) as f64;
    let sigma = var.sqrt();
    if sigma == 0.0 || !sigma.is_finite() {
        return vec![0.0; points.len()];
    }
    let bandwidth = sigma * (n as f64).powf(-0.2);
    let norm = 1.0 / (n as f64 * bandwidth * (2.0 * std::f64::consts::PI).sqrt());
    points
        .iter()
        .map(|x| {
            let sum: f64 = data
                .iter()
                .map(|xi| {
                    let u = (x - xi) / bandwidth;
                    (-0.5 * u * u).exp()
                })
                .sum();
            sum * norm
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn some(values: &[f64]) -> Vec<Option<f64>> {
        values.iter().copied().map(Some).collect()
    }

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_missing_values_sum_matches_null_cells() {
        let frame = Frame::from_rows(
            &["a", "b", "c"],
            vec![
                vec![Some("1"), None, Some("x")],
                vec![None, None, Some("y")],
                vec![Some("3"), Some("4"), None],
            ],
        );
        let missing = missing_values(&frame);
        assert_eq!(missing.iter().map(|m| m.missing).collect::<Vec<_>>(), vec![1, 2, 1]);
        let nulls = frame.rows().iter().flatten().filter(|c| c.is_none()).count();
        assert_eq!(missing.iter().map(|m| m.missing).sum::<usize>(), nulls);
    }

    #[test]
    fn test_quantile_linear_interpolation() {
        let sorted = [1.0, 2.0, 3.0, 4.0];
        assert!(approx(quantile_sorted(&sorted, 0.25).unwrap(), 1.75));
        assert!(approx(quantile_sorted(&sorted, 0.5).unwrap(), 2.5));
        assert!(approx(quantile_sorted(&sorted, 0.75).unwrap(), 3.25));
        assert_eq!(quantile_sorted(&[], 0.5), None);
    }

    #[test]
    fn test_describe() {
        let d = describe(&[Some(4.0), None, Some(1.0), Some(3.0), Some(2.0)]);
        assert_eq!(d.count, 4);
        assert!(approx(d.mean.unwrap(), 2.5));
        // sample std of 1..4
        assert!(approx(d.std.unwrap(), (5.0f64 / 3.0).sqrt()));
        assert_eq!(d.min, Some(1.0));
        assert!(approx(d.q25.unwrap(), 1.75));
        assert!(approx(d.q50.unwrap(), 2.5));
        assert!(approx(d.q75.unwrap(), 3.25));
        assert_eq!(d.max, Some(4.0));
    }

    #[test]
    fn test_describe_degenerate() {
        assert_eq!(describe(&[None, None]), Describe::default());
        let single = describe(&[Some(7.0)]);
        assert_eq!(single.count, 1);
        assert_eq!(single.std, None);
        assert_eq!(single.q25, Some(7.0));
    }

    #[test]
    fn test_fences_example() {
        let f = Fences::from_quartiles(10.0, 50.0, DEFAULT_IQR_MULTIPLIER);
        assert!(approx(f.iqr, 40.0));
        assert!(approx(f.upper, 110.0));
        assert!(approx(f.lower, -50.0));
        assert!(f.is_outlier(150.0));
        assert!(!f.is_outlier(100.0));
        // boundaries are not outliers
        assert!(!f.is_outlier(110.0));
        assert!(!f.is_outlier(-50.0));
    }

    #[test]
    fn test_outliers_count_and_percentage() {
        let values = some(&[1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 100.0]);
        let report = outliers("amount", &values, DEFAULT_IQR_MULTIPLIER);
        assert_eq!(report.count, 1);
        assert_eq!(report.total, 8);
        assert!(approx(report.percentage, 12.5));
    }

    #[test]
    fn test_outliers_percentage_counts_missing_rows() {
        let mut values = some(&[1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 100.0]);
        values.push(None);
        values.push(None);
        let report = outliers("amount", &values, DEFAULT_IQR_MULTIPLIER);
        assert_eq!(report.count, 1);
        assert!(approx(report.percentage, 10.0));
    }

    #[test]
    fn test_outliers_monotone_in_multiplier() {
        let values = some(&[
            -300.0, -20.0, 0.0, 5.0, 10.0, 12.0, 15.0, 20.0, 22.0, 30.0, 45.0, 80.0, 400.0,
        ]);
        let mut previous = 0;
        for k in [3.0, 2.0, 1.5, 1.0, 0.5, 0.25, 0.0] {
            let r = outliers("amount", &values, k);
            assert!(r.count >= previous, "k={k}: {} < {previous}", r.count);
            assert!((0.0..=100.0).contains(&r.percentage));
            assert!(approx(r.percentage, r.count as f64 / r.total as f64 * 100.0));
            previous = r.count;
        }
    }

    #[test]
    fn test_outliers_empty() {
        let report = outliers("balance", &[], DEFAULT_IQR_MULTIPLIER);
        assert_eq!(report.count, 0);
        assert_eq!(report.percentage, 0.0);
        assert!(report.fences.is_none());
    }

    #[test]
    fn test_histogram_counts_every_value_once() {
        let values = some(&[0.0, 1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0, 9.0, 10.0]);
        let h = histogram(&values, 5);
        assert_eq!(h.bins.len(), 5);
        assert_eq!(h.total(), 11);
        assert!(approx(h.bin_width(), 2.0));
        // max lands in the last, right-closed bin
        assert_eq!(h.bins[4].count, 3);
        assert_eq!(h.bins[4].end, 10.0);
    }

    #[test]
    fn test_histogram_single_value_and_empty() {
        let h = histogram(&some(&[5.0, 5.0]), DEFAULT_BINS);
        assert_eq!(h.bins.len(), 1);
        assert_eq!(h.bins[0].count, 2);
        assert!(histogram(&[None], DEFAULT_BINS).bins.is_empty());
    }

    #[test]
    fn test_histogram_skips_infinite_values() {
        let values = some(&[1.0, f64::INFINITY, 3.0, f64::NEG_INFINITY]);
        let h = histogram(&values, 2);
        assert_eq!(h.total(), 2);
        assert!(h.bins.iter().all(|b| b.start.is_finite() && b.end.is_finite()));
        assert_eq!(h.bins[0].start, 1.0);
        assert_eq!(h.bins[1].end, 3.0);
        let h = h.with_density(&values);
        assert!(h.density.iter().all(|d| d.is_finite()));
    }

    #[test]
    fn test_density_overlay() {
        let values = some(&[1.0, 2.0, 2.0, 3.0, 3.0, 3.0, 4.0, 4.0, 5.0]);
        let h = histogram(&values, 4).with_density(&values);
        assert_eq!(h.density.len(), 4);
        assert!(h.density.iter().all(|d| *d >= 0.0));
        // peak near the middle of the data
        assert!(h.density[1] > h.density[0] || h.density[2] > h.density[3]);
    }

    #[test]
    fn test_kde_degenerate_is_zero() {
        assert_eq!(gaussian_kde(&[1.0], &[0.0, 1.0]), vec![0.0, 0.0]);
        assert_eq!(gaussian_kde(&[2.0, 2.0], &[2.0]), vec![0.0]);
    }
}
