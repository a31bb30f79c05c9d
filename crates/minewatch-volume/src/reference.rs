//! Reference elevation policies.

use serde::{Deserialize, Serialize};
use statrs::statistics::{Data, Median, OrderStatistics, Statistics};

/// Rank used by [`ReferencePolicy::Percentile`].
pub const REFERENCE_PERCENTILE: usize = 75;

/// Statistic used to pick the depth datum from the masked elevations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReferencePolicy {
    /// Arithmetic mean of the masked elevations.
    Mean,
    /// Median of the masked elevations.
    Median,
    /// Lowest masked elevation (pit floor).
    #[default]
    Min,
    /// Highest masked elevation (rim).
    Max,
    /// 75th percentile, a rim estimate less sensitive to spoil heaps.
    Percentile,
}

/// Which cells the reference elevation was computed from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReferenceSource {
    /// The masked cells of the site itself.
    #[default]
    Site,
    /// A buffer ring of cells around the site, outside its mask.
    Ring,
}

/// Direction in which depth is measured from the reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Datum {
    /// Reference is the floor; depth is `elevation - reference`.
    Floor,
    /// Reference is the surface; depth is `reference - elevation`.
    Surface,
}

impl ReferencePolicy {
    /// All policies, in config order.
    pub const ALL: [ReferencePolicy; 5] = [Self::Mean, Self::Median, Self::Min, Self::Max, Self::Percentile];

    /// Name as written in configuration.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Mean => "mean",
            Self::Median => "median",
            Self::Min => "min",
            Self::Max => "max",
            Self::Percentile => "percentile",
        }
    }

    /// The datum this policy measures depth against.
    pub fn datum(&self) -> Datum {
        match self {
            Self::Min => Datum::Floor,
            Self::Mean | Self::Median | Self::Max | Self::Percentile => Datum::Surface,
        }
    }

    /// Compute the reference elevation, or `None` for an empty slice.
    pub fn reference_elevation(&self, values: &[f64]) -> Option<f64> {
        if values.is_empty() {
            return None;
        }
        let reference = match self {
            Self::Mean => Statistics::mean(values),
            Self::Median => Data::new(values.to_vec()).median(),
            Self::Min => Statistics::min(values),
            Self::Max => Statistics::max(values),
            Self::Percentile => Data::new(values.to_vec()).percentile(REFERENCE_PERCENTILE),
        };
        Some(reference)
    }
}

impl Datum {
    /// Clamped, non-negative depth of one cell.
    pub fn depth(&self, elevation: f64, reference: f64) -> f64 {
        let d = match self {
            Self::Floor => elevation - reference,
            Self::Surface => reference - elevation,
        };
        d.max(0.0)
    }
}

impl std::fmt::Display for ReferencePolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ReferencePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|p| p.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("unknown reference policy '{}' (expected mean, median, min, max or percentile)", s))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    const VALUES: [f64; 5] = [100.0, 90.0, 95.0, 100.0, 80.0];

    #[test]
    fn test_reference_statistics() {
        assert_relative_eq!(ReferencePolicy::Mean.reference_elevation(&VALUES).unwrap(), 93.0);
        assert_relative_eq!(ReferencePolicy::Median.reference_elevation(&VALUES).unwrap(), 95.0);
        assert_eq!(ReferencePolicy::Min.reference_elevation(&VALUES), Some(80.0));
        assert_eq!(ReferencePolicy::Max.reference_elevation(&VALUES), Some(100.0));
    }

    #[test]
    fn test_percentile_reference() {
        // Half the cells at 90 m, half at 100 m
        let values: Vec<f64> = (0..100).map(|i| if i < 50 { 90.0 } else { 100.0 }).collect();
        let policy = ReferencePolicy::Percentile;

        assert_eq!(policy.reference_elevation(&values), Some(100.0));
        assert_relative_eq!(ReferencePolicy::Median.reference_elevation(&values).unwrap(), 95.0);
        assert_eq!(policy.datum(), Datum::Surface);
        assert_eq!("percentile".parse::<ReferencePolicy>().unwrap(), policy);

        let p = policy.reference_elevation(&VALUES).unwrap();
        assert!((95.0..=100.0).contains(&p), "{}", p);
    }

    #[test]
    fn test_empty_values_have_no_reference() {
        for policy in ReferencePolicy::ALL {
            assert_eq!(policy.reference_elevation(&[]), None);
        }
    }

    #[test]
    fn test_depth_is_clamped() {
        assert_eq!(Datum::Floor.depth(100.0, 90.0), 10.0);
        assert_eq!(Datum::Floor.depth(85.0, 90.0), 0.0);
        assert_eq!(Datum::Surface.depth(85.0, 90.0), 5.0);
        assert_eq!(Datum::Surface.depth(95.0, 90.0), 0.0);
    }

    #[test]
    fn test_parse_policy() {
        assert_eq!("MEDIAN".parse::<ReferencePolicy>().unwrap(), ReferencePolicy::Median);
        assert!("mode".parse::<ReferencePolicy>().is_err());
        assert_eq!(ReferencePolicy::default(), ReferencePolicy::Min);
    }
}
