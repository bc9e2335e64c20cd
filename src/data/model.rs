use std::collections::BTreeSet;

use chrono::{Datelike, NaiveDate};

/// Days per year used for fractional-year durations.
pub const DAYS_PER_YEAR: f64 = 365.25;

/// Maximum disagreement (in years) tolerated between a supplied duration and
/// the one derived from the start/end dates.
pub const DURATION_TOLERANCE: f64 = 0.1;

// ---------------------------------------------------------------------------
// DeviceRecord – one row of the lifecycle table
// ---------------------------------------------------------------------------

/// A single discontinued device.
#[derive(Debug, Clone, PartialEq)]
pub struct DeviceRecord {
    pub name: String,
    pub brand: String,
    pub category: String,
    pub start: NaiveDate,
    /// Never earlier than `start`.
    pub end: NaiveDate,
    /// Supported lifespan in fractional years.
    pub duration: f64,
    pub reason: String,
}

impl DeviceRecord {
    pub fn start_year(&self) -> i32 {
        self.start.year()
    }

    pub fn end_year(&self) -> i32 {
        self.end.year()
    }
}

/// `(end - start)` in fractional years.
pub fn years_between(start: NaiveDate, end: NaiveDate) -> f64 {
    (end - start).num_days() as f64 / DAYS_PER_YEAR
}

/// Position of a date on a continuous year axis, e.g. 1 April 2014 → ~2014.25.
pub fn fractional_year(date: NaiveDate) -> f64 {
    let days_in_year = NaiveDate::from_ymd_opt(date.year(), 12, 31)
        .map(|d| d.ordinal())
        .unwrap_or(365);
    date.year() as f64 + date.ordinal0() as f64 / days_in_year as f64
}

// ---------------------------------------------------------------------------
// DurationRange – closed interval of years
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DurationRange {
    pub lo: f64,
    pub hi: f64,
}

impl DurationRange {
    pub fn new(lo: f64, hi: f64) -> Self {
        Self { lo, hi }
    }

    /// Inclusive on both ends.
    pub fn contains(&self, value: f64) -> bool {
        self.lo <= value && value <= self.hi
    }

    /// Whether `other` lies entirely inside this range.
    pub fn encloses(&self, other: &DurationRange) -> bool {
        self.contains(other.lo) && self.contains(other.hi)
    }
}

// ---------------------------------------------------------------------------
// DeviceDataset – the complete loaded table
// ---------------------------------------------------------------------------

/// The full parsed dataset with pre-computed column indices.
#[derive(Debug, Clone)]
pub struct DeviceDataset {
    /// All devices, in source order.
    pub records: Vec<DeviceRecord>,
    /// Sorted unique brands.
    pub brands: BTreeSet<String>,
    /// Sorted unique device categories.
    pub categories: BTreeSet<String>,
    /// Observed `[min, max]` duration across all records.
    pub duration_bounds: DurationRange,
}

impl DeviceDataset {
    /// Build column indices from the loaded records.
    ///
    /// An empty input yields `[0, 0]` bounds; the loader rejects empty files
    /// before getting here.
    pub fn from_records(records: Vec<DeviceRecord>) -> Self {
        let mut brands = BTreeSet::new();
        let mut categories = BTreeSet::new();
        let mut min = f64::INFINITY;
        let mut max = f64::NEG_INFINITY;

        for rec in &records {
            brands.insert(rec.brand.clone());
            categories.insert(rec.category.clone());
            min = min.min(rec.duration);
            max = max.max(rec.duration);
        }

        let duration_bounds = if records.is_empty() {
            DurationRange::new(0.0, 0.0)
        } else {
            DurationRange::new(min, max)
        };

        DeviceDataset {
            records,
            brands,
            categories,
            duration_bounds,
        }
    }

    /// Number of devices.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the dataset is empty.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// First start year and last end year across all devices.
    pub fn year_span(&self) -> Option<(i32, i32)> {
        let first = self.records.iter().map(DeviceRecord::start_year).min()?;
        let last = self.records.iter().map(DeviceRecord::end_year).max()?;
        Some((first, last))
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    /// Record whose dates are consistent with `duration`.
    pub(crate) fn device(name: &str, brand: &str, category: &str, duration: f64) -> DeviceRecord {
        let start = date("2014-01-01");
        let end = start + chrono::Duration::days((duration * DAYS_PER_YEAR).round() as i64);
        DeviceRecord {
            name: name.to_string(),
            brand: brand.to_string(),
            category: category.to_string(),
            start,
            end,
            duration,
            reason: "Server shutdown".to_string(),
        }
    }

    #[test]
    fn dataset_indexes_brands_categories_and_bounds() {
        let ds = DeviceDataset::from_records(vec![
            device("Pebble", "Pebble", "Smartwatch", 4.0),
            device("Nest Secure", "Google", "Security", 2.5),
            device("Wink Hub", "Wink", "Smart Home", 6.0),
            device("Pixel Watch", "Google", "Smartwatch", 3.0),
        ]);

        assert_eq!(ds.len(), 4);
        assert_eq!(
            ds.brands.iter().map(String::as_str).collect::<Vec<_>>(),
            vec!["Google", "Pebble", "Wink"]
        );
        assert_eq!(ds.categories.len(), 3);
        assert_eq!(ds.duration_bounds, DurationRange::new(2.5, 6.0));
        assert_eq!(ds.year_span(), Some((2014, 2020)));
    }

    #[test]
    fn empty_dataset_has_zero_bounds() {
        let ds = DeviceDataset::from_records(Vec::new());
        assert!(ds.is_empty());
        assert_eq!(ds.duration_bounds, DurationRange::new(0.0, 0.0));
        assert_eq!(ds.year_span(), None);
    }

    #[test]
    fn years_between_uses_julian_year() {
        let years = years_between(date("2014-01-01"), date("2018-01-01"));
        assert!((years - 1461.0 / 365.25).abs() < 1e-12);
        assert!((years - 4.0).abs() < 1e-9);
    }

    #[test]
    fn fractional_year_places_dates_within_their_year() {
        assert_eq!(fractional_year(date("2020-01-01")), 2020.0);
        let mid = fractional_year(date("2021-07-02"));
        assert!(mid > 2021.49 && mid < 2021.51);
    }

    #[test]
    fn range_is_closed() {
        let r = DurationRange::new(1.0, 3.0);
        assert!(r.contains(1.0));
        assert!(r.contains(3.0));
        assert!(!r.contains(3.0001));
        assert!(r.encloses(&DurationRange::new(1.0, 2.0)));
        assert!(!r.encloses(&DurationRange::new(0.5, 2.0)));
    }
}
