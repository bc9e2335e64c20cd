use std::collections::{BTreeMap, HashMap, HashSet};
use std::fmt;

use chrono::NaiveDate;

use super::filter::FilteredView;
use super::model::{fractional_year, DeviceRecord};

/// Longest device name shown on the timeline axis before truncation.
const LABEL_MAX_CHARS: usize = 30;

// ---------------------------------------------------------------------------
// Sort order for the device details
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortKey {
    #[default]
    NameAsc,
    DurationAsc,
    DurationDesc,
    StartDesc,
    StartAsc,
}

impl SortKey {
    /// In the order the sort selector lists them.
    pub const ALL: [SortKey; 5] = [
        SortKey::NameAsc,
        SortKey::DurationAsc,
        SortKey::DurationDesc,
        SortKey::StartDesc,
        SortKey::StartAsc,
    ];

    pub fn label(self) -> &'static str {
        match self {
            SortKey::NameAsc => "Device Name",
            SortKey::DurationAsc => "Duration (Shortest First)",
            SortKey::DurationDesc => "Duration (Longest First)",
            SortKey::StartDesc => "Start Date (Newest First)",
            SortKey::StartAsc => "Start Date (Oldest First)",
        }
    }

    /// Stable sort, so ties keep dataset order.
    pub fn sort(self, rows: &mut [DetailRow]) {
        match self {
            SortKey::NameAsc => rows.sort_by(|a, b| a.name.cmp(&b.name)),
            SortKey::DurationAsc => rows.sort_by(|a, b| a.duration.total_cmp(&b.duration)),
            SortKey::DurationDesc => rows.sort_by(|a, b| b.duration.total_cmp(&a.duration)),
            SortKey::StartDesc => rows.sort_by(|a, b| b.start.cmp(&a.start)),
            SortKey::StartAsc => rows.sort_by(|a, b| a.start.cmp(&b.start)),
        }
    }
}

impl fmt::Display for SortKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

// ---------------------------------------------------------------------------
// Output rows
// ---------------------------------------------------------------------------

/// One device as shown in the details section.
#[derive(Debug, Clone, PartialEq)]
pub struct DetailRow {
    pub name: String,
    pub brand: String,
    pub category: String,
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub duration: f64,
    pub reason: String,
}

impl From<&DeviceRecord> for DetailRow {
    fn from(rec: &DeviceRecord) -> Self {
        DetailRow {
            name: rec.name.clone(),
            brand: rec.brand.clone(),
            category: rec.category.clone(),
            start: rec.start,
            end: rec.end,
            duration: rec.duration,
            reason: rec.reason.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReasonCount {
    pub reason: String,
    pub count: usize,
}

/// One horizontal segment of the support timeline.
#[derive(Debug, Clone, PartialEq)]
pub struct TimelineEntry {
    /// Full device name, used for hover text.
    pub name: String,
    /// Axis label, truncated for long names.
    pub label: String,
    pub brand: String,
    pub category: String,
    /// Start and end as positions on a continuous year axis.
    pub start_x: f64,
    pub end_x: f64,
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub duration: f64,
    pub reason: String,
}

// ---------------------------------------------------------------------------
// Summary
// ---------------------------------------------------------------------------

/// Aggregate figures over a non-empty filtered view.
#[derive(Debug, Clone, PartialEq)]
pub struct Summary {
    pub count: usize,
    pub mean_duration: f64,
    pub unique_brands: usize,
    pub unique_categories: usize,
    pub reasons: Vec<ReasonCount>,
    pub details: Vec<DetailRow>,
}

impl Summary {
    /// `None` for an empty view: there is no mean to report and the caller is
    /// expected to show a notice instead.
    pub fn from_view(view: &FilteredView<'_>, sort: SortKey) -> Option<Summary> {
        if view.is_empty() {
            return None;
        }

        let count = view.len();
        let mean_duration = view.records().map(|r| r.duration).sum::<f64>() / count as f64;
        let unique_brands = view
            .records()
            .map(|r| r.brand.as_str())
            .collect::<HashSet<_>>()
            .len();
        let unique_categories = view
            .records()
            .map(|r| r.category.as_str())
            .collect::<HashSet<_>>()
            .len();

        let mut details: Vec<DetailRow> = view.records().map(DetailRow::from).collect();
        sort.sort(&mut details);

        Some(Summary {
            count,
            mean_duration,
            unique_brands,
            unique_categories,
            reasons: reason_counts(view),
            details,
        })
    }
}

/// Frequency of discontinuation reasons, most common first. Ties keep the
/// order in which the reasons first appear in the view.
pub fn reason_counts(view: &FilteredView<'_>) -> Vec<ReasonCount> {
    let mut position: HashMap<&str, usize> = HashMap::new();
    let mut counts: Vec<ReasonCount> = Vec::new();

    for rec in view.records() {
        match position.get(rec.reason.as_str()) {
            Some(&i) => counts[i].count += 1,
            None => {
                position.insert(rec.reason.as_str(), counts.len());
                counts.push(ReasonCount {
                    reason: rec.reason.clone(),
                    count: 1,
                });
            }
        }
    }

    counts.sort_by(|a, b| b.count.cmp(&a.count));
    counts
}

/// Devices per category, sorted by category name.
pub fn category_counts<'a>(records: impl IntoIterator<Item = &'a DeviceRecord>) -> Vec<(String, usize)> {
    let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
    for rec in records {
        *counts.entry(rec.category.as_str()).or_default() += 1;
    }
    counts
        .into_iter()
        .map(|(category, n)| (category.to_string(), n))
        .collect()
}

/// Timeline segments in view order.
pub fn timeline(view: &FilteredView<'_>) -> Vec<TimelineEntry> {
    view.records()
        .map(|rec| TimelineEntry {
            name: rec.name.clone(),
            label: truncate_label(&rec.name),
            brand: rec.brand.clone(),
            category: rec.category.clone(),
            start_x: fractional_year(rec.start),
            end_x: fractional_year(rec.end),
            start: rec.start,
            end: rec.end,
            duration: rec.duration,
            reason: rec.reason.clone(),
        })
        .collect()
}

fn truncate_label(name: &str) -> String {
    if name.chars().count() > LABEL_MAX_CHARS {
        let head: String = name.chars().take(LABEL_MAX_CHARS).collect();
        format!("{head}...")
    } else {
        name.to_string()
    }
}
