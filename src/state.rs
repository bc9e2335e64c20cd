use std::path::PathBuf;
use std::sync::Arc;

use thiserror::Error;

use crate::data::loader::DataSource;
use crate::data::model::{DeviceDataset, DurationRange};
use crate::data::summary::SortKey;

/// Dropdown entry meaning "no brand constraint".
pub const ALL_BRANDS: &str = "All Brands";
/// Dropdown entry meaning "no category constraint".
pub const ALL_CATEGORIES: &str = "All Categories";

#[derive(Debug, Clone, PartialEq, Error)]
pub enum SelectionError {
    #[error("invalid duration range {lo:.1}–{hi:.1}: expected lo ≤ hi within {min:.1}–{max:.1} years")]
    InvalidRange { lo: f64, hi: f64, min: f64, max: f64 },
}

// ---------------------------------------------------------------------------
// Selection state
// ---------------------------------------------------------------------------

/// The user's filter choices for one session.
///
/// `category` is the single source of truth for both the category dropdown
/// and the clickable category chart: widgets derive what they display from
/// it each frame and write to it only on an explicit user action.
#[derive(Debug, Clone, PartialEq)]
pub struct SelectionState {
    brand: Option<String>,
    category: Option<String>,
    duration: DurationRange,
    /// Observed duration range of the dataset; the default and the limit.
    bounds: DurationRange,
}

impl SelectionState {
    /// Default selection: all brands, no category, the full duration range.
    pub fn new(bounds: DurationRange) -> Self {
        Self {
            brand: None,
            category: None,
            duration: bounds,
            bounds,
        }
    }

    pub fn for_dataset(dataset: &DeviceDataset) -> Self {
        Self::new(dataset.duration_bounds)
    }

    pub fn brand(&self) -> Option<&str> {
        self.brand.as_deref()
    }

    pub fn category(&self) -> Option<&str> {
        self.category.as_deref()
    }

    pub fn duration(&self) -> DurationRange {
        self.duration
    }

    pub fn bounds(&self) -> DurationRange {
        self.bounds
    }

    /// What the brand dropdown shows.
    pub fn brand_label(&self) -> &str {
        self.brand().unwrap_or(ALL_BRANDS)
    }

    /// What the category dropdown shows.
    pub fn category_label(&self) -> &str {
        self.category().unwrap_or(ALL_CATEGORIES)
    }

    /// Whether no field narrows the dataset.
    pub fn is_default(&self) -> bool {
        *self == Self::new(self.bounds)
    }

    pub fn set_brand(&mut self, brand: Option<String>) {
        self.brand = brand;
    }

    /// `None` is the dropdown's "all categories" entry and clears the filter.
    pub fn set_category(&mut self, category: Option<String>) {
        self.category = category;
    }

    /// Category chosen by clicking a chart segment.
    pub fn select_from_chart(&mut self, category: &str) {
        self.category = Some(category.to_string());
    }

    /// Rejects `lo > hi`, non-finite values and anything outside the
    /// dataset's observed range; the previous range is kept on error.
    pub fn set_duration_range(&mut self, lo: f64, hi: f64) -> Result<(), SelectionError> {
        let candidate = DurationRange::new(lo, hi);
        if !(lo.is_finite() && hi.is_finite() && lo <= hi && self.bounds.encloses(&candidate)) {
            return Err(SelectionError::InvalidRange {
                lo,
                hi,
                min: self.bounds.lo,
                max: self.bounds.hi,
            });
        }
        self.duration = candidate;
        Ok(())
    }

    /// Reset every field to its default in one step.
    pub fn clear_all(&mut self) {
        *self = Self::new(self.bounds);
    }
}

// ---------------------------------------------------------------------------
// Application state
// ---------------------------------------------------------------------------

/// How the device detail section lays out its rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DetailLayout {
    #[default]
    Cards,
    Table,
}

/// A loaded dataset together with the selection made against it.
#[derive(Debug, Clone)]
pub struct Session {
    pub dataset: Arc<DeviceDataset>,
    pub selection: SelectionState,
}

/// The full UI state, independent of rendering.
pub struct AppState {
    /// Where the current (or pending) dataset comes from.
    pub source: DataSource,

    /// Loaded dataset and filter choices (None until a load succeeds).
    pub session: Option<Session>,

    /// Blocking error from the initial load; nothing is computed while set.
    pub load_error: Option<String>,

    /// Sort order of the device details.
    pub sort_key: SortKey,

    pub detail_layout: DetailLayout,

    /// Status / error message shown in the top bar.
    pub status_message: Option<String>,
}

impl AppState {
    /// Build state for `path` and attempt the first load.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let mut state = Self {
            source: DataSource::new(path),
            session: None,
            load_error: None,
            sort_key: SortKey::default(),
            detail_layout: DetailLayout::default(),
            status_message: None,
        };
        state.reload();
        state
    }

    /// Load (or fetch from cache) the current source.
    pub fn reload(&mut self) {
        match self.source.load() {
            Ok(dataset) => self.set_dataset(dataset),
            Err(e) => {
                log::error!("Failed to load {}: {e:#}", self.source.path().display());
                self.session = None;
                self.load_error = Some(e.to_string());
            }
        }
    }

    /// Switch to another file; on failure the current session is kept.
    pub fn open_path(&mut self, path: PathBuf) {
        let source = DataSource::new(path);
        match source.load() {
            Ok(dataset) => {
                self.source = source;
                self.set_dataset(dataset);
            }
            Err(e) => {
                log::error!("Failed to load {}: {e:#}", source.path().display());
                if self.session.is_some() {
                    self.status_message = Some(format!("Error: {e}"));
                } else {
                    self.source = source;
                    self.load_error = Some(e.to_string());
                }
            }
        }
    }

    /// Ingest a newly loaded dataset and reset the selection to its defaults.
    pub fn set_dataset(&mut self, dataset: Arc<DeviceDataset>) {
        let selection = SelectionState::for_dataset(&dataset);
        self.session = Some(Session { dataset, selection });
        self.load_error = None;
        self.status_message = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::model::tests::device;

    fn selection() -> SelectionState {
        SelectionState::new(DurationRange::new(0.5, 12.0))
    }

    #[test]
    fn defaults_cover_everything() {
        let s = selection();
        assert_eq!(s.brand(), None);
        assert_eq!(s.category(), None);
        assert_eq!(s.duration(), DurationRange::new(0.5, 12.0));
        assert_eq!(s.brand_label(), ALL_BRANDS);
        assert_eq!(s.category_label(), ALL_CATEGORIES);
        assert!(s.is_default());
    }

    #[test]
    fn for_dataset_uses_observed_bounds() {
        let ds = DeviceDataset::from_records(vec![
            device("a", "A", "Phone", 2.0),
            device("b", "B", "Tablet", 5.0),
        ]);
        assert_eq!(
            SelectionState::for_dataset(&ds).duration(),
            DurationRange::new(2.0, 5.0)
        );
    }

    #[test]
    fn clear_all_restores_defaults() {
        let mut s = selection();
        s.set_brand(Some("Google".to_string()));
        s.select_from_chart("Smart Home");
        s.set_duration_range(1.0, 4.0).unwrap();
        assert!(!s.is_default());

        s.clear_all();
        assert_eq!(s, selection());
    }

    #[test]
    fn chart_selection_shows_in_dropdown() {
        let mut s = selection();
        // Dropdown rendered with the sentinel first; that render writes nothing.
        assert_eq!(s.category_label(), ALL_CATEGORIES);

        s.select_from_chart("Smartphones");
        assert_eq!(s.category_label(), "Smartphones");
        assert_eq!(s.category(), Some("Smartphones"));
    }

    #[test]
    fn dropdown_all_clears_category() {
        let mut s = selection();
        s.select_from_chart("Smartphones");
        s.set_category(None);
        assert_eq!(s.category(), None);
        assert_eq!(s.category_label(), ALL_CATEGORIES);
    }

    #[test]
    fn inverted_range_is_rejected_and_state_kept() {
        let mut s = SelectionState::new(DurationRange::new(0.0, 20.0));
        s.set_duration_range(2.0, 8.0).unwrap();
        let before = s.clone();

        let err = s.set_duration_range(10.0, 1.0).unwrap_err();
        assert!(matches!(err, SelectionError::InvalidRange { lo, hi, .. } if lo == 10.0 && hi == 1.0));
        assert_eq!(s, before);
    }

    #[test]
    fn out_of_bounds_range_is_rejected() {
        let mut s = selection();
        assert!(s.set_duration_range(0.1, 3.0).is_err());
        assert!(s.set_duration_range(3.0, 12.5).is_err());
        assert!(s.set_duration_range(f64::NAN, 3.0).is_err());
        assert_eq!(s.duration(), DurationRange::new(0.5, 12.0));

        s.set_duration_range(0.5, 12.0).unwrap();
        s.set_duration_range(3.0, 3.0).unwrap();
        assert_eq!(s.duration(), DurationRange::new(3.0, 3.0));
    }

    #[test]
    fn mutators_touch_only_their_field() {
        let mut s = selection();
        s.select_from_chart("Tablet");
        s.set_duration_range(1.0, 2.0).unwrap();

        s.set_brand(Some("Amazon".to_string()));
        assert_eq!(s.category(), Some("Tablet"));
        assert_eq!(s.duration(), DurationRange::new(1.0, 2.0));

        s.set_category(Some("Phone".to_string()));
        assert_eq!(s.brand(), Some("Amazon"));
        assert_eq!(s.duration(), DurationRange::new(1.0, 2.0));

        s.set_duration_range(1.5, 2.0).unwrap();
        assert_eq!(s.brand(), Some("Amazon"));
        assert_eq!(s.category(), Some("Phone"));
    }

    #[test]
    fn mutators_are_idempotent() {
        let mut s = selection();
        s.set_brand(Some("Amazon".to_string()));
        s.select_from_chart("Tablet");
        s.set_duration_range(1.0, 2.0).unwrap();
        let once = s.clone();

        s.set_brand(Some("Amazon".to_string()));
        s.select_from_chart("Tablet");
        s.set_duration_range(1.0, 2.0).unwrap();
        assert_eq!(s, once);

        s.clear_all();
        s.clear_all();
        assert_eq!(s, selection());
    }

    #[test]
    fn missing_source_blocks_without_session() {
        let dir = tempfile::TempDir::new().unwrap();
        let state = AppState::open(dir.path().join("lifecycledata.csv"));
        assert!(state.session.is_none());
        assert!(state.load_error.as_deref().unwrap().contains("not found"));
    }

    #[test]
    fn opening_a_file_resets_selection() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("devices.csv");
        std::fs::write(
            &path,
            "Device Name,Brand,Device Category,Start Date,End Date,Reason for Discontinuing\n\
             Hub,Wink,Smart Home,2014-01-01,2018-01-01,Subscription change\n\
             Jibo,Jibo,Robot,2017-09-01,2019-03-01,Company closed\n",
        )
        .unwrap();

        let mut state = AppState::open(&path);
        assert!(state.load_error.is_none());
        let session = state.session.as_mut().unwrap();
        assert_eq!(session.dataset.len(), 2);
        session.selection.select_from_chart("Robot");

        // A failed open keeps the current session and reports the error.
        state.open_path(dir.path().join("missing.csv"));
        assert_eq!(
            state.session.as_ref().unwrap().selection.category(),
            Some("Robot")
        );
        assert!(state.status_message.is_some());

        state.open_path(path);
        let session = state.session.as_ref().unwrap();
        assert!(session.selection.is_default());
        assert!(state.status_message.is_none());
    }
}
