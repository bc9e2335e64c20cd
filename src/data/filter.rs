use super::model::{DeviceDataset, DeviceRecord};
use crate::state::SelectionState;

// ---------------------------------------------------------------------------
// FilteredView – the devices passing the current selection
// ---------------------------------------------------------------------------

/// Indices into a dataset, in dataset order, plus a borrow of the dataset.
/// Cheap to rebuild; recomputed every frame rather than stored.
#[derive(Debug, Clone)]
pub struct FilteredView<'a> {
    dataset: &'a DeviceDataset,
    indices: Vec<usize>,
}

impl<'a> FilteredView<'a> {
    #[cfg(test)]
    pub fn indices(&self) -> &[usize] {
        &self.indices
    }

    pub fn len(&self) -> usize {
        self.indices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    /// Matching records in dataset order.
    pub fn records(&self) -> impl Iterator<Item = &'a DeviceRecord> + '_ {
        let records = &self.dataset.records;
        self.indices.iter().map(move |&i| &records[i])
    }
}

/// Whether a record passes all three selection predicates.
///
/// * brand: no brand chosen, or the record's brand equals it
/// * category: unset, or the record's category equals it
/// * duration: inside the closed selected range
pub fn matches(record: &DeviceRecord, selection: &SelectionState) -> bool {
    let brand_ok = selection.brand().map_or(true, |b| record.brand == b);
    let category_ok = selection.category().map_or(true, |c| record.category == c);
    brand_ok && category_ok && selection.duration().contains(record.duration)
}

/// Return the view of devices that pass the selection. Never fails; an empty
/// view is a valid result.
pub fn filter<'a>(dataset: &'a DeviceDataset, selection: &SelectionState) -> FilteredView<'a> {
    let indices = dataset
        .records
        .iter()
        .enumerate()
        .filter(|(_, rec)| matches(rec, selection))
        .map(|(i, _)| i)
        .collect();
    FilteredView { dataset, indices }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::model::tests::device;
    use crate::data::model::DurationRange;

    fn dataset() -> DeviceDataset {
        DeviceDataset::from_records(vec![
            device("Pebble Time", "Pebble", "Smartwatch", 3.2),
            device("Nest Secure", "Google", "Security", 6.4),
            device("Wink Hub", "Wink", "Smart Home", 1.0),
            device("Pixel Watch", "Google", "Smartwatch", 2.0),
            device("Revolv Hub", "Google", "Smart Home", 3.4),
        ])
    }

    #[test]
    fn default_selection_is_identity() {
        let ds = dataset();
        let selection = SelectionState::for_dataset(&ds);
        let view = filter(&ds, &selection);
        assert_eq!(view.indices(), &[0, 1, 2, 3, 4]);
        assert_eq!(view.records().cloned().collect::<Vec<_>>(), ds.records);
    }

    #[test]
    fn two_record_brand_filter() {
        let ds = DeviceDataset::from_records(vec![
            device("a", "A", "Phone", 2.0),
            device("b", "B", "Tablet", 5.0),
        ]);
        let mut selection = SelectionState::for_dataset(&ds);
        selection.set_brand(Some("A".to_string()));

        let view = filter(&ds, &selection);
        assert_eq!(view.len(), 1);
        assert_eq!(view.records().next().unwrap().name, "a");
    }

    #[test]
    fn predicates_are_conjunctive() {
        let ds = dataset();
        let mut selection = SelectionState::for_dataset(&ds);
        selection.set_brand(Some("Google".to_string()));
        selection.set_category(Some("Smart Home".to_string()));
        let view = filter(&ds, &selection);
        assert_eq!(view.indices(), &[4]);

        selection.set_duration_range(1.0, 3.0).unwrap();
        assert!(filter(&ds, &selection).is_empty());
    }

    #[test]
    fn duration_bounds_are_inclusive() {
        let ds = dataset();
        let mut selection = SelectionState::for_dataset(&ds);
        selection.set_duration_range(2.0, 3.4).unwrap();
        let names: Vec<_> = filter(&ds, &selection).records().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["Pebble Time", "Pixel Watch", "Revolv Hub"]);
    }

    #[test]
    fn partition_holds_for_every_selection() {
        let ds = dataset();
        let brands: Vec<Option<String>> = std::iter::once(None)
            .chain(ds.brands.iter().cloned().map(Some))
            .chain(std::iter::once(Some("Nokia".to_string())))
            .collect();
        let categories: Vec<Option<String>> = std::iter::once(None)
            .chain(ds.categories.iter().cloned().map(Some))
            .collect();
        let ranges = [
            DurationRange::new(1.0, 6.4),
            DurationRange::new(1.0, 1.0),
            DurationRange::new(2.0, 3.4),
            DurationRange::new(3.3, 6.4),
        ];

        for brand in &brands {
            for category in &categories {
                for range in &ranges {
                    let mut selection = SelectionState::for_dataset(&ds);
                    selection.set_brand(brand.clone());
                    selection.set_category(category.clone());
                    selection.set_duration_range(range.lo, range.hi).unwrap();

                    let view = filter(&ds, &selection);
                    for (i, rec) in ds.records.iter().enumerate() {
                        let included = view.indices().contains(&i);
                        let brand_ok = brand.as_deref().map_or(true, |b| rec.brand == b);
                        let category_ok = category.as_deref().map_or(true, |c| rec.category == c);
                        let duration_ok = range.lo <= rec.duration && rec.duration <= range.hi;
                        assert_eq!(
                            included,
                            brand_ok && category_ok && duration_ok,
                            "{} under {brand:?}/{category:?}/{range:?}",
                            rec.name
                        );
                    }
                }
            }
        }
    }

    #[test]
    fn filtering_does_not_touch_selection() {
        let ds = dataset();
        let mut selection = SelectionState::for_dataset(&ds);
        selection.select_from_chart("Smartwatch");
        let before = selection.clone();
        let _ = filter(&ds, &selection);
        assert_eq!(selection, before);
    }
}
