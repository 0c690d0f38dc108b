//! Click-to-drop-pin location picker.
//!
//! A two-state machine: nothing selected, or one selected coordinate.
//! Every click replaces the selection and asks the map to fly there
//! without touching the zoom level.
//!
//! A selection belongs to one page load. [`PageSessions`] hands each load its
//! own picker, so a reload starts empty and tabs never share a pin.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Most page loads whose pickers are kept. The oldest is forgotten first.
pub const MAX_PAGES: usize = 256;

/// A geographic coordinate in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LatLng {
    pub lat: f64,
    pub lng: f64,
}

impl LatLng {
    #[must_use]
    pub const fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    /// Both components are finite numbers.
    #[must_use]
    pub fn is_finite(&self) -> bool {
        self.lat.is_finite() && self.lng.is_finite()
    }
}

/// Picker state.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum Selection {
    #[default]
    NoSelection,
    Selected(LatLng),
}

/// Instruction for the map view after a click. The current zoom is kept.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Recenter {
    pub target: LatLng,
}

/// Holds the last manual map click.
#[derive(Debug, Clone, Default)]
pub struct LocationPicker {
    selection: Selection,
}

impl LocationPicker {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Handle a click on the map surface.
    pub fn click(&mut self, at: LatLng) -> Recenter {
        self.selection = Selection::Selected(at);
        tracing::debug!(lat = at.lat, lng = at.lng, "location selected");
        Recenter { target: at }
    }

    #[must_use]
    pub fn selection(&self) -> Selection {
        self.selection
    }

    /// The selected point, if any.
    #[must_use]
    pub fn selected(&self) -> Option<LatLng> {
        match self.selection() {
            Selection::NoSelection => None,
            Selection::Selected(at) => Some(at),
        }
    }
}

/// Identifier handed to one load of the page shell.
pub type PageId = u64;

/// One [`LocationPicker`] per page load, bounded to [`MAX_PAGES`].
#[derive(Debug, Default)]
pub struct PageSessions {
    next_id: PageId,
    pickers: BTreeMap<PageId, LocationPicker>,
}

impl PageSessions {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a fresh page load with nothing selected.
    pub fn open(&mut self) -> PageId {
        let page = self.next_id;
        self.next_id += 1;
        self.insert(page);
        page
    }

    /// Handle a click on the map of `page`. A page that was forgotten gets a
    /// new picker rather than an error.
    pub fn click(&mut self, page: PageId, at: LatLng) -> Recenter {
        self.insert(page).click(at)
    }

    /// The point selected on `page`, if the page is known and has one.
    #[must_use]
    pub fn selected(&self, page: PageId) -> Option<LatLng> {
        self.pickers.get(&page).and_then(LocationPicker::selected)
    }

    fn insert(&mut self, page: PageId) -> &mut LocationPicker {
        if !self.pickers.contains_key(&page) && self.pickers.len() >= MAX_PAGES {
            if let Some((evicted, _)) = self.pickers.pop_first() {
                tracing::debug!(page = evicted, "forgetting oldest page selection");
            }
        }
        self.pickers.entry(page).or_insert_with(LocationPicker::new)
    }
}

/// Popup lines for a selected point, coordinates rounded to 4 places.
#[must_use]
pub fn popup_lines(at: LatLng) -> [String; 3] {
    [
        "Custom Selected Location".to_string(),
        format!("Lat: {:.4}", at.lat),
        format!("Lng: {:.4}", at.lng),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_starts_empty() {
        let picker = LocationPicker::new();
        assert_eq!(picker.selection(), Selection::NoSelection);
        assert!(picker.selected().is_none());
    }

    #[test]
    fn test_click_selects_and_recenters() {
        let mut picker = LocationPicker::new();
        let at = LatLng::new(12.3456, 77.6543);

        let recenter = picker.click(at);

        assert_eq!(recenter.target, at);
        assert_eq!(picker.selection(), Selection::Selected(at));
    }

    #[test]
    fn test_click_replaces_previous_selection() {
        let mut picker = LocationPicker::new();
        picker.click(LatLng::new(1.0, 2.0));
        picker.click(LatLng::new(-33.8688, 151.2093));

        assert_eq!(picker.selected(), Some(LatLng::new(-33.8688, 151.2093)));
    }

    #[test]
    fn test_popup_rounds_to_four_places() {
        let lines = popup_lines(LatLng::new(12.345_649, 77.654_34));
        assert_eq!(lines[0], "Custom Selected Location");
        assert_eq!(lines[1], "Lat: 12.3456");
        assert_eq!(lines[2], "Lng: 77.6543");
    }

    #[test]
    fn test_pages_start_empty_and_stay_apart() {
        let mut pages = PageSessions::new();
        let first = pages.open();
        let second = pages.open();
        assert_ne!(first, second);

        pages.click(first, LatLng::new(1.0, 2.0));
        pages.click(first, LatLng::new(3.0, 4.0));

        assert_eq!(pages.selected(first), Some(LatLng::new(3.0, 4.0)));
        assert_eq!(pages.selected(second), None);

        // Reloading is a new page load
        let reloaded = pages.open();
        assert_eq!(pages.selected(reloaded), None);
    }

    #[test]
    fn test_unknown_page_has_no_selection() {
        let mut pages = PageSessions::new();
        assert_eq!(pages.selected(7), None);

        let recenter = pages.click(7, LatLng::new(5.0, 6.0));
        assert_eq!(recenter.target, LatLng::new(5.0, 6.0));
        assert_eq!(pages.selected(7), Some(LatLng::new(5.0, 6.0)));
    }

    #[test]
    fn test_pages_are_bounded_oldest_first() {
        let mut pages = PageSessions::new();
        let oldest = pages.open();
        pages.click(oldest, LatLng::new(1.0, 1.0));
        for _ in 0..MAX_PAGES {
            pages.open();
        }

        assert_eq!(pages.pickers.len(), MAX_PAGES);
        assert_eq!(pages.selected(oldest), None);

        // A click on a forgotten page survives its own insertion
        pages.click(oldest, LatLng::new(2.0, 2.0));
        assert_eq!(pages.pickers.len(), MAX_PAGES);
        assert_eq!(pages.selected(oldest), Some(LatLng::new(2.0, 2.0)));
    }

    #[test]
    fn test_non_finite_detection() {
        assert!(LatLng::new(10.0, 20.0).is_finite());
        assert!(!LatLng::new(f64::NAN, 20.0).is_finite());
        assert!(!LatLng::new(10.0, f64::INFINITY).is_finite());
    }
}
