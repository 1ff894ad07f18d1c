//! Row selection, keyed by record identifier.
//!
//! Selection survives page, sort and filter changes because it stores ids,
//! not row positions. Ids of records that leave the source are pruned so a
//! consumer never observes a selected id that no longer exists.

use std::collections::BTreeSet;
use tracing::debug;

/// Tri-state of the "select page" header checkbox.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageSelection {
    /// No visible row is selected (also the state for an empty page).
    None,
    /// Some but not all visible rows are selected.
    Partial,
    /// Every visible row is selected.
    All,
}

/// Identifiers chosen for bulk action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectionSet<Id: Ord> {
    ids: BTreeSet<Id>,
}

impl<Id: Ord> Default for SelectionSet<Id> {
    fn default() -> Self {
        Self {
            ids: BTreeSet::new(),
        }
    }
}

impl<Id: Ord> SelectionSet<Id> {
    /// Empty selection.
    pub fn new() -> Self {
        Self::default()
    }

    /// Deselect everything.
    pub fn clear(&mut self) {
        self.ids.clear();
    }

    /// Whether `id` is selected.
    pub fn is_selected(&self, id: &Id) -> bool {
        self.ids.contains(id)
    }

    /// Iterate selected ids in ascending order.
    pub fn iter(&self) -> impl Iterator<Item = &Id> {
        self.ids.iter()
    }

    /// Number of selected ids.
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    /// Whether nothing is selected.
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Header checkbox state for the visible rows.
    pub fn page_state(&self, visible: &[Id]) -> PageSelection {
        let selected = visible.iter().filter(|id| self.ids.contains(*id)).count();
        match selected {
            0 => PageSelection::None,
            n if n == visible.len() => PageSelection::All,
            _ => PageSelection::Partial,
        }
    }
}

impl<Id: Ord + Clone + std::fmt::Debug> SelectionSet<Id> {
    /// Flip one row. Returns whether it is selected afterwards.
    pub fn toggle(&mut self, id: Id) -> bool {
        if self.ids.remove(&id) {
            false
        } else {
            self.ids.insert(id);
            true
        }
    }

    /// "Select page" control.
    ///
    /// When every visible row is already selected, deselects them; otherwise
    /// selects every visible row. Rows outside `visible` are never touched.
    /// An empty page is a no-op.
    pub fn toggle_all(&mut self, visible: &[Id]) {
        if visible.is_empty() {
            return;
        }
        if self.page_state(visible) == PageSelection::All {
            for id in visible {
                self.ids.remove(id);
            }
            debug!(count = visible.len(), "page deselected");
        } else {
            self.ids.extend(visible.iter().cloned());
            debug!(count = visible.len(), "page selected");
        }
    }

    /// Selected ids in ascending order.
    pub fn selected_ids(&self) -> Vec<Id> {
        self.ids.iter().cloned().collect()
    }

    /// Drop ids of removed records. Returns how many were selected.
    pub fn prune<'a, I>(&mut self, removed: I) -> usize
    where
        I: IntoIterator<Item = &'a Id>,
        Id: 'a,
    {
        let before = self.ids.len();
        for id in removed {
            self.ids.remove(id);
        }
        let pruned = before - self.ids.len();
        if pruned > 0 {
            debug!(pruned, "selection pruned");
        }
        pruned
    }

    /// Keep only ids for which `exists` holds, after the source was replaced.
    pub fn retain_existing(&mut self, mut exists: impl FnMut(&Id) -> bool) -> usize {
        let before = self.ids.len();
        self.ids.retain(|id| exists(id));
        before - self.ids.len()
    }
}
