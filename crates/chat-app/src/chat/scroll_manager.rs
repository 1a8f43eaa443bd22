use gpui::ScrollHandle;

/// Keeps the message column pinned to its newest row.
///
/// The column ends with a zero-height anchor placed after the last bubble.
/// `scroll_to_item` is resolved by gpui during prepaint, after the changed rows
/// have been laid out, so the jump always lands below their final height.
pub struct ScrollManager {
    scroll_handle: ScrollHandle,
}

impl ScrollManager {
    pub fn new() -> Self {
        Self {
            scroll_handle: ScrollHandle::new(),
        }
    }

    pub fn handle(&self) -> &ScrollHandle {
        &self.scroll_handle
    }

    /// Child index of the tail anchor in a column holding `row_count` rows.
    pub fn anchor_index(row_count: usize) -> usize {
        row_count
    }

    /// Requests a scroll to the tail anchor and returns its index.
    pub fn follow_tail(&self, row_count: usize) -> usize {
        let anchor = Self::anchor_index(row_count);
        self.scroll_handle.scroll_to_item(anchor);
        anchor
    }
}

impl Default for ScrollManager {
    fn default() -> Self {
        Self::new()
    }
}
