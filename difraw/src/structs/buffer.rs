use std::ops::Range;
use std::sync::Arc;

/// View over a contiguous byte range of a raw readout record.
///
/// The backing storage is shared, never copied; sub-views created with
/// [`Buffer::view`] alias the same allocation. Every view carries explicit
/// offsets into that allocation so independently derived cursors can be
/// compared without pointer arithmetic: two views agree on an end position
/// exactly when [`Buffer::same_backing`] holds and [`Buffer::end`] matches.
#[derive(Debug, Clone)]
pub struct Buffer {
    data: Arc<[u8]>,
    start: usize,
    end: usize,
}

impl Buffer {
    pub fn new(data: Arc<[u8]>) -> Self {
        let end = data.len();
        Self {
            data,
            start: 0,
            end,
        }
    }

    /// Sub-view of `range`, relative to this view.
    ///
    /// The range is clamped to the view bounds; an inverted range collapses
    /// to an empty view.
    pub fn view(&self, range: Range<usize>) -> Self {
        let start = self.end.min(self.start.saturating_add(range.start));
        let end = self.end.min(self.start.saturating_add(range.end)).max(start);
        Self {
            data: Arc::clone(&self.data),
            start,
            end,
        }
    }

    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    /// Offset of the first byte within the backing storage.
    pub fn start(&self) -> usize {
        self.start
    }

    /// Offset one past the last byte within the backing storage.
    pub fn end(&self) -> usize {
        self.end
    }

    /// True when both views alias the same backing allocation.
    pub fn same_backing(&self, other: &Buffer) -> bool {
        Arc::ptr_eq(&self.data, &other.data)
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.data[self.start..self.end]
    }
}

impl AsRef<[u8]> for Buffer {
    fn as_ref(&self) -> &[u8] {
        self.as_slice()
    }
}

impl Default for Buffer {
    fn default() -> Self {
        Self::from(Vec::new())
    }
}

impl From<Vec<u8>> for Buffer {
    fn from(data: Vec<u8>) -> Self {
        Self::new(data.into())
    }
}

impl From<&[u8]> for Buffer {
    fn from(data: &[u8]) -> Self {
        Self::new(data.into())
    }
}
