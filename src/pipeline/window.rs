/// A contiguous `[offset, offset + count)` slice of the submission listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageWindow {
    pub offset: u64,
    pub count: u64,
}

/// Tiles `[start, start + total)` into windows of `chunk_size`, clipping the last one.
///
/// The cursor always advances by `chunk_size`, independent of how many ids a
/// page actually returned.
#[derive(Debug, Clone)]
pub struct PageWindows {
    next_offset: u64,
    end: u64,
    chunk_size: u64,
}

impl PageWindows {
    pub fn new(start: u64, total: u64, chunk_size: u64) -> Self {
        Self {
            next_offset: start,
            end: start.saturating_add(total),
            chunk_size: chunk_size.max(1),
        }
    }
}

impl Iterator for PageWindows {
    type Item = PageWindow;

    fn next(&mut self) -> Option<PageWindow> {
        if self.next_offset >= self.end {
            return None;
        }
        let window = PageWindow {
            offset: self.next_offset,
            count: self.chunk_size.min(self.end - self.next_offset),
        };
        self.next_offset = self.next_offset.saturating_add(self.chunk_size);
        Some(window)
    }
}
