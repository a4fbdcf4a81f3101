use super::domain::OfferEntry;

/// Copy of `offers` with primary entries first. The sort is stable, so every other entry keeps
/// its storage position relative to its peers; amount, date, and lender never factor in.
pub fn display_order(offers: &[OfferEntry]) -> Vec<OfferEntry> {
    let mut ordered = offers.to_vec();
    ordered.sort_by_key(|entry| !entry.is_primary);
    ordered
}

/// Viewer position within a display-ordered offer list. Moves wrap around both ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SelectionCursor {
    index: usize,
    len: usize,
}

impl SelectionCursor {
    /// Out-of-range requests wrap, so shared links with a stale index still land on an offer.
    pub fn new(len: usize, requested: usize) -> Self {
        let index = if len == 0 { 0 } else { requested % len };
        Self { index, len }
    }

    pub fn index(self) -> usize {
        self.index
    }

    pub fn len(self) -> usize {
        self.len
    }

    pub fn is_empty(self) -> bool {
        self.len == 0
    }

    pub fn next(self) -> Self {
        if self.len == 0 {
            return self;
        }
        Self {
            index: (self.index + 1) % self.len,
            len: self.len,
        }
    }

    pub fn previous(self) -> Self {
        if self.len == 0 {
            return self;
        }
        let index = if self.index == 0 {
            self.len - 1
        } else {
            self.index - 1
        };
        Self {
            index,
            len: self.len,
        }
    }
}

/// Palette slot for the offer at `display_index`.
pub fn theme_slot(display_index: usize, palette_size: usize) -> usize {
    if palette_size == 0 {
        0
    } else {
        display_index % palette_size
    }
}
