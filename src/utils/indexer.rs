use core::ops;

/// Generate an iteration sequence. This provides *fair* iteration when multiple
/// operations need to be polled concurrently: every call to [`Indexer::iter`]
/// starts one position further along, so an operation early in the list can't
/// starve the ones after it.
#[derive(Debug)]
pub(crate) struct Indexer {
    offset: usize,
    max: usize,
}

impl Indexer {
    pub(crate) fn new(max: usize) -> Self {
        Self { offset: 0, max }
    }

    /// Generate a range between `0..max`, incrementing the starting point
    /// for the next iteration.
    pub(crate) fn iter(&mut self) -> IndexIter {
        let offset = self.offset;
        if self.max > 0 {
            self.offset = (self.offset + 1).wrapping_rem(self.max);
        }

        IndexIter {
            iter: (0..self.max),
            offset,
        }
    }
}

pub(crate) struct IndexIter {
    iter: ops::Range<usize>,
    offset: usize,
}

impl Iterator for IndexIter {
    type Item = usize;

    fn next(&mut self) -> Option<Self::Item> {
        self.iter
            .next()
            .map(|pos| (pos + self.offset).wrapping_rem(self.iter.end))
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn rotates_start() {
        let mut indexer = Indexer::new(3);
        assert_eq!(indexer.iter().collect::<Vec<_>>(), [0, 1, 2]);
        assert_eq!(indexer.iter().collect::<Vec<_>>(), [1, 2, 0]);
        assert_eq!(indexer.iter().collect::<Vec<_>>(), [2, 0, 1]);
        assert_eq!(indexer.iter().collect::<Vec<_>>(), [0, 1, 2]);
    }

    #[test]
    fn empty() {
        let mut indexer = Indexer::new(0);
        assert_eq!(indexer.iter().count(), 0);
    }
}
