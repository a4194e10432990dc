/// Retained bytes of the last native read on one pipe.
///
/// Holds a fixed-capacity byte area and a cursor pair
/// `first <= last <= capacity`. Bytes in `first..last` were delivered by the
/// driver but not yet handed to a caller. The area is allocated once and
/// reused; resetting only moves the cursors.
#[derive(Debug)]
pub(crate) struct ReadBuffer {
    data: Box<[u8]>,
    first: usize,
    last: usize,
}

impl ReadBuffer {
    pub(crate) fn new(capacity: usize) -> Self {
        Self {
            data: vec![0u8; capacity].into_boxed_slice(),
            first: 0,
            last: 0,
        }
    }

    /// Number of retained, unconsumed bytes.
    #[inline]
    pub(crate) fn len(&self) -> usize {
        self.last - self.first
    }

    #[inline]
    pub(crate) fn is_empty(&self) -> bool {
        self.first == self.last
    }

    #[inline]
    pub(crate) fn capacity(&self) -> usize {
        self.data.len()
    }

    /// Moves up to `dest.len()` retained bytes into `dest`, returning the count.
    pub(crate) fn take(&mut self, dest: &mut [u8]) -> usize {
        let n = self.len().min(dest.len());
        if n > 0 {
            dest[..n].copy_from_slice(&self.data[self.first..self.first + n]);
            self.first += n;
        }
        n
    }

    /// Refills the whole area using `fill`, which receives the entire byte
    /// area and returns how many bytes it wrote. Any retained bytes are
    /// dropped; callers refill only once the buffer has been drained.
    pub(crate) fn refill_with<F, R>(&mut self, fill: F) -> R
    where
        F: FnOnce(&mut [u8]) -> (usize, R),
    {
        debug_assert!(self.is_empty());
        let (n, ret) = fill(&mut self.data);
        self.first = 0;
        self.last = n.min(self.data.len());
        ret
    }

    pub(crate) fn clear(&mut self) {
        self.first = 0;
        self.last = 0;
    }
}
