//! Half-open key ranges and prefix ranges.

use std::ops::Bound;

/// A half-open key range `[start, limit)`.
///
/// `limit == None` means the range is unbounded above.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Range {
    /// First key of the range, included.
    pub start: Vec<u8>,
    /// First key past the range, excluded.
    pub limit: Option<Vec<u8>>,
}

impl Range {
    /// Create a range from explicit bounds.
    pub fn new(start: impl Into<Vec<u8>>, limit: Option<Vec<u8>>) -> Self {
        Self {
            start: start.into(),
            limit,
        }
    }

    /// The range covering the whole keyspace.
    pub fn all() -> Self {
        Self::default()
    }

    /// The range covering exactly the keys that start with `prefix`.
    pub fn prefix(prefix: &[u8]) -> Self {
        bytes_prefix(prefix)
    }

    /// Check whether `key` lies inside the range.
    pub fn contains(&self, key: &[u8]) -> bool {
        if key < self.start.as_slice() {
            return false;
        }
        match &self.limit {
            Some(limit) => key < limit.as_slice(),
            None => true,
        }
    }

    /// Check whether the range holds no key at all.
    pub fn is_empty(&self) -> bool {
        matches!(&self.limit, Some(limit) if limit.as_slice() <= self.start.as_slice())
    }

    /// Check whether this is the canonical prefix range of its own start.
    ///
    /// Limits are compared after zero-padding the shorter one, so a limit
    /// written with trailing zero bytes still counts as prefix-shaped.
    pub fn is_prefix(&self) -> bool {
        let canonical = bytes_prefix(&self.start);
        let expect = canonical.limit.unwrap_or_default();
        let actual = self.limit.clone().unwrap_or_default();

        let width = expect.len().max(actual.len());
        let mut expect = expect;
        let mut actual = actual;
        expect.resize(width, 0);
        actual.resize(width, 0);
        expect == actual
    }

    /// Bounds borrowed as slices, for ordered maps and engine range scans.
    pub fn bounds(&self) -> (Bound<&[u8]>, Bound<&[u8]>) {
        let upper = match &self.limit {
            Some(limit) => Bound::Excluded(limit.as_slice()),
            None => Bound::Unbounded,
        };
        (Bound::Included(self.start.as_slice()), upper)
    }
}

/// Compute the range covering every key that starts with `prefix`.
///
/// The limit is `prefix` with its last non-`0xFF` byte incremented and the
/// bytes after it dropped. An empty or all-`0xFF` prefix has no finite
/// limit and the range is unbounded above.
pub fn bytes_prefix(prefix: &[u8]) -> Range {
    let limit = prefix.iter().rposition(|&b| b < 0xff).map(|i| {
        let mut limit = prefix[..=i].to_vec();
        limit[i] += 1;
        limit
    });
    Range {
        start: prefix.to_vec(),
        limit,
    }
}
