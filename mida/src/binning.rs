/*! Enumeration of the ways to distribute identical atoms across isotope classes */
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use identity_hash::BuildIdentityHasher;
use tracing::trace;

/// Every length-`bins` vector of non-negative integers summing to `items`, stored row-major.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Binnings {
    items: u32,
    bins: usize,
    rows: usize,
    data: Vec<u32>,
}

impl Binnings {
    fn zeros(bins: usize) -> Self {
        Self {
            items: 0,
            bins,
            rows: 1,
            data: vec![0; bins],
        }
    }

    fn empty(items: u32) -> Self {
        Self {
            items,
            bins: 0,
            rows: 0,
            data: Vec::new(),
        }
    }

    /// The number of binnings
    pub fn len(&self) -> usize {
        self.rows
    }

    pub fn is_empty(&self) -> bool {
        self.rows == 0
    }

    pub fn items(&self) -> u32 {
        self.items
    }

    pub fn bins(&self) -> usize {
        self.bins
    }

    pub fn row(&self, index: usize) -> &[u32] {
        let start = index * self.bins;
        &self.data[start..start + self.bins]
    }

    pub fn iter(&self) -> impl ExactSizeIterator<Item = &[u32]> + '_ {
        (0..self.rows).map(move |i| self.row(i))
    }
}

/// The number of binnings of `items` into `bins`, `C(items + bins - 1, bins - 1)`
pub fn binning_count(items: u32, bins: usize) -> u64 {
    if bins == 0 {
        return if items == 0 { 1 } else { 0 };
    }
    let n = items as u64 + bins as u64 - 1;
    let k = (bins as u64 - 1).min(items as u64);
    (1..=k).fold(1u64, |acc, i| acc * (n - k + i) / i)
}

type BinningKey = usize;

/// A memoizing store of [`Binnings`] keyed by `(items, bins)`.
///
/// The same atom count and isotope count pairs recur across every molecule built
/// from one reference table, so each enumeration is computed once and shared.
/// The cache is safe to share between threads.
#[derive(Debug, Default)]
pub struct BinningCache {
    cache: RwLock<HashMap<BinningKey, Arc<Binnings>, BuildIdentityHasher<BinningKey>>>,
}

impl BinningCache {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline(always)]
    fn make_key(items: u32, bins: usize) -> Option<BinningKey> {
        if bins > u16::MAX as usize {
            None
        } else {
            Some(((items as usize) << 16) | bins)
        }
    }

    pub fn len(&self) -> usize {
        self.cache.read().map(|c| c.len()).unwrap_or_default()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&mut self) {
        match self.cache.get_mut() {
            Ok(cache) => cache.clear(),
            Err(poisoned) => poisoned.into_inner().clear(),
        }
    }

    fn lookup(&self, key: BinningKey) -> Option<Arc<Binnings>> {
        self.cache.read().ok().and_then(|c| c.get(&key).cloned())
    }

    fn store(&self, key: BinningKey, value: Binnings) -> Arc<Binnings> {
        match self.cache.write() {
            Ok(mut cache) => cache.entry(key).or_insert_with(|| Arc::new(value)).clone(),
            Err(_) => Arc::new(value),
        }
    }

    /// Get every way to place `items` indistinguishable units into `bins` labeled slots.
    ///
    /// Rows are ordered by the recurrence: first the binnings of `items - 1` with one unit
    /// added to slot 0, then the binnings of `items` over `bins - 1` slots with an empty
    /// slot 0 prepended.
    pub fn get(&self, items: u32, bins: usize) -> Arc<Binnings> {
        if items == 0 {
            return Arc::new(Binnings::zeros(bins));
        }
        if bins == 0 {
            return Arc::new(Binnings::empty(items));
        }
        let key = Self::make_key(items, bins);
        if let Some(hit) = key.and_then(|k| self.lookup(k)) {
            return hit;
        }

        let added = self.get(items - 1, bins);
        let shifted = self.get(items, bins - 1);

        let rows = added.len() + shifted.len();
        let mut data = Vec::with_capacity(rows * bins);
        for combo in added.iter() {
            data.push(combo[0] + 1);
            data.extend_from_slice(&combo[1..]);
        }
        for combo in shifted.iter() {
            data.push(0);
            data.extend_from_slice(combo);
        }
        let value = Binnings {
            items,
            bins,
            rows,
            data,
        };
        match key {
            Some(key) => {
                trace!("Caching {rows} binnings of {items} items into {bins} bins");
                self.store(key, value)
            }
            None => Arc::new(value),
        }
    }

    /// Pre-compute binnings for every atom count up to `max_items` and every isotope count
    /// up to `max_bins`
    pub fn populate(&self, max_items: u32, max_bins: usize) {
        trace!("Starting binning cache population");
        for bins in 1..=max_bins {
            self.get(max_items, bins);
        }
        trace!(
            "Finished binning cache population, {} entries created",
            self.len()
        );
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use itertools::Itertools;
    use rayon::prelude::*;

    #[test]
    fn test_base_cases() {
        let cache = BinningCache::new();
        let b = cache.get(0, 3);
        assert_eq!(b.len(), 1);
        assert_eq!(b.row(0), &[0, 0, 0]);

        let b = cache.get(4, 0);
        assert!(b.is_empty());

        let b = cache.get(0, 0);
        assert_eq!(b.len(), 1);
        assert!(b.row(0).is_empty());
        assert!(cache.is_empty());
    }

    #[test]
    fn test_order() {
        let cache = BinningCache::new();
        let b = cache.get(2, 2);
        let rows: Vec<Vec<u32>> = b.iter().map(|r| r.to_vec()).collect();
        assert_eq!(rows, vec![vec![2, 0], vec![1, 1], vec![0, 2]]);

        let b = cache.get(1, 3);
        let rows: Vec<Vec<u32>> = b.iter().map(|r| r.to_vec()).collect();
        assert_eq!(rows, vec![vec![1, 0, 0], vec![0, 1, 0], vec![0, 0, 1]]);
    }

    #[test]
    fn test_cardinality() {
        let cache = BinningCache::new();
        for items in 0..12u32 {
            for bins in 1..6usize {
                let b = cache.get(items, bins);
                assert_eq!(b.len() as u64, binning_count(items, bins), "{items} into {bins}");
                assert_eq!(b.bins(), bins);
                for row in b.iter() {
                    assert_eq!(row.len(), bins);
                    assert_eq!(row.iter().sum::<u32>(), items);
                }
                let distinct = b.iter().unique().count();
                assert_eq!(distinct, b.len());
            }
        }
    }

    #[test]
    fn test_count() {
        assert_eq!(binning_count(0, 0), 1);
        assert_eq!(binning_count(3, 0), 0);
        assert_eq!(binning_count(5, 1), 1);
        assert_eq!(binning_count(10, 2), 11);
        assert_eq!(binning_count(20, 4), 1771);
    }

    #[test]
    fn test_cache_reuse() {
        let mut cache = BinningCache::new();
        let a = cache.get(6, 3);
        let n = cache.len();
        assert!(n > 0);
        let b = cache.get(6, 3);
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(cache.len(), n);

        cache.clear();
        assert!(cache.is_empty());
        let c = cache.get(6, 3);
        assert_eq!(*a, *c);
    }

    #[test]
    fn test_populate() {
        let cache = BinningCache::new();
        cache.populate(8, 4);
        let n = cache.len();
        cache.get(8, 4);
        cache.get(5, 2);
        assert_eq!(cache.len(), n);
    }

    #[test]
    fn test_shared_across_threads() {
        let cache = BinningCache::new();
        let lengths: Vec<usize> = (1..40u32)
            .into_par_iter()
            .map(|items| cache.get(items, 4).len())
            .collect();
        for (items, n) in (1..40u32).zip(lengths) {
            assert_eq!(n as u64, binning_count(items, 4));
        }
    }
}
