use indexmap::IndexMap;
use std::collections::VecDeque;
use std::sync::{Arc, RwLock};

use crate::data::{CanonicalRecord, ScoredRecord, Sentiment};
use crate::types::RecordId;

/// Thread-safe cache of sentiment results keyed by record id.
///
/// Record ids are content-derived, so a hit is only reused when the cached
/// canonical record is identical to the incoming one. Oldest entries are
/// evicted first once `max_records` is exceeded.
#[derive(Clone)]
pub struct ScoreCache {
    inner: Arc<RwLock<ScoreCacheInner>>,
}

struct ScoreCacheInner {
    records: IndexMap<RecordId, ScoredRecord>,
    order: VecDeque<RecordId>,
    max_records: usize,
    hits: u64,
    misses: u64,
}

/// Hit/miss counters since the cache was created or last cleared.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Lookups answered from the cache.
    pub hits: u64,
    /// Lookups that had to be scored.
    pub misses: u64,
    /// Records currently retained.
    pub len: usize,
}

impl ScoreCache {
    /// Create a cache capped to at most `max_records` entries; 0 disables caching.
    pub fn new(max_records: usize) -> Self {
        Self {
            inner: Arc::new(RwLock::new(ScoreCacheInner {
                records: IndexMap::new(),
                order: VecDeque::new(),
                max_records,
                hits: 0,
                misses: 0,
            })),
        }
    }

    /// Cached sentiment for `record`, if an identical record was scored before.
    pub fn lookup(&self, record: &CanonicalRecord) -> Option<Sentiment> {
        let mut inner = self.inner.write().expect("score cache poisoned");
        let found = inner
            .records
            .get(&record.id)
            .filter(|cached| cached.record == *record)
            .map(ScoredRecord::sentiment);
        if found.is_some() {
            inner.hits = inner.hits.saturating_add(1);
        } else {
            inner.misses = inner.misses.saturating_add(1);
        }
        found
    }

    /// Insert or replace scored records.
    pub fn store<'a, I>(&self, records: I)
    where
        I: IntoIterator<Item = &'a ScoredRecord>,
    {
        let mut inner = self.inner.write().expect("score cache poisoned");
        if inner.max_records == 0 {
            return;
        }
        for record in records {
            let id = record.record.id.clone();
            if inner.records.insert(id.clone(), record.clone()).is_some() {
                if let Some(pos) = inner.order.iter().position(|existing| *existing == id) {
                    inner.order.remove(pos);
                }
            }
            inner.order.push_back(id);
            inner.enforce_limit();
        }
    }

    /// Remove all cached entries and reset counters.
    pub fn clear(&self) {
        let mut inner = self.inner.write().expect("score cache poisoned");
        inner.records.clear();
        inner.order.clear();
        inner.hits = 0;
        inner.misses = 0;
    }

    /// Snapshot of the hit/miss counters.
    pub fn stats(&self) -> CacheStats {
        let inner = self.inner.read().expect("score cache poisoned");
        CacheStats {
            hits: inner.hits,
            misses: inner.misses,
            len: inner.records.len(),
        }
    }

    /// Number of cached records.
    pub fn len(&self) -> usize {
        self.inner.read().expect("score cache poisoned").records.len()
    }

    /// True when nothing is cached.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl ScoreCacheInner {
    fn enforce_limit(&mut self) {
        while self.records.len() > self.max_records {
            match self.order.pop_front() {
                Some(oldest) => {
                    self.records.swap_remove(&oldest);
                }
                None => break,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{RecordTimestamp, SentimentLabel};

    fn scored(id: &str, text: &str, score: f64) -> ScoredRecord {
        ScoredRecord::new(
            CanonicalRecord {
                id: id.into(),
                timestamp: RecordTimestamp::Unknown,
                text: text.into(),
                source: "Google News".into(),
                url: None,
            },
            Sentiment {
                label: SentimentLabel::Positive,
                score,
            },
        )
    }

    #[test]
    fn lookup_hits_only_identical_records() {
        let cache = ScoreCache::new(4);
        let entry = scored("r1", "alpha", 0.8);
        cache.store([&entry]);
        assert_eq!(cache.lookup(&entry.record).map(|s| s.score), Some(0.8));

        let mut changed = entry.record.clone();
        changed.text = "beta".into();
        assert_eq!(cache.lookup(&changed), None);
        assert_eq!(
            cache.stats(),
            CacheStats {
                hits: 1,
                misses: 1,
                len: 1
            }
        );
    }

    #[test]
    fn oldest_entries_are_evicted_first() {
        let cache = ScoreCache::new(2);
        let a = scored("a", "a", 0.1);
        let b = scored("b", "b", 0.2);
        let c = scored("c", "c", 0.3);
        cache.store([&a, &b]);
        cache.store([&a]);
        cache.store([&c]);
        assert_eq!(cache.len(), 2);
        assert!(cache.lookup(&b.record).is_none());
        assert!(cache.lookup(&a.record).is_some());
        assert!(cache.lookup(&c.record).is_some());
    }

    #[test]
    fn zero_capacity_never_stores() {
        let cache = ScoreCache::new(0);
        cache.store([&scored("a", "a", 0.1)]);
        assert!(cache.is_empty());
        cache.clear();
        assert_eq!(cache.stats(), CacheStats::default());
    }
}
