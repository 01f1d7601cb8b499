//! Single-slot in-memory cache for the current card set.

use std::sync::{Arc, RwLock};

use tokio::sync::Mutex;

use super::models::{Card, CardSet};
use super::source::{CardSource, Result};

/// Holds the most recently fetched card set.
///
/// The slot is either empty or holds one complete set; a failed fetch never
/// touches it. Concurrent misses are collapsed into a single upstream fetch.
pub struct CardCache {
    source: Arc<dyn CardSource>,
    slot: RwLock<Option<CardSet>>,
    fetch_lock: Mutex<()>,
}

impl CardCache {
    pub fn new(source: Arc<dyn CardSource>) -> Self {
        Self {
            source,
            slot: RwLock::new(None),
            fetch_lock: Mutex::new(()),
        }
    }

    /// Return the cached set, fetching and storing it first if the slot is empty.
    pub async fn get_cards(&self) -> Result<CardSet> {
        if let Some(cards) = self.cached() {
            log::debug!("Card cache hit ({} cards)", cards.len());
            return Ok(cards);
        }

        let _guard = self.fetch_lock.lock().await;

        // Another request may have filled the slot while we waited.
        if let Some(cards) = self.cached() {
            return Ok(cards);
        }

        log::debug!("Card cache miss, fetching from source");
        let cards: CardSet = Arc::new(self.source.fetch_cards().await?);
        self.store(Arc::clone(&cards));
        Ok(cards)
    }

    /// Drop the cached set. No effect when already empty.
    pub fn invalidate(&self) {
        if let Ok(mut slot) = self.slot.write() {
            *slot = None;
        }
    }

    /// Invalidate, then fetch a fresh set eagerly.
    pub async fn reload(&self) -> Result<CardSet> {
        self.invalidate();
        self.get_cards().await
    }

    /// Current contents of the slot, if any.
    pub fn cached(&self) -> Option<CardSet> {
        self.slot.read().ok().and_then(|slot| slot.clone())
    }

    fn store(&self, cards: CardSet) {
        if let Ok(mut slot) = self.slot.write() {
            *slot = Some(cards);
        }
    }
}

/// Pick one card uniformly at random.
pub fn choose_random(cards: &[Card]) -> Option<&Card> {
    use rand::seq::SliceRandom;
    cards.choose(&mut rand::thread_rng())
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::cards::source::CardSourceError;
    use async_trait::async_trait;
    use std::collections::HashSet;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex as StdMutex;
    use std::time::Duration;

    /// In-memory source that counts fetches and can be switched to fail.
    pub(crate) struct CountingSource {
        pub fetches: AtomicUsize,
        pub cards: StdMutex<Vec<Card>>,
        pub fail: StdMutex<bool>,
        pub delay: Duration,
    }

    impl CountingSource {
        pub fn new(cards: Vec<Card>) -> Self {
            Self {
                fetches: AtomicUsize::new(0),
                cards: StdMutex::new(cards),
                fail: StdMutex::new(false),
                delay: Duration::ZERO,
            }
        }

        pub fn fetch_count(&self) -> usize {
            self.fetches.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl CardSource for CountingSource {
        async fn fetch_cards(&self) -> Result<Vec<Card>> {
            self.fetches.fetch_add(1, Ordering::SeqCst);
            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            if *self.fail.lock().unwrap() {
                return Err(CardSourceError::TooFewRows);
            }
            Ok(self.cards.lock().unwrap().clone())
        }
    }

    pub(crate) fn sample_cards() -> Vec<Card> {
        vec![
            Card::from_cells("1", "Hallo", "Hello").unwrap(),
            Card::from_cells("2", "Danke", "Thank you").unwrap(),
            Card::from_cells("3", "Guten Tag", "Good day").unwrap(),
        ]
    }

    #[tokio::test]
    async fn test_second_get_is_cache_hit() {
        let source = Arc::new(CountingSource::new(sample_cards()));
        let cache = CardCache::new(source.clone());

        let first = cache.get_cards().await.unwrap();
        let second = cache.get_cards().await.unwrap();

        assert_eq!(source.fetch_count(), 1);
        assert_eq!(first, second);
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[tokio::test]
    async fn test_invalidate_forces_refetch() {
        let source = Arc::new(CountingSource::new(sample_cards()));
        let cache = CardCache::new(source.clone());

        cache.get_cards().await.unwrap();
        cache.invalidate();
        assert!(cache.cached().is_none());

        // Invalidating an empty cache is a no-op.
        cache.invalidate();

        cache.get_cards().await.unwrap();
        assert_eq!(source.fetch_count(), 2);
    }

    #[tokio::test]
    async fn test_reload_replaces_set_without_extra_fetch() {
        let source = Arc::new(CountingSource::new(sample_cards()));
        let cache = CardCache::new(source.clone());

        cache.get_cards().await.unwrap();
        *source.cards.lock().unwrap() = vec![Card::from_cells("9", "Haus", "house").unwrap()];

        let reloaded = cache.reload().await.unwrap();
        assert_eq!(reloaded.len(), 1);
        assert_eq!(source.fetch_count(), 2);

        let after = cache.get_cards().await.unwrap();
        assert_eq!(after[0].id, "9");
        assert_eq!(source.fetch_count(), 2);
    }

    #[tokio::test]
    async fn test_failed_fetch_leaves_cache_empty() {
        let source = Arc::new(CountingSource::new(sample_cards()));
        *source.fail.lock().unwrap() = true;
        let cache = CardCache::new(source.clone());

        assert!(cache.get_cards().await.is_err());
        assert!(cache.cached().is_none());

        *source.fail.lock().unwrap() = false;
        assert_eq!(cache.get_cards().await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_concurrent_misses_fetch_once() {
        let mut source = CountingSource::new(sample_cards());
        source.delay = Duration::from_millis(50);
        let source = Arc::new(source);
        let cache = Arc::new(CardCache::new(source.clone()));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let cache = Arc::clone(&cache);
                tokio::spawn(async move { cache.get_cards().await.map(|c| c.len()) })
            })
            .collect();

        for handle in handles {
            assert_eq!(handle.await.unwrap().unwrap(), 3);
        }
        assert_eq!(source.fetch_count(), 1);
    }

    #[test]
    fn test_choose_random() {
        assert!(choose_random(&[]).is_none());

        let cards = sample_cards();
        let mut seen = HashSet::new();
        for _ in 0..200 {
            let card = choose_random(&cards).unwrap();
            assert!(cards.contains(card));
            seen.insert(card.id.clone());
        }
        assert_eq!(seen.len(), 3);
    }
}
