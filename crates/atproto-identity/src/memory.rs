//! An in-process [`DidCache`].

use std::{
	sync::{
		atomic::{AtomicU64, Ordering},
		Arc,
	},
	time::{Duration, SystemTime},
};

use async_trait::async_trait;
use dashmap::{mapref::entry::Entry, DashMap};
use tracing::{debug, instrument, trace, warn};

use crate::{
	cache::{
		fetch_document, CacheConfig, CachedResult, Clock, DidCache, FetchDocument,
		SystemClock,
	},
	DidDocument,
};

/// Data stored for each DID.
#[derive(Debug, Clone)]
struct CacheEntry {
	doc: DidDocument,
	updated_at: SystemTime,
	/// Orders writes, even ones stamped with the same clock reading.
	generation: u64,
	/// Set when a refresh failed. Cleared by the next successful one.
	refresh_failed: bool,
}

/// A [`DidCache`] that keeps everything in memory.
///
/// At most one refresh runs at a time for any given DID. Refreshes of
/// different DIDs don't wait on each other.
#[derive(Debug)]
pub struct MemoryCache<C = SystemClock> {
	config: CacheConfig,
	clock: C,
	entries: DashMap<String, CacheEntry>,
	generations: AtomicU64,
	refresh_locks: RefreshLocks,
}

type RefreshLocks = DashMap<String, Arc<tokio::sync::Mutex<()>>>;

impl MemoryCache {
	pub fn new(config: CacheConfig) -> Self {
		Self::with_clock(config, SystemClock)
	}
}

impl Default for MemoryCache {
	fn default() -> Self {
		Self::new(CacheConfig::default())
	}
}

impl<C: Clock> MemoryCache<C> {
	pub fn with_clock(config: CacheConfig, clock: C) -> Self {
		Self {
			config,
			clock,
			entries: DashMap::new(),
			generations: AtomicU64::new(0),
			refresh_locks: DashMap::new(),
		}
	}

	pub fn config(&self) -> &CacheConfig {
		&self.config
	}

	pub fn len(&self) -> usize {
		self.entries.len()
	}

	pub fn is_empty(&self) -> bool {
		self.entries.is_empty()
	}

	/// Evicts every expired entry. Returns how many were removed.
	pub fn prune_expired(&self) -> usize {
		let now = self.clock.now();
		let before = self.entries.len();
		self.entries
			.retain(|_did, entry| age(entry, now) <= self.config.max_ttl);
		let removed = before.saturating_sub(self.entries.len());
		debug!(removed, "pruned expired entries");
		removed
	}

	fn view(&self, did: &str, entry: &CacheEntry, now: SystemTime) -> CachedResult {
		let age = age(entry, now);
		CachedResult {
			did: did.to_owned(),
			doc: entry.doc.clone(),
			updated_at: entry.updated_at,
			stale: entry.refresh_failed || age > self.config.stale_ttl,
			expired: age > self.config.max_ttl,
		}
	}

	fn next_generation(&self) -> u64 {
		self.generations.fetch_add(1, Ordering::Relaxed)
	}

	/// Keeps what we have, flagged as stale, unless somebody stored something
	/// newer while we were fetching.
	fn keep_stale(
		&self,
		did: &str,
		prev: Option<&CachedResult>,
		started: u64,
	) -> Option<CachedResult> {
		let now = self.clock.now();
		match self.entries.entry(did.to_owned()) {
			Entry::Occupied(mut occupied) => {
				let entry = occupied.get_mut();
				let superseded = entry.generation >= started
					|| prev.is_some_and(|prev| entry.updated_at > prev.updated_at);
				if superseded {
					trace!("entry is newer than the failed refresh, leaving it alone");
				} else {
					entry.refresh_failed = true;
				}
				Some(self.view(did, entry, now))
			}
			Entry::Vacant(vacant) => {
				let prev = prev?;
				let entry = vacant.insert(CacheEntry {
					doc: prev.doc.clone(),
					updated_at: prev.updated_at,
					generation: self.next_generation(),
					refresh_failed: true,
				});
				Some(self.view(did, &entry, now))
			}
		}
	}
}

#[async_trait]
impl<C: Clock> DidCache for MemoryCache<C> {
	#[instrument(skip_all, fields(did = %did))]
	async fn cache_did(
		&self,
		did: &str,
		doc: DidDocument,
		prev: Option<&CachedResult>,
	) {
		let entry = CacheEntry {
			doc,
			updated_at: self.clock.now(),
			generation: self.next_generation(),
			refresh_failed: false,
		};
		let replaced = self.entries.insert(did.to_owned(), entry);
		trace!(had_prev = prev.is_some(), replaced = replaced.is_some(), "cached");
	}

	async fn check_cache(&self, did: &str) -> Option<CachedResult> {
		let now = self.clock.now();
		self.entries
			.get(did)
			.map(|entry| self.view(did, entry.value(), now))
	}

	#[instrument(skip_all, fields(did = %did))]
	async fn refresh_cache(
		&self,
		did: &str,
		fetch: FetchDocument<'_>,
		prev: Option<&CachedResult>,
	) -> Option<CachedResult> {
		let slot = RefreshSlot::new(&self.refresh_locks, did);
		let _guard = slot.lock.lock().await;
		let started = self.generations.load(Ordering::Relaxed);
		match fetch_document(fetch, self.config.fetch_timeout).await {
			Ok(doc) => {
				self.cache_did(did, doc, prev).await;
				self.check_cache(did).await
			}
			Err(err) => {
				warn!(%err, "refresh failed, serving the previous document as stale");
				self.keep_stale(did, prev, started)
			}
		}
	}

	async fn clear_entry(&self, did: &str) {
		self.entries.remove(did);
	}

	async fn clear(&self) {
		self.entries.clear();
	}
}

/// A handle on the refresh lock for one DID. Dropping it removes the lock from
/// the map if nobody else is waiting on it, even when the refresh was
/// cancelled part way through.
struct RefreshSlot<'a> {
	locks: &'a RefreshLocks,
	did: &'a str,
	lock: Arc<tokio::sync::Mutex<()>>,
}

impl<'a> RefreshSlot<'a> {
	fn new(locks: &'a RefreshLocks, did: &'a str) -> Self {
		let lock = locks.entry(did.to_owned()).or_default().value().clone();
		Self { locks, did, lock }
	}
}

impl Drop for RefreshSlot<'_> {
	fn drop(&mut self) {
		// Held by the map and by us, so nobody else is refreshing this DID.
		self.locks.remove_if(self.did, |_did, lock| {
			Arc::ptr_eq(lock, &self.lock) && Arc::strong_count(lock) == 2
		});
	}
}

fn age(entry: &CacheEntry, now: SystemTime) -> Duration {
	// A clock that went backwards makes the entry brand new, not an error.
	now.duration_since(entry.updated_at).unwrap_or(Duration::ZERO)
}

#[cfg(test)]
mod test {
	use super::*;

	use std::sync::{atomic::AtomicUsize, Mutex};

	use futures::FutureExt as _;

	const DID: &str = "did:plc:ewvi7nxzyoun6zhxrhs64oiz";
	const HOUR: Duration = Duration::from_secs(60 * 60);

	#[derive(Debug, Clone)]
	struct ManualClock(Arc<Mutex<SystemTime>>);

	impl ManualClock {
		fn new() -> Self {
			Self(Arc::new(Mutex::new(SystemTime::UNIX_EPOCH + 1000 * HOUR)))
		}

		fn advance(&self, by: Duration) {
			*self.0.lock().unwrap() += by;
		}
	}

	impl Clock for ManualClock {
		fn now(&self) -> SystemTime {
			*self.0.lock().unwrap()
		}
	}

	fn cache() -> (MemoryCache<ManualClock>, ManualClock) {
		let clock = ManualClock::new();
		(
			MemoryCache::with_clock(CacheConfig::default(), clock.clone()),
			clock,
		)
	}

	fn doc(handle: &str) -> DidDocument {
		DidDocument {
			also_known_as: vec![format!("at://{handle}")],
			..DidDocument::new(DID)
		}
	}

	fn failing() -> FetchDocument<'static> {
		async { Err("resolver is down".into()) }.boxed()
	}

	fn returning(doc: DidDocument) -> FetchDocument<'static> {
		async move { Ok(Some(doc)) }.boxed()
	}

	#[tokio::test]
	async fn test_entry_lifecycle() {
		let (cache, clock) = cache();
		assert_eq!(cache.check_cache(DID).await, None);

		cache.cache_did(DID, doc("alice.test"), None).await;
		let fresh = cache.check_cache(DID).await.unwrap();
		assert_eq!(fresh.did, DID);
		assert_eq!(fresh.doc, doc("alice.test"));
		assert_eq!(fresh.updated_at, clock.now());
		assert!(!fresh.stale && !fresh.expired);

		clock.advance(HOUR + Duration::from_secs(1));
		let stale = cache.check_cache(DID).await.unwrap();
		assert!(stale.stale && !stale.expired);

		clock.advance(24 * HOUR);
		let expired = cache.check_cache(DID).await.unwrap();
		assert!(expired.stale && expired.expired);
		// expired entries are still served
		assert_eq!(expired.doc, doc("alice.test"));

		cache.cache_did(DID, doc("alice.test"), Some(&expired)).await;
		let fresh_again = cache.check_cache(DID).await.unwrap();
		assert!(!fresh_again.stale && !fresh_again.expired);

		cache.clear_entry(DID).await;
		assert_eq!(cache.check_cache(DID).await, None);
	}

	#[tokio::test]
	async fn test_failing_refresh_keeps_document() {
		let (cache, clock) = cache();
		cache.cache_did(DID, doc("alice.test"), None).await;
		clock.advance(HOUR / 2);
		let prev = cache.check_cache(DID).await;
		assert!(!prev.as_ref().unwrap().stale);

		let after = cache.refresh_cache(DID, failing(), prev.as_ref()).await;
		let checked = cache.check_cache(DID).await;
		assert_eq!(after, checked);

		let after = after.unwrap();
		let prev = prev.unwrap();
		assert_eq!(after.doc, prev.doc);
		assert_eq!(after.updated_at, prev.updated_at);
		assert!(after.stale);
		assert_eq!(after.expired, prev.expired);
	}

	#[tokio::test]
	async fn test_empty_fetch_counts_as_failure() {
		let (cache, _clock) = cache();
		cache.cache_did(DID, doc("alice.test"), None).await;
		let empty = async { Ok(None) }.boxed();
		let after = cache.refresh_cache(DID, empty, None).await.unwrap();
		assert!(after.stale);
		assert_eq!(after.doc, doc("alice.test"));
	}

	#[tokio::test]
	async fn test_successful_refresh_resets_staleness() {
		let (cache, clock) = cache();
		cache.cache_did(DID, doc("alice.test"), None).await;
		cache.refresh_cache(DID, failing(), None).await;
		clock.advance(HOUR * 2);

		let prev = cache.check_cache(DID).await.unwrap();
		assert!(prev.stale);
		let after = cache
			.refresh_cache(DID, returning(doc("bob.test")), Some(&prev))
			.await
			.unwrap();
		assert_eq!(after.doc, doc("bob.test"));
		assert!(!after.stale && !after.expired);
		assert!(after.updated_at > prev.updated_at);
	}

	#[tokio::test]
	async fn test_failing_refresh_restores_cleared_prev() {
		let (cache, _clock) = cache();
		cache.cache_did(DID, doc("alice.test"), None).await;
		let prev = cache.check_cache(DID).await;
		cache.clear().await;

		let after = cache.refresh_cache(DID, failing(), prev.as_ref()).await.unwrap();
		assert!(after.stale);
		assert_eq!(after.doc, doc("alice.test"));

		// without a prev there is nothing to fall back to
		assert_eq!(
			cache.refresh_cache("did:web:nobody.test", failing(), None).await,
			None
		);
		assert_eq!(cache.len(), 1);
	}

	#[tokio::test]
	async fn test_failed_refresh_does_not_clobber_newer_result() {
		let (cache, clock) = cache();
		cache.cache_did(DID, doc("alice.test"), None).await;
		let old_prev = cache.check_cache(DID).await.unwrap();

		clock.advance(HOUR / 4);
		cache.cache_did(DID, doc("bob.test"), None).await;

		let after = cache
			.refresh_cache(DID, failing(), Some(&old_prev))
			.await
			.unwrap();
		assert_eq!(after.doc, doc("bob.test"));
		assert!(!after.stale);
	}

	#[tokio::test]
	async fn test_failed_refresh_keeps_write_from_same_instant() {
		let (cache, _clock) = cache();
		cache.cache_did(DID, doc("alice.test"), None).await;
		// lands while the fetch is in flight, without the clock moving
		let fetch: FetchDocument<'_> = async {
			cache.cache_did(DID, doc("bob.test"), None).await;
			Err("resolver is down".into())
		}
		.boxed();
		let after = cache.refresh_cache(DID, fetch, None).await.unwrap();
		assert_eq!(after.doc, doc("bob.test"));
		assert!(!after.stale);
	}

	#[tokio::test(start_paused = true)]
	async fn test_cancelled_refresh_releases_lock() {
		let (cache, _clock) = cache();
		let hangs = async {
			tokio::time::sleep(HOUR).await;
			Ok(None)
		}
		.boxed();
		let refresh = cache.refresh_cache(DID, hangs, None);
		let cancelled = tokio::time::timeout(Duration::from_secs(1), refresh).await;
		assert!(cancelled.is_err());
		assert!(cache.refresh_locks.is_empty());

		// the DID can still be refreshed afterwards
		let after = cache.refresh_cache(DID, returning(doc("alice.test")), None).await;
		assert!(after.is_some());
		assert!(cache.refresh_locks.is_empty());
	}

	#[tokio::test(start_paused = true)]
	async fn test_fetch_timeout_serves_stale() {
		let clock = ManualClock::new();
		let config = CacheConfig {
			fetch_timeout: Some(Duration::from_secs(5)),
			..Default::default()
		};
		let cache = MemoryCache::with_clock(config, clock);
		cache.cache_did(DID, doc("alice.test"), None).await;

		let hangs = async {
			tokio::time::sleep(HOUR).await;
			Ok(Some(doc("never.test")))
		}
		.boxed();
		let after = cache.refresh_cache(DID, hangs, None).await.unwrap();
		assert!(after.stale);
		assert_eq!(after.doc, doc("alice.test"));
	}

	#[tokio::test(start_paused = true)]
	async fn test_one_refresh_per_did() {
		let cache = Arc::new(MemoryCache::default());
		let in_flight = Arc::new(AtomicUsize::new(0));
		let max_in_flight = Arc::new(AtomicUsize::new(0));

		let mut handles = Vec::new();
		for i in 0..8 {
			let cache = cache.clone();
			let in_flight = in_flight.clone();
			let max_in_flight = max_in_flight.clone();
			handles.push(tokio::spawn(async move {
				let fetch = async move {
					let now = in_flight.fetch_add(1, Ordering::SeqCst) + 1;
					max_in_flight.fetch_max(now, Ordering::SeqCst);
					tokio::time::sleep(Duration::from_millis(10)).await;
					in_flight.fetch_sub(1, Ordering::SeqCst);
					Ok(Some(doc(&format!("user{i}.test"))))
				}
				.boxed();
				cache.refresh_cache(DID, fetch, None).await
			}));
		}
		for h in handles {
			assert!(h.await.unwrap().is_some());
		}
		assert_eq!(max_in_flight.load(Ordering::SeqCst), 1);
		assert!(cache.refresh_locks.is_empty());
		assert_eq!(cache.len(), 1);
	}

	#[tokio::test]
	async fn test_prune_and_clear() {
		let (cache, clock) = cache();
		cache.cache_did("did:web:old.test", doc("old.test"), None).await;
		clock.advance(25 * HOUR);
		cache.cache_did(DID, doc("alice.test"), None).await;

		assert_eq!(cache.prune_expired(), 1);
		assert_eq!(cache.check_cache("did:web:old.test").await, None);
		assert!(cache.check_cache(DID).await.is_some());

		cache.clear().await;
		assert!(cache.is_empty());
		// clearing something that isn't there is fine
		cache.clear_entry(DID).await;
	}
}
