use std::{
	fmt::Debug,
	time::{Duration, SystemTime},
};

use async_trait::async_trait;
use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};

use crate::{
	error::{BoxError, ResolutionFailure},
	DidDocument,
};

/// A future that resolves a DID to its document. `Ok(None)` means the
/// resolver found nothing, which a cache treats the same as a failure.
pub type FetchDocument<'a> = BoxFuture<'a, Result<Option<DidDocument>, BoxError>>;

/// A cached resolution, along with how old the cache considers it.
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CachedResult {
	pub did: String,
	pub doc: DidDocument,
	/// When the document was last successfully fetched.
	pub updated_at: SystemTime,
	/// The document is old enough that it should be refreshed, or the last
	/// attempt to refresh it failed. It is still fine to use.
	pub stale: bool,
	/// The document is old enough that it shouldn't be trusted, other than as
	/// a last resort.
	pub expired: bool,
}

#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash)]
pub struct CacheConfig {
	/// Entries older than this are stale.
	pub stale_ttl: Duration,
	/// Entries older than this are expired.
	pub max_ttl: Duration,
	/// Upper bound on how long a refresh waits for its fetch.
	pub fetch_timeout: Option<Duration>,
}

impl Default for CacheConfig {
	fn default() -> Self {
		Self {
			stale_ttl: Duration::from_secs(60 * 60),
			max_ttl: Duration::from_secs(24 * 60 * 60),
			fetch_timeout: None,
		}
	}
}

/// Source of the current time for staleness checks.
pub trait Clock: Debug + Send + Sync + 'static {
	fn now(&self) -> SystemTime;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
	fn now(&self) -> SystemTime {
		SystemTime::now()
	}
}

/// Storage for resolved DID documents, with a stale-while-revalidate policy.
///
/// Each entry moves through `absent -> fresh -> stale -> expired`, and back to
/// fresh whenever it is successfully cached again. Expired entries are still
/// returned by [`Self::check_cache`] until something clears them.
///
/// None of these operations can fail.
#[async_trait]
pub trait DidCache: Send + Sync {
	/// Inserts or overwrites the entry for `did` as fresh, stamped with the
	/// current time.
	async fn cache_did(
		&self,
		did: &str,
		doc: DidDocument,
		prev: Option<&CachedResult>,
	);

	/// Gets the entry for `did`, with `stale` and `expired` computed as of now.
	async fn check_cache(&self, did: &str) -> Option<CachedResult>;

	/// Fetches a new document for `did` and caches it.
	///
	/// If the fetch fails, times out, or finds nothing, whatever we already
	/// had (`prev`, or the stored entry) is kept and marked stale instead.
	/// Returns the entry as it is once the refresh is done.
	async fn refresh_cache(
		&self,
		did: &str,
		fetch: FetchDocument<'_>,
		prev: Option<&CachedResult>,
	) -> Option<CachedResult>;

	async fn clear_entry(&self, did: &str);

	async fn clear(&self);
}

/// Awaits `fetch`, bounded by `timeout`.
pub async fn fetch_document(
	fetch: FetchDocument<'_>,
	timeout: Option<Duration>,
) -> Result<DidDocument, ResolutionFailure> {
	let fetched = match timeout {
		Some(timeout) => tokio::time::timeout(timeout, fetch)
			.await
			.map_err(|_elapsed| ResolutionFailure::TimedOut(timeout))?,
		None => fetch.await,
	};
	fetched
		.map_err(ResolutionFailure::Fetch)?
		.ok_or(ResolutionFailure::NoDocument)
}

#[cfg(test)]
mod test {
	use super::*;

	use futures::FutureExt as _;

	#[tokio::test]
	async fn test_fetch_document_outcomes() {
		let doc = DidDocument::new("did:web:example.com");

		let ok = fetch_document(async { Ok(Some(doc.clone())) }.boxed(), None).await;
		assert_eq!(ok.ok(), Some(doc));

		let none = fetch_document(async { Ok(None) }.boxed(), None).await;
		assert!(matches!(none, Err(ResolutionFailure::NoDocument)));

		let err = fetch_document(async { Err("boom".into()) }.boxed(), None).await;
		assert!(matches!(err, Err(ResolutionFailure::Fetch(_))));
	}

	#[tokio::test(start_paused = true)]
	async fn test_fetch_document_timeout() {
		let timeout = Duration::from_secs(5);
		let slow = async {
			tokio::time::sleep(Duration::from_secs(60)).await;
			Ok(None)
		};
		let result = fetch_document(slow.boxed(), Some(timeout)).await;
		assert!(matches!(result, Err(ResolutionFailure::TimedOut(t)) if t == timeout));
	}

	#[test]
	fn test_default_config() {
		let config = CacheConfig::default();
		assert!(config.stale_ttl < config.max_ttl);
		assert_eq!(config.fetch_timeout, None);
	}
}
