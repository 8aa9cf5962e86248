use std::time::Duration;

pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Why a document couldn't be fetched during a refresh.
///
/// [`DidCache::refresh_cache`](crate::DidCache::refresh_cache) recovers from
/// all of these by serving the previous result as stale, so callers only see
/// them in logs, or when calling [`fetch_document`](crate::fetch_document)
/// themselves.
#[derive(thiserror::Error, Debug)]
pub enum ResolutionFailure {
	#[error("failed to fetch the DID document")]
	Fetch(#[source] BoxError),
	#[error("the resolver found no DID document")]
	NoDocument,
	#[error("fetching the DID document timed out after {0:?}")]
	TimedOut(Duration),
}
