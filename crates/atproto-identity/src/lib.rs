//! Resolution bookkeeping for AT Protocol identities.
//!
//! Resolving a DID to its document means going out to the network (a PLC
//! directory, or a `.well-known` URL for did:web), which is slow and can fail.
//! This crate doesn't do that part. Instead it provides the [`DidDocument`]
//! carriers that a resolver fills in, and the [`DidCache`] contract for holding
//! on to what it resolved, with a stale-while-revalidate policy: when a
//! refresh fails, the previous document keeps being served, flagged as stale.
//!
//! [`MemoryCache`] is an in-process implementation of that contract.

#![forbid(unsafe_code)]

mod cache;
mod document;
mod error;
mod memory;

pub use crate::cache::{
	fetch_document, CacheConfig, CachedResult, Clock, DidCache, FetchDocument,
	SystemClock,
};
pub use crate::document::{DidDocument, Service, VerificationMethod};
pub use crate::error::{BoxError, ResolutionFailure};
pub use crate::memory::MemoryCache;
