//! Async versions of the expensive operations, which run on tokio's blocking
//! thread pool so that they don't stall the executor.
//!
//! The futures are lazy: nothing is scheduled until the first poll, so a
//! future that is dropped without being polled never does any work. Once
//! scheduled, the computation runs to completion even if the future is
//! dropped.

use std::sync::Arc;

use tracing::trace;

use crate::{
	crypto::SigOpts,
	did_key,
	error::{Error, Result},
	signer::Signer,
	AtKeyPair, KeyAlgo,
};

/// Generates a keypair off of the async executor.
pub async fn generate(algo: KeyAlgo, exportable: bool) -> Result<AtKeyPair> {
	run(move || AtKeyPair::generate(algo, exportable)).await
}

/// Signs `msg` with `opts` off of the async executor.
pub async fn sign(
	signer: Arc<impl Signer + Send + Sync + 'static>,
	msg: Vec<u8>,
	opts: SigOpts,
) -> Result<Vec<u8>> {
	run(move || signer.sign_with(&msg, opts)).await
}

/// [`did_key::verify_did_signature`] off of the async executor.
pub async fn verify_did(
	did: String,
	msg: Vec<u8>,
	sig: Vec<u8>,
	opts: SigOpts,
) -> Result<bool> {
	run(move || did_key::verify_did_signature(&did, &msg, &sig, opts)).await?
}

async fn run<T, F>(f: F) -> Result<T>
where
	F: FnOnce() -> T + Send + 'static,
	T: Send + 'static,
{
	trace!("offloading to blocking pool");
	match tokio::task::spawn_blocking(f).await {
		Ok(value) => Ok(value),
		Err(err) if err.is_panic() => std::panic::resume_unwind(err.into_panic()),
		// The only other way to fail is the runtime shutting down.
		Err(_) => Err(Error::Cancelled),
	}
}
