//! Block bundle loading from JSON files.
//!
//! A bundle is everything the engine hands over for one block (header, body,
//! receipts, traces, state). Files are read with `tokio::fs`; multiple bundles
//! are loaded concurrently behind a semaphore.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use eyre::{eyre, Context, Result};
use tokio::sync::Semaphore;

use crate::types::BlockBundle;

/// Loads a single block bundle.
///
/// # Arguments
/// * `path` - JSON file holding one [`BlockBundle`]
///
/// # Errors
/// Returns error if the file cannot be read or does not decode.
pub async fn load_bundle(path: impl AsRef<Path>) -> Result<BlockBundle> {
    let path = path.as_ref();
    let raw = tokio::fs::read(path)
        .await
        .wrap_err_with(|| format!("failed to read bundle {}", path.display()))?;
    let bundle: BlockBundle = serde_json::from_slice(&raw)
        .wrap_err_with(|| format!("failed to decode bundle {}", path.display()))?;

    tracing::debug!(
        path = %path.display(),
        block_number = bundle.header.number,
        tx_count = bundle.transactions.len(),
        "loaded block bundle"
    );
    Ok(bundle)
}

/// Loads several bundles with at most `concurrency` files in flight.
///
/// Results keep the order of `paths`.
///
/// # Errors
/// Returns the first failure, naming the offending path.
#[tracing::instrument(skip(paths), fields(count = paths.len()))]
pub async fn load_bundles(paths: &[PathBuf], concurrency: usize) -> Result<Vec<BlockBundle>> {
    let semaphore = Arc::new(Semaphore::new(concurrency.max(1)));

    let mut handles = Vec::with_capacity(paths.len());
    for path in paths {
        let sem = semaphore.clone();
        let path = path.clone();
        handles.push(tokio::spawn(async move {
            let _permit = sem.acquire().await.ok();
            load_bundle(&path).await
        }));
    }

    let mut bundles = Vec::with_capacity(handles.len());
    for (handle, path) in handles.into_iter().zip(paths) {
        let bundle = handle
            .await
            .map_err(|e| eyre!("bundle loader task for {} failed: {e}", path.display()))??;
        bundles.push(bundle);
    }

    tracing::info!(bundles = bundles.len(), "loaded block bundles");
    Ok(bundles)
}
