use serde::Serialize;
use std::path::Path;
use std::time::Instant;
use tracing::{debug, info};

use crate::digest::{DigestAlgorithm, DigestRecord};
use crate::error::{Error, Result};

#[derive(Debug, Clone, Serialize)]
pub struct VerifyReport {
    pub algorithm: DigestAlgorithm,
    pub stored_hex: String,
    pub computed_hex: String,
    pub matches: bool,
}

/// Recompute the archive digest and compare it with the stored record.
///
/// A mismatch is reported through [`VerifyReport::matches`], not as an error;
/// repair goes through [`crate::repair`]. With `algorithm = None` the sidecar
/// that exists is used.
pub fn verify(archive: &Path, algorithm: Option<DigestAlgorithm>) -> Result<VerifyReport> {
    if archive.as_os_str().is_empty() {
        return Err(Error::MissingPath);
    }
    let t0 = Instant::now();
    let algorithm = match algorithm.or_else(|| DigestAlgorithm::detect(archive)) {
        Some(a) => a,
        None => return Err(Error::DigestMissing(DigestAlgorithm::default().sidecar(archive))),
    };
    let record = DigestRecord::read(&algorithm.sidecar(archive))?;
    let digest = algorithm.digest_file(archive)?;
    let computed_hex = hex::encode(digest);
    let matches = record.matches(&digest);
    debug!(saved = %record.hex, computed = %computed_hex, algorithm = algorithm.name(), "digests");
    if matches {
        info!("no errors in data integrity");
    } else {
        info!("data is corrupt");
    }
    info!(elapsed = ?t0.elapsed(), "verify finished");
    Ok(VerifyReport { algorithm, stored_hex: record.hex, computed_hex, matches })
}
