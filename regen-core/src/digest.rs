//! Whole-file digest and its sidecar record.
//!
//! The sidecar holds `<hex digest>  <archive base name>`, the same layout
//! `sha256sum` prints, so `sha256sum -c` can read `.sha256` records.

use serde::Serialize;
use sha2::{Digest, Sha256};
use std::fs::File;
use std::io::{self, ErrorKind, Read};
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::format::sidecar_path;

/// Hex characters in a stored digest.
pub const DIGEST_HEX_LEN: usize = 64;

const READ_BUF: usize = 1 << 20;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DigestAlgorithm {
    #[default]
    Sha256,
    Blake3,
}

impl DigestAlgorithm {
    /// Lookup order when the caller does not name an algorithm.
    pub const ALL: [DigestAlgorithm; 2] = [DigestAlgorithm::Sha256, DigestAlgorithm::Blake3];

    /// Also the sidecar extension.
    pub fn name(&self) -> &'static str {
        match self {
            DigestAlgorithm::Sha256 => "sha256",
            DigestAlgorithm::Blake3 => "blake3",
        }
    }

    pub fn sidecar(&self, archive: &Path) -> PathBuf {
        sidecar_path(archive, self.name())
    }

    /// First algorithm whose sidecar exists next to `archive`.
    pub fn detect(archive: &Path) -> Option<Self> {
        Self::ALL.into_iter().find(|a| a.sidecar(archive).is_file())
    }

    pub fn digest_reader<R: Read>(&self, r: &mut R) -> io::Result<[u8; 32]> {
        let mut buf = vec![0u8; READ_BUF];
        match self {
            DigestAlgorithm::Sha256 => {
                let mut h = Sha256::new();
                loop {
                    let n = r.read(&mut buf)?;
                    if n == 0 {
                        break;
                    }
                    h.update(&buf[..n]);
                }
                Ok(h.finalize().into())
            }
            DigestAlgorithm::Blake3 => {
                let mut h = blake3::Hasher::new();
                loop {
                    let n = r.read(&mut buf)?;
                    if n == 0 {
                        break;
                    }
                    h.update(&buf[..n]);
                }
                Ok(*h.finalize().as_bytes())
            }
        }
    }

    pub fn digest_file(&self, path: &Path) -> io::Result<[u8; 32]> {
        let mut f = File::open(path)?;
        self.digest_reader(&mut f)
    }
}

/// Parsed content of a digest sidecar.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DigestRecord {
    /// Lowercase hex.
    pub hex: String,
    pub file_name: String,
}

impl DigestRecord {
    pub fn new(digest: &[u8], archive: &Path) -> Self {
        let file_name =
            archive.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default();
        Self { hex: hex::encode(digest), file_name }
    }

    pub fn to_line(&self) -> String {
        format!("{}  {}", self.hex, self.file_name)
    }

    /// Accepts anything that starts with 64 hex characters; the name after the
    /// two-space separator is informational.
    pub fn parse(text: &str) -> Option<Self> {
        let digest = text.get(..DIGEST_HEX_LEN)?;
        if !digest.bytes().all(|b| b.is_ascii_hexdigit()) {
            return None;
        }
        let rest = &text[DIGEST_HEX_LEN..];
        let file_name = rest.strip_prefix("  ").unwrap_or(rest).trim_end().to_string();
        Some(Self { hex: digest.to_ascii_lowercase(), file_name })
    }

    pub fn read(path: &Path) -> Result<Self> {
        let bytes = match std::fs::read(path) {
            Ok(b) => b,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(Error::DigestMissing(path.to_path_buf()))
            }
            Err(e) => return Err(e.into()),
        };
        let text = String::from_utf8(bytes).map_err(|_| Error::InvalidDigestFile(path.to_path_buf()))?;
        Self::parse(&text).ok_or_else(|| Error::InvalidDigestFile(path.to_path_buf()))
    }

    pub fn matches(&self, digest: &[u8]) -> bool {
        self.hex == hex::encode(digest)
    }
}
