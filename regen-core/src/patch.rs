//! Deferred write-back of recovered checksum blocks.
//!
//! Corrections are collected for the whole archive first and committed only
//! afterwards. A correction is withheld when any strip failed at the same
//! checksum-block index, because that column's parity can no longer be trusted.

use serde::Serialize;
use std::collections::BTreeSet;
use std::io::{Seek, SeekFrom, Write};
use tracing::debug;

use crate::error::Result;

/// Replacement bytes for one checksum block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CorrectedBlock {
    pub strip: u64,
    /// Checksum-block index within the strip.
    pub index: u64,
    pub offset: u64,
    /// Bit positions (byte * 8 + bit, LSB first) flipped to match the checksum.
    pub flipped_bits: Vec<usize>,
    #[serde(skip)]
    pub bytes: Vec<u8>,
}

/// A block no candidate within the bruteforce limit could restore.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FailedBlock {
    pub strip: u64,
    pub index: u64,
    pub offset: u64,
    pub bad_bits: usize,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CommitSummary {
    pub blocks_written: usize,
    pub blocks_withheld: usize,
    pub bytes_written: u64,
}

#[derive(Debug, Default, Clone)]
pub struct RecoveryPlan {
    corrected: Vec<CorrectedBlock>,
    failed: Vec<FailedBlock>,
    failed_indices: BTreeSet<u64>,
}

impl RecoveryPlan {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_corrected(&mut self, block: CorrectedBlock) {
        self.corrected.push(block);
    }

    pub fn push_failed(&mut self, block: FailedBlock) {
        self.failed_indices.insert(block.index);
        self.failed.push(block);
    }

    pub fn corrected(&self) -> &[CorrectedBlock] {
        &self.corrected
    }

    pub fn failed(&self) -> &[FailedBlock] {
        &self.failed
    }

    pub fn is_index_failed(&self, index: u64) -> bool {
        self.failed_indices.contains(&index)
    }

    /// Corrections safe to write: their index is not in the failed set.
    pub fn committable(&self) -> impl Iterator<Item = &CorrectedBlock> + '_ {
        self.corrected.iter().filter(move |b| !self.is_index_failed(b.index))
    }

    pub fn withheld(&self) -> impl Iterator<Item = &CorrectedBlock> + '_ {
        self.corrected.iter().filter(move |b| self.is_index_failed(b.index))
    }

    /// Write every committable block back at its original offset.
    pub fn commit<W: Write + Seek>(&self, archive: &mut W) -> Result<CommitSummary> {
        let mut summary = CommitSummary::default();
        for block in &self.corrected {
            if self.is_index_failed(block.index) {
                debug!(strip = block.strip, block = block.index, offset = block.offset, "not writing corrected block");
                summary.blocks_withheld += 1;
                continue;
            }
            debug!(strip = block.strip, block = block.index, offset = block.offset, "writing corrected block");
            archive.seek(SeekFrom::Start(block.offset))?;
            archive.write_all(&block.bytes)?;
            summary.blocks_written += 1;
            summary.bytes_written += block.bytes.len() as u64;
        }
        archive.flush()?;
        Ok(summary)
    }
}
