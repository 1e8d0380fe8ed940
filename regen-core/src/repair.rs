//! Corruption detection and bit-flip repair.
//!
//! Every checksum block is re-checksummed against the table. For a mismatch,
//! the XOR of the current strips at that column is compared bit by bit with the
//! stored parity strip; every differing bit is a candidate flip, and the
//! mismatching checksum says which strip holds it. Subsets of the candidates
//! are then tried, largest first, until one restores the stored checksum or
//! the bruteforce limit is reached.

use serde::Serialize;
use std::fs::{File, OpenOptions};
use std::io::{ErrorKind, Read, Seek};
use std::path::Path;
use std::time::Instant;
use tracing::{debug, info, warn};

use crate::checksum::fletcher16;
use crate::combinations::{subset_count, Combinations};
use crate::error::{Error, Result};
use crate::format::{redundancy_path, Header, RedundancyReader};
use crate::layout::{BlockRef, Layout};
use crate::parity::{read_exact_at, xor_column};
use crate::patch::{CommitSummary, CorrectedBlock, FailedBlock, RecoveryPlan};
use crate::progress::Progress;

pub const DEFAULT_BRUTEFORCE_LIMIT: usize = 1023;

#[derive(Clone, Debug)]
pub struct RegenerateConfig {
    /// Most bit-flip candidates evaluated per corrupted checksum block.
    pub bruteforce_limit: usize,
    /// Detect and search, but leave the archive untouched.
    pub dry_run: bool,
    pub progress: bool,
}

impl Default for RegenerateConfig {
    fn default() -> Self {
        Self { bruteforce_limit: DEFAULT_BRUTEFORCE_LIMIT, dry_run: false, progress: false }
    }
}

impl RegenerateConfig {
    pub fn validate(&self) -> Result<()> {
        if self.bruteforce_limit == 0 {
            return Err(Error::InvalidBruteforceLimit);
        }
        Ok(())
    }
}

/// Terminal state of one checksum block after a scan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BlockOutcome {
    Ok,
    Recovered(CorrectedBlock),
    Unrecoverable(FailedBlock),
}

/// Result of scanning every block, before anything is written.
#[derive(Debug, Clone, Default)]
pub struct ScanOutcome {
    pub plan: RecoveryPlan,
    pub blocks_checked: u64,
    pub blocks_mismatched: u64,
    pub combinations_tried: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct RegenReport {
    pub header: Header,
    pub layout: Layout,
    pub blocks_checked: u64,
    pub blocks_mismatched: u64,
    /// Corrections written back (or that would be, on a dry run).
    pub corrected: Vec<CorrectedBlock>,
    /// Corrections held back because their index also failed elsewhere.
    pub withheld: Vec<CorrectedBlock>,
    pub failed: Vec<FailedBlock>,
    pub combinations_tried: u64,
    pub bytes_written: u64,
    pub dry_run: bool,
}

impl RegenReport {
    /// True when every block matched its stored checksum.
    pub fn is_clean(&self) -> bool {
        self.blocks_mismatched == 0
    }

    /// Fail with the number of unrecoverable blocks, if any.
    pub fn ensure_complete(&self) -> Result<()> {
        if self.failed.is_empty() {
            return Ok(());
        }
        Err(Error::FailedBlocks { failed: self.failed.len(), corrected: self.corrected.len() })
    }
}

/// Recovery engine over one archive and its parsed regen file.
///
/// The engine owns its scratch buffers, each one checksum block long, and
/// reuses them for every block it inspects.
pub struct Recovery<'a, A, R> {
    archive: &'a mut A,
    regen: RedundancyReader<R>,
    bruteforce_limit: usize,
    block: Vec<u8>,
    candidate: Vec<u8>,
    parity_now: Vec<u8>,
    parity_stored: Vec<u8>,
    column_scratch: Vec<u8>,
    combinations_tried: u64,
}

impl<'a, A, R> Recovery<'a, A, R>
where
    A: Read + Seek,
    R: Read + Seek,
{
    pub fn new(archive: &'a mut A, regen: RedundancyReader<R>, bruteforce_limit: usize) -> Self {
        let cbl = regen.layout().checksum_block_len;
        Self {
            archive,
            regen,
            bruteforce_limit,
            block: vec![0u8; cbl],
            candidate: vec![0u8; cbl],
            parity_now: vec![0u8; cbl],
            parity_stored: vec![0u8; cbl],
            column_scratch: vec![0u8; cbl],
            combinations_tried: 0,
        }
    }

    pub fn layout(&self) -> Layout {
        *self.regen.layout()
    }

    pub fn header(&self) -> Header {
        *self.regen.header()
    }

    /// Check every block, strip-major, and collect what can be repaired.
    /// Unrecoverable blocks are recorded and the scan carries on.
    pub fn scan(&mut self, progress: &Progress) -> Result<ScanOutcome> {
        let layout = self.layout();
        progress.set_stage("Scanning");
        progress.set_blocks_total(layout.block_count());
        let mut out = ScanOutcome::default();
        for b in layout.blocks() {
            out.blocks_checked += 1;
            match self.check_block(b)? {
                BlockOutcome::Ok => {}
                BlockOutcome::Recovered(c) => {
                    out.blocks_mismatched += 1;
                    out.plan.push_corrected(c);
                }
                BlockOutcome::Unrecoverable(f) => {
                    out.blocks_mismatched += 1;
                    out.plan.push_failed(f);
                }
            }
            progress.inc_block();
        }
        out.combinations_tried = self.combinations_tried;
        Ok(out)
    }

    /// Compare one block with its stored checksum and try to repair it.
    pub fn check_block(&mut self, b: BlockRef) -> Result<BlockOutcome> {
        read_exact_at(&mut *self.archive, b.offset, &mut self.block[..b.len])?;
        let stored = self.regen.checksum(b.strip, b.index)?;
        if fletcher16(&self.block[..b.len]) == stored {
            return Ok(BlockOutcome::Ok);
        }
        debug!(strip = b.strip, block = b.index, offset = b.offset, "checksum error found");

        let bad_bits = self.locate(b)?;
        if bad_bits.len() > 1 {
            debug!(?bad_bits, search_space = subset_count(bad_bits.len()), "bad bits");
        }
        match self.search(b.len, stored, &bad_bits) {
            Some(flips) => {
                debug!(strip = b.strip, block = b.index, ?flips, "combination found");
                Ok(BlockOutcome::Recovered(CorrectedBlock {
                    strip: b.strip,
                    index: b.index,
                    offset: b.offset,
                    flipped_bits: flips,
                    bytes: self.candidate[..b.len].to_vec(),
                }))
            }
            None => {
                warn!(strip = b.strip, block = b.index, bad_bits = bad_bits.len(), "could not find the correct combination");
                Ok(BlockOutcome::Unrecoverable(FailedBlock {
                    strip: b.strip,
                    index: b.index,
                    offset: b.offset,
                    bad_bits: bad_bits.len(),
                }))
            }
        }
    }

    /// Bit positions in the block's column where the current XOR of all strips
    /// disagrees with the stored parity. Bit `k * 8 + l` is bit `l` (LSB first)
    /// of byte `k`.
    pub fn locate(&mut self, b: BlockRef) -> Result<Vec<usize>> {
        let layout = *self.regen.layout();
        let start = layout.column_offset(b.index);
        self.regen.read_parity(start, &mut self.parity_stored[..b.len])?;
        xor_column(
            &mut *self.archive,
            layout.parity_blocks,
            layout.parity_block_len,
            start,
            &mut self.parity_now[..b.len],
            &mut self.column_scratch,
        )?;
        let mut bad_bits = Vec::new();
        for (k, (now, stored)) in self.parity_now[..b.len].iter().zip(&self.parity_stored[..b.len]).enumerate() {
            let diff = now ^ stored;
            if diff == 0 {
                continue;
            }
            for l in 0..8 {
                if diff & (1 << l) != 0 {
                    bad_bits.push(k * 8 + l);
                }
            }
        }
        Ok(bad_bits)
    }

    /// First flip set, within the bruteforce limit, whose result matches
    /// `stored`. On success the repaired bytes are left in `self.candidate`.
    fn search(&mut self, len: usize, stored: u16, bad_bits: &[usize]) -> Option<Vec<usize>> {
        for combination in Combinations::new(bad_bits).take(self.bruteforce_limit) {
            self.combinations_tried += 1;
            let candidate = &mut self.candidate[..len];
            candidate.copy_from_slice(&self.block[..len]);
            for &bit in &combination {
                candidate[bit / 8] ^= 1 << (bit % 8);
            }
            if fletcher16(candidate) == stored {
                return Some(combination);
            }
        }
        None
    }
}

pub struct Regenerator;

impl Regenerator {
    /// Scan `archive` against `<archive>.regen` and commit what can be repaired.
    ///
    /// Unrecoverable blocks do not make this fail; inspect
    /// [`RegenReport::failed`] or call [`RegenReport::ensure_complete`].
    pub fn run(archive: &Path, cfg: &RegenerateConfig) -> Result<RegenReport> {
        if archive.as_os_str().is_empty() {
            return Err(Error::MissingPath);
        }
        cfg.validate()?;
        let t0 = Instant::now();

        let mut file = OpenOptions::new().read(true).write(!cfg.dry_run).open(archive)?;
        let archive_size = file.metadata()?.len();
        let regen_path = redundancy_path(archive);
        let regen_file = match File::open(&regen_path) {
            Ok(f) => f,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(Error::RedundancyMissing(regen_path))
            }
            Err(e) => return Err(e.into()),
        };
        let regen = RedundancyReader::open(regen_file, archive_size)?;
        let header = *regen.header();
        let layout = *regen.layout();
        info!(
            version = header.version,
            checksum_block_len = layout.checksum_block_len,
            parity_blocks = layout.parity_blocks,
            archive_size,
            parity_block_len = layout.parity_block_len,
            "regenerating"
        );

        let progress = Progress::new(cfg.progress);
        let _ticker = progress.start();
        let scan = Recovery::new(&mut file, regen, cfg.bruteforce_limit).scan(&progress)?;

        let summary = if cfg.dry_run {
            CommitSummary {
                blocks_written: 0,
                blocks_withheld: scan.plan.withheld().count(),
                bytes_written: 0,
            }
        } else {
            scan.plan.commit(&mut file)?
        };

        let report = RegenReport {
            header,
            layout,
            blocks_checked: scan.blocks_checked,
            blocks_mismatched: scan.blocks_mismatched,
            corrected: scan.plan.committable().cloned().collect(),
            withheld: scan.plan.withheld().cloned().collect(),
            failed: scan.plan.failed().to_vec(),
            combinations_tried: scan.combinations_tried,
            bytes_written: summary.bytes_written,
            dry_run: cfg.dry_run,
        };
        info!(
            mismatched = report.blocks_mismatched,
            corrected = report.corrected.len(),
            withheld = summary.blocks_withheld,
            failed = report.failed.len(),
            elapsed = ?t0.elapsed(),
            "regenerate finished"
        );
        Ok(report)
    }
}

/// Repair `archive` in place; errors with the failure count when some
/// blocks stayed unrecoverable, after every possible correction was written.
pub fn regenerate(archive: &Path, cfg: &RegenerateConfig) -> Result<RegenReport> {
    let report = Regenerator::run(archive, cfg)?;
    report.ensure_complete()?;
    Ok(report)
}
