//! Block geometry shared by generation and regeneration.
//!
//! The archive is split into `parity_blocks` equal strips of `parity_block_len`
//! bytes, and each strip into checksum blocks of `checksum_block_len` bytes with
//! a shorter trailing block when the strip does not divide evenly. Bytes past
//! `parity_blocks * parity_block_len` are not covered by redundancy.

use serde::Serialize;

use crate::error::{Error, Result};
use crate::format::HEADER_LEN;

/// Size of one stored checksum in the table.
pub const CHECKSUM_LEN: u64 = 2;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct Layout {
    pub file_size: u64,
    pub parity_blocks: u64,
    pub parity_block_len: u64,
    pub checksum_block_len: usize,
    /// Checksum blocks per strip.
    pub checksum_blocks: u64,
    pub last_checksum_block_len: usize,
}

/// One checksum block addressed by strip and column.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BlockRef {
    pub strip: u64,
    pub index: u64,
    pub offset: u64,
    pub len: usize,
}

/// Number of parity strips for a redundancy percentage: `round(100 / percentage)`.
///
/// Older regen files were planned with `100 / percentage` truncated first, so
/// 35, 40, 60 and 66 percent gave one strip fewer than here. The strip count is
/// stored in the header and readers never recompute it from a percentage, so
/// those files still read back unchanged.
pub fn parity_blocks_for(percentage: u32) -> Result<u16> {
    if !(1..=99).contains(&percentage) {
        return Err(Error::InvalidPercentage(percentage));
    }
    // integer round-half-up of 100 / p
    Ok(((200 + percentage) / (2 * percentage)) as u16)
}

/// Checksum block lengths are stored as a big-endian u16 in the header.
pub fn checked_block_len(checksum_block_len: usize) -> Result<u16> {
    match u16::try_from(checksum_block_len) {
        Ok(v) if v > 0 => Ok(v),
        _ => Err(Error::InvalidChecksumBlockLen { got: checksum_block_len }),
    }
}

impl Layout {
    /// Geometry from the raw header fields and the archive size. Zero fields
    /// are clamped to one; callers validate them before getting here.
    pub fn new(file_size: u64, parity_blocks: u16, checksum_block_len: u16) -> Self {
        let parity_blocks = u64::from(parity_blocks.max(1));
        let cbl = u64::from(checksum_block_len.max(1));
        let parity_block_len = file_size / parity_blocks;
        let checksum_blocks = parity_block_len.div_ceil(cbl);
        let last = if checksum_blocks == 0 {
            0
        } else {
            parity_block_len - (checksum_blocks - 1) * cbl
        };
        Self {
            file_size,
            parity_blocks,
            parity_block_len,
            checksum_block_len: cbl as usize,
            checksum_blocks,
            last_checksum_block_len: last as usize,
        }
    }

    /// Generation-time planning from user-facing tuning parameters.
    pub fn plan(file_size: u64, percentage: u32, checksum_block_len: usize) -> Result<Self> {
        let parity_blocks = parity_blocks_for(percentage)?;
        let cbl = checked_block_len(checksum_block_len)?;
        if file_size == 0 {
            return Err(Error::EmptyArchive);
        }
        let layout = Self::new(file_size, parity_blocks, cbl);
        if layout.parity_block_len == 0 {
            return Err(Error::ArchiveTooSmall { size: file_size, parity_blocks: layout.parity_blocks });
        }
        Ok(layout)
    }

    /// Length of checksum block `index`; the last one per strip may be shorter.
    pub fn block_len(&self, index: u64) -> usize {
        if index + 1 == self.checksum_blocks {
            self.last_checksum_block_len
        } else {
            self.checksum_block_len
        }
    }

    /// Offset of checksum block `index` within any strip.
    pub fn column_offset(&self, index: u64) -> u64 {
        index * self.checksum_block_len as u64
    }

    /// Absolute archive offset of checksum block `index` in `strip`.
    pub fn block_offset(&self, strip: u64, index: u64) -> u64 {
        strip * self.parity_block_len + self.column_offset(index)
    }

    pub fn block(&self, strip: u64, index: u64) -> BlockRef {
        BlockRef {
            strip,
            index,
            offset: self.block_offset(strip, index),
            len: self.block_len(index),
        }
    }

    /// Every non-empty checksum block, strip-major then block-minor.
    pub fn blocks(&self) -> impl Iterator<Item = BlockRef> + '_ {
        (0..self.parity_blocks)
            .flat_map(move |strip| (0..self.checksum_blocks).map(move |index| self.block(strip, index)))
            .filter(|b| b.len > 0)
    }

    pub fn block_count(&self) -> u64 {
        self.parity_blocks * self.checksum_blocks
    }

    pub fn table_len(&self) -> u64 {
        self.block_count() * CHECKSUM_LEN
    }

    /// Offset of the stored checksum for (`strip`, `index`) in the regen file.
    pub fn table_offset(&self, strip: u64, index: u64) -> u64 {
        HEADER_LEN as u64 + (strip * self.checksum_blocks + index) * CHECKSUM_LEN
    }

    /// Offset of the parity strip in the regen file.
    pub fn parity_offset(&self) -> u64 {
        HEADER_LEN as u64 + self.table_len()
    }

    pub fn redundancy_len(&self) -> u64 {
        self.parity_offset() + self.parity_block_len
    }

    /// Bytes protected by the checksum table and parity strip.
    pub fn covered_len(&self) -> u64 {
        self.parity_blocks * self.parity_block_len
    }

    /// Trailing bytes left out of redundancy coverage.
    pub fn uncovered_len(&self) -> u64 {
        self.file_size - self.covered_len()
    }
}
