//! On-disk regen file: fixed header, checksum table, parity strip.
//!
//! All multi-byte integers are big-endian. Nothing but the header is
//! self-describing; table and parity offsets come from the [`Layout`]
//! recomputed from the header and the current archive size.

use serde::Serialize;
use std::ffi::OsString;
use std::io::{ErrorKind, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::layout::Layout;
use crate::parity::read_exact_at;

/// Format tag at offset 0.
pub const MAGIC: &[u8; 5] = b"REGEN";
/// Newest format version this build reads and the one it writes.
pub const FORMAT_VERSION: u16 = 1;
/// magic + version + checksum block length + parity strip count
pub const HEADER_LEN: usize = 5 + 2 + 2 + 2;
/// Extension appended to the archive name for the regen file.
pub const REDUNDANCY_EXT: &str = "regen";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct Header {
    pub version: u16,
    pub checksum_block_len: u16,
    pub parity_blocks: u16,
}

impl Header {
    pub fn new(checksum_block_len: u16, parity_blocks: u16) -> Self {
        Self { version: FORMAT_VERSION, checksum_block_len, parity_blocks }
    }

    pub fn encode(&self) -> [u8; HEADER_LEN] {
        let mut buf = [0u8; HEADER_LEN];
        buf[..5].copy_from_slice(MAGIC);
        buf[5..7].copy_from_slice(&self.version.to_be_bytes());
        buf[7..9].copy_from_slice(&self.checksum_block_len.to_be_bytes());
        buf[9..11].copy_from_slice(&self.parity_blocks.to_be_bytes());
        buf
    }

    /// Parse a header. The version is not checked here, see [`Header::check_version`].
    pub fn decode(buf: &[u8]) -> Result<Self> {
        if buf.len() < HEADER_LEN || &buf[..5] != MAGIC {
            return Err(Error::NotRedundancyFile);
        }
        let version = u16::from_be_bytes([buf[5], buf[6]]);
        let checksum_block_len = u16::from_be_bytes([buf[7], buf[8]]);
        let parity_blocks = u16::from_be_bytes([buf[9], buf[10]]);
        if checksum_block_len == 0 || parity_blocks == 0 {
            return Err(Error::NotRedundancyFile);
        }
        Ok(Self { version, checksum_block_len, parity_blocks })
    }

    pub fn read_from<R: Read>(r: &mut R) -> Result<Self> {
        let mut buf = [0u8; HEADER_LEN];
        match r.read_exact(&mut buf) {
            Ok(()) => Self::decode(&buf),
            Err(e) if e.kind() == ErrorKind::UnexpectedEof => Err(Error::NotRedundancyFile),
            Err(e) => Err(e.into()),
        }
    }

    pub fn check_version(&self) -> Result<()> {
        if self.version > FORMAT_VERSION {
            return Err(Error::UnsupportedVersion(self.version));
        }
        Ok(())
    }

    /// Geometry for an archive of `file_size` bytes.
    pub fn layout(&self, file_size: u64) -> Layout {
        Layout::new(file_size, self.parity_blocks, self.checksum_block_len)
    }
}

/// Random-access reader over a parsed regen file.
pub struct RedundancyReader<R> {
    inner: R,
    header: Header,
    layout: Layout,
}

impl<R: Read + Seek> RedundancyReader<R> {
    /// Validate the header and check the file length against the layout for
    /// an archive of `archive_size` bytes.
    pub fn open(mut inner: R, archive_size: u64) -> Result<Self> {
        inner.seek(SeekFrom::Start(0))?;
        let header = Header::read_from(&mut inner)?;
        header.check_version()?;
        let layout = header.layout(archive_size);
        let actual = inner.seek(SeekFrom::End(0))?;
        let expected = layout.redundancy_len();
        if actual != expected {
            return Err(Error::RedundancyLengthMismatch { actual, expected, archive_size });
        }
        Ok(Self { inner, header, layout })
    }

    pub fn header(&self) -> &Header {
        &self.header
    }

    pub fn layout(&self) -> &Layout {
        &self.layout
    }

    /// Stored checksum of block `index` in `strip`.
    pub fn checksum(&mut self, strip: u64, index: u64) -> Result<u16> {
        let mut buf = [0u8; 2];
        read_exact_at(&mut self.inner, self.layout.table_offset(strip, index), &mut buf)?;
        Ok(u16::from_be_bytes(buf))
    }

    /// Fill `buf` from the stored parity strip starting at column `start`.
    pub fn read_parity(&mut self, start: u64, buf: &mut [u8]) -> Result<()> {
        read_exact_at(&mut self.inner, self.layout.parity_offset() + start, buf)?;
        Ok(())
    }
}

/// `<archive>.<ext>`, keeping the archive's own extension.
pub fn sidecar_path(archive: &Path, ext: &str) -> PathBuf {
    let mut name = OsString::from(archive.as_os_str());
    name.push(".");
    name.push(ext);
    PathBuf::from(name)
}

pub fn redundancy_path(archive: &Path) -> PathBuf {
    sidecar_path(archive, REDUNDANCY_EXT)
}

/// Header and geometry of an existing regen file, checked against the archive.
#[derive(Debug, Clone, Serialize)]
pub struct InspectReport {
    pub header: Header,
    pub supported: bool,
    pub layout: Layout,
    pub expected_len: u64,
    pub actual_len: u64,
}

impl InspectReport {
    pub fn length_ok(&self) -> bool {
        self.expected_len == self.actual_len
    }
}

/// Read-only look at `<archive>.regen`; newer versions are reported, not rejected.
pub fn inspect(archive: &Path) -> Result<InspectReport> {
    if archive.as_os_str().is_empty() {
        return Err(Error::MissingPath);
    }
    let archive_size = std::fs::metadata(archive)?.len();
    let path = redundancy_path(archive);
    let mut f = match std::fs::File::open(&path) {
        Ok(f) => f,
        Err(e) if e.kind() == ErrorKind::NotFound => return Err(Error::RedundancyMissing(path)),
        Err(e) => return Err(e.into()),
    };
    let header = Header::read_from(&mut f)?;
    let actual_len = f.metadata()?.len();
    let layout = header.layout(archive_size);
    Ok(InspectReport {
        header,
        supported: header.check_version().is_ok(),
        layout,
        expected_len: layout.redundancy_len(),
        actual_len,
    })
}
