use serde::Serialize;
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, info, warn};

use crate::checksum::fletcher16;
use crate::digest::{DigestAlgorithm, DigestRecord};
use crate::error::{Error, Result};
use crate::format::{redundancy_path, sidecar_path, Header};
use crate::layout::{checked_block_len, parity_blocks_for, Layout};
use crate::parity;
use crate::progress::Progress;

pub const DEFAULT_PERCENTAGE: u32 = 10;
pub const DEFAULT_CHECKSUM_BLOCK_LEN: usize = 64;
/// Column chunk used while streaming the parity strip.
pub const DEFAULT_IO_BUFFER: usize = 1 << 20;

#[derive(Clone, Debug)]
pub struct GenerateConfig {
    /// Redundancy percentage, 1..=99.
    pub percentage: u32,
    pub checksum_block_len: usize,
    pub io_buffer_size: usize,
    pub digest: DigestAlgorithm,
    pub progress: bool,
}

impl Default for GenerateConfig {
    fn default() -> Self {
        Self {
            percentage: DEFAULT_PERCENTAGE,
            checksum_block_len: DEFAULT_CHECKSUM_BLOCK_LEN,
            io_buffer_size: DEFAULT_IO_BUFFER,
            digest: DigestAlgorithm::default(),
            progress: false,
        }
    }
}

impl GenerateConfig {
    pub fn validate(&self) -> Result<()> {
        parity_blocks_for(self.percentage)?;
        checked_block_len(self.checksum_block_len)?;
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct GenerateReport {
    pub layout: Layout,
    pub digest_algorithm: DigestAlgorithm,
    pub digest_hex: String,
    pub digest_path: PathBuf,
    pub redundancy_path: PathBuf,
    /// Trailing archive bytes not covered by the regen file.
    pub uncovered_bytes: u64,
}

pub struct Encoder;

impl Encoder {
    /// Write `<archive>.<digest>` and `<archive>.regen` next to the archive.
    ///
    /// Both sidecars are written under a `.tmp` name and renamed once complete,
    /// so a failed run leaves no usable-looking output behind.
    pub fn encode(archive: &Path, cfg: &GenerateConfig) -> Result<GenerateReport> {
        if archive.as_os_str().is_empty() {
            return Err(Error::MissingPath);
        }
        cfg.validate()?;
        let t0 = Instant::now();

        let mut src = File::open(archive)?;
        let file_size = src.metadata()?.len();
        // fail on usage problems before writing anything
        let layout = Layout::plan(file_size, cfg.percentage, cfg.checksum_block_len)?;

        let digest = cfg.digest.digest_reader(&mut src)?;
        let record = DigestRecord::new(&digest, archive);
        info!(algorithm = cfg.digest.name(), hash = %record.hex, "saving hash");
        let digest_path = cfg.digest.sidecar(archive);
        write_atomically(&digest_path, |w| {
            w.write_all(record.to_line().as_bytes())?;
            Ok(())
        })?;

        info!(
            file_size = layout.file_size,
            parity_blocks = layout.parity_blocks,
            parity_block_len = layout.parity_block_len,
            checksum_block_len = layout.checksum_block_len,
            "generating regen file"
        );
        if layout.uncovered_len() > 0 {
            warn!(bytes = layout.uncovered_len(), "trailing bytes are not covered by redundancy");
        }

        let progress = Progress::new(cfg.progress);
        let _ticker = progress.start();
        let out_path = redundancy_path(archive);
        write_atomically(&out_path, |w| {
            Self::write_redundancy(&mut src, file_size, cfg, w, &progress)?;
            Ok(())
        })?;

        info!(elapsed = ?t0.elapsed(), "generate finished");
        Ok(GenerateReport {
            layout,
            digest_algorithm: cfg.digest,
            digest_hex: record.hex,
            digest_path,
            redundancy_path: out_path,
            uncovered_bytes: layout.uncovered_len(),
        })
    }

    /// Stream the regen file for an archive of `file_size` bytes into `out`:
    /// header, checksum table (strip-major), then the parity strip.
    pub fn write_redundancy<R, W>(
        archive: &mut R,
        file_size: u64,
        cfg: &GenerateConfig,
        out: &mut W,
        progress: &Progress,
    ) -> Result<Layout>
    where
        R: Read + Seek,
        W: Write,
    {
        let layout = Layout::plan(file_size, cfg.percentage, cfg.checksum_block_len)?;
        let header = Header::new(layout.checksum_block_len as u16, layout.parity_blocks as u16);
        out.write_all(&header.encode())?;

        debug!("writing checksum data");
        progress.set_stage("Checksums");
        progress.set_blocks_total(layout.block_count());
        let mut block = vec![0u8; layout.checksum_block_len];
        let cap = cfg.io_buffer_size.max(layout.checksum_block_len);
        for strip in 0..layout.parity_blocks {
            archive.seek(SeekFrom::Start(strip * layout.parity_block_len))?;
            let mut reader = BufReader::with_capacity(cap, archive.by_ref().take(layout.parity_block_len));
            for index in 0..layout.checksum_blocks {
                let len = layout.block_len(index);
                if len == 0 {
                    continue;
                }
                reader.read_exact(&mut block[..len])?;
                out.write_all(&fletcher16(&block[..len]).to_be_bytes())?;
                progress.inc_block();
            }
        }

        debug!("writing parity data");
        progress.set_stage("Parity");
        progress.reset_bytes(layout.parity_block_len);
        parity::write_parity(
            archive,
            layout.parity_blocks,
            layout.parity_block_len,
            cfg.io_buffer_size,
            out,
            |n| progress.add_bytes(n as u64),
        )?;
        Ok(layout)
    }
}

/// Generate the digest and regen sidecars for `archive`.
pub fn generate(archive: &Path, cfg: &GenerateConfig) -> Result<GenerateReport> {
    Encoder::encode(archive, cfg)
}

fn write_atomically<F>(path: &Path, fill: F) -> Result<()>
where
    F: FnOnce(&mut BufWriter<File>) -> Result<()>,
{
    let tmp = sidecar_path(path, "tmp");
    let res: Result<()> = (|| {
        let mut w = BufWriter::new(File::create(&tmp)?);
        fill(&mut w)?;
        let f = w.into_inner().map_err(|e| e.into_error())?;
        f.sync_all()?;
        Ok(())
    })();
    match res {
        Ok(()) => {
            fs::rename(&tmp, path)?;
            Ok(())
        }
        Err(e) => {
            let _ = fs::remove_file(&tmp);
            Err(e)
        }
    }
}
