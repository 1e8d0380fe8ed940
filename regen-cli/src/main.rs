use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

use regen_core::encode::{DEFAULT_CHECKSUM_BLOCK_LEN, DEFAULT_IO_BUFFER, DEFAULT_PERCENTAGE};
use regen_core::repair::{Regenerator, DEFAULT_BRUTEFORCE_LIMIT};
use regen_core::{DigestAlgorithm, GenerateConfig, RegenerateConfig};

#[derive(Clone, Copy, Debug, ValueEnum)]
enum DigestArg { Sha256, Blake3 }

impl From<DigestArg> for DigestAlgorithm {
    fn from(d: DigestArg) -> Self {
        match d { DigestArg::Sha256 => DigestAlgorithm::Sha256, DigestArg::Blake3 => DigestAlgorithm::Blake3 }
    }
}

#[derive(Parser)]
#[command(name="regen", version, about="Redundancy generator: checksums and parity for an archive, and in-place repair from them")]
struct Cli {
    /// Archive file to work on
    #[arg(short, long, global = true)] file: Option<PathBuf>,
    /// Log every step to stderr
    #[arg(short, long, global = true, default_value_t = false)] verbose: bool,
    #[command(subcommand)] cmd: Cmd,
}

#[derive(Subcommand)]
enum Cmd {
    /// Generate hash and redundancy data
    Generate {
        /// Redundancy percentage
        #[arg(short, long, default_value_t = DEFAULT_PERCENTAGE, value_parser = clap::value_parser!(u32).range(1..=99))]
        percentage: u32,
        /// Checksum block length
        #[arg(short, long = "checksum", default_value_t = DEFAULT_CHECKSUM_BLOCK_LEN)]
        checksum_block_len: usize,
        #[arg(long, value_enum, default_value_t = DigestArg::Sha256)] digest: DigestArg,
        #[arg(long, default_value_t = DEFAULT_IO_BUFFER)] buffer_size: usize,
        #[arg(long, default_value_t = false)] progress: bool,
        #[arg(long, default_value_t = false)] json: bool,
    },
    /// Verify data integrity
    Verify {
        /// Digest sidecar to use (default: whichever exists)
        #[arg(long, value_enum)] digest: Option<DigestArg>,
        #[arg(long, default_value_t = false)] json: bool,
    },
    /// Regenerate archive using redundant data
    Regenerate {
        /// Bruteforce limit
        #[arg(short, long, default_value_t = DEFAULT_BRUTEFORCE_LIMIT)]
        bruteforce_limit: usize,
        /// Report what would be repaired without writing
        #[arg(long, default_value_t = false)] dry_run: bool,
        #[arg(long, default_value_t = false)] progress: bool,
        #[arg(long, default_value_t = false)] json: bool,
    },
    /// Show the regen file header and layout for the archive
    Info {
        #[arg(long, default_value_t = false)] json: bool,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);
    let file = cli.file.unwrap_or_default();
    match cli.cmd {
        Cmd::Generate { percentage, checksum_block_len, digest, buffer_size, progress, json } => {
            let cfg = GenerateConfig { percentage, checksum_block_len, io_buffer_size: buffer_size, digest: digest.into(), progress };
            generate(&file, &cfg, json)?;
        }
        Cmd::Verify { digest, json } => verify(&file, digest.map(Into::into), json)?,
        Cmd::Regenerate { bruteforce_limit, dry_run, progress, json } => {
            let cfg = RegenerateConfig { bruteforce_limit, dry_run, progress };
            regenerate(&file, &cfg, json)?;
        }
        Cmd::Info { json } => info(&file, json)?,
    }
    Ok(())
}

fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    let _ = tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr).with_target(false).try_init();
}

fn generate(file: &Path, cfg: &GenerateConfig, json: bool) -> Result<()> {
    let rep = regen_core::generate(file, cfg).with_context(|| format!("generate {}", file.display()))?;
    if json { println!("{}", serde_json::to_string_pretty(&rep)?); }
    eprintln!("Parity blocks: {} x {} bytes, checksum blocks {} per strip ({} bytes, last {})",
        rep.layout.parity_blocks, rep.layout.parity_block_len, rep.layout.checksum_blocks,
        rep.layout.checksum_block_len, rep.layout.last_checksum_block_len);
    if rep.uncovered_bytes > 0 { eprintln!("Warning: last {} bytes are not covered by redundancy", rep.uncovered_bytes); }
    eprintln!("Wrote {} and {}", rep.digest_path.display(), rep.redundancy_path.display());
    Ok(())
}

fn verify(file: &Path, digest: Option<DigestAlgorithm>, json: bool) -> Result<()> {
    let rep = regen_core::verify(file, digest)?;
    if json { println!("{}", serde_json::to_string_pretty(&rep)?); }
    eprintln!("Saved    {} hash: {}", rep.algorithm.name(), rep.stored_hex);
    eprintln!("Computed {} hash: {}", rep.algorithm.name(), rep.computed_hex);
    if !rep.matches { bail!("data is corrupt. Use regenerate"); }
    if !json { println!("OK"); }
    Ok(())
}

fn regenerate(file: &Path, cfg: &RegenerateConfig, json: bool) -> Result<()> {
    let rep = Regenerator::run(file, cfg).with_context(|| format!("regenerate {}", file.display()))?;
    if json {
        println!("{}", serde_json::to_string_pretty(&rep)?);
    } else if rep.is_clean() {
        println!("OK");
    } else {
        let verb = if rep.dry_run { "Repairable" } else { "Repaired" };
        println!("{} {} block(s), {} failed, {} withheld", verb, rep.corrected.len(), rep.failed.len(), rep.withheld.len());
    }
    for b in &rep.corrected { eprintln!("  strip {:5} block {:6} @ {:10}: flipped {} bit(s)", b.strip, b.index, b.offset, b.flipped_bits.len()); }
    for b in &rep.failed { eprintln!("  strip {:5} block {:6} @ {:10}: FAILED ({} bad bits)", b.strip, b.index, b.offset, b.bad_bits); }
    rep.ensure_complete()?;
    Ok(())
}

fn info(file: &Path, json: bool) -> Result<()> {
    let rep = regen_core::inspect(file)?;
    if json { println!("{}", serde_json::to_string_pretty(&rep)?); return Ok(()); }
    let (h, l) = (&rep.header, &rep.layout);
    println!("Version: {}{}", h.version, if rep.supported { "" } else { " (unsupported)" });
    println!("Checksum Block Length: {}", h.checksum_block_len);
    println!("Parity Blocks: {}", h.parity_blocks);
    println!("Archive File Size: {}", l.file_size);
    println!("Parity Block Length: {}", l.parity_block_len);
    println!("Checksum Blocks per strip: {} (last {} bytes)", l.checksum_blocks, l.last_checksum_block_len);
    println!("Uncovered tail: {} bytes", l.uncovered_len());
    println!("Regen file length: {} (expected {}){}", rep.actual_len, rep.expected_len, if rep.length_ok() { "" } else { " MISMATCH" });
    Ok(())
}
