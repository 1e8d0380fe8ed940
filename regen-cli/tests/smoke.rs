use assert_cmd::prelude::*;
use assert_fs::prelude::*;
use predicates::prelude::*;
use rand::{rngs::StdRng, Rng, SeedableRng};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::Path;
use std::process::Command;

fn write_random(path: &Path, bytes: usize, seed: u64) -> Vec<u8> {
    let mut rng = StdRng::seed_from_u64(seed);
    let data: Vec<u8> = (0..bytes).map(|_| rng.gen()).collect();
    std::fs::write(path, &data).unwrap();
    data
}

fn flip_bit(path: &Path, offset: u64, bit: u8) {
    let mut f = std::fs::OpenOptions::new().read(true).write(true).open(path).unwrap();
    let mut b = [0u8; 1];
    f.seek(SeekFrom::Start(offset)).unwrap();
    f.read_exact(&mut b).unwrap();
    b[0] ^= 1 << bit;
    f.seek(SeekFrom::Start(offset)).unwrap();
    f.write_all(&b).unwrap();
}

fn regen(dir: &Path) -> Command {
    let mut cmd = Command::cargo_bin("regen").unwrap();
    cmd.current_dir(dir);
    cmd
}

#[test]
fn generate_verify_regenerate_happy_path() {
    let td = assert_fs::TempDir::new().unwrap();
    let archive = td.child("backup.tar");
    let data = write_random(archive.path(), 100_000, 1);

    regen(td.path())
        .args(["generate", "-f", "backup.tar"])
        .assert()
        .success()
        .stdout(predicate::str::is_empty())
        .stderr(predicate::str::contains("Wrote"));
    td.child("backup.tar.sha256").assert(predicate::path::exists());
    td.child("backup.tar.regen").assert(predicate::path::exists());
    td.child("backup.tar.sha256").assert(predicate::str::ends_with("  backup.tar"));

    regen(td.path())
        .args(["verify", "-f", "backup.tar"])
        .assert()
        .success()
        .stdout(predicate::str::contains("OK"));

    // one bit inside strip 4
    flip_bit(archive.path(), 41_234, 3);

    regen(td.path())
        .args(["verify", "-f", "backup.tar"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("data is corrupt. Use regenerate"));

    regen(td.path())
        .args(["regenerate", "-f", "backup.tar"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Repaired 1 block(s), 0 failed, 0 withheld"));
    assert_eq!(std::fs::read(archive.path()).unwrap(), data);

    regen(td.path())
        .args(["verify", "-f", "backup.tar"])
        .assert()
        .success()
        .stdout(predicate::str::contains("OK"));
    regen(td.path())
        .args(["regenerate", "-f", "backup.tar"])
        .assert()
        .success()
        .stdout(predicate::str::contains("OK"));
}

#[test]
fn dry_run_and_json_report() {
    let td = assert_fs::TempDir::new().unwrap();
    let archive = td.child("a.bin");
    write_random(archive.path(), 10_000, 2);
    regen(td.path()).args(["generate", "-f", "a.bin", "-p", "20", "-c", "32"]).assert().success();
    flip_bit(archive.path(), 7, 0);
    let corrupted = std::fs::read(archive.path()).unwrap();

    let out = regen(td.path())
        .args(["regenerate", "-f", "a.bin", "--dry-run", "--json"])
        .output()
        .unwrap();
    assert!(out.status.success());
    let rep: serde_json::Value = serde_json::from_slice(&out.stdout).unwrap();
    assert_eq!(rep["dry_run"], true);
    assert_eq!(rep["corrected"][0]["flipped_bits"][0], 56);
    assert_eq!(rep["bytes_written"], 0);
    assert_eq!(std::fs::read(archive.path()).unwrap(), corrupted);
}

#[test]
fn info_shows_header_and_layout() {
    let td = assert_fs::TempDir::new().unwrap();
    write_random(td.child("x.bin").path(), 1000, 3);
    regen(td.path()).args(["generate", "-f", "x.bin"]).assert().success();
    regen(td.path())
        .args(["info", "-f", "x.bin"])
        .assert()
        .success()
        .stdout(
            predicate::str::contains("Version: 1")
                .and(predicate::str::contains("Checksum Block Length: 64"))
                .and(predicate::str::contains("Parity Blocks: 10"))
                .and(predicate::str::contains("Parity Block Length: 100")),
        );
}

#[test]
fn blake3_digest_round_trip() {
    let td = assert_fs::TempDir::new().unwrap();
    write_random(td.child("b.bin").path(), 5000, 4);
    regen(td.path()).args(["generate", "-f", "b.bin", "--digest", "blake3"]).assert().success();
    td.child("b.bin.blake3").assert(predicate::path::exists());
    regen(td.path())
        .args(["verify", "-f", "b.bin"])
        .assert()
        .success()
        .stderr(predicate::str::contains("blake3"));
}

#[test]
fn usage_and_format_errors() {
    let td = assert_fs::TempDir::new().unwrap();
    regen(td.path())
        .args(["generate"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("archive file name not specified"));
    regen(td.path()).args(["generate", "-f", "x", "-p", "0"]).assert().failure();

    write_random(td.child("c.bin").path(), 1000, 5);
    td.child("c.bin.regen").write_binary(b"garbage!!!!!!!!").unwrap();
    regen(td.path())
        .args(["regenerate", "-f", "c.bin"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("not a valid regen file"));
    regen(td.path())
        .args(["verify", "-f", "c.bin"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("error reading hash file"));
}
