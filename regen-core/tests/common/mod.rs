#![allow(dead_code)]

use rand::{rngs::StdRng, Rng, SeedableRng};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::Path;

pub fn random_bytes(len: usize, seed: u64) -> Vec<u8> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..len).map(|_| rng.gen()).collect()
}

pub fn write_random(path: &Path, len: usize, seed: u64) -> Vec<u8> {
    let data = random_bytes(len, seed);
    std::fs::write(path, &data).unwrap();
    data
}

/// Flip bit `bit` (LSB first) of the byte at `offset`.
pub fn flip_bit(path: &Path, offset: u64, bit: u8) {
    let mut f = std::fs::OpenOptions::new().read(true).write(true).open(path).unwrap();
    let mut b = [0u8; 1];
    f.seek(SeekFrom::Start(offset)).unwrap();
    f.read_exact(&mut b).unwrap();
    b[0] ^= 1 << bit;
    f.seek(SeekFrom::Start(offset)).unwrap();
    f.write_all(&b).unwrap();
}

/// Flip `len` consecutive bits starting at absolute bit position `start`.
pub fn flip_burst(path: &Path, start: u64, len: u64) {
    for i in start..start + len {
        flip_bit(path, i / 8, (i % 8) as u8);
    }
}
