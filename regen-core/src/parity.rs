//! XOR parity across equal-length strips.
//!
//! Strips are addressed inside one seekable source (the archive), so the
//! streaming path holds only two chunk-sized buffers no matter how large the
//! strips are.

use std::io::{self, Read, Seek, SeekFrom, Write};

/// XOR `src` into `acc`. Extra bytes in the longer slice are ignored.
pub fn xor_into(acc: &mut [u8], src: &[u8]) {
    for (a, s) in acc.iter_mut().zip(src) {
        *a ^= *s;
    }
}

/// Bytewise XOR of equal-length strips held in memory.
pub fn xor_combine(strips: &[&[u8]]) -> Vec<u8> {
    let Some(first) = strips.first() else {
        return Vec::new();
    };
    let mut parity = vec![0u8; first.len()];
    for s in strips {
        xor_into(&mut parity, s);
    }
    parity
}

pub fn read_exact_at<R: Read + Seek>(r: &mut R, offset: u64, buf: &mut [u8]) -> io::Result<()> {
    r.seek(SeekFrom::Start(offset))?;
    r.read_exact(buf)
}

/// XOR the column `[start, start + acc.len())` of every strip into `acc`.
///
/// `acc` is zeroed first. `scratch` must be at least as long as `acc`.
pub fn xor_column<R: Read + Seek>(
    src: &mut R,
    strips: u64,
    strip_len: u64,
    start: u64,
    acc: &mut [u8],
    scratch: &mut [u8],
) -> io::Result<()> {
    acc.fill(0);
    let scratch = &mut scratch[..acc.len()];
    for strip in 0..strips {
        read_exact_at(src, strip * strip_len + start, scratch)?;
        xor_into(acc, scratch);
    }
    Ok(())
}

/// Stream the parity strip of `strips` strips of `strip_len` bytes into `out`,
/// `chunk_size` columns at a time. The final chunk is truncated, never padded.
/// `on_chunk` is called with the byte count of every emitted chunk.
pub fn write_parity<R, W, F>(
    src: &mut R,
    strips: u64,
    strip_len: u64,
    chunk_size: usize,
    out: &mut W,
    mut on_chunk: F,
) -> io::Result<u64>
where
    R: Read + Seek,
    W: Write,
    F: FnMut(usize),
{
    let chunk_size = chunk_size.max(1);
    let mut acc = vec![0u8; chunk_size];
    let mut scratch = vec![0u8; chunk_size];
    let mut start = 0u64;
    while start < strip_len {
        let n = std::cmp::min(chunk_size as u64, strip_len - start) as usize;
        xor_column(src, strips, strip_len, start, &mut acc[..n], &mut scratch)?;
        out.write_all(&acc[..n])?;
        on_chunk(n);
        start += n as u64;
    }
    Ok(start)
}
