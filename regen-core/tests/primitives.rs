use regen_core::checksum::fletcher16;
use regen_core::combinations::{subset_count, Combinations};
use regen_core::parity::{write_parity, xor_combine};
use std::io::Cursor;

#[test]
fn fletcher16_reference_values() {
    assert_eq!(fletcher16(b""), 0);
    assert_eq!(fletcher16(b"abcde"), 0xC8F0);
    assert_eq!(fletcher16(b"abcdef"), 0x2057);
    assert_eq!(fletcher16(b"abcdefgh"), 0x0627);
}

#[test]
fn fletcher16_detects_swaps() {
    assert_ne!(fletcher16(&[1, 2, 3, 4]), fletcher16(&[2, 1, 3, 4]));
}

#[test]
fn xor_parity_rebuilds_missing_strip() {
    let strips: Vec<Vec<u8>> = (0..5u8).map(|s| (0..37u8).map(|i| i.wrapping_mul(s + 3) ^ s).collect()).collect();
    let refs: Vec<&[u8]> = strips.iter().map(|s| s.as_slice()).collect();
    let parity = xor_combine(&refs);
    for missing in 0..strips.len() {
        let mut rest: Vec<&[u8]> = refs.iter().enumerate().filter(|(i, _)| *i != missing).map(|(_, s)| *s).collect();
        rest.push(&parity);
        assert_eq!(xor_combine(&rest), strips[missing]);
    }
}

#[test]
fn streamed_parity_truncates_last_chunk() {
    let strips = 4u64;
    let strip_len = 10u64;
    let data: Vec<u8> = (0..(strips * strip_len) as u8).collect();
    let refs: Vec<&[u8]> = data.chunks(strip_len as usize).collect();
    let expected = xor_combine(&refs);

    let mut chunks = Vec::new();
    let mut out = Vec::new();
    let n = write_parity(&mut Cursor::new(&data), strips, strip_len, 4, &mut out, |c| chunks.push(c)).unwrap();
    assert_eq!(n, strip_len);
    assert_eq!(chunks, vec![4, 4, 2]);
    assert_eq!(out, expected);
}

#[test]
fn combinations_go_largest_first() {
    let got: Vec<Vec<u32>> = Combinations::new(&[1, 2, 3]).collect();
    let want: Vec<Vec<u32>> =
        vec![vec![1, 2, 3], vec![1, 2], vec![1, 3], vec![2, 3], vec![1], vec![2], vec![3]];
    assert_eq!(got, want);
    assert_eq!(subset_count(3), 7);
}

#[test]
fn combinations_respect_take_limit() {
    let items: Vec<usize> = (0..40).collect();
    // 2^40 subsets; only the requested prefix is ever built
    let got: Vec<Vec<usize>> = Combinations::new(&items).take(5).collect();
    assert_eq!(got.len(), 5);
    assert_eq!(got[0].len(), 40);
    assert_eq!(got[1].len(), 39);
    assert_eq!(got[1][0], 0);
    assert_eq!(*got[1].last().unwrap(), 38);
}

#[test]
fn combinations_of_nothing_is_empty() {
    assert_eq!(Combinations::<usize>::new(&[]).count(), 0);
    assert_eq!(Combinations::new(&[7usize]).collect::<Vec<_>>(), vec![vec![7]]);
}
