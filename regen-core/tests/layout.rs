use regen_core::layout::{parity_blocks_for, BlockRef, Layout};
use regen_core::format::Header;
use regen_core::Error;

#[test]
fn thousand_byte_example() {
    let l = Layout::plan(1000, 10, 64).unwrap();
    assert_eq!(l.parity_blocks, 10);
    assert_eq!(l.parity_block_len, 100);
    assert_eq!(l.checksum_blocks, 2);
    assert_eq!(l.last_checksum_block_len, 36);
    assert_eq!(l.block_len(0), 64);
    assert_eq!(l.block_len(1), 36);
    assert_eq!(l.block(3, 1), BlockRef { strip: 3, index: 1, offset: 364, len: 36 });
    assert_eq!(l.table_len(), 40);
    assert_eq!(l.parity_offset(), 11 + 40);
    assert_eq!(l.redundancy_len(), 11 + 40 + 100);
    assert_eq!(l.uncovered_len(), 0);
}

#[test]
fn plan_is_deterministic_and_matches_header_path() {
    let a = Layout::plan(123_457, 7, 100).unwrap();
    let b = Layout::plan(123_457, 7, 100).unwrap();
    assert_eq!(a, b);
    // regeneration rebuilds the layout from the two header fields only
    let c = Layout::new(123_457, a.parity_blocks as u16, a.checksum_block_len as u16);
    assert_eq!(a, c);
}

#[test]
fn even_strip_keeps_full_last_block() {
    let l = Layout::plan(1280, 10, 64).unwrap();
    assert_eq!(l.parity_block_len, 128);
    assert_eq!(l.checksum_blocks, 2);
    assert_eq!(l.last_checksum_block_len, 64);
}

#[test]
fn trailing_bytes_are_uncovered() {
    let l = Layout::plan(1009, 10, 64).unwrap();
    assert_eq!(l.parity_block_len, 100);
    assert_eq!(l.covered_len(), 1000);
    assert_eq!(l.uncovered_len(), 9);
}

#[test]
fn parity_block_count_rounds() {
    assert_eq!(parity_blocks_for(10).unwrap(), 10);
    assert_eq!(parity_blocks_for(5).unwrap(), 20);
    assert_eq!(parity_blocks_for(1).unwrap(), 100);
    assert_eq!(parity_blocks_for(30).unwrap(), 3); // 3.33
    assert_eq!(parity_blocks_for(40).unwrap(), 3); // 2.5
    assert_eq!(parity_blocks_for(60).unwrap(), 2); // 1.67
    assert_eq!(parity_blocks_for(99).unwrap(), 1);
    assert!(matches!(parity_blocks_for(0), Err(Error::InvalidPercentage(0))));
    assert!(matches!(parity_blocks_for(100), Err(Error::InvalidPercentage(100))));
}

#[test]
fn usage_errors() {
    assert!(matches!(Layout::plan(0, 10, 64), Err(Error::EmptyArchive)));
    assert!(matches!(Layout::plan(5, 10, 64), Err(Error::ArchiveTooSmall { size: 5, parity_blocks: 10 })));
    assert!(matches!(Layout::plan(1000, 10, 0), Err(Error::InvalidChecksumBlockLen { got: 0 })));
    assert!(matches!(
        Layout::plan(1000, 10, 70_000),
        Err(Error::InvalidChecksumBlockLen { got: 70_000 })
    ));
}

#[test]
fn blocks_iterate_strip_major() {
    let l = Layout::plan(1000, 10, 64).unwrap();
    let blocks: Vec<_> = l.blocks().collect();
    assert_eq!(blocks.len(), 20);
    assert_eq!((blocks[0].strip, blocks[0].index, blocks[0].offset), (0, 0, 0));
    assert_eq!((blocks[1].strip, blocks[1].index, blocks[1].offset), (0, 1, 64));
    assert_eq!((blocks[2].strip, blocks[2].index, blocks[2].offset), (1, 0, 100));
    let table: Vec<u64> = blocks.iter().map(|b| l.table_offset(b.strip, b.index)).collect();
    for (n, off) in table.iter().enumerate() {
        assert_eq!(*off, 11 + 2 * n as u64);
    }
}

#[test]
fn truncated_strip_counts_from_older_files_read_back() {
    // 40% plans 3 strips now; files made with the truncating rule say 2
    assert_eq!(parity_blocks_for(40).unwrap(), 3);
    let old = Header::new(64, 2);
    let decoded = Header::decode(&old.encode()).unwrap();
    let l = decoded.layout(1000);
    assert_eq!(l.parity_blocks, 2);
    assert_eq!(l.parity_block_len, 500);
    assert_eq!(l.checksum_blocks, 8);
    assert_eq!(l.last_checksum_block_len, 500 - 7 * 64);
    assert_eq!(l.redundancy_len(), 11 + 2 * 16 + 500);
}
