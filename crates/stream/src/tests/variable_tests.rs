use crate::*;
use anyhow::Result;
use std::fs::{self, OpenOptions};
use std::io::Write;
use tempfile::tempdir;
use tracing::Span;

fn collect(
    stream: &VariableStream,
    start: Option<u64>,
    end: Option<u64>,
) -> Result<Vec<(u64, u32, Vec<u8>)>> {
    let mut out = Vec::new();
    for rec in stream.range(start, end)? {
        out.push(rec?);
    }
    Ok(out)
}

fn rds_names(dir: &std::path::Path) -> Result<VariableStream> {
    let s = VariableStream::new(dir.join("rds").join("name"), Span::none());
    s.append(1066, 1, b"Radio 7")?;
    s.append(1080, 4, b"Bilbo")?;
    s.append(1090, 1, b"Frodo")?;
    s.append(1280, 6, b"Wikipedia")?;
    Ok(s)
}

// -------------------- Range scenarios --------------------

#[test]
fn rds_name_range() -> Result<()> {
    let dir = tempdir()?;
    let s = rds_names(dir.path())?;

    let got = collect(&s, Some(1050), Some(1085))?;
    assert_eq!(
        got,
        vec![
            (1066, 1, b"Radio 7".to_vec()),
            (1080, 4, b"Bilbo".to_vec()),
        ]
    );
    Ok(())
}

#[test]
fn start_bound_is_exclusive() -> Result<()> {
    let dir = tempdir()?;
    let s = rds_names(dir.path())?;

    let got = collect(&s, Some(1080), Some(1280))?;
    let ts: Vec<u64> = got.iter().map(|(t, _, _)| *t).collect();
    assert_eq!(ts, vec![1090, 1280]);
    Ok(())
}

#[test]
fn unbounded_range_returns_everything() -> Result<()> {
    let dir = tempdir()?;
    let s = rds_names(dir.path())?;
    let got = collect(&s, None, None)?;
    assert_eq!(got.len(), 4);
    assert_eq!(got[3], (1280, 6, b"Wikipedia".to_vec()));
    Ok(())
}

#[test]
fn blobs_of_differing_length_round_trip() -> Result<()> {
    let dir = tempdir()?;
    let s = VariableStream::new(dir.path().join("error"), Span::none());
    let forty: Vec<u8> = (0..40).collect();
    s.append(1, 0, b"abc")?;
    s.append(2, 0, b"")?;
    s.append(3, 0, &forty)?;
    s.append(4, 0, b"")?;

    let got = collect(&s, None, None)?;
    assert_eq!(
        got,
        vec![
            (1, 0, b"abc".to_vec()),
            (2, 0, Vec::new()),
            (3, 0, forty),
            (4, 0, Vec::new()),
        ]
    );
    Ok(())
}

#[test]
fn index_offsets_point_at_blocks() -> Result<()> {
    let dir = tempdir()?;
    let s = VariableStream::new(dir.path().join("v"), Span::none());
    s.append(1, 7, b"xy")?;
    s.append(2, 8, b"z")?;

    let index = fs::read(s.index_path())?;
    assert_eq!(index.len(), 2 * codec::INDEX_ENTRY_BYTES);
    assert_eq!(&index[8..12], &0u32.to_le_bytes());
    assert_eq!(&index[20..24], &10u32.to_le_bytes()); // 4 key + 4 len + 2 bytes

    let data = fs::read(s.data_path())?;
    assert_eq!(&data[..4], &7u32.to_le_bytes());
    assert_eq!(&data[4..8], &2u32.to_le_bytes());
    assert_eq!(&data[8..10], b"xy");
    Ok(())
}

// -------------------- Missing files / torn tail --------------------

#[test]
fn missing_stream_reads_empty() -> Result<()> {
    let dir = tempdir()?;
    let s = VariableStream::new(dir.path().join("nothing"), Span::none());
    assert!(collect(&s, Some(0), Some(u64::MAX))?.is_empty());
    assert!(s.summary()?.is_empty());
    Ok(())
}

#[test]
fn torn_final_block_ends_range() -> Result<()> {
    let dir = tempdir()?;
    let s = VariableStream::new(dir.path().join("v"), Span::none());
    s.append(1, 0, b"complete")?;

    // crash: index entry for a 10-byte block, only 5 payload bytes landed
    let offset = fs::metadata(s.data_path())?.len() as u32;
    let mut idx = OpenOptions::new().append(true).open(s.index_path())?;
    idx.write_all(&2u64.to_le_bytes())?;
    idx.write_all(&offset.to_le_bytes())?;
    let mut data = OpenOptions::new().append(true).open(s.data_path())?;
    data.write_all(&0u32.to_le_bytes())?;
    data.write_all(&10u32.to_le_bytes())?;
    data.write_all(b"12345")?;

    assert_eq!(collect(&s, None, None)?, vec![(1, 0, b"complete".to_vec())]);
    assert_eq!(s.summary()?.count, 1);
    Ok(())
}

#[test]
fn index_entry_without_block_ends_range() -> Result<()> {
    let dir = tempdir()?;
    let s = VariableStream::new(dir.path().join("v"), Span::none());
    s.append(1, 0, b"a")?;

    let offset = fs::metadata(s.data_path())?.len() as u32;
    let mut idx = OpenOptions::new().append(true).open(s.index_path())?;
    idx.write_all(&2u64.to_le_bytes())?;
    idx.write_all(&offset.to_le_bytes())?;

    assert_eq!(collect(&s, None, None)?.len(), 1);
    assert_eq!(s.summary()?.count, 1);
    Ok(())
}

#[test]
fn inconsistent_offsets_are_corrupt() -> Result<()> {
    let dir = tempdir()?;
    let s = VariableStream::new(dir.path().join("v"), Span::none());
    s.append(1, 0, b"abc")?;
    s.append(2, 0, b"def")?;

    // point the second entry one byte too far
    let mut index = fs::read(s.index_path())?;
    index[20..24].copy_from_slice(&12u32.to_le_bytes());
    fs::write(s.index_path(), &index)?;

    let results: Vec<_> = s.range(None, None)?.collect();
    assert!(results[0].is_ok());
    assert!(matches!(results[1], Err(StreamError::Corrupt { .. })));
    assert_eq!(results.len(), 2);
    Ok(())
}

#[test]
fn oversized_blob_rejected() -> Result<()> {
    let dir = tempdir()?;
    let s = VariableStream::new(dir.path().join("v"), Span::none());
    let big = vec![0u8; format::MAX_BLOB_BYTES + 1];
    assert!(matches!(s.append(1, 0, &big), Err(StreamError::Io { .. })));
    assert!(collect(&s, None, None)?.is_empty());
    Ok(())
}

// -------------------- Summary --------------------

#[test]
fn summary_counts_and_bounds() -> Result<()> {
    let dir = tempdir()?;
    let s = rds_names(dir.path())?;
    let sum = s.summary()?;
    assert_eq!(sum.count, 4);
    assert_eq!(sum.first, Some(1066));
    assert_eq!(sum.last, Some(1280));
    Ok(())
}
