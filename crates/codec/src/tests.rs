use super::*;
use std::fs::{self, OpenOptions};
use std::io::Cursor;
use tempfile::tempdir;

// -------------------- Fixed byte order --------------------

#[test]
fn timestamp_is_little_endian() {
    let bytes = to_bytes(&Timestamp, &0x0102_0304_0506_0708).unwrap();
    assert_eq!(bytes, vec![0x08, 0x07, 0x06, 0x05, 0x04, 0x03, 0x02, 0x01]);
}

#[test]
fn word_is_little_endian() {
    let bytes = to_bytes(&Word, &0xDEAD_BEEF).unwrap();
    assert_eq!(bytes, vec![0xEF, 0xBE, 0xAD, 0xDE]);
}

#[test]
fn index_entry_layout() {
    let bytes = to_bytes(&IndexEntry, &(1, 2)).unwrap();
    assert_eq!(bytes.len(), INDEX_ENTRY_BYTES);
    assert_eq!(&bytes[..8], &1u64.to_le_bytes());
    assert_eq!(&bytes[8..], &2u32.to_le_bytes());
}

#[test]
fn levels_keep_sign() {
    let shape = Levels::new(3);
    let bytes = to_bytes(&shape, &vec![10, 20, -30]).unwrap();
    assert_eq!(bytes, vec![10, 20, 0xE2]);
    assert_eq!(shape.decode(&bytes), vec![10, 20, -30]);
}

#[test]
fn levels_reject_wrong_width() {
    let shape = Levels::new(3);
    let err = to_bytes(&shape, &vec![1, 2]).unwrap_err();
    assert_eq!(err.kind(), io::ErrorKind::InvalidInput);
}

#[test]
fn float_decodes_what_it_encodes() {
    let bytes = to_bytes(&Float, &21.5).unwrap();
    assert_eq!(Float.decode(&bytes), 21.5);
}

// -------------------- Absent on short read --------------------

#[test]
fn empty_input_is_absent() {
    let mut r = Cursor::new(Vec::<u8>::new());
    assert_eq!(read(&Timestamp, &mut r).unwrap(), None);
}

#[test]
fn partial_value_is_absent() {
    let mut r = Cursor::new(vec![1u8, 2, 3]);
    assert_eq!(read(&Word, &mut r).unwrap(), None);
}

#[test]
fn zero_width_levels_always_decode() {
    let mut r = Cursor::new(Vec::<u8>::new());
    assert_eq!(read(&Levels::new(0), &mut r).unwrap(), Some(vec![]));
}

#[test]
fn sequential_reads_stop_at_torn_tail() {
    let mut buf = Vec::new();
    write(&Timestamp, &mut buf, &1).unwrap();
    write(&Timestamp, &mut buf, &2).unwrap();
    buf.extend_from_slice(&[9, 9, 9]);

    let mut r = Cursor::new(buf);
    let mut got = Vec::new();
    while let Some(t) = read(&Timestamp, &mut r).unwrap() {
        got.push(t);
    }
    assert_eq!(got, vec![1, 2]);
}

// -------------------- Files --------------------

#[test]
fn append_to_file_and_read_back() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("timestamps");

    for t in [1066u64, 1080, 1200] {
        let mut f = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .unwrap();
        write(&Timestamp, &mut f, &t).unwrap();
    }

    assert_eq!(fs::metadata(&path).unwrap().len(), 3 * TIMESTAMP_BYTES as u64);

    let mut f = fs::File::open(&path).unwrap();
    assert_eq!(read(&Timestamp, &mut f).unwrap(), Some(1066));
    assert_eq!(read(&Timestamp, &mut f).unwrap(), Some(1080));
    assert_eq!(read(&Timestamp, &mut f).unwrap(), Some(1200));
    assert_eq!(read(&Timestamp, &mut f).unwrap(), None);
}

#[test]
fn failed_encode_writes_nothing() {
    let mut out = Vec::new();
    assert!(write(&Levels::new(4), &mut out, &vec![1, 2, 3]).is_err());
    assert!(out.is_empty());
}
