use crate::*;
use anyhow::Result;
use std::fs;
use tempfile::tempdir;
use tracing::Span;

#[test]
fn missing_index_is_empty() -> Result<()> {
    let dir = tempdir()?;
    let index = SessionIndex::new(dir.path(), Span::none());

    assert!(index.ids()?.is_empty());
    assert!(!index.contains("1")?);
    Ok(())
}

#[test]
fn append_keeps_creation_order() -> Result<()> {
    let dir = tempdir()?;
    let index = SessionIndex::new(dir.path(), Span::none());

    index.append("300")?;
    index.append("100")?;
    index.append("200")?;

    assert_eq!(index.ids()?, vec!["300", "100", "200"]);
    assert_eq!(fs::read_to_string(index.path())?, "300\n100\n200\n");
    Ok(())
}

#[test]
fn append_rejects_line_breaks() -> Result<()> {
    let dir = tempdir()?;
    let index = SessionIndex::new(dir.path(), Span::none());

    assert!(matches!(index.append("1\n2"), Err(StoreError::InvalidName { .. })));
    assert!(matches!(index.append(""), Err(StoreError::InvalidName { .. })));
    assert!(index.ids()?.is_empty());
    Ok(())
}

#[test]
fn blank_lines_are_ignored() -> Result<()> {
    let dir = tempdir()?;
    let index = SessionIndex::new(dir.path(), Span::none());
    fs::write(index.path(), "1\n\n  2  \n\n")?;

    assert_eq!(index.ids()?, vec!["1", "2"]);
    Ok(())
}

#[test]
fn remove_rewrites_without_id() -> Result<()> {
    let dir = tempdir()?;
    let index = SessionIndex::new(dir.path(), Span::none()).with_sync(true);
    for id in ["1", "2", "3"] {
        index.append(id)?;
    }

    assert!(index.remove("2")?);
    assert_eq!(index.ids()?, vec!["1", "3"]);
    assert!(!dir.path().join("index.tmp").exists());

    // appends still work after a rewrite
    index.append("4")?;
    assert_eq!(index.ids()?, vec!["1", "3", "4"]);
    Ok(())
}

#[test]
fn remove_unknown_id_leaves_file_alone() -> Result<()> {
    let dir = tempdir()?;
    let index = SessionIndex::new(dir.path(), Span::none());
    index.append("1")?;
    let before = fs::metadata(index.path())?.modified()?;

    assert!(!index.remove("9")?);
    assert_eq!(fs::metadata(index.path())?.modified()?, before);
    assert_eq!(index.ids()?, vec!["1"]);
    Ok(())
}

#[test]
fn non_utf8_index_is_corrupt() -> Result<()> {
    let dir = tempdir()?;
    let index = SessionIndex::new(dir.path(), Span::none());
    fs::write(index.path(), [0xff, 0xfe, b'\n'])?;

    assert!(matches!(index.ids(), Err(StoreError::Corrupt { .. })));
    Ok(())
}
