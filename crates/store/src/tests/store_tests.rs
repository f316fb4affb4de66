use super::helpers::{open_store, sample_config, spectrum_session};
use crate::*;
use anyhow::Result;
use serde_json::json;
use std::fs;
use tempfile::tempdir;

#[test]
fn open_creates_layout() -> Result<()> {
    let dir = tempdir()?;
    let store = open_store(dir.path())?;

    assert_eq!(store.root(), dir.path());
    assert_eq!(store.data_dir(), dir.path().join(DATA_DIRNAME));
    assert_eq!(store.samples_dir(), dir.path().join(SAMPLES_DIRNAME));
    assert!(!store.config().sync);
    for name in [DATA_DIRNAME, SETTINGS_DIRNAME, SAMPLES_DIRNAME] {
        assert!(dir.path().join(name).is_dir(), "{} missing", name);
    }
    assert!(store.sessions()?.is_empty());

    // opening again is harmless
    open_store(dir.path())?;
    Ok(())
}

#[test]
fn open_removes_leftover_tmp_files() -> Result<()> {
    let dir = tempdir()?;
    open_store(dir.path())?;
    fs::write(dir.path().join("data").join("index.tmp"), "junk")?;
    fs::write(dir.path().join("settings").join(".rig.tmp"), "junk")?;

    open_store(dir.path())?;
    assert!(!dir.path().join("data").join("index.tmp").exists());
    assert!(!dir.path().join("settings").join(".rig.tmp").exists());
    Ok(())
}

#[test]
fn open_keeps_settings_named_like_tmp_files() -> Result<()> {
    let dir = tempdir()?;
    let store = open_store(dir.path())?;
    store.settings().write("rig.tmp", &json!({"gain": 20}))?;

    let reopened = open_store(dir.path())?;
    assert_eq!(reopened.settings().read("rig.tmp", None)?, json!({"gain": 20}));
    Ok(())
}

#[test]
fn sessions_listed_in_creation_order() -> Result<()> {
    let dir = tempdir()?;
    let store = open_store(dir.path())?;
    store.create_session(300, json!({}))?;
    store.create_session(100, json!({}))?;

    let reopened = open_store(dir.path())?;
    assert_eq!(reopened.sessions()?, vec!["300", "100"]);
    Ok(())
}

#[test]
fn iter_sessions_reads_each_session() -> Result<()> {
    let dir = tempdir()?;
    let store = open_store(dir.path())?;
    spectrum_session(&store)?;
    store.create_session(2000, json!({"note": "empty"}))?;

    let sessions = store.iter_sessions(None)?.collect::<crate::Result<Vec<_>>>()?;
    assert_eq!(sessions.len(), 2);
    assert_eq!(sessions[0].id(), Some("1000"));
    assert_eq!(sessions[0].config()?, &sample_config());
    assert_eq!(sessions[0].spectrum_count()?, 4);
    assert_eq!(sessions[1].id(), Some("2000"));
    assert_eq!(sessions[1].spectrum_count()?, 0);
    Ok(())
}

#[test]
fn iter_sessions_skips_missing_directories() -> Result<()> {
    let dir = tempdir()?;
    let store = open_store(dir.path())?;
    store.create_session(1, json!({}))?;
    store.create_session(2, json!({}))?;
    store.create_session(3, json!({}))?;
    fs::remove_dir_all(dir.path().join("data").join("2"))?;

    let ids: Vec<String> = store
        .iter_sessions(None)?
        .map(|s| s.map(|s| s.id().unwrap_or_default().to_string()))
        .collect::<crate::Result<_>>()?;
    assert_eq!(ids, vec!["1", "3"]);
    Ok(())
}

#[test]
fn iter_sessions_with_explicit_ids() -> Result<()> {
    let dir = tempdir()?;
    let store = open_store(dir.path())?;
    store.create_session(1, json!({}))?;
    store.create_session(2, json!({}))?;

    let ids: Vec<String> = store
        .iter_sessions(Some(vec!["2".to_string(), "../1".to_string(), "9".to_string()]))?
        .map(|s| s.map(|s| s.id().unwrap_or_default().to_string()))
        .collect::<crate::Result<_>>()?;
    assert_eq!(ids, vec!["2"]);
    Ok(())
}

#[test]
fn iter_sessions_surfaces_corrupt_session() -> Result<()> {
    let dir = tempdir()?;
    let store = open_store(dir.path())?;
    store.create_session(1, json!({}))?;
    fs::write(dir.path().join("data").join("1").join(FORMAT_FILENAME), b"xx")?;

    let mut iter = store.iter_sessions(None)?;
    assert!(matches!(iter.next(), Some(Err(StoreError::Corrupt { .. }))));
    assert!(iter.next().is_none());
    Ok(())
}

#[test]
fn open_session_rejects_path_like_ids() -> Result<()> {
    let dir = tempdir()?;
    let store = open_store(dir.path())?;

    assert!(matches!(
        store.open_session("../settings"),
        Err(StoreError::InvalidName { .. })
    ));
    Ok(())
}

#[test]
fn disk_stats_count_data_and_samples() -> Result<()> {
    let dir = tempdir()?;
    let store = open_store(dir.path())?;
    let empty = store.stats()?;
    assert_eq!(empty.samples_bytes, 0);

    let mut session = spectrum_session(&store)?;
    let clip = session.write_audio("rig", 1500, 1)?;
    fs::write(&clip, vec![0u8; 1000])?;

    let stats = store.stats()?;
    assert_eq!(stats.samples_bytes, 1000);
    assert!(stats.data_bytes > empty.data_bytes);
    #[cfg(unix)]
    assert!(stats.free_bytes.is_some_and(|b| b > 0));
    Ok(())
}

#[test]
fn settings_reachable_from_store() -> Result<()> {
    let dir = tempdir()?;
    let store = open_store(dir.path())?;

    store.settings().write("rig", &json!({"gain": 5}))?;
    let reopened = open_store(dir.path())?;
    assert_eq!(reopened.settings().read("rig", None)?, json!({"gain": 5}));
    Ok(())
}
