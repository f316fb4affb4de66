use crate::*;
use anyhow::Result;
use serde_json::json;
use std::fs;
use tempfile::tempdir;
use tracing::Span;

#[test]
fn missing_without_defaults_is_no_settings() -> Result<()> {
    let dir = tempdir()?;
    let settings = SettingsStore::new(dir.path(), Span::none());

    let err = settings.read("rig", None).unwrap_err();
    assert!(matches!(err, StoreError::NoSettings { ref name } if name == "rig"));
    assert!(!dir.path().join("rig").exists());
    Ok(())
}

#[test]
fn defaults_are_persisted() -> Result<()> {
    let dir = tempdir()?;
    let settings = SettingsStore::new(dir.path(), Span::none());
    let defaults = json!({"gain": 20, "antenna": "A"});

    assert_eq!(settings.read("rig", Some(&defaults))?, defaults);
    assert!(dir.path().join("rig").exists());

    // later reads return the stored document, not new defaults
    let other = json!({"gain": 0});
    assert_eq!(settings.read("rig", Some(&other))?, defaults);
    assert_eq!(settings.read("rig", None)?, defaults);
    Ok(())
}

#[test]
fn write_replaces_wholesale() -> Result<()> {
    let dir = tempdir()?;
    let settings = SettingsStore::new(dir.path(), Span::none());

    settings.write("rig", &json!({"gain": 20, "antenna": "A"}))?;
    settings.write("rig", &json!({"gain": 30}))?;

    assert_eq!(settings.read("rig", None)?, json!({"gain": 30}));
    assert!(!dir.path().join(".rig.tmp").exists());
    Ok(())
}

#[test]
fn key_order_is_preserved() -> Result<()> {
    let dir = tempdir()?;
    let settings = SettingsStore::new(dir.path(), Span::none());

    settings.write("ui", &json!({"zeta": 1, "alpha": 2, "mid": 3}))?;
    let text = fs::read_to_string(dir.path().join("ui"))?;
    let zeta = text.find("zeta").unwrap();
    let alpha = text.find("alpha").unwrap();
    let mid = text.find("mid").unwrap();
    assert!(zeta < alpha && alpha < mid);
    Ok(())
}

#[test]
fn invalid_stored_json_is_json_error() -> Result<()> {
    let dir = tempdir()?;
    let settings = SettingsStore::new(dir.path(), Span::none());
    fs::write(dir.path().join("rig"), "{broken")?;

    assert!(matches!(
        settings.read("rig", Some(&json!({}))),
        Err(StoreError::Json { .. })
    ));
    Ok(())
}

#[test]
fn names_must_be_plain() -> Result<()> {
    let dir = tempdir()?;
    let settings = SettingsStore::new(dir.path(), Span::none());

    for bad in ["", "../x", "a/b", ".hidden"] {
        assert!(matches!(
            settings.write(bad, &json!({})),
            Err(StoreError::InvalidName { .. })
        ));
    }
    Ok(())
}
