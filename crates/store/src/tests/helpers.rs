use crate::*;
use anyhow::Result;
use serde_json::json;
use std::path::Path;
use tracing::Span;

pub fn open_store(root: &Path) -> Result<DataStore> {
    Ok(DataStore::open_at(root, Span::none())?)
}

pub fn sample_config() -> Value {
    json!({
        "workers": [{"name": "rig", "freq": {"start": 87500, "end": 108000}}],
        "description": "test run"
    })
}

/// Session with the four sweeps used throughout the range tests.
pub fn spectrum_session(store: &DataStore) -> Result<Session> {
    let mut session = store.create_session(1000, sample_config())?;
    session.write_spectrum("rig", 1066, &[10, 20, -30])?;
    session.write_spectrum("rig", 1080, &[1, 2, 3])?;
    session.write_spectrum("rig", 1200, &[0, 0, 0])?;
    session.write_spectrum("rig", 1300, &[10, 10, 12])?;
    Ok(session)
}
