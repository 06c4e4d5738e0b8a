use std::path::Path;
use std::path::PathBuf;

use crate::store::JsonlStore;
use crate::store::Store;

#[cfg(feature = "sqlite")]
use crate::store::SqliteStore;

/// Backend selection for item and match persistence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backend {
    Jsonl,
    #[cfg(feature = "sqlite")]
    Sqlite,
}

impl std::str::FromStr for Backend {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "jsonl" => Ok(Backend::Jsonl),
            #[cfg(feature = "sqlite")]
            "sqlite" => Ok(Backend::Sqlite),
            #[cfg(not(feature = "sqlite"))]
            "sqlite" => anyhow::bail!(
                "sqlite backend not compiled; enable with `--features lostfound-matching/sqlite`"
            ),
            other => anyhow::bail!("unknown backend: {other}"),
        }
    }
}

/// Choose backend using env `LOSTFOUND_BACKEND` if present: `sqlite` or `jsonl`.
/// Defaults to JSONL; if `sqlite` is requested but not compiled in, falls back to JSONL.
pub fn choose_backend_from_env() -> Backend {
    let v = std::env::var("LOSTFOUND_BACKEND").unwrap_or_default();
    match v.as_str() {
        #[cfg(feature = "sqlite")]
        "sqlite" | "SQLITE" => Backend::Sqlite,
        _ => Backend::Jsonl,
    }
}

/// Directory the JSONL backend uses under `data_dir`.
/// Overridden by `LOSTFOUND_JSONL_DIR`.
pub fn jsonl_dir(data_dir: &Path) -> PathBuf {
    std::env::var("LOSTFOUND_JSONL_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(|_| data_dir.to_path_buf())
}

/// Database file the SQLite backend uses under `data_dir`.
/// Overridden by `LOSTFOUND_DB`.
pub fn sqlite_path(data_dir: &Path) -> PathBuf {
    std::env::var("LOSTFOUND_DB")
        .map(PathBuf::from)
        .unwrap_or_else(|_| data_dir.join("lostfound.db"))
}

/// Open the store rooted at `data_dir`, creating the directory if needed.
pub fn open_store(data_dir: &Path, backend: Option<Backend>) -> anyhow::Result<Box<dyn Store>> {
    let be = backend.unwrap_or_else(choose_backend_from_env);
    tracing::debug!("opening {be:?} store under {}", data_dir.display());
    Ok(match be {
        Backend::Jsonl => {
            let dir = jsonl_dir(data_dir);
            std::fs::create_dir_all(&dir)?;
            Box::new(JsonlStore::new(dir))
        }
        #[cfg(feature = "sqlite")]
        Backend::Sqlite => {
            let path = sqlite_path(data_dir);
            if let Some(dir) = path.parent() {
                std::fs::create_dir_all(dir)?;
            }
            Box::new(SqliteStore::new(path))
        }
    })
}
