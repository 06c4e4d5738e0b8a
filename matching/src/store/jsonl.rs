use serde::Serialize;
use serde::de::DeserializeOwned;
use std::io::Write as _;
use std::path::Path;
use std::path::PathBuf;
use std::sync::Mutex;
use std::sync::MutexGuard;

use super::*;

pub const ITEMS_FILE: &str = "items.jsonl";
pub const MATCHES_FILE: &str = "matches.jsonl";

/// Line-delimited JSON store: `items.jsonl` and `matches.jsonl` under one
/// directory. Adds are appends; status changes atomically replace the file.
#[derive(Debug)]
pub struct JsonlStore {
    dir: PathBuf,
    // Serializes read-check-write sequences within this process.
    write_lock: Mutex<()>,
}

impl JsonlStore {
    pub fn new<P: AsRef<Path>>(dir: P) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn items_path(&self) -> PathBuf {
        self.dir.join(ITEMS_FILE)
    }

    pub fn matches_path(&self) -> PathBuf {
        self.dir.join(MATCHES_FILE)
    }

    fn lock(&self) -> MutexGuard<'_, ()> {
        self.write_lock.lock().unwrap_or_else(|p| p.into_inner())
    }
}

/// Read every decodable record from `path`. A missing file is empty;
/// undecodable lines are logged and skipped.
pub(crate) fn read_all<T: DeserializeOwned>(path: &Path) -> anyhow::Result<Vec<T>> {
    let data = match std::fs::read_to_string(path) {
        Ok(s) => s,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e.into()),
    };
    let mut out = Vec::new();
    for (lineno, line) in data.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        match serde_json::from_str::<T>(line) {
            Ok(v) => out.push(v),
            Err(e) => tracing::warn!(
                "skipping unreadable record at {}:{}: {e}",
                path.display(),
                lineno + 1
            ),
        }
    }
    Ok(out)
}

/// Set `status` on every record in `path` whose `id` is `id`.
///
/// Works on raw lines: records that do not decode are written back verbatim.
/// The new contents go to a temp file in the same directory which is then
/// renamed over `path`. Returns whether any record was patched.
fn rewrite_status(path: &Path, id: &str, status: &str) -> anyhow::Result<bool> {
    let data = match std::fs::read_to_string(path) {
        Ok(s) => s,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(false),
        Err(e) => return Err(e.into()),
    };
    let mut out = String::with_capacity(data.len());
    let mut patched = false;
    for line in data.lines() {
        if line.trim().is_empty() {
            continue;
        }
        match serde_json::from_str::<serde_json::Value>(line) {
            Ok(mut v) if v.get("id").and_then(|v| v.as_str()) == Some(id) => {
                v["status"] = serde_json::Value::String(status.to_string());
                out.push_str(&serde_json::to_string(&v)?);
                patched = true;
            }
            _ => out.push_str(line),
        }
        out.push('\n');
    }
    if !patched {
        return Ok(false);
    }
    let dir = path
        .parent()
        .filter(|d| !d.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
    tmp.write_all(out.as_bytes())?;
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| e.error)?;
    Ok(true)
}

fn append_line<T: Serialize>(path: &Path, record: &T) -> anyhow::Result<()> {
    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir)?;
    }
    let mut line = serde_json::to_string(record)?;
    line.push('\n');
    let mut f = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)?;
    f.write_all(line.as_bytes())?;
    f.flush()?;
    Ok(())
}

impl MatchStore for JsonlStore {
    fn append(&self, m: Match) -> anyhow::Result<bool> {
        let _guard = self.lock();
        let path = self.matches_path();
        let existing: Vec<Match> = read_all(&path)?;
        if existing.iter().any(|e| e.id == m.id) {
            return Ok(false);
        }
        append_line(&path, &m)?;
        Ok(true)
    }

    fn get_match(&self, id: &str) -> anyhow::Result<Option<Match>> {
        Ok(self.list_matches()?.into_iter().find(|m| m.id == id))
    }

    fn list_matches(&self) -> anyhow::Result<Vec<Match>> {
        let mut seen = std::collections::HashSet::new();
        let mut all: Vec<Match> = read_all(&self.matches_path())?;
        // First record per id wins.
        all.retain(|m| seen.insert(m.id.clone()));
        Ok(all)
    }

    fn resolve_match(&self, id: &str) -> anyhow::Result<()> {
        let _guard = self.lock();
        if !rewrite_status(&self.matches_path(), id, "resolved")? {
            anyhow::bail!("resolve_match: id not found: {id}");
        }
        Ok(())
    }
}

impl ItemStore for JsonlStore {
    fn add_item(&self, item: Item) -> anyhow::Result<()> {
        let _guard = self.lock();
        let path = self.items_path();
        let existing: Vec<Item> = read_all(&path)?;
        if existing.iter().any(|i| i.id == item.id) {
            let dup = &item.id;
            anyhow::bail!("add_item: duplicate id: {dup}");
        }
        append_line(&path, &item)
    }

    fn get_item(&self, id: &str) -> anyhow::Result<Option<Item>> {
        let all: Vec<Item> = read_all(&self.items_path())?;
        Ok(all.into_iter().find(|i| i.id == id))
    }

    fn list_items(&self, query: &ItemQuery) -> anyhow::Result<Vec<Item>> {
        let all: Vec<Item> = read_all(&self.items_path())?;
        Ok(all.into_iter().filter(|i| query.matches(i)).collect())
    }

    fn resolve_item(&self, id: &str) -> anyhow::Result<()> {
        let _guard = self.lock();
        if !rewrite_status(&self.items_path(), id, "resolved")? {
            anyhow::bail!("resolve_item: id not found: {id}");
        }
        Ok(())
    }
}

impl Store for JsonlStore {}
