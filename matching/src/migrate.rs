use std::collections::HashSet;
use std::path::Path;

/// Migrate a JSONL store directory into a SQLite database file.
///
/// - `jsonl_dir`: directory holding `items.jsonl` and `matches.jsonl`
/// - `sqlite_path`: destination SQLite DB (created if missing)
///
/// Returns the count of imported items and of newly inserted matches.
#[cfg(feature = "sqlite")]
pub fn migrate_jsonl_to_sqlite(
    jsonl_dir: &Path,
    sqlite_path: &Path,
) -> anyhow::Result<(usize, usize)> {
    use crate::store::ItemQuery;
    use crate::store::ItemStore;
    use crate::store::JsonlStore;
    use crate::store::MatchStore;
    use crate::store::SqliteStore;

    let source = JsonlStore::new(jsonl_dir);
    let items = source.list_items(&ItemQuery::everything())?;
    let matches = source.list_matches()?;
    if let Some(dir) = sqlite_path.parent() {
        std::fs::create_dir_all(dir)?;
    }
    SqliteStore::new(sqlite_path).import(&items, &matches)
}

#[cfg(not(feature = "sqlite"))]
pub fn migrate_jsonl_to_sqlite(
    _jsonl_dir: &Path,
    _sqlite_path: &Path,
) -> anyhow::Result<(usize, usize)> {
    anyhow::bail!("sqlite backend not compiled; enable with `--features lostfound-matching/sqlite`");
}

/// Rewrite a JSONL file keeping the first record per `id` and dropping
/// blank or undecodable lines. Returns `(read, written)`, where `read`
/// counts non-blank lines.
pub fn compact_jsonl(input: &Path, output: &Path) -> anyhow::Result<(usize, usize)> {
    let data = match std::fs::read_to_string(input) {
        Ok(s) => s,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => String::new(),
        Err(e) => return Err(e.into()),
    };
    let mut seen = HashSet::new();
    let mut out = String::new();
    let mut read = 0usize;
    let mut written = 0usize;
    for line in data.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        read += 1;
        let Ok(v) = serde_json::from_str::<serde_json::Value>(line) else {
            tracing::warn!("compact: dropping undecodable line {read}");
            continue;
        };
        if let Some(id) = v.get("id").and_then(|id| id.as_str())
            && !seen.insert(id.to_string())
        {
            continue;
        }
        out.push_str(&serde_json::to_string(&v)?);
        out.push('\n');
        written += 1;
    }
    if let Some(dir) = output.parent() {
        std::fs::create_dir_all(dir)?;
    }
    std::fs::write(output, out)?;
    Ok((read, written))
}
