use chrono::DateTime;
use chrono::Utc;
use rusqlite::Connection;
use rusqlite::OptionalExtension;
use rusqlite::params;
use std::path::Path;
use std::path::PathBuf;

use super::*;
use crate::types::Location;
use crate::types::MatchStatus;

fn init_db(conn: &Connection) -> anyhow::Result<()> {
    conn.execute_batch(
        r#"
        PRAGMA journal_mode=WAL;
        CREATE TABLE IF NOT EXISTS items (
            id TEXT PRIMARY KEY,
            polarity TEXT NOT NULL,
            title TEXT NOT NULL,
            description TEXT NOT NULL,
            category TEXT NOT NULL,
            location TEXT NOT NULL,
            image TEXT,
            owner TEXT NOT NULL,
            created_at TEXT NOT NULL,
            status TEXT NOT NULL
        );
        CREATE TABLE IF NOT EXISTS matches (
            id TEXT PRIMARY KEY,
            lost_item_id TEXT NOT NULL,
            found_item_id TEXT NOT NULL,
            lost_owner TEXT NOT NULL,
            found_owner TEXT NOT NULL,
            score INTEGER NOT NULL,
            created_at TEXT NOT NULL,
            status TEXT NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_items_status ON items(status);
        CREATE INDEX IF NOT EXISTS idx_matches_lost_owner ON matches(lost_owner);
        CREATE INDEX IF NOT EXISTS idx_matches_found_owner ON matches(found_owner);
        "#,
    )?;
    Ok(())
}

fn open_conn(path: &Path) -> anyhow::Result<Connection> {
    let conn = Connection::open(path)?;
    init_db(&conn)?;
    Ok(conn)
}

fn item_status_as_str(s: ItemStatus) -> &'static str {
    match s {
        ItemStatus::Active => "active",
        ItemStatus::Resolved => "resolved",
    }
}

fn parse_item_status(s: &str) -> anyhow::Result<ItemStatus> {
    match s {
        "active" => Ok(ItemStatus::Active),
        "resolved" => Ok(ItemStatus::Resolved),
        other => anyhow::bail!("unknown item status: {other}"),
    }
}

fn match_status_as_str(s: MatchStatus) -> &'static str {
    match s {
        MatchStatus::Pending => "pending",
        MatchStatus::Resolved => "resolved",
    }
}

fn parse_match_status(s: &str) -> anyhow::Result<MatchStatus> {
    match s {
        "pending" => Ok(MatchStatus::Pending),
        "resolved" => Ok(MatchStatus::Resolved),
        other => anyhow::bail!("unknown match status: {other}"),
    }
}

fn conv_err(idx: usize, msg: String) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(
        idx,
        rusqlite::types::Type::Text,
        Box::new(std::io::Error::new(std::io::ErrorKind::InvalidData, msg)),
    )
}

fn parse_ts(idx: usize, s: &str) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| conv_err(idx, format!("invalid timestamp {s}: {e}")))
}

const ITEM_COLUMNS: &str =
    "id, polarity, title, description, category, location, image, owner, created_at, status";

const MATCH_COLUMNS: &str =
    "id, lost_item_id, found_item_id, lost_owner, found_owner, score, created_at, status";

fn row_to_item(row: &rusqlite::Row<'_>) -> rusqlite::Result<Item> {
    let polarity_s: String = row.get(1)?;
    let category_s: String = row.get(4)?;
    let location_s: String = row.get(5)?;
    let created_s: String = row.get(8)?;
    let status_s: String = row.get(9)?;
    Ok(Item {
        id: row.get(0)?,
        polarity: polarity_s
            .parse()
            .map_err(|e| conv_err(1, format!("{e}")))?,
        title: row.get(2)?,
        description: row.get(3)?,
        category: category_s
            .parse()
            .map_err(|e| conv_err(4, format!("{e}")))?,
        location: location_s
            .parse::<Location>()
            .map_err(|e| conv_err(5, format!("{e}")))?,
        image: row.get(6)?,
        owner: row.get(7)?,
        created_at: parse_ts(8, &created_s)?,
        status: parse_item_status(&status_s)
            .map_err(|_| conv_err(9, format!("invalid status: {status_s}")))?,
    })
}

fn row_to_match(row: &rusqlite::Row<'_>) -> rusqlite::Result<Match> {
    let score: i64 = row.get(5)?;
    let created_s: String = row.get(6)?;
    let status_s: String = row.get(7)?;
    Ok(Match {
        id: row.get(0)?,
        lost_item_id: row.get(1)?,
        found_item_id: row.get(2)?,
        lost_owner: row.get(3)?,
        found_owner: row.get(4)?,
        score: u8::try_from(score).map_err(|_| conv_err(5, format!("invalid score: {score}")))?,
        created_at: parse_ts(6, &created_s)?,
        status: parse_match_status(&status_s)
            .map_err(|_| conv_err(7, format!("invalid status: {status_s}")))?,
    })
}

/// SQLite-backed store. Each call opens its own connection; the `matches`
/// primary key makes `append` an atomic compare-and-insert across processes.
#[derive(Debug, Clone)]
pub struct SqliteStore {
    path: PathBuf,
}

impl SqliteStore {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Insert or overwrite an item; used by migration.
    pub(crate) fn upsert_item(conn: &Connection, item: &Item) -> anyhow::Result<()> {
        conn.execute(
            &format!(
                "INSERT INTO items ({ITEM_COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
                 ON CONFLICT(id) DO UPDATE SET
                    polarity=excluded.polarity,
                    title=excluded.title,
                    description=excluded.description,
                    category=excluded.category,
                    location=excluded.location,
                    image=excluded.image,
                    owner=excluded.owner,
                    created_at=excluded.created_at,
                    status=excluded.status"
            ),
            params![
                item.id,
                item.polarity.as_str(),
                item.title,
                item.description,
                item.category.as_str(),
                item.location.as_str(),
                item.image,
                item.owner,
                item.created_at.to_rfc3339(),
                item_status_as_str(item.status),
            ],
        )?;
        Ok(())
    }

    fn insert_match(conn: &Connection, m: &Match) -> anyhow::Result<bool> {
        let n = conn.execute(
            &format!(
                "INSERT INTO matches ({MATCH_COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
                 ON CONFLICT(id) DO NOTHING"
            ),
            params![
                m.id,
                m.lost_item_id,
                m.found_item_id,
                m.lost_owner,
                m.found_owner,
                i64::from(m.score),
                m.created_at.to_rfc3339(),
                match_status_as_str(m.status),
            ],
        )?;
        Ok(n == 1)
    }

    /// Copy items and matches into the database in one transaction.
    /// Returns `(items, newly inserted matches)`.
    pub fn import(&self, items: &[Item], matches: &[Match]) -> anyhow::Result<(usize, usize)> {
        let mut conn = open_conn(&self.path)?;
        let tx = conn.transaction()?;
        for item in items {
            Self::upsert_item(&tx, item)?;
        }
        let mut inserted = 0usize;
        for m in matches {
            if Self::insert_match(&tx, m)? {
                inserted += 1;
            }
        }
        tx.commit()?;
        Ok((items.len(), inserted))
    }
}

impl MatchStore for SqliteStore {
    fn append(&self, m: Match) -> anyhow::Result<bool> {
        let conn = open_conn(&self.path)?;
        Self::insert_match(&conn, &m)
    }

    fn get_match(&self, id: &str) -> anyhow::Result<Option<Match>> {
        let conn = open_conn(&self.path)?;
        let row = conn
            .query_row(
                &format!("SELECT {MATCH_COLUMNS} FROM matches WHERE id=?1"),
                params![id],
                row_to_match,
            )
            .optional()?;
        Ok(row)
    }

    fn list_matches(&self) -> anyhow::Result<Vec<Match>> {
        let conn = open_conn(&self.path)?;
        let mut stmt = conn.prepare(&format!("SELECT {MATCH_COLUMNS} FROM matches ORDER BY rowid"))?;
        let rows = stmt.query_map([], row_to_match)?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    fn query_by_participant(&self, user: &str) -> anyhow::Result<Vec<Match>> {
        let conn = open_conn(&self.path)?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {MATCH_COLUMNS} FROM matches
             WHERE lost_owner=?1 OR found_owner=?1 ORDER BY rowid"
        ))?;
        let rows = stmt.query_map(params![user], row_to_match)?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    fn matches_for_item(&self, item_id: &str) -> anyhow::Result<Vec<Match>> {
        let conn = open_conn(&self.path)?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {MATCH_COLUMNS} FROM matches
             WHERE status='pending' AND (lost_item_id=?1 OR found_item_id=?1) ORDER BY rowid"
        ))?;
        let rows = stmt.query_map(params![item_id], row_to_match)?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    fn resolve_match(&self, id: &str) -> anyhow::Result<()> {
        let conn = open_conn(&self.path)?;
        let n = conn.execute(
            "UPDATE matches SET status='resolved' WHERE id=?1",
            params![id],
        )?;
        if n == 0 {
            anyhow::bail!("resolve_match: id not found: {id}");
        }
        Ok(())
    }
}

impl ItemStore for SqliteStore {
    fn add_item(&self, item: Item) -> anyhow::Result<()> {
        let conn = open_conn(&self.path)?;
        let exists: Option<String> = conn
            .query_row("SELECT id FROM items WHERE id=?1", params![item.id], |r| {
                r.get(0)
            })
            .optional()?;
        if exists.is_some() {
            let dup = &item.id;
            anyhow::bail!("add_item: duplicate id: {dup}");
        }
        Self::upsert_item(&conn, &item)
    }

    fn get_item(&self, id: &str) -> anyhow::Result<Option<Item>> {
        let conn = open_conn(&self.path)?;
        let row = conn
            .query_row(
                &format!("SELECT {ITEM_COLUMNS} FROM items WHERE id=?1"),
                params![id],
                row_to_item,
            )
            .optional()?;
        Ok(row)
    }

    fn list_items(&self, query: &ItemQuery) -> anyhow::Result<Vec<Item>> {
        let conn = open_conn(&self.path)?;
        let mut stmt = conn.prepare(&format!("SELECT {ITEM_COLUMNS} FROM items ORDER BY rowid"))?;
        let mut out = Vec::new();
        for item in stmt.query_map([], row_to_item)? {
            let item = item?;
            if query.matches(&item) {
                out.push(item);
            }
        }
        Ok(out)
    }

    fn resolve_item(&self, id: &str) -> anyhow::Result<()> {
        let conn = open_conn(&self.path)?;
        let n = conn.execute(
            "UPDATE items SET status='resolved' WHERE id=?1",
            params![id],
        )?;
        if n == 0 {
            anyhow::bail!("resolve_item: id not found: {id}");
        }
        Ok(())
    }
}

impl Store for SqliteStore {
    fn stats(&self) -> anyhow::Result<serde_json::Value> {
        let conn = open_conn(&self.path)?;
        let count = |sql: &str| -> anyhow::Result<i64> { Ok(conn.query_row(sql, [], |r| r.get(0))?) };
        Ok(serde_json::json!({
            "items": {
                "total": count("SELECT COUNT(*) FROM items")?,
                "active": count("SELECT COUNT(*) FROM items WHERE status='active'")?,
                "resolved": count("SELECT COUNT(*) FROM items WHERE status='resolved'")?,
                "by_polarity": {
                    "lost": count("SELECT COUNT(*) FROM items WHERE polarity='lost'")?,
                    "found": count("SELECT COUNT(*) FROM items WHERE polarity='found'")?,
                },
            },
            "matches": {
                "total": count("SELECT COUNT(*) FROM matches")?,
                "pending": count("SELECT COUNT(*) FROM matches WHERE status='pending'")?,
                "resolved": count("SELECT COUNT(*) FROM matches WHERE status='resolved'")?,
            },
        }))
    }
}
