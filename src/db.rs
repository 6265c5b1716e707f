use std::path::Path;

use anyhow::Result;
use rusqlite::{Connection, OptionalExtension};

pub fn connect(path: &Path) -> Result<Connection> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    let conn = Connection::open(path)?;
    conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA foreign_keys=ON;")?;
    Ok(conn)
}

pub fn init_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS pages (
            page       INTEGER PRIMARY KEY,
            url        TEXT UNIQUE NOT NULL,
            visited    BOOLEAN NOT NULL DEFAULT 0,
            visited_at TEXT,
            created_at TEXT NOT NULL DEFAULT (datetime('now'))
        );
        CREATE INDEX IF NOT EXISTS idx_pages_visited ON pages(visited);

        CREATE TABLE IF NOT EXISTS page_data (
            page       INTEGER PRIMARY KEY REFERENCES pages(page),
            url        TEXT NOT NULL,
            html       TEXT,
            status     INTEGER,
            error      TEXT,
            latency_ms INTEGER,
            fetched_at TEXT NOT NULL DEFAULT (datetime('now'))
        );
        ",
    )?;
    Ok(())
}

// ── Queue ──

pub fn enqueue_pages(conn: &Connection, pages: &[(u32, String)]) -> Result<usize> {
    let tx = conn.unchecked_transaction()?;
    let mut count = 0;
    {
        let mut stmt = tx.prepare("INSERT OR IGNORE INTO pages (page, url) VALUES (?1, ?2)")?;
        for (page, url) in pages {
            count += stmt.execute(rusqlite::params![page, url])?;
        }
    }
    tx.commit()?;
    Ok(count)
}

pub fn fetch_unvisited(conn: &Connection, limit: Option<usize>) -> Result<Vec<(u32, String)>> {
    let sql = match limit {
        Some(n) => format!(
            "SELECT page, url FROM pages WHERE visited = 0 ORDER BY page LIMIT {}",
            n
        ),
        None => "SELECT page, url FROM pages WHERE visited = 0 ORDER BY page".to_string(),
    };
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

/// Outcome of fetching one page; `html` is `None` when the page was unavailable.
pub struct FetchRow {
    pub page: u32,
    pub url: String,
    pub html: Option<String>,
    pub status: Option<u16>,
    pub error: Option<String>,
    pub latency_ms: Option<i64>,
}

pub fn save_fetch(conn: &Connection, row: &FetchRow) -> Result<()> {
    conn.execute(
        "INSERT OR REPLACE INTO page_data (page, url, html, status, error, latency_ms)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        rusqlite::params![row.page, row.url, row.html, row.status, row.error, row.latency_ms],
    )?;
    conn.execute(
        "UPDATE pages SET visited = 1, visited_at = datetime('now') WHERE page = ?1",
        rusqlite::params![row.page],
    )?;
    Ok(())
}

// ── Processing ──

pub struct RawPage {
    pub page: u32,
    pub url: String,
    pub html: String,
}

/// All successfully fetched pages, in ascending page order.
pub fn fetch_cached(conn: &Connection) -> Result<Vec<RawPage>> {
    let mut stmt = conn.prepare(
        "SELECT page, url, html FROM page_data WHERE html IS NOT NULL ORDER BY page",
    )?;
    let rows = stmt
        .query_map([], |row| {
            Ok(RawPage {
                page: row.get(0)?,
                url: row.get(1)?,
                html: row.get(2)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

pub fn fetch_cached_page(conn: &Connection, page: u32) -> Result<Option<RawPage>> {
    let row = conn
        .query_row(
            "SELECT page, url, html FROM page_data WHERE page = ?1 AND html IS NOT NULL",
            [page],
            |row| {
                Ok(RawPage {
                    page: row.get(0)?,
                    url: row.get(1)?,
                    html: row.get(2)?,
                })
            },
        )
        .optional()?;
    Ok(row)
}

// ── Stats ──

pub struct Stats {
    pub total: usize,
    pub visited: usize,
    pub unvisited: usize,
    pub fetched: usize,
    pub errors: usize,
}

pub fn get_stats(conn: &Connection) -> Result<Stats> {
    let total: usize = conn.query_row("SELECT COUNT(*) FROM pages", [], |r| r.get(0))?;
    let visited: usize =
        conn.query_row("SELECT COUNT(*) FROM pages WHERE visited = 1", [], |r| r.get(0))?;
    let fetched: usize = conn.query_row(
        "SELECT COUNT(*) FROM page_data WHERE html IS NOT NULL",
        [],
        |r| r.get(0),
    )?;
    let errors: usize = conn.query_row(
        "SELECT COUNT(*) FROM page_data WHERE error IS NOT NULL",
        [],
        |r| r.get(0),
    )?;
    Ok(Stats {
        total,
        visited,
        unvisited: total - visited,
        fetched,
        errors,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn open() -> (tempfile::TempDir, Connection) {
        let dir = tempfile::tempdir().unwrap();
        let conn = connect(&dir.path().join("cache.sqlite")).unwrap();
        init_schema(&conn).unwrap();
        (dir, conn)
    }

    fn row(page: u32, html: Option<&str>, error: Option<&str>) -> FetchRow {
        FetchRow {
            page,
            url: format!("https://example.org/{:03}/", page),
            html: html.map(str::to_string),
            status: html.map(|_| 200),
            error: error.map(str::to_string),
            latency_ms: Some(12),
        }
    }

    #[test]
    fn enqueue_is_idempotent() {
        let (_dir, conn) = open();
        let pages: Vec<_> = (1..=3).map(|p| (p, format!("u{}", p))).collect();
        assert_eq!(enqueue_pages(&conn, &pages).unwrap(), 3);
        assert_eq!(enqueue_pages(&conn, &pages).unwrap(), 0);
        assert_eq!(fetch_unvisited(&conn, Some(2)).unwrap().len(), 2);
    }

    #[test]
    fn fetched_pages_come_back_in_order() {
        let (_dir, conn) = open();
        let pages: Vec<_> = (1..=3).map(|p| (p, format!("u{}", p))).collect();
        enqueue_pages(&conn, &pages).unwrap();

        save_fetch(&conn, &row(3, Some("<p>three</p>"), None)).unwrap();
        save_fetch(&conn, &row(2, None, Some("status 404"))).unwrap();
        save_fetch(&conn, &row(1, Some("<p>one</p>"), None)).unwrap();

        let cached = fetch_cached(&conn).unwrap();
        let order: Vec<u32> = cached.iter().map(|p| p.page).collect();
        assert_eq!(order, vec![1, 3]);
        assert!(fetch_unvisited(&conn, None).unwrap().is_empty());
        assert!(fetch_cached_page(&conn, 2).unwrap().is_none());
        assert_eq!(fetch_cached_page(&conn, 3).unwrap().unwrap().html, "<p>three</p>");

        let s = get_stats(&conn).unwrap();
        assert_eq!((s.total, s.visited, s.fetched, s.errors), (3, 3, 2, 1));
    }
}
