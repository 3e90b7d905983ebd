use crate::models::AllocationRecord;
use anyhow::{Context, Result};
use rusqlite::{params, Connection};
use std::path::PathBuf;

/// A persistence backend for allocation records.
///
/// Workers never share a session: each one opens its own, writes a batch
/// inside a transaction, commits, and rotates to a fresh session. Closing
/// is dropping; a session dropped without `commit` rolls its batch back.
pub trait Store {
    type Session: StoreSession;

    /// Drop and recreate the schema. Destructive; called once per run
    /// before any file is ingested.
    fn recreate_schema(&self) -> Result<()>;

    fn open_session(&self) -> Result<Self::Session>;
}

pub trait StoreSession {
    fn insert(&mut self, record: &AllocationRecord) -> Result<()>;
    fn commit(&mut self) -> Result<()>;
}

const SCHEMA_SQL: &str = "\
DROP TABLE IF EXISTS block;
CREATE TABLE block (
    id INTEGER PRIMARY KEY,
    inetnum TEXT NOT NULL,
    netname TEXT,
    description TEXT,
    country TEXT,
    maintained_by TEXT,
    created TEXT,
    last_modified TEXT,
    status TEXT,
    source TEXT
);
CREATE INDEX idx_block_inetnum ON block (inetnum);
CREATE INDEX idx_block_netname ON block (netname);
CREATE INDEX idx_block_description ON block (description);
CREATE INDEX idx_block_country ON block (country);
CREATE INDEX idx_block_maintained_by ON block (maintained_by);
CREATE INDEX idx_block_created ON block (created);
CREATE INDEX idx_block_last_modified ON block (last_modified);
CREATE INDEX idx_block_status ON block (status);
CREATE INDEX idx_block_source ON block (source);
";

const INSERT_SQL: &str = "\
INSERT INTO block (inetnum, netname, description, country, maintained_by, \
created, last_modified, status, source) \
VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)";

/// SQLite store. Cheap to clone and hand to each worker; every session
/// owns its own connection so parallel writers never contend on a shared
/// handle.
#[derive(Debug, Clone)]
pub struct SqliteStore {
    path: PathBuf,
}

impl SqliteStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    fn connect(&self) -> Result<Connection> {
        let conn = Connection::open(&self.path)
            .with_context(|| format!("Failed to open database at {}", self.path.display()))?;

        // WAL lets the parallel workers write without serializing on the
        // rollback journal
        let _: String = conn.query_row("PRAGMA journal_mode=WAL", [], |row| row.get(0))?;
        conn.execute_batch(
            "PRAGMA synchronous=NORMAL;
             PRAGMA cache_size=100000;
             PRAGMA temp_store=MEMORY;",
        )?;
        // writers back off instead of failing when the database is busy
        conn.busy_timeout(std::time::Duration::from_secs(60))?;
        Ok(conn)
    }
}

impl Store for SqliteStore {
    type Session = SqliteSession;

    fn recreate_schema(&self) -> Result<()> {
        let conn = self.connect()?;
        conn.execute_batch(SCHEMA_SQL)
            .context("Failed to recreate block schema")?;
        Ok(())
    }

    fn open_session(&self) -> Result<SqliteSession> {
        let conn = self.connect()?;
        conn.execute_batch("BEGIN")?;
        Ok(SqliteSession { conn })
    }
}

/// One open transaction on a private connection.
pub struct SqliteSession {
    conn: Connection,
}

impl StoreSession for SqliteSession {
    fn insert(&mut self, record: &AllocationRecord) -> Result<()> {
        let mut stmt = self.conn.prepare_cached(INSERT_SQL)?;
        stmt.execute(params![
            record.inetnum.to_string(),
            record.netname,
            record.description,
            record.country,
            record.maintained_by,
            record.created,
            record.last_modified,
            record.status,
            record.source,
        ])?;
        Ok(())
    }

    fn commit(&mut self) -> Result<()> {
        self.conn
            .execute_batch("COMMIT")
            .context("Failed to commit batch")?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ExtractedFields;
    use tempfile::TempDir;

    fn sample_record(prefix: &str) -> AllocationRecord {
        let fields = ExtractedFields {
            netname: Some("TEST-NET".to_string()),
            country: Some("DE".to_string()),
            source: Some("ripe".to_string()),
            ..Default::default()
        };
        AllocationRecord::expand(fields, vec![prefix.parse().unwrap()])
            .pop()
            .unwrap()
    }

    fn row_count(store: &SqliteStore) -> u64 {
        let conn = store.connect().unwrap();
        conn.query_row("SELECT COUNT(*) FROM block", [], |row| row.get(0))
            .unwrap()
    }

    #[test]
    fn recreate_schema_creates_block_table() {
        let dir = TempDir::new().unwrap();
        let store = SqliteStore::new(dir.path().join("atlas.db"));
        store.recreate_schema().unwrap();
        assert_eq!(row_count(&store), 0);
    }

    #[test]
    fn insert_and_commit_persists_rows() {
        let dir = TempDir::new().unwrap();
        let store = SqliteStore::new(dir.path().join("atlas.db"));
        store.recreate_schema().unwrap();

        let mut session = store.open_session().unwrap();
        session.insert(&sample_record("192.0.2.0/24")).unwrap();
        session.insert(&sample_record("2001:db8::/32")).unwrap();
        session.commit().unwrap();

        assert_eq!(row_count(&store), 2);

        let conn = store.connect().unwrap();
        let (inetnum, netname, country): (String, String, String) = conn
            .query_row(
                "SELECT inetnum, netname, country FROM block WHERE inetnum = '192.0.2.0/24'",
                [],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
            )
            .unwrap();
        assert_eq!(inetnum, "192.0.2.0/24");
        assert_eq!(netname, "TEST-NET");
        assert_eq!(country, "DE");
    }

    #[test]
    fn dropped_session_rolls_back() {
        let dir = TempDir::new().unwrap();
        let store = SqliteStore::new(dir.path().join("atlas.db"));
        store.recreate_schema().unwrap();

        {
            let mut session = store.open_session().unwrap();
            session.insert(&sample_record("192.0.2.0/24")).unwrap();
            // no commit
        }
        assert_eq!(row_count(&store), 0);
    }

    #[test]
    fn recreate_schema_is_destructive() {
        let dir = TempDir::new().unwrap();
        let store = SqliteStore::new(dir.path().join("atlas.db"));
        store.recreate_schema().unwrap();

        let mut session = store.open_session().unwrap();
        session.insert(&sample_record("192.0.2.0/24")).unwrap();
        session.commit().unwrap();
        assert_eq!(row_count(&store), 1);

        store.recreate_schema().unwrap();
        assert_eq!(row_count(&store), 0);
    }

    #[test]
    fn null_fields_stored_as_null() {
        let dir = TempDir::new().unwrap();
        let store = SqliteStore::new(dir.path().join("atlas.db"));
        store.recreate_schema().unwrap();

        let record =
            AllocationRecord::expand(ExtractedFields::default(), vec!["10.0.0.0/8".parse().unwrap()])
                .pop()
                .unwrap();
        let mut session = store.open_session().unwrap();
        session.insert(&record).unwrap();
        session.commit().unwrap();

        let conn = store.connect().unwrap();
        let netname: Option<String> = conn
            .query_row("SELECT netname FROM block", [], |row| row.get(0))
            .unwrap();
        assert_eq!(netname, None);
    }
}
