use std::fs;

use camino::Utf8Path;
use rusqlite::types::{Value, ValueRef};
use rusqlite::{Connection, OpenFlags, OptionalExtension, params, params_from_iter};
use serde_json::{Map, Value as JsonValue};

use crate::domain::{ModificationDate, ProposalId, ProposalMembership, SoakdbFileEntry};
use crate::error::SyncError;
use crate::transfer::ColumnBuffer;

const CREATE_SCHEMA_SQL: &str = r"
CREATE TABLE IF NOT EXISTS soakdb_files (
  id INTEGER PRIMARY KEY,
  filename TEXT NOT NULL,
  modification_date INTEGER NOT NULL,
  proposal TEXT NOT NULL,
  UNIQUE(filename, modification_date)
);

CREATE TABLE IF NOT EXISTS proposals (
  id INTEGER PRIMARY KEY,
  proposal TEXT NOT NULL,
  fedids TEXT NOT NULL,
  UNIQUE(proposal, fedids)
);

CREATE INDEX IF NOT EXISTS idx_soakdb_files_proposal ON soakdb_files(proposal);
";

/// The aggregated relational store all soakDB data is transferred into.
pub struct CentralStore {
    conn: Connection,
}

impl CentralStore {
    pub fn open(path: &Utf8Path) -> Result<Self, SyncError> {
        if let Some(parent) = path.parent().filter(|parent| !parent.as_str().is_empty()) {
            fs::create_dir_all(parent.as_std_path())
                .map_err(|err| SyncError::Filesystem(err.to_string()))?;
        }
        let conn = Connection::open(path.as_std_path()).map_err(store_error)?;
        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA busy_timeout = 5000;",
        )
        .map_err(store_error)?;
        Ok(Self { conn })
    }

    /// Opens an existing store without creating or migrating it.
    pub fn open_read_only(path: &Utf8Path) -> Result<Self, SyncError> {
        let conn = Connection::open_with_flags(
            path.as_std_path(),
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )
        .map_err(store_error)?;
        conn.busy_timeout(std::time::Duration::from_secs(5))
            .map_err(store_error)?;
        Ok(Self { conn })
    }

    pub fn open_in_memory() -> Result<Self, SyncError> {
        let conn = Connection::open_in_memory().map_err(store_error)?;
        Ok(Self { conn })
    }

    pub fn ensure_schema(&self) -> Result<(), SyncError> {
        self.conn
            .execute_batch(CREATE_SCHEMA_SQL)
            .map_err(store_error)
    }

    /// Returns `true` when the `(filename, modification_date)` pair was new.
    pub fn insert_soakdb_file(&self, entry: &SoakdbFileEntry) -> Result<bool, SyncError> {
        let changed = self
            .conn
            .execute(
                "INSERT INTO soakdb_files (filename, modification_date, proposal)
                 VALUES (?1, ?2, ?3)
                 ON CONFLICT(filename, modification_date) DO NOTHING",
                params![
                    entry.filename,
                    entry.modification_date.value(),
                    entry.proposal.as_str()
                ],
            )
            .map_err(store_error)?;
        Ok(changed > 0)
    }

    /// Returns `true` when the `(proposal, fedids)` pair was new.
    pub fn insert_membership(&self, membership: &ProposalMembership) -> Result<bool, SyncError> {
        let changed = self
            .conn
            .execute(
                "INSERT INTO proposals (proposal, fedids)
                 VALUES (?1, ?2)
                 ON CONFLICT(proposal, fedids) DO NOTHING",
                params![membership.proposal.as_str(), membership.fedids],
            )
            .map_err(store_error)?;
        Ok(changed > 0)
    }

    pub fn distinct_proposals(&self) -> Result<Vec<ProposalId>, SyncError> {
        let mut stmt = self
            .conn
            .prepare("SELECT DISTINCT proposal FROM soakdb_files ORDER BY proposal")
            .map_err(store_error)?;
        let rows = stmt
            .query_map([], |row| row.get::<_, String>(0))
            .map_err(store_error)?;
        let mut proposals = Vec::new();
        for row in rows {
            let value = row.map_err(store_error)?;
            match value.parse::<ProposalId>() {
                Ok(proposal) => proposals.push(proposal),
                Err(err) => tracing::warn!(error = %err, "ignoring stored proposal"),
            }
        }
        Ok(proposals)
    }

    pub fn soakdb_files(&self) -> Result<Vec<SoakdbFileEntry>, SyncError> {
        let mut stmt = self
            .conn
            .prepare(
                "SELECT filename, modification_date, proposal FROM soakdb_files ORDER BY id",
            )
            .map_err(store_error)?;
        let rows = stmt
            .query_map([], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, i64>(1)?,
                    row.get::<_, String>(2)?,
                ))
            })
            .map_err(store_error)?;
        let mut entries = Vec::new();
        for row in rows {
            let (filename, modification_date, proposal) = row.map_err(store_error)?;
            entries.push(SoakdbFileEntry {
                filename,
                modification_date: ModificationDate::new(modification_date),
                proposal: proposal.parse()?,
            });
        }
        Ok(entries)
    }

    pub fn proposals(&self) -> Result<Vec<ProposalMembership>, SyncError> {
        let mut stmt = self
            .conn
            .prepare("SELECT proposal, fedids FROM proposals ORDER BY id")
            .map_err(store_error)?;
        let rows = stmt
            .query_map([], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
            })
            .map_err(store_error)?;
        let mut memberships = Vec::new();
        for row in rows {
            let (proposal, fedids) = row.map_err(store_error)?;
            memberships.push(ProposalMembership {
                proposal: proposal.parse()?,
                fedids,
            });
        }
        Ok(memberships)
    }

    /// Drops and rebuilds every buffer's table in a single transaction.
    /// Nothing is visible to readers unless all tables were written.
    pub fn replace_aggregates(&mut self, buffers: &[ColumnBuffer]) -> Result<(), SyncError> {
        let tx = self.conn.transaction().map_err(store_error)?;
        for buffer in buffers {
            let table = quote_ident(buffer.table());
            let columns = buffer
                .fields()
                .iter()
                .map(|field| quote_ident(field))
                .collect::<Vec<_>>();

            tx.execute_batch(&format!(
                "DROP TABLE IF EXISTS {table};
                 CREATE TABLE {table} (id INTEGER PRIMARY KEY, {});
                 CREATE INDEX {} ON {table}(crystal_name);",
                columns.join(", "),
                quote_ident(&format!("idx_{}_crystal_name", buffer.table())),
            ))
            .map_err(store_error)?;

            let placeholders = (1..=columns.len())
                .map(|idx| format!("?{idx}"))
                .collect::<Vec<_>>()
                .join(", ");
            let mut stmt = tx
                .prepare(&format!(
                    "INSERT INTO {table} ({}) VALUES ({placeholders})",
                    columns.join(", ")
                ))
                .map_err(store_error)?;
            for row in 0..buffer.len() {
                stmt.execute(params_from_iter(buffer.row(row)))
                    .map_err(store_error)?;
            }
            tracing::debug!(table = buffer.table(), rows = buffer.len(), "table rebuilt");
        }
        tx.commit().map_err(store_error)
    }

    pub fn table_exists(&self, table: &str) -> Result<bool, SyncError> {
        self.conn
            .query_row(
                "SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = ?1",
                [table],
                |_| Ok(()),
            )
            .optional()
            .map(|found| found.is_some())
            .map_err(store_error)
    }

    pub fn count_rows(&self, table: &str) -> Result<usize, SyncError> {
        if !self.table_exists(table)? {
            return Ok(0);
        }
        let count: i64 = self
            .conn
            .query_row(&format!("SELECT COUNT(*) FROM {}", quote_ident(table)), [], |row| {
                row.get(0)
            })
            .map_err(store_error)?;
        Ok(usize::try_from(count).unwrap_or_default())
    }

    /// Reads `fields` from `table` as ordered JSON objects, optionally limited
    /// to one crystal name. A table that has not been built yet reads as empty.
    pub fn select_projection(
        &self,
        table: &str,
        fields: &[&str],
        crystal_name: Option<&str>,
    ) -> Result<Vec<Map<String, JsonValue>>, SyncError> {
        if !self.table_exists(table)? {
            return Ok(Vec::new());
        }
        let columns = fields
            .iter()
            .map(|field| quote_ident(field))
            .collect::<Vec<_>>()
            .join(", ");
        let mut sql = format!("SELECT {columns} FROM {}", quote_ident(table));
        if crystal_name.is_some() {
            sql.push_str(" WHERE crystal_name = ?1");
        }
        sql.push_str(" ORDER BY id");

        let mut stmt = self.conn.prepare(&sql).map_err(store_error)?;
        let mut rows = match crystal_name {
            Some(name) => stmt.query([name]),
            None => stmt.query([]),
        }
        .map_err(store_error)?;

        let mut records = Vec::new();
        while let Some(row) = rows.next().map_err(store_error)? {
            let mut record = Map::new();
            for (idx, field) in fields.iter().enumerate() {
                let value = lossy_value(row.get_ref(idx).map_err(store_error)?);
                record.insert((*field).to_string(), value_to_json(value));
            }
            records.push(record);
        }
        Ok(records)
    }
}

/// Owned copy of a cell. Text that is not valid UTF-8 is decoded lossily.
fn lossy_value(value: ValueRef<'_>) -> Value {
    match value {
        ValueRef::Null => Value::Null,
        ValueRef::Integer(number) => Value::Integer(number),
        ValueRef::Real(number) => Value::Real(number),
        ValueRef::Text(bytes) => Value::Text(String::from_utf8_lossy(bytes).into_owned()),
        ValueRef::Blob(bytes) => Value::Blob(bytes.to_vec()),
    }
}

pub fn value_to_json(value: Value) -> JsonValue {
    match value {
        Value::Null => JsonValue::Null,
        Value::Integer(number) => JsonValue::from(number),
        Value::Real(number) => serde_json::Number::from_f64(number)
            .map(JsonValue::Number)
            .unwrap_or(JsonValue::Null),
        Value::Text(text) => JsonValue::String(text),
        Value::Blob(bytes) => JsonValue::String(String::from_utf8_lossy(&bytes).into_owned()),
    }
}

fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

fn store_error(err: rusqlite::Error) -> SyncError {
    SyncError::CentralStore(err.to_string())
}
