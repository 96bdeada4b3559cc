use std::collections::{BTreeMap, HashMap, HashSet};

use camino::{Utf8Path, Utf8PathBuf};
use rusqlite::types::{Value, ValueRef};
use rusqlite::{Connection, OpenFlags};
use serde::Serialize;

use crate::central::CentralStore;
use crate::columns::{Aggregate, CRYSTAL_NAME_COLUMN, CRYSTAL_NAME_FIELD, expected_source_columns};
use crate::error::SyncError;

/// Per-run crystal name disambiguation: `X`, then `XI`, then `XII` for every
/// later occurrence.
#[derive(Debug, Clone, Default)]
pub struct CrystalNamer {
    seen: HashMap<String, usize>,
}

impl CrystalNamer {
    pub fn assign(&mut self, name: &str) -> String {
        let count = self.seen.entry(name.to_string()).or_insert(0);
        *count += 1;
        match *count {
            1 => name.to_string(),
            2 => format!("{name}I"),
            _ => format!("{name}II"),
        }
    }
}

/// One source row keyed by source column name.
#[derive(Debug, Clone, Default)]
pub struct SourceRecord {
    values: HashMap<&'static str, Value>,
}

impl SourceRecord {
    pub fn insert(&mut self, column: &'static str, value: Value) {
        self.values.insert(column, value);
    }

    pub fn get(&self, column: &str) -> &Value {
        self.values.get(column).unwrap_or(&Value::Null)
    }
}

/// Column-major rows destined for one aggregate table.
#[derive(Debug, Clone)]
pub struct ColumnBuffer {
    aggregate: Aggregate,
    fields: Vec<&'static str>,
    columns: Vec<Vec<Value>>,
}

impl ColumnBuffer {
    pub fn new(aggregate: Aggregate) -> Self {
        let fields = aggregate.field_names();
        let columns = vec![Vec::new(); fields.len()];
        Self {
            aggregate,
            fields,
            columns,
        }
    }

    pub fn aggregate(&self) -> Aggregate {
        self.aggregate
    }

    pub fn table(&self) -> &'static str {
        self.aggregate.table()
    }

    pub fn fields(&self) -> &[&'static str] {
        &self.fields
    }

    pub fn len(&self) -> usize {
        self.columns.first().map(Vec::len).unwrap_or_default()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn push_row(&mut self, row: Vec<Value>) -> Result<(), SyncError> {
        if row.len() != self.fields.len() {
            return Err(SyncError::SourceQuery {
                path: self.table().to_string(),
                message: format!("expected {} values, got {}", self.fields.len(), row.len()),
            });
        }
        for (column, value) in self.columns.iter_mut().zip(row) {
            column.push(value);
        }
        Ok(())
    }

    pub fn row(&self, index: usize) -> impl Iterator<Item = &Value> + '_ {
        self.columns.iter().map(move |column| &column[index])
    }

    pub fn column(&self, field: &str) -> Option<&[Value]> {
        self.fields
            .iter()
            .position(|name| *name == field)
            .map(|idx| self.columns[idx].as_slice())
    }

    fn append(&mut self, other: ColumnBuffer) {
        for (column, values) in self.columns.iter_mut().zip(other.columns) {
            column.extend(values);
        }
    }
}

pub fn empty_buffers() -> Vec<ColumnBuffer> {
    Aggregate::ALL.iter().copied().map(ColumnBuffer::new).collect()
}

#[derive(Debug, Clone, Serialize)]
pub struct FileFailure {
    pub path: String,
    pub error: String,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct TransferReport {
    pub files_seen: usize,
    pub files_transferred: usize,
    pub failures: Vec<FileFailure>,
    pub rows: BTreeMap<String, usize>,
}

impl TransferReport {
    pub fn marker_text(&self) -> String {
        let mut text = String::from("TransferExperiment DONE\n");
        text.push_str(&format!(
            "files_seen={} files_transferred={} files_failed={}\n",
            self.files_seen,
            self.files_transferred,
            self.failures.len()
        ));
        for (table, count) in &self.rows {
            text.push_str(&format!("{table}={count}\n"));
        }
        for failure in &self.failures {
            text.push_str(&format!("FAILED {}: {}\n", failure.path, failure.error));
        }
        text
    }
}

/// Reads every row of `table` in the soakDB file at `path`, by column name.
pub fn read_source(path: &Utf8Path, table: &str) -> Result<Vec<SourceRecord>, SyncError> {
    let conn = Connection::open_with_flags(
        path.as_std_path(),
        OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
    )
    .map_err(|err| SyncError::SourceOpen {
        path: path.to_string(),
        message: err.to_string(),
    })?;
    let query_error = |err: rusqlite::Error| SyncError::SourceQuery {
        path: path.to_string(),
        message: err.to_string(),
    };

    let present = source_columns(&conn, table).map_err(query_error)?;
    if present.is_empty() {
        return Err(SyncError::SourceQuery {
            path: path.to_string(),
            message: format!("no such table: {table}"),
        });
    }
    let expected = expected_source_columns();
    let missing: Vec<String> = expected
        .iter()
        .filter(|column| !present.contains(&column.to_ascii_lowercase()))
        .map(|column| column.to_string())
        .collect();
    if !missing.is_empty() {
        return Err(SyncError::SchemaMismatch {
            path: path.to_string(),
            missing,
        });
    }

    let select = expected
        .iter()
        .map(|column| format!("\"{column}\""))
        .collect::<Vec<_>>()
        .join(", ");
    let mut stmt = conn
        .prepare(&format!("SELECT {select} FROM \"{table}\""))
        .map_err(query_error)?;
    let mut rows = stmt.query([]).map_err(query_error)?;

    let mut records = Vec::new();
    while let Some(row) = rows.next().map_err(query_error)? {
        let mut record = SourceRecord::default();
        for (idx, column) in expected.iter().enumerate() {
            let value = checked_value(row.get_ref(idx).map_err(query_error)?).map_err(|err| {
                SyncError::SourceQuery {
                    path: path.to_string(),
                    message: format!("row {}, column {column}: {err}", records.len() + 1),
                }
            })?;
            record.insert(*column, value);
        }
        records.push(record);
    }
    Ok(records)
}

/// Owned copy of a source cell; text must be valid UTF-8.
fn checked_value(value: ValueRef<'_>) -> Result<Value, std::str::Utf8Error> {
    Ok(match value {
        ValueRef::Null => Value::Null,
        ValueRef::Integer(number) => Value::Integer(number),
        ValueRef::Real(number) => Value::Real(number),
        ValueRef::Text(bytes) => Value::Text(std::str::from_utf8(bytes)?.to_string()),
        ValueRef::Blob(bytes) => Value::Blob(bytes.to_vec()),
    })
}

fn source_columns(conn: &Connection, table: &str) -> Result<HashSet<String>, rusqlite::Error> {
    let mut stmt = conn.prepare("SELECT name FROM pragma_table_info(?1)")?;
    let names = stmt.query_map([table], |row| row.get::<_, String>(0))?;
    names
        .map(|name| name.map(|name| name.to_ascii_lowercase()))
        .collect()
}

/// Rebuilds the six aggregate tables from a list of soakDB files.
pub struct RecordTransfer {
    source_table: String,
}

impl RecordTransfer {
    pub fn new(source_table: impl Into<String>) -> Self {
        Self {
            source_table: source_table.into(),
        }
    }

    /// Reads all files into fresh buffers. A file that fails at any point is
    /// logged, reported, and contributes no rows.
    pub fn collect(&self, paths: &[Utf8PathBuf]) -> (Vec<ColumnBuffer>, TransferReport) {
        let mut buffers = empty_buffers();
        let mut namer = CrystalNamer::default();
        let mut report = TransferReport {
            files_seen: paths.len(),
            ..TransferReport::default()
        };

        for path in paths {
            let mut staged_namer = namer.clone();
            match self.stage_file(path, &mut staged_namer) {
                Ok(staged) => {
                    let rows = staged.first().map(ColumnBuffer::len).unwrap_or_default();
                    for (buffer, batch) in buffers.iter_mut().zip(staged) {
                        buffer.append(batch);
                    }
                    namer = staged_namer;
                    report.files_transferred += 1;
                    tracing::debug!(path = %path, rows, "soakDB file staged");
                }
                Err(err) => {
                    tracing::warn!(path = %path, error = %err, "skipping soakDB file");
                    report.failures.push(FileFailure {
                        path: path.to_string(),
                        error: err.to_string(),
                    });
                }
            }
        }

        report.rows = buffers
            .iter()
            .map(|buffer| (buffer.table().to_string(), buffer.len()))
            .collect();
        (buffers, report)
    }

    pub fn run(
        &self,
        paths: &[Utf8PathBuf],
        store: &mut CentralStore,
    ) -> Result<TransferReport, SyncError> {
        let (buffers, report) = self.collect(paths);
        store.replace_aggregates(&buffers)?;
        tracing::info!(
            files = report.files_transferred,
            failed = report.failures.len(),
            "aggregate tables replaced"
        );
        Ok(report)
    }

    fn stage_file(
        &self,
        path: &Utf8Path,
        namer: &mut CrystalNamer,
    ) -> Result<Vec<ColumnBuffer>, SyncError> {
        let records = read_source(path, &self.source_table)?;
        let mut staged = empty_buffers();
        for record in &records {
            split_record(record, namer, &mut staged)?;
        }
        Ok(staged)
    }
}

/// Appends one source row to each aggregate buffer.
pub fn split_record(
    record: &SourceRecord,
    namer: &mut CrystalNamer,
    buffers: &mut [ColumnBuffer],
) -> Result<(), SyncError> {
    let crystal_name = record.get(CRYSTAL_NAME_COLUMN).clone();
    let crystal_id = match &crystal_name {
        Value::Null => Value::Null,
        Value::Text(name) => Value::Text(namer.assign(name)),
        Value::Integer(number) => Value::Text(namer.assign(&number.to_string())),
        Value::Real(number) => Value::Text(namer.assign(&number.to_string())),
        Value::Blob(bytes) => Value::Text(namer.assign(&String::from_utf8_lossy(bytes))),
    };

    for buffer in buffers.iter_mut() {
        let aggregate = buffer.aggregate();
        let mut row: Vec<Value> = aggregate
            .columns()
            .iter()
            .map(|(column, _)| record.get(column).clone())
            .collect();
        if !aggregate
            .columns()
            .iter()
            .any(|(_, field)| *field == CRYSTAL_NAME_FIELD)
        {
            row.push(crystal_name.clone());
        }
        row.push(crystal_id.clone());
        buffer.push_row(row)?;
    }
    Ok(())
}
