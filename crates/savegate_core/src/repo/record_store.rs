//! SQLite-backed record store.
//!
//! # Responsibility
//! - Stage inserts, updates and deletes for the next commit.
//! - Persist an intercepted change set atomically in one transaction.
//! - Serve lookups that hide tombstoned rows unless asked.
//!
//! # Invariants
//! - Rows are keyed by `(entity_type, id)`; the payload is the record's JSON.
//! - `is_deleted` and `version` columns mirror the record's own fields.
//! - An update only lands when the stored version equals the version the
//!   record carried when it was staged.
//! - At most one staged change per `(entity_type, id)`; restaging a key
//!   merges into the existing slot.
//! - `created_at` / `updated_at` follow the record's audit clock when it has
//!   one, and SQLite's clock otherwise.

use crate::db::DbError;
use crate::error::{SaveError, SaveResult};
use crate::model::change::{ChangeKind, ChangeSet, PendingChange};
use crate::model::entity::{Entity, EpochMillis, Facets, Record};
use crate::pipeline::engine::StorageEngine;
use log::debug;
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::marker::PhantomData;

const RECORD_SELECT_SQL: &str = "SELECT entity_type, id, payload, is_deleted, version FROM records";

pub type StoreResult<T> = Result<T, StoreError>;

/// Record store failure.
#[derive(Debug)]
pub enum StoreError {
    Db(DbError),
    Payload(serde_json::Error),
    MissingRow {
        entity_type: String,
        id: String,
    },
    VersionConflict {
        entity_type: String,
        id: String,
        expected: u64,
        actual: u64,
    },
    InvalidData(String),
}

impl Display for StoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::Payload(err) => write!(f, "record payload error: {err}"),
            Self::MissingRow { entity_type, id } => {
                write!(f, "no stored {entity_type} row with id {id}")
            }
            Self::VersionConflict {
                entity_type,
                id,
                expected,
                actual,
            } => write!(
                f,
                "{entity_type} {id} was modified concurrently: expected version {expected}, found {actual}"
            ),
            Self::InvalidData(message) => write!(f, "invalid stored record data: {message}"),
        }
    }
}

impl Error for StoreError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            Self::Payload(err) => Some(err),
            Self::MissingRow { .. } | Self::VersionConflict { .. } | Self::InvalidData(_) => None,
        }
    }
}

impl From<DbError> for StoreError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for StoreError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(value: serde_json::Error) -> Self {
        Self::Payload(value)
    }
}

/// Query options for listing stored records.
#[derive(Debug, Clone, Default)]
pub struct RecordListQuery {
    pub entity_type: Option<String>,
    pub include_deleted: bool,
    pub limit: Option<u32>,
    pub offset: u32,
}

/// SQLite storage engine for records of type `R` audited by actor type `A`.
pub struct SqliteRecordStore<'conn, R, A> {
    conn: &'conn Connection,
    staged: Vec<PendingChange<R>>,
    _actor: PhantomData<fn() -> A>,
}

impl<'conn, R, A> SqliteRecordStore<'conn, R, A>
where
    R: Record<A> + Serialize + DeserializeOwned + Clone,
{
    /// Wraps a connection opened through `db::open_db*`.
    pub fn new(conn: &'conn Connection) -> Self {
        Self {
            conn,
            staged: Vec::new(),
            _actor: PhantomData,
        }
    }

    /// Stages a new record.
    pub fn add(&mut self, record: R) {
        self.stage(record, ChangeKind::Insert);
    }

    /// Stages a modified record.
    pub fn update(&mut self, record: R) {
        self.stage(record, ChangeKind::Update);
    }

    /// Stages a delete. Deletable records end up tombstoned, not removed.
    pub fn remove(&mut self, record: R) {
        self.stage(record, ChangeKind::Delete);
    }

    pub fn staged_len(&self) -> usize {
        self.staged.len()
    }

    /// Drops every staged change without persisting anything.
    pub fn discard_staged(&mut self) {
        self.staged.clear();
    }

    /// Loads one record, optionally including tombstoned rows.
    pub fn get(
        &self,
        entity_type: &str,
        id: &R::Id,
        include_deleted: bool,
    ) -> StoreResult<Option<R>> {
        let mut stmt = self.conn.prepare(&format!(
            "{RECORD_SELECT_SQL}
             WHERE entity_type = ?1
               AND id = ?2
               AND (?3 = 1 OR is_deleted = 0);"
        ))?;

        let mut rows = stmt.query(params![
            entity_type,
            id.to_string(),
            i64::from(include_deleted)
        ])?;
        match rows.next()? {
            Some(row) => Ok(Some(parse_record_row(row)?)),
            None => Ok(None),
        }
    }

    /// Loads one live record.
    ///
    /// # Errors
    /// - `NotFound` when no row exists or the row is tombstoned.
    pub fn find_live(&self, entity_type: &str, id: &R::Id) -> SaveResult<R, StoreError> {
        self.get(entity_type, id, false)
            .map_err(SaveError::Storage)?
            .ok_or_else(|| SaveError::not_found(entity_type, id))
    }

    /// Lists records using filter and pagination options.
    pub fn list(&self, query: &RecordListQuery) -> StoreResult<Vec<R>> {
        let mut sql = format!("{RECORD_SELECT_SQL} WHERE 1 = 1");
        let mut bind_values: Vec<Value> = Vec::new();

        if !query.include_deleted {
            sql.push_str(" AND is_deleted = 0");
        }

        if let Some(entity_type) = &query.entity_type {
            sql.push_str(" AND entity_type = ?");
            bind_values.push(Value::Text(entity_type.clone()));
        }

        sql.push_str(" ORDER BY updated_at DESC, entity_type ASC, id ASC");

        if let Some(limit) = query.limit {
            sql.push_str(" LIMIT ?");
            bind_values.push(Value::Integer(i64::from(limit)));
            if query.offset > 0 {
                sql.push_str(" OFFSET ?");
                bind_values.push(Value::Integer(i64::from(query.offset)));
            }
        } else if query.offset > 0 {
            sql.push_str(" LIMIT -1 OFFSET ?");
            bind_values.push(Value::Integer(i64::from(query.offset)));
        }

        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query(params_from_iter(bind_values))?;
        let mut records = Vec::new();

        while let Some(row) = rows.next()? {
            records.push(parse_record_row(row)?);
        }

        Ok(records)
    }

    fn stage(&mut self, record: R, kind: ChangeKind) {
        let change = PendingChange::new::<A>(record, kind);
        // Read-only changes are never merged so the guard still sees each one.
        let existing = if change.capabilities().read_only {
            None
        } else {
            self.staged.iter().position(|staged| {
                !staged.capabilities().read_only && same_key(staged.record(), change.record())
            })
        };

        let Some(index) = existing else {
            debug!(
                "event=stage module=repo entity_type={} kind={kind} status=queued",
                change.record().entity_type()
            );
            self.staged.push(change);
            return;
        };

        let previous = self.staged[index].kind();
        match merge_kinds(previous, kind) {
            Some(merged) => {
                debug!(
                    "event=stage module=repo entity_type={} kind={kind} status=merged previous={previous} merged={merged}",
                    change.record().entity_type()
                );
                self.staged[index].restage::<A>(change.into_record(), merged);
            }
            None => {
                debug!(
                    "event=stage module=repo entity_type={} kind={kind} status=cancelled previous={previous}",
                    change.record().entity_type()
                );
                self.staged.remove(index);
            }
        }
    }

    fn apply_one(&self, change: PendingChange<R>) -> StoreResult<()> {
        let kind = change.kind();
        let expected = change.loaded_version();
        let mut record = change.into_record();
        let entity_type = record.entity_type();
        let id = record.id().to_string();
        let state = row_state::<A, _>(&mut record);
        let is_deleted = i64::from(state.is_deleted);
        let version = version_to_db(state.version)?;
        let payload = serde_json::to_string(&record)?;

        match kind {
            ChangeKind::Insert => {
                self.conn.execute(
                    "INSERT INTO records (
                        entity_type, id, payload, is_deleted, version, created_at, updated_at
                     )
                     VALUES (
                        ?1, ?2, ?3, ?4, ?5,
                        COALESCE(?6, strftime('%s', 'now') * 1000),
                        COALESCE(?7, strftime('%s', 'now') * 1000)
                     );",
                    params![
                        entity_type,
                        id,
                        payload,
                        is_deleted,
                        version,
                        state.created_on,
                        state.modified_on
                    ],
                )?;
            }
            ChangeKind::Update => {
                let expected = expected.map(version_to_db).transpose()?;
                let changed = self.conn.execute(
                    "UPDATE records
                     SET
                        payload = ?1,
                        is_deleted = ?2,
                        version = ?3,
                        updated_at = COALESCE(?4, strftime('%s', 'now') * 1000)
                     WHERE entity_type = ?5
                       AND id = ?6
                       AND (?7 IS NULL OR version = ?7);",
                    params![
                        payload,
                        is_deleted,
                        version,
                        state.modified_on,
                        entity_type,
                        id,
                        expected
                    ],
                )?;
                if changed == 0 {
                    return Err(self.explain_missed_update(entity_type, id, expected)?);
                }
            }
            ChangeKind::Delete => {
                let changed = self.conn.execute(
                    "DELETE FROM records WHERE entity_type = ?1 AND id = ?2;",
                    params![entity_type, id],
                )?;
                if changed == 0 {
                    return Err(StoreError::MissingRow {
                        entity_type: entity_type.to_string(),
                        id,
                    });
                }
            }
        }

        Ok(())
    }

    fn explain_missed_update(
        &self,
        entity_type: &str,
        id: String,
        expected: Option<i64>,
    ) -> StoreResult<StoreError> {
        let stored: Option<i64> = self
            .conn
            .query_row(
                "SELECT version FROM records WHERE entity_type = ?1 AND id = ?2;",
                params![entity_type, id],
                |row| row.get(0),
            )
            .optional()?;

        Ok(match (stored, expected) {
            (Some(actual), Some(expected)) => StoreError::VersionConflict {
                entity_type: entity_type.to_string(),
                id,
                expected: version_from_db(expected)?,
                actual: version_from_db(actual)?,
            },
            _ => StoreError::MissingRow {
                entity_type: entity_type.to_string(),
                id,
            },
        })
    }
}

impl<R, A> StorageEngine for SqliteRecordStore<'_, R, A>
where
    R: Record<A> + Serialize + DeserializeOwned + Clone,
{
    type Record = R;
    type Error = StoreError;

    fn pending_changes(&self) -> Vec<PendingChange<R>> {
        self.staged.clone()
    }

    fn apply_changes(&mut self, changes: ChangeSet<R>) -> StoreResult<()> {
        let count = changes.len();
        let conn = self.conn;
        let tx = conn.unchecked_transaction()?;
        for change in changes {
            self.apply_one(change)?;
        }
        tx.commit()?;

        self.staged.clear();
        debug!("event=apply_changes module=repo status=ok count={count}");
        Ok(())
    }
}

/// Column values mirrored from the record's own capabilities.
struct RowState {
    is_deleted: bool,
    version: u64,
    created_on: Option<EpochMillis>,
    modified_on: Option<EpochMillis>,
}

fn row_state<A, R: Record<A>>(record: &mut R) -> RowState {
    match record.facets() {
        Facets::ReadOnly => RowState {
            is_deleted: false,
            version: 0,
            created_on: None,
            modified_on: None,
        },
        Facets::Tracked { audit, deleted } => RowState {
            is_deleted: deleted.is_some_and(|deleted| *deleted),
            version: audit.as_ref().map_or(0, |audit| audit.version),
            created_on: audit.as_ref().map(|audit| audit.created_on),
            modified_on: audit.as_ref().map(|audit| audit.modified_on),
        },
    }
}

fn same_key<R: Entity>(left: &R, right: &R) -> bool {
    left.entity_type() == right.entity_type() && left.id() == right.id()
}

/// Kind of a change restaged on top of `previous`; `None` cancels both.
fn merge_kinds(previous: ChangeKind, next: ChangeKind) -> Option<ChangeKind> {
    match (previous, next) {
        (ChangeKind::Insert, ChangeKind::Delete) => None,
        (ChangeKind::Insert, _) => Some(ChangeKind::Insert),
        (_, ChangeKind::Insert) => Some(ChangeKind::Update),
        (_, next) => Some(next),
    }
}

fn parse_record_row<R: DeserializeOwned>(row: &Row<'_>) -> StoreResult<R> {
    let entity_type: String = row.get("entity_type")?;
    let id: String = row.get("id")?;
    match row.get::<_, i64>("is_deleted")? {
        0 | 1 => {}
        other => {
            return Err(StoreError::InvalidData(format!(
                "invalid is_deleted value `{other}` for {entity_type} {id}"
            )));
        }
    }
    version_from_db(row.get("version")?)?;

    let payload: String = row.get("payload")?;
    Ok(serde_json::from_str(&payload)?)
}

fn version_to_db(version: u64) -> StoreResult<i64> {
    i64::try_from(version)
        .map_err(|_| StoreError::InvalidData(format!("version {version} exceeds storage range")))
}

fn version_from_db(version: i64) -> StoreResult<u64> {
    u64::try_from(version)
        .map_err(|_| StoreError::InvalidData(format!("negative stored version {version}")))
}
