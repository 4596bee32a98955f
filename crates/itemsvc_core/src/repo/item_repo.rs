//! Item store contract and SQLite implementation.
//!
//! # Responsibility
//! - Provide id/email addressed CRUD over the canonical `items` table.
//! - Keep SQL details inside the core persistence boundary.
//!
//! # Invariants
//! - Write paths call `Item::validate()` before SQL mutations.
//! - At most one row per email; violations surface as `RepoError::Conflict`.
//! - Read paths reject invalid persisted state instead of masking it.
//! - `mark_processed` touches only `status`/`updated_at` and never inserts.
//! - All statements run under one connection mutex, so writes to the same
//!   id are serialized by the store.

use crate::db::{open_db, open_db_in_memory, DbError};
use crate::model::item::{Item, ItemId, ItemValidationError, PROCESSED_STATUS};
use parking_lot::Mutex;
use rusqlite::{params, Connection, Row};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::Path;
use uuid::Uuid;

const ITEM_SELECT_SQL: &str = "SELECT
    id,
    name,
    description,
    status,
    email
FROM items";

pub type RepoResult<T> = Result<T, RepoError>;

/// Repository error for item persistence and query operations.
#[derive(Debug)]
pub enum RepoError {
    Validation(ItemValidationError),
    Db(DbError),
    NotFound(ItemId),
    /// Another item already owns `email`.
    Conflict { email: String },
    InvalidData(String),
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::Db(err) => write!(f, "{err}"),
            Self::NotFound(id) => write!(f, "item not found: {id}"),
            Self::Conflict { email } => write!(f, "email already in use: {email}"),
            Self::InvalidData(message) => write!(f, "invalid persisted item data: {message}"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Db(err) => Some(err),
            Self::NotFound(_) | Self::Conflict { .. } | Self::InvalidData(_) => None,
        }
    }
}

impl From<ItemValidationError> for RepoError {
    fn from(value: ItemValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Record store for items.
///
/// Implementations must be shareable across worker threads.
pub trait ItemStore: Send + Sync {
    /// Returns every stored id, oldest first.
    fn list_ids(&self) -> RepoResult<Vec<ItemId>>;
    /// Returns every stored item, oldest first.
    fn list_items(&self) -> RepoResult<Vec<Item>>;
    fn get_item(&self, id: ItemId) -> RepoResult<Option<Item>>;
    fn find_by_email(&self, email: &str) -> RepoResult<Option<Item>>;
    /// Upserts by id, assigning a fresh id when `item.id` is `None`.
    fn save_item(&self, item: &Item) -> RepoResult<Item>;
    /// Sets `status` of an existing row to `PROCESSED_STATUS`, leaving every
    /// other field as stored.
    ///
    /// Returns the updated item, or `None` when it was already processed.
    /// Fails with `RepoError::NotFound` when the row no longer exists.
    fn mark_processed(&self, id: ItemId) -> RepoResult<Option<Item>>;
    fn delete_item(&self, id: ItemId) -> RepoResult<()>;
}

/// SQLite-backed item store.
pub struct SqliteItemStore {
    conn: Mutex<Connection>,
}

impl SqliteItemStore {
    /// Wraps an already migrated connection.
    pub fn new(conn: Connection) -> Self {
        Self {
            conn: Mutex::new(conn),
        }
    }

    /// Opens (and migrates) a database file.
    pub fn open(path: impl AsRef<Path>) -> RepoResult<Self> {
        Ok(Self::new(open_db(path)?))
    }

    /// Opens a fresh, migrated in-memory database.
    pub fn open_in_memory() -> RepoResult<Self> {
        Ok(Self::new(open_db_in_memory()?))
    }
}

impl ItemStore for SqliteItemStore {
    fn list_ids(&self) -> RepoResult<Vec<ItemId>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare("SELECT id FROM items ORDER BY created_at ASC, rowid ASC;")?;
        let mut rows = stmt.query([])?;
        let mut ids = Vec::new();

        while let Some(row) = rows.next()? {
            let text: String = row.get(0)?;
            ids.push(parse_item_id(&text)?);
        }

        Ok(ids)
    }

    fn list_items(&self) -> RepoResult<Vec<Item>> {
        let conn = self.conn.lock();
        let mut stmt =
            conn.prepare(&format!("{ITEM_SELECT_SQL} ORDER BY created_at ASC, rowid ASC;"))?;
        let mut rows = stmt.query([])?;
        let mut items = Vec::new();

        while let Some(row) = rows.next()? {
            items.push(parse_item_row(row)?);
        }

        Ok(items)
    }

    fn get_item(&self, id: ItemId) -> RepoResult<Option<Item>> {
        select_item(&self.conn.lock(), id)
    }

    fn find_by_email(&self, email: &str) -> RepoResult<Option<Item>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(&format!("{ITEM_SELECT_SQL} WHERE email = ?1;"))?;
        let mut rows = stmt.query([email])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_item_row(row)?));
        }

        Ok(None)
    }

    fn save_item(&self, item: &Item) -> RepoResult<Item> {
        item.validate()?;

        let id = item.id.unwrap_or_else(Uuid::new_v4);
        let conn = self.conn.lock();
        conn.execute(
            "INSERT INTO items (id, name, description, status, email)
             VALUES (?1, ?2, ?3, ?4, ?5)
             ON CONFLICT(id) DO UPDATE SET
                name = excluded.name,
                description = excluded.description,
                status = excluded.status,
                email = excluded.email,
                updated_at = (strftime('%s', 'now') * 1000);",
            params![
                id.to_string(),
                item.name.as_str(),
                item.description.as_str(),
                item.status.as_str(),
                item.email.as_str(),
            ],
        )
        .map_err(|err| map_write_error(err, item))?;

        Ok(Item {
            id: Some(id),
            ..item.clone()
        })
    }

    fn mark_processed(&self, id: ItemId) -> RepoResult<Option<Item>> {
        let conn = self.conn.lock();
        let changed = conn.execute(
            "UPDATE items
             SET status = ?2,
                 updated_at = (strftime('%s', 'now') * 1000)
             WHERE id = ?1 AND status <> ?2;",
            params![id.to_string(), PROCESSED_STATUS],
        )?;
        let item = select_item(&conn, id)?.ok_or(RepoError::NotFound(id))?;

        Ok((changed > 0).then_some(item))
    }

    fn delete_item(&self, id: ItemId) -> RepoResult<()> {
        let changed = self
            .conn
            .lock()
            .execute("DELETE FROM items WHERE id = ?1;", [id.to_string()])?;

        if changed == 0 {
            return Err(RepoError::NotFound(id));
        }

        Ok(())
    }
}

fn map_write_error(err: rusqlite::Error, item: &Item) -> RepoError {
    match &err {
        rusqlite::Error::SqliteFailure(failure, _)
            if failure.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE =>
        {
            RepoError::Conflict {
                email: item.email.clone(),
            }
        }
        _ => err.into(),
    }
}

fn select_item(conn: &Connection, id: ItemId) -> RepoResult<Option<Item>> {
    let mut stmt = conn.prepare(&format!("{ITEM_SELECT_SQL} WHERE id = ?1;"))?;
    let mut rows = stmt.query([id.to_string()])?;
    if let Some(row) = rows.next()? {
        return Ok(Some(parse_item_row(row)?));
    }

    Ok(None)
}

fn parse_item_id(text: &str) -> RepoResult<ItemId> {
    Uuid::parse_str(text)
        .map_err(|_| RepoError::InvalidData(format!("invalid id value `{text}` in items.id")))
}

fn parse_item_row(row: &Row<'_>) -> RepoResult<Item> {
    let id_text: String = row.get("id")?;
    let item = Item {
        id: Some(parse_item_id(&id_text)?),
        name: row.get("name")?,
        description: row.get("description")?,
        status: row.get("status")?,
        email: row.get("email")?,
    };
    item.validate()
        .map_err(|err| RepoError::InvalidData(format!("item {id_text}: {err}")))?;
    Ok(item)
}
