use std::path::{Path, PathBuf};

use rusqlite::{params, Connection, Row};
use tokio::sync::watch;
use tracing::{debug, info};

use super::error::{Result, StoreError};
use super::model::Reminder;
use super::schema;

const SELECT_COLUMNS: &str =
    "SELECT id, title, description, start_time, end_time, repeat_mode, category FROM reminders";

/// SQLite-backed reminder table with a live view of every row.
///
/// Each successful write re-reads the whole table and publishes it, so
/// subscribers always see the latest full snapshot ordered by id.
pub struct Store {
    conn: Connection,
    snapshot: watch::Sender<Vec<Reminder>>,
}

impl Store {
    /// Open or create a database at the given path.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent).map_err(|e| StoreError::CreateDirectory {
                    path: parent.to_path_buf(),
                    source: e,
                })?;
            }
        }

        info!("Opening reminder database at {}", path.display());
        let conn = Connection::open(path)?;
        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA synchronous = NORMAL;",
        )?;
        Self::with_connection(conn)
    }

    /// Open an in-memory database (for testing).
    #[cfg(test)]
    pub fn open_in_memory() -> Result<Self> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> Result<Self> {
        schema::initialize(&conn)?;
        let rows = query_all(&conn)?;
        let (snapshot, _) = watch::channel(rows);
        Ok(Self { conn, snapshot })
    }

    /// Live stream of all reminders ordered by id.
    pub fn subscribe(&self) -> watch::Receiver<Vec<Reminder>> {
        self.snapshot.subscribe()
    }

    pub fn all(&self) -> Result<Vec<Reminder>> {
        query_all(&self.conn)
    }

    #[cfg(test)]
    pub fn get(&self, id: i64) -> Result<Option<Reminder>> {
        use rusqlite::OptionalExtension;

        let sql = format!("{} WHERE id = ?1", SELECT_COLUMNS);
        let reminder = self
            .conn
            .query_row(&sql, [id], reminder_from_row)
            .optional()?;
        Ok(reminder)
    }

    /// Insert a reminder, replacing any row with the same id.
    ///
    /// A reminder with `id == 0` gets a fresh id from SQLite. Returns the id
    /// of the written row.
    pub fn insert(&self, reminder: &Reminder) -> Result<i64> {
        if reminder.id == 0 {
            self.conn.execute(
                "INSERT INTO reminders (title, description, start_time, end_time, repeat_mode, category)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    reminder.title,
                    reminder.description,
                    reminder.start_time,
                    reminder.end_time,
                    reminder.repeat_mode,
                    reminder.category,
                ],
            )?;
        } else {
            self.conn.execute(
                "INSERT OR REPLACE INTO reminders (id, title, description, start_time, end_time, repeat_mode, category)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    reminder.id,
                    reminder.title,
                    reminder.description,
                    reminder.start_time,
                    reminder.end_time,
                    reminder.repeat_mode,
                    reminder.category,
                ],
            )?;
        }

        let id = self.conn.last_insert_rowid();
        debug!("Inserted reminder {}", id);
        self.publish()?;
        Ok(id)
    }

    pub fn update(&self, reminder: &Reminder) -> Result<()> {
        let changed = self.conn.execute(
            "UPDATE reminders SET
                title = ?2,
                description = ?3,
                start_time = ?4,
                end_time = ?5,
                repeat_mode = ?6,
                category = ?7
             WHERE id = ?1",
            params![
                reminder.id,
                reminder.title,
                reminder.description,
                reminder.start_time,
                reminder.end_time,
                reminder.repeat_mode,
                reminder.category,
            ],
        )?;

        if changed == 0 {
            return Err(StoreError::NotFound(reminder.id));
        }

        debug!("Updated reminder {}", reminder.id);
        self.publish()
    }

    /// Delete the row for `reminder.id`. Deleting a missing row is not an error.
    pub fn delete(&self, reminder: &Reminder) -> Result<()> {
        let changed = self
            .conn
            .execute("DELETE FROM reminders WHERE id = ?1", [reminder.id])?;
        debug!("Deleted {} row(s) for reminder {}", changed, reminder.id);
        self.publish()
    }

    fn publish(&self) -> Result<()> {
        let rows = query_all(&self.conn)?;
        self.snapshot.send_replace(rows);
        Ok(())
    }
}

/// Default database location under the platform data directory.
pub fn default_db_path() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("reminder-tui")
        .join("reminders.db")
}

fn query_all(conn: &Connection) -> Result<Vec<Reminder>> {
    let sql = format!("{} ORDER BY id ASC", SELECT_COLUMNS);
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map([], reminder_from_row)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

fn reminder_from_row(row: &Row<'_>) -> rusqlite::Result<Reminder> {
    Ok(Reminder {
        id: row.get(0)?,
        title: row.get(1)?,
        description: row.get(2)?,
        start_time: row.get(3)?,
        end_time: row.get(4)?,
        repeat_mode: row.get(5)?,
        category: row.get(6)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reminder::{NewReminder, RepeatMode};

    fn sample(title: &str) -> Reminder {
        Reminder::from_new(0, NewReminder::new(title, 1_700_000_000_000))
    }

    #[test]
    fn test_insert_assigns_ids_in_order() {
        let store = Store::open_in_memory().unwrap();
        let a = store.insert(&sample("a")).unwrap();
        let b = store.insert(&sample("b")).unwrap();
        assert!(a > 0);
        assert!(b > a);

        let all = store.all().unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].id, a);
        assert_eq!(all[0].title, "a");
        assert_eq!(all[1].id, b);
    }

    #[test]
    fn test_insert_with_id_replaces() {
        let store = Store::open_in_memory().unwrap();
        let id = store.insert(&sample("first")).unwrap();

        let mut replacement = sample("second");
        replacement.id = id;
        assert_eq!(store.insert(&replacement).unwrap(), id);

        let all = store.all().unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].title, "second");
    }

    #[test]
    fn test_round_trips_all_fields() {
        let store = Store::open_in_memory().unwrap();
        let mut reminder = Reminder::from_new(
            0,
            NewReminder::new("Pay rent", 1_700_000_000_000)
                .description("transfer")
                .repeat(RepeatMode::Monthly)
                .category("Finance"),
        );
        reminder.end_time = Some(1_700_000_600_000);
        let id = store.insert(&reminder).unwrap();
        reminder.id = id;

        assert_eq!(store.get(id).unwrap(), Some(reminder));
    }

    #[test]
    fn test_update_and_delete() {
        let store = Store::open_in_memory().unwrap();
        let id = store.insert(&sample("draft")).unwrap();
        let mut reminder = store.get(id).unwrap().unwrap();

        reminder.title = "final".to_string();
        reminder.repeat_mode = RepeatMode::Daily;
        store.update(&reminder).unwrap();
        let stored = store.get(id).unwrap().unwrap();
        assert_eq!(stored.title, "final");
        assert_eq!(stored.repeat_mode, RepeatMode::Daily);

        store.delete(&reminder).unwrap();
        assert!(store.get(id).unwrap().is_none());
        // second delete is harmless
        store.delete(&reminder).unwrap();
    }

    #[test]
    fn test_update_missing_row() {
        let store = Store::open_in_memory().unwrap();
        let mut ghost = sample("ghost");
        ghost.id = 42;
        assert!(matches!(store.update(&ghost), Err(StoreError::NotFound(42))));
    }

    #[test]
    fn test_subscribers_see_every_write() {
        let store = Store::open_in_memory().unwrap();
        let mut rx = store.subscribe();
        assert!(rx.borrow().is_empty());

        let id = store.insert(&sample("watch me")).unwrap();
        assert!(rx.has_changed().unwrap());
        let snapshot = rx.borrow_and_update().clone();
        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot[0].id, id);

        store.delete(&snapshot[0]).unwrap();
        assert!(rx.has_changed().unwrap());
        assert!(rx.borrow_and_update().is_empty());
    }

    #[test]
    fn test_open_creates_parent_directories() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("reminders.db");

        let id = {
            let store = Store::open(&path).unwrap();
            store.insert(&sample("persisted")).unwrap()
        };

        let reopened = Store::open(&path).unwrap();
        let all = reopened.all().unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].id, id);
        assert_eq!(all[0].title, "persisted");
    }
}
