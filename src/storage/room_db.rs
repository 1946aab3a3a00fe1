use rusqlite::{OptionalExtension, Result as SqlResult, params};
use std::path::Path;

use super::database::Database;
use super::RoomStore;
use crate::common::{Message, Room};

/// SQLite-backed room store. A room is saved as a whole document.
pub struct RoomDatabase {
    db: Database,
}

impl RoomDatabase {
    /// Open (or create) the room database at `path`
    pub fn with_path<P: AsRef<Path>>(path: P) -> SqlResult<Self> {
        Self::from_database(Database::new(path)?)
    }

    pub fn in_memory() -> SqlResult<Self> {
        Self::from_database(Database::in_memory()?)
    }

    fn from_database(db: Database) -> SqlResult<Self> {
        let room_db = Self { db };
        room_db.init_schema()?;
        Ok(room_db)
    }

    fn init_schema(&self) -> SqlResult<()> {
        let conn = self.db.connection();

        conn.execute(
            "CREATE TABLE IF NOT EXISTS rooms (
                room_id TEXT PRIMARY KEY,
                created_at INTEGER NOT NULL DEFAULT (strftime('%s', 'now'))
            )",
            [],
        )?;

        // position = arrival order within the room
        conn.execute(
            "CREATE TABLE IF NOT EXISTS messages (
                room_id TEXT NOT NULL REFERENCES rooms(room_id) ON DELETE CASCADE,
                position INTEGER NOT NULL,
                sender TEXT NOT NULL,
                content TEXT NOT NULL,
                time_stamp TEXT NOT NULL,
                spam_level REAL NOT NULL DEFAULT 0.0,
                is_spam INTEGER NOT NULL DEFAULT 0,
                PRIMARY KEY (room_id, position)
            )",
            [],
        )?;

        Ok(())
    }

    fn load_messages(&self, room_id: &str) -> SqlResult<Vec<Message>> {
        let conn = self.db.connection();
        let mut stmt = conn.prepare(
            "SELECT sender, content, time_stamp, spam_level, is_spam
             FROM messages
             WHERE room_id = ?1
             ORDER BY position ASC",
        )?;

        let messages = stmt
            .query_map(params![room_id], |row| {
                Ok(Message {
                    sender: row.get(0)?,
                    content: row.get(1)?,
                    time_stamp: row.get(2)?,
                    spam_level: row.get(3)?,
                    is_spam: row.get::<_, i64>(4)? != 0,
                })
            })?
            .collect::<SqlResult<Vec<_>>>()?;

        Ok(messages)
    }
}

impl RoomStore for RoomDatabase {
    fn find_by_room_id(&self, room_id: &str) -> SqlResult<Option<Room>> {
        let conn = self.db.connection();
        let found: Option<String> = conn
            .query_row(
                "SELECT room_id FROM rooms WHERE room_id = ?1",
                params![room_id],
                |row| row.get(0),
            )
            .optional()?;

        match found {
            Some(room_id) => {
                let messages = self.load_messages(&room_id)?;
                Ok(Some(Room { room_id, messages }))
            }
            None => Ok(None),
        }
    }

    fn create(&self, room: &Room) -> SqlResult<bool> {
        let conn = self.db.connection();
        let inserted = conn.execute(
            "INSERT OR IGNORE INTO rooms (room_id) VALUES (?1)",
            params![room.room_id],
        )?;

        if inserted == 0 {
            return Ok(false);
        }
        if !room.messages.is_empty() {
            self.save(room.clone())?;
        }
        Ok(true)
    }

    fn save(&self, room: Room) -> SqlResult<Room> {
        let tx = self.db.connection().unchecked_transaction()?;

        tx.execute(
            "INSERT OR IGNORE INTO rooms (room_id) VALUES (?1)",
            params![room.room_id],
        )?;
        tx.execute(
            "DELETE FROM messages WHERE room_id = ?1",
            params![room.room_id],
        )?;

        {
            let mut insert = tx.prepare(
                "INSERT INTO messages (room_id, position, sender, content, time_stamp, spam_level, is_spam)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            )?;
            for (position, message) in room.messages.iter().enumerate() {
                insert.execute(params![
                    room.room_id,
                    position as i64,
                    message.sender,
                    message.content,
                    message.time_stamp,
                    message.spam_level,
                    if message.is_spam { 1 } else { 0 }
                ])?;
            }
        }

        tx.commit()?;
        Ok(room)
    }
}
