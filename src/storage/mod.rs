pub mod database;
pub mod room_db;

pub use room_db::RoomDatabase;

use rusqlite::Result as SqlResult;
use std::fs;
use std::path::Path;

use crate::common::Room;

/// Persistence capability the chat service depends on.
pub trait RoomStore {
    fn find_by_room_id(&self, room_id: &str) -> SqlResult<Option<Room>>;

    /// Insert a new room. Returns `false` if the id is already taken.
    fn create(&self, room: &Room) -> SqlResult<bool>;

    /// Replace the stored room (and its whole message list) with `room`.
    fn save(&self, room: Room) -> SqlResult<Room>;
}

/// Ensure the directory holding `db_path` exists
pub fn ensure_data_dir<P: AsRef<Path>>(db_path: P) -> std::io::Result<()> {
    if let Some(parent) = db_path.as_ref().parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    Ok(())
}
