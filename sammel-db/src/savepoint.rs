//! Named savepoints bounding each mutating store operation.
//!
//! Savepoints nest: an operation started inside another one releases or
//! rolls back only its own point.

use rusqlite::Connection;
use sammel_model::naming::quote_identifier;
use uuid::Uuid;

pub(crate) struct Savepoint<'conn> {
    conn: &'conn Connection,
    name: String,
    finished: bool,
}

impl<'conn> Savepoint<'conn> {
    pub(crate) fn begin(conn: &'conn Connection) -> rusqlite::Result<Self> {
        let name = format!("sp_{}", Uuid::new_v4().simple());
        conn.execute_batch(&format!("SAVEPOINT {}", quote_identifier(&name)))?;
        log::trace!("Savepoint {name} opened");
        Ok(Self {
            conn,
            name,
            finished: false,
        })
    }

    pub(crate) fn release(&mut self) -> rusqlite::Result<()> {
        self.conn
            .execute_batch(&format!("RELEASE SAVEPOINT {}", quote_identifier(&self.name)))?;
        self.finished = true;
        log::trace!("Savepoint {} released", self.name);
        Ok(())
    }

    /// Undo everything since `begin` and discard the savepoint.
    pub(crate) fn rollback(&mut self) -> rusqlite::Result<()> {
        let name = quote_identifier(&self.name);
        self.conn.execute_batch(&format!(
            "ROLLBACK TO SAVEPOINT {name}; RELEASE SAVEPOINT {name};"
        ))?;
        self.finished = true;
        log::trace!("Savepoint {} rolled back", self.name);
        Ok(())
    }
}

impl Drop for Savepoint<'_> {
    fn drop(&mut self) {
        if !self.finished {
            if let Err(e) = self.rollback() {
                log::error!("Failed to roll back savepoint {}: {e}", self.name);
            }
        }
    }
}
