//! Owns the single open [`Table`] for the lifetime of the shell.
use std::path::Path;

use crate::errors::Error;
use crate::storage::Table;

pub struct Session {
    pub table: Table,
}

impl Session {
    pub fn open(path: &Path) -> Result<Self, Error> {
        Ok(Session { table: Table::open(path)? })
    }

    /// Flushes every populated page and releases the file descriptor,
    /// consuming the session.
    pub fn close(self) -> Result<(), Error> {
        self.table.close()
    }
}
