//! Crate-wide error type.
use std::fmt;

/// All failure modes the engine and shell can produce.
///
/// User input errors (`Syntax`, `UnrecognizedCommand`, `IdNegative`,
/// `StringTooLong`, `DuplicateKey`) are recoverable: the REPL prints them
/// and keeps going. Everything else is a storage-engine invariant violation
/// and is fatal — the caller should print it and exit rather than retry.
#[derive(Debug)]
pub enum Error {
    Io(std::io::Error),
    /// The database file's length is not a whole number of pages.
    CorruptFile,
    /// A page number at or beyond `TABLE_MAX_PAGES` was requested.
    PageOutOfBounds(u32),
    /// A page number equal to `INVALID_PAGE_NUM` was dereferenced, or a
    /// node was used before being initialized as leaf or internal.
    InvalidPage(u32),
    /// Insertion of a key that already exists.
    DuplicateKey,
    /// Reserved: raised only if a capacity gate rejects an insert.
    #[allow(dead_code)]
    TableFull,
    /// Could not parse an `insert`/`select` statement.
    Syntax(String),
    /// An unrecognized `.meta` command.
    UnrecognizedCommand(String),
    /// `insert` was given a negative id.
    IdNegative,
    /// A username or email exceeded its column's capacity.
    StringTooLong,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Io(e) => write!(f, "i/o error: {e}"),
            Error::CorruptFile => write!(f, "db file is not a whole number of pages. corrupt file."),
            Error::PageOutOfBounds(n) => write!(f, "tried to fetch page number out of bounds: {n}"),
            Error::InvalidPage(n) => write!(f, "tried to dereference invalid page: {n}"),
            Error::DuplicateKey => write!(f, "error: duplicate key."),
            Error::TableFull => write!(f, "error: table's full."),
            Error::Syntax(_) => write!(f, "syntax error. could not parse statement."),
            Error::UnrecognizedCommand(cmd) => write!(f, "unrecognized command '{cmd}'"),
            Error::IdNegative => write!(f, "id must be non-negative."),
            Error::StringTooLong => write!(f, "string is too long."),
        }
    }
}

impl std::error::Error for Error {}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Error {
        Error::Io(err)
    }
}
