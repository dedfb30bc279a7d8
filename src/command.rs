//! Parses one line of shell input and dispatches it against the open table.
use tracing::debug;

use crate::errors::Error;
use crate::session::Session;
use crate::storage::node::{
    COMMON_NODE_HEADER_SIZE, LEAF_NODE_CELL_SIZE, LEAF_NODE_HEADER_SIZE, LEAF_NODE_MAX_CELLS,
    LEAF_NODE_SPACE_FOR_CELLS,
};
use crate::storage::row::{Row, ROW_SIZE};
use crate::{echo_line, error_line};

const HELP: &str = "Supported commands:\n\
  insert <id> <username> <email>   add a row\n\
  select                           print all rows in ascending id order\n\
  .exit                            flush and quit\n\
  .btree                           print a dump of the B+-tree\n\
  .constants                       print the storage layout constants\n\
  .help                            print this message";

/// What the REPL loop should do after dispatching one line.
pub enum Outcome {
    Continue,
    Exit,
}

/// Executes one line of input against `session`, printing its result (or
/// error) the way the shell's external contract specifies.
pub fn dispatch(session: &mut Session, line: &str) -> Outcome {
    let line = line.trim();
    if line.is_empty() {
        return Outcome::Continue;
    }

    if let Some(meta) = line.strip_prefix('.') {
        return dispatch_meta(session, meta);
    }

    match dispatch_statement(session, line) {
        Ok(()) => {}
        Err(e @ Error::Syntax(_)) | Err(e @ Error::UnrecognizedCommand(_)) => error_line!("{e}"),
        Err(e) => echo_line!("{e}"),
    }
    Outcome::Continue
}

fn dispatch_meta(session: &mut Session, meta: &str) -> Outcome {
    match meta {
        "exit" => Outcome::Exit,
        "btree" => {
            echo_line!("tree:");
            match session.table.render_btree() {
                Ok(dump) => print!("{dump}"),
                Err(e) => echo_line!("{e}"),
            }
            Outcome::Continue
        }
        "constants" => {
            echo_line!("constants:");
            echo_line!("ROW_SIZE: {ROW_SIZE}");
            echo_line!("COMMON_NODE_HEADER_SIZE: {COMMON_NODE_HEADER_SIZE}");
            echo_line!("LEAF_NODE_HEADER_SIZE: {LEAF_NODE_HEADER_SIZE}");
            echo_line!("LEAF_NODE_CELL_SIZE: {LEAF_NODE_CELL_SIZE}");
            echo_line!("LEAF_NODE_SPACE_FOR_CELLS: {LEAF_NODE_SPACE_FOR_CELLS}");
            echo_line!("LEAF_NODE_MAX_CELLS: {LEAF_NODE_MAX_CELLS}");
            Outcome::Continue
        }
        "help" => {
            echo_line!("{HELP}");
            Outcome::Continue
        }
        other => {
            error_line!("{}", Error::UnrecognizedCommand(format!(".{other}")));
            Outcome::Continue
        }
    }
}

fn dispatch_statement(session: &mut Session, line: &str) -> Result<(), Error> {
    let tokens: Vec<&str> = line.split_whitespace().collect();
    match tokens.as_slice() {
        ["select"] => {
            for row in session.table.select_all()? {
                echo_line!("( {}, {}, {} )", row.id, row.username, row.email);
            }
            echo_line!("executed.");
            Ok(())
        }
        ["insert", id, username, email] => {
            let row = Row::parse(id, username, email)?;
            debug!(id = row.id, "inserting row");
            session.table.insert(&row)?;
            echo_line!("executed.");
            Ok(())
        }
        _ => Err(Error::Syntax(format!("unrecognized statement '{line}'"))),
    }
}
