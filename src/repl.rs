//! The read-eval-print loop: prints the prompt, reads one line, dispatches
//! it, and repeats until `.exit` or end of input.
use std::io::{self, BufRead};

use crate::command::{self, Outcome};
use crate::console;
use crate::errors::Error;
use crate::session::Session;

pub fn run(mut session: Session) -> Result<(), Error> {
    let stdin = io::stdin();
    let mut lines = stdin.lock().lines();

    loop {
        console::print_prompt();

        let line = match lines.next() {
            Some(line) => line?,
            None => {
                // EOF on stdin: flush so state survives the process exit,
                // unlike the tutorial this shell is grounded on (see
                // Open Questions in the design notes).
                session.close()?;
                return Ok(());
            }
        };

        match command::dispatch(&mut session, &line) {
            Outcome::Continue => {}
            Outcome::Exit => {
                session.close()?;
                return Ok(());
            }
        }
    }
}
