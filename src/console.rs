//! Line-buffered terminal I/O for the shell.
//!
//! The REPL's output is part of the external contract (exact prompt text,
//! exact row formatting) and is exercised by piping commands into the
//! process over stdin and capturing stdout — that rules out a raw-mode
//! terminal UI, since raw mode requires a real tty. Plain `print!`/`println!`
//! over buffered stdio is both simpler and the only thing a test harness can
//! drive.
use std::io::{self, Write};

/// Printed before each line of input; tests depend on the exact text.
pub const PROMPT: &str = "lyt-db> ";

pub fn print_prompt() {
    print!("{PROMPT}");
    let _ = io::stdout().flush();
}

pub fn echo(s: &str) {
    print!("{s}");
    let _ = io::stdout().flush();
}

pub fn echo_line(s: &str) {
    println!("{s}");
}

pub fn error_line(s: &str) {
    eprintln!("{s}");
}

#[macro_export]
macro_rules! echo {
    ($($arg:tt)*) => {
        $crate::console::echo(&format!($($arg)*))
    };
}

#[macro_export]
macro_rules! echo_line {
    ($($arg:tt)*) => {
        $crate::console::echo_line(&format!($($arg)*))
    };
}

#[macro_export]
macro_rules! error_line {
    ($($arg:tt)*) => {
        $crate::console::error_line(&format!($($arg)*))
    };
}
