use std::io::{self, Write};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::thread;
use anyhow::{Context, Error, Result};
use log::debug;

use crate::cancel::{CancelToken, POLL_INTERVAL};

pub fn confirm(cancel: &CancelToken) -> Result<()> {
    prompt("Press Enter to continue...", cancel).map(|_| ())
}

pub fn prompt(message: &str, cancel: &CancelToken) -> Result<String> {
    print!("{}", message);
    io::stdout().flush()?;
    read_line(cancel)
}

// Stdin can't be interrupted, so the read happens on a helper thread and we
// wait on it while watching the token. An abandoned reader dies with the process.
fn read_line(cancel: &CancelToken) -> Result<String> {
    let (tx, rx) = mpsc::channel();
    thread::Builder::new()
        .name("stdin".to_owned())
        .spawn(move || {
            let mut line = String::new();
            let read = io::stdin().read_line(&mut line).map(|n| (n, line));
            let _ = tx.send(read);
        })
        .with_context(||"Unable to start stdin reader")?;
    loop {
        cancel.check()?;
        match rx.recv_timeout(POLL_INTERVAL) {
            Ok(read) => {
                let (n, line) = read.with_context(||"Unable to read from standard input")?;
                if n == 0 {
                    return Err(Error::msg("Standard input closed before a response was entered"));
                }
                debug!("Read {} byte(s) from stdin", n);
                return Ok(line.trim().to_owned());
            },
            Err(RecvTimeoutError::Timeout) => continue,
            Err(RecvTimeoutError::Disconnected) => return Err(Error::msg("Stdin reader stopped unexpectedly")),
        }
    }
}
