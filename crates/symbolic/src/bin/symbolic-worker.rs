//! Worker process for the symbolic pool.
//!
//! Prints `ready.` on startup, then answers one JSON request per stdin
//! line with one JSON reply line on stdout until stdin closes.

use std::io::{self, BufRead, Write};

use tracing_subscriber::EnvFilter;

fn main() -> io::Result<()> {
    tracing_subscriber::fmt()
        .with_writer(io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .init();

    let stdin = io::stdin();
    let stdout = io::stdout();
    let mut out = stdout.lock();
    writeln!(out, "ready.")?;
    out.flush()?;

    for line in stdin.lock().lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let reply = symbolic::protocol::respond(line.trim());
        writeln!(out, "{reply}")?;
        out.flush()?;
    }

    tracing::debug!("stdin closed, worker exiting");
    Ok(())
}
