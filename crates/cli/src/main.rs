//! # CLI - spectrum store shell
//!
//! A REPL over a [`store::DataStore`]. Reads commands from stdin, runs them
//! through [`shell::Shell`] and prints replies to stdout; log output goes to
//! stderr. Works interactively or with commands piped in.
//!
//! ## Commands
//!
//! ```text
//! CREATE [t] [json]               Create a session (t defaults to now) and select it
//! USE id                          Select an existing session
//! SESSIONS                        List sessions with first/latest/spectrum count
//! SPECTRUM worker t l1,l2,...     Append a sweep
//! AUDIO worker t channel          Append an audio marker, print the clip path
//! TEMP worker t value             Append a temperature
//! NAME worker t channel text...   Append an RDS programme service name
//! TEXT worker t channel text...   Append an RDS radio text
//! ERROR worker t message...       Append an error message
//! ITER kind worker [start] [end]  Print a range (start exclusive, end inclusive, "-" = open)
//! DELETE                          Delete the selected session
//! SETTINGS GET name [json]        Read settings, persisting json as defaults
//! SETTINGS SET name json          Replace settings
//! STATS                           Disk usage and per-worker statistics
//! EXIT / QUIT                     Leave
//! ```
//!
//! ## Configuration
//!
//! ```text
//! SPECSTORE_ROOT        store root directory        (default: "store")
//! SPECSTORE_SAMPLE_EXT  audio clip file extension   (default: "ogg")
//! SPECSTORE_SYNC        fsync every append          (default: "false")
//! SPECSTORE_LOG         log level                   (default: "info", RUST_LOG wins)
//! ```
//!
//! ## Example
//!
//! ```text
//! $ SPECSTORE_ROOT=/tmp/specstore cargo run -p cli
//! specstore started (root=/tmp/specstore, sample_ext=ogg, sync=false, sessions=0)
//! > CREATE 1000
//! OK 1000
//! > SPECTRUM rig 1066 10,20,-30
//! OK
//! > ITER spectrum rig
//! 1066: 10,20,-30
//! (1 records)
//! > EXIT
//! bye
//! ```

mod logging;
mod shell;

use anyhow::Result;
use config::StoreConfig;
use logging::{init_logging, Verbosity};
use shell::{Flow, Shell};
use std::io::{self, BufRead, Write};
use store::DataStore;

fn main() -> Result<()> {
    let config = StoreConfig::from_env();
    init_logging(Verbosity::from_level(&config.log_level).unwrap_or_default());

    let span = tracing::info_span!("specstore");
    let store = DataStore::open(config.clone(), span)?;

    println!(
        "specstore started (root={}, sample_ext={}, sync={}, sessions={})",
        config.root.display(),
        config.sample_ext,
        config.sync,
        store.sessions()?.len()
    );
    println!("{}", shell::HELP);
    print!("> ");
    io::stdout().flush().ok();

    let mut shell = Shell::new(store);
    let stdin = io::stdin();

    for line in stdin.lock().lines() {
        let line = line?;
        let flow = {
            let mut stdout = io::stdout().lock();
            shell.execute(&line, &mut stdout)?
        };
        if flow == Flow::Exit {
            break;
        }

        match shell.current() {
            Some(id) => print!("[{}]> ", id),
            None => print!("> "),
        }
        io::stdout().flush().ok();
    }

    Ok(())
}
