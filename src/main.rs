use std::io::{self, BufRead};
use std::panic::{self, AssertUnwindSafe};

use tracing_subscriber::EnvFilter;

mod config;
mod model;
mod protocol;
mod services;

use protocol::events::Outbox;

fn main() {
    // stdout carries the protocol, so logs go to stderr
    tracing_subscriber::fmt()
        .with_writer(io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .init();

    let config = config::Config::from_env();
    let outbox = Outbox::new(io::stdout());
    let mut session = protocol::Session::new(config, outbox.clone());
    session.start();

    let stdin = io::stdin();
    for line in stdin.lock().lines() {
        let line = match line {
            Ok(l) => l,
            Err(_) => continue,
        };

        if line.trim().is_empty() {
            continue;
        }

        let result = panic::catch_unwind(AssertUnwindSafe(|| session.handle(&line)));

        let response = match result {
            Ok(resp) => resp,
            Err(_) => serde_json::json!({
                "status": "error",
                "message": "internal core error"
            })
            .to_string(),
        };

        if outbox.line(&response).is_err() {
            break;
        }
    }
}
