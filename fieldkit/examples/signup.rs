//! Queued-mode demo: a signup flow whose username check awaits a simulated
//! remote lookup. Writes are issued in order and drained at the end; the
//! reserved first choice is dropped silently and the fallback wins.
//!
//! ```bash
//! RUST_LOG=fieldwork=debug cargo run -p fieldkit --example signup
//! ```

use std::time::Duration;

use anyhow::Result;
use fieldkit::{transform, validate};
use fieldwork::config::BuilderConfig;
use fieldwork::middleware::{MiddlewareEntry, Outcome};
use fieldwork::queued::QueuedBuilder;
use fieldwork::record::Record;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Pretend to ask an account service whether the username is taken.
fn username_available() -> MiddlewareEntry {
    MiddlewareEntry::deferred("username-available", |_, value, _| async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        Ok(match value.as_str() {
            Some("alice") => Outcome::Cancel,
            _ => Outcome::Unchanged,
        })
    })
    .only(["username"])
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();

    let config = BuilderConfig::new()
        .with(transform::trim())
        .with(transform::lowercase().only(["username", "email"]))
        .with(username_available())
        .with_field("email", validate::required());

    let mut builder = QueuedBuilder::with(Record::new(), config);
    builder
        .set("username", "Alice")
        .set("username", "Bob")
        .set("email", "  Bob@Example.com  ");

    let record = builder.drain().await?;
    println!("{}", serde_json::to_string_pretty(&record)?);
    Ok(())
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr).compact())
        .init();
}
