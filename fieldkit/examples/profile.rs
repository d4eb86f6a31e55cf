//! Immediate-mode demo: build a profile record through trimming,
//! coercion, and validation middleware, with a nested address builder.
//!
//! ```bash
//! RUST_LOG=fieldwork=debug cargo run -p fieldkit --example profile
//! ```

use anyhow::Result;
use fieldkit::{transform, validate};
use fieldwork::config::BuilderConfig;
use fieldwork::immediate::{FieldValue, ImmediateBuilder};
use fieldwork::record::Record;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

fn main() -> Result<()> {
    init_tracing();

    let config = BuilderConfig::new()
        .with(transform::trim())
        .with(transform::to_number().only(["age"]))
        .with_field("name", validate::required())
        .with_field("age", validate::range(0.0, 130.0));

    let mut builder = ImmediateBuilder::with(Record::new(), config);
    builder
        .set("name", "  Ada Lovelace  ")?
        .set("age", "36")?
        .set(
            "address",
            FieldValue::nested(|child, _| {
                child.set("city", "  London  ")?.set("country", "GB")?;
                Ok(())
            }),
        )?;

    println!("{}", serde_json::to_string_pretty(&builder.record())?);
    Ok(())
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr).compact())
        .init();
}
