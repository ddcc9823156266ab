//! Emits the JSON schema for the configuration file to stdout.
//!
//! Regenerate with: cargo run --bin generate_schema --features dev-bins

use flux_editor::config::Config;

fn main() {
    let schema = schemars::schema_for!(Config);
    match serde_json::to_string_pretty(&schema) {
        Ok(json) => println!("{}", json),
        Err(e) => {
            eprintln!("Failed to serialize schema: {}", e);
            std::process::exit(1);
        }
    }
}
