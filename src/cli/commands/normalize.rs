//! Normalize command.

use std::io::Read;
use std::path::Path;

use anyhow::Context;

use crate::normalize::normalize_str;

/// Read JSON (or a raw model response) and print the canonical record.
pub fn cmd_normalize(input: &Path) -> anyhow::Result<()> {
    let text = if input == Path::new("-") {
        let mut buf = String::new();
        std::io::stdin()
            .read_to_string(&mut buf)
            .context("Failed to read stdin")?;
        buf
    } else {
        std::fs::read_to_string(input)
            .with_context(|| format!("Failed to read {}", input.display()))?
    };

    let record = normalize_str(&text);
    println!("{}", serde_json::to_string_pretty(&record.to_value())?);
    Ok(())
}
