//! Check-tools command.

use console::style;

use crate::document::check_tools;

/// List external tools and whether each is on the PATH.
pub fn cmd_check_tools() -> anyhow::Result<()> {
    let tools = check_tools();
    for (tool, available) in &tools {
        if *available {
            println!("  {} {}", style("✓").green(), tool);
        } else {
            println!("  {} {} (not found)", style("✗").red(), tool);
        }
    }

    let missing = tools.iter().filter(|(_, ok)| !ok).count();
    if missing > 0 {
        println!(
            "{} {} tool(s) missing; install poppler-utils and tesseract-ocr",
            style("!").yellow(),
            missing
        );
    }
    Ok(())
}
