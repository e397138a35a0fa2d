//! `curator pending`: deposits awaiting curation.

use anyhow::{Context, Result};
use colored::Colorize;

use crate::workflow::Curator;

pub fn execute(curator: &Curator) -> Result<()> {
    let pending = curator
        .pending()
        .context("Failed to list pending deposits")?;

    if pending.is_empty() {
        println!("{} No deposits awaiting curation", "─".dimmed());
        return Ok(());
    }

    println!("{}", "Pending deposits".bold());
    for summary in &pending {
        println!(
            "  {:<12} {}  account {:<8} {}",
            summary.deposit_id.to_string().cyan(),
            summary.created.format("%Y-%m-%d"),
            summary.account_id,
            summary.title.as_deref().unwrap_or("")
        );
    }
    println!("\n{} pending", pending.len());
    Ok(())
}
