//! `regions` command: print the effective Region -> Sheet map

use std::path::Path;

use anyhow::Result;
use clap::Args;
use colored::*;

use crate::config::{ReconcileConfig, RegionSheetMap};

#[derive(Args, Debug)]
pub struct RegionsArgs {
    /// Print as JSON ({sheet: [regions]})
    #[arg(long)]
    pub json: bool,
}

pub fn handle_regions_command(args: RegionsArgs, config_path: Option<&Path>) -> Result<()> {
    let config = ReconcileConfig::load(config_path)?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&config.regions.by_sheet())?);
        return Ok(());
    }

    print!("{}", render(&config.regions));
    Ok(())
}

fn render(map: &RegionSheetMap) -> String {
    let mut out = String::new();
    for (sheet, regions) in map.by_sheet() {
        out.push_str(&format!("{}\n", sheet.bright_green().bold()));
        for region in regions {
            out.push_str(&format!("  {}\n", region));
        }
    }
    out.push_str(&format!("{}\n", format!("{} region(s)", map.len()).dimmed()));
    out
}
