//! Output formatting for byoc commands

use anyhow::Result;
use byoc_core::{Collection, Tile};
use serde::Serialize;
use std::io::Write;
use tabled::{Table, Tabled};

/// Output format of list commands
#[derive(clap::ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    /// One JSON object per line
    Json,
    /// Human readable table
    Table,
}

/// Print `value` as a single JSON line on stdout
pub fn json_line<T: Serialize>(value: &T) -> Result<()> {
    let mut stdout = std::io::stdout().lock();
    serde_json::to_writer(&mut stdout, value)?;
    writeln!(stdout)?;
    Ok(())
}

#[derive(Tabled)]
struct CollectionRow {
    id: String,
    name: String,
    location: String,
    bucket: String,
}

#[derive(Tabled)]
struct TileRow {
    id: String,
    status: String,
    path: String,
    sensing_time: String,
}

fn or_dash(value: Option<&str>) -> String {
    value.unwrap_or("-").to_string()
}

pub fn collections_table(collections: &[Collection]) -> String {
    let rows: Vec<CollectionRow> = collections
        .iter()
        .map(|c| CollectionRow {
            id: c.id.clone(),
            name: or_dash(c.name.as_deref()),
            location: or_dash(c.location.as_deref()),
            bucket: or_dash(c.s3_bucket.as_deref()),
        })
        .collect();
    Table::new(rows).to_string()
}

pub fn tiles_table(tiles: &[Tile]) -> String {
    let rows: Vec<TileRow> = tiles
        .iter()
        .map(|t| TileRow {
            id: t.id.clone(),
            status: or_dash(t.status.as_deref()),
            path: or_dash(t.path.as_deref()),
            sensing_time: or_dash(t.sensing_time.as_deref()),
        })
        .collect();
    Table::new(rows).to_string()
}
