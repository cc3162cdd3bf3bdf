//! Bounce event table.
//!
//! Columns: `frame,time_s,x_m,y_m,conf` with 3, 4, 4 and 3 decimals.

use std::{
    fs::File,
    io::{BufWriter, Write},
    path::Path,
};

use crate::track::BounceEvent;

pub const CSV_HEADER: &str = "frame,time_s,x_m,y_m,conf";

/// Write the header and one row per event.
pub fn write_bounces<W: Write>(mut out: W, events: &[BounceEvent]) -> std::io::Result<()> {
    writeln!(out, "{CSV_HEADER}")?;
    for e in events {
        writeln!(
            out,
            "{},{:.3},{:.4},{:.4},{:.3}",
            e.frame_index, e.time_seconds, e.table_x, e.table_y, e.confidence
        )?;
    }
    out.flush()
}

/// Write the event table to `path`, replacing any existing file.
pub fn save_bounces_csv(events: &[BounceEvent], path: impl AsRef<Path>) -> std::io::Result<()> {
    let path = path.as_ref();
    write_bounces(BufWriter::new(File::create(path)?), events)?;
    log::info!("wrote {} bounce row(s) to {}", events.len(), path.display());
    Ok(())
}
