//! CSV export for simulation step records.

use std::fs::File;
use std::io::{self, Write};
use std::path::Path;

use crate::sim::types::StepRecord;

/// Column header for CSV telemetry export.
pub const HEADER: &str = "timestep,time_hr,duration_hr,generation_kw,load_kw,price,ambient,\
                          requested_kw,storage_kw,soc_kwh,soc_pct,grid_import_kw,\
                          grid_export_kw,curtailment_kw,unmet_load_kw";

/// Exports step records to a CSV file at the given path.
///
/// Writes a header row followed by one data row per step. Produces
/// deterministic output for identical inputs.
///
/// # Arguments
///
/// * `records` - Step records, in order
/// * `path` - Output file path
///
/// # Errors
///
/// Returns an `io::Error` if file creation or writing fails.
pub fn export_csv(records: &[StepRecord], path: &Path) -> io::Result<()> {
    let file = File::create(path)?;
    let buf = io::BufWriter::new(file);
    write_csv(records, buf)
}

fn optional(value: Option<f64>) -> String {
    value.map(|v| format!("{v:.6}")).unwrap_or_default()
}

/// Writes step records as CSV to any writer.
///
/// Missing price or ambient values are written as empty fields.
///
/// # Errors
///
/// Returns an `io::Error` if writing fails.
pub fn write_csv(records: &[StepRecord], writer: impl Write) -> io::Result<()> {
    let mut wtr = csv::WriterBuilder::new().from_writer(writer);

    wtr.write_record(HEADER.split(',').map(str::trim))?;

    for r in records {
        let f = &r.flow;
        wtr.write_record(&[
            r.timestep.index.to_string(),
            format!("{:.4}", r.timestep.start_hours()),
            format!("{:.4}", r.timestep.duration_hours),
            format!("{:.6}", f.generation_kw),
            format!("{:.6}", f.load_kw),
            optional(r.sample.price),
            optional(r.sample.ambient),
            format!("{:.6}", r.action.storage_kw),
            format!("{:.6}", f.storage_kw),
            format!("{:.6}", r.storage.soc_kwh),
            format!("{:.2}", r.storage.soc_fraction() * 100.0),
            format!("{:.6}", f.grid_import_kw),
            format!("{:.6}", f.grid_export_kw),
            format!("{:.6}", f.curtailment_kw),
            format!("{:.6}", f.unmet_load_kw),
        ])?;
    }

    wtr.flush()?;
    Ok(())
}
