//! Export of ERP results: a per-duration summary CSV and the full JSON record.

use std::fs::File;
use std::io::{self, Write};
use std::path::Path;

use crate::error::ErpError;
use crate::sim::types::ErpOutputs;

/// Column header for the per-duration summary.
const HEADER: &str = "duration_steps,prob_surviving,unserved_kwh_mean,unserved_kwh_max,\
                      fuel_gal_mean,fuel_gal_max,expected_outage_cost,max_outage_cost";

/// Writes the per-duration summary CSV to `path`.
///
/// # Errors
///
/// Returns an error if file creation or writing fails.
pub fn export_summary_csv(outputs: &ErpOutputs, path: &Path) -> Result<(), ErpError> {
    let file = File::create(path)?;
    write_summary_csv(outputs, io::BufWriter::new(file))
}

/// Writes one row per outage duration to any writer.
///
/// # Errors
///
/// Returns an error if writing fails.
pub fn write_summary_csv(outputs: &ErpOutputs, writer: impl Write) -> Result<(), ErpError> {
    let mut wtr = csv::WriterBuilder::new().from_writer(writer);
    wtr.write_record(HEADER.split(',').map(str::trim))?;

    let value = |map: &std::collections::BTreeMap<usize, f64>, d: &usize| {
        map.get(d).copied().unwrap_or(0.0)
    };
    for d in &outputs.outage_durations {
        wtr.write_record(&[
            d.to_string(),
            format!("{:.6}", value(&outputs.probs_of_surviving, d)),
            format!("{:.4}", value(&outputs.unserved_load_per_outage, d)),
            format!("{:.4}", value(&outputs.max_unserved_load_per_outage, d)),
            format!("{:.4}", value(&outputs.generator_fuel_used_per_outage, d)),
            format!("{:.4}", value(&outputs.max_generator_fuel_used_per_outage, d)),
            format!(
                "{:.2}",
                value(&outputs.expected_outage_cost_per_outage_duration, d)
            ),
            format!("{:.2}", value(&outputs.max_outage_cost_per_outage_duration, d)),
        ])?;
    }

    wtr.flush()?;
    Ok(())
}

/// Writes the complete result record as pretty JSON to `path`.
///
/// # Errors
///
/// Returns an error if file creation or serialization fails.
pub fn export_json(outputs: &ErpOutputs, path: &Path) -> Result<(), ErpError> {
    let file = File::create(path)?;
    let mut buf = io::BufWriter::new(file);
    serde_json::to_writer_pretty(&mut buf, outputs)?;
    buf.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn outputs() -> ErpOutputs {
        let per_d = |a: f64, b: f64| BTreeMap::from([(1, a), (4, b)]);
        ErpOutputs {
            outage_durations: vec![1, 4],
            probs_of_surviving: per_d(1.0, 0.75),
            probs_of_surviving_by_hour_of_the_day: BTreeMap::new(),
            probs_of_surviving_by_month: BTreeMap::new(),
            cumulative_outage_survival_final_time_step: BTreeMap::from([(0, 0.75)]),
            mean_cumulative_outage_survival_final_time_step: 0.75,
            mean_cumulative_survival_by_time_step: vec![1.0, 1.0, 0.9, 0.75],
            min_cumulative_survival_by_time_step: vec![1.0, 1.0, 0.5, 0.5],
            mean_marginal_survival_by_time_step: vec![1.0, 1.0, 0.95, 0.8],
            min_marginal_survival_by_time_step: vec![1.0, 1.0, 0.5, 0.5],
            unserved_load_per_outage: per_d(0.0, 2.5),
            max_unserved_load_per_outage: per_d(0.0, 10.0),
            generator_fuel_used_per_outage: per_d(0.76, 2.0),
            max_generator_fuel_used_per_outage: per_d(0.76, 3.04),
            max_outage_cost_per_outage_duration: per_d(0.0, 100.0),
            expected_outage_cost_per_outage_duration: per_d(0.0, 25.0),
            resilience_hours_min: 2.0,
            resilience_hours_max: 4.0,
            resilience_hours_avg: 3.5,
            num_trials: 4,
            starts_evaluated: 1,
        }
    }

    #[test]
    fn summary_has_header_and_row_per_duration() {
        let mut buf = Vec::new();
        write_summary_csv(&outputs(), &mut buf).expect("write succeeds");
        let text = String::from_utf8(buf).expect("utf8");
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("duration_steps,prob_surviving"));
        assert!(lines[2].starts_with("4,0.750000,2.5000,10.0000"));
    }

    #[test]
    fn summary_rows_parse_back() {
        let mut buf = Vec::new();
        write_summary_csv(&outputs(), &mut buf).expect("write succeeds");
        let mut rdr = csv::ReaderBuilder::new().from_reader(buf.as_slice());
        assert_eq!(rdr.headers().map(csv::StringRecord::len).ok(), Some(8));
        for record in rdr.records() {
            let rec = record.expect("row parses");
            for field in rec.iter() {
                assert!(field.parse::<f64>().is_ok(), "{field} should be numeric");
            }
        }
    }

    #[test]
    fn json_contains_survival_map() {
        let json = serde_json::to_value(outputs()).expect("serializes");
        assert_eq!(json["probs_of_surviving"]["4"], 0.75);
        assert_eq!(json["num_trials"], 4);
    }
}
