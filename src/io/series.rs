//! Loading of one-year time series (load, PV production, starting SOC) from CSV.

use std::io::Read;
use std::path::Path;

use crate::error::ErpError;

/// Reads a numeric column from a CSV file with a header row.
///
/// `column` selects a header by name; `None` takes the first column.
///
/// # Errors
///
/// `Csv`/`Io` if the file cannot be read, `InvalidInput` if the column is
/// missing or a value does not parse as a number.
pub fn read_series(path: &Path, column: Option<&str>) -> Result<Vec<f64>, ErpError> {
    let rdr = csv::ReaderBuilder::new().trim(csv::Trim::All).from_path(path)?;
    read_column(rdr, column, &path.display().to_string())
}

/// Same as [`read_series`] over any reader; `source` names it in errors.
pub fn read_series_from_reader(
    reader: impl Read,
    column: Option<&str>,
    source: &str,
) -> Result<Vec<f64>, ErpError> {
    let rdr = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);
    read_column(rdr, column, source)
}

fn read_column<R: Read>(
    mut rdr: csv::Reader<R>,
    column: Option<&str>,
    source: &str,
) -> Result<Vec<f64>, ErpError> {
    let idx = match column {
        Some(name) => rdr
            .headers()?
            .iter()
            .position(|h| h == name)
            .ok_or_else(|| ErpError::invalid(source, format!("no column named \"{name}\"")))?,
        None => 0,
    };

    let mut values = Vec::new();
    for (row, record) in rdr.records().enumerate() {
        let record = record?;
        let raw = record.get(idx).unwrap_or("");
        let value = raw.parse::<f64>().map_err(|e| {
            ErpError::invalid(source, format!("row {}: \"{raw}\" is not a number ({e})", row + 1))
        })?;
        values.push(value);
    }
    Ok(values)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_named_column() {
        let data = "hour,kw,other\n0, 1.5 ,x\n1,2.0,y\n";
        let v = read_series_from_reader(data.as_bytes(), Some("kw"), "mem").expect("parses");
        assert_eq!(v, vec![1.5, 2.0]);
    }

    #[test]
    fn defaults_to_first_column() {
        let data = "kw\n3\n4\n";
        let v = read_series_from_reader(data.as_bytes(), None, "mem").expect("parses");
        assert_eq!(v, vec![3.0, 4.0]);
    }

    #[test]
    fn missing_column_names_source() {
        let err = read_series_from_reader("a\n1\n".as_bytes(), Some("kw"), "load.csv")
            .expect_err("missing column");
        assert_eq!(err.field(), Some("load.csv"));
    }

    #[test]
    fn non_numeric_value_is_rejected() {
        let err = read_series_from_reader("kw\n1\nabc\n".as_bytes(), None, "mem")
            .expect_err("bad value");
        assert!(err.to_string().contains("row 2"));
    }
}
