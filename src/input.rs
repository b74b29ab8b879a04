use std::{io::Read, path::Path};

use crate::error::{ChartError, ChartResult};

/// One row of the capture log, still carrying its textual timestamp.
#[derive(Clone, Debug)]
pub struct RawRow {
    pub timestamp: String,
    /// NaN when the cell was empty or non-numeric; filled by interpolation
    /// later in the pipeline.
    pub framerate: f64,
}

const SEPARATOR: u8 = b';';
const TIMESTAMP_COLUMN: &str = "TIMESTAMP";
const FRAMERATE_COLUMN: &str = "FRAMERATE";

/// Read a semicolon-separated capture log from disk.
///
/// Header names are matched case-insensitively; extra columns are ignored.
/// Missing either required column is a fatal `Schema` error.
pub fn read_log(path: &Path) -> ChartResult<Vec<RawRow>> {
    let file = std::fs::File::open(path).map_err(|e| {
        ChartError::input_read(format!("failed to open '{}': {e}", path.display()))
    })?;
    read_log_from(file)
}

pub fn read_log_from(reader: impl Read) -> ChartResult<Vec<RawRow>> {
    let mut rdr = csv::ReaderBuilder::new()
        .delimiter(SEPARATOR)
        .has_headers(true)
        .trim(csv::Trim::All)
        .flexible(true)
        .from_reader(reader);

    let headers = rdr
        .headers()
        .map_err(|e| ChartError::input_read(format!("failed to read header row: {e}")))?
        .clone();

    let find = |name: &str| {
        headers
            .iter()
            .position(|h| h.trim().eq_ignore_ascii_case(name))
    };

    let ts_idx = find(TIMESTAMP_COLUMN)
        .ok_or_else(|| ChartError::schema("required column 'TIMESTAMP' not found"))?;
    let fr_idx = find(FRAMERATE_COLUMN)
        .ok_or_else(|| ChartError::schema("required column 'FRAMERATE' not found"))?;

    let mut rows = Vec::new();
    for (line, record) in rdr.records().enumerate() {
        let record = record
            .map_err(|e| ChartError::input_read(format!("failed to read row {line}: {e}")))?;

        let timestamp = record
            .get(ts_idx)
            .ok_or_else(|| {
                ChartError::input_read(format!("row {line} is missing the timestamp field"))
            })?
            .to_string();

        // Non-numeric framerate cells become gaps, matching the original
        // tool's NaN coercion, rather than aborting the run.
        let framerate = record
            .get(fr_idx)
            .and_then(|v| v.trim().parse::<f64>().ok())
            .unwrap_or(f64::NAN);

        rows.push(RawRow {
            timestamp,
            framerate,
        });
    }

    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_required_columns_case_insensitively() {
        let data = "TimeStamp;extra;FrameRate\n2020_06_01-10:00:00:000;x;60\n2020_06_01-10:00:01:000;y;59.5\n";
        let rows = read_log_from(data.as_bytes()).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].framerate, 60.0);
        assert_eq!(rows[1].framerate, 59.5);
        assert_eq!(rows[0].timestamp, "2020_06_01-10:00:00:000");
    }

    #[test]
    fn missing_framerate_column_is_schema_error() {
        let data = "TIMESTAMP;fps\n2020_06_01-10:00:00:000;60\n";
        assert!(matches!(
            read_log_from(data.as_bytes()),
            Err(ChartError::Schema(_))
        ));
    }

    #[test]
    fn missing_timestamp_column_is_schema_error() {
        let data = "time;FRAMERATE\nx;60\n";
        assert!(matches!(
            read_log_from(data.as_bytes()),
            Err(ChartError::Schema(_))
        ));
    }

    #[test]
    fn non_numeric_framerate_becomes_gap() {
        let data = "TIMESTAMP;FRAMERATE\n2020_06_01-10:00:00:000;n/a\n";
        let rows = read_log_from(data.as_bytes()).unwrap();
        assert!(rows[0].framerate.is_nan());
    }
}
