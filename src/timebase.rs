use chrono::NaiveDateTime;

use crate::{
    error::{ChartError, ChartResult},
    input::RawRow,
};

/// One log row on the zero-based relative clock.
///
/// `time_ms` is milliseconds since the first row. The first sample is defined
/// to sit at exactly 0.0. Out-of-order input produces negative deltas which
/// are passed through unmodified.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Sample {
    pub time_ms: f64,
    pub value: f64,
}

/// Parse a `YYYY_MM_DD-HH:MM:SS:mmm` capture timestamp into an absolute
/// instant with millisecond precision.
///
/// `_`, `-` and `:` are all treated as token delimiters; anything other than
/// exactly 7 integer tokens is a `MalformedTimestamp`.
pub fn parse_timestamp(raw: &str) -> ChartResult<NaiveDateTime> {
    let tokens: Vec<&str> = raw
        .split(|c| c == '_' || c == '-' || c == ':')
        .filter(|t| !t.is_empty())
        .collect();

    if tokens.len() != 7 {
        return Err(ChartError::malformed_timestamp(format!(
            "expected 7 fields in '{raw}', got {}",
            tokens.len()
        )));
    }

    let mut fields = [0i64; 7];
    for (i, tok) in tokens.iter().enumerate() {
        fields[i] = tok.parse::<i64>().map_err(|_| {
            ChartError::malformed_timestamp(format!("non-numeric field '{tok}' in '{raw}'"))
        })?;
    }

    let [year, month, day, hour, minute, second, milli] = fields;

    let date = chrono::NaiveDate::from_ymd_opt(year as i32, month as u32, day as u32)
        .ok_or_else(|| {
            ChartError::malformed_timestamp(format!("'{raw}' is not a valid calendar date"))
        })?;
    let dt = date
        .and_hms_milli_opt(hour as u32, minute as u32, second as u32, milli as u32)
        .ok_or_else(|| {
            ChartError::malformed_timestamp(format!("'{raw}' is not a valid time of day"))
        })?;

    Ok(dt)
}

/// Convert raw rows to a zero-based relative time axis.
pub fn normalize(rows: &[RawRow]) -> ChartResult<Vec<Sample>> {
    let mut out = Vec::with_capacity(rows.len());
    let mut first: Option<NaiveDateTime> = None;

    for row in rows {
        let instant = parse_timestamp(&row.timestamp)?;
        let time_ms = match first {
            None => {
                first = Some(instant);
                0.0
            }
            Some(origin) => instant.signed_duration_since(origin).num_milliseconds() as f64,
        };
        out.push(Sample {
            time_ms,
            value: row.framerate,
        });
    }

    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(ts: &str, v: f64) -> RawRow {
        RawRow {
            timestamp: ts.to_string(),
            framerate: v,
        }
    }

    #[test]
    fn first_sample_is_exactly_zero() {
        let samples = normalize(&[
            row("2020_06_01-10:00:00:000", 60.0),
            row("2020_06_01-10:00:01:500", 59.0),
        ])
        .unwrap();
        assert_eq!(samples[0].time_ms, 0.0);
        assert_eq!(samples[1].time_ms, 1500.0);
    }

    #[test]
    fn millisecond_precision_survives() {
        let samples = normalize(&[
            row("2020_06_01-10:00:00:999", 60.0),
            row("2020_06_01-10:00:01:001", 60.0),
        ])
        .unwrap();
        assert_eq!(samples[1].time_ms, 2.0);
    }

    #[test]
    fn crosses_midnight() {
        let samples = normalize(&[
            row("2020_06_01-23:59:59:000", 60.0),
            row("2020_06_02-00:00:01:000", 60.0),
        ])
        .unwrap();
        assert_eq!(samples[1].time_ms, 2000.0);
    }

    #[test]
    fn out_of_order_rows_keep_negative_deltas() {
        let samples = normalize(&[
            row("2020_06_01-10:00:05:000", 60.0),
            row("2020_06_01-10:00:04:000", 60.0),
        ])
        .unwrap();
        assert_eq!(samples[1].time_ms, -1000.0);
    }

    #[test]
    fn wrong_token_count_is_rejected() {
        assert!(matches!(
            parse_timestamp("2020_06_01-10:00:00"),
            Err(ChartError::MalformedTimestamp(_))
        ));
        assert!(matches!(
            parse_timestamp("2020_06_01-10:00:00:000:7"),
            Err(ChartError::MalformedTimestamp(_))
        ));
    }

    #[test]
    fn non_numeric_token_is_rejected() {
        assert!(matches!(
            parse_timestamp("2020_06_xx-10:00:00:000"),
            Err(ChartError::MalformedTimestamp(_))
        ));
    }

    #[test]
    fn impossible_date_is_rejected() {
        assert!(matches!(
            parse_timestamp("2020_13_01-10:00:00:000"),
            Err(ChartError::MalformedTimestamp(_))
        ));
    }
}
