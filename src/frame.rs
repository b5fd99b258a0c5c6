use std::io::Read;
use std::path::Path;

use regex::Regex;
use serde::Serialize;
use sha2::{Digest, Sha256};
use tracing::{debug, info, warn};

use crate::error::{Result, ScopeError};

/// Cell values read as missing, after trimming.
const NULL_MARKERS: &[&str] = &[
    "", "#N/A", "#N/A N/A", "#NA", "-1.#IND", "-1.#QNAN", "-NaN", "-nan", "1.#IND", "1.#QNAN",
    "<NA>", "N/A", "NA", "NULL", "NaN", "None", "n/a", "nan", "null",
];

/// In-memory table parsed from a delimited file. `None` cells are missing.
#[derive(Debug, Clone, Default)]
pub struct Frame {
    headers: Vec<String>,
    rows: Vec<Vec<Option<String>>>,
}

/// Where a frame came from, reported alongside the analysis.
#[derive(Debug, Clone, Serialize)]
pub struct SourceInfo {
    pub path: String,
    pub sha256: String,
    pub rows: usize,
    pub columns: usize,
    pub dropped_columns: Vec<String>,
}

/// A marker, or any spelling `f64` parses to NaN (`NAN`, `+nan`, ...).
fn is_null_marker(raw: &str) -> bool {
    let raw = raw.trim();
    NULL_MARKERS.contains(&raw) || raw.parse::<f64>().is_ok_and(f64::is_nan)
}

/// Read and parse a CSV file, fingerprinting its bytes.
pub fn load_file(path: &Path) -> Result<(Frame, SourceInfo)> {
    let data = std::fs::read(path)?;
    let sha256 = hex::encode(Sha256::digest(&data));
    let (frame, dropped_columns) = Frame::parse(data.as_slice())?;
    if frame.is_empty() {
        warn!(path = %path.display(), "file has a header but no rows");
    }
    info!(
        path = %path.display(),
        rows = frame.len(),
        columns = frame.headers.len(),
        "loaded transactions"
    );
    let info = SourceInfo {
        path: path.display().to_string(),
        sha256,
        rows: frame.len(),
        columns: frame.headers.len(),
        dropped_columns,
    };
    Ok((frame, info))
}

impl Frame {
    /// Parse CSV with a header row, dropping artifact index columns.
    pub fn from_reader<R: Read>(rdr: R) -> Result<Frame> {
        Frame::parse(rdr).map(|(frame, _)| frame)
    }

    fn parse<R: Read>(rdr: R) -> Result<(Frame, Vec<String>)> {
        let index_column = Regex::new(r"^Unnamed: \d+$")
            .map_err(|e| ScopeError::Other(e.to_string()))?;

        let mut rdr = csv::ReaderBuilder::new()
            .has_headers(true)
            .from_reader(rdr);
        let raw_headers = rdr.headers()?.clone();
        if raw_headers.is_empty() {
            return Err(ScopeError::EmptyInput);
        }

        let mut keep = Vec::new();
        let mut headers = Vec::new();
        let mut dropped = Vec::new();
        for (i, h) in raw_headers.iter().enumerate() {
            if h.trim().is_empty() || index_column.is_match(h.trim()) {
                dropped.push(h.to_string());
            } else {
                keep.push(i);
                headers.push(h.to_string());
            }
        }
        if !dropped.is_empty() {
            debug!(?dropped, "dropped index columns");
        }

        let mut rows = Vec::new();
        for result in rdr.records() {
            let record = result?;
            let row = keep
                .iter()
                .map(|&i| {
                    record
                        .get(i)
                        .filter(|v| !is_null_marker(v))
                        .map(|v| v.to_string())
                })
                .collect();
            rows.push(row);
        }

        Ok((Frame { headers, rows }, dropped))
    }

    #[cfg(test)]
    pub fn from_rows(headers: &[&str], rows: Vec<Vec<Option<&str>>>) -> Frame {
        Frame {
            headers: headers.iter().map(|h| h.to_string()).collect(),
            rows: rows
                .into_iter()
                .map(|r| r.into_iter().map(|c| c.map(str::to_string)).collect())
                .collect(),
        }
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn rows(&self) -> &[Vec<Option<String>>] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column_index(name).is_some()
    }

    /// Required columns not present in this frame, in the order given.
    pub fn missing_columns(&self, required: &[&str]) -> Vec<String> {
        required
            .iter()
            .filter(|c| !self.has_column(c))
            .map(|c| c.to_string())
            .collect()
    }

    /// Raw cells of a column, `None` when the column does not exist.
    pub fn cells(&self, name: &str) -> Option<Vec<Option<&str>>> {
        let idx = self.column_index(name)?;
        Some(
            self.rows
                .iter()
                .map(|r| r.get(idx).and_then(|c| c.as_deref()))
                .collect(),
        )
    }

    /// A column parsed as floats. Fails on the first present, non-numeric cell.
    pub fn numeric_column(&self, name: &str) -> Result<Option<Vec<Option<f64>>>> {
        let Some(cells) = self.cells(name) else {
            return Ok(None);
        };
        cells
            .into_iter()
            .enumerate()
            .map(|(i, cell)| match cell {
                None => Ok(None),
                Some(raw) => raw.trim().parse::<f64>().map(|v| (!v.is_nan()).then_some(v)).map_err(|_| {
                    ScopeError::NonNumeric {
                        column: name.to_string(),
                        row: i + 1,
                        value: raw.to_string(),
                    }
                }),
            })
            .collect::<Result<Vec<_>>>()
            .map(Some)
    }

    /// A column parsed as integers. Whole-valued floats such as `5740.0` are accepted.
    pub fn integer_column(&self, name: &str) -> Result<Option<Vec<Option<i64>>>> {
        let Some(cells) = self.cells(name) else {
            return Ok(None);
        };
        cells
            .into_iter()
            .enumerate()
            .map(|(i, cell)| match cell {
                None => Ok(None),
                Some(raw) => parse_integer(raw).map(Some).ok_or_else(|| {
                    ScopeError::NonNumeric {
                        column: name.to_string(),
                        row: i + 1,
                        value: raw.to_string(),
                    }
                }),
            })
            .collect::<Result<Vec<_>>>()
            .map(Some)
    }
}

fn parse_integer(raw: &str) -> Option<i64> {
    let s = raw.trim();
    if let Ok(v) = s.parse::<i64>() {
        return Some(v);
    }
    let f: f64 = s.parse().ok()?;
    if f.is_finite() && f.fract() == 0.0 && f.abs() < i64::MAX as f64 {
        Some(f as i64)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_drops_unnamed_index_column() {
        let csv = "\
Unnamed: 0,trans_id,account_id,amount
0,695247,2378,700.0
1,171812,576,900.0
";
        let frame = Frame::from_reader(csv.as_bytes()).unwrap();
        assert_eq!(frame.headers(), &["trans_id", "account_id", "amount"]);
        assert_eq!(frame.len(), 2);
        assert_eq!(frame.cells("trans_id").unwrap(), vec![Some("695247"), Some("171812")]);
    }

    #[test]
    fn test_parse_drops_empty_header_column() {
        let csv = ",amount\n0,1.5\n";
        let frame = Frame::from_reader(csv.as_bytes()).unwrap();
        assert_eq!(frame.headers(), &["amount"]);
    }

    #[test]
    fn test_parse_reads_null_markers_as_missing() {
        let csv = "a,b\n,NaN\nNA, x \n";
        let frame = Frame::from_reader(csv.as_bytes()).unwrap();
        assert_eq!(frame.cells("a").unwrap(), vec![None, None]);
        assert_eq!(frame.cells("b").unwrap(), vec![None, Some(" x ")]);
    }

    #[test]
    fn test_nan_spellings_are_missing() {
        let csv = "amount\n100\nNAN\n-NAN\n-1.#IND\n#N/A N/A\n300\n";
        let frame = Frame::from_reader(csv.as_bytes()).unwrap();
        assert_eq!(
            frame.numeric_column("amount").unwrap(),
            Some(vec![Some(100.0), None, None, None, None, Some(300.0)])
        );
        let missing = crate::stats::missing_values(&frame);
        assert_eq!(missing[0].missing, 4);
    }

    #[test]
    fn test_parse_rejects_ragged_rows() {
        let csv = "a,b\n1,2\n3\n";
        assert!(matches!(
            Frame::from_reader(csv.as_bytes()),
            Err(ScopeError::Csv(_))
        ));
    }

    #[test]
    fn test_parse_rejects_empty_input() {
        assert!(matches!(
            Frame::from_reader("".as_bytes()),
            Err(ScopeError::EmptyInput)
        ));
    }

    #[test]
    fn test_numeric_column() {
        let csv = "amount,label\n1.5,a\n,b\n-20,c\n";
        let frame = Frame::from_reader(csv.as_bytes()).unwrap();
        assert_eq!(
            frame.numeric_column("amount").unwrap(),
            Some(vec![Some(1.5), None, Some(-20.0)])
        );
        assert_eq!(frame.numeric_column("missing").unwrap(), None);
    }

    #[test]
    fn test_numeric_column_reports_bad_cell() {
        let csv = "amount\n1.5\nabc\n";
        let frame = Frame::from_reader(csv.as_bytes()).unwrap();
        match frame.numeric_column("amount") {
            Err(ScopeError::NonNumeric { column, row, value }) => {
                assert_eq!(column, "amount");
                assert_eq!(row, 2);
                assert_eq!(value, "abc");
            }
            other => panic!("expected NonNumeric, got {other:?}"),
        }
    }

    #[test]
    fn test_integer_column_accepts_whole_floats() {
        let csv = "account_id\n5740\n5740.0\n\n";
        let frame = Frame::from_reader(csv.as_bytes()).unwrap();
        assert_eq!(
            frame.integer_column("account_id").unwrap(),
            Some(vec![Some(5740), Some(5740), None])
        );
        let bad = Frame::from_reader("account_id\n12.5\n".as_bytes()).unwrap();
        assert!(bad.integer_column("account_id").is_err());
    }

    #[test]
    fn test_missing_columns() {
        let frame = Frame::from_rows(&["amount", "balance"], vec![]);
        assert_eq!(
            frame.missing_columns(crate::models::REQUIRED_COLUMNS),
            vec!["date", "account_id", "operation"]
        );
    }

    #[test]
    fn test_load_file_fingerprints_source() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("trans.csv");
        std::fs::write(&path, "Unnamed: 0,amount\n0,1\n1,2\n").unwrap();
        let (frame, info) = load_file(&path).unwrap();
        assert_eq!(frame.len(), 2);
        assert_eq!(info.rows, 2);
        assert_eq!(info.columns, 1);
        assert_eq!(info.dropped_columns, vec!["Unnamed: 0"]);
        assert_eq!(info.sha256.len(), 64);
    }
}
