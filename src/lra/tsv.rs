//! Readers for the TSV files shipped in the LRA release.
//!
//! ListOps: header `Source\tTarget`, one expression and its class per line.
//! AAN:     no header, `label\tid1\tid2\ttext1\ttext2` per line.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{DataError, Result};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListOpsRecord {
    pub source: String,
    pub target: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AanRecord {
    pub label: i64,
    pub id1: String,
    pub id2: String,
    pub text1: String,
    pub text2: String,
}

fn invalid(path: &Path, line: usize, reason: impl Into<String>) -> DataError {
    DataError::InvalidRecord {
        path: path.to_path_buf(),
        line,
        reason: reason.into(),
    }
}

/// Labels are written as `1` or `1.0` depending on the file
fn parse_label(path: &Path, line: usize, raw: &str) -> Result<i64> {
    let raw = raw.trim();
    if let Ok(v) = raw.parse::<i64>() {
        return Ok(v);
    }
    match raw.parse::<f64>() {
        Ok(v) if v.fract() == 0.0 => Ok(v as i64),
        _ => Err(invalid(path, line, format!("label '{}' is not an integer", raw))),
    }
}

/// Visit the non-empty lines of a file with their 1-based line numbers
fn for_each_line<F>(path: &Path, mut visit: F) -> Result<()>
where
    F: FnMut(usize, &str) -> Result<()>,
{
    if !path.exists() {
        return Err(DataError::MissingData(path.to_path_buf()));
    }
    let file = File::open(path).map_err(|e| DataError::io(path, e))?;
    for (idx, line) in BufReader::new(file).lines().enumerate() {
        let line = line.map_err(|e| DataError::io(path, e))?;
        let line = line.trim_end_matches('\r');
        if line.trim().is_empty() {
            continue;
        }
        visit(idx + 1, line)?;
    }
    Ok(())
}

pub fn read_listops(path: &Path) -> Result<Vec<ListOpsRecord>> {
    let mut records = Vec::new();
    let mut source_col = 0;
    let mut target_col = 1;
    let mut header_seen = false;

    for_each_line(path, |line_no, line| {
        let fields: Vec<&str> = line.split('\t').collect();
        if !header_seen {
            header_seen = true;
            let source = fields.iter().position(|f| f.trim() == "Source");
            let target = fields.iter().position(|f| f.trim() == "Target");
            match (source, target) {
                (Some(s), Some(t)) => {
                    source_col = s;
                    target_col = t;
                    return Ok(());
                }
                _ => return Err(invalid(path, line_no, "expected a 'Source\\tTarget' header")),
            }
        }

        let source = fields
            .get(source_col)
            .ok_or_else(|| invalid(path, line_no, "missing Source column"))?;
        let target = fields
            .get(target_col)
            .ok_or_else(|| invalid(path, line_no, "missing Target column"))?;
        records.push(ListOpsRecord {
            source: source.to_string(),
            target: parse_label(path, line_no, target)?,
        });
        Ok(())
    })?;

    tracing::info!("[LRA] read {} ListOps records from {:?}", records.len(), path);
    Ok(records)
}

pub fn read_aan(path: &Path) -> Result<Vec<AanRecord>> {
    let mut records = Vec::new();

    for_each_line(path, |line_no, line| {
        let fields: Vec<&str> = line.splitn(5, '\t').collect();
        if fields.len() != 5 {
            return Err(invalid(
                path,
                line_no,
                format!("expected 5 tab-separated fields, got {}", fields.len()),
            ));
        }
        records.push(AanRecord {
            label: parse_label(path, line_no, fields[0])?,
            id1: fields[1].to_string(),
            id2: fields[2].to_string(),
            text1: fields[3].to_string(),
            text2: fields[4].to_string(),
        });
        Ok(())
    })?;

    tracing::info!("[LRA] read {} AAN records from {:?}", records.len(), path);
    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_read_listops() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("basic_val.tsv");
        let text = "Source\tTarget\n( [MAX 2 9 ] )\t9\n\n( [MIN 4 1 ] )\t1\r\n";
        std::fs::write(&path, text).unwrap();

        let records = read_listops(&path).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].source, "( [MAX 2 9 ] )");
        assert_eq!(records[0].target, 9);
        assert_eq!(records[1].target, 1);
    }

    #[test]
    fn test_listops_errors_carry_line_numbers() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("bad.tsv");
        std::fs::write(&path, "Source\tTarget\n( 1 )\tnine\n").unwrap();
        match read_listops(&path) {
            Err(DataError::InvalidRecord { line, .. }) => assert_eq!(line, 2),
            other => panic!("expected invalid record, got {:?}", other),
        }

        std::fs::write(&path, "( 1 )\t1\n").unwrap();
        assert!(read_listops(&path).is_err());
        assert!(matches!(
            read_listops(&tmp.path().join("missing.tsv")),
            Err(DataError::MissingData(_))
        ));
    }

    #[test]
    fn test_read_aan() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("new_aan_pair.eval.tsv");
        let text = "1.0\tP01\tP02\tfirst paper\tsecond\tpaper\n0\tA\tB\tx\ty\n";
        std::fs::write(&path, text).unwrap();

        let records = read_aan(&path).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].label, 1);
        assert_eq!(records[0].text2, "second\tpaper");
        assert_eq!(records[1].id2, "B");

        std::fs::write(&path, "1\tonly\n").unwrap();
        assert!(read_aan(&path).is_err());
    }
}
