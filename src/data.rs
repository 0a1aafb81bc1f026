//! Two-column measurement files
//!
//! Reads `x y` pairs separated by commas, semicolons or whitespace. Blank
//! lines and lines starting with `#` are skipped, as is a non-numeric first
//! row (column header). Extra columns are ignored.

use crate::error::{AnalysisError, Result, ResultExt};
use std::io::Write;
use std::path::Path;

fn fields(line: &str) -> impl Iterator<Item = &str> {
    line.split(|c: char| c == ',' || c == ';' || c.is_whitespace())
        .filter(|f| !f.is_empty())
}

/// Parse two-column text into x and y vectors
pub fn parse_xy(text: &str) -> Result<(Vec<f64>, Vec<f64>)> {
    let mut x = Vec::new();
    let mut y = Vec::new();
    let mut seen_row = false;

    for (idx, raw) in text.lines().enumerate() {
        let line_no = idx + 1;
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let cols: Vec<&str> = fields(line).take(2).collect();
        let parsed: std::result::Result<Vec<f64>, _> =
            cols.iter().map(|c| c.parse::<f64>()).collect();

        match parsed {
            Ok(values) if values.len() == 2 => {
                x.push(values[0]);
                y.push(values[1]);
            }
            Ok(_) => {
                return Err(AnalysisError::Parse {
                    line: line_no,
                    message: "expected two columns".to_string(),
                })
            }
            // header row
            Err(_) if !seen_row => {}
            Err(e) => {
                return Err(AnalysisError::Parse {
                    line: line_no,
                    message: e.to_string(),
                })
            }
        }
        seen_row = true;
    }

    if x.is_empty() {
        return Err(AnalysisError::InvalidInput("no data rows found".to_string()));
    }
    Ok((x, y))
}

/// Read a two-column file
pub fn load_xy(path: impl AsRef<Path>) -> Result<(Vec<f64>, Vec<f64>)> {
    let path = path.as_ref();
    let text = std::fs::read_to_string(path)?;
    parse_xy(&text).with_context(|| format!("reading {}", path.display()))
}

/// Write columns as CSV with a header row
pub fn write_csv<W: Write>(mut out: W, header: &[&str], columns: &[&[f64]]) -> Result<()> {
    writeln!(out, "{}", header.join(","))?;
    let rows = columns.iter().map(|c| c.len()).min().unwrap_or(0);
    for i in 0..rows {
        let row: Vec<String> = columns.iter().map(|c| c[i].to_string()).collect();
        writeln!(out, "{}", row.join(","))?;
    }
    Ok(())
}
