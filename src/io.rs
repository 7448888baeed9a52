//! File I/O for the batch path: CSV in, CSV-with-predictions out, plus
//! the seeded synthetic generator used when no input file is given.
//!
//! The dialect is minimal RFC-4180: comma-separated, `"`-quoted fields
//! with doubled inner quotes, tolerant of `\r\n` line endings.

use std::fs;
use std::path::Path;

use log::info;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::file_runner::{InputError, InputRecord, PredictionResult};

/// Reads a CSV batch. The `data` column is required; `id` and
/// `created_at` are recognized when present; every other column is
/// carried through as an extra field. Malformed input fails the whole
/// batch here, before any classification happens.
pub fn read_records<P: AsRef<Path>>(path: P) -> Result<Vec<InputRecord>, InputError> {
    let content = fs::read_to_string(path.as_ref())?;
    let mut rows = parse(&content).into_iter();

    let header = match rows.next() {
        Some(header) => header,
        None => return Err(InputError::MissingValueColumn),
    };

    let data_col = header
        .iter()
        .position(|name| name == "data")
        .ok_or(InputError::MissingValueColumn)?;
    let id_col = header.iter().position(|name| name == "id");
    let created_col = header.iter().position(|name| name == "created_at");

    let mut records = Vec::new();
    for (i, fields) in rows.enumerate() {
        let row = i + 1;
        if fields.len() != header.len() {
            return Err(InputError::MalformedRow {
                row,
                expected: header.len(),
                found: fields.len(),
            });
        }

        let raw = &fields[data_col];
        let value: f64 = raw.parse().map_err(|_| InputError::InvalidValue {
            row,
            value: raw.clone(),
        })?;

        let id = match id_col {
            Some(col) if !fields[col].is_empty() => fields[col].clone(),
            _ => row.to_string(),
        };
        let created_at = created_col
            .map(|col| fields[col].clone())
            .filter(|v| !v.is_empty());

        let extra = header
            .iter()
            .zip(&fields)
            .enumerate()
            .filter(|(col, _)| {
                *col != data_col && Some(*col) != id_col && Some(*col) != created_col
            })
            .map(|(_, (name, value))| (name.clone(), value.clone()))
            .collect();

        records.push(InputRecord {
            id,
            created_at,
            value,
            extra,
        });
    }

    info!("Loaded {} rows from {}", records.len(), path.as_ref().display());
    Ok(records)
}

/// Writes the scored batch: the fixed core columns, every extra input
/// column, then `predicted`, `proba` (always empty in this mode), and
/// `model_used`. An empty batch produces an empty file.
pub fn write_predictions<P: AsRef<Path>>(
    path: P,
    results: &[PredictionResult],
) -> Result<(), InputError> {
    let path = path.as_ref();
    if results.is_empty() {
        fs::write(path, "")?;
        info!("Wrote 0 predictions to {}", path.display());
        return Ok(());
    }

    // The first record defines the extra-column layout; records from
    // read_records all share the input header.
    let extra_names: Vec<&str> = results[0]
        .record
        .extra
        .iter()
        .map(|(name, _)| name.as_str())
        .collect();

    let mut out = String::new();
    let mut header: Vec<&str> = vec!["id", "created_at", "data"];
    header.extend(&extra_names);
    header.extend(["predicted", "proba", "model_used"]);
    push_row(&mut out, header.iter().map(|s| s.to_string()));

    for result in results {
        let record = &result.record;
        let mut fields = vec![
            record.id.clone(),
            record.created_at.clone().unwrap_or_default(),
            record.value.to_string(),
        ];
        for name in &extra_names {
            let value = record
                .extra
                .iter()
                .find(|(n, _)| n == name)
                .map(|(_, v)| v.clone())
                .unwrap_or_default();
            fields.push(value);
        }
        fields.push(result.predicted.clone());
        fields.push(result.proba.map(|p| p.to_string()).unwrap_or_default());
        fields.push(result.model_used.clone());
        push_row(&mut out, fields.into_iter());
    }

    fs::write(path, out)?;
    info!("Wrote {} predictions to {}", results.len(), path.display());
    Ok(())
}

/// Generates a reproducible synthetic batch of `n` values drawn uniformly
/// from `[0, 1)`.
pub fn synthetic_records(n: usize, seed: u64) -> Vec<InputRecord> {
    let mut rng = StdRng::seed_from_u64(seed);
    (1..=n)
        .map(|i| InputRecord::new(i.to_string(), rng.gen::<f64>()))
        .collect()
}

fn push_row(out: &mut String, fields: impl Iterator<Item = String>) {
    let mut first = true;
    for field in fields {
        if !first {
            out.push(',');
        }
        first = false;
        out.push_str(&escape(&field));
    }
    out.push('\n');
}

fn escape(field: &str) -> String {
    if field.contains(',') || field.contains('"') || field.contains('\n') || field.contains('\r') {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

fn parse(content: &str) -> Vec<Vec<String>> {
    let mut records = Vec::new();
    let mut fields = Vec::new();
    let mut field = String::new();
    let mut in_quotes = false;

    let mut chars = content.chars().peekable();
    while let Some(c) = chars.next() {
        if in_quotes {
            if c == '"' {
                if chars.peek() == Some(&'"') {
                    chars.next();
                    field.push('"');
                } else {
                    in_quotes = false;
                }
            } else {
                field.push(c);
            }
        } else {
            match c {
                '"' => in_quotes = true,
                ',' => fields.push(std::mem::take(&mut field)),
                '\r' => {}
                '\n' => {
                    fields.push(std::mem::take(&mut field));
                    if !(fields.len() == 1 && fields[0].is_empty()) {
                        records.push(std::mem::take(&mut fields));
                    } else {
                        fields.clear();
                    }
                }
                _ => field.push(c),
            }
        }
    }
    if !field.is_empty() || !fields.is_empty() {
        fields.push(field);
        records.push(fields);
    }
    records
}
