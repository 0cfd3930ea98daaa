use crate::ir::{Table, Value};
use anyhow::{Result, anyhow, bail};
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashMap;
use std::path::Path;

static NUMBER_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[+-]?(?:\d+\.?\d*|\.\d+)(?:[eE][+-]?\d+)?$|^(?i:[+-]?(?:nan|inf|infinity))$")
        .unwrap()
});

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableFormat {
    Json,
    Delimited(char),
}

/// Picks a format from the file extension, falling back to the content.
pub fn detect_table_format(path: Option<&Path>, input: &str) -> TableFormat {
    let extension = path
        .and_then(|p| p.extension())
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());
    match extension.as_deref() {
        Some("json") => return TableFormat::Json,
        Some("csv") => return TableFormat::Delimited(','),
        Some("tsv") | Some("tab") => return TableFormat::Delimited('\t'),
        _ => {}
    }
    let trimmed = input.trim_start();
    if trimmed.starts_with('[') {
        return TableFormat::Json;
    }
    let header = trimmed.lines().next().unwrap_or_default();
    if header.contains('\t') {
        TableFormat::Delimited('\t')
    } else {
        TableFormat::Delimited(',')
    }
}

pub fn parse_table(input: &str, format: TableFormat) -> Result<Table> {
    match format {
        TableFormat::Json => parse_json_records(input),
        TableFormat::Delimited(delimiter) => parse_delimited(input, delimiter),
    }
}

pub fn load_table(path: &Path) -> Result<Table> {
    let input = std::fs::read_to_string(path)
        .map_err(|err| anyhow!("failed to read {}: {err}", path.display()))?;
    let format = detect_table_format(Some(path), &input);
    let table = parse_table(&input, format)?;
    tracing::debug!(
        path = %path.display(),
        rows = table.len(),
        columns = table.columns().len(),
        "loaded table"
    );
    Ok(table)
}

/// Parses a JSON array of flat objects. Column order is first-seen key order.
pub fn parse_json_records(input: &str) -> Result<Table> {
    let parsed: serde_json::Value = serde_json::from_str(input)?;
    let serde_json::Value::Array(records) = parsed else {
        bail!("expected a JSON array of records");
    };

    let mut columns: Vec<String> = Vec::new();
    let mut column_index: HashMap<String, usize> = HashMap::new();
    let mut cells: Vec<Vec<(usize, Value)>> = Vec::with_capacity(records.len());
    for (idx, record) in records.into_iter().enumerate() {
        let serde_json::Value::Object(fields) = record else {
            bail!("record {idx} is not a JSON object");
        };
        let mut row = Vec::with_capacity(fields.len());
        for (key, value) in fields {
            let col = *column_index.entry(key.clone()).or_insert_with(|| {
                columns.push(key);
                columns.len() - 1
            });
            row.push((col, json_cell(value)));
        }
        cells.push(row);
    }

    let mut table = Table::new(columns);
    let width = table.columns().len();
    for row in cells {
        let mut values = vec![Value::Null; width];
        for (col, value) in row {
            values[col] = value;
        }
        table.push_row(values);
    }
    Ok(table)
}

fn json_cell(value: serde_json::Value) -> Value {
    match value {
        serde_json::Value::Null => Value::Null,
        serde_json::Value::Bool(flag) => Value::Text(flag.to_string()),
        serde_json::Value::Number(number) => match number.as_f64() {
            Some(v) => Value::Number(v),
            None => Value::Text(number.to_string()),
        },
        serde_json::Value::String(text) => Value::Text(text),
        other => Value::Text(other.to_string()),
    }
}

/// Parses a header row plus records separated by `delimiter`. Fields may be
/// double-quoted with `""` escapes; quoted fields are always text.
pub fn parse_delimited(input: &str, delimiter: char) -> Result<Table> {
    let mut records = split_records(input, delimiter)?.into_iter();
    let Some((_, header)) = records.next() else {
        bail!("table is empty");
    };
    let columns: Vec<String> = header
        .into_iter()
        .map(|field| field.text.trim().trim_start_matches('\u{feff}').to_string())
        .collect();
    let width = columns.len();
    let mut table = Table::new(columns);

    for (line, fields) in records {
        if fields.len() != width {
            bail!(
                "line {line}: expected {width} fields, found {}",
                fields.len()
            );
        }
        table.push_row(fields.into_iter().map(delimited_cell).collect());
    }
    Ok(table)
}

struct Field {
    text: String,
    quoted: bool,
}

fn delimited_cell(field: Field) -> Value {
    if field.quoted {
        return Value::Text(field.text);
    }
    let trimmed = field.text.trim();
    if trimmed.is_empty() || trimmed.eq_ignore_ascii_case("na") {
        Value::Null
    } else if NUMBER_RE.is_match(trimmed) {
        trimmed
            .parse::<f64>()
            .map(Value::Number)
            .unwrap_or_else(|_| Value::Text(trimmed.to_string()))
    } else {
        Value::Text(trimmed.to_string())
    }
}

/// Splits input into records of fields, tagging each with its starting line.
/// Blank lines outside quotes are skipped.
fn split_records(input: &str, delimiter: char) -> Result<Vec<(usize, Vec<Field>)>> {
    let mut records = Vec::new();
    let mut fields: Vec<Field> = Vec::new();
    let mut current = String::new();
    let mut quoted = false;
    let mut in_quotes = false;
    let mut line = 1usize;
    let mut record_line = 1usize;
    let mut chars = input.chars().peekable();

    while let Some(ch) = chars.next() {
        if in_quotes {
            match ch {
                '"' if chars.peek() == Some(&'"') => {
                    chars.next();
                    current.push('"');
                }
                '"' => in_quotes = false,
                '\n' => {
                    line += 1;
                    current.push(ch);
                }
                _ => current.push(ch),
            }
            continue;
        }
        match ch {
            '"' if current.trim().is_empty() => {
                current.clear();
                quoted = true;
                in_quotes = true;
            }
            c if c == delimiter => {
                fields.push(Field {
                    text: std::mem::take(&mut current),
                    quoted,
                });
                quoted = false;
            }
            '\r' => {}
            '\n' => {
                if !fields.is_empty() || !current.trim().is_empty() || quoted {
                    fields.push(Field {
                        text: std::mem::take(&mut current),
                        quoted,
                    });
                    records.push((record_line, std::mem::take(&mut fields)));
                }
                current.clear();
                quoted = false;
                line += 1;
                record_line = line;
            }
            _ => current.push(ch),
        }
    }
    if in_quotes {
        bail!("line {record_line}: unterminated quoted field");
    }
    if !fields.is_empty() || !current.trim().is_empty() || quoted {
        fields.push(Field {
            text: current,
            quoted,
        });
        records.push((record_line, fields));
    }
    Ok(records)
}
