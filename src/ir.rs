use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::borrow::Cow;
use std::fmt;

use crate::error::PlotError;

#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Text(String),
    Number(f64),
    Null,
}

impl Value {
    /// Categorical view of a cell. `Null` has no label.
    pub fn as_label(&self) -> Option<Cow<'_, str>> {
        match self {
            Value::Text(text) => Some(Cow::Borrowed(text.as_str())),
            Value::Number(number) => Some(Cow::Owned(format_number(*number))),
            Value::Null => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Number(number) => Some(*number),
            Value::Text(text) => text.trim().parse::<f64>().ok(),
            Value::Null => None,
        }
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Text(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::Text(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Number(value)
    }
}

fn format_number(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{:.0}", value)
    } else {
        value.to_string()
    }
}

/// A flat observation table: named columns, one `Value` per cell.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    columns: Vec<String>,
    rows: Vec<Vec<Value>>,
}

impl Table {
    pub fn new(columns: Vec<String>) -> Self {
        Self {
            columns,
            rows: Vec::new(),
        }
    }

    pub fn from_rows<S: AsRef<str>>(columns: &[S], rows: Vec<Vec<Value>>) -> Self {
        let mut table = Self::new(columns.iter().map(|c| c.as_ref().to_string()).collect());
        for row in rows {
            table.push_row(row);
        }
        table
    }

    /// Appends a row, padding short rows with `Null` and dropping extra cells.
    pub fn push_row(&mut self, mut row: Vec<Value>) {
        row.resize(self.columns.len(), Value::Null);
        self.rows.push(row);
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<Value>] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|column| column == name)
    }

    /// Resolves a configured field name, failing before any geometry is computed.
    pub fn require(&self, role: &'static str, name: &str) -> Result<usize, PlotError> {
        self.column_index(name).ok_or_else(|| PlotError::UnknownField {
            role,
            field: name.to_string(),
        })
    }

    pub fn label(&self, row: usize, column: usize) -> Option<Cow<'_, str>> {
        self.rows
            .get(row)
            .and_then(|cells| cells.get(column))
            .and_then(Value::as_label)
    }

    pub fn number(&self, row: usize, column: usize) -> Option<f64> {
        self.rows
            .get(row)
            .and_then(|cells| cells.get(column))
            .and_then(Value::as_f64)
    }

    /// Distinct labels of a column in first-seen order.
    pub fn distinct_labels(&self, column: usize) -> Vec<String> {
        let mut seen = std::collections::HashSet::new();
        let mut labels = Vec::new();
        for row in 0..self.rows.len() {
            if let Some(label) = self.label(row, column) {
                if seen.insert(label.to_string()) {
                    labels.push(label.into_owned());
                }
            }
        }
        labels
    }
}

/// Label to color mapping whose key order is the category's enumeration order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ColorMap {
    entries: Vec<(String, String)>,
}

impl ColorMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or replaces a color. Replacing keeps the original key position.
    pub fn insert(&mut self, key: impl Into<String>, color: impl Into<String>) {
        let key = key.into();
        let color = color.into();
        if let Some(entry) = self.entries.iter_mut().find(|(k, _)| *k == key) {
            entry.1 = color;
        } else {
            self.entries.push((key, color));
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, color)| color.as_str())
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, c)| (k.as_str(), c.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<K: Into<String>, C: Into<String>> FromIterator<(K, C)> for ColorMap {
    fn from_iter<I: IntoIterator<Item = (K, C)>>(iter: I) -> Self {
        let mut map = ColorMap::new();
        for (key, color) in iter {
            map.insert(key, color);
        }
        map
    }
}

impl Serialize for ColorMap {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (key, color) in &self.entries {
            map.serialize_entry(key, color)?;
        }
        map.end()
    }
}

struct ColorMapVisitor;

impl<'de> Visitor<'de> for ColorMapVisitor {
    type Value = ColorMap;

    fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        formatter.write_str("an object mapping labels to color strings")
    }

    fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<ColorMap, A::Error> {
        let mut map = ColorMap::new();
        while let Some((key, color)) = access.next_entry::<String, String>()? {
            map.insert(key, color);
        }
        Ok(map)
    }
}

impl<'de> Deserialize<'de> for ColorMap {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_map(ColorMapVisitor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn color_map_keeps_declaration_order() {
        let json = r##"{"Other": "#DDDDDD", "BBB-linked": "#333333", "Cell-proliferation": "#888888"}"##;
        let map: ColorMap = serde_json::from_str(json).unwrap();
        let keys: Vec<&str> = map.keys().collect();
        assert_eq!(keys, vec!["Other", "BBB-linked", "Cell-proliferation"]);
        assert_eq!(map.get("BBB-linked"), Some("#333333"));
        let back = serde_json::to_string(&map).unwrap();
        assert!(back.starts_with(r#"{"Other""#));
    }

    #[test]
    fn numeric_labels_drop_trailing_zero() {
        assert_eq!(Value::Number(3.0).as_label().unwrap(), "3");
        assert_eq!(Value::Number(0.25).as_label().unwrap(), "0.25");
        assert!(Value::Null.as_label().is_none());
    }

    #[test]
    fn require_reports_missing_field() {
        let table = Table::from_rows(&["CellType"], vec![vec!["Neuron".into()]]);
        assert_eq!(table.require("primary", "CellType"), Ok(0));
        let err = table.require("secondary", "Pathway").unwrap_err();
        assert_eq!(
            err,
            PlotError::UnknownField {
                role: "secondary",
                field: "Pathway".to_string()
            }
        );
    }

    #[test]
    fn distinct_labels_are_first_seen() {
        let table = Table::from_rows(
            &["a"],
            vec![
                vec!["b".into()],
                vec!["a".into()],
                vec!["b".into()],
                vec![Value::Null],
            ],
        );
        assert_eq!(table.distinct_labels(0), vec!["b", "a"]);
    }
}
