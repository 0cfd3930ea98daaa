use serde::Serialize;
use std::fmt;
use thiserror::Error;

/// Fatal pipeline failures. Nothing is emitted when one of these is returned.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PlotError {
    #[error("unknown {role} field '{field}'")]
    UnknownField { role: &'static str, field: String },
    #[error("unsupported cardinality {count}: dice faces hold between 1 and 6 values")]
    UnsupportedCardinality { count: usize },
    #[error("{count} tertiary values exceed max_dice_sides ({max})")]
    TooManyDiceSides { count: usize, max: usize },
    #[error("unknown backend '{0}' (expected one of: svg, html)")]
    UnknownBackend(String),
    #[error("invalid option {option}: {reason}")]
    InvalidOption { option: &'static str, reason: String },
    #[error("field '{field}' has no values")]
    DegenerateInput { field: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Configuration,
    DegenerateInput,
}

impl PlotError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            PlotError::DegenerateInput { .. } => ErrorKind::DegenerateInput,
            _ => ErrorKind::Configuration,
        }
    }

    pub(crate) fn invalid(option: &'static str, reason: impl Into<String>) -> Self {
        PlotError::InvalidOption {
            option,
            reason: reason.into(),
        }
    }
}

/// Recoverable data problems. Collected into the layout and logged, never fatal.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PlotWarning {
    /// A secondary category carries more than one group; the first one seen wins.
    MultipleGroups { secondary: String, groups: Vec<String> },
    UnmappedTertiary { value: String, count: usize },
    UnknownGroup { group: String },
    UnknownContrast { value: String, count: usize },
    UnlistedFeature { feature: String, count: usize },
    InvalidNumber { field: String, row: usize },
}

impl PlotWarning {
    pub(crate) fn emit(self, sink: &mut Vec<PlotWarning>) {
        tracing::warn!(warning = %self, "data consistency warning");
        sink.push(self);
    }
}

impl fmt::Display for PlotWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlotWarning::MultipleGroups { secondary, groups } => write!(
                f,
                "'{}' has multiple groups assigned ({}); using '{}'",
                secondary,
                groups.join(", "),
                groups.first().map(String::as_str).unwrap_or_default()
            ),
            PlotWarning::UnmappedTertiary { value, count } => write!(
                f,
                "'{value}' has no color entry; {count} observation(s) get no mark"
            ),
            PlotWarning::UnknownGroup { group } => {
                write!(f, "group '{group}' has no color entry; ranked last")
            }
            PlotWarning::UnknownContrast { value, count } => write!(
                f,
                "contrast '{value}' is not a configured level; {count} row(s) skipped"
            ),
            PlotWarning::UnlistedFeature { feature, count } => write!(
                f,
                "feature '{feature}' is not in the gene list; {count} row(s) skipped"
            ),
            PlotWarning::InvalidNumber { field, row } => {
                write!(f, "row {row}: '{field}' is not a number; row skipped")
            }
        }
    }
}
