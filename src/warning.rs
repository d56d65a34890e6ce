//! Non-fatal parse warnings

use std::fmt;
use std::ops::{Deref, DerefMut};

use serde::Serialize;

/// 1-based line and column of a node in its source document
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
pub struct Mark {
    pub line: usize,
    pub column: usize,
}

impl Mark {
    pub fn new(line: usize, column: usize) -> Self {
        Self { line, column }
    }
}

/// Where in a document a warning originates
///
/// Zero lines/columns and empty strings mean "unknown".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Position {
    pub field: String,
    pub line: usize,
    pub column: usize,
    pub value: String,
}

impl Position {
    pub fn new(field: impl Into<String>, mark: Mark, value: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            line: mark.line,
            column: mark.column,
            value: value.into(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.field.is_empty() && self.line == 0 && self.column == 0 && self.value.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Warning {
    #[serde(flatten)]
    pub position: Position,
    pub message: String,
}

impl Warning {
    pub fn new(position: Position, message: impl Into<String>) -> Self {
        Self {
            position,
            message: message.into(),
        }
    }

    /// A warning that is not tied to any place in the document
    pub fn unpositioned(message: impl Into<String>) -> Self {
        Self::new(Position::default(), message)
    }

    /// Emit the warning as a `WARN` event, attaching only known position fields
    pub fn log(&self) {
        let p = &self.position;
        tracing::warn!(
            line = (p.line != 0).then_some(p.line),
            column = (p.column != 0).then_some(p.column),
            field = (!p.field.is_empty()).then_some(p.field.as_str()),
            value = (!p.value.is_empty()).then_some(p.value.as_str()),
            "{}",
            self.message
        );
    }
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let p = &self.position;
        if p.line != 0 {
            write!(f, "line {}", p.line)?;
            if p.column != 0 {
                write!(f, ", column {}", p.column)?;
            }
            f.write_str(": ")?;
        }
        f.write_str(&self.message)
    }
}

/// Ordered collection of warnings
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Warnings(Vec<Warning>);

impl Warnings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sort by line number, keeping the relative order of equal lines
    pub fn sort(&mut self) {
        self.0.sort_by_key(|w| w.position.line);
    }

    pub fn sorted(mut self) -> Self {
        self.sort();
        self
    }

    /// Emit every warning through `tracing`
    pub fn log(&self) {
        for warning in &self.0 {
            warning.log();
        }
    }

    pub fn into_inner(self) -> Vec<Warning> {
        self.0
    }
}

impl Deref for Warnings {
    type Target = Vec<Warning>;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl DerefMut for Warnings {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.0
    }
}

impl From<Vec<Warning>> for Warnings {
    fn from(warnings: Vec<Warning>) -> Self {
        Self(warnings)
    }
}

impl FromIterator<Warning> for Warnings {
    fn from_iter<I: IntoIterator<Item = Warning>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl Extend<Warning> for Warnings {
    fn extend<I: IntoIterator<Item = Warning>>(&mut self, iter: I) {
        self.0.extend(iter)
    }
}

impl IntoIterator for Warnings {
    type Item = Warning;
    type IntoIter = std::vec::IntoIter<Warning>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<'a> IntoIterator for &'a Warnings {
    type Item = &'a Warning;
    type IntoIter = std::slice::Iter<'a, Warning>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}
