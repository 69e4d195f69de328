use serde::{Deserialize, Serialize};

use crate::scraper::site::NOT_AVAILABLE;

/// One enrollment the scraper queries for.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ClassSpec {
    pub name: String,
    pub group: String,
    pub year: String,
}

impl ClassSpec {
    pub fn new(name: impl Into<String>, group: impl Into<String>, year: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            group: group.into(),
            year: year.into(),
        }
    }

    pub fn display_name(&self) -> String {
        format!("{} (group {}, {})", self.name, self.group, self.year)
    }
}

/// A raw result with its class average and standard deviation.
///
/// Values are kept exactly as the site renders them; "85" and "85.0" are
/// different measures.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Measure {
    pub result: String,
    pub average: String,
    pub std_dev: String,
}

impl Measure {
    pub fn new(result: impl Into<String>, average: impl Into<String>, std_dev: impl Into<String>) -> Self {
        Self {
            result: result.into(),
            average: average.into(),
            std_dev: std_dev.into(),
        }
    }

    /// A measure where every column is missing from the layout.
    pub fn not_available() -> Self {
        Self::new(NOT_AVAILABLE, NOT_AVAILABLE, NOT_AVAILABLE)
    }

    /// True when no column holds a value.
    pub fn is_blank(&self) -> bool {
        [&self.result, &self.average, &self.std_dev]
            .iter()
            .all(|v| v.is_empty() || v.as_str() == NOT_AVAILABLE)
    }
}

impl Default for Measure {
    fn default() -> Self {
        Self::not_available()
    }
}

/// One row of a results table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultEntry {
    pub name: String,
    pub normal: Measure,
    #[serde(default)]
    pub weighted: Measure,
}

impl ResultEntry {
    /// Entry with only a raw result and class average.
    pub fn new(name: impl Into<String>, result: impl Into<String>, average: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            normal: Measure::new(result, average, NOT_AVAILABLE),
            weighted: Measure::not_available(),
        }
    }
}

/// Full known state of one class at a point in time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassSnapshot {
    #[serde(flatten)]
    pub spec: ClassSpec,
    #[serde(default)]
    pub results: Vec<ResultEntry>,
    #[serde(default)]
    pub total: Option<Measure>,
    #[serde(default)]
    pub final_grade: Option<String>,
}

impl ClassSnapshot {
    /// A class the user is enrolled in but for which nothing is known yet.
    pub fn empty(spec: ClassSpec) -> Self {
        Self {
            spec,
            results: Vec::new(),
            total: None,
            final_grade: None,
        }
    }

    pub fn with_results(spec: ClassSpec, results: Vec<ResultEntry>) -> Self {
        Self {
            results,
            ..Self::empty(spec)
        }
    }

    pub fn has_final_grade(&self) -> bool {
        self.final_grade.as_deref().is_some_and(|g| !g.is_empty())
    }
}
