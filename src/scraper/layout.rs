use crate::domain::{CrawlError, Measure, ResultEntry};
use crate::scraper::site::NOT_AVAILABLE;

/// Column positions of one table layout. `None` means the site omitted
/// that column for this class.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct ColumnMap {
    result: Option<usize>,
    average: Option<usize>,
    std_dev: Option<usize>,
    weighted_result: Option<usize>,
    weighted_average: Option<usize>,
    weighted_std_dev: Option<usize>,
}

/// Shape of a results table, keyed by the number of header columns.
///
/// The site drops columns that have no data, so the same page can come
/// in four widths depending on the class.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnLayout {
    /// name, result, weighted result
    ResultOnly,
    /// name, result, average, weighted result, weighted average
    WithAverage,
    /// name, then result/average/std-dev for normal and weighted
    WithStdDev,
    /// same as `WithStdDev` with an extra column before the weighted block
    Full,
}

impl ColumnLayout {
    pub fn from_header_count(count: usize) -> Result<Self, CrawlError> {
        match count {
            3 => Ok(Self::ResultOnly),
            5 => Ok(Self::WithAverage),
            7 => Ok(Self::WithStdDev),
            9 => Ok(Self::Full),
            other => Err(CrawlError::UnknownLayout(other)),
        }
    }

    pub fn header_count(self) -> usize {
        match self {
            Self::ResultOnly => 3,
            Self::WithAverage => 5,
            Self::WithStdDev => 7,
            Self::Full => 9,
        }
    }

    fn columns(self) -> ColumnMap {
        match self {
            Self::ResultOnly => ColumnMap {
                result: Some(1),
                average: None,
                std_dev: None,
                weighted_result: Some(2),
                weighted_average: None,
                weighted_std_dev: None,
            },
            Self::WithAverage => ColumnMap {
                result: Some(1),
                average: Some(2),
                std_dev: None,
                weighted_result: Some(3),
                weighted_average: Some(4),
                weighted_std_dev: None,
            },
            Self::WithStdDev => ColumnMap {
                result: Some(1),
                average: Some(2),
                std_dev: Some(3),
                weighted_result: Some(4),
                weighted_average: Some(5),
                weighted_std_dev: Some(6),
            },
            Self::Full => ColumnMap {
                result: Some(1),
                average: Some(2),
                std_dev: Some(3),
                weighted_result: Some(5),
                weighted_average: Some(6),
                weighted_std_dev: Some(7),
            },
        }
    }

    /// Normal measure of a row; used for data rows and the total row.
    pub fn normal(self, cells: &[String]) -> Measure {
        let map = self.columns();
        Measure::new(
            cell_at(cells, map.result),
            cell_at(cells, map.average),
            cell_at(cells, map.std_dev),
        )
    }

    pub fn weighted(self, cells: &[String]) -> Measure {
        let map = self.columns();
        Measure::new(
            cell_at(cells, map.weighted_result),
            cell_at(cells, map.weighted_average),
            cell_at(cells, map.weighted_std_dev),
        )
    }

    pub fn entry(self, cells: &[String]) -> ResultEntry {
        ResultEntry {
            name: cells.first().cloned().unwrap_or_default(),
            normal: self.normal(cells),
            weighted: self.weighted(cells),
        }
    }
}

fn cell_at(cells: &[String], index: Option<usize>) -> String {
    index
        .and_then(|i| cells.get(i))
        .cloned()
        .unwrap_or_else(|| NOT_AVAILABLE.to_string())
}
