use std::str::FromStr;

use estat_core::{EstatError, Result};

/// Group-wise reduction applied to every value column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Aggregate {
    Sum,
    Min,
    Max,
    Median,
    /// Non-empty cells per group
    Count,
    /// Sample variance
    Var,
    /// Sample standard deviation
    Std,
    Mean,
}

impl Aggregate {
    /// Parse an optional keyword; the empty string means no reduction.
    pub fn parse_optional(s: &str) -> Result<Option<Self>> {
        if s.is_empty() {
            Ok(None)
        } else {
            s.parse().map(Some)
        }
    }

    pub fn keyword(self) -> &'static str {
        match self {
            Self::Sum => "sum",
            Self::Min => "min",
            Self::Max => "max",
            Self::Median => "median",
            Self::Count => "count",
            Self::Var => "var",
            Self::Std => "std",
            Self::Mean => "mean",
        }
    }
}

impl FromStr for Aggregate {
    type Err = EstatError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "sum" => Ok(Self::Sum),
            "min" => Ok(Self::Min),
            "max" => Ok(Self::Max),
            "median" => Ok(Self::Median),
            "count" => Ok(Self::Count),
            "var" => Ok(Self::Var),
            "std" => Ok(Self::Std),
            "mean" => Ok(Self::Mean),
            other => Err(EstatError::Aggregation(other.to_string())),
        }
    }
}

/// Grouping requested for a merge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GroupBy {
    /// Plain union, no grouping
    All,
    Columns(Vec<String>),
}

impl FromStr for GroupBy {
    type Err = EstatError;

    fn from_str(s: &str) -> Result<Self> {
        if s == "all" {
            return Ok(Self::All);
        }
        let columns: Vec<String> = s.split(',').map(|c| c.trim().to_string()).collect();
        if columns.iter().any(String::is_empty) {
            return Err(EstatError::validation(format!("invalid group-by: {s:?}")));
        }
        Ok(Self::Columns(columns))
    }
}

/// DuckDB resources for the aggregation step.
#[derive(Debug, Clone)]
pub struct MergeConfig {
    /// DuckDB memory limit (e.g. "1GB")
    pub memory_limit: String,
    pub threads: usize,
}

impl Default for MergeConfig {
    fn default() -> Self {
        Self {
            memory_limit: "1GB".to_string(),
            threads: std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(4),
        }
    }
}
