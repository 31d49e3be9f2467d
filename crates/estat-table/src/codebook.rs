//! Code → label dictionaries for the classification axes of one dataset

use rustc_hash::FxHashMap;

use estat_fetch::ClassObj;

#[derive(Debug, Clone, Default)]
struct Axis {
    name: String,
    labels: FxHashMap<String, String>,
}

/// All classification axes of a dataset, keyed by axis id (`area`, `time`, ...).
///
/// Axis ids equal the column names of the flattened table once the `@`
/// marker is stripped, so lookups are column-local.
#[derive(Debug, Clone, Default)]
pub struct CodeBook {
    axes: FxHashMap<String, Axis>,
}

impl CodeBook {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from the `CLASS_INF.CLASS_OBJ` block of the first page.
    pub fn from_axes(axes: &[ClassObj]) -> Self {
        let mut book = Self::new();
        for axis in axes {
            book.insert_axis(
                &axis.id,
                &axis.name,
                axis.class
                    .as_slice()
                    .iter()
                    .map(|c| (c.code.as_str(), c.name.as_str())),
            );
        }
        book
    }

    /// Add (or replace) one axis.
    pub fn insert_axis<'a>(
        &mut self,
        id: &str,
        name: &str,
        codes: impl IntoIterator<Item = (&'a str, &'a str)>,
    ) {
        let labels = codes
            .into_iter()
            .map(|(code, label)| (code.to_string(), label.to_string()))
            .collect();
        self.axes.insert(
            id.to_string(),
            Axis {
                name: name.to_string(),
                labels,
            },
        );
    }

    pub fn len(&self) -> usize {
        self.axes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.axes.is_empty()
    }

    /// Display name of the axis behind `column`, if it is a coded axis.
    pub fn axis_name(&self, column: &str) -> Option<&str> {
        self.axes.get(column).map(|a| a.name.as_str())
    }

    /// Label for `code` in `column`; anything unknown passes through unchanged.
    pub fn resolve<'a>(&'a self, column: &str, code: &'a str) -> &'a str {
        self.axes
            .get(column)
            .and_then(|a| a.labels.get(code))
            .map_or(code, String::as_str)
    }

    /// Header cell for `column`: the axis display name, or the column itself.
    pub fn header<'a>(&'a self, column: &'a str) -> &'a str {
        self.axis_name(column).unwrap_or(column)
    }
}
