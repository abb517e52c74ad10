//! In-memory table for one input file: a polars DataFrame plus the name it came from.

use polars::prelude::*;

/// Coarse type tag for a column, fixed by the dtype chosen at load time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    Numeric,
    Text,
    Boolean,
    Temporal,
    Other,
}

impl ColumnKind {
    pub fn from_dtype(dtype: &DataType) -> Self {
        if dtype.is_numeric() {
            return Self::Numeric;
        }
        match dtype {
            DataType::String => Self::Text,
            DataType::Boolean => Self::Boolean,
            DataType::Date | DataType::Datetime(_, _) | DataType::Time | DataType::Duration(_) => {
                Self::Temporal
            }
            _ => Self::Other,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Numeric => "numeric",
            Self::Text => "text",
            Self::Boolean => "boolean",
            Self::Temporal => "temporal",
            Self::Other => "other",
        }
    }
}

#[derive(Debug, Clone)]
pub struct Table {
    /// Name of the file the table was loaded from (used for output naming and messages).
    pub source_name: String,
    pub df: DataFrame,
}

impl Table {
    pub fn new(source_name: impl Into<String>, df: DataFrame) -> Self {
        Self {
            source_name: source_name.into(),
            df,
        }
    }

    pub fn height(&self) -> usize {
        self.df.height()
    }

    pub fn width(&self) -> usize {
        self.df.width()
    }

    pub fn column_names(&self) -> Vec<String> {
        self.df
            .get_column_names()
            .into_iter()
            .map(|n| n.to_string())
            .collect()
    }

    /// Column names paired with their type tag, in table order.
    pub fn column_kinds(&self) -> Vec<(String, ColumnKind)> {
        self.df
            .get_columns()
            .iter()
            .map(|c| (c.name().to_string(), ColumnKind::from_dtype(c.dtype())))
            .collect()
    }

    /// Names of the numeric columns, in table order.
    pub fn numeric_columns(&self) -> Vec<String> {
        self.column_kinds()
            .into_iter()
            .filter(|(_, kind)| *kind == ColumnKind::Numeric)
            .map(|(name, _)| name)
            .collect()
    }

    /// First `n` rows, for display.
    pub fn preview(&self, n: usize) -> DataFrame {
        self.df.head(Some(n))
    }

    /// Run a lazy transformation over the table's frame and store the result.
    pub(crate) fn apply_lazy<F>(&mut self, f: F) -> PolarsResult<()>
    where
        F: FnOnce(LazyFrame) -> LazyFrame,
    {
        let df = std::mem::take(&mut self.df);
        self.df = f(df.lazy()).collect()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn column_kinds_follow_dtypes() {
        let df = df!(
            "i" => &[1i64, 2],
            "f" => &[1.5f64, 2.5],
            "s" => &["a", "b"],
            "b" => &[true, false]
        )
        .unwrap();
        let table = Table::new("t.csv", df);
        let kinds: Vec<ColumnKind> = table.column_kinds().into_iter().map(|(_, k)| k).collect();
        assert_eq!(
            kinds,
            vec![
                ColumnKind::Numeric,
                ColumnKind::Numeric,
                ColumnKind::Text,
                ColumnKind::Boolean
            ]
        );
        assert_eq!(table.numeric_columns(), vec!["i".to_string(), "f".to_string()]);
    }

    #[test]
    fn preview_limits_rows() {
        let df = df!("x" => (0..20).collect::<Vec<i32>>()).unwrap();
        let table = Table::new("t.csv", df);
        assert_eq!(table.preview(5).height(), 5);
        assert_eq!(table.height(), 20);
    }

    #[test]
    fn apply_lazy_replaces_frame() {
        let df = df!("x" => &[3i64, 1, 2]).unwrap();
        let mut table = Table::new("t.csv", df);
        table
            .apply_lazy(|lf| lf.filter(col("x").gt(lit(1))))
            .unwrap();
        assert_eq!(table.height(), 2);
    }
}
