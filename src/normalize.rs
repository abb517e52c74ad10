//! Column-name normalization: trim surrounding whitespace and escape `:`.
//!
//! A name that already contains `\:` is escaped again; callers that normalize twice get
//! `\\:`. Only literal colons are rewritten, so normalizing is not idempotent on such names.

use std::collections::HashSet;

use tracing::debug;

use crate::error::Result;
use crate::table::Table;

/// Normalize a single column name.
pub fn normalize_name(name: &str) -> String {
    name.trim().replace(':', "\\:")
}

/// Normalize every name, then make collisions unique with [`unique_names`].
pub fn normalized_names<S: AsRef<str>>(names: &[S]) -> Vec<String> {
    unique_names(names.iter().map(|n| normalize_name(n.as_ref())).collect())
}

/// Make names unique by appending `_2`, `_3`, ... to later occurrences.
pub fn unique_names(names: Vec<String>) -> Vec<String> {
    let mut taken: HashSet<String> = HashSet::with_capacity(names.len());
    let mut out = Vec::with_capacity(names.len());
    for name in names {
        if taken.insert(name.clone()) {
            out.push(name);
            continue;
        }
        let mut n = 2;
        let unique = loop {
            let candidate = format!("{}_{}", name, n);
            if !taken.contains(&candidate) {
                break candidate;
            }
            n += 1;
        };
        taken.insert(unique.clone());
        out.push(unique);
    }
    out
}

/// Rename the table's columns in place. Data is untouched.
pub fn normalize_columns(table: &mut Table) -> Result<()> {
    let before = table.column_names();
    let after = normalized_names(&before);
    if before == after {
        return Ok(());
    }
    for (old, new) in before.iter().zip(&after) {
        if old != new {
            debug!(from = %old, to = %new, "renamed column");
        }
    }
    table.df.set_column_names(after.iter().map(|s| s.as_str()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use polars::prelude::*;

    #[test]
    fn trims_and_escapes() {
        assert_eq!(normalize_name("  Total: EUR "), "Total\\: EUR");
        assert_eq!(normalize_name("a:b:c"), "a\\:b\\:c");
        assert_eq!(normalize_name("plain"), "plain");
    }

    #[test]
    fn already_escaped_names_are_escaped_again() {
        assert_eq!(normalize_name("a\\:b"), "a\\\\:b");
    }

    #[test]
    fn collisions_get_suffixes() {
        let names = normalized_names(&[" id", "id ", "id_2", "id"]);
        assert_eq!(names, vec!["id", "id_2", "id_2_2", "id_3"]);
    }

    #[test]
    fn unique_names_keeps_first_occurrence() {
        let names = unique_names(vec!["a".into(), "b".into(), "a".into()]);
        assert_eq!(names, vec!["a", "b", "a_2"]);
    }

    #[test]
    fn normalize_columns_keeps_data() {
        let df = df!(" a " => &[1i64, 2], "b:c" => &["x", "y"]).unwrap();
        let mut table = Table::new("t.csv", df);
        normalize_columns(&mut table).unwrap();
        assert_eq!(table.column_names(), vec!["a", "b\\:c"]);
        assert_eq!(table.df.column("a").unwrap().i64().unwrap().get(1), Some(2));
    }

    #[test]
    fn output_has_no_untrimmed_or_unescaped_names() {
        let raw = ["\tleft", "right  ", " both: sides ", "x:y"];
        for name in normalized_names(&raw) {
            assert_eq!(name, name.trim());
            let bytes = name.as_bytes();
            for (i, b) in bytes.iter().enumerate() {
                if *b == b':' {
                    assert!(i > 0 && bytes[i - 1] == b'\\', "unescaped colon in {}", name);
                }
            }
        }
    }
}
