use std::fs;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use polars::prelude::*;
use regex::Regex;

use crate::models::{ComparatorError, Result};

static PROTEIN_PREFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([^_]+)_").expect("valid literal pattern"));

/// Recovers the protein identifier from a report filename.
///
/// The convention is `<protein-id>_<...>`: everything before the first
/// underscore names the sequence used for consensus mapping. A filename
/// without the underscore delimiter is rejected rather than sliced
/// best-effort.
pub fn protein_from_filename(path: &Path) -> Result<String> {
    let name = path.file_name().and_then(|n| n.to_str()).ok_or_else(|| {
        ComparatorError::format(path.display().to_string(), "not a valid file name")
    })?;

    match PROTEIN_PREFIX.captures(name) {
        Some(caps) => Ok(caps[1].to_string()),
        None => Err(ComparatorError::format(
            path.display().to_string(),
            "filename does not follow the <protein>_<...> convention",
        )),
    }
}

/// Lists report files in `dir` whose names contain `pattern`.
///
/// Sorted by path so batch runs visit files in a stable order.
pub fn find_reports(dir: &Path, pattern: &str) -> Result<Vec<PathBuf>> {
    let mut reports = Vec::new();
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if !path.is_file() {
            continue;
        }
        let name = match path.file_name().and_then(|n| n.to_str()) {
            Some(n) => n,
            None => continue,
        };
        if name.contains(pattern) && name.ends_with(".txt") {
            reports.push(path);
        }
    }
    reports.sort();
    Ok(reports)
}

/// Writes a results table as tab-separated text with a header row.
pub fn dataframe_to_tsv(df: &mut DataFrame, path: &Path) -> PolarsResult<()> {
    let mut file = fs::File::create(path)?;
    CsvWriter::new(&mut file)
        .include_header(true)
        .with_separator(b'\t')
        .finish(df)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn protein_prefix_is_text_before_first_underscore() {
        let path = Path::new("/data/reports/EPI242227__H5.3.pdb_contacts.txt");
        assert_eq!(protein_from_filename(path).unwrap(), "EPI242227");
    }

    #[test]
    fn filename_without_underscore_is_rejected() {
        let err = protein_from_filename(Path::new("reference.txt")).unwrap_err();
        assert!(matches!(err, ComparatorError::Format { .. }));
        assert!(protein_from_filename(Path::new("_leading.txt")).is_err());
    }

    #[test]
    fn find_reports_filters_and_sorts() {
        let dir = tempfile::tempdir().unwrap();
        for name in [
            "EPI333_b__mAb1.txt",
            "EPI111_a__mAb1.txt",
            "EPI222_c__other.txt",
            "EPI444_d__mAb1.csv",
        ] {
            fs::write(dir.path().join(name), "x").unwrap();
        }

        let found = find_reports(dir.path(), "mAb1").unwrap();
        let names: Vec<_> = found
            .iter()
            .map(|p| p.file_name().unwrap().to_str().unwrap().to_string())
            .collect();
        assert_eq!(names, vec!["EPI111_a__mAb1.txt", "EPI333_b__mAb1.txt"]);
    }

    #[test]
    fn tsv_export_uses_tabs() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("scores.tsv");
        let mut df = df!(
            "protein" => &["EPI111", "EPI222"],
            "ged" => &[4.0, 7.5],
        )
        .unwrap();

        dataframe_to_tsv(&mut df, &out).unwrap();
        let text = fs::read_to_string(&out).unwrap();
        let mut lines = text.lines();
        assert_eq!(lines.next().unwrap(), "protein\tged");
        assert_eq!(lines.next().unwrap(), "EPI111\t4.0");
    }
}
