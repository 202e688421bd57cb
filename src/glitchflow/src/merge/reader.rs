use super::{MergeError, TriggerRecord, TRIGGER_FIELDS};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Regular files directly inside `dir`, in lexicographic filename order. Hidden files are
/// skipped. A missing directory has no results.
pub fn list_result_files(dir: &Path) -> Result<Vec<PathBuf>, MergeError> {
    if !dir.is_dir() {
        return Ok(Vec::new());
    }

    let mut files = Vec::new();
    for entry in WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name()
    {
        let entry = entry.map_err(|e| MergeError::Io {
            path: dir.to_path_buf(),
            source: e.into(),
        })?;
        let hidden = entry.file_name().to_string_lossy().starts_with('.');
        if entry.file_type().is_file() && !hidden {
            files.push(entry.into_path());
        }
    }
    Ok(files)
}

#[derive(Deserialize)]
struct ColumnarFile {
    triggers: BTreeMap<String, Vec<f64>>,
}

/// Reads one result file, checking that it carries every trigger field. Only columnar JSON
/// (`.json`) and whitespace tables (`.txt`) are understood.
pub fn read_result_file(path: &Path) -> Result<Vec<TriggerRecord>, MergeError> {
    let extension = path.extension().and_then(|ext| ext.to_str());
    if !matches!(extension, Some("json" | "txt")) {
        return Err(MergeError::UnsupportedFormat {
            path: path.to_path_buf(),
        });
    }

    let contents = std::fs::read_to_string(path).map_err(|source| MergeError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    let columns = match extension {
        Some("json") => {
            let file: ColumnarFile =
                serde_json::from_str(&contents).map_err(|source| MergeError::Json {
                    path: path.to_path_buf(),
                    source,
                })?;
            file.triggers
        }
        _ => parse_table(path, &contents)?,
    };

    records_from_columns(path, columns)
}

/// Parses a whitespace-delimited table. The last `#` line before the first row names the
/// columns.
fn parse_table(path: &Path, contents: &str) -> Result<BTreeMap<String, Vec<f64>>, MergeError> {
    let mut header: Option<Vec<String>> = None;
    let mut columns: Vec<Vec<f64>> = Vec::new();

    for (index, line) in contents.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if let Some(comment) = line.strip_prefix('#') {
            if columns.is_empty() {
                header = Some(comment.split_whitespace().map(str::to_string).collect());
            }
            continue;
        }

        let names = header.as_ref().ok_or_else(|| MergeError::MissingHeader {
            path: path.to_path_buf(),
        })?;
        if columns.is_empty() {
            columns = vec![Vec::new(); names.len()];
        }

        let values: Vec<&str> = line.split_whitespace().collect();
        if values.len() != names.len() {
            return Err(MergeError::InvalidRow {
                path: path.to_path_buf(),
                line: index + 1,
                reason: format!("{} values for {} columns", values.len(), names.len()),
            });
        }
        for (column, value) in columns.iter_mut().zip(values) {
            let parsed = value.parse::<f64>().map_err(|e| MergeError::InvalidRow {
                path: path.to_path_buf(),
                line: index + 1,
                reason: format!("`{value}`: {e}"),
            })?;
            column.push(parsed);
        }
    }

    let names = header.ok_or_else(|| MergeError::MissingHeader {
        path: path.to_path_buf(),
    })?;
    if columns.is_empty() {
        columns = vec![Vec::new(); names.len()];
    }
    Ok(names.into_iter().zip(columns).collect())
}

fn records_from_columns(
    path: &Path,
    mut columns: BTreeMap<String, Vec<f64>>,
) -> Result<Vec<TriggerRecord>, MergeError> {
    let mut ordered = Vec::with_capacity(TRIGGER_FIELDS.len());
    for field in TRIGGER_FIELDS {
        let column = columns.remove(field).ok_or_else(|| MergeError::MissingField {
            path: path.to_path_buf(),
            field,
        })?;
        ordered.push((field, column));
    }

    let expected = ordered[0].1.len();
    for &(field, ref column) in &ordered {
        if column.len() != expected {
            return Err(MergeError::LengthMismatch {
                path: path.to_path_buf(),
                field,
                expected,
                found: column.len(),
            });
        }
    }

    for &(field, ref column) in &ordered {
        if let Some(row) = column.iter().position(|value| !value.is_finite()) {
            return Err(MergeError::NonFinite {
                path: path.to_path_buf(),
                field,
                row,
            });
        }
    }

    Ok((0..expected)
        .map(|row| {
            let mut values = [0.0; 10];
            for (slot, (_, column)) in values.iter_mut().zip(&ordered) {
                *slot = column[row];
            }
            TriggerRecord::from_values(values)
        })
        .collect())
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    /// Writes a columnar JSON result file with `count` triggers starting at `t0`.
    pub(crate) fn write_json_result(path: &Path, t0: f64, count: usize) {
        let mut triggers = serde_json::Map::new();
        for (i, field) in TRIGGER_FIELDS.iter().enumerate() {
            let column: Vec<f64> = (0..count)
                .map(|n| match *field {
                    "tstart" => t0 + n as f64,
                    "tend" => t0 + n as f64 + 0.5,
                    _ => t0 + n as f64 + i as f64 / 10.0,
                })
                .collect();
            triggers.insert(field.to_string(), serde_json::json!(column));
        }
        let doc = serde_json::json!({ "triggers": triggers });
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, serde_json::to_vec(&doc).unwrap()).unwrap();
    }

    #[test]
    fn test_list_sorted_and_filtered() {
        let tmp = TempDir::new().unwrap();
        for name in ["H1-200.json", "H1-100.txt", ".H1-100.txt.swp", "H1-150.h5"] {
            fs::write(tmp.path().join(name), "").unwrap();
        }
        fs::create_dir(tmp.path().join("nested.json")).unwrap();

        let names: Vec<String> = list_result_files(tmp.path())
            .unwrap()
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, ["H1-100.txt", "H1-150.h5", "H1-200.json"]);
    }

    #[test]
    fn test_unknown_extension_rejected() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("H1-100.h5");
        fs::write(&path, b"\x89HDF\r\n").unwrap();
        assert!(matches!(
            read_result_file(&path).unwrap_err(),
            MergeError::UnsupportedFormat { .. }
        ));
    }

    #[test]
    fn test_non_finite_value_rejected() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("a.txt");
        fs::write(
            &path,
            format!(
                "# {}\n1 2 3 4 5 6 7 8 9 10\n1 2 3 4 5 6 7 8 9 inf\n",
                TRIGGER_FIELDS.join(" ")
            ),
        )
        .unwrap();

        let err = read_result_file(&path).unwrap_err();
        assert!(matches!(
            err,
            MergeError::NonFinite { field: "phase", row: 1, .. }
        ));
    }

    #[test]
    fn test_missing_directory_has_no_results() {
        let tmp = TempDir::new().unwrap();
        assert!(list_result_files(&tmp.path().join("absent")).unwrap().is_empty());
    }

    #[test]
    fn test_read_json() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("a.json");
        write_json_result(&path, 100.0, 3);

        let records = read_result_file(&path).unwrap();
        assert_eq!(records.len(), 3);
        assert_eq!(records[1].tstart, 101.0);
        assert_eq!(records[2].tend, 102.5);
    }

    #[test]
    fn test_read_table_uses_last_header_line() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("a.txt");
        fs::write(
            &path,
            "# produced by the trigger tool\n\
             # phase amplitude q snr fend fstart tend tstart frequency time\n\
             0.1 2.0 5.6 8.5 40 30 10.5 10.0 35 10.2\n\
             \n\
             0.2 3.0 6.6 9.5 50 40 20.5 20.0 45 20.2\n",
        )
        .unwrap();

        let records = read_result_file(&path).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].time, 10.2);
        assert_eq!(records[1].snr, 9.5);
        assert_eq!(records[1].phase, 0.2);
    }

    #[test]
    fn test_header_only_table_is_empty() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("a.txt");
        fs::write(&path, format!("# {}\n", TRIGGER_FIELDS.join(" "))).unwrap();
        assert!(read_result_file(&path).unwrap().is_empty());
    }

    #[test]
    fn test_missing_field_is_schema_error() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("a.json");
        fs::write(&path, r#"{"triggers": {"time": [1.0], "snr": [5.0]}}"#).unwrap();

        let err = read_result_file(&path).unwrap_err();
        assert!(matches!(err, MergeError::MissingField { field: "frequency", .. }));
    }

    #[test]
    fn test_ragged_columns_rejected() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("a.json");
        let mut triggers = serde_json::Map::new();
        for field in TRIGGER_FIELDS {
            let len = if field == "q" { 1 } else { 2 };
            triggers.insert(field.to_string(), serde_json::json!(vec![1.0; len]));
        }
        fs::write(&path, serde_json::json!({ "triggers": triggers }).to_string()).unwrap();

        let err = read_result_file(&path).unwrap_err();
        assert!(matches!(err, MergeError::LengthMismatch { field: "q", found: 1, .. }));
    }

    #[test]
    fn test_bad_table_row() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("a.txt");
        fs::write(&path, "# time snr\n1.0 abc\n").unwrap();
        assert!(matches!(
            read_result_file(&path).unwrap_err(),
            MergeError::InvalidRow { line: 2, .. }
        ));

        let headerless = tmp.path().join("b.txt");
        fs::write(&headerless, "1.0 2.0\n").unwrap();
        assert!(matches!(
            read_result_file(&headerless).unwrap_err(),
            MergeError::MissingHeader { .. }
        ));
    }
}
