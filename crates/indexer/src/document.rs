//! Metadata document assembly.

use crate::error::{IndexError, IndexResult};
use rlookup_core::hash::ContentHash;
use rlookup_core::repodata::PackageRecord;
use serde_json::{Map, Value};
use std::fs::{self, File};
use std::io::{BufRead, BufReader};
use std::path::Path;

/// Filename of the assembled document within the package workdir.
pub const METADATA_FILENAME: &str = "metadata.json";

/// Assemble the metadata document for one extracted package and write it to
/// `<dest_dir>/metadata.json`, returning the hex SHA-256 of the written
/// bytes.
///
/// Field precedence, later overriding earlier: manifest record fields,
/// per-subdirectory extras, the `id`, then the computed `paths`, `files`,
/// and `about` fields. `files` falls back to the `_path` field of the
/// `paths.json` entries when `info/files` is unreadable; when both
/// `info/files` and `info/paths.json` are unusable the build fails with
/// [`IndexError::MetadataIncomplete`].
pub fn build_document(
    dest_dir: &Path,
    id: &str,
    record: &PackageRecord,
    extra: &Map<String, Value>,
) -> IndexResult<String> {
    let mut doc = record.clone();
    for (key, value) in extra {
        doc.insert(key.clone(), value.clone());
    }
    doc.insert("id".to_string(), Value::String(id.to_string()));

    let paths_json = read_json_object(&dest_dir.join("info/paths.json"));
    let mut files = read_lines(&dest_dir.join("info/files"));

    if files.is_none() {
        files = paths_json
            .as_ref()
            .and_then(|obj| obj.get("paths"))
            .and_then(Value::as_array)
            .map(|paths| string_field_of_each(paths, "_path"));
        if files.is_none() && paths_json.is_none() {
            return Err(IndexError::MetadataIncomplete);
        }
    }

    if let Some(paths_obj) = &paths_json {
        if let Some(paths) = paths_obj.get("paths") {
            doc.insert("paths".to_string(), paths.clone());
        }
    }

    if let Some(files) = files {
        doc.insert(
            "files".to_string(),
            Value::Array(files.into_iter().map(Value::String).collect()),
        );
    }

    if let Some(mut about) = read_json_object(&dest_dir.join("info/about.json")) {
        // root_pkgs may be a list of objects; flatten to the dist names.
        if let Some(root_pkgs) = about.get("root_pkgs").and_then(Value::as_array).cloned() {
            let names = string_field_of_each(&root_pkgs, "dist_name");
            about.insert(
                "root_pkgs".to_string(),
                Value::Array(names.into_iter().map(Value::String).collect()),
            );
        }
        doc.insert("about".to_string(), Value::Object(about));
    }

    let bytes = serde_json::to_vec(&Value::Object(doc))?;
    let digest = ContentHash::compute(&bytes);
    fs::write(dest_dir.join(METADATA_FILENAME), &bytes)?;
    Ok(digest.to_hex())
}

/// Read a file as a JSON object; any open/parse failure yields `None`.
fn read_json_object(path: &Path) -> Option<Map<String, Value>> {
    let file = File::open(path).ok()?;
    serde_json::from_reader(BufReader::new(file)).ok()
}

/// Read a file as newline-delimited strings; any failure yields `None`.
fn read_lines(path: &Path) -> Option<Vec<String>> {
    let file = File::open(path).ok()?;
    let mut lines = Vec::new();
    for line in BufReader::new(file).lines() {
        lines.push(line.ok()?);
    }
    Some(lines)
}

/// Collect `field` from each object element; string elements pass through
/// unchanged, anything else is dropped. Order is preserved.
fn string_field_of_each(values: &[Value], field: &str) -> Vec<String> {
    values
        .iter()
        .filter_map(|value| match value {
            Value::Object(obj) => obj.get(field).and_then(Value::as_str).map(str::to_string),
            Value::String(s) => Some(s.clone()),
            _ => None,
        })
        .collect()
}
