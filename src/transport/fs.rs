use serde::Serialize;
use serde::de::DeserializeOwned;
use std::fs;
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::debug;
use walkdir::WalkDir;

use crate::constants::datasets::{PROCESSED_FILE_SUFFIX, RAW_FILE_SUFFIX};
use crate::errors::PipelineError;
use crate::source::SourceKind;

/// Which stage of the acquisition flow produced a dataset file.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DatasetStage {
    /// Raw acquisition dump (`<source_id>_data.json`).
    Raw,
    /// Flattened, column-selected dataset (`<source_id>_processed_data.json`).
    Processed,
}

/// A dataset file found under a data directory.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DatasetFile {
    /// Source the file belongs to.
    pub kind: SourceKind,
    /// Raw dump or processed dataset.
    pub stage: DatasetStage,
    /// Location on disk.
    pub path: PathBuf,
    /// File size.
    pub bytes: u64,
}

/// Path of the processed dataset for `kind` under `data_dir`.
pub fn processed_path(data_dir: &Path, kind: SourceKind) -> PathBuf {
    data_dir.join(format!("{}{}", kind.source_id(), PROCESSED_FILE_SUFFIX))
}

/// Path of the raw acquisition dump for `kind` under `data_dir`.
pub fn raw_path(data_dir: &Path, kind: SourceKind) -> PathBuf {
    data_dir.join(format!("{}{}", kind.source_id(), RAW_FILE_SUFFIX))
}

/// Read and deserialize a JSON file.
pub fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, PipelineError> {
    let file = fs::File::open(path)?;
    let value = serde_json::from_reader(BufReader::new(file))?;
    Ok(value)
}

/// Serialize `value` as pretty JSON, writing through a temp file and renaming into place.
pub fn write_json_pretty<T: Serialize + ?Sized>(
    path: &Path,
    value: &T,
) -> Result<(), PipelineError> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent)?;
    }
    let tmp = path.with_extension("json.tmp");
    {
        let file = fs::File::create(&tmp)?;
        let mut writer = BufWriter::new(file);
        serde_json::to_writer_pretty(&mut writer, value)?;
        writer.flush()?;
    }
    fs::rename(&tmp, path)?;
    debug!(path = %path.display(), "wrote json dataset");
    Ok(())
}

/// List dataset files directly under `data_dir`, sorted by path.
///
/// Files whose names do not match a known `<source_id>` prefix are ignored.
/// A missing directory yields an empty list.
pub fn discover_datasets(data_dir: &Path) -> Vec<DatasetFile> {
    let mut found = Vec::new();
    for entry in WalkDir::new(data_dir)
        .max_depth(1)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|entry| entry.file_type().is_file())
    {
        let Some(name) = entry.file_name().to_str() else {
            continue;
        };
        let Some((kind, stage)) = classify_file_name(name) else {
            continue;
        };
        let bytes = entry.metadata().map(|meta| meta.len()).unwrap_or(0);
        found.push(DatasetFile {
            kind,
            stage,
            path: entry.path().to_path_buf(),
            bytes,
        });
    }
    found.sort_by(|a, b| a.path.cmp(&b.path));
    found
}

fn classify_file_name(name: &str) -> Option<(SourceKind, DatasetStage)> {
    // Processed suffix also ends with the raw suffix, so check it first.
    if let Some(source_id) = name.strip_suffix(PROCESSED_FILE_SUFFIX) {
        return SourceKind::from_source_id(source_id).map(|kind| (kind, DatasetStage::Processed));
    }
    name.strip_suffix(RAW_FILE_SUFFIX)
        .and_then(SourceKind::from_source_id)
        .map(|kind| (kind, DatasetStage::Raw))
}
