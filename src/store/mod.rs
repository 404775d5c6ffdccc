//! Raw and tabular persistence.
//!
//! Both stores write whole files: every save replaces the previous content for
//! its `(source, identifier)` pair via a temp file and rename in the same
//! directory.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::errors::IngestError;

/// Verbatim JSON payload store.
pub mod raw;
/// Flattened Parquet table store.
pub mod tabular;

pub use self::tabular::TableStore;
pub use self::raw::RawStore;

pub(crate) fn source_path(root: &Path, source: &str, identifier: &str, extension: &str) -> PathBuf {
    root.join(source).join(format!("{identifier}.{extension}"))
}

pub(crate) fn ensure_parent_dir(path: &Path) -> Result<(), IngestError> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent)?;
    }
    Ok(())
}

pub(crate) fn temp_sibling(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|name| name.to_os_string())
        .unwrap_or_default();
    name.push(format!(".{}.tmp", std::process::id()));
    path.with_file_name(name)
}

pub(crate) fn atomic_write(path: &Path, bytes: &[u8]) -> Result<(), IngestError> {
    ensure_parent_dir(path)?;
    let tmp = temp_sibling(path);
    let result = (|| -> Result<(), IngestError> {
        let mut file = fs::File::create(&tmp)?;
        file.write_all(bytes)?;
        file.sync_all()?;
        fs::rename(&tmp, path)?;
        Ok(())
    })();
    if result.is_err() {
        let _ = fs::remove_file(&tmp);
    }
    result
}
