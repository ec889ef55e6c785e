//! Collection files: concatenated BSON documents.
//!
//! Each document carries its own little-endian `i32` length prefix, so a
//! file is read by walking the prefixes. Writes go to a temporary sibling
//! that is fsynced and renamed over the target.

use crate::error::StoreError;
use bson::{RawDocument, RawDocumentBuf};
use std::ffi::OsString;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

/// Smallest valid document: length prefix plus the trailing NUL.
const MIN_DOCUMENT_LEN: usize = 5;

/// Split a collection file into documents, validating each frame.
pub fn read_documents(path: &Path, bytes: &[u8]) -> Result<Vec<RawDocumentBuf>, StoreError> {
    let corrupt = |offset: usize, message: String| StoreError::Corrupt {
        path: path.display().to_string(),
        message: format!("offset {offset}: {message}"),
    };

    let mut docs = Vec::new();
    let mut offset = 0usize;
    while offset < bytes.len() {
        let Some(prefix) = bytes.get(offset..offset + 4) else {
            return Err(corrupt(offset, "truncated length prefix".to_string()));
        };
        let declared = i32::from_le_bytes([prefix[0], prefix[1], prefix[2], prefix[3]]);
        let len = usize::try_from(declared).unwrap_or(0);
        if len < MIN_DOCUMENT_LEN {
            return Err(corrupt(offset, format!("invalid document length {declared}")));
        }
        let Some(frame) = bytes.get(offset..offset + len) else {
            return Err(corrupt(
                offset,
                format!("document length {len} runs past end of file"),
            ));
        };
        let doc = RawDocumentBuf::from_bytes(frame.to_vec())
            .map_err(|e| corrupt(offset, e.to_string()))?;
        validate_elements(&doc).map_err(|message| corrupt(offset, message))?;
        docs.push(doc);
        offset += len;
    }
    Ok(docs)
}

/// Read a collection file. A missing file is an empty collection.
pub fn read_documents_from_path(path: &Path) -> Result<Vec<RawDocumentBuf>, StoreError> {
    match fs::read(path) {
        Ok(bytes) => read_documents(path, &bytes),
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(Vec::new()),
        Err(err) => Err(StoreError::io(path.display(), err)),
    }
}

/// Write documents to `path`, replacing it atomically.
pub fn write_documents_to_path<'a>(
    path: &Path,
    docs: impl IntoIterator<Item = &'a RawDocument>,
) -> Result<(), StoreError> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent).map_err(|e| StoreError::io(parent.display(), e))?;
    }

    let tmp_path = tmp_write_path(path);
    let write_result = (|| -> Result<(), StoreError> {
        let file = File::create(&tmp_path).map_err(|e| StoreError::io(tmp_path.display(), e))?;
        let mut writer = BufWriter::new(file);
        for doc in docs {
            writer
                .write_all(doc.as_bytes())
                .map_err(|e| StoreError::io(tmp_path.display(), e))?;
        }
        let file = writer
            .into_inner()
            .map_err(|e| StoreError::io(tmp_path.display(), e))?;
        file.sync_all()
            .map_err(|e| StoreError::io(tmp_path.display(), e))?;
        Ok(())
    })();

    if let Err(error) = write_result {
        let _ = fs::remove_file(&tmp_path);
        return Err(error);
    }

    fs::rename(&tmp_path, path).map_err(|e| {
        let _ = fs::remove_file(&tmp_path);
        StoreError::io(
            format!("{} -> {}", tmp_path.display(), path.display()),
            e,
        )
    })?;

    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        let dir = File::open(parent).map_err(|e| StoreError::io(parent.display(), e))?;
        dir.sync_all()
            .map_err(|e| StoreError::io(parent.display(), e))?;
    }

    Ok(())
}

fn validate_elements(doc: &RawDocument) -> Result<(), String> {
    for element in doc {
        element.map_err(|e| e.to_string())?;
    }
    Ok(())
}

fn tmp_write_path(path: &Path) -> PathBuf {
    let unique = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos();
    let mut tmp: OsString = path.as_os_str().to_os_string();
    tmp.push(format!(".tmp.{}.{}", std::process::id(), unique));
    PathBuf::from(tmp)
}

#[cfg(test)]
mod tests {
    use super::*;
    use bson::doc;

    fn raw(doc: bson::Document) -> RawDocumentBuf {
        RawDocumentBuf::from_document(&doc).expect("raw")
    }

    fn concat(docs: &[RawDocumentBuf]) -> Vec<u8> {
        docs.iter().flat_map(|doc| doc.as_bytes().to_vec()).collect()
    }

    #[test]
    fn frames_are_split_on_length_prefixes() {
        let docs = vec![
            raw(doc! { "_id": "a", "n": 1_i64 }),
            raw(doc! { "_id": "b", "nested": { "x": true } }),
        ];
        let read = read_documents(Path::new("t.bson"), &concat(&docs)).expect("read");
        assert_eq!(read, docs);
        assert!(
            read_documents(Path::new("t.bson"), &[])
                .expect("empty")
                .is_empty()
        );
    }

    #[test]
    fn truncated_files_are_corrupt() {
        let bytes = concat(&[raw(doc! { "_id": "a" })]);
        let err = read_documents(Path::new("t.bson"), &bytes[..bytes.len() - 1])
            .expect_err("truncated");
        assert!(matches!(err, StoreError::Corrupt { .. }), "{err}");

        let err = read_documents(Path::new("t.bson"), &[1, 0]).expect_err("short prefix");
        assert!(err.to_string().contains("truncated length prefix"), "{err}");
    }

    #[test]
    fn nonsense_lengths_are_corrupt() {
        let err = read_documents(Path::new("t.bson"), &[0xff, 0xff, 0xff, 0xff, 0])
            .expect_err("negative length");
        assert!(err.to_string().contains("invalid document length -1"), "{err}");
    }
}
