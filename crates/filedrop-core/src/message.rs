use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Descriptor published to the queue after a successful upload.
///
/// Serializes to a flat JSON object. `file_name` is always the basename of
/// the uploaded file, never the local path used for the upload. Ad-hoc
/// caller-supplied pairs are flattened into the same object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DescriptorMessage {
    pub file_name: String,
    pub company_name: String,
    pub file_type: String,
    pub data_type: String,
    pub load_id: i64,
    pub file_sub_type: String,
    pub bucket_name: String,
    pub folder_name: String,
    pub original_file_name: String,

    #[serde(flatten)]
    pub extras: BTreeMap<String, String>,
}

/// One upload attempt: where a local file goes in the object store.
/// Built per attempt and immutable once built.
#[derive(Debug, Clone)]
pub struct UploadDescriptor {
    pub local_path: PathBuf,
    pub bucket: String,
    pub folder: String,
}

impl UploadDescriptor {
    pub fn new(local_path: impl Into<PathBuf>, bucket: impl Into<String>, folder: impl Into<String>) -> Self {
        Self {
            local_path: local_path.into(),
            bucket: bucket.into(),
            folder: folder.into(),
        }
    }

    /// Remote key: `folder/basename`, or just the basename when no folder
    /// is configured.
    pub fn remote_key(&self) -> String {
        let name = file_basename(&self.local_path);
        if self.folder.is_empty() {
            name
        } else {
            format!("{}/{}", self.folder.trim_end_matches('/'), name)
        }
    }
}

/// Where an upload actually landed. The publish message is built from this
/// receipt rather than from a configuration snapshot.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredObject {
    pub bucket: String,
    pub folder: String,
    pub key: String,
}

/// Basename of a path as a string, empty when the path has no file name.
pub fn file_basename(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn remote_key_joins_folder_and_basename() {
        let descriptor = UploadDescriptor::new("/tmp/data/report.csv", "data-bucket", "incoming");
        assert_eq!(descriptor.remote_key(), "incoming/report.csv");
    }

    #[test]
    fn remote_key_without_folder_is_basename() {
        let descriptor = UploadDescriptor::new("/tmp/data/report.csv", "data-bucket", "");
        assert_eq!(descriptor.remote_key(), "report.csv");
    }

    #[test]
    fn remote_key_tolerates_trailing_slash_in_folder() {
        let descriptor = UploadDescriptor::new("report.csv", "data-bucket", "incoming/");
        assert_eq!(descriptor.remote_key(), "incoming/report.csv");
    }

    #[test]
    fn message_serializes_flat_with_extras() {
        let mut extras = BTreeMap::new();
        extras.insert("loadType".to_string(), "full".to_string());

        let message = DescriptorMessage {
            file_name: "report.csv".to_string(),
            company_name: "generic".to_string(),
            file_type: "sales".to_string(),
            data_type: "csv".to_string(),
            load_id: 1,
            file_sub_type: String::new(),
            bucket_name: "data-bucket".to_string(),
            folder_name: "incoming".to_string(),
            original_file_name: String::new(),
            extras,
        };

        let value = serde_json::to_value(&message).unwrap();
        assert_eq!(value["file_name"], json!("report.csv"));
        assert_eq!(value["load_id"], json!(1));
        assert_eq!(value["loadType"], json!("full"));
        // Flat object, no nesting for extras
        assert!(value.get("extras").is_none());
    }

    #[test]
    fn basename_strips_directories() {
        assert_eq!(file_basename(Path::new("/home/user/Downloads/report.csv")), "report.csv");
        assert_eq!(file_basename(Path::new("report.csv")), "report.csv");
    }
}
