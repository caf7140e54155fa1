use crate::error::EngineError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

/// Fixed-length numeric descriptor of one face. 128 values from the learned
/// embedder, 256 from the hand-crafted fallback.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Encoding(pub Vec<f32>);

impl Encoding {
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.0
    }
}

impl From<Vec<f32>> for Encoding {
    fn from(values: Vec<f32>) -> Self {
        Encoding(values)
    }
}

/// Identity label attached to a stored face. Enrolment databases carry
/// numeric row ids, imports carry names, so both spellings parse.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Identity {
    Number(i64),
    Text(String),
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Identity::Number(n) => write!(f, "{}", n),
            Identity::Text(s) => write!(f, "{}", s),
        }
    }
}

/// One stored enrolment row. Either field may be absent in exported data;
/// incomplete rows are skipped at match time rather than rejected.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KnownFace {
    #[serde(rename = "user_id", alias = "identity", default)]
    pub identity: Option<Identity>,
    #[serde(default)]
    pub encoding: Option<Encoding>,
}

/// Read one encoding from a JSON file holding a bare number array.
pub fn read_encoding(path: &Path) -> Result<Encoding, EngineError> {
    let raw = std::fs::read_to_string(path).map_err(|source| EngineError::FileRead {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&raw).map_err(|e| EngineError::InvalidJson {
        path: path.to_path_buf(),
        expected: "encoding array",
        message: e.to_string(),
    })
}

/// Read the stored face set from a JSON file holding an array of rows.
pub fn read_known_faces(path: &Path) -> Result<Vec<KnownFace>, EngineError> {
    let raw = std::fs::read_to_string(path).map_err(|source| EngineError::FileRead {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&raw).map_err(|e| EngineError::InvalidJson {
        path: path.to_path_buf(),
        expected: "known faces array",
        message: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn identity_parses_both_spellings() {
        let numeric: Identity = serde_json::from_str("42").unwrap();
        assert_eq!(numeric, Identity::Number(42));
        let textual: Identity = serde_json::from_str("\"alice\"").unwrap();
        assert_eq!(textual, Identity::Text("alice".to_string()));
    }

    #[test]
    fn encoding_serializes_as_bare_array() {
        let enc = Encoding(vec![1.0, 2.5]);
        assert_eq!(serde_json::to_string(&enc).unwrap(), "[1.0,2.5]");
    }

    #[test]
    fn known_face_rows_tolerate_missing_fields() {
        let rows: Vec<KnownFace> = serde_json::from_str(
            r#"[
                {"user_id": 7, "encoding": [0.5, 0.5]},
                {"user_id": "bob"},
                {"encoding": [1.0]},
                {"identity": "carol", "encoding": [1.0]},
                {}
            ]"#,
        )
        .unwrap();
        assert_eq!(rows.len(), 5);
        assert_eq!(rows[0].identity, Some(Identity::Number(7)));
        assert!(rows[1].encoding.is_none());
        assert!(rows[2].identity.is_none());
        assert_eq!(rows[3].identity, Some(Identity::Text("carol".to_string())));
        assert!(rows[4].identity.is_none() && rows[4].encoding.is_none());
    }

    #[test]
    fn read_known_faces_surfaces_parse_errors() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "{{\"not\": \"an array\"}}").unwrap();
        let err = read_known_faces(file.path()).unwrap_err();
        assert!(matches!(err, EngineError::InvalidJson { .. }));
    }

    #[test]
    fn read_encoding_round_trips() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "[0.25, -1.0, 3.5]").unwrap();
        let enc = read_encoding(file.path()).unwrap();
        assert_eq!(enc.as_slice(), &[0.25, -1.0, 3.5]);
    }

    #[test]
    fn missing_file_reports_the_path() {
        let err = read_encoding(Path::new("/nonexistent/enc.json")).unwrap_err();
        match err {
            EngineError::FileRead { path, .. } => {
                assert_eq!(path, Path::new("/nonexistent/enc.json"))
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }
}
