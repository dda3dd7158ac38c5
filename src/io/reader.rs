use std::fs::File;
use std::io::Read;
use std::path::Path;

use serde_json::Value;

use crate::io::{Format, IoError, format_of};

/// Reads one JSON or YAML document. YAML is normalized into the JSON value model.
pub fn read_document<R: Read>(reader: R, format: Format) -> Result<Value, IoError> {
    match format {
        Format::Json => Ok(serde_json::from_reader(reader)?),
        Format::Yaml => {
            let yaml_value: serde_yaml::Value = serde_yaml::from_reader(reader)?;
            Ok(serde_json::to_value(yaml_value)?)
        }
    }
}

/// Opens `path` and reads it in the format implied by its extension.
pub fn read_document_file(path: &Path) -> Result<Value, IoError> {
    let format = format_of(path)?;
    let file = File::open(path).map_err(|source| IoError::Open {
        path: path.display().to_string(),
        source,
    })?;
    read_document(file, format)
}
