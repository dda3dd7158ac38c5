pub mod error;
pub mod reader;

use std::fmt;
use std::path::Path;
use std::str::FromStr;

pub use error::IoError;

/// Definition and response document formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Json,
    Yaml,
}

impl Format {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Json => "json",
            Self::Yaml => "yaml",
        }
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Format {
    type Err = IoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "json" => Ok(Self::Json),
            "yaml" | "yml" => Ok(Self::Yaml),
            other => Err(IoError::UnsupportedFormat {
                format: other.to_string(),
            }),
        }
    }
}

/// Format implied by the extension of `path`, case-insensitively.
pub fn format_of(path: &Path) -> Result<Format, IoError> {
    let Some(ext) = path.extension() else {
        return Err(IoError::MissingExtension {
            path: path.display().to_string(),
        });
    };
    ext.to_string_lossy()
        .parse()
        .map_err(|_| IoError::UnsupportedExtension {
            path: path.display().to_string(),
        })
}
