pub mod assertion;
pub mod dependency;
pub mod error;
pub mod extractor;
pub mod value;
pub mod value_path;
