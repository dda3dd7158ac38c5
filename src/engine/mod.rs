pub mod assert;
pub mod convert;
pub mod extract;
pub mod generator;
pub mod resolve;
