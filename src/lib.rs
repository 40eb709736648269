pub mod convert;
pub mod error;
pub mod patch;
pub mod sf2;

pub use convert::{Conversion, ConvertOptions, Converter};
pub use error::Error;
