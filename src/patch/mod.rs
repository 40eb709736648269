//! GUS patch (.pat) format with the SF2 extension block

pub mod header;
pub mod json;
pub mod reader;
pub mod writer;

pub use header::{PatchHeader, VelocityLayer};
pub use json::PatchJson;
pub use reader::{Patch, PatchReader};
pub use writer::{modes, LfoBytes, PatchWriter, SampleRecord};
