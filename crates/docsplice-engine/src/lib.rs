pub mod import;
pub mod splice;
pub mod tree;

#[cfg(test)]
pub mod tests;

// Re-export key types for easier usage
pub use import::{
    ImportError, ImportMode, ImporterDelegate, MarkdownImporter, PlainTextImporter, RtfImporter,
    load,
};
pub use splice::{SpliceController, SpliceError, SpliceOptions, SpliceOutcome, SpliceState, splice};
pub use tree::*;
