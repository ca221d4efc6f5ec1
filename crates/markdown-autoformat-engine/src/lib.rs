pub mod autoformat;
pub mod error;
pub mod host;
pub mod model;

// Re-export key types for easier usage
pub use autoformat::*;
pub use error::ModelError;
pub use host::*;
pub use model::{
    Batch, Block, Command, CommandRegistry, Document, ModelEditor, ModelWriter,
    RenameBlockCommand, Schema,
};
