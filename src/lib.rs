pub mod api;
pub mod error;
mod expand;
pub mod loader;
mod merge;
pub mod nodes;
mod serialization;
pub mod template;
pub mod utils;
pub mod validation;

pub use api::{parse, parse_file, Root};
pub use error::{ExpansionError, LoaderError, NodeError, RamlError};
pub use nodes::{Declarations, Node, NodeKind, NodeName, Optionality, Reference};
pub use serialization::Value;
