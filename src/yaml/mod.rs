//! YAML adapter
//!
//! - [`node`]: positioned document tree loaded from a YAML stream
//! - [`de`]: `serde` deserializer with unknown-field collection
//! - [`hooks`]: per-node rewrites applied before decoding
//! - [`parser`]: [`YamlFormat`] and the schema parser [`YamlParser`]

pub mod de;
pub mod hooks;
pub mod node;
pub mod parser;

pub use de::{from_node, DecodeError, UnknownField};
pub use hooks::{env_decoder_hook, env_decoder_hook_with, expand_env, multi_decoder_hook, walk, DecoderHook};
pub use node::{load_documents, Entry, Node, NodeKind};
pub use parser::{read_version, YamlFormat, YamlParser, VERSION_FIELD};
