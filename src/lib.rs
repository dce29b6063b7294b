//! # Socket Composition Engine
//!
//! Turns exported markup documents into templates with named, overridable
//! extension points ("sockets").
//!
//! ## Compile Time
//!
//! 1. **Scan**: `af-sock` elements are validated, normalized to camel case and
//!    collected into a `SocketTree`. Each socket element gets a synthetic id
//!    recorded in the `SocketTable` side table.
//! 2. **Bind**: socket elements become `Hatch` extension points, either from
//!    the side table or by decoding `-af-sock-<index>-<payload>` tag suffixes
//!    in converted template text.
//! 3. **Export**: `define_sock` gives every socket a full dotted path.
//!
//! ## Render Time
//!
//! Overrides are resolved through a scope chain. Compose boundaries declare
//! overrides relative to their namespace; extension points climb the chain
//! to find them and render them per mode (`contentOnly`, `replaceAll`,
//! `merge`). The accessor protocol offers the same resolution over a flat
//! child list with cardinality contracts.
//!
//! ## Errors
//!
//! Fatal conditions are `SocketError` values with stable codes. Unused
//! overrides are `Diagnostic`s unless `EngineConfig` makes them fatal.

pub mod accessor;
pub mod cache;
pub mod config;
pub mod document;
pub mod emitter;
pub mod error;
pub mod exporter;
pub mod html;
pub mod ir;
pub mod naming;
pub mod overrides;
pub mod parse;
pub mod ready;
pub mod render;
pub mod scanner;
pub mod scope;
pub mod visitor;


pub use accessor::{create_scope, Accessor, Cardinality};
pub use config::{CompileOptions, EngineConfig, UnusedOverridePolicy};
pub use document::{compile_document, compile_documents, CompiledView};
pub use emitter::{bind_socket_tree, bind_sockets};
pub use error::{Diagnostic, SocketError};
pub use exporter::{define_sock, resolve_sock, AnySock, SockNode, SocketSpec};
pub use ir::{AttributeIR, ComposeNode, ElementNode, HatchNode, TemplateNode, TextNode};
pub use overrides::{OverrideContent, OverrideDecl, OverrideMode};
pub use ready::{ReadyGate, RefreshLedger, RefreshToken};
pub use render::{RenderOutput, Renderer, ViewTemplate};
pub use scanner::{scan, ScannedDocument, SocketTable, SocketTree};

#[cfg(feature = "napi")]
pub use document::compile_document_native;
#[cfg(feature = "napi")]
pub use emitter::bind_sockets_native;
#[cfg(feature = "napi")]
pub use exporter::define_sock_native;
