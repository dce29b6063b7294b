//! # Document Compilation
//!
//! Whole-document pipeline:
//!
//! 1. Parse the body (optionally wrapped in a `div` carrying body attributes).
//! 2. Scan sockets under the view's namespace.
//! 3. Bind socket elements into `Hatch` extension points.
//! 4. Export the socket tree as a `SocketSpec` and its `SockNode` paths.
//!
//! Compiled views are immutable and can be shared across threads; batches of
//! independent documents compile in parallel.

#[cfg(feature = "napi")]
use napi_derive::napi;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::CompileOptions;
use crate::emitter;
use crate::error::SocketError;
use crate::exporter::{define_sock, SockNode, SocketSpec};
use crate::html;
use crate::naming::ViewNames;
use crate::parse;
use crate::render::ViewTemplate;
use crate::scanner::{self, ScriptRef, SocketTable, SocketTree};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompiledView {
    pub names: ViewNames,
    pub template: ViewTemplate,
    pub tree: SocketTree,
    pub table: SocketTable,
    pub spec: SocketSpec,
    /// Exported socket paths rooted at the view namespace.
    pub sockets: SockNode,
    /// Template markup with sockets encoded in tag names, for converters that
    /// only carry text.
    pub marked_html: String,
    /// Inline and external scripts lifted out of the template.
    pub scripts: Vec<ScriptRef>,
}

pub fn compile_document(source: &str, options: &CompileOptions) -> Result<CompiledView, SocketError> {
    let names = ViewNames::new(&options.name);
    let namespace = options
        .namespace
        .clone()
        .unwrap_or_else(|| names.sock_namespace.clone());
    let file = format!("{}.html", options.name);

    let body = parse::parse_body(source, &file)?;
    let scanned = scanner::scan(body.into_nodes(options.wrap_body), &namespace)?;
    let marked_html = html::render_html(&scanned.encode_tag_names());

    let spec = scanned.tree.to_spec();
    let sockets = define_sock(&namespace, &spec);
    let nodes = emitter::bind_socket_tree(scanned.nodes, &scanned.table)?;

    debug!(
        file = %file,
        namespace = %namespace,
        sockets = scanned.table.len(),
        "compiled document"
    );

    Ok(CompiledView {
        names,
        template: ViewTemplate::new(namespace, nodes),
        tree: scanned.tree,
        table: scanned.table,
        spec,
        sockets,
        marked_html,
        scripts: scanned.scripts,
    })
}

/// Compiles independent documents in parallel; results keep input order.
pub fn compile_documents(
    inputs: &[(String, CompileOptions)],
) -> Vec<Result<CompiledView, SocketError>> {
    inputs
        .par_iter()
        .map(|(source, options)| compile_document(source, options))
        .collect()
}

#[cfg(feature = "napi")]
#[napi]
pub fn compile_document_native(
    source: String,
    options_json: String,
) -> napi::Result<serde_json::Value> {
    let options = CompileOptions::from_json(&options_json)
        .map_err(|e| napi::Error::from_reason(e.to_string()))?;
    let view = compile_document(&source, &options).map_err(|e| napi::Error::from_reason(e.to_string()))?;
    serde_json::to_value(view).map_err(|e| napi::Error::from_reason(e.to_string()))
}
