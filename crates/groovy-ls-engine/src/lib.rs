//! Top-level facade (`SPEC_FULL.md` §4 overview, §6 external interfaces): wires every
//! component into one [`GroovyEngine`] and exposes the lifecycle/query surface an
//! external boundary drives.

mod engine;
mod query;

pub use engine::GroovyEngine;
pub use query::{
    CodeAction, CompletionItem, DocumentSymbolNode, Hover, TextEdit, WorkspaceEdit, WorkspaceSymbolResult,
    SEMANTIC_TOKEN_TYPES,
};
