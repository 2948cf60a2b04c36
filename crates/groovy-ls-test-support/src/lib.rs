//! Shared test fixtures (`SPEC_FULL.md` §10.4): a scripted [`GroovyParser`] double,
//! builders for the data types every crate's unit tests construct by hand, and a
//! tempfile-backed workspace builder for file-walk tests. Dev-dependency only; nothing
//! here is reachable from the engine's runtime graph.

mod fake_parser;
mod fixtures;
mod workspace;

pub use fake_parser::{trivial_parse, FakeGroovyParser};
pub use fixtures::{diagnostic, document, symbol};
pub use workspace::TestWorkspace;
