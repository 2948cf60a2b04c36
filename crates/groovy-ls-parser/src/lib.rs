//! Parser facade (`SPEC_FULL.md` §4.3): source text to [`ParseUnit`] at a configurable
//! compile phase, with no caching of its own — caching is the compilation service's job.
//!
//! The facade depends on the concrete grammar/semantic analyser only through the
//! [`GroovyParser`] trait, so the engine can be exercised against a test double without
//! a real Groovy toolchain in the loop.

mod phase;
mod script;

pub use phase::CompilePhase;

use groovy_ls_ast::Ast;
use groovy_ls_fingerprint::Fingerprint;
use std::path::PathBuf;
use std::sync::Arc;

/// Diagnostic severities a parse can produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Error,
    Warning,
    Info,
    Hint,
}

/// A diagnostic produced while parsing, before the diagnostics pipeline (C9) merges it
/// with lint-provider output.
#[derive(Debug, Clone, PartialEq)]
pub struct ParseDiagnostic {
    pub span: groovy_ls_position::ByteSpan,
    pub severity: Severity,
    pub message: String,
    /// Always `"parser"`; kept as a field (rather than implied) so downstream merging
    /// doesn't need a second type to attach a source tag.
    pub source: &'static str,
    pub code: Option<String>,
}

impl ParseDiagnostic {
    fn error(span: groovy_ls_position::ByteSpan, message: impl Into<String>) -> Self {
        Self { span, severity: Severity::Error, message: message.into(), source: "parser", code: None }
    }

    fn note(span: groovy_ls_position::ByteSpan, message: impl Into<String>) -> Self {
        Self { span, severity: Severity::Info, message: message.into(), source: "parser", code: None }
    }
}

/// One declaration found while parsing, with enough to seed the symbol index (C5)
/// without re-walking the AST.
#[derive(Debug, Clone)]
pub struct DeclarationRef {
    pub node: groovy_ls_ast::NodeId,
    pub name: String,
    pub kind: groovy_ls_ast::DeclarationKind,
}

/// One `import` found while parsing.
#[derive(Debug, Clone)]
pub struct ImportRef {
    pub node: groovy_ls_ast::NodeId,
    pub path: String,
    pub alias: Option<String>,
}

/// The immutable result of one parse (`SPEC_FULL.md` §3 `ParseUnit`).
///
/// Referenced by the symbol index and diagnostics pipeline; retained while its
/// fingerprint is current for its URI, plus a bounded LRU tail kept by the compilation
/// service.
#[derive(Debug, Clone)]
pub struct ParseUnit {
    pub uri: String,
    pub fingerprint: Fingerprint,
    pub ast: Ast,
    pub diagnostics: Vec<ParseDiagnostic>,
    pub declarations: Vec<DeclarationRef>,
    pub imports: Vec<ImportRef>,
    /// `false` for a best-effort partial parse of syntactically broken input.
    pub is_successful: bool,
    /// The deepest phase actually reached; only `SemanticAnalysis` populates
    /// variable-binding information.
    pub reached_phase: CompilePhase,
}

impl ParseUnit {
    /// Whether this unit reached far enough to have resolved variable bindings.
    ///
    /// Readers that depend on resolution (rename, find-references) must check this
    /// before trusting usage-to-declaration links as complete.
    pub fn has_bindings(&self) -> bool {
        self.reached_phase >= CompilePhase::SemanticAnalysis
    }
}

/// The raw output of one grammar/analyser invocation, before the facade's retry policy
/// and fingerprinting are applied.
#[derive(Debug, Clone)]
pub struct RawParse {
    pub ast: Ast,
    pub diagnostics: Vec<ParseDiagnostic>,
    pub declarations: Vec<DeclarationRef>,
    pub imports: Vec<ImportRef>,
    pub reached_phase: CompilePhase,
    /// Whether the requested phase was aborted before completion (e.g. an
    /// unresolvable AST transformation).
    pub aborted: bool,
}

/// The external grammar/semantic-analyser collaborator.
///
/// Implementations are expected to be deterministic for a given `(source, classpath,
/// phase)` triple; the facade relies on that to make retries meaningful.
pub trait GroovyParser: Send + Sync {
    fn parse(&self, source: &str, classpath: &[PathBuf], phase: CompilePhase) -> RawParse;
}

/// Drives a [`GroovyParser`] to produce [`ParseUnit`]s, applying the script-retry
/// policy and stamping the content fingerprint. Holds no cache.
#[derive(Clone)]
pub struct ParserFacade {
    parser: Arc<dyn GroovyParser>,
}

impl ParserFacade {
    /// Creates a facade driving `parser`.
    pub fn new(parser: Arc<dyn GroovyParser>) -> Self {
        Self { parser }
    }

    /// Parses `source` at `phase`, retrying at [`CompilePhase::AstConversion`] if the
    /// requested phase aborted and `source` looks like a script
    /// (`SPEC_FULL.md`'s resolved script-retry trigger: no top-level
    /// `class`/`interface`/`trait`/`enum`/`@interface` keyword precedes the first
    /// statement).
    pub fn parse(&self, uri: &str, source: &str, classpath: &[PathBuf], phase: CompilePhase) -> ParseUnit {
        let fingerprint = Fingerprint::of(source);
        let mut raw = self.parser.parse(source, classpath, phase);

        if raw.aborted && phase > CompilePhase::AstConversion && script::looks_like_script(source) {
            tracing::debug!(uri, %phase, "script-like source aborted, retrying at ast_conversion");
            let mut retried = self.parser.parse(source, classpath, CompilePhase::AstConversion);
            if !retried.aborted {
                retried.diagnostics.push(ParseDiagnostic::note(
                    groovy_ls_position::ByteSpan::empty(0),
                    format!("parse degraded to {} after semantic analysis failed", CompilePhase::AstConversion),
                ));
            }
            raw = retried;
        }

        if raw.aborted {
            tracing::warn!(uri, %phase, "parse aborted, returning partial result");
        }

        ParseUnit {
            uri: uri.to_string(),
            fingerprint,
            ast: raw.ast,
            diagnostics: raw.diagnostics,
            declarations: raw.declarations,
            imports: raw.imports,
            is_successful: !raw.aborted,
            reached_phase: raw.reached_phase,
        }
    }
}
