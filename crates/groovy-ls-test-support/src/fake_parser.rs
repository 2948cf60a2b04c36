use groovy_ls_ast::AstBuilder;
use groovy_ls_parser::{CompilePhase, GroovyParser, RawParse};
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// A successful, empty-AST [`RawParse`] at `phase` for `source` — the default result a
/// [`FakeGroovyParser`] returns when nothing has been scripted for that exact text.
pub fn trivial_parse(source: &str, phase: CompilePhase) -> RawParse {
    RawParse {
        ast: AstBuilder::new(source.len()).finish(),
        diagnostics: Vec::new(),
        declarations: Vec::new(),
        imports: Vec::new(),
        reached_phase: phase,
        aborted: false,
    }
}

/// A [`GroovyParser`] double for unit tests that don't need real Groovy semantics.
///
/// Responses can be scripted per exact source text, FIFO per key, so a test can arrange
/// a retry sequence (e.g. an aborted parse followed by a clean one). Any call whose
/// source has nothing queued gets [`trivial_parse`] at the requested phase.
pub struct FakeGroovyParser {
    scripted: Mutex<HashMap<String, VecDeque<RawParse>>>,
    calls: AtomicUsize,
}

impl FakeGroovyParser {
    pub fn new() -> Arc<Self> {
        Arc::new(Self { scripted: Mutex::new(HashMap::new()), calls: AtomicUsize::new(0) })
    }

    /// Queues `response` to be returned the next time `parse` is called with exactly
    /// `source`. Multiple calls for the same source are served in the order queued.
    pub fn script(&self, source: impl Into<String>, response: RawParse) {
        self.scripted.lock().entry(source.into()).or_default().push_back(response);
    }

    /// Total number of `parse` calls observed so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl GroovyParser for FakeGroovyParser {
    fn parse(&self, source: &str, _classpath: &[PathBuf], phase: CompilePhase) -> RawParse {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(next) = self.scripted.lock().get_mut(source).and_then(VecDeque::pop_front) {
            return next;
        }
        trivial_parse(source, phase)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unscripted_source_gets_a_trivial_successful_parse() {
        let parser = FakeGroovyParser::new();
        let result = parser.parse("class A {}", &[], CompilePhase::SemanticAnalysis);
        assert!(!result.aborted);
        assert!(result.diagnostics.is_empty());
    }

    #[test]
    fn scripted_responses_are_served_fifo_per_source() {
        let parser = FakeGroovyParser::new();
        let first = trivial_parse("x", CompilePhase::Tokenization);
        let second = trivial_parse("x", CompilePhase::SemanticAnalysis);
        parser.script("x", first);
        parser.script("x", second);

        let observed_first = parser.parse("x", &[], CompilePhase::SemanticAnalysis);
        let observed_second = parser.parse("x", &[], CompilePhase::SemanticAnalysis);
        assert_eq!(observed_first.reached_phase, CompilePhase::Tokenization);
        assert_eq!(observed_second.reached_phase, CompilePhase::SemanticAnalysis);
        assert_eq!(parser.calls(), 2);
    }
}
