use std::fmt;

/// Compile phases, forming a strict prefix order: tokenisation → syntax tree → AST
/// conversion → semantic analysis → canonicalisation (`SPEC_FULL.md` §4.3).
///
/// Only `SemanticAnalysis` (the default) populates variable-binding information;
/// earlier phases are for callers that only need shape (e.g. outline) without paying
/// for resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum CompilePhase {
    Tokenization,
    SyntaxTree,
    AstConversion,
    SemanticAnalysis,
    Canonicalisation,
}

impl fmt::Display for CompilePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            CompilePhase::Tokenization => "tokenization",
            CompilePhase::SyntaxTree => "syntax_tree",
            CompilePhase::AstConversion => "ast_conversion",
            CompilePhase::SemanticAnalysis => "semantic_analysis",
            CompilePhase::Canonicalisation => "canonicalisation",
        };
        f.write_str(label)
    }
}

impl Default for CompilePhase {
    fn default() -> Self {
        CompilePhase::SemanticAnalysis
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn phases_form_a_strict_prefix_order() {
        assert!(CompilePhase::Tokenization < CompilePhase::SyntaxTree);
        assert!(CompilePhase::SyntaxTree < CompilePhase::AstConversion);
        assert!(CompilePhase::AstConversion < CompilePhase::SemanticAnalysis);
        assert!(CompilePhase::SemanticAnalysis < CompilePhase::Canonicalisation);
    }

    #[test]
    fn default_is_semantic_analysis() {
        assert_eq!(CompilePhase::default(), CompilePhase::SemanticAnalysis);
    }
}
