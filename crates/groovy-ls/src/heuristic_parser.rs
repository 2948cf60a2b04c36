//! A bootstrap [`GroovyParser`] that recovers declarations and imports by brace-matching
//! and line-scanning, without building a real grammar or binding variables.
//!
//! This exists so the server has something to run against before a real compiler
//! frontend is wired in, the same way [`groovy_ls_classpath::ConventionalResolver`] is a
//! fallback for classpath resolution. It never reaches [`CompilePhase::SemanticAnalysis`]
//! and is honest about that: callers already treat `ParseUnit::has_bindings()` as the
//! gate for anything that needs real binding information.

use std::path::PathBuf;

use groovy_ls_ast::{AstBuilder, DeclarationKind, Modifiers, NodeId, NodeKind};
use groovy_ls_parser::{CompilePhase, DeclarationRef, GroovyParser, ImportRef, RawParse};
use groovy_ls_position::ByteSpan;
use rustc_hash::FxHashMap;

#[derive(Debug, Default)]
pub struct HeuristicGroovyParser;

impl GroovyParser for HeuristicGroovyParser {
    fn parse(&self, source: &str, _classpath: &[PathBuf], _phase: CompilePhase) -> RawParse {
        let mask = code_mask(source);
        let pairs = match_braces(source, &mask);

        let mut builder = AstBuilder::new(source.len());
        let mut declarations = Vec::new();
        let mut imports = Vec::new();

        // Each open container is `None` for a plain block (if/for/while/try/lambda body)
        // or `Some((node, enclosing_type_name))` for a class/interface/enum/trait/method.
        let mut containers: Vec<Option<(NodeId, Option<String>)>> = Vec::new();
        let bytes = source.as_bytes();
        let mut segment_start = 0usize;
        let mut i = 0usize;

        while i < bytes.len() {
            if !mask[i] {
                i += 1;
                continue;
            }
            match bytes[i] {
                b'{' => {
                    let header = &source[segment_start..i];
                    let header_start = segment_start + trim_start_offset(header);
                    let close = pairs.get(&i).copied().unwrap_or_else(|| source.len().saturating_sub(1));
                    let span = ByteSpan::new(header_start, (close + 1).min(source.len()));
                    let enclosing_name =
                        containers.last().and_then(|c| c.as_ref().and_then(|(_, n)| n.clone()));

                    match classify_header(header.trim(), enclosing_name.as_deref()) {
                        Header::Type { keyword, name, name_offset, modifiers } => {
                            let name_span = name_span_at(header_start, name_offset, &name);
                            let kind = match keyword {
                                "interface" => NodeKind::Interface { name: name.clone(), modifiers },
                                "enum" => NodeKind::Enum { name: name.clone(), modifiers },
                                "trait" => NodeKind::Trait { name: name.clone(), modifiers },
                                _ => NodeKind::Class { name: name.clone(), modifiers },
                            };
                            let node = builder.push_named(kind, span, Some(name_span));
                            declarations.push(DeclarationRef { node, name: name.clone(), kind: DeclarationKind::Type });
                            containers.push(Some((node, Some(name))));
                        }
                        Header::Method { name, name_offset, modifiers, return_type } => {
                            let name_span = name_span_at(header_start, name_offset, &name);
                            let node =
                                builder.push_named(NodeKind::Method { name: name.clone(), modifiers, return_type }, span, Some(name_span));
                            declarations.push(DeclarationRef { node, name, kind: DeclarationKind::Method });
                            containers.push(Some((node, None)));
                        }
                        Header::Constructor { name_offset, modifiers } => {
                            let name = enclosing_name.clone().unwrap_or_default();
                            let name_span = name_span_at(header_start, name_offset, &name);
                            let node = builder.push_named(NodeKind::Constructor { modifiers }, span, Some(name_span));
                            declarations.push(DeclarationRef { node, name, kind: DeclarationKind::Method });
                            containers.push(Some((node, None)));
                        }
                        Header::Other => {
                            containers.push(None);
                        }
                    }
                    segment_start = i + 1;
                }
                b'}' => {
                    if let Some(Some(_)) = containers.pop() {
                        builder.pop();
                    }
                    segment_start = i + 1;
                }
                b';' => {
                    let stmt = &source[segment_start..i];
                    let in_class_body = matches!(containers.last(), Some(Some((_, Some(_)))));
                    if let Some(classified) = classify_statement(stmt, in_class_body) {
                        push_statement(&mut builder, &mut declarations, &mut imports, classified, segment_start, i + 1);
                    }
                    segment_start = i + 1;
                }
                b'\n' => {
                    // Groovy statements are frequently not `;`-terminated; a line that
                    // parses as a complete field or import is consumed here so it
                    // doesn't bleed into the next declaration's header text. A line that
                    // doesn't match (e.g. a multi-line method signature) is left alone
                    // and keeps accumulating towards the next boundary.
                    let stmt = &source[segment_start..i];
                    let in_class_body = matches!(containers.last(), Some(Some((_, Some(_)))));
                    if let Some(classified) = classify_statement(stmt, in_class_body) {
                        push_statement(&mut builder, &mut declarations, &mut imports, classified, segment_start, i + 1);
                        segment_start = i + 1;
                    }
                }
                _ => {}
            }
            i += 1;
        }

        RawParse {
            ast: builder.finish(),
            diagnostics: Vec::new(),
            declarations,
            imports,
            reached_phase: CompilePhase::AstConversion,
            aborted: false,
        }
    }
}

/// Builds the absolute identifier-token span for a name found at `name_offset` bytes
/// into the text that starts at `base`.
fn name_span_at(base: usize, name_offset: usize, name: &str) -> ByteSpan {
    let start = base + name_offset;
    ByteSpan::new(start, start + name.len())
}

fn push_statement(
    builder: &mut AstBuilder,
    declarations: &mut Vec<DeclarationRef>,
    imports: &mut Vec<ImportRef>,
    statement: Statement,
    start: usize,
    end: usize,
) {
    match statement {
        Statement::Import { path, alias, is_static, name_offset, name_len } => {
            let name_span = ByteSpan::new(start + name_offset, start + name_offset + name_len);
            let node = builder.leaf_named(
                NodeKind::Import { path: path.clone(), alias: alias.clone(), is_static },
                ByteSpan::new(start, end),
                Some(name_span),
            );
            imports.push(ImportRef { node, path, alias });
        }
        Statement::Field { name, modifiers, declared_type, name_offset } => {
            let name_span = name_span_at(start, name_offset, &name);
            let node = builder.leaf_named(
                NodeKind::Field { name: name.clone(), modifiers, declared_type },
                ByteSpan::new(start, end),
                Some(name_span),
            );
            declarations.push(DeclarationRef { node, name, kind: DeclarationKind::Field });
        }
    }
}

enum Header<'a> {
    Type { keyword: &'a str, name: String, name_offset: usize, modifiers: Modifiers },
    Method { name: String, name_offset: usize, modifiers: Modifiers, return_type: Option<String> },
    Constructor { name_offset: usize, modifiers: Modifiers },
    Other,
}

enum Statement {
    Import { path: String, alias: Option<String>, is_static: bool, name_offset: usize, name_len: usize },
    Field { name: String, modifiers: Modifiers, declared_type: Option<String>, name_offset: usize },
}

/// Splits `s` into its whitespace-delimited words, each paired with its byte offset
/// within `s`, so callers can turn a matched word back into an absolute source span.
fn words_with_offsets(s: &str) -> Vec<(usize, &str)> {
    let mut out = Vec::new();
    let mut iter = s.char_indices().peekable();
    loop {
        while let Some(&(_, c)) = iter.peek() {
            if c.is_whitespace() {
                iter.next();
            } else {
                break;
            }
        }
        let Some(&(start, _)) = iter.peek() else { break };
        let mut end = start;
        while let Some(&(idx, c)) = iter.peek() {
            if c.is_whitespace() {
                break;
            }
            end = idx + c.len_utf8();
            iter.next();
        }
        out.push((start, &s[start..end]));
    }
    out
}

fn classify_header<'a>(header: &'a str, enclosing_class_name: Option<&str>) -> Header<'a> {
    let words = words_with_offsets(header);
    if words.is_empty() {
        return Header::Other;
    }

    if let Some(idx) = words.iter().position(|(_, w)| matches!(*w, "class" | "interface" | "enum" | "trait")) {
        let keyword = words[idx].1;
        let plain: Vec<&str> = words[..idx].iter().map(|(_, w)| *w).collect();
        let modifiers = classify_modifiers(&plain);
        if let Some(&(name_offset, name_word)) = words.get(idx + 1) {
            let name = name_word.split(|c: char| !c.is_alphanumeric() && c != '_').next().unwrap_or("").to_string();
            if !name.is_empty() {
                return Header::Type { keyword, name, name_offset, modifiers };
            }
        }
    }

    if let Some(paren) = header.find('(') {
        let before_words = words_with_offsets(&header[..paren]);
        if let Some(&(name_offset, name_word)) = before_words.last() {
            let name = name_word.trim_end_matches(|c: char| !c.is_alphanumeric() && c != '_').to_string();
            if is_identifier(&name) {
                let plain: Vec<&str> = before_words[..before_words.len() - 1].iter().map(|(_, w)| *w).collect();
                let modifiers = classify_modifiers(&plain);
                if Some(name.as_str()) == enclosing_class_name {
                    return Header::Constructor { name_offset, modifiers };
                }
                let return_type = plain.iter().rev().nth(1).filter(|w| !is_modifier(w)).map(|w| w.to_string());
                return Header::Method { name, name_offset, modifiers, return_type };
            }
        }
    }

    Header::Other
}

fn classify_statement(stmt: &str, in_class_body: bool) -> Option<Statement> {
    let leading = trim_start_offset(stmt);
    let trimmed = stmt.trim();
    if let Some(rest) = trimmed.strip_prefix("import ") {
        let rest = rest.trim_start();
        let (is_static, rest) = match rest.strip_prefix("static ") {
            Some(r) => (true, r.trim_start()),
            None => (false, rest),
        };
        let (path, alias) = match rest.find(" as ") {
            Some(idx) => (rest[..idx].trim().to_string(), Some(rest[idx + 4..].trim().to_string())),
            None => (rest.trim().to_string(), None),
        };
        if path.is_empty() {
            return None;
        }
        let name_text = alias.clone().unwrap_or_else(|| last_segment(&path));
        let name_offset = stmt.rfind(name_text.as_str()).unwrap_or(leading);
        return Some(Statement::Import { path, alias, is_static, name_offset, name_len: name_text.len() });
    }

    if !in_class_body || trimmed.is_empty() || trimmed.starts_with('@') {
        return None;
    }

    let before_eq = trimmed.split('=').next().unwrap_or(trimmed);
    let words = words_with_offsets(before_eq);
    if words.len() < 2 {
        return None;
    }
    let &(word_offset, name_word) = words.last().unwrap_or(&(0, ""));
    let name = name_word.trim_end_matches(|c: char| !c.is_alphanumeric() && c != '_').to_string();
    if !is_identifier(&name) {
        return None;
    }
    let plain: Vec<&str> = words[..words.len() - 1].iter().map(|(_, w)| *w).collect();
    let modifiers = classify_modifiers(&plain);
    let declared_type = plain.iter().rev().nth(1).filter(|w| !is_modifier(w)).map(|w| w.to_string());
    let name_offset = leading + word_offset;
    Some(Statement::Field { name, modifiers, declared_type, name_offset })
}

fn classify_modifiers(words: &[&str]) -> Modifiers {
    let mut modifiers = Modifiers::default();
    for word in words {
        match *word {
            "public" => modifiers.public = true,
            "private" => modifiers.private = true,
            "protected" => modifiers.protected = true,
            "static" => modifiers.is_static = true,
            "final" => modifiers.is_final = true,
            "abstract" => modifiers.is_abstract = true,
            _ => {}
        }
    }
    modifiers
}

fn is_modifier(word: &str) -> bool {
    matches!(word, "public" | "private" | "protected" | "static" | "final" | "abstract" | "def")
}

fn is_identifier(name: &str) -> bool {
    !name.is_empty() && name.chars().next().is_some_and(|c| c.is_alphabetic() || c == '_')
}

fn trim_start_offset(s: &str) -> usize {
    s.len() - s.trim_start().len()
}

fn last_segment(path: &str) -> String {
    path.rsplit('.').next().unwrap_or(path).to_string()
}

/// Marks byte offsets that fall inside a line comment, block comment, or quoted string
/// literal, so brace-matching and statement-splitting can skip over them. Groovy's
/// triple-quoted strings and GString interpolation are not modelled; this is a heuristic.
fn code_mask(source: &str) -> Vec<bool> {
    let bytes = source.as_bytes();
    let mut mask = vec![true; bytes.len()];
    let mut i = 0usize;
    while i < bytes.len() {
        match bytes[i] {
            b'/' if bytes.get(i + 1) == Some(&b'/') => {
                let start = i;
                while i < bytes.len() && bytes[i] != b'\n' {
                    i += 1;
                }
                mask[start..i].iter_mut().for_each(|m| *m = false);
            }
            b'/' if bytes.get(i + 1) == Some(&b'*') => {
                let start = i;
                i += 2;
                while i + 1 < bytes.len() && !(bytes[i] == b'*' && bytes[i + 1] == b'/') {
                    i += 1;
                }
                i = (i + 2).min(bytes.len());
                mask[start..i].iter_mut().for_each(|m| *m = false);
            }
            b'"' | b'\'' => {
                let quote = bytes[i];
                let start = i;
                i += 1;
                while i < bytes.len() && bytes[i] != quote {
                    if bytes[i] == b'\\' {
                        i += 1;
                    }
                    i += 1;
                }
                i = (i + 1).min(bytes.len());
                mask[start..i].iter_mut().for_each(|m| *m = false);
            }
            _ => i += 1,
        }
    }
    mask
}

fn match_braces(source: &str, mask: &[bool]) -> FxHashMap<usize, usize> {
    let bytes = source.as_bytes();
    let mut stack = Vec::new();
    let mut pairs = FxHashMap::default();
    for (i, &b) in bytes.iter().enumerate() {
        if !mask[i] {
            continue;
        }
        match b {
            b'{' => stack.push(i),
            b'}' => {
                if let Some(open) = stack.pop() {
                    pairs.insert(open, i);
                }
            }
            _ => {}
        }
    }
    pairs
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(source: &str) -> RawParse {
        HeuristicGroovyParser.parse(source, &[], CompilePhase::SemanticAnalysis)
    }

    #[test]
    fn never_claims_semantic_analysis() {
        let raw = parse("class Foo {}");
        assert_eq!(raw.reached_phase, CompilePhase::AstConversion);
        assert!(!raw.aborted);
    }

    #[test]
    fn finds_class_with_field_and_method() {
        let raw = parse(
            r#"
            class Greeter {
                String name
                def greet() {
                    return "hi"
                }
            }
            "#,
        );
        let names: Vec<&str> = raw.declarations.iter().map(|d| d.name.as_str()).collect();
        assert!(names.contains(&"Greeter"));
        assert!(names.contains(&"name"));
        assert!(names.contains(&"greet"));
    }

    #[test]
    fn finds_import_with_alias() {
        let raw = parse("import java.util.List as JList\nclass Foo {}");
        assert_eq!(raw.imports.len(), 1);
        assert_eq!(raw.imports[0].path, "java.util.List");
        assert_eq!(raw.imports[0].alias.as_deref(), Some("JList"));
    }

    #[test]
    fn finds_static_import() {
        let raw = parse("import static java.lang.Math.max\nclass Foo {}");
        assert_eq!(raw.imports.len(), 1);
        assert_eq!(raw.imports[0].path, "java.lang.Math.max");
    }

    #[test]
    fn ignores_braces_inside_strings_and_comments() {
        let raw = parse(
            r#"
            class Foo {
                // a comment with a brace {
                String label = "looks like a class { here }"
                def run() {}
            }
            "#,
        );
        let names: Vec<&str> = raw.declarations.iter().map(|d| d.name.as_str()).collect();
        assert!(names.contains(&"Foo"));
        assert!(names.contains(&"label"));
        assert!(names.contains(&"run"));
    }

    #[test]
    fn detects_constructor_distinct_from_method() {
        let raw = parse("class Foo { Foo() {} def bar() {} }");
        let mut constructors = 0;
        let mut methods = 0;
        raw.ast.visit_pre_order(raw.ast.root(), |_, node| match &node.kind {
            NodeKind::Constructor { .. } => constructors += 1,
            NodeKind::Method { .. } => methods += 1,
            _ => {}
        });
        assert_eq!(constructors, 1);
        assert_eq!(methods, 1);
        assert!(raw.declarations.iter().any(|d| d.name == "bar" && d.kind == DeclarationKind::Method));
        assert!(raw.declarations.iter().any(|d| d.name == "Foo" && d.kind == DeclarationKind::Method));
    }

    #[test]
    fn field_selection_span_is_identifier_only_not_whole_statement() {
        let source = "class Foo { String greeter = \"hi\" }";
        let raw = parse(source);
        let field = raw
            .ast
            .subtree(raw.ast.root())
            .into_iter()
            .map(|id| raw.ast.node(id))
            .find(|node| matches!(node.kind, NodeKind::Field { .. }))
            .expect("field node recorded");
        let selection = field.selection_span();
        let name_start = source.find("greeter").expect("greeter appears in source");
        assert_eq!(selection, ByteSpan::new(name_start, name_start + "greeter".len()));
        assert!(field.span.len() > selection.len(), "declaration span must be wider than the selection span");
    }

    #[test]
    fn class_selection_span_is_name_only() {
        let source = "class Greeter { }";
        let raw = parse(source);
        let class = raw.ast.node(raw.ast.root()).children[0];
        let node = raw.ast.node(class);
        let name_start = source.find("Greeter").expect("Greeter appears in source");
        assert_eq!(node.selection_span(), ByteSpan::new(name_start, name_start + "Greeter".len()));
    }
}
