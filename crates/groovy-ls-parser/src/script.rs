/// Whether `source` looks like a Groovy script rather than a type declaration, per the
/// resolved script-retry trigger in `SPEC_FULL.md` §9: "no top-level
/// `class`/`interface`/`trait`/`enum`/`@interface` keyword appears before the first
/// statement". Annotations and modifiers preceding a type declaration don't count as
/// the first statement; the first other identifier-led token does.
pub fn looks_like_script(source: &str) -> bool {
    let mut tokens = TopLevelTokens::new(source);
    while let Some(token) = tokens.next() {
        match token {
            "class" | "interface" | "trait" | "enum" => return false,
            "@interface" => return false,
            // A package/import declaration's path is part of the same declaration,
            // not the next top-level token, so skip it along with the keyword.
            "package" | "import" => {
                tokens.next();
            }
            _ if is_modifier_or_annotation(token) => continue,
            _ => return true,
        }
    }
    // No top-level token at all (empty or comment-only source): nothing to retry for.
    true
}

fn is_modifier_or_annotation(token: &str) -> bool {
    matches!(token, "public" | "private" | "protected" | "static" | "final" | "abstract" | "strictfp")
        || token.starts_with('@')
}

struct TopLevelTokens<'a> {
    rest: &'a str,
}

impl<'a> TopLevelTokens<'a> {
    fn new(source: &'a str) -> Self {
        Self { rest: source }
    }
}

impl<'a> Iterator for TopLevelTokens<'a> {
    type Item = &'a str;

    fn next(&mut self) -> Option<&'a str> {
        loop {
            self.rest = self.rest.trim_start();
            if self.rest.is_empty() {
                return None;
            }
            if let Some(after) = self.rest.strip_prefix("//") {
                self.rest = after.split_once('\n').map_or("", |(_, rest)| rest);
                continue;
            }
            if let Some(after) = self.rest.strip_prefix("/*") {
                self.rest = after.split_once("*/").map_or("", |(_, rest)| rest);
                continue;
            }
            if self.rest.starts_with('"') || self.rest.starts_with('\'') {
                // Skip a whole string literal so its contents can't masquerade as a
                // top-level keyword; this is intentionally not escape-aware, since a
                // malformed literal only affects the retry heuristic, not correctness.
                let Some(quote) = self.rest.chars().next() else { break };
                let mut chars = self.rest.char_indices().skip(1);
                let end = chars.find(|&(_, c)| c == quote).map(|(i, _)| i + 1).unwrap_or(self.rest.len());
                self.rest = &self.rest[end..];
                continue;
            }
            break;
        }
        let end = self
            .rest
            .find(|c: char| c.is_whitespace() || (!c.is_alphanumeric() && c != '_' && c != '@' && c != '.'))
            .unwrap_or(self.rest.len());
        let end = end.max(1);
        let token = &self.rest[..end];
        self.rest = &self.rest[end..];
        Some(token)
    }
}
