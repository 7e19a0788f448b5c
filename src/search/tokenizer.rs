//! Shared tokenizer (spec §4.4, §9 "shared tokenizer" design note).
//!
//! Used identically by the text search engine and the TF-IDF embedder
//! — if these ever diverge, query and corpus token streams stop
//! lining up and semantic relevance collapses to near-zero.

/// Split an identifier into lowercase word tokens: camelCase,
/// snake_case, kebab-case, and dotted paths all fall out of the same
/// rule set (spec §8 property 6).
pub fn tokenize(text: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut prev_kind: Option<CharKind> = None;

    let flush = |current: &mut String, tokens: &mut Vec<String>| {
        if !current.is_empty() {
            tokens.push(std::mem::take(current).to_lowercase());
        }
    };

    let chars: Vec<char> = text.chars().collect();
    for (i, &c) in chars.iter().enumerate() {
        if c == '_' || c == '-' || c == '.' || c == ':' || c.is_whitespace() {
            flush(&mut current, &mut tokens);
            prev_kind = None;
            continue;
        }
        if !c.is_alphanumeric() {
            flush(&mut current, &mut tokens);
            prev_kind = None;
            continue;
        }

        let kind = CharKind::of(c);
        let is_boundary = match (prev_kind, kind) {
            (Some(CharKind::Lower), CharKind::Upper) => true,
            (Some(CharKind::Upper), CharKind::Upper) => {
                // "HTTPServer" -> [http, server]: split before the last
                // uppercase letter of a run when it's followed by lowercase.
                chars
                    .get(i + 1)
                    .map(|n| n.is_lowercase())
                    .unwrap_or(false)
            }
            (Some(CharKind::Digit), CharKind::Alpha) | (Some(CharKind::Alpha), CharKind::Digit) => true,
            _ => false,
        };

        if is_boundary {
            flush(&mut current, &mut tokens);
        }
        current.push(c);
        prev_kind = Some(kind);
    }
    flush(&mut current, &mut tokens);

    tokens
}

/// Tokenize several fields and fold into a deduplicated, order-stable
/// token set, used when building the index postings for one symbol.
pub fn tokenize_fields(fields: &[&str]) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    let mut out = Vec::new();
    for field in fields {
        for token in tokenize(field) {
            if seen.insert(token.clone()) {
                out.push(token);
            }
        }
    }
    out
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum CharKind {
    Upper,
    Lower,
    Digit,
    Alpha,
}

impl CharKind {
    fn of(c: char) -> Self {
        if c.is_ascii_digit() {
            CharKind::Digit
        } else if c.is_uppercase() {
            CharKind::Upper
        } else if c.is_lowercase() {
            CharKind::Lower
        } else {
            CharKind::Alpha
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_camel_case() {
        assert_eq!(tokenize("getUserData"), vec!["get", "user", "data"]);
    }

    #[test]
    fn splits_snake_case() {
        assert_eq!(tokenize("get_user_data"), vec!["get", "user", "data"]);
    }

    #[test]
    fn splits_pascal_case() {
        assert_eq!(tokenize("GetUserData"), vec!["get", "user", "data"]);
    }

    #[test]
    fn splits_kebab_and_dotted() {
        assert_eq!(tokenize("get-user-data"), vec!["get", "user", "data"]);
        assert_eq!(tokenize("a.b.getUserData"), vec!["a", "b", "get", "user", "data"]);
    }

    #[test]
    fn splits_acronym_runs() {
        assert_eq!(tokenize("HTTPServer"), vec!["http", "server"]);
    }

    #[test]
    fn unicode_case_folds() {
        assert_eq!(tokenize("GroßeZahl"), vec!["große", "zahl"]);
    }
}
