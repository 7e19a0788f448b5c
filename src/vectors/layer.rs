//! Architectural layer classifier (spec §4.6, §9 "first matching
//! layer wins"). Path segments are checked in the declared order
//! below; the first rule that matches decides the layer.

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Layer {
    Api,
    Domain,
    Database,
    Frontend,
    Data,
    Infrastructure,
}

impl Layer {
    pub fn as_str(&self) -> &'static str {
        match self {
            Layer::Frontend => "frontend",
            Layer::Api => "api",
            Layer::Domain => "domain",
            Layer::Data => "data",
            Layer::Database => "database",
            Layer::Infrastructure => "infrastructure",
        }
    }

    /// Classify a file path by its segments. Declared order matters:
    /// the first matching rule wins, a path could otherwise satisfy
    /// more than one (spec §9).
    pub fn classify(file_path: &str) -> Layer {
        let lower = file_path.to_lowercase();
        let segments: Vec<&str> = lower.split(['/', '\\']).collect();
        let has = |needle: &str| segments.iter().any(|s| *s == needle);

        if has("controllers") || has("routes") || has("api") {
            Layer::Api
        } else if has("entities") || has("domain") || has("services") {
            Layer::Domain
        } else if has("migrations") || lower.ends_with(".sql") {
            Layer::Database
        } else if has("components") || has("views") || has("ui") {
            Layer::Frontend
        } else if has("repositories") || has("data") || has("db") {
            Layer::Data
        } else {
            Layer::Infrastructure
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_by_path_segment() {
        assert_eq!(Layer::classify("src/controllers/user.ts"), Layer::Api);
        assert_eq!(Layer::classify("src/domain/entities/user.ts"), Layer::Domain);
        assert_eq!(Layer::classify("db/migrations/001_init.sql"), Layer::Database);
        assert_eq!(Layer::classify("src/components/Button.tsx"), Layer::Frontend);
        assert_eq!(Layer::classify("src/repositories/user_repo.py"), Layer::Data);
        assert_eq!(Layer::classify("src/lib.rs"), Layer::Infrastructure);
    }

    #[test]
    fn first_matching_rule_wins_on_ambiguous_path() {
        // contains both "api" and "domain" segments; api is declared first.
        assert_eq!(Layer::classify("src/api/domain/handler.ts"), Layer::Api);
    }
}
