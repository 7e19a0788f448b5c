//! TypeScript extractor — the second representative concrete
//! [`super::LanguageExtractor`] (see module docs on [`super::rust`]).

use std::collections::HashMap;

use tree_sitter::Node;

use super::base::{fingerprint_symbol_id, BaseExtractor, Symbol, SymbolKind, Visibility};
use super::{LanguageExtractor, Relationship, RelationshipKind, TypeInfo};
use crate::error::Diagnostic;

pub struct TypeScriptExtractor;

impl TypeScriptExtractor {
    fn walk<'a>(
        &self,
        node: Node<'a>,
        base: &BaseExtractor,
        parent_id: Option<&str>,
        symbols: &mut Vec<Symbol>,
        diagnostics: &mut Vec<Diagnostic>,
    ) {
        let mut next_parent = parent_id.map(|s| s.to_string());

        match node.kind() {
            "function_declaration" | "method_definition" | "method_signature" => {
                if let Some(name_node) = node.child_by_field_name("name") {
                    let kind = if node.kind() == "function_declaration" {
                        SymbolKind::Function
                    } else {
                        SymbolKind::Method
                    };
                    let symbol = self.make_symbol(base, &name_node, &node, kind, parent_id);
                    next_parent = Some(symbol.id.clone());
                    symbols.push(symbol);
                } else {
                    diagnostics.push(Diagnostic::for_path(
                        base.file_path,
                        format!("{} missing name at byte {}", node.kind(), node.start_byte()),
                    ));
                }
            }
            "class_declaration" => {
                if let Some(name_node) = node.child_by_field_name("name") {
                    let symbol = self.make_symbol(base, &name_node, &node, SymbolKind::Class, parent_id);
                    next_parent = Some(symbol.id.clone());
                    symbols.push(symbol);
                }
            }
            "interface_declaration" => {
                if let Some(name_node) = node.child_by_field_name("name") {
                    let symbol = self.make_symbol(base, &name_node, &node, SymbolKind::Interface, parent_id);
                    next_parent = Some(symbol.id.clone());
                    symbols.push(symbol);
                }
            }
            "enum_declaration" => {
                if let Some(name_node) = node.child_by_field_name("name") {
                    let symbol = self.make_symbol(base, &name_node, &node, SymbolKind::Enum, parent_id);
                    next_parent = Some(symbol.id.clone());
                    symbols.push(symbol);
                }
            }
            "property_identifier" if node.parent().map(|p| p.kind()) == Some("enum_body") => {
                let symbol = self.make_symbol(base, &node, &node, SymbolKind::EnumMember, parent_id);
                symbols.push(symbol);
            }
            "public_field_definition" | "property_signature" => {
                if let Some(name_node) = node.child_by_field_name("name") {
                    let symbol = self.make_symbol(base, &name_node, &node, SymbolKind::Property, parent_id);
                    symbols.push(symbol);
                }
            }
            "type_alias_declaration" => {
                if let Some(name_node) = node.child_by_field_name("name") {
                    let symbol = self.make_symbol(base, &name_node, &node, SymbolKind::TypeAlias, parent_id);
                    symbols.push(symbol);
                }
            }
            "lexical_declaration" | "variable_declaration" => {
                let mut cursor = node.walk();
                for child in node.children(&mut cursor) {
                    if child.kind() == "variable_declarator" {
                        if let Some(name_node) = child.child_by_field_name("name") {
                            if name_node.kind() == "identifier" {
                                let is_const = base.node_text(&node).trim_start().starts_with("const");
                                let kind = if is_const {
                                    SymbolKind::Constant
                                } else {
                                    SymbolKind::Variable
                                };
                                let symbol = self.make_symbol(base, &name_node, &child, kind, parent_id);
                                symbols.push(symbol);
                            }
                        }
                    }
                }
            }
            _ => {}
        }

        let mut cursor = node.walk();
        for child in node.children(&mut cursor) {
            self.walk(child, base, next_parent.as_deref().or(parent_id), symbols, diagnostics);
        }
    }

    fn make_symbol(
        &self,
        base: &BaseExtractor,
        name_node: &Node,
        decl_node: &Node,
        kind: SymbolKind,
        parent_id: Option<&str>,
    ) -> Symbol {
        let name = base.node_text(name_node).to_string();
        let (start_line, start_column, end_line, end_column) = BaseExtractor::position_of(name_node);
        let qualified_name = format!("{}::{}", base.file_path, name);
        let decl_text = base.node_text(decl_node);

        let visibility = if decl_text.contains("export") {
            Visibility::Public
        } else if decl_text.trim_start().starts_with("private") {
            Visibility::Private
        } else if decl_text.trim_start().starts_with("protected") {
            Visibility::Protected
        } else {
            BaseExtractor::infer_visibility(&name, decl_text)
        };

        let mut symbol = Symbol::new(
            &qualified_name,
            name,
            kind,
            "typescript",
            base.file_path,
            start_line,
            start_column,
            end_line,
            end_column,
            name_node.start_byte() as u32,
            name_node.end_byte() as u32,
        );
        symbol.visibility = visibility;
        symbol.parent_id = parent_id.map(|s| s.to_string());
        symbol.signature = Some(first_line(decl_text));
        symbol
    }
}

impl LanguageExtractor for TypeScriptExtractor {
    fn language(&self) -> &'static str {
        "typescript"
    }

    fn extract_symbols(&self, tree: &tree_sitter::Tree, content: &str, file_path: &str) -> (Vec<Symbol>, Vec<Diagnostic>) {
        let base = BaseExtractor::new("typescript", file_path, content);
        let mut symbols = Vec::new();
        let mut diagnostics = Vec::new();
        self.walk(tree.root_node(), &base, None, &mut symbols, &mut diagnostics);
        (symbols, diagnostics)
    }

    fn extract_relationships(
        &self,
        tree: &tree_sitter::Tree,
        content: &str,
        file_path: &str,
        symbols: &[Symbol],
    ) -> Vec<Relationship> {
        let base = BaseExtractor::new("typescript", file_path, content);
        let by_name: HashMap<&str, &Symbol> = symbols.iter().map(|s| (s.name.as_str(), s)).collect();
        let mut relationships = Vec::new();
        collect_relationships(tree.root_node(), &base, &by_name, &mut relationships);
        relationships
    }

    fn infer_types(&self, symbols: &[Symbol]) -> HashMap<String, TypeInfo> {
        symbols
            .iter()
            .map(|s| {
                let resolved = s
                    .signature
                    .as_ref()
                    .and_then(|sig| sig.split(':').nth(1))
                    .map(|t| t.split('{').next().unwrap_or(t).trim().to_string())
                    .filter(|t| !t.is_empty())
                    .unwrap_or_else(|| super::base::INFERRED_TYPE.to_string());
                let is_inferred = resolved == super::base::INFERRED_TYPE;
                (
                    s.id.clone(),
                    TypeInfo {
                        symbol_id: s.id.clone(),
                        resolved_type: resolved,
                        is_inferred,
                    },
                )
            })
            .collect()
    }
}

fn collect_relationships<'a>(
    node: Node<'a>,
    base: &BaseExtractor,
    by_name: &HashMap<&str, &Symbol>,
    out: &mut Vec<Relationship>,
) {
    match node.kind() {
        "call_expression" => {
            if let Some(func) = node.child_by_field_name("function") {
                let name = base.node_text(&func).rsplit('.').next().unwrap_or("");
                if let Some(target) = by_name.get(name) {
                    let (line, col, _, _) = BaseExtractor::position_of(&node);
                    out.push(Relationship::new(
                        fingerprint_symbol_id(base.file_path, "caller", node.start_byte() as u32, &SymbolKind::Function),
                        target.id.clone(),
                        RelationshipKind::Calls,
                        base.file_path,
                        line,
                        col,
                        line,
                        col,
                    ));
                }
            }
        }
        "class_heritage" => {
            let text = base.node_text(&node);
            for token in text.split_whitespace() {
                if let Some(target) = by_name.get(token.trim_matches(',')) {
                    if let Some(class_node) = node.parent() {
                        if let Some(class_name) = class_node.child_by_field_name("name") {
                            let cname = base.node_text(&class_name);
                            if let Some(from) = by_name.get(cname) {
                                let kind = if text.trim_start().starts_with("implements") {
                                    RelationshipKind::Implements
                                } else {
                                    RelationshipKind::Extends
                                };
                                let (line, col, _, _) = BaseExtractor::position_of(&node);
                                out.push(Relationship::new(
                                    from.id.clone(),
                                    target.id.clone(),
                                    kind,
                                    base.file_path,
                                    line,
                                    col,
                                    line,
                                    col,
                                ));
                            }
                        }
                    }
                }
            }
        }
        "import_statement" => {
            let text = base.node_text(&node);
            let (line, col, _, _) = BaseExtractor::position_of(&node);
            for (name, symbol) in by_name.iter() {
                if text.contains(name) {
                    out.push(Relationship::new(
                        fingerprint_symbol_id(base.file_path, "module", 0, &SymbolKind::Module),
                        symbol.id.clone(),
                        RelationshipKind::Imports,
                        base.file_path,
                        line,
                        col,
                        line,
                        col,
                    ));
                }
            }
        }
        _ => {}
    }

    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        collect_relationships(child, base, by_name, out);
    }
}

fn first_line(text: &str) -> String {
    text.lines().next().unwrap_or(text).trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(src: &str) -> tree_sitter::Tree {
        let mut parser = tree_sitter::Parser::new();
        parser
            .set_language(&tree_sitter_typescript::LANGUAGE_TYPESCRIPT.into())
            .unwrap();
        parser.parse(src, None).unwrap()
    }

    #[test]
    fn extracts_class_symbol_spanning_name_not_body() {
        let src = "class FileWatcher {\n  constructor() {}\n}";
        let tree = parse(src);
        let extractor = TypeScriptExtractor;
        let (symbols, _) = extractor.extract_symbols(&tree, src, "a.ts");
        let class = symbols.iter().find(|s| s.name == "FileWatcher").unwrap();
        assert_eq!(class.start_line, 1);
        assert_eq!(class.start_column, 6);
        assert_eq!(class.end_column, 17);
        assert_eq!(class.end_line, 1);
    }

    #[test]
    fn camel_case_function_extracted() {
        let src = "function getUserData() { return 1; }";
        let tree = parse(src);
        let extractor = TypeScriptExtractor;
        let (symbols, _) = extractor.extract_symbols(&tree, src, "a.ts");
        assert!(symbols.iter().any(|s| s.name == "getUserData"));
    }
}
