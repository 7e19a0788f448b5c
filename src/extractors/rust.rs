//! Rust extractor — one of the representative concrete
//! [`super::LanguageExtractor`] implementations (spec §4.2 scopes the
//! uniform contract; per-language bodies beyond this illustrative set
//! are out of core scope).

use std::collections::HashMap;

use tree_sitter::Node;

use super::base::{fingerprint_symbol_id, BaseExtractor, Symbol, SymbolKind, Visibility};
use super::{LanguageExtractor, Relationship, RelationshipKind, TypeInfo};
use crate::error::Diagnostic;

pub struct RustExtractor;

impl RustExtractor {
    fn walk<'a>(
        &self,
        node: Node<'a>,
        base: &BaseExtractor,
        parent_id: Option<&str>,
        enclosing_container: Option<Node<'a>>,
        symbols: &mut Vec<Symbol>,
        diagnostics: &mut Vec<Diagnostic>,
    ) {
        let mut next_parent = parent_id.map(|s| s.to_string());
        let mut next_container = enclosing_container;

        match node.kind() {
            "function_item" | "function_signature_item" => {
                if let Some(name_node) = node.child_by_field_name("name") {
                    let symbol = self.make_symbol(
                        base,
                        &name_node,
                        &node,
                        if parent_id.is_some() {
                            SymbolKind::Method
                        } else {
                            SymbolKind::Function
                        },
                        parent_id,
                    );
                    next_parent = Some(symbol.id.clone());
                    next_container = Some(node);
                    symbols.push(symbol);
                } else {
                    diagnostics.push(Diagnostic::for_path(
                        base.file_path,
                        format!("function_item missing name at byte {}", node.start_byte()),
                    ));
                }
            }
            "struct_item" => {
                if let Some(name_node) = node.child_by_field_name("name") {
                    let symbol = self.make_symbol(base, &name_node, &node, SymbolKind::Class, parent_id);
                    next_parent = Some(symbol.id.clone());
                    next_container = Some(node);
                    symbols.push(symbol);
                }
            }
            "enum_item" => {
                if let Some(name_node) = node.child_by_field_name("name") {
                    let symbol = self.make_symbol(base, &name_node, &node, SymbolKind::Enum, parent_id);
                    next_parent = Some(symbol.id.clone());
                    next_container = Some(node);
                    symbols.push(symbol);
                }
            }
            "enum_variant" => {
                if let Some(name_node) = node.child_by_field_name("name") {
                    let symbol = self.make_symbol(base, &name_node, &node, SymbolKind::EnumMember, parent_id);
                    symbols.push(symbol);
                }
            }
            "trait_item" => {
                if let Some(name_node) = node.child_by_field_name("name") {
                    let symbol = self.make_symbol(base, &name_node, &node, SymbolKind::Interface, parent_id);
                    next_parent = Some(symbol.id.clone());
                    next_container = Some(node);
                    symbols.push(symbol);
                }
            }
            "field_declaration" => {
                if let Some(name_node) = node.child_by_field_name("name") {
                    let symbol = self.make_symbol(base, &name_node, &node, SymbolKind::Field, parent_id);
                    symbols.push(symbol);
                }
            }
            "const_item" | "static_item" => {
                if let Some(name_node) = node.child_by_field_name("name") {
                    let symbol = self.make_symbol(base, &name_node, &node, SymbolKind::Constant, parent_id);
                    symbols.push(symbol);
                }
            }
            "let_declaration" => {
                if let Some(pattern) = node.child_by_field_name("pattern") {
                    if pattern.kind() == "identifier" {
                        let symbol = self.make_symbol(base, &pattern, &node, SymbolKind::Variable, parent_id);
                        symbols.push(symbol);
                    }
                }
            }
            "type_item" => {
                if let Some(name_node) = node.child_by_field_name("name") {
                    let symbol = self.make_symbol(base, &name_node, &node, SymbolKind::TypeAlias, parent_id);
                    symbols.push(symbol);
                }
            }
            "mod_item" => {
                if let Some(name_node) = node.child_by_field_name("name") {
                    let symbol = self.make_symbol(base, &name_node, &node, SymbolKind::Module, parent_id);
                    next_parent = Some(symbol.id.clone());
                    next_container = Some(node);
                    symbols.push(symbol);
                }
            }
            "impl_item" => {
                // impl blocks don't create a symbol themselves but their
                // methods parent to the type being implemented.
                next_container = Some(node);
                if let Some(type_node) = node.child_by_field_name("type") {
                    let type_name = last_segment(base.node_text(&type_node));
                    if let Some(target) = symbols.iter().find(|s| s.name == type_name) {
                        next_parent = Some(target.id.clone());
                    }
                }
            }
            _ => {}
        }

        let mut cursor = node.walk();
        for child in node.children(&mut cursor) {
            self.walk(
                child,
                base,
                next_parent.as_deref().or(parent_id),
                next_container,
                symbols,
                diagnostics,
            );
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
        let modifiers_text = base.node_text(decl_node);
        let visibility = if modifiers_text.trim_start().starts_with("pub") {
            Visibility::Public
        } else {
            BaseExtractor::infer_visibility(&name, modifiers_text)
        };

        let mut symbol = Symbol::new(
            &qualified_name,
            name,
            kind,
            "rust",
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
        symbol.signature = decl_node
            .child_by_field_name("parameters")
            .map(|_| first_line(base.node_text(decl_node)));
        symbol.doc_comment = leading_doc_comment(decl_node, base);
        symbol
    }
}

impl LanguageExtractor for RustExtractor {
    fn language(&self) -> &'static str {
        "rust"
    }

    fn extract_symbols(&self, tree: &tree_sitter::Tree, content: &str, file_path: &str) -> (Vec<Symbol>, Vec<Diagnostic>) {
        let base = BaseExtractor::new("rust", file_path, content);
        let mut symbols = Vec::new();
        let mut diagnostics = Vec::new();
        self.walk(tree.root_node(), &base, None, None, &mut symbols, &mut diagnostics);
        (symbols, diagnostics)
    }

    fn extract_relationships(
        &self,
        tree: &tree_sitter::Tree,
        content: &str,
        file_path: &str,
        symbols: &[Symbol],
    ) -> Vec<Relationship> {
        let base = BaseExtractor::new("rust", file_path, content);
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
                    .and_then(|sig| sig.split("->").nth(1))
                    .map(|t| t.trim().trim_end_matches('{').trim().to_string())
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
                let name = last_segment(base.node_text(&func));
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
        "impl_item" => {
            if let (Some(trait_node), Some(type_node)) =
                (node.child_by_field_name("trait"), node.child_by_field_name("type"))
            {
                let trait_name = last_segment(base.node_text(&trait_node));
                let type_name = last_segment(base.node_text(&type_node));
                if let (Some(from), Some(to)) = (by_name.get(type_name), by_name.get(trait_name)) {
                    let (line, col, _, _) = BaseExtractor::position_of(&node);
                    out.push(Relationship::new(
                        from.id.clone(),
                        to.id.clone(),
                        RelationshipKind::Implements,
                        base.file_path,
                        line,
                        col,
                        line,
                        col,
                    ));
                }
            }
        }
        "use_declaration" => {
            let (line, col, _, _) = BaseExtractor::position_of(&node);
            let used = base.node_text(&node).trim().to_string();
            if let Some(target_name) = used.rsplit("::").next() {
                if let Some(target) = by_name.get(target_name.trim_end_matches(';')) {
                    out.push(Relationship::new(
                        fingerprint_symbol_id(base.file_path, "module", 0, &SymbolKind::Module),
                        target.id.clone(),
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

fn last_segment(text: &str) -> &str {
    text.rsplit("::").next().unwrap_or(text).trim()
}

fn first_line(text: &str) -> String {
    text.lines().next().unwrap_or(text).trim().to_string()
}

fn leading_doc_comment(node: &Node, base: &BaseExtractor) -> Option<String> {
    let mut sibling = node.prev_sibling();
    let mut lines = Vec::new();
    while let Some(n) = sibling {
        if n.kind() == "line_comment" {
            let text = base.node_text(&n);
            if let Some(doc) = text.strip_prefix("///").or_else(|| text.strip_prefix("//!")) {
                lines.push(doc.trim().to_string());
                sibling = n.prev_sibling();
                continue;
            }
        }
        break;
    }
    if lines.is_empty() {
        None
    } else {
        lines.reverse();
        Some(lines.join("\n"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(src: &str) -> tree_sitter::Tree {
        let mut parser = tree_sitter::Parser::new();
        parser
            .set_language(&tree_sitter_rust::LANGUAGE.into())
            .unwrap();
        parser.parse(src, None).unwrap()
    }

    #[test]
    fn extracts_function_symbol_spanning_name() {
        let src = "pub fn get_user_data() -> u32 { 0 }";
        let tree = parse(src);
        let extractor = RustExtractor;
        let (symbols, _) = extractor.extract_symbols(&tree, src, "a.rs");
        let func = symbols.iter().find(|s| s.name == "get_user_data").unwrap();
        assert_eq!(func.kind, SymbolKind::Function);
        assert_eq!(&src[func.start_byte as usize..func.end_byte as usize], "get_user_data");
        assert_eq!(func.visibility, Visibility::Public);
    }

    #[test]
    fn methods_parent_to_enclosing_struct() {
        let src = "struct Foo; impl Foo { fn bar(&self) {} }";
        let tree = parse(src);
        let extractor = RustExtractor;
        let (symbols, _) = extractor.extract_symbols(&tree, src, "a.rs");
        let foo = symbols.iter().find(|s| s.name == "Foo").unwrap();
        let bar = symbols.iter().find(|s| s.name == "bar").unwrap();
        assert_eq!(bar.parent_id.as_deref(), Some(foo.id.as_str()));
    }
}
