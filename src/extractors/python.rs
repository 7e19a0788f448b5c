//! Python extractor — the third representative concrete
//! [`super::LanguageExtractor`] (see module docs on [`super::rust`]).

use std::collections::HashMap;

use tree_sitter::Node;

use super::base::{fingerprint_symbol_id, BaseExtractor, Symbol, SymbolKind, Visibility};
use super::{LanguageExtractor, Relationship, RelationshipKind, TypeInfo};
use crate::error::Diagnostic;

pub struct PythonExtractor;

impl PythonExtractor {
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
            "function_definition" => {
                if let Some(name_node) = node.child_by_field_name("name") {
                    let kind = if parent_id.is_some() {
                        SymbolKind::Method
                    } else {
                        SymbolKind::Function
                    };
                    let symbol = self.make_symbol(base, &name_node, &node, kind, parent_id);
                    next_parent = Some(symbol.id.clone());
                    symbols.push(symbol);
                } else {
                    diagnostics.push(Diagnostic::for_path(
                        base.file_path,
                        format!("function_definition missing name at byte {}", node.start_byte()),
                    ));
                }
            }
            "class_definition" => {
                if let Some(name_node) = node.child_by_field_name("name") {
                    let symbol = self.make_symbol(base, &name_node, &node, SymbolKind::Class, parent_id);
                    next_parent = Some(symbol.id.clone());
                    symbols.push(symbol);
                }
            }
            "assignment" if node.parent().map(|p| p.kind()) != Some("augmented_assignment") => {
                if let Some(target) = node.child_by_field_name("left") {
                    if target.kind() == "identifier" {
                        let name = base.node_text(&target);
                        let is_module_level = parent_id.is_none();
                        let is_constant = name.chars().all(|c| c.is_uppercase() || c == '_') && !name.is_empty();
                        if is_module_level || parent_id.is_some() {
                            let kind = if is_constant {
                                SymbolKind::Constant
                            } else {
                                SymbolKind::Variable
                            };
                            let symbol = self.make_symbol(base, &target, &node, kind, parent_id);
                            symbols.push(symbol);
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
        let visibility = if name.starts_with('_') {
            Visibility::Private
        } else {
            Visibility::Public
        };

        let mut symbol = Symbol::new(
            &qualified_name,
            name,
            kind,
            "python",
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
        if decl_node.kind() == "function_definition" {
            symbol.signature = Some(first_line(base.node_text(decl_node)));
            symbol.doc_comment = docstring_of(decl_node, base);
        }
        symbol
    }
}

impl LanguageExtractor for PythonExtractor {
    fn language(&self) -> &'static str {
        "python"
    }

    fn extract_symbols(&self, tree: &tree_sitter::Tree, content: &str, file_path: &str) -> (Vec<Symbol>, Vec<Diagnostic>) {
        let base = BaseExtractor::new("python", file_path, content);
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
        let base = BaseExtractor::new("python", file_path, content);
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
                    .map(|t| t.trim().trim_end_matches(':').trim().to_string())
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
        "call" => {
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
        "class_definition" => {
            if let Some(superclasses) = node.child_by_field_name("superclasses") {
                if let Some(name_node) = node.child_by_field_name("name") {
                    let class_name = base.node_text(&name_node);
                    if let Some(from) = by_name.get(class_name) {
                        let text = base.node_text(&superclasses);
                        for part in text.trim_matches(|c| c == '(' || c == ')').split(',') {
                            let part = part.trim();
                            if let Some(target) = by_name.get(part) {
                                let (line, col, _, _) = BaseExtractor::position_of(&node);
                                out.push(Relationship::new(
                                    from.id.clone(),
                                    target.id.clone(),
                                    RelationshipKind::Extends,
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
        "import_from_statement" | "import_statement" => {
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

fn docstring_of(func_node: &Node, base: &BaseExtractor) -> Option<String> {
    let body = func_node.child_by_field_name("body")?;
    let mut cursor = body.walk();
    let first_stmt = body.children(&mut cursor).next()?;
    if first_stmt.kind() == "expression_statement" {
        let mut inner = first_stmt.walk();
        let expr = first_stmt.children(&mut inner).next()?;
        if expr.kind() == "string" {
            return Some(base.node_text(&expr).trim_matches(['"', '\'']).trim().to_string());
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(src: &str) -> tree_sitter::Tree {
        let mut parser = tree_sitter::Parser::new();
        parser
            .set_language(&tree_sitter_python::LANGUAGE.into())
            .unwrap();
        parser.parse(src, None).unwrap()
    }

    #[test]
    fn snake_case_function_extracted() {
        let src = "def get_user_data():\n    pass\n";
        let tree = parse(src);
        let extractor = PythonExtractor;
        let (symbols, _) = extractor.extract_symbols(&tree, src, "b.py");
        let func = symbols.iter().find(|s| s.name == "get_user_data").unwrap();
        assert_eq!(&src[func.start_byte as usize..func.end_byte as usize], "get_user_data");
    }

    #[test]
    fn underscore_prefixed_function_is_private() {
        let src = "def _helper():\n    pass\n";
        let tree = parse(src);
        let extractor = PythonExtractor;
        let (symbols, _) = extractor.extract_symbols(&tree, src, "b.py");
        let func = symbols.iter().find(|s| s.name == "_helper").unwrap();
        assert_eq!(func.visibility, Visibility::Private);
    }
}
