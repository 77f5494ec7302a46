//! Renders a synthesized unit as Rust source

use crate::unit::{SynthesizedUnit, UnitDeclaration};
use std::fmt::Write;

const INDENT: &str = "    ";

/// Namespace tree in first-appearance order
#[derive(Default)]
struct Scope<'a> {
    declarations: Vec<&'a UnitDeclaration>,
    children: Vec<(String, Scope<'a>)>,
}

impl<'a> Scope<'a> {
    fn insert(&mut self, path: &[String], declaration: &'a UnitDeclaration) {
        let Some((head, rest)) = path.split_first() else {
            self.declarations.push(declaration);
            return;
        };
        let index = match self.children.iter().position(|(name, _)| name == head) {
            Some(index) => index,
            None => {
                self.children.push((head.clone(), Scope::default()));
                self.children.len() - 1
            }
        };
        self.children[index].1.insert(rest, declaration);
    }
}

/// Render `unit` as a generated source file.
///
/// Output depends only on the unit, so identical units render byte-identical.
pub fn render_unit(unit: &SynthesizedUnit) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "// @generated by markgen from {}. Do not edit.",
        unit.path.display()
    );
    let _ = writeln!(out, "// fingerprint: {}", unit.fingerprint);

    let mut root = Scope::default();
    for declaration in &unit.declarations {
        root.insert(&declaration.declaration.namespace, declaration);
    }
    render_scope(&mut out, unit, &root, &mut Vec::new());
    out
}

fn render_scope(out: &mut String, unit: &SynthesizedUnit, scope: &Scope<'_>, path: &mut Vec<String>) {
    let indent = INDENT.repeat(path.len());

    if let Some(imports) = unit.imports.get(&path.join("::")) {
        if !imports.is_empty() && !scope.declarations.is_empty() {
            out.push('\n');
            for import in imports {
                let _ = writeln!(out, "{}{}", indent, import);
            }
        }
    }

    for declaration in &scope.declarations {
        out.push('\n');
        let _ = writeln!(out, "{}// {} via {}", indent, declaration.origin, declaration.identity);
        let _ = writeln!(out, "{}{}", indent, declaration.declaration.source);
    }

    for (name, child) in &scope.children {
        out.push('\n');
        let _ = writeln!(out, "{}pub mod {} {{", indent, name);
        path.push(name.clone());
        render_scope(out, unit, child, path);
        path.pop();
        let _ = writeln!(out, "{}}}", indent);
    }
}
