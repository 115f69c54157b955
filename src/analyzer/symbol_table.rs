use std::collections::HashMap;
use std::fmt;

use crate::parser::NodeId;

use super::Ty;

/// Finished symbol tables of every scope-forming node, keyed by node identity.
pub type ScopeMap = HashMap<NodeId, SymbolTable>;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SymbolKind {
    Program,
    Function,
    Parameter,
    Variable,
    LoopVariable,
    Constant,
}

impl SymbolKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SymbolKind::Program => "program",
            SymbolKind::Function => "function",
            SymbolKind::Parameter => "parameter",
            SymbolKind::Variable => "variable",
            SymbolKind::LoopVariable => "loop_var",
            SymbolKind::Constant => "constant",
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum Attribute {
    None,
    /// Literal text of a constant's value.
    Constant(String),
    /// Parameter types of a function, in declaration order.
    Parameters(Vec<Ty>),
}

impl fmt::Display for Attribute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Attribute::None => Ok(()),
            Attribute::Constant(literal) => f.write_str(literal),
            Attribute::Parameters(tys) => {
                for (i, ty) in tys.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}", ty)?;
                }
                Ok(())
            }
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct SymbolEntry {
    pub name: String,
    pub kind: SymbolKind,
    pub ty: Ty,
    pub attribute: Attribute,
    /// The declaration itself was erroneous; uses are not diagnosed again.
    pub has_error: bool,
    pub level: usize,
    /// Frame-relative offset, assigned by the code generator.
    pub offset: Option<i32>,
}

impl SymbolEntry {
    pub fn new(name: &str, kind: SymbolKind, ty: Ty) -> Self {
        Self {
            name: name.to_string(),
            kind,
            ty,
            attribute: Attribute::None,
            has_error: false,
            level: 0,
            offset: None,
        }
    }

    pub fn with_attribute(mut self, attribute: Attribute) -> Self {
        self.attribute = attribute;
        self
    }

    pub fn is_variable_like(&self) -> bool {
        !matches!(self.kind, SymbolKind::Program | SymbolKind::Function)
    }

    pub fn parameter_types(&self) -> &[Ty] {
        match &self.attribute {
            Attribute::Parameters(tys) => tys,
            _ => &[],
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct SymbolTable {
    level: usize,
    entries: Vec<SymbolEntry>,
}

impl SymbolTable {
    pub fn new(level: usize) -> Self {
        Self {
            level,
            entries: vec![],
        }
    }

    pub fn level(&self) -> usize {
        self.level
    }

    pub fn entries(&self) -> &[SymbolEntry] {
        &self.entries
    }

    /// Callers check `has_symbol` first; names are unique within a table.
    pub fn add_symbol(&mut self, mut entry: SymbolEntry) {
        debug_assert!(!self.has_symbol(&entry.name));
        entry.level = self.level;
        self.entries.push(entry);
    }

    pub fn has_symbol(&self, name: &str) -> bool {
        self.entries.iter().any(|e| e.name == name)
    }

    pub fn get_symbol(&self, name: &str) -> Option<&SymbolEntry> {
        self.entries.iter().find(|e| e.name == name)
    }

    pub fn get_symbol_mut(&mut self, name: &str) -> Option<&mut SymbolEntry> {
        self.entries.iter_mut().find(|e| e.name == name)
    }

    pub fn last_symbol_mut(&mut self) -> Option<&mut SymbolEntry> {
        self.entries.last_mut()
    }
}

fn demarcation(f: &mut fmt::Formatter<'_>, c: char) -> fmt::Result {
    writeln!(f, "{}", c.to_string().repeat(110))
}

impl fmt::Display for SymbolTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        demarcation(f, '=')?;
        writeln!(
            f,
            "{:<33}{:<11}{:<11}{:<17}{:<11}",
            "Name", "Kind", "Level", "Type", "Attribute"
        )?;
        demarcation(f, '-')?;
        let scope = if self.level == 0 { "(global)" } else { "(local)" };
        for entry in &self.entries {
            writeln!(
                f,
                "{:<33}{:<11}{}{:<10}{:<17}{:<11}",
                entry.name,
                entry.kind.as_str(),
                self.level,
                scope,
                entry.ty.to_string(),
                entry.attribute.to_string()
            )?;
        }
        demarcation(f, '-')
    }
}

/// Stack of the symbol tables active at a point of the traversal.
#[derive(Debug, Default)]
pub struct ScopeChain {
    tables: Vec<SymbolTable>,
}

impl ScopeChain {
    pub fn new() -> Self {
        Self { tables: vec![] }
    }

    pub fn level(&self) -> usize {
        self.tables.len()
    }

    /// Pushes a fresh table one level deeper than the current top.
    pub fn push_scope(&mut self) {
        let level = self.level();
        self.tables.push(SymbolTable::new(level));
    }

    /// Pushes a table built during an earlier traversal.
    pub fn push_table(&mut self, table: SymbolTable) {
        self.tables.push(table);
    }

    pub fn pop_scope(&mut self) -> Option<SymbolTable> {
        self.tables.pop()
    }

    pub fn current(&self) -> Option<&SymbolTable> {
        self.tables.last()
    }

    pub fn current_mut(&mut self) -> Option<&mut SymbolTable> {
        self.tables.last_mut()
    }

    pub fn has_symbol(&self, name: &str) -> bool {
        self.current().is_some_and(|t| t.has_symbol(name))
    }

    pub fn add_symbol(&mut self, entry: SymbolEntry) {
        if let Some(table) = self.current_mut() {
            table.add_symbol(entry);
        }
    }

    pub fn lookup(&self, name: &str) -> Option<&SymbolEntry> {
        self.tables.iter().rev().find_map(|t| t.get_symbol(name))
    }

    pub fn lookup_mut(&mut self, name: &str) -> Option<&mut SymbolEntry> {
        self.tables
            .iter_mut()
            .rev()
            .find_map(|t| t.get_symbol_mut(name))
    }

    /// Searches every active scope for a loop variable with this name.
    pub fn has_loop_variable(&self, name: &str) -> bool {
        self.tables
            .iter()
            .filter_map(|t| t.get_symbol(name))
            .any(|e| e.kind == SymbolKind::LoopVariable)
    }
}
