use std::fmt;

use crate::analyzer::Ty;

use super::{ConstantValue, Expr};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Location {
    pub line: u32,
    pub col: u32,
}

impl Location {
    pub fn new(line: u32, col: u32) -> Self {
        Self { line, col }
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.col)
    }
}

/// Identity of a scope-forming node, used to hand symbol tables from the
/// analyzer to the code generator.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub u32);

#[derive(Clone, Debug, PartialEq)]
pub struct Program {
    pub id: NodeId,
    pub location: Location,
    pub name: String,
    pub declarations: Vec<Declaration>,
    pub functions: Vec<Function>,
    pub body: CompoundStmt,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Function {
    pub id: NodeId,
    pub location: Location,
    pub name: String,
    pub parameters: Vec<Declaration>,
    pub return_type: Ty,
    pub body: CompoundStmt,
}

impl Function {
    pub fn parameter_types(&self) -> Vec<Ty> {
        self.parameters
            .iter()
            .flat_map(|d| d.variables.iter().map(|v| v.ty.clone()))
            .collect()
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Declaration {
    pub location: Location,
    pub variables: Vec<Variable>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Variable {
    pub location: Location,
    pub name: String,
    pub ty: Ty,
    pub constant: Option<ConstantValue>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct CompoundStmt {
    pub id: NodeId,
    pub location: Location,
    pub declarations: Vec<Declaration>,
    pub stmts: Vec<Stmt>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Stmt {
    pub location: Location,
    pub kind: StmtKind,
}

#[derive(Clone, Debug, PartialEq)]
pub enum StmtKind {
    Compound(CompoundStmt),
    Assign(Assignment),
    Print(Expr),
    /// The target is always a variable reference.
    Read(Expr),
    If(Expr, CompoundStmt, Option<CompoundStmt>),
    While(Expr, CompoundStmt),
    For(Box<For>),
    Return(Option<Expr>),
    /// A function invocation whose value, if any, is discarded.
    Call(Expr),
}

#[derive(Clone, Debug, PartialEq)]
pub struct Assignment {
    pub location: Location,
    /// Always a variable reference.
    pub lvalue: Expr,
    pub expr: Expr,
}

#[derive(Clone, Debug, PartialEq)]
pub struct For {
    pub id: NodeId,
    pub location: Location,
    pub loop_var: Variable,
    pub init: Assignment,
    pub end: Expr,
    pub body: CompoundStmt,
}
