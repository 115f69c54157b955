use std::fmt;

use crate::analyzer::{Primitive, Ty};

use super::Location;

#[derive(Clone, Debug, PartialEq)]
pub struct Expr {
    pub location: Location,
    pub kind: ExprKind,
    /// Set by the analyzer. Left as `None` when analysis of this expression
    /// failed, which tells enclosing checks to give up on it.
    pub ty: Option<Ty>,
}

impl Expr {
    pub fn new(location: Location, kind: ExprKind) -> Self {
        Self {
            location,
            kind,
            ty: None,
        }
    }

    pub fn as_variable(&self) -> Option<&VariableReference> {
        match &self.kind {
            ExprKind::Variable(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_constant(&self) -> Option<&ConstantValue> {
        match &self.kind {
            ExprKind::Constant(c) => Some(c),
            _ => None,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum ExprKind {
    Binary(BinOpKind, Box<Expr>, Box<Expr>),
    Unary(UnaryOpKind, Box<Expr>),
    Call(FunctionInvocation),
    Variable(VariableReference),
    Constant(ConstantValue),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BinOpKind {
    Or,
    And,
    Equal,
    NotEqual,
    LessThan,
    LessEqual,
    GreaterThan,
    GreaterEqual,
    Add,
    Sub,
    Mul,
    Div,
    Mod,
}

impl BinOpKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            BinOpKind::Or => "or",
            BinOpKind::And => "and",
            BinOpKind::Equal => "=",
            BinOpKind::NotEqual => "<>",
            BinOpKind::LessThan => "<",
            BinOpKind::LessEqual => "<=",
            BinOpKind::GreaterThan => ">",
            BinOpKind::GreaterEqual => ">=",
            BinOpKind::Add => "+",
            BinOpKind::Sub => "-",
            BinOpKind::Mul => "*",
            BinOpKind::Div => "/",
            BinOpKind::Mod => "mod",
        }
    }

    pub fn is_arithmetic(&self) -> bool {
        matches!(
            self,
            BinOpKind::Add | BinOpKind::Sub | BinOpKind::Mul | BinOpKind::Div
        )
    }

    pub fn is_relational(&self) -> bool {
        matches!(
            self,
            BinOpKind::Equal
                | BinOpKind::NotEqual
                | BinOpKind::LessThan
                | BinOpKind::LessEqual
                | BinOpKind::GreaterThan
                | BinOpKind::GreaterEqual
        )
    }
}

impl fmt::Display for BinOpKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UnaryOpKind {
    Neg,
    Not,
}

impl UnaryOpKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            UnaryOpKind::Neg => "neg",
            UnaryOpKind::Not => "not",
        }
    }
}

impl fmt::Display for UnaryOpKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct FunctionInvocation {
    pub name: String,
    pub args: Vec<Expr>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct VariableReference {
    pub name: String,
    pub indices: Vec<Expr>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct ConstantValue {
    pub location: Location,
    pub primitive: Primitive,
    /// Source text of the literal. Integers are in decimal, strings are unquoted.
    pub literal: String,
}

impl ConstantValue {
    pub fn ty(&self) -> Ty {
        Ty::new(self.primitive)
    }

    pub fn as_integer(&self) -> Option<i64> {
        match self.primitive {
            Primitive::Integer => self.literal.parse().ok(),
            Primitive::Boolean => Some((self.literal == "true") as i64),
            _ => None,
        }
    }
}
