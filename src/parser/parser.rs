use thiserror::Error;

use crate::analyzer::{Primitive, Ty};
use crate::lexer::{Token, TokenKind};

use super::{
    Assignment, BinOpKind, CompoundStmt, ConstantValue, Declaration, Expr, ExprKind, For,
    Function, FunctionInvocation, Location, NodeId, Program, Stmt, StmtKind, UnaryOpKind,
    Variable, VariableReference,
};

#[derive(Clone, Debug, Error, PartialEq)]
#[error("<Error> Found in line {}, column {}: {message}", .location.line, .location.col)]
pub struct ParseError {
    pub location: Location,
    pub message: String,
}

impl ParseError {
    pub fn new(location: Location, message: impl Into<String>) -> Self {
        Self {
            location,
            message: message.into(),
        }
    }
}

type PResult<T> = Result<T, ParseError>;

#[derive(Debug)]
pub struct Parser {
    tokens: Vec<Token>,
    index: usize,
    next_id: u32,
}

impl Parser {
    pub fn new(tokens: Vec<Token>) -> Self {
        Self {
            tokens,
            index: 0,
            next_id: 0,
        }
    }

    pub fn parse(&mut self) -> PResult<Program> {
        let program = self.parse_program()?;
        if !self.is_eof() {
            return Err(self.unexpected("end of input"));
        }
        Ok(program)
    }

    fn is_eof(&self) -> bool {
        self.index >= self.tokens.len()
    }

    fn peek(&self) -> Option<&TokenKind> {
        self.tokens.get(self.index).map(|t| &t.kind)
    }

    fn peek_nth(&self, n: usize) -> Option<&TokenKind> {
        self.tokens.get(self.index + n).map(|t| &t.kind)
    }

    /// Location of the next token, or just past the last one at EOF.
    fn location(&self) -> Location {
        match self.tokens.get(self.index) {
            Some(t) => t.location,
            None => self
                .tokens
                .last()
                .map(|t| Location::new(t.location.line, t.location.col + 1))
                .unwrap_or(Location::new(1, 1)),
        }
    }

    fn new_id(&mut self) -> NodeId {
        let id = NodeId(self.next_id);
        self.next_id += 1;
        id
    }

    fn unexpected(&self, expected: &str) -> ParseError {
        let found = match self.peek() {
            Some(kind) => format!("{:?}", kind),
            None => "EOF".to_string(),
        };
        ParseError::new(
            self.location(),
            format!("unexpected {} (was expecting {})", found, expected),
        )
    }

    fn consume(&mut self, kind: &TokenKind) -> bool {
        if self.peek() != Some(kind) {
            return false;
        }
        self.index += 1;
        true
    }

    fn expect(&mut self, kind: &TokenKind) -> PResult<()> {
        if self.consume(kind) {
            Ok(())
        } else {
            Err(self.unexpected(&format!("{:?}", kind)))
        }
    }

    fn consume_ident(&mut self) -> Option<(String, Location)> {
        let location = self.location();
        if let Some(TokenKind::Ident(name)) = self.peek() {
            let name = name.clone();
            self.index += 1;
            Some((name, location))
        } else {
            None
        }
    }

    fn expect_ident(&mut self) -> PResult<(String, Location)> {
        self.consume_ident()
            .ok_or_else(|| self.unexpected("an identifier"))
    }

    /// program = ID ";" decl* function* compound "end"
    fn parse_program(&mut self) -> PResult<Program> {
        let id = self.new_id();
        let (name, location) = self.expect_ident()?;
        self.expect(&TokenKind::SemiColon)?;

        let mut declarations = vec![];
        while self.peek() == Some(&TokenKind::Var) {
            declarations.push(self.parse_declaration()?);
        }

        let mut functions = vec![];
        while matches!(self.peek(), Some(TokenKind::Ident(_))) {
            functions.push(self.parse_function()?);
        }

        let body = self.parse_compound()?;
        self.expect(&TokenKind::End)?;

        Ok(Program {
            id,
            location,
            name,
            declarations,
            functions,
            body,
        })
    }

    /// idlist = ID ("," ID)*
    fn parse_idlist(&mut self) -> PResult<Vec<(String, Location)>> {
        let mut ids = vec![self.expect_ident()?];
        while self.consume(&TokenKind::Comma) {
            ids.push(self.expect_ident()?);
        }
        Ok(ids)
    }

    /// decl = "var" idlist ":" (type (":=" literal)? | literal) ";"
    fn parse_declaration(&mut self) -> PResult<Declaration> {
        let location = self.location();
        self.expect(&TokenKind::Var)?;
        let ids = self.parse_idlist()?;
        self.expect(&TokenKind::Colon)?;

        let (ty, constant) = if self.is_type_start() {
            let ty = self.parse_type()?;
            let constant = if self.consume(&TokenKind::Assign) {
                Some(self.parse_literal()?)
            } else {
                None
            };
            (ty, constant)
        } else {
            let constant = self.parse_literal()?;
            (constant.ty(), Some(constant))
        };
        self.expect(&TokenKind::SemiColon)?;

        let variables = ids
            .into_iter()
            .map(|(name, location)| Variable {
                location,
                name,
                ty: ty.clone(),
                constant: constant.clone(),
            })
            .collect();
        Ok(Declaration {
            location,
            variables,
        })
    }

    fn is_type_start(&self) -> bool {
        matches!(
            self.peek(),
            Some(
                TokenKind::IntegerType
                    | TokenKind::RealType
                    | TokenKind::BooleanType
                    | TokenKind::StringType
                    | TokenKind::Array
            )
        )
    }

    /// type = "integer" | "real" | "boolean" | "string"
    ///      | "array" INT "of" type
    fn parse_type(&mut self) -> PResult<Ty> {
        if self.consume(&TokenKind::Array) {
            let dim = match self.peek() {
                Some(TokenKind::Integer(n)) => n
                    .parse::<i64>()
                    .map_err(|_| ParseError::new(self.location(), "invalid array size"))?,
                _ => return Err(self.unexpected("an array size")),
            };
            self.index += 1;
            self.expect(&TokenKind::Of)?;
            let inner = self.parse_type()?;
            let mut dimensions = vec![dim];
            dimensions.extend(inner.dimensions);
            return Ok(Ty::array(inner.primitive, dimensions));
        }

        let primitive = match self.peek() {
            Some(TokenKind::IntegerType) => Primitive::Integer,
            Some(TokenKind::RealType) => Primitive::Real,
            Some(TokenKind::BooleanType) => Primitive::Boolean,
            Some(TokenKind::StringType) => Primitive::String,
            _ => return Err(self.unexpected("a type")),
        };
        self.index += 1;
        Ok(Ty::new(primitive))
    }

    /// literal = "-"? INT | "-"? REAL | STRING | "true" | "false"
    fn parse_literal(&mut self) -> PResult<ConstantValue> {
        let location = self.location();
        let negative = self.consume(&TokenKind::Minus);
        let sign = if negative { "-" } else { "" };

        let (primitive, literal) = match self.peek() {
            Some(TokenKind::Integer(n)) => (Primitive::Integer, format!("{}{}", sign, n)),
            Some(TokenKind::Real(r)) => (Primitive::Real, format!("{}{}", sign, r)),
            Some(TokenKind::Str(s)) if !negative => (Primitive::String, s.clone()),
            Some(TokenKind::True) if !negative => (Primitive::Boolean, "true".to_string()),
            Some(TokenKind::False) if !negative => (Primitive::Boolean, "false".to_string()),
            _ => return Err(self.unexpected("a literal constant")),
        };
        self.index += 1;

        Ok(ConstantValue {
            location,
            primitive,
            literal,
        })
    }

    /// function = ID "(" (formal (";" formal)*)? ")" (":" type)? compound "end"
    /// formal   = idlist ":" type
    fn parse_function(&mut self) -> PResult<Function> {
        let id = self.new_id();
        let (name, location) = self.expect_ident()?;

        self.expect(&TokenKind::LeftParen)?;
        let mut parameters = vec![];
        if !self.consume(&TokenKind::RightParen) {
            loop {
                let location = self.location();
                let ids = self.parse_idlist()?;
                self.expect(&TokenKind::Colon)?;
                let ty = self.parse_type()?;
                let variables = ids
                    .into_iter()
                    .map(|(name, location)| Variable {
                        location,
                        name,
                        ty: ty.clone(),
                        constant: None,
                    })
                    .collect();
                parameters.push(Declaration {
                    location,
                    variables,
                });
                if !self.consume(&TokenKind::SemiColon) {
                    break;
                }
            }
            self.expect(&TokenKind::RightParen)?;
        }

        let return_type = if self.consume(&TokenKind::Colon) {
            self.parse_type()?
        } else {
            Ty::void()
        };

        let body = self.parse_compound()?;
        self.expect(&TokenKind::End)?;

        Ok(Function {
            id,
            location,
            name,
            parameters,
            return_type,
            body,
        })
    }

    /// compound = "begin" decl* stmt* "end"
    fn parse_compound(&mut self) -> PResult<CompoundStmt> {
        let id = self.new_id();
        let location = self.location();
        self.expect(&TokenKind::Begin)?;

        let mut declarations = vec![];
        while self.peek() == Some(&TokenKind::Var) {
            declarations.push(self.parse_declaration()?);
        }
        let mut stmts = vec![];
        while !self.consume(&TokenKind::End) {
            if self.is_eof() {
                return Err(self.unexpected("End"));
            }
            stmts.push(self.parse_stmt()?);
        }

        Ok(CompoundStmt {
            id,
            location,
            declarations,
            stmts,
        })
    }

    /// stmt = compound
    ///      | ref ":=" expr ";"
    ///      | "print" expr ";"
    ///      | "read" ref ";"
    ///      | "if" expr "then" compound ("else" compound)? "end" "if"
    ///      | "while" expr "do" compound "end" "do"
    ///      | "for" ID ":=" expr "to" expr "do" compound "end" "do"
    ///      | "return" expr? ";"
    ///      | ID "(" (expr ("," expr)*)? ")" ";"
    fn parse_stmt(&mut self) -> PResult<Stmt> {
        let location = self.location();

        let kind = if self.peek() == Some(&TokenKind::Begin) {
            StmtKind::Compound(self.parse_compound()?)
        } else if self.consume(&TokenKind::Print) {
            let expr = self.parse_expr()?;
            self.expect(&TokenKind::SemiColon)?;
            StmtKind::Print(expr)
        } else if self.consume(&TokenKind::Read) {
            let target = self.parse_ref()?;
            self.expect(&TokenKind::SemiColon)?;
            StmtKind::Read(target)
        } else if self.consume(&TokenKind::If) {
            let cond = self.parse_expr()?;
            self.expect(&TokenKind::Then)?;
            let body = self.parse_compound()?;
            let else_body = if self.consume(&TokenKind::Else) {
                Some(self.parse_compound()?)
            } else {
                None
            };
            self.expect(&TokenKind::End)?;
            self.expect(&TokenKind::If)?;
            StmtKind::If(cond, body, else_body)
        } else if self.consume(&TokenKind::While) {
            let cond = self.parse_expr()?;
            self.expect(&TokenKind::Do)?;
            let body = self.parse_compound()?;
            self.expect(&TokenKind::End)?;
            self.expect(&TokenKind::Do)?;
            StmtKind::While(cond, body)
        } else if self.consume(&TokenKind::For) {
            StmtKind::For(Box::new(self.parse_for(location)?))
        } else if self.consume(&TokenKind::Return) {
            let expr = if self.peek() == Some(&TokenKind::SemiColon) {
                None
            } else {
                Some(self.parse_expr()?)
            };
            self.expect(&TokenKind::SemiColon)?;
            StmtKind::Return(expr)
        } else if matches!(self.peek(), Some(TokenKind::Ident(_)))
            && self.peek_nth(1) == Some(&TokenKind::LeftParen)
        {
            let call = self.parse_primary()?;
            self.expect(&TokenKind::SemiColon)?;
            StmtKind::Call(call)
        } else if matches!(self.peek(), Some(TokenKind::Ident(_))) {
            let lvalue = self.parse_ref()?;
            let assign_location = self.location();
            self.expect(&TokenKind::Assign)?;
            let expr = self.parse_expr()?;
            self.expect(&TokenKind::SemiColon)?;
            StmtKind::Assign(Assignment {
                location: assign_location,
                lvalue,
                expr,
            })
        } else {
            return Err(self.unexpected("a statement"));
        };

        Ok(Stmt { location, kind })
    }

    /// for = "for" ID ":=" expr "to" expr "do" compound "end" "do"
    fn parse_for(&mut self, location: Location) -> PResult<For> {
        let id = self.new_id();
        let (name, var_location) = self.expect_ident()?;
        let assign_location = self.location();
        self.expect(&TokenKind::Assign)?;
        let begin = self.parse_expr()?;
        self.expect(&TokenKind::To)?;
        let end = self.parse_expr()?;
        self.expect(&TokenKind::Do)?;
        let body = self.parse_compound()?;
        self.expect(&TokenKind::End)?;
        self.expect(&TokenKind::Do)?;

        let loop_var = Variable {
            location: var_location,
            name: name.clone(),
            ty: Ty::integer(),
            constant: None,
        };
        let lvalue = Expr::new(
            var_location,
            ExprKind::Variable(VariableReference {
                name,
                indices: vec![],
            }),
        );
        Ok(For {
            id,
            location,
            loop_var,
            init: Assignment {
                location: assign_location,
                lvalue,
                expr: begin,
            },
            end,
            body,
        })
    }

    /// ref = ID ("[" expr "]")*
    fn parse_ref(&mut self) -> PResult<Expr> {
        let (name, location) = self.expect_ident()?;
        let mut indices = vec![];
        while self.consume(&TokenKind::LeftSquareBrace) {
            indices.push(self.parse_expr()?);
            self.expect(&TokenKind::RightSquareBrace)?;
        }
        Ok(Expr::new(
            location,
            ExprKind::Variable(VariableReference { name, indices }),
        ))
    }

    fn binary(kind: BinOpKind, location: Location, left: Expr, right: Expr) -> Expr {
        Expr::new(
            location,
            ExprKind::Binary(kind, Box::new(left), Box::new(right)),
        )
    }

    /// expr = and ("or" and)*
    fn parse_expr(&mut self) -> PResult<Expr> {
        let mut node = self.parse_and()?;
        loop {
            let location = self.location();
            if self.consume(&TokenKind::Or) {
                node = Self::binary(BinOpKind::Or, location, node, self.parse_and()?);
            } else {
                return Ok(node);
            }
        }
    }

    /// and = not ("and" not)*
    fn parse_and(&mut self) -> PResult<Expr> {
        let mut node = self.parse_not()?;
        loop {
            let location = self.location();
            if self.consume(&TokenKind::And) {
                node = Self::binary(BinOpKind::And, location, node, self.parse_not()?);
            } else {
                return Ok(node);
            }
        }
    }

    /// not = "not" not
    ///     | relational
    fn parse_not(&mut self) -> PResult<Expr> {
        let location = self.location();
        if self.consume(&TokenKind::Not) {
            let operand = self.parse_not()?;
            return Ok(Expr::new(
                location,
                ExprKind::Unary(UnaryOpKind::Not, Box::new(operand)),
            ));
        }
        self.parse_relational()
    }

    /// relational = add (("<" | "<=" | "<>" | ">=" | ">" | "=") add)?
    fn parse_relational(&mut self) -> PResult<Expr> {
        let node = self.parse_add()?;
        let location = self.location();
        let kind = match self.peek() {
            Some(TokenKind::LessThan) => BinOpKind::LessThan,
            Some(TokenKind::LessEqual) => BinOpKind::LessEqual,
            Some(TokenKind::NotEqual) => BinOpKind::NotEqual,
            Some(TokenKind::GreaterEqual) => BinOpKind::GreaterEqual,
            Some(TokenKind::GreaterThan) => BinOpKind::GreaterThan,
            Some(TokenKind::Equal) => BinOpKind::Equal,
            _ => return Ok(node),
        };
        self.index += 1;
        let right = self.parse_add()?;
        Ok(Self::binary(kind, location, node, right))
    }

    /// add = mul (("+" | "-") mul)*
    fn parse_add(&mut self) -> PResult<Expr> {
        let mut node = self.parse_mul()?;
        loop {
            let location = self.location();
            let kind = match self.peek() {
                Some(TokenKind::Plus) => BinOpKind::Add,
                Some(TokenKind::Minus) => BinOpKind::Sub,
                _ => return Ok(node),
            };
            self.index += 1;
            node = Self::binary(kind, location, node, self.parse_mul()?);
        }
    }

    /// mul = unary (("*" | "/" | "mod") unary)*
    fn parse_mul(&mut self) -> PResult<Expr> {
        let mut node = self.parse_unary()?;
        loop {
            let location = self.location();
            let kind = match self.peek() {
                Some(TokenKind::Star) => BinOpKind::Mul,
                Some(TokenKind::Slash) => BinOpKind::Div,
                Some(TokenKind::Mod) => BinOpKind::Mod,
                _ => return Ok(node),
            };
            self.index += 1;
            node = Self::binary(kind, location, node, self.parse_unary()?);
        }
    }

    /// unary = "-" unary
    ///       | primary
    fn parse_unary(&mut self) -> PResult<Expr> {
        let location = self.location();
        if self.consume(&TokenKind::Minus) {
            let operand = self.parse_unary()?;
            return Ok(Expr::new(
                location,
                ExprKind::Unary(UnaryOpKind::Neg, Box::new(operand)),
            ));
        }
        self.parse_primary()
    }

    /// primary = literal
    ///         | ID "(" (expr ("," expr)*)? ")"
    ///         | ref
    ///         | "(" expr ")"
    fn parse_primary(&mut self) -> PResult<Expr> {
        let location = self.location();
        match self.peek() {
            Some(TokenKind::LeftParen) => {
                self.index += 1;
                let expr = self.parse_expr()?;
                self.expect(&TokenKind::RightParen)?;
                Ok(expr)
            }
            Some(
                TokenKind::Integer(_)
                | TokenKind::Real(_)
                | TokenKind::Str(_)
                | TokenKind::True
                | TokenKind::False,
            ) => {
                let constant = self.parse_literal()?;
                Ok(Expr::new(location, ExprKind::Constant(constant)))
            }
            Some(TokenKind::Ident(_)) if self.peek_nth(1) == Some(&TokenKind::LeftParen) => {
                let (name, _) = self.expect_ident()?;
                self.index += 1;
                let mut args = vec![];
                if !self.consume(&TokenKind::RightParen) {
                    args.push(self.parse_expr()?);
                    while self.consume(&TokenKind::Comma) {
                        args.push(self.parse_expr()?);
                    }
                    self.expect(&TokenKind::RightParen)?;
                }
                Ok(Expr::new(
                    location,
                    ExprKind::Call(FunctionInvocation { name, args }),
                ))
            }
            Some(TokenKind::Ident(_)) => self.parse_ref(),
            _ => Err(self.unexpected("an expression")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::Lexer;

    fn parse(input: &str) -> PResult<Program> {
        Parser::new(Lexer::tokenize(input)?).parse()
    }

    fn first_stmt(program: &Program) -> &StmtKind {
        &program.body.stmts[0].kind
    }

    #[test]
    fn program_structure() {
        let program = parse(
            "test;
var a, b: integer;
var c: 10;
f(x: integer; y: real): boolean
begin
    return true;
end
end
begin
    a := 1;
end
end",
        )
        .unwrap();

        assert_eq!(program.name, "test");
        assert_eq!(program.declarations.len(), 2);
        assert_eq!(program.declarations[0].variables.len(), 2);
        let c = &program.declarations[1].variables[0];
        assert_eq!(c.ty, Ty::integer());
        assert_eq!(c.constant.as_ref().unwrap().literal, "10");

        let f = &program.functions[0];
        assert_eq!(f.name, "f");
        assert_eq!(f.parameter_types(), vec![Ty::integer(), Ty::real()]);
        assert_eq!(f.return_type, Ty::boolean());
    }

    #[test]
    fn node_ids_are_unique() {
        let program = parse(
            "test;
f()
begin
end
end
begin
    begin
    end
    for i := 1 to 3 do
    begin
    end
    end do
end
end",
        )
        .unwrap();

        let StmtKind::Compound(inner) = first_stmt(&program) else {
            panic!();
        };
        let StmtKind::For(for_stmt) = &program.body.stmts[1].kind else {
            panic!();
        };
        let mut ids = vec![
            program.id,
            program.functions[0].id,
            program.functions[0].body.id,
            program.body.id,
            inner.id,
            for_stmt.id,
            for_stmt.body.id,
        ];
        let len = ids.len();
        ids.sort();
        ids.dedup();
        assert_eq!(ids.len(), len);
    }

    #[test]
    fn precedence() {
        let program = parse(
            "test;
begin
    print 1 + 2 * 3 < 4 and not true or false;
end
end",
        )
        .unwrap();
        let StmtKind::Print(expr) = first_stmt(&program) else {
            panic!();
        };
        let ExprKind::Binary(BinOpKind::Or, left, _) = &expr.kind else {
            panic!("{:?}", expr);
        };
        let ExprKind::Binary(BinOpKind::And, rel, not) = &left.kind else {
            panic!();
        };
        assert!(matches!(not.kind, ExprKind::Unary(UnaryOpKind::Not, _)));
        let ExprKind::Binary(BinOpKind::LessThan, add, _) = &rel.kind else {
            panic!();
        };
        let ExprKind::Binary(BinOpKind::Add, _, mul) = &add.kind else {
            panic!();
        };
        assert!(matches!(mul.kind, ExprKind::Binary(BinOpKind::Mul, _, _)));
    }

    #[test]
    fn locations() {
        let program = parse(
            "test;
begin
    x[1] := a - 2;
end
end",
        )
        .unwrap();
        let StmtKind::Assign(assign) = first_stmt(&program) else {
            panic!();
        };
        assert_eq!(assign.lvalue.location, Location::new(3, 5));
        assert_eq!(assign.location, Location::new(3, 10));
        assert_eq!(assign.expr.location, Location::new(3, 15));
    }

    #[test]
    fn negative_literal_in_declaration() {
        let program = parse("test;\nvar n: -5;\nbegin\nend\nend").unwrap();
        let n = &program.declarations[0].variables[0];
        assert_eq!(n.constant.as_ref().unwrap().literal, "-5");
    }

    #[test]
    fn syntax_errors_are_reported() {
        let err = parse("test;\nbegin\n    x := ;\nend\nend").unwrap_err();
        assert_eq!(err.location, Location::new(3, 10));
        assert!(parse("test;\nbegin\nend").is_err());
        assert!(parse("test;\nbegin\nend\nend\nend").is_err());
    }
}
