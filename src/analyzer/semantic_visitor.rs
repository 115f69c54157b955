use log::{debug, trace};

use crate::parser::{
    Assignment, BinOpKind, CompoundStmt, ConstantValue, Declaration, Expr, ExprKind, For,
    Function, FunctionInvocation, Location, NodeId, Program, Stmt, StmtKind, UnaryOpKind,
    Variable, VariableReference,
};

use super::{
    Attribute, Diagnostic, Primitive, ScopeChain, ScopeMap, SemanticError, SymbolEntry,
    SymbolKind, Ty,
};

/// Traversal state handed down the recursion.
#[derive(Clone, Debug, Default)]
struct Context {
    in_constant_initializer: bool,
    in_parameters: bool,
    in_read_target: bool,
    /// Declared return type of the enclosing function, `None` in a void context.
    return_type: Option<Ty>,
}

pub struct SemanticVisitor {
    chain: ScopeChain,
    scopes: ScopeMap,
    diagnostics: Vec<Diagnostic>,
    dump: bool,
}

impl Default for SemanticVisitor {
    fn default() -> Self {
        Self::new()
    }
}

impl SemanticVisitor {
    pub fn new() -> Self {
        Self {
            chain: ScopeChain::new(),
            scopes: ScopeMap::new(),
            diagnostics: vec![],
            dump: false,
        }
    }

    /// Print every symbol table to stdout as its scope closes.
    pub fn with_dump(mut self, dump: bool) -> Self {
        self.dump = dump;
        self
    }

    pub fn has_error(&self) -> bool {
        !self.diagnostics.is_empty()
    }

    pub fn into_diagnostics(self) -> Vec<Diagnostic> {
        self.diagnostics
    }

    /// Annotates `program` with resolved types and returns the symbol table
    /// of every scope-forming node.
    pub fn visit_program(&mut self, program: &mut Program) -> ScopeMap {
        self.open_scope();
        self.chain.add_symbol(SymbolEntry::new(
            &program.name,
            SymbolKind::Program,
            Ty::void(),
        ));

        let ctx = Context::default();
        for d in program.declarations.iter() {
            self.visit_declaration(d, &ctx);
        }
        for f in program.functions.iter_mut() {
            self.visit_func_def(f);
        }
        self.visit_compound_stmt(&mut program.body, &ctx);

        self.close_scope(program.id);
        std::mem::take(&mut self.scopes)
    }

    fn error(&mut self, location: Location, error: SemanticError) {
        debug!("{}: {}", location, error);
        self.diagnostics.push(Diagnostic::new(location, error));
    }

    fn open_scope(&mut self) {
        self.chain.push_scope();
        debug!("push scope at level {}", self.chain.level() - 1);
    }

    fn close_scope(&mut self, id: NodeId) {
        if let Some(table) = self.chain.pop_scope() {
            debug!("pop scope {:?} at level {}", id, table.level());
            if self.dump {
                print!("{}", table);
            }
            self.scopes.insert(id, table);
        }
    }

    fn visit_declaration(&mut self, declaration: &Declaration, ctx: &Context) {
        for v in declaration.variables.iter() {
            self.visit_variable(v, ctx);
        }
    }

    fn visit_variable(&mut self, variable: &Variable, ctx: &Context) {
        if self.chain.has_symbol(&variable.name) || self.chain.has_loop_variable(&variable.name) {
            self.error(
                variable.location,
                SemanticError::Redeclared(variable.name.clone()),
            );
            return;
        }

        let kind = if ctx.in_parameters {
            SymbolKind::Parameter
        } else {
            SymbolKind::Variable
        };
        trace!("declare {} as {} {}", variable.name, kind.as_str(), variable.ty);
        self.chain
            .add_symbol(SymbolEntry::new(&variable.name, kind, variable.ty.clone()));

        let error = if !variable.ty.is_valid_array() {
            Some(SemanticError::InvalidArrayDimension(variable.name.clone()))
        } else if variable.ty.sizeof().is_none() {
            Some(SemanticError::ArrayTooLarge(variable.name.clone()))
        } else {
            None
        };
        if let Some(error) = error {
            if let Some(entry) = self.chain.current_mut().and_then(|t| t.last_symbol_mut()) {
                entry.has_error = true;
            }
            self.error(variable.location, error);
            return;
        }

        if let Some(constant) = &variable.constant {
            let ctx = Context {
                in_constant_initializer: true,
                ..ctx.clone()
            };
            let value = self.visit_constant(constant, &ctx);
            if !variable.ty.accepts(&value) {
                self.error(
                    variable.location,
                    SemanticError::IncompatibleAssignment {
                        target: variable.ty.to_string(),
                        value: value.to_string(),
                    },
                );
            }
        }
    }

    fn visit_constant(&mut self, constant: &ConstantValue, ctx: &Context) -> Ty {
        if ctx.in_constant_initializer {
            if let Some(entry) = self.chain.current_mut().and_then(|t| t.last_symbol_mut()) {
                entry.kind = SymbolKind::Constant;
                entry.attribute = Attribute::Constant(constant.literal.clone());
            }
        }
        constant.ty()
    }

    fn visit_func_def(&mut self, function: &mut Function) {
        if self.chain.has_symbol(&function.name) {
            self.error(
                function.location,
                SemanticError::Redeclared(function.name.clone()),
            );
        } else {
            self.chain.add_symbol(
                SymbolEntry::new(
                    &function.name,
                    SymbolKind::Function,
                    function.return_type.clone(),
                )
                .with_attribute(Attribute::Parameters(function.parameter_types())),
            );
        }

        // Parameters and locals of the body share this one scope.
        self.open_scope();
        let return_type = Some(function.return_type.clone()).filter(|ty| !ty.is_void());
        let params_ctx = Context {
            in_parameters: true,
            return_type: return_type.clone(),
            ..Context::default()
        };
        for p in function.parameters.iter() {
            self.visit_declaration(p, &params_ctx);
        }
        let body_ctx = Context {
            return_type,
            ..Context::default()
        };
        self.visit_compound_body(&mut function.body, &body_ctx);
        self.close_scope(function.id);
    }

    fn visit_compound_stmt(&mut self, compound: &mut CompoundStmt, ctx: &Context) {
        self.open_scope();
        self.visit_compound_body(compound, ctx);
        self.close_scope(compound.id);
    }

    fn visit_compound_body(&mut self, compound: &mut CompoundStmt, ctx: &Context) {
        for d in compound.declarations.iter() {
            self.visit_declaration(d, ctx);
        }
        for s in compound.stmts.iter_mut() {
            self.visit_stmt(s, ctx);
        }
    }

    fn visit_stmt(&mut self, stmt: &mut Stmt, ctx: &Context) {
        let location = stmt.location;
        match &mut stmt.kind {
            StmtKind::Compound(c) => self.visit_compound_stmt(c, ctx),
            StmtKind::Assign(a) => self.visit_assign(a, ctx),
            StmtKind::Print(e) => self.visit_print(e, ctx),
            StmtKind::Read(e) => self.visit_read(e, ctx),
            StmtKind::If(cond, body, else_body) => self.visit_if(cond, body, else_body, ctx),
            StmtKind::While(cond, body) => self.visit_while(cond, body, ctx),
            StmtKind::For(f) => self.visit_for(f, ctx),
            StmtKind::Return(e) => self.visit_return(location, e.as_mut(), ctx),
            StmtKind::Call(e) => {
                self.visit_expr(e, ctx);
            }
        }
    }

    fn visit_assign(&mut self, assign: &mut Assignment, ctx: &Context) {
        let target = self.visit_expr(&mut assign.lvalue, ctx);
        let value = self.visit_expr(&mut assign.expr, ctx);

        let Some(target) = target else { return };
        if !target.is_scalar() {
            self.error(assign.lvalue.location, SemanticError::ArrayAssignment);
            return;
        }

        if let Some(var) = assign.lvalue.as_variable() {
            match self.chain.lookup(&var.name).map(|e| e.kind) {
                Some(SymbolKind::Constant) => {
                    let name = var.name.clone();
                    self.error(
                        assign.lvalue.location,
                        SemanticError::AssignToConstant(name),
                    );
                    return;
                }
                Some(SymbolKind::LoopVariable) => {
                    self.error(
                        assign.lvalue.location,
                        SemanticError::AssignToLoopVariable,
                    );
                    return;
                }
                _ => (),
            }
        }

        let Some(value) = value else { return };
        if !value.is_scalar() {
            self.error(assign.expr.location, SemanticError::ArrayAssignment);
            return;
        }
        if !target.accepts(&value) {
            self.error(
                assign.location,
                SemanticError::IncompatibleAssignment {
                    target: target.to_string(),
                    value: value.to_string(),
                },
            );
        }
    }

    fn visit_print(&mut self, expr: &mut Expr, ctx: &Context) {
        if let Some(ty) = self.visit_expr(expr, ctx) {
            if !ty.is_scalar() {
                self.error(expr.location, SemanticError::PrintNonScalar);
            }
        }
    }

    fn visit_read(&mut self, target: &mut Expr, ctx: &Context) {
        let ctx = Context {
            in_read_target: true,
            ..ctx.clone()
        };
        if let Some(ty) = self.visit_expr(target, &ctx) {
            if !ty.is_scalar() {
                self.error(target.location, SemanticError::ReadNonScalar);
            }
        }
    }

    fn check_condition(&mut self, cond: &Expr) {
        if let Some(ty) = &cond.ty {
            if !ty.is_boolean() {
                self.error(cond.location, SemanticError::NonBooleanCondition);
            }
        }
    }

    fn visit_if(
        &mut self,
        cond: &mut Expr,
        body: &mut CompoundStmt,
        else_body: &mut Option<CompoundStmt>,
        ctx: &Context,
    ) {
        self.visit_expr(cond, ctx);
        self.visit_compound_stmt(body, ctx);
        if let Some(else_body) = else_body {
            self.visit_compound_stmt(else_body, ctx);
        }
        self.check_condition(cond);
    }

    fn visit_while(&mut self, cond: &mut Expr, body: &mut CompoundStmt, ctx: &Context) {
        self.visit_expr(cond, ctx);
        self.visit_compound_stmt(body, ctx);
        self.check_condition(cond);
    }

    fn visit_for(&mut self, for_stmt: &mut For, ctx: &Context) {
        self.open_scope();

        let var = &for_stmt.loop_var;
        if self.chain.has_loop_variable(&var.name) {
            let (location, name) = (var.location, var.name.clone());
            self.error(location, SemanticError::Redeclared(name));
        } else {
            trace!("declare loop variable {}", var.name);
            self.chain.add_symbol(SymbolEntry::new(
                &var.name,
                SymbolKind::LoopVariable,
                var.ty.clone(),
            ));
        }

        // The initial assignment writes the loop variable, so it is checked
        // as a bound instead of as an assignment.
        self.visit_expr(&mut for_stmt.init.lvalue, ctx);
        for bound in [&mut for_stmt.init.expr, &mut for_stmt.end] {
            match self.visit_expr(bound, ctx) {
                Some(ty) if !ty.is_integer() => {
                    let error = SemanticError::NonIntegerLoopBound(ty.to_string());
                    self.error(bound.location, error);
                }
                _ => (),
            }
        }

        // Only literal bounds are compared; other expressions are not evaluated.
        if let (Some(begin), Some(end)) = (
            literal_bound(&for_stmt.init.expr),
            literal_bound(&for_stmt.end),
        ) {
            if begin > end {
                self.error(for_stmt.location, SemanticError::NonIncrementalLoopBounds);
            }
        }

        self.visit_compound_stmt(&mut for_stmt.body, ctx);
        self.close_scope(for_stmt.id);
    }

    fn visit_return(&mut self, location: Location, expr: Option<&mut Expr>, ctx: &Context) {
        let Some(expected) = ctx.return_type.clone() else {
            if expr.is_some() {
                self.error(location, SemanticError::ReturnFromVoid);
            }
            return;
        };
        let Some(expr) = expr else {
            self.error(
                location,
                SemanticError::IncompatibleReturn {
                    value: Ty::void().to_string(),
                    expected: expected.to_string(),
                },
            );
            return;
        };

        let Some(value) = self.visit_expr(expr, ctx) else {
            return;
        };
        if !expected.accepts(&value) {
            self.error(
                expr.location,
                SemanticError::IncompatibleReturn {
                    value: value.to_string(),
                    expected: expected.to_string(),
                },
            );
        }
    }

    fn visit_expr(&mut self, expr: &mut Expr, ctx: &Context) -> Option<Ty> {
        let location = expr.location;
        let ty = match &mut expr.kind {
            ExprKind::Binary(kind, left, right) => {
                self.visit_binary(*kind, left, right, location, ctx)
            }
            ExprKind::Unary(kind, operand) => self.visit_unary(*kind, operand, location, ctx),
            ExprKind::Call(call) => self.visit_invocation(call, location, ctx),
            ExprKind::Variable(var) => self.visit_variable_reference(var, location, ctx),
            ExprKind::Constant(c) => Some(self.visit_constant(c, ctx)),
        };
        expr.ty = ty.clone();
        ty
    }

    fn visit_binary(
        &mut self,
        kind: BinOpKind,
        left: &mut Expr,
        right: &mut Expr,
        location: Location,
        ctx: &Context,
    ) -> Option<Ty> {
        let left = self.visit_expr(left, ctx);
        let right = self.visit_expr(right, ctx);
        let (Some(left), Some(right)) = (left, right) else {
            return None;
        };

        let numeric = left.is_numeric() && right.is_numeric();
        let ty = match kind {
            BinOpKind::Add if left.is_string() && right.is_string() => Some(Ty::string()),
            k if k.is_arithmetic() && numeric => {
                if left.is_integer() && right.is_integer() {
                    Some(Ty::integer())
                } else {
                    Some(Ty::real())
                }
            }
            k if k.is_relational() && numeric => Some(Ty::boolean()),
            BinOpKind::And | BinOpKind::Or if left.is_boolean() && right.is_boolean() => {
                Some(Ty::boolean())
            }
            BinOpKind::Mod if left.is_integer() && right.is_integer() => Some(Ty::integer()),
            _ => None,
        };

        if ty.is_none() {
            self.error(
                location,
                SemanticError::InvalidBinaryOperands {
                    op: kind.to_string(),
                    left: left.to_string(),
                    right: right.to_string(),
                },
            );
        }
        ty
    }

    fn visit_unary(
        &mut self,
        kind: UnaryOpKind,
        operand: &mut Expr,
        location: Location,
        ctx: &Context,
    ) -> Option<Ty> {
        let operand = self.visit_expr(operand, ctx)?;
        let valid = match kind {
            UnaryOpKind::Neg => operand.is_numeric(),
            UnaryOpKind::Not => operand.is_boolean(),
        };
        if !valid {
            self.error(
                location,
                SemanticError::InvalidUnaryOperand {
                    op: kind.to_string(),
                    operand: operand.to_string(),
                },
            );
            return None;
        }
        Some(operand)
    }

    fn visit_invocation(
        &mut self,
        call: &mut FunctionInvocation,
        location: Location,
        ctx: &Context,
    ) -> Option<Ty> {
        let arg_ctx = Context {
            in_read_target: false,
            ..ctx.clone()
        };
        for arg in call.args.iter_mut() {
            self.visit_expr(arg, &arg_ctx);
        }

        let Some(entry) = self.chain.lookup(&call.name).cloned() else {
            self.error(location, SemanticError::UndeclaredSymbol(call.name.clone()));
            return None;
        };
        if entry.kind != SymbolKind::Function {
            self.error(location, SemanticError::NonFunctionCall(call.name.clone()));
            return None;
        }

        let params = entry.parameter_types();
        if params.len() != call.args.len() {
            self.error(
                location,
                SemanticError::ArgumentCountMismatch(call.name.clone()),
            );
            return None;
        }
        for (arg, param) in call.args.iter().zip(params) {
            let arg_ty = arg.ty.as_ref()?;
            if !param.accepts(arg_ty) {
                self.error(
                    arg.location,
                    SemanticError::IncompatibleArgument {
                        arg: arg_ty.to_string(),
                        param: param.to_string(),
                    },
                );
                return None;
            }
        }

        Some(entry.ty)
    }

    fn visit_variable_reference(
        &mut self,
        var: &mut VariableReference,
        location: Location,
        ctx: &Context,
    ) -> Option<Ty> {
        let Some(entry) = self.chain.lookup(&var.name).cloned() else {
            self.error(location, SemanticError::UndeclaredSymbol(var.name.clone()));
            return None;
        };
        if !entry.is_variable_like() {
            self.error(location, SemanticError::NonVariableSymbol(var.name.clone()));
            return None;
        }
        if entry.has_error {
            return None;
        }

        let index_ctx = Context {
            in_read_target: false,
            ..ctx.clone()
        };
        for index in var.indices.iter_mut() {
            self.visit_expr(index, &index_ctx);
        }

        if ctx.in_read_target
            && matches!(entry.kind, SymbolKind::Constant | SymbolKind::LoopVariable)
        {
            self.error(location, SemanticError::ReadConstantOrLoopVariable);
        }

        for index in var.indices.iter() {
            let index_ty = index.ty.as_ref()?;
            if !index_ty.is_integer() {
                self.error(index.location, SemanticError::NonIntegerIndex);
                return None;
            }
        }

        let ty = entry.ty.slice(var.indices.len());
        if ty.is_none() {
            self.error(location, SemanticError::OverSubscript(var.name.clone()));
        }
        ty
    }
}

fn literal_bound(expr: &Expr) -> Option<i64> {
    expr.as_constant()
        .filter(|c| c.primitive == Primitive::Integer)
        .and_then(ConstantValue::as_integer)
}
