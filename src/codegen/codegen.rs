use std::collections::HashSet;

use log::debug;

use crate::{
    analyzer::{
        Primitive, ScopeChain, ScopeMap, SymbolEntry, SymbolKind, SymbolTable, Ty, WORD_SIZE,
    },
    parser::{
        Assignment, BinOpKind, CompoundStmt, ConstantValue, Declaration, Expr, ExprKind, For,
        Function, FunctionInvocation, NodeId, Program, Stmt, StmtKind, UnaryOpKind, Variable,
        VariableReference,
    },
};

use super::{base_offset, CodegenError, Frame, FRAME_SIZE};

/// `a0`..`a7`, then `t0`..`t5`. `t6` stays free for copying array parameters.
pub const MAX_ARGUMENTS: usize = 14;

/// Externally provided routines the generated code calls into.
const RUNTIME_ROUTINES: [&str; 7] = [
    "printInt",
    "printReal",
    "printString",
    "readInt",
    "readReal",
    "readString",
    "concatString",
];

type CResult<T> = Result<T, CodegenError>;

macro_rules! emit {
    ($self:ident, $($arg:tt)*) => {{
        $self.out.push_str(&format!($($arg)*));
        $self.out.push('\n');
    }};
}

fn argument_register(index: usize) -> Option<String> {
    match index {
        0..=7 => Some(format!("a{}", index)),
        8..=13 => Some(format!("t{}", index - 8)),
        _ => None,
    }
}

fn escape(s: &str) -> String {
    s.replace('\\', "\\\\").replace('"', "\\\"")
}

fn expr_ty(expr: &Expr) -> CResult<&Ty> {
    expr.ty
        .as_ref()
        .ok_or(CodegenError::UntypedExpression(expr.location))
}

fn element_count(name: &str, ty: &Ty) -> CResult<usize> {
    ty.element_count()
        .ok_or_else(|| CodegenError::ObjectTooLarge(name.to_string()))
}

/// A string or real literal waiting to be written to `.rodata`.
#[derive(Debug)]
struct PooledLiteral {
    label: String,
    primitive: Primitive,
    literal: String,
}

pub struct Codegen {
    out: String,
    file_name: String,
    scopes: ScopeMap,
    chain: ScopeChain,
    frame: Frame,
    label_index: usize,
    literal_index: usize,
    literals: Vec<PooledLiteral>,
    taken_labels: HashSet<String>,
    exit_label: Option<String>,
    return_type: Ty,
}

impl Codegen {
    pub fn new(scopes: ScopeMap, file_name: &str) -> Self {
        Self {
            out: String::new(),
            file_name: file_name.to_string(),
            scopes,
            chain: ScopeChain::new(),
            frame: Frame::new(),
            label_index: 0,
            literal_index: 0,
            literals: vec![],
            taken_labels: HashSet::new(),
            exit_label: None,
            return_type: Ty::void(),
        }
    }

    /// Emits the assembly for `program`, which must have passed analysis.
    pub fn generate(mut self, program: &Program) -> CResult<String> {
        emit!(self, "    .file \"{}\"", escape(&self.file_name));
        emit!(self, "    .option nopic");
        emit!(self, ".section    .text");
        emit!(self, "    .align 2");

        let table = self.take_scope(program.id)?;
        self.taken_labels = table.entries().iter().map(|e| e.name.clone()).collect();
        self.taken_labels.insert("main".to_string());
        self.taken_labels
            .extend(RUNTIME_ROUTINES.iter().map(|r| r.to_string()));
        self.chain.push_table(table);

        for d in program.declarations.iter() {
            self.gen_global_declaration(d)?;
        }
        for f in program.functions.iter() {
            self.gen_func_def(f)?;
        }
        self.gen_main(&program.body)?;
        self.chain.pop_scope();

        self.gen_literals();
        Ok(self.out)
    }

    fn new_label(&mut self) -> String {
        let s = format!(".L{:0>3}", self.label_index);
        self.label_index += 1;
        s
    }

    fn new_literal_label(&mut self) -> String {
        let s = format!(".LC{}", self.literal_index);
        self.literal_index += 1;
        s
    }

    /// Label for a literal pooled under a variable's name. Later literals for
    /// the same name, or names already defined elsewhere, get a suffix.
    fn variable_literal_label(&mut self, name: &str) -> String {
        let mut label = name.to_string();
        let mut n = 1;
        while self.taken_labels.contains(&label) {
            label = format!("{}.{}", name, n);
            n += 1;
        }
        self.taken_labels.insert(label.clone());
        label
    }

    fn pool(&mut self, label: String, constant: &ConstantValue) -> String {
        self.literals.push(PooledLiteral {
            label: label.clone(),
            primitive: constant.primitive,
            literal: constant.literal.clone(),
        });
        label
    }

    fn take_scope(&mut self, id: NodeId) -> CResult<SymbolTable> {
        self.scopes
            .remove(&id)
            .ok_or(CodegenError::MissingScope(id))
    }

    fn lookup(&self, name: &str) -> CResult<SymbolEntry> {
        self.chain
            .lookup(name)
            .cloned()
            .ok_or_else(|| CodegenError::UnresolvedSymbol(name.to_string()))
    }

    fn assign_offset(&mut self, variable: &Variable) -> CResult<i32> {
        let slots = element_count(&variable.name, &variable.ty)?;
        let offset = self
            .frame
            .allocate(&variable.name, slots)
            .ok_or_else(|| CodegenError::FrameOverflow(variable.name.clone()))?;
        let entry = self
            .chain
            .lookup_mut(&variable.name)
            .ok_or_else(|| CodegenError::UnresolvedSymbol(variable.name.clone()))?;
        entry.offset = Some(offset);
        Ok(offset)
    }

    fn push(&mut self, reg: &str) {
        emit!(self, "    addi sp, sp, -4");
        emit!(self, "    sw {}, 0(sp)", reg);
    }

    fn pop(&mut self, reg: &str) {
        emit!(self, "    lw {}, 0(sp)", reg);
        emit!(self, "    addi sp, sp, 4");
    }

    fn push_float(&mut self, reg: &str) {
        emit!(self, "    addi sp, sp, -4");
        emit!(self, "    fsw {}, 0(sp)", reg);
    }

    fn pop_float(&mut self, reg: &str) {
        emit!(self, "    flw {}, 0(sp)", reg);
        emit!(self, "    addi sp, sp, 4");
    }

    fn gen_oneop(&mut self, s: &str) {
        self.pop("t0");
        emit!(self, "{}", s);
        self.push("t0");
    }

    fn _gen_binop(&mut self, s: &str) {
        self.pop("t1");
        self.pop("t0");
        emit!(self, "{}", s);
        self.push("t0");
    }

    fn gen_float_binop(&mut self, s: &str, result_is_float: bool) {
        self.pop_float("ft1");
        self.pop_float("ft0");
        emit!(self, "{}", s);
        if result_is_float {
            self.push_float("ft0");
        } else {
            self.push("t0");
        }
    }

    fn prologue(&mut self, name: &str) {
        emit!(self, ".section    .text");
        emit!(self, "    .align 2");
        emit!(self, "    .globl {}", name);
        emit!(self, "    .type {}, @function", name);
        emit!(self, "{}:", name);
        emit!(self, "    addi sp, sp, -{}", FRAME_SIZE);
        emit!(self, "    sw ra, {}(sp)", FRAME_SIZE - 4);
        emit!(self, "    sw s0, {}(sp)", FRAME_SIZE - 8);
        emit!(self, "    addi s0, sp, {}", FRAME_SIZE);
    }

    fn epilogue(&mut self, name: &str) {
        if let Some(label) = self.exit_label.take() {
            emit!(self, "{}:", label);
        }
        emit!(self, "    lw ra, {}(sp)", FRAME_SIZE - 4);
        emit!(self, "    lw s0, {}(sp)", FRAME_SIZE - 8);
        emit!(self, "    addi sp, sp, {}", FRAME_SIZE);
        emit!(self, "    jr ra");
        emit!(self, "    .size {}, .-{}", name, name);
    }

    fn gen_global_declaration(&mut self, declaration: &Declaration) -> CResult<()> {
        for v in declaration.variables.iter() {
            match &v.constant {
                None => {
                    let size = v
                        .ty
                        .sizeof()
                        .ok_or_else(|| CodegenError::ObjectTooLarge(v.name.clone()))?;
                    emit!(self, ".comm {}, {}, 4", v.name, size);
                }
                Some(constant) => {
                    emit!(self, ".section    .rodata");
                    emit!(self, "    .align 2");
                    emit!(self, "    .globl {}", v.name);
                    emit!(self, "    .type {}, @object", v.name);
                    emit!(self, "{}:", v.name);
                    match (v.ty.primitive, constant.primitive) {
                        (Primitive::Real, _) => emit!(self, "    .float {}", constant.literal),
                        (Primitive::String, _) => {
                            emit!(self, "    .string \"{}\"", escape(&constant.literal))
                        }
                        _ => emit!(self, "    .word {}", constant.as_integer().unwrap_or(0)),
                    }
                }
            }
        }
        Ok(())
    }

    fn gen_local_declaration(&mut self, declaration: &Declaration) -> CResult<()> {
        for v in declaration.variables.iter() {
            let offset = self.assign_offset(v)?;
            let Some(constant) = &v.constant else {
                continue;
            };

            match (v.ty.primitive, constant.primitive) {
                (Primitive::Real, Primitive::Real) => {
                    let label = self.variable_literal_label(&v.name);
                    let label = self.pool(label, constant);
                    emit!(self, "    lui t0, %hi({})", label);
                    emit!(self, "    flw ft0, %lo({})(t0)", label);
                    emit!(self, "    fsw ft0, {}(s0)", offset);
                }
                (Primitive::Real, _) => {
                    emit!(self, "    li t0, {}", constant.as_integer().unwrap_or(0));
                    emit!(self, "    fcvt.s.w ft0, t0");
                    emit!(self, "    fsw ft0, {}(s0)", offset);
                }
                (Primitive::String, _) => {
                    let label = self.variable_literal_label(&v.name);
                    let label = self.pool(label, constant);
                    emit!(self, "    lui t0, %hi({})", label);
                    emit!(self, "    addi t0, t0, %lo({})", label);
                    emit!(self, "    sw t0, {}(s0)", offset);
                }
                _ => {
                    emit!(self, "    li t0, {}", constant.as_integer().unwrap_or(0));
                    emit!(self, "    sw t0, {}(s0)", offset);
                }
            }
        }
        Ok(())
    }

    fn gen_main(&mut self, body: &CompoundStmt) -> CResult<()> {
        debug!("generate main");
        self.frame.reset();
        self.exit_label = None;
        self.return_type = Ty::void();

        self.prologue("main");
        self.gen_compound_stmt(body)?;
        self.epilogue("main");
        Ok(())
    }

    fn gen_func_def(&mut self, function: &Function) -> CResult<()> {
        debug!("generate function {}", function.name);
        self.frame.reset();
        self.exit_label = None;
        self.return_type = function.return_type.clone();

        let table = self.take_scope(function.id)?;
        self.chain.push_table(table);
        self.prologue(&function.name);

        let parameters: Vec<&Variable> = function
            .parameters
            .iter()
            .flat_map(|d| d.variables.iter())
            .collect();
        if parameters.len() > MAX_ARGUMENTS {
            return Err(CodegenError::TooManyArguments {
                name: function.name.clone(),
                count: parameters.len(),
                max: MAX_ARGUMENTS,
            });
        }
        for (i, p) in parameters.into_iter().enumerate() {
            let offset = self.assign_offset(p)?;
            let reg = argument_register(i).unwrap_or_default();
            if p.ty.is_scalar() {
                emit!(self, "    sw {}, {}(s0)", reg, offset);
                continue;
            }

            // Arrays arrive as the caller's element 0 address and are copied.
            let slots = element_count(&p.name, &p.ty)?;
            let base = base_offset(offset, slots);
            for k in 0..slots {
                let disp = (k * WORD_SIZE) as i32;
                emit!(self, "    lw t6, {}({})", disp, reg);
                emit!(self, "    sw t6, {}(s0)", base + disp);
            }
        }

        self.gen_compound_stmt(&function.body)?;
        self.epilogue(&function.name);
        self.chain.pop_scope();
        Ok(())
    }

    /// Compounds the analyzer did not record share the enclosing scope.
    fn gen_compound_stmt(&mut self, compound: &CompoundStmt) -> CResult<()> {
        let table = self.scopes.remove(&compound.id);
        let pushed = table.is_some();
        if let Some(table) = table {
            self.chain.push_table(table);
        }

        for d in compound.declarations.iter() {
            self.gen_local_declaration(d)?;
        }
        for s in compound.stmts.iter() {
            self.gen_stmt(s)?;
        }

        if pushed {
            self.chain.pop_scope();
        }
        Ok(())
    }

    fn gen_stmt(&mut self, stmt: &Stmt) -> CResult<()> {
        match &stmt.kind {
            StmtKind::Compound(c) => self.gen_compound_stmt(c),
            StmtKind::Assign(a) => self.gen_assign(a),
            StmtKind::Print(e) => self.gen_print(e),
            StmtKind::Read(e) => self.gen_read(e),
            StmtKind::If(cond, body, None) => self.gen_if(cond, body),
            StmtKind::If(cond, body, Some(else_body)) => self.gen_if_else(cond, body, else_body),
            StmtKind::While(cond, body) => self.gen_while(cond, body),
            StmtKind::For(f) => self.gen_for(f),
            StmtKind::Return(e) => self.gen_return(e.as_ref()),
            StmtKind::Call(e) => {
                self.gen_expr(e)?;
                if !expr_ty(e)?.is_void() {
                    emit!(self, "    addi sp, sp, 4");
                }
                Ok(())
            }
        }
    }

    fn gen_assign(&mut self, assign: &Assignment) -> CResult<()> {
        let var = assign
            .lvalue
            .as_variable()
            .ok_or(CodegenError::NonVariableTarget(assign.lvalue.location))?;
        let target = expr_ty(&assign.lvalue)?.clone();
        self.gen_lval(var)?;

        // A literal stored straight into a local is pooled under its name.
        let entry = self.lookup(&var.name)?;
        match assign.expr.as_constant() {
            Some(c)
                if var.indices.is_empty()
                    && entry.level > 0
                    && matches!(c.primitive, Primitive::String | Primitive::Real) =>
            {
                let label = self.variable_literal_label(&var.name);
                self.gen_literal(c, label);
            }
            _ => self.gen_expr_as(&assign.expr, &target)?,
        }
        self.gen_store(&target);
        Ok(())
    }

    /// Pops a value and then an address, and stores the value there.
    fn gen_store(&mut self, ty: &Ty) {
        if ty.is_real() {
            self.pop_float("ft0");
            self.pop("t1");
            emit!(self, "    fsw ft0, 0(t1)");
        } else {
            self.pop("t0");
            self.pop("t1");
            emit!(self, "    sw t0, 0(t1)");
        }
    }

    fn gen_print(&mut self, expr: &Expr) -> CResult<()> {
        self.gen_expr(expr)?;
        match expr_ty(expr)?.primitive {
            Primitive::Real => {
                self.pop_float("fa0");
                emit!(self, "    jal ra, printReal");
            }
            Primitive::String => {
                self.pop("a0");
                emit!(self, "    jal ra, printString");
            }
            _ => {
                self.pop("a0");
                emit!(self, "    jal ra, printInt");
            }
        }
        Ok(())
    }

    fn gen_read(&mut self, target: &Expr) -> CResult<()> {
        let var = target
            .as_variable()
            .ok_or(CodegenError::NonVariableTarget(target.location))?;
        let primitive = expr_ty(target)?.primitive;
        self.gen_lval(var)?;
        match primitive {
            Primitive::Real => {
                emit!(self, "    jal ra, readReal");
                self.pop("t1");
                emit!(self, "    fsw fa0, 0(t1)");
            }
            _ => {
                let routine = if primitive == Primitive::String {
                    "readString"
                } else {
                    "readInt"
                };
                emit!(self, "    jal ra, {}", routine);
                self.pop("t1");
                emit!(self, "    sw a0, 0(t1)");
            }
        }
        Ok(())
    }

    fn gen_condition(&mut self, cond: &Expr, false_label: &str) -> CResult<()> {
        self.gen_expr(cond)?;
        self.pop("t0");
        emit!(self, "    beq t0, zero, {}", false_label);
        Ok(())
    }

    fn gen_if(&mut self, cond: &Expr, body: &CompoundStmt) -> CResult<()> {
        let then_label = self.new_label();
        let end_label = self.new_label();

        self.gen_condition(cond, &end_label)?;
        emit!(self, "{}:", then_label);
        self.gen_compound_stmt(body)?;
        emit!(self, "{}:", end_label);
        Ok(())
    }

    fn gen_if_else(
        &mut self,
        cond: &Expr,
        body: &CompoundStmt,
        else_body: &CompoundStmt,
    ) -> CResult<()> {
        let then_label = self.new_label();
        let else_label = self.new_label();
        let end_label = self.new_label();

        self.gen_condition(cond, &else_label)?;
        emit!(self, "{}:", then_label);
        self.gen_compound_stmt(body)?;
        emit!(self, "    j {}", end_label);
        emit!(self, "{}:", else_label);
        self.gen_compound_stmt(else_body)?;
        emit!(self, "{}:", end_label);
        Ok(())
    }

    fn gen_while(&mut self, cond: &Expr, body: &CompoundStmt) -> CResult<()> {
        let begin_label = self.new_label();
        let end_label = self.new_label();

        emit!(self, "{}:", begin_label);
        self.gen_condition(cond, &end_label)?;
        self.gen_compound_stmt(body)?;
        emit!(self, "    j {}", begin_label);
        emit!(self, "{}:", end_label);
        Ok(())
    }

    fn gen_for(&mut self, for_stmt: &For) -> CResult<()> {
        let test_label = self.new_label();
        let body_label = self.new_label();
        let end_label = self.new_label();

        let table = self.take_scope(for_stmt.id)?;
        self.chain.push_table(table);

        let offset = self.assign_offset(&for_stmt.loop_var)?;
        self.gen_assign(&for_stmt.init)?;

        emit!(self, "{}:", test_label);
        self.gen_expr(&for_stmt.end)?;
        emit!(self, "    lw t0, {}(s0)", offset);
        self.pop("t1");
        emit!(self, "    bge t0, t1, {}", end_label);
        emit!(self, "{}:", body_label);

        self.gen_compound_stmt(&for_stmt.body)?;

        emit!(self, "    lw t0, {}(s0)", offset);
        emit!(self, "    addi t0, t0, 1");
        emit!(self, "    sw t0, {}(s0)", offset);
        emit!(self, "    j {}", test_label);
        emit!(self, "{}:", end_label);

        self.chain.pop_scope();
        Ok(())
    }

    fn gen_return(&mut self, expr: Option<&Expr>) -> CResult<()> {
        if let Some(expr) = expr {
            let return_type = self.return_type.clone();
            self.gen_expr_as(expr, &return_type)?;
            self.pop("a0");
        }
        let label = match &self.exit_label {
            Some(label) => label.clone(),
            None => {
                let label = self.new_label();
                self.exit_label = Some(label.clone());
                label
            }
        };
        emit!(self, "    j {}", label);
        Ok(())
    }

    /// Evaluates `expr` and converts the result when an integer flows into a
    /// real context.
    fn gen_expr_as(&mut self, expr: &Expr, ty: &Ty) -> CResult<()> {
        self.gen_expr(expr)?;
        if ty.is_real() && expr_ty(expr)?.is_integer() {
            self.pop("t0");
            emit!(self, "    fcvt.s.w ft0, t0");
            self.push_float("ft0");
        }
        Ok(())
    }

    fn gen_expr(&mut self, expr: &Expr) -> CResult<()> {
        let ty = expr_ty(expr)?.clone();
        match &expr.kind {
            ExprKind::Binary(kind, left, right) => self.gen_binary(*kind, left, right, &ty),
            ExprKind::Unary(kind, operand) => self.gen_unary(*kind, operand, &ty),
            ExprKind::Call(call) => self.gen_call(call),
            ExprKind::Variable(var) => self.gen_variable(var, &ty),
            ExprKind::Constant(c) => {
                let label = match c.primitive {
                    Primitive::String | Primitive::Real => self.new_literal_label(),
                    _ => String::new(),
                };
                self.gen_literal(c, label);
                Ok(())
            }
        }
    }

    /// Pushes a literal. Strings and reals are read from `label`, which is
    /// pooled here.
    fn gen_literal(&mut self, constant: &ConstantValue, label: String) {
        match constant.primitive {
            Primitive::String => {
                let label = self.pool(label, constant);
                emit!(self, "    lui t0, %hi({})", label);
                emit!(self, "    addi t0, t0, %lo({})", label);
                self.push("t0");
            }
            Primitive::Real => {
                let label = self.pool(label, constant);
                emit!(self, "    lui t0, %hi({})", label);
                emit!(self, "    flw ft0, %lo({})(t0)", label);
                self.push_float("ft0");
            }
            _ => {
                emit!(self, "    li t0, {}", constant.as_integer().unwrap_or(0));
                self.push("t0");
            }
        }
    }

    /// Pushes the address of the referenced element or sub-array.
    fn gen_lval(&mut self, var: &VariableReference) -> CResult<()> {
        let entry = self.lookup(&var.name)?;
        if entry.level == 0 {
            emit!(self, "    la t0, {}", var.name);
        } else {
            let offset = entry
                .offset
                .ok_or_else(|| CodegenError::UnassignedOffset(var.name.clone()))?;
            let base = base_offset(offset, element_count(&var.name, &entry.ty)?);
            emit!(self, "    addi t0, s0, {}", base);
        }
        self.push("t0");

        if var.indices.is_empty() {
            return Ok(());
        }

        // Row-major linear index, then scaled by what the indices leave.
        let dims = &entry.ty.dimensions;
        for (k, index) in var.indices.iter().enumerate() {
            self.gen_expr(index)?;
            if k > 0 {
                let extent = dims.get(k).copied().unwrap_or(1);
                self._gen_binop(&format!(
                    "    li t2, {}\n    mul t0, t0, t2\n    add t0, t0, t1",
                    extent
                ));
            }
        }
        let remaining = dims.get(var.indices.len()..).unwrap_or(&[]);
        let stride = remaining.iter().product::<i64>() * WORD_SIZE as i64;
        self.pop("t0");
        emit!(self, "    li t1, {}", stride);
        emit!(self, "    mul t0, t0, t1");
        self.pop("t1");
        emit!(self, "    add t0, t1, t0");
        self.push("t0");
        Ok(())
    }

    fn gen_variable(&mut self, var: &VariableReference, ty: &Ty) -> CResult<()> {
        self.gen_lval(var)?;
        if !ty.is_scalar() {
            return Ok(());
        }

        // A global string constant is its own character data.
        let entry = self.lookup(&var.name)?;
        if entry.level == 0 && entry.kind == SymbolKind::Constant && ty.is_string() {
            return Ok(());
        }

        self.pop("t0");
        if ty.is_real() {
            emit!(self, "    flw ft0, 0(t0)");
            self.push_float("ft0");
        } else {
            emit!(self, "    lw t0, 0(t0)");
            self.push("t0");
        }
        Ok(())
    }

    fn gen_call(&mut self, call: &FunctionInvocation) -> CResult<()> {
        let entry = self.lookup(&call.name)?;
        let n_args = call.args.len();
        if n_args > MAX_ARGUMENTS {
            return Err(CodegenError::TooManyArguments {
                name: call.name.clone(),
                count: n_args,
                max: MAX_ARGUMENTS,
            });
        }

        let params = entry.parameter_types().to_vec();
        for (i, arg) in call.args.iter().enumerate() {
            match params.get(i) {
                Some(param) => self.gen_expr_as(arg, param)?,
                None => self.gen_expr(arg)?,
            }
        }
        for i in (0..n_args).rev() {
            let reg = argument_register(i).unwrap_or_default();
            self.pop(&reg);
        }
        emit!(self, "    jal ra, {}", call.name);

        if !entry.ty.is_void() {
            self.push("a0");
        }
        Ok(())
    }

    fn gen_unary(&mut self, kind: UnaryOpKind, operand: &Expr, ty: &Ty) -> CResult<()> {
        self.gen_expr(operand)?;
        match kind {
            UnaryOpKind::Neg if ty.is_real() => {
                self.pop_float("ft0");
                emit!(self, "    fneg.s ft0, ft0");
                self.push_float("ft0");
            }
            UnaryOpKind::Neg => self.gen_oneop("    sub t0, zero, t0"),
            UnaryOpKind::Not => self.gen_oneop("    xori t0, t0, 1"),
        }
        Ok(())
    }

    fn gen_binary(&mut self, kind: BinOpKind, left: &Expr, right: &Expr, ty: &Ty) -> CResult<()> {
        if ty.is_string() {
            self.gen_expr(left)?;
            self.gen_expr(right)?;
            self.pop("a1");
            self.pop("a0");
            emit!(self, "    jal ra, concatString");
            self.push("a0");
            return Ok(());
        }

        let is_real = expr_ty(left)?.is_real() || expr_ty(right)?.is_real();
        if is_real {
            self.gen_expr_as(left, &Ty::real())?;
            self.gen_expr_as(right, &Ty::real())?;
            self.gen_float_bin_op_kind(kind);
        } else {
            self.gen_expr(left)?;
            self.gen_expr(right)?;
            self.gen_bin_op_kind(kind);
        }
        Ok(())
    }

    fn gen_bin_op_kind(&mut self, kind: BinOpKind) {
        match kind {
            BinOpKind::Or => self._gen_binop("    or t0, t0, t1"),
            BinOpKind::And => self._gen_binop("    and t0, t0, t1"),

            BinOpKind::Equal => self._gen_binop("    sub t0, t0, t1\n    seqz t0, t0"),
            BinOpKind::NotEqual => self._gen_binop("    sub t0, t0, t1\n    snez t0, t0"),

            BinOpKind::LessThan => self._gen_binop("    slt t0, t0, t1"),
            BinOpKind::LessEqual => self._gen_binop("    slt t0, t1, t0\n    xori t0, t0, 1"),
            BinOpKind::GreaterThan => self._gen_binop("    slt t0, t1, t0"),
            BinOpKind::GreaterEqual => self._gen_binop("    slt t0, t0, t1\n    xori t0, t0, 1"),

            BinOpKind::Add => self._gen_binop("    add t0, t0, t1"),
            BinOpKind::Sub => self._gen_binop("    sub t0, t0, t1"),
            BinOpKind::Mul => self._gen_binop("    mul t0, t0, t1"),
            BinOpKind::Div => self._gen_binop("    div t0, t0, t1"),
            BinOpKind::Mod => self._gen_binop("    rem t0, t0, t1"),
        }
    }

    fn gen_float_bin_op_kind(&mut self, kind: BinOpKind) {
        match kind {
            BinOpKind::Add => self.gen_float_binop("    fadd.s ft0, ft0, ft1", true),
            BinOpKind::Sub => self.gen_float_binop("    fsub.s ft0, ft0, ft1", true),
            BinOpKind::Mul => self.gen_float_binop("    fmul.s ft0, ft0, ft1", true),
            BinOpKind::Div => self.gen_float_binop("    fdiv.s ft0, ft0, ft1", true),

            BinOpKind::Equal => self.gen_float_binop("    feq.s t0, ft0, ft1", false),
            BinOpKind::NotEqual => {
                self.gen_float_binop("    feq.s t0, ft0, ft1\n    xori t0, t0, 1", false)
            }
            BinOpKind::LessThan => self.gen_float_binop("    flt.s t0, ft0, ft1", false),
            BinOpKind::LessEqual => self.gen_float_binop("    fle.s t0, ft0, ft1", false),
            BinOpKind::GreaterThan => self.gen_float_binop("    flt.s t0, ft1, ft0", false),
            BinOpKind::GreaterEqual => self.gen_float_binop("    fle.s t0, ft1, ft0", false),

            // Rejected by the analyzer for real operands.
            BinOpKind::Or | BinOpKind::And | BinOpKind::Mod => self.gen_bin_op_kind(kind),
        }
    }

    fn gen_literals(&mut self) {
        let literals = std::mem::take(&mut self.literals);
        for PooledLiteral {
            label,
            primitive,
            literal,
        } in literals
        {
            emit!(self, ".section    .rodata");
            emit!(self, "    .align 2");
            emit!(self, "{}:", label);
            if primitive == Primitive::Real {
                emit!(self, "    .float {}", literal);
            } else {
                emit!(self, "    .string \"{}\"", escape(&literal));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn argument_registers() {
        assert_eq!(argument_register(0).as_deref(), Some("a0"));
        assert_eq!(argument_register(7).as_deref(), Some("a7"));
        assert_eq!(argument_register(8).as_deref(), Some("t0"));
        assert_eq!(argument_register(13).as_deref(), Some("t5"));
        assert_eq!(argument_register(MAX_ARGUMENTS), None);
    }

    #[test]
    fn escape_quotes() {
        assert_eq!(escape(r#"say "hi" \o/"#), r#"say \"hi\" \\o/"#);
    }

    #[test]
    fn literal_labels_avoid_collisions() {
        let mut codegen = Codegen::new(ScopeMap::new(), "t.p");
        codegen.taken_labels.insert("f".to_string());
        assert_eq!(codegen.variable_literal_label("s"), "s");
        assert_eq!(codegen.variable_literal_label("s"), "s.1");
        assert_eq!(codegen.variable_literal_label("f"), "f.1");
        assert_eq!(codegen.new_literal_label(), ".LC0");
        assert_eq!(codegen.new_label(), ".L000");
    }

    #[test]
    fn runtime_routines_are_not_reused_as_labels() {
        let mut codegen = Codegen::new(ScopeMap::new(), "t.p");
        codegen
            .taken_labels
            .extend(RUNTIME_ROUTINES.iter().map(|r| r.to_string()));
        assert_eq!(codegen.variable_literal_label("printString"), "printString.1");
    }

    fn analyzed(source: &str) -> (Program, ScopeMap) {
        let tokens = crate::lexer::Lexer::tokenize(source).unwrap();
        let mut program = crate::parser::Parser::new(tokens).parse().unwrap();
        let mut visitor = crate::analyzer::SemanticVisitor::new();
        let scopes = visitor.visit_program(&mut program);
        assert!(!visitor.has_error());
        (program, scopes)
    }

    #[test]
    fn non_variable_targets_are_rejected() {
        let (mut program, scopes) =
            analyzed("t;\nvar i: integer;\nbegin\n    i := i + 1;\nend\nend");
        let StmtKind::Assign(assign) = &mut program.body.stmts[0].kind else {
            panic!();
        };
        std::mem::swap(&mut assign.lvalue, &mut assign.expr);
        let location = assign.lvalue.location;
        assert_eq!(
            Codegen::new(scopes, "t.p").generate(&program),
            Err(CodegenError::NonVariableTarget(location))
        );

        let (mut program, scopes) =
            analyzed("t;\nvar i: integer;\nbegin\n    read i;\n    print i + 1;\nend\nend");
        let StmtKind::Print(sum) = program.body.stmts[1].kind.clone() else {
            panic!();
        };
        let location = sum.location;
        program.body.stmts[0].kind = StmtKind::Read(sum);
        assert_eq!(
            Codegen::new(scopes, "t.p").generate(&program),
            Err(CodegenError::NonVariableTarget(location))
        );
    }
}
