pub mod analyzer;
pub mod codegen;
pub mod lexer;
pub mod parser;

use log::info;
use thiserror::Error;

use analyzer::{Diagnostic, SemanticVisitor};
use codegen::{Codegen, CodegenError};
use lexer::Lexer;
use parser::{ParseError, Parser};

#[derive(Clone, Debug, Default)]
pub struct CompileOptions {
    /// Print every symbol table as its scope closes.
    pub dump: bool,
}

#[derive(Debug, Error)]
pub enum CompileError {
    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error("semantic analysis reported {} error(s)", .0.len())]
    Semantic(Vec<Diagnostic>),

    #[error(transparent)]
    Codegen(#[from] CodegenError),
}

impl CompileError {
    /// Diagnostic text as it should appear on stderr, with source excerpts
    /// for semantic errors.
    pub fn render(&self, source: &str) -> String {
        match self {
            CompileError::Semantic(diagnostics) => {
                diagnostics.iter().map(|d| d.render(source)).collect()
            }
            e => format!("{}\n", e),
        }
    }
}

/// Compiles P source text to RISC-V assembly. Code generation only runs when
/// analysis found no errors.
pub fn compile(
    source: &str,
    file_name: &str,
    options: &CompileOptions,
) -> Result<String, CompileError> {
    let tokens = Lexer::tokenize(source)?;
    let mut program = Parser::new(tokens).parse()?;

    let mut visitor = SemanticVisitor::new().with_dump(options.dump);
    let scopes = visitor.visit_program(&mut program);
    if visitor.has_error() {
        return Err(CompileError::Semantic(visitor.into_diagnostics()));
    }
    info!("{}: analysis found no errors", file_name);

    let assembly = Codegen::new(scopes, file_name).generate(&program)?;
    Ok(assembly)
}
