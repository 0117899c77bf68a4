//! Compilateur source → bytecode pour le langage de script glint.
//!
//! Pipeline : [`lexer`] -> [`parser`] (construit l'[`ast`] transitoire) ->
//! [`codegen`] (émission en une passe avec rattrapage des sauts avant).
//! La compilation se fait en une seule passe : le premier échec interrompt
//! avec une [`CompileError`].

mod ast;
mod codegen;
mod error;
mod lexer;
mod parser;

pub use error::CompileError;
pub use glint_bytecode::Program;

/// Compile une chaîne source en [`Program`].
///
/// Reconnaît une suite de déclarations `func NOM(PARAMS) { CORPS }` de
/// premier niveau ; les autres séquences de tokens de premier niveau sont
/// sautées plutôt que rejetées, si bien qu'un fichier peut porter des
/// commentaires entre les fonctions.
pub fn compile(source: &str) -> Result<Program, CompileError> {
    let toks = lexer::Lexer::new(source).tokenize().map_err(|e| CompileError::UnsupportedConstruct {
        message: e.message,
        line: Some(e.line),
    })?;
    tracing::debug!(tokens = toks.len(), "lexed source");

    let funcs = parser::Parser::new(toks).parse_program()?;
    tracing::debug!(functions = funcs.len(), "parsed source");

    let program = codegen::emit_program(&funcs)?;
    tracing::debug!(chunks = program.chunks.len(), "emitted bytecode");

    Ok(program)
}
