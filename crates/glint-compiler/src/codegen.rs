//! Émetteur de bytecode en une passe : un chunk par fonction, rattrapage
//! (back-patching) des sauts avant, attribution des slots locaux par
//! fonction, mise en correspondance ligne par instruction.

use std::collections::HashMap;

use glint_bytecode::{Chunk, Constant, FunctionRef, Instruction, Program};

use crate::ast::{BinOp, Expr, FuncDecl, Stmt};
use crate::error::CompileError;

/// Compile un programme parsé. Les noms de fonctions sont enregistrés dans
/// une table `nom -> index de fonction` avant qu'aucun corps ne soit émis,
/// pour que les appels puissent référencer des fonctions définies plus
/// loin dans le source.
pub fn emit_program(funcs: &[FuncDecl]) -> Result<Program, CompileError> {
    let mut program = Program::new();
    let mut func_index: HashMap<String, usize> = HashMap::new();

    for (ix, f) in funcs.iter().enumerate() {
        if func_index.insert(f.name.clone(), ix).is_some() {
            return Err(CompileError::UnsupportedConstruct {
                message: format!("duplicate function name '{}'", f.name),
                line: Some(f.line),
            });
        }
        program.functions.push(FunctionRef {
            name: f.name.clone(),
            arity: f.params.len() as u8,
            chunk_index: ix,
            locals: f.params.len(),
        });
    }

    for (ix, f) in funcs.iter().enumerate() {
        let (chunk, locals_count) = emit_function(f, &func_index)?;
        program.functions[ix].locals = locals_count;
        program.chunks.push(chunk);
    }

    Ok(program)
}

struct FuncCodegen<'a> {
    chunk: Chunk,
    locals: HashMap<String, usize>,
    func_index: &'a HashMap<String, usize>,
    /// Ligne de l'instruction en cours d'émission ; chaque instruction
    /// produite par une expression (aussi profondément imbriquée soit-elle)
    /// est estampillée de la ligne de l'instruction englobante, comme
    /// l'exige la table de correspondance ligne par instruction.
    cur_line: u32,
}

/// Émet le chunk d'une fonction et retourne, avec lui, le nombre total de
/// slots locaux qu'elle occupe (paramètres compris) — utilisé pour remplir
/// `FunctionRef::locals`.
fn emit_function(f: &FuncDecl, func_index: &HashMap<String, usize>) -> Result<(Chunk, usize), CompileError> {
    let mut cg = FuncCodegen { chunk: Chunk::new(), locals: HashMap::new(), func_index, cur_line: f.line };

    for (slot, p) in f.params.iter().enumerate() {
        cg.locals.insert(p.clone(), slot);
    }

    for stmt in &f.body {
        cg.emit_stmt(stmt)?;
    }

    let null_ix = cg.chunk.add_const(Constant::Null);
    cg.chunk.push_op(Instruction::PushConst(null_ix), f.line);
    cg.chunk.push_op(Instruction::Return, f.line);

    let locals_count = cg.locals.len();
    Ok((cg.chunk, locals_count))
}

impl<'a> FuncCodegen<'a> {
    fn slot_for(&mut self, name: &str) -> usize {
        let next = self.locals.len();
        *self.locals.entry(name.to_string()).or_insert(next)
    }

    fn emit_stmt(&mut self, stmt: &Stmt) -> Result<(), CompileError> {
        match stmt {
            Stmt::LetDecl { name, expr, line } => {
                self.cur_line = *line;
                self.emit_expr(expr)?;
                let slot = self.slot_for(name);
                self.chunk.push_op(Instruction::StoreLocal(slot), *line);
                Ok(())
            }
            Stmt::ExprStmt { expr, line } => {
                self.cur_line = *line;
                self.emit_expr(expr)?;
                self.chunk.push_op(Instruction::Pop, *line);
                Ok(())
            }
            Stmt::Return { expr, line } => {
                self.cur_line = *line;
                match expr {
                    Some(e) => self.emit_expr(e)?,
                    None => {
                        let ix = self.chunk.add_const(Constant::Null);
                        self.chunk.push_op(Instruction::PushConst(ix), *line);
                    }
                }
                self.chunk.push_op(Instruction::Return, *line);
                Ok(())
            }
            Stmt::If { cond, then_body, else_body, line } => {
                self.cur_line = *line;
                self.emit_if(cond, then_body, else_body.as_deref(), *line)
            }
        }
    }

    /// Voir glint-bytecode::Instruction pour la convention d'offset de
    /// saut sur laquelle repose ce rattrapage : les offsets sont relatifs
    /// à l'instruction *suivant* le saut.
    fn emit_if(
        &mut self,
        cond: &Expr,
        then_body: &[Stmt],
        else_body: Option<&[Stmt]>,
        line: u32,
    ) -> Result<(), CompileError> {
        self.emit_expr(cond)?;
        let jf = self.chunk.push_op(Instruction::JumpIfFalse(0), line);

        for s in then_body {
            self.emit_stmt(s)?;
        }
        let j = self.chunk.push_op(Instruction::Jump(0), line);

        let else_start = self.chunk.code.len();
        self.chunk.code[jf] = Instruction::JumpIfFalse((else_start - jf - 1) as i32);

        if let Some(else_stmts) = else_body {
            for s in else_stmts {
                self.emit_stmt(s)?;
            }
        }
        let end = self.chunk.code.len();
        self.chunk.code[j] = Instruction::Jump((end - j - 1) as i32);

        Ok(())
    }

    fn emit_expr(&mut self, expr: &Expr) -> Result<(), CompileError> {
        let line = self.cur_line;
        match expr {
            Expr::StrLit(s) => {
                let ix = self.chunk.add_const(Constant::String(s.clone()));
                self.chunk.push_op(Instruction::PushConst(ix), line);
            }
            Expr::IntLit(n) => {
                let ix = self.chunk.add_const(Constant::Int(*n));
                self.chunk.push_op(Instruction::PushConst(ix), line);
            }
            Expr::BoolLit(b) => {
                let ix = self.chunk.add_const(Constant::Bool(*b));
                self.chunk.push_op(Instruction::PushConst(ix), line);
            }
            Expr::Ident(name) => {
                let slot = self.slot_for(name);
                self.chunk.push_op(Instruction::LoadLocal(slot), line);
            }
            Expr::Call { name, args } => {
                for a in args {
                    self.emit_expr(a)?;
                }
                if let Some(&fi) = self.func_index.get(name) {
                    self.chunk.push_op(Instruction::CallFunc(fi, args.len() as u8), line);
                } else {
                    let name_ix = self.chunk.add_const(Constant::Name(name.clone()));
                    self.chunk.push_op(Instruction::CallNative(name_ix, args.len() as u8), line);
                }
            }
            Expr::Binary { lhs, op, rhs } => {
                self.emit_expr(lhs)?;
                self.emit_expr(rhs)?;
                match op {
                    BinOp::Add => self.chunk.push_op(Instruction::Add, line),
                    BinOp::Eq => self.chunk.push_op(Instruction::Eq, line),
                };
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::Lexer;
    use crate::parser::Parser;
    use glint_bytecode::Instruction as I;

    fn compile(src: &str) -> Program {
        let toks = Lexer::new(src).tokenize().unwrap();
        let funcs = Parser::new(toks).parse_program().unwrap();
        emit_program(&funcs).unwrap()
    }

    #[test]
    fn chunk_ends_with_return() {
        let p = compile("func main() { let a = 1 }");
        assert_eq!(*p.chunks[0].code.last().unwrap(), I::Return);
    }

    #[test]
    fn code_and_debug_lines_same_length() {
        let p = compile("func main() { return 1 + 2 }");
        assert_eq!(p.chunks[0].code.len(), p.chunks[0].debug_lines.len());
    }

    #[test]
    fn jump_offsets_land_in_bounds() {
        let p = compile(r#"func main() { if true { return 1 } else { return 2 } }"#);
        let chunk = &p.chunks[0];
        for (ip, instr) in chunk.code.iter().enumerate() {
            if let I::Jump(off) | I::JumpIfFalse(off) = instr {
                let target = (ip as i32 + 1 + off) as usize;
                assert!(target <= chunk.code.len());
            }
        }
    }

    #[test]
    fn forward_reference_to_later_function_resolves() {
        let p = compile("func main() { return helper() } func helper() { return 1 }");
        assert!(matches!(p.chunks[0].code[0], I::CallFunc(1, 0)));
    }

    #[test]
    fn function_ref_locals_counts_params_and_lets() {
        let p = compile("func f(a, b) { let c = a + b; return c }");
        assert_eq!(p.functions[0].arity, 2);
        assert_eq!(p.functions[0].locals, 3);
    }

    #[test]
    fn unresolved_call_becomes_call_native() {
        let p = compile(r#"func main() { log("hi") }"#);
        assert!(p.chunks[0].code.iter().any(|i| matches!(i, I::CallNative(_, 1))));
    }
}
