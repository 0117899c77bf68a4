//! VM à pile bornée en gas : une pile d'opérandes, une pile de frames
//! d'appel, un fenêtrage des slots locaux, et des appels vers l'hôte.

use glint_bytecode::{Chunk, FunctionRef, Instruction, Program, SourceLocation, Value};

use crate::error::RuntimeError;
use crate::native::NativeRegistry;

/// Limites réglables pour une exécution de VM.
#[derive(Debug, Clone, Copy)]
pub struct VmOptions {
    /// Un pas = une instruction dispatchée. `None` désactive le plafond.
    pub gas_limit: Option<u64>,
    /// Si activé, chaque instruction dispatchée est loguée au niveau
    /// `trace`.
    pub trace: bool,
}

impl Default for VmOptions {
    fn default() -> Self {
        Self { gas_limit: Some(100_000), trace: false }
    }
}

impl VmOptions {
    pub fn with_gas_limit(mut self, limit: Option<u64>) -> Self {
        self.gas_limit = limit;
        self
    }

    pub fn with_trace(mut self, trace: bool) -> Self {
        self.trace = trace;
        self
    }
}

struct Frame {
    func: FunctionRef,
    ip: usize,
    base: usize,
}

/// Exécute un unique [`Program`] face à un [`NativeRegistry`].
///
/// Une `Vm` est à usage unique par `call` : la pile d'opérandes et la pile
/// de frames sont un état neuf, détenu exclusivement par cet appel, et
/// jeté au retour.
pub struct Vm<'a> {
    program: &'a Program,
    natives: &'a NativeRegistry,
    options: VmOptions,
    stack: Vec<Value>,
    frames: Vec<Frame>,
    steps: u64,
}

impl<'a> Vm<'a> {
    pub fn new(program: &'a Program, natives: &'a NativeRegistry) -> Self {
        Self::with_options(program, natives, VmOptions::default())
    }

    pub fn with_options(program: &'a Program, natives: &'a NativeRegistry, options: VmOptions) -> Self {
        Self { program, natives, options, stack: Vec::new(), frames: Vec::new(), steps: 0 }
    }

    /// Résout `name` dans la table des fonctions et l'exécute jusqu'au
    /// bout (ou jusqu'à la première erreur), `args` devenant ses locaux
    /// `0..arity`.
    pub fn call(&mut self, name: &str, args: Vec<Value>) -> Result<Value, RuntimeError> {
        let (_, func) = self
            .program
            .find_function(name)
            .ok_or_else(|| RuntimeError::UnknownFunction { name: name.to_string(), location: None })?;

        if func.arity as usize != args.len() {
            return Err(RuntimeError::ArityMismatch {
                name: name.to_string(),
                expected: func.arity,
                actual: args.len() as u8,
                location: None,
            });
        }

        let base = self.stack.len();
        self.stack.extend(args);
        self.frames.push(Frame { func: func.clone(), ip: 0, base });

        self.run()
    }

    fn current_chunk(&self) -> &Chunk {
        let top = self.frames.last().expect("run() only called with a non-empty frame stack");
        &self.program.chunks[top.func.chunk_index]
    }

    fn loc(&self) -> Option<SourceLocation> {
        let top = self.frames.last()?;
        let chunk = &self.program.chunks[top.func.chunk_index];
        chunk.line_for(top.ip.saturating_sub(1)).map(SourceLocation::new)
    }

    fn run(&mut self) -> Result<Value, RuntimeError> {
        loop {
            if self.frames.is_empty() {
                // Atteignable uniquement si `call` est revenu tôt via le
                // `Return` final ci-dessous ; gardé comme filet défensif.
                return Ok(Value::Null);
            }

            self.steps += 1;
            if let Some(limit) = self.options.gas_limit {
                if self.steps > limit {
                    return Err(RuntimeError::GasExceeded { limit, location: self.loc() });
                }
            }

            let chunk = self.current_chunk();
            let ip = self.frames.last().unwrap().ip;
            if ip >= chunk.code.len() {
                return Err(RuntimeError::IpOutOfBounds { ip, len: chunk.code.len(), location: self.loc() });
            }
            let instr = chunk.code[ip];
            self.frames.last_mut().unwrap().ip += 1;

            if self.options.trace {
                tracing::trace!(?instr, ip, "dispatch");
            }

            if let Some(result) = self.step(instr)? {
                return Ok(result);
            }
        }
    }

    /// Exécute une instruction. Retourne `Some(value)` seulement quand la
    /// dernière frame retourne, terminant l'appel.
    fn step(&mut self, instr: Instruction) -> Result<Option<Value>, RuntimeError> {
        match instr {
            Instruction::Nop => {}

            Instruction::PushConst(ix) => {
                let chunk = self.current_chunk();
                let c = chunk.constants.get(ix).ok_or_else(|| RuntimeError::ConstantNotAName {
                    index: ix,
                    location: self.loc(),
                })?;
                self.stack.push(c.to_value());
            }

            Instruction::LoadLocal(slot) => {
                let base = self.frames.last().unwrap().base;
                let v = self.stack.get(base + slot).cloned().unwrap_or(Value::Null);
                self.stack.push(v);
            }

            Instruction::StoreLocal(slot) => {
                let v = self.pop()?;
                let base = self.frames.last().unwrap().base;
                let target = base + slot;
                if self.stack.len() < target + 1 {
                    self.stack.resize(target + 1, Value::Null);
                }
                self.stack[target] = v;
            }

            Instruction::Pop => {
                self.pop()?;
            }

            Instruction::Add => {
                let b = self.pop()?;
                let a = self.pop()?;
                self.stack.push(add_values(a, b, self.loc())?);
            }

            Instruction::Eq => {
                let b = self.pop()?;
                let a = self.pop()?;
                self.stack.push(Value::Bool(a.is_equal(&b)));
            }

            Instruction::Jump(off) => {
                self.jump(off);
            }

            Instruction::JumpIfFalse(off) => {
                let cond = self.pop()?;
                if cond.is_falsy() {
                    self.jump(off);
                }
            }

            Instruction::CallNative(name_ix, argc) => {
                self.call_native(name_ix, argc)?;
            }

            Instruction::CallFunc(fi, argc) => {
                self.call_func(fi, argc)?;
            }

            Instruction::Return => {
                let r = self.pop()?;
                let frame = self.frames.pop().expect("Return dispatched with an active frame");
                self.stack.truncate(frame.base);
                if self.frames.is_empty() {
                    return Ok(Some(r));
                }
                self.stack.push(r);
            }
        }
        Ok(None)
    }

    fn jump(&mut self, off: i32) {
        let frame = self.frames.last_mut().unwrap();
        frame.ip = (frame.ip as i64 + off as i64) as usize;
    }

    fn call_native(&mut self, name_ix: usize, argc: u8) -> Result<(), RuntimeError> {
        let chunk = self.current_chunk();
        let name = chunk
            .constants
            .get(name_ix)
            .and_then(|c| c.as_name())
            .ok_or_else(|| RuntimeError::ConstantNotAName { index: name_ix, location: self.loc() })?
            .to_string();

        let argc = argc as usize;
        let start = self.stack.len() - argc;
        let args: Vec<Value> = self.stack.split_off(start);

        let callable = self
            .natives
            .get(&name)
            .ok_or_else(|| RuntimeError::UnknownNative { name: name.clone(), location: self.loc() })?;

        if callable.arity as usize != args.len() {
            return Err(RuntimeError::ArityMismatch {
                name,
                expected: callable.arity,
                actual: args.len() as u8,
                location: self.loc(),
            });
        }

        let result = callable.invoke(&args).map_err(|e| match e {
            RuntimeError::NativeFailure { message, .. } => {
                RuntimeError::NativeFailure { message, location: self.loc() }
            }
            other => other,
        })?;
        self.stack.push(result);
        Ok(())
    }

    fn call_func(&mut self, fi: usize, argc: u8) -> Result<(), RuntimeError> {
        let func = self
            .program
            .functions
            .get(fi)
            .cloned()
            .ok_or_else(|| RuntimeError::UnknownFunction { name: format!("#{fi}"), location: self.loc() })?;

        if func.arity != argc {
            return Err(RuntimeError::ArityMismatch {
                name: func.name,
                expected: func.arity,
                actual: argc,
                location: self.loc(),
            });
        }

        let base = self.stack.len() - argc as usize;
        self.frames.push(Frame { func, ip: 0, base });
        Ok(())
    }

    fn pop(&mut self) -> Result<Value, RuntimeError> {
        // Un chunk bien formé ne sous-dépasse jamais la pile ; Null est un
        // repli permissif, cohérent avec les autres lectures tolérantes de
        // la VM (p. ex. LoadLocal au-delà du sommet de pile).
        Ok(self.stack.pop().unwrap_or(Value::Null))
    }
}

fn add_values(a: Value, b: Value, location: Option<SourceLocation>) -> Result<Value, RuntimeError> {
    use Value::*;
    Ok(match (&a, &b) {
        (Int(x), Int(y)) => Int(x + y),
        (Int(x), Double(y)) => Double(*x as f64 + y),
        (Double(x), Int(y)) => Double(x + *y as f64),
        (Double(x), Double(y)) => Double(x + y),
        (String(x), _) => String(format!("{x}{}", b.as_string())),
        (_, String(y)) => String(format!("{}{y}", a.as_string())),
        _ => {
            return Err(RuntimeError::InvalidAdd { lhs: a.as_string(), rhs: b.as_string(), location });
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use glint_bytecode::{Constant, FunctionRef};

    fn program_returning(ops: Vec<Instruction>, consts: Vec<Constant>) -> Program {
        let mut p = Program::new();
        p.functions.push(FunctionRef { name: "main".into(), arity: 0, chunk_index: 0, locals: 0 });
        let mut chunk = Chunk::new();
        chunk.constants = consts;
        chunk.code = ops.clone();
        chunk.debug_lines = vec![1; ops.len()];
        p.chunks.push(chunk);
        p
    }

    #[test]
    fn empty_function_body_returns_null() {
        let p = program_returning(vec![Instruction::PushConst(0), Instruction::Return], vec![Constant::Null]);
        let natives = NativeRegistry::new();
        let mut vm = Vm::new(&p, &natives);
        assert_eq!(vm.call("main", vec![]).unwrap(), Value::Null);
    }

    #[test]
    fn add_int_and_int() {
        let p = program_returning(
            vec![
                Instruction::PushConst(0),
                Instruction::PushConst(1),
                Instruction::Add,
                Instruction::Return,
            ],
            vec![Constant::Int(1), Constant::Int(2)],
        );
        let natives = NativeRegistry::new();
        let mut vm = Vm::new(&p, &natives);
        assert_eq!(vm.call("main", vec![]).unwrap(), Value::Int(3));
    }

    #[test]
    fn add_string_and_int_coerces() {
        let p = program_returning(
            vec![
                Instruction::PushConst(0),
                Instruction::PushConst(1),
                Instruction::Add,
                Instruction::Return,
            ],
            vec![Constant::String("a".into()), Constant::Int(1)],
        );
        let natives = NativeRegistry::new();
        let mut vm = Vm::new(&p, &natives);
        assert_eq!(vm.call("main", vec![]).unwrap(), Value::String("a1".into()));
    }

    #[test]
    fn add_int_and_bool_is_invalid() {
        let p = program_returning(
            vec![
                Instruction::PushConst(0),
                Instruction::PushConst(1),
                Instruction::Add,
                Instruction::Return,
            ],
            vec![Constant::Int(1), Constant::Bool(true)],
        );
        let natives = NativeRegistry::new();
        let mut vm = Vm::new(&p, &natives);
        assert!(matches!(vm.call("main", vec![]), Err(RuntimeError::InvalidAdd { .. })));
    }

    #[test]
    fn eq_across_types_is_false() {
        let p = program_returning(
            vec![
                Instruction::PushConst(0),
                Instruction::PushConst(1),
                Instruction::Eq,
                Instruction::Return,
            ],
            vec![Constant::Int(1), Constant::Double(1.0)],
        );
        let natives = NativeRegistry::new();
        let mut vm = Vm::new(&p, &natives);
        assert_eq!(vm.call("main", vec![]).unwrap(), Value::Bool(false));
    }

    #[test]
    fn gas_ceiling_allows_exactly_n_then_fails() {
        // Deux Nop puis Return : N=2 réussit, N=1 échoue en cours de route.
        let p = program_returning(
            vec![Instruction::Nop, Instruction::Nop, Instruction::PushConst(0), Instruction::Return],
            vec![Constant::Null],
        );
        let natives = NativeRegistry::new();

        let mut ok_vm = Vm::with_options(&p, &natives, VmOptions::default().with_gas_limit(Some(4)));
        assert!(ok_vm.call("main", vec![]).is_ok());

        let mut fail_vm = Vm::with_options(&p, &natives, VmOptions::default().with_gas_limit(Some(1)));
        assert!(matches!(fail_vm.call("main", vec![]), Err(RuntimeError::GasExceeded { .. })));
    }

    #[test]
    fn unknown_function_errors() {
        let p = Program::new();
        let natives = NativeRegistry::new();
        let mut vm = Vm::new(&p, &natives);
        assert!(matches!(vm.call("main", vec![]), Err(RuntimeError::UnknownFunction { .. })));
    }

    #[test]
    fn unknown_native_errors() {
        let mut p = Program::new();
        p.functions.push(FunctionRef { name: "main".into(), arity: 0, chunk_index: 0, locals: 0 });
        let mut chunk = Chunk::new();
        let name_ix = chunk.add_const(Constant::Name("missing".into()));
        chunk.push_op(Instruction::CallNative(name_ix, 0), 1);
        chunk.push_op(Instruction::Return, 1);
        p.chunks.push(chunk);

        let natives = NativeRegistry::new();
        let mut vm = Vm::new(&p, &natives);
        assert!(matches!(vm.call("main", vec![]), Err(RuntimeError::UnknownNative { .. })));
    }
}
