//! Orchestrateur léger : détient un [`NativeRegistry`], relie le
//! compilateur et le codec de bundle à la VM, et expose la seule surface
//! d'embarquement dont les collaborateurs alentour (CLI, app hôte) ont
//! besoin.

use glint_bundle::BundleError;
use glint_bytecode::Value;
use glint_compiler::CompileError;
use glint_vm::{NativeRegistry, RuntimeError, Vm, VmOptions};
use thiserror::Error;

pub use glint_bundle::{canonical_payload, decode as decode_bundle, encode as encode_bundle};
pub use glint_bytecode::Program;
pub use glint_vm::NativeCallable;

const DEFAULT_ENTRY: &str = "main";

/// Le seul type d'erreur qu'un hôte embarquant voit, couvrant les échecs
/// de compilation, d'exécution et de décodage de bundle.
#[derive(Debug, Error)]
pub enum RunError {
    #[error(transparent)]
    Compile(#[from] CompileError),

    #[error(transparent)]
    Runtime(#[from] RuntimeError),

    #[error(transparent)]
    Bundle(#[from] BundleError),
}

/// Détient le registre de fonctions natives et exécute des programmes
/// face à lui.
pub struct Runtime {
    natives: NativeRegistry,
    options: VmOptions,
}

impl Runtime {
    pub fn new(natives: NativeRegistry) -> Self {
        Self { natives, options: VmOptions::default() }
    }

    pub fn with_options(natives: NativeRegistry, options: VmOptions) -> Self {
        Self { natives, options }
    }

    /// Compile `source` et appelle `entry` sans argument.
    pub fn run_source(&self, source: &str, entry: &str) -> Result<Value, RunError> {
        let program = glint_compiler::compile(source)?;
        self.run_program(&program, entry)
    }

    /// Décode `bytes` comme un bundle (en vérifiant contre `key` si
    /// fournie) et appelle `entry` sans argument.
    pub fn run_bundle(&self, bytes: &[u8], key: Option<&[u8]>, entry: &str) -> Result<Value, RunError> {
        let program = glint_bundle::decode(bytes, key)?;
        self.run_program(&program, entry)
    }

    /// Enveloppe des instructions libres en `func main() { <lignes> }` et
    /// les exécute, pour l'appelant qui veut juste un corps de lignes.
    pub fn run_lines(&self, lines: &[String]) -> Result<Value, RunError> {
        let mut source = String::from("func main() {\n");
        for line in lines {
            source.push_str("    ");
            source.push_str(line);
            source.push('\n');
        }
        source.push('}');
        self.run_source(&source, DEFAULT_ENTRY)
    }

    fn run_program(&self, program: &Program, entry: &str) -> Result<Value, RunError> {
        let mut vm = Vm::with_options(program, &self.natives, self.options);
        tracing::debug!(entry, "invoking entry function");
        Ok(vm.call(entry, Vec::new())?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn runtime_with_log(sink: Rc<RefCell<Vec<String>>>) -> Runtime {
        let mut natives = NativeRegistry::new();
        natives.register(NativeCallable::new("log", 1, move |args| {
            sink.borrow_mut().push(args[0].as_string());
            Ok(Value::Null)
        }));
        Runtime::new(natives)
    }

    #[test]
    fn scenario_sum_with_string_concat() {
        let sink = Rc::new(RefCell::new(Vec::new()));
        let rt = runtime_with_log(sink.clone());
        let result = rt
            .run_source(r#"func main() { let a = 1; let b = 2; log("sum=" + a + b) }"#, "main")
            .unwrap();
        assert_eq!(result, Value::Null);
        assert_eq!(sink.borrow().as_slice(), ["sum=12"]);
    }

    #[test]
    fn scenario_greet_via_named_function() {
        let sink = Rc::new(RefCell::new(Vec::new()));
        let rt = runtime_with_log(sink.clone());
        rt.run_source(
            r#"func greet(_ name) { log("Hola " + name) } func main() { greet("Rafa") }"#,
            "main",
        )
        .unwrap();
        assert_eq!(sink.borrow().as_slice(), ["Hola Rafa"]);
    }

    #[test]
    fn scenario_if_else_dispatches_one_branch() {
        let calls = Rc::new(RefCell::new(Vec::new()));
        let sink = calls.clone();
        let mut natives = NativeRegistry::new();
        natives.register(NativeCallable::new("setText", 2, move |args| {
            sink.borrow_mut().push((args[0].as_string(), args[1].as_string()));
            Ok(Value::Null)
        }));
        let rt = Runtime::new(natives);
        rt.run_source(
            r#"func main() { let x = "Rafa"; if x == "Rafa" { setText(id: "t", text: "ok") } else { setText(id: "t", text: "no") } }"#,
            "main",
        )
        .unwrap();
        assert_eq!(calls.borrow().as_slice(), [("t".to_string(), "ok".to_string())]);
    }

    #[test]
    fn scenario_arithmetic_return() {
        let rt = Runtime::new(NativeRegistry::new());
        let result = rt.run_source("func main() { return 1 + 2 }", "main").unwrap();
        assert_eq!(result, Value::Int(3));
    }

    #[test]
    fn scenario_unknown_native_fails_with_location() {
        let rt = Runtime::new(NativeRegistry::new());
        let err = rt.run_source("func main() { unknown() }", "main").unwrap_err();
        match err {
            RunError::Runtime(RuntimeError::UnknownNative { name, location }) => {
                assert_eq!(name, "unknown");
                assert!(location.is_some());
            }
            other => panic!("expected UnknownNative, got {other:?}"),
        }
    }

    #[test]
    fn scenario_bundle_round_trip_and_wrong_key() {
        let rt = Runtime::new(NativeRegistry::new());
        let program = glint_compiler::compile("func main() { return 1 + 2 }").unwrap();
        let bytes = encode_bundle(&program, Some(b"K1"));

        let ok = rt.run_bundle(&bytes, Some(b"K1"), "main").unwrap();
        assert_eq!(ok, Value::Int(3));

        let err = rt.run_bundle(&bytes, Some(b"K2"), "main").unwrap_err();
        assert!(matches!(err, RunError::Bundle(BundleError::InvalidSignature)));
    }

    #[test]
    fn run_lines_wraps_in_synthetic_main() {
        let rt = Runtime::new(NativeRegistry::new());
        let result = rt.run_lines(&["return 1 + 2".to_string()]).unwrap();
        assert_eq!(result, Value::Int(3));
    }
}
