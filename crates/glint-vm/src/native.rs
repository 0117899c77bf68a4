//! Pont vers les fonctions hôte : un registre de callables natifs indexé
//! par nom, avec arité déclarée — la seule façon pour le script d'atteindre
//! le monde extérieur.

use std::collections::HashMap;

use glint_bytecode::Value;

use crate::error::RuntimeError;

/// Une fonction fournie par l'hôte, invocable depuis le script par son nom.
pub struct NativeCallable {
    pub name: String,
    pub arity: u8,
    func: Box<dyn Fn(&[Value]) -> Result<Value, String>>,
}

impl NativeCallable {
    pub fn new(
        name: impl Into<String>,
        arity: u8,
        func: impl Fn(&[Value]) -> Result<Value, String> + 'static,
    ) -> Self {
        Self { name: name.into(), arity, func: Box::new(func) }
    }

    pub fn invoke(&self, args: &[Value]) -> Result<Value, RuntimeError> {
        (self.func)(args).map_err(|message| RuntimeError::NativeFailure { message, location: None })
    }
}

/// Table nom -> callable. L'enregistrement est censé se faire avant tout
/// appel ; le registre est en lecture seule pendant l'exécution.
#[derive(Default)]
pub struct NativeRegistry {
    callables: HashMap<String, NativeCallable>,
}

impl NativeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, callable: NativeCallable) {
        self.callables.insert(callable.name.clone(), callable);
    }

    pub fn get(&self, name: &str) -> Option<&NativeCallable> {
        self.callables.get(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registers_and_resolves_by_name() {
        let mut reg = NativeRegistry::new();
        reg.register(NativeCallable::new("double", 1, |args| match &args[0] {
            Value::Int(i) => Ok(Value::Int(i * 2)),
            _ => Err("expected Int".into()),
        }));
        let c = reg.get("double").unwrap();
        assert_eq!(c.arity, 1);
        assert_eq!(c.invoke(&[Value::Int(21)]).unwrap(), Value::Int(42));
    }

    #[test]
    fn unknown_name_resolves_to_none() {
        let reg = NativeRegistry::new();
        assert!(reg.get("nope").is_none());
    }
}
