//! VM à pile bornée en gas, exécutant des `glint-bytecode::Program`, plus
//! le pont vers les fonctions natives de l'hôte.

mod error;
mod native;
mod vm;

pub use error::RuntimeError;
pub use native::{NativeCallable, NativeRegistry};
pub use vm::{Vm, VmOptions};
