//! Modèle de données Value, Constant, Instruction et Chunk/Program, partagé
//! par `glint-compiler`, `glint-vm` et `glint-bundle`.
//!
//! Ce crate ne fait ni parsing ni exécution : il ne définit que les formes
//! qui circulent entre eux. Chaque type qui traverse une frontière de crate
//! dérive `serde::{Serialize, Deserialize}`, et chaque collection de ces
//! types est un `Vec` plutôt qu'une table de hachage, si bien que l'ordre
//! de sérialisation est une fonction pure de l'ordre de construction — ce
//! qui rend le payload canonique du codec de bundle déterministe sans tri
//! manuel des clés.

mod chunk;
mod constant;
mod instr;
mod value;

pub use chunk::{Chunk, FunctionRef, Program, SourceLocation};
pub use constant::Constant;
pub use instr::{ConstIx, FuncIx, Instruction, LocalIx};
pub use value::Value;
