//! Le jeu d'instructions fixe exécuté par la VM.

use serde::{Deserialize, Serialize};

/// Index dans le pool de constantes d'un chunk.
pub type ConstIx = usize;
/// Index dans la fenêtre de slots locaux d'une frame.
pub type LocalIx = usize;
/// Index dans la table des fonctions d'un programme.
pub type FuncIx = usize;

/// Une instruction bytecode.
///
/// Les offsets de saut sont relatifs à l'instruction *suivant* le saut :
/// `new_ip = ip_after_jump + offset`. Cette convention est partagée par le
/// rattrapage (back-patching) du compilateur et la boucle de dispatch de la
/// VM ; ne pas confondre avec "relatif à l'instruction de saut elle-même".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Instruction {
    PushConst(ConstIx),
    LoadLocal(LocalIx),
    StoreLocal(LocalIx),
    Add,
    Eq,
    Pop,
    Jump(i32),
    JumpIfFalse(i32),
    CallNative(ConstIx, u8),
    CallFunc(FuncIx, u8),
    Return,
    Nop,
}
