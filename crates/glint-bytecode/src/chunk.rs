//! Chunk et Program : la sortie du compilateur, consommée par la VM et par
//! le codec de bundle.

use serde::{Deserialize, Serialize};

use crate::{Constant, Instruction};

/// Une ligne source 1-based, attachée aux erreurs runtime et à chaque
/// instruction émise via le tableau parallèle `debug_lines` d'un chunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceLocation {
    pub line: u32,
}

impl SourceLocation {
    pub fn new(line: u32) -> Self {
        Self { line }
    }
}

/// Une référence à une fonction script compilée, et la charge utile
/// `Value` portée quand une fonction est référencée comme valeur
/// first-class par son nom.
///
/// `locals` est le nombre de slots locaux que la fonction occupe (paramètres
/// compris) ; la VM s'en sert pour dimensionner la fenêtre de la frame sans
/// avoir à rejouer le compteur de slots du compilateur.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionRef {
    pub name: String,
    pub arity: u8,
    pub chunk_index: usize,
    pub locals: usize,
}

/// Bytecode, pool de constantes et source map pour un corps de fonction.
///
/// Invariants (garantis par le compilateur, vérifiés défensivement par la
/// VM) : `code.len() == debug_lines.len()` ; tout index `PushConst`/
/// `CallNative` est valide dans `constants` ; toute cible de saut se situe
/// dans `[0, code.len()]`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Chunk {
    pub code: Vec<Instruction>,
    pub constants: Vec<Constant>,
    pub debug_lines: Vec<u32>,
}

impl Chunk {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ajoute une instruction et sa ligne source, en gardant `code` et
    /// `debug_lines` synchronisés.
    pub fn push_op(&mut self, op: Instruction, line: u32) -> usize {
        let ix = self.code.len();
        self.code.push(op);
        self.debug_lines.push(line);
        ix
    }

    /// Interne une constante et retourne son index. Pas de déduplication :
    /// le compilateur émet une constante par occurrence de littéral, au
    /// plus près de l'ordre d'évaluation du source.
    pub fn add_const(&mut self, c: Constant) -> usize {
        let ix = self.constants.len();
        self.constants.push(c);
        ix
    }

    /// Ligne source pour l'instruction à `ip`, bornée dans l'intervalle
    /// valide.
    pub fn line_for(&self, ip: usize) -> Option<u32> {
        if self.debug_lines.is_empty() {
            return None;
        }
        let clamped = ip.min(self.debug_lines.len() - 1);
        self.debug_lines.get(clamped).copied()
    }
}

/// La sortie complète du compilateur : le chunk de chaque fonction plus la
/// table des fonctions utilisée pour résoudre les appels par nom.
///
/// Un `Program` est produit une seule fois et jamais muté ensuite ; la VM
/// n'en détient qu'une référence partagée, pour la durée d'un seul `call`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Program {
    pub chunks: Vec<Chunk>,
    pub functions: Vec<FunctionRef>,
}

impl Program {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn find_function(&self, name: &str) -> Option<(usize, &FunctionRef)> {
        self.functions.iter().enumerate().find(|(_, f)| f.name == name)
    }
}
