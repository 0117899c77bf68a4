//! Sérialisation déterministe d'un [`Program`], plus un tag d'authentification
//! HMAC-SHA256 sur le payload canonique.
//!
//! Le payload canonique est l'encodage `serde_json` du programme : comme
//! toutes les collections des types de `glint_bytecode` sont des `Vec` et
//! jamais des tables de hachage, l'ordre de sérialisation est une fonction
//! pure de l'ordre de construction — deux programmes différents ne
//! collisionnent donc jamais, et le même programme se sérialise toujours
//! sur les mêmes octets, exactement ce qu'exige l'étape de vérification à
//! la lecture (re-sérialiser puis comparer).

use glint_bytecode::Program;
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use subtle::ConstantTimeEq;
use thiserror::Error;

type HmacSha256 = Hmac<Sha256>;

#[derive(Debug, Error)]
pub enum BundleError {
    #[error("bundle signature verification failed")]
    InvalidSignature,

    #[error("malformed bundle payload: {0}")]
    Malformed(String),
}

#[derive(Serialize, Deserialize)]
struct Envelope {
    program: Program,
    signature: Vec<u8>,
}

/// Les octets du payload canonique pour `program` — exactement ceux sur
/// lesquels le tag est calculé, et que la vérification à la lecture
/// recalcule.
pub fn canonical_payload(program: &Program) -> Vec<u8> {
    // Tous les champs de `Program` sont des `Vec`, jamais des `HashMap` :
    // la sortie de `serde_json` dans l'ordre de déclaration des champs est
    // donc déjà canonique, sans tri manuel des clés.
    serde_json::to_vec(program).expect("Program serialization is infallible")
}

fn compute_tag(payload: &[u8], key: Option<&[u8]>) -> Vec<u8> {
    match key {
        None => Vec::new(),
        Some(k) => {
            let mut mac = HmacSha256::new_from_slice(k).expect("HMAC accepts keys of any length");
            mac.update(payload);
            mac.finalize().into_bytes().to_vec()
        }
    }
}

/// Sérialise `program` en bundle, en le marquant de
/// `HMAC-SHA256(payload, key)` si `key` est fourni, ou d'une signature
/// vide sinon.
pub fn encode(program: &Program, key: Option<&[u8]>) -> Vec<u8> {
    let payload = canonical_payload(program);
    let signature = compute_tag(&payload, key);
    let envelope = Envelope { program: program.clone(), signature };
    serde_json::to_vec(&envelope).expect("Envelope serialization is infallible")
}

/// Décode un bundle. Si `key` est fourni, re-sérialise le programme décodé
/// en son payload canonique, recalcule le tag, et le compare en temps
/// constant à la `signature` de l'enveloppe. Sans clé, aucune vérification
/// n'a lieu et `signature` est ignorée.
pub fn decode(bytes: &[u8], key: Option<&[u8]>) -> Result<Program, BundleError> {
    let envelope: Envelope =
        serde_json::from_slice(bytes).map_err(|e| BundleError::Malformed(e.to_string()))?;

    if let Some(k) = key {
        let payload = canonical_payload(&envelope.program);
        let expected = compute_tag(&payload, Some(k));
        let matches: bool = expected.ct_eq(&envelope.signature).into();
        if !matches {
            return Err(BundleError::InvalidSignature);
        }
    }

    Ok(envelope.program)
}

#[cfg(test)]
mod tests {
    use super::*;
    use glint_bytecode::{Chunk, Constant, FunctionRef, Instruction};

    fn sample_program() -> Program {
        let mut p = Program::new();
        p.functions.push(FunctionRef { name: "main".into(), arity: 0, chunk_index: 0, locals: 0 });
        let mut chunk = Chunk::new();
        let ix = chunk.add_const(Constant::Int(42));
        chunk.push_op(Instruction::PushConst(ix), 1);
        chunk.push_op(Instruction::Return, 1);
        p.chunks.push(chunk);
        p
    }

    #[test]
    fn round_trip_without_key() {
        let p = sample_program();
        let bytes = encode(&p, None);
        let decoded = decode(&bytes, None).unwrap();
        assert_eq!(decoded.functions[0].name, p.functions[0].name);
        assert_eq!(decoded.chunks[0].code, p.chunks[0].code);
    }

    #[test]
    fn round_trip_with_matching_key() {
        let p = sample_program();
        let key = b"k1";
        let bytes = encode(&p, Some(key));
        let decoded = decode(&bytes, Some(key)).unwrap();
        assert_eq!(decoded.chunks[0].code, p.chunks[0].code);
    }

    #[test]
    fn wrong_key_fails_verification() {
        let p = sample_program();
        let bytes = encode(&p, Some(b"k1"));
        assert!(matches!(decode(&bytes, Some(b"k2")), Err(BundleError::InvalidSignature)));
    }

    #[test]
    fn tamper_evidence_flips_a_byte() {
        let p = sample_program();
        let key = b"k1";
        let mut bytes = encode(&p, Some(key));
        let last = bytes.len() - 2;
        bytes[last] ^= 0xFF;
        assert!(matches!(decode(&bytes, Some(key)), Err(BundleError::InvalidSignature) | Err(BundleError::Malformed(_))));
    }

    #[test]
    fn same_program_encodes_to_identical_bytes() {
        let p = sample_program();
        assert_eq!(canonical_payload(&p), canonical_payload(&p));
    }

    #[test]
    fn unsigned_bundle_has_empty_signature() {
        assert!(compute_tag(b"payload", None).is_empty());
    }
}
