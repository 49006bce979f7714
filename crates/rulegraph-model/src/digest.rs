//! Stable, non-cryptographic digests.
//!
//! - algorithm: **FNV-1a 64-bit**
//! - output: 16 lowercase hex digits
//!
//! Used where a synthesized identifier must be a pure function of structured
//! content (diff rule ids). Multi-field digests hash each field's byte length
//! before its bytes, so no delimiter character can make two different field
//! lists collide by concatenation.
//!
//! Not a security primitive.

const FNV_OFFSET_BASIS: u64 = 0xcbf29ce484222325;
const FNV_PRIME: u64 = 0x00000100000001b3;

fn add(hash: &mut u64, bytes: &[u8]) {
    for b in bytes {
        *hash ^= (*b) as u64;
        *hash = hash.wrapping_mul(FNV_PRIME);
    }
}

/// FNV-1a 64-bit over raw bytes.
pub fn fnv1a64(bytes: &[u8]) -> u64 {
    let mut hash = FNV_OFFSET_BASIS;
    add(&mut hash, bytes);
    hash
}

/// FNV-1a 64-bit over a list of fields, each length-prefixed.
pub fn fnv1a64_fields<S: AsRef<str>>(fields: &[S]) -> u64 {
    let mut hash = FNV_OFFSET_BASIS;
    add(&mut hash, &(fields.len() as u64).to_le_bytes());
    for field in fields {
        let bytes = field.as_ref().as_bytes();
        add(&mut hash, &(bytes.len() as u64).to_le_bytes());
        add(&mut hash, bytes);
    }
    hash
}

pub fn to_hex(hash: u64) -> String {
    format!("{hash:016x}")
}
