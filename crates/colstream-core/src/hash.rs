//! Stable hashing helpers for column files and decoded row streams.

use blake3::Hasher;

use crate::types::Scalar;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct Hash256(pub [u8; 32]);

impl Hash256 {
    pub fn to_hex(&self) -> String {
        // blake3 hex(32b) is 64 hex chars
        let mut s = String::with_capacity(64);
        for b in &self.0 {
            use std::fmt::Write as _;
            let _ = write!(&mut s, "{:02x}", b);
        }
        s
    }
}

impl std::fmt::Display for Hash256 {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

pub fn hash_bytes(bytes: &[u8]) -> Hash256 {
    let mut h = Hasher::new();
    h.update(bytes);
    Hash256(h.finalize().into())
}

/// Incremental digest over a stream of decoded values.
///
/// Each value contributes its type tag and little-endian bytes, so the same
/// rows decoded from little- or big-endian columns hash identically.
pub struct RowDigest {
    hasher: Hasher,
    values: u64,
}

impl RowDigest {
    pub fn new() -> Self {
        Self {
            hasher: Hasher::new(),
            values: 0,
        }
    }

    pub fn update(&mut self, value: &Scalar) {
        let mut buf = Vec::with_capacity(9);
        buf.push(type_tag(value));
        value.write_bytes(crate::schema::ByteOrder::Little, &mut buf);
        self.hasher.update(&buf);
        self.values += 1;
    }

    /// Number of values folded in so far.
    pub fn values(&self) -> u64 {
        self.values
    }

    pub fn finalize(&self) -> Hash256 {
        Hash256(self.hasher.finalize().into())
    }
}

impl Default for RowDigest {
    fn default() -> Self {
        Self::new()
    }
}

fn type_tag(s: &Scalar) -> u8 {
    match s {
        Scalar::I8(_) => 0,
        Scalar::I16(_) => 1,
        Scalar::I32(_) => 2,
        Scalar::I64(_) => 3,
        Scalar::U8(_) => 4,
        Scalar::U16(_) => 5,
        Scalar::U32(_) => 6,
        Scalar::U64(_) => 7,
        Scalar::F32(_) => 8,
        Scalar::F64(_) => 9,
    }
}
