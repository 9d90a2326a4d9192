#![forbid(unsafe_code)]

use std::fmt;

use sha2::{Digest, Sha256};

/// SHA-256 digest identifying the inputs a resolved table was built from.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Fingerprint([u8; 32]);

impl Fingerprint {
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// First 12 hex digits; enough to tell tables apart in listings.
    pub fn short(&self) -> String {
        let mut s = self.to_hex();
        s.truncate(12);
        s
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

/// Incremental hasher over tagged fields.
///
/// Every field is written as `tag=len:value;` so that adjacent fields can
/// never run together into the same byte stream.
pub struct FingerprintBuilder {
    hasher: Sha256,
}

impl FingerprintBuilder {
    pub fn new(domain: &str) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(b"ecl/");
        hasher.update(domain.as_bytes());
        hasher.update(b"\n");
        Self { hasher }
    }

    pub fn field(&mut self, tag: &str, value: impl fmt::Display) -> &mut Self {
        let value = value.to_string();
        self.hasher.update(tag.as_bytes());
        self.hasher.update(b"=");
        self.hasher.update(value.len().to_string().as_bytes());
        self.hasher.update(b":");
        self.hasher.update(value.as_bytes());
        self.hasher.update(b";");
        self
    }

    pub fn fingerprint(&mut self, tag: &str, fp: &Fingerprint) -> &mut Self {
        self.field(tag, fp.to_hex())
    }

    pub fn finish(self) -> Fingerprint {
        let digest = self.hasher.finalize();
        let mut out = [0u8; 32];
        out.copy_from_slice(&digest);
        Fingerprint(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn field_boundaries_are_unambiguous() {
        let mut a = FingerprintBuilder::new("t");
        a.field("x", "ab").field("y", "c");
        let mut b = FingerprintBuilder::new("t");
        b.field("x", "a").field("y", "bc");
        assert_ne!(a.finish(), b.finish());
    }

    #[test]
    fn hex_rendering_is_stable() {
        let fp = FingerprintBuilder::new("t").finish();
        assert_eq!(fp.to_hex().len(), 64);
        assert_eq!(fp.short().len(), 12);
        assert_eq!(fp, FingerprintBuilder::new("t").finish());
    }
}
