//! Deterministic fingerprints for trained models.

/// Small non-cryptographic FNV-1a hash used to name model artefacts.
#[derive(Copy, Clone, Debug)]
pub struct SimpleHash(u64);

impl SimpleHash {
    /// Create a new hash state with the FNV offset basis.
    pub fn new() -> Self {
        Self(0xcbf2_9ce4_8422_2325)
    }

    /// Feed bytes into the hash function.
    pub fn update(&mut self, bytes: &[u8]) {
        for b in bytes {
            self.0 = (self.0 ^ u64::from(*b)).wrapping_mul(0x0100_0000_01b3);
        }
    }

    /// Feed a length-prefixed string so that `["ab", "c"]` and `["a", "bc"]` differ.
    pub fn update_str(&mut self, value: &str) {
        self.update(&(value.len() as u64).to_le_bytes());
        self.update(value.as_bytes());
    }

    /// Finalise the hash and return a 16-character lowercase hex string.
    pub fn finish_hex(&self) -> String {
        format!("{:016x}", self.0)
    }
}

impl Default for SimpleHash {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_is_deterministic_and_order_sensitive() {
        let mut a = SimpleHash::new();
        a.update_str("ab");
        a.update_str("c");
        let mut b = SimpleHash::new();
        b.update_str("ab");
        b.update_str("c");
        let mut c = SimpleHash::new();
        c.update_str("a");
        c.update_str("bc");
        assert_eq!(a.finish_hex(), b.finish_hex());
        assert_ne!(a.finish_hex(), c.finish_hex());
        assert_eq!(a.finish_hex().len(), 16);
    }
}
