use unique_types::ObjectId;

/// Domain-separated BLAKE3 hasher.
///
/// The domain tag is prepended to every computation, so a blob and a tree
/// holding the same bytes still get different addresses.
pub struct ContentHasher {
    domain: &'static str,
}

impl ContentHasher {
    pub const BLOB: Self = Self {
        domain: "unique-blob-v1",
    };
    pub const TREE: Self = Self {
        domain: "unique-tree-v1",
    };
    pub const COMMIT: Self = Self {
        domain: "unique-commit-v1",
    };

    pub const fn new(domain: &'static str) -> Self {
        Self { domain }
    }

    /// Hash raw bytes under this hasher's domain.
    pub fn hash(&self, data: &[u8]) -> ObjectId {
        let mut hasher = blake3::Hasher::new();
        hasher.update(self.domain.as_bytes());
        hasher.update(b":");
        hasher.update(data);
        ObjectId::from_hash(*hasher.finalize().as_bytes())
    }

    /// Whether `data` hashes to `expected` under this domain.
    pub fn verify(&self, data: &[u8], expected: &ObjectId) -> bool {
        self.hash(data) == *expected
    }

    pub fn domain(&self) -> &str {
        self.domain
    }
}
