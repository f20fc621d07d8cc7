use crypto::Certificate;

/// A verified path from a leaf to a trust anchor
///
/// `certificates()` yields the leaf first and the anchor last. A leaf that is
/// itself an anchor yields a chain of length 1.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chain {
    leaf: Certificate,
    issuers: Vec<Certificate>,
}

impl Chain {
    pub(crate) fn new(certificates: Vec<Certificate>) -> Option<Self> {
        let mut certificates = certificates.into_iter();
        let leaf = certificates.next()?;
        Some(Self {
            leaf,
            issuers: certificates.collect(),
        })
    }

    pub fn certificates(&self) -> impl Iterator<Item = &Certificate> + '_ {
        std::iter::once(&self.leaf).chain(&self.issuers)
    }

    pub fn leaf(&self) -> &Certificate {
        &self.leaf
    }

    pub fn anchor(&self) -> &Certificate {
        self.issuers.last().unwrap_or(&self.leaf)
    }

    pub fn len(&self) -> usize {
        self.issuers.len() + 1
    }

    /// Always false; a chain holds at least its leaf.
    pub fn is_empty(&self) -> bool {
        false
    }

    /// Identity of the leaf: its SPIFFE ID when present, else its subject DN.
    pub fn leaf_identity(&self) -> String {
        let leaf = self.leaf();
        leaf.spiffe_id()
            .map(str::to_string)
            .unwrap_or_else(|| leaf.subject().to_string())
    }
}
