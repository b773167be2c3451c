use std::fmt;

/// A snapshot reference to a block as reported by a tracker.
///
/// A new value is obtained on every poll, it is never updated in place.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BlockRef {
    /// The block number.
    pub number: u64,
    /// Chain specific block identifier, usually the hex encoded hash.
    pub id: String,
}

impl BlockRef {
    /// Creates a new reference.
    pub fn new(number: u64, id: impl Into<String>) -> Self {
        Self { number, id: id.into() }
    }

    /// Returns the block number.
    pub const fn number(&self) -> u64 {
        self.number
    }

    /// Returns the block identifier.
    pub fn id(&self) -> &str {
        &self.id
    }
}

impl fmt::Display for BlockRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.id.is_empty() {
            write!(f, "#{}", self.number)
        } else {
            write!(f, "#{} ({})", self.number, self.id)
        }
    }
}

/// The symbolic block a tracker can be asked about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum BlockRefTarget {
    /// Latest irreversible block.
    Lib,
    /// Chain tip as seen by the live block source.
    Head,
}

impl fmt::Display for BlockRefTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Lib => f.write_str("lib"),
            Self::Head => f.write_str("head"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_block_ref() {
        assert_eq!(BlockRef::new(250, "").to_string(), "#250");
        assert_eq!(BlockRef::new(250, "00fa").to_string(), "#250 (00fa)");
        assert_eq!(BlockRefTarget::Lib.to_string(), "lib");
        assert_eq!(BlockRefTarget::Head.to_string(), "head");
    }
}
