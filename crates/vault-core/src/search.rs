//! Blind index tokens for equality search over encrypted fields
//!
//! Stored field values are ciphertext, so the database cannot compare them.
//! Instead a deterministic keyed digest of the canonicalized plaintext is
//! stored alongside each blob; recomputing the token at query time gives
//! exact-match lookup without ever decrypting. Tokens are irreversible and
//! support no ordering, prefix, or similarity semantics by construction.
//!
//! Canonicalization rules are versioned: when a rule changes, stored tokens
//! computed under the old rule stop matching new ones for logically equal
//! values. [`BlindIndex::candidate_tokens`] produces a token per supported
//! rule set so a caller mid-migration can match against either until all
//! stored tokens are backfilled.

use hmac::{Hmac, Mac};
use sha2::Sha256;
use zeroize::Zeroizing;

use crate::error::{Result, VaultError};
use crate::settings::ProtectionSettings;

type HmacSha256 = Hmac<Sha256>;

/// Blind index token size (256 bits)
pub const TOKEN_SIZE: usize = 32;

/// A deterministic, irreversible digest of a canonicalized value
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct IndexToken([u8; TOKEN_SIZE]);

impl IndexToken {
    /// Get the raw token bytes
    pub fn as_bytes(&self) -> &[u8; TOKEN_SIZE] {
        &self.0
    }

    /// Hex rendering for storage columns
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl AsRef<[u8]> for IndexToken {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl std::fmt::Debug for IndexToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "IndexToken({})", self.to_hex())
    }
}

/// How a value should be canonicalized before hashing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexedValueKind {
    /// Free text (surnames, city names): Unicode lowercase fold
    Text,
    /// Numeric identifiers (national IDs, document numbers): only the
    /// digits are significant
    NumericId,
}

/// Versioned canonicalization rule sets
///
/// Part of the token contract: changing a rule changes every affected
/// token, so new rules get a new version instead of silently replacing
/// the old one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CanonicalizationRules {
    /// Unicode lowercase fold only (legacy)
    V1,
    /// Lowercase fold, plus digit-only extraction for numeric identifiers
    V2,
}

impl CanonicalizationRules {
    /// Rules applied to newly written tokens
    pub const CURRENT: Self = Self::V2;

    /// All supported rule sets, newest first
    pub const ALL: [Self; 2] = [Self::V2, Self::V1];

    fn canonicalize(&self, value: &str, kind: IndexedValueKind) -> String {
        match (self, kind) {
            (Self::V2, IndexedValueKind::NumericId) => {
                value.chars().filter(|c| c.is_ascii_digit()).collect()
            }
            _ => value.to_lowercase(),
        }
    }
}

/// Keyed blind index over a process-wide pepper
///
/// Deterministic across calls and process restarts as long as the pepper
/// is unchanged. Immutable after construction; safe to share across
/// concurrent callers.
pub struct BlindIndex {
    pepper: Zeroizing<Vec<u8>>,
}

impl BlindIndex {
    /// Create a blind index keyed by the given pepper
    pub fn new(pepper: &[u8]) -> Self {
        Self {
            pepper: Zeroizing::new(pepper.to_vec()),
        }
    }

    /// Create a blind index from protection settings
    ///
    /// The pepper is mandatory here: an unkeyed index would let anyone who
    /// can read the token column run dictionary attacks against it.
    pub fn from_settings(settings: &ProtectionSettings) -> Result<Self> {
        match settings.pepper()? {
            Some(pepper) => Ok(Self::new(pepper.as_slice())),
            None => Err(VaultError::InvalidConfig(
                "blind index requires a configured pepper".to_string(),
            )),
        }
    }

    /// Compute the token for a value under the current canonicalization rules
    pub fn token(&self, value: &str, kind: IndexedValueKind) -> IndexToken {
        self.token_with_rules(value, kind, CanonicalizationRules::CURRENT)
    }

    /// Compute the token for a value under a specific rule set
    pub fn token_with_rules(
        &self,
        value: &str,
        kind: IndexedValueKind,
        rules: CanonicalizationRules,
    ) -> IndexToken {
        let canonical = rules.canonicalize(value, kind);

        let mut mac =
            HmacSha256::new_from_slice(&self.pepper).expect("HMAC accepts any key length");
        mac.update(canonical.as_bytes());
        let digest = mac.finalize().into_bytes();

        let mut token = [0u8; TOKEN_SIZE];
        token.copy_from_slice(&digest);
        IndexToken(token)
    }

    /// Compute one token per supported rule set, newest first, with
    /// duplicates removed
    ///
    /// A caller migrating stored tokens to a newer rule set matches
    /// incoming queries against any of these until the backfill completes.
    pub fn candidate_tokens(&self, value: &str, kind: IndexedValueKind) -> Vec<IndexToken> {
        let mut tokens: Vec<IndexToken> = Vec::with_capacity(CanonicalizationRules::ALL.len());
        for rules in CanonicalizationRules::ALL {
            let token = self.token_with_rules(value, kind, rules);
            if !tokens.contains(&token) {
                tokens.push(token);
            }
        }
        tokens
    }
}
