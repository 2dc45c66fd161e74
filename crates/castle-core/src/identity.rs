//! # Domain Identity Newtypes
//!
//! Newtype wrappers for the identifiers of the escrow stack. These prevent
//! accidental identifier confusion: a `ChatId` cannot be passed where a
//! `UserId` is expected, and a `DealId` cannot exist in a malformed shape.
//!
//! ## Deal Id Format
//!
//! `#` + one uppercase ASCII letter + 1 to 6 decimal digits, e.g. `#K40213`.
//! Input is trimmed and upper-cased before validation, so `#k40213` and
//! `#K40213` name the same deal.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// Identifier of a user (seller, buyer or operator).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(i64);

/// Identifier of a chat owned by the presentation layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChatId(i64);

impl UserId {
    /// Wrap a raw user id.
    pub const fn new(raw: i64) -> Self {
        Self(raw)
    }

    /// The raw integer value.
    pub const fn get(&self) -> i64 {
        self.0
    }
}

impl ChatId {
    /// Wrap a raw chat id.
    pub const fn new(raw: i64) -> Self {
        Self(raw)
    }

    /// The raw integer value.
    pub const fn get(&self) -> i64 {
        self.0
    }
}

impl std::fmt::Display for UserId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::fmt::Display for ChatId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for UserId {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim()
            .parse()
            .map(Self)
            .map_err(|_| CoreError::MalformedId(s.to_string()))
    }
}

impl std::str::FromStr for ChatId {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim()
            .parse()
            .map(Self)
            .map_err(|_| CoreError::MalformedId(s.to_string()))
    }
}

// ─── Deal Id ─────────────────────────────────────────────────────────

/// Human-typeable deal identifier such as `#A123`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct DealId(String);

impl DealId {
    /// Maximum number of digits after the letter.
    pub const MAX_DIGITS: usize = 6;

    /// Parse user input, normalizing case and surrounding whitespace.
    pub fn parse(input: &str) -> Result<Self, CoreError> {
        let normalized = input.trim().to_ascii_uppercase();
        if is_well_formed(&normalized) {
            Ok(Self(normalized))
        } else {
            Err(CoreError::MalformedDealId {
                input: input.to_string(),
            })
        }
    }

    /// The id as text, including the leading `#`.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

fn is_well_formed(s: &str) -> bool {
    let bytes = s.as_bytes();
    bytes.len() >= 3
        && bytes.len() <= 2 + DealId::MAX_DIGITS
        && bytes[0] == b'#'
        && bytes[1].is_ascii_uppercase()
        && bytes[2..].iter().all(u8::is_ascii_digit)
}

impl std::fmt::Display for DealId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::str::FromStr for DealId {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        DealId::parse(s)
    }
}

impl TryFrom<String> for DealId {
    type Error = CoreError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        DealId::parse(&value)
    }
}

impl From<DealId> for String {
    fn from(id: DealId) -> Self {
        id.0
    }
}

// ─── Deal Id Generator ───────────────────────────────────────────────

/// Random deal id source.
///
/// Candidates are a random letter `A..=Z` followed by a random integer in
/// `1..=999_999`. [`generate`](DealIdGenerator::generate) retries until the
/// caller reports the candidate as unused; it never returns an id for which
/// `is_taken` answered `true`.
#[derive(Debug, Clone)]
pub struct DealIdGenerator<R = StdRng> {
    rng: R,
}

impl DealIdGenerator<StdRng> {
    /// A generator seeded from operating system entropy.
    pub fn new() -> Self {
        Self {
            rng: StdRng::from_entropy(),
        }
    }
}

impl Default for DealIdGenerator<StdRng> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: Rng> DealIdGenerator<R> {
    /// Largest numeric suffix a generated id can carry.
    pub const MAX_NUMBER: u32 = 999_999;

    /// A generator drawing from the given random source.
    pub fn from_rng(rng: R) -> Self {
        Self { rng }
    }

    /// Draw one candidate without any uniqueness check.
    pub fn candidate(&mut self) -> DealId {
        let letter = char::from(self.rng.gen_range(b'A'..=b'Z'));
        let number = self.rng.gen_range(1..=Self::MAX_NUMBER);
        DealId(format!("#{letter}{number}"))
    }

    /// Draw candidates until one is not taken.
    pub fn generate(&mut self, mut is_taken: impl FnMut(&DealId) -> bool) -> DealId {
        let mut collisions: u64 = 0;
        loop {
            let candidate = self.candidate();
            if !is_taken(&candidate) {
                return candidate;
            }
            collisions += 1;
            tracing::debug!(deal_id = %candidate, collisions, "deal id already taken, retrying");
        }
    }
}
