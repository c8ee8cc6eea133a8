use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const LIKERT_MIN: u8 = 1;
pub const LIKERT_MAX: u8 = 5;

/// A single five-point agreement answer. Only 1..=5 is representable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct Likert(u8);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("answer value {0} is outside {LIKERT_MIN}..={LIKERT_MAX}")]
pub struct InvalidLikert(pub u8);

impl Likert {
    pub const ALL: [Likert; 5] = [Likert(1), Likert(2), Likert(3), Likert(4), Likert(5)];

    pub fn new(value: u8) -> Result<Self, InvalidLikert> {
        Self::try_from(value)
    }

    pub fn value(self) -> u8 {
        self.0
    }
}

impl TryFrom<u8> for Likert {
    type Error = InvalidLikert;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        if (LIKERT_MIN..=LIKERT_MAX).contains(&value) {
            Ok(Self(value))
        } else {
            Err(InvalidLikert(value))
        }
    }
}

impl From<Likert> for u8 {
    fn from(value: Likert) -> Self {
        value.0
    }
}

impl fmt::Display for Likert {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Opaque identifier of a stored result, minted by the scoring service.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResultId(pub String);

impl ResultId {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ResultId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Question {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order: Option<u32>,
    pub text: String,
}

impl Question {
    pub fn new(order: Option<u32>, text: impl Into<String>) -> Self {
        Self {
            order,
            text: text.into(),
        }
    }
}
