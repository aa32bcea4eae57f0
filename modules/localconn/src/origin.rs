use std::fmt;
use std::str::FromStr;

use uuid::Uuid;

/// Identifies the channel instance that wrote a token.
///
/// Drawn from a v4 UUID, so two instances created in the same instant do not
/// collide. Rendered as a decimal integer on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct OriginId(u128);

impl OriginId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4().as_u128())
    }

    pub const fn from_raw(raw: u128) -> Self {
        Self(raw)
    }

    pub const fn as_raw(self) -> u128 {
        self.0
    }
}

impl fmt::Display for OriginId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for OriginId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.parse::<u128>().map(Self)
    }
}
