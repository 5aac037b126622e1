//! Immutable numeric ranges derived from allocated blocks.

use std::fmt;
use std::hash::{Hash, Hasher};

use crate::domain::error::{DomainError, DomainResult};

/// Number space a range lives in.
///
/// IPv4 and AS numbers are 32-bit, IPv6 is 128-bit. All three are carried as
/// `u128` so one builder serves every family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum AddressFamily {
    Ipv4,
    Ipv6,
    Asn,
}

impl AddressFamily {
    /// Largest value representable in this family.
    pub fn max_value(self) -> u128 {
        match self {
            AddressFamily::Ipv4 | AddressFamily::Asn => u32::MAX as u128,
            AddressFamily::Ipv6 => u128::MAX,
        }
    }
}

impl fmt::Display for AddressFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            AddressFamily::Ipv4 => "ipv4",
            AddressFamily::Ipv6 => "ipv6",
            AddressFamily::Asn => "asn",
        };
        f.write_str(name)
    }
}

/// Inclusive `[start, end]` span of one allocated block.
///
/// Fields are private: a `Range` that exists has already been validated, so
/// the builder never sees inverted bounds or an inconsistent address count.
/// Equality and hashing use the identity only.
#[derive(Debug, Clone)]
pub struct Range {
    identity: String,
    family: AddressFamily,
    start: u128,
    end: u128,
    address_count: u128,
}

impl Range {
    /// Create a range, checking that `address_count == end - start + 1`.
    pub fn new(
        identity: impl Into<String>,
        family: AddressFamily,
        start: u128,
        end: u128,
        address_count: u128,
    ) -> DomainResult<Self> {
        let identity = identity.into();
        Self::check_bounds(&identity, family, start, end)?;

        // end - start cannot underflow after check_bounds
        let expected = (end - start).checked_add(1);
        if expected != Some(address_count) {
            return Err(match expected {
                Some(expected) => DomainError::AddressCountMismatch {
                    identity,
                    expected,
                    actual: address_count,
                },
                None => DomainError::AddressCountOverflow(identity),
            });
        }

        Ok(Self {
            identity,
            family,
            start,
            end,
            address_count,
        })
    }

    /// Create a range and derive its address count from the bounds.
    pub fn spanning(
        identity: impl Into<String>,
        family: AddressFamily,
        start: u128,
        end: u128,
    ) -> DomainResult<Self> {
        let identity = identity.into();
        Self::check_bounds(&identity, family, start, end)?;
        let address_count = (end - start)
            .checked_add(1)
            .ok_or_else(|| DomainError::AddressCountOverflow(identity.clone()))?;
        Ok(Self {
            identity,
            family,
            start,
            end,
            address_count,
        })
    }

    fn check_bounds(identity: &str, family: AddressFamily, start: u128, end: u128) -> DomainResult<()> {
        if identity.is_empty() {
            return Err(DomainError::EmptyIdentity);
        }
        if start > end {
            return Err(DomainError::InvalidBounds {
                identity: identity.to_string(),
                start,
                end,
            });
        }
        if end > family.max_value() {
            return Err(DomainError::OutOfFamilyBounds {
                identity: identity.to_string(),
                family,
                end,
            });
        }
        Ok(())
    }

    pub fn identity(&self) -> &str {
        &self.identity
    }

    pub fn family(&self) -> AddressFamily {
        self.family
    }

    pub fn start(&self) -> u128 {
        self.start
    }

    pub fn end(&self) -> u128 {
        self.end
    }

    pub fn address_count(&self) -> u128 {
        self.address_count
    }

    /// Single-address ranges can be nested but never contain anything.
    pub fn is_degenerate(&self) -> bool {
        self.address_count == 1
    }

    /// True if `other` lies entirely inside `self` (equal bounds included).
    pub fn contains(&self, other: &Range) -> bool {
        self.start <= other.start && other.end <= self.end
    }

    /// True if the two ranges share at least one value.
    pub fn overlaps(&self, other: &Range) -> bool {
        self.start <= other.end && other.start <= self.end
    }

    /// True if the ranges share values but neither contains the other.
    pub fn partially_overlaps(&self, other: &Range) -> bool {
        self.overlaps(other) && !self.contains(other) && !other.contains(self)
    }
}

impl PartialEq for Range {
    fn eq(&self, other: &Self) -> bool {
        self.identity == other.identity
    }
}

impl Eq for Range {}

impl Hash for Range {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.identity.hash(state);
    }
}

impl fmt::Display for Range {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} [{}..={}]", self.identity, self.start, self.end)
    }
}
