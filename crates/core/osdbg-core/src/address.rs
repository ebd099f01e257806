//! Address classification
//!
//! Decides whether a program-counter value belongs to the kernel or to a
//! user program by checking it against the configured memory ranges.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Half-open address interval `[low, high)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MemoryRange {
    pub low: u64,
    pub high: u64,
}

impl MemoryRange {
    pub fn new(low: u64, high: u64) -> Result<Self, ConfigError> {
        if low >= high {
            return Err(ConfigError::InvalidRange {
                low: format!("{low:#x}"),
                high: format!("{high:#x}"),
                message: "lower bound must be below upper bound".to_string(),
            });
        }
        Ok(Self { low, high })
    }

    /// Builds a range from the `["0x80200000", "0x80800000"]` string pairs
    /// found in attach configurations.
    pub fn parse(low: &str, high: &str) -> Result<Self, ConfigError> {
        let lo = parse_address(low)?;
        let hi = parse_address(high)?;
        Self::new(lo, hi).map_err(|_| ConfigError::InvalidRange {
            low: low.to_string(),
            high: high.to_string(),
            message: "lower bound must be below upper bound".to_string(),
        })
    }

    #[inline]
    pub fn contains(&self, address: u64) -> bool {
        self.low <= address && address < self.high
    }
}

impl fmt::Display for MemoryRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{:#x}, {:#x})", self.low, self.high)
    }
}

/// True iff `address` falls in any of `ranges`.
pub fn is_in_domain(address: u64, ranges: &[MemoryRange]) -> bool {
    ranges.iter().any(|range| range.contains(address))
}

/// Execution domain an address can belong to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Domain {
    Kernel,
    User,
}

impl fmt::Display for Domain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Domain::Kernel => f.write_str("kernel"),
            Domain::User => f.write_str("user"),
        }
    }
}

/// Memory ranges of both domains for one debug session.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MemoryLayout {
    kernel: Vec<MemoryRange>,
    user: Vec<MemoryRange>,
}

impl MemoryLayout {
    pub fn new(kernel: Vec<MemoryRange>, user: Vec<MemoryRange>) -> Self {
        Self { kernel, user }
    }

    pub fn ranges(&self, domain: Domain) -> &[MemoryRange] {
        match domain {
            Domain::Kernel => &self.kernel,
            Domain::User => &self.user,
        }
    }

    pub fn contains(&self, domain: Domain, address: u64) -> bool {
        is_in_domain(address, self.ranges(domain))
    }

    /// Kernel ranges win when an address is configured in both domains.
    pub fn classify(&self, address: u64) -> Option<Domain> {
        if self.contains(Domain::Kernel, address) {
            Some(Domain::Kernel)
        } else if self.contains(Domain::User, address) {
            Some(Domain::User)
        } else {
            None
        }
    }
}

/// Parses a configured address: `0x`-prefixed hex or plain decimal.
pub fn parse_address(text: &str) -> Result<u64, ConfigError> {
    let trimmed = text.trim().replace('_', "");
    let parsed = match trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
    {
        Some(hex) => u64::from_str_radix(hex, 16),
        None => trimmed.parse::<u64>(),
    };
    parsed.map_err(|_| ConfigError::InvalidAddress(text.to_string()))
}

/// Parses a register value reported by the debugger. These are always hex,
/// with or without the `0x` prefix. Only the leading hex digits count, so a
/// natural-format value such as `0x15000 <main+4>` reads as `0x15000`.
pub fn parse_register_value(text: &str) -> Option<u64> {
    let token = text.split_whitespace().next()?;
    let hex = token
        .strip_prefix("0x")
        .or_else(|| token.strip_prefix("0X"))
        .unwrap_or(token);
    let digits = hex
        .find(|c: char| !c.is_ascii_hexdigit())
        .map_or(hex, |end| &hex[..end]);
    u64::from_str_radix(digits, 16).ok()
}
