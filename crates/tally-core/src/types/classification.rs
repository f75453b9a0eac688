//! Client classification used to bucket increments.
//!
//! A classification is a two-character region code followed by an ordered
//! sequence of binary digits. The dispatcher derives it from connection
//! metadata: the region header plus the parity of every segment of the
//! client address.

use std::fmt;
use std::net::IpAddr;

use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::result::AppResult;

/// Upper bound on derived bits (one per IPv6 group).
pub const MAX_BITS: usize = 8;

/// A validated classification input.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "RawClassification")]
pub struct Classification {
    region: String,
    bits: Vec<u8>,
}

/// Unvalidated wire form.
#[derive(Debug, Deserialize)]
struct RawClassification {
    region: String,
    #[serde(default)]
    bits: Vec<u8>,
}

impl TryFrom<RawClassification> for Classification {
    type Error = AppError;

    fn try_from(raw: RawClassification) -> Result<Self, Self::Error> {
        Self::new(&raw.region, raw.bits)
    }
}

impl Classification {
    /// Validate a region code and bit sequence.
    ///
    /// The region must be exactly two ASCII letters or digits (stored in
    /// upper case); every bit must be `0` or `1`, and there may be at most
    /// [`MAX_BITS`] of them.
    pub fn new(region: &str, bits: Vec<u8>) -> AppResult<Self> {
        let region = region.trim();
        if region.is_empty() {
            return Err(AppError::validation("Classification region is empty"));
        }
        if region.len() != 2 || !region.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(AppError::validation(format!(
                "Classification region must be two ASCII letters or digits, got '{region}'"
            )));
        }
        if bits.len() > MAX_BITS {
            return Err(AppError::validation(format!(
                "Classification has {} bits, at most {MAX_BITS} allowed",
                bits.len()
            )));
        }
        if let Some(bad) = bits.iter().find(|b| **b > 1) {
            return Err(AppError::validation(format!(
                "Classification bits must be 0 or 1, got {bad}"
            )));
        }

        Ok(Self {
            region: region.to_ascii_uppercase(),
            bits,
        })
    }

    /// Derive a classification from a region header and client address.
    ///
    /// Each IPv4 octet (or IPv6 group) contributes its parity, in order,
    /// and exactly `depth` bits are kept. An address with fewer segments
    /// than `depth` (an IPv4 address with `depth > 4`) is rejected.
    pub fn from_connection(region: &str, ip: &str, depth: usize) -> AppResult<Self> {
        let addr: IpAddr = ip.trim().parse().map_err(|e| {
            AppError::with_source(
                crate::error::ErrorKind::Validation,
                format!("Invalid client address '{ip}'"),
                e,
            )
        })?;

        let bits: Vec<u8> = match addr {
            IpAddr::V4(v4) => v4.octets().iter().map(|o| o % 2).collect(),
            IpAddr::V6(v6) => v6.segments().iter().map(|s| (s % 2) as u8).collect(),
        };

        if bits.len() < depth {
            return Err(AppError::validation(format!(
                "Address '{ip}' yields {} bits, {depth} required",
                bits.len()
            )));
        }

        Self::new(region, bits.into_iter().take(depth).collect())
    }

    /// Region code (upper case).
    pub fn region(&self) -> &str {
        &self.region
    }

    /// Ordered derived bits.
    pub fn bits(&self) -> &[u8] {
        &self.bits
    }

    /// Key segments in order: the region, then every bit.
    pub fn segments(&self) -> impl Iterator<Item = String> + '_ {
        std::iter::once(self.region.clone()).chain(self.bits.iter().map(|b| b.to_string()))
    }
}

impl fmt::Display for Classification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.region)?;
        for bit in &self.bits {
            write!(f, ".{bit}")?;
        }
        Ok(())
    }
}
