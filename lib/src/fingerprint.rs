//! Content-derived 64-bit identifiers.
//!
//! ```text
//!  63            48 47      40 39                                 0
//! +----------------+----------+------------------------------------+
//! | days published | staleness|      title code points, MSB first  |
//! +----------------+----------+------------------------------------+
//! ```
//!
//! The high bits sort chronologically by publish date; the low bits tell
//! apart items published on the same day.

use std::fmt;
use std::str::FromStr;

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::NaiveDate;
use serde::{Serialize, Serializer};

use crate::error::{Error, Kind};

const DATE_SHIFT: u32 = 48;
const STALE_SHIFT: u32 = 40;
const TITLE_BITS: u32 = 40;
const TITLE_MASK: u64 = (1 << TITLE_BITS) - 1;
const MAX_STALENESS: i64 = 0xFF;
const MAX_DAYS: i64 = 0xFFFF;

#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Fingerprint(u64);

/// The day publish dates are counted from.
pub fn epoch() -> NaiveDate {
    // `NaiveDate`'s default is 1970-01-01.
    NaiveDate::default()
}

impl Fingerprint {
    /// Computes the fingerprint of an item published on `date`, last updated
    /// on `updated`, titled `title`, as seen at `now`.
    ///
    /// Missing or pre-epoch publish dates count as day zero. A missing or
    /// future `updated` has zero staleness.
    pub fn new(date: Option<NaiveDate>, updated: Option<NaiveDate>, title: &str, now: NaiveDate) -> Self {
        let days = date.map_or(0, |d| (d - epoch()).num_days().clamp(0, MAX_DAYS)) as u64;
        let stale = updated.map_or(0, |u| (now - u).num_days().clamp(0, MAX_STALENESS)) as u64;
        Fingerprint((days << DATE_SHIFT) | (stale << STALE_SHIFT) | pack_title(title))
    }

    pub const fn from_bits(bits: u64) -> Self {
        Fingerprint(bits)
    }

    pub const fn bits(self) -> u64 {
        self.0
    }

    /// Days between the epoch and the publish date.
    pub const fn days(self) -> u16 {
        (self.0 >> DATE_SHIFT) as u16
    }

    /// Days between the last update and the resolution clock, capped at 255.
    pub const fn staleness(self) -> u8 {
        (self.0 >> STALE_SHIFT) as u8
    }

    pub const fn title_bits(self) -> u64 {
        self.0 & TITLE_MASK
    }

    /// The URL-safe base64 form used as an external reference.
    pub fn encode(self) -> String {
        URL_SAFE_NO_PAD.encode(self.0.to_be_bytes())
    }
}

/// Packs the code points of `title` into the low 40 bits, most significant
/// bits first. Each code point contributes its significant bits. The first
/// code point that doesn't fit is shifted right to fill what's left, and
/// packing stops there; an exhausted budget drops the rest of the title.
fn pack_title(title: &str) -> u64 {
    let mut packed: u64 = 0;
    let mut remaining = TITLE_BITS;
    for ch in title.chars() {
        if remaining == 0 {
            break;
        }

        let code = ch as u32 as u64;
        let width = (u32::BITS - (ch as u32).leading_zeros()).max(1);
        if width <= remaining {
            packed = (packed << width) | code;
            remaining -= width;
        } else {
            packed = (packed << remaining) | (code >> (width - remaining));
            remaining = 0;
        }
    }

    (packed << remaining) & TITLE_MASK
}

impl FromStr for Fingerprint {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes = URL_SAFE_NO_PAD.decode(s)
            .map_err(|e| error!("invalid fingerprint encoding", "input" => s, e).with_kind(Kind::Malformed))?;

        let bytes: [u8; 8] = bytes.try_into()
            .map_err(|_| error!("fingerprints are exactly 8 bytes", "input" => s).with_kind(Kind::Malformed))?;

        Ok(Fingerprint(u64::from_be_bytes(bytes)))
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.encode().fmt(f)
    }
}

impl fmt::Debug for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Fingerprint({:#018x})", self.0)
    }
}

impl Serialize for Fingerprint {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.encode())
    }
}
