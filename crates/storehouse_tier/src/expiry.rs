// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Expiration policies for stored entries.

use std::time::{Duration, SystemTime};

use serde::{Deserialize, Serialize};

/// Offset from the Unix epoch used as the resolved instant of [`Expiry::Never`].
///
/// The sentinel is a fixed instant in December 2037, not an offset from the current time, so entries
/// stored as `Never` read as expired after that date.
///
/// Sixty-eight years of seconds fits a signed 32-bit counter, so the sentinel survives arithmetic on
/// every platform time representation.
pub const NEVER_EXPIRES_OFFSET: Duration = Duration::from_secs(60 * 60 * 24 * 365 * 68);

/// Describes when a stored entry goes stale.
///
/// Every variant resolves to a concrete [`SystemTime`]; there is no infinite value, so comparisons and
/// subtraction against the resolved instant never overflow.
///
/// # Examples
///
/// ```
/// use std::time::{Duration, SystemTime};
///
/// use storehouse_tier::Expiry;
///
/// let expiry = Expiry::SecondsFrom1970(1_000.0);
/// assert_eq!(expiry.resolve(), SystemTime::UNIX_EPOCH + Duration::from_secs(1_000));
/// assert!(expiry.is_expired(SystemTime::UNIX_EPOCH + Duration::from_secs(1_001)));
/// assert!(!Expiry::Never.is_expired(SystemTime::UNIX_EPOCH + Duration::from_secs(1_001)));
/// ```
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Expiry {
    /// The entry does not expire within any practical horizon.
    #[default]
    Never,
    /// The entry expires at the given number of seconds after the Unix epoch.
    SecondsFrom1970(f64),
    /// The entry expires at the given instant.
    AbsoluteDate(SystemTime),
}

impl Expiry {
    /// Resolves the policy to the instant at which the entry expires.
    ///
    /// Negative or NaN second counts resolve to the epoch. Counts too large to represent resolve to the
    /// [`Expiry::Never`] sentinel.
    #[must_use]
    pub fn resolve(&self) -> SystemTime {
        match *self {
            Self::Never => never(),
            Self::SecondsFrom1970(seconds) => {
                if seconds.is_nan() || seconds <= 0.0 {
                    return SystemTime::UNIX_EPOCH;
                }
                Duration::try_from_secs_f64(seconds)
                    .ok()
                    .and_then(|offset| SystemTime::UNIX_EPOCH.checked_add(offset))
                    .unwrap_or_else(never)
            }
            Self::AbsoluteDate(date) => date,
        }
    }

    /// Returns `true` if the resolved instant lies strictly before `now`.
    #[must_use]
    pub fn is_expired(&self, now: SystemTime) -> bool {
        self.resolve() < now
    }

    /// Returns `true` if the entry would already be expired at `base`.
    ///
    /// This is the comparison used when purging "everything that is stale as of a given date".
    #[must_use]
    pub fn is_expired_relative_to(&self, base: SystemTime) -> bool {
        self.resolve() < base
    }

    /// Returns the equivalent absolute policy.
    ///
    /// Tiers store resolved policies so later reads never re-interpret relative forms.
    #[must_use]
    pub fn to_absolute(&self) -> Self {
        Self::AbsoluteDate(self.resolve())
    }
}

impl From<SystemTime> for Expiry {
    fn from(date: SystemTime) -> Self {
        Self::AbsoluteDate(date)
    }
}

fn never() -> SystemTime {
    SystemTime::UNIX_EPOCH + NEVER_EXPIRES_OFFSET
}
