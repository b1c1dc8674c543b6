// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use serde::{Deserialize, Serialize};

/// Selects which tiers a [`Storehouse`](crate::Storehouse) uses.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CachePolicy {
    /// No tiers: reads miss and mutations have no effect.
    Disabled,
    /// Only the memory tier.
    MemoryOnly,
    /// Only the disk tier.
    DiskOnly,
    /// Memory in front of disk, with promotion on disk hits.
    #[default]
    Hybrid,
}

impl CachePolicy {
    /// Returns `true` if the policy includes the memory tier.
    #[must_use]
    pub fn uses_memory(self) -> bool {
        matches!(self, Self::MemoryOnly | Self::Hybrid)
    }

    /// Returns `true` if the policy includes the disk tier.
    #[must_use]
    pub fn uses_disk(self) -> bool {
        matches!(self, Self::DiskOnly | Self::Hybrid)
    }
}
