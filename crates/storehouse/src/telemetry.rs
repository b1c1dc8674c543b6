// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Structured events for store operations.
//!
//! Every event carries the store name, the operation and what happened, at a level chosen by the
//! activity: routine outcomes at debug, tier movement at info and failures at warn or error.

use tracing::Level;

#[cfg(test)]
pub(crate) mod testing;

#[cfg(test)]
pub(crate) const STOREHOUSE_NAME: &str = "storehouse.name";
#[cfg(test)]
pub(crate) const STOREHOUSE_OPERATION: &str = "storehouse.operation";
#[cfg(test)]
pub(crate) const STOREHOUSE_ACTIVITY: &str = "storehouse.activity";
#[cfg(test)]
pub(crate) const STOREHOUSE_EVENT: &str = "storehouse.event";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum StoreOperation {
    Get,
    Set,
    Remove,
    RemoveAll,
    RemoveExpired,
    RemoveStoredSince,
    RemoveIfExpired,
    Reconfigure,
}

impl StoreOperation {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Get => "storehouse.get",
            Self::Set => "storehouse.set",
            Self::Remove => "storehouse.remove",
            Self::RemoveAll => "storehouse.remove_all",
            Self::RemoveExpired => "storehouse.remove_expired",
            Self::RemoveStoredSince => "storehouse.remove_stored_since",
            Self::RemoveIfExpired => "storehouse.remove_if_expired",
            Self::Reconfigure => "storehouse.reconfigure",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum StoreActivity {
    /// Served by the memory tier.
    MemoryHit,
    /// Served by the disk tier.
    DiskHit,
    Miss,
    Promoted,
    PromotionFailed,
    Replaced,
    Ok,
    Error,
}

impl StoreActivity {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::MemoryHit => "storehouse.memory_hit",
            Self::DiskHit => "storehouse.disk_hit",
            Self::Miss => "storehouse.miss",
            Self::Promoted => "storehouse.promoted",
            Self::PromotionFailed => "storehouse.promotion_failed",
            Self::Replaced => "storehouse.replaced",
            Self::Ok => "storehouse.ok",
            Self::Error => "storehouse.error",
        }
    }

    pub fn level(self) -> Level {
        match self {
            Self::MemoryHit | Self::DiskHit | Self::Miss | Self::Ok => Level::DEBUG,
            Self::Promoted | Self::Replaced => Level::INFO,
            Self::PromotionFailed => Level::WARN,
            Self::Error => Level::ERROR,
        }
    }
}

pub(crate) fn emit(name: &str, operation: StoreOperation, activity: StoreActivity) {
    let op = operation.as_str();
    let act = activity.as_str();

    // Tracing levels must be constant, so the level is selected by the macro invocation.
    macro_rules! emit_event {
        ($level:ident) => {
            tracing::$level!(
                storehouse.name = name,
                storehouse.operation = op,
                storehouse.activity = act,
                "storehouse.event"
            )
        };
    }

    match activity.level() {
        Level::ERROR => emit_event!(error),
        Level::WARN => emit_event!(warn),
        Level::INFO => emit_event!(info),
        _ => emit_event!(debug),
    }
}
