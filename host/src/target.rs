//! Periodic advertiser identity.
use bt_hci::param::{AddrKind, BdAddr};

/// Highest valid advertising set identifier.
pub const MAX_SID: u8 = 0x0f;

/// The advertiser a sync session is created against.
///
/// Notifications from the host are matched against this value by address kind
/// and address bytes. The advertising set identifier only takes part in the
/// comparison when one is set.
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SyncTarget {
    /// Address kind of the advertiser.
    pub kind: AddrKind,
    /// Advertiser address.
    pub addr: BdAddr,
    /// Advertising set to sync with, or any set if `None`.
    pub sid: Option<u8>,
}

impl SyncTarget {
    /// Create a target matching any advertising set of the given advertiser.
    pub const fn new(kind: AddrKind, addr: BdAddr) -> Self {
        Self { kind, addr, sid: None }
    }

    /// Restrict the target to a single advertising set.
    pub const fn with_sid(self, sid: u8) -> Self {
        Self {
            kind: self.kind,
            addr: self.addr,
            sid: Some(sid),
        }
    }

    /// Check if a notification for the given advertiser refers to this target.
    pub fn matches(&self, kind: AddrKind, addr: &BdAddr, sid: u8) -> bool {
        self.kind == kind && self.addr.raw() == addr.raw() && self.sid.map(|s| s == sid).unwrap_or(true)
    }

    pub(crate) fn is_valid(&self) -> bool {
        self.sid.map(|s| s <= MAX_SID).unwrap_or(true)
    }
}
