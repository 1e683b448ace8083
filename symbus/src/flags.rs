//! Role-polarity adapter over the raw flag line ports

use crate::core::Role;
use crate::port::{FlagIn, FlagOut};

// Which wire level conveys "asserted" for each role.
const MASTER_FLAG_ACTIVE_LEVEL: bool = true;
const SLAVE_FLAG_ACTIVE_LEVEL: bool = true;

const fn active_level(role: Role) -> bool {
    match role {
        Role::Master => MASTER_FLAG_ACTIVE_LEVEL,
        Role::Slave => SLAVE_FLAG_ACTIVE_LEVEL,
    }
}

/// Semantic view of the two flag lines: assert/deassert our flag, sample
/// whether the peer flag is asserted. Level writes and reads only, never
/// blocking.
pub(crate) struct Flags<'a> {
    out: &'a (dyn FlagOut + Sync),
    inp: &'a (dyn FlagIn + Sync),
    role: Role,
}

impl<'a> Flags<'a> {
    pub fn new(out: &'a (dyn FlagOut + Sync), inp: &'a (dyn FlagIn + Sync), role: Role) -> Self {
        Self { out, inp, role }
    }

    pub fn assert_our(&self) {
        trace!("our flag set");
        self.out.set_level(active_level(self.role));
    }

    pub fn deassert_our(&self) {
        trace!("our flag drop");
        self.out.set_level(!active_level(self.role));
    }

    /// Whether the peer flag currently reads as asserted.
    ///
    /// The peer polarity is that of the opposite role.
    pub fn peer_asserted(&self) -> bool {
        let peer_active = match self.role {
            Role::Master => active_level(Role::Slave),
            Role::Slave => active_level(Role::Master),
        };
        self.inp.level() == peer_active
    }
}
