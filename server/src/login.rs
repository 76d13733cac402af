//! Decides whether the world takes a player whose credentials already passed.

use accounts::Profile;
use protocol::LoginStatus;

use crate::world::World;

/// Checks run in order: duplicate login, ban, capacity.
pub fn admit(profile: &Profile, world: &World) -> Result<(), LoginStatus> {
    if world.is_online(&profile.username) {
        return Err(LoginStatus::AlreadyOnline);
    }
    if profile.banned {
        return Err(LoginStatus::Banned);
    }
    if world.is_full() {
        return Err(LoginStatus::WorldFull);
    }
    Ok(())
}
