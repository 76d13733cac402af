use protocol::PlayerInfo;
use slots::PlayerIndex;

/// What changed in one observer's view during a pulse.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GpiUpdate {
    pub removed: Vec<PlayerIndex>,
    pub added: Vec<(PlayerIndex, u32)>,
    pub moved: Vec<(PlayerIndex, u32)>,
    pub region: Vec<(PlayerIndex, u32)>,
}

impl GpiUpdate {
    pub fn is_empty(&self) -> bool {
        self.removed.is_empty()
            && self.added.is_empty()
            && self.moved.is_empty()
            && self.region.is_empty()
    }

    pub fn to_message(&self) -> PlayerInfo {
        fn raw(list: &[(PlayerIndex, u32)]) -> Vec<(u16, u32)> {
            list.iter().map(|(idx, v)| (idx.get(), *v)).collect()
        }
        PlayerInfo {
            removed: self.removed.iter().map(|idx| idx.get()).collect(),
            added: raw(&self.added),
            moved: raw(&self.moved),
            region: raw(&self.region),
        }
    }
}
