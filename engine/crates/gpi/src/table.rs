use protocol::RegionLoad;
use slots::{PlayerIndex, MAX_PLAYERS};
use space::{RegionKeyStore, Tile};

use crate::update::GpiUpdate;

/// Most players a client will render at once.
pub const MAX_LOCAL_PLAYERS: usize = 255;

/// Read access to the positions of connected players.
///
/// Implementations must return a consistent answer for the whole pulse, so
/// no observer sees a half-registered player.
pub trait TileView {
    fn tile(&self, index: PlayerIndex) -> Option<Tile>;
}

/// One player's view of every other slot.
///
/// Each valid slot other than the owner's sits in exactly one of the local
/// and external sets. Unoccupied slots count as external.
#[derive(Debug, Clone)]
pub struct GpiTable {
    owner: Option<PlayerIndex>,
    // Tile hash last reported for each local slot; `None` means external.
    local: Vec<Option<u32>>,
    local_indexes: Vec<PlayerIndex>,
    external_indexes: Vec<PlayerIndex>,
    tile_hash_multipliers: Vec<u32>,
    pending_removed: Vec<PlayerIndex>,
    pending_region: Vec<(PlayerIndex, u32)>,
}

impl Default for GpiTable {
    fn default() -> Self {
        Self::new()
    }
}

impl GpiTable {
    pub fn new() -> Self {
        Self {
            owner: None,
            local: vec![None; MAX_PLAYERS],
            local_indexes: Vec::with_capacity(MAX_LOCAL_PLAYERS),
            external_indexes: Vec::with_capacity(MAX_PLAYERS),
            tile_hash_multipliers: vec![0; MAX_PLAYERS],
            pending_removed: Vec::new(),
            pending_region: Vec::new(),
        }
    }

    /// First-tick setup: the owner becomes local, every other slot external
    /// with the coarse position of whoever occupies it.
    pub fn login(&mut self, owner: PlayerIndex, view: &impl TileView) {
        self.owner = Some(owner);
        self.local.fill(None);
        self.tile_hash_multipliers.fill(0);
        self.pending_removed.clear();
        self.pending_region.clear();

        self.local[owner.as_usize()] = Some(view.tile(owner).map_or(0, |t| t.as_tile_hash()));
        for index in PlayerIndex::all().filter(|&i| i != owner) {
            if let Some(tile) = view.tile(index) {
                self.tile_hash_multipliers[index.as_usize()] = tile.as_tile_hash_multiplier();
            }
        }
        self.rebuild_indexes();
        tracing::debug!(
            owner = %owner,
            local = self.local_count(),
            external = self.external_count(),
            "gpi initialised"
        );
    }

    /// Baseline packet the client diffs later updates against.
    pub fn region_load(&self, tile: Tile, keys: &dyn RegionKeyStore) -> RegionLoad {
        let regions = tile
            .surrounding_regions()
            .into_iter()
            .map(|region| (region, keys.keys(region)))
            .collect();
        RegionLoad {
            index: self.owner.map_or(0, PlayerIndex::get),
            tile_hash: tile.as_tile_hash(),
            tile_hash_multipliers: self.tile_hash_multipliers.clone(),
            chunk_x: tile.chunk_x(),
            chunk_z: tile.chunk_z(),
            regions,
        }
    }

    /// Recomputes local membership and coarse positions for one pulse.
    pub fn synchronize(&mut self, view: &impl TileView, view_distance: u16) -> GpiUpdate {
        let mut update = GpiUpdate {
            removed: std::mem::take(&mut self.pending_removed),
            region: std::mem::take(&mut self.pending_region),
            ..GpiUpdate::default()
        };
        let Some(owner) = self.owner else {
            return update;
        };
        let Some(origin) = view.tile(owner) else {
            tracing::warn!(owner = %owner, "gpi owner missing from view");
            return update;
        };

        // Locals: report movement, drop anyone gone or out of range.
        for index in std::mem::take(&mut self.local_indexes) {
            let slot = index.as_usize();
            match view.tile(index) {
                Some(tile) if index == owner || tile.is_within(&origin, view_distance) => {
                    let hash = tile.as_tile_hash();
                    if self.local[slot] != Some(hash) {
                        self.local[slot] = Some(hash);
                        update.moved.push((index, hash));
                    }
                }
                _ => {
                    self.local[slot] = None;
                    update.removed.push(index);
                }
            }
        }

        let mut local_count = self.local.iter().filter(|l| l.is_some()).count();
        for index in PlayerIndex::all() {
            let slot = index.as_usize();
            if index == owner {
                continue;
            }
            let tile = view.tile(index);

            if self.local[slot].is_none() && local_count < MAX_LOCAL_PLAYERS {
                if let Some(tile) = tile.filter(|t| t.is_within(&origin, view_distance)) {
                    let hash = tile.as_tile_hash();
                    self.local[slot] = Some(hash);
                    update.added.push((index, hash));
                    local_count += 1;
                }
            }

            let multiplier = tile.map_or(0, |t| t.as_tile_hash_multiplier());
            if self.tile_hash_multipliers[slot] != multiplier {
                self.tile_hash_multipliers[slot] = multiplier;
                if self.local[slot].is_none() {
                    update.region.push((index, multiplier));
                }
            }
        }

        self.rebuild_indexes();
        update
    }

    /// Forgets a slot whose occupant left. Called before the slot is reused.
    pub fn evict(&mut self, index: PlayerIndex) {
        if Some(index) == self.owner {
            return;
        }
        let slot = index.as_usize();
        if self.local[slot].take().is_some() {
            self.pending_removed.push(index);
            self.local_indexes.retain(|&i| i != index);
            self.external_indexes.push(index);
            self.external_indexes.sort_unstable();
        }
        if self.tile_hash_multipliers[slot] != 0 {
            self.tile_hash_multipliers[slot] = 0;
            self.pending_region.push((index, 0));
        }
    }

    fn rebuild_indexes(&mut self) {
        self.local_indexes.clear();
        self.external_indexes.clear();
        for index in PlayerIndex::all() {
            if self.local[index.as_usize()].is_some() {
                self.local_indexes.push(index);
            } else {
                self.external_indexes.push(index);
            }
        }
    }

    pub fn owner(&self) -> Option<PlayerIndex> {
        self.owner
    }

    pub fn local_count(&self) -> usize {
        self.local_indexes.len()
    }

    pub fn external_count(&self) -> usize {
        self.external_indexes.len()
    }

    pub fn local_indexes(&self) -> &[PlayerIndex] {
        &self.local_indexes
    }

    pub fn external_indexes(&self) -> &[PlayerIndex] {
        &self.external_indexes
    }

    pub fn is_local(&self, index: PlayerIndex) -> bool {
        self.local[index.as_usize()].is_some()
    }

    pub fn tile_hash_multiplier(&self, index: PlayerIndex) -> u32 {
        self.tile_hash_multipliers[index.as_usize()]
    }

    pub fn tile_hash_multipliers(&self) -> &[u32] {
        &self.tile_hash_multipliers
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[derive(Default)]
    struct Map(HashMap<PlayerIndex, Tile>);

    impl Map {
        fn put(&mut self, raw: u16, x: u16, z: u16) {
            self.0.insert(idx(raw), Tile::new(x, z, 0).unwrap());
        }
    }

    impl TileView for Map {
        fn tile(&self, index: PlayerIndex) -> Option<Tile> {
            self.0.get(&index).copied()
        }
    }

    fn idx(raw: u16) -> PlayerIndex {
        PlayerIndex::new(raw).unwrap()
    }

    fn assert_partitioned(table: &GpiTable) {
        for index in PlayerIndex::all() {
            let local = table.local_indexes().contains(&index);
            let external = table.external_indexes().contains(&index);
            assert!(local ^ external, "{index} local={local} external={external}");
        }
        assert_eq!(table.local_count() + table.external_count(), MAX_PLAYERS - 1);
    }

    #[test]
    fn login_among_three_players() {
        let mut map = Map::default();
        map.put(1, 8200, 3200);
        map.put(2, 3210, 8300);
        map.put(9, 9000, 9000);
        map.put(5, 3222, 3218);

        let mut table = GpiTable::new();
        table.login(idx(5), &map);

        assert_eq!(table.local_count(), 1);
        assert_eq!(table.external_count(), 2046);
        assert_eq!(table.local_indexes(), &[idx(5)]);
        assert_ne!(table.tile_hash_multiplier(idx(9)), 0);
        for raw in 0..MAX_PLAYERS as u16 {
            let expected = match raw {
                1 | 2 | 9 => map.0[&idx(raw)].as_tile_hash_multiplier(),
                _ => 0,
            };
            assert_eq!(table.tile_hash_multipliers()[raw as usize], expected, "slot {raw}");
        }
        assert_partitioned(&table);
    }

    #[test]
    fn region_load_snapshot() {
        let mut map = Map::default();
        map.put(5, 3222, 3218);
        map.put(9, 9000, 1000);
        let mut table = GpiTable::new();
        table.login(idx(5), &map);

        let tile = map.0[&idx(5)];
        let load = table.region_load(tile, &space::ZeroRegionKeys);
        assert_eq!(load.index, 5);
        assert_eq!(load.tile_hash, tile.as_tile_hash());
        assert_eq!(load.tile_hash_multipliers.len(), MAX_PLAYERS);
        assert_eq!(load.tile_hash_multipliers[9], map.0[&idx(9)].as_tile_hash_multiplier());
        assert_eq!(load.regions.len(), tile.surrounding_regions().len());
    }

    #[test]
    fn nearby_players_become_local() {
        let mut map = Map::default();
        map.put(5, 3200, 3200);
        map.put(1, 3205, 3200);
        map.put(2, 3300, 3300);
        let mut table = GpiTable::new();
        table.login(idx(5), &map);

        let update = table.synchronize(&map, 15);
        assert_eq!(update.added, vec![(idx(1), map.0[&idx(1)].as_tile_hash())]);
        assert!(update.removed.is_empty());
        assert!(table.is_local(idx(1)));
        assert!(!table.is_local(idx(2)));
        assert_partitioned(&table);

        // Nothing moved, nothing to say.
        assert!(table.synchronize(&map, 15).is_empty());
    }

    #[test]
    fn movement_and_demotion() {
        let mut map = Map::default();
        map.put(5, 3200, 3200);
        map.put(1, 3205, 3200);
        let mut table = GpiTable::new();
        table.login(idx(5), &map);
        table.synchronize(&map, 15);

        map.put(1, 3206, 3200);
        let update = table.synchronize(&map, 15);
        assert_eq!(update.moved, vec![(idx(1), map.0[&idx(1)].as_tile_hash())]);

        map.put(1, 3300, 3200);
        let update = table.synchronize(&map, 15);
        assert_eq!(update.removed, vec![idx(1)]);
        assert!(!table.is_local(idx(1)));
        assert_partitioned(&table);
    }

    #[test]
    fn external_multiplier_changes_are_reported() {
        let mut map = Map::default();
        map.put(5, 3200, 3200);
        let mut table = GpiTable::new();
        table.login(idx(5), &map);

        map.put(40, 9000, 9000);
        let update = table.synchronize(&map, 15);
        let expected = map.0[&idx(40)].as_tile_hash_multiplier();
        assert_eq!(update.region, vec![(idx(40), expected)]);
        assert_eq!(table.tile_hash_multiplier(idx(40)), expected);
    }

    #[test]
    fn local_set_is_capped() {
        let mut map = Map::default();
        map.put(1, 3200, 3200);
        for raw in 2..=400 {
            map.put(raw, 3200 + raw % 10, 3200);
        }
        let mut table = GpiTable::new();
        table.login(idx(1), &map);
        let update = table.synchronize(&map, 15);

        assert_eq!(table.local_count(), MAX_LOCAL_PLAYERS);
        assert_eq!(update.added.len(), MAX_LOCAL_PLAYERS - 1);
        assert_partitioned(&table);
    }

    #[test]
    fn evict_reports_removal_next_pulse() {
        let mut map = Map::default();
        map.put(5, 3200, 3200);
        map.put(1, 3201, 3200);
        let mut table = GpiTable::new();
        table.login(idx(5), &map);
        table.synchronize(&map, 15);
        assert!(table.is_local(idx(1)));

        map.0.remove(&idx(1));
        table.evict(idx(1));
        assert!(!table.is_local(idx(1)));
        assert_eq!(table.tile_hash_multiplier(idx(1)), 0);
        assert_partitioned(&table);

        let update = table.synchronize(&map, 15);
        assert_eq!(update.removed, vec![idx(1)]);
        assert!(update.added.is_empty());
    }

    #[test]
    fn evicting_an_external_zeroes_its_multiplier() {
        let mut map = Map::default();
        map.put(5, 3200, 3200);
        map.put(9, 9000, 1000);
        let mut table = GpiTable::new();
        table.login(idx(5), &map);

        map.0.remove(&idx(9));
        table.evict(idx(9));
        let update = table.synchronize(&map, 15);
        assert_eq!(update.region, vec![(idx(9), 0)]);
    }

    #[test]
    fn message_uses_raw_indexes() {
        let update = GpiUpdate {
            removed: vec![idx(3)],
            added: vec![(idx(4), 77)],
            ..GpiUpdate::default()
        };
        let info = update.to_message();
        assert_eq!(info.removed, vec![3]);
        assert_eq!(info.added, vec![(4, 77)]);
        assert!(info.moved.is_empty());
    }
}
