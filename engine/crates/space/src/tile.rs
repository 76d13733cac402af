use serde::{Deserialize, Serialize};

/// Largest coordinate representable in a packed tile hash (14 bits per axis).
pub const MAX_COORD: u16 = (1 << 14) - 1;
/// Number of height planes (2 bits).
pub const HEIGHT_LEVELS: u8 = 4;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TileError {
    #[error("tile ({x}, {z}, {height}) is out of bounds")]
    OutOfBounds { x: u16, z: u16, height: u8 },
}

/// A position in the world grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Tile {
    x: u16,
    z: u16,
    height: u8,
}

impl Tile {
    pub fn new(x: u16, z: u16, height: u8) -> Result<Self, TileError> {
        if x > MAX_COORD || z > MAX_COORD || height >= HEIGHT_LEVELS {
            return Err(TileError::OutOfBounds { x, z, height });
        }
        Ok(Self { x, z, height })
    }

    pub fn x(&self) -> u16 {
        self.x
    }

    pub fn z(&self) -> u16 {
        self.z
    }

    pub fn height(&self) -> u8 {
        self.height
    }

    /// Full position packed as `height << 28 | x << 14 | z`.
    pub fn as_tile_hash(&self) -> u32 {
        (self.height as u32) << 28 | (self.x as u32) << 14 | self.z as u32
    }

    pub fn from_tile_hash(hash: u32) -> Self {
        Self {
            x: ((hash >> 14) & MAX_COORD as u32) as u16,
            z: (hash & MAX_COORD as u32) as u16,
            height: ((hash >> 28) & 0x3) as u8,
        }
    }

    /// Coarse position: height plane plus the 8192-tile quadrant on each axis.
    ///
    /// Two tiles share a multiplier as long as neither crosses a quadrant
    /// boundary or changes plane, which lets clients skip full position
    /// updates for far-away players.
    pub fn as_tile_hash_multiplier(&self) -> u32 {
        (self.height as u32) << 16 | ((self.x >> 13) as u32) << 8 | (self.z >> 13) as u32
    }

    /// 8x8 chunk coordinates.
    pub fn chunk_x(&self) -> u16 {
        self.x >> 3
    }

    pub fn chunk_z(&self) -> u16 {
        self.z >> 3
    }

    /// Id of the 64x64 map region containing this tile.
    pub fn region_id(&self) -> u16 {
        (self.x >> 6) << 8 | (self.z >> 6)
    }

    /// Map regions a client needs loaded when standing on this tile: every
    /// region touched by the 13x13 chunk area centred on the tile's chunk.
    pub fn surrounding_regions(&self) -> Vec<u16> {
        let lx = self.chunk_x().saturating_sub(6) / 8;
        let hx = (self.chunk_x() + 6) / 8;
        let lz = self.chunk_z().saturating_sub(6) / 8;
        let hz = (self.chunk_z() + 6) / 8;
        let mut regions = Vec::with_capacity(((hx - lx + 1) * (hz - lz + 1)) as usize);
        for rx in lx..=hx {
            for rz in lz..=hz {
                regions.push(rx << 8 | rz);
            }
        }
        regions
    }

    /// Same plane and within `distance` tiles on both axes.
    pub fn is_within(&self, other: &Tile, distance: u16) -> bool {
        self.height == other.height
            && self.x.abs_diff(other.x) <= distance
            && self.z.abs_diff(other.z) <= distance
    }
}

impl std::fmt::Display for Tile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {}, {})", self.x, self.z, self.height)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_out_of_range_coordinates() {
        assert!(Tile::new(MAX_COORD + 1, 0, 0).is_err());
        assert!(Tile::new(0, 0, 4).is_err());
        assert!(Tile::new(MAX_COORD, MAX_COORD, 3).is_ok());
    }

    #[test]
    fn tile_hash_packs_all_fields() {
        let tile = Tile::new(3222, 3218, 1).unwrap();
        let hash = tile.as_tile_hash();
        assert_eq!(hash >> 28, 1);
        assert_eq!((hash >> 14) & 0x3FFF, 3222);
        assert_eq!(hash & 0x3FFF, 3218);
        assert_eq!(Tile::from_tile_hash(hash), tile);
    }

    #[test]
    fn multiplier_is_coarse() {
        let a = Tile::new(3222, 3218, 0).unwrap();
        let b = Tile::new(3300, 3100, 0).unwrap();
        assert_eq!(a.as_tile_hash_multiplier(), b.as_tile_hash_multiplier());
        assert_eq!(a.as_tile_hash_multiplier(), 0);

        let far = Tile::new(8192, 9000, 2).unwrap();
        assert_eq!(far.as_tile_hash_multiplier(), 2 << 16 | 1 << 8 | 1);
    }

    #[test]
    fn distance_check_respects_plane() {
        let a = Tile::new(100, 100, 0).unwrap();
        assert!(a.is_within(&Tile::new(115, 85, 0).unwrap(), 15));
        assert!(!a.is_within(&Tile::new(116, 100, 0).unwrap(), 15));
        assert!(!a.is_within(&Tile::new(100, 100, 1).unwrap(), 15));
    }

    #[test]
    fn surrounding_regions_of_lumbridge() {
        let tile = Tile::new(3222, 3218, 0).unwrap();
        assert_eq!(tile.region_id(), 50 << 8 | 50);
        let regions = tile.surrounding_regions();
        assert!(regions.contains(&tile.region_id()));
        // Chunks 396..=408 on each axis span regions 49..=51.
        assert_eq!(regions.len(), 9);
        assert_eq!(regions[0], 49 << 8 | 49);
    }

    #[test]
    fn surrounding_regions_near_origin_do_not_underflow() {
        let tile = Tile::new(0, 0, 0).unwrap();
        assert_eq!(tile.surrounding_regions(), vec![0]);
    }
}
