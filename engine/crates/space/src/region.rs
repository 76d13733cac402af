use std::collections::HashMap;

/// Map decryption keys for one region.
pub type RegionKeys = [i32; 4];

/// Source of per-region map keys sent alongside a region load.
pub trait RegionKeyStore: Send + Sync {
    fn keys(&self, region_id: u16) -> RegionKeys;
}

/// Every region is unencrypted.
#[derive(Debug, Default, Clone, Copy)]
pub struct ZeroRegionKeys;

impl RegionKeyStore for ZeroRegionKeys {
    fn keys(&self, _region_id: u16) -> RegionKeys {
        [0; 4]
    }
}

/// Fixed key table; unknown regions fall back to zero keys.
#[derive(Debug, Default, Clone)]
pub struct StaticRegionKeys {
    keys: HashMap<u16, RegionKeys>,
}

impl StaticRegionKeys {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, region_id: u16, keys: RegionKeys) {
        self.keys.insert(region_id, keys);
    }
}

impl RegionKeyStore for StaticRegionKeys {
    fn keys(&self, region_id: u16) -> RegionKeys {
        match self.keys.get(&region_id) {
            Some(keys) => *keys,
            None => {
                tracing::trace!(region_id, "no map keys registered, using zero keys");
                [0; 4]
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn static_keys_fall_back_to_zero() {
        let mut store = StaticRegionKeys::new();
        store.insert(12850, [1, 2, 3, 4]);
        assert_eq!(store.keys(12850), [1, 2, 3, 4]);
        assert_eq!(store.keys(1), [0; 4]);
        assert_eq!(ZeroRegionKeys.keys(12850), [0; 4]);
    }
}
