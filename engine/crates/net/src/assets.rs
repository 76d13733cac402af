use std::collections::HashMap;

use bytes::Bytes;

/// Source of stored cache containers served over JS5.
pub trait AssetStore: Send + Sync {
    fn container(&self, index: u8, archive: u16) -> Option<Bytes>;
}

#[derive(Debug, Default, Clone)]
pub struct MemoryAssetStore {
    containers: HashMap<(u8, u16), Bytes>,
}

impl MemoryAssetStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, index: u8, archive: u16, container: impl Into<Bytes>) {
        self.containers.insert((index, archive), container.into());
    }

    pub fn len(&self) -> usize {
        self.containers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.containers.is_empty()
    }
}

impl AssetStore for MemoryAssetStore {
    fn container(&self, index: u8, archive: u16) -> Option<Bytes> {
        self.containers.get(&(index, archive)).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup() {
        let mut store = MemoryAssetStore::new();
        store.insert(2, 10, vec![0, 0, 0, 0, 1, 9]);
        assert_eq!(store.len(), 1);
        assert_eq!(store.container(2, 10).unwrap().len(), 6);
        assert!(store.container(2, 11).is_none());
    }
}
