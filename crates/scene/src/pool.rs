use crate::records::{GpuRecord, MaterialSlot};
use slotmap::SlotMap;

slotmap::new_key_type! {
    /// Generation-checked key into a [`Pool`]. Stays valid across sibling
    /// removal and is rejected once its own record is removed.
    pub struct SlotKey;
}

/// Ordered record storage paired with the contiguous slice the GPU sees.
///
/// Records are kept in insertion order, which is also buffer order. Keys map
/// to the current position of their record; removal shifts later records left
/// by one and re-points their keys so every key keeps addressing its own record.
///
/// Every mutation bumps [`revision`](Self::revision). Consumers re-upload the
/// whole [`gpu_slice`](Self::gpu_slice) when it changes.
#[derive(Debug, Clone)]
pub struct Pool<T: GpuRecord> {
    records: Vec<T>,
    keys: Vec<SlotKey>,
    positions: SlotMap<SlotKey, usize>,
    blank: [T; 1],
    revision: u64,
}

impl<T: GpuRecord> Default for Pool<T> {
    fn default() -> Self {
        Self {
            records: Vec::new(),
            keys: Vec::new(),
            positions: SlotMap::with_key(),
            blank: [T::blank()],
            revision: 0,
        }
    }
}

impl<T: GpuRecord> Pool<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a record at the end of the buffer.
    pub fn insert(&mut self, record: T) -> SlotKey {
        let key = self.positions.insert(self.records.len());
        self.records.push(record);
        self.keys.push(key);
        self.mark_rebuilt();
        key
    }

    /// Overwrite the record behind `key` in place. Returns the previous record.
    pub fn replace(&mut self, key: SlotKey, record: T) -> Option<T> {
        let pos = *self.positions.get(key)?;
        let old = std::mem::replace(&mut self.records[pos], record);
        self.revision += 1;
        Some(old)
    }

    /// Remove the record behind `key`, compacting later records toward the front.
    pub fn remove(&mut self, key: SlotKey) -> Option<T> {
        let pos = self.positions.remove(key)?;
        let record = self.records.remove(pos);
        self.keys.remove(pos);
        for later in &self.keys[pos..] {
            if let Some(p) = self.positions.get_mut(*later) {
                *p -= 1;
            }
        }
        self.mark_rebuilt();
        Some(record)
    }

    pub fn contains(&self, key: SlotKey) -> bool {
        self.positions.contains_key(key)
    }

    /// Current buffer index of the record behind `key`.
    pub fn position(&self, key: SlotKey) -> Option<usize> {
        self.positions.get(key).copied()
    }

    pub fn get(&self, key: SlotKey) -> Option<&T> {
        self.position(key).map(|pos| &self.records[pos])
    }

    /// First key whose record is bit-identical to `record`.
    pub fn find(&self, record: &T) -> Option<SlotKey> {
        let needle = bytemuck::bytes_of(record);
        self.records
            .iter()
            .position(|r| bytemuck::bytes_of(r) == needle)
            .map(|pos| self.keys[pos])
    }

    /// Number of live records. Shader loops are bounded by this, not by the
    /// length of [`gpu_slice`](Self::gpu_slice).
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Live records in buffer order.
    pub fn records(&self) -> &[T] {
        &self.records
    }

    /// Live keys in buffer order.
    pub fn keys(&self) -> &[SlotKey] {
        &self.keys
    }

    pub fn iter(&self) -> impl Iterator<Item = (SlotKey, &T)> {
        self.keys.iter().copied().zip(self.records.iter())
    }

    /// The slice to bind on the GPU. Never empty: an empty pool yields a single
    /// blank record, since compute bindings cannot be zero-sized.
    pub fn gpu_slice(&self) -> &[T] {
        if self.records.is_empty() {
            &self.blank
        } else {
            &self.records
        }
    }

    /// Monotonic counter bumped by every mutation.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    fn mark_rebuilt(&mut self) {
        self.revision += 1;
        tracing::trace!(
            buffer = T::LABEL,
            count = self.records.len(),
            revision = self.revision,
            "pool buffer rebuilt"
        );
    }
}

impl<T: GpuRecord + MaterialSlot> Pool<T> {
    /// Overwrite the record behind `key`. The stored material index is kept
    /// unless `material_index` overrides it.
    pub fn update(&mut self, key: SlotKey, mut record: T, material_index: Option<u32>) -> bool {
        let Some(&pos) = self.positions.get(key) else {
            return false;
        };
        let index = material_index.unwrap_or_else(|| self.records[pos].material_index());
        record.set_material_index(index);
        self.records[pos] = record;
        self.revision += 1;
        true
    }

    pub fn set_material_index(&mut self, key: SlotKey, index: u32) -> bool {
        let Some(&pos) = self.positions.get(key) else {
            return false;
        };
        self.records[pos].set_material_index(index);
        self.revision += 1;
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::records::{LightRecord, SphereRecord};
    use glam::Vec3;
    use sdfray_common::Color;

    fn sphere(x: f32) -> SphereRecord {
        SphereRecord::new(Vec3::new(x, 0.0, 0.0), 1.0)
    }

    fn assert_positions_track_records<T: GpuRecord>(pool: &Pool<T>) {
        for (i, key) in pool.keys().iter().enumerate() {
            assert_eq!(pool.position(*key), Some(i));
        }
    }

    #[test]
    fn insert_appends_in_order() {
        let mut pool = Pool::new();
        let a = pool.insert(sphere(0.0));
        let b = pool.insert(sphere(1.0));
        assert_eq!(pool.position(a), Some(0));
        assert_eq!(pool.position(b), Some(1));
        assert_eq!(pool.len(), 2);
        assert_eq!(pool.gpu_slice(), &[sphere(0.0), sphere(1.0)]);
    }

    #[test]
    fn remove_compacts_and_repoints_later_keys() {
        let mut pool = Pool::new();
        let keys: Vec<_> = (0..5).map(|i| pool.insert(sphere(i as f32))).collect();

        assert_eq!(pool.remove(keys[1]), Some(sphere(1.0)));
        assert_eq!(pool.position(keys[0]), Some(0));
        assert_eq!(pool.position(keys[2]), Some(1));
        assert_eq!(pool.position(keys[4]), Some(3));
        assert_eq!(pool.get(keys[3]), Some(&sphere(3.0)));
        assert_positions_track_records(&pool);
    }

    #[test]
    fn removed_key_is_stale() {
        let mut pool = Pool::new();
        let a = pool.insert(sphere(0.0));
        pool.remove(a);
        assert!(!pool.contains(a));
        assert_eq!(pool.get(a), None);
        assert_eq!(pool.remove(a), None);

        // Slot reuse must not resurrect the old key.
        let b = pool.insert(sphere(9.0));
        assert_ne!(a, b);
        assert_eq!(pool.get(a), None);
        assert_eq!(pool.get(b), Some(&sphere(9.0)));
    }

    #[test]
    fn empty_pool_binds_single_blank() {
        let mut pool: Pool<SphereRecord> = Pool::new();
        assert_eq!(pool.gpu_slice().len(), 1);

        let a = pool.insert(sphere(3.0));
        pool.remove(a);
        assert_eq!(pool.len(), 0);
        assert_eq!(pool.gpu_slice(), &[SphereRecord::blank()]);
    }

    #[test]
    fn update_keeps_material_unless_overridden() {
        let mut pool = Pool::new();
        let mut rec = sphere(0.0);
        rec.material_index = 4;
        let key = pool.insert(rec);

        assert!(pool.update(key, sphere(2.0), None));
        assert_eq!(pool.get(key).map(|r| r.material_index), Some(4));
        assert_eq!(pool.get(key).map(|r| r.position), Some([2.0, 0.0, 0.0]));

        assert!(pool.update(key, sphere(2.0), Some(1)));
        assert_eq!(pool.get(key).map(|r| r.material_index), Some(1));
    }

    #[test]
    fn every_mutation_bumps_revision() {
        let mut pool = Pool::new();
        let r0 = pool.revision();
        let key = pool.insert(LightRecord::point(Vec3::ONE, Color::WHITE, 1.0));
        let r1 = pool.revision();
        pool.replace(key, LightRecord::point(Vec3::ZERO, Color::WHITE, 1.0));
        let r2 = pool.revision();
        pool.remove(key);
        let r3 = pool.revision();
        assert!(r0 < r1 && r1 < r2 && r2 < r3);
    }

    #[test]
    fn find_matches_bitwise() {
        let mut pool = Pool::new();
        pool.insert(sphere(0.0));
        let b = pool.insert(sphere(1.0));
        assert_eq!(pool.find(&sphere(1.0)), Some(b));
        assert_eq!(pool.find(&sphere(5.0)), None);
    }
}
