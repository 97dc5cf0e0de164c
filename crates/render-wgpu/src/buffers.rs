use sdfray_scene::{GpuRecord, Pool};
use std::marker::PhantomData;
use wgpu::util::DeviceExt;

/// What a mirror has to do to catch up with its pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadAction {
    /// Revision unchanged since the last upload.
    Skip,
    /// Same occupancy: overwrite in place.
    Write,
    /// Occupancy changed: allocate a buffer of the exact new size.
    Recreate,
}

/// Decide how to bring a buffer holding `gpu_len` records at `synced`
/// revision up to date with `pool`.
pub fn plan_upload<T: GpuRecord>(gpu_len: usize, synced: Option<u64>, pool: &Pool<T>) -> UploadAction {
    if synced == Some(pool.revision()) {
        UploadAction::Skip
    } else if pool.gpu_slice().len() != gpu_len {
        UploadAction::Recreate
    } else {
        UploadAction::Write
    }
}

/// Storage buffer mirroring one record pool on the device.
pub struct GpuMirror<T: GpuRecord> {
    buffer: wgpu::Buffer,
    len: usize,
    synced: Option<u64>,
    _record: PhantomData<T>,
}

impl<T: GpuRecord> GpuMirror<T> {
    /// Start out holding the blank sentinel.
    pub fn new(device: &wgpu::Device) -> Self {
        let blank = [T::blank()];
        Self {
            buffer: create_storage(device, T::LABEL, &blank),
            len: 1,
            synced: None,
            _record: PhantomData,
        }
    }

    /// Upload `pool` if it changed since the last sync. Returns the action taken.
    pub fn sync(&mut self, device: &wgpu::Device, queue: &wgpu::Queue, pool: &Pool<T>) -> UploadAction {
        let action = plan_upload(self.len, self.synced, pool);
        match action {
            UploadAction::Skip => {}
            UploadAction::Write => {
                queue.write_buffer(&self.buffer, 0, bytemuck::cast_slice(pool.gpu_slice()));
            }
            UploadAction::Recreate => self.recreate(device, pool.gpu_slice()),
        }
        self.synced = Some(pool.revision());
        action
    }

    /// Unconditionally upload `records`, which must not be empty.
    pub fn write_all(&mut self, device: &wgpu::Device, queue: &wgpu::Queue, records: &[T]) {
        if records.len() == self.len {
            queue.write_buffer(&self.buffer, 0, bytemuck::cast_slice(records));
        } else {
            self.recreate(device, records);
        }
    }

    pub fn buffer(&self) -> &wgpu::Buffer {
        &self.buffer
    }

    /// Records currently held, sentinel included.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    fn recreate(&mut self, device: &wgpu::Device, records: &[T]) {
        tracing::debug!(buffer = T::LABEL, from = self.len, to = records.len(), "resizing storage buffer");
        self.buffer = create_storage(device, T::LABEL, records);
        self.len = records.len();
    }
}

fn create_storage<T: GpuRecord>(device: &wgpu::Device, label: &str, records: &[T]) -> wgpu::Buffer {
    device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
        label: Some(label),
        contents: bytemuck::cast_slice(records),
        usage: wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_DST,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec3;
    use sdfray_scene::SphereRecord;

    fn sphere(x: f32) -> SphereRecord {
        SphereRecord::new(Vec3::new(x, 0.0, 0.0), 1.0)
    }

    #[test]
    fn first_sync_of_empty_pool_writes_sentinel() {
        let pool: Pool<SphereRecord> = Pool::new();
        assert_eq!(plan_upload(1, None, &pool), UploadAction::Write);
    }

    #[test]
    fn unchanged_revision_skips() {
        let mut pool = Pool::new();
        pool.insert(sphere(0.0));
        assert_eq!(plan_upload(1, Some(pool.revision()), &pool), UploadAction::Skip);
    }

    #[test]
    fn occupancy_change_recreates() {
        let mut pool = Pool::new();
        pool.insert(sphere(0.0));
        let synced = Some(pool.revision());
        pool.insert(sphere(1.0));
        assert_eq!(plan_upload(1, synced, &pool), UploadAction::Recreate);
    }

    #[test]
    fn in_place_edit_writes() {
        let mut pool = Pool::new();
        let key = pool.insert(sphere(0.0));
        let synced = Some(pool.revision());
        pool.replace(key, sphere(3.0));
        assert_eq!(plan_upload(1, synced, &pool), UploadAction::Write);
    }

    #[test]
    fn removing_last_record_falls_back_to_sentinel_size() {
        let mut pool = Pool::new();
        let a = pool.insert(sphere(0.0));
        pool.insert(sphere(1.0));
        let synced = Some(pool.revision());
        pool.remove(a);
        assert_eq!(plan_upload(2, synced, &pool), UploadAction::Recreate);
        let b = pool.keys()[0];
        let synced = Some(pool.revision());
        pool.remove(b);
        // One live record and one sentinel occupy the same space.
        assert_eq!(plan_upload(1, synced, &pool), UploadAction::Write);
    }
}
