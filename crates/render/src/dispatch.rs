/// Threads per workgroup, as declared by the compute kernel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct WorkgroupSize {
    pub x: u32,
    pub y: u32,
    pub z: u32,
}

impl WorkgroupSize {
    pub const fn new(x: u32, y: u32, z: u32) -> Self {
        Self { x, y, z }
    }
}

impl Default for WorkgroupSize {
    fn default() -> Self {
        Self::new(8, 8, 1)
    }
}

impl From<[u32; 3]> for WorkgroupSize {
    fn from([x, y, z]: [u32; 3]) -> Self {
        Self { x, y, z }
    }
}

/// Number of workgroups to launch along each axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DispatchSize {
    pub x: u32,
    pub y: u32,
    pub z: u32,
}

impl DispatchSize {
    pub fn to_array(self) -> [u32; 3] {
        [self.x, self.y, self.z]
    }

    pub fn invocations(self, group: WorkgroupSize) -> u64 {
        u64::from(self.x) * u64::from(group.x)
            * (u64::from(self.y) * u64::from(group.y))
            * (u64::from(self.z) * u64::from(group.z))
    }
}

/// Groups needed to cover a `width` x `height` target, rounding up so edge
/// pixels are always covered. Z is always 1.
pub fn dispatch_size(width: u32, height: u32, group: WorkgroupSize) -> DispatchSize {
    DispatchSize {
        x: width.div_ceil(group.x.max(1)),
        y: height.div_ceil(group.y.max(1)),
        z: 1,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exact_multiple() {
        let d = dispatch_size(1920, 1080, WorkgroupSize::new(8, 8, 1));
        assert_eq!(d.to_array(), [240, 135, 1]);
    }

    #[test]
    fn rounds_up_partial_groups() {
        let d = dispatch_size(1921, 1080, WorkgroupSize::new(8, 8, 1));
        assert_eq!(d.to_array(), [241, 135, 1]);
        let d = dispatch_size(1, 1, WorkgroupSize::new(16, 16, 1));
        assert_eq!(d.to_array(), [1, 1, 1]);
    }

    #[test]
    fn covers_every_pixel() {
        for (w, h) in [(7, 3), (640, 480), (1023, 769)] {
            let group = WorkgroupSize::new(8, 4, 1);
            let d = dispatch_size(w, h, group);
            assert!(d.x * group.x >= w && (d.x - 1) * group.x < w);
            assert!(d.y * group.y >= h && (d.y - 1) * group.y < h);
        }
    }

    #[test]
    fn invocations_widen_before_multiplying() {
        let grid = DispatchSize { x: 70_000, y: 70_000, z: 1 };
        let group = WorkgroupSize::new(64, 64, 1);
        assert_eq!(grid.invocations(group), 70_000u64 * 64 * 70_000 * 64);
    }

    #[test]
    fn zero_sized_target_dispatches_nothing() {
        let d = dispatch_size(0, 0, WorkgroupSize::default());
        assert_eq!(d.to_array(), [0, 0, 1]);
    }
}
