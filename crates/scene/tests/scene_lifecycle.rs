use glam::Vec3;
use sdfray_common::{Color, Transform};
use sdfray_scene::{
    BoxRecord, GpuRecord, MaterialRecord, MaterialRef, PrimitiveHandle, SceneContext,
    SdfMaterial, SdfPrimitive, SegmentRecord, SphereRecord,
};

fn sphere(x: f32) -> SphereRecord {
    SphereRecord::new(Vec3::new(x, 0.0, 0.0), 1.0)
}

/// Every live handle addresses its own record at its reported position.
fn assert_handles_track_records(scene: &SceneContext, live: &[(PrimitiveHandle, f32)]) {
    for (handle, x) in live {
        let pos = scene.position(*handle).expect("live handle");
        assert_eq!(scene.spheres().records()[pos].position[0], *x);
    }
    assert_eq!(scene.spheres().len(), live.len());
}

#[test]
fn remove_first_of_two_spheres() {
    let mut scene = SceneContext::new();
    let a = scene.add(sphere(1.0), None);
    let b = scene.add(sphere(2.0), None);
    assert_eq!(scene.position(a), Some(0));
    assert_eq!(scene.position(b), Some(1));

    scene.remove(a).unwrap();
    assert_eq!(scene.position(b), Some(0));
    assert_eq!(scene.spheres().gpu_slice(), &[sphere(2.0)]);
    assert_eq!(scene.counts().spheres, 1);
}

#[test]
fn removing_only_sphere_leaves_blank_sentinel() {
    let mut scene = SceneContext::new();
    let a = scene.add(sphere(1.0), None);
    scene.remove(a).unwrap();

    assert_eq!(scene.counts().spheres, 0);
    assert_eq!(scene.spheres().gpu_slice(), &[SphereRecord::blank()]);
}

#[test]
fn handle_positions_survive_mixed_mutation() {
    let mut scene = SceneContext::new();
    let mut live: Vec<(PrimitiveHandle, f32)> = Vec::new();
    // Small LCG so the sequence is deterministic without extra dependencies.
    let mut state: u32 = 0x2545_f491;
    let mut next = move || {
        state = state.wrapping_mul(1_664_525).wrapping_add(1_013_904_223);
        state >> 8
    };

    for step in 0..400 {
        let roll = next() % 10;
        if roll < 5 || live.is_empty() {
            let x = step as f32;
            live.push((scene.add(sphere(x), None), x));
        } else if roll < 8 {
            let victim = live.remove(next() as usize % live.len());
            scene.remove(victim.0).unwrap();
        } else {
            let slot = next() as usize % live.len();
            let x = -(step as f32);
            scene.update(live[slot].0, sphere(x)).unwrap();
            live[slot].1 = x;
        }
        assert_handles_track_records(&scene, &live);
    }
}

#[test]
fn material_resolution_is_identity_based() {
    let mut scene = SceneContext::new();
    let red = MaterialRef::new(SdfMaterial::with_albedo(Color::rgb(1.0, 0.0, 0.0)));
    let red_twin = MaterialRef::new(SdfMaterial::with_albedo(Color::rgb(1.0, 0.0, 0.0)));

    let first = scene.resolve_material(Some(&red));
    let second = scene.resolve_material(Some(&red));
    let twin = scene.resolve_material(Some(&red_twin));
    assert_eq!(first, second);
    assert_ne!(first, twin);
    assert_eq!(scene.resolve_material(None), 0);

    let buffer = scene.material_buffer();
    assert_eq!(buffer.len(), 3);
    assert_eq!(buffer[0], MaterialRecord::DEFAULT);
    assert_eq!(buffer[0].albedo, [1.0, 0.0, 1.0, 1.0]);
    assert_eq!(buffer[0].lit, 0);
}

#[test]
fn update_round_trip_keeps_material() {
    let mut scene = SceneContext::new();
    let mat = MaterialRef::new(SdfMaterial::default());
    let h = scene.add(sphere(0.0), Some(&mat));

    let replacement = SphereRecord::new(Vec3::new(4.0, 5.0, 6.0), 2.5);
    scene.update(h, replacement).unwrap();

    let pos = scene.position(h).unwrap();
    let stored = scene.spheres().records()[pos];
    assert_eq!(stored.position, [4.0, 5.0, 6.0]);
    assert_eq!(stored.radius, 2.5);
    assert_eq!(stored.material_index, 1);
}

#[test]
fn mixed_kinds_keep_separate_buffers() {
    let mut scene = SceneContext::new();
    let shared = MaterialRef::new(SdfMaterial::default());
    let s = scene.add(sphere(0.0), Some(&shared));
    let b = scene.add(BoxRecord::from_transform(&Transform::default()), Some(&shared));
    let seg = scene.add(
        SegmentRecord::new(Vec3::ZERO, Vec3::new(0.0, 2.0, 0.0), 0.1, false),
        None,
    );

    scene.remove(s).unwrap();
    assert_eq!(scene.position(b), Some(0));
    assert_eq!(scene.position(seg), Some(0));
    assert_eq!(scene.counts().materials, 2);
    assert!(matches!(scene.get(b), Some(SdfPrimitive::Box(r)) if r.material_index == 1));
    assert!(matches!(scene.get(seg), Some(SdfPrimitive::Segment(r)) if r.material_index == 0));
}
