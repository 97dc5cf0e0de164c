/// Ray-march compute kernel. Entry point `main`, one invocation per pixel.
///
/// Record structs mirror the `Pod` records in `sdfray-scene` field for field.
/// `_Depth` holds view-space depth divided by the far clip. Each ray converts
/// it to a distance along itself and stops marching there.
pub const RAYMARCH_SHADER: &str = r#"
struct Frame {
    camera_to_world: mat4x4<f32>,
    world_to_camera: mat4x4<f32>,
    camera_inverse_projection: mat4x4<f32>,
    camera_projection: mat4x4<f32>,
    width: u32,
    height: u32,
    msaa: u32,
    num_spheres: u32,
    num_boxes: u32,
    num_line_segments: u32,
    num_lights: u32,
    near_clip: f32,
    far_clip: f32,
};

struct Sphere {
    position: vec3<f32>,
    radius: f32,
    material_index: u32,
};

struct SdfBox {
    transform_inverse: mat4x4<f32>,
    half_extents: vec3<f32>,
    material_index: u32,
};

struct LineSegment {
    start: vec3<f32>,
    thickness: f32,
    end: vec3<f32>,
    perspective: u32,
    material_index: u32,
};

struct Light {
    position: vec3<f32>,
    intensity: f32,
    direction: vec3<f32>,
    kind: u32,
    color: vec4<f32>,
};

struct Material {
    albedo: vec4<f32>,
    ambient: vec4<f32>,
    smoothness: f32,
    specular_power: f32,
    ambient_strength: f32,
    opacity: f32,
    lit: u32,
};

@group(0) @binding(0) var<uniform> uniforms: Frame;
@group(0) @binding(1) var<storage, read> _Spheres: array<Sphere>;
@group(0) @binding(2) var<storage, read> _Boxes: array<SdfBox>;
@group(0) @binding(3) var<storage, read> _LineSegments: array<LineSegment>;
@group(0) @binding(4) var<storage, read> _Lights: array<Light>;
@group(0) @binding(5) var<storage, read> _Materials: array<Material>;
@group(0) @binding(6) var _Result: texture_storage_2d<rgba8unorm, write>;
@group(0) @binding(7) var _Depth: texture_2d<f32>;

const MAX_STEPS: u32 = 128u;
const HIT_EPSILON: f32 = 0.0005;
const LIGHT_DIRECTIONAL: u32 = 0u;
const MIN_FORWARD_COS: f32 = 0.0001;

struct Hit {
    dist: f32,
    material: u32,
};

fn sd_sphere(p: vec3<f32>, s: Sphere) -> f32 {
    return length(p - s.position) - s.radius;
}

fn sd_box(p: vec3<f32>, b: SdfBox) -> f32 {
    let local = (b.transform_inverse * vec4<f32>(p, 1.0)).xyz;
    let q = abs(local) - b.half_extents;
    return length(max(q, vec3<f32>(0.0))) + min(max(q.x, max(q.y, q.z)), 0.0);
}

fn sd_segment(p: vec3<f32>, s: LineSegment, eye: vec3<f32>) -> f32 {
    let pa = p - s.start;
    let ba = s.end - s.start;
    let h = clamp(dot(pa, ba) / max(dot(ba, ba), 1e-8), 0.0, 1.0);
    var radius = s.thickness;
    if (s.perspective == 0u) {
        // Constant on-screen width.
        radius = radius * distance(p, eye);
    }
    return length(pa - ba * h) - radius;
}

fn scene_sdf(p: vec3<f32>, eye: vec3<f32>) -> Hit {
    var hit = Hit(uniforms.far_clip, 0u);
    for (var i = 0u; i < uniforms.num_spheres; i = i + 1u) {
        let d = sd_sphere(p, _Spheres[i]);
        if (d < hit.dist) {
            hit = Hit(d, _Spheres[i].material_index);
        }
    }
    for (var i = 0u; i < uniforms.num_boxes; i = i + 1u) {
        let d = sd_box(p, _Boxes[i]);
        if (d < hit.dist) {
            hit = Hit(d, _Boxes[i].material_index);
        }
    }
    for (var i = 0u; i < uniforms.num_line_segments; i = i + 1u) {
        let d = sd_segment(p, _LineSegments[i], eye);
        if (d < hit.dist) {
            hit = Hit(d, _LineSegments[i].material_index);
        }
    }
    return hit;
}

fn normal_at(p: vec3<f32>, eye: vec3<f32>) -> vec3<f32> {
    let e = vec2<f32>(HIT_EPSILON, 0.0);
    return normalize(vec3<f32>(
        scene_sdf(p + e.xyy, eye).dist - scene_sdf(p - e.xyy, eye).dist,
        scene_sdf(p + e.yxy, eye).dist - scene_sdf(p - e.yxy, eye).dist,
        scene_sdf(p + e.yyx, eye).dist - scene_sdf(p - e.yyx, eye).dist,
    ));
}

fn shade(p: vec3<f32>, n: vec3<f32>, view_dir: vec3<f32>, m: Material) -> vec4<f32> {
    if (m.lit == 0u) {
        return vec4<f32>(m.albedo.rgb, m.albedo.a * m.opacity);
    }
    var color = m.ambient.rgb * m.ambient_strength;
    for (var i = 0u; i < uniforms.num_lights; i = i + 1u) {
        let light = _Lights[i];
        var to_light = light.direction;
        var falloff = 1.0;
        if (light.kind != LIGHT_DIRECTIONAL) {
            let offset = light.position - p;
            to_light = normalize(offset);
            falloff = 1.0 / max(dot(offset, offset), 1e-4);
        }
        let diffuse = max(dot(n, to_light), 0.0);
        let half_dir = normalize(to_light - view_dir);
        let specular = pow(max(dot(n, half_dir), 0.0), m.specular_power) * m.smoothness;
        color += (m.albedo.rgb * diffuse + vec3<f32>(specular)) * light.color.rgb * light.intensity * falloff;
    }
    return vec4<f32>(color, m.albedo.a * m.opacity);
}

fn march(pixel: vec2<f32>, depth: f32) -> vec4<f32> {
    let size = vec2<f32>(f32(uniforms.width), f32(uniforms.height));
    var ndc = pixel / size * 2.0 - 1.0;
    ndc.y = -ndc.y;

    let eye = (uniforms.camera_to_world * vec4<f32>(0.0, 0.0, 0.0, 1.0)).xyz;
    let view_dir = (uniforms.camera_inverse_projection * vec4<f32>(ndc, 0.0, 1.0)).xyz;
    let dir = normalize((uniforms.camera_to_world * vec4<f32>(view_dir, 0.0)).xyz);
    let forward = -normalize((uniforms.camera_to_world * vec4<f32>(0.0, 0.0, 1.0, 0.0)).xyz);
    let max_dist = depth * uniforms.far_clip / max(dot(dir, forward), MIN_FORWARD_COS);

    var t = uniforms.near_clip;
    for (var n = 0u; n < MAX_STEPS; n = n + 1u) {
        if (t >= max_dist) {
            break;
        }
        let p = eye + dir * t;
        let hit = scene_sdf(p, eye);
        if (hit.dist < HIT_EPSILON * t) {
            return shade(p, normal_at(p, eye), dir, _Materials[hit.material]);
        }
        t += hit.dist;
    }
    return vec4<f32>(0.0);
}

fn sample_offset(index: u32, count: u32) -> vec2<f32> {
    let side = u32(ceil(sqrt(f32(count))));
    let cell = vec2<f32>(f32(index % side), f32(index / side));
    return (cell + 0.5) / f32(side);
}

@compute @workgroup_size(8, 8, 1)
fn main(@builtin(global_invocation_id) id: vec3<u32>) {
    if (id.x >= uniforms.width || id.y >= uniforms.height) {
        return;
    }
    let coord = vec2<i32>(id.xy);
    let depth = min(textureLoad(_Depth, coord, 0).r, 1.0);

    let samples = clamp(uniforms.msaa, 1u, 16u);
    var accum = vec4<f32>(0.0);
    for (var s = 0u; s < samples; s = s + 1u) {
        accum += march(vec2<f32>(id.xy) + sample_offset(s, samples), depth);
    }
    textureStore(_Result, coord, accum / f32(samples));
}
"#;

/// Fullscreen triangle that alpha-blends the ray-march result over the
/// frame's color target.
pub const COMPOSITE_SHADER: &str = r#"
@group(0) @binding(0) var source: texture_2d<f32>;

struct VertexOutput {
    @builtin(position) clip_position: vec4<f32>,
};

@vertex
fn vs_fullscreen(@builtin(vertex_index) index: u32) -> VertexOutput {
    let uv = vec2<f32>(f32((index << 1u) & 2u), f32(index & 2u));
    var out: VertexOutput;
    out.clip_position = vec4<f32>(uv * 2.0 - 1.0, 0.0, 1.0);
    return out;
}

@fragment
fn fs_composite(in: VertexOutput) -> @location(0) vec4<f32> {
    let dims = textureDimensions(source);
    let texel = min(vec2<u32>(in.clip_position.xy), dims - vec2<u32>(1u));
    return textureLoad(source, texel, 0);
}
"#;

/// Grid floor drawn under the ray-marched scene. Also writes linear depth
/// over far clip so the kernel stops at the floor lines.
pub const BACKDROP_SHADER: &str = r#"
struct Uniforms {
    view_proj: mat4x4<f32>,
    world_to_camera: mat4x4<f32>,
    far_clip: f32,
};

@group(0) @binding(0)
var<uniform> uniforms: Uniforms;

struct GridVertex {
    @location(0) position: vec3<f32>,
    @location(1) color: vec4<f32>,
};

struct GridOutput {
    @builtin(position) clip_position: vec4<f32>,
    @location(0) color: vec4<f32>,
    @location(1) view_depth: f32,
};

struct GridTargets {
    @location(0) color: vec4<f32>,
    @location(1) linear_depth: f32,
};

@vertex
fn vs_grid(vertex: GridVertex) -> GridOutput {
    let world = vec4<f32>(vertex.position, 1.0);
    var out: GridOutput;
    out.clip_position = uniforms.view_proj * world;
    out.color = vertex.color;
    out.view_depth = -(uniforms.world_to_camera * world).z;
    return out;
}

@fragment
fn fs_grid(in: GridOutput) -> GridTargets {
    var out: GridTargets;
    out.color = in.color;
    out.linear_depth = clamp(in.view_depth / uniforms.far_clip, 0.0, 1.0);
    return out;
}
"#;
