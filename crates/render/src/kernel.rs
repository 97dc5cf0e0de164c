use crate::dispatch::WorkgroupSize;
use crate::error::RenderError;

/// Resource a kernel global must be declared as.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BindingKind {
    Uniform,
    ReadOnlyStorage,
    /// Write-only 2D storage texture of the given format.
    WriteStorageTexture(naga::StorageFormat),
    /// Non-multisampled 2D float texture.
    SampledTexture,
}

/// One group-0 binding a dispatch driver will supply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExpectedBinding {
    pub binding: u32,
    pub name: &'static str,
    pub kind: BindingKind,
}

impl ExpectedBinding {
    pub const fn new(binding: u32, name: &'static str, kind: BindingKind) -> Self {
        Self { binding, name, kind }
    }
}

/// A compute entry point found in a WGSL program.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KernelInfo {
    pub name: String,
    pub workgroup_size: WorkgroupSize,
}

impl KernelInfo {
    /// Parse and validate `source`, then look up the compute entry point `name`.
    pub fn reflect(source: &str, name: &str) -> Result<Self, RenderError> {
        let module = parse_and_validate(source)?;
        Self::from_module(&module, name)
    }

    /// Like [`reflect`](Self::reflect), and also require the program's bound
    /// globals to be exactly `layout`, so a pipeline built for `layout` will
    /// accept it.
    pub fn reflect_with_layout(
        source: &str,
        name: &str,
        layout: &[ExpectedBinding],
    ) -> Result<Self, RenderError> {
        let module = parse_and_validate(source)?;
        let info = Self::from_module(&module, name)?;
        check_bindings(&module, layout)?;
        Ok(info)
    }

    pub fn from_module(module: &naga::Module, name: &str) -> Result<Self, RenderError> {
        let entry = module
            .entry_points
            .iter()
            .find(|ep| ep.name == name)
            .ok_or_else(|| RenderError::KernelNotFound { name: name.to_string() })?;
        if entry.stage != naga::ShaderStage::Compute {
            return Err(RenderError::NotCompute { name: name.to_string() });
        }
        Ok(Self {
            name: name.to_string(),
            workgroup_size: entry.workgroup_size.into(),
        })
    }

    /// Names of every compute entry point in `source`.
    pub fn list(source: &str) -> Result<Vec<Self>, RenderError> {
        let module = parse_and_validate(source)?;
        Ok(module
            .entry_points
            .iter()
            .filter(|ep| ep.stage == naga::ShaderStage::Compute)
            .map(|ep| Self {
                name: ep.name.clone(),
                workgroup_size: ep.workgroup_size.into(),
            })
            .collect())
    }
}

fn check_bindings(module: &naga::Module, layout: &[ExpectedBinding]) -> Result<(), RenderError> {
    let mismatch = |binding: u32, reason: String| RenderError::BindingMismatch { binding, reason };

    for (_, var) in module.global_variables.iter() {
        let Some(bound) = &var.binding else {
            continue;
        };
        let name = var.name.as_deref().unwrap_or("<unnamed>");
        if bound.group != 0 {
            return Err(mismatch(
                bound.binding,
                format!("`{name}` is in group {}, only group 0 is bound", bound.group),
            ));
        }
        let Some(expected) = layout.iter().find(|e| e.binding == bound.binding) else {
            return Err(mismatch(bound.binding, format!("unexpected global `{name}`")));
        };
        if name != expected.name {
            return Err(mismatch(
                bound.binding,
                format!("expected `{}`, found `{name}`", expected.name),
            ));
        }
        match binding_kind(module, var) {
            Some(kind) if kind == expected.kind => {}
            found => {
                return Err(mismatch(
                    bound.binding,
                    format!("`{name}` should be {:?}, found {found:?}", expected.kind),
                ));
            }
        }
    }

    for expected in layout {
        let declared = module.global_variables.iter().any(|(_, var)| {
            var.binding
                .as_ref()
                .is_some_and(|b| b.group == 0 && b.binding == expected.binding)
        });
        if !declared {
            return Err(mismatch(
                expected.binding,
                format!("`{}` is not declared", expected.name),
            ));
        }
    }
    Ok(())
}

fn binding_kind(module: &naga::Module, var: &naga::GlobalVariable) -> Option<BindingKind> {
    match var.space {
        naga::AddressSpace::Uniform => Some(BindingKind::Uniform),
        naga::AddressSpace::Storage { access } if !access.contains(naga::StorageAccess::STORE) => {
            Some(BindingKind::ReadOnlyStorage)
        }
        naga::AddressSpace::Handle => match module.types[var.ty].inner {
            naga::TypeInner::Image {
                dim: naga::ImageDimension::D2,
                arrayed: false,
                class,
            } => match class {
                naga::ImageClass::Storage { format, access }
                    if access == naga::StorageAccess::STORE =>
                {
                    Some(BindingKind::WriteStorageTexture(format))
                }
                naga::ImageClass::Sampled {
                    kind: naga::ScalarKind::Float,
                    multi: false,
                } => Some(BindingKind::SampledTexture),
                _ => None,
            },
            _ => None,
        },
        _ => None,
    }
}

fn parse_and_validate(source: &str) -> Result<naga::Module, RenderError> {
    let module = naga::front::wgsl::parse_str(source)
        .map_err(|e| RenderError::ShaderParse(e.emit_to_string(source)))?;
    let mut validator = naga::valid::Validator::new(
        naga::valid::ValidationFlags::all(),
        naga::valid::Capabilities::all(),
    );
    validator
        .validate(&module)
        .map_err(|e| RenderError::ShaderValidation(e.emit_to_string(source)))?;
    Ok(module)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SOURCE: &str = r#"
@group(0) @binding(0) var<storage, read_write> out: array<u32>;

@compute @workgroup_size(8, 4, 1)
fn main(@builtin(global_invocation_id) id: vec3<u32>) {
    out[id.x] = id.y;
}

@compute @workgroup_size(64)
fn fill(@builtin(global_invocation_id) id: vec3<u32>) {
    out[id.x] = 0u;
}

@vertex
fn vs() -> @builtin(position) vec4<f32> {
    return vec4<f32>(0.0);
}
"#;

    #[test]
    fn reflects_workgroup_size() {
        let info = KernelInfo::reflect(SOURCE, "main").unwrap();
        assert_eq!(info.workgroup_size, WorkgroupSize::new(8, 4, 1));
        let fill = KernelInfo::reflect(SOURCE, "fill").unwrap();
        assert_eq!(fill.workgroup_size, WorkgroupSize::new(64, 1, 1));
    }

    #[test]
    fn missing_kernel_is_reported() {
        let err = KernelInfo::reflect(SOURCE, "march").unwrap_err();
        assert!(matches!(err, RenderError::KernelNotFound { ref name } if name == "march"));
    }

    #[test]
    fn non_compute_entry_rejected() {
        assert!(matches!(
            KernelInfo::reflect(SOURCE, "vs"),
            Err(RenderError::NotCompute { .. })
        ));
    }

    #[test]
    fn list_skips_graphics_stages() {
        let names: Vec<_> = KernelInfo::list(SOURCE).unwrap().into_iter().map(|k| k.name).collect();
        assert_eq!(names, ["main", "fill"]);
    }

    const OUT_LAYOUT: [ExpectedBinding; 1] =
        [ExpectedBinding::new(0, "out", BindingKind::ReadOnlyStorage)];

    #[test]
    fn layout_check_accepts_matching_globals() {
        const READ_ONLY: &str = r#"
@group(0) @binding(0) var<storage, read> out: array<u32>;

@compute @workgroup_size(8, 8, 1)
fn main(@builtin(global_invocation_id) id: vec3<u32>) {
    let v = out[id.x];
}
"#;
        let info = KernelInfo::reflect_with_layout(READ_ONLY, "main", &OUT_LAYOUT).unwrap();
        assert_eq!(info.workgroup_size, WorkgroupSize::new(8, 8, 1));
    }

    #[test]
    fn layout_check_rejects_wrong_access() {
        // `out` is read_write, the layout binds it read-only.
        let err = KernelInfo::reflect_with_layout(SOURCE, "main", &OUT_LAYOUT).unwrap_err();
        assert!(matches!(err, RenderError::BindingMismatch { binding: 0, .. }));
    }

    #[test]
    fn layout_check_rejects_missing_and_extra_globals() {
        let wider = [
            ExpectedBinding::new(0, "out", BindingKind::ReadOnlyStorage),
            ExpectedBinding::new(1, "extra", BindingKind::Uniform),
        ];
        let source = SOURCE
            .replace("read_write", "read")
            .replace("out[id.x] = id.y;", "let a = out[id.y];")
            .replace("out[id.x] = 0u;", "let b = out[0];");
        assert!(matches!(
            KernelInfo::reflect_with_layout(&source, "main", &wider),
            Err(RenderError::BindingMismatch { binding: 1, .. })
        ));
        assert!(matches!(
            KernelInfo::reflect_with_layout(&source, "main", &[]),
            Err(RenderError::BindingMismatch { binding: 0, .. })
        ));
    }

    #[test]
    fn layout_check_compares_storage_texture_format() {
        const TEXTURE: &str = r#"
@group(0) @binding(0) var result: texture_storage_2d<rgba16float, write>;

@compute @workgroup_size(8, 8, 1)
fn main(@builtin(global_invocation_id) id: vec3<u32>) {
    textureStore(result, vec2<i32>(id.xy), vec4<f32>(1.0));
}
"#;
        let want = |format| {
            [ExpectedBinding::new(0, "result", BindingKind::WriteStorageTexture(format))]
        };
        assert!(
            KernelInfo::reflect_with_layout(TEXTURE, "main", &want(naga::StorageFormat::Rgba16Float))
                .is_ok()
        );
        assert!(matches!(
            KernelInfo::reflect_with_layout(TEXTURE, "main", &want(naga::StorageFormat::Rgba8Unorm)),
            Err(RenderError::BindingMismatch { .. })
        ));
    }

    #[test]
    fn parse_errors_surface() {
        assert!(matches!(
            KernelInfo::reflect("fn broken(", "main"),
            Err(RenderError::ShaderParse(_))
        ));
    }
}
