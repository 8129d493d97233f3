//! WGSL reflection
//!
//! Parses WGSL with naga and extracts what the host needs to feed a shader:
//!
//! - vertex inputs of the vertex entry point, in declaration order
//! - the `@group(0) @binding(0)` uniform block, flattened into named members
//!   (`point_lights[2].color`, `material.shininess`)
//! - `@group(1)` textures, where unit `n` lives at binding `2n` and its optional
//!   sampler at `2n + 1`

use naga::{AddressSpace, ArraySize, Binding, Handle, ImageClass, Module, ScalarKind, Type, TypeInner, VectorSize};
use tessel_core::{ReflectedAttribute, ReflectedTexture, ReflectedUniform, ShaderReflection, UniformKind};

use crate::error::{GpuError, Result};

/// Bind group holding the uniform block
pub const UNIFORM_GROUP: u32 = 0;
/// Bind group holding textures and samplers
pub const TEXTURE_GROUP: u32 = 1;

/// Parse and reflect a WGSL module
pub fn reflect_wgsl(label: &str, source: &str) -> Result<ShaderReflection> {
    let module = naga::front::wgsl::parse_str(source).map_err(|err| GpuError::ShaderParse {
        label: label.to_string(),
        message: err.emit_to_string(source),
    })?;
    reflect_module(&module)
}

/// Reflect an already parsed module
pub fn reflect_module(module: &Module) -> Result<ShaderReflection> {
    let mut reflection = ShaderReflection {
        attributes: vertex_inputs(module)?,
        ..Default::default()
    };

    for (_, global) in module.global_variables.iter() {
        let Some(binding) = &global.binding else {
            continue;
        };

        if global.space == AddressSpace::Uniform {
            if binding.group != UNIFORM_GROUP || binding.binding != 0 {
                return Err(GpuError::Reflection(format!(
                    "uniform block must be at @group({UNIFORM_GROUP}) @binding(0), found @group({}) @binding({})",
                    binding.group, binding.binding
                )));
            }
            let ty = &module.types[global.ty];
            reflection.uniform_block_size = ty.inner.size(module.to_ctx());
            match &ty.inner {
                TypeInner::Struct { .. } => flatten_uniform(module, "", global.ty, 0, &mut reflection.uniforms),
                _ => {
                    let name = global.name.clone().unwrap_or_default();
                    flatten_uniform(module, &name, global.ty, 0, &mut reflection.uniforms)
                }
            }
            continue;
        }

        if binding.group == TEXTURE_GROUP {
            if let TypeInner::Image { class, .. } = &module.types[global.ty].inner {
                if binding.binding % 2 != 0 {
                    return Err(GpuError::Reflection(format!(
                        "texture `{}` must use an even binding",
                        global.name.as_deref().unwrap_or("?")
                    )));
                }
                reflection.textures.push(ReflectedTexture {
                    name: global.name.clone().unwrap_or_default(),
                    unit: binding.binding / 2,
                    depth: matches!(class, ImageClass::Depth { .. }),
                    sampled: false,
                });
            }
        }
    }

    // Pair samplers with the texture one binding below them
    for (_, global) in module.global_variables.iter() {
        let (Some(binding), TypeInner::Sampler { .. }) = (&global.binding, &module.types[global.ty].inner) else {
            continue;
        };
        if binding.group != TEXTURE_GROUP || binding.binding % 2 != 1 {
            continue;
        }
        let unit = binding.binding / 2;
        if let Some(texture) = reflection.textures.iter_mut().find(|t| t.unit == unit) {
            texture.sampled = true;
        }
    }
    reflection.textures.sort_by_key(|t| t.unit);

    Ok(reflection)
}

/// Number of scalar components for a vertex input or uniform type
pub fn component_count(inner: &TypeInner) -> Option<u32> {
    match *inner {
        TypeInner::Scalar(_) => Some(1),
        TypeInner::Vector { size, .. } => Some(size as u32),
        TypeInner::Matrix { columns, rows, .. } => Some(columns as u32 * rows as u32),
        _ => None,
    }
}

fn vertex_inputs(module: &Module) -> Result<Vec<ReflectedAttribute>> {
    let Some(entry) = module
        .entry_points
        .iter()
        .find(|ep| ep.stage == naga::ShaderStage::Vertex)
    else {
        return Ok(Vec::new());
    };

    let mut attributes = Vec::new();
    for arg in &entry.function.arguments {
        match &arg.binding {
            Some(Binding::Location { location, .. }) => {
                attributes.push(attribute(module, arg.name.as_deref(), *location, arg.ty)?);
            }
            Some(Binding::BuiltIn(_)) => {}
            None => {
                if let TypeInner::Struct { members, .. } = &module.types[arg.ty].inner {
                    for member in members {
                        if let Some(Binding::Location { location, .. }) = &member.binding {
                            attributes.push(attribute(module, member.name.as_deref(), *location, member.ty)?);
                        }
                    }
                }
            }
        }
    }
    Ok(attributes)
}

fn attribute(module: &Module, name: Option<&str>, location: u32, ty: Handle<Type>) -> Result<ReflectedAttribute> {
    let name = name.unwrap_or_default().to_string();
    let components = component_count(&module.types[ty].inner)
        .ok_or_else(|| GpuError::Reflection(format!("vertex input `{name}` has an unsupported type")))?;
    Ok(ReflectedAttribute {
        name,
        location,
        components,
    })
}

fn flatten_uniform(module: &Module, prefix: &str, ty: Handle<Type>, base: u32, out: &mut Vec<ReflectedUniform>) {
    match &module.types[ty].inner {
        TypeInner::Struct { members, .. } => {
            for member in members {
                let field = member.name.as_deref().unwrap_or_default();
                let name = if prefix.is_empty() {
                    field.to_string()
                } else {
                    format!("{prefix}.{field}")
                };
                flatten_uniform(module, &name, member.ty, base + member.offset, out);
            }
        }
        TypeInner::Array {
            base: element,
            size: ArraySize::Constant(count),
            stride,
        } => {
            for i in 0..count.get() {
                flatten_uniform(module, &format!("{prefix}[{i}]"), *element, base + i * stride, out);
            }
        }
        inner => out.push(ReflectedUniform {
            name: prefix.to_string(),
            offset: base,
            kind: uniform_kind(module, inner),
        }),
    }
}

fn uniform_kind(module: &Module, inner: &TypeInner) -> UniformKind {
    match *inner {
        TypeInner::Scalar(scalar) if scalar.width == 4 => match scalar.kind {
            ScalarKind::Sint => UniformKind::Int,
            ScalarKind::Uint => UniformKind::UInt,
            ScalarKind::Float => UniformKind::Float,
            _ => UniformKind::Other(inner.size(module.to_ctx())),
        },
        TypeInner::Vector { size, scalar } if scalar.kind == ScalarKind::Float && scalar.width == 4 => match size {
            VectorSize::Bi => UniformKind::Vec2,
            VectorSize::Tri => UniformKind::Vec3,
            VectorSize::Quad => UniformKind::Vec4,
        },
        TypeInner::Matrix {
            columns: VectorSize::Quad,
            rows: VectorSize::Quad,
            scalar,
        } if scalar.width == 4 => UniformKind::Mat4,
        _ => UniformKind::Other(inner.size(module.to_ctx())),
    }
}
