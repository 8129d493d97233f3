//! Packed vertex attribute layouts
//!
//! A layout is derived once from a shader's reflected vertex inputs. Offsets are
//! assigned in declaration order with no gaps, so the same mesh-building code can
//! target a 4-component UI vertex or an 8-component lit vertex.

use smallvec::SmallVec;
use tessel_core::{CoreError, ReflectedAttribute, VertexAttributeDesc, VertexLayoutDesc};

use crate::error::Result;

/// Well-known attribute names used by the built-in shaders
pub mod names {
    pub const POSITION: &str = "position";
    pub const TEX_COORD: &str = "tex_coord";
    pub const NORMAL: &str = "normal";
}

/// One attribute's place inside a packed vertex
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AttributeSlot {
    pub name: String,
    /// Shader input location
    pub location: u32,
    /// Offset in components from the start of the vertex
    pub offset: u32,
    pub components: u32,
}

/// Immutable name → (location, offset, components) mapping with its stride
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AttributeLayout {
    slots: SmallVec<[AttributeSlot; 4]>,
    stride: u32,
    desc: VertexLayoutDesc,
}

impl AttributeLayout {
    /// Build from reflected shader inputs, in their declaration order
    pub fn from_reflection(attributes: &[ReflectedAttribute]) -> Self {
        let mut slots = SmallVec::new();
        let mut offset = 0;
        for attr in attributes {
            slots.push(AttributeSlot {
                name: attr.name.clone(),
                location: attr.location,
                offset,
                components: attr.components,
            });
            offset += attr.components;
        }
        Self::from_slots(slots, offset)
    }

    /// Build from `(name, components)` pairs with sequential locations
    pub fn new<'a>(attributes: impl IntoIterator<Item = (&'a str, u32)>) -> Self {
        let reflected: Vec<ReflectedAttribute> = attributes
            .into_iter()
            .enumerate()
            .map(|(location, (name, components))| ReflectedAttribute {
                name: name.to_string(),
                location: location as u32,
                components,
            })
            .collect();
        Self::from_reflection(&reflected)
    }

    fn from_slots(slots: SmallVec<[AttributeSlot; 4]>, stride: u32) -> Self {
        let desc = VertexLayoutDesc {
            stride,
            attributes: slots
                .iter()
                .map(|s| VertexAttributeDesc {
                    location: s.location,
                    offset: s.offset,
                    components: s.components,
                })
                .collect(),
        };
        Self { slots, stride, desc }
    }

    /// Components per vertex
    pub fn stride(&self) -> u32 {
        self.stride
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &AttributeSlot> {
        self.slots.iter()
    }

    pub fn get(&self, name: &str) -> Option<&AttributeSlot> {
        self.slots.iter().find(|s| s.name == name)
    }

    /// Look up an attribute, failing with `UnknownAttribute`
    pub fn require(&self, name: &str) -> Result<&AttributeSlot> {
        self.get(name)
            .ok_or_else(|| CoreError::UnknownAttribute(name.to_string()).into())
    }

    /// Backend-facing description of this layout
    pub fn desc(&self) -> &VertexLayoutDesc {
        &self.desc
    }
}
