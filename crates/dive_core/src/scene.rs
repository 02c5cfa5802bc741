//! Scene graph types for DIVE worlds.
//!
//! A parsed `.vr` document becomes a [`Scene`]: one [`World`] plus a tree
//! of [`Object`]s, each owning its materials, textures, transforms, views
//! and child objects. Everything here is renderer-agnostic data.

use std::collections::BTreeMap;

use dive_math::{euler_xyz, fixed_xyz, from_basis_rows, Aabb, Mat4, Vec3};
use serde::{Deserialize, Serialize};

use crate::mesh::{Lines, Mesh};

/// Surface material.
///
/// All color channels and scalars live in 0..1. `spec_power` is remapped to
/// a shininess range by the renderer.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Material {
    /// Name from a `material "name"` or named property block
    pub name: Option<String>,
    pub ambient: Vec3,
    pub diffuse: Vec3,
    pub emission: Vec3,
    pub specular: Vec3,
    pub spec_power: f32,
    pub transparency: f32,
}

impl Default for Material {
    fn default() -> Self {
        Self {
            name: None,
            ambient: Vec3::ZERO,
            diffuse: Vec3::splat(0.5), // Neutral grey
            emission: Vec3::ZERO,
            specular: Vec3::ZERO,
            spec_power: 0.0,
            transparency: 0.0,
        }
    }
}

impl Material {
    /// The `rgb r g b` shorthand: sets both ambient and diffuse.
    pub fn rgb(color: Vec3) -> Self {
        let color = color.clamp(Vec3::ZERO, Vec3::ONE);
        Self {
            ambient: color,
            diffuse: color,
            ..Default::default()
        }
    }

    /// Clamp every channel into 0..1.
    pub fn clamp_ranges(&mut self) {
        self.ambient = self.ambient.clamp(Vec3::ZERO, Vec3::ONE);
        self.diffuse = self.diffuse.clamp(Vec3::ZERO, Vec3::ONE);
        self.emission = self.emission.clamp(Vec3::ZERO, Vec3::ONE);
        self.specular = self.specular.clamp(Vec3::ZERO, Vec3::ONE);
        self.spec_power = self.spec_power.clamp(0.0, 1.0);
        self.transparency = self.transparency.clamp(0.0, 1.0);
    }
}

/// External name -> material table consulted by `material "name"`.
///
/// Serialized as a plain JSON object keyed by material name.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MaterialLibrary {
    materials: BTreeMap<String, Material>,
}

impl MaterialLibrary {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, material: Material) {
        self.materials.insert(name.into(), material);
    }

    /// Look up a material by name, falling back to a case-insensitive match.
    ///
    /// When several keys differ only by case, the fallback picks the first
    /// in byte order.
    pub fn get(&self, name: &str) -> Option<&Material> {
        self.materials.get(name).or_else(|| {
            self.materials
                .iter()
                .find(|(key, _)| key.eq_ignore_ascii_case(name))
                .map(|(_, material)| material)
        })
    }

    pub fn len(&self) -> usize {
        self.materials.len()
    }

    pub fn is_empty(&self) -> bool {
        self.materials.is_empty()
    }
}

/// How objects without any `material` entry get one after parsing.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MaterialInheritance {
    /// Every materialless object gets its own default grey material.
    #[default]
    PerObject,
    /// Materialless objects copy the effective materials of their parent;
    /// top-level objects fall back to default grey.
    Ancestor,
}

/// One transform operation. Angles are radians.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub enum Transform {
    Translate(Vec3),
    EulerXyz(Vec3),
    FixedXyz(Vec3),
    /// Rotation given as three basis rows
    Rotation([Vec3; 3]),
}

impl Transform {
    /// Convert to a 4x4 transformation matrix.
    pub fn to_matrix(&self) -> Mat4 {
        match self {
            Transform::Translate(t) => Mat4::from_translation(*t),
            Transform::EulerXyz(angles) => Mat4::from_mat3(euler_xyz(*angles)),
            Transform::FixedXyz(angles) => Mat4::from_mat3(fixed_xyz(*angles)),
            Transform::Rotation(rows) => Mat4::from_mat3(from_basis_rows(*rows)),
        }
    }
}

/// Compose transforms by multiplying in declaration order (left to right).
///
/// The first declared transform is outermost: for `[Translate, EulerXyz]`
/// a point is rotated first and then translated, so the last declared
/// transform is the first applied to geometry.
pub fn compose_transforms(transforms: &[Transform]) -> Mat4 {
    let mut result = Mat4::IDENTITY;
    for op in transforms {
        result *= op.to_matrix();
    }
    result
}

/// Geometry carried by a view.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub enum Primitive {
    Box { center: Vec3, size: Vec3 },
    /// Y-axis cylinder centered on `center`
    Cylinder { center: Vec3, rx: f32, ry: f32, height: f32 },
    /// Ellipsoid centered at the object origin
    Sphere { rx: f32, ry: f32, rz: f32 },
    Mesh(Mesh),
    Lines(Lines),
}

impl Primitive {
    /// Bounds in object space.
    pub fn bounds(&self) -> Aabb {
        match self {
            Primitive::Box { center, size } => {
                let half = *size * 0.5;
                Aabb::from_points(*center - half, *center + half)
            }
            Primitive::Cylinder {
                center,
                rx,
                ry,
                height,
            } => {
                let half = Vec3::new(*rx, *height * 0.5, *ry).abs();
                Aabb::from_points(*center - half, *center + half)
            }
            Primitive::Sphere { rx, ry, rz } => {
                let r = Vec3::new(*rx, *ry, *rz).abs();
                Aabb::from_points(-r, r)
            }
            Primitive::Mesh(mesh) => mesh.bounds,
            Primitive::Lines(lines) => lines.bounds,
        }
    }

    /// Short keyword-style name, for summaries and logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Primitive::Box { .. } => "box",
            Primitive::Cylinder { .. } => "cylinder",
            Primitive::Sphere { .. } => "sphere",
            Primitive::Mesh(_) => "mesh",
            Primitive::Lines(_) => "lines",
        }
    }

    pub fn triangle_count(&self) -> usize {
        match self {
            Primitive::Mesh(mesh) => mesh.triangle_count(),
            _ => 0,
        }
    }
}

/// One renderable piece of geometry attached to an object.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct View {
    /// Author-supplied ordinal; opaque, not a sequence position
    pub index: Option<i64>,
    pub name: Option<String>,
    pub material_index: Option<i64>,
    pub texture_index: Option<i64>,
    pub texture_mode: Option<String>,

    /// Resolved against the owning object once parsing finishes
    pub material: Option<Material>,
    pub texture: Option<String>,

    pub primitive: Primitive,
}

impl View {
    pub fn new(primitive: Primitive) -> Self {
        Self {
            index: None,
            name: None,
            material_index: None,
            texture_index: None,
            texture_mode: None,
            material: None,
            texture: None,
            primitive,
        }
    }

    /// Attach the concrete material and texture this view refers to.
    ///
    /// A missing, negative or out-of-range index falls back to entry 0 of
    /// the owning object's sequence, when that sequence is non-empty.
    fn resolve(&mut self, materials: &[Material], textures: &[String]) {
        self.material = pick("material_index", self.material_index, materials).cloned();
        self.texture = pick("texture_index", self.texture_index, textures).cloned();
    }
}

fn pick<'a, T>(what: &str, index: Option<i64>, items: &'a [T]) -> Option<&'a T> {
    if let Some(i) = index {
        let found = usize::try_from(i).ok().and_then(|i| items.get(i));
        if found.is_some() {
            return found;
        }
        log::warn!(
            "{} {} out of range ({} available), using first entry",
            what,
            i,
            items.len()
        );
    }
    items.first()
}

/// Portal to another world. Recorded, never followed.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct Gateway {
    pub world: Option<String>,
    pub start: Option<Vec3>,
}

/// A node of the object tree.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct Object {
    pub id: Option<i64>,
    pub name: Option<String>,
    pub materials: Vec<Material>,
    pub textures: Vec<String>,
    /// Applied in declaration order
    pub transforms: Vec<Transform>,
    pub views: Vec<View>,
    pub children: Vec<Object>,
    pub gateways: Vec<Gateway>,
    /// Raw procedural script bodies, never evaluated
    pub scripts: Vec<String>,
}

impl Object {
    pub fn new() -> Self {
        Self::default()
    }

    /// Local transform matrix (transforms composed left to right).
    pub fn local_matrix(&self) -> Mat4 {
        compose_transforms(&self.transforms)
    }

    /// Union of this object's own view bounds, in object space.
    pub fn view_bounds(&self) -> Aabb {
        self.views.iter().fold(Aabb::EMPTY, |acc, view| {
            Aabb::surrounding(&acc, &view.primitive.bounds())
        })
    }

    /// Number of objects in this subtree, including itself.
    pub fn object_count(&self) -> usize {
        1 + self.children.iter().map(Object::object_count).sum::<usize>()
    }

    pub fn view_count(&self) -> usize {
        self.views.len() + self.children.iter().map(Object::view_count).sum::<usize>()
    }

    pub fn triangle_count(&self) -> usize {
        self.views
            .iter()
            .map(|v| v.primitive.triangle_count())
            .sum::<usize>()
            + self.children.iter().map(Object::triangle_count).sum::<usize>()
    }

    /// Depth-first search of this subtree by name.
    pub fn find(&self, name: &str) -> Option<&Object> {
        if self.name.as_deref() == Some(name) {
            return Some(self);
        }
        self.children.iter().find_map(|child| child.find(name))
    }

    fn finalize(&mut self, inheritance: MaterialInheritance, inherited: Option<&[Material]>) {
        if self.materials.is_empty() {
            match (inheritance, inherited) {
                (MaterialInheritance::Ancestor, Some(parent)) if !parent.is_empty() => {
                    self.materials = parent.to_vec();
                }
                _ => self.materials.push(Material::default()),
            }
        }

        let Object {
            materials,
            textures,
            views,
            children,
            ..
        } = self;

        for view in views.iter_mut() {
            view.resolve(materials, textures);
        }
        for child in children.iter_mut() {
            child.finalize(inheritance, Some(materials.as_slice()));
        }
    }
}

/// Global world settings. Absent properties keep these defaults.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct World {
    pub name: Option<String>,
    pub background: Vec3,
    pub start: Vec3,
    pub fog: Option<f32>,
    pub ambient: Vec3,
    pub light_color: Vec3,
    pub light_position: Vec3,
    pub terrain: Option<String>,
    /// Free text; repeated `info` entries are appended line by line
    pub info: Option<String>,
}

impl Default for World {
    fn default() -> Self {
        Self {
            name: None,
            background: Vec3::ZERO,
            start: Vec3::ZERO,
            fog: None,
            ambient: Vec3::splat(0.2),
            light_color: Vec3::ONE,
            light_position: Vec3::new(0.0, 10.0, 0.0),
            terrain: None,
            info: None,
        }
    }
}

/// A complete parsed world.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct Scene {
    pub world: World,

    /// Top-level objects in declaration order
    pub objects: Vec<Object>,
}

impl Scene {
    /// Create an empty scene with a default world.
    pub fn new() -> Self {
        Self::default()
    }

    /// Post-parse pass: give every materialless object a material and
    /// resolve each view's material and texture references.
    pub fn finalize(&mut self, inheritance: MaterialInheritance) {
        for object in &mut self.objects {
            object.finalize(inheritance, None);
        }
    }

    /// Get total object count, nested children included.
    pub fn object_count(&self) -> usize {
        self.objects.iter().map(Object::object_count).sum()
    }

    /// Get total view count across the whole tree.
    pub fn view_count(&self) -> usize {
        self.objects.iter().map(Object::view_count).sum()
    }

    /// Get total triangle count across all mesh views.
    pub fn triangle_count(&self) -> usize {
        self.objects.iter().map(Object::triangle_count).sum()
    }

    /// Find the first object with the given name, depth first.
    pub fn find_object(&self, name: &str) -> Option<&Object> {
        self.objects.iter().find_map(|object| object.find(name))
    }
}
