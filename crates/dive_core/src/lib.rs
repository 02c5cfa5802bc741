//! DIVE Core - scene graph and `.vr` world loading.
//!
//! This crate provides:
//!
//! - **Scene graph types**: `Scene`, `World`, `Object`, `View`, `Material`
//! - **Geometry builders**: boxes, fans, quad grids, ear clipping
//! - **`.vr` support**: lexer, recursive-descent parser and loader
//!
//! # Example
//!
//! ```ignore
//! use dive_core::vr::{load_vr, ParseOptions};
//! use dive_core::scene::MaterialLibrary;
//!
//! let outcome = load_vr("world.vr", &ParseOptions::default(), &MaterialLibrary::new())?;
//! println!("Loaded {} objects, {} views",
//!     outcome.scene.object_count(),
//!     outcome.scene.view_count());
//! ```

pub mod geometry;
pub mod mesh;
pub mod scene;
pub mod vr;

// Re-export commonly used types
pub use mesh::{Lines, Mesh};
pub use scene::{Material, MaterialLibrary, Object, Primitive, Scene, Transform, View, World};
pub use vr::{load_vr, make_empty_scene, parse_document, parse_into, ParseOptions, ParseOutcome};
