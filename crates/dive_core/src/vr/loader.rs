//! High-level `.vr` loading.
//!
//! Entry points that run the parser, apply the post-parse material pass
//! and hand back a finished [`Scene`]. Parsing never fails outright: the
//! caller always gets a scene, plus the diagnostics collected on the way.

use std::path::Path;

use thiserror::Error;

use super::options::ParseOptions;
use super::parser::{Diagnostic, ParseError, Severity, VrParser};
use crate::scene::{MaterialLibrary, Scene};

/// Errors that can occur while loading a `.vr` file from disk.
#[derive(Error, Debug)]
pub enum LoadError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for loading operations.
pub type LoadResult<T> = Result<T, LoadError>;

/// Everything one parse call produces.
#[derive(Clone, Debug)]
pub struct ParseOutcome {
    pub scene: Scene,

    /// Recovered problems, in source order, then the fatal error if any
    pub diagnostics: Vec<Diagnostic>,

    /// The error that aborted the parse, if one did
    pub fatal: Option<ParseError>,
}

impl ParseOutcome {
    pub fn warning_count(&self) -> usize {
        self.diagnostics
            .iter()
            .filter(|d| d.severity == Severity::Warning)
            .count()
    }
}

/// A scene with a default world and no objects.
pub fn make_empty_scene() -> Scene {
    Scene::new()
}

/// Parse `text` into `scene` with default options and return it.
///
/// Problems are logged, never raised; on a fatal error the partially
/// populated scene is returned.
pub fn parse_into(scene: Scene, text: &str) -> Scene {
    parse_document_into(scene, text, &ParseOptions::default(), &MaterialLibrary::default()).scene
}

/// Parse `text` into a fresh scene.
pub fn parse_document(text: &str, options: &ParseOptions, library: &MaterialLibrary) -> ParseOutcome {
    parse_document_into(make_empty_scene(), text, options, library)
}

/// Parse `text` into `scene`, then give every materialless object a
/// material and resolve view material/texture references.
pub fn parse_document_into(
    mut scene: Scene,
    text: &str,
    options: &ParseOptions,
    library: &MaterialLibrary,
) -> ParseOutcome {
    let mut parser = VrParser::new(text, options, library);
    let fatal = match parser.parse_into(&mut scene) {
        Ok(()) => None,
        Err(err) => {
            log::error!("Parse aborted: {}", err);
            Some(err)
        }
    };
    let mut diagnostics = parser.into_diagnostics();

    if let Some(err) = &fatal {
        let (line, column) = err.location().unwrap_or((0, 0));
        diagnostics.push(Diagnostic {
            severity: Severity::Error,
            line,
            column,
            message: err.to_string(),
        });
    }

    scene.finalize(options.material_inheritance);

    log::info!(
        "Parsed {} objects, {} views, {} triangles ({} diagnostics)",
        scene.object_count(),
        scene.view_count(),
        scene.triangle_count(),
        diagnostics.len()
    );

    ParseOutcome {
        scene,
        diagnostics,
        fatal,
    }
}

/// Load and parse a `.vr` file. Includes and inlined sub-worlds are not
/// followed.
///
/// # Example
///
/// ```ignore
/// use dive_core::vr::{load_vr, ParseOptions};
/// use dive_core::scene::MaterialLibrary;
///
/// let outcome = load_vr("world.vr", &ParseOptions::default(), &MaterialLibrary::new())?;
/// println!("Loaded {} objects", outcome.scene.object_count());
/// ```
pub fn load_vr<P: AsRef<Path>>(
    path: P,
    options: &ParseOptions,
    library: &MaterialLibrary,
) -> LoadResult<ParseOutcome> {
    let path = path.as_ref();
    log::info!("Loading {}", path.display());
    let text = std::fs::read_to_string(path)?;
    Ok(parse_document(&text, options, library))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::{Material, MaterialInheritance, Primitive};
    use dive_math::Vec3;

    fn assert_vec3_near(actual: Vec3, expected: Vec3) {
        assert!(
            (actual - expected).length() < 1e-6,
            "expected {:?}, got {:?}",
            expected,
            actual
        );
    }

    #[test]
    fn test_world_scenario() {
        let scene = parse_into(
            make_empty_scene(),
            r#"world "T" { background 0.1 0.2 0.3; start v 1 2 3 }"#,
        );

        assert_eq!(scene.world.name.as_deref(), Some("T"));
        assert_vec3_near(scene.world.background, Vec3::new(0.1, 0.2, 0.3));
        assert_vec3_near(scene.world.start, Vec3::new(1.0, 2.0, 3.0));
    }

    #[test]
    fn test_rgb_box_scenario() {
        let outcome = parse_document(
            "object { material rgb 1 0 0 view { RBOX v -1 -1 -1 v 1 1 1 } } }",
            &ParseOptions::default(),
            &MaterialLibrary::default(),
        );

        assert!(outcome.fatal.is_none());
        let scene = &outcome.scene;
        assert_eq!(scene.objects.len(), 1);

        let object = &scene.objects[0];
        assert_eq!(object.materials.len(), 1);
        assert_eq!(object.materials[0].diffuse, Vec3::new(1.0, 0.0, 0.0));
        assert_eq!(object.views.len(), 1);
        assert_eq!(
            object.views[0].primitive,
            Primitive::Box {
                center: Vec3::ZERO,
                size: Vec3::splat(2.0),
            }
        );
        // No material_index: the object's first material is attached
        assert_eq!(object.views[0].material.as_ref(), Some(&object.materials[0]));
    }

    #[test]
    fn test_malformed_cylinder_scenario() {
        let outcome = parse_document(
            r#"
object "pillars" {
    view { CYL 0.5 0.5 }
    view { CYL 0.5 0.5 3 }
    view RBOX 0 0 0 1 1 1
}
object "after" { }
"#,
            &ParseOptions::default(),
            &MaterialLibrary::default(),
        );

        assert!(outcome.fatal.is_none());
        assert_eq!(outcome.warning_count(), 1);
        assert_eq!(outcome.scene.objects.len(), 2);
        let views = &outcome.scene.objects[0].views;
        assert_eq!(views.len(), 2);
        assert!(matches!(views[0].primitive, Primitive::Cylinder { height, .. } if height == 3.0));
    }

    #[test]
    fn test_unknown_top_level_construct() {
        let outcome = parse_document(
            "foo { bar 1 2 3 } world { background 0.1 0.2 0.3 }",
            &ParseOptions::default(),
            &MaterialLibrary::default(),
        );

        assert!(outcome.fatal.is_none());
        assert!(outcome.diagnostics.is_empty());
        assert_vec3_near(outcome.scene.world.background, Vec3::new(0.1, 0.2, 0.3));
    }

    #[test]
    fn test_default_material_injection() {
        let scene = parse_into(
            make_empty_scene(),
            "object { view SPHERE 1 object { view SPHERE 2 } }",
        );

        let parent = &scene.objects[0];
        assert_eq!(parent.materials.len(), 1);
        assert_eq!(parent.materials[0].diffuse, Material::default().diffuse);
        assert_eq!(parent.children[0].materials.len(), 1);
        assert_eq!(parent.children[0].materials[0].diffuse, Vec3::splat(0.5));
    }

    #[test]
    fn test_ancestor_inheritance_option() {
        let options = ParseOptions {
            material_inheritance: MaterialInheritance::Ancestor,
            ..Default::default()
        };
        let outcome = parse_document(
            "object { material rgb 0 1 0 object { view SPHERE 1 } }",
            &options,
            &MaterialLibrary::default(),
        );

        let child = &outcome.scene.objects[0].children[0];
        assert_eq!(child.materials[0].diffuse, Vec3::Y);
        assert_eq!(child.views[0].material.as_ref().unwrap().diffuse, Vec3::Y);
    }

    #[test]
    fn test_material_index_resolution() {
        let scene = parse_into(
            make_empty_scene(),
            r#"
object {
    material rgb 1 0 0
    material rgb 0 0 1
    texture "a.rgb"
    view material_index 1 { SPHERE 1 }
    view material_index 5 texture_index 2 { SPHERE 1 }
}
"#,
        );

        let views = &scene.objects[0].views;
        assert_eq!(views[0].material.as_ref().unwrap().diffuse, Vec3::Z);
        assert_eq!(views[1].material.as_ref().unwrap().diffuse, Vec3::X);
        assert_eq!(views[1].texture.as_deref(), Some("a.rgb"));
    }

    #[test]
    fn test_parse_twice_is_identical() {
        let text = r#"
world "twice" { background 0 0 1 }
object "a" {
    material { diffuse 0.2 0.4 0.6 }
    translation 1 0 0
    view { indexed_poly { vertex_list { 0 0 0 2 0 0 2 1 0 1 1 0 1 2 0 0 2 0 } polylist { 0 1 2 3 4 5 -1 } } }
    view { QUAD_GRID 2 2 v 0 0 0 v 0 1 0 v 1 0 0 v 1 1 0 }
    object "b" { view LINE 0 0 0 1 1 1 }
}
"#;
        let first = parse_into(make_empty_scene(), text);
        let second = parse_into(make_empty_scene(), text);

        assert_eq!(first, second);
        assert_eq!(first.object_count(), 2);
        assert_eq!(first.triangle_count(), 4 + 2);
    }

    #[test]
    fn test_fatal_error_keeps_partial_scene() {
        let options = ParseOptions {
            max_depth: 3,
            ..Default::default()
        };
        let text = format!("object \"kept\" {{ }} {}", "object { ".repeat(8));
        let outcome = parse_document(&text, &options, &MaterialLibrary::default());

        assert!(matches!(outcome.fatal, Some(ParseError::TooDeeplyNested { .. })));
        assert_eq!(outcome.scene.objects.len(), 1);
        assert_eq!(outcome.scene.objects[0].materials.len(), 1);
        let last = outcome.diagnostics.last().unwrap();
        assert_eq!(last.severity, Severity::Error);
    }

    #[test]
    fn test_scene_serializes_to_json() {
        let scene = parse_into(make_empty_scene(), "object \"a\" { view RBOX 0 0 0 1 1 1 }");
        let json = serde_json::to_value(&scene).unwrap();

        assert_eq!(json["objects"][0]["name"], "a");
        assert!(json["objects"][0]["views"][0]["primitive"]["Box"].is_object());
    }

    #[test]
    fn test_load_vr_from_disk() {
        let path = std::env::temp_dir().join(format!("dive_core_loader_{}.vr", std::process::id()));
        std::fs::write(&path, "object \"disk\" { view SPHERE 1 }").unwrap();

        let outcome = load_vr(&path, &ParseOptions::default(), &MaterialLibrary::default()).unwrap();
        std::fs::remove_file(&path).ok();

        assert!(outcome.scene.find_object("disk").is_some());
    }

    #[test]
    fn test_load_vr_missing_file() {
        let result = load_vr(
            "/nonexistent/world.vr",
            &ParseOptions::default(),
            &MaterialLibrary::default(),
        );
        assert!(matches!(result, Err(LoadError::Io(_))));
    }
}
