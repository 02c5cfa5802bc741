//! View and primitive grammar rules.
//!
//! ```text
//! view [ordinal] (name "s" | material_index n | texture_index n | texture_mode m)*
//!      ( '{' wrapper-props and exactly one primitive '}' | primitive )
//! ```
//!
//! Primitives:
//!
//! - `RBOX [v] x0 y0 z0 [v] x1 y1 z1`
//! - `CYL [v cx cy cz] rx ry height`
//! - `SPHERE rx [ry rz]`
//! - `N_POLY count v.. (count v..)*`
//! - `N_LINE count v..`, `LINE v a v b`
//! - `QUAD_GRID nx ny v c00 v c01 v c10 v c11`
//! - `indexed_poly { vertex_list {..} normal_list {..} texcoord_list {..}
//!   polylist {..} normal_index_list {..} texcoord_index_list {..} }`

use dive_math::Vec3;

use super::parser::{ParseError, ParseResult, VrParser};
use super::token::{Token, TokenKind};
use crate::geometry::{
    box_from_corners, fan_mesh, polyline, quad_grid, split_faces, uv_from_flat, vec3_from_flat,
    GeometryError, IndexedPoly,
};
use crate::mesh::Mesh;
use crate::scene::{Primitive, View};

const PRIMITIVES: &[&str] = &[
    "rbox",
    "cyl",
    "sphere",
    "n_poly",
    "n_line",
    "line",
    "quad_grid",
    "indexed_poly",
];

fn is_primitive(token: &Token) -> bool {
    token.kind == TokenKind::Identifier
        && PRIMITIVES.iter().any(|p| token.text.eq_ignore_ascii_case(p))
}

/// Wrapper properties collected around a view's primitive.
#[derive(Default)]
struct ViewProps {
    name: Option<String>,
    material_index: Option<i64>,
    texture_index: Option<i64>,
    texture_mode: Option<String>,
}

impl<'a> VrParser<'a> {
    /// `view` rule. `Ok(None)` when the view has no primitive.
    pub(super) fn view(&mut self) -> ParseResult<Option<View>> {
        let start = self.cursor.peek().clone();
        let index = if self.cursor.check(TokenKind::Number, None) {
            Some(self.cursor.integer()?)
        } else {
            None
        };

        let mut props = ViewProps::default();
        while self.view_property(&mut props)? {}

        let primitive = if self.cursor.check(TokenKind::LBrace, None) {
            self.block("view", |p| p.view_body(&mut props))?
        } else if is_primitive(self.cursor.peek()) {
            let keyword = self.cursor.next();
            Some(self.primitive(&keyword)?)
        } else {
            return Err(ParseError::unexpected(
                self.cursor.peek(),
                "view body or primitive",
            ));
        };

        let Some(primitive) = primitive else {
            self.warn(start.line, start.column, "view without a primitive dropped".to_string());
            return Ok(None);
        };

        match &primitive {
            Primitive::Mesh(mesh) => mesh.validate()?,
            Primitive::Lines(lines) => lines.validate()?,
            _ => {}
        }

        Ok(Some(View {
            index,
            name: props.name,
            material_index: props.material_index,
            texture_index: props.texture_index,
            texture_mode: props.texture_mode,
            material: None,
            texture: None,
            primitive,
        }))
    }

    /// Parse one wrapper property if present.
    fn view_property(&mut self, props: &mut ViewProps) -> ParseResult<bool> {
        self.cursor.skip_separators();
        let Some(keyword) = self.cursor.peek().keyword() else {
            return Ok(false);
        };

        match keyword.as_str() {
            "name" => {
                self.cursor.next();
                props.name = Some(self.cursor.string()?);
            }
            "material_index" => {
                self.cursor.next();
                props.material_index = Some(self.cursor.integer()?);
            }
            "texture_index" => {
                self.cursor.next();
                props.texture_index = Some(self.cursor.integer()?);
            }
            "texture_mode" => {
                self.cursor.next();
                match self.cursor.peek().kind {
                    TokenKind::Identifier | TokenKind::Number | TokenKind::String => {
                        props.texture_mode = Some(self.cursor.next().text);
                    }
                    _ => return Err(ParseError::unexpected(self.cursor.peek(), "texture mode")),
                }
            }
            _ => return Ok(false),
        }
        Ok(true)
    }

    fn view_body(&mut self, props: &mut ViewProps) -> ParseResult<Option<Primitive>> {
        let mut primitive = None;
        loop {
            if self.view_property(props)? {
                continue;
            }

            let token = self.cursor.peek().clone();
            match token.kind {
                TokenKind::RBrace | TokenKind::Eof => return Ok(primitive),
                TokenKind::Identifier if is_primitive(&token) => {
                    self.cursor.next();
                    let parsed = self.primitive(&token)?;
                    if primitive.is_none() {
                        primitive = Some(parsed);
                    } else {
                        self.warn(
                            token.line,
                            token.column,
                            format!("extra {} primitive in view ignored", token.text),
                        );
                    }
                }
                TokenKind::Identifier | TokenKind::Script => {
                    self.cursor.next();
                    self.skip_unknown(&token);
                }
                TokenKind::LBrace | TokenKind::LParen => {
                    self.cursor.skip_block();
                }
                _ => {
                    self.cursor.next();
                    self.stray(&token);
                }
            }
        }
    }

    /// Parse the primitive introduced by `keyword`.
    fn primitive(&mut self, keyword: &Token) -> ParseResult<Primitive> {
        let max_face_vertices = self.options.max_face_vertices;

        let primitive = match keyword.text.to_ascii_lowercase().as_str() {
            "rbox" => {
                let a = self.cursor.vector()?;
                let b = self.cursor.vector()?;
                let (center, size) = box_from_corners(a, b);
                Primitive::Box { center, size }
            }
            "cyl" => {
                let center = if self.cursor.check_keyword("v") {
                    self.cursor.vector()?
                } else {
                    Vec3::ZERO
                };
                Primitive::Cylinder {
                    center,
                    rx: self.cursor.f32()?,
                    ry: self.cursor.f32()?,
                    height: self.cursor.f32()?,
                }
            }
            "sphere" => {
                let rx = self.cursor.f32()?;
                let (ry, rz) = if self.cursor.check(TokenKind::Number, None) {
                    (self.cursor.f32()?, self.cursor.f32()?)
                } else {
                    (rx, rx)
                };
                Primitive::Sphere { rx, ry, rz }
            }
            "n_poly" => {
                let mut polygons = vec![self.points(Some(max_face_vertices))?];
                while self.cursor.check(TokenKind::Number, None) {
                    polygons.push(self.points(Some(max_face_vertices))?);
                }
                Primitive::Mesh(fan_mesh(&polygons, max_face_vertices)?)
            }
            "n_line" => Primitive::Lines(polyline(self.points(None)?)?),
            "line" => {
                let a = self.cursor.vector()?;
                let b = self.cursor.vector()?;
                Primitive::Lines(polyline(vec![a, b])?)
            }
            "quad_grid" => {
                let nx = self.cursor.integer()?;
                let ny = self.cursor.integer()?;
                let corners = [
                    self.cursor.vector()?,
                    self.cursor.vector()?,
                    self.cursor.vector()?,
                    self.cursor.vector()?,
                ];
                Primitive::Mesh(quad_grid(corners, nx, ny)?)
            }
            "indexed_poly" => Primitive::Mesh(self.indexed_poly()?),
            _ => return Err(ParseError::unexpected(keyword, "primitive")),
        };
        Ok(primitive)
    }

    /// `count` followed by that many vectors.
    fn points(&mut self, limit: Option<usize>) -> ParseResult<Vec<Vec3>> {
        let token = self.cursor.peek().clone();
        let count = self.cursor.integer()?;
        let count = usize::try_from(count).map_err(|_| ParseError::InvalidNumber {
            line: token.line,
            column: token.column,
            text: token.text.clone(),
        })?;
        if let Some(limit) = limit.filter(|&limit| count > limit) {
            return Err(GeometryError::FaceTooLarge { count, limit }.into());
        }

        let mut points = Vec::new();
        for _ in 0..count {
            points.push(self.cursor.vector()?);
        }
        Ok(points)
    }

    /// A bad list fails the whole primitive, so the enclosing view is
    /// dropped rather than built from the lists that did parse.
    fn indexed_poly(&mut self) -> ParseResult<Mesh> {
        let mut poly = IndexedPoly::default();
        self.block("indexed_poly", |p| loop {
            p.cursor.skip_separators();
            let token = p.cursor.peek().clone();
            match token.kind {
                TokenKind::RBrace | TokenKind::Eof => return Ok(()),
                TokenKind::Identifier | TokenKind::Script => {
                    p.cursor.next();
                    p.indexed_poly_list(&mut poly, &token)?;
                }
                TokenKind::LBrace | TokenKind::LParen => {
                    p.cursor.skip_block();
                }
                _ => {
                    p.cursor.next();
                    p.stray(&token);
                }
            }
        })?;
        Ok(poly.build(self.options.max_face_vertices, self.options.ear_epsilon)?)
    }

    fn indexed_poly_list(&mut self, poly: &mut IndexedPoly, token: &Token) -> ParseResult<()> {
        match token.keyword().as_deref() {
            Some("vertex_list") => {
                let values = self.number_list()?;
                poly.vertices.extend(vec3_from_flat(&values)?);
            }
            Some("normal_list") => {
                let values = self.number_list()?;
                poly.normals.extend(vec3_from_flat(&values)?);
            }
            Some("texcoord_list") => {
                let values = self.number_list()?;
                poly.texcoords.extend(uv_from_flat(&values)?);
            }
            Some("polylist") => {
                let list = self.index_list()?;
                poly.faces.extend(split_faces(&list));
            }
            Some("normal_index_list") => {
                let list = self.index_list()?;
                poly.normal_faces.extend(split_faces(&list));
            }
            Some("texcoord_index_list") => {
                let list = self.index_list()?;
                poly.texcoord_faces.extend(split_faces(&list));
            }
            _ => self.skip_unknown(token),
        }
        Ok(())
    }

    /// `{ n n n ... }`; `v` markers and separators are allowed.
    fn number_list(&mut self) -> ParseResult<Vec<f32>> {
        self.block("list", |p| {
            let mut values = Vec::new();
            loop {
                p.cursor.skip_separators();
                p.cursor.accept_keyword("v");
                if !p.cursor.check(TokenKind::Number, None) {
                    return Ok(values);
                }
                values.push(p.cursor.f32()?);
            }
        })
    }

    fn index_list(&mut self) -> ParseResult<Vec<i64>> {
        self.block("list", |p| {
            let mut values = Vec::new();
            loop {
                p.cursor.skip_separators();
                if !p.cursor.check(TokenKind::Number, None) {
                    return Ok(values);
                }
                values.push(p.cursor.integer()?);
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::{MaterialLibrary, Scene};
    use crate::vr::parser::Diagnostic;
    use crate::vr::ParseOptions;

    fn parse_with(text: &str, options: &ParseOptions) -> (Scene, Vec<Diagnostic>) {
        let _ = env_logger::builder().is_test(true).try_init();
        let library = MaterialLibrary::default();
        let mut scene = Scene::new();
        let mut parser = VrParser::new(text, options, &library);
        parser.parse_into(&mut scene).unwrap();
        (scene, parser.into_diagnostics())
    }

    fn parse(text: &str) -> (Scene, Vec<Diagnostic>) {
        parse_with(text, &ParseOptions::default())
    }

    fn single_view(text: &str) -> View {
        let (scene, diagnostics) = parse(text);
        assert!(diagnostics.is_empty(), "{:?}", diagnostics);
        assert_eq!(scene.objects[0].views.len(), 1);
        scene.objects[0].views[0].clone()
    }

    fn mesh(view: &View) -> &Mesh {
        match &view.primitive {
            Primitive::Mesh(mesh) => mesh,
            other => panic!("expected mesh, got {}", other.kind()),
        }
    }

    #[test]
    fn test_rbox_corner_order() {
        let a = single_view("object { view { RBOX v 2 -1 4 v 0 1 0 } }");
        let b = single_view("object { view { RBOX 0 1 0 2 -1 4 } }");

        assert_eq!(a.primitive, b.primitive);
        assert_eq!(
            a.primitive,
            Primitive::Box {
                center: Vec3::new(1.0, 0.0, 2.0),
                size: Vec3::new(2.0, 2.0, 4.0),
            }
        );
    }

    #[test]
    fn test_wrapper_properties() {
        let view = single_view(
            r#"object { view 3 name "lid" material_index 1 { texture_index 0 texture_mode modulate SPHERE 2 } }"#,
        );

        assert_eq!(view.index, Some(3));
        assert_eq!(view.name.as_deref(), Some("lid"));
        assert_eq!(view.material_index, Some(1));
        assert_eq!(view.texture_index, Some(0));
        assert_eq!(view.texture_mode.as_deref(), Some("modulate"));
        assert_eq!(view.primitive, Primitive::Sphere { rx: 2.0, ry: 2.0, rz: 2.0 });
    }

    #[test]
    fn test_inline_primitives() {
        let (scene, diagnostics) = parse(
            "object { view CYL v 0 1 0 0.5 0.5 2 view SPHERE 1 2 3 view LINE v 0 0 0 v 1 1 1 }",
        );

        assert!(diagnostics.is_empty());
        let views = &scene.objects[0].views;
        assert_eq!(views.len(), 3);
        assert_eq!(
            views[0].primitive,
            Primitive::Cylinder {
                center: Vec3::Y,
                rx: 0.5,
                ry: 0.5,
                height: 2.0,
            }
        );
        assert_eq!(views[1].primitive, Primitive::Sphere { rx: 1.0, ry: 2.0, rz: 3.0 });
        assert!(matches!(&views[2].primitive, Primitive::Lines(l) if l.segment_count() == 1));
    }

    #[test]
    fn test_n_poly_fan() {
        let view = single_view(
            "object { view { N_POLY 5 v 0 0 0 v 2 0 0 v 3 1 0 v 1 2 0 v -1 1 0 } }",
        );
        let mesh = mesh(&view);

        assert_eq!(mesh.triangle_count(), 3);
        for vertex in 0..5u32 {
            assert!(mesh.indices.contains(&vertex));
        }
    }

    #[test]
    fn test_n_poly_groups_merge() {
        let view = single_view(
            "object { view { N_POLY 3 v 0 0 0 v 1 0 0 v 0 1 0 4 v 0 0 1 v 1 0 1 v 1 1 1 v 0 1 1 } }",
        );
        let mesh = mesh(&view);

        assert_eq!(mesh.vertex_count(), 7);
        assert_eq!(mesh.triangle_count(), 3);
    }

    #[test]
    fn test_n_line_polyline() {
        let view = single_view("object { view { N_LINE 4 v 0 0 0 v 1 0 0 v 1 1 0 v 0 1 0 } }");
        match &view.primitive {
            Primitive::Lines(lines) => {
                assert_eq!(lines.segment_count(), 3);
                assert_eq!(lines.indices, vec![0, 1, 1, 2, 2, 3]);
            }
            other => panic!("expected lines, got {}", other.kind()),
        }
    }

    #[test]
    fn test_quad_grid() {
        let view = single_view(
            "object { view { QUAD_GRID 3 2 v 0 0 0 v 0 1 0 v 2 0 0 v 2 1 0 } }",
        );
        let mesh = mesh(&view);

        assert_eq!(mesh.vertex_count(), 6);
        assert_eq!(mesh.triangle_count(), 4);
        assert_eq!(mesh.positions[2], Vec3::new(1.0, 0.0, 0.0));
        assert!(mesh.has_uvs());
    }

    #[test]
    fn test_indexed_poly_triangle_and_quad() {
        let view = single_view(
            r#"
object {
    view {
        indexed_poly {
            vertex_list { v 0 0 0, v 1 0 0, v 1 1 0, v 0 1 0, v 2 0 0 }
            polylist { 0 1 4 -1 0 1 2 3 -1 }
        }
    }
}
"#,
        );
        let mesh = mesh(&view);

        assert_eq!(mesh.triangle_count(), 3);
        assert_eq!(mesh.vertex_count(), 5);
        assert!(!mesh.has_normals());
    }

    #[test]
    fn test_indexed_poly_with_normals_expands_corners() {
        let view = single_view(
            r#"
object {
    view {
        indexed_poly {
            vertex_list { 0 0 0 1 0 0 1 1 0 0 1 0 }
            normal_list { 0 0 1 }
            polylist { 0 1 2 3 }
            normal_index_list { 0 0 0 0 -1 }
        }
    }
}
"#,
        );
        let mesh = mesh(&view);

        assert_eq!(mesh.triangle_count(), 2);
        assert_eq!(mesh.vertex_count(), 6);
        let normals = mesh.normals.as_ref().unwrap();
        assert!(normals.iter().all(|&n| n == Vec3::Z));
    }

    #[test]
    fn test_missing_cylinder_height_keeps_siblings() {
        let (scene, diagnostics) = parse(
            r#"
object {
    view { RBOX v 0 0 0 v 1 1 1 }
    view { CYL 1 2 }
    view { SPHERE 3 }
}
"#,
        );

        let views = &scene.objects[0].views;
        assert_eq!(views.len(), 2);
        assert!(matches!(views[0].primitive, Primitive::Box { .. }));
        assert!(matches!(views[1].primitive, Primitive::Sphere { .. }));
        assert_eq!(diagnostics.len(), 1);
    }

    #[test]
    fn test_view_without_primitive_dropped() {
        let (scene, diagnostics) = parse("object { view { name \"ghost\" } view RBOX 0 0 0 1 1 1 }");

        assert_eq!(scene.objects[0].views.len(), 1);
        assert_eq!(diagnostics.len(), 1);
        assert!(diagnostics[0].message.contains("without a primitive"));
    }

    #[test]
    fn test_extra_primitive_ignored() {
        let (scene, diagnostics) = parse("object { view { SPHERE 1 SPHERE 2 } }");

        assert_eq!(
            scene.objects[0].views[0].primitive,
            Primitive::Sphere { rx: 1.0, ry: 1.0, rz: 1.0 }
        );
        assert_eq!(diagnostics.len(), 1);
    }

    #[test]
    fn test_ragged_vertex_list_drops_view() {
        let (scene, diagnostics) = parse(
            r#"
object {
    view { indexed_poly { vertex_list { 0 0 0 1 0 } polylist { 0 1 2 -1 } } }
    view { SPHERE 1 }
}
"#,
        );

        assert_eq!(scene.objects[0].views.len(), 1);
        assert_eq!(diagnostics.len(), 1);
        assert!(diagnostics[0].message.contains("5 coordinates"), "{}", diagnostics[0].message);
    }

    #[test]
    fn test_ragged_normal_list_drops_view() {
        let (scene, diagnostics) = parse(
            r#"
object {
    view {
        indexed_poly {
            vertex_list { 0 0 0 1 0 0 0 1 0 }
            normal_list { 0 0 1 0 }
            polylist { 0 1 2 -1 }
        }
    }
    view { SPHERE 1 }
}
"#,
        );

        let views = &scene.objects[0].views;
        assert_eq!(views.len(), 1);
        assert!(matches!(views[0].primitive, Primitive::Sphere { .. }));
        assert_eq!(diagnostics.len(), 1);
        assert!(diagnostics[0].message.contains("3-component"), "{}", diagnostics[0].message);
    }

    #[test]
    fn test_ragged_vertex_list_without_faces_drops_view() {
        let (scene, diagnostics) = parse(
            "object { view { indexed_poly { vertex_list { 0 0 0 1 0 0 0 1 0 9 } } } }",
        );

        assert!(scene.objects[0].views.is_empty());
        assert_eq!(diagnostics.len(), 1);
    }

    #[test]
    fn test_ragged_texcoord_list_drops_inline_view() {
        let (scene, diagnostics) = parse(
            r#"
object "a" {
    view indexed_poly { vertex_list { 0 0 0 1 0 0 0 1 0 } texcoord_list { 0 0 1 } polylist { 0 1 2 } }
}
object "b" { }
"#,
        );

        assert_eq!(scene.objects.len(), 2);
        assert!(scene.objects[0].views.is_empty());
        assert_eq!(diagnostics.len(), 1);
    }

    #[test]
    fn test_missing_texture_mode_keeps_object_closed() {
        let (scene, diagnostics) = parse(r#"object "a" { view texture_mode } object "b" { }"#);

        assert_eq!(scene.objects.len(), 2);
        assert!(scene.objects[0].children.is_empty());
        assert!(scene.objects[0].views.is_empty());
        assert_eq!(scene.objects[1].name.as_deref(), Some("b"));
        assert_eq!(diagnostics.len(), 1);
        assert!(diagnostics[0].message.contains("texture mode"), "{}", diagnostics[0].message);
    }

    #[test]
    fn test_face_limit() {
        let options = ParseOptions {
            max_face_vertices: 4,
            ..Default::default()
        };
        let (scene, diagnostics) = parse_with(
            "object { view { N_POLY 5 v 0 0 0 v 2 0 0 v 3 1 0 v 1 2 0 v -1 1 0 } view { SPHERE 1 } }",
            &options,
        );

        assert_eq!(scene.objects[0].views.len(), 1);
        assert_eq!(diagnostics.len(), 1);
        assert!(diagnostics[0].message.contains("limit is 4"), "{}", diagnostics[0].message);
    }

    #[test]
    fn test_invalid_grid_drops_view() {
        let (scene, diagnostics) = parse(
            "object { view { QUAD_GRID 0 2 v 0 0 0 v 0 1 0 v 1 0 0 v 1 1 0 } }",
        );

        assert!(scene.objects[0].views.is_empty());
        assert_eq!(diagnostics.len(), 1);
    }
}
