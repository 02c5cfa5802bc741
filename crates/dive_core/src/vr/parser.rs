//! Recursive-descent parser for `.vr` worlds.
//!
//! One rule per construct; each rule runs after its keyword has been
//! consumed and reads through its own closing brace. An error inside a
//! single member (a property, material, view, child object) is logged,
//! recorded as a [`Diagnostic`] and skipped, and parsing resumes at the
//! next sibling. Only [`ParseError::TooDeeplyNested`] aborts the parse.
//!
//! # Supported Syntax
//!
//! - `world ["name"] { background .. start .. fog .. ambient .. light_color ..
//!   light_position .. terrain "..." info "..." }`
//! - `object ["name"] { id .. name .. material .. texture .. translation ..
//!   eulerxyz .. fixedxyz .. rotation .. view .. object .. gateway .. }`
//! - `material "name"`, `material rgb r g b`, `material ["name"] { ambient ..
//!   diffuse .. emission .. specular .. spec_power .. transparency .. }`
//! - views and primitives, see the `view` rules
//!
//! Unknown keywords anywhere are skipped together with their value.

use std::fmt;

use dive_math::Vec3;
use serde::Serialize;
use thiserror::Error;

use super::cursor::TokenCursor;
use super::lexer::tokenize;
use super::options::ParseOptions;
use super::token::{Token, TokenKind};
use crate::geometry::GeometryError;
use crate::scene::{Gateway, Material, MaterialLibrary, Object, Scene, Transform, World};

/// Errors that can occur during `.vr` parsing.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ParseError {
    #[error("line {line}, column {column}: expected {expected}, found {found}")]
    UnexpectedToken {
        line: usize,
        column: usize,
        expected: String,
        found: String,
    },

    #[error("unexpected end of input, expected {expected}")]
    UnexpectedEof { expected: String },

    #[error("line {line}, column {column}: invalid number '{text}'")]
    InvalidNumber {
        line: usize,
        column: usize,
        text: String,
    },

    #[error("line {line}: blocks nested deeper than {limit} levels")]
    TooDeeplyNested { line: usize, limit: usize },

    #[error("invalid geometry: {0}")]
    Geometry(#[from] GeometryError),
}

impl ParseError {
    /// Error for `token` where `expected` was required.
    pub fn unexpected(token: &Token, expected: impl Into<String>) -> Self {
        let expected = expected.into();
        if token.is_eof() {
            ParseError::UnexpectedEof { expected }
        } else {
            ParseError::UnexpectedToken {
                line: token.line,
                column: token.column,
                expected,
                found: token.describe(),
            }
        }
    }

    /// Fatal errors abort the whole parse instead of one construct.
    pub fn is_fatal(&self) -> bool {
        matches!(self, ParseError::TooDeeplyNested { .. })
    }

    pub fn location(&self) -> Option<(usize, usize)> {
        match self {
            ParseError::UnexpectedToken { line, column, .. }
            | ParseError::InvalidNumber { line, column, .. } => Some((*line, *column)),
            ParseError::TooDeeplyNested { line, .. } => Some((*line, 1)),
            _ => None,
        }
    }
}

/// Result type for parsing operations.
pub type ParseResult<T> = Result<T, ParseError>;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Warning,
    Error,
}

/// A recovered (or fatal) problem found while parsing.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Diagnostic {
    pub severity: Severity,
    pub line: usize,
    pub column: usize,
    pub message: String,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let severity = match self.severity {
            Severity::Warning => "warning",
            Severity::Error => "error",
        };
        write!(f, "{}:{}: {}: {}", self.line, self.column, severity, self.message)
    }
}

/// `.vr` document parser.
pub struct VrParser<'a> {
    pub(super) cursor: TokenCursor,
    pub(super) options: &'a ParseOptions,
    library: &'a MaterialLibrary,
    depth: usize,
    diagnostics: Vec<Diagnostic>,
}

impl<'a> VrParser<'a> {
    /// Tokenize `text` and prepare to parse it.
    pub fn new(text: &str, options: &'a ParseOptions, library: &'a MaterialLibrary) -> Self {
        Self {
            cursor: TokenCursor::new(tokenize(text)),
            options,
            library,
            depth: 0,
            diagnostics: Vec::new(),
        }
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    pub fn into_diagnostics(self) -> Vec<Diagnostic> {
        self.diagnostics
    }

    /// Parse the whole document into `scene`.
    ///
    /// On a fatal error everything parsed so far stays in `scene`.
    pub fn parse_into(&mut self, scene: &mut Scene) -> ParseResult<()> {
        loop {
            self.cursor.skip_separators();
            let token = self.cursor.peek().clone();
            match token.kind {
                TokenKind::Eof => return Ok(()),
                TokenKind::LBrace | TokenKind::LParen => {
                    log::debug!("skipping stray block at line {}", token.line);
                    self.cursor.skip_block();
                }
                TokenKind::Identifier | TokenKind::Script => {
                    self.cursor.next();
                    match token.keyword().as_deref() {
                        Some("world") => {
                            let result = self.world(&mut scene.world);
                            self.recover("world", result)?;
                        }
                        Some("object") => {
                            let result = self.object();
                            if let Some(object) = self.recover("object", result)? {
                                scene.objects.push(object);
                            }
                        }
                        _ => self.skip_unknown(&token),
                    }
                }
                _ => {
                    self.cursor.next();
                    self.stray(&token);
                }
            }
        }
    }

    // ----- recovery helpers -----

    /// Turn a local error into a warning; fatal errors pass through.
    pub(super) fn recover<T>(&mut self, what: &str, result: ParseResult<T>) -> ParseResult<Option<T>> {
        match result {
            Ok(value) => Ok(Some(value)),
            Err(err) if err.is_fatal() => Err(err),
            Err(err) => {
                let (line, column) = err.location().unwrap_or_else(|| self.here());
                self.warn(line, column, format!("skipped {}: {}", what, err));
                Ok(None)
            }
        }
    }

    pub(super) fn warn(&mut self, line: usize, column: usize, message: String) {
        log::warn!("line {}: {}", line, message);
        self.diagnostics.push(Diagnostic {
            severity: Severity::Warning,
            line,
            column,
            message,
        });
    }

    pub(super) fn stray(&mut self, token: &Token) {
        self.warn(token.line, token.column, format!("ignoring unexpected {}", token.describe()));
    }

    pub(super) fn skip_unknown(&mut self, token: &Token) {
        if token.kind == TokenKind::Script {
            log::debug!("ignoring script block at line {}", token.line);
            return;
        }
        log::debug!("skipping unknown keyword '{}' at line {}", token.text, token.line);
        self.cursor.skip_value();
    }

    fn here(&self) -> (usize, usize) {
        let token = self.cursor.peek();
        (token.line, token.column)
    }

    // ----- blocks -----

    /// Parse a `{ ... }` block with `body`.
    ///
    /// Enforces the nesting limit. On a local error the whole block is
    /// skipped before the error is returned, so the caller resumes after it.
    /// A block left open at end of input is only a warning.
    pub(super) fn block<T>(
        &mut self,
        what: &str,
        body: impl FnOnce(&mut Self) -> ParseResult<T>,
    ) -> ParseResult<T> {
        let start = self.cursor.position();
        let open = self.cursor.expect(TokenKind::LBrace, None)?;

        if self.depth >= self.options.max_depth {
            self.cursor.rewind(start);
            self.cursor.skip_block();
            return Err(ParseError::TooDeeplyNested {
                line: open.line,
                limit: self.options.max_depth,
            });
        }

        self.depth += 1;
        let result = body(self).and_then(|value| {
            self.close_block(what, &open)?;
            Ok(value)
        });
        self.depth -= 1;

        if let Err(err) = &result {
            if !err.is_fatal() {
                self.cursor.rewind(start);
                self.cursor.skip_block();
            }
        }
        result
    }

    fn close_block(&mut self, what: &str, open: &Token) -> ParseResult<()> {
        if self.cursor.accept(TokenKind::RBrace, None).is_some() {
            return Ok(());
        }
        if self.cursor.is_eof() {
            self.warn(
                open.line,
                open.column,
                format!("{} block opened here is never closed", what),
            );
            return Ok(());
        }
        Err(ParseError::unexpected(self.cursor.peek(), "'}'"))
    }

    /// Run `member` for each keyword of a block body until its closing
    /// brace. Each member recovers on its own.
    pub(super) fn members(
        &mut self,
        mut member: impl FnMut(&mut Self, &Token) -> ParseResult<()>,
    ) -> ParseResult<()> {
        loop {
            self.cursor.skip_separators();
            let token = self.cursor.peek().clone();
            match token.kind {
                TokenKind::RBrace | TokenKind::Eof => return Ok(()),
                TokenKind::Identifier | TokenKind::Script => {
                    self.cursor.next();
                    let result = member(self, &token);
                    self.recover(&token.text, result)?;
                }
                TokenKind::LBrace | TokenKind::LParen => {
                    log::debug!("skipping anonymous block at line {}", token.line);
                    self.cursor.skip_block();
                }
                _ => {
                    self.cursor.next();
                    self.stray(&token);
                }
            }
        }
    }

    fn color(&mut self) -> ParseResult<Vec3> {
        Ok(self.cursor.vector()?.clamp(Vec3::ZERO, Vec3::ONE))
    }

    // ----- world -----

    fn world(&mut self, world: &mut World) -> ParseResult<()> {
        if let Some(name) = self.cursor.accept(TokenKind::String, None) {
            world.name = Some(name.text);
        }
        self.block("world", |p| p.members(|p, token| p.world_property(world, token)))
    }

    fn world_property(&mut self, world: &mut World, token: &Token) -> ParseResult<()> {
        match token.keyword().as_deref() {
            Some("background") => world.background = self.color()?,
            Some("start") => world.start = self.cursor.vector()?,
            Some("fog") => world.fog = Some(self.cursor.f32()?),
            Some("ambient") => world.ambient = self.color()?,
            Some("light_color") | Some("light") => world.light_color = self.color()?,
            Some("light_position") => world.light_position = self.cursor.vector()?,
            Some("terrain") => world.terrain = Some(self.cursor.string()?),
            Some("info") => {
                let text = self.cursor.string()?;
                match &mut world.info {
                    Some(info) => {
                        info.push('\n');
                        info.push_str(&text);
                    }
                    None => world.info = Some(text),
                }
            }
            _ => self.skip_unknown(token),
        }
        Ok(())
    }

    // ----- objects -----

    pub(super) fn object(&mut self) -> ParseResult<Object> {
        let mut object = Object::new();
        if let Some(name) = self.cursor.accept(TokenKind::String, None) {
            object.name = Some(name.text);
        }
        self.block("object", |p| {
            p.members(|p, token| p.object_member(&mut object, token))
        })?;
        Ok(object)
    }

    fn object_member(&mut self, object: &mut Object, token: &Token) -> ParseResult<()> {
        if token.kind == TokenKind::Script {
            object.scripts.push(token.text.clone());
            return Ok(());
        }

        match token.keyword().as_deref() {
            Some("id") => object.id = Some(self.cursor.integer()?),
            Some("name") => object.name = Some(self.cursor.string()?),
            Some("material") => {
                let material = self.material()?;
                object.materials.push(material);
            }
            Some("texture") => object.textures.push(self.cursor.string()?),
            Some("translation") => {
                let t = self.cursor.vector()?;
                object.transforms.push(Transform::Translate(t));
            }
            Some("eulerxyz") => {
                let angles = self.cursor.vector()?;
                object.transforms.push(Transform::EulerXyz(angles));
            }
            Some("fixedxyz") => {
                let angles = self.cursor.vector()?;
                object.transforms.push(Transform::FixedXyz(angles));
            }
            Some("rotation") => {
                let rows = [self.cursor.vector()?, self.cursor.vector()?, self.cursor.vector()?];
                object.transforms.push(Transform::Rotation(rows));
            }
            Some("view") => {
                if let Some(view) = self.view()? {
                    object.views.push(view);
                }
            }
            Some("object") => {
                let child = self.object()?;
                object.children.push(child);
            }
            Some("gateway") => {
                let gateway = self.gateway()?;
                object.gateways.push(gateway);
            }
            _ => self.skip_unknown(token),
        }
        Ok(())
    }

    // ----- materials -----

    fn material(&mut self) -> ParseResult<Material> {
        if self.cursor.accept_keyword("rgb") {
            return Ok(Material::rgb(self.cursor.vector()?));
        }

        let name = self.cursor.accept(TokenKind::String, None);
        if self.cursor.check(TokenKind::LBrace, None) {
            let mut material = Material {
                name: name.map(|t| t.text),
                ..Default::default()
            };
            self.block("material", |p| {
                p.members(|p, token| p.material_property(&mut material, token))
            })?;
            material.clamp_ranges();
            return Ok(material);
        }

        match name {
            Some(name) => Ok(self.named_material(name)),
            None => Err(ParseError::unexpected(
                self.cursor.peek(),
                "material name, 'rgb' or '{'",
            )),
        }
    }

    fn named_material(&mut self, name: Token) -> Material {
        if let Some(material) = self.library.get(&name.text) {
            return Material {
                name: Some(name.text),
                ..material.clone()
            };
        }
        self.warn(
            name.line,
            name.column,
            format!("unknown material \"{}\", using default grey", name.text),
        );
        Material {
            name: Some(name.text),
            ..Default::default()
        }
    }

    fn material_property(&mut self, material: &mut Material, token: &Token) -> ParseResult<()> {
        match token.keyword().as_deref() {
            Some("ambient") => material.ambient = self.cursor.vector()?,
            Some("diffuse") => material.diffuse = self.cursor.vector()?,
            Some("emission") => material.emission = self.cursor.vector()?,
            Some("specular") => material.specular = self.cursor.vector()?,
            Some("spec_power") => material.spec_power = self.cursor.f32()?,
            Some("transparency") => material.transparency = self.cursor.f32()?,
            _ => self.skip_unknown(token),
        }
        Ok(())
    }

    // ----- gateways -----

    fn gateway(&mut self) -> ParseResult<Gateway> {
        let mut gateway = Gateway::default();
        if let Some(world) = self.cursor.accept(TokenKind::String, None) {
            gateway.world = Some(world.text);
        }
        if self.cursor.check(TokenKind::LBrace, None) {
            self.block("gateway", |p| {
                p.members(|p, token| {
                    match token.keyword().as_deref() {
                        Some("world") => gateway.world = Some(p.cursor.string()?),
                        Some("start") => gateway.start = Some(p.cursor.vector()?),
                        _ => p.skip_unknown(token),
                    }
                    Ok(())
                })
            })?;
        }
        Ok(gateway)
    }
}
