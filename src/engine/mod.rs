//! Template engine capability consumed by the harness.
//!
//! The harness never parses or compiles templates itself. It asks an engine
//! for option presets, compiles each variant once through [`TemplateEngine::compile`]
//! and binds the result to its context with [`TemplateFactory::bind`]. Only
//! [`BoundTemplate::instantiate`] and [`Renderable::render`] run inside the timed region.

#[cfg(feature = "minijinja")]
pub mod jinja;

use std::collections::BTreeMap;
use std::rc::Rc;

use serde_json::Value;

use crate::errors::BenchError;
use crate::types::OptLevel;

/// Analyzer options for one compilation.
///
/// Records are immutable; variants derive their options through copy-with-override
/// constructors so no two compilations share mutable state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalyzerOptions {
    level: OptLevel,
    baked_mode: bool,
    generate_unicode: bool,
    settings: BTreeMap<&'static str, bool>,
}

impl AnalyzerOptions {
    /// Plain preset for `level`: not baked, unicode generation on, no engine settings.
    pub fn preset(level: OptLevel) -> Self {
        Self {
            level,
            baked_mode: false,
            generate_unicode: true,
            settings: BTreeMap::new(),
        }
    }

    /// Copy with an engine-private switch set.
    pub fn with_setting(&self, key: &'static str, enabled: bool) -> Self {
        let mut settings = self.settings.clone();
        settings.insert(key, enabled);
        Self {
            settings,
            ..self.clone()
        }
    }

    /// Copy with baked mode on and unicode generation off.
    pub fn baked(&self) -> Self {
        Self {
            baked_mode: true,
            generate_unicode: false,
            ..self.clone()
        }
    }

    pub fn level(&self) -> OptLevel {
        self.level
    }

    pub fn baked_mode(&self) -> bool {
        self.baked_mode
    }

    pub fn generate_unicode(&self) -> bool {
        self.generate_unicode
    }

    /// Engine-private switch; unset keys read as `false`.
    pub fn setting(&self, key: &str) -> bool {
        self.settings.get(key).copied().unwrap_or(false)
    }
}

/// Code generation options.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompilerOptions {
    pub enable_filters: bool,
}

impl CompilerOptions {
    pub fn unfiltered(self) -> Self {
        Self {
            enable_filters: false,
        }
    }
}

impl Default for CompilerOptions {
    fn default() -> Self {
        Self {
            enable_filters: true,
        }
    }
}

/// Something that renders to completion.
pub trait Renderable {
    /// Materialize the full output, returning its size in bytes.
    fn render(&self) -> Result<usize, BenchError>;
}

/// A compiled template, ready to be bound to a context.
pub trait TemplateFactory {
    /// Attach `context`. Runs once per variant, before any timing, so any
    /// context preparation a mode needs happens here.
    fn bind(self: Box<Self>, context: Rc<Value>) -> Result<Box<dyn BoundTemplate>, BenchError>;
}

/// A compiled template with its context attached.
pub trait BoundTemplate {
    fn instantiate(&self) -> Result<Box<dyn Renderable + '_>, BenchError>;
}

/// Template compiler capability.
pub trait TemplateEngine {
    /// Short identifier used as the variant-name prefix.
    fn name(&self) -> &str;

    /// Human-readable prefix for variant descriptions.
    fn label(&self) -> &str;

    fn is_available(&self) -> bool {
        true
    }

    /// Optimization preset for `level`.
    fn preset(&self, level: OptLevel) -> AnalyzerOptions {
        AnalyzerOptions::preset(level)
    }

    fn compile(
        &self,
        source: &str,
        name: &str,
        analyzer: &AnalyzerOptions,
        compiler: &CompilerOptions,
    ) -> Result<Box<dyn TemplateFactory>, BenchError>;
}

/// Stand-in for a build without any template engine.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullEngine;

impl TemplateEngine for NullEngine {
    fn name(&self) -> &str {
        "none"
    }

    fn label(&self) -> &str {
        "No engine"
    }

    fn is_available(&self) -> bool {
        false
    }

    fn compile(
        &self,
        _source: &str,
        _name: &str,
        _analyzer: &AnalyzerOptions,
        _compiler: &CompilerOptions,
    ) -> Result<Box<dyn TemplateFactory>, BenchError> {
        Err(BenchError::EngineUnavailable {
            engine: self.name().to_string(),
        })
    }
}

/// Engine wired into this build: MiniJinja when the `minijinja` feature is on,
/// otherwise [`NullEngine`].
pub fn default_engine() -> Box<dyn TemplateEngine> {
    #[cfg(feature = "minijinja")]
    {
        Box::new(jinja::JinjaEngine)
    }
    #[cfg(not(feature = "minijinja"))]
    {
        Box::new(NullEngine)
    }
}
