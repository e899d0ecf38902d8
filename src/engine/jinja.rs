//! MiniJinja adapter.
//!
//! MiniJinja has no optimizer, so the presets map levels onto environment
//! settings that change how much work a render does:
//!
//! | level   | debug info | trim_blocks | lstrip_blocks |
//! |---------|------------|-------------|---------------|
//! | default | on         | off         | off           |
//! | -O1     | off        | off         | off           |
//! | -O2     | off        | on          | off           |
//! | -O3     | off        | on          | on            |

use std::rc::Rc;

use minijinja::{AutoEscape, Environment, Template};
use serde_json::Value;

use crate::engine::{
    AnalyzerOptions, BoundTemplate, CompilerOptions, Renderable, TemplateEngine, TemplateFactory,
};
use crate::errors::BenchError;
use crate::types::OptLevel;

const DEBUG: &str = "debug";
const TRIM_BLOCKS: &str = "trim_blocks";
const LSTRIP_BLOCKS: &str = "lstrip_blocks";

#[derive(Debug, Default, Clone, Copy)]
pub struct JinjaEngine;

impl TemplateEngine for JinjaEngine {
    fn name(&self) -> &str {
        "minijinja"
    }

    fn label(&self) -> &str {
        "MiniJinja template"
    }

    fn preset(&self, level: OptLevel) -> AnalyzerOptions {
        let base = AnalyzerOptions::preset(level);
        match level {
            OptLevel::Default => base.with_setting(DEBUG, true),
            OptLevel::O1 => base,
            OptLevel::O2 => base.with_setting(TRIM_BLOCKS, true),
            OptLevel::O3 => base
                .with_setting(TRIM_BLOCKS, true)
                .with_setting(LSTRIP_BLOCKS, true),
        }
    }

    fn compile(
        &self,
        source: &str,
        name: &str,
        analyzer: &AnalyzerOptions,
        compiler: &CompilerOptions,
    ) -> Result<Box<dyn TemplateFactory>, BenchError> {
        let mut env = Environment::new();
        env.set_debug(analyzer.setting(DEBUG));
        env.set_trim_blocks(analyzer.setting(TRIM_BLOCKS));
        env.set_lstrip_blocks(analyzer.setting(LSTRIP_BLOCKS));
        if compiler.enable_filters {
            env.set_auto_escape_callback(|_| AutoEscape::Html);
        } else {
            env.set_auto_escape_callback(|_| AutoEscape::None);
        }

        env.add_template_owned(name.to_string(), source.to_string())
            .map_err(|e| BenchError::Compile {
                template: name.to_string(),
                detail: e.to_string(),
            })?;

        Ok(Box::new(JinjaFactory {
            env,
            name: name.to_string(),
            baked: analyzer.baked_mode(),
            text_output: analyzer.generate_unicode(),
        }))
    }
}

struct JinjaFactory {
    env: Environment<'static>,
    name: String,
    baked: bool,
    text_output: bool,
}

impl TemplateFactory for JinjaFactory {
    fn bind(self: Box<Self>, context: Rc<Value>) -> Result<Box<dyn BoundTemplate>, BenchError> {
        let context = bind_context(self.baked, context);
        Ok(Box::new(JinjaBound {
            factory: *self,
            context,
        }))
    }
}

/// Baked mode converts the context to MiniJinja values once, here, so timed
/// renders skip the serde conversion.
fn bind_context(baked: bool, context: Rc<Value>) -> BoundContext {
    if baked {
        let _span = tracing::trace_span!("bake_context").entered();
        BoundContext::Baked(minijinja::Value::from_serialize(&*context))
    } else {
        BoundContext::Raw(context)
    }
}

enum BoundContext {
    Raw(Rc<Value>),
    Baked(minijinja::Value),
}

struct JinjaBound {
    factory: JinjaFactory,
    context: BoundContext,
}

impl BoundTemplate for JinjaBound {
    fn instantiate(&self) -> Result<Box<dyn Renderable + '_>, BenchError> {
        let _span = tracing::trace_span!("instantiate").entered();
        let template = self
            .factory
            .env
            .get_template(&self.factory.name)
            .map_err(render_error)?;
        Ok(Box::new(JinjaRender {
            template,
            context: &self.context,
            text_output: self.factory.text_output,
        }))
    }
}

struct JinjaRender<'a> {
    template: Template<'a, 'a>,
    context: &'a BoundContext,
    text_output: bool,
}

impl JinjaRender<'_> {
    fn render_with<S: serde::Serialize>(&self, ctx: S) -> Result<usize, BenchError> {
        if self.text_output {
            let out = self.template.render(ctx).map_err(render_error)?;
            Ok(out.len())
        } else {
            let mut buf = Vec::new();
            self.template
                .render_captured_to(ctx, &mut buf)
                .map_err(render_error)?;
            Ok(buf.len())
        }
    }
}

impl Renderable for JinjaRender<'_> {
    fn render(&self) -> Result<usize, BenchError> {
        let _span = tracing::trace_span!("render_template").entered();
        match self.context {
            BoundContext::Raw(value) => self.render_with(&**value),
            BoundContext::Baked(value) => self.render_with(value),
        }
    }
}

fn render_error(err: minijinja::Error) -> BenchError {
    BenchError::Render {
        detail: err.to_string(),
    }
}
