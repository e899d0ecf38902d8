use std::hint::black_box;
use std::rc::Rc;

use serde_json::Value;

use crate::engine::{AnalyzerOptions, CompilerOptions, TemplateEngine, TemplateFactory};
use crate::errors::BenchError;
use crate::types::{BenchmarkGroup, BenchmarkVariant, OptLevel, RenderFn, RenderMode};

const TEMPLATE_PREFIX: &str = "tmpl";

/// Compile `source` once per (mode, level) pair and bind each result to `context`.
///
/// Variants are registered standard, baked, then unfiltered, each across the
/// default, -O1, -O2 and -O3 presets. An unavailable engine yields an empty
/// group; a compilation failure aborts the whole build.
pub fn build_group(
    engine: &dyn TemplateEngine,
    source: &str,
    context: Value,
) -> Result<BenchmarkGroup, BenchError> {
    let mut group = BenchmarkGroup::new(engine.name());
    if !engine.is_available() {
        tracing::warn!(
            engine = engine.name(),
            "template engine unavailable, no variants registered"
        );
        return Ok(group);
    }

    let context = Rc::new(context);
    for mode in RenderMode::ALL {
        for level in OptLevel::ALL {
            let suffix = format!("{}{}", mode.name_suffix(), level.name_suffix());
            let name = format!("{}{}", engine.name(), suffix);
            let template = format!("{TEMPLATE_PREFIX}{suffix}");
            let description = format!(
                "{}{}{}",
                engine.label(),
                mode.label_suffix(),
                level.label_suffix()
            );

            let (analyzer, compiler) = options_for(engine, mode, level);
            let factory = engine.compile(source, &template, &analyzer, &compiler)?;
            tracing::debug!(variant = %name, template = %template, "compiled variant");

            group.register(BenchmarkVariant::new(
                name,
                description,
                template,
                bind_render(factory, Rc::clone(&context))?,
            ))?;
        }
    }

    Ok(group)
}

fn options_for(
    engine: &dyn TemplateEngine,
    mode: RenderMode,
    level: OptLevel,
) -> (AnalyzerOptions, CompilerOptions) {
    let preset = engine.preset(level);
    let compiler = CompilerOptions::default();
    match mode {
        RenderMode::Standard => (preset, compiler),
        RenderMode::Baked => (preset.baked(), compiler),
        RenderMode::Unfiltered => (preset, compiler.unfiltered()),
    }
}

fn bind_render(factory: Box<dyn TemplateFactory>, context: Rc<Value>) -> Result<RenderFn, BenchError> {
    let bound = factory.bind(context)?;
    Ok(Box::new(move || {
        let _span = tracing::trace_span!("render").entered();
        let renderable = bound.instantiate()?;
        black_box(renderable.render()?);
        Ok(())
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{BoundTemplate, NullEngine, Renderable};
    use std::cell::RefCell;

    type Log = Rc<RefCell<Vec<String>>>;

    /// Records every compilation and which template each render hits.
    #[derive(Default)]
    struct RecordingEngine {
        compiled: RefCell<Vec<(String, AnalyzerOptions, CompilerOptions)>>,
        bound: Log,
        rendered: Log,
        reject: Option<&'static str>,
    }

    struct RecordingFactory {
        template: String,
        bound: Log,
        rendered: Log,
    }

    struct RecordingRender<'a> {
        factory: &'a RecordingFactory,
    }

    impl Renderable for RecordingRender<'_> {
        fn render(&self) -> Result<usize, BenchError> {
            self.factory
                .rendered
                .borrow_mut()
                .push(self.factory.template.clone());
            Ok(self.factory.template.len())
        }
    }

    impl TemplateFactory for RecordingFactory {
        fn bind(
            self: Box<Self>,
            _context: Rc<Value>,
        ) -> Result<Box<dyn BoundTemplate>, BenchError> {
            self.bound.borrow_mut().push(self.template.clone());
            Ok(self)
        }
    }

    impl BoundTemplate for RecordingFactory {
        fn instantiate(&self) -> Result<Box<dyn Renderable + '_>, BenchError> {
            Ok(Box::new(RecordingRender { factory: self }))
        }
    }

    impl TemplateEngine for RecordingEngine {
        fn name(&self) -> &str {
            "rec"
        }

        fn label(&self) -> &str {
            "Recording template"
        }

        fn compile(
            &self,
            source: &str,
            name: &str,
            analyzer: &AnalyzerOptions,
            compiler: &CompilerOptions,
        ) -> Result<Box<dyn TemplateFactory>, BenchError> {
            if self.reject == Some(source) {
                return Err(BenchError::Compile {
                    template: name.to_string(),
                    detail: "unexpected end of input".to_string(),
                });
            }
            self.compiled
                .borrow_mut()
                .push((name.to_string(), analyzer.clone(), *compiler));
            Ok(Box::new(RecordingFactory {
                template: name.to_string(),
                bound: Rc::clone(&self.bound),
                rendered: Rc::clone(&self.rendered),
            }))
        }
    }

    fn names(group: &BenchmarkGroup) -> Vec<&str> {
        group.variants().iter().map(|v| v.name.as_str()).collect()
    }

    #[test]
    fn builds_twelve_variants_in_order() {
        let engine = RecordingEngine::default();
        let group = build_group(&engine, "src", Value::Null).unwrap();
        assert_eq!(group.name, "rec");
        assert_eq!(
            names(&group),
            vec![
                "rec",
                "rec_o1",
                "rec_o2",
                "rec_o3",
                "rec_baked",
                "rec_baked_o1",
                "rec_baked_o2",
                "rec_baked_o3",
                "rec_unfiltered",
                "rec_unfiltered_o1",
                "rec_unfiltered_o2",
                "rec_unfiltered_o3",
            ]
        );
    }

    #[test]
    fn descriptions_carry_mode_and_level() {
        let engine = RecordingEngine::default();
        let group = build_group(&engine, "src", Value::Null).unwrap();
        let descs: Vec<&str> = group
            .variants()
            .iter()
            .map(|v| v.description.as_str())
            .collect();
        assert_eq!(descs[0], "Recording template");
        assert_eq!(descs[5], "Recording template baked -O1");
        assert_eq!(descs[11], "Recording template unfiltered -O3");
    }

    #[test]
    fn compiles_once_per_variant_at_build_time() {
        let engine = RecordingEngine::default();
        let group = build_group(&engine, "src", Value::Null).unwrap();
        assert_eq!(engine.compiled.borrow().len(), 12);

        for variant in group.variants() {
            variant.render().unwrap();
            variant.render().unwrap();
        }
        assert_eq!(engine.compiled.borrow().len(), 12);
        assert_eq!(engine.rendered.borrow().len(), 24);
    }

    #[test]
    fn binds_context_once_per_variant_at_build_time() {
        let engine = RecordingEngine::default();
        let group = build_group(&engine, "src", Value::Null).unwrap();
        assert_eq!(engine.bound.borrow().len(), 12);

        for variant in group.variants() {
            variant.render().unwrap();
            variant.render().unwrap();
        }
        assert_eq!(engine.bound.borrow().len(), 12);
        let names: Vec<String> = group.variants().iter().map(|v| v.template.clone()).collect();
        assert_eq!(*engine.bound.borrow(), names);
    }

    #[test]
    fn each_variant_renders_its_own_template() {
        let engine = RecordingEngine::default();
        let group = build_group(&engine, "src", Value::Null).unwrap();

        for variant in group.variants() {
            engine.rendered.borrow_mut().clear();
            variant.render().unwrap();
            let expected = variant.name.replacen("rec", "tmpl", 1);
            assert_eq!(variant.template, expected);
            assert_eq!(*engine.rendered.borrow(), vec![expected]);
        }
    }

    #[test]
    fn mode_options_are_applied() {
        let engine = RecordingEngine::default();
        build_group(&engine, "src", Value::Null).unwrap();
        let compiled = engine.compiled.borrow();

        for (template, analyzer, compiler) in compiled.iter() {
            let baked = template.contains("_baked");
            let unfiltered = template.contains("_unfiltered");
            assert_eq!(analyzer.baked_mode(), baked, "{template}");
            assert_eq!(analyzer.generate_unicode(), !baked, "{template}");
            assert_eq!(compiler.enable_filters, !unfiltered, "{template}");
        }

        assert_eq!(compiled[1].1.level(), OptLevel::O1);
        assert_eq!(compiled[7].1.level(), OptLevel::O3);
    }

    #[test]
    fn unavailable_engine_yields_empty_group() {
        let group = build_group(&NullEngine, "src", Value::Null).unwrap();
        assert!(group.is_empty());
        assert_eq!(group.name, "none");
    }

    #[test]
    fn compile_failure_propagates() {
        let engine = RecordingEngine {
            reject: Some("{% broken"),
            ..Default::default()
        };
        let err = build_group(&engine, "{% broken", Value::Null).unwrap_err();
        assert!(matches!(err, BenchError::Compile { ref template, .. } if template == "tmpl"));
    }
}
