use std::fmt;
use std::num::NonZeroU32;
use std::time::Duration;

use crate::errors::BenchError;

/// Mean durations strictly below this are treated as "nothing was measured".
pub const RESOLUTION_FLOOR: Duration = Duration::from_micros(10);

/// Zero-argument render action bound to one compiled template.
pub type RenderFn = Box<dyn Fn() -> Result<(), BenchError>>;

/// Compiler optimization preset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum OptLevel {
    Default,
    O1,
    O2,
    O3,
}

impl OptLevel {
    pub const ALL: [Self; 4] = [Self::Default, Self::O1, Self::O2, Self::O3];

    /// Suffix appended to variant and template names ("" for the default preset).
    pub fn name_suffix(self) -> &'static str {
        match self {
            Self::Default => "",
            Self::O1 => "_o1",
            Self::O2 => "_o2",
            Self::O3 => "_o3",
        }
    }

    /// Suffix appended to human-readable descriptions.
    pub fn label_suffix(self) -> &'static str {
        match self {
            Self::Default => "",
            Self::O1 => " -O1",
            Self::O2 => " -O2",
            Self::O3 => " -O3",
        }
    }
}

/// Render configuration crossed with every optimization level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RenderMode {
    Standard,
    /// Precompiled context, unicode generation disabled.
    Baked,
    /// Output filtering disabled at compile time.
    Unfiltered,
}

impl RenderMode {
    pub const ALL: [Self; 3] = [Self::Standard, Self::Baked, Self::Unfiltered];

    pub fn name_suffix(self) -> &'static str {
        match self {
            Self::Standard => "",
            Self::Baked => "_baked",
            Self::Unfiltered => "_unfiltered",
        }
    }

    pub fn label_suffix(self) -> &'static str {
        match self {
            Self::Standard => "",
            Self::Baked => " baked",
            Self::Unfiltered => " unfiltered",
        }
    }
}

/// One named, pre-bound benchmarking unit.
pub struct BenchmarkVariant {
    pub name: String,
    pub description: String,
    /// Name the bound template was compiled under.
    pub template: String,
    render: RenderFn,
}

impl BenchmarkVariant {
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        template: impl Into<String>,
        render: RenderFn,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            template: template.into(),
            render,
        }
    }

    /// Run the bound render action once.
    pub fn render(&self) -> Result<(), BenchError> {
        (self.render)()
    }
}

impl fmt::Debug for BenchmarkVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BenchmarkVariant")
            .field("name", &self.name)
            .field("description", &self.description)
            .field("template", &self.template)
            .finish_non_exhaustive()
    }
}

/// Named, ordered set of variants with unique names.
#[derive(Debug)]
pub struct BenchmarkGroup {
    pub name: String,
    variants: Vec<BenchmarkVariant>,
}

impl BenchmarkGroup {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            variants: Vec::new(),
        }
    }

    /// Append a variant, keeping registration order.
    pub fn register(&mut self, variant: BenchmarkVariant) -> Result<(), BenchError> {
        if self.variants.iter().any(|v| v.name == variant.name) {
            return Err(BenchError::DuplicateVariant {
                group: self.name.clone(),
                name: variant.name,
            });
        }
        self.variants.push(variant);
        Ok(())
    }

    pub fn variants(&self) -> &[BenchmarkVariant] {
        &self.variants
    }

    pub fn len(&self) -> usize {
        self.variants.len()
    }

    pub fn is_empty(&self) -> bool {
        self.variants.is_empty()
    }
}

/// Resolved, read-only settings for one invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunConfiguration {
    pub filter_substrings: Vec<String>,
    pub iterations: NonZeroU32,
    pub profile_mode: bool,
}

impl RunConfiguration {
    pub const DEFAULT_ITERATIONS: NonZeroU32 = NonZeroU32::new(100).unwrap();

    /// Same selection, exactly one iteration per variant.
    pub fn single_pass(&self) -> Self {
        Self {
            iterations: NonZeroU32::MIN,
            ..self.clone()
        }
    }
}

/// Mean render latency for one variant.
#[derive(Debug, Clone, PartialEq)]
pub struct TimingResult {
    pub variant_description: String,
    pub mean: Duration,
    pub below_resolution: bool,
}

impl TimingResult {
    pub fn new(variant_description: impl Into<String>, mean: Duration) -> Self {
        Self {
            variant_description: variant_description.into(),
            mean,
            below_resolution: mean < RESOLUTION_FLOOR,
        }
    }

    pub fn mean_seconds(&self) -> f64 {
        self.mean.as_secs_f64()
    }
}
