use crate::types::BenchmarkVariant;

/// Select variants whose name contains any of `substrings`, ignoring case.
///
/// An empty `substrings` slice selects everything. Registration order is kept
/// and a variant matching several substrings appears once.
#[tracing::instrument(level = "trace", skip_all, fields(substrings = substrings.len()))]
pub fn select<'a, I>(variants: I, substrings: &[String]) -> Vec<&'a BenchmarkVariant>
where
    I: IntoIterator<Item = &'a BenchmarkVariant>,
{
    if substrings.is_empty() {
        return variants.into_iter().collect();
    }

    let needles: Vec<String> = substrings.iter().map(|s| s.to_lowercase()).collect();
    variants
        .into_iter()
        .filter(|variant| {
            let name = variant.name.to_lowercase();
            needles.iter().any(|needle| name.contains(needle.as_str()))
        })
        .collect()
}
