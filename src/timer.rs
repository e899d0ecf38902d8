use std::num::NonZeroU32;
use std::time::Instant;

use crate::errors::BenchError;
use crate::types::TimingResult;

/// Call `callable` `iterations` times back to back and report the mean wall time.
///
/// The first failing call aborts the measurement and its error is returned.
#[tracing::instrument(level = "trace", skip(callable))]
pub fn measure<F>(
    description: &str,
    mut callable: F,
    iterations: NonZeroU32,
) -> Result<TimingResult, BenchError>
where
    F: FnMut() -> Result<(), BenchError>,
{
    let count = iterations.get();
    let start = Instant::now();
    for _ in 0..count {
        callable()?;
    }
    let elapsed = start.elapsed();

    Ok(TimingResult::new(description, elapsed / count))
}
