use rayon::prelude::*;
use tracing::debug;

/// Minimum number of texts to consider parallelization
const MIN_TEXTS_FOR_PARALLEL: usize = 100;

/// Minimum total character count to consider parallelization
const MIN_CHARS_FOR_PARALLEL: usize = 10_000;

/// Determine if parallel processing should be used based on workload characteristics.
///
/// Parallelization is beneficial when:
/// - There are many texts (>= 100), OR
/// - The total character count is large (>= 10,000 chars)
#[inline]
pub(crate) fn should_use_parallel<T: AsRef<str>>(texts: &[T]) -> bool {
    let num_texts = texts.len();

    if num_texts >= MIN_TEXTS_FOR_PARALLEL {
        return true;
    }

    // Comments are short, so summing the whole (small) batch is cheap
    let total_chars: usize = texts.iter().map(|s| s.as_ref().len()).sum();
    total_chars >= MIN_CHARS_FOR_PARALLEL
}

/// Apply `f` to every text, in parallel when the batch is large enough.
///
/// Output order always matches input order.
pub(crate) fn map_texts<T, R, F>(texts: &[T], f: F) -> Vec<R>
where
    T: AsRef<str> + Sync,
    R: Send,
    F: Fn(&str) -> R + Sync + Send,
{
    if should_use_parallel(texts) {
        debug!(num_texts = texts.len(), "Using parallel text processing");
        texts.par_iter().map(|text| f(text.as_ref())).collect()
    } else {
        texts.iter().map(|text| f(text.as_ref())).collect()
    }
}
