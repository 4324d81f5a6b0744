//! Acquisition plan assembly.
//!
//! Applies the resolver to each requested token in order, one bucket per
//! token, deduplicating before the bucket is counted. The cancellation flag
//! is honored between tokens; a canceled build aborts the whole job.

use std::sync::atomic::{AtomicBool, Ordering};

use crate::application::resolver::CategoryResolver;
use crate::domain::{AcquisitionPlan, ExportError};

/// Build the plan for the requested tokens.
///
/// # Errors
/// Returns `EmptyPlan` when no tokens were requested and `Canceled` when the
/// shared flag is observed set between tokens.
pub fn build_plan(
    resolver: &CategoryResolver<'_>,
    tokens: &[String],
    cancel: &AtomicBool,
) -> Result<AcquisitionPlan, ExportError> {
    let mut plan = AcquisitionPlan::default();

    for token in tokens {
        let mut bucket = resolver.resolve(token);
        bucket.dedup();
        tracing::debug!(
            token = token.as_str(),
            category = bucket.category.as_str(),
            items = bucket.item_count(),
            "Resolved category token"
        );
        plan.buckets.push(bucket);

        if cancel.load(Ordering::SeqCst) {
            return Err(ExportError::Canceled);
        }
    }

    if plan.is_empty() {
        return Err(ExportError::EmptyPlan);
    }

    Ok(plan)
}
