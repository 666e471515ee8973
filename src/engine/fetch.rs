//! Batched source fetching with retries and fallback

use crate::config::FetchConfig;
use crate::error::Result;
use crate::source::{Source, SourceBinding};
use crate::types::{DataType, Issue, RawRecord, Stage};
use futures::future::join_all;
use tracing::{debug, warn};

/// Combined result of fetching every source of a data type
#[derive(Debug, Default)]
pub(crate) struct FetchOutcome {
    pub records: Vec<RawRecord>,
    /// One warning per failed source
    pub warnings: Vec<Issue>,
    /// Sources that produced data, directly or through a fallback
    pub succeeded: usize,
    /// Sources whose own fetch failed
    pub failed: usize,
    pub fallbacks_used: Vec<String>,
}

/// What one binding produced: the serving source id and its records, and
/// every source in the chain that failed before it
struct BindingFetch {
    served: Option<(String, Vec<RawRecord>)>,
    failures: Vec<(String, String)>,
}

/// Fetch sources in batches of `batch_size`
///
/// Sources of a batch run concurrently; a batch finishes before the next
/// one starts.
pub(crate) async fn fetch_all(
    bindings: &[SourceBinding],
    fetch: &FetchConfig,
    data_type: DataType,
) -> FetchOutcome {
    let mut out = FetchOutcome::default();

    for batch in bindings.chunks(fetch.batch_size.max(1)) {
        let results = join_all(batch.iter().map(|b| fetch_binding(b, fetch))).await;

        for (binding, result) in batch.iter().zip(results) {
            let primary = binding.id();
            if !result.failures.is_empty() {
                out.failed += 1;
            }

            let failures = result
                .failures
                .iter()
                .map(|(id, e)| format!("'{id}': {e}"))
                .collect::<Vec<_>>()
                .join("; ");

            match result.served {
                Some((served_by, records)) => {
                    out.succeeded += 1;
                    if served_by != primary {
                        out.warnings.push(
                            Issue::new(
                                Stage::Fetch,
                                format!("{failures}; using fallback '{served_by}'"),
                            )
                            .for_type(data_type)
                            .from_source(primary),
                        );
                        out.fallbacks_used.push(served_by);
                    }
                    out.records.extend(records);
                }
                None => {
                    out.warnings.push(
                        Issue::new(Stage::Fetch, format!("{failures}; records excluded"))
                            .for_type(data_type)
                            .from_source(primary),
                    );
                }
            }
        }
    }

    debug!(
        data_type = %data_type,
        sources = bindings.len(),
        succeeded = out.succeeded,
        failed = out.failed,
        records = out.records.len(),
        "Fetched sources"
    );
    out
}

/// Try a binding, then its fallback chain
async fn fetch_binding(binding: &SourceBinding, fetch: &FetchConfig) -> BindingFetch {
    let mut failures = Vec::new();
    let mut current = Some(binding);

    while let Some(b) = current {
        match fetch_with_retry(b.source.as_ref(), fetch).await {
            Ok(records) => {
                return BindingFetch {
                    served: Some((b.id().to_string(), records)),
                    failures,
                }
            }
            Err(e) => {
                failures.push((b.id().to_string(), e.to_string()));
                current = b.fallback.as_deref();
            }
        }
    }

    BindingFetch {
        served: None,
        failures,
    }
}

/// Fetch one source, retrying retryable errors with a fixed delay
pub(crate) async fn fetch_with_retry(
    source: &dyn Source,
    fetch: &FetchConfig,
) -> Result<Vec<RawRecord>> {
    let attempts = fetch.retries.saturating_add(1);
    let mut attempt = 1;

    loop {
        match source.fetch().await {
            Ok(records) => {
                debug!(source = source.id(), attempt, records = records.len(), "Source fetched");
                return Ok(records);
            }
            Err(e) if attempt < attempts && e.is_retryable() => {
                warn!(
                    source = source.id(),
                    attempt,
                    attempts,
                    error = %e,
                    "Fetch failed, retrying in {:?}",
                    fetch.retry_delay()
                );
                tokio::time::sleep(fetch.retry_delay()).await;
                attempt += 1;
            }
            Err(e) => {
                warn!(source = source.id(), attempt, error = %e, "Source failed");
                return Err(e);
            }
        }
    }
}
