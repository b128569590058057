//! Job initializer: create a record, resolve a strategy, seed URL entries.

use chrono::Utc;

use crate::kernel::deps::ServerDeps;
use crate::kernel::traits::{BaseEventLog, BaseWebSearch, LogEvent};

use super::super::error::EolError;
use super::super::models::{EolClassification, FetchMethod, Job, JobStatus, UrlEntry};
use super::super::store::JobStore;
use super::super::strategy::StrategyResolver;

/// Upper bound on URL entries seeded from a generic search.
pub const MAX_SEARCH_URLS: usize = 5;

const MAX_IDENTIFIER_LEN: usize = 120;

/// Domains ranked ahead of everything else when seeding search results.
/// Manufacturer sites first, then the big distributor catalogs.
const PREFERRED_DOMAINS: &[&str] = &[
    "fa.omron.co.jp",
    "keyence.co.jp",
    "mitsubishielectric.co.jp",
    "industrial.panasonic.com",
    "fanuc.co.jp",
    "smcworld.com",
    "e-mechatronics.com",
    "monotaro.com",
    "misumi-vona.jp",
    "digikey.com",
    "rs-online.com",
];

#[derive(Debug)]
pub struct InitializeOutcome {
    pub job: Job,
    /// Strategy tag reported to the caller: a registry key, or "search".
    pub strategy: String,
}

/// Create and seed a job for one (manufacturer, model) pair.
///
/// Invalid identifiers are client errors; no job record is created for
/// them. A failing search call leaves the record in `created` and surfaces
/// the error. Zero search results terminate the job immediately with an
/// "insufficient information" classification.
pub async fn initialize_job(
    maker: &str,
    model: &str,
    deps: &ServerDeps,
) -> Result<InitializeOutcome, EolError> {
    let maker = sanitize_identifier("maker", maker)?;
    let model = sanitize_identifier("model", model)?;

    let store = JobStore::new(deps.blob_store.clone());

    // Opportunistic retention sweep; failures are logged, never fatal.
    if let Err(e) = store.cleanup_expired(Utc::now()).await {
        tracing::warn!("retention sweep failed: {e}");
    }

    let mut job = Job::new(maker.clone(), model.clone());
    store.create(&job).await?;

    let resolver = StrategyResolver::new(deps.probe.as_ref());
    let strategy_tag = match resolver.resolve(&maker, &model).await {
        Some(strategy) => {
            let tag = strategy.key.to_string();
            match strategy.content {
                // Probe already extracted the page: the fetch stage is
                // short-circuited for this URL.
                Some(content) => {
                    job.urls
                        .push(UrlEntry::completed(0, strategy.url, strategy.method, content));
                    job.status = JobStatus::ReadyForAnalysis;
                }
                None => {
                    job.urls.push(UrlEntry::pending(0, strategy.url, strategy.method));
                    job.status = JobStatus::UrlsReady;
                }
            }
            store.save(&job).await?;
            tag
        }
        None => {
            seed_from_search(&mut job, &maker, &model, deps).await?;
            store.save(&job).await?;
            "search".to_string()
        }
    };

    deps.event_log.record(
        LogEvent::info("eol.initialize", "job initialized").with_context(serde_json::json!({
            "jobId": job.id,
            "maker": maker,
            "model": model,
            "strategy": strategy_tag,
            "urlCount": job.urls.len(),
            "status": job.status,
        })),
    );

    Ok(InitializeOutcome {
        job,
        strategy: strategy_tag,
    })
}

async fn seed_from_search(
    job: &mut Job,
    maker: &str,
    model: &str,
    deps: &ServerDeps,
) -> Result<(), EolError> {
    let query = build_search_query(maker, model);
    let mut hits = deps
        .web_search
        .search(&query, MAX_SEARCH_URLS)
        .await
        .map_err(|e| EolError::SearchFailed(e.to_string()))?;

    if hits.is_empty() {
        tracing::info!(maker, model, "search returned nothing, closing job as unknown");
        job.mark_complete(EolClassification::insufficient_information(
            "Web search returned no results for this part; not enough information to determine EOL status.",
        ));
        return Ok(());
    }

    // Stable sort: allow-listed domains first, search ranking otherwise.
    hits.sort_by_key(|hit| !is_preferred_domain(&hit.url));
    hits.truncate(MAX_SEARCH_URLS);

    job.urls = hits
        .into_iter()
        .enumerate()
        .map(|(index, hit)| {
            let method = method_for_url(&hit.url);
            let mut entry = UrlEntry::pending(index, hit.url, method).with_title(hit.title);
            entry.snippet = hit.snippet;
            entry
        })
        .collect();
    job.status = JobStatus::UrlsReady;
    Ok(())
}

fn sanitize_identifier(field: &str, value: &str) -> Result<String, EolError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(EolError::Validation(format!("{field} must not be empty")));
    }
    if trimmed.len() > MAX_IDENTIFIER_LEN {
        return Err(EolError::Validation(format!(
            "{field} exceeds {MAX_IDENTIFIER_LEN} characters"
        )));
    }
    if trimmed.chars().any(char::is_control) {
        return Err(EolError::Validation(format!(
            "{field} contains control characters"
        )));
    }
    Ok(trimmed.to_string())
}

fn build_search_query(maker: &str, model: &str) -> String {
    format!("{maker} {model} 生産終了 OR discontinued OR \"end of life\"")
}

fn is_preferred_domain(url: &str) -> bool {
    match url::Url::parse(url) {
        Ok(parsed) => parsed
            .host_str()
            .map(|host| PREFERRED_DOMAINS.iter().any(|d| host.ends_with(d)))
            .unwrap_or(false),
        Err(_) => false,
    }
}

fn method_for_url(url: &str) -> FetchMethod {
    let path_is_pdf = url::Url::parse(url)
        .map(|u| u.path().to_ascii_lowercase().ends_with(".pdf"))
        .unwrap_or(false);
    if path_is_pdf {
        FetchMethod::Document
    } else {
        FetchMethod::Render
    }
}
