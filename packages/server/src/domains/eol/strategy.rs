//! Manufacturer-specific strategy selection.
//!
//! A closed, hand-maintained registry maps manufacturer names to a small
//! descriptor (URL template, execution mode, validation mode). Adding a
//! manufacturer is a data change, not a control-flow change. Unknown
//! manufacturers — and every validation failure, including transient probe
//! errors — degrade to the generic search path; resolution never aborts job
//! creation.

use regex::Regex;
use url::Url;

use crate::kernel::traits::BaseProbeFetch;

use super::models::FetchMethod;

/// How the resolved URL must be validated before the job commits to it.
#[derive(Debug, Clone, Copy)]
pub enum Validation {
    None,
    /// Probe the URL; any "no results" marker fails resolution, otherwise
    /// the probe body is attached to the entry, short-circuiting the fetch
    /// stage.
    Probe {
        no_results_markers: &'static [&'static str],
    },
    /// Probe the URL and extract a product-detail link matching the
    /// pattern; no match fails resolution.
    ProbeExtract { link_pattern: &'static str },
    /// Probe the URL; any "not found" marker (locale-specific) fails
    /// resolution.
    Probe404 {
        not_found_markers: &'static [&'static str],
    },
}

/// Execution mode of the manufacturer URL, before model substitution.
#[derive(Debug, Clone, Copy)]
pub enum MethodKind {
    Render,
    RenderShielded,
    SiteSearch,
    Document,
    RenderLocalized {
        fallback_template: &'static str,
    },
}

pub struct StrategyDescriptor {
    pub url_template: &'static str,
    pub method: MethodKind,
    pub validation: Validation,
}

/// A resolved plan for how a job's first URL is obtained.
#[derive(Debug, Clone)]
pub struct Strategy {
    /// Registry key, reported to the caller as the strategy tag.
    pub key: &'static str,
    pub url: String,
    pub method: FetchMethod,
    /// Probe content attached by default validation; when present the
    /// entry is seeded already complete.
    pub content: Option<String>,
}

/// Manufacturer registry. Keys are matched after trimming and lowercasing;
/// Japanese trade names are separate alias rows.
const REGISTRY: &[(&str, StrategyDescriptor)] = &[
    (
        "omron",
        StrategyDescriptor {
            url_template: "https://www.fa.omron.co.jp/products/family/{model}/",
            method: MethodKind::Render,
            validation: Validation::Probe404 {
                not_found_markers: &["ページが見つかりません", "Page Not Found"],
            },
        },
    ),
    (
        "オムロン",
        StrategyDescriptor {
            url_template: "https://www.fa.omron.co.jp/products/family/{model}/",
            method: MethodKind::Render,
            validation: Validation::Probe404 {
                not_found_markers: &["ページが見つかりません", "Page Not Found"],
            },
        },
    ),
    (
        "keyence",
        StrategyDescriptor {
            url_template: "https://www.keyence.co.jp/search/?searchword={model}",
            method: MethodKind::Render,
            validation: Validation::ProbeExtract {
                link_pattern: r"/products/[a-z0-9_-]+/[a-z0-9_-]+/models/[A-Za-z0-9()%_.-]+/",
            },
        },
    ),
    (
        "キーエンス",
        StrategyDescriptor {
            url_template: "https://www.keyence.co.jp/search/?searchword={model}",
            method: MethodKind::Render,
            validation: Validation::ProbeExtract {
                link_pattern: r"/products/[a-z0-9_-]+/[a-z0-9_-]+/models/[A-Za-z0-9()%_.-]+/",
            },
        },
    ),
    (
        "mitsubishi electric",
        StrategyDescriptor {
            url_template: "https://www.mitsubishielectric.co.jp/fa/search/?q={model}",
            method: MethodKind::SiteSearch,
            validation: Validation::None,
        },
    ),
    (
        "三菱電機",
        StrategyDescriptor {
            url_template: "https://www.mitsubishielectric.co.jp/fa/search/?q={model}",
            method: MethodKind::SiteSearch,
            validation: Validation::None,
        },
    ),
    (
        "panasonic",
        StrategyDescriptor {
            url_template: "https://industrial.panasonic.com/jp/products-search?keyword={model}",
            method: MethodKind::RenderLocalized {
                fallback_template: "https://industrial.panasonic.com/ww/products-search?keyword={model}",
            },
            validation: Validation::Probe {
                no_results_markers: &["該当する商品が見つかりません", "No matching products"],
            },
        },
    ),
    (
        "fanuc",
        StrategyDescriptor {
            url_template: "https://www.fanuc.co.jp/ja/product/search.html?q={model}",
            method: MethodKind::RenderShielded,
            validation: Validation::None,
        },
    ),
    (
        "smc",
        StrategyDescriptor {
            url_template: "https://www.smcworld.com/products/pattern/pdf/{model}.pdf",
            method: MethodKind::Document,
            validation: Validation::None,
        },
    ),
    (
        "yaskawa",
        StrategyDescriptor {
            url_template: "https://www.e-mechatronics.com/product/search/?q={model}",
            method: MethodKind::Render,
            validation: Validation::Probe {
                no_results_markers: &["検索結果がありません", "No results"],
            },
        },
    ),
    (
        "安川電機",
        StrategyDescriptor {
            url_template: "https://www.e-mechatronics.com/product/search/?q={model}",
            method: MethodKind::Render,
            validation: Validation::Probe {
                no_results_markers: &["検索結果がありません", "No results"],
            },
        },
    ),
];

fn descriptor_for(maker: &str) -> Option<(&'static str, &'static StrategyDescriptor)> {
    let needle = maker.trim().to_lowercase();
    REGISTRY
        .iter()
        .find(|(key, _)| *key == needle)
        .map(|(key, descriptor)| (*key, descriptor))
}

fn expand(template: &str, model: &str) -> String {
    template.replace("{model}", &urlencoding::encode(model))
}

fn build_method(kind: MethodKind, model: &str) -> (FetchMethod, Option<String>) {
    match kind {
        MethodKind::Render => (FetchMethod::Render, None),
        MethodKind::RenderShielded => (FetchMethod::RenderShielded, None),
        MethodKind::SiteSearch => (
            FetchMethod::SiteSearch {
                model: model.to_string(),
            },
            None,
        ),
        MethodKind::Document => (FetchMethod::Document, None),
        MethodKind::RenderLocalized { fallback_template } => {
            let fallback = expand(fallback_template, model);
            (FetchMethod::Render, Some(fallback))
        }
    }
}

pub struct StrategyResolver<'a> {
    probe: &'a dyn BaseProbeFetch,
}

impl<'a> StrategyResolver<'a> {
    pub fn new(probe: &'a dyn BaseProbeFetch) -> Self {
        Self { probe }
    }

    /// Resolve a manufacturer-specific strategy. `None` means "use generic
    /// search" — returned for unknown manufacturers and for every
    /// validation failure.
    pub async fn resolve(&self, maker: &str, model: &str) -> Option<Strategy> {
        let (key, descriptor) = descriptor_for(maker)?;
        let url = expand(descriptor.url_template, model);
        let (method, fallback_url) = build_method(descriptor.method, model);

        // Localized modes carry their fallback page in the method itself.
        let method = match fallback_url {
            Some(fallback) => FetchMethod::RenderLocalized {
                primary_url: url.clone(),
                fallback_url: fallback,
            },
            None => method,
        };

        match descriptor.validation {
            Validation::None => Some(Strategy {
                key,
                url,
                method,
                content: None,
            }),
            Validation::Probe404 { not_found_markers } => {
                let body = self.checked_probe(key, &url).await?;
                if contains_any(&body, not_found_markers) {
                    tracing::info!(maker = key, model, "product page not found, falling back to search");
                    return None;
                }
                Some(Strategy {
                    key,
                    url,
                    method,
                    content: None,
                })
            }
            Validation::ProbeExtract { link_pattern } => {
                let body = self.checked_probe(key, &url).await?;
                let detail_url = extract_detail_link(&url, &body, link_pattern)?;
                Some(Strategy {
                    key,
                    url: detail_url,
                    method,
                    content: None,
                })
            }
            Validation::Probe { no_results_markers } => {
                let body = self.checked_probe(key, &url).await?;
                if contains_any(&body, no_results_markers) {
                    tracing::info!(maker = key, model, "no site results, falling back to search");
                    return None;
                }
                Some(Strategy {
                    key,
                    url,
                    method,
                    content: Some(body),
                })
            }
        }
    }

    async fn checked_probe(&self, key: &str, url: &str) -> Option<String> {
        match self.probe.probe(url).await {
            Ok(body) => Some(body),
            Err(e) => {
                // A flaky probe must never abort job creation.
                tracing::warn!(maker = key, url, "strategy probe failed, falling back to search: {e}");
                None
            }
        }
    }
}

fn contains_any(body: &str, markers: &[&str]) -> bool {
    markers.iter().any(|m| body.contains(m))
}

/// Find the first product-detail link matching the pattern and absolutize
/// it against the probed page's URL.
fn extract_detail_link(base_url: &str, body: &str, pattern: &str) -> Option<String> {
    let regex = Regex::new(pattern).ok()?;
    let path = regex.find(body)?.as_str();
    let base = Url::parse(base_url).ok()?;
    base.join(path).ok().map(|u| u.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kernel::test_dependencies::MockProbeFetch;

    #[tokio::test]
    async fn unknown_manufacturer_resolves_to_none() {
        let probe = MockProbeFetch::new();
        let resolver = StrategyResolver::new(&probe);
        assert!(resolver.resolve("Acme", "X1").await.is_none());
        assert!(probe.calls().is_empty());
    }

    #[tokio::test]
    async fn manufacturer_match_is_case_and_whitespace_insensitive() {
        let probe = MockProbeFetch::new();
        let resolver = StrategyResolver::new(&probe);
        let strategy = resolver.resolve("  FANUC ", "R-30iB").await.unwrap();
        assert_eq!(strategy.key, "fanuc");
        assert!(matches!(strategy.method, FetchMethod::RenderShielded));
    }

    #[tokio::test]
    async fn site_search_mode_carries_the_model() {
        let probe = MockProbeFetch::new();
        let resolver = StrategyResolver::new(&probe);
        let strategy = resolver.resolve("Mitsubishi Electric", "FX3U-32MR").await.unwrap();
        match strategy.method {
            FetchMethod::SiteSearch { model } => assert_eq!(model, "FX3U-32MR"),
            other => panic!("unexpected method {other:?}"),
        }
    }

    #[tokio::test]
    async fn not_found_marker_falls_back_to_search() {
        let url = "https://www.fa.omron.co.jp/products/family/E2E-X5E1/";
        let probe = MockProbeFetch::new().with_body(url, "<html>ページが見つかりません</html>");
        let resolver = StrategyResolver::new(&probe);
        assert!(resolver.resolve("Omron", "E2E-X5E1").await.is_none());
        assert!(probe.was_probed(url));
    }

    #[tokio::test]
    async fn valid_product_page_resolves_without_content() {
        let url = "https://www.fa.omron.co.jp/products/family/E2E-X5E1/";
        let probe = MockProbeFetch::new().with_body(url, "<html>近接センサ E2E</html>");
        let resolver = StrategyResolver::new(&probe);
        let strategy = resolver.resolve("Omron", "E2E-X5E1").await.unwrap();
        assert_eq!(strategy.url, url);
        assert!(strategy.content.is_none());
    }

    #[tokio::test]
    async fn probe_transport_error_falls_back_to_search() {
        // MockProbeFetch fails for unscripted URLs.
        let probe = MockProbeFetch::new();
        let resolver = StrategyResolver::new(&probe);
        assert!(resolver.resolve("Omron", "E2E-X5E1").await.is_none());
        assert_eq!(probe.calls().len(), 1);
    }

    #[tokio::test]
    async fn no_results_marker_falls_back_to_search() {
        let url = "https://www.e-mechatronics.com/product/search/?q=SGD7S-120A";
        let probe = MockProbeFetch::new().with_body(url, "検索結果がありません");
        let resolver = StrategyResolver::new(&probe);
        assert!(resolver.resolve("Yaskawa", "SGD7S-120A").await.is_none());
    }

    #[tokio::test]
    async fn default_probe_success_attaches_content() {
        let url = "https://www.e-mechatronics.com/product/search/?q=SGD7S-120A";
        let probe = MockProbeFetch::new().with_body(url, "SGD7S-120A サーボパック 生産終了");
        let resolver = StrategyResolver::new(&probe);
        let strategy = resolver.resolve("Yaskawa", "SGD7S-120A").await.unwrap();
        assert!(strategy.content.as_deref().unwrap().contains("生産終了"));
    }

    #[tokio::test]
    async fn extraction_rewrites_url_to_detail_link() {
        let url = "https://www.keyence.co.jp/search/?searchword=LR-ZB250CN";
        let body = r#"<a href="/products/sensor/photoelectric/models/LR-ZB250CN/">LR-ZB250CN</a>"#;
        let probe = MockProbeFetch::new().with_body(url, body);
        let resolver = StrategyResolver::new(&probe);
        let strategy = resolver.resolve("Keyence", "LR-ZB250CN").await.unwrap();
        assert_eq!(
            strategy.url,
            "https://www.keyence.co.jp/products/sensor/photoelectric/models/LR-ZB250CN/"
        );
    }

    #[tokio::test]
    async fn extraction_miss_falls_back_to_search() {
        let url = "https://www.keyence.co.jp/search/?searchword=NOPE-1";
        let probe = MockProbeFetch::new().with_body(url, "<html>0件</html>");
        let resolver = StrategyResolver::new(&probe);
        assert!(resolver.resolve("Keyence", "NOPE-1").await.is_none());
    }

    #[tokio::test]
    async fn localized_mode_expands_both_urls() {
        let url = "https://industrial.panasonic.com/jp/products-search?keyword=AFPX-C30R";
        let probe = MockProbeFetch::new().with_body(url, "AFPX-C30R 生産中止品");
        let resolver = StrategyResolver::new(&probe);
        let strategy = resolver.resolve("Panasonic", "AFPX-C30R").await.unwrap();
        match strategy.method {
            FetchMethod::RenderLocalized { primary_url, fallback_url } => {
                assert!(primary_url.contains("/jp/"));
                assert!(fallback_url.contains("/ww/"));
            }
            other => panic!("unexpected method {other:?}"),
        }
    }
}
