//! Sitemap crawling: turn every page listed in a sitemap into a document

use futures::stream::{self, StreamExt};
use quick_xml::events::Event;
use reqwest::{Client, StatusCode};
use std::collections::HashSet;
use url::Url;

use super::parser::FileParser;
use crate::error::{Error, Result};
use crate::types::{Document, SOURCE_KEY};

/// Root element of a sitemap document
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SitemapKind {
    /// `<urlset>`: page URLs
    UrlSet,
    /// `<sitemapindex>`: URLs of further sitemaps
    Index,
}

/// Decides which sitemap URLs get crawled.
///
/// A filter containing a scheme (`https://example.com/blog`) is a plain URL
/// prefix. A host filter (`example.com`, `example.com:8080/blog`) matches the
/// host and its subdomains, with the port when one is given, optionally
/// restricted to a path prefix. A filter that is not host-like (`coredna`)
/// keeps every URL containing it.
#[derive(Debug, Clone)]
pub enum DomainFilter {
    Prefix(String),
    Host {
        host: String,
        port: Option<u16>,
        path: Option<String>,
    },
    Contains(String),
}

impl DomainFilter {
    pub fn new(domain: &str) -> Self {
        let domain = domain.trim();
        if domain.contains("://") {
            return Self::Prefix(domain.to_string());
        }

        let domain = domain.trim_end_matches('/').to_lowercase();
        let (authority, path) = match domain.split_once('/') {
            Some((authority, path)) => (authority.to_string(), Some(format!("/{}", path))),
            None => (domain.clone(), None),
        };
        let (host, port) = match authority.rsplit_once(':') {
            Some((host, port)) => match port.parse::<u16>() {
                Ok(port) => (host.to_string(), Some(port)),
                Err(_) => return Self::Contains(domain),
            },
            None => (authority, None),
        };

        if host.is_empty() || (!host.contains('.') && port.is_none() && host != "localhost") {
            return Self::Contains(domain);
        }
        Self::Host { host, port, path }
    }

    pub fn matches(&self, candidate: &str) -> bool {
        match self {
            Self::Prefix(prefix) => candidate.starts_with(prefix.as_str()),
            Self::Contains(needle) => candidate.to_lowercase().contains(needle.as_str()),
            Self::Host { host, port, path } => {
                let Ok(url) = Url::parse(candidate) else {
                    return false;
                };
                let Some(candidate_host) = url.host_str() else {
                    return false;
                };
                let candidate_host = candidate_host.to_lowercase();

                let host_ok = candidate_host == *host
                    || candidate_host.ends_with(&format!(".{}", host));
                let port_ok = port
                    .map(|p| url.port_or_known_default() == Some(p))
                    .unwrap_or(true);
                let path_ok = path
                    .as_deref()
                    .map(|p| url.path().starts_with(p))
                    .unwrap_or(true);

                host_ok && port_ok && path_ok
            }
        }
    }
}

/// Loads web pages listed in a sitemap
#[derive(Clone)]
pub struct SitemapLoader {
    client: Client,
    concurrency: usize,
}

impl SitemapLoader {
    /// Create a loader that fetches up to `concurrency` pages at once
    pub fn new(client: Client, concurrency: usize) -> Self {
        Self {
            client,
            concurrency: concurrency.max(1),
        }
    }

    /// Crawl the pages of `sitemap_url` that match `domain`.
    ///
    /// Fails with a validation error on blank arguments and with a connection
    /// error when the sitemap itself cannot be reached or read. Individual
    /// pages that fail are skipped.
    pub async fn load(&self, sitemap_url: &str, domain: &str) -> Result<Vec<Document>> {
        let sitemap_url = sitemap_url.trim();
        let domain = domain.trim();

        if sitemap_url.is_empty() {
            return Err(Error::validation("Sitemap URL not provided"));
        }
        if domain.is_empty() {
            return Err(Error::validation("Domain not provided"));
        }
        let sitemap = Url::parse(sitemap_url)
            .map_err(|e| Error::validation(format!("Invalid sitemap URL '{}': {}", sitemap_url, e)))?;

        self.check_reachable(&sitemap).await?;

        let filter = DomainFilter::new(domain);
        let page_urls = self.collect_page_urls(&sitemap).await?;
        let total = page_urls.len();

        let mut seen = HashSet::new();
        let selected: Vec<String> = page_urls
            .into_iter()
            .filter(|u| filter.matches(u))
            .filter(|u| seen.insert(u.clone()))
            .collect();

        tracing::info!(
            "Sitemap {} lists {} URLs, {} match '{}'",
            sitemap,
            total,
            selected.len(),
            domain
        );

        let documents: Vec<Document> = stream::iter(selected)
            .map(|page| async move {
                match self.fetch_page(&page).await {
                    Ok(doc) => Some(doc),
                    Err(e) => {
                        tracing::warn!("Skipping page {}: {}", page, e);
                        None
                    }
                }
            })
            .buffered(self.concurrency)
            .filter_map(|doc| async move { doc })
            .collect()
            .await;

        tracing::info!("Loaded {} pages from {}", documents.len(), sitemap);
        Ok(documents)
    }

    /// HEAD the sitemap; servers that refuse HEAD (405) still count as up
    async fn check_reachable(&self, sitemap: &Url) -> Result<()> {
        let response = self
            .client
            .head(sitemap.clone())
            .send()
            .await
            .map_err(|e| Error::connection(format!("Sitemap {} is unreachable: {}", sitemap, e)))?;

        let status = response.status();
        if status.is_success() || status == StatusCode::METHOD_NOT_ALLOWED {
            Ok(())
        } else {
            Err(Error::connection(format!(
                "Sitemap {} is unreachable: HTTP {}",
                sitemap, status
            )))
        }
    }

    /// Page URLs of a sitemap, following a sitemap index one level down
    async fn collect_page_urls(&self, sitemap: &Url) -> Result<Vec<String>> {
        let xml = self.fetch_text(sitemap.as_str()).await.map_err(|e| {
            Error::connection(format!("Failed to fetch sitemap {}: {}", sitemap, e))
        })?;

        let (kind, locs) = parse_sitemap(&xml)?;
        if kind == SitemapKind::UrlSet {
            return Ok(locs);
        }

        tracing::debug!("{} is a sitemap index with {} children", sitemap, locs.len());

        let mut pages = Vec::new();
        for child in locs {
            let parsed = match self.fetch_text(&child).await {
                Ok(xml) => parse_sitemap(&xml),
                Err(e) => Err(e),
            };
            match parsed {
                Ok((SitemapKind::UrlSet, urls)) => pages.extend(urls),
                Ok((SitemapKind::Index, _)) => {
                    tracing::warn!("Ignoring nested sitemap index {}", child);
                }
                Err(e) => tracing::warn!("Skipping child sitemap {}: {}", child, e),
            }
        }

        Ok(pages)
    }

    async fn fetch_page(&self, url: &str) -> Result<Document> {
        let html = self.fetch_text(url).await?;
        let text = FileParser::html_to_text(&html);

        Ok(Document::new(text).with_metadata(SOURCE_KEY, url))
    }

    async fn fetch_text(&self, url: &str) -> Result<String> {
        let response = self.client.get(url).send().await?.error_for_status()?;
        Ok(response.text().await?)
    }
}

/// Parse a sitemap document into its kind and `<loc>` values
pub fn parse_sitemap(xml: &str) -> Result<(SitemapKind, Vec<String>)> {
    let mut reader = quick_xml::Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut kind = None;
    let mut locs = Vec::new();
    let mut in_loc = false;
    let mut current = String::new();

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => match e.local_name().as_ref() {
                b"urlset" if kind.is_none() => kind = Some(SitemapKind::UrlSet),
                b"sitemapindex" if kind.is_none() => kind = Some(SitemapKind::Index),
                b"loc" => {
                    in_loc = true;
                    current.clear();
                }
                _ => {}
            },
            Ok(Event::Text(e)) if in_loc => {
                let text = e
                    .unescape()
                    .map_err(|e| Error::connection(format!("Invalid sitemap XML: {}", e)))?;
                current.push_str(&text);
            }
            Ok(Event::CData(e)) if in_loc => {
                current.push_str(&String::from_utf8_lossy(&e.into_inner()));
            }
            Ok(Event::End(e)) if e.local_name().as_ref() == b"loc" => {
                in_loc = false;
                let loc = current.trim();
                if !loc.is_empty() {
                    locs.push(loc.to_string());
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(Error::connection(format!(
                    "Invalid sitemap XML at position {}: {}",
                    reader.buffer_position(),
                    e
                )))
            }
            _ => {}
        }
    }

    match kind {
        Some(kind) => Ok((kind, locs)),
        None => Err(Error::connection(
            "Response is not a sitemap (no <urlset> or <sitemapindex>)",
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn urlset(urls: &[String]) -> String {
        let entries: String = urls
            .iter()
            .map(|u| format!("<url><loc>{}</loc></url>", u))
            .collect();
        format!(
            r#"<?xml version="1.0" encoding="UTF-8"?>
            <urlset xmlns="http://www.sitemaps.org/schemas/sitemap/0.9">{}</urlset>"#,
            entries
        )
    }

    async fn mount_page(server: &MockServer, route: &str, body: &str) {
        Mock::given(method("GET"))
            .and(path(route))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string(format!("<html><body><p>{}</p></body></html>", body)),
            )
            .mount(server)
            .await;
    }

    #[test]
    fn test_parse_sitemap_kinds() {
        let (kind, locs) = parse_sitemap(&urlset(&[
            "https://example.com/a".into(),
            "https://example.com/b?x=1&amp;y=2".into(),
        ]))
        .unwrap();
        assert_eq!(kind, SitemapKind::UrlSet);
        assert_eq!(locs, vec!["https://example.com/a", "https://example.com/b?x=1&y=2"]);

        let index = r#"<sitemapindex><sitemap><loc> https://example.com/s1.xml </loc></sitemap></sitemapindex>"#;
        let (kind, locs) = parse_sitemap(index).unwrap();
        assert_eq!(kind, SitemapKind::Index);
        assert_eq!(locs, vec!["https://example.com/s1.xml"]);

        assert!(matches!(
            parse_sitemap("<html><body>nope</body></html>"),
            Err(Error::Connection(_))
        ));
    }

    #[test]
    fn test_domain_filter() {
        let host = DomainFilter::new("Example.com");
        assert!(host.matches("https://example.com/pricing"));
        assert!(host.matches("http://blog.example.com/post"));
        assert!(!host.matches("https://notexample.com/"));
        assert!(!host.matches("not a url"));

        let scoped = DomainFilter::new("example.com/blog/");
        assert!(scoped.matches("https://example.com/blog/post-1"));
        assert!(!scoped.matches("https://example.com/pricing"));

        let prefix = DomainFilter::new("https://example.com/guides");
        assert!(prefix.matches("https://example.com/guides/seo"));
        assert!(!prefix.matches("http://example.com/guides/seo"));
    }

    #[test]
    fn test_domain_filter_with_port() {
        let filter = DomainFilter::new("example.com:8080");
        assert!(filter.matches("http://example.com:8080/pricing"));
        assert!(!filter.matches("http://example.com:9090/pricing"));
        assert!(!filter.matches("http://example.com/pricing"));

        let ip = DomainFilter::new("127.0.0.1:8080/docs");
        assert!(ip.matches("http://127.0.0.1:8080/docs/intro"));
        assert!(!ip.matches("http://127.0.0.1:8080/pricing"));

        let https = DomainFilter::new("example.com:443");
        assert!(https.matches("https://example.com/"));
    }

    #[test]
    fn test_domain_filter_bare_label() {
        let label = DomainFilter::new("coredna");
        assert!(label.matches("https://www.coredna.com/features"));
        assert!(label.matches("https://site.com/coredna-guide"));
        assert!(!label.matches("https://example.com/"));

        assert!(DomainFilter::new("localhost").matches("http://localhost:3000/a"));
    }

    #[tokio::test]
    async fn test_blank_arguments_rejected() {
        let loader = SitemapLoader::new(Client::new(), 2);
        assert!(matches!(
            loader.load("  ", "example.com").await,
            Err(Error::Validation(_))
        ));
        assert!(matches!(
            loader.load("https://example.com/sitemap.xml", "").await,
            Err(Error::Validation(_))
        ));
    }

    #[tokio::test]
    async fn test_unreachable_sitemap() {
        let server = MockServer::start().await;
        Mock::given(method("HEAD"))
            .and(path("/sitemap.xml"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let loader = SitemapLoader::new(Client::new(), 2);
        let err = loader
            .load(&format!("{}/sitemap.xml", server.uri()), "127.0.0.1")
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Connection(_)));
    }

    #[tokio::test]
    async fn test_load_filters_and_skips_failures() {
        let server = MockServer::start().await;
        let base = server.uri();

        Mock::given(method("HEAD"))
            .and(path("/sitemap.xml"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/sitemap.xml"))
            .respond_with(ResponseTemplate::new(200).set_body_string(urlset(&[
                format!("{}/about", base),
                format!("{}/pricing", base),
                format!("{}/broken", base),
                "https://elsewhere.example/offsite".to_string(),
            ])))
            .mount(&server)
            .await;
        mount_page(&server, "/about", "We build widgets.").await;
        mount_page(&server, "/pricing", "Plans start at ten dollars.").await;
        Mock::given(method("GET"))
            .and(path("/broken"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let loader = SitemapLoader::new(Client::new(), 2);
        let docs = loader
            .load(&format!("{}/sitemap.xml", base), &base)
            .await
            .unwrap();

        assert_eq!(docs.len(), 2);
        assert_eq!(docs[0].source(), Some(format!("{}/about", base).as_str()));
        assert_eq!(docs[0].text, "We build widgets.");
        assert_eq!(docs[1].source(), Some(format!("{}/pricing", base).as_str()));
    }

    #[tokio::test]
    async fn test_sitemap_index_followed() {
        let server = MockServer::start().await;
        let base = server.uri();

        Mock::given(method("HEAD"))
            .respond_with(ResponseTemplate::new(405))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/sitemap.xml"))
            .respond_with(ResponseTemplate::new(200).set_body_string(format!(
                "<sitemapindex><sitemap><loc>{}/pages.xml</loc></sitemap></sitemapindex>",
                base
            )))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/pages.xml"))
            .respond_with(
                ResponseTemplate::new(200).set_body_string(urlset(&[format!("{}/team", base)])),
            )
            .mount(&server)
            .await;
        mount_page(&server, "/team", "Meet the team.").await;

        let loader = SitemapLoader::new(Client::new(), 4);
        let docs = loader
            .load(&format!("{}/sitemap.xml", base), "127.0.0.1")
            .await
            .unwrap();

        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].text, "Meet the team.");
    }
}
