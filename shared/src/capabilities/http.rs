use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

use crux_http::Http;

use crate::event::Event;

pub type HttpCapability = Http<Event>;

pub const ACCEPT: &str = "Accept";
pub const CACHE_CONTROL: &str = "Cache-Control";

/// An absolute http(s) URL, resolved against the page location when the
/// caller supplied a relative one.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RequestUrl {
    url: String,
}

impl RequestUrl {
    pub fn parse(url: &str) -> Result<Self, HttpError> {
        Url::parse(url)
            .map_err(|e| invalid_url(url, e.to_string()))
            .and_then(Self::from_url)
    }

    /// Resolves `reference` against `base` the way a browser resolves an
    /// `href`: absolute references pass through, relative ones are joined.
    pub fn resolve(base: &Url, reference: &str) -> Result<Self, HttpError> {
        base.join(reference)
            .map_err(|e| invalid_url(reference, e.to_string()))
            .and_then(Self::from_url)
    }

    pub fn as_str(&self) -> &str {
        &self.url
    }

    pub fn to_url(&self) -> Result<Url, HttpError> {
        Url::parse(&self.url).map_err(|e| invalid_url(&self.url, e.to_string()))
    }

    fn from_url(parsed: Url) -> Result<Self, HttpError> {
        if !matches!(parsed.scheme(), "http" | "https") {
            let reason = format!("scheme '{}' is not fetchable", parsed.scheme());
            return Err(invalid_url(parsed.as_str(), reason));
        }
        if parsed.host_str().is_none() {
            return Err(invalid_url(parsed.as_str(), "URL has no host".into()));
        }
        Ok(Self {
            url: parsed.into(),
        })
    }
}

/// Error values quote at most the first 100 bytes of the offending URL.
fn invalid_url(url: &str, reason: String) -> HttpError {
    let shown = if url.len() <= 100 {
        url.to_string()
    } else {
        let cut = (0..=100).rev().find(|i| url.is_char_boundary(*i)).unwrap_or(0);
        format!("{}...", &url[..cut])
    };
    HttpError::InvalidUrl { url: shown, reason }
}

impl std::fmt::Display for RequestUrl {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.url)
    }
}

/// A GET the core wants the shell to make. The gallery never sends bodies
/// and only ever sets the two headers it has constants for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchRequest {
    url: RequestUrl,
    headers: Vec<(&'static str, String)>,
}

impl FetchRequest {
    pub fn get(url: RequestUrl) -> Self {
        Self {
            url,
            headers: Vec::new(),
        }
    }

    pub fn accept(self, media_type: &str) -> Self {
        self.with_header(ACCEPT, media_type)
    }

    /// Bypasses the browser HTTP cache, like `fetch(url, { cache: "no-store" })`.
    pub fn no_store(self) -> Self {
        self.with_header(CACHE_CONTROL, "no-store")
    }

    fn with_header(mut self, name: &'static str, value: &str) -> Self {
        self.headers.retain(|(n, _)| !n.eq_ignore_ascii_case(name));
        self.headers.push((name, value.to_string()));
        self
    }

    pub fn url(&self) -> &RequestUrl {
        &self.url
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn headers(&self) -> impl Iterator<Item = (&'static str, &str)> {
        self.headers.iter().map(|(n, v)| (*n, v.as_str()))
    }

    pub fn is_no_store(&self) -> bool {
        self.header(CACHE_CONTROL) == Some("no-store")
    }

    /// Hands the request to the shell. The response comes back as `make_event`.
    pub fn send<F>(&self, http: &HttpCapability, make_event: F)
    where
        F: FnOnce(crux_http::Result<crux_http::Response<String>>) -> Event + Send + 'static,
    {
        let mut builder = http.get(self.url.as_str());
        for (name, value) in self.headers() {
            builder = builder.header(name, value);
        }
        builder.expect_string().send(make_event);
    }
}

#[derive(Debug, Clone, Error, Serialize, Deserialize, PartialEq, Eq)]
pub enum HttpError {
    #[error("invalid URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("request to {url} failed: {message}")]
    Transport { url: String, message: String },

    #[error("HTTP error {status} from {url}")]
    HttpStatus { status: u16, url: String },

    #[error("invalid response from {url}: {reason}")]
    InvalidResponse { url: String, reason: String },
}

impl HttpError {
    pub fn status(&self) -> Option<u16> {
        match self {
            HttpError::HttpStatus { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// A completed 2xx response, reduced to what the source strategies read.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FetchedPage {
    url: RequestUrl,
    body: String,
}

impl FetchedPage {
    pub fn new(url: RequestUrl, body: impl Into<String>) -> Self {
        Self {
            url,
            body: body.into(),
        }
    }

    /// Reads the shell's answer to a request for `url`. Transport failures and
    /// non-2xx statuses both become errors.
    pub fn from_response(
        url: &RequestUrl,
        result: crux_http::Result<crux_http::Response<String>>,
    ) -> Result<Self, HttpError> {
        let response = result.map_err(|e| HttpError::Transport {
            url: url.to_string(),
            message: e.to_string(),
        })?;
        if !response.status().is_success() {
            return Err(HttpError::HttpStatus {
                status: u16::from(response.status()),
                url: url.to_string(),
            });
        }
        Ok(Self::new(url.clone(), response.body().cloned().unwrap_or_default()))
    }

    /// The URL that was requested; relative links in the body resolve
    /// against it.
    pub fn url(&self) -> &RequestUrl {
        &self.url
    }

    pub fn body(&self) -> &str {
        &self.body
    }

    pub fn json<T: serde::de::DeserializeOwned>(&self) -> Result<T, HttpError> {
        serde_json::from_str(&self.body).map_err(|e| HttpError::InvalidResponse {
            url: self.url.to_string(),
            reason: format!("failed to parse JSON: {e}"),
        })
    }
}

pub type FetchResult = Result<FetchedPage, HttpError>;

#[cfg(test)]
mod tests {
    use super::*;
    use crux_http::testing::ResponseBuilder;

    fn page() -> Url {
        Url::parse("https://alice.github.io/photos/index.html").unwrap()
    }

    #[test]
    fn test_url_rejects_empty_and_non_http_scheme() {
        assert!(RequestUrl::parse("").is_err());
        assert!(RequestUrl::parse("javascript:alert(1)").is_err());
        assert!(RequestUrl::parse("ftp://files.example.com/a.jpg").is_err());
        assert!(RequestUrl::resolve(&page(), "data:text/plain,hi").is_err());
    }

    #[test]
    fn test_url_keeps_long_links() {
        let long = format!("https://example.com/{}.jpg", "a".repeat(3000));
        assert_eq!(RequestUrl::parse(&long).unwrap().as_str(), long);
    }

    #[test]
    fn test_url_resolves_relative_against_page() {
        let url = RequestUrl::resolve(&page(), "images/manifest.json").unwrap();
        assert_eq!(url.as_str(), "https://alice.github.io/photos/images/manifest.json");

        let absolute = RequestUrl::resolve(&page(), "https://cdn.example.com/a.jpg").unwrap();
        assert_eq!(absolute.as_str(), "https://cdn.example.com/a.jpg");
    }

    #[test]
    fn test_request_headers_replace_case_insensitively() {
        let url = RequestUrl::parse("https://example.com/images/").unwrap();
        let request = FetchRequest::get(url).accept("text/html").accept("application/json").no_store();
        assert_eq!(request.headers().count(), 2);
        assert_eq!(request.header("accept"), Some("application/json"));
        assert!(request.is_no_store());
    }

    #[test]
    fn test_response_body_is_kept() {
        let url = RequestUrl::parse("https://example.com/images/manifest.json").unwrap();
        let response = ResponseBuilder::ok().body("[\"a.jpg\"]".to_string()).build();
        let page = FetchedPage::from_response(&url, Ok(response)).unwrap();
        assert_eq!(page.json::<Vec<String>>().unwrap(), vec!["a.jpg"]);
    }

    #[test]
    fn test_json_reports_invalid_response() {
        let url = RequestUrl::parse("https://example.com/images/manifest.json").unwrap();
        let err = FetchedPage::new(url, "<html>").json::<serde_json::Value>().unwrap_err();
        assert!(matches!(err, HttpError::InvalidResponse { .. }));
    }
}
