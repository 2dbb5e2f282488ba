use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use reqwest::header::CONTENT_TYPE;
use serde_json::{Map, Value, json};
use url::Url;

use crate::auth::TokenIssuer;
use crate::error::ClientError;
use crate::response::ApiResponse;

/// Origin every request path is joined to.
pub const APP_STORE_CONNECT_API_URL: &str = "https://api.appstoreconnect.apple.com";
/// Default page cap for [`ApiClient::request_all_pages`].
pub const DEFAULT_MAX_PAGES: u32 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApiMethod {
    Get,
    Post,
    Patch,
    Delete,
}

impl ApiMethod {
    pub fn as_str(self) -> &'static str {
        match self {
            ApiMethod::Get => "GET",
            ApiMethod::Post => "POST",
            ApiMethod::Patch => "PATCH",
            ApiMethod::Delete => "DELETE",
        }
    }

    /// GET never sends a body. DELETE does, because JSON:API relationship
    /// removals carry the linkage to remove.
    pub fn carries_body(self) -> bool {
        !matches!(self, ApiMethod::Get)
    }
}

impl fmt::Display for ApiMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unsupported HTTP method '{0}'; expected one of GET, POST, PATCH, DELETE")]
pub struct UnsupportedMethod(pub String);

impl FromStr for ApiMethod {
    type Err = UnsupportedMethod;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_uppercase().as_str() {
            "GET" => Ok(ApiMethod::Get),
            "POST" => Ok(ApiMethod::Post),
            "PATCH" => Ok(ApiMethod::Patch),
            "DELETE" => Ok(ApiMethod::Delete),
            _ => Err(UnsupportedMethod(raw.to_string())),
        }
    }
}

impl From<ApiMethod> for reqwest::Method {
    fn from(method: ApiMethod) -> Self {
        match method {
            ApiMethod::Get => reqwest::Method::GET,
            ApiMethod::Post => reqwest::Method::POST,
            ApiMethod::Patch => reqwest::Method::PATCH,
            ApiMethod::Delete => reqwest::Method::DELETE,
        }
    }
}

/// Flat query map. Entries with an empty or absent value never reach the
/// wire, so optional filters left blank do not pollute the query string.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryParams(Vec<(String, Option<String>)>);

impl QueryParams {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets `key`, replacing an earlier value for the same key.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) -> &mut Self {
        self.insert(key.into(), Some(value.into()))
    }

    pub fn set_opt(&mut self, key: impl Into<String>, value: Option<impl Into<String>>) -> &mut Self {
        self.insert(key.into(), value.map(Into::into))
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.set(key, value);
        self
    }

    fn insert(&mut self, key: String, value: Option<String>) -> &mut Self {
        match self.0.iter_mut().find(|(existing, _)| *existing == key) {
            Some(entry) => entry.1 = value,
            None => self.0.push((key, value)),
        }
        self
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(existing, _)| existing == key)
            .and_then(|(_, value)| value.as_deref())
    }

    /// The pairs that will be sent.
    pub fn effective_pairs(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().filter_map(|(key, value)| match value.as_deref() {
            Some(value) if !value.is_empty() => Some((key.as_str(), value)),
            _ => None,
        })
    }

    pub fn from_url(url: &Url) -> Self {
        url.query_pairs()
            .map(|(key, value)| (key.into_owned(), value.into_owned()))
            .collect()
    }

    pub fn to_value(&self) -> Value {
        let map: Map<String, Value> = self
            .effective_pairs()
            .map(|(key, value)| (key.to_string(), Value::String(value.to_string())))
            .collect();
        Value::Object(map)
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for QueryParams {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut params = QueryParams::new();
        for (key, value) in iter {
            params.set(key, value);
        }
        params
    }
}

/// One outgoing call: method, relative path, optional body and query.
#[derive(Debug, Clone, PartialEq)]
pub struct RequestDescriptor {
    pub method: ApiMethod,
    pub path: String,
    pub body: Option<Value>,
    pub params: QueryParams,
}

impl RequestDescriptor {
    pub fn new(method: ApiMethod, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            body: None,
            params: QueryParams::new(),
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(ApiMethod::Get, path)
    }

    pub fn post(path: impl Into<String>, body: Value) -> Self {
        Self::new(ApiMethod::Post, path).with_body(body)
    }

    pub fn patch(path: impl Into<String>, body: Value) -> Self {
        Self::new(ApiMethod::Patch, path).with_body(body)
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(ApiMethod::Delete, path)
    }

    pub fn with_body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    pub fn with_params(mut self, params: QueryParams) -> Self {
        self.params = params;
        self
    }
}

/// Authenticated client for the App Store Connect REST API.
///
/// Every call mints a fresh token through the shared [`TokenIssuer`]. Calls
/// are single attempts: failures are classified and returned, never retried.
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    issuer: Arc<TokenIssuer>,
}

impl ApiClient {
    pub fn new(base_url: impl Into<String>, issuer: Arc<TokenIssuer>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into(),
            issuer,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn issuer(&self) -> &Arc<TokenIssuer> {
        &self.issuer
    }

    /// Joins `path` to the base URL and appends every non-empty parameter.
    pub fn build_url(&self, path: &str, params: Option<&QueryParams>) -> Result<Url, ClientError> {
        let separator = if path.starts_with('/') { "" } else { "/" };
        let mut url = Url::parse(&format!(
            "{}{separator}{path}",
            self.base_url.trim_end_matches('/')
        ))?;

        if let Some(params) = params {
            let mut pairs = params.effective_pairs().peekable();
            if pairs.peek().is_some() {
                url.query_pairs_mut().extend_pairs(pairs);
            }
        }
        Ok(url)
    }

    pub async fn execute(&self, descriptor: &RequestDescriptor) -> Result<ApiResponse, ClientError> {
        self.request(
            descriptor.method,
            &descriptor.path,
            descriptor.body.as_ref(),
            Some(&descriptor.params),
        )
        .await
    }

    pub async fn request(
        &self,
        method: ApiMethod,
        path: &str,
        body: Option<&Value>,
        params: Option<&QueryParams>,
    ) -> Result<ApiResponse, ClientError> {
        let url = self.build_url(path, params)?;
        self.send(method, url, body).await
    }

    async fn send(
        &self,
        method: ApiMethod,
        url: Url,
        body: Option<&Value>,
    ) -> Result<ApiResponse, ClientError> {
        let token = self.issuer.issue_token()?;
        tracing::debug!(%method, path = %url.path(), query = url.query().unwrap_or_default(), "sending App Store Connect request");

        let mut request = self
            .http
            .request(method.into(), url)
            .bearer_auth(token)
            .header(CONTENT_TYPE, "application/json");
        if let Some(body) = body.filter(|_| method.carries_body()) {
            request = request.json(body);
        }

        let response = request.send().await?;
        let status = response.status();
        let text = response.text().await?;
        tracing::debug!(%method, status = status.as_u16(), bytes = text.len(), "App Store Connect responded");

        if !status.is_success() {
            return Err(ClientError::from_failed_response(status, &text));
        }
        if text.trim().is_empty() {
            return Ok(ApiResponse::empty());
        }
        serde_json::from_str(&text).map_err(|source| ClientError::Decode { source })
    }

    /// Follows `links.next` from `path`, concatenating `data` and `included`
    /// across at most `max_pages` pages.
    ///
    /// When the cap stops the walk with a page still pending, the result is
    /// marked with `meta.paging.truncated` and carries the pending
    /// `links.next`. An error on any page discards everything fetched so far.
    pub async fn request_all_pages(
        &self,
        path: &str,
        params: Option<&QueryParams>,
        max_pages: u32,
    ) -> Result<ApiResponse, ClientError> {
        let mut data = Vec::new();
        let mut included = Vec::new();
        let mut current_url = self.build_url(path, params)?;
        let mut pending_next = None;
        let mut pages_fetched = 0;

        while pages_fetched < max_pages {
            let page = self.send(ApiMethod::Get, current_url.clone(), None).await?;
            let next = page.next_link().map(str::to_owned);

            match page.data {
                Value::Array(items) => data.extend(items),
                Value::Null => {}
                single => data.push(single),
            }
            if let Some(items) = page.included {
                included.extend(items);
            }

            let Some(next) = next else {
                pending_next = None;
                break;
            };
            current_url = self.next_page_url(&next)?;
            pending_next = Some(next);
            pages_fetched += 1;
        }

        let mut paging = json!({ "total": data.len() });
        let mut links = None;
        if let Some(next) = pending_next {
            tracing::debug!(max_pages, total = data.len(), "pagination stopped at page cap");
            paging["truncated"] = Value::Bool(true);
            links = Some(Map::from_iter([("next".to_string(), Value::String(next))]));
        }

        Ok(ApiResponse {
            data: Value::Array(data),
            included: (!included.is_empty()).then_some(included),
            links,
            meta: Some(json!({ "paging": paging })),
            extra: Map::new(),
        })
    }

    /// Turns a `links.next` value into the next request URL. Only the path
    /// and query of the link are kept, re-rooted under the configured base so
    /// tokens never leave it and a base path prefix is not doubled.
    fn next_page_url(&self, link: &str) -> Result<Url, ClientError> {
        let base = Url::parse(&self.base_url)?;
        let next = match Url::parse(link) {
            Ok(url) => url,
            Err(url::ParseError::RelativeUrlWithoutBase) => base.join(link)?,
            Err(err) => return Err(err.into()),
        };

        let prefix = base.path().trim_end_matches('/');
        let path = match next.path().strip_prefix(prefix) {
            Some(rest) if !prefix.is_empty() && (rest.is_empty() || rest.starts_with('/')) => rest,
            _ => next.path(),
        };
        self.build_url(path, Some(&QueryParams::from_url(&next)))
    }
}
