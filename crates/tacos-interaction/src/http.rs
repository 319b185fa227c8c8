//! Raw HTTP seam to the remote ordering site.
//!
//! Everything above this module works with [`RemoteRequest`] and
//! [`RemoteResponse`]; only [`ReqwestRemote`] knows about reqwest. Tests
//! substitute a scripted [`RemoteHttp`] implementation.

use crate::cookies::{parse_cookie_header, parse_set_cookies};
use async_trait::async_trait;
use reqwest::header::{COOKIE, HeaderMap, HeaderName, HeaderValue, LOCATION, SET_COOKIE};
use reqwest::redirect::Policy;
use reqwest::{Client, StatusCode, Url, multipart};
use serde::de::DeserializeOwned;
use std::fmt;
use tacos_core::config::AdapterConfig;
use tacos_core::session::{CookieMap, merge_cookie_maps, render_cookie_header};
use tacos_core::{Result, TacosError};

pub const TOKEN_HEADER: &str = "X-CSRF-Token";
pub const TOKEN_FIELD: &str = "csrf_token";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Post,
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HttpMethod::Get => write!(f, "GET"),
            HttpMethod::Post => write!(f, "POST"),
        }
    }
}

/// Request body in one of the encodings the remote site accepts.
///
/// Form and multipart bodies are ordered field lists: array fields such as
/// `viande[]` repeat their name once per value.
#[derive(Debug, Clone, PartialEq)]
pub enum RemoteBody {
    Empty,
    Form(Vec<(String, String)>),
    Multipart(Vec<(String, String)>),
    Json(serde_json::Value),
}

#[derive(Debug, Clone, PartialEq)]
pub struct RemoteRequest {
    pub method: HttpMethod,
    /// Path and query relative to the site root, starting with `/`
    pub path: String,
    pub headers: Vec<(String, String)>,
    pub body: RemoteBody,
}

impl RemoteRequest {
    pub fn get(path: impl Into<String>) -> Self {
        Self {
            method: HttpMethod::Get,
            path: path.into(),
            headers: Vec::new(),
            body: RemoteBody::Empty,
        }
    }

    pub fn post_form(path: impl Into<String>, fields: Vec<(String, String)>) -> Self {
        Self {
            method: HttpMethod::Post,
            path: path.into(),
            headers: Vec::new(),
            body: RemoteBody::Form(fields),
        }
    }

    pub fn post_multipart(path: impl Into<String>, fields: Vec<(String, String)>) -> Self {
        Self {
            method: HttpMethod::Post,
            path: path.into(),
            headers: Vec::new(),
            body: RemoteBody::Multipart(fields),
        }
    }

    pub fn post_json(path: impl Into<String>, body: serde_json::Value) -> Self {
        Self {
            method: HttpMethod::Post,
            path: path.into(),
            headers: Vec::new(),
            body: RemoteBody::Json(body),
        }
    }

    /// Sets a header, replacing any previous value with the same name.
    pub fn with_header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.headers.retain(|(n, _)| !n.eq_ignore_ascii_case(name));
        self.headers.push((name.to_string(), value.into()));
        self
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// First value of a form or multipart field.
    pub fn field(&self, name: &str) -> Option<&str> {
        self.body_fields()
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    /// Every value of a (possibly repeated) form or multipart field.
    pub fn fields<'a>(&'a self, name: &str) -> Vec<&'a str> {
        self.body_fields()
            .iter()
            .filter(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
            .collect()
    }

    fn body_fields(&self) -> &[(String, String)] {
        match &self.body {
            RemoteBody::Form(fields) | RemoteBody::Multipart(fields) => fields.as_slice(),
            RemoteBody::Empty | RemoteBody::Json(_) => &[],
        }
    }

    /// Attaches the jar as a `Cookie` header (or removes it for an empty jar).
    pub fn with_cookies(mut self, cookies: &CookieMap) -> Self {
        match render_cookie_header(cookies) {
            Some(header) => self.with_header("Cookie", header),
            None => {
                self.headers.retain(|(n, _)| !n.eq_ignore_ascii_case("Cookie"));
                self
            }
        }
    }

    /// Attaches an anti-forgery token as header and, for form bodies, as the
    /// `csrf_token` field. A token from a previous attempt is replaced.
    pub fn with_token(mut self, token: &str) -> Self {
        if let RemoteBody::Form(fields) | RemoteBody::Multipart(fields) = &mut self.body {
            fields.retain(|(n, _)| n != TOKEN_FIELD);
            fields.push((TOKEN_FIELD.to_string(), token.to_string()));
        }
        self.with_header(TOKEN_HEADER, token)
    }

    /// Field names only, for logs that must not leak values.
    pub fn field_names(&self) -> Vec<&str> {
        match &self.body {
            RemoteBody::Form(fields) | RemoteBody::Multipart(fields) => {
                fields.iter().map(|(n, _)| n.as_str()).collect()
            }
            RemoteBody::Empty | RemoteBody::Json(_) => Vec::new(),
        }
    }
}

/// Any HTTP answer, whatever its status.
#[derive(Debug, Clone, PartialEq)]
pub struct RemoteResponse {
    pub status: u16,
    pub body: String,
    /// Raw `Set-Cookie` header values
    pub set_cookies: Vec<String>,
}

impl RemoteResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
            set_cookies: Vec::new(),
        }
    }

    pub fn with_set_cookie(mut self, header: impl Into<String>) -> Self {
        self.set_cookies.push(header.into());
        self
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Cookies issued by this response.
    pub fn cookies(&self) -> CookieMap {
        parse_set_cookies(self.set_cookies.iter().map(String::as_str))
    }

    pub fn json<T: DeserializeOwned>(&self) -> Result<T> {
        serde_json::from_str(&self.body).map_err(|e| {
            TacosError::DecodeFailure(format!("Expected JSON body (HTTP {}): {}", self.status, e))
        })
    }
}

/// Sends requests to the remote site.
///
/// Implementations return `Ok` for every HTTP answer, including 4xx/5xx;
/// classification happens above this seam. `Err(TacosError::Unreachable)`
/// means no response was received at all.
#[async_trait]
pub trait RemoteHttp: Send + Sync {
    async fn send(&self, request: &RemoteRequest) -> Result<RemoteResponse>;
}

/// reqwest-backed implementation.
///
/// Cookies are managed per session by the caller, so the client itself keeps
/// no cookie store. Redirects are followed here rather than by reqwest so
/// that cookies set on an intermediate hop reach both the next hop and the
/// returned response. In proxy mode requests go to the proxy, which reads the
/// real origin from `X-Target-URL`.
#[derive(Clone)]
pub struct ReqwestRemote {
    client: Client,
    endpoint: String,
    base_url: String,
    referer: String,
    max_redirects: usize,
}

impl ReqwestRemote {
    pub fn new(config: &AdapterConfig) -> Result<Self> {
        let base_url = config.trimmed_base_url().to_string();

        let mut default_headers = HeaderMap::new();
        default_headers.insert(
            reqwest::header::ACCEPT,
            HeaderValue::from_static("text/html,application/json;q=0.9,*/*;q=0.8"),
        );
        default_headers.insert(
            reqwest::header::ACCEPT_LANGUAGE,
            HeaderValue::from_static("fr-CH,fr;q=0.9,en;q=0.8"),
        );

        let endpoint = match &config.proxy {
            Some(proxy) => {
                default_headers.insert("X-Target-URL", header_value(&base_url)?);
                if let Some(api_key) = &proxy.api_key {
                    default_headers.insert("X-API-Key", header_value(api_key)?);
                }
                proxy.url.trim_end_matches('/').to_string()
            }
            None => base_url.clone(),
        };

        let client = Client::builder()
            .user_agent(config.user_agent.clone())
            .default_headers(default_headers)
            .redirect(Policy::none())
            .timeout(config.request_timeout())
            .build()
            .map_err(|e| TacosError::config(format!("Failed to build HTTP client: {}", e)))?;

        tracing::debug!(
            endpoint = %endpoint,
            proxied = config.proxy.is_some(),
            "Initialized remote HTTP client"
        );

        Ok(Self {
            client,
            referer: format!("{}{}", base_url, config.token_path),
            endpoint,
            base_url,
            max_redirects: config.max_redirects,
        })
    }

    fn url(&self, path: &str) -> String {
        if path.starts_with('/') {
            format!("{}{}", self.endpoint, path)
        } else {
            format!("{}/{}", self.endpoint, path)
        }
    }
}

fn header_value(value: &str) -> Result<HeaderValue> {
    HeaderValue::from_str(value)
        .map_err(|e| TacosError::config(format!("Invalid header value '{}': {}", value, e)))
}

impl ReqwestRemote {
    /// One hop. The `Cookie` header comes from `jar`, not from `headers`.
    async fn dispatch(
        &self,
        method: HttpMethod,
        url: &str,
        headers: &[(String, String)],
        body: &RemoteBody,
        jar: &CookieMap,
    ) -> Result<reqwest::Response> {
        let mut builder = match method {
            HttpMethod::Get => self.client.get(url),
            HttpMethod::Post => self
                .client
                .post(url)
                .header("X-Requested-With", "XMLHttpRequest")
                .header(reqwest::header::ORIGIN, &self.base_url)
                .header(reqwest::header::REFERER, &self.referer),
        };

        for (name, value) in headers {
            if name.eq_ignore_ascii_case(COOKIE.as_str()) {
                continue;
            }
            let name = HeaderName::from_bytes(name.as_bytes()).map_err(|e| {
                TacosError::InvalidRequest(format!("Invalid header name '{}': {}", name, e))
            })?;
            builder = builder.header(name, header_value(value)?);
        }
        if let Some(cookie) = render_cookie_header(jar) {
            builder = builder.header(COOKIE, header_value(&cookie)?);
        }

        builder = match body {
            RemoteBody::Empty => builder,
            RemoteBody::Form(fields) => builder.form(fields),
            RemoteBody::Json(value) => builder.json(value),
            RemoteBody::Multipart(fields) => {
                let form = fields
                    .iter()
                    .fold(multipart::Form::new(), |form, (name, value)| {
                        form.text(name.clone(), value.clone())
                    });
                builder.multipart(form)
            }
        };

        tracing::debug!(method = %method, url = %url, "Sending remote request");

        builder
            .send()
            .await
            .map_err(|e| TacosError::unreachable(url, e.to_string()))
    }
}

/// Target of a redirect, if the response is one we follow.
fn redirect_target(current: &str, response: &reqwest::Response) -> Result<Option<Url>> {
    if !response.status().is_redirection() {
        return Ok(None);
    }
    let Some(location) = response
        .headers()
        .get(LOCATION)
        .and_then(|v| v.to_str().ok())
    else {
        return Ok(None);
    };
    Url::parse(current)
        .and_then(|base| base.join(location))
        .map(Some)
        .map_err(|e| TacosError::Remote {
            status: response.status().as_u16(),
            message: format!("Invalid redirect location '{}': {}", location, e),
        })
}

#[async_trait]
impl RemoteHttp for ReqwestRemote {
    async fn send(&self, request: &RemoteRequest) -> Result<RemoteResponse> {
        let mut url = self.url(&request.path);
        let mut method = request.method;
        let mut body = request.body.clone();
        let mut jar = request
            .header(COOKIE.as_str())
            .map(parse_cookie_header)
            .unwrap_or_default();
        let mut set_cookies: Vec<String> = Vec::new();
        let mut redirects = 0;

        loop {
            let response = self
                .dispatch(method, &url, &request.headers, &body, &jar)
                .await?;

            let hop_cookies: Vec<String> = response
                .headers()
                .get_all(SET_COOKIE)
                .iter()
                .filter_map(|v| v.to_str().ok())
                .map(str::to_string)
                .collect();
            merge_cookie_maps(
                &mut jar,
                &parse_set_cookies(hop_cookies.iter().map(String::as_str)),
            );
            set_cookies.extend(hop_cookies);

            let Some(next) = redirect_target(&url, &response)? else {
                let status = response.status().as_u16();
                let body = response.text().await.map_err(|e| {
                    TacosError::unreachable(url.clone(), format!("Failed to read body: {}", e))
                })?;

                tracing::debug!(status, url = %url, bytes = body.len(), "Received remote response");

                return Ok(RemoteResponse {
                    status,
                    body,
                    set_cookies,
                });
            };

            if redirects >= self.max_redirects {
                return Err(TacosError::Remote {
                    status: response.status().as_u16(),
                    message: format!("Stopped after {} redirects at {}", redirects, url),
                });
            }
            redirects += 1;

            // 307/308 replay the request; every other redirect becomes a GET.
            if !matches!(
                response.status(),
                StatusCode::TEMPORARY_REDIRECT | StatusCode::PERMANENT_REDIRECT
            ) {
                method = HttpMethod::Get;
                body = RemoteBody::Empty;
            }

            tracing::debug!(from = %url, to = %next, "Following redirect");
            url = next.to_string();
        }
    }
}
