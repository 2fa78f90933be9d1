// File: vxs-server/src/request.rs
// Purpose: Owned request/response values passed through the dispatcher

use axum::body::{Body, Bytes};
use axum::http::{header, request::Parts, HeaderMap, HeaderValue, Method, StatusCode, Uri};
use axum::response::{Html, IntoResponse, Response};
use serde::Serialize;
use tracing::warn;
use vxs_loader::LoaderRequest;
use vxs_router::Params;

/// The parts of an HTTP request the dispatcher looks at
#[derive(Debug, Clone)]
pub struct IncomingRequest {
    pub method: Method,
    pub uri: Uri,
    pub headers: HeaderMap,
}

impl IncomingRequest {
    pub fn new(method: Method, uri: Uri, headers: HeaderMap) -> Self {
        Self { method, uri, headers }
    }

    /// A bare GET for `url`; an unparsable url becomes `/`.
    pub fn get(url: &str) -> Self {
        Self::new(Method::GET, url.parse().unwrap_or_default(), HeaderMap::new())
    }

    pub fn from_parts(parts: &Parts) -> Self {
        Self::new(parts.method.clone(), parts.uri.clone(), parts.headers.clone())
    }

    pub fn pathname(&self) -> &str {
        self.uri.path()
    }

    pub fn query(&self) -> &str {
        self.uri.query().unwrap_or_default()
    }

    /// Path plus query; the single-flight key.
    pub fn url(&self) -> String {
        self.uri
            .path_and_query()
            .map(|pq| pq.as_str().to_string())
            .unwrap_or_else(|| self.pathname().to_string())
    }

    pub fn to_loader_request(&self) -> LoaderRequest {
        LoaderRequest {
            method: self.method.to_string(),
            url: self.url(),
            headers: self
                .headers
                .iter()
                .filter_map(|(name, value)| Some((name.to_string(), value.to_str().ok()?.to_string())))
                .collect(),
        }
    }
}

/// Input of an API route handler: `(request, {params})`
#[derive(Debug, Clone)]
pub struct ApiRequest {
    pub request: IncomingRequest,
    pub params: Params,
}

/// Response produced by an API route
#[derive(Debug, Clone, PartialEq)]
pub struct ApiResponse {
    pub status: StatusCode,
    pub headers: Vec<(String, String)>,
    pub body: Bytes,
}

impl ApiResponse {
    pub fn new(status: StatusCode, body: impl Into<Bytes>) -> Self {
        Self {
            status,
            headers: Vec::new(),
            body: body.into(),
        }
    }

    /// A `200` JSON body.
    pub fn json<T: Serialize>(value: &T) -> Result<Self, serde_json::Error> {
        Ok(Self::new(StatusCode::OK, serde_json::to_vec(value)?).with_header("content-type", "application/json"))
    }

    pub fn text(status: StatusCode, body: impl Into<String>) -> Self {
        Self::new(status, body.into()).with_header("content-type", "text/plain; charset=utf-8")
    }

    pub fn with_status(mut self, status: StatusCode) -> Self {
        self.status = status;
        self
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Redirect target, when the status is a redirect with a location.
    pub fn redirect_location(&self) -> Option<&str> {
        self.status
            .is_redirection()
            .then(|| self.header("location"))
            .flatten()
    }
}

/// What the dispatcher answers with when it handles a request
#[derive(Debug, Clone, PartialEq)]
pub enum DispatchOutput {
    /// Rendered page, SPA shell or diagnostic page
    Html { status: StatusCode, body: String },
    /// Loader-data module for client navigations
    Script(String),
    Api(ApiResponse),
    Redirect { status: StatusCode, location: String },
}

impl DispatchOutput {
    pub fn html(body: impl Into<String>) -> Self {
        Self::Html {
            status: StatusCode::OK,
            body: body.into(),
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Self::Html { status, .. } | Self::Redirect { status, .. } => *status,
            Self::Script(_) => StatusCode::OK,
            Self::Api(response) => response.status,
        }
    }

    /// A redirect with `status`, falling back to `307` for non-redirect codes.
    pub fn redirect(status: u16, location: impl Into<String>) -> Self {
        let status = StatusCode::from_u16(status)
            .ok()
            .filter(StatusCode::is_redirection)
            .unwrap_or(StatusCode::TEMPORARY_REDIRECT);
        Self::Redirect {
            status,
            location: location.into(),
        }
    }
}

impl IntoResponse for DispatchOutput {
    fn into_response(self) -> Response {
        match self {
            Self::Html { status, body } => (status, Html(body)).into_response(),
            Self::Script(js) => (
                StatusCode::OK,
                [(header::CONTENT_TYPE, "text/javascript; charset=utf-8")],
                js,
            )
                .into_response(),
            Self::Redirect { status, location } => match HeaderValue::from_str(&location) {
                Ok(value) => (status, [(header::LOCATION, value)]).into_response(),
                Err(_) => {
                    warn!(location = %location, "Dropping redirect to invalid location");
                    StatusCode::INTERNAL_SERVER_ERROR.into_response()
                }
            },
            Self::Api(api) => {
                let mut response = Response::new(Body::from(api.body));
                *response.status_mut() = api.status;
                for (name, value) in &api.headers {
                    match (
                        header::HeaderName::from_bytes(name.as_bytes()),
                        HeaderValue::from_str(value),
                    ) {
                        (Ok(name), Ok(value)) => {
                            response.headers_mut().append(name, value);
                        }
                        _ => warn!(header = %name, "Dropping invalid API response header"),
                    }
                }
                response
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    #[test]
    fn test_url_keeps_query() {
        let request = IncomingRequest::get("/users/1?tab=posts");
        assert_eq!(request.pathname(), "/users/1");
        assert_eq!(request.query(), "tab=posts");
        assert_eq!(request.url(), "/users/1?tab=posts");
    }

    #[test]
    fn test_loader_request_headers() {
        let mut request = IncomingRequest::get("/a");
        request.headers.insert("x-user", HeaderValue::from_static("7"));
        let loader = request.to_loader_request();
        assert_eq!(loader.method, "GET");
        assert_eq!(loader.headers, vec![("x-user".to_string(), "7".to_string())]);
    }

    #[rstest]
    #[case(301, StatusCode::MOVED_PERMANENTLY)]
    #[case(308, StatusCode::PERMANENT_REDIRECT)]
    #[case(200, StatusCode::TEMPORARY_REDIRECT)]
    fn test_redirect_status(#[case] status: u16, #[case] expected: StatusCode) {
        assert_eq!(DispatchOutput::redirect(status, "/").status(), expected);
    }

    #[test]
    fn test_api_redirect_location() {
        let response = ApiResponse::new(StatusCode::FOUND, "").with_header("Location", "/login");
        assert_eq!(response.redirect_location(), Some("/login"));
        assert_eq!(ApiResponse::text(StatusCode::OK, "hi").redirect_location(), None);
    }
}
