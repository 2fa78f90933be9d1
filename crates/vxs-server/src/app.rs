// File: vxs-server/src/app.rs
// Purpose: axum application routing every request through the dispatcher

use axum::extract::{Request, State};
use axum::http::{Method, StatusCode};
use axum::response::{Html, IntoResponse, Response};
use axum::Router;
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use crate::dispatcher::RequestDispatcher;
use crate::request::IncomingRequest;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub dispatcher: Arc<RequestDispatcher>,
}

pub fn app(dispatcher: Arc<RequestDispatcher>) -> Router {
    Router::new()
        .fallback(dispatch_handler)
        .with_state(AppState { dispatcher })
        .layer(TraceLayer::new_for_http())
}

async fn dispatch_handler(State(state): State<AppState>, request: Request) -> Response {
    let (parts, _body) = request.into_parts();
    let method = parts.method.clone();

    match state.dispatcher.handle_request(IncomingRequest::from_parts(&parts)).await {
        Ok(Some(output)) => output.into_response(),
        Ok(None) if method != Method::GET => StatusCode::METHOD_NOT_ALLOWED.into_response(),
        Ok(None) => error_response(StatusCode::NOT_FOUND, "Page Not Found"),
        // details were logged by the dispatcher
        Err(_) => error_response(StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error"),
    }
}

fn error_response(status: StatusCode, title: &str) -> Response {
    let markup = maud::html! {
        (maud::DOCTYPE)
        html {
            head { title { (title) } }
            body {
                h1 { (status.as_u16()) " " (title) }
                a href="/" { "Go Home" }
            }
        }
    };
    (status, Html(markup.into_string())).into_response()
}
