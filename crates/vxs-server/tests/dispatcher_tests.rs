//! Request dispatch: match order, single-flight, handler outputs and failures.

use async_trait::async_trait;
use axum::http::{HeaderMap, Method, StatusCode};
use pretty_assertions::assert_eq;
use serde_json::json;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use vxs_loader::handoff::parse_loader_js;
use vxs_loader::{LoaderProps, ModuleRegistry, RouteModule};
use vxs_router::{RouteTree, TreeOptions};
use vxs_server::{
    ApiResponse, DispatchOutput, DispatcherOptions, HandlerError, IncomingRequest, PageContext, PageRenderer,
    RequestDispatcher, RouteHandlers, StaticModules,
};

const FILES: &[&str] = &[
    "index.tsx",
    "users/[id].tsx",
    "broken.tsx",
    "private.tsx",
    "dash+spa/index.tsx",
    "api/users/[id]+api.ts",
    "api/old+api.ts",
];

/// Renders loader data, slowly, counting calls
struct CountingRenderer {
    calls: AtomicUsize,
    delay: Duration,
}

#[async_trait]
impl PageRenderer for CountingRenderer {
    async fn render(&self, module: &RouteModule, page: PageContext<'_>) -> Result<String, HandlerError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(self.delay).await;
        match module.file.as_str() {
            "./broken.tsx" => Err(HandlerError::render(&module.file, "component threw")),
            "./private.tsx" => Err(HandlerError::redirect("/login")),
            _ => Ok(format!("<p>{}</p>", page.data)),
        }
    }
}

fn modules() -> StaticModules {
    let registry = ModuleRegistry::new()
        .with(RouteModule::new("./index.tsx"))
        .with(
            RouteModule::new("./users/[id].tsx").with_loader(|props: LoaderProps| async move {
                let param = |name: &str| props.params.get(name).and_then(|v| v.first()).map(str::to_string);
                Ok(json!({ "id": param("id"), "tab": param("tab") }))
            }),
        )
        .with(RouteModule::new("./broken.tsx"))
        .with(RouteModule::new("./private.tsx"))
        .with(RouteModule::new("./dash+spa/index.tsx"));

    StaticModules::new(Arc::new(registry))
        .with_api("./api/users/[id]+api.ts", |request| async move {
            let id = request.params.get("id").and_then(|v| v.first()).unwrap_or_default().to_string();
            ApiResponse::json(&json!({ "id": id })).map_err(|e| HandlerError::api("./api/users/[id]+api.ts", e))
        })
        .with_api("./api/old+api.ts", |_| async {
            Ok(ApiResponse::new(StatusCode::MOVED_PERMANENTLY, "").with_header("Location", "/api/users/1"))
        })
}

fn dispatcher_with(options: DispatcherOptions, delay: Duration) -> (Arc<RequestDispatcher>, Arc<CountingRenderer>) {
    let tree = RouteTree::build(FILES.iter().copied(), TreeOptions::default());
    let renderer = Arc::new(CountingRenderer {
        calls: AtomicUsize::new(0),
        delay,
    });
    let handlers = RouteHandlers::new(Arc::new(modules()), renderer.clone());
    let dispatcher = RequestDispatcher::new(tree.manifest().clone(), Arc::new(handlers), options);
    (Arc::new(dispatcher), renderer)
}

fn dispatcher(dev: bool) -> (Arc<RequestDispatcher>, Arc<CountingRenderer>) {
    dispatcher_with(
        DispatcherOptions {
            dev,
            ..Default::default()
        },
        Duration::ZERO,
    )
}

async fn get(dispatcher: &Arc<RequestDispatcher>, url: &str) -> DispatchOutput {
    dispatcher
        .handle_request(IncomingRequest::get(url))
        .await
        .unwrap()
        .unwrap_or_else(|| panic!("{} was not handled", url))
}

fn html(output: DispatchOutput) -> (StatusCode, String) {
    match output {
        DispatchOutput::Html { status, body } => (status, body),
        other => panic!("expected html, got {:?}", other),
    }
}

// ============================================================================
// Pages
// ============================================================================

#[tokio::test]
async fn test_concurrent_requests_render_once() {
    let (dispatcher, renderer) = dispatcher_with(DispatcherOptions::default(), Duration::from_millis(30));

    let tasks: Vec<_> = (0..4)
        .map(|_| {
            let dispatcher = dispatcher.clone();
            tokio::spawn(async move { dispatcher.handle_request(IncomingRequest::get("/users/1")).await })
        })
        .collect();

    let mut outputs = Vec::new();
    for task in tasks {
        outputs.push(task.await.unwrap().unwrap().unwrap());
    }

    assert_eq!(renderer.calls.load(Ordering::SeqCst), 1);
    assert!(outputs.windows(2).all(|pair| pair[0] == pair[1]));
    assert_eq!(dispatcher.stats().coalesced, 3);

    // finished requests are not reused
    get(&dispatcher, "/users/1").await;
    assert_eq!(renderer.calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_unknown_path_is_404() {
    let (dispatcher, renderer) = dispatcher(false);

    let (status, body) = html(get(&dispatcher, "/does-not-exist").await);

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body.contains("No route matches <code>/does-not-exist</code>"));
    assert_eq!(renderer.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_page_embeds_loader_handoff() {
    let (dispatcher, _) = dispatcher(false);

    let (status, body) = html(get(&dispatcher, "/users/5?tab=posts&id=9").await);

    assert_eq!(status, StatusCode::OK);
    // path params win over search params
    assert!(body.contains(r#"<p>{"id":"5","tab":"posts"}</p>"#));
    assert!(body.contains("window.__vxsLoaderData__ = "));
    assert!(body.contains(r#""file":"./users/[id].tsx""#));
    assert!(body.contains(r#"src="/assets/client.js""#));
}

#[tokio::test]
async fn test_page_without_loader_has_no_handoff() {
    let (dispatcher, renderer) = dispatcher(false);

    let (status, body) = html(get(&dispatcher, "/").await);

    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("<p>null</p>"));
    assert!(!body.contains("__vxsLoaderData__"));
    assert_eq!(renderer.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_spa_route_gets_shell_without_render() {
    let (dispatcher, renderer) = dispatcher(false);

    let (status, body) = html(get(&dispatcher, "/dash").await);

    assert_eq!(status, StatusCode::OK);
    assert!(body.contains(r#"<div id="root"></div>"#));
    assert_eq!(renderer.calls.load(Ordering::SeqCst), 0);
}

// ============================================================================
// Loader data and API routes
// ============================================================================

#[tokio::test]
async fn test_loader_prefix_returns_client_js() {
    let (dispatcher, renderer) = dispatcher(false);

    let output = get(&dispatcher, "/_vxs/loader/users/3?tab=a").await;
    let DispatchOutput::Script(js) = output else {
        panic!("expected a loader script, got {:?}", output);
    };

    assert_eq!(parse_loader_js(&js).unwrap(), json!({ "id": "3", "tab": "a" }));
    assert_eq!(renderer.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_loader_data_reuses_page_render() {
    let runs = Arc::new(AtomicUsize::new(0));
    let counter = runs.clone();
    let registry = ModuleRegistry::new().with(RouteModule::new("./users/[id].tsx").with_loader(
        move |props: LoaderProps| {
            let counter = counter.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(json!({ "id": props.params.get("id").and_then(|v| v.first()) }))
            }
        },
    ));
    let renderer = Arc::new(CountingRenderer {
        calls: AtomicUsize::new(0),
        delay: Duration::ZERO,
    });
    let handlers = Arc::new(RouteHandlers::new(Arc::new(StaticModules::new(Arc::new(registry))), renderer));
    let tree = RouteTree::build(FILES.iter().copied(), TreeOptions::default());
    let options = DispatcherOptions {
        dev: true,
        ..Default::default()
    };
    let dispatcher = Arc::new(RequestDispatcher::new(tree.manifest().clone(), handlers.clone(), options));

    html(get(&dispatcher, "/users/3").await);
    let DispatchOutput::Script(js) = get(&dispatcher, "/_vxs/loader/users/3").await else {
        panic!("expected a loader script");
    };
    assert_eq!(parse_loader_js(&js).unwrap(), json!({ "id": "3" }));
    assert_eq!(runs.load(Ordering::SeqCst), 1);

    // data rendered for another href is not reused
    html(get(&dispatcher, "/users/4").await);
    get(&dispatcher, "/_vxs/loader/users/5").await;
    assert_eq!(runs.load(Ordering::SeqCst), 3);

    // a rebuilt route set drops kept data
    assert_eq!(handlers.loader_cache().stats().entries, 1);
    dispatcher.set_manifest(tree.manifest().clone());
    assert_eq!(handlers.loader_cache().stats().entries, 0);
    get(&dispatcher, "/_vxs/loader/users/4").await;
    assert_eq!(runs.load(Ordering::SeqCst), 4);
}

#[tokio::test]
async fn test_loader_for_route_without_loader_is_null() {
    let (dispatcher, _) = dispatcher(false);

    let output = get(&dispatcher, "/_vxs/loader/").await;
    assert_eq!(output, DispatchOutput::Script("export function loader() { return null }\n".into()));
}

#[tokio::test]
async fn test_api_route_gets_path_params() {
    let (dispatcher, _) = dispatcher(false);

    let DispatchOutput::Api(response) = get(&dispatcher, "/api/users/9").await else {
        panic!("expected an API response");
    };

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.header("content-type"), Some("application/json"));
    assert_eq!(&response.body[..], br#"{"id":"9"}"#);
}

#[tokio::test]
async fn test_api_redirect_becomes_redirect() {
    let (dispatcher, _) = dispatcher(false);

    assert_eq!(
        get(&dispatcher, "/api/old").await,
        DispatchOutput::Redirect {
            status: StatusCode::MOVED_PERMANENTLY,
            location: "/api/users/1".into()
        }
    );
}

// ============================================================================
// Failures
// ============================================================================

#[tokio::test]
async fn test_redirect_error_becomes_redirect() {
    let (dispatcher, _) = dispatcher(false);

    assert_eq!(
        get(&dispatcher, "/private").await,
        DispatchOutput::Redirect {
            status: StatusCode::TEMPORARY_REDIRECT,
            location: "/login".into()
        }
    );
}

#[tokio::test]
async fn test_dev_render_error_is_diagnostic_page() {
    let (dispatcher, _) = dispatcher(true);

    let (status, body) = html(get(&dispatcher, "/broken").await);

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(body.contains("Render failed for './broken.tsx': component threw"));
    assert!(body.contains("<code>./broken.tsx</code>"));
}

#[tokio::test]
async fn test_prod_render_error_propagates() {
    let (dispatcher, _) = dispatcher(false);

    let result = dispatcher.handle_request(IncomingRequest::get("/broken")).await;

    assert_eq!(result, Err(HandlerError::render("./broken.tsx", "component threw")));
}

// ============================================================================
// Pass-through
// ============================================================================

#[tokio::test]
async fn test_non_get_and_ignored_paths_pass_through() {
    let options = DispatcherOptions {
        ignore_prefixes: vec!["/assets/".into()],
        ..Default::default()
    }
    .with_ignore(|path| path.ends_with(".map"));
    let (dispatcher, renderer) = dispatcher_with(options, Duration::ZERO);

    let post = IncomingRequest::new(Method::POST, "/".parse().unwrap(), HeaderMap::new());
    assert_eq!(dispatcher.handle_request(post).await, Ok(None));

    for url in ["/@vxs/client", "/node_modules/react/index.js", "/assets/app.css", "/app.js.map"] {
        assert_eq!(dispatcher.handle_request(IncomingRequest::get(url)).await, Ok(None), "{}", url);
    }
    assert_eq!(renderer.calls.load(Ordering::SeqCst), 0);
    assert_eq!(dispatcher.stats().total, 0);
}

#[tokio::test]
async fn test_swapped_manifest_serves_new_routes() {
    let (dispatcher, _) = dispatcher(false);
    assert_eq!(get(&dispatcher, "/about").await.status(), StatusCode::NOT_FOUND);

    let mut files: Vec<&str> = FILES.to_vec();
    files.push("about.tsx");
    let tree = RouteTree::build(files, TreeOptions::default());
    dispatcher.set_manifest(tree.manifest().clone());

    // module missing from the registry: a route with no module is an error
    assert!(dispatcher.handle_request(IncomingRequest::get("/about")).await.is_err());
}
