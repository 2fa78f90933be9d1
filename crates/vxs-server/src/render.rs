// File: vxs-server/src/render.rs
// Purpose: Maud templates for page documents, the SPA shell and diagnostics

use maud::{html, Markup, PreEscaped, DOCTYPE};

/// Pieces of a server-rendered page
#[derive(Debug, Clone, Default)]
pub struct Document<'a> {
    pub title: &'a str,
    /// Rendered route markup
    pub body: &'a str,
    pub css: &'a [String],
    /// Loader data handoff `<script>`, already escaped for inline use
    pub handoff: Option<&'a str>,
    pub scripts: &'a [String],
}

pub fn document(doc: &Document<'_>) -> Markup {
    html! {
        (DOCTYPE)
        html lang="en" {
            head {
                meta charset="UTF-8";
                meta name="viewport" content="width=device-width, initial-scale=1";
                title { (doc.title) }
                @for href in doc.css {
                    link rel="stylesheet" href=(href);
                }
            }
            body {
                div id="root" { (PreEscaped(doc.body)) }
                @if let Some(handoff) = doc.handoff {
                    (PreEscaped(handoff))
                }
                @for src in doc.scripts {
                    script type="module" src=(src) {}
                }
            }
        }
    }
}

/// Bootstrap shell for `spa` routes: no server data, only the client entry.
pub fn spa_shell(title: &str, client_entry: &str) -> Markup {
    html! {
        (DOCTYPE)
        html lang="en" {
            head {
                meta charset="UTF-8";
                meta name="viewport" content="width=device-width, initial-scale=1";
                title { (title) }
            }
            body {
                div id="root" {}
                script type="module" src=(client_entry) {}
            }
        }
    }
}

/// Body of the synthesized not-found route
pub fn not_found(pathname: &str) -> Markup {
    html! {
        h1 { "404" }
        p { "No route matches " code { (pathname) } }
        a href="/" { "Go home" }
    }
}

/// Self-contained development error page
pub fn error_page(url: &str, file: Option<&str>, chain: &[String]) -> Markup {
    let (headline, causes) = match chain.split_first() {
        Some((first, rest)) => (first.as_str(), rest),
        None => ("Unknown error", &[][..]),
    };

    html! {
        (DOCTYPE)
        html lang="en" {
            head {
                meta charset="UTF-8";
                title { "Error rendering " (url) }
                style { (PreEscaped(ERROR_CSS)) }
            }
            body {
                main {
                    p class="label" { "Error rendering " code { (url) } }
                    h1 { (headline) }
                    @if let Some(file) = file {
                        p class="file" { "Route file: " code { (file) } }
                    }
                    @if !causes.is_empty() {
                        h2 { "Caused by" }
                        ol {
                            @for cause in causes {
                                li { pre { (cause) } }
                            }
                        }
                    }
                }
            }
        }
    }
}

const ERROR_CSS: &str = "\
body{margin:0;background:#1b1b1f;color:#f4f4f5;font-family:ui-sans-serif,system-ui,sans-serif}\
main{max-width:56rem;margin:4rem auto;padding:2rem;border-left:4px solid #ef4444;background:#27272a}\
h1{font-size:1.25rem;color:#fca5a5;white-space:pre-wrap}\
h2{font-size:1rem;color:#a1a1aa}\
.label,.file{color:#a1a1aa}\
code,pre{font-family:ui-monospace,monospace}\
pre{white-space:pre-wrap;margin:0}";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_document_inlines_handoff_and_assets() {
        let css = vec!["/assets/users.css".to_string()];
        let scripts = vec!["/assets/client.js".to_string()];
        let page = document(&Document {
            title: "Users",
            body: "<h1>Ada</h1>",
            css: &css,
            handoff: Some("<script>window.__vxsLoaderData__ = {};</script>"),
            scripts: &scripts,
        })
        .into_string();

        assert!(page.contains("<div id=\"root\"><h1>Ada</h1></div>"));
        assert!(page.contains("<link rel=\"stylesheet\" href=\"/assets/users.css\">"));
        assert!(page.contains("<script>window.__vxsLoaderData__ = {};</script>"));
        assert!(page.contains("<script type=\"module\" src=\"/assets/client.js\"></script>"));
    }

    #[test]
    fn test_spa_shell_only_loads_client() {
        let shell = spa_shell("vxs-app", "/assets/client.js").into_string();
        assert!(shell.contains("<div id=\"root\"></div>"));
        assert!(shell.contains("src=\"/assets/client.js\""));
        assert!(!shell.contains("__vxsLoaderData__"));
    }

    #[test]
    fn test_not_found_names_path() {
        let body = not_found("/nope").into_string();
        assert!(body.contains("<code>/nope</code>"));
    }

    #[test]
    fn test_error_page_escapes_messages() {
        let chain = vec![
            "Render failed for './a.tsx': boom".to_string(),
            "<script>alert(1)</script>".to_string(),
        ];
        let page = error_page("/a", Some("./a.tsx"), &chain).into_string();

        assert!(page.contains("<h1>Render failed for './a.tsx': boom</h1>"));
        assert!(page.contains("&lt;script&gt;alert(1)&lt;/script&gt;"));
        assert!(page.contains("Caused by"));
    }
}
