// File: vxs-loader/src/handoff.rs
// Purpose: Server-to-client loader data handoff and the loader JS wire format

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::error::{LoaderError, Result};

/// Global the server writes loader data under
pub const LOADER_DATA_GLOBAL: &str = "__vxsLoaderData__";

/// Path prefix of loader-data requests
pub const LOADER_PATH_PREFIX: &str = "/_vxs/loader";

/// What the SSR pass hands to hydration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HandoffPayload {
    /// Route file the data belongs to
    pub file: String,
    pub href: String,
    pub data: Value,
}

/// Serializes JSON for embedding inside a `<script>` element.
fn script_json(value: &impl Serialize) -> Result<String> {
    let json = serde_json::to_string(value)?;
    Ok(json
        .replace("</", "<\\/")
        .replace('\u{2028}', "\\u2028")
        .replace('\u{2029}', "\\u2029"))
}

/// The `<script>` tag carrying `payload` in the initial HTML.
pub fn render_handoff_script(payload: &HandoffPayload) -> Result<String> {
    Ok(format!(
        "<script>window.{} = {};</script>",
        LOADER_DATA_GLOBAL,
        script_json(payload)?
    ))
}

/// Reads the payload back out of rendered HTML.
pub fn extract_handoff(html: &str) -> Option<HandoffPayload> {
    let marker = format!("window.{} = ", LOADER_DATA_GLOBAL);
    let start = html.find(&marker)? + marker.len();
    let end = start + html[start..].find(";</script>")?;
    serde_json::from_str(&html[start..end]).ok()
}

/// Loader data embedded in the initial payload, readable exactly once
#[derive(Debug, Default)]
pub struct Handoff {
    payload: Mutex<Option<HandoffPayload>>,
}

impl Handoff {
    pub fn new(payload: Option<HandoffPayload>) -> Self {
        Self {
            payload: Mutex::new(payload),
        }
    }

    pub fn from_html(html: &str) -> Self {
        Self::new(extract_handoff(html))
    }

    /// Takes the data for `file`, clearing the handoff.
    ///
    /// Returns `None` for any other route and on every later call, so a
    /// re-render of the hydrated route goes through the normal loader path.
    pub fn take(&self, file: &str) -> Option<Value> {
        let mut payload = self.payload.lock();
        if payload.as_ref().is_some_and(|p| p.file == file) {
            debug!(file = %file, "Consumed loader handoff");
            return payload.take().map(|p| p.data);
        }
        None
    }

    pub fn is_consumed(&self) -> bool {
        self.payload.lock().is_none()
    }
}

/// Loader-data URL for a page href: `/users/7?x=1` → `/_vxs/loader/users/7?x=1`.
pub fn loader_path_for(href: &str) -> String {
    match href {
        "" | "/" => format!("{}/", LOADER_PATH_PREFIX),
        _ if href.starts_with('/') => format!("{}{}", LOADER_PATH_PREFIX, href),
        _ => format!("{}/{}", LOADER_PATH_PREFIX, href),
    }
}

/// Page href behind a loader-data path, or `None` outside the prefix.
pub fn href_from_loader_path(path: &str) -> Option<String> {
    let rest = path.strip_prefix(LOADER_PATH_PREFIX)?;
    match rest {
        "" => Some("/".to_string()),
        _ if rest.starts_with('/') => Some(rest.to_string()),
        _ => None,
    }
}

/// Client JS module answering a loader-data request, with the data inlined.
pub fn render_loader_js(data: &Value) -> Result<String> {
    Ok(format!("export function loader() {{ return {} }}\n", script_json(data)?))
}

/// Reads the data back out of [`render_loader_js`] output.
pub fn parse_loader_js(js: &str) -> Result<Value> {
    let body = js
        .trim()
        .strip_prefix("export function loader() { return ")
        .and_then(|rest| rest.strip_suffix(" }"))
        .ok_or_else(|| LoaderError::InvalidData("not a loader module".into()))?;
    Ok(serde_json::from_str(body)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;
    use serde_json::json;

    fn payload() -> HandoffPayload {
        HandoffPayload {
            file: "./blog/[slug].tsx".into(),
            href: "/blog/hello".into(),
            data: json!({ "title": "</script><script>alert(1)" }),
        }
    }

    #[test]
    fn test_script_cannot_close_early() {
        let script = render_handoff_script(&payload()).unwrap();
        assert_eq!(script.matches("</script>").count(), 1);
        assert!(script.starts_with("<script>window.__vxsLoaderData__ = "));
    }

    #[test]
    fn test_handoff_is_read_once() {
        let html = format!("<html><body>{}</body></html>", render_handoff_script(&payload()).unwrap());
        let handoff = Handoff::from_html(&html);

        assert_eq!(handoff.take("./index.tsx"), None);
        assert_eq!(
            handoff.take("./blog/[slug].tsx"),
            Some(json!({ "title": "</script><script>alert(1)" }))
        );
        assert!(handoff.is_consumed());
        assert_eq!(handoff.take("./blog/[slug].tsx"), None);
    }

    #[rstest]
    #[case("/", "/_vxs/loader/")]
    #[case("/users/7?tab=a", "/_vxs/loader/users/7?tab=a")]
    fn test_loader_paths(#[case] href: &str, #[case] path: &str) {
        assert_eq!(loader_path_for(href), path);
        assert_eq!(href_from_loader_path(path.split('?').next().unwrap()).unwrap(), href.split('?').next().unwrap());
    }

    #[test]
    fn test_loader_prefix_must_end_at_segment() {
        assert_eq!(href_from_loader_path("/_vxs/loaderx"), None);
        assert_eq!(href_from_loader_path("/_vxs/loader"), Some("/".into()));
    }

    #[test]
    fn test_loader_js_round_trip() {
        let data = json!({ "items": [1, 2], "html": "</b>" });
        let js = render_loader_js(&data).unwrap();
        assert_eq!(parse_loader_js(&js).unwrap(), data);
        assert!(parse_loader_js("console.log(1)").is_err());
    }
}
