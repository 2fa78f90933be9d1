// File: vxs-server/src/build_info.rs
// Purpose: Persisted build output consumed by the production server

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use tracing::info;
use vxs_router::{RouteManifest, RouteType};

use crate::error::Result;

/// One route as built
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BuiltRoute {
    pub file: String,
    pub page: String,
    #[serde(rename = "type")]
    pub route_type: RouteType,
    /// Pre-rendered HTML, for `ssg` routes
    #[serde(default)]
    pub html_path: Option<String>,
    #[serde(default)]
    pub client_js: Option<String>,
    #[serde(default)]
    pub css: Vec<String>,
}

/// `buildInfo.json`: public paths to built assets plus per-route metadata
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildInfo {
    #[serde(default)]
    pub route_map: BTreeMap<String, String>,
    #[serde(default)]
    pub built_routes: Vec<BuiltRoute>,
    #[serde(default)]
    pub constants: BTreeMap<String, Value>,
}

impl BuildInfo {
    /// Seeds build info from a manifest, without any built assets yet.
    pub fn from_manifest(manifest: &RouteManifest) -> Self {
        let built_routes = manifest
            .page_routes
            .iter()
            .chain(&manifest.api_routes)
            .map(|route| BuiltRoute {
                file: route.file.clone(),
                page: route.page.clone(),
                route_type: route.route_type,
                html_path: None,
                client_js: None,
                css: Vec::new(),
            })
            .collect();
        Self {
            built_routes,
            ..Default::default()
        }
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)?;
        let info: Self = serde_json::from_str(&content)?;
        info!(path = ?path, routes = info.built_routes.len(), "Loaded build info");
        Ok(info)
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }

    pub fn route(&self, file: &str) -> Option<&BuiltRoute> {
        self.built_routes.iter().find(|r| r.file == file)
    }

    /// Built asset for a public path.
    pub fn asset(&self, public_path: &str) -> Option<&str> {
        self.route_map.get(public_path).map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use vxs_router::{RouteTree, TreeOptions};

    #[test]
    fn test_reads_camel_case_file() {
        let info: BuildInfo = serde_json::from_value(json!({
            "routeMap": { "/about": "dist/about.html" },
            "builtRoutes": [{
                "file": "./about+ssg.tsx",
                "page": "/about",
                "type": "ssg",
                "htmlPath": "dist/about.html"
            }],
            "constants": { "CACHE_KEY": "abc" }
        }))
        .unwrap();

        assert_eq!(info.asset("/about"), Some("dist/about.html"));
        let route = info.route("./about+ssg.tsx").unwrap();
        assert_eq!(route.route_type, RouteType::Ssg);
        assert_eq!(route.client_js, None);
        assert!(route.css.is_empty());
    }

    #[test]
    fn test_from_manifest_lists_pages_and_api() {
        let tree = RouteTree::build(["index.tsx", "api/health+api.ts"], TreeOptions::default());
        let info = BuildInfo::from_manifest(tree.manifest());

        assert!(info.route("./index.tsx").is_some());
        assert_eq!(
            info.route("./api/health+api.ts").map(|r| r.route_type),
            Some(RouteType::Api)
        );
        assert!(info.route_map.is_empty());
    }
}
