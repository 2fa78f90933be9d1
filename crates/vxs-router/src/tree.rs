//! Route tree builder
//!
//! Turns a route-directory listing into a single rooted [`RouteNode`] tree.
//! Files with malformed names are logged and skipped; the rest of the
//! listing still builds.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use tracing::{debug, error, warn};

use crate::error::RouteBuildError;
use crate::manifest::{get_manifest, ManifestCache, RouteManifest};
use crate::route::parser::{normalize_file, parse_route_file, FileKind, ParsedRouteFile};
use crate::route::pattern::{classify_segment, compare_specificity, url_segments, RenderMode};
use crate::route::{DynamicSegment, RouteNode, RouteSlot, RouteType};

/// Context key of the layout synthesized when the listing has no root `_layout`.
pub const GENERATED_LAYOUT_KEY: &str = "./_layout.tsx";

/// Context key of the synthesized fallback not-found route.
pub const GENERATED_NOT_FOUND_KEY: &str = "./+not-found.tsx";

/// Options applied while building a tree
#[derive(Debug, Clone)]
pub struct TreeOptions {
    /// Render mode of pages without a `+ssr|+ssg|+spa` suffix above them
    pub default_render_mode: RenderMode,
    /// Layout context key → initial route name
    pub initial_routes: HashMap<String, String>,
}

impl Default for TreeOptions {
    fn default() -> Self {
        Self {
            default_render_mode: RenderMode::Ssr,
            initial_routes: HashMap::new(),
        }
    }
}

/// Result of one tree build
#[derive(Debug, Clone)]
pub struct BuiltTree {
    pub root: RouteNode,
    /// Context key of the root `+html` document template
    pub html: Option<String>,
    pub skipped: Vec<RouteBuildError>,
}

/// Sorts sibling routes: static before dynamic, dynamic before catch-all,
/// catch-all before not-found. Stable, so declaration order breaks ties.
pub fn sort_routes(routes: &mut [RouteNode]) {
    routes.sort_by(|a, b| compare_specificity(&url_segments(&a.route), &url_segments(&b.route)));
}

/// Builds a route tree from a directory listing
///
/// # Examples
///
/// ```
/// use vxs_router::tree::{build_route_tree, TreeOptions};
///
/// let built = build_route_tree(&["index.tsx", "users/[id].tsx", "users/settings.tsx"], &TreeOptions::default());
/// let routes: Vec<&str> = built.root.children.iter().map(|c| c.route.as_str()).collect();
/// assert_eq!(routes, vec!["index", "users/settings", "users/[id]", "+not-found"]);
/// ```
pub fn build_route_tree<S: AsRef<str>>(files: &[S], options: &TreeOptions) -> BuiltTree {
    let mut builder = Builder {
        options,
        layouts: BTreeMap::new(),
        middlewares: Vec::new(),
        routes: Vec::new(),
        slotted: Vec::new(),
    };
    let mut html = None;
    let mut skipped = Vec::new();

    for (order, file) in files.iter().enumerate() {
        let parsed = match parse_route_file(file.as_ref()) {
            Ok(parsed) => parsed,
            Err(e) => {
                error!(file = %e.file(), error = %e, "Skipping route file");
                skipped.push(e);
                continue;
            }
        };

        match parsed.kind {
            FileKind::Html => {
                html.get_or_insert(parsed.context_key);
            }
            FileKind::Layout | FileKind::Middleware if parsed.slot.is_some() => {
                warn!(file = %parsed.context_key, "Layouts and middlewares inside slots are ignored");
            }
            FileKind::Layout => {
                let dir = parsed.dir_names();
                if let Some((_, existing)) = builder.layouts.get(&dir) {
                    warn!(file = %parsed.context_key, existing = %existing.context_key, "Duplicate layout ignored");
                } else {
                    builder.layouts.insert(dir, (order, parsed));
                }
            }
            FileKind::Middleware => builder.middlewares.push(parsed),
            _ if parsed.slot.is_some() => builder.slotted.push((order, parsed)),
            _ => builder.routes.push((order, parsed)),
        }
    }

    let root = builder.build_layout(&[], String::new(), &[]);
    debug!(
        routes = root.walk().len(),
        skipped = skipped.len(),
        "Route tree built"
    );

    BuiltTree { root, html, skipped }
}

struct Builder<'a> {
    options: &'a TreeOptions,
    layouts: BTreeMap<Vec<String>, (usize, ParsedRouteFile)>,
    middlewares: Vec<ParsedRouteFile>,
    routes: Vec<(usize, ParsedRouteFile)>,
    slotted: Vec<(usize, ParsedRouteFile)>,
}

impl Builder<'_> {
    /// Directory of the layout owning `dirs`: the deepest ancestor-or-self with a
    /// `_layout`, or the root.
    fn owner<'d>(&self, dirs: &'d [String]) -> &'d [String] {
        (0..=dirs.len())
            .rev()
            .map(|n| &dirs[..n])
            .find(|prefix| prefix.is_empty() || self.layouts.contains_key(*prefix))
            .unwrap_or(&[])
    }

    fn middlewares_for(&self, dirs: &[String]) -> Vec<String> {
        let mut found: Vec<(usize, &str)> = self
            .middlewares
            .iter()
            .filter(|m| dirs.starts_with(&m.dir_names()))
            .map(|m| (m.dirs.len(), m.context_key.as_str()))
            .collect();
        found.sort_by_key(|(depth, _)| *depth);
        found.into_iter().map(|(_, key)| key.to_string()).collect()
    }

    fn render_type(&self, file: &ParsedRouteFile) -> RouteType {
        match file.kind {
            FileKind::Api => RouteType::Api,
            _ => file
                .effective_render_mode()
                .unwrap_or(self.options.default_render_mode)
                .into(),
        }
    }

    fn has_root_not_found(&self) -> bool {
        self.routes.iter().any(|(_, f)| {
            f.kind == FileKind::NotFound
                && f.dirs.iter().all(|d| {
                    classify_segment(&d.name)
                        .map(|k| !k.is_url_significant())
                        .unwrap_or(false)
                })
        })
    }

    fn build_layout(&self, dir: &[String], route: String, ancestors: &[String]) -> RouteNode {
        let (context_key, generated) = match self.layouts.get(dir) {
            Some((_, file)) => (file.context_key.clone(), false),
            None => (GENERATED_LAYOUT_KEY.to_string(), true),
        };

        let mut chain = ancestors.to_vec();
        chain.push(context_key.clone());

        let mut ordered: Vec<(usize, RouteNode)> = Vec::new();

        for (order, file) in &self.routes {
            let dirs = file.dir_names();
            if self.owner(&dirs) == dir {
                ordered.push((*order, self.route_node(file, &dirs[dir.len()..], &chain)));
            }
        }

        for (child_dir, (order, _)) in &self.layouts {
            let Some((_, parent)) = child_dir.split_last() else {
                continue;
            };
            if self.owner(parent) == dir {
                let child_route = child_dir[dir.len()..].join("/");
                ordered.push((*order, self.build_layout(child_dir, child_route, &chain)));
            }
        }

        ordered.sort_by_key(|(order, _)| *order);
        let mut children: Vec<RouteNode> = ordered.into_iter().map(|(_, node)| node).collect();

        if dir.is_empty() && !self.has_root_not_found() {
            children.push(self.generated_not_found(&chain));
        }
        sort_routes(&mut children);

        RouteNode {
            dynamic: DynamicSegment::from_route(&route),
            route,
            initial_route_name: self.options.initial_routes.get(&context_key).cloned(),
            context_key,
            children,
            route_type: RouteType::Layout,
            layouts: ancestors.to_vec(),
            middlewares: self.middlewares_for(dir),
            slots: self.slots_for(dir, &chain),
            intercept: None,
            internal: false,
            generated,
        }
    }

    fn route_node(&self, file: &ParsedRouteFile, relative: &[String], chain: &[String]) -> RouteNode {
        let mut parts = relative.to_vec();
        parts.push(file.name.clone());
        let route = parts.join("/");

        RouteNode {
            dynamic: DynamicSegment::from_route(&route),
            route,
            context_key: file.context_key.clone(),
            children: Vec::new(),
            route_type: self.render_type(file),
            layouts: chain.to_vec(),
            middlewares: self.middlewares_for(&file.dir_names()),
            slots: Vec::new(),
            intercept: file.intercept.clone(),
            initial_route_name: None,
            internal: false,
            generated: false,
        }
    }

    fn slots_for(&self, dir: &[String], chain: &[String]) -> Vec<RouteSlot> {
        let mut slots: Vec<RouteSlot> = Vec::new();

        for (_, file) in &self.slotted {
            let Some((slot_index, name)) = &file.slot else {
                continue;
            };
            let dirs = file.dir_names();
            if self.owner(&dirs[..*slot_index]) != dir {
                continue;
            }

            let node = self.route_node(file, &dirs[slot_index + 1..], chain);
            match slots.iter_mut().find(|s| &s.name == name) {
                Some(slot) => slot.routes.push(node),
                None => slots.push(RouteSlot {
                    name: name.clone(),
                    routes: vec![node],
                }),
            }
        }

        for slot in &mut slots {
            sort_routes(&mut slot.routes);
        }
        slots
    }

    fn generated_not_found(&self, chain: &[String]) -> RouteNode {
        let route = "+not-found".to_string();
        RouteNode {
            dynamic: DynamicSegment::from_route(&route),
            route,
            context_key: GENERATED_NOT_FOUND_KEY.to_string(),
            children: Vec::new(),
            route_type: self.options.default_render_mode.into(),
            layouts: chain.to_vec(),
            middlewares: self.middlewares_for(&[]),
            slots: Vec::new(),
            intercept: None,
            initial_route_name: None,
            internal: true,
            generated: true,
        }
    }
}

/// A route tree kept in sync with the route directory
///
/// Holds the current file set and rebuilds on change. The compiled manifest
/// is rebuilt alongside, reusing compiled patterns for unchanged routes.
#[derive(Debug)]
pub struct RouteTree {
    files: Vec<String>,
    options: TreeOptions,
    built: BuiltTree,
    root: Arc<RouteNode>,
    manifest: Arc<RouteManifest>,
    cache: ManifestCache,
}

impl RouteTree {
    /// Builds a tree from a listing. Duplicate entries are ignored.
    pub fn build<I, S>(files: I, options: TreeOptions) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut unique: Vec<String> = Vec::new();
        for file in files {
            let file = normalize_file(file.as_ref());
            if !unique.contains(&file) {
                unique.push(file);
            }
        }

        let built = build_route_tree(&unique, &options);
        let mut cache = ManifestCache::default();
        let manifest = get_manifest(&built.root, &mut cache);

        Self {
            files: unique,
            options,
            root: Arc::new(built.root.clone()),
            built,
            manifest: Arc::new(manifest),
            cache,
        }
    }

    fn rebuild(&mut self) {
        self.built = build_route_tree(&self.files, &self.options);
        self.cache.retain_files(&self.built.root);
        self.manifest = Arc::new(get_manifest(&self.built.root, &mut self.cache));
        self.root = Arc::new(self.built.root.clone());
    }

    /// Adds a file and rebuilds. Returns `false` when the file was already known.
    pub fn add_file(&mut self, file: &str) -> bool {
        let file = normalize_file(file);
        if self.files.contains(&file) {
            return false;
        }
        debug!(file = %file, "Route file added");
        self.files.push(file);
        self.rebuild();
        true
    }

    /// Removes a file and rebuilds. Returns `false` when the file was unknown.
    pub fn remove_file(&mut self, file: &str) -> bool {
        let file = normalize_file(file);
        let before = self.files.len();
        self.files.retain(|f| f != &file);
        if self.files.len() == before {
            return false;
        }
        debug!(file = %file, "Route file removed");
        self.rebuild();
        true
    }

    pub fn root(&self) -> &Arc<RouteNode> {
        &self.root
    }

    pub fn manifest(&self) -> &Arc<RouteManifest> {
        &self.manifest
    }

    pub fn files(&self) -> &[String] {
        &self.files
    }

    /// Context key of the root `+html` template, if any.
    pub fn html(&self) -> Option<&str> {
        self.built.html.as_deref()
    }

    /// Files skipped by the last build.
    pub fn skipped(&self) -> &[RouteBuildError] {
        &self.built.skipped
    }

    pub fn options(&self) -> &TreeOptions {
        &self.options
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn routes(node: &RouteNode) -> Vec<&str> {
        node.children.iter().map(|c| c.route.as_str()).collect()
    }

    #[test]
    fn test_generated_root_layout_and_not_found() {
        let built = build_route_tree(&["about.tsx"], &TreeOptions::default());
        assert!(built.root.generated);
        assert_eq!(built.root.context_key, GENERATED_LAYOUT_KEY);

        let not_found = built.root.child("+not-found").unwrap();
        assert!(not_found.internal);
        assert!(not_found.generated);
        assert_eq!(not_found.layouts, vec![GENERATED_LAYOUT_KEY.to_string()]);
    }

    #[test]
    fn test_user_not_found_inside_group_counts_as_root() {
        let built = build_route_tree(&["(app)/+not-found.tsx"], &TreeOptions::default());
        assert_eq!(routes(&built.root), vec!["(app)/+not-found"]);
        assert!(!built.root.children[0].generated);
    }

    #[test]
    fn test_nested_layouts_own_their_directory() {
        let files = ["_layout.tsx", "users/_layout.tsx", "users/index.tsx", "users/[id].tsx", "about.tsx"];
        let built = build_route_tree(&files, &TreeOptions::default());

        // equal specificity keeps declaration order
        assert_eq!(routes(&built.root), vec!["users", "about", "+not-found"]);
        let users = built.root.child("users").unwrap();
        assert!(users.is_layout());
        assert_eq!(routes(users), vec!["index", "[id]"]);
        assert_eq!(
            users.child("[id]").unwrap().layouts,
            vec!["./_layout.tsx".to_string(), "./users/_layout.tsx".to_string()]
        );
    }

    #[test]
    fn test_middleware_chain() {
        let files = ["_middleware.ts", "admin/_middleware.ts", "admin/users.tsx", "home.tsx"];
        let built = build_route_tree(&files, &TreeOptions::default());

        assert_eq!(
            built.root.child("admin/users").unwrap().middlewares,
            vec!["./_middleware.ts".to_string(), "./admin/_middleware.ts".to_string()]
        );
        assert_eq!(
            built.root.child("home").unwrap().middlewares,
            vec!["./_middleware.ts".to_string()]
        );
    }

    #[test]
    fn test_slots_attach_to_owning_layout() {
        let files = [
            "feed/_layout.tsx",
            "feed/index.tsx",
            "feed/@modal/(.)photos/[id].tsx",
            "photos/[id].tsx",
        ];
        let built = build_route_tree(&files, &TreeOptions::default());
        let feed = built.root.child("feed").unwrap();

        assert_eq!(feed.slots.len(), 1);
        assert_eq!(feed.slots[0].name, "modal");
        let intercept = feed.slots[0].routes[0].intercept.as_ref().unwrap();
        assert_eq!(intercept.target, "/feed/photos/[id]");
    }

    #[test]
    fn test_route_tree_add_and_remove() {
        let mut tree = RouteTree::build(["index.tsx"], TreeOptions::default());
        assert!(tree.add_file("./about.tsx"));
        assert!(!tree.add_file("about.tsx"));
        assert!(tree.root().child("about").is_some());

        assert!(tree.remove_file("about.tsx"));
        assert!(tree.root().child("about").is_none());
        assert!(!tree.remove_file("about.tsx"));
    }
}
