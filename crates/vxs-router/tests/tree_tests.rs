//! Integration tests for route tree building
//!
//! Builds trees from directory listings the way a project scan produces
//! them and checks ordering, special files and error recovery.

use pretty_assertions::assert_eq;
use rstest::rstest;

use vxs_router::route::parser::{parse_route_file, FileKind};
use vxs_router::{build_route_tree, RenderMode, RouteBuildError, RouteNode, RouteTree, RouteType, TreeOptions};

fn child_routes(node: &RouteNode) -> Vec<&str> {
    node.children.iter().map(|c| c.route.as_str()).collect()
}

#[test]
fn test_sibling_order_by_specificity() {
    let files = [
        "+not-found.tsx",
        "[...rest].tsx",
        "[slug].tsx",
        "about.tsx",
        "index.tsx",
    ];
    let built = build_route_tree(&files, &TreeOptions::default());
    assert_eq!(
        child_routes(&built.root),
        vec!["index", "about", "[slug]", "[...rest]", "+not-found"]
    );
}

#[test]
fn test_malformed_files_are_skipped() {
    let files = [
        "index.tsx",
        "users/[id.tsx",
        "[id]/[id].tsx",
        "files/[...rest]/edit.tsx",
        "(marketing)/+html.tsx",
        "about.tsx",
    ];
    let built = build_route_tree(&files, &TreeOptions::default());

    assert_eq!(child_routes(&built.root), vec!["index", "about", "+not-found"]);
    assert_eq!(built.skipped.len(), 4);
    assert!(built
        .skipped
        .iter()
        .any(|e| matches!(e, RouteBuildError::DuplicateParam { name, .. } if name == "id")));
    assert!(built
        .skipped
        .iter()
        .any(|e| matches!(e, RouteBuildError::CatchAllNotLast { name, .. } if name == "rest")));
    assert!(built
        .skipped
        .iter()
        .any(|e| matches!(e, RouteBuildError::NestedHtml { .. })));
}

#[test]
fn test_html_template_is_recorded_not_routed() {
    let built = build_route_tree(&["+html.tsx", "index.tsx"], &TreeOptions::default());
    assert_eq!(built.html.as_deref(), Some("./+html.tsx"));
    assert_eq!(child_routes(&built.root), vec!["index", "+not-found"]);
}

#[rstest]
#[case("dash+spa/index.tsx", RouteType::Spa)]
#[case("blog+ssg/[slug].tsx", RouteType::Ssg)]
#[case("blog+ssg/live+ssr.tsx", RouteType::Ssr)]
#[case("plain.tsx", RouteType::Ssr)]
#[case("api/users+api.ts", RouteType::Api)]
fn test_render_modes(#[case] file: &str, #[case] expected: RouteType) {
    let built = build_route_tree(&[file], &TreeOptions::default());
    assert_eq!(built.root.children[0].route_type, expected);
}

#[test]
fn test_default_render_mode_option() {
    let options = TreeOptions {
        default_render_mode: RenderMode::Spa,
        ..Default::default()
    };
    let built = build_route_tree(&["about.tsx"], &options);
    assert_eq!(built.root.child("about").unwrap().route_type, RouteType::Spa);
    assert_eq!(built.root.child("+not-found").unwrap().route_type, RouteType::Spa);
}

#[test]
fn test_grouped_layouts_nest() {
    let files = [
        "(app)/_layout.tsx",
        "(app)/home.tsx",
        "(app)/settings/_layout.tsx",
        "(app)/settings/profile.tsx",
    ];
    let built = build_route_tree(&files, &TreeOptions::default());

    let app = built.root.child("(app)").unwrap();
    assert!(app.is_layout());
    assert_eq!(child_routes(app), vec!["home", "settings"]);

    let settings = app.child("settings").unwrap();
    assert_eq!(
        settings.child("profile").unwrap().layouts,
        vec![
            "./_layout.tsx".to_string(),
            "./(app)/_layout.tsx".to_string(),
            "./(app)/settings/_layout.tsx".to_string(),
        ]
    );
}

#[test]
fn test_intercept_levels() {
    let cases = [
        ("feed/@modal/(.)photos/[id].tsx", "/feed/photos/[id]"),
        ("feed/@modal/(..)photos/[id].tsx", "/photos/[id]"),
        ("shop/cart/@modal/(..)(..)login.tsx", "/login"),
        ("a/b/@modal/(...)login.tsx", "/login"),
    ];
    for (file, target) in cases {
        let parsed = parse_route_file(file).unwrap();
        assert_eq!(parsed.intercept.unwrap().target, target, "{}", file);
    }
}

#[test]
fn test_intercept_outside_slot_is_rejected() {
    assert!(matches!(
        parse_route_file("(.)photos/[id].tsx"),
        Err(RouteBuildError::InterceptOutsideSlot { .. })
    ));
}

#[test]
fn test_slot_routes_stay_out_of_children() {
    let files = ["_layout.tsx", "@panel/settings.tsx", "index.tsx"];
    let built = build_route_tree(&files, &TreeOptions::default());

    assert_eq!(child_routes(&built.root), vec!["index", "+not-found"]);
    assert_eq!(built.root.slots[0].name, "panel");
    assert_eq!(built.root.slots[0].routes[0].route, "settings");
}

#[test]
fn test_api_kind() {
    let parsed = parse_route_file("api/[user]/posts+api.ts").unwrap();
    assert_eq!(parsed.kind, FileKind::Api);
    assert_eq!(parsed.name, "posts");
}

#[test]
fn test_route_tree_rebuild_updates_manifest() {
    let mut tree = RouteTree::build(["index.tsx"], TreeOptions::default());
    assert!(tree.manifest().match_page("/contact").unwrap().0.is_not_found());

    tree.add_file("contact.tsx");
    let (route, _) = tree.manifest().match_page("/contact").unwrap();
    assert_eq!(route.file, "./contact.tsx");

    tree.remove_file("./contact.tsx");
    assert!(tree.manifest().match_page("/contact").unwrap().0.is_not_found());
}

#[test]
fn test_route_tree_dedupes_listing() {
    let tree = RouteTree::build(["about.tsx", "./about.tsx", "about.tsx"], TreeOptions::default());
    assert_eq!(tree.files(), &["about.tsx".to_string()]);
}

#[test]
fn test_tree_serializes_with_type_field() {
    let built = build_route_tree(&["users/[id].tsx"], &TreeOptions::default());
    let json = serde_json::to_value(&built.root).unwrap();

    assert_eq!(json["type"], "layout");
    assert_eq!(json["contextKey"], "./_layout.tsx");
    assert_eq!(json["children"][0]["route"], "users/[id]");
    assert_eq!(json["children"][0]["dynamic"][0]["name"], "id");
}
