// File: vxs-navigation/src/action.rs
// Purpose: Navigation actions and the builder that derives them from a target state

use serde::Serialize;
use uuid::Uuid;
use vxs_router::linking::{NavigationState, NavigatorKind, StateRoute};
use vxs_router::{DynamicSegment, Params};

/// Route a navigation action opens
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct ActionPayload {
    pub name: String,
    pub params: Params,
    /// Explicit route key; a stack reuses the entry carrying it
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
    /// Nested state to open below the route
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<NavigationState>,
}

impl ActionPayload {
    /// Payload opening `route` with everything nested below it.
    pub fn from_route(route: &StateRoute) -> Self {
        Self {
            name: route.name.clone(),
            params: route.params.clone(),
            key: None,
            state: route.state.as_deref().cloned(),
        }
    }
}

/// An action dispatched to a navigation container
///
/// `target` is the key of the navigator that should handle the action;
/// `None` lets it bubble up from the focused navigator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NavigationAction {
    Navigate {
        payload: ActionPayload,
        target: Option<String>,
    },
    Push {
        payload: ActionPayload,
        target: Option<String>,
    },
    Replace {
        payload: ActionPayload,
        target: Option<String>,
    },
    JumpTo {
        payload: ActionPayload,
        target: Option<String>,
    },
    GoBack {
        target: Option<String>,
    },
    Pop {
        count: usize,
        target: Option<String>,
    },
    PopToTop {
        target: Option<String>,
    },
    SetParams {
        params: Params,
        /// Key of the route to update; the focused route when absent
        source: Option<String>,
    },
    Reset {
        state: NavigationState,
        target: Option<String>,
    },
}

impl NavigationAction {
    /// The action type as it appears in diagnostics.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Navigate { .. } => "NAVIGATE",
            Self::Push { .. } => "PUSH",
            Self::Replace { .. } => "REPLACE",
            Self::JumpTo { .. } => "JUMP_TO",
            Self::GoBack { .. } => "GO_BACK",
            Self::Pop { .. } => "POP",
            Self::PopToTop { .. } => "POP_TO_TOP",
            Self::SetParams { .. } => "SET_PARAMS",
            Self::Reset { .. } => "RESET",
        }
    }

    pub fn target(&self) -> Option<&str> {
        match self {
            Self::Navigate { target, .. }
            | Self::Push { target, .. }
            | Self::Replace { target, .. }
            | Self::JumpTo { target, .. }
            | Self::GoBack { target }
            | Self::Pop { target, .. }
            | Self::PopToTop { target }
            | Self::Reset { target, .. } => target.as_deref(),
            Self::SetParams { .. } => None,
        }
    }

    pub fn payload(&self) -> Option<&ActionPayload> {
        match self {
            Self::Navigate { payload, .. }
            | Self::Push { payload, .. }
            | Self::Replace { payload, .. }
            | Self::JumpTo { payload, .. } => Some(payload),
            _ => None,
        }
    }
}

/// How a link asks to move
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LinkKind {
    #[default]
    Navigate,
    Push,
    Replace,
}

/// Whether two routes are the same screen instance
///
/// Names must match, and so must the values of the dynamic params the
/// route name declares. Other params do not count.
pub fn same_screen(a: &StateRoute, b: &StateRoute) -> bool {
    if a.name != b.name {
        return false;
    }
    DynamicSegment::from_route(&a.name)
        .unwrap_or_default()
        .iter()
        .all(|segment| a.params.get(&segment.name) == b.params.get(&segment.name))
}

/// Builds the action moving `current` to `target` (pure apart from key generation)
///
/// Walks both states level by level along their focused routes and stops at
/// the shallowest navigator where they diverge. The action targets that
/// navigator and carries the remaining target state as its payload.
///
/// Tab navigators have no `PUSH`/`REPLACE`: a push becomes `NAVIGATE` and a
/// replace becomes `JUMP_TO`. A stack push gets a fresh route key so that
/// repeated pushes of one screen always add entries.
pub fn get_navigate_action(current: Option<&NavigationState>, target: &NavigationState, kind: LinkKind) -> NavigationAction {
    let mut navigator = current;
    let mut level = target;

    let (route, navigator) = loop {
        let Some(route) = level.focused() else {
            return NavigationAction::Reset {
                state: target.clone(),
                target: None,
            };
        };

        let focused = navigator.and_then(NavigationState::focused);
        match (focused, route.state.as_deref()) {
            (Some(existing), Some(nested)) if same_screen(existing, route) && existing.state.is_some() => {
                navigator = existing.state.as_deref();
                level = nested;
            }
            _ => break (route, navigator),
        }
    };

    let target_key = navigator.and_then(|n| n.key.clone());
    let navigator_kind = navigator.and_then(|n| n.kind).unwrap_or(NavigatorKind::Stack);
    let payload = ActionPayload::from_route(route);

    match (navigator_kind, kind) {
        (NavigatorKind::Tab, LinkKind::Push) | (_, LinkKind::Navigate) => NavigationAction::Navigate {
            payload,
            target: target_key,
        },
        (NavigatorKind::Tab, LinkKind::Replace) => NavigationAction::JumpTo {
            payload,
            target: target_key,
        },
        (NavigatorKind::Stack, LinkKind::Push) => NavigationAction::Push {
            payload: ActionPayload {
                key: Some(format!("{}-{}", payload.name, Uuid::new_v4())),
                ..payload
            },
            target: target_key,
        },
        (NavigatorKind::Stack, LinkKind::Replace) => NavigationAction::Replace {
            payload,
            target: target_key,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vxs_router::params::params;

    fn stack(key: &str, routes: Vec<StateRoute>) -> NavigationState {
        let index = routes.len().saturating_sub(1);
        NavigationState {
            key: Some(key.to_string()),
            kind: Some(NavigatorKind::Stack),
            ..NavigationState::from_routes(routes, index)
        }
    }

    #[test]
    fn test_same_screen_compares_dynamic_params() {
        let a = StateRoute::new("users/[id]").with_params(params([("id", "1"), ("tab", "a")]));
        let b = StateRoute::new("users/[id]").with_params(params([("id", "1"), ("tab", "b")]));
        let c = StateRoute::new("users/[id]").with_params(params([("id", "2")]));
        assert!(same_screen(&a, &b));
        assert!(!same_screen(&a, &c));
    }

    #[test]
    fn test_divergence_targets_nested_navigator() {
        let current = stack(
            "root",
            vec![StateRoute::new("blog").with_state(stack("blog-stack", vec![StateRoute::new("index")]))],
        );
        let target = NavigationState::from_routes(
            vec![StateRoute::new("blog")
                .with_state(NavigationState::from_routes(vec![StateRoute::new("[slug]")], 0))],
            0,
        );

        let action = get_navigate_action(Some(&current), &target, LinkKind::Navigate);
        assert_eq!(action.kind(), "NAVIGATE");
        assert_eq!(action.target(), Some("blog-stack"));
        assert_eq!(action.payload().unwrap().name, "[slug]");
    }

    #[test]
    fn test_tab_push_becomes_navigate() {
        let current = NavigationState {
            key: Some("tabs".into()),
            kind: Some(NavigatorKind::Tab),
            ..NavigationState::from_routes(vec![StateRoute::new("home")], 0)
        };
        let target = NavigationState::from_routes(vec![StateRoute::new("feed")], 0);

        assert_eq!(get_navigate_action(Some(&current), &target, LinkKind::Push).kind(), "NAVIGATE");
        assert_eq!(get_navigate_action(Some(&current), &target, LinkKind::Replace).kind(), "JUMP_TO");
    }

    #[test]
    fn test_stack_push_gets_unique_key() {
        let target = NavigationState::from_routes(vec![StateRoute::new("a")], 0);
        let first = get_navigate_action(None, &target, LinkKind::Push);
        let second = get_navigate_action(None, &target, LinkKind::Push);

        let key = |a: &NavigationAction| a.payload().and_then(|p| p.key.clone());
        assert!(key(&first).unwrap().starts_with("a-"));
        assert_ne!(key(&first), key(&second));
    }
}
