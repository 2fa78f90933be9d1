// File: vxs-navigation/src/memory.rs
// Purpose: In-memory navigation container implementing stack and tab semantics

use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::debug;
use uuid::Uuid;
use vxs_router::linking::{NavigationState, NavigatorKind, StateRoute};

use crate::action::{same_screen, ActionPayload, NavigationAction};
use crate::container::{DispatchOutcome, ListenerId, NavigationContainer, StateListener};
use crate::error::NavigationError;

/// A navigation container that keeps its state in memory
///
/// Navigators are stacks unless registered as tabs with
/// [`with_navigator`](Self::with_navigator), keyed by the name of the layout
/// route that owns them (`""` for the root). Stacks match existing entries
/// by route key first, then by screen identity (name plus dynamic params).
pub struct MemoryNavigationContainer {
    state: RwLock<Option<Arc<NavigationState>>>,
    navigators: HashMap<String, NavigatorKind>,
    deferred: bool,
    queue: Mutex<Vec<NavigationAction>>,
    listeners: Mutex<Vec<(ListenerId, StateListener)>>,
    next_listener: AtomicU64,
}

impl Default for MemoryNavigationContainer {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryNavigationContainer {
    pub fn new() -> Self {
        Self {
            state: RwLock::new(None),
            navigators: HashMap::new(),
            deferred: false,
            queue: Mutex::new(Vec::new()),
            listeners: Mutex::new(Vec::new()),
            next_listener: AtomicU64::new(1),
        }
    }

    /// Declares the navigator kind used below the layout route `layout`.
    pub fn with_navigator(mut self, layout: impl Into<String>, kind: NavigatorKind) -> Self {
        self.navigators.insert(layout.into(), kind);
        self
    }

    /// Queue dispatched actions until [`flush`](Self::flush) is called.
    pub fn deferred(mut self) -> Self {
        self.deferred = true;
        self
    }

    /// Mounts the container with its initial state.
    pub fn mount(&self, mut state: NavigationState) {
        self.normalize(&mut state, "");
        let state = Arc::new(state);
        *self.state.write() = Some(state.clone());
        debug!(routes = state.routes.len(), "Navigation container mounted");
        self.notify(&state);
    }

    pub fn unmount(&self) {
        *self.state.write() = None;
        self.queue.lock().clear();
    }

    /// Applies queued actions in dispatch order.
    pub fn flush(&self) -> Vec<Result<(), NavigationError>> {
        let queued: Vec<NavigationAction> = std::mem::take(&mut *self.queue.lock());
        queued.into_iter().map(|action| self.apply(action)).collect()
    }

    pub fn pending(&self) -> usize {
        self.queue.lock().len()
    }

    fn apply(&self, action: NavigationAction) -> Result<(), NavigationError> {
        let next = {
            let mut guard = self.state.write();
            let current = guard.as_ref().ok_or(NavigationError::NotMounted)?;
            let mut next = NavigationState::clone(current);
            self.reduce(&mut next, &action)?;
            let next = Arc::new(next);
            *guard = Some(next.clone());
            next
        };
        debug!(action = action.kind(), "Navigation action applied");
        self.notify(&next);
        Ok(())
    }

    fn notify(&self, state: &Arc<NavigationState>) {
        let listeners: Vec<StateListener> = self.listeners.lock().iter().map(|(_, l)| l.clone()).collect();
        for listener in listeners {
            (*listener)(state);
        }
    }

    fn kind_for(&self, owner: &str) -> NavigatorKind {
        self.navigators.get(owner).copied().unwrap_or(NavigatorKind::Stack)
    }

    /// Assigns missing navigator kinds and keys throughout `state`.
    fn normalize(&self, state: &mut NavigationState, owner: &str) {
        let kind = *state.kind.get_or_insert(self.kind_for(owner));
        if state.key.is_none() {
            state.key = Some(format!("{}-{}", kind_label(kind), Uuid::new_v4()));
        }
        state.index = state.index.min(state.routes.len().saturating_sub(1));

        for route in &mut state.routes {
            if route.key.is_none() {
                route.key = Some(route_key(&route.name));
            }
            if let Some(nested) = route.state.as_deref_mut() {
                self.normalize(nested, &route.name);
            }
        }
    }

    fn new_route(&self, payload: &ActionPayload) -> StateRoute {
        let mut route = StateRoute {
            key: Some(payload.key.clone().unwrap_or_else(|| route_key(&payload.name))),
            name: payload.name.clone(),
            params: payload.params.clone(),
            state: None,
        };
        if let Some(state) = &payload.state {
            let mut nested = state.clone();
            self.normalize(&mut nested, &payload.name);
            route.state = Some(Box::new(nested));
        }
        route
    }

    fn reduce(&self, root: &mut NavigationState, action: &NavigationAction) -> Result<(), NavigationError> {
        let not_handled = || NavigationError::ActionNotHandled {
            action: action.kind(),
            route: action.payload().map(|p| p.name.clone()),
        };

        if let NavigationAction::SetParams { params, source } = action {
            let route = match source {
                Some(key) => find_route_mut(root, key),
                None => focused_leaf_mut(root),
            }
            .ok_or_else(not_handled)?;
            route.params.extend(params.clone());
            return Ok(());
        }

        let candidates: Vec<Vec<usize>> = match action.target() {
            Some(key) => {
                let path = find_navigator(root, key).ok_or_else(|| NavigationError::UnknownNavigator(key.to_string()))?;
                (0..=path.len()).rev().map(|n| path[..n].to_vec()).collect()
            }
            None if matches!(action, NavigationAction::Reset { .. }) => vec![Vec::new()],
            None => focused_navigators(root).into_iter().rev().collect(),
        };

        for path in candidates {
            let Some(level) = level_mut(root, &path) else {
                continue;
            };
            if self.reduce_level(level, action) {
                return Ok(());
            }
        }
        Err(not_handled())
    }

    /// Applies `action` to one navigator. Returns whether it was handled.
    fn reduce_level(&self, level: &mut NavigationState, action: &NavigationAction) -> bool {
        let kind = level.kind.unwrap_or(NavigatorKind::Stack);

        match (kind, action) {
            (_, NavigationAction::Reset { state, .. }) => {
                let key = level.key.clone();
                let owner_kind = level.kind;
                *level = state.clone();
                level.key = key;
                level.kind = owner_kind;
                for route in &mut level.routes {
                    if route.key.is_none() {
                        route.key = Some(route_key(&route.name));
                    }
                    if let Some(nested) = route.state.as_deref_mut() {
                        self.normalize(nested, &route.name);
                    }
                }
                level.index = level.index.min(level.routes.len().saturating_sub(1));
                true
            }

            (NavigatorKind::Stack, NavigationAction::Navigate { payload, .. }) => {
                let incoming = self.new_route(payload);
                let existing = match &payload.key {
                    Some(key) => level.routes.iter().position(|r| r.key.as_deref() == Some(key.as_str())),
                    None => level.routes.iter().rposition(|r| same_screen(r, &incoming)),
                };
                match existing {
                    Some(index) => {
                        level.routes.truncate(index + 1);
                        let route = &mut level.routes[index];
                        route.params = incoming.params;
                        if incoming.state.is_some() {
                            route.state = incoming.state;
                        }
                        level.index = index;
                    }
                    None => push_route(level, incoming),
                }
                true
            }
            (NavigatorKind::Stack, NavigationAction::Push { payload, .. }) => {
                let incoming = self.new_route(payload);
                let existing = match &payload.key {
                    Some(key) => level.routes.iter().position(|r| r.key.as_deref() == Some(key.as_str())),
                    None => level.routes.iter().position(|r| same_screen(r, &incoming)),
                };
                match existing {
                    Some(index) => {
                        let mut route = level.routes.remove(index);
                        route.params = incoming.params;
                        if incoming.state.is_some() {
                            route.state = incoming.state;
                        }
                        push_route(level, route);
                    }
                    None => push_route(level, incoming),
                }
                true
            }
            (NavigatorKind::Stack, NavigationAction::Replace { payload, .. }) => {
                let incoming = self.new_route(payload);
                if level.routes.is_empty() {
                    push_route(level, incoming);
                } else {
                    let index = level.index.min(level.routes.len() - 1);
                    level.routes.truncate(index + 1);
                    level.routes[index] = incoming;
                    level.index = index;
                }
                true
            }
            (NavigatorKind::Stack, NavigationAction::GoBack { .. }) => pop(level, 1),
            (NavigatorKind::Stack, NavigationAction::Pop { count, .. }) => pop(level, *count),
            (NavigatorKind::Stack, NavigationAction::PopToTop { .. }) => {
                let count = level.routes.len().saturating_sub(1);
                pop(level, count)
            }

            (NavigatorKind::Tab, NavigationAction::Navigate { payload, .. })
            | (NavigatorKind::Tab, NavigationAction::JumpTo { payload, .. }) => {
                match level.routes.iter().position(|r| r.name == payload.name) {
                    Some(index) => {
                        let incoming = self.new_route(payload);
                        let route = &mut level.routes[index];
                        route.params = incoming.params;
                        if incoming.state.is_some() {
                            route.state = incoming.state;
                        }
                        level.index = index;
                    }
                    None => {
                        let incoming = self.new_route(payload);
                        push_route(level, incoming);
                    }
                }
                true
            }
            (NavigatorKind::Tab, NavigationAction::GoBack { .. }) if level.index > 0 => {
                level.index = 0;
                true
            }

            _ => false,
        }
    }
}

impl NavigationContainer for MemoryNavigationContainer {
    fn is_ready(&self) -> bool {
        self.state.read().is_some()
    }

    fn dispatch(&self, action: NavigationAction) -> Result<DispatchOutcome, NavigationError> {
        if !self.is_ready() {
            return Err(NavigationError::NotMounted);
        }
        if self.deferred {
            self.queue.lock().push(action);
            return Ok(DispatchOutcome::Pending);
        }
        self.apply(action)?;
        Ok(DispatchOutcome::Applied)
    }

    fn get_root_state(&self) -> Option<Arc<NavigationState>> {
        self.state.read().clone()
    }

    fn add_state_listener(&self, listener: StateListener) -> ListenerId {
        let id = ListenerId(self.next_listener.fetch_add(1, Ordering::Relaxed));
        self.listeners.lock().push((id, listener));
        id
    }

    fn remove_state_listener(&self, id: ListenerId) {
        self.listeners.lock().retain(|(existing, _)| *existing != id);
    }
}

// ============================================================================
// State helpers
// ============================================================================

fn kind_label(kind: NavigatorKind) -> &'static str {
    match kind {
        NavigatorKind::Stack => "stack",
        NavigatorKind::Tab => "tab",
    }
}

fn route_key(name: &str) -> String {
    format!("{}-{}", name, Uuid::new_v4())
}

fn push_route(level: &mut NavigationState, route: StateRoute) {
    level.routes.push(route);
    level.index = level.routes.len() - 1;
}

fn pop(level: &mut NavigationState, count: usize) -> bool {
    if level.routes.len() <= 1 || count == 0 {
        return false;
    }
    let keep = level.routes.len() - count.min(level.routes.len() - 1);
    level.routes.truncate(keep);
    level.index = keep - 1;
    true
}

/// Route indices leading from the root to the navigator keyed `key`.
fn find_navigator(state: &NavigationState, key: &str) -> Option<Vec<usize>> {
    if state.key.as_deref() == Some(key) {
        return Some(Vec::new());
    }
    state.routes.iter().enumerate().find_map(|(i, route)| {
        let nested = route.state.as_deref()?;
        let mut path = find_navigator(nested, key)?;
        path.insert(0, i);
        Some(path)
    })
}

/// Paths of every navigator on the focused chain, root first.
fn focused_navigators(root: &NavigationState) -> Vec<Vec<usize>> {
    let mut out = vec![Vec::new()];
    let mut path = Vec::new();
    let mut level = root;

    loop {
        let index = level.index.min(level.routes.len().saturating_sub(1));
        let Some(nested) = level.routes.get(index).and_then(|r| r.state.as_deref()) else {
            break;
        };
        path.push(index);
        out.push(path.clone());
        level = nested;
    }
    out
}

fn level_mut<'a>(root: &'a mut NavigationState, path: &[usize]) -> Option<&'a mut NavigationState> {
    let mut level = root;
    for &i in path {
        level = level.routes.get_mut(i)?.state.as_deref_mut()?;
    }
    Some(level)
}

fn find_route_mut<'a>(state: &'a mut NavigationState, key: &str) -> Option<&'a mut StateRoute> {
    for route in state.routes.iter_mut() {
        if route.key.as_deref() == Some(key) {
            return Some(route);
        }
        if let Some(nested) = route.state.as_deref_mut() {
            if let Some(found) = find_route_mut(nested, key) {
                return Some(found);
            }
        }
    }
    None
}

fn focused_leaf_mut(state: &mut NavigationState) -> Option<&mut StateRoute> {
    let index = state.index.min(state.routes.len().saturating_sub(1));
    let route = state.routes.get_mut(index)?;
    if route.state.is_some() {
        route.state.as_deref_mut().and_then(focused_leaf_mut)
    } else {
        Some(route)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vxs_router::params::params;

    fn payload(name: &str) -> ActionPayload {
        ActionPayload {
            name: name.to_string(),
            ..Default::default()
        }
    }

    fn mounted(routes: Vec<StateRoute>) -> MemoryNavigationContainer {
        let container = MemoryNavigationContainer::new();
        container.mount(NavigationState::from_routes(routes, 0));
        container
    }

    fn names(container: &MemoryNavigationContainer) -> Vec<String> {
        container
            .get_root_state()
            .unwrap()
            .routes
            .iter()
            .map(|r| r.name.clone())
            .collect()
    }

    #[test]
    fn test_mount_assigns_keys() {
        let container = mounted(vec![StateRoute::new("index")]);
        let state = container.get_root_state().unwrap();
        assert!(state.key.as_deref().unwrap().starts_with("stack-"));
        assert!(state.routes[0].key.as_deref().unwrap().starts_with("index-"));
        assert_eq!(state.kind, Some(NavigatorKind::Stack));
    }

    #[test]
    fn test_push_without_key_reuses_same_screen() {
        let container = mounted(vec![StateRoute::new("a")]);
        container
            .dispatch(NavigationAction::Push {
                payload: payload("a"),
                target: None,
            })
            .unwrap();
        assert_eq!(names(&container), vec!["a"]);
    }

    #[test]
    fn test_push_with_fresh_keys_adds_entries() {
        let container = mounted(vec![StateRoute::new("index")]);
        for key in ["a-1", "a-2"] {
            container
                .dispatch(NavigationAction::Push {
                    payload: ActionPayload {
                        key: Some(key.to_string()),
                        ..payload("a")
                    },
                    target: None,
                })
                .unwrap();
        }
        assert_eq!(names(&container), vec!["index", "a", "a"]);
    }

    #[test]
    fn test_navigate_pops_back_to_existing_screen() {
        let container = mounted(vec![StateRoute::new("index")]);
        for name in ["a", "b", "a"] {
            container
                .dispatch(NavigationAction::Navigate {
                    payload: payload(name),
                    target: None,
                })
                .unwrap();
        }
        assert_eq!(names(&container), vec!["index", "a"]);
    }

    #[test]
    fn test_navigate_distinguishes_dynamic_params() {
        let container = mounted(vec![StateRoute::new("users/[id]").with_params(params([("id", "1")]))]);
        container
            .dispatch(NavigationAction::Navigate {
                payload: ActionPayload {
                    params: params([("id", "2")]),
                    ..payload("users/[id]")
                },
                target: None,
            })
            .unwrap();
        assert_eq!(names(&container).len(), 2);
    }

    #[test]
    fn test_back_bubbles_to_parent_stack() {
        let container = MemoryNavigationContainer::new().with_navigator("(tabs)", NavigatorKind::Tab);
        container.mount(NavigationState::from_routes(
            vec![
                StateRoute::new("login"),
                StateRoute::new("(tabs)").with_state(NavigationState::from_routes(vec![StateRoute::new("home")], 0)),
            ],
            1,
        ));

        assert!(container.can_go_back());
        container.dispatch(NavigationAction::GoBack { target: None }).unwrap();
        assert_eq!(names(&container), vec!["login"]);
        assert!(!container.can_go_back());
        assert!(matches!(
            container.dispatch(NavigationAction::GoBack { target: None }),
            Err(NavigationError::ActionNotHandled { action: "GO_BACK", .. })
        ));
    }

    #[test]
    fn test_tabs_reject_push() {
        let container = MemoryNavigationContainer::new().with_navigator("", NavigatorKind::Tab);
        container.mount(NavigationState::from_routes(vec![StateRoute::new("home")], 0));

        assert!(container
            .dispatch(NavigationAction::Push {
                payload: payload("feed"),
                target: None,
            })
            .is_err());
        container
            .dispatch(NavigationAction::JumpTo {
                payload: payload("feed"),
                target: None,
            })
            .unwrap();
        assert_eq!(names(&container), vec!["home", "feed"]);
    }

    #[test]
    fn test_set_params_updates_focused_leaf() {
        let container = mounted(vec![StateRoute::new("search").with_params(params([("q", "a")]))]);
        container
            .dispatch(NavigationAction::SetParams {
                params: params([("q", "b"), ("page", "2")]),
                source: None,
            })
            .unwrap();
        let route = container.get_current_route().unwrap();
        assert_eq!(route.params, params([("q", "b"), ("page", "2")]));
    }

    #[test]
    fn test_unknown_target() {
        let container = mounted(vec![StateRoute::new("index")]);
        assert_eq!(
            container.dispatch(NavigationAction::PopToTop {
                target: Some("nope".into())
            }),
            Err(NavigationError::UnknownNavigator("nope".into()))
        );
    }

    #[test]
    fn test_deferred_dispatch() {
        let container = MemoryNavigationContainer::new().deferred();
        container.mount(NavigationState::from_routes(vec![StateRoute::new("index")], 0));

        let outcome = container
            .dispatch(NavigationAction::Navigate {
                payload: payload("a"),
                target: None,
            })
            .unwrap();
        assert_eq!(outcome, DispatchOutcome::Pending);
        assert_eq!(names(&container), vec!["index"]);

        assert_eq!(container.flush(), vec![Ok(())]);
        assert_eq!(names(&container), vec!["index", "a"]);
    }

    #[test]
    fn test_listeners_see_every_change() {
        let container = mounted(vec![StateRoute::new("index")]);
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let id = container.add_state_listener(Arc::new(move |state: &Arc<NavigationState>| {
            sink.lock().push(state.routes.len());
        }));

        container
            .dispatch(NavigationAction::Navigate {
                payload: payload("a"),
                target: None,
            })
            .unwrap();
        container.remove_state_listener(id);
        container.dispatch(NavigationAction::GoBack { target: None }).unwrap();

        assert_eq!(*seen.lock(), vec![2]);
    }
}
