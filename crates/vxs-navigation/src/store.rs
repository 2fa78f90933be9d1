// File: vxs-navigation/src/store.rs
// Purpose: Router store: owns route tree, linking config and navigation wiring

use once_cell::sync::Lazy;
use parking_lot::{Mutex, RwLock};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info, warn};
use vxs_router::linking::{
    compile_route_masks, find_intercept_route, get_linking_config, get_state_from_path, match_route_mask,
    unmask_location, CompiledRouteMask, InterceptMatch, LinkingConfig, NavigationMode, NavigationState, NavigatorKind,
    RouteMask, ScreenConfig,
};
use vxs_router::{Params, RouteNode};

use crate::action::{get_navigate_action, LinkKind, NavigationAction};
use crate::container::{DispatchOutcome, ListenerId, NavigationContainer};
use crate::error::{NavigationError, Result, RouterError};
use crate::history::{BrowserHistory, HistoryEntry};
use crate::href::{is_external, resolve_href, resolve_relative, Href};
use crate::route_info::{get_route_info_from_state, UrlObject};

/// What to do with an action no navigator handled
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnhandledActionPolicy {
    /// Return the error to the caller
    Strict,
    /// Log a diagnostic listing the available routes
    Log,
    Ignore,
}

impl Default for UnhandledActionPolicy {
    fn default() -> Self {
        if cfg!(debug_assertions) {
            Self::Log
        } else {
            Self::Ignore
        }
    }
}

/// Store configuration
#[derive(Debug, Clone)]
pub struct StoreOptions {
    pub base_url: Option<String>,
    pub masks: Vec<RouteMask>,
    /// How often to check for completion when a dispatch is pending
    pub poll_interval: Duration,
    /// Give up waiting for a pending dispatch after this long
    pub timeout: Duration,
    /// Warn when a navigation takes longer than this
    pub slow_navigation: Option<Duration>,
    pub unhandled_actions: UnhandledActionPolicy,
}

impl Default for StoreOptions {
    fn default() -> Self {
        Self {
            base_url: None,
            masks: Vec::new(),
            poll_interval: Duration::from_millis(16),
            timeout: Duration::from_secs(5),
            slow_navigation: cfg!(debug_assertions).then_some(Duration::from_secs(1)),
            unhandled_actions: UnhandledActionPolicy::default(),
        }
    }
}

/// Options of one `link_to` call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LinkOptions {
    pub kind: LinkKind,
    pub mode: NavigationMode,
}

impl Default for LinkOptions {
    fn default() -> Self {
        Self {
            kind: LinkKind::Navigate,
            mode: NavigationMode::Soft,
        }
    }
}

impl From<LinkKind> for LinkOptions {
    fn from(kind: LinkKind) -> Self {
        Self {
            kind,
            ..Default::default()
        }
    }
}

/// Loading-state event around a navigation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadState {
    Started { href: String },
    Finished { href: String, elapsed: Duration },
}

/// Handle for store subscriptions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

type RouteListener = Arc<dyn Fn(&UrlObject) + Send + Sync>;
type LoadListener = Arc<dyn Fn(&LoadState) + Send + Sync>;

/// Collaborators fixed at `initialize`
#[derive(Clone)]
struct Wiring {
    root: Arc<RouteNode>,
    linking: Arc<LinkingConfig>,
    masks: Arc<Vec<CompiledRouteMask>>,
    container: Arc<dyn NavigationContainer>,
    history: Option<Arc<dyn BrowserHistory>>,
    options: StoreOptions,
}

struct Session {
    wiring: Wiring,
    listener: ListenerId,
    initial_state: Option<NavigationState>,
    root_state: Option<Arc<NavigationState>>,
    route_info: UrlObject,
    active_slots: Vec<InterceptMatch>,
}

static GLOBAL: Lazy<Arc<RouterStore>> = Lazy::new(|| Arc::new(RouterStore::new()));

/// Process-wide router state
///
/// Holds the route tree, the root navigation state and the derived route
/// info, plus subscribers for route changes and loading state. All
/// mutation goes through the methods below; locks are never held while
/// the navigation container runs, since its listeners call back in.
pub struct RouterStore {
    session: RwLock<Option<Session>>,
    subscribers: Mutex<Vec<(SubscriptionId, RouteListener)>>,
    load_listeners: Mutex<Vec<(SubscriptionId, LoadListener)>>,
    next_id: AtomicU64,
}

impl Default for RouterStore {
    fn default() -> Self {
        Self::new()
    }
}

impl RouterStore {
    pub fn new() -> Self {
        Self {
            session: RwLock::new(None),
            subscribers: Mutex::new(Vec::new()),
            load_listeners: Mutex::new(Vec::new()),
            next_id: AtomicU64::new(1),
        }
    }

    /// The shared process-wide store.
    pub fn global() -> Arc<RouterStore> {
        GLOBAL.clone()
    }

    // ========================================================================
    // Lifecycle
    // ========================================================================

    /// Wires the store to a route tree and a navigation container
    ///
    /// Any previous session is cleaned up first, subscribers included. The
    /// initial state is decoded from `initial_location`, or from the
    /// current history entry with masks restored as on a reload. A ready
    /// container is reset to it; otherwise the UI mounts it from
    /// [`initial_state`](Self::initial_state).
    pub fn initialize(
        self: &Arc<Self>,
        root: Arc<RouteNode>,
        container: Arc<dyn NavigationContainer>,
        history: Option<Arc<dyn BrowserHistory>>,
        initial_location: Option<&str>,
        options: StoreOptions,
    ) -> Result<()> {
        self.cleanup();

        let masks = compile_route_masks(&options.masks)?;
        let mut linking = get_linking_config(&root);
        linking.base_url = options.base_url.clone();

        let entry = history.as_ref().and_then(|h| h.current());
        let displayed = initial_location
            .map(str::to_string)
            .or_else(|| entry.as_ref().map(|e| e.href.clone()))
            .unwrap_or_else(|| "/".to_string());
        let location = unmask_location(&displayed, entry.as_ref().and_then(|e| e.mask.as_ref()), true);

        let initial_state = get_state_from_path(&location, &linking);
        let route_info = initial_state
            .as_ref()
            .map(|state| get_route_info_from_state(state, &linking))
            .unwrap_or_else(UrlObject::root);

        let weak = Arc::downgrade(self);
        let listener = container.add_state_listener(Arc::new(move |state: &Arc<NavigationState>| {
            if let Some(store) = weak.upgrade() {
                store.handle_state(state);
            }
        }));

        *self.session.write() = Some(Session {
            wiring: Wiring {
                root,
                linking: Arc::new(linking),
                masks: Arc::new(masks),
                container: container.clone(),
                history,
                options,
            },
            listener,
            initial_state: initial_state.clone(),
            root_state: None,
            route_info: route_info.clone(),
            active_slots: Vec::new(),
        });
        info!(location = %location, pathname = %route_info.pathname, "Router store initialized");

        if container.is_ready() {
            if let Some(state) = initial_state {
                if let Err(e) = container.dispatch(NavigationAction::Reset { state, target: None }) {
                    warn!(error = %e, "Failed to reset navigation container to the initial state");
                }
            }
        }
        Ok(())
    }

    /// Drops the session, the container listener and every subscriber.
    pub fn cleanup(&self) {
        let session = self.session.write().take();
        if let Some(session) = session {
            session.wiring.container.remove_state_listener(session.listener);
            debug!("Router store cleaned up");
        }
        self.subscribers.lock().clear();
        self.load_listeners.lock().clear();
    }

    /// The state the navigation container should mount with.
    pub fn initial_state(&self) -> Option<NavigationState> {
        self.session.read().as_ref().and_then(|s| s.initial_state.clone())
    }

    fn handle_state(&self, state: &Arc<NavigationState>) {
        let info = {
            let mut guard = self.session.write();
            let Some(session) = guard.as_mut() else {
                return;
            };
            if session.root_state.as_ref().is_some_and(|s| Arc::ptr_eq(s, state)) {
                return;
            }
            session.root_state = Some(state.clone());
            let info = get_route_info_from_state(state, &session.wiring.linking);
            session.route_info = info.clone();
            info
        };
        self.notify_subscribers(&info);
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    pub fn is_ready(&self) -> bool {
        self.session
            .read()
            .as_ref()
            .is_some_and(|s| s.wiring.container.is_ready())
    }

    pub fn route_info(&self) -> UrlObject {
        self.session
            .read()
            .as_ref()
            .map(|s| s.route_info.clone())
            .unwrap_or_else(UrlObject::root)
    }

    pub fn root_state(&self) -> Option<Arc<NavigationState>> {
        let wiring = self.session.read().as_ref().map(|s| s.wiring.clone())?;
        wiring.container.get_root_state()
    }

    /// Slot routes activated by intercepted navigations.
    pub fn active_slots(&self) -> Vec<InterceptMatch> {
        self.session
            .read()
            .as_ref()
            .map(|s| s.active_slots.clone())
            .unwrap_or_default()
    }

    /// Fails with [`RouterError::NotReady`] unless the store is initialized
    /// and the container has mounted.
    pub fn assert_is_ready(&self) -> Result<()> {
        self.ready_wiring().map(|_| ())
    }

    fn ready_wiring(&self) -> Result<Wiring> {
        let wiring = self
            .session
            .read()
            .as_ref()
            .map(|s| s.wiring.clone())
            .ok_or(RouterError::NotReady)?;
        if !wiring.container.is_ready() {
            return Err(RouterError::NotReady);
        }
        Ok(wiring)
    }

    // ========================================================================
    // Navigation
    // ========================================================================

    pub async fn navigate(&self, href: impl Into<Href>) -> Result<()> {
        self.link_to(href, LinkKind::Navigate).await
    }

    pub async fn push(&self, href: impl Into<Href>) -> Result<()> {
        self.link_to(href, LinkKind::Push).await
    }

    pub async fn replace(&self, href: impl Into<Href>) -> Result<()> {
        self.link_to(href, LinkKind::Replace).await
    }

    /// Moves to `href`
    ///
    /// Soft navigations first look for an intercept route; a hit activates
    /// the slot and updates the displayed URL without a route change.
    /// Otherwise masks are applied, the real href is decoded, and the
    /// action for the shallowest diverging navigator is dispatched between
    /// a started/finished loading-state pair.
    ///
    /// Relative hrefs resolve against the current URL pathname, not the
    /// route's pattern segments: groups are not part of the base, and under
    /// a mask the base is the real route rather than the displayed URL.
    pub async fn link_to(&self, href: impl Into<Href>, options: impl Into<LinkOptions>) -> Result<()> {
        let options = options.into();
        let wiring = self.ready_wiring()?;

        let href = resolve_href(&href.into())?;
        if is_external(&href) {
            return Err(RouterError::ExternalHref(href));
        }
        let href = resolve_relative(&href, &self.route_info().pathname);
        let current = wiring.container.get_root_state();

        if let Some(hit) = find_intercept_route(&wiring.root, current.as_deref(), &href, options.mode) {
            debug!(href = %href, slot = %hit.slot, route = %hit.route, "Navigation intercepted");
            self.activate_slot(hit);
            if let Some(history) = &wiring.history {
                record(history.as_ref(), options.kind, HistoryEntry::new(href));
            }
            let info = self.route_info();
            self.notify_subscribers(&info);
            return Ok(());
        }
        self.clear_slots();

        let (actual, entry) = match match_route_mask(&wiring.masks, &href) {
            Some(masked) => (
                masked.actual,
                HistoryEntry {
                    href: masked.displayed,
                    mask: Some(masked.state),
                },
            ),
            None => (href.clone(), HistoryEntry::new(href.clone())),
        };

        let target = get_state_from_path(&actual, &wiring.linking).ok_or_else(|| RouterError::NoMatch(actual.clone()))?;
        let action = get_navigate_action(current.as_deref(), &target, options.kind);
        debug!(href = %actual, action = action.kind(), target = ?action.target(), "Dispatching navigation");

        self.emit_load(&LoadState::Started { href: actual.clone() });
        let started = Instant::now();

        let applied = match wiring.container.dispatch(action) {
            Ok(DispatchOutcome::Applied) => Ok(true),
            Ok(DispatchOutcome::Pending) => Ok(wait_for_change(&wiring, current).await),
            Err(e) => self.handle_unhandled(e, &wiring),
        };

        if let (Ok(true), Some(history)) = (&applied, &wiring.history) {
            record(history.as_ref(), options.kind, entry);
        }

        let elapsed = started.elapsed();
        if wiring.options.slow_navigation.is_some_and(|slow| elapsed > slow) {
            warn!(href = %actual, elapsed_ms = elapsed.as_millis() as u64, "Navigation took longer than expected");
        }
        self.emit_load(&LoadState::Finished { href: actual, elapsed });

        applied.map(|_| ())
    }

    /// Updates the focused route's params without a path transition.
    pub fn set_params(&self, params: Params) -> Result<()> {
        let wiring = self.ready_wiring()?;
        let source = wiring.container.get_current_route().and_then(|r| r.key);

        let applied = match wiring.container.dispatch(NavigationAction::SetParams { params, source }) {
            Ok(outcome) => Ok(outcome == DispatchOutcome::Applied),
            Err(e) => self.handle_unhandled(e, &wiring),
        }?;

        if applied {
            if let Some(history) = &wiring.history {
                history.replace(HistoryEntry::new(self.route_info().unstable_global_href));
            }
        }
        Ok(())
    }

    pub fn back(&self) -> Result<()> {
        let wiring = self.ready_wiring()?;
        let applied = match wiring.container.dispatch(NavigationAction::GoBack { target: None }) {
            Ok(_) => Ok(true),
            Err(e) => self.handle_unhandled(e, &wiring),
        }?;
        if applied {
            if let Some(history) = &wiring.history {
                history.back();
            }
        }
        Ok(())
    }

    pub fn can_go_back(&self) -> bool {
        self.ready_wiring()
            .map(|w| w.container.can_go_back())
            .unwrap_or(false)
    }

    /// Pops `count` screens off the closest stack that has more than one.
    pub fn dismiss(&self, count: usize) -> Result<()> {
        self.dismiss_with(|target| NavigationAction::Pop {
            count: count.max(1),
            target,
        })
    }

    /// Returns the closest dismissible stack to its first screen.
    pub fn dismiss_all(&self) -> Result<()> {
        self.dismiss_with(|target| NavigationAction::PopToTop { target })
    }

    /// Whether any stack in the state has more than one route.
    pub fn can_dismiss(&self) -> bool {
        self.root_state()
            .is_some_and(|state| dismissible_navigator(&state).is_some())
    }

    fn dismiss_with(&self, action: impl FnOnce(Option<String>) -> NavigationAction) -> Result<()> {
        let wiring = self.ready_wiring()?;
        let state = wiring.container.get_root_state();
        let Some(target) = state.as_deref().and_then(dismissible_navigator).map(|n| n.key.clone()) else {
            let action = action(None);
            let error = NavigationError::ActionNotHandled {
                action: action.kind(),
                route: None,
            };
            return self.handle_unhandled(error, &wiring).map(|_| ());
        };

        match wiring.container.dispatch(action(target)) {
            Ok(_) => Ok(()),
            Err(e) => self.handle_unhandled(e, &wiring).map(|_| ()),
        }
    }

    fn handle_unhandled(&self, error: NavigationError, wiring: &Wiring) -> Result<bool> {
        if !matches!(error, NavigationError::ActionNotHandled { .. }) {
            return Err(error.into());
        }

        match wiring.options.unhandled_actions {
            UnhandledActionPolicy::Strict => Err(RouterError::Unhandled {
                source: error,
                available: available_routes(&wiring.linking),
            }),
            UnhandledActionPolicy::Log => {
                warn!(
                    error = %error,
                    available = %available_routes(&wiring.linking).join(", "),
                    "Navigation action was not handled by any navigator"
                );
                Ok(false)
            }
            UnhandledActionPolicy::Ignore => {
                debug!(error = %error, "Ignoring unhandled navigation action");
                Ok(false)
            }
        }
    }

    fn activate_slot(&self, hit: InterceptMatch) {
        if let Some(session) = self.session.write().as_mut() {
            session
                .active_slots
                .retain(|s| !(s.layout == hit.layout && s.slot == hit.slot));
            session.active_slots.push(hit);
        }
    }

    fn clear_slots(&self) {
        if let Some(session) = self.session.write().as_mut() {
            session.active_slots.clear();
        }
    }

    // ========================================================================
    // Subscriptions
    // ========================================================================

    fn next_id(&self) -> SubscriptionId {
        SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed))
    }

    /// Calls `listener` with the new route info after each route change.
    pub fn subscribe(&self, listener: impl Fn(&UrlObject) + Send + Sync + 'static) -> SubscriptionId {
        let id = self.next_id();
        self.subscribers.lock().push((id, Arc::new(listener)));
        id
    }

    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut subscribers = self.subscribers.lock();
        let before = subscribers.len();
        subscribers.retain(|(existing, _)| *existing != id);
        subscribers.len() != before
    }

    pub fn on_load_state(&self, listener: impl Fn(&LoadState) + Send + Sync + 'static) -> SubscriptionId {
        let id = self.next_id();
        self.load_listeners.lock().push((id, Arc::new(listener)));
        id
    }

    pub fn remove_load_listener(&self, id: SubscriptionId) -> bool {
        let mut listeners = self.load_listeners.lock();
        let before = listeners.len();
        listeners.retain(|(existing, _)| *existing != id);
        listeners.len() != before
    }

    fn notify_subscribers(&self, info: &UrlObject) {
        let subscribers: Vec<RouteListener> = self.subscribers.lock().iter().map(|(_, l)| l.clone()).collect();
        for subscriber in subscribers {
            (*subscriber)(info);
        }
    }

    fn emit_load(&self, state: &LoadState) {
        let listeners: Vec<LoadListener> = self.load_listeners.lock().iter().map(|(_, l)| l.clone()).collect();
        for listener in listeners {
            (*listener)(state);
        }
    }
}

fn record(history: &dyn BrowserHistory, kind: LinkKind, entry: HistoryEntry) {
    match kind {
        LinkKind::Replace => history.replace(entry),
        LinkKind::Navigate | LinkKind::Push => history.push(entry),
    }
}

/// Polls until the container's root state changes or the timeout passes.
async fn wait_for_change(wiring: &Wiring, previous: Option<Arc<NavigationState>>) -> bool {
    let deadline = Instant::now() + wiring.options.timeout;
    loop {
        tokio::time::sleep(wiring.options.poll_interval).await;

        let changed = match (wiring.container.get_root_state(), &previous) {
            (Some(now), Some(before)) => !Arc::ptr_eq(&now, before),
            (now, before) => now.is_some() != before.is_some(),
        };
        if changed {
            return true;
        }
        if Instant::now() >= deadline {
            warn!(
                timeout_ms = wiring.options.timeout.as_millis() as u64,
                "Navigation container did not apply the action in time"
            );
            return false;
        }
    }
}

/// Full route names of every leaf screen, for diagnostics.
fn available_routes(config: &LinkingConfig) -> Vec<String> {
    fn collect(screens: &[ScreenConfig], prefix: &str, out: &mut Vec<String>) {
        for screen in screens {
            let name = if prefix.is_empty() {
                screen.name.clone()
            } else {
                format!("{}/{}", prefix, screen.name)
            };
            if screen.screens.is_empty() {
                out.push(name);
            } else {
                collect(&screen.screens, &name, out);
            }
        }
    }

    let mut out = Vec::new();
    collect(&config.screens, "", &mut out);
    out
}

/// The deepest focused stack with more than one route, or any such stack.
fn dismissible_navigator(state: &NavigationState) -> Option<&NavigationState> {
    fn dismissible(n: &NavigationState) -> bool {
        n.kind.unwrap_or(NavigatorKind::Stack) == NavigatorKind::Stack && n.routes.len() > 1
    }

    fn anywhere(n: &NavigationState) -> Option<&NavigationState> {
        if dismissible(n) {
            return Some(n);
        }
        n.routes
            .iter()
            .filter_map(|r| r.state.as_deref())
            .find_map(anywhere)
    }

    let mut chain = Vec::new();
    let mut level = Some(state);
    while let Some(navigator) = level {
        chain.push(navigator);
        level = navigator.focused().and_then(|r| r.state.as_deref());
    }

    chain
        .into_iter()
        .rev()
        .find(|n| dismissible(n))
        .or_else(|| anywhere(state))
}
