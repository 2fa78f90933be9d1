// File: vxs-navigation/src/container.rs
// Purpose: Contract between the router store and the UI navigation container

use std::sync::Arc;

use vxs_router::linking::{NavigationState, NavigatorKind, StateRoute};

use crate::action::NavigationAction;
use crate::error::NavigationError;

/// Callback invoked with the new root state after every change
pub type StateListener = Arc<dyn Fn(&Arc<NavigationState>) + Send + Sync>;

/// Handle returned by [`NavigationContainer::add_state_listener`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(pub u64);

/// How a dispatch completed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// The state change is already visible through `get_root_state`
    Applied,
    /// Accepted but applied later; completion has to be observed
    Pending,
}

/// The UI navigation container as seen by the router store
///
/// Implementations own the navigation state. The store never holds a
/// mutable reference to it: every change goes through `dispatch`.
pub trait NavigationContainer: Send + Sync {
    /// Whether the container has mounted and accepts actions.
    fn is_ready(&self) -> bool;

    fn dispatch(&self, action: NavigationAction) -> Result<DispatchOutcome, NavigationError>;

    fn get_root_state(&self) -> Option<Arc<NavigationState>>;

    /// The deepest focused route.
    fn get_current_route(&self) -> Option<StateRoute> {
        self.get_root_state()
            .and_then(|state| state.focused_leaf().cloned())
    }

    fn add_state_listener(&self, listener: StateListener) -> ListenerId;

    fn remove_state_listener(&self, id: ListenerId);

    /// Whether a back action would be handled by some navigator on the
    /// focused chain.
    fn can_go_back(&self) -> bool {
        let Some(state) = self.get_root_state() else {
            return false;
        };
        let mut level = Some(state.as_ref());
        while let Some(navigator) = level {
            let handled = match navigator.kind.unwrap_or(NavigatorKind::Stack) {
                NavigatorKind::Stack => navigator.routes.len() > 1,
                NavigatorKind::Tab => navigator.index > 0,
            };
            if handled {
                return true;
            }
            level = navigator.focused().and_then(|route| route.state.as_deref());
        }
        false
    }
}
