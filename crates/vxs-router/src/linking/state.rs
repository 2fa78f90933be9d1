//! Navigation state: the nested navigator tree describing where the UI is.

use serde::{Deserialize, Serialize};

use crate::params::Params;

/// Navigator flavor owning one level of state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NavigatorKind {
    Stack,
    Tab,
}

/// One level of navigator state
///
/// `index` points at the focused route. Nested state may hang off any route;
/// only the focused chain contributes to path derivation.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct NavigationState {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<NavigatorKind>,
    pub index: usize,
    pub routes: Vec<StateRoute>,
}

/// A route entry inside a navigator
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct StateRoute {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
    pub name: String,
    #[serde(default)]
    pub params: Params,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<Box<NavigationState>>,
}

impl StateRoute {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn with_params(mut self, params: Params) -> Self {
        self.params = params;
        self
    }

    pub fn with_state(mut self, state: NavigationState) -> Self {
        self.state = Some(Box::new(state));
        self
    }
}

impl NavigationState {
    /// State with `routes`, focused on `index` (clamped to the last route).
    pub fn from_routes(routes: Vec<StateRoute>, index: usize) -> Self {
        let index = index.min(routes.len().saturating_sub(1));
        Self {
            routes,
            index,
            ..Default::default()
        }
    }

    /// The focused route of this level.
    pub fn focused(&self) -> Option<&StateRoute> {
        self.routes.get(self.index).or_else(|| self.routes.last())
    }

    pub fn focused_mut(&mut self) -> Option<&mut StateRoute> {
        let index = self.index.min(self.routes.len().saturating_sub(1));
        self.routes.get_mut(index)
    }

    /// Focused routes from this level down to the deepest one.
    pub fn focused_chain(&self) -> Vec<&StateRoute> {
        let mut chain = Vec::new();
        let mut current = Some(self);
        while let Some(state) = current {
            let Some(route) = state.focused() else {
                break;
            };
            chain.push(route);
            current = route.state.as_deref();
        }
        chain
    }

    /// The deepest focused route.
    pub fn focused_leaf(&self) -> Option<&StateRoute> {
        self.focused_chain().pop()
    }

    /// Params of the deepest focused route.
    pub fn active_params(&self) -> Params {
        self.focused_leaf().map(|r| r.params.clone()).unwrap_or_default()
    }

    /// Route names along the focused chain.
    pub fn focused_names(&self) -> Vec<&str> {
        self.focused_chain().iter().map(|r| r.name.as_str()).collect()
    }

    /// Copy with every route and navigator key cleared, for structural comparison.
    pub fn without_keys(&self) -> Self {
        Self {
            key: None,
            kind: self.kind,
            index: self.index,
            routes: self
                .routes
                .iter()
                .map(|r| StateRoute {
                    key: None,
                    name: r.name.clone(),
                    params: r.params.clone(),
                    state: r.state.as_ref().map(|s| Box::new(s.without_keys())),
                })
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::params;

    #[test]
    fn test_focused_chain_ignores_dangling_state() {
        let state = NavigationState::from_routes(
            vec![
                StateRoute::new("feed").with_state(NavigationState::from_routes(vec![StateRoute::new("old")], 0)),
                StateRoute::new("profile")
                    .with_state(NavigationState::from_routes(vec![StateRoute::new("[id]")], 0)),
            ],
            1,
        );
        assert_eq!(state.focused_names(), vec!["profile", "[id]"]);
    }

    #[test]
    fn test_index_is_clamped() {
        let state = NavigationState::from_routes(vec![StateRoute::new("a")], 5);
        assert_eq!(state.index, 0);
        assert_eq!(state.focused().map(|r| r.name.as_str()), Some("a"));
    }

    #[test]
    fn test_serde_shape() {
        let state = NavigationState::from_routes(
            vec![StateRoute::new("users/[id]").with_params(params([("id", "5")]))],
            0,
        );
        let json = serde_json::to_value(&state).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"index": 0, "routes": [{"name": "users/[id]", "params": {"id": "5"}}]})
        );
    }
}
