// File: vxs-loader/src/strategy.rs
// Purpose: Link event heuristics deciding when to preload

use parking_lot::Mutex;
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::debug;

use crate::preload::{PreloadStrategy, Preloader};

/// Axis-aligned bounds of a link on screen
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self { x, y, width, height }
    }

    pub fn contains(&self, x: f64, y: f64) -> bool {
        x >= self.x && x <= self.x + self.width && y >= self.y && y <= self.y + self.height
    }
}

/// What the UI reports about links and the pointer
#[derive(Debug, Clone, PartialEq)]
pub enum LinkEvent {
    /// A link was laid out at `rect`
    Mounted { href: String, rect: Rect },
    Unmounted { href: String },
    PointerEnter { href: String },
    PointerMove { x: f64, y: f64 },
    /// A link entered or left the viewport
    Visibility { href: String, visible: bool },
}

/// Maps link events to hrefs worth preloading
pub trait PreloadTrigger: Send {
    fn strategy(&self) -> PreloadStrategy;

    fn handle(&mut self, event: &LinkEvent) -> Vec<String>;
}

/// Preload when the pointer enters a link
#[derive(Debug, Default)]
pub struct HoverTrigger;

impl PreloadTrigger for HoverTrigger {
    fn strategy(&self) -> PreloadStrategy {
        PreloadStrategy::Hover
    }

    fn handle(&mut self, event: &LinkEvent) -> Vec<String> {
        match event {
            LinkEvent::PointerEnter { href } => vec![href.clone()],
            _ => Vec::new(),
        }
    }
}

/// Preload links the first time they become visible
#[derive(Debug, Default)]
pub struct ViewportTrigger {
    seen: HashSet<String>,
}

impl PreloadTrigger for ViewportTrigger {
    fn strategy(&self) -> PreloadStrategy {
        PreloadStrategy::Viewport
    }

    fn handle(&mut self, event: &LinkEvent) -> Vec<String> {
        match event {
            LinkEvent::Visibility { href, visible: true } if self.seen.insert(href.clone()) => vec![href.clone()],
            LinkEvent::Unmounted { href } => {
                self.seen.remove(href);
                Vec::new()
            }
            _ => Vec::new(),
        }
    }
}

const TRAJECTORY_SAMPLES: usize = 5;
const MIN_TRAVEL: f64 = 4.0;
const PROBE_STEPS: usize = 8;

/// Predicts the link the pointer is heading for
///
/// The direction of the last few pointer samples is extended by
/// `look_ahead` pixels; a link whose bounds the projected path crosses is
/// preloaded. Entering a link preloads it too.
#[derive(Debug)]
pub struct IntentTrigger {
    look_ahead: f64,
    links: HashMap<String, Rect>,
    samples: VecDeque<(f64, f64)>,
    triggered: HashSet<String>,
}

impl Default for IntentTrigger {
    fn default() -> Self {
        Self::new(120.0)
    }
}

impl IntentTrigger {
    pub fn new(look_ahead: f64) -> Self {
        Self {
            look_ahead,
            links: HashMap::new(),
            samples: VecDeque::with_capacity(TRAJECTORY_SAMPLES),
            triggered: HashSet::new(),
        }
    }

    fn fire(&mut self, href: &str) -> Option<String> {
        self.triggered.insert(href.to_string()).then(|| href.to_string())
    }

    fn predict(&self) -> Vec<String> {
        let (Some(&(x0, y0)), Some(&(x1, y1))) = (self.samples.front(), self.samples.back()) else {
            return Vec::new();
        };
        let (dx, dy) = (x1 - x0, y1 - y0);
        let travel = (dx * dx + dy * dy).sqrt();
        if travel < MIN_TRAVEL {
            return Vec::new();
        }

        let (ux, uy) = (dx / travel, dy / travel);
        let mut hits: Vec<(usize, String)> = self
            .links
            .iter()
            .filter_map(|(href, rect)| {
                (1..=PROBE_STEPS)
                    .find(|step| {
                        let distance = self.look_ahead * *step as f64 / PROBE_STEPS as f64;
                        rect.contains(x1 + ux * distance, y1 + uy * distance)
                    })
                    .map(|step| (step, href.clone()))
            })
            .collect();
        hits.sort();
        hits.into_iter().map(|(_, href)| href).collect()
    }
}

impl PreloadTrigger for IntentTrigger {
    fn strategy(&self) -> PreloadStrategy {
        PreloadStrategy::Intent
    }

    fn handle(&mut self, event: &LinkEvent) -> Vec<String> {
        match event {
            LinkEvent::Mounted { href, rect } => {
                self.links.insert(href.clone(), *rect);
                Vec::new()
            }
            LinkEvent::Unmounted { href } => {
                self.links.remove(href);
                self.triggered.remove(href);
                Vec::new()
            }
            LinkEvent::PointerEnter { href } => self.fire(href).into_iter().collect(),
            LinkEvent::PointerMove { x, y } => {
                if self.samples.len() == TRAJECTORY_SAMPLES {
                    self.samples.pop_front();
                }
                self.samples.push_back((*x, *y));
                self.predict()
                    .into_iter()
                    .take(1)
                    .filter_map(|href| self.fire(&href))
                    .collect()
            }
            LinkEvent::Visibility { .. } => Vec::new(),
        }
    }
}

pub fn trigger_for(strategy: PreloadStrategy) -> Box<dyn PreloadTrigger> {
    match strategy {
        PreloadStrategy::Hover => Box::new(HoverTrigger),
        PreloadStrategy::Viewport => Box::new(ViewportTrigger::default()),
        PreloadStrategy::Intent => Box::new(IntentTrigger::default()),
    }
}

/// Feeds link events through the configured strategy into the preloader
pub struct PreloadController {
    trigger: Mutex<Box<dyn PreloadTrigger>>,
    preloader: Arc<Preloader>,
}

impl PreloadController {
    pub fn new(preloader: Arc<Preloader>) -> Self {
        let strategy = preloader.options().strategy;
        debug!(strategy = ?strategy, "Preload strategy selected");
        Self {
            trigger: Mutex::new(trigger_for(strategy)),
            preloader,
        }
    }

    pub fn strategy(&self) -> PreloadStrategy {
        self.trigger.lock().strategy()
    }

    /// Starts preloads for whatever `event` predicts.
    pub fn handle(&self, event: &LinkEvent) -> Vec<JoinHandle<()>> {
        let hrefs = self.trigger.lock().handle(event);
        hrefs
            .iter()
            .filter_map(|href| self.preloader.preload(href))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn mounted(href: &str, rect: Rect) -> LinkEvent {
        LinkEvent::Mounted {
            href: href.into(),
            rect,
        }
    }

    #[test]
    fn test_hover_fires_on_enter_only() {
        let mut trigger = HoverTrigger;
        assert_eq!(trigger.handle(&LinkEvent::PointerMove { x: 1.0, y: 1.0 }), Vec::<String>::new());
        assert_eq!(
            trigger.handle(&LinkEvent::PointerEnter { href: "/a".into() }),
            vec!["/a".to_string()]
        );
    }

    #[test]
    fn test_viewport_fires_once_per_link() {
        let mut trigger = ViewportTrigger::default();
        let visible = LinkEvent::Visibility {
            href: "/a".into(),
            visible: true,
        };
        assert_eq!(trigger.handle(&visible), vec!["/a".to_string()]);
        assert!(trigger.handle(&visible).is_empty());
        assert!(trigger
            .handle(&LinkEvent::Visibility {
                href: "/b".into(),
                visible: false
            })
            .is_empty());
    }

    #[test]
    fn test_intent_predicts_link_ahead_of_pointer() {
        let mut trigger = IntentTrigger::new(100.0);
        trigger.handle(&mounted("/right", Rect::new(150.0, 0.0, 40.0, 20.0)));
        trigger.handle(&mounted("/below", Rect::new(0.0, 150.0, 40.0, 20.0)));

        assert!(trigger.handle(&LinkEvent::PointerMove { x: 50.0, y: 10.0 }).is_empty());
        let predicted = trigger.handle(&LinkEvent::PointerMove { x: 70.0, y: 10.0 });
        assert_eq!(predicted, vec!["/right".to_string()]);

        // already triggered; hover on it does not fire again
        assert!(trigger.handle(&LinkEvent::PointerEnter { href: "/right".into() }).is_empty());
        assert_eq!(
            trigger.handle(&LinkEvent::PointerEnter { href: "/below".into() }),
            vec!["/below".to_string()]
        );
    }

    #[test]
    fn test_intent_ignores_jitter() {
        let mut trigger = IntentTrigger::new(100.0);
        trigger.handle(&mounted("/right", Rect::new(60.0, 0.0, 40.0, 20.0)));
        trigger.handle(&LinkEvent::PointerMove { x: 50.0, y: 10.0 });
        assert!(trigger.handle(&LinkEvent::PointerMove { x: 51.0, y: 10.0 }).is_empty());
    }
}
