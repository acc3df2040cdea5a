use std::collections::{HashMap, HashSet};
use std::f64::consts::TAU;
use std::time::Duration;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::simulation::{ForceConfig, Simulation};
use crate::types::Position;

/// Lifecycle of the force layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FreezeState {
    /// Every node free, full repulsion and centering.
    Settling,
    /// Only newly introduced nodes move; everything else is pinned.
    Freezing,
    /// Every node pinned. Only a drag moves a node.
    Frozen,
}

/// A node as the force layout sees it.
#[derive(Debug, Clone, PartialEq)]
pub struct ForceBody {
    pub id: String,
    pub radius: f64,
}

impl ForceBody {
    pub fn new(id: impl Into<String>, radius: f64) -> Self {
        Self {
            id: id.into(),
            radius,
        }
    }
}

/// Drives a [`Simulation`] through settle, freeze and reorganize.
///
/// Positions are kept in a table keyed by node id rather than on the nodes
/// themselves. The table doubles as the "previous frame" cache that decides
/// which nodes are new when the graph changes.
pub struct ForceController {
    config: ForceConfig,
    simulation: Simulation,
    links: Vec<(String, String)>,
    state: FreezeState,
    elapsed: Duration,
    positions: HashMap<String, Position>,
    pinned: HashMap<String, Position>,
    new_nodes: HashSet<String>,
    dragging: Option<String>,
    ticks_since_change: u64,
    stopped: bool,
    rng: StdRng,
}

impl ForceController {
    pub fn new(config: ForceConfig) -> Self {
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        Self {
            simulation: Simulation::new(Vec::new(), &[], config.clone()),
            config,
            links: Vec::new(),
            state: FreezeState::Settling,
            elapsed: Duration::ZERO,
            positions: HashMap::new(),
            pinned: HashMap::new(),
            new_nodes: HashSet::new(),
            dragging: None,
            ticks_since_change: 0,
            stopped: false,
            rng,
        }
    }

    pub fn state(&self) -> FreezeState {
        self.state
    }

    pub fn config(&self) -> &ForceConfig {
        &self.config
    }

    /// Positions as of the last tick (or seeding, before the first tick).
    pub fn positions(&self) -> &HashMap<String, Position> {
        &self.positions
    }

    pub fn position(&self, id: &str) -> Option<Position> {
        self.positions.get(id).copied()
    }

    pub fn links(&self) -> &[(String, String)] {
        &self.links
    }

    pub fn is_pinned(&self, id: &str) -> bool {
        self.pinned.contains_key(id)
    }

    pub fn is_new(&self, id: &str) -> bool {
        self.new_nodes.contains(id)
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped
    }

    /// False until at least one tick ran after the last topology change;
    /// positions read before that are seeds, not layout output.
    pub fn has_ticked(&self) -> bool {
        self.ticks_since_change > 0
    }

    /// Replaces the topology.
    ///
    /// Nodes missing from the previous frame are seeded next to a positioned
    /// neighbor when one exists. Every other node keeps its position. While
    /// frozen (or freezing) pre-existing nodes stay pinned where they were and the controller enters
    /// [`FreezeState::Freezing`] so the new ones can settle.
    pub fn set_graph(&mut self, bodies: Vec<ForceBody>, links: Vec<(String, String)>) {
        let ids: HashSet<String> = bodies.iter().map(|b| b.id.clone()).collect();
        // only ids absent from the previous frame are new; nodes still
        // settling from an earlier arrival keep their simulated position
        let arrivals: Vec<String> = bodies
            .iter()
            .filter(|b| !self.positions.contains_key(&b.id))
            .map(|b| b.id.clone())
            .collect();

        let mut neighbors: HashMap<&str, Vec<&str>> = HashMap::new();
        for (s, t) in &links {
            neighbors.entry(s.as_str()).or_default().push(t.as_str());
            neighbors.entry(t.as_str()).or_default().push(s.as_str());
        }

        let mut seeded: HashMap<String, Position> = HashMap::new();
        for id in &arrivals {
            let anchor = neighbors.get(id.as_str()).and_then(|adjacent| {
                adjacent
                    .iter()
                    .find_map(|n| self.positions.get(*n).or_else(|| seeded.get(*n)).copied())
            });
            if let Some(anchor) = anchor {
                let position = self.seed_near(anchor);
                seeded.insert(id.clone(), position);
            }
        }

        let simulation_bodies = bodies
            .into_iter()
            .map(|b| {
                let position = self
                    .positions
                    .get(&b.id)
                    .or_else(|| seeded.get(&b.id))
                    .copied();
                (b.id, b.radius, position)
            })
            .collect();
        let alpha = self.simulation.alpha();
        self.simulation = Simulation::new(simulation_bodies, &links, self.config.clone());
        self.simulation.set_alpha(alpha);
        self.links = links;

        self.pinned.retain(|id, _| ids.contains(id));
        self.new_nodes.retain(|id| ids.contains(id));
        if self.dragging.as_deref().is_some_and(|d| !ids.contains(d)) {
            self.dragging = None;
        }

        match self.state {
            FreezeState::Settling => {}
            FreezeState::Freezing | FreezeState::Frozen if !arrivals.is_empty() => {
                for body in self.simulation.bodies() {
                    if !arrivals.contains(&body.id) && !self.new_nodes.contains(&body.id) {
                        self.pinned.entry(body.id.clone()).or_insert(body.position);
                    }
                }
                self.new_nodes.extend(arrivals.iter().cloned());
                self.enter(FreezeState::Freezing);
            }
            FreezeState::Freezing | FreezeState::Frozen => {}
        }

        let pins: Vec<(String, Position)> = self.pinned.iter().map(|(id, p)| (id.clone(), *p)).collect();
        for (id, at) in pins {
            self.simulation.pin(&id, at);
        }
        if let Some(id) = self.dragging.clone() {
            if let Some(at) = self.simulation.body(&id).map(|b| b.position) {
                self.simulation.pin(&id, at);
            }
        }
        if !arrivals.is_empty() {
            self.simulation.reheat(self.config.reheat_alpha);
        }

        self.sync_positions();
        self.ticks_since_change = 0;
        debug!(
            nodes = self.positions.len(),
            arrivals = arrivals.len(),
            state = ?self.state,
            "force layout topology updated"
        );
    }

    /// Advances logical time by `dt` and runs one simulation step.
    ///
    /// Returns true when positions may have changed.
    pub fn tick(&mut self, dt: Duration) -> bool {
        if self.stopped {
            return false;
        }
        self.elapsed += dt;

        let moved = match self.state {
            FreezeState::Settling => {
                let moved = self.simulation.tick();
                if self.elapsed >= Duration::from_millis(self.config.settle_duration_ms) {
                    self.freeze_all();
                }
                moved
            }
            FreezeState::Freezing => {
                let moved = self.simulation.tick();
                if self.elapsed >= Duration::from_millis(self.config.freeze_grace_ms) {
                    self.freeze_all();
                }
                moved
            }
            FreezeState::Frozen => false,
        };

        self.sync_positions();
        self.ticks_since_change += 1;
        moved
    }

    /// Unpins everything and re-energizes the layout.
    pub fn reorganize(&mut self) {
        self.pinned.clear();
        self.new_nodes.clear();
        self.dragging = None;
        self.simulation.unpin_all();
        self.simulation.reheat(1.0);
        self.stopped = false;
        self.enter(FreezeState::Settling);
        debug!(nodes = self.positions.len(), "force layout reorganized");
    }

    /// Halts ticking. Safe to call repeatedly.
    pub fn stop(&mut self) {
        if !self.stopped {
            self.stopped = true;
            trace!("force layout stopped");
        }
    }

    pub fn restart(&mut self) {
        self.stopped = false;
    }

    /// Fixes `id` under the pointer. Returns false for unknown nodes.
    pub fn drag_start(&mut self, id: &str) -> bool {
        let Some(at) = self.simulation.body(id).map(|b| b.position) else {
            return false;
        };
        self.dragging = Some(id.to_string());
        self.simulation.pin(id, at);
        if self.state == FreezeState::Settling {
            self.simulation.reheat(self.config.reheat_alpha * 0.6);
        }
        true
    }

    pub fn drag_to(&mut self, id: &str, at: Position) {
        if self.dragging.as_deref() != Some(id) {
            return;
        }
        self.simulation.pin(id, at);
        self.positions.insert(id.to_string(), at);
    }

    /// Releases a drag. While settling the node is freed again; otherwise it
    /// stays pinned at the drop position.
    pub fn drag_end(&mut self, id: &str) {
        if self.dragging.as_deref() != Some(id) {
            return;
        }
        self.dragging = None;
        match self.state {
            FreezeState::Settling => self.simulation.unpin(id),
            FreezeState::Freezing | FreezeState::Frozen => {
                if let Some(at) = self.simulation.body(id).map(|b| b.position) {
                    self.new_nodes.remove(id);
                    self.pinned.insert(id.to_string(), at);
                    self.simulation.pin(id, at);
                    self.positions.insert(id.to_string(), at);
                }
            }
        }
    }

    fn freeze_all(&mut self) {
        let pins: Vec<(String, Position)> = self
            .simulation
            .bodies()
            .iter()
            .map(|b| (b.id.clone(), b.position))
            .collect();
        for (id, at) in pins {
            self.simulation.pin(&id, at);
            self.pinned.insert(id, at);
        }
        self.new_nodes.clear();
        self.enter(FreezeState::Frozen);
    }

    fn enter(&mut self, state: FreezeState) {
        trace!(from = ?self.state, to = ?state, "force layout state change");
        self.state = state;
        self.elapsed = Duration::ZERO;
    }

    fn seed_near(&mut self, anchor: Position) -> Position {
        let lo = self.config.seed_distance_min.min(self.config.seed_distance_max).max(0.0);
        let hi = self.config.seed_distance_min.max(self.config.seed_distance_max).max(lo);
        let angle = self.rng.random_range(0.0..TAU);
        let distance = self.rng.random_range(lo..=hi);
        Position::new(anchor.x + distance * angle.cos(), anchor.y + distance * angle.sin())
    }

    fn sync_positions(&mut self) {
        self.positions = self
            .simulation
            .bodies()
            .iter()
            .map(|b| (b.id.clone(), b.position))
            .collect();
    }
}
