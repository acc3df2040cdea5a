use std::collections::HashMap;
use std::f64::consts::PI;

use serde::{Deserialize, Serialize};

use crate::types::Position;

/// Tunables for the physics simulation and its freeze lifecycle.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ForceConfig {
    /// Many-body strength while every node is free (negative repels).
    pub charge_strength: f64,
    /// Many-body strength once any node is pinned.
    pub pinned_charge_strength: f64,
    pub charge_distance_max: f64,
    pub link_distance: f64,
    pub center: Position,
    pub center_strength: f64,
    pub collision_padding: f64,
    pub collision_strength: f64,
    pub alpha_min: f64,
    pub alpha_decay: f64,
    pub velocity_decay: f64,
    /// Energy restored when nodes join a running or frozen layout.
    pub reheat_alpha: f64,
    pub settle_duration_ms: u64,
    pub freeze_grace_ms: u64,
    /// Radial distance range for seeding a new node next to a neighbor.
    pub seed_distance_min: f64,
    pub seed_distance_max: f64,
    pub seed: Option<u64>,
}

impl Default for ForceConfig {
    fn default() -> Self {
        Self {
            charge_strength: -300.0,
            pinned_charge_strength: -60.0,
            charge_distance_max: 600.0,
            link_distance: 100.0,
            center: Position::default(),
            center_strength: 0.05,
            collision_padding: 6.0,
            collision_strength: 0.7,
            alpha_min: 0.001,
            alpha_decay: 0.0228,
            velocity_decay: 0.4,
            reheat_alpha: 0.5,
            settle_duration_ms: 4000,
            freeze_grace_ms: 1500,
            seed_distance_min: 30.0,
            seed_distance_max: 60.0,
            seed: None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Body {
    pub id: String,
    pub position: Position,
    pub velocity: Position,
    pub pin: Option<Position>,
    pub radius: f64,
}

/// d3-style force simulation over string-keyed bodies.
///
/// Each [`Simulation::tick`] applies link, many-body, centering and collision
/// forces scaled by the current `alpha`, then applies velocity decay and a
/// semi-implicit Euler step. Pinned bodies are
/// snapped back to their pin after every tick.
pub struct Simulation {
    bodies: Vec<Body>,
    index: HashMap<String, usize>,
    links: Vec<(usize, usize)>,
    link_strength: Vec<f64>,
    link_bias: Vec<f64>,
    alpha: f64,
    config: ForceConfig,
}

impl Simulation {
    /// Bodies without a position are placed on a phyllotaxis spiral around the
    /// configured center.
    pub fn new(
        bodies: Vec<(String, f64, Option<Position>)>,
        links: &[(String, String)],
        config: ForceConfig,
    ) -> Self {
        let initial_angle = PI * (3.0 - 5.0f64.sqrt());
        let bodies: Vec<Body> = bodies
            .into_iter()
            .enumerate()
            .map(|(i, (id, radius, position))| {
                let position = position.unwrap_or_else(|| {
                    let r = 10.0 * (0.5 + i as f64).sqrt();
                    let angle = i as f64 * initial_angle;
                    Position::new(config.center.x + r * angle.cos(), config.center.y + r * angle.sin())
                });
                Body {
                    id,
                    position,
                    velocity: Position::default(),
                    pin: None,
                    radius,
                }
            })
            .collect();
        let index: HashMap<String, usize> = bodies
            .iter()
            .enumerate()
            .map(|(i, b)| (b.id.clone(), i))
            .collect();

        let links: Vec<(usize, usize)> = links
            .iter()
            .filter_map(|(s, t)| Some((*index.get(s)?, *index.get(t)?)))
            .filter(|(s, t)| s != t)
            .collect();
        let mut degree = vec![0usize; bodies.len()];
        for &(s, t) in &links {
            degree[s] += 1;
            degree[t] += 1;
        }
        let link_strength = links
            .iter()
            .map(|&(s, t)| 1.0 / degree[s].min(degree[t]).max(1) as f64)
            .collect();
        let link_bias = links
            .iter()
            .map(|&(s, t)| degree[s] as f64 / (degree[s] + degree[t]).max(1) as f64)
            .collect();

        Self {
            bodies,
            index,
            links,
            link_strength,
            link_bias,
            alpha: 1.0,
            config,
        }
    }

    pub fn bodies(&self) -> &[Body] {
        &self.bodies
    }

    pub fn body(&self, id: &str) -> Option<&Body> {
        self.index.get(id).map(|&i| &self.bodies[i])
    }

    pub fn alpha(&self) -> f64 {
        self.alpha
    }

    pub fn is_cooled(&self) -> bool {
        self.alpha < self.config.alpha_min
    }

    pub fn set_alpha(&mut self, alpha: f64) {
        self.alpha = alpha;
    }

    pub fn reheat(&mut self, alpha: f64) {
        self.alpha = self.alpha.max(alpha);
    }

    pub fn any_pinned(&self) -> bool {
        self.bodies.iter().any(|b| b.pin.is_some())
    }

    pub fn pin(&mut self, id: &str, at: Position) -> bool {
        let Some(&i) = self.index.get(id) else {
            return false;
        };
        let body = &mut self.bodies[i];
        body.pin = Some(at);
        body.position = at;
        body.velocity = Position::default();
        true
    }

    pub fn unpin(&mut self, id: &str) {
        if let Some(&i) = self.index.get(id) {
            self.bodies[i].pin = None;
        }
    }

    pub fn unpin_all(&mut self) {
        for body in &mut self.bodies {
            body.pin = None;
        }
    }

    /// Advances one step. Returns false once the simulation has cooled.
    pub fn tick(&mut self) -> bool {
        if self.is_cooled() {
            return false;
        }
        self.alpha += (0.0 - self.alpha) * self.config.alpha_decay;

        let any_pinned = self.any_pinned();
        self.apply_links();
        self.apply_charge(if any_pinned {
            self.config.pinned_charge_strength
        } else {
            self.config.charge_strength
        });
        // centering would drag pinned coordinates around
        if !any_pinned {
            self.apply_centering();
        }
        self.apply_collision();

        let keep = 1.0 - self.config.velocity_decay;
        for body in &mut self.bodies {
            match body.pin {
                Some(pin) => {
                    body.position = pin;
                    body.velocity = Position::default();
                }
                None => {
                    body.velocity.x *= keep;
                    body.velocity.y *= keep;
                    body.position.x += body.velocity.x;
                    body.position.y += body.velocity.y;
                }
            }
        }
        true
    }

    fn apply_links(&mut self) {
        for (k, &(s, t)) in self.links.iter().enumerate() {
            let (source, target) = (&self.bodies[s], &self.bodies[t]);
            let mut dx = target.position.x + target.velocity.x - source.position.x - source.velocity.x;
            let mut dy = target.position.y + target.velocity.y - source.position.y - source.velocity.y;
            if dx == 0.0 && dy == 0.0 {
                dx = jiggle(k);
                dy = jiggle(k + 1);
            }
            let len = (dx * dx + dy * dy).sqrt();
            let l = (len - self.config.link_distance) / len * self.alpha * self.link_strength[k];
            dx *= l;
            dy *= l;
            let bias = self.link_bias[k];
            self.bodies[t].velocity.x -= dx * bias;
            self.bodies[t].velocity.y -= dy * bias;
            self.bodies[s].velocity.x += dx * (1.0 - bias);
            self.bodies[s].velocity.y += dy * (1.0 - bias);
        }
    }

    fn apply_charge(&mut self, strength: f64) {
        let n = self.bodies.len();
        let max2 = self.config.charge_distance_max * self.config.charge_distance_max;
        for i in 0..n {
            for j in (i + 1)..n {
                let mut dx = self.bodies[j].position.x - self.bodies[i].position.x;
                let mut dy = self.bodies[j].position.y - self.bodies[i].position.y;
                if dx == 0.0 && dy == 0.0 {
                    dx = jiggle(i + j);
                    dy = jiggle(i * 31 + j);
                }
                let l2 = dx * dx + dy * dy;
                if l2 >= max2 {
                    continue;
                }
                let w = strength * self.alpha / l2.max(1.0);
                self.bodies[i].velocity.x += dx * w;
                self.bodies[i].velocity.y += dy * w;
                self.bodies[j].velocity.x -= dx * w;
                self.bodies[j].velocity.y -= dy * w;
            }
        }
    }

    fn apply_centering(&mut self) {
        let k = self.config.center_strength * self.alpha;
        let center = self.config.center;
        for body in &mut self.bodies {
            body.velocity.x += (center.x - body.position.x) * k;
            body.velocity.y += (center.y - body.position.y) * k;
        }
    }

    fn apply_collision(&mut self) {
        let n = self.bodies.len();
        let padding = self.config.collision_padding;
        for i in 0..n {
            for j in (i + 1)..n {
                let (a, b) = (&self.bodies[i], &self.bodies[j]);
                let r = a.radius + b.radius + padding;
                let mut dx = a.position.x + a.velocity.x - b.position.x - b.velocity.x;
                let mut dy = a.position.y + a.velocity.y - b.position.y - b.velocity.y;
                let mut l2 = dx * dx + dy * dy;
                if l2 >= r * r {
                    continue;
                }
                if l2 == 0.0 {
                    dx = jiggle(i + j);
                    dy = jiggle(i * 17 + j);
                    l2 = dx * dx + dy * dy;
                }
                let len = l2.sqrt();
                let l = (r - len) / len * self.config.collision_strength;
                dx *= l;
                dy *= l;
                let (ra2, rb2) = (a.radius * a.radius, b.radius * b.radius);
                let share = if ra2 + rb2 > 0.0 { rb2 / (ra2 + rb2) } else { 0.5 };
                self.bodies[i].velocity.x += dx * share;
                self.bodies[i].velocity.y += dy * share;
                self.bodies[j].velocity.x -= dx * (1.0 - share);
                self.bodies[j].velocity.y -= dy * (1.0 - share);
            }
        }
    }
}

/// Tiny deterministic offset that separates coincident bodies.
fn jiggle(salt: usize) -> f64 {
    ((salt % 7) as f64 + 1.0) * 1e-6 * if salt % 2 == 0 { 1.0 } else { -1.0 }
}
