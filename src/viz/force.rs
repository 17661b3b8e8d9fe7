//! Velocity-Verlet force simulation for the flow chart.
//!
//! Forces: links pulled toward a rest distance, pairwise many-body repulsion
//! and a centering correction. The cooling schedule follows the usual
//! `alpha` model: each tick moves `alpha` toward `alpha_target` by
//! `alpha_decay`, and the simulation is at rest once `alpha < alpha_min`.
//! Pairwise charge is computed exactly; flow graphs stay small.

use std::f64::consts::PI;

const INITIAL_RADIUS: f64 = 10.0;
const DISTANCE_MIN2: f64 = 1.0;

/// Deterministic generator used to break exact overlaps.
#[derive(Debug, Clone)]
struct Lcg(u64);

impl Lcg {
    fn next(&mut self) -> f64 {
        self.0 = (1_664_525u64.wrapping_mul(self.0).wrapping_add(1_013_904_223)) % 4_294_967_296;
        self.0 as f64 / 4_294_967_296.0
    }

    fn jiggle(&mut self) -> f64 {
        (self.next() - 0.5) * 1e-6
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SimNode {
    pub id: String,
    pub x: f64,
    pub y: f64,
    pub vx: f64,
    pub vy: f64,
    /// Pinned position; a pinned node ignores forces.
    pub fx: Option<f64>,
    pub fy: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SimLink {
    pub source: usize,
    pub target: usize,
    strength: f64,
    bias: f64,
}

#[derive(Debug, Clone)]
pub struct Simulation {
    nodes: Vec<SimNode>,
    links: Vec<SimLink>,
    alpha: f64,
    alpha_min: f64,
    alpha_decay: f64,
    alpha_target: f64,
    velocity_decay: f64,
    link_distance: f64,
    charge: f64,
    center: (f64, f64),
    rng: Lcg,
}

impl Simulation {
    /// Nodes start on a phyllotaxis spiral around `center`; `links` index into `ids`.
    pub fn new(ids: Vec<String>, links: &[(usize, usize)], center: (f64, f64)) -> Self {
        let golden = PI * (3.0 - 5f64.sqrt());
        let nodes: Vec<SimNode> = ids
            .into_iter()
            .enumerate()
            .map(|(i, id)| {
                let r = INITIAL_RADIUS * (0.5 + i as f64).sqrt();
                let a = i as f64 * golden;
                SimNode {
                    id,
                    x: center.0 + r * a.cos(),
                    y: center.1 + r * a.sin(),
                    vx: 0.0,
                    vy: 0.0,
                    fx: None,
                    fy: None,
                }
            })
            .collect();
        let mut degree = vec![0usize; nodes.len()];
        let valid: Vec<(usize, usize)> = links
            .iter()
            .copied()
            .filter(|(s, t)| *s < nodes.len() && *t < nodes.len())
            .collect();
        for (s, t) in &valid {
            degree[*s] += 1;
            degree[*t] += 1;
        }
        let links = valid
            .into_iter()
            .map(|(source, target)| {
                let (ds, dt) = (degree[source] as f64, degree[target] as f64);
                SimLink {
                    source,
                    target,
                    strength: 1.0 / ds.min(dt).max(1.0),
                    bias: ds / (ds + dt),
                }
            })
            .collect();
        Self {
            nodes,
            links,
            alpha: 1.0,
            alpha_min: 0.001,
            alpha_decay: 1.0 - 0.001f64.powf(1.0 / 300.0),
            alpha_target: 0.0,
            velocity_decay: 0.4,
            link_distance: 100.0,
            charge: -300.0,
            center,
            rng: Lcg(1),
        }
    }

    pub fn with_link_distance(mut self, distance: f64) -> Self {
        self.link_distance = distance;
        self
    }

    pub fn with_charge(mut self, strength: f64) -> Self {
        self.charge = strength;
        self
    }

    pub fn nodes(&self) -> &[SimNode] {
        &self.nodes
    }

    pub fn node(&self, index: usize) -> Option<&SimNode> {
        self.nodes.get(index)
    }

    pub fn links(&self) -> &[SimLink] {
        &self.links
    }

    pub fn index_of(&self, id: &str) -> Option<usize> {
        self.nodes.iter().position(|n| n.id == id)
    }

    pub fn alpha(&self) -> f64 {
        self.alpha
    }

    pub fn is_settled(&self) -> bool {
        self.alpha < self.alpha_min && self.alpha_target < self.alpha_min
    }

    /// Reheat toward `target` (drag keeps the simulation warm at 0.3).
    pub fn set_alpha_target(&mut self, target: f64) {
        self.alpha_target = target;
        if self.alpha < target {
            self.alpha = target;
        }
    }

    pub fn restart(&mut self, alpha: f64) {
        self.alpha = alpha;
    }

    pub fn set_center(&mut self, center: (f64, f64)) {
        self.center = center;
    }

    pub fn pin(&mut self, index: usize, x: f64, y: f64) {
        if let Some(n) = self.nodes.get_mut(index) {
            n.fx = Some(x);
            n.fy = Some(y);
        }
    }

    pub fn release(&mut self, index: usize) {
        if let Some(n) = self.nodes.get_mut(index) {
            n.fx = None;
            n.fy = None;
        }
    }

    /// One integration step.
    pub fn tick(&mut self) {
        self.alpha += (self.alpha_target - self.alpha) * self.alpha_decay;
        self.apply_links();
        self.apply_charge();
        self.apply_center();
        let keep = 1.0 - self.velocity_decay;
        for n in &mut self.nodes {
            match n.fx {
                Some(fx) => {
                    n.x = fx;
                    n.vx = 0.0;
                }
                None => {
                    n.vx *= keep;
                    n.x += n.vx;
                }
            }
            match n.fy {
                Some(fy) => {
                    n.y = fy;
                    n.vy = 0.0;
                }
                None => {
                    n.vy *= keep;
                    n.y += n.vy;
                }
            }
        }
    }

    /// Tick until cool (bounded by `max_ticks`). Returns the number of ticks run.
    pub fn settle(&mut self, max_ticks: usize) -> usize {
        let mut n = 0;
        while !self.is_settled() && n < max_ticks {
            self.tick();
            n += 1;
        }
        n
    }

    fn apply_links(&mut self) {
        for i in 0..self.links.len() {
            let link = self.links[i];
            let (s, t) = (&self.nodes[link.source], &self.nodes[link.target]);
            let mut x = t.x + t.vx - s.x - s.vx;
            let mut y = t.y + t.vy - s.y - s.vy;
            if x == 0.0 {
                x = self.rng.jiggle();
            }
            if y == 0.0 {
                y = self.rng.jiggle();
            }
            let l = (x * x + y * y).sqrt();
            let k = (l - self.link_distance) / l * self.alpha * link.strength;
            let (x, y) = (x * k, y * k);
            let t = &mut self.nodes[link.target];
            t.vx -= x * link.bias;
            t.vy -= y * link.bias;
            let s = &mut self.nodes[link.source];
            s.vx += x * (1.0 - link.bias);
            s.vy += y * (1.0 - link.bias);
        }
    }

    fn apply_charge(&mut self) {
        let n = self.nodes.len();
        let mut dv = vec![(0.0, 0.0); n];
        for i in 0..n {
            for j in 0..n {
                if i == j {
                    continue;
                }
                let mut x = self.nodes[j].x - self.nodes[i].x;
                let mut y = self.nodes[j].y - self.nodes[i].y;
                if x == 0.0 {
                    x = self.rng.jiggle();
                }
                if y == 0.0 {
                    y = self.rng.jiggle();
                }
                let mut l = x * x + y * y;
                if l < DISTANCE_MIN2 {
                    l = (DISTANCE_MIN2 * l).sqrt();
                }
                let w = self.charge * self.alpha / l;
                dv[i].0 += x * w;
                dv[i].1 += y * w;
            }
        }
        for (node, (dx, dy)) in self.nodes.iter_mut().zip(dv) {
            node.vx += dx;
            node.vy += dy;
        }
    }

    fn apply_center(&mut self) {
        if self.nodes.is_empty() {
            return;
        }
        let n = self.nodes.len() as f64;
        let sx = self.nodes.iter().map(|p| p.x).sum::<f64>() / n - self.center.0;
        let sy = self.nodes.iter().map(|p| p.y).sum::<f64>() / n - self.center.1;
        for p in &mut self.nodes {
            p.x -= sx;
            p.y -= sy;
        }
    }

    /// `(x0, y0, x1, y1)` around all node centers.
    pub fn bounds(&self) -> Option<(f64, f64, f64, f64)> {
        let first = self.nodes.first()?;
        Some(self.nodes.iter().fold(
            (first.x, first.y, first.x, first.y),
            |(x0, y0, x1, y1), n| (x0.min(n.x), y0.min(n.y), x1.max(n.x), y1.max(n.y)),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(n: usize) -> Vec<String> {
        (0..n).map(|i| format!("n{i}")).collect()
    }

    #[test]
    fn settles_in_about_three_hundred_ticks() {
        let mut sim = Simulation::new(ids(3), &[(0, 1), (1, 2)], (200.0, 150.0));
        let ticks = sim.settle(1000);
        assert!((295..=305).contains(&ticks), "{ticks}");
        assert!(sim.is_settled());
    }

    #[test]
    fn linked_nodes_approach_rest_distance() {
        let mut sim = Simulation::new(ids(2), &[(0, 1)], (0.0, 0.0));
        sim.settle(1000);
        let (a, b) = (&sim.nodes()[0], &sim.nodes()[1]);
        let d = ((a.x - b.x).powi(2) + (a.y - b.y).powi(2)).sqrt();
        // repulsion pushes the pair a little past the link distance
        assert!(d > 80.0 && d < 200.0, "{d}");
    }

    #[test]
    fn centroid_stays_on_center() {
        let mut sim = Simulation::new(ids(5), &[(0, 1), (2, 3)], (300.0, 200.0));
        for _ in 0..50 {
            sim.tick();
        }
        let n = sim.nodes().len() as f64;
        let cx = sim.nodes().iter().map(|p| p.x).sum::<f64>() / n;
        // the center correction runs before velocities are applied
        assert!((cx - 300.0).abs() < 50.0);
    }

    #[test]
    fn pinned_node_does_not_move() {
        let mut sim = Simulation::new(ids(3), &[(0, 1), (1, 2)], (0.0, 0.0));
        sim.pin(1, 42.0, -7.0);
        for _ in 0..20 {
            sim.tick();
        }
        let n = &sim.nodes()[1];
        assert_eq!((n.x, n.y), (42.0, -7.0));
        sim.release(1);
        assert!(sim.nodes()[1].fx.is_none());
    }

    #[test]
    fn out_of_range_links_are_ignored() {
        let sim = Simulation::new(ids(2), &[(0, 5)], (0.0, 0.0));
        assert!(sim.links().is_empty());
    }
}
