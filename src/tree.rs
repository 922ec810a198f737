//! Barnes-Hut octree implementing the [`ForceTree`] capability.
//!
//! Nodes live contiguously in an arena and refer to their children by index;
//! the eight children of a node are always allocated together, so a node
//! only stores the index of its first child. Every node keeps the total mass
//! and the mass-weighted position sum of its subtree, updated on the way down
//! during insertion, so the tree is ready for evaluation after each insert.

use crate::traits::ForceTree;
use crate::units::GRAVITATIONAL_CONSTANT;




/// Subdivision stops at this depth; coincident bodies are merged into one.
const MAX_DEPTH: usize = 48;




// ============================================================================
#[derive(Clone, Debug)]
struct Node {
    center: [f64; 3],
    half_width: f64,
    mass: f64,
    moment: [f64; 3],
    first_child: Option<usize>,
    body: Option<([f64; 3], f64)>,
}


/**
 * A Barnes-Hut octree over a cubic region centered on the origin
 */
#[derive(Clone, Debug)]
pub struct Octree {
    nodes: Vec<Node>,
    opening_angle: f64,
    softening: f64,
}




// ============================================================================
impl Node {
    fn new(center: [f64; 3], half_width: f64) -> Self {
        Self {
            center,
            half_width,
            mass: 0.0,
            moment: [0.0; 3],
            first_child: None,
            body: None,
        }
    }

    fn accumulate(&mut self, position: [f64; 3], mass: f64) {
        self.mass += mass;
        for k in 0..3 {
            self.moment[k] += mass * position[k];
        }
    }

    fn center_of_mass(&self) -> [f64; 3] {
        [
            self.moment[0] / self.mass,
            self.moment[1] / self.mass,
            self.moment[2] / self.mass,
        ]
    }

    /**
     * Octant (0-7) of `position` relative to this node's center; bit k is set
     * when coordinate k lies above the center.
     */
    fn octant(&self, position: [f64; 3]) -> usize {
        (0..3).fold(0, |octant, k| octant | (((position[k] > self.center[k]) as usize) << k))
    }

    fn child_center(&self, octant: usize) -> [f64; 3] {
        let h = 0.5 * self.half_width;
        let mut center = self.center;
        for (k, c) in center.iter_mut().enumerate() {
            *c += if octant & (1 << k) != 0 { h } else { -h };
        }
        center
    }
}

fn softened_distance(a: [f64; 3], b: [f64; 3], softening: f64) -> f64 {
    let d2: f64 = (0..3).map(|k| (a[k] - b[k]).powi(2)).sum();
    (d2 + softening * softening).sqrt()
}




// ============================================================================
impl Octree {

    /**
     * Create an empty tree covering the cube [-half_width, half_width]^3.
     * Bodies outside the cube are still accepted; they are filed into the
     * edge octants. `opening_angle` is the Barnes-Hut node size over distance
     * threshold (zero gives exact direct summation) and `softening` is a
     * Plummer softening length.
     */
    pub fn new(half_width: f64, opening_angle: f64, softening: f64) -> Self {
        Self {
            nodes: vec![Node::new([0.0; 3], half_width)],
            opening_angle,
            softening,
        }
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn total_mass(&self) -> f64 {
        self.nodes[0].mass
    }

    /**
     * Allocate the eight children of the node at `index` and return the
     * arena index of the first one.
     */
    fn subdivide(&mut self, index: usize) -> usize {
        let first = self.nodes.len();

        for octant in 0..8 {
            let node = &self.nodes[index];
            let child = Node::new(node.child_center(octant), 0.5 * node.half_width);
            self.nodes.push(child);
        }
        self.nodes[index].first_child = Some(first);
        first
    }
}

impl ForceTree for Octree {
    fn insert(&mut self, position: [f64; 3], mass: f64) {
        if mass <= 0.0 {
            return
        }
        let mut index = 0;
        let mut depth = 0;

        loop {
            self.nodes[index].accumulate(position, mass);

            if let Some(first) = self.nodes[index].first_child {
                index = first + self.nodes[index].octant(position);
                depth += 1;
                continue
            }

            match self.nodes[index].body.take() {
                None => {
                    self.nodes[index].body = Some((position, mass));
                    return
                }
                Some(_) if depth >= MAX_DEPTH => {
                    let node = &mut self.nodes[index];
                    node.body = Some((node.center_of_mass(), node.mass));
                    return
                }
                Some((resident, resident_mass)) => {
                    let first = self.subdivide(index);
                    let child = first + self.nodes[index].octant(resident);
                    self.nodes[child].accumulate(resident, resident_mass);
                    self.nodes[child].body = Some((resident, resident_mass));

                    index = first + self.nodes[index].octant(position);
                    depth += 1;
                }
            }
        }
    }

    fn potential(&self, position: [f64; 3]) -> f64 {
        let mut sum = 0.0;
        let mut stack = vec![0];

        while let Some(index) = stack.pop() {
            let node = &self.nodes[index];

            if node.mass == 0.0 {
                continue
            }
            match node.first_child {
                None => {
                    if let Some((body, mass)) = node.body {
                        sum += mass / softened_distance(body, position, self.softening);
                    }
                }
                Some(first) => {
                    let com = node.center_of_mass();
                    let distance = softened_distance(com, position, 0.0);

                    if distance > 0.0 && 2.0 * node.half_width < self.opening_angle * distance {
                        sum += node.mass / softened_distance(com, position, self.softening);
                    } else {
                        stack.extend(first..first + 8);
                    }
                }
            }
        }
        -GRAVITATIONAL_CONSTANT * sum
    }
}
