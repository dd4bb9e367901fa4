//! Lower hull of binary systems (Andrew's monotone chain)
//!
//! Points are `[x, energy]` with `x` the fraction of the second element.
//! Consecutive hull vertices are joined by tie lines.

use serde::{Deserialize, Serialize};

/// Tolerance on composition coordinates
const X_TOLERANCE: f64 = 1e-9;

/// A binary hull facet: the segment between two adjacent stable compositions
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TieLine {
    /// Left endpoint `[x, energy]`
    pub start: [f64; 2],
    /// Right endpoint `[x, energy]`
    pub end: [f64; 2],
    /// `d energy / d x`
    pub slope: f64,
}

impl TieLine {
    fn new(start: [f64; 2], end: [f64; 2]) -> Self {
        Self {
            start,
            end,
            slope: (end[1] - start[1]) / (end[0] - start[0]),
        }
    }

    /// Interpolation weights `(1 - t, t)` of `x`, if it lies on the segment
    pub fn weights(&self, x: f64) -> Option<[f64; 2]> {
        if x < self.start[0] - X_TOLERANCE || x > self.end[0] + X_TOLERANCE {
            return None;
        }
        let t = ((x - self.start[0]) / (self.end[0] - self.start[0])).clamp(0.0, 1.0);
        Some([1.0 - t, t])
    }

    /// Energy of the segment at `x`
    pub fn energy_at(&self, x: f64) -> Option<f64> {
        self.weights(x)
            .map(|[a, b]| a * self.start[1] + b * self.end[1])
    }
}

/// Lower envelope of a binary system
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BinaryHull {
    vertices: Vec<[f64; 2]>,
    sources: Vec<usize>,
    tie_lines: Vec<TieLine>,
}

impl BinaryHull {
    /// Build the lower hull of `[x, energy]` points
    ///
    /// Only the lowest point of each composition is considered. Collinear
    /// middle points are dropped from the vertex list. Fewer than two
    /// distinct compositions give an empty hull.
    pub fn build(points: &[[f64; 2]]) -> Self {
        let mut order: Vec<usize> = (0..points.len())
            .filter(|&i| points[i].iter().all(|v| v.is_finite()))
            .collect();
        order.sort_by(|&a, &b| {
            points[a][0]
                .total_cmp(&points[b][0])
                .then(points[a][1].total_cmp(&points[b][1]))
                .then(a.cmp(&b))
        });

        // lowest energy per composition
        let mut lowest: Vec<usize> = Vec::with_capacity(order.len());
        for idx in order {
            let same_x = lowest
                .last()
                .is_some_and(|&prev| (points[idx][0] - points[prev][0]).abs() <= X_TOLERANCE);
            if !same_x {
                lowest.push(idx);
            }
        }

        if lowest.len() < 2 {
            return Self::default();
        }

        let mut chain: Vec<usize> = Vec::with_capacity(lowest.len());
        for idx in lowest {
            while chain.len() >= 2 {
                let o = points[chain[chain.len() - 2]];
                let a = points[chain[chain.len() - 1]];
                let p = points[idx];
                let cross = (a[0] - o[0]) * (p[1] - o[1]) - (a[1] - o[1]) * (p[0] - o[0]);
                if cross <= 1e-12 {
                    chain.pop();
                } else {
                    break;
                }
            }
            chain.push(idx);
        }

        let vertices: Vec<[f64; 2]> = chain.iter().map(|&i| points[i]).collect();
        let tie_lines = vertices
            .windows(2)
            .map(|w| TieLine::new(w[0], w[1]))
            .collect();

        Self {
            vertices,
            sources: chain,
            tie_lines,
        }
    }

    /// Rewrite source indices, e.g. after filtering the input
    pub(crate) fn remap_sources(&mut self, map: impl Fn(usize) -> usize) {
        for s in &mut self.sources {
            *s = map(*s);
        }
    }

    /// Hull vertices, sorted by composition
    pub fn vertices(&self) -> &[[f64; 2]] {
        &self.vertices
    }

    /// Index in the input of each hull vertex
    pub fn sources(&self) -> &[usize] {
        &self.sources
    }

    /// Tie lines between consecutive vertices
    pub fn tie_lines(&self) -> &[TieLine] {
        &self.tie_lines
    }

    /// Check whether the hull has no tie line
    pub fn is_empty(&self) -> bool {
        self.tie_lines.is_empty()
    }

    /// Tie line containing `x` and the interpolation weights
    pub fn locate(&self, x: f64) -> Option<(usize, [f64; 2])> {
        self.tie_lines
            .iter()
            .enumerate()
            .find_map(|(i, line)| line.weights(x).map(|w| (i, w)))
    }

    /// Energy of the lower envelope at `x`, `None` outside its range
    pub fn energy_at(&self, x: f64) -> Option<f64> {
        self.locate(x)
            .and_then(|(i, _)| self.tie_lines[i].energy_at(x))
    }
}
