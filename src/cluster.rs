//! Agglomerative single-linkage clustering and quasi-diagonal ordering.
//!
//! The linkage follows scipy's `scipy.cluster.hierarchy.linkage` layout:
//! leaves are `0..n`, the cluster formed at merge `i` gets id `n + i`, and
//! each merge row is `(left, right, distance, size)` with `left < right`.
//!
//! # References
//!
//! - scipy source: `scipy/cluster/_hierarchy.pyx`
//! - M. López de Prado, "Building Diversified Portfolios that Outperform
//!   Out-of-Sample", J. Portfolio Management 42 (2016), `getQuasiDiag`.

use crate::error::{Error, Result};

/// One merge step of the dendrogram.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Merge {
    pub left: usize,
    pub right: usize,
    pub distance: f64,
    /// Number of leaves under the new cluster.
    pub size: usize,
}

/// A full dendrogram over `leaves` items (`leaves - 1` merges).
#[derive(Clone, Debug, PartialEq)]
pub struct Linkage {
    leaves: usize,
    merges: Vec<Merge>,
}

impl Linkage {
    pub fn leaves(&self) -> usize {
        self.leaves
    }

    pub fn merges(&self) -> &[Merge] {
        &self.merges
    }

    /// Leaf ids in dendrogram order: the root is expanded recursively,
    /// left child before right, so correlated items end up adjacent.
    pub fn leaves_order(&self) -> Vec<usize> {
        let n = self.leaves;
        let Some(root) = self.merges.last() else {
            return (0..n).collect();
        };

        let mut order = Vec::with_capacity(n);
        let mut stack = vec![root.right, root.left];
        while let Some(id) = stack.pop() {
            if id < n {
                order.push(id);
            } else {
                let m = &self.merges[id - n];
                stack.push(m.right);
                stack.push(m.left);
            }
        }
        order
    }
}

/// Single-linkage clustering of a symmetric distance matrix.
///
/// The distance between two clusters is the minimum distance between their
/// members. Ties are broken toward the pair with the smallest cluster ids,
/// which keeps the output deterministic.
pub fn single_linkage(dist: &[Vec<f64>]) -> Result<Linkage> {
    let n = dist.len();
    if n == 0 {
        return Err(Error::EmptyUniverse);
    }
    for row in dist {
        if row.len() != n {
            return Err(Error::ShapeMismatch(format!(
                "distance row has {} entries, expected {n}",
                row.len()
            )));
        }
        if row.iter().any(|d| !d.is_finite()) {
            return Err(Error::NonFinite("distance matrix"));
        }
    }

    // Working matrix indexed by slot; slot i holds cluster `ids[i]`.
    let mut d: Vec<Vec<f64>> = dist.to_vec();
    let mut ids: Vec<usize> = (0..n).collect();
    let mut sizes: Vec<usize> = vec![1; n];
    let mut active: Vec<bool> = vec![true; n];
    let mut merges = Vec::with_capacity(n.saturating_sub(1));

    for step in 0..n.saturating_sub(1) {
        let mut best: Option<(usize, usize, f64)> = None;
        for i in 0..n {
            if !active[i] {
                continue;
            }
            for j in (i + 1)..n {
                if !active[j] {
                    continue;
                }
                let dij = d[i][j];
                let better = match best {
                    None => true,
                    Some((bi, bj, bd)) => {
                        dij < bd || (dij == bd && pair_key(&ids, i, j) < pair_key(&ids, bi, bj))
                    }
                };
                if better {
                    best = Some((i, j, dij));
                }
            }
        }
        let Some((a, b, distance)) = best else {
            break;
        };

        let (left, right) = if ids[a] < ids[b] {
            (ids[a], ids[b])
        } else {
            (ids[b], ids[a])
        };
        merges.push(Merge {
            left,
            right,
            distance,
            size: sizes[a] + sizes[b],
        });

        // Slot `a` becomes the merged cluster, `b` retires.
        for k in 0..n {
            if active[k] && k != a && k != b {
                let m = d[a][k].min(d[b][k]);
                d[a][k] = m;
                d[k][a] = m;
            }
        }
        ids[a] = n + step;
        sizes[a] += sizes[b];
        active[b] = false;
    }

    Ok(Linkage { leaves: n, merges })
}

fn pair_key(ids: &[usize], i: usize, j: usize) -> (usize, usize) {
    let (x, y) = (ids[i], ids[j]);
    if x < y { (x, y) } else { (y, x) }
}
