use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};

use crate::error::PlotError;

/// Binary occurrence matrix: rows are primary labels (sorted), columns are
/// (secondary, tertiary) combinations. Repeated occurrences collapse to presence.
#[derive(Debug, Clone, Default)]
pub struct PresenceMatrix {
    rows: BTreeMap<String, BTreeSet<(String, String)>>,
}

impl PresenceMatrix {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a row even if it never receives a present cell.
    pub fn add_row(&mut self, row: &str) {
        if !self.rows.contains_key(row) {
            self.rows.insert(row.to_string(), BTreeSet::new());
        }
    }

    pub fn mark(&mut self, row: &str, secondary: &str, tertiary: &str) {
        self.add_row(row);
        if let Some(cells) = self.rows.get_mut(row) {
            cells.insert((secondary.to_string(), tertiary.to_string()));
        }
    }

    pub fn row_labels(&self) -> Vec<String> {
        self.rows.keys().cloned().collect()
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn column_count(&self) -> usize {
        self.rows
            .values()
            .flat_map(|cells| cells.iter())
            .collect::<BTreeSet<_>>()
            .len()
    }

    /// Square matrix of pairwise Jaccard distances between rows.
    pub fn jaccard_distances(&self) -> Vec<Vec<f64>> {
        let sets: Vec<&BTreeSet<(String, String)>> = self.rows.values().collect();
        let n = sets.len();
        let mut dist = vec![vec![0.0; n]; n];
        for i in 0..n {
            for j in (i + 1)..n {
                let d = jaccard(sets[i], sets[j]);
                dist[i][j] = d;
                dist[j][i] = d;
            }
        }
        dist
    }
}

/// `|A xor B| / |A or B|`, zero when both sets are empty.
fn jaccard<T: Ord>(a: &BTreeSet<T>, b: &BTreeSet<T>) -> f64 {
    let union = a.union(b).count();
    if union == 0 {
        return 0.0;
    }
    let shared = a.intersection(b).count();
    (union - shared) as f64 / union as f64
}

/// A dendrogram node joining `left` and `right`. Ids below `n` are leaves,
/// merge `i` creates cluster `n + i`. `left` is always the smaller id.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Merge {
    pub left: usize,
    pub right: usize,
    pub distance: f64,
    pub size: usize,
}

/// Agglomerative clustering with the Ward criterion applied to `dist` through
/// the Lance-Williams update. Ties pick the lowest (row, column) slot pair.
pub fn ward_linkage(dist: &[Vec<f64>]) -> Vec<Merge> {
    let n = dist.len();
    if n < 2 {
        return Vec::new();
    }
    let mut d: Vec<Vec<f64>> = dist.to_vec();
    let mut size = vec![1usize; n];
    let mut active = vec![true; n];
    let mut raw: Vec<(usize, usize, f64)> = Vec::with_capacity(n - 1);

    for _ in 0..n - 1 {
        let mut best: Option<(usize, usize, f64)> = None;
        for i in 0..n {
            if !active[i] {
                continue;
            }
            for j in (i + 1)..n {
                if !active[j] {
                    continue;
                }
                let candidate = d[i][j];
                if best.is_none_or(|(_, _, current)| candidate < current) {
                    best = Some((i, j, candidate));
                }
            }
        }
        let Some((x, y, dxy)) = best else {
            break;
        };

        // The merged cluster lives in slot `y`.
        let (nx, ny) = (size[x] as f64, size[y] as f64);
        for k in 0..n {
            if !active[k] || k == x || k == y {
                continue;
            }
            let nk = size[k] as f64;
            let t = 1.0 / (nx + ny + nk);
            let value = ((nk + nx) * t * d[x][k] * d[x][k] + (nk + ny) * t * d[y][k] * d[y][k]
                - nk * t * dxy * dxy)
                .max(0.0)
                .sqrt();
            d[y][k] = value;
            d[k][y] = value;
        }
        active[x] = false;
        size[y] += size[x];
        raw.push((x, y, dxy));
    }

    label_merges(raw, n)
}

/// Sorts slot merges by height and renames them to dendrogram cluster ids.
fn label_merges(mut raw: Vec<(usize, usize, f64)>, n: usize) -> Vec<Merge> {
    raw.sort_by(|a, b| a.2.partial_cmp(&b.2).unwrap_or(Ordering::Equal));
    let mut parent: Vec<usize> = (0..2 * n - 1).collect();
    let mut sizes = vec![1usize; 2 * n - 1];
    let mut next = n;
    let mut merges = Vec::with_capacity(raw.len());

    fn find(parent: &mut [usize], mut node: usize) -> usize {
        let mut root = node;
        while parent[root] != root {
            root = parent[root];
        }
        while parent[node] != root {
            let up = parent[node];
            parent[node] = root;
            node = up;
        }
        root
    }

    for (x, y, distance) in raw {
        let rx = find(&mut parent, x);
        let ry = find(&mut parent, y);
        let (left, right) = if rx < ry { (rx, ry) } else { (ry, rx) };
        parent[left] = next;
        parent[right] = next;
        sizes[next] = sizes[left] + sizes[right];
        merges.push(Merge {
            left,
            right,
            distance,
            size: sizes[next],
        });
        next += 1;
    }
    merges
}

/// Left-to-right leaves of the dendrogram, left child first.
pub fn leaf_order(merges: &[Merge], n: usize) -> Vec<usize> {
    if n == 0 {
        return Vec::new();
    }
    if merges.is_empty() {
        return (0..n).collect();
    }
    let mut order = Vec::with_capacity(n);
    let mut stack = vec![n + merges.len() - 1];
    while let Some(node) = stack.pop() {
        if node < n {
            order.push(node);
            continue;
        }
        let merge = &merges[node - n];
        stack.push(merge.right);
        stack.push(merge.left);
    }
    order
}

/// Orders primary categories by the reversed Ward dendrogram leaf order.
/// A single row is returned as-is without clustering.
pub fn cluster_order(matrix: &PresenceMatrix, field: &str) -> Result<Vec<String>, PlotError> {
    let labels = matrix.row_labels();
    match labels.len() {
        0 => Err(PlotError::DegenerateInput {
            field: field.to_string(),
        }),
        1 => {
            tracing::debug!(field, "single category, clustering skipped");
            Ok(labels)
        }
        n => {
            tracing::debug!(
                field,
                rows = n,
                columns = matrix.column_count(),
                "clustering presence matrix"
            );
            let merges = ward_linkage(&matrix.jaccard_distances());
            let mut order: Vec<String> = leaf_order(&merges, n)
                .into_iter()
                .map(|idx| labels[idx].clone())
                .collect();
            order.reverse();
            Ok(order)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn matrix(rows: &[(&str, &[(&str, &str)])]) -> PresenceMatrix {
        let mut m = PresenceMatrix::new();
        for (row, cells) in rows {
            m.add_row(row);
            for (b, c) in cells.iter() {
                m.mark(row, b, c);
            }
        }
        m
    }

    #[test]
    fn jaccard_distance_of_sets() {
        let m = matrix(&[
            ("A", &[("p1", "x"), ("p2", "x")]),
            ("B", &[("p1", "x"), ("p3", "x")]),
            ("C", &[]),
            ("D", &[]),
        ]);
        let d = m.jaccard_distances();
        assert!((d[0][1] - 2.0 / 3.0).abs() < 1e-12);
        assert_eq!(d[0][2], 1.0);
        assert_eq!(d[2][3], 0.0);
    }

    #[test]
    fn duplicate_marks_collapse() {
        let mut m = PresenceMatrix::new();
        m.mark("A", "p1", "x");
        m.mark("A", "p1", "x");
        assert_eq!(m.column_count(), 1);
    }

    #[test]
    fn ward_merges_closest_pair_first() {
        let dist = vec![
            vec![0.0, 0.1, 0.9, 0.8],
            vec![0.1, 0.0, 0.85, 0.9],
            vec![0.9, 0.85, 0.0, 0.2],
            vec![0.8, 0.9, 0.2, 0.0],
        ];
        let merges = ward_linkage(&dist);
        assert_eq!(merges.len(), 3);
        assert_eq!((merges[0].left, merges[0].right), (0, 1));
        assert_eq!((merges[1].left, merges[1].right), (2, 3));
        assert_eq!((merges[2].left, merges[2].right), (4, 5));
        assert_eq!(merges[2].size, 4);
        assert!(merges[2].distance > merges[1].distance);
        assert_eq!(leaf_order(&merges, 4), vec![0, 1, 2, 3]);
    }

    #[test]
    fn ward_update_matches_lance_williams() {
        // Three points: merge (0,1) at 1.0, then distance to 2 is
        // sqrt((2*4 + 2*4 - 1*1) / 3) = sqrt(5).
        let dist = vec![
            vec![0.0, 1.0, 2.0],
            vec![1.0, 0.0, 2.0],
            vec![2.0, 2.0, 0.0],
        ];
        let merges = ward_linkage(&dist);
        assert!((merges[1].distance - 5.0_f64.sqrt()).abs() < 1e-12);
        assert_eq!((merges[1].left, merges[1].right), (2, 3));
        assert_eq!(leaf_order(&merges, 3), vec![2, 0, 1]);
    }

    #[test]
    fn single_row_skips_clustering() {
        let m = matrix(&[("Neuron", &[("p1", "x")])]);
        assert_eq!(cluster_order(&m, "CellType").unwrap(), vec!["Neuron"]);
    }

    #[test]
    fn empty_matrix_is_degenerate() {
        let err = cluster_order(&PresenceMatrix::new(), "CellType").unwrap_err();
        assert_eq!(
            err,
            PlotError::DegenerateInput {
                field: "CellType".to_string()
            }
        );
    }

    #[test]
    fn identical_rows_still_produce_a_permutation() {
        let m = matrix(&[
            ("A", &[("p1", "x")]),
            ("B", &[("p1", "x")]),
            ("C", &[("p1", "x")]),
        ]);
        let mut order = cluster_order(&m, "CellType").unwrap();
        assert_eq!(order, cluster_order(&m, "CellType").unwrap());
        order.sort();
        assert_eq!(order, vec!["A", "B", "C"]);
    }

    #[test]
    fn order_is_reversed_leaf_order() {
        let m = matrix(&[
            ("A", &[("p1", "x"), ("p2", "x")]),
            ("B", &[("p1", "x"), ("p2", "x")]),
            ("C", &[("p3", "y")]),
        ]);
        // A and B merge first (distance 0); C joins last: leaves [C, A, B] reversed.
        assert_eq!(cluster_order(&m, "CellType").unwrap(), vec!["B", "A", "C"]);
    }
}
