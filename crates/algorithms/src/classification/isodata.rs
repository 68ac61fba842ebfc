//! ISODATA clustering engine
//!
//! Iterative Self-Organizing Data Analysis Technique over feature
//! vectors. Each iteration reassigns every sample to its nearest
//! cluster, dissolves clusters that fall below a minimum membership,
//! recomputes centers, then either splits clusters along their
//! highest-variance feature (when the cluster count is low) or merges
//! the closest pair (when it exceeds the configured maximum). The loop
//! stops when the total assignment distance stabilizes or the
//! iteration budget runs out.

use tracing::{debug, trace};

use crate::classification::cluster::ClusterSet;
use crate::classification::sample_store::{SampleStore, StorageWidth};
use crate::maybe_rayon::*;
use gridclass_core::{Error, Result};

/// Tolerance for the convergence test and the split gate
const EPSILON: f64 = 1e-12;

/// Parameters for the ISODATA engine
#[derive(Debug, Clone)]
pub struct IsodataParams {
    /// Maximum iterations (at least 3)
    pub max_iterations: usize,
    /// Maximum cluster count; storage is sized to twice this value
    pub max_clusters: usize,
    /// Initial cluster count; 0 starts from a single cluster seeded
    /// with the first sample
    pub ini_clusters: usize,
    /// Minimum members a cluster may keep before being dissolved
    pub min_samples: usize,
    /// Standard-deviation threshold for stricter split gating.
    /// Stored but not consulted by the current split decision.
    pub max_std_dev: f64,
    /// Center-distance threshold for stricter merge gating.
    /// Stored but not consulted by the current merge decision.
    pub max_distance: f64,
}

impl Default for IsodataParams {
    fn default() -> Self {
        Self {
            max_iterations: 20,
            max_clusters: 10,
            ini_clusters: 0,
            min_samples: 5,
            max_std_dev: 10.0,
            max_distance: 5.0,
        }
    }
}

/// ISODATA clustering over an in-memory sample set.
///
/// Lifecycle: construct with a fixed feature count and storage width,
/// append samples with [`add_sample`](Self::add_sample), then
/// [`run`](Self::run). Afterwards the cluster count, per-cluster
/// statistics and per-sample assignments are available through the
/// read accessors. [`clear`](Self::clear) releases everything so the
/// engine can be reloaded.
pub struct Isodata {
    store: SampleStore,
    params: IsodataParams,
    clusters: ClusterSet,
    assignment: Vec<usize>,
    distances: Vec<f64>,
}

impl Isodata {
    /// Create an engine for samples of `n_features` features stored at
    /// the given width.
    pub fn new(n_features: usize, width: StorageWidth) -> Result<Self> {
        let params = IsodataParams::default();
        let clusters = ClusterSet::new(n_features, params.max_clusters);
        Ok(Self {
            store: SampleStore::new(n_features, width)?,
            params,
            clusters,
            assignment: Vec::new(),
            distances: Vec::new(),
        })
    }

    /// Append one sample.
    pub fn add_sample(&mut self, features: &[f64]) -> Result<()> {
        self.store.push(features)
    }

    /// Number of loaded samples
    pub fn sample_count(&self) -> usize {
        self.store.len()
    }

    /// Current parameters
    pub fn params(&self) -> &IsodataParams {
        &self.params
    }

    /// Set the iteration budget; fails below 3.
    pub fn set_max_iterations(&mut self, n: usize) -> Result<()> {
        if n < 3 {
            return Err(Error::invalid_parameter(
                "max_iterations",
                n,
                "must be at least 3",
            ));
        }
        self.params.max_iterations = n;
        Ok(())
    }

    /// Set the maximum cluster count; fails below 2.
    pub fn set_max_clusters(&mut self, n: usize) -> Result<()> {
        if n < 2 {
            return Err(Error::invalid_parameter(
                "max_clusters",
                n,
                "must be at least 2",
            ));
        }
        self.params.max_clusters = n;
        Ok(())
    }

    /// Set the initial cluster count; checked against `max_clusters`
    /// when the run starts.
    pub fn set_ini_clusters(&mut self, n: usize) {
        self.params.ini_clusters = n;
    }

    /// Set the minimum cluster membership; fails below 1.
    pub fn set_min_samples(&mut self, n: usize) -> Result<()> {
        if n < 1 {
            return Err(Error::invalid_parameter(
                "min_samples",
                n,
                "must be at least 1",
            ));
        }
        self.params.min_samples = n;
        Ok(())
    }

    /// Set the reserved split-gating threshold.
    pub fn set_max_std_dev(&mut self, value: f64) {
        self.params.max_std_dev = value;
    }

    /// Set the reserved merge-gating threshold.
    pub fn set_max_distance(&mut self, value: f64) {
        self.params.max_distance = value;
    }

    /// Run the algorithm to convergence or iteration exhaustion.
    pub fn run(&mut self) -> Result<()> {
        self.run_with_progress(|_, _| true)
    }

    /// Run with a per-iteration progress callback.
    ///
    /// The callback receives `(iteration, max_iterations)` once per
    /// iteration. Returning `false` cancels the run; cancellation is
    /// not an error, the engine keeps the best state reached so far.
    pub fn run_with_progress<F>(&mut self, mut progress: F) -> Result<()>
    where
        F: FnMut(usize, usize) -> bool,
    {
        let n_samples = self.store.len();

        if n_samples <= 1 {
            self.release_results();
            return Err(Error::Algorithm(
                "ISODATA requires more than one sample".into(),
            ));
        }
        if self.params.max_clusters >= n_samples {
            self.release_results();
            return Err(Error::Algorithm(format!(
                "ISODATA requires max_clusters < sample count ({} >= {})",
                self.params.max_clusters, n_samples
            )));
        }
        if self.params.ini_clusters >= self.params.max_clusters {
            self.release_results();
            return Err(Error::Algorithm(format!(
                "ISODATA requires ini_clusters < max_clusters ({} >= {})",
                self.params.ini_clusters, self.params.max_clusters
            )));
        }

        self.clusters = ClusterSet::new(self.store.n_features(), self.params.max_clusters);
        self.assignment = vec![0; n_samples];
        self.distances = vec![0.0; n_samples];
        self.initialize_clusters();

        debug!(
            samples = n_samples,
            features = self.store.n_features(),
            ini_clusters = self.params.ini_clusters,
            max_clusters = self.params.max_clusters,
            "starting ISODATA"
        );

        let max_iterations = self.params.max_iterations;
        let mut d_prev = 0.0;

        for iteration in 1..=max_iterations {
            self.assign_samples();

            if !progress(iteration, max_iterations) {
                debug!(iteration, "ISODATA stopped by caller");
                break;
            }

            self.prune_small_clusters();
            self.recompute_centers();
            let overall = self.recompute_distances();

            let k = self.clusters.len();
            if k <= self.params.max_clusters / 2 {
                self.split_clusters(overall);
            } else if k > self.params.max_clusters {
                self.merge_closest_pair();
            }

            let d_total: f64 = (0..n_samples)
                .map(|i| {
                    self.clusters
                        .sample_distance(&self.store, i, self.assignment[i])
                })
                .sum();

            debug!(
                iteration,
                clusters = self.clusters.len(),
                d_total,
                "ISODATA iteration"
            );

            if (d_total - d_prev).abs() < EPSILON {
                debug!(iteration, clusters = self.clusters.len(), "converged");
                break;
            }
            d_prev = d_total;
        }

        // Final per-cluster standard deviations for reporting
        self.compute_std_devs();
        Ok(())
    }

    /// Release all sample and cluster state so the engine can be
    /// loaded again.
    pub fn clear(&mut self) {
        self.store.clear();
        self.release_results();
    }

    // Read accessors, valid after a successful run

    /// Final cluster count
    pub fn cluster_count(&self) -> usize {
        self.clusters.len()
    }

    /// Members assigned to cluster `c`
    pub fn member_count(&self, c: usize) -> usize {
        self.clusters.counts[c]
    }

    /// Mean member distance to the center of cluster `c`
    pub fn avg_distance(&self, c: usize) -> f64 {
        self.clusters.avg_distance[c]
    }

    /// Center (per-feature mean) of cluster `c` at feature `f`
    pub fn mean(&self, c: usize, f: usize) -> f64 {
        self.clusters.center(c)[f]
    }

    /// Standard deviation of cluster `c` at feature `f`
    pub fn std_dev(&self, c: usize, f: usize) -> f64 {
        self.clusters.std_dev[c * self.store.n_features() + f]
    }

    /// Largest per-feature standard deviation of cluster `c`
    pub fn std_dev_max(&self, c: usize) -> f64 {
        self.clusters.max_std_dev[c]
    }

    /// Cluster assigned to `sample`, or `cluster_count()` as an
    /// out-of-range sentinel.
    pub fn cluster_of(&self, sample: usize) -> usize {
        self.assignment
            .get(sample)
            .copied()
            .unwrap_or(self.clusters.len())
    }

    fn release_results(&mut self) {
        self.assignment = Vec::new();
        self.distances = Vec::new();
        self.clusters = ClusterSet::new(self.store.n_features(), self.params.max_clusters);
    }

    /// Seed the initial clusters: round-robin distribution when an
    /// initial count is configured, otherwise a single cluster placed
    /// on the first sample.
    fn initialize_clusters(&mut self) {
        let n_features = self.store.n_features();
        let ini = self.params.ini_clusters;

        if ini == 0 {
            self.clusters.set_len(1);
            for f in 0..n_features {
                self.clusters.center_mut(0)[f] = self.store.feature(0, f);
            }
            return;
        }

        self.clusters.set_len(ini);
        for i in 0..self.store.len() {
            let c = i % ini;
            self.assignment[i] = c;
            self.clusters.counts[c] += 1;
            for f in 0..n_features {
                self.clusters.center_mut(c)[f] += self.store.feature(i, f);
            }
        }
        for c in 0..ini {
            let count = self.clusters.counts[c];
            if count == 0 {
                continue;
            }
            for v in self.clusters.center_mut(c) {
                *v /= count as f64;
            }
        }
    }

    /// Assign every sample to its nearest cluster center. Ties keep
    /// the lowest cluster index since only a strictly smaller distance
    /// replaces the current best. Rebuilds member counts.
    fn assign_samples(&mut self) {
        let store = &self.store;
        let clusters = &self.clusters;
        let k = clusters.len();

        self.assignment
            .par_iter_mut()
            .zip(self.distances.par_iter_mut())
            .enumerate()
            .for_each(|(i, (cluster, distance))| {
                let mut best = 0usize;
                let mut best_d = f64::INFINITY;
                for c in 0..k {
                    let d = clusters.sample_distance(store, i, c);
                    if d < best_d {
                        best_d = d;
                        best = c;
                    }
                }
                *cluster = best;
                *distance = best_d;
            });

        for c in 0..k {
            self.clusters.counts[c] = 0;
        }
        for &c in &self.assignment {
            self.clusters.counts[c] += 1;
        }
    }

    /// Dissolve clusters with fewer than `min_samples` members.
    ///
    /// Members move to the adjacent cluster index (`c - 1` when it
    /// exists, else `c + 1`) in a single local pass; distances are
    /// refreshed against the adopting center and all higher cluster
    /// indices shift down one slot.
    fn prune_small_clusters(&mut self) {
        let mut c = 0;
        while c < self.clusters.len() {
            if self.clusters.len() == 1 {
                break;
            }
            if self.clusters.counts[c] >= self.params.min_samples {
                c += 1;
                continue;
            }

            let target = if c > 0 { c - 1 } else { c + 1 };
            for i in 0..self.assignment.len() {
                if self.assignment[i] == c {
                    self.assignment[i] = target;
                    self.distances[i] = self.clusters.sample_distance(&self.store, i, target);
                }
                if self.assignment[i] > c {
                    self.assignment[i] -= 1;
                }
            }

            let absorbed = self.clusters.counts[c];
            self.clusters.remove_count_slot(c);
            let survivor = if c > 0 { c - 1 } else { 0 };
            self.clusters.counts[survivor] += absorbed;
            trace!(cluster = c, members = absorbed, "dissolved undersized cluster");
            // the slot shifted into `c` still needs evaluation
        }
    }

    /// Recompute every center as the mean of its assigned samples.
    /// Member counts are rebuilt from the assignment in the same pass.
    fn recompute_centers(&mut self) {
        let n_features = self.store.n_features();
        let k = self.clusters.len();

        for c in 0..k {
            self.clusters.center_mut(c).fill(0.0);
            self.clusters.counts[c] = 0;
        }
        for i in 0..self.store.len() {
            let c = self.assignment[i];
            self.clusters.counts[c] += 1;
            for f in 0..n_features {
                let v = self.store.feature(i, f);
                self.clusters.center_mut(c)[f] += v;
            }
        }
        for c in 0..k {
            let count = self.clusters.counts[c];
            if count == 0 {
                continue;
            }
            for v in self.clusters.center_mut(c) {
                *v /= count as f64;
            }
        }
    }

    /// Refresh per-sample distances against the updated centers, then
    /// the per-cluster average distances. Returns the overall average
    /// distance across all samples.
    fn recompute_distances(&mut self) -> f64 {
        let store = &self.store;
        let clusters = &self.clusters;
        let assignment = &self.assignment;

        self.distances.par_iter_mut().enumerate().for_each(|(i, d)| {
            *d = clusters.sample_distance(store, i, assignment[i]);
        });

        let k = self.clusters.len();
        for c in 0..k {
            self.clusters.avg_distance[c] = 0.0;
        }
        for (i, &c) in self.assignment.iter().enumerate() {
            self.clusters.avg_distance[c] += self.distances[i];
        }
        for c in 0..k {
            let count = self.clusters.counts[c];
            if count > 0 {
                self.clusters.avg_distance[c] /= count as f64;
            }
        }

        self.distances.iter().sum::<f64>() / self.store.len() as f64
    }

    /// Per-cluster per-feature standard deviations (population form),
    /// plus the per-cluster maximum and the feature it occurs at.
    fn compute_std_devs(&mut self) {
        let n_features = self.store.n_features();
        let k = self.clusters.len();

        self.clusters.std_dev.fill(0.0);
        for i in 0..self.store.len() {
            let c = self.assignment[i];
            for f in 0..n_features {
                let d = self.store.feature(i, f) - self.clusters.center(c)[f];
                self.clusters.std_dev[c * n_features + f] += d * d;
            }
        }
        for c in 0..k {
            let count = self.clusters.counts[c];
            let mut max_sd = 0.0;
            let mut max_f = 0;
            for f in 0..n_features {
                let idx = c * n_features + f;
                let sd = if count > 0 {
                    (self.clusters.std_dev[idx] / count as f64).sqrt()
                } else {
                    0.0
                };
                self.clusters.std_dev[idx] = sd;
                if sd > max_sd {
                    max_sd = sd;
                    max_f = f;
                }
            }
            self.clusters.max_std_dev[c] = max_sd;
            self.clusters.max_std_dev_feature[c] = max_f;
        }
    }

    /// Split every qualifying cluster along its highest-variance
    /// feature: the new cluster appears at the end of the table with
    /// the center moved up by the spread on the split axis, while the
    /// parent moves down by the same amount.
    fn split_clusters(&mut self, overall_distance: f64) {
        self.compute_std_devs();

        let k = self.clusters.len();
        for c in 0..k {
            let spread = self.clusters.max_std_dev[c];
            // a cluster with no internal spread has nothing to split apart
            if spread <= EPSILON {
                continue;
            }
            if self.clusters.avg_distance[c] > overall_distance - EPSILON
                && self.clusters.counts[c] > 2 * self.params.min_samples
            {
                let new = self.clusters.len();
                debug_assert!(
                    new < self.clusters.capacity(),
                    "cluster storage exceeded during split"
                );
                let axis = self.clusters.max_std_dev_feature[c];
                self.clusters.copy_center(c, new);
                self.clusters.center_mut(new)[axis] += spread;
                self.clusters.center_mut(c)[axis] -= spread;
                self.clusters.set_len(new + 1);
                trace!(cluster = c, axis, spread, "split cluster");
            }
        }
    }

    /// Merge the closest pair of clusters. The lower-indexed survivor
    /// takes the member-weighted sum of the two centers and the higher
    /// slot is compacted away; member counts are rebuilt by the next
    /// assignment pass.
    fn merge_closest_pair(&mut self) {
        let k = self.clusters.len();
        let mut pairs = Vec::with_capacity(k * (k - 1) / 2);
        for i in 0..k {
            for j in (i + 1)..k {
                pairs.push((self.clusters.center_distance(i, j), i, j));
            }
        }
        pairs.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(std::cmp::Ordering::Equal));

        if let Some(&(distance, i, j)) = pairs.first() {
            let ni = self.clusters.counts[i] as f64;
            let nj = self.clusters.counts[j] as f64;
            for f in 0..self.store.n_features() {
                let merged = self.clusters.center(i)[f] * ni + self.clusters.center(j)[f] * nj;
                self.clusters.center_mut(i)[f] = merged;
            }
            self.clusters.remove_center_slot(j);
            trace!(lower = i, upper = j, distance, "merged closest cluster pair");
        }
    }
}
