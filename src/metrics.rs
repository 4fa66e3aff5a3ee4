//! Clustering quality measures.
//!
//! Label-sequence scores (homogeneity, completeness, V-measure, adjusted Rand
//! index, adjusted mutual information) follow the scikit-learn definitions,
//! including their conventions for degenerate inputs. B-Cubed follows
//! Bagga & Baldwin (1998) over gold and predicted sets of items.

use ndarray::{Array1, Array2, Axis};
use ndarray_stats::EntropyExt;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::hash::Hash;

/// Counts `n_ck` of items with true class `c` and predicted cluster `k`.
#[derive(Debug, Clone)]
pub struct Contingency {
    table: Array2<f64>,
    n_samples: usize,
}

impl Contingency {

    pub fn new<A: Hash + Eq + Clone, B: Hash + Eq + Clone>(labels_true: &[A], labels_pred: &[B]) -> Contingency {

        assert_eq!(labels_true.len(), labels_pred.len(), "label sequences of different lengths");

        let classes = Contingency::encode(labels_true);
        let clusters = Contingency::encode(labels_pred);
        let n_classes = classes.iter().max().map_or(0, |m| m + 1);
        let n_clusters = clusters.iter().max().map_or(0, |m| m + 1);

        let mut table = Array2::<f64>::zeros((n_classes, n_clusters));
        for (c, k) in classes.iter().zip(clusters.iter()) {
            table[[*c, *k]] += 1.0;
        }

        Self { table: table, n_samples: labels_true.len() }
    }

    // maps labels to 0..n in first-seen order
    fn encode<L: Hash + Eq + Clone>(labels: &[L]) -> Vec<usize> {
        let mut index: HashMap<L, usize> = HashMap::new();
        labels.iter().map(|l| {
            let next = index.len();
            *index.entry(l.clone()).or_insert(next)
        }).collect()
    }

    pub fn n_classes(&self) -> usize {
        self.table.nrows()
    }

    pub fn n_clusters(&self) -> usize {
        self.table.ncols()
    }

    fn class_sums(&self) -> Array1<f64> {
        self.table.sum_axis(Axis(1))
    }

    fn cluster_sums(&self) -> Array1<f64> {
        self.table.sum_axis(Axis(0))
    }

    fn entropy_of(counts: &Array1<f64>) -> f64 {
        let total = counts.sum();
        if total == 0.0 {
            return 0.0;
        }
        let probabilities = counts.mapv(|c| c / total);
        probabilities.entropy().unwrap_or(0.0)
    }

    pub fn entropy_true(&self) -> f64 {
        Contingency::entropy_of(&self.class_sums())
    }

    pub fn entropy_pred(&self) -> f64 {
        Contingency::entropy_of(&self.cluster_sums())
    }

    pub fn mutual_info(&self) -> f64 {

        let n = self.n_samples as f64;
        let a = self.class_sums();
        let b = self.cluster_sums();

        let mut mi = 0.0;
        for ((c, k), n_ck) in self.table.indexed_iter() {
            if *n_ck > 0.0 {
                mi += (n_ck / n) * (n * n_ck / (a[c] * b[k])).ln();
            }
        }
        mi.max(0.0)
    }

    // expected mutual information of two random labelings with these marginals
    pub fn expected_mutual_info(&self) -> f64 {

        let n = self.n_samples;
        let nf = n as f64;
        let a: Vec<usize> = self.class_sums().iter().map(|v| *v as usize).collect();
        let b: Vec<usize> = self.cluster_sums().iter().map(|v| *v as usize).collect();

        // ln(k!) for k in 0..=n
        let mut ln_fact = vec![0.0f64; n + 1];
        for k in 1..=n {
            ln_fact[k] = ln_fact[k - 1] + (k as f64).ln();
        }

        let mut emi = 0.0;
        for &a_i in &a {
            for &b_j in &b {

                let start = std::cmp::max(1, (a_i + b_j).saturating_sub(n));
                let end = std::cmp::min(a_i, b_j);
                for n_ij in start..=end {

                    let nijf = n_ij as f64;
                    let term1 = nijf / nf;
                    let term2 = (nf * nijf).ln() - (a_i as f64).ln() - (b_j as f64).ln();
                    let gln = ln_fact[a_i] + ln_fact[b_j] + ln_fact[n - a_i] + ln_fact[n - b_j]
                        - ln_fact[n] - ln_fact[n_ij] - ln_fact[a_i - n_ij] - ln_fact[b_j - n_ij]
                        - ln_fact[n + n_ij - a_i - b_j];
                    emi += term1 * term2 * gln.exp();
                }
            }
        }
        emi
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct HomogeneityCompleteness {
    pub homogeneity: f64,
    pub completeness: f64,
    pub v_measure: f64,
}

pub fn homogeneity_completeness_v_measure(contingency: &Contingency) -> HomogeneityCompleteness {

    if contingency.n_samples == 0 {
        return HomogeneityCompleteness { homogeneity: 1.0, completeness: 1.0, v_measure: 1.0 };
    }

    let entropy_c = contingency.entropy_true();
    let entropy_k = contingency.entropy_pred();
    let mi = contingency.mutual_info();

    let homogeneity = if entropy_c > 0.0 { mi / entropy_c } else { 1.0 };
    let completeness = if entropy_k > 0.0 { mi / entropy_k } else { 1.0 };
    let v_measure = if homogeneity + completeness == 0.0 {
        0.0
    } else {
        2.0 * homogeneity * completeness / (homogeneity + completeness)
    };

    HomogeneityCompleteness { homogeneity, completeness, v_measure }
}

pub fn adjusted_rand_score(contingency: &Contingency) -> f64 {

    // pair confusion matrix, every ordered pair of distinct samples counted once
    let n = contingency.n_samples as f64;
    let table = &contingency.table;
    let n_c = contingency.class_sums();
    let n_k = contingency.cluster_sums();
    let sum_squares = table.mapv(|v| v * v).sum();

    let tp = sum_squares - n;
    let fp = table.dot(&n_k).sum() - sum_squares;
    let fn_ = table.t().dot(&n_c).sum() - sum_squares;
    let tn = n * n - fp - fn_ - sum_squares;

    if fn_ == 0.0 && fp == 0.0 {
        return 1.0;
    }
    2.0 * (tp * tn - fn_ * fp) / ((tp + fn_) * (fn_ + tn) + (tp + fp) * (fp + tn))
}

pub fn adjusted_mutual_info(contingency: &Contingency) -> f64 {

    let (n_classes, n_clusters) = (contingency.n_classes(), contingency.n_clusters());
    if (n_classes == 1 && n_clusters == 1) || (n_classes == 0 && n_clusters == 0) {
        return 1.0;
    }

    let mi = contingency.mutual_info();
    let emi = contingency.expected_mutual_info();
    let normalizer = (contingency.entropy_true() + contingency.entropy_pred()) / 2.0;

    let mut denominator = normalizer - emi;
    denominator = if denominator < 0.0 {
        denominator.min(-f64::EPSILON)
    } else {
        denominator.max(f64::EPSILON)
    };
    (mi - emi) / denominator
}

/// Numerators and denominators of B-Cubed precision and recall.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BCubed {
    pub p_num: f64,
    pub p_den: usize,
    pub r_num: f64,
    pub r_den: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Prf {
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
}

impl BCubed {

    pub fn prf(&self) -> Prf {

        let precision = if self.p_den == 0 { 0.0 } else { self.p_num / self.p_den as f64 };
        let recall = if self.r_den == 0 { 0.0 } else { self.r_num / self.r_den as f64 };
        let f1 = if precision + recall == 0.0 { 0.0 } else { 2.0 * precision * recall / (precision + recall) };
        Prf { precision, recall, f1 }
    }
}

// item -> key of the set holding it
pub fn sets_to_mapping<K: Ord + Clone>(sets: &BTreeMap<K, BTreeSet<String>>) -> BTreeMap<String, K> {

    let mut mapping = BTreeMap::new();
    for (key, items) in sets {
        for item in items {
            mapping.insert(item.to_owned(), key.clone());
        }
    }
    mapping
}

// sum over items of |A(item) & B(item)| / |A(item)|, and the number of items of A
fn b_cubed_half<K1: Ord + Clone, K2: Ord + Clone>(a: &BTreeMap<K1, BTreeSet<String>>,
    b: &BTreeMap<K2, BTreeSet<String>>,
    a_mapping: &BTreeMap<String, K1>,
    b_mapping: &BTreeMap<String, K2>) -> (f64, usize) {

        let empty = BTreeSet::new();
        let mut sum = 0.0;
        for (item, key) in a_mapping {
            let a_set = a.get(key).unwrap_or(&empty);
            let b_set = b_mapping.get(item).and_then(|k| b.get(k)).unwrap_or(&empty);
            if !a_set.is_empty() {
                sum += a_set.intersection(b_set).count() as f64 / a_set.len() as f64;
            }
        }
        (sum, a_mapping.len())
}

pub fn b_cubed<K1: Ord + Clone, K2: Ord + Clone>(gold: &BTreeMap<K1, BTreeSet<String>>,
    predicted: &BTreeMap<K2, BTreeSet<String>>) -> BCubed {

        let gold_mapping = sets_to_mapping(gold);
        let pred_mapping = sets_to_mapping(predicted);
        let (p_num, p_den) = b_cubed_half(predicted, gold, &pred_mapping, &gold_mapping);
        let (r_num, r_den) = b_cubed_half(gold, predicted, &gold_mapping, &pred_mapping);
        BCubed { p_num, p_den, r_num, r_den }
}


#[cfg(test)]
mod tests {

    use super::*;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn perfect_clustering_test() {

        // same partition with permuted label names
        let truth = [0, 0, 1, 1, 2, 2];
        let pred = [5, 5, 3, 3, 9, 9];
        let contingency = Contingency::new(&truth, &pred);

        let hc = homogeneity_completeness_v_measure(&contingency);
        assert!(close(hc.homogeneity, 1.0));
        assert!(close(hc.completeness, 1.0));
        assert!(close(hc.v_measure, 1.0));
        assert!(close(adjusted_rand_score(&contingency), 1.0));
        assert!(close(adjusted_mutual_info(&contingency), 1.0));
    }

    #[test]
    fn single_cluster_test() {

        // everything in one cluster is complete but not homogeneous
        let truth = [0, 0, 1, 1];
        let pred = [1, 1, 1, 1];
        let contingency = Contingency::new(&truth, &pred);

        let hc = homogeneity_completeness_v_measure(&contingency);
        assert!(close(hc.homogeneity, 0.0));
        assert!(close(hc.completeness, 1.0));
        assert!(close(hc.v_measure, 0.0));
        assert!(close(adjusted_rand_score(&contingency), 0.0));
        assert!(close(adjusted_mutual_info(&contingency), 0.0));
    }

    #[test]
    fn known_scores_test() {

        // reference values from scikit-learn
        let truth = [0, 0, 1, 1];
        let pred = [0, 0, 1, 2];
        let contingency = Contingency::new(&truth, &pred);

        let hc = homogeneity_completeness_v_measure(&contingency);
        assert!(close(hc.homogeneity, 1.0));
        assert!((hc.completeness - 0.6666666666666666).abs() < 1e-9);
        assert!((hc.v_measure - 0.8).abs() < 1e-9);
        assert!((adjusted_rand_score(&contingency) - 0.5714285714285714).abs() < 1e-9);

        let truth = [0, 0, 0, 1, 1, 1];
        let pred = [0, 0, 1, 1, 2, 2];
        let contingency = Contingency::new(&truth, &pred);
        assert!((adjusted_rand_score(&contingency) - 0.24242424242424243).abs() < 1e-9);
    }

    #[test]
    fn b_cubed_test() {

        let mut gold: BTreeMap<&str, BTreeSet<String>> = BTreeMap::new();
        gold.insert("coord", ["a", "b", "c"].iter().map(|s| s.to_string()).collect());
        gold.insert("hyper", ["d", "e"].iter().map(|s| s.to_string()).collect());

        let mut pred: BTreeMap<u64, BTreeSet<String>> = BTreeMap::new();
        pred.insert(1, ["a", "b"].iter().map(|s| s.to_string()).collect());
        pred.insert(2, ["c", "d", "e"].iter().map(|s| s.to_string()).collect());

        // precision: a,b -> 1 each; c -> 1/3; d,e -> 2/3 each
        // recall: a,b -> 2/3 each; c -> 1/3; d,e -> 1 each
        let counts = b_cubed(&gold, &pred);
        assert_eq!(counts.p_den, 5);
        assert_eq!(counts.r_den, 5);
        assert!(close(counts.p_num, 2.0 + 1.0 / 3.0 + 4.0 / 3.0));
        assert!(close(counts.r_num, 4.0 / 3.0 + 1.0 / 3.0 + 2.0));

        let prf = counts.prf();
        assert!(close(prf.precision, 11.0 / 15.0));
        assert!(close(prf.recall, 11.0 / 15.0));
        assert!(close(prf.f1, 11.0 / 15.0));
    }

    #[test]
    fn empty_b_cubed_test() {

        let gold: BTreeMap<u8, BTreeSet<String>> = BTreeMap::new();
        let pred: BTreeMap<u8, BTreeSet<String>> = BTreeMap::new();
        let prf = b_cubed(&gold, &pred).prf();
        assert_eq!(prf, Prf { precision: 0.0, recall: 0.0, f1: 0.0 });
    }
}
