//! Evaluation of a Chinese Whispers clustering against the BLESS relations.
//!
//! Only clustered pairs that also occur in the gold standard carry a label,
//! so every score is computed over that overlap.

use crate::clustering::IdDictionary;
use crate::config::files_handling::{self, Lines, SaveFile};
use crate::config::Params;
use crate::errors::{Result, SensimError};
use crate::metrics::{self, HomogeneityCompleteness, Prf};
use crate::relations::Relation;
use rand::Rng;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt::Display;
use std::io::Write;
use std::path::Path;

/// Cluster id -> pairs placed in that cluster.
pub type Clusters = BTreeMap<u64, BTreeSet<String>>;

/// Replacement clusterings used to put the real scores into perspective.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Baseline {
    /// every pair in one cluster
    Single,
    /// one cluster per pair
    Singletons,
    /// four clusters drawn at random
    Random,
}

/// Gold pairs that were also clustered, with their relation.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Overlap {
    labels: BTreeMap<String, Relation>,
}

impl Overlap {

    // gold file lines are `pair \t relation index`
    pub fn from_lines(lines: Lines, file_path: &Path, pairs: &IdDictionary) -> Result<Overlap> {

        let mut labels = BTreeMap::new();
        for (i, line) in lines.enumerate() {

            let line = line?;
            if line.is_empty() {
                continue;
            }
            let fields = files_handling::split_fields(&line, 2, file_path, i + 1)?;
            let label = fields[1].trim().parse::<usize>().ok().and_then(Relation::from_index).ok_or_else(|| {
                SensimError::malformed(file_path, i + 1, format!("'{}' is not a relation index", fields[1]))
            })?;

            if pairs.contains(fields[0]) {
                labels.insert(fields[0].to_string(), label);
            }
        }
        Ok(Self { labels: labels })
    }

    pub fn label(&self, pair: &str) -> Option<Relation> {
        self.labels.get(pair).copied()
    }

    pub fn contains(&self, pair: &str) -> bool {
        self.labels.contains_key(pair)
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn pairs_with(&self, relation: Relation) -> impl Iterator<Item = &str> {
        self.labels.iter().filter(move |(_, l)| **l == relation).map(|(p, _)| p.as_str())
    }

    // relation -> set of pairs, the gold clustering
    pub fn by_label(&self) -> BTreeMap<Relation, BTreeSet<String>> {
        let mut by_label: BTreeMap<Relation, BTreeSet<String>> = BTreeMap::new();
        for (pair, label) in &self.labels {
            by_label.entry(*label).or_default().insert(pair.to_owned());
        }
        by_label
    }

    pub fn retain<F: Fn(&str) -> bool>(&mut self, keep: F) {
        self.labels.retain(|pair, _| keep(pair));
    }
}

// reads `id \t pair \t cluster_id`, keeping only pairs of the overlap
pub fn read_predicted(lines: Lines, file_path: &Path, overlap: &Overlap, baseline: Option<Baseline>) -> Result<Clusters> {

    let mut clusters = Clusters::new();
    let mut rng = rand::thread_rng();
    let mut n: u64 = 0;

    for (i, line) in lines.enumerate() {

        let line = line?;
        if line.is_empty() {
            continue;
        }
        let fields = files_handling::split_fields(&line, 3, file_path, i + 1)?;
        let cluster_id = fields[2].trim().parse::<u64>().map_err(|e| {
            SensimError::malformed(file_path, i + 1, format!("cannot parse cluster id '{}': {}", fields[2], e))
        })?;

        let cluster_id = match baseline {
            None => cluster_id,
            Some(Baseline::Single) => 1,
            Some(Baseline::Singletons) => { n += 1; n },
            Some(Baseline::Random) => rng.gen_range(1..=4),
        };

        let pair = fields[1];
        if overlap.contains(pair) {
            clusters.entry(cluster_id).or_default().insert(pair.to_string());
        }
    }
    Ok(clusters)
}

// reads the sizes of all clusters from a `cluster_id \t size \t pair, pair, ..` file
pub fn read_cluster_sizes(lines: Lines, file_path: &Path) -> Result<Vec<usize>> {

    let mut sizes = Vec::new();
    for (i, line) in lines.enumerate() {
        let line = line?;
        if line.is_empty() {
            continue;
        }
        let fields = files_handling::split_fields(&line, 3, file_path, i + 1)?;
        sizes.push(fields[2].split(", ").filter(|p| !p.is_empty()).count());
    }
    Ok(sizes)
}

// drops clusters with fewer than `min_size` pairs, and their pairs from the gold standard.
// Returns the number of pairs removed.
pub fn remove_small_clusters(clusters: &mut Clusters, overlap: &mut Overlap, min_size: usize) -> usize {

    let before = overlap.len();
    clusters.retain(|_, pairs| pairs.len() >= min_size);
    let kept: BTreeSet<&str> = clusters.values().flatten().map(|p| p.as_str()).collect();
    overlap.retain(|pair| kept.contains(pair));
    before - overlap.len()
}

/// Gold and predicted label per overlapping pair, aligned by pair.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Aligned {
    pub pairs: Vec<String>,
    pub y_true: Vec<Relation>,
    pub y_pred: Vec<u64>,
}

pub fn align(overlap: &Overlap, clusters: &Clusters) -> Aligned {

    let mapping = metrics::sets_to_mapping(clusters);
    let mut aligned = Aligned::default();
    for (pair, label) in &overlap.labels {
        if let Some(cluster_id) = mapping.get(pair) {
            aligned.pairs.push(pair.to_owned());
            aligned.y_true.push(*label);
            aligned.y_pred.push(*cluster_id);
        }
    }
    aligned
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Scores {
    pub homogeneity: HomogeneityCompleteness,
    pub adjusted_rand: f64,
    pub adjusted_mutual_info: f64,
    pub b_cubed: Prf,
}

impl Scores {

    pub fn compute(overlap: &Overlap, clusters: &Clusters, aligned: &Aligned) -> Scores {

        let contingency = metrics::Contingency::new(&aligned.y_true, &aligned.y_pred);
        Scores {
            homogeneity: metrics::homogeneity_completeness_v_measure(&contingency),
            adjusted_rand: metrics::adjusted_rand_score(&contingency),
            adjusted_mutual_info: metrics::adjusted_mutual_info(&contingency),
            b_cubed: metrics::b_cubed(&overlap.by_label(), clusters).prf(),
        }
    }
}

impl SaveFile for Scores {
    fn save_file(&self, writer: &mut dyn Write) -> Result<()> {
        serde_json::to_writer_pretty(&mut *writer, self)?;
        writeln!(writer)?;
        Ok(())
    }
}

/// How pairs of one relation spread over the large evaluation clusters.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct RelationSpread {
    pub in_overlap: usize,
    pub in_large_clusters: usize,
    pub clusters: BTreeMap<u64, usize>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Report {
    pub scores: Scores,
    pub step: usize,
    pub all_sizes: Option<Vec<usize>>,
    pub eval_sizes: Vec<usize>,
    pub spread: BTreeMap<Relation, RelationSpread>,
}

impl Report {

    pub fn new(scores: Scores, overlap: &Overlap, clusters: &Clusters, all_sizes: Option<Vec<usize>>, step: usize) -> Report {

        let mut spread: BTreeMap<Relation, RelationSpread> = BTreeMap::new();
        for relation in Relation::ALL {
            spread.insert(relation, RelationSpread {
                in_overlap: overlap.pairs_with(relation).count(),
                ..RelationSpread::default()
            });
        }

        // the random relation is not tracked per cluster
        for (cluster_id, pairs) in clusters.iter().filter(|(_, p)| p.len() >= step) {
            for pair in pairs {
                match overlap.label(pair) {
                    Some(Relation::Random) | None => continue,
                    Some(relation) => {
                        let s = spread.entry(relation).or_default();
                        s.in_large_clusters += 1;
                        *s.clusters.entry(*cluster_id).or_insert(0) += 1;
                    }
                }
            }
        }

        Report {
            scores: scores,
            step: step,
            all_sizes: all_sizes,
            eval_sizes: clusters.values().map(|p| p.len()).collect(),
            spread: spread,
        }
    }

    fn at_least(sizes: &[usize], size: usize) -> usize {
        sizes.iter().filter(|s| **s >= size).count()
    }

    fn write_sizes(f: &mut std::fmt::Formatter<'_>, kind: &str, sizes: &[usize], step: usize) -> std::fmt::Result {
        writeln!(f, "Number of {}: {}", kind, sizes.len())?;
        for factor in 1..=4 {
            writeln!(f, "Number of {} with >= {} items: {}", kind, step * factor, Report::at_least(sizes, step * factor))?;
        }
        Ok(())
    }
}

impl Display for Report {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {

        let b = &self.scores.b_cubed;
        writeln!(f, "Metric\tP\tR\tF1")?;
        writeln!(f, "B-Cubed\t{:.2}\t{:.2}\t{:.2}", 100.0 * b.precision, 100.0 * b.recall, 100.0 * b.f1)?;

        if let Some(all_sizes) = &self.all_sizes {
            writeln!(f)?;
            Report::write_sizes(f, "clusters", all_sizes, self.step)?;
        }
        writeln!(f)?;
        Report::write_sizes(f, "eval clusters", &self.eval_sizes, self.step)?;

        writeln!(f)?;
        for (relation, spread) in &self.spread {
            writeln!(f, "Number of {} in eval clusters: {}", relation.description(), spread.in_overlap)?;
        }

        let tracked: Vec<(&Relation, &RelationSpread)> = self.spread.iter().filter(|(r, _)| **r != Relation::Random).collect();
        writeln!(f)?;
        for (relation, spread) in &tracked {
            writeln!(f, "Number of {} in eval clusters with >= {} items: {}", relation.description(), self.step, spread.in_large_clusters)?;
        }
        writeln!(f)?;
        for (relation, spread) in &tracked {
            writeln!(f, "Number of eval clusters with >= {} items containing {}: {}", self.step, relation.description(), spread.clusters.len())?;
        }
        writeln!(f)?;
        for (relation, spread) in &tracked {
            let counter: Vec<String> = spread.clusters.iter().map(|(c, n)| format!("{}: {}", c, n)).collect();
            writeln!(f, "{}: {{{}}}", relation, counter.join(", "))?;
        }
        Ok(())
    }
}

pub struct Evaluate {}

impl Evaluate {

    pub fn run(params: &Params, variant: &str, baseline: Option<Baseline>) -> Result<Report> {

        let gold_file = params.clust_file("bless_nouns_clust.tsv");
        let clustering_file = params.clust_file(&format!("clustering_{}", variant));
        let pair_dict_file = params.clust_file(&format!("id_pair_{}", variant));
        let read_file = params.clust_file(&format!("clustering_{}.read", variant));

        let pairs: IdDictionary = files_handling::read_input(&pair_dict_file)?;
        let mut overlap = Overlap::from_lines(files_handling::read_lines(&gold_file)?, &gold_file, &pairs)?;
        log::info!("{} of {} clustered pairs are in the gold standard", overlap.len(), pairs.len());

        let mut clusters = read_predicted(files_handling::read_lines(&clustering_file)?, &clustering_file, &overlap, baseline)?;

        // discard small clusters, they improve homogeneity without merit
        if params.min_cluster_size > 1 {
            let removed = remove_small_clusters(&mut clusters, &mut overlap, params.min_cluster_size);
            log::info!("removed {} pairs in clusters smaller than {}", removed, params.min_cluster_size);
        }

        let aligned = align(&overlap, &clusters);
        if aligned.pairs.len() < overlap.len() {
            log::warn!("{} gold pairs are missing from the clustering", overlap.len() - aligned.pairs.len());
        }

        log::info!("Evaluate clustering");
        let scores = Scores::compute(&overlap, &clusters, &aligned);
        log::info!("Homogeneity: {:.3}", scores.homogeneity.homogeneity);
        log::info!("Completeness: {:.3}", scores.homogeneity.completeness);
        log::info!("V-measure: {:.3}", scores.homogeneity.v_measure);
        log::info!("Adjusted Rand Index: {:.3}", scores.adjusted_rand);
        log::info!("Adjusted Mutual Information: {:.3}", scores.adjusted_mutual_info);

        let scores_file = params.clust_file(&format!("scores_{}.json", variant));
        files_handling::save_output(&scores_file, &scores)?;

        let all_sizes = if read_file.exists() {
            Some(read_cluster_sizes(files_handling::read_lines(&read_file)?, &read_file)?)
        } else {
            log::warn!("{} not found, skipping statistics over all clusters", read_file.display());
            None
        };

        Ok(Report::new(scores, &overlap, &clusters, all_sizes, params.cluster_size_step))
    }
}


#[cfg(test)]
mod tests {

    use super::*;
    use crate::config::Config;
    use std::io::{BufRead, Cursor};

    fn lines_of(text: &str) -> Lines {
        let reader: Box<dyn BufRead> = Box::new(Cursor::new(text.as_bytes().to_vec()));
        reader.lines()
    }

    fn dictionary(items: &[&str]) -> IdDictionary {
        let mut dictionary = IdDictionary::new();
        for item in items {
            dictionary.get_or_assign(item);
        }
        dictionary
    }

    const GOLD: &str = "dog::@::cat\t0\ncow::@::pig\t0\ndog::@::animal\t1\ndog::@::tail\t2\nsun::@::shoe\t3\nfox::@::hen\t0\n";
    const CLUSTERING: &str = "1\tdog::@::cat\t10\n2\tcow::@::pig\t10\n3\tdog::@::animal\t20\n4\tdog::@::tail\t20\n5\tsun::@::shoe\t30\n6\tpen::@::ink\t30\n";

    fn fixture() -> (Overlap, Clusters) {
        let pairs = dictionary(&["dog::@::cat", "cow::@::pig", "dog::@::animal", "dog::@::tail", "sun::@::shoe", "pen::@::ink"]);
        let overlap = Overlap::from_lines(lines_of(GOLD), Path::new("gold"), &pairs).unwrap();
        let clusters = read_predicted(lines_of(CLUSTERING), Path::new("clustering"), &overlap, None).unwrap();
        (overlap, clusters)
    }

    #[test]
    fn overlap_test() {

        let (overlap, clusters) = fixture();

        // fox::@::hen was never clustered, pen::@::ink has no gold label
        assert_eq!(overlap.len(), 5);
        assert!(!overlap.contains("fox::@::hen"));
        assert_eq!(overlap.label("dog::@::tail"), Some(Relation::Mero));
        assert_eq!(overlap.by_label()[&Relation::Coord].len(), 2);

        assert_eq!(clusters.len(), 3);
        assert_eq!(clusters[&30].iter().collect::<Vec<_>>(), vec!["sun::@::shoe"]);
    }

    #[test]
    fn align_test() {

        let (overlap, clusters) = fixture();
        let aligned = align(&overlap, &clusters);

        assert_eq!(aligned.pairs, vec!["cow::@::pig", "dog::@::animal", "dog::@::cat", "dog::@::tail", "sun::@::shoe"]);
        assert_eq!(aligned.y_true, vec![Relation::Coord, Relation::Hyper, Relation::Coord, Relation::Mero, Relation::Random]);
        assert_eq!(aligned.y_pred, vec![10, 20, 10, 20, 30]);
    }

    #[test]
    fn remove_small_clusters_test() {

        let (mut overlap, mut clusters) = fixture();
        let removed = remove_small_clusters(&mut clusters, &mut overlap, 2);

        assert_eq!(removed, 1);
        assert!(!clusters.contains_key(&30));
        assert!(!overlap.contains("sun::@::shoe"));

        // every remaining label still sits next to its own pair
        let aligned = align(&overlap, &clusters);
        for (pair, label) in aligned.pairs.iter().zip(aligned.y_true.iter()) {
            assert_eq!(overlap.label(pair), Some(*label));
        }
        assert_eq!(aligned.pairs.len(), 4);
    }

    #[test]
    fn scores_test() {

        let (overlap, clusters) = fixture();
        let aligned = align(&overlap, &clusters);
        let scores = Scores::compute(&overlap, &clusters, &aligned);

        // cluster 10 is pure, 20 mixes hyper and mero, 30 holds the random pair
        assert!((scores.homogeneity.completeness - 1.0).abs() < 1e-9);
        assert!(scores.homogeneity.homogeneity < 1.0);
        // precision 1, 1, 1/2, 1/2, 1 and recall 1, 1, 1, 1, 1
        assert!((scores.b_cubed.precision - 0.8).abs() < 1e-9);
        assert!((scores.b_cubed.recall - 1.0).abs() < 1e-9);
    }

    #[test]
    fn baselines_test() {

        let (overlap, _) = fixture();

        let single = read_predicted(lines_of(CLUSTERING), Path::new("c"), &overlap, Some(Baseline::Single)).unwrap();
        assert_eq!(single.len(), 1);
        assert_eq!(single[&1].len(), 5);

        let singletons = read_predicted(lines_of(CLUSTERING), Path::new("c"), &overlap, Some(Baseline::Singletons)).unwrap();
        assert_eq!(singletons.len(), 5);

        let random = read_predicted(lines_of(CLUSTERING), Path::new("c"), &overlap, Some(Baseline::Random)).unwrap();
        assert!(random.keys().all(|k| (1..=4).contains(k)));
        assert_eq!(random.values().map(|p| p.len()).sum::<usize>(), 5);
    }

    #[test]
    fn cluster_sizes_test() {

        let sizes = read_cluster_sizes(lines_of("1\t3\ta, b, c\n2\t1\td\n"), Path::new("read")).unwrap();
        assert_eq!(sizes, vec![3, 1]);
    }

    #[test]
    fn report_test() {

        let (overlap, clusters) = fixture();
        let aligned = align(&overlap, &clusters);
        let scores = Scores::compute(&overlap, &clusters, &aligned);
        let report = Report::new(scores, &overlap, &clusters, Some(vec![6, 2, 1, 12]), 2);

        assert_eq!(report.spread[&Relation::Coord].in_overlap, 2);
        assert_eq!(report.spread[&Relation::Coord].in_large_clusters, 2);
        assert_eq!(report.spread[&Relation::Hyper].clusters.get(&20), Some(&1));
        assert_eq!(report.spread[&Relation::Random].in_large_clusters, 0);

        let text = report.to_string();
        assert!(text.contains("B-Cubed\t80.00\t100.00\t88.89"));
        assert!(text.contains("Number of clusters with >= 4 items: 2"));
        assert!(text.contains("Number of eval clusters with >= 2 items: 2"));
        assert!(text.contains("Number of eval clusters with >= 2 items containing meronyms: 1"));
    }

    #[test]
    fn run_test() {

        let dir = tempfile::tempdir().unwrap();
        let clust = dir.path().join("clust");
        std::fs::create_dir_all(&clust).unwrap();
        std::fs::write(clust.join("bless_nouns_clust.tsv"), GOLD).unwrap();
        std::fs::write(clust.join("clustering_7"), CLUSTERING).unwrap();
        std::fs::write(
            clust.join("id_pair_7"),
            "1\tdog::@::cat\n2\tcow::@::pig\n3\tdog::@::animal\n4\tdog::@::tail\n5\tsun::@::shoe\n6\tpen::@::ink\n",
        ).unwrap();

        let params = Config::new(None, dir.path()).unwrap().get_params();
        let report = Evaluate::run(&params, "7", None).unwrap();
        assert_eq!(report.all_sizes, None);
        assert_eq!(report.eval_sizes, vec![2, 2, 1]);

        let saved: serde_json::Value = serde_json::from_str(&std::fs::read_to_string(clust.join("scores_7.json")).unwrap()).unwrap();
        assert!((saved["adjusted_rand"].as_f64().unwrap() - report.scores.adjusted_rand).abs() < 1e-12);
        assert!(saved["b_cubed"]["f1"].is_number());
    }
}
