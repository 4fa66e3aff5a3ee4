//! Preparation of pairwise similarities for Chinese Whispers.
//!
//! Every distinct pair gets a dense numeric id in first-seen order, weak or
//! malformed similarity entries are pruned, and the surviving entries are
//! written as a symmetric `id \t id \t similarity` graph.

use crate::config::files_handling::{self, ByteLines, ReadFile, SaveFile};
use crate::errors::{Result, SensimError};
use regex::Regex;
use std::collections::{BTreeMap, HashMap};
use std::io::Write;
use std::path::Path;

/// Characters allowed in a pair string, anything else prunes the entry.
pub const PAIR_ALPHABET: &str = r"^[a-zA-Z:@]*$";


#[derive(Debug, Clone, PartialEq)]
pub struct SimilarityEntry {
    pub left: String,
    pub right: String,
    pub similarity: f64,
}

impl SimilarityEntry {

    // `l_pair \t r_pair \t similarity`
    pub fn parse(line: &str, file_path: &Path, line_no: usize) -> Result<SimilarityEntry> {

        let fields = files_handling::split_fields(line, 3, file_path, line_no)?;
        let similarity = fields[2].trim().parse::<f64>().map_err(|e| {
            SensimError::malformed(file_path, line_no, format!("cannot parse similarity '{}': {}", fields[2], e))
        })?;

        Ok(SimilarityEntry {
            left: fields[0].to_string(),
            right: fields[1].to_string(),
            similarity: similarity,
        })
    }
}

/// Decides which similarity entries enter the graph.
///
/// Entries are expected grouped by their left pair. The rank counter counts every
/// entry of the current left pair, kept or not, and restarts when the left pair changes.
pub struct PruneFilter {
    threshold: f64,
    max_rank: usize,
    alphabet: Regex,
    current_left: Option<String>,
    rank: usize,
}

impl PruneFilter {

    pub fn new(threshold: f64, max_rank: usize) -> Result<PruneFilter> {
        Ok(Self {
            threshold: threshold,
            max_rank: max_rank,
            alphabet: Regex::new(PAIR_ALPHABET)?,
            current_left: None,
            rank: 0,
        })
    }

    pub fn accept(&mut self, entry: &SimilarityEntry) -> bool {

        // rank of this entry among those sharing its left pair, starting at 1
        if self.current_left.as_deref() == Some(entry.left.as_str()) {
            self.rank += 1;
        } else {
            self.rank = 1;
            self.current_left = Some(entry.left.to_owned());
        }

        !(entry.similarity < self.threshold
            || !self.alphabet.is_match(&entry.left)
            || !self.alphabet.is_match(&entry.right)
            || self.rank > self.max_rank
            || entry.left == entry.right)
    }
}

/// One-to-one mapping between items and ids `1..=N`, assigned in first-seen order.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct IdDictionary {
    ids: HashMap<String, usize>,
    items: Vec<String>,
}

impl IdDictionary {

    pub fn new() -> IdDictionary {
        IdDictionary::default()
    }

    pub fn get_or_assign(&mut self, item: &str) -> usize {

        if let Some(id) = self.ids.get(item) {
            return *id;
        }
        self.items.push(item.to_owned());
        let id = self.items.len();
        self.ids.insert(item.to_owned(), id);
        id
    }

    pub fn id(&self, item: &str) -> Option<usize> {
        self.ids.get(item).copied()
    }

    pub fn item(&self, id: usize) -> Option<&str> {
        if id == 0 {
            return None;
        }
        self.items.get(id - 1).map(|s| s.as_str())
    }

    pub fn contains(&self, item: &str) -> bool {
        self.ids.contains_key(item)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    // (id, item) in ascending id order
    pub fn iter(&self) -> impl Iterator<Item = (usize, &str)> {
        self.items.iter().enumerate().map(|(i, item)| (i + 1, item.as_str()))
    }
}

impl SaveFile for IdDictionary {
    fn save_file(&self, writer: &mut dyn Write) -> Result<()> {
        for (id, item) in self.iter() {
            writeln!(writer, "{}\t{}", id, item)?;
        }
        Ok(())
    }
}

impl ReadFile for IdDictionary {

    // reads back an `id \t item` file, which has to hold ids 1..=N in ascending order
    fn read_file(file_path: &Path) -> Result<Self> {

        let mut dictionary = IdDictionary::new();
        for (i, line) in files_handling::read_lines(file_path)?.enumerate() {

            let line = line?;
            if line.is_empty() {
                continue;
            }
            let fields = files_handling::split_fields(&line, 2, file_path, i + 1)?;
            let id = fields[0].trim().parse::<usize>().map_err(|e| {
                SensimError::malformed(file_path, i + 1, format!("cannot parse id '{}': {}", fields[0], e))
            })?;

            if dictionary.contains(fields[1]) || dictionary.get_or_assign(fields[1]) != id {
                return Err(SensimError::malformed(file_path, i + 1, format!("id {} breaks the dense 1..N numbering", id)));
            }
        }
        Ok(dictionary)
    }
}

/// Symmetric id x id similarity graph with integer weights, as Chinese Whispers expects.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct SimilarityMatrix {
    rows: BTreeMap<usize, BTreeMap<usize, i64>>,
}

impl SimilarityMatrix {

    pub fn new() -> SimilarityMatrix {
        SimilarityMatrix::default()
    }

    // similarities are truncated toward zero
    pub fn insert(&mut self, id1: usize, id2: usize, similarity: f64) {

        let similarity = similarity.trunc() as i64;
        self.rows.entry(id1).or_default().insert(id2, similarity);
        self.rows.entry(id2).or_default().insert(id1, similarity);
    }

    pub fn get(&self, id1: usize, id2: usize) -> Option<i64> {
        self.rows.get(&id1).and_then(|row| row.get(&id2)).copied()
    }

    // number of directed entries, i.e. every undirected edge counts twice
    pub fn len(&self) -> usize {
        self.rows.values().map(|row| row.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (usize, usize, i64)> + '_ {
        self.rows.iter().flat_map(|(id1, row)| row.iter().map(move |(id2, sim)| (*id1, *id2, *sim)))
    }
}

impl SaveFile for SimilarityMatrix {
    fn save_file(&self, writer: &mut dyn Write) -> Result<()> {
        for (id1, id2, sim) in self.iter() {
            writeln!(writer, "{}\t{}\t{}", id1, id2, sim)?;
        }
        Ok(())
    }
}

impl ReadFile for SimilarityMatrix {
    fn read_file(file_path: &Path) -> Result<Self> {

        let mut matrix = SimilarityMatrix::new();
        for (i, line) in files_handling::read_lines(file_path)?.enumerate() {

            let line = line?;
            if line.is_empty() {
                continue;
            }
            let fields = files_handling::split_fields(&line, 3, file_path, i + 1)?;
            let parsed = (fields[0].parse::<usize>(), fields[1].parse::<usize>(), fields[2].parse::<i64>());
            match parsed {
                (Ok(id1), Ok(id2), Ok(sim)) => matrix.insert(id1, id2, sim as f64),
                _ => return Err(SensimError::malformed(file_path, i + 1, "expected `id \\t id \\t integer`")),
            }
        }
        Ok(matrix)
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct PrepareStats {
    pub lines: usize,
    pub accepted: usize,
}

#[derive(Debug, Default, Clone)]
pub struct PreparedGraph {
    pub dictionary: IdDictionary,
    pub matrix: SimilarityMatrix,
    pub stats: PrepareStats,
}

pub struct Prepare {}

impl Prepare {

    // single pass over the similarity stream: prune, assign ids (left pair first) and
    // fill the symmetric matrix with every accepted entry. Lines are read as bytes, an
    // item that is not utf-8 decodes with U+FFFD and fails the alphabet check.
    pub fn build(lines: ByteLines, file_path: &Path, filter: &mut PruneFilter) -> Result<PreparedGraph> {

        let mut graph = PreparedGraph::default();

        for (i, line) in lines.enumerate() {

            let line = line?;
            graph.stats.lines += 1;
            if graph.stats.lines % 1000000 == 0 {
                log::info!("{} lines later", graph.stats.lines);
            }

            let entry = SimilarityEntry::parse(&files_handling::decode_line(&line), file_path, i + 1)?;
            if !filter.accept(&entry) {
                continue;
            }
            graph.stats.accepted += 1;

            let id1 = graph.dictionary.get_or_assign(&entry.left);
            let id2 = graph.dictionary.get_or_assign(&entry.right);
            graph.matrix.insert(id1, id2, entry.similarity);
        }

        Ok(graph)
    }

    // keeps `pair \t pattern \t lmi` lines of known pairs with lmi >= threshold, numbering patterns
    // in first-seen order. Writes `pair_id \t pattern_id \t lmi` and returns the pattern dictionary.
    pub fn pair_pattern_entries<W: Write>(lines: ByteLines,
        file_path: &Path,
        pairs: &IdDictionary,
        threshold: f64,
        writer: &mut W) -> Result<IdDictionary> {

            let mut patterns = IdDictionary::new();

            for (i, line) in lines.enumerate() {

                let line = line?;
                let line = files_handling::decode_line(&line);
                let fields = files_handling::split_fields(&line, 3, file_path, i + 1)?;
                let lmi = fields[2].trim().parse::<f64>().map_err(|e| {
                    SensimError::malformed(file_path, i + 1, format!("cannot parse lmi '{}': {}", fields[2], e))
                })?;

                // a pattern that is not utf-8 is dropped, a pair that is not misses `pairs`
                let pair_id = match pairs.id(fields[0]) {
                    Some(pair_id) if lmi >= threshold && !fields[1].contains(char::REPLACEMENT_CHARACTER) => pair_id,
                    _ => continue
                };
                let pattern_id = patterns.get_or_assign(fields[1]);
                writeln!(writer, "{}\t{}\t{:.6}", pair_id, pattern_id, lmi)?;
            }

            Ok(patterns)
    }

    pub fn run(sim_file: &Path,
        ctx_lmi_file: Option<&Path>,
        output_dir: &Path,
        prune: i64,
        max_rank: usize) -> Result<PreparedGraph> {

            log::info!("generating id2pair dict and similarities for Chinese Whispers");
            let mut filter = PruneFilter::new(prune as f64, max_rank)?;
            let graph = Prepare::build(files_handling::read_byte_lines(sim_file)?, sim_file, &mut filter)?;
            log::info!("kept {} of {} entries, {} distinct pairs", graph.stats.accepted, graph.stats.lines, graph.dictionary.len());

            files_handling::save_output(&output_dir.join(format!("id_pair_{}", prune)), &graph.dictionary)?;
            files_handling::save_output(&output_dir.join(format!("id_id_lmi_{}", prune)), &graph.matrix)?;

            if let Some(ctx_lmi_file) = ctx_lmi_file {

                log::info!("writing pair-pattern feature entries");
                let mut writer = files_handling::create_output(&output_dir.join(format!("pair_pattern_lmi_{}", prune)))?;
                let patterns = Prepare::pair_pattern_entries(
                    files_handling::read_byte_lines(ctx_lmi_file)?,
                    ctx_lmi_file,
                    &graph.dictionary,
                    prune as f64,
                    &mut writer,
                )?;
                writer.flush()?;
                files_handling::save_output(&output_dir.join(format!("id_pattern_{}", prune)), &patterns)?;
                log::info!("{} distinct patterns", patterns.len());
            }

            Ok(graph)
    }
}


#[cfg(test)]
mod tests {

    use super::{IdDictionary, Prepare, PruneFilter, SimilarityEntry, SimilarityMatrix};
    use crate::config::files_handling::{self, ByteLines};
    use flate2::{write::GzEncoder, Compression};
    use std::fs;
    use std::io::{BufRead, Cursor, Write};
    use std::path::Path;

    fn lines_of(text: impl Into<Vec<u8>>) -> ByteLines {
        let reader: Box<dyn BufRead> = Box::new(Cursor::new(text.into()));
        reader.split(b'\n')
    }

    fn entry(left: &str, right: &str, similarity: f64) -> SimilarityEntry {
        SimilarityEntry { left: left.into(), right: right.into(), similarity: similarity }
    }

    #[test]
    fn threshold_test() {

        let e = SimilarityEntry::parse("tree\tbeet\t12.5\n", Path::new("sims"), 1).unwrap();
        assert_eq!(e.similarity, 12.5);

        assert!(PruneFilter::new(10.0, 50).unwrap().accept(&e));
        assert!(!PruneFilter::new(15.0, 50).unwrap().accept(&e));
        // the threshold itself is kept
        assert!(PruneFilter::new(12.5, 50).unwrap().accept(&e));
    }

    #[test]
    fn rejections_test() {

        let mut filter = PruneFilter::new(1.0, 50).unwrap();
        assert!(filter.accept(&entry("dog::@::cat", "cow::@::pig", 3.0)));
        assert!(!filter.accept(&entry("dog::@::cat", "cow-1::@::pig", 3.0)));
        assert!(!filter.accept(&entry("dög::@::cat", "cow::@::pig", 3.0)));
        assert!(!filter.accept(&entry("dog::@::cat", "dog::@::cat", 3.0)));
        assert!(!filter.accept(&entry("dog::@::cat", "cow::@::pig", 0.5)));
    }

    #[test]
    fn rank_cutoff_test() {

        // 60 neighbours of the same left pair, only the first 50 survive
        let mut filter = PruneFilter::new(1.0, 50).unwrap();
        let kept: Vec<bool> = (0..60).map(|i| {
            let right = format!("x{}", "a".repeat(i + 1));
            filter.accept(&entry("left", &right, 100.0))
        }).collect();
        assert_eq!(kept.iter().filter(|k| **k).count(), 50);
        assert!(kept[49]);
        assert!(!kept[50]);

        // a new left pair restarts the counter
        assert!(filter.accept(&entry("other", "b", 100.0)));
    }

    #[test]
    fn rejected_entries_count_toward_rank_test() {

        let mut filter = PruneFilter::new(10.0, 2).unwrap();
        assert!(!filter.accept(&entry("a", "b", 1.0)));
        assert!(filter.accept(&entry("a", "c", 20.0)));
        assert!(!filter.accept(&entry("a", "d", 20.0)));
    }

    #[test]
    fn dense_ids_and_symmetry_test() {

        let input = "tree\tbeet\t12.5\n\
                     tree\tbush\t11.9\n\
                     tree\ttree\t99.0\n\
                     beet\ttree\t12.5\n\
                     beet\tcarrot\t3.0\n\
                     bush\tshrub\t30.2\n".to_string();

        let mut filter = PruneFilter::new(10.0, 50).unwrap();
        let graph = Prepare::build(lines_of(input), Path::new("sims"), &mut filter).unwrap();

        assert_eq!(graph.stats.lines, 6);
        assert_eq!(graph.stats.accepted, 4);

        let items: Vec<(usize, &str)> = graph.dictionary.iter().collect();
        assert_eq!(items, vec![(1, "tree"), (2, "beet"), (3, "bush"), (4, "shrub")]);

        let edges: Vec<(usize, usize, i64)> = graph.matrix.iter().collect();
        assert_eq!(edges, vec![(1, 2, 12), (1, 3, 11), (2, 1, 12), (3, 1, 11), (3, 4, 30), (4, 3, 30)]);
        for (i, j, sim) in graph.matrix.iter() {
            assert_eq!(graph.matrix.get(j, i), Some(sim));
        }
    }

    #[test]
    fn malformed_line_test() {

        let mut filter = PruneFilter::new(1.0, 50).unwrap();
        let err = Prepare::build(lines_of("a\tb\n".to_string()), Path::new("sims"), &mut filter).unwrap_err();
        assert!(err.to_string().contains("sims:1"));

        let err = Prepare::build(lines_of("a\tb\tmuch\n".to_string()), Path::new("sims"), &mut filter).unwrap_err();
        assert!(err.to_string().contains("much"));
    }

    #[test]
    fn non_utf8_item_test() {

        let input: &[u8] = b"caf\xe9::@::x\tbeet\t12.5\ntree\tbeet\t12.5\n";

        let mut filter = PruneFilter::new(10.0, 50).unwrap();
        let graph = Prepare::build(lines_of(input), Path::new("sims"), &mut filter).unwrap();

        assert_eq!(graph.stats.lines, 2);
        assert_eq!(graph.stats.accepted, 1);
        assert_eq!(graph.dictionary.iter().collect::<Vec<_>>(), vec![(1, "tree"), (2, "beet")]);
        assert_eq!(graph.matrix.get(1, 2), Some(12));
    }

    #[test]
    fn pattern_entries_test() {

        let mut pairs = IdDictionary::new();
        pairs.get_or_assign("dog::@::cat");
        pairs.get_or_assign("cow::@::pig");

        let input = "dog::@::cat\t#and\t12.0\n\
                     dog::@::cat\t#or\t0.5\n\
                     fox::@::hen\t#and\t40.0\n\
                     cow::@::pig\t#or\t7.25\n\
                     cow::@::pig\t#and\t2.0\n".to_string();

        let mut out: Vec<u8> = Vec::new();
        let patterns = Prepare::pair_pattern_entries(lines_of(input), Path::new("ctx"), &pairs, 1.0, &mut out).unwrap();

        assert_eq!(patterns.iter().collect::<Vec<_>>(), vec![(1, "#and"), (2, "#or")]);
        assert_eq!(String::from_utf8(out).unwrap(), "1\t1\t12.000000\n2\t2\t7.250000\n2\t1\t2.000000\n");
    }

    #[test]
    fn non_utf8_pattern_test() {

        let mut pairs = IdDictionary::new();
        pairs.get_or_assign("tree");

        let input: &[u8] = b"tree\t#caf\xe9\t20.0\ntree\t#and\t20.0\n";
        let mut out: Vec<u8> = Vec::new();
        let patterns = Prepare::pair_pattern_entries(lines_of(input), Path::new("ctx"), &pairs, 1.0, &mut out).unwrap();

        assert_eq!(patterns.iter().collect::<Vec<_>>(), vec![(1, "#and")]);
        assert_eq!(String::from_utf8(out).unwrap(), "1\t1\t20.000000\n");
    }

    #[test]
    fn run_test() {

        let dir = tempfile::tempdir().unwrap();
        let sim_path = dir.path().join("sims.gz");
        let ctx_path = dir.path().join("ctx_lmi");
        let clust_dir = dir.path().join("clust");

        // two gzip members, as produced by concatenating compressed parts
        let mut first = GzEncoder::new(fs::File::create(&sim_path).unwrap(), Compression::default());
        first.write_all(b"tree\tbeet\t12.5\ntree\tbush\t3.0\n").unwrap();
        let mut second = GzEncoder::new(first.finish().unwrap(), Compression::default());
        second.write_all(b"sun\tmoon\t30.0\n").unwrap();
        second.finish().unwrap();
        fs::write(&ctx_path, "tree\t#and\t20.0\nsun\t#of\t5.0\nmoon\t#of\t11.0\n").unwrap();

        let graph = Prepare::run(&sim_path, Some(ctx_path.as_path()), &clust_dir, 10, 50).unwrap();
        assert_eq!(graph.stats.lines, 3);
        assert_eq!(graph.stats.accepted, 2);

        let read = |name: &str| fs::read_to_string(clust_dir.join(name)).unwrap();
        assert_eq!(read("id_pair_10"), "1\ttree\n2\tbeet\n3\tsun\n4\tmoon\n");
        assert_eq!(read("id_id_lmi_10"), "1\t2\t12\n2\t1\t12\n3\t4\t30\n4\t3\t30\n");
        assert_eq!(read("pair_pattern_lmi_10"), "1\t1\t20.000000\n4\t2\t11.000000\n");
        assert_eq!(read("id_pattern_10"), "1\t#and\n2\t#of\n");
    }

    #[test]
    fn files_round_trip_test() {

        let dir = tempfile::tempdir().unwrap();
        let mut dictionary = IdDictionary::new();
        dictionary.get_or_assign("tree::@::beet");
        dictionary.get_or_assign("sun::@::moon");
        let mut matrix = SimilarityMatrix::new();
        matrix.insert(1, 2, 7.9);

        let dict_path = dir.path().join("id_pair_1");
        let sim_path = dir.path().join("id_id_lmi_1");
        files_handling::save_output(&dict_path, &dictionary).unwrap();
        files_handling::save_output(&sim_path, &matrix).unwrap();

        assert_eq!(std::fs::read_to_string(&dict_path).unwrap(), "1\ttree::@::beet\n2\tsun::@::moon\n");
        assert_eq!(std::fs::read_to_string(&sim_path).unwrap(), "1\t2\t7\n2\t1\t7\n");
        assert_eq!(files_handling::read_input::<IdDictionary>(&dict_path).unwrap(), dictionary);
        assert_eq!(files_handling::read_input::<SimilarityMatrix>(&sim_path).unwrap(), matrix);
    }

    #[test]
    fn rejects_sparse_ids_test() {

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("id_pair");
        std::fs::write(&path, "1\ta\n3\tb\n").unwrap();
        assert!(files_handling::read_input::<IdDictionary>(&path).is_err());
    }
}
