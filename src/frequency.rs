
use crate::relations::{read_triples, Relation, RelationTriple};
use crate::errors::Result;
use std::collections::BTreeMap;
use std::fmt::Display;
use std::path::Path;

type LabelCounts = BTreeMap<Relation, usize>;


// basic frequency counts on the BLESS evaluation set:
// distributions of relations / labels, left nouns and right nouns
#[derive(Debug, Default, Clone)]
pub struct Counts {
    total: usize,
    labels: LabelCounts,
    left: BTreeMap<String, LabelCounts>,
    right: BTreeMap<String, LabelCounts>,
}

impl Counts {

    pub fn new() -> Counts {
        Counts::default()
    }

    pub fn accumulate(&mut self, triple: &RelationTriple) {

        self.total += 1;
        *self.labels.entry(triple.label).or_insert(0) += 1;
        *self.left.entry(triple.noun1.to_owned()).or_default().entry(triple.label).or_insert(0) += 1;
        *self.right.entry(triple.noun2.to_owned()).or_default().entry(triple.label).or_insert(0) += 1;
    }

    pub fn total(&self) -> usize {
        self.total
    }

    pub fn label_count(&self, label: Relation) -> usize {
        *self.labels.get(&label).unwrap_or(&0)
    }

    pub fn left_count(&self, noun: &str, label: Relation) -> usize {
        self.left.get(noun).and_then(|c| c.get(&label)).copied().unwrap_or(0)
    }

    pub fn right_count(&self, noun: &str, label: Relation) -> usize {
        self.right.get(noun).and_then(|c| c.get(&label)).copied().unwrap_or(0)
    }

    pub fn distinct_left(&self) -> usize {
        self.left.len()
    }

    pub fn distinct_right(&self) -> usize {
        self.right.len()
    }

    // number of triples a noun appears in as the left noun, most frequent first
    pub fn left_occurrences(&self) -> Vec<(&str, usize)> {

        let mut occurrences: Vec<(&str, usize)> = self.left
            .iter()
            .map(|(noun, counts)| (noun.as_str(), counts.values().sum()))
            .collect();
        occurrences.sort_by(|(a, i), (b, j)| j.cmp(i).then(a.cmp(b)));
        occurrences
    }

    pub fn run(bless_file: &Path) -> Result<Counts> {

        let mut counts = Counts::new();
        for triple in read_triples(bless_file)? {
            counts.accumulate(&triple);
        }
        Ok(counts)
    }
}

impl Display for Counts {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {

        writeln!(f, "Total number of items: {}", self.total)?;
        let labels: Vec<String> = self.labels.iter().map(|(l, c)| format!("({}, {})", l, c)).collect();
        writeln!(f, "Label counts: [{}]\n", labels.join(", "))?;

        writeln!(f, "Total number of different left nouns: {}", self.distinct_left())?;
        let left: Vec<String> = self.left_occurrences().iter().map(|(n, c)| format!("({}, {})", n, c)).collect();
        writeln!(f, "Occurrences of left nouns: [{}]\n", left.join(", "))?;

        write!(f, "Total number of different right nouns: {}", self.distinct_right())
    }
}


#[cfg(test)]
mod tests {

    use super::Counts;
    use crate::relations::{Relation, RelationTriple};
    use std::io::Write;
    use std::path::Path;

    fn triple(line: &str) -> RelationTriple {
        RelationTriple::parse(line, Path::new("bless.tsv"), 1).unwrap()
    }

    #[test]
    fn single_triple_test() {

        let mut counts = Counts::new();
        counts.accumulate(&triple("dog\tcat\tCOORD"));

        assert_eq!(counts.total(), 1);
        assert_eq!(counts.label_count(Relation::Coord), 1);
        assert_eq!(counts.left_count("dog", Relation::Coord), 1);
        assert_eq!(counts.right_count("cat", Relation::Coord), 1);
        assert_eq!(counts.left_count("cat", Relation::Coord), 0);
        assert_eq!(counts.label_count(Relation::Hyper), 0);
    }

    #[test]
    fn report_test() {

        let mut f = tempfile::NamedTempFile::new().unwrap();
        writeln!(f, "dog\tcat\tcoord\ndog\tanimal\thyper\ndog\ttail\tmero\nfrog\tanimal\thyper").unwrap();

        let counts = Counts::run(f.path()).unwrap();
        assert_eq!(counts.total(), 4);
        assert_eq!(counts.label_count(Relation::Hyper), 2);
        assert_eq!(counts.distinct_left(), 2);
        assert_eq!(counts.distinct_right(), 3);
        assert_eq!(counts.right_count("animal", Relation::Hyper), 2);
        assert_eq!(counts.left_occurrences(), vec![("dog", 3), ("frog", 1)]);

        let report = counts.to_string();
        assert!(report.starts_with("Total number of items: 4\n"));
        assert!(report.contains("Label counts: [(coord, 1), (hyper, 2), (mero, 1)]"));
        assert!(report.ends_with("Total number of different right nouns: 3"));
    }
}
