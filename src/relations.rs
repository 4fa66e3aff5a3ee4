//! BLESS relation triples and the reformatting of the raw BLESS release.

use crate::config::files_handling::{self, Lines};
use crate::errors::{Result, SensimError};
use std::fmt::Display;
use std::io::Write;
use std::path::Path;
use std::str::FromStr;

/// Separator joining the two nouns of a pair in the clustering pipeline.
pub const PAIR_SEPARATOR: &str = "::@::";

const NOUN_SUFFIX: &str = "-n";

/// Semantic relation between two nouns, ordered as in the clustering gold file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Relation {
    Coord,
    Hyper,
    Mero,
    Random,
}

impl Relation {

    pub const ALL: [Relation; 4] = [Relation::Coord, Relation::Hyper, Relation::Mero, Relation::Random];

    pub fn index(self) -> usize {
        match self {
            Relation::Coord => 0,
            Relation::Hyper => 1,
            Relation::Mero => 2,
            Relation::Random => 3,
        }
    }

    pub fn from_index(index: usize) -> Option<Relation> {
        Relation::ALL.get(index).copied()
    }

    pub fn description(self) -> &'static str {
        match self {
            Relation::Coord => "co-hyponyms",
            Relation::Hyper => "hypernyms",
            Relation::Mero => "meronyms",
            Relation::Random => "random pairs",
        }
    }
}

impl FromStr for Relation {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "coord" => Ok(Relation::Coord),
            "hyper" => Ok(Relation::Hyper),
            "mero" => Ok(Relation::Mero),
            "random" | "random-n" => Ok(Relation::Random),
            other => Err(format!("unknown relation label '{}'", other)),
        }
    }
}

impl Display for Relation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Relation::Coord => "coord",
            Relation::Hyper => "hyper",
            Relation::Mero => "mero",
            Relation::Random => "random",
        };
        write!(f, "{}", name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelationTriple {
    pub noun1: String,
    pub noun2: String,
    pub label: Relation,
}

impl RelationTriple {

    pub fn parse(line: &str, file_path: &Path, line_no: usize) -> Result<RelationTriple> {

        let fields = files_handling::split_fields(line, 3, file_path, line_no)?;
        let label = fields[2].parse::<Relation>().map_err(|e| SensimError::malformed(file_path, line_no, e))?;
        Ok(RelationTriple {
            noun1: fields[0].to_string(),
            noun2: fields[1].to_string(),
            label: label,
        })
    }

    /// The pair as it is spelled in similarity and clustering files.
    pub fn pair_key(&self) -> String {
        format!("{}{}{}", self.noun1, PAIR_SEPARATOR, self.noun2)
    }
}

// reads a whole `noun1 \t noun2 \t label` file
pub fn read_triples(file_path: &Path) -> Result<Vec<RelationTriple>> {

    let mut triples = Vec::new();
    for (i, line) in files_handling::read_lines(file_path)?.enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        triples.push(RelationTriple::parse(&line, file_path, i + 1)?);
    }
    Ok(triples)
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ReformatStats {
    pub read: usize,
    pub written: usize,
}

pub struct Bless {}

impl Bless {

    // selects noun-noun pairs from raw BLESS lines (`concept \t class \t relation \t relatum`),
    // strips their POS suffix and writes them as `noun1 \t noun2 \t label`
    pub fn reformat<W: Write>(lines: Lines, file_path: &Path, writer: &mut W) -> Result<ReformatStats> {

        let mut stats = ReformatStats::default();
        for (i, line) in lines.enumerate() {

            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            stats.read += 1;

            let fields = files_handling::split_fields(&line, 4, file_path, i + 1)?;
            let (concept, label, relatum) = (fields[0], fields[2], fields[3]);

            if let (Some(noun1), Some(noun2)) = (concept.strip_suffix(NOUN_SUFFIX), relatum.strip_suffix(NOUN_SUFFIX)) {
                writeln!(writer, "{}\t{}\t{}", noun1, noun2, label)?;
                stats.written += 1;
            }
        }

        Ok(stats)
    }

    // writes the gold standard read by the clustering evaluator, `noun1::@::noun2 \t relation index`
    pub fn write_clustering_gold<W: Write>(triples: &[RelationTriple], writer: &mut W) -> Result<()> {

        for triple in triples {
            writeln!(writer, "{}\t{}", triple.pair_key(), triple.label.index())?;
        }
        Ok(())
    }

    pub fn run(input_file: &Path, output_file: &Path, gold_file: Option<&Path>) -> Result<ReformatStats> {

        let lines = files_handling::read_lines(input_file)?;
        let mut writer = files_handling::create_output(output_file)?;
        let stats = Bless::reformat(lines, input_file, &mut writer)?;
        writer.flush()?;
        log::info!("kept {} noun-noun pairs out of {} BLESS lines", stats.written, stats.read);

        if let Some(gold_file) = gold_file {
            let triples = read_triples(output_file)?;
            let mut writer = files_handling::create_output(gold_file)?;
            Bless::write_clustering_gold(&triples, &mut writer)?;
            writer.flush()?;
            log::info!("wrote clustering gold standard to {}", gold_file.display());
        }

        Ok(stats)
    }
}
