//! SAT analogy questions answered from distributional pair features.
//!
//! The pipeline selects the noun-noun questions, looks up features for every
//! pair (and its inverse), and picks the answer whose features are most similar
//! to the stem's. Questions without enough feature coverage are left unanswered.

use crate::config::files_handling::{self, Lines};
use crate::config::Params;
use crate::errors::{Result, SensimError};
use crate::relations::PAIR_SEPARATOR;
use crate::similarity::{FeatureVector, Measure};
use rand::Rng;
use regex::Regex;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt::Display;
use std::io::Write;
use std::path::Path;
use std::str::FromStr;

pub const N_ANSWERS: usize = 5;

/// Marker written in place of an answer when no prediction is made.
pub const NO_ANSWER: &str = "__";

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NounPair {
    pub first: String,
    pub second: String,
}

impl NounPair {

    pub fn new(first: &str, second: &str) -> NounPair {
        NounPair { first: first.to_owned(), second: second.to_owned() }
    }

    pub fn inverted(&self) -> NounPair {
        NounPair { first: self.second.to_owned(), second: self.first.to_owned() }
    }
}

impl Display for NounPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({},{})", self.first, self.second)
    }
}

impl FromStr for NounPair {
    type Err = String;

    // `(first,second)`
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        s.trim()
            .strip_prefix('(')
            .and_then(|s| s.strip_suffix(')'))
            .and_then(|s| s.split_once(','))
            .map(|(first, second)| NounPair::new(first, second))
            .ok_or_else(|| format!("'{}' is not a noun pair", s))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Question {
    pub id: usize,
    pub stem: NounPair,
    pub answers: Vec<NounPair>,
    pub solution: usize,
}

impl Question {

    // if every pair is inverted the analogy should still hold
    pub fn inverted(&self) -> Question {
        Question {
            id: self.id,
            stem: self.stem.inverted(),
            answers: self.answers.iter().map(|a| a.inverted()).collect(),
            solution: self.solution,
        }
    }
}

pub struct SatData {}

impl SatData {

    // reads the raw multiple-choice file: after removing boilerplate, every question is
    // a stem line, five answer lines and the letter of the solution. Only questions whose
    // stem is tagged n:n are kept, numbered from 1.
    pub fn parse(lines: Lines, file_path: &Path) -> Result<Vec<Question>> {

        let boilerplate = Regex::new(r"^(#|ML:|KS type|190)")?;
        // (line number in the file, content)
        let mut kept: Vec<(usize, String)> = Vec::new();
        for (i, line) in lines.enumerate() {
            let line = line?;
            let line = line.trim_end_matches(['\r', '\n']);
            if !line.trim().is_empty() && !boilerplate.is_match(line) {
                kept.push((i + 1, line.to_string()));
            }
        }

        let mut questions = Vec::new();
        for record in kept.chunks(N_ANSWERS + 2) {

            let (first_no, first) = &record[0];
            if record.len() != N_ANSWERS + 2 {
                return Err(SensimError::malformed(file_path, *first_no, format!("truncated question starting with '{}'", first)));
            }
            if !first.ends_with("n:n") {
                continue;
            }

            let stem = SatData::pair_of(first, file_path, *first_no)?;
            let answers = record[1..=N_ANSWERS]
                .iter()
                .map(|(line_no, l)| SatData::pair_of(l, file_path, *line_no))
                .collect::<Result<Vec<NounPair>>>()?;

            // solution letter a..e to index 0..4
            let (letter_no, letter) = &record[N_ANSWERS + 1];
            let letter = letter.trim();
            let solution = match letter.as_bytes() {
                [c @ b'a'..=b'e'] => (c - b'a') as usize,
                _ => return Err(SensimError::malformed(file_path, *letter_no, format!("'{}' is not a solution letter", letter))),
            };

            questions.push(Question { id: questions.len() + 1, stem, answers, solution });
        }

        Ok(questions)
    }

    // `word1 word2 pos1:pos2`, the POS tag is dropped
    fn pair_of(line: &str, file_path: &Path, line_no: usize) -> Result<NounPair> {
        let mut words = line.split(' ');
        match (words.next(), words.next()) {
            (Some(first), Some(second)) => Ok(NounPair::new(first, second)),
            _ => Err(SensimError::malformed(file_path, line_no, format!("'{}' is not a word pair", line))),
        }
    }

    // every pair of the questions together with its inverse
    pub fn unique_pairs(questions: &[Question]) -> BTreeSet<NounPair> {

        let mut pairs = BTreeSet::new();
        for question in questions {
            for pair in std::iter::once(&question.stem).chain(question.answers.iter()) {
                pairs.insert(pair.inverted());
                pairs.insert(pair.clone());
            }
        }
        pairs
    }

    // `id \t solution \t stem \t answer1 .. answer5`
    pub fn write_questions<W: Write>(questions: &[Question], writer: W) -> Result<()> {

        let mut wrt = csv::WriterBuilder::new().delimiter(b'\t').has_headers(false).from_writer(writer);
        for question in questions {
            let mut record = vec![question.id.to_string(), question.solution.to_string(), question.stem.to_string()];
            record.extend(question.answers.iter().map(|a| a.to_string()));
            wrt.write_record(&record)?;
        }
        wrt.flush()?;
        Ok(())
    }

    pub fn read_questions(file_path: &Path) -> Result<Vec<Question>> {

        let mut rdr = csv::ReaderBuilder::new().delimiter(b'\t').has_headers(false).from_path(file_path)?;
        let mut questions = Vec::new();
        for (i, record) in rdr.records().enumerate() {

            let record = record?;
            let malformed = |message: String| SensimError::malformed(file_path, i + 1, message);
            if record.len() != N_ANSWERS + 3 {
                return Err(malformed(format!("expected {} columns, found {}", N_ANSWERS + 3, record.len())));
            }

            let id = record[0].parse::<usize>().map_err(|e| malformed(e.to_string()))?;
            let solution = record[1].parse::<usize>().map_err(|e| malformed(e.to_string()))?;
            let stem = record[2].parse::<NounPair>().map_err(malformed)?;
            let answers = (3..N_ANSWERS + 3)
                .map(|j| record[j].parse::<NounPair>().map_err(malformed))
                .collect::<Result<Vec<NounPair>>>()?;
            questions.push(Question { id, stem, answers, solution });
        }
        Ok(questions)
    }

    // `first \t second`
    pub fn write_pairs<W: Write>(pairs: &BTreeSet<NounPair>, writer: W) -> Result<()> {

        let mut wrt = csv::WriterBuilder::new().delimiter(b'\t').has_headers(false).from_writer(writer);
        for pair in pairs {
            wrt.write_record([&pair.first, &pair.second])?;
        }
        wrt.flush()?;
        Ok(())
    }

    pub fn read_pairs(file_path: &Path) -> Result<BTreeSet<NounPair>> {

        let mut pairs = BTreeSet::new();
        for (i, line) in files_handling::read_lines(file_path)?.enumerate() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            let fields = files_handling::split_fields(&line, 2, file_path, i + 1)?;
            pairs.insert(NounPair::new(fields[0], fields[1]));
        }
        Ok(pairs)
    }
}

/// Where the pair features come from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FeatureModel {
    /// noun pair vectors precomputed by the distributional pipeline
    #[default]
    Vectors,
    /// rows exported from the distributional thesaurus database
    Database,
}

impl FeatureModel {
    pub fn feature_file(&self) -> &'static str {
        match self {
            FeatureModel::Vectors => "features_from_vectors.tsv",
            FeatureModel::Database => "features_from_db.tsv",
        }
    }
}

/// Feature vectors by noun pair.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct FeatureTable {
    features: HashMap<NounPair, FeatureVector>,
}

impl FeatureTable {

    pub fn insert(&mut self, pair: NounPair, features: FeatureVector) {
        self.features.insert(pair, features);
    }

    // a pair counts as seen only when it has at least one feature
    pub fn get(&self, pair: &NounPair) -> Option<&FeatureVector> {
        self.features.get(pair).filter(|f| !f.is_empty())
    }

    pub fn has_features(&self, pair: &NounPair) -> bool {
        self.get(pair).is_some()
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    // `pair \t matched pair \t {"feature": weight, ..}`; a lone pair column means no features
    pub fn from_vector_records(lines: Lines, file_path: &Path) -> Result<FeatureTable> {

        let mut table = FeatureTable::default();
        for (i, line) in lines.enumerate() {

            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            let columns: Vec<&str> = line.split('\t').collect();
            let pair = columns[0].parse::<NounPair>().map_err(|e| SensimError::malformed(file_path, i + 1, e))?;
            let features = match columns.len() {
                3 => serde_json::from_str::<FeatureVector>(columns[2])?,
                1 => FeatureVector::new(),
                n => return Err(SensimError::malformed(file_path, i + 1, format!("expected 1 or 3 columns, found {}", n))),
            };
            table.insert(pair, features);
        }
        Ok(table)
    }

    // `pair \t summary \t (('word#NN', 'other#NN#feature', score), ..)`, the feature name
    // being whatever follows the last `#NN` of the second column
    pub fn from_database_export(lines: Lines, file_path: &Path) -> Result<FeatureTable> {

        let row = Regex::new(r#"\(\s*'[^']*'\s*,\s*'([^']*)'\s*,\s*([-+]?[0-9]*\.?[0-9]+(?:[eE][-+]?[0-9]+)?)"#)?;
        let feature = Regex::new(r".*#NN(.*)")?;

        let mut table = FeatureTable::default();
        for (i, line) in lines.enumerate() {

            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            let columns: Vec<&str> = line.split('\t').collect();
            let pair = columns[0].parse::<NounPair>().map_err(|e| SensimError::malformed(file_path, i + 1, e))?;

            let mut features = FeatureVector::new();
            if columns.len() == 3 {
                for caps in row.captures_iter(columns[2]) {
                    let score: f64 = caps[2].parse().map_err(|_| SensimError::malformed(file_path, i + 1, format!("bad score {}", &caps[2])))?;
                    if let Some(name) = feature.captures(&caps[1]) {
                        features.insert(name[1].to_string(), score);
                    }
                }
            }
            table.insert(pair, features);
        }
        Ok(table)
    }

    pub fn read(model: FeatureModel, file_path: &Path) -> Result<FeatureTable> {
        let lines = files_handling::read_lines(file_path)?;
        match model {
            FeatureModel::Vectors => FeatureTable::from_vector_records(lines, file_path),
            FeatureModel::Database => FeatureTable::from_database_export(lines, file_path),
        }
    }
}

pub struct VectorFeatures {}

impl VectorFeatures {

    // `{(627,53.0),(501,72.3)}` -> {"627": 53.0, "501": 72.3}
    pub fn parse_features(text: &str, pattern: &Regex) -> FeatureVector {

        let mut features = FeatureVector::new();
        for caps in pattern.captures_iter(text) {
            if let Ok(weight) = caps[2].trim().parse::<f64>() {
                features.insert(caps[1].trim().to_string(), weight);
            }
        }
        features
    }

    // streams the vector file (`id \t noun::@::noun \t {(feature,weight),..}`) and writes a typed
    // feature record for every SAT pair found. Returns the number of pairs found.
    pub fn extract<W: Write>(pairs: &BTreeSet<NounPair>, lines: Lines, file_path: &Path, writer: &mut W) -> Result<usize> {

        let pattern = Regex::new(r"\(([^,()]+),([^()]+)\)")?;
        let mut n_found = 0;

        for (i, line) in lines.enumerate() {

            let line = line?;
            if (i + 1) % 1000000 == 0 {
                log::info!("Number of vector entries parsed: {}", i + 1);
            }
            if line.is_empty() {
                continue;
            }

            let fields = files_handling::split_fields(&line, 3, file_path, i + 1)?;
            let pair = match fields[1].split_once(PAIR_SEPARATOR) {
                Some((first, second)) => NounPair::new(first, second),
                None => continue,
            };

            if pairs.contains(&pair) {
                let features = VectorFeatures::parse_features(fields[2], &pattern);
                writeln!(writer, "{}\t{}\t{}", pair, pair, serde_json::to_string(&features)?)?;
                n_found += 1;
            }
        }

        Ok(n_found)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Fallback {
    /// stay silent if unsure
    #[default]
    Abstain,
    /// guess uniformly among the answers
    Random,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Prediction {
    pub question: NounPair,
    pub answer: Option<NounPair>,
    pub predicted: Option<usize>,
    pub solution: usize,
}

impl Prediction {

    fn abstain(question: &Question) -> Prediction {
        Prediction { question: question.stem.clone(), answer: None, predicted: None, solution: question.solution }
    }
}

#[derive(Debug, Default, Clone, PartialEq)]
pub struct PredictionSummary {
    /// number of answers with features in the better direction, -1 when the stem is unseen
    pub answers_found: BTreeMap<i64, usize>,
    pub complete: usize,
    pub incomplete: usize,
}

impl Display for PredictionSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let counter: Vec<String> = self.answers_found.iter().map(|(k, v)| format!("{}: {}", k, v)).collect();
        writeln!(f, "Counter of number of answers found: {{{}}}", counter.join(", "))?;
        writeln!(f, "complete questions found in data: {}", self.complete)?;
        write!(f, "questions answered with incomplete data: {}", self.incomplete)
    }
}

pub struct Predictor<'a> {
    features: &'a FeatureTable,
    measure: Measure,
    fallback: Fallback,
    min_answers_found: usize,
}

impl<'a> Predictor<'a> {

    pub fn new(features: &'a FeatureTable, measure: Measure, fallback: Fallback, min_answers_found: usize) -> Predictor<'a> {
        Self { features, measure, fallback, min_answers_found }
    }

    fn n_answers_found(&self, question: &Question) -> usize {
        question.answers.iter().filter(|a| self.features.has_features(a)).count()
    }

    pub fn predict(&self, question: &Question, summary: &mut PredictionSummary) -> Prediction {

        let inverted = question.inverted();

        // neither the stem nor its inverse was seen, skip the whole question
        if !(self.features.has_features(&question.stem) || self.features.has_features(&inverted.stem)) {
            *summary.answers_found.entry(-1).or_insert(0) += 1;
            return Prediction::abstain(question);
        }

        let n_forward = self.n_answers_found(question);
        let n_inverted = self.n_answers_found(&inverted);
        let max_found = n_forward.max(n_inverted);
        *summary.answers_found.entry(max_found as i64).or_insert(0) += 1;

        if max_found < self.min_answers_found {
            return Prediction::abstain(question);
        }

        // follow the direction with more seen answers, the forward one on ties
        let chosen = if n_forward >= n_inverted { question } else { &inverted };

        let mut max_sim = 0.0;
        let mut best: Option<usize> = None;
        if let Some(q_features) = self.features.get(&chosen.stem) {
            for (idx, answer) in chosen.answers.iter().enumerate() {
                let a_features = match self.features.get(answer) {
                    Some(a_features) => a_features,
                    None => continue
                };
                let similarity = self.measure.score(q_features, a_features);
                if similarity > max_sim {
                    max_sim = similarity;
                    best = Some(idx);
                }
            }
        }

        if max_found == N_ANSWERS {
            summary.complete += 1;
        } else if best.is_some() {
            summary.incomplete += 1;
        }

        let predicted = match (best, self.fallback) {
            (Some(idx), _) => Some(idx),
            (None, Fallback::Abstain) => None,
            (None, Fallback::Random) => Some(rand::thread_rng().gen_range(0..chosen.answers.len())),
        };

        Prediction {
            question: question.stem.clone(),
            answer: predicted.map(|idx| chosen.answers[idx].clone()),
            predicted: predicted,
            solution: question.solution,
        }
    }

    pub fn predict_all(&self, questions: &[Question]) -> (Vec<Prediction>, PredictionSummary) {

        let mut summary = PredictionSummary::default();
        let predictions = questions.iter().map(|q| self.predict(q, &mut summary)).collect();
        (predictions, summary)
    }
}

// `question \t answer \t predicted \t solution`, `__` and -1 when unanswered
pub fn write_predictions<W: Write>(predictions: &[Prediction], writer: W) -> Result<()> {

    let mut wrt = csv::WriterBuilder::new().delimiter(b'\t').has_headers(false).from_writer(writer);
    for p in predictions {
        let answer = p.answer.as_ref().map_or(NO_ANSWER.to_string(), |a| a.to_string());
        let predicted = p.predicted.map_or(-1, |i| i as i64);
        wrt.write_record(&[p.question.to_string(), answer, predicted.to_string(), p.solution.to_string()])?;
    }
    wrt.flush()?;
    Ok(())
}

#[derive(Debug, Default, Clone, PartialEq)]
pub struct Loss {
    pub predicted: usize,
    pub correct: usize,
    pub wrong: Vec<Vec<String>>,
}

impl Loss {

    pub fn compute(file_path: &Path) -> Result<Loss> {

        let mut rdr = csv::ReaderBuilder::new().delimiter(b'\t').has_headers(false).from_path(file_path)?;
        let mut loss = Loss::default();

        for (i, record) in rdr.records().enumerate() {

            let record = record?;
            if record.len() != 4 {
                return Err(SensimError::malformed(file_path, i + 1, format!("expected 4 columns, found {}", record.len())));
            }
            let parse = |s: &str| s.trim().parse::<i64>().map_err(|e| SensimError::malformed(file_path, i + 1, e.to_string()));
            let y_pred = parse(&record[2])?;
            let y_true = parse(&record[3])?;

            if y_pred == -1 {
                continue;
            }
            loss.predicted += 1;
            if y_pred == y_true {
                loss.correct += 1;
            } else {
                loss.wrong.push(record.iter().map(|s| s.to_string()).collect());
            }
        }
        Ok(loss)
    }

    pub fn correctness(&self) -> Option<f64> {
        (self.predicted > 0).then(|| self.correct as f64 / self.predicted as f64)
    }

    pub fn zero_one_loss(&self) -> Option<f64> {
        (self.predicted > 0).then(|| self.wrong.len() as f64 / self.predicted as f64)
    }
}

impl Display for Loss {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {

        for row in &self.wrong {
            writeln!(f, "{}", row.join("\t"))?;
        }
        match (self.correctness(), self.zero_one_loss()) {
            (Some(correctness), Some(zero_one_loss)) => {
                writeln!(f, "correctness: {:.6}", correctness)?;
                writeln!(f, "zero-one loss: {:.6}", zero_one_loss)?;
                write!(f, "samples predicted: {}", self.predicted)
            },
            _ => write!(f, "Similarity could not be computed for lack of feature overlap.")
        }
    }
}

pub struct Sat {}

impl Sat {

    pub fn run(params: &Params, model: FeatureModel, measure: Measure, fallback: Fallback) -> Result<Loss> {

        let sat_file = params.sat_file("SAT-package-V3.txt");
        let pair_file = params.sat_file("pairs.tsv");
        let test_file = params.sat_file("test.tsv");
        let vector_file = params.sat_file("vectors.tsv");
        let feature_file = params.sat_file(model.feature_file());
        let prediction_file = params.sat_file("predictions.tsv");

        // select the noun-noun questions
        let questions = SatData::parse(files_handling::read_lines(&sat_file)?, &sat_file)?;
        SatData::write_questions(&questions, files_handling::create_output(&test_file)?)?;
        SatData::write_pairs(&SatData::unique_pairs(&questions), files_handling::create_output(&pair_file)?)?;
        log::info!("selected {} noun-noun questions", questions.len());

        // database features are exported beforehand, vector features are extracted here
        if model == FeatureModel::Vectors {
            let pairs = SatData::read_pairs(&pair_file)?;
            log::info!("number of incoming pairs: {}", pairs.len());
            let mut writer = files_handling::create_output(&feature_file)?;
            let n_found = VectorFeatures::extract(&pairs, files_handling::read_lines(&vector_file)?, &vector_file, &mut writer)?;
            writer.flush()?;
            log::info!("number of noun pairs found: {}", n_found);
        }

        let questions = SatData::read_questions(&test_file)?;
        log::info!("number of incoming questions: {}", questions.len());
        let features = FeatureTable::read(model, &feature_file)?;

        let predictor = Predictor::new(&features, measure, fallback, params.min_answers_found);
        let (predictions, summary) = predictor.predict_all(&questions);
        for line in summary.to_string().lines() {
            log::info!("{}", line);
        }
        write_predictions(&predictions, files_handling::create_output(&prediction_file)?)?;

        Loss::compute(&prediction_file)
    }
}
