use ndarray::Array1;
use std::collections::{BTreeMap, BTreeSet};
use std::str::FromStr;

/// Contextual feature -> weight (e.g. an LMI score) of one noun pair.
pub type FeatureVector = BTreeMap<String, f64>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Measure {
    /// number of shared features
    #[default]
    Overlap,
    /// sum of weight products over shared features
    DotProduct,
    /// one minus the cosine distance of the two weight vectors
    Cosine,
}

impl FromStr for Measure {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "overlap" => Ok(Measure::Overlap),
            "dotproduct" | "dot" => Ok(Measure::DotProduct),
            "cosine" => Ok(Measure::Cosine),
            other => Err(format!("unrecognized similarity measure {}", other)),
        }
    }
}

impl Measure {

    pub fn score(&self, question: &FeatureVector, answer: &FeatureVector) -> f64 {
        match self {
            Measure::Overlap => Similarity::shared_features(question, answer).len() as f64,
            Measure::DotProduct => Similarity::sparse_dot(question, answer),
            Measure::Cosine => Similarity::cosine(question, answer),
        }
    }
}

pub struct Similarity {}

impl Similarity {

    pub fn shared_features<'a>(q: &'a FeatureVector, a: &'a FeatureVector) -> BTreeSet<&'a str> {
        q.keys().filter(|k| a.contains_key(*k)).map(|k| k.as_str()).collect()
    }

    pub fn sparse_dot(q: &FeatureVector, a: &FeatureVector) -> f64 {
        Similarity::shared_features(q, a).iter().map(|f| q[*f] * a[*f]).sum()
    }

    // lays both sparse vectors out on the union of their features
    pub fn densify(q: &FeatureVector, a: &FeatureVector) -> (Array1<f64>, Array1<f64>) {

        let vocabulary: BTreeSet<&String> = q.keys().chain(a.keys()).collect();
        let q_vec: Array1<f64> = vocabulary.iter().map(|f| *q.get(*f).unwrap_or(&0.0)).collect();
        let a_vec: Array1<f64> = vocabulary.iter().map(|f| *a.get(*f).unwrap_or(&0.0)).collect();
        (q_vec, a_vec)
    }

    // a zero vector has no direction, it scores 0
    pub fn cosine(q: &FeatureVector, a: &FeatureVector) -> f64 {

        let (q_vec, a_vec) = Similarity::densify(q, a);
        let norms = q_vec.dot(&q_vec).sqrt() * a_vec.dot(&a_vec).sqrt();
        if norms == 0.0 {
            return 0.0;
        }
        q_vec.dot(&a_vec) / norms
    }
}


#[cfg(test)]
mod tests {

    use super::{FeatureVector, Measure, Similarity};

    fn features(items: &[(&str, f64)]) -> FeatureVector {
        items.iter().map(|(k, v)| (k.to_string(), *v)).collect()
    }

    #[test]
    fn measures_test() {

        let q = features(&[("#prep_in", 2.0), ("#nsubj", 1.0), ("#amod", 4.0)]);
        let a = features(&[("#prep_in", 3.0), ("#amod", 0.5), ("#dobj", 7.0)]);

        assert_eq!(Measure::Overlap.score(&q, &a), 2.0);
        assert_eq!(Measure::DotProduct.score(&q, &a), 2.0 * 3.0 + 4.0 * 0.5);

        // union order: #amod, #dobj, #nsubj, #prep_in
        let (q_vec, a_vec) = Similarity::densify(&q, &a);
        assert_eq!(q_vec.to_vec(), vec![4.0, 0.0, 1.0, 2.0]);
        assert_eq!(a_vec.to_vec(), vec![0.5, 7.0, 0.0, 3.0]);

        let expected = 8.0 / (21.0f64.sqrt() * 58.25f64.sqrt());
        assert!((Measure::Cosine.score(&q, &a) - expected).abs() < 1e-12);
    }

    #[test]
    fn cosine_edge_cases_test() {

        let q = features(&[("x", 1.0), ("y", 1.0)]);
        assert!((Similarity::cosine(&q, &q) - 1.0).abs() < 1e-12);
        assert_eq!(Similarity::cosine(&q, &features(&[("z", 5.0)])), 0.0);
        assert_eq!(Similarity::cosine(&q, &features(&[("x", 0.0)])), 0.0);
    }

    #[test]
    fn parse_measure_test() {

        assert_eq!("cosine".parse::<Measure>().unwrap(), Measure::Cosine);
        assert_eq!("DotProduct".parse::<Measure>().unwrap(), Measure::DotProduct);
        assert!("jaccard".parse::<Measure>().is_err());
    }
}
