
pub mod files_handling;

use crate::errors::{Result, SensimError};
use serde_json::Value;
use std::{fmt::Display, fs::File, io::BufReader, path::{Path, PathBuf}};


#[derive(Clone, Debug)]
pub struct Params {
    pub base_dir: PathBuf,
    pub bless_dir: PathBuf,
    pub clust_dir: PathBuf,
    pub sat_dir: PathBuf,
    pub wacky_dir: PathBuf,
    pub max_rank: usize,
    pub min_cluster_size: usize,
    pub cluster_size_step: usize,
    pub min_answers_found: usize,
}

impl Params {

    pub fn bless_file(&self, name: &str) -> PathBuf {
        self.bless_dir.join(name)
    }

    pub fn clust_file(&self, name: &str) -> PathBuf {
        self.clust_dir.join(name)
    }

    pub fn sat_file(&self, name: &str) -> PathBuf {
        self.sat_dir.join(name)
    }
}

impl Display for Params {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "using params:
        base_dir: {}
        bless_dir: {}
        clust_dir: {}
        sat_dir: {}
        wacky_dir: {}
        max_rank: {}
        min_cluster_size: {}
        cluster_size_step: {}
        min_answers_found: {}",
        self.base_dir.display(), self.bless_dir.display(), self.clust_dir.display(), self.sat_dir.display(),
        self.wacky_dir.display(), self.max_rank, self.min_cluster_size, self.cluster_size_step, self.min_answers_found)
    }
}

pub struct Config {
    params: Params
}

impl Config {

    pub fn get_params(&self) -> Params {
        return self.params.clone()
    }

    pub fn new(config_file: Option<&Path>, base_dir: &Path) -> Result<Config> {

        // without a json file every parameter takes its default, rooted at `base_dir`
        let json: Value = match config_file {
            Some(config_file) => {
                let f = BufReader::new(File::open(config_file)?);
                serde_json::from_reader(f)?
            },
            None => Value::Object(serde_json::Map::new())
        };

        if !json.is_object() {
            return Err(SensimError::invalid_config("config file should hold a json object"));
        }

        Ok(Self { params: Config::from_json(&json, base_dir)? })
    }

    fn from_json(json: &Value, base_dir: &Path) -> Result<Params> {

        // the base directory given in json wins over the command line / environment one
        let base_dir = match json.get("base_dir") {
            Some(base_dir) => PathBuf::from(base_dir.as_str().ok_or_else(|| SensimError::invalid_config("cannot cast base_dir to string"))?),
            None => base_dir.to_path_buf()
        };

        let bless_dir = Config::dir_or(json, "bless_dir", base_dir.join("bless"))?;
        let clust_dir = Config::dir_or(json, "clust_dir", base_dir.join("clust"))?;
        let sat_dir = Config::dir_or(json, "sat_dir", base_dir.join("sat"))?;
        let wacky_dir = Config::dir_or(json, "wacky_dir", base_dir.join("wacky"))?;

        let params = Params {
            base_dir: base_dir,
            bless_dir: bless_dir,
            clust_dir: clust_dir,
            sat_dir: sat_dir,
            wacky_dir: wacky_dir,
            max_rank: Config::usize_or(json, "max_rank", 50)?,
            min_cluster_size: Config::usize_or(json, "min_cluster_size", 1)?,
            cluster_size_step: Config::usize_or(json, "cluster_size_step", 5)?,
            min_answers_found: Config::usize_or(json, "min_answers_found", 1)?,
        };

        if params.cluster_size_step == 0 {
            return Err(SensimError::invalid_config("cluster_size_step should be positive"));
        }

        Ok(params)
    }

    fn dir_or(json: &Value, key: &str, default: PathBuf) -> Result<PathBuf> {
        match json.get(key) {
            Some(dir) => match dir.as_str() {
                Some(dir) => Ok(PathBuf::from(dir)),
                None => Err(SensimError::invalid_config(format!("cannot cast {} to string", key)))
            },
            None => Ok(default)
        }
    }

    fn usize_or(json: &Value, key: &str, default: usize) -> Result<usize> {
        match json.get(key) {
            Some(value) => match value.as_u64() {
                Some(value) => Ok(value as usize),
                None => Err(SensimError::invalid_config(format!("given {} is not a non-negative integer", key)))
            },
            None => Ok(default)
        }
    }
}


#[cfg(test)]
mod tests {

    use super::Config;
    use std::io::Write;
    use std::path::Path;

    #[test]
    fn defaults_test() {

        let params = Config::new(None, Path::new("data")).unwrap().get_params();
        assert_eq!(params.clust_dir, Path::new("data").join("clust"));
        assert_eq!(params.sat_file("pairs.tsv"), Path::new("data").join("sat").join("pairs.tsv"));
        assert_eq!(params.max_rank, 50);
        assert_eq!(params.min_cluster_size, 1);
        assert_eq!(params.cluster_size_step, 5);
    }

    #[test]
    fn json_overrides_test() {

        let mut f = tempfile::NamedTempFile::new().unwrap();
        write!(f, r#"{{"base_dir": "/srv/sensim", "sat_dir": "/tmp/sat", "max_rank": 10}}"#).unwrap();

        let params = Config::new(Some(f.path()), Path::new(".")).unwrap().get_params();
        assert_eq!(params.bless_dir, Path::new("/srv/sensim/bless"));
        assert_eq!(params.sat_dir, Path::new("/tmp/sat"));
        assert_eq!(params.max_rank, 10);
        assert_eq!(params.min_answers_found, 1);
    }

    #[test]
    fn rejects_non_numeric_test() {

        let mut f = tempfile::NamedTempFile::new().unwrap();
        write!(f, r#"{{"max_rank": "fifty"}}"#).unwrap();
        assert!(Config::new(Some(f.path()), Path::new(".")).is_err());
    }
}
