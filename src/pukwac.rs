
use crate::config::files_handling;
use crate::errors::Result;
use std::fs;
use std::io::{BufRead, Write};
use std::path::{Path, PathBuf};

/// Separates consecutive token lines within one output sentence.
pub const TOKEN_SEPARATOR: &[u8] = b"\t:::::\t";


pub struct Corpus {}

impl Corpus {

    fn is_markup(line: &[u8]) -> bool {
        line.starts_with(b"<text id=\"ukwac:") || line.starts_with(b"<s>")
    }

    // converts a PukWac stream to one sentence per line, each token line of the sentence
    // joined by `TOKEN_SEPARATOR`. Works on raw bytes since the corpus is not guaranteed utf-8.
    // Returns the number of sentence openings seen.
    pub fn reformat<R: BufRead, W: Write>(reader: R, writer: &mut W) -> Result<usize> {

        let mut sentence: Vec<Vec<u8>> = Vec::new();
        let mut n_sentences = 0;

        for line in reader.split(b'\n') {

            let mut line = line?;
            if line.last() == Some(&b'\r') {
                line.pop();
            }

            if Corpus::is_markup(&line) {
                n_sentences += 1;
                if n_sentences % 100000 == 0 {
                    log::info!("prepared {} sentences", n_sentences);
                }
                continue;
            } else if line == b"</text>" {
                continue;
            } else if line == b"</s>" {
                writer.write_all(&sentence.join(TOKEN_SEPARATOR))?;
                writer.write_all(b"\n")?;
                sentence.clear();
            } else {
                sentence.push(line);
            }
        }

        Ok(n_sentences)
    }

    // every `.gz` file of `input_dir` becomes an uncompressed file of the same name in `output_dir`
    pub fn run(input_dir: &Path, output_dir: &Path) -> Result<Vec<PathBuf>> {

        let mut inputs: Vec<PathBuf> = fs::read_dir(input_dir)?
            .map(|entry| entry.map(|e| e.path()))
            .collect::<std::io::Result<Vec<PathBuf>>>()?;
        inputs.retain(|p| p.is_file() && files_handling::is_gzipped(p));
        inputs.sort();

        let mut outputs = Vec::new();
        for input in inputs {

            let output = match input.file_stem() {
                Some(stem) => output_dir.join(stem),
                None => continue
            };
            log::info!("reformatting {} into {}", input.display(), output.display());

            let reader = files_handling::open_reader(&input)?;
            let mut writer = files_handling::create_output(&output)?;
            let n_sentences = Corpus::reformat(reader, &mut writer)?;
            writer.flush()?;

            log::info!("finished {}, {} sentences", input.display(), n_sentences);
            outputs.push(output);
        }

        Ok(outputs)
    }
}


#[cfg(test)]
mod tests {

    use super::Corpus;
    use flate2::{write::GzEncoder, Compression};
    use std::io::Write;

    const SAMPLE: &[u8] = b"<text id=\"ukwac:http://example.org\">\n<s>\nThe\tthe\tDT\ndog\tdog\tNN\n</s>\n<s>\nbarks\tbark\tVVZ\n</s>\n</text>\n";

    #[test]
    fn reformat_test() {

        let mut out: Vec<u8> = Vec::new();
        let n = Corpus::reformat(SAMPLE, &mut out).unwrap();

        assert_eq!(n, 3);
        assert_eq!(out, b"The\tthe\tDT\t:::::\tdog\tdog\tNN\nbarks\tbark\tVVZ\n".to_vec());
    }

    #[test]
    fn keeps_non_utf8_bytes_test() {

        let input: &[u8] = b"<s>\ncaf\xe9\tcaf\xe9\tNN\n</s>\n";
        let mut out: Vec<u8> = Vec::new();
        Corpus::reformat(input, &mut out).unwrap();
        assert_eq!(out, b"caf\xe9\tcaf\xe9\tNN\n".to_vec());
    }

    #[test]
    fn directory_run_test() {

        let input_dir = tempfile::tempdir().unwrap();
        let output_dir = tempfile::tempdir().unwrap();

        let mut gz = GzEncoder::new(std::fs::File::create(input_dir.path().join("part1.xml.gz")).unwrap(), Compression::default());
        gz.write_all(SAMPLE).unwrap();
        gz.finish().unwrap();
        std::fs::write(input_dir.path().join("README"), b"ignored").unwrap();

        let outputs = Corpus::run(input_dir.path(), output_dir.path()).unwrap();
        assert_eq!(outputs, vec![output_dir.path().join("part1.xml")]);

        let written = std::fs::read(&outputs[0]).unwrap();
        assert_eq!(written, b"The\tthe\tDT\t:::::\tdog\tdog\tNN\nbarks\tbark\tVVZ\n".to_vec());
    }
}
