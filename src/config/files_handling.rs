
use crate::errors::{Result, SensimError};
use flate2::read::MultiGzDecoder;
use std::borrow::Cow;
use std::fs::{self, File};
use std::io::{self, BufRead, BufReader, BufWriter, Write};
use std::path::Path;

pub type Lines = io::Lines<Box<dyn BufRead>>;

/// Raw lines, for inputs that are not guaranteed to be utf-8.
pub type ByteLines = io::Split<Box<dyn BufRead>>;


// buffered reader over a plain or `.gz` file; concatenated gzip members are read through
pub fn open_reader(file_path: &Path) -> Result<Box<dyn BufRead>> {

    let f = File::open(file_path)?;
    let reader: Box<dyn BufRead> = if is_gzipped(file_path) {
        Box::new(BufReader::new(MultiGzDecoder::new(f)))
    } else {
        Box::new(BufReader::new(f))
    };
    Ok(reader)
}

pub fn read_lines(file_path: &Path) -> Result<Lines> {
    Ok(open_reader(file_path)?.lines())
}

pub fn read_byte_lines(file_path: &Path) -> Result<ByteLines> {
    Ok(open_reader(file_path)?.split(b'\n'))
}

// drops a trailing `\r`; invalid utf-8 sequences become U+FFFD
pub fn decode_line(line: &[u8]) -> Cow<'_, str> {
    String::from_utf8_lossy(line.strip_suffix(b"\r").unwrap_or(line))
}

pub fn is_gzipped(file_path: &Path) -> bool {
    file_path.extension().is_some_and(|e| e == "gz")
}

// creates the output file and all missing parent folders
pub fn create_output(file_path: &Path) -> Result<BufWriter<File>> {

    if let Some(parent) = file_path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    Ok(BufWriter::new(File::create(file_path)?))
}

// splits a tab separated record and checks its number of columns
pub fn split_fields<'a>(line: &'a str, expected: usize, file_path: &Path, line_no: usize) -> Result<Vec<&'a str>> {

    let fields: Vec<&str> = line.trim_end_matches(['\r', '\n']).split('\t').collect();
    if fields.len() != expected {
        return Err(SensimError::malformed(
            file_path,
            line_no,
            format!("expected {} tab separated columns, found {}", expected, fields.len()),
        ));
    }
    Ok(fields)
}

pub fn read_input<R: ReadFile>(file_path: &Path) -> Result<R> {
    let input = R::read_file(file_path)?;
    Ok(input)
}

pub fn save_output<S: SaveFile>(file_path: &Path, item: &S) -> Result<()> {

    let mut f = create_output(file_path)?;
    item.save_file(&mut f)?;
    f.flush()?;
    return Ok(())
}

pub trait ReadFile: Sized {
    fn read_file(file_path: &Path) -> Result<Self>;
}

pub trait SaveFile {
    fn save_file(&self, writer: &mut dyn Write) -> Result<()>;
}


#[cfg(test)]
mod tests {

    use super::{decode_line, read_byte_lines, read_lines, split_fields};
    use flate2::{write::GzEncoder, Compression};
    use std::io::Write;
    use std::path::Path;

    #[test]
    fn gzip_lines_test() {

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sims.gz");
        let mut writer = GzEncoder::new(std::fs::File::create(&path).unwrap(), Compression::default());
        writer.write_all(b"tree\tbeet\t12.5\nsun\tmoon\t3.0\n").unwrap();
        writer.finish().unwrap();

        let lines: Vec<String> = read_lines(&path).unwrap().map(|l| l.unwrap()).collect();
        assert_eq!(lines, vec!["tree\tbeet\t12.5", "sun\tmoon\t3.0"]);
    }

    #[test]
    fn gzip_members_test() {

        // hadoop part files are often concatenated as they are
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sims.gz");
        let mut first = GzEncoder::new(std::fs::File::create(&path).unwrap(), Compression::default());
        first.write_all(b"tree\tbeet\t12.5\n").unwrap();
        let mut second = GzEncoder::new(first.finish().unwrap(), Compression::default());
        second.write_all(b"sun\tmoon\t30.0\n").unwrap();
        second.finish().unwrap();

        let lines: Vec<String> = read_lines(&path).unwrap().map(|l| l.unwrap()).collect();
        assert_eq!(lines, vec!["tree\tbeet\t12.5", "sun\tmoon\t30.0"]);
        assert_eq!(read_byte_lines(&path).unwrap().count(), 2);
    }

    #[test]
    fn decode_line_test() {

        assert_eq!(decode_line(b"tree\tbeet\r"), "tree\tbeet");
        assert_eq!(decode_line(b"caf\xe9"), "caf\u{FFFD}");
    }

    #[test]
    fn split_fields_test() {

        let path = Path::new("input.tsv");
        assert_eq!(split_fields("a\tb\tc\r", 3, path, 1).unwrap(), vec!["a", "b", "c"]);
        let err = split_fields("a\tb", 3, path, 7).unwrap_err();
        assert!(err.to_string().contains("input.tsv:7"));
    }
}
