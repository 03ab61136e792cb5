use flate2::read::GzDecoder;
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

///
/// Read every line of the input_file into memory
///
/// * `input_file` - file name--either gzipped or not
///
pub fn read_lines(input_file_path: &str) -> anyhow::Result<Vec<Box<str>>> {
    let buf: Box<dyn BufRead> = open_buf_reader(input_file_path)?;
    let mut lines = vec![];
    for x in buf.lines() {
        lines.push(x?.into_boxed_str());
    }
    Ok(lines)
}

///
/// Write every line into the output_file
///
/// * `lines` - anything we can display line by line
/// * `output_file` - file name--either gzipped or not
///
pub fn write_lines<T>(lines: &[T], output_file_path: &str) -> anyhow::Result<()>
where
    T: std::fmt::Display,
{
    mkdir(output_file_path)?;
    let mut buf = open_buf_writer(output_file_path)?;
    for line in lines {
        if let Err(e) = writeln!(buf, "{}", line) {
            if e.kind() == std::io::ErrorKind::BrokenPipe {
                return Ok(());
            } else {
                return Err(anyhow::anyhow!("unexpected error: {}", e));
            }
        }
    }
    buf.flush()?;
    Ok(())
}

///
/// Open a file for reading, and return a buffered reader
/// * `input_file` - file name--either gzipped or not
pub fn open_buf_reader(input_file: &str) -> anyhow::Result<Box<dyn BufRead>> {
    let ext = Path::new(input_file).extension().and_then(|x| x.to_str());
    let file = File::open(input_file)?;
    match ext {
        Some("gz") => Ok(Box::new(BufReader::new(GzDecoder::new(file)))),
        _ => Ok(Box::new(BufReader::new(file))),
    }
}

///
/// Open a file for writing, and return a buffered writer
/// * `output_file` - file name--either gzipped or not
pub fn open_buf_writer(output_file: &str) -> anyhow::Result<Box<dyn Write>> {
    // we can simply override with stdout
    if output_file.eq_ignore_ascii_case("stdout") {
        return Ok(Box::new(BufWriter::new(std::io::stdout())));
    }

    let ext = Path::new(output_file).extension().and_then(|x| x.to_str());
    match ext {
        Some("gz") => {
            let output_file = File::create(output_file)?;
            let encoder =
                flate2::write::GzEncoder::new(output_file, flate2::Compression::default());
            Ok(Box::new(BufWriter::new(encoder)))
        }
        _ => {
            let output_file = File::create(output_file)?;
            Ok(Box::new(BufWriter::new(output_file)))
        }
    }
}

///
/// Create the parent directory if needed
/// * `file` - file name
///
pub fn mkdir(file: &str) -> anyhow::Result<()> {
    if file.eq_ignore_ascii_case("stdout") {
        return Ok(());
    }
    if let Some(dir) = Path::new(file).parent() {
        if !dir.as_os_str().is_empty() {
            std::fs::create_dir_all(dir)?;
        }
    }
    Ok(())
}

/// Column delimiter implied by the file name: `.csv` (optionally
/// gzipped) gets a comma, everything else a tab.
pub fn delimiter_for(file: &str) -> &'static str {
    let lower = file.to_lowercase();
    let stem = lower.strip_suffix(".gz").unwrap_or(&lower);
    if stem.ends_with(".csv") {
        ","
    } else {
        "\t"
    }
}

/// `{prefix}.{suffix}` with a trailing `.` on the prefix tolerated
pub fn output_path(prefix: &str, suffix: &str) -> String {
    format!("{}.{}", prefix.trim_end_matches('.'), suffix)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_delimiter_for() {
        assert_eq!(delimiter_for("toy.csv"), ",");
        assert_eq!(delimiter_for("toy.CSV.gz"), ",");
        assert_eq!(delimiter_for("toy.tsv"), "\t");
        assert_eq!(delimiter_for("toy.txt.gz"), "\t");
    }

    #[test]
    fn test_gz_round_trip() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let file = dir.path().join("sub").join("lines.txt.gz");
        let file = file.to_str().ok_or(anyhow::anyhow!("path"))?;

        write_lines(&["a\t1", "b\t2"], file)?;
        let lines = read_lines(file)?;

        assert_eq!(lines.len(), 2);
        assert_eq!(lines[1].as_ref(), "b\t2");
        Ok(())
    }

    #[test]
    fn test_output_path() {
        assert_eq!(output_path("out/fit", "trace.tsv"), "out/fit.trace.tsv");
        assert_eq!(output_path("out/fit.", "posterior.json"), "out/fit.posterior.json");
    }
}
