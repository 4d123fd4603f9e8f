use flate2::read::MultiGzDecoder;
use std::fs::File;
use std::io::{self, BufRead, BufReader, Read, Result, Seek};
use std::path::Path;

pub fn open_file<P: AsRef<Path>>(path: P) -> io::Result<File> {
    File::open(&path).map_err(|e| {
        if e.kind() == io::ErrorKind::NotFound {
            io::Error::new(e.kind(), format!("File not found: {:?}", path.as_ref()))
        } else {
            e
        }
    })
}

pub fn is_gzipped(file: &mut File) -> Result<bool> {
    let mut buffer = [0; 2];
    let mut filled = 0;
    while filled < buffer.len() {
        let n = file.read(&mut buffer[filled..])?;
        if n == 0 {
            break;
        }
        filled += n;
    }
    file.rewind()?;
    Ok(filled == 2 && buffer == [0x1F, 0x8B])
}

/// Opens a dump file for line-oriented reading, decompressing it on the fly
/// when it carries the gzip magic bytes.
pub fn dump_reader<P: AsRef<Path>>(path: P) -> Result<Box<dyn BufRead + Send>> {
    let mut file = open_file(path)?;
    if is_gzipped(&mut file)? {
        Ok(Box::new(BufReader::new(MultiGzDecoder::new(file))))
    } else {
        Ok(Box::new(BufReader::new(file)))
    }
}

/// Strips trailing whitespace and control characters (`\r`, `\n`, stray tabs).
pub fn trim_line_end(line: &str) -> &str {
    line.trim_end_matches(|c: char| c.is_whitespace() || c.is_control())
}

/// Splits an NCBI `.dmp` row into its logical columns.
///
/// Rows look like `2\t|\tBacteria\t|\t\t|\tscientific name\t|`; the trailing
/// `\t|` is removed before splitting so the last column comes back clean and
/// empty columns keep their position. Rows without any `\t|` separator are
/// plain tab-delimited and split on every tab.
pub fn split_dump_fields(line: &str) -> Vec<&str> {
    let line = trim_line_end(line);
    if !line.contains("\t|") {
        return line.split('\t').collect();
    }
    let line = line.strip_suffix("\t|").unwrap_or(line);
    line.split("\t|\t").collect()
}

/// Non-empty tab-separated tokens; `|` column separators come back as tokens.
pub fn tab_tokens(line: &str) -> impl Iterator<Item = &str> {
    trim_line_end(line).split('\t').filter(|token| !token.is_empty())
}

/// Lenient unsigned parse in the spirit of C `atoi`: surrounding whitespace
/// is ignored and anything that is not a number yields 0.
pub fn parse_u64_or_zero(field: &str) -> u64 {
    field.trim().parse::<u64>().unwrap_or(0)
}

pub fn format_bytes(size: f64) -> String {
    let suffixes = ["B", "KB", "MB", "GB", "TB", "PB", "EB"];
    let mut size = size;
    let mut current_suffix = &suffixes[0];

    for suffix in &suffixes[1..] {
        if size >= 1024.0 {
            current_suffix = suffix;
            size /= 1024.0;
        } else {
            break;
        }
    }

    format!("{:.2}{}", size, current_suffix)
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::write::GzEncoder;
    use flate2::Compression;
    use std::io::Write;

    #[test]
    fn test_split_dump_fields() {
        let fields = split_dump_fields("2\t|\tBacteria\t|\tBacteria <bacteria>\t|\tscientific name\t|\n");
        assert_eq!(
            fields,
            ["2", "Bacteria", "Bacteria <bacteria>", "scientific name"]
        );

        // empty unique name keeps the class in the fourth column
        let fields = split_dump_fields("562\t|\tEscherichia coli\t|\t\t|\tscientific name\t|");
        assert_eq!(fields[3], "scientific name");
        assert_eq!(fields[2], "");

        let fields = split_dump_fields("562\tEscherichia coli\t\tscientific name\n");
        assert_eq!(fields, ["562", "Escherichia coli", "", "scientific name"]);
    }

    #[test]
    fn test_tab_tokens() {
        let tokens: Vec<_> = tab_tokens("562\t|\t561\t|\tspecies\t|\n").collect();
        assert_eq!(tokens, ["562", "|", "561", "|", "species", "|"]);
        let tokens: Vec<_> = tab_tokens("562\t\tspecies\t561").collect();
        assert_eq!(tokens, ["562", "species", "561"]);
    }

    #[test]
    fn test_trim_line_end() {
        assert_eq!(trim_line_end("NC_000913\r\n"), "NC_000913");
        assert_eq!(trim_line_end("  12 \t\n"), "  12");
        assert_eq!(trim_line_end("\r\n"), "");
    }

    #[test]
    fn test_parse_u64_or_zero() {
        assert_eq!(parse_u64_or_zero(" 562 "), 562);
        assert_eq!(parse_u64_or_zero("abc"), 0);
        assert_eq!(parse_u64_or_zero(""), 0);
    }

    #[test]
    fn test_dump_reader_handles_gzip() {
        let dir = tempfile::tempdir().unwrap();
        let plain = dir.path().join("plain.dmp");
        let gz = dir.path().join("packed.dmp");
        std::fs::write(&plain, "5\t100\n").unwrap();

        let mut encoder = GzEncoder::new(File::create(&gz).unwrap(), Compression::default());
        encoder.write_all(b"5\t100\n").unwrap();
        encoder.finish().unwrap();

        for path in [&plain, &gz] {
            let lines: Vec<String> = dump_reader(path).unwrap().lines().map(|l| l.unwrap()).collect();
            assert_eq!(lines, ["5\t100"]);
        }
    }

    #[test]
    fn test_open_file_names_missing_path() {
        let err = open_file("/definitely/not/here.dmp").unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::NotFound);
        assert!(err.to_string().contains("here.dmp"));
    }

    #[test]
    fn test_format_bytes() {
        assert_eq!(format_bytes(512.0), "512.00B");
        assert_eq!(format_bytes(2048.0), "2.00KB");
    }
}
