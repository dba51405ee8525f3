// pipeline.rs: read records, parse them and draw one identifier per line
use memchr::memchr_iter;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use tracing::{debug, info, warn};

use crate::config::{PersonalizationMode, PipelineConfig};
use crate::error::{Result, RowKeyError};
use crate::identifier::entropy::EntropySource;
use crate::identifier::{Diagnostic, IdentifierGenerator};
use crate::tokenizer::{join_fields, parse_line_with};

/// Outcome of a pipeline run.
///
/// `identifiers[i]` belongs to data line `i + 1`. When `error` is set the run
/// stopped early and `identifiers` holds what was produced before the failure.
#[derive(Debug, Default)]
pub struct RunReport {
    pub identifiers: Vec<String>,
    pub lines: usize,
    pub header_skipped: bool,
    pub diagnostics: Vec<Diagnostic>,
    pub error: Option<RowKeyError>,
}

impl RunReport {
    fn failed(error: RowKeyError) -> Self {
        Self { error: Some(error), ..Self::default() }
    }

    pub fn is_complete(&self) -> bool {
        self.error.is_none()
    }
}

/// The string handed to the generator for one record.
pub fn personalization_source(raw: &str, fields: &[String], config: &PipelineConfig) -> String {
    match config.personalization {
        PersonalizationMode::Fields => join_fields(fields, &config.join_with),
        PersonalizationMode::Raw => raw.trim_end_matches(&['\r', '\n'][..]).to_string(),
    }
}

/// `line` without its `\n` or `\r\n` terminator, so an open quote at the end
/// of a record never captures it.
fn strip_terminator(line: &str) -> &str {
    match line.strip_suffix('\n') {
        Some(rest) => rest.strip_suffix('\r').unwrap_or(rest),
        None => line,
    }
}

pub fn run<R: BufRead>(reader: R, config: &PipelineConfig) -> RunReport {
    let mut generator = IdentifierGenerator::new(config.generator.clone());
    run_with_generator(reader, config, &mut generator, 0)
}

pub fn run_path<P: AsRef<Path>>(path: P, config: &PipelineConfig) -> RunReport {
    let path = path.as_ref();
    let capacity = if config.presize {
        match count_lines(path) {
            Ok(n) if config.skip_header => n.saturating_sub(1),
            Ok(n) => n,
            Err(err) => {
                debug!(path = %path.display(), error = %err, "line count failed");
                0
            }
        }
    } else {
        0
    };
    let file = match File::open(path) {
        Ok(f) => f,
        Err(err) => {
            warn!(path = %path.display(), error = %err, "cannot open input");
            return RunReport::failed(err.into());
        }
    };
    info!(path = %path.display(), "reading records");
    let mut generator = IdentifierGenerator::new(config.generator.clone());
    run_with_generator(BufReader::new(file), config, &mut generator, capacity)
}

/// Drive `reader` to the end (or the first read error) with a caller-owned generator.
pub fn run_with_generator<R: BufRead, E: EntropySource + Clone>(
    mut reader: R,
    config: &PipelineConfig,
    generator: &mut IdentifierGenerator<E>,
    capacity: usize,
) -> RunReport {
    let opts = config.parse_options();
    let mut report = RunReport { identifiers: Vec::with_capacity(capacity), ..RunReport::default() };
    let mut buf = String::new();

    if config.skip_header {
        match reader.read_line(&mut buf) {
            Ok(0) => {}
            Ok(_) => {
                report.header_skipped = true;
                debug!("header skipped");
            }
            Err(err) => {
                warn!(error = %err, "failed reading header");
                report.error = Some(err.into());
                return report;
            }
        }
    }

    loop {
        buf.clear();
        match reader.read_line(&mut buf) {
            Ok(0) => break,
            Ok(_) => {}
            Err(err) => {
                warn!(line = report.lines + 1, error = %err, "read failed, returning partial results");
                report.error = Some(err.into());
                break;
            }
        }
        report.lines += 1;
        let line = strip_terminator(&buf);
        let fields = parse_line_with(line, &opts);
        let source = personalization_source(line, &fields, config);
        report.identifiers.push(generator.generate(&source));
        for mut diag in generator.take_diagnostics() {
            diag.line = Some(report.lines);
            report.diagnostics.push(diag);
        }
    }

    info!(
        lines = report.lines,
        identifiers = report.identifiers.len(),
        diagnostics = report.diagnostics.len(),
        complete = report.error.is_none(),
        "run finished"
    );
    report
}

/// Number of lines in the file; a final line without a terminator counts.
pub fn count_lines<P: AsRef<Path>>(path: P) -> Result<usize> {
    let mut reader = BufReader::new(File::open(path)?);
    let mut count = 0usize;
    let mut last = None;
    loop {
        let chunk = reader.fill_buf()?;
        if chunk.is_empty() {
            break;
        }
        count += memchr_iter(b'\n', chunk).count();
        last = chunk.last().copied();
        let n = chunk.len();
        reader.consume(n);
    }
    if matches!(last, Some(b) if b != b'\n') {
        count += 1;
    }
    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identifier::entropy::testing::CountingEntropy;
    use crate::identifier::is_valid_identifier;
    use std::io::{self, Cursor, Read};

    struct BrokenAfter {
        inner: Cursor<Vec<u8>>,
        budget: usize,
    }

    impl Read for BrokenAfter {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            if self.budget == 0 {
                return Err(io::Error::new(io::ErrorKind::Other, "disk gone"));
            }
            let max = buf.len().min(self.budget);
            let n = self.inner.read(&mut buf[..max])?;
            self.budget -= n;
            Ok(n)
        }
    }

    #[test]
    fn test_personalization_source_modes() {
        let fields = vec!["10".to_string(), "AU".to_string(), "Australia".to_string()];
        let mut cfg = PipelineConfig::default();
        assert_eq!(personalization_source("10,AU,Australia\r\n", &fields, &cfg), "10AUAustralia");
        cfg.join_with = "\u{1f}".to_string();
        assert_eq!(personalization_source("", &fields, &cfg), "10\u{1f}AU\u{1f}Australia");
        cfg.personalization = PersonalizationMode::Raw;
        assert_eq!(personalization_source("10,AU,Australia\r\n", &fields, &cfg), "10,AU,Australia");
    }

    #[test]
    fn test_strip_terminator() {
        assert_eq!(strip_terminator("a,b\r\n"), "a,b");
        assert_eq!(strip_terminator("a,b\n"), "a,b");
        assert_eq!(strip_terminator("a,b"), "a,b");
        assert_eq!(strip_terminator("a\r,b\r\r\n"), "a\r,b\r");
    }

    #[test]
    fn test_unterminated_quote_ignores_line_terminator() {
        let cfg = PipelineConfig { skip_header: false, ..PipelineConfig::default() };
        let draw = |data: &str| {
            let mut generator =
                IdentifierGenerator::with_entropy(cfg.generator.clone(), CountingEntropy::default());
            run_with_generator(Cursor::new(data.to_string()), &cfg, &mut generator, 0).identifiers
        };
        let last = draw("10,\"AU");
        assert_eq!(draw("10,\"AU\n"), last);
        assert_eq!(draw("10,\"AU\r\n"), last);

        let mut reference =
            IdentifierGenerator::with_entropy(cfg.generator.clone(), CountingEntropy::default());
        assert_eq!(last, vec![reference.generate("10AU")]);
    }

    #[test]
    fn test_run_skips_header_and_keeps_order() {
        let data = "id,code,name\n10,AU,Australia\n11,NZ,\"New Zealand\"\r\n12,FJ,Fiji";
        let report = run(Cursor::new(data), &PipelineConfig::default());
        assert!(report.is_complete());
        assert!(report.header_skipped);
        assert_eq!(report.lines, 3);
        assert_eq!(report.identifiers.len(), 3);
        assert!(report.identifiers.iter().all(|id| is_valid_identifier(id)));
    }

    #[test]
    fn test_run_without_header() {
        let cfg = PipelineConfig { skip_header: false, ..PipelineConfig::default() };
        let report = run(Cursor::new("a\nb\n"), &cfg);
        assert!(!report.header_skipped);
        assert_eq!(report.identifiers.len(), 2);
    }

    #[test]
    fn test_run_empty_input() {
        let report = run(Cursor::new(""), &PipelineConfig::default());
        assert!(report.is_complete());
        assert!(!report.header_skipped);
        assert!(report.identifiers.is_empty());
    }

    #[test]
    fn test_read_error_returns_partial_results() {
        let data = b"h\nr1\nr2\nr3 is a long line that will not fit in the budget\n".to_vec();
        let reader = io::BufReader::with_capacity(4, BrokenAfter { inner: Cursor::new(data), budget: 8 });
        let report = run(reader, &PipelineConfig::default());
        assert!(!report.is_complete());
        assert!(matches!(report.error, Some(RowKeyError::Io(_))));
        assert_eq!(report.identifiers.len(), 2);
        assert_eq!(report.lines, 2);
    }

    #[test]
    fn test_fallback_diagnostics_carry_line_numbers() {
        let mut cfg = PipelineConfig::default();
        cfg.generator.strength_bits = 1024;
        let report = run(Cursor::new("h\na\nb\n"), &cfg);
        assert!(report.is_complete());
        assert_eq!(report.identifiers.len(), 2);
        let lines: Vec<Option<usize>> = report.diagnostics.iter().map(|d| d.line).collect();
        assert_eq!(lines, vec![Some(1), Some(2)]);
    }
}
