use std::io::{Cursor, Write};

use rowkey_core::{
    count_lines, generate_identifier, is_valid_identifier, run_path, run_with_generator,
    EntropySource, GeneratorConfig, IdentifierGenerator, PersonalizationMode, PipelineConfig,
    RowKeyError,
};
use tempfile::NamedTempFile;

/// Deterministic entropy so identifiers can be compared line by line.
#[derive(Clone)]
struct FixedEntropy(u8);

impl EntropySource for FixedEntropy {
    fn fill(&mut self, dest: &mut [u8]) -> rowkey_core::Result<()> {
        for b in dest.iter_mut() {
            *b = self.0;
            self.0 = self.0.wrapping_add(7);
        }
        Ok(())
    }
}

fn write_csv(contents: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().expect("temp file");
    file.write_all(contents.as_bytes()).expect("write csv");
    file.flush().expect("flush");
    file
}

const CUSTOMERS: &str = "id,country,name\n\
10,AU,Australia\n\
11,NZ,\"New Zealand\"\n\
12,US,\"United States, The\"\n\
13,GB,\"Great \"\"Britain\"\"\"\n";

#[test]
fn identifiers_follow_input_order() {
    let config = PipelineConfig::default();
    let mut generator = IdentifierGenerator::with_entropy(config.generator.clone(), FixedEntropy(3));
    let report = run_with_generator(Cursor::new(CUSTOMERS), &config, &mut generator, 0);
    assert!(report.is_complete());
    assert_eq!(report.lines, 4);

    let mut reference = IdentifierGenerator::with_entropy(config.generator.clone(), FixedEntropy(3));
    let expected: Vec<String> = ["10AUAustralia", "11NZNew Zealand", "12USUnited States, The", "13GBGreat \"Britain\""]
        .iter()
        .map(|source| reference.generate(source))
        .collect();
    assert_eq!(report.identifiers, expected);
}

#[test]
fn run_path_reads_file_and_skips_header() {
    let file = write_csv(CUSTOMERS);
    let report = run_path(file.path(), &PipelineConfig::default());
    assert!(report.is_complete(), "unexpected error: {:?}", report.error);
    assert!(report.header_skipped);
    assert_eq!(report.identifiers.len(), 4);
    assert!(report.identifiers.iter().all(|id| is_valid_identifier(id)));
}

#[test]
fn run_path_with_presize_and_no_header() {
    let file = write_csv("a;b\r\nc;d\r\ne;f");
    let config = PipelineConfig {
        separator: ';',
        skip_header: false,
        presize: true,
        personalization: PersonalizationMode::Raw,
        ..PipelineConfig::default()
    };
    assert_eq!(count_lines(file.path()).expect("count"), 3);
    let report = run_path(file.path(), &config);
    assert_eq!(report.lines, 3);
    assert_eq!(report.identifiers.len(), 3);
}

#[test]
fn missing_file_yields_empty_collection_and_error() {
    let dir = tempfile::tempdir().expect("tempdir");
    let report = run_path(dir.path().join("absent.csv"), &PipelineConfig::default());
    assert!(report.identifiers.is_empty());
    assert!(matches!(report.error, Some(RowKeyError::Io(_))));
}

#[test]
fn invalid_utf8_stops_with_partial_results() {
    let mut file = NamedTempFile::new().expect("temp file");
    file.write_all(b"h\nok,1\nbad,\xff\xfe\nlater,2\n").expect("write");
    file.flush().expect("flush");
    let report = run_path(file.path(), &PipelineConfig::default());
    assert_eq!(report.identifiers.len(), 1);
    assert!(report.error.is_some());
}

#[test]
fn unsupported_generator_config_does_not_abort_batch() {
    let file = write_csv(CUSTOMERS);
    let config = PipelineConfig {
        generator: GeneratorConfig { strength_bits: 384, ..GeneratorConfig::default() },
        ..PipelineConfig::default()
    };
    let report = run_path(file.path(), &config);
    assert!(report.is_complete());
    assert_eq!(report.identifiers.len(), 4);
    assert_eq!(report.diagnostics.len(), 4);
    assert!(report.identifiers.iter().all(|id| is_valid_identifier(id)));
}

#[test]
fn convenience_generator_shape() {
    let id = generate_identifier("Samuel Agyakwa 16 Myrick Avenue Worcester MA");
    assert_eq!(id.len(), 24);
    assert!(id.bytes().all(|b| b.is_ascii_alphanumeric()));
}
