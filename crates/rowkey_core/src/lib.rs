// rowkey_core: quote-aware CSV line parsing and per-record secure identifiers.
pub mod config;
pub mod error;
pub mod identifier;
pub mod pipeline;
pub mod tokenizer;

pub use config::{GeneratorConfig, Mechanism, ParseOptions, PersonalizationMode, PipelineConfig};
pub use error::{Result, RowKeyError};
pub use identifier::entropy::{EntropySource, OsEntropy};
pub use identifier::{is_valid_identifier, personalization_bytes, Diagnostic, IdentifierGenerator, ALPHABET, ID_LENGTH};
pub use pipeline::{count_lines, personalization_source, run, run_path, run_with_generator, RunReport};
pub use tokenizer::{count_separators, join_fields, parse_line, parse_line_default, parse_line_with};

/// Draw one identifier with the default generator settings.
pub fn generate_identifier(personalization_source: &str) -> String {
    IdentifierGenerator::new(GeneratorConfig::default()).generate(personalization_source)
}
