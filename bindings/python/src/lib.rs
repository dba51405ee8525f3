// PyO3 bindings for rowkey_core
use once_cell::sync::Lazy;
use pyo3::exceptions::{PyRuntimeError, PyValueError};
use pyo3::prelude::*;
use pyo3::types::{PyDict, PyModule};
use std::sync::RwLock;
use std::time::Instant;

use rowkey_core as core;
use core::{IdentifierGenerator, PipelineConfig};

// Parallel iterators for batch generation
use rayon::prelude::*;

// -------- Module-wide config (bindings) --------
static CONFIG: Lazy<RwLock<PipelineConfig>> = Lazy::new(|| RwLock::new(PipelineConfig::default()));

fn current_config() -> PyResult<PipelineConfig> {
    CONFIG
        .read()
        .map(|g| g.clone())
        .map_err(|_| PyRuntimeError::new_err("config lock poisoned"))
}

fn store_config(cfg: PipelineConfig) -> PyResult<()> {
    let mut g = CONFIG.write().map_err(|_| PyRuntimeError::new_err("config lock poisoned"))?;
    *g = cfg;
    Ok(())
}

/// Replace the module config with the given JSON document. Returns True on success.
/// Raises ValueError on malformed JSON or an unsupported version.
#[pyfunction]
#[pyo3(text_signature = "(config_json)")]
fn configure(config_json: &str) -> PyResult<bool> {
    let cfg = PipelineConfig::from_json(config_json).map_err(|e| PyValueError::new_err(e.to_string()))?;
    store_config(cfg)?;
    Ok(true)
}

/// Load the module config from a JSON file path. Returns True on success.
#[pyfunction]
#[pyo3(text_signature = "(config_path)")]
fn load_config(config_path: &str) -> PyResult<bool> {
    let cfg = PipelineConfig::from_path(config_path).map_err(|e| PyValueError::new_err(e.to_string()))?;
    store_config(cfg)?;
    Ok(true)
}

/// Return the effective config as a JSON string.
#[pyfunction]
#[pyo3(text_signature = "()")]
fn get_config() -> PyResult<String> {
    serde_json::to_string(&current_config()?).map_err(|e| PyValueError::new_err(e.to_string()))
}

/// Split a CSV line (quote-aware) into a list of fields.
/// separator/quote default to the configured values; a space selects ',' / '"'.
#[pyfunction]
#[pyo3(signature = (line, separator=None, quote=None))]
fn parse_line(line: &str, separator: Option<char>, quote: Option<char>) -> PyResult<Vec<String>> {
    let cfg = current_config()?;
    Ok(core::parse_line(line, separator.unwrap_or(cfg.separator), quote.unwrap_or(cfg.quote)))
}

/// Draw one 24-character identifier personalized with `source`.
#[pyfunction]
#[pyo3(text_signature = "(source)")]
fn generate_id(source: &str) -> PyResult<String> {
    let cfg = current_config()?;
    let mut generator = IdentifierGenerator::new(cfg.generator);
    Ok(generator.generate(source))
}

/// True when `value` has the identifier shape (24 chars of [A-Za-z0-9]).
#[pyfunction]
#[pyo3(text_signature = "(value)")]
fn is_valid_id(value: &str) -> bool {
    core::is_valid_identifier(value)
}

/// Run the pipeline over a CSV file and return a dict with ids, lines,
/// header_skipped, diagnostics, error and runtime_ns. A read failure is
/// reported under "error" together with the ids produced before it.
#[pyfunction]
#[pyo3(signature = (path, skip_header=None))]
fn generate_ids(py: Python, path: &str, skip_header: Option<bool>) -> PyResult<Py<PyDict>> {
    let mut cfg = current_config()?;
    if let Some(skip) = skip_header {
        cfg.skip_header = skip;
    }
    let t0 = Instant::now();
    let report = core::run_path(path, &cfg);
    let runtime_ns = t0.elapsed().as_nanos();

    let diagnostics: Vec<String> = report
        .diagnostics
        .iter()
        .map(|d| match d.line {
            Some(line) => format!("line {}: {}", line, d.message),
            None => d.message.clone(),
        })
        .collect();
    let d = PyDict::new(py);
    d.set_item("lines", report.lines)?;
    d.set_item("header_skipped", report.header_skipped)?;
    d.set_item("diagnostics", diagnostics)?;
    d.set_item("error", report.error.as_ref().map(|e| e.to_string()))?;
    d.set_item("runtime_ns", runtime_ns)?;
    d.set_item("ids", report.identifiers)?;
    Ok(d.unbind())
}

/// Generate identifiers for a batch of raw lines in parallel, preserving order.
/// Every Rayon worker owns its own generator; none is shared across threads.
#[pyfunction]
#[pyo3(text_signature = "(lines)")]
fn generate_ids_batch(lines: Vec<String>) -> PyResult<Vec<String>> {
    let cfg = current_config()?;
    let opts = cfg.parse_options();
    let ids: Vec<String> = lines
        .par_iter()
        .map_init(
            || IdentifierGenerator::new(cfg.generator.clone()),
            |generator, line| {
                let fields = core::parse_line_with(line, &opts);
                generator.generate(&core::personalization_source(line, &fields, &cfg))
            },
        )
        .collect();
    Ok(ids)
}

#[pymodule]
#[pyo3(module = "rowkey_rs")]
fn rowkey_rs(_py: Python, m: &Bound<PyModule>) -> PyResult<()> {
    m.add(
        "__doc__",
        "Per-record secure identifiers for CSV data.\n\n\
        Features:\n\
        - Quote-aware CSV line parsing with custom separator/quote\n\
        - 24-character alphanumeric ids from a personalized Hash_DRBG\n\
        - Fast Rust core with Python bindings\n\n\
        Quick start:\n\
        >>> import rowkey_rs as rk\n\
        >>> rk.parse_line('10,AU,\"Aus,tralia\"')\n\
        ['10', 'AU', 'Aus,tralia']\n\
        >>> result = rk.generate_ids('customers.csv')\n\
        >>> print(result['ids'][:3])",
    )?;

    // Config APIs
    m.add_function(wrap_pyfunction!(configure, m)?)?;
    m.add_function(wrap_pyfunction!(load_config, m)?)?;
    m.add_function(wrap_pyfunction!(get_config, m)?)?;

    // CSV helpers
    m.add_function(wrap_pyfunction!(parse_line, m)?)?;

    // Identifier APIs
    m.add_function(wrap_pyfunction!(generate_id, m)?)?;
    m.add_function(wrap_pyfunction!(generate_ids, m)?)?;
    m.add_function(wrap_pyfunction!(generate_ids_batch, m)?)?;
    m.add_function(wrap_pyfunction!(is_valid_id, m)?)?;

    // Optional: preload config from env var
    if let Ok(path) = std::env::var("ROWKEY_CONFIG") {
        if let Ok(cfg) = PipelineConfig::from_path(&path) {
            store_config(cfg)?;
        }
    }

    Ok(())
}
