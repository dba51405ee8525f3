// tokenizer.rs: quote-aware CSV line splitting
use memchr::memchr_iter;

use crate::config::ParseOptions;

const QUOTE_MARK: char = '"';

/// Split one raw line into fields.
///
/// The line may still carry its terminator: `\r` is dropped and `\n` ends the
/// record. A space passed as `separator` or `quote` selects the default. An
/// unterminated quoted field keeps everything read so far.
pub fn parse_line(line: &str, separator: char, quote: char) -> Vec<String> {
    let opts = ParseOptions { separator, quote }.normalized();
    let (separator, quote) = (opts.separator, opts.quote);

    let mut out: Vec<String> = Vec::with_capacity(count_separators(line, separator) + 1);
    let mut field = String::with_capacity(16);
    let mut in_quotes = false;
    // set once a quoted segment of the current field has been read
    let mut collecting = false;
    let mut escaped_quote_seen = false;

    for ch in line.chars() {
        if in_quotes {
            collecting = true;
            if ch == quote {
                in_quotes = false;
                escaped_quote_seen = false;
            } else if ch == QUOTE_MARK {
                // only reachable with a custom quote character
                if !escaped_quote_seen {
                    field.push(QUOTE_MARK);
                    escaped_quote_seen = true;
                }
            } else {
                field.push(ch);
                escaped_quote_seen = false;
            }
        } else if ch == quote {
            in_quotes = true;
            // a quote inside a field (doubled or resuming a quoted segment) is literal
            if collecting || !field.is_empty() {
                field.push(quote);
            }
        } else if ch == separator {
            out.push(std::mem::take(&mut field));
            collecting = false;
        } else if ch == '\n' {
            break;
        } else if ch != '\r' {
            field.push(ch);
        }
    }
    out.push(field);
    out
}

pub fn parse_line_default(line: &str) -> Vec<String> {
    parse_line(line, ' ', ' ')
}

pub fn parse_line_with(line: &str, opts: &ParseOptions) -> Vec<String> {
    parse_line(line, opts.separator, opts.quote)
}

/// Number of separator characters in `line`, quoted or not.
pub fn count_separators(line: &str, separator: char) -> usize {
    if separator.is_ascii() {
        memchr_iter(separator as u8, line.as_bytes()).count()
    } else {
        line.chars().filter(|&c| c == separator).count()
    }
}

/// Order-preserving join used to build a record's personalization string.
pub fn join_fields(fields: &[String], join_with: &str) -> String {
    fields.join(join_with)
}
