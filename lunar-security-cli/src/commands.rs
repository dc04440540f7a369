//! Subcommand implementations.
//!
//! Each command writes its report to the given writer so the binary can
//! target stdout and the tests a buffer.

use anyhow::{Context, Result};
use lunar_security::{Dialect, PreparedStatement, RateLimiter, classify, ensure_valid, sanitize};
use serde::Serialize;
use std::io::Write;

// =============================================================================
// check
// =============================================================================

#[derive(Debug, Serialize)]
struct CheckReport<'a> {
    input: &'a str,
    valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    kind: Option<&'static str>,
}

/// Classify each input. Returns the number of rejected inputs.
pub fn check(inputs: &[String], json: bool, out: &mut impl Write) -> Result<usize> {
    let mut rejected = 0;
    for input in inputs {
        let verdict = classify(input);
        let kind = verdict.kind().map(|k| k.as_str());
        if kind.is_some() {
            rejected += 1;
        }

        if json {
            let report = CheckReport {
                input,
                valid: verdict.is_accepted(),
                kind,
            };
            serde_json::to_writer(&mut *out, &report)?;
            writeln!(out)?;
        } else {
            match kind {
                None => writeln!(out, "ok\t{input}")?,
                Some(kind) => writeln!(out, "rejected ({kind})\t{input}")?,
            }
        }
    }
    Ok(rejected)
}

// =============================================================================
// sanitize
// =============================================================================

/// Print the escaped form of each input, one per line.
pub fn sanitize_all(inputs: &[String], out: &mut impl Write) -> Result<()> {
    for input in inputs {
        writeln!(out, "{}", sanitize(input))?;
    }
    Ok(())
}

// =============================================================================
// prepare
// =============================================================================

/// Bind `values` into `template` and print the query finalized for `dialect`.
///
/// With `strict`, every value must also pass the classifier.
pub fn prepare(
    template: &str,
    values: &[String],
    dialect: Dialect,
    strict: bool,
    out: &mut impl Write,
) -> Result<()> {
    if strict {
        for (i, value) in values.iter().enumerate() {
            ensure_valid(value).with_context(|| format!("Parameter {} refused", i + 1))?;
        }
    }

    let mut stmt = PreparedStatement::with_dialect(template, dialect);
    stmt.bind_all(values.iter().map(String::as_str))
        .context("Failed to bind parameters")?;
    let sql = stmt.finalize().context("Failed to finalize statement")?;
    writeln!(out, "{sql}")?;
    Ok(())
}

// =============================================================================
// throttle
// =============================================================================

#[derive(Debug, Serialize)]
struct ThrottleReport<'a> {
    key: &'a str,
    admitted: bool,
    remaining: u32,
}

/// Replay `keys` through `limiter` in order. Returns the number of rejections.
pub fn throttle(
    limiter: &RateLimiter,
    keys: &[String],
    json: bool,
    out: &mut impl Write,
) -> Result<usize> {
    let mut rejected = 0;
    for key in keys {
        let admitted = limiter.check(key);
        if !admitted {
            rejected += 1;
        }
        let remaining = limiter.status(key).remaining;

        if json {
            let report = ThrottleReport {
                key,
                admitted,
                remaining,
            };
            serde_json::to_writer(&mut *out, &report)?;
            writeln!(out)?;
        } else {
            let action = if admitted { "admit" } else { "reject" };
            writeln!(out, "{action}\t{key}\t{remaining} remaining")?;
        }
    }
    Ok(rejected)
}
