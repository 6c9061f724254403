//! Canonical Encoder.
//!
//! Turns any in-memory `serde_json::Value` into a byte sequence with strict
//! determinism constraints: sorted object keys, no incidental whitespace,
//! shortest-exact number rendering, and explicit policies for the values
//! JSON can't represent precisely (non-finite numbers, bigints, `undefined`).
//! This encoder is the single source of determinism in the crate — every
//! hash and every cache file derives from its output.

use std::collections::BTreeMap;

use serde_json::Value;

use crate::config::{BigIntPolicy, NonFiniteNumberPolicy, NormalizationConfig, UndefinedPolicy};
use crate::errors::{CoreError, CoreResult};

/// A bigint value carried out-of-band from `serde_json::Value` (which has no
/// native bigint type). Encoded per `BigIntPolicy`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BigIntValue(pub String);

/// The subset of values the canonical encoder accepts beyond what
/// `serde_json::Value` already represents: explicit bigints and an explicit
/// `undefined` marker (JSON has neither).
#[derive(Debug, Clone, PartialEq)]
pub enum CanonicalInput {
    Json(Value),
    BigInt(BigIntValue),
    Undefined,
    /// An associative map with non-string keys restricted to string/bool/number/bigint,
    /// encoded as a sorted array of `[key, value]` pairs rather than a JSON object.
    Map(Vec<(MapKey, CanonicalInput)>),
    /// An unordered set, encoded as an array sorted by each element's canonical encoding.
    Set(Vec<CanonicalInput>),
    Array(Vec<CanonicalInput>),
    Object(Vec<(String, CanonicalInput)>),
}

#[derive(Debug, Clone, PartialEq)]
pub enum MapKey {
    String(String),
    Bool(bool),
    Number(String),
    BigInt(String),
}

impl MapKey {
    fn stringify(&self) -> String {
        match self {
            Self::String(s) => s.clone(),
            Self::Bool(b) => b.to_string(),
            Self::Number(n) => n.clone(),
            Self::BigInt(n) => n.clone(),
        }
    }
}

impl From<Value> for CanonicalInput {
    fn from(v: Value) -> Self {
        CanonicalInput::Json(v)
    }
}

/// Encode `input` into canonical bytes under `cfg`. Returns the byte sequence
/// (valid JSON, but with stricter layout than any JSON serializer guarantees
/// by default).
pub fn encode(input: &CanonicalInput, cfg: &NormalizationConfig) -> CoreResult<Vec<u8>> {
    let mut out = String::new();
    encode_into(input, cfg, &mut out, &mut Vec::new())?;
    Ok(out.into_bytes())
}

/// Convenience: encode a plain `serde_json::Value` under `cfg`.
pub fn encode_value(value: &Value, cfg: &NormalizationConfig) -> CoreResult<Vec<u8>> {
    encode(&CanonicalInput::Json(value.clone()), cfg)
}

fn encode_into(
    input: &CanonicalInput,
    cfg: &NormalizationConfig,
    out: &mut String,
    path: &mut Vec<String>,
) -> CoreResult<()> {
    match input {
        CanonicalInput::Undefined => encode_undefined(cfg, out, path, false),
        CanonicalInput::BigInt(b) => encode_bigint(b, cfg, out),
        CanonicalInput::Json(v) => encode_json(v, cfg, out, path),
        CanonicalInput::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                path.push(i.to_string());
                // Undefined in array positions always emits null to preserve indices.
                if matches!(item, CanonicalInput::Undefined) {
                    out.push_str("null");
                } else {
                    encode_into(item, cfg, out, path)?;
                }
                path.pop();
            }
            out.push(']');
            Ok(())
        }
        CanonicalInput::Object(fields) => {
            let mut sorted: Vec<&(String, CanonicalInput)> = fields.iter().collect();
            sorted.sort_by(|a, b| a.0.cmp(&b.0));
            out.push('{');
            let mut first = true;
            for (key, value) in sorted {
                if matches!(value, CanonicalInput::Undefined) {
                    match cfg.undefined_policy {
                        UndefinedPolicy::Omit => continue,
                        UndefinedPolicy::Reject => {
                            return Err(CoreError::CanonicalUnsupportedType(format!(
                                "undefined field at {}",
                                render_path(path, key)
                            )))
                        }
                        UndefinedPolicy::AsNull => {}
                    }
                }
                if !first {
                    out.push(',');
                }
                first = false;
                encode_json_string(key, out);
                out.push(':');
                path.push(key.clone());
                if matches!(value, CanonicalInput::Undefined) {
                    out.push_str("null");
                } else {
                    encode_into(value, cfg, out, path)?;
                }
                path.pop();
            }
            out.push('}');
            Ok(())
        }
        CanonicalInput::Map(pairs) => {
            let mut sorted: Vec<&(MapKey, CanonicalInput)> = pairs.iter().collect();
            sorted.sort_by(|a, b| a.0.stringify().cmp(&b.0.stringify()));
            out.push('[');
            for (i, (k, v)) in sorted.into_iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                out.push('[');
                encode_json_string(&k.stringify(), out);
                out.push(',');
                path.push(k.stringify());
                encode_into(v, cfg, out, path)?;
                path.pop();
                out.push(']');
            }
            out.push(']');
            Ok(())
        }
        CanonicalInput::Set(items) => {
            let mut encoded = Vec::with_capacity(items.len());
            for item in items {
                let mut buf = String::new();
                encode_into(item, cfg, &mut buf, path)?;
                encoded.push(buf);
            }
            encoded.sort();
            out.push('[');
            for (i, e) in encoded.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                out.push_str(e);
            }
            out.push(']');
            Ok(())
        }
    }
}

fn encode_undefined(
    cfg: &NormalizationConfig,
    out: &mut String,
    path: &[String],
    in_array: bool,
) -> CoreResult<()> {
    if in_array {
        out.push_str("null");
        return Ok(());
    }
    match cfg.undefined_policy {
        UndefinedPolicy::Omit | UndefinedPolicy::AsNull => {
            out.push_str("null");
            Ok(())
        }
        UndefinedPolicy::Reject => Err(CoreError::CanonicalUnsupportedType(format!(
            "undefined value at {}",
            path.join(".")
        ))),
    }
}

fn encode_bigint(b: &BigIntValue, cfg: &NormalizationConfig, out: &mut String) -> CoreResult<()> {
    match cfg.bigint_policy {
        BigIntPolicy::Reject => Err(CoreError::CanonicalBigIntPolicy(format!(
            "bigint rejected under current policy: {}",
            b.0
        ))),
        BigIntPolicy::DecimalString => {
            encode_json_string(&b.0, out);
            Ok(())
        }
        BigIntPolicy::SafeIntegerOrReject => {
            let n: i128 = b.0.parse().map_err(|_| {
                CoreError::CanonicalBigIntPolicy(format!("not an integer: {}", b.0))
            })?;
            if !(-(2i128.pow(53))..=2i128.pow(53)).contains(&n) {
                return Err(CoreError::CanonicalBigIntPolicy(format!(
                    "bigint exceeds safe integer range: {}",
                    b.0
                )));
            }
            out.push_str(&n.to_string());
            Ok(())
        }
    }
}

fn encode_json(
    v: &Value,
    cfg: &NormalizationConfig,
    out: &mut String,
    path: &mut Vec<String>,
) -> CoreResult<()> {
    match v {
        Value::Null => {
            out.push_str("null");
            Ok(())
        }
        Value::Bool(b) => {
            out.push_str(if *b { "true" } else { "false" });
            Ok(())
        }
        Value::Number(n) => encode_number(n, cfg, out, path),
        Value::String(s) => {
            encode_json_string(s, out);
            Ok(())
        }
        Value::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                path.push(i.to_string());
                encode_json(item, cfg, out, path)?;
                path.pop();
            }
            out.push(']');
            Ok(())
        }
        Value::Object(map) => {
            let sorted: BTreeMap<&String, &Value> = map.iter().collect();
            out.push('{');
            for (i, (k, val)) in sorted.into_iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                encode_json_string(k, out);
                out.push(':');
                path.push(k.clone());
                encode_json(val, cfg, out, path)?;
                path.pop();
            }
            out.push('}');
            Ok(())
        }
    }
}

fn encode_number(
    n: &serde_json::Number,
    cfg: &NormalizationConfig,
    out: &mut String,
    path: &[String],
) -> CoreResult<()> {
    if let Some(i) = n.as_i64() {
        out.push_str(&i.to_string());
        return Ok(());
    }
    if let Some(u) = n.as_u64() {
        out.push_str(&u.to_string());
        return Ok(());
    }
    let f = n.as_f64().ok_or_else(|| {
        CoreError::CanonicalUnstableNumber(format!("unrepresentable number at {}", path.join(".")))
    })?;
    if !f.is_finite() {
        return match cfg.non_finite_number_policy {
            NonFiniteNumberPolicy::Reject => Err(CoreError::CanonicalUnstableNumber(format!(
                "non-finite number at {}",
                path.join(".")
            ))),
            NonFiniteNumberPolicy::AsString => {
                let s = if f.is_nan() {
                    "NaN"
                } else if f > 0.0 {
                    "Infinity"
                } else {
                    "-Infinity"
                };
                encode_json_string(s, out);
                Ok(())
            }
            NonFiniteNumberPolicy::AsNull => {
                out.push_str("null");
                Ok(())
            }
        };
    }
    // -0 normalizes to 0.
    let f = if f == 0.0 { 0.0 } else { f };
    out.push_str(&shortest_exact_number(f));
    Ok(())
}

/// Render `f` in its shortest exact round-trippable form, matching Rust's
/// `ryu`-backed `f64` `Display` but collapsing a trailing `.0` integer
/// representation to an integer literal (JSON has no float/int distinction).
fn shortest_exact_number(f: f64) -> String {
    if f.fract() == 0.0 && f.abs() < 1e15 {
        format!("{}", f as i64)
    } else {
        let mut s = format!("{f}");
        if !s.contains('.') && !s.contains('e') && !s.contains('E') {
            s.push_str(".0");
        }
        s
    }
}

fn encode_json_string(s: &str, out: &mut String) {
    out.push('"');
    for c in s.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if (c as u32) < 0x20 => out.push_str(&format!("\\u{:04x}", c as u32)),
            c => out.push(c),
        }
    }
    out.push('"');
}

fn render_path(path: &[String], leaf: &str) -> String {
    if path.is_empty() {
        leaf.to_string()
    } else {
        format!("{}.{}", path.join("."), leaf)
    }
}
