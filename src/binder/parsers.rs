//! One parser per [`ParamKind`].
//!
//! Integers are parsed as `i128` and narrowed with `try_from`; `f32` values
//! are parsed as `f64` and rejected if they overflow the narrower type or
//! underflow it to zero.
//! Nothing is truncated silently.

use super::types::{FloatWidth, IntWidth, ParamKind, ParamValue};
use chrono::{DateTime, NaiveDate};
use serde_json::Value;

/// Parse failure description, turned into a `BindingError` by the caller.
pub(crate) type ParseResult = Result<ParamValue, String>;

pub(crate) fn parse(kind: &ParamKind, raw: &str) -> ParseResult {
    match kind {
        ParamKind::Bool => parse_bool(raw),
        ParamKind::Int(width) => parse_int(*width, raw),
        ParamKind::Float(width) => parse_float(*width, raw),
        ParamKind::Str => Ok(ParamValue::Str(raw.to_string())),
        ParamKind::Time => parse_time(raw),
        ParamKind::Json => serde_json::from_str::<Value>(raw)
            .map(ParamValue::Json)
            .map_err(|e| e.to_string()),
        ParamKind::List(inner) => raw
            .split(',')
            .map(|item| parse(inner, item))
            .collect::<Result<Vec<_>, _>>()
            .map(ParamValue::List),
    }
}

/// Parse a list from a JSON array body; scalar elements are fed to the
/// element parser in their textual form.
pub(crate) fn parse_json_list(inner: &ParamKind, raw: &str) -> ParseResult {
    let value: Value = serde_json::from_str(raw).map_err(|e| e.to_string())?;
    let Value::Array(items) = value else {
        return Err("expected a JSON array".to_string());
    };
    items
        .iter()
        .map(|item| match item {
            Value::String(s) => parse(inner, s),
            other if matches!(inner, ParamKind::Json) => Ok(ParamValue::Json(other.clone())),
            other => parse(inner, &other.to_string()),
        })
        .collect::<Result<Vec<_>, _>>()
        .map(ParamValue::List)
}

fn parse_bool(raw: &str) -> ParseResult {
    match raw {
        "1" | "t" | "T" | "true" | "TRUE" | "True" | "on" | "yes" => Ok(ParamValue::Bool(true)),
        "0" | "f" | "F" | "false" | "FALSE" | "False" | "off" | "no" => Ok(ParamValue::Bool(false)),
        _ => Err("not a boolean".to_string()),
    }
}

fn parse_int(width: IntWidth, raw: &str) -> ParseResult {
    let wide: i128 = raw
        .trim()
        .parse()
        .map_err(|e: std::num::ParseIntError| e.to_string())?;
    let narrowed = match width {
        IntWidth::I8 => i8::try_from(wide).ok().map(|v| ParamValue::Int(v.into())),
        IntWidth::I16 => i16::try_from(wide).ok().map(|v| ParamValue::Int(v.into())),
        IntWidth::I32 => i32::try_from(wide).ok().map(|v| ParamValue::Int(v.into())),
        IntWidth::I64 => i64::try_from(wide).ok().map(ParamValue::Int),
        IntWidth::U8 => u8::try_from(wide).ok().map(|v| ParamValue::UInt(v.into())),
        IntWidth::U16 => u16::try_from(wide).ok().map(|v| ParamValue::UInt(v.into())),
        IntWidth::U32 => u32::try_from(wide).ok().map(|v| ParamValue::UInt(v.into())),
        IntWidth::U64 => u64::try_from(wide).ok().map(ParamValue::UInt),
    };
    narrowed.ok_or_else(|| format!("out of range for {}", width.name()))
}

fn parse_float(width: FloatWidth, raw: &str) -> ParseResult {
    let wide: f64 = raw
        .trim()
        .parse()
        .map_err(|e: std::num::ParseFloatError| e.to_string())?;
    match width {
        FloatWidth::F64 => Ok(ParamValue::F64(wide)),
        FloatWidth::F32 => {
            #[allow(clippy::cast_possible_truncation)]
            let narrow = wide as f32;
            if wide.is_finite() && !narrow.is_finite() {
                Err("out of range for f32".to_string())
            } else if wide != 0.0 && narrow == 0.0 {
                Err("underflows f32".to_string())
            } else {
                Ok(ParamValue::F32(narrow))
            }
        }
    }
}

fn parse_time(raw: &str) -> ParseResult {
    if let Ok(t) = DateTime::parse_from_rfc3339(raw) {
        return Ok(ParamValue::Time(t));
    }
    let date = NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .map_err(|e| format!("expected RFC 3339 or YYYY-MM-DD: {e}"))?;
    date.and_hms_opt(0, 0, 0)
        .map(|midnight| ParamValue::Time(midnight.and_utc().fixed_offset()))
        .ok_or_else(|| "invalid date".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bool_forms() {
        assert_eq!(parse_bool("true"), Ok(ParamValue::Bool(true)));
        assert_eq!(parse_bool("0"), Ok(ParamValue::Bool(false)));
        assert!(parse_bool("maybe").is_err());
    }

    #[test]
    fn test_int_width_checks() {
        assert_eq!(parse_int(IntWidth::I8, "127"), Ok(ParamValue::Int(127)));
        assert!(parse_int(IntWidth::I8, "128").is_err());
        assert!(parse_int(IntWidth::U32, "-1").is_err());
        assert_eq!(parse_int(IntWidth::U64, "18446744073709551615"), Ok(ParamValue::UInt(u64::MAX)));
        assert!(parse_int(IntWidth::I64, "9223372036854775808").is_err());
        assert!(parse_int(IntWidth::I32, "1.5").is_err());
    }

    #[test]
    fn test_float_narrowing() {
        assert_eq!(parse_float(FloatWidth::F32, "1.5"), Ok(ParamValue::F32(1.5)));
        assert!(parse_float(FloatWidth::F32, "1e39").is_err());
        assert!(parse_float(FloatWidth::F32, "1e-50").is_err());
        assert_eq!(parse_float(FloatWidth::F32, "0.0"), Ok(ParamValue::F32(0.0)));
        assert_eq!(parse_float(FloatWidth::F64, "1e-50"), Ok(ParamValue::F64(1e-50)));
        assert_eq!(parse_float(FloatWidth::F64, "1e39"), Ok(ParamValue::F64(1e39)));
        assert!(parse_float(FloatWidth::F64, "abc").is_err());
    }

    #[test]
    fn test_time_formats() {
        let ParamValue::Time(t) = parse_time("2024-05-01T10:30:00+02:00").unwrap() else {
            panic!("expected time");
        };
        assert_eq!(t.offset().local_minus_utc(), 7200);

        let ParamValue::Time(d) = parse_time("2024-05-01").unwrap() else {
            panic!("expected time");
        };
        assert_eq!(d.to_rfc3339(), "2024-05-01T00:00:00+00:00");
        assert!(parse_time("01/05/2024").is_err());
    }

    #[test]
    fn test_list_parsing() {
        let kind = ParamKind::List(Box::new(ParamKind::Int(IntWidth::I32)));
        assert_eq!(
            parse(&kind, "1,2,3"),
            Ok(ParamValue::List(vec![
                ParamValue::Int(1),
                ParamValue::Int(2),
                ParamValue::Int(3)
            ]))
        );
        assert!(parse(&kind, "1,x").is_err());

        let inner = ParamKind::Int(IntWidth::U8);
        assert_eq!(
            parse_json_list(&inner, "[1, \"2\"]"),
            Ok(ParamValue::List(vec![ParamValue::UInt(1), ParamValue::UInt(2)]))
        );
        assert!(parse_json_list(&inner, "{}").is_err());
    }
}
