use serde_json::Value;

/// Why a field fell back to its default.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fallback {
    /// Absent or null in the source.
    Missing,
    /// Present, but could not be cast (or broke a range invariant).
    Invalid,
}

/// Cast to text. Strings pass through untouched (the empty string included);
/// numbers and booleans are rendered.
pub fn cast_string(value: Option<&Value>) -> Result<String, Fallback> {
    match value {
        None | Some(Value::Null) => Err(Fallback::Missing),
        Some(Value::String(s)) => Ok(s.clone()),
        Some(Value::Number(n)) => Ok(n.to_string()),
        Some(Value::Bool(b)) => Ok(b.to_string()),
        Some(Value::Array(_)) | Some(Value::Object(_)) => Err(Fallback::Invalid),
    }
}

/// Cast to i64. Fractional values truncate toward zero; numeric strings are
/// parsed, integer syntax first.
pub fn cast_int(value: Option<&Value>) -> Result<i64, Fallback> {
    match value {
        None | Some(Value::Null) => Err(Fallback::Missing),
        Some(Value::Number(n)) => n
            .as_i64()
            .or_else(|| n.as_f64().and_then(truncate))
            .ok_or(Fallback::Invalid),
        Some(Value::String(s)) => {
            let s = s.trim();
            s.parse::<i64>()
                .ok()
                .or_else(|| s.parse::<f64>().ok().and_then(truncate))
                .ok_or(Fallback::Invalid)
        }
        Some(_) => Err(Fallback::Invalid),
    }
}

/// Cast to a finite f64.
pub fn cast_float(value: Option<&Value>) -> Result<f64, Fallback> {
    let parsed = match value {
        None | Some(Value::Null) => return Err(Fallback::Missing),
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.trim().parse::<f64>().ok(),
        Some(_) => None,
    };
    parsed.filter(|f| f.is_finite()).ok_or(Fallback::Invalid)
}

fn truncate(f: f64) -> Option<i64> {
    // i64::MAX as f64 rounds up to 2^63, hence the strict bound
    if f.is_finite() && f >= i64::MIN as f64 && f < i64::MAX as f64 {
        Some(f.trunc() as i64)
    } else {
        None
    }
}

/// Reject negative results; population and area are never negative.
pub fn non_negative<T: PartialOrd + Default>(r: Result<T, Fallback>) -> Result<T, Fallback> {
    match r {
        Ok(v) if v < T::default() => Err(Fallback::Invalid),
        other => other,
    }
}
