//! Total coercion of loosely-typed request values. Nothing here fails: malformed input
//! resolves to the caller's default.

use serde_json::Value;

const TRUTHY: &[&str] = &["true", "1", "yes", "y"];
const FALSY: &[&str] = &["false", "0", "no", "n"];

/// Trimmed string, `None` when missing, null, blank or compound.
pub fn as_string(value: Option<&Value>) -> Option<String> {
    let text = match value? {
        Value::String(text) => text.trim().to_string(),
        Value::Number(number) => number.to_string(),
        Value::Bool(flag) => flag.to_string(),
        Value::Null | Value::Array(_) | Value::Object(_) => return None,
    };
    (!text.is_empty()).then_some(text)
}

pub fn as_bool(value: Option<&Value>, default: bool) -> bool {
    match value {
        Some(Value::Bool(flag)) => *flag,
        Some(Value::Number(number)) => match number.as_f64() {
            Some(n) if n == 1.0 => true,
            Some(n) if n == 0.0 => false,
            _ => default,
        },
        Some(Value::String(text)) => {
            let text = text.trim().to_ascii_lowercase();
            if TRUTHY.contains(&text.as_str()) {
                true
            } else if FALSY.contains(&text.as_str()) {
                false
            } else {
                default
            }
        }
        _ => default,
    }
}

/// Finite number or `None`.
pub fn as_optional_number(value: Option<&Value>) -> Option<f64> {
    let number = match value? {
        Value::Number(number) => number.as_f64()?,
        Value::String(text) => text.trim().parse::<f64>().ok()?,
        _ => return None,
    };
    number.is_finite().then_some(number)
}

pub fn as_number(value: Option<&Value>, default: f64) -> f64 {
    as_optional_number(value).unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn strings_are_trimmed_and_blank_is_absent() {
        assert_eq!(as_string(Some(&json!("  GOLD "))).as_deref(), Some("GOLD"));
        assert_eq!(as_string(Some(&json!("   "))), None);
        assert_eq!(as_string(Some(&json!(5411))).as_deref(), Some("5411"));
        assert_eq!(as_string(Some(&Value::Null)), None);
        assert_eq!(as_string(None), None);
    }

    #[test]
    fn booleans_accept_common_spellings() {
        for truthy in [json!(true), json!("TRUE"), json!(" yes "), json!("Y"), json!("1"), json!(1)] {
            assert!(as_bool(Some(&truthy), false), "{truthy}");
        }
        for falsy in [json!(false), json!("No"), json!("n"), json!("0"), json!(0)] {
            assert!(!as_bool(Some(&falsy), true), "{falsy}");
        }
    }

    #[test]
    fn malformed_booleans_take_the_default() {
        for malformed in [json!("maybe"), json!(""), json!(2), json!([true]), Value::Null] {
            assert!(as_bool(Some(&malformed), true));
            assert!(!as_bool(Some(&malformed), false));
        }
        assert!(as_bool(None, true));
    }

    #[test]
    fn numbers_parse_strings_and_default_on_garbage() {
        assert_eq!(as_number(Some(&json!(12.5)), 0.0), 12.5);
        assert_eq!(as_number(Some(&json!(" 42 ")), 0.0), 42.0);
        assert_eq!(as_number(Some(&json!("not-a-number")), 0.0), 0.0);
        assert_eq!(as_number(Some(&json!("NaN")), 7.0), 7.0);
        assert_eq!(as_number(Some(&json!("inf")), 7.0), 7.0);
        assert_eq!(as_number(Some(&json!(true)), 3.0), 3.0);
        assert_eq!(as_number(None, 1.0), 1.0);
    }

    #[test]
    fn optional_numbers_stay_absent() {
        assert_eq!(as_optional_number(Some(&json!("0.8"))), Some(0.8));
        assert_eq!(as_optional_number(Some(&json!(""))), None);
        assert_eq!(as_optional_number(None), None);
    }
}
