//! Custom filters for identity templates
//!
//! Case conversion and the rest come from minijinja's built-ins; `required`
//! adds the check that a value is neither undefined nor empty.

use minijinja::{Error, ErrorKind, Value};

/// Required filter - fails if value is undefined, none or an empty string
///
/// Usage: `{{ ClusterDomain | required }}`
pub fn required(value: Value) -> Result<Value, Error> {
    if value.is_undefined() || value.is_none() {
        return Err(Error::new(
            ErrorKind::UndefinedError,
            "required value is undefined",
        ));
    }
    if value.as_str() == Some("") {
        return Err(Error::new(
            ErrorKind::InvalidOperation,
            "required value is empty",
        ));
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_required_passes_value_through() {
        let result = required(Value::from("cluster.local")).expect("value is present");
        assert_eq!(result.to_string(), "cluster.local");
    }

    #[test]
    fn test_required_rejects_undefined() {
        let err = required(Value::UNDEFINED).expect_err("undefined must fail");
        assert_eq!(err.kind(), ErrorKind::UndefinedError);
    }

    #[test]
    fn test_required_rejects_empty_string() {
        let err = required(Value::from("")).expect_err("empty must fail");
        assert_eq!(err.kind(), ErrorKind::InvalidOperation);
    }
}
