pub type Result<T> = std::result::Result<T, crate::error::Error>;

#[macro_export]
macro_rules! verify_arg {
    ($name:expr, $expr:expr) => {{
        let result = $expr;
        $crate::result::verify_arg(result, stringify!($name), stringify!($expr))?;
    }};
}

#[macro_export]
macro_rules! verify_config {
    ($name:expr, $expr:expr) => {{
        let result = $expr;
        $crate::result::verify_config(result, stringify!($name), stringify!($expr))?;
    }};
}

#[inline]
pub fn verify_arg(predicate: bool, name: &str, condition: &str) -> Result<()> {
    if predicate {
        Ok(())
    } else {
        invalid_arg(name, condition)
    }
}

#[inline]
pub fn verify_config(predicate: bool, name: &str, condition: &str) -> Result<()> {
    if predicate {
        Ok(())
    } else {
        invalid_config(name, condition)
    }
}

#[cold]
pub fn invalid_arg(name: &str, condition: &str) -> Result<()> {
    Err(crate::error::ErrorKind::InvalidArgument {
        name: name.to_string(),
        message: condition.to_string(),
    }
    .into())
}

#[cold]
pub fn invalid_config(name: &str, condition: &str) -> Result<()> {
    Err(crate::error::ErrorKind::InvalidConfiguration {
        name: name.to_string(),
        message: condition.to_string(),
    }
    .into())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn check_threshold(threshold: f64) -> Result<f64> {
        verify_config!(threshold, threshold > 0.0);
        Ok(threshold)
    }

    fn check_partitions(count: usize) -> Result<usize> {
        verify_arg!(count, count != 0);
        Ok(count)
    }

    #[test]
    fn test_verify_macros() {
        assert_eq!(check_threshold(0.5).unwrap(), 0.5);
        let err = check_threshold(0.0).unwrap_err();
        assert!(err.is_config_error());
        assert!(err.to_string().contains("threshold > 0.0"));

        assert_eq!(check_partitions(4).unwrap(), 4);
        assert!(!check_partitions(0).unwrap_err().is_config_error());
    }
}
