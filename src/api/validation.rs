use super::ApiError;

pub const DEFAULT_PAGE_LIMIT: u64 = 10;
pub const MAX_PAGE_LIMIT: u64 = 100;

pub fn validate_id(id: i32, resource: &str) -> Result<i32, ApiError> {
    if id <= 0 {
        return Err(ApiError::validation(format!(
            "Invalid {resource} ID: {id}. ID must be a positive integer"
        )));
    }
    Ok(id)
}

/// Page numbers are 1-based; missing means the first page.
pub fn validate_page(page: Option<&str>) -> Result<u64, ApiError> {
    let Some(raw) = page.map(str::trim).filter(|p| !p.is_empty()) else {
        return Ok(1);
    };
    match raw.parse::<u64>() {
        Ok(page) if page >= 1 => Ok(page),
        _ => Err(ApiError::validation("page must be a positive integer")),
    }
}

pub fn validate_limit(limit: Option<&str>) -> Result<u64, ApiError> {
    let Some(raw) = limit.map(str::trim).filter(|l| !l.is_empty()) else {
        return Ok(DEFAULT_PAGE_LIMIT);
    };
    match raw.parse::<u64>() {
        Ok(limit) if (1..=MAX_PAGE_LIMIT).contains(&limit) => Ok(limit),
        _ => Err(ApiError::validation(format!(
            "limit must be between 1 and {MAX_PAGE_LIMIT}"
        ))),
    }
}

/// Parses an optional integer query parameter, naming it in the error.
pub fn parse_optional_int(value: Option<&str>, message: &str) -> Result<Option<i64>, ApiError> {
    match value.map(str::trim).filter(|v| !v.is_empty()) {
        None => Ok(None),
        Some(v) => v
            .parse::<i64>()
            .map(Some)
            .map_err(|_| ApiError::validation(message)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_id() {
        assert!(validate_id(1, "asset").is_ok());
        assert!(validate_id(0, "asset").is_err());
        assert!(validate_id(-4, "asset").is_err());
    }

    #[test]
    fn test_validate_page() {
        assert_eq!(validate_page(None).unwrap(), 1);
        assert_eq!(validate_page(Some("3")).unwrap(), 3);
        assert!(validate_page(Some("0")).is_err());
        assert!(validate_page(Some("two")).is_err());
    }

    #[test]
    fn test_validate_limit() {
        assert_eq!(validate_limit(None).unwrap(), DEFAULT_PAGE_LIMIT);
        assert_eq!(validate_limit(Some("100")).unwrap(), 100);
        assert!(validate_limit(Some("0")).is_err());
        assert!(validate_limit(Some("101")).is_err());
    }

    #[test]
    fn test_parse_optional_int() {
        assert_eq!(parse_optional_int(None, "bad").unwrap(), None);
        assert_eq!(parse_optional_int(Some("45"), "bad").unwrap(), Some(45));
        assert!(parse_optional_int(Some("soon"), "bad").is_err());
    }
}
