//! Input validation and normalization helpers.

use std::collections::HashSet;
use url::Url;

use super::types::LibraryError;

/// Upper bound on tags kept per item.
pub const MAX_TAGS: usize = 5;

/// Sanitize arbitrary string input by trimming whitespace and dropping empties.
pub(crate) fn sanitize_string(value: Option<String>) -> Option<String> {
    value.and_then(|input| {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    })
}

/// Accept only absolute `http`/`https` URLs with a host. Returns the trimmed input.
pub fn validate_url(raw: &str) -> Result<String, LibraryError> {
    let candidate = raw.trim();
    let parsed = Url::parse(candidate)
        .map_err(|error| LibraryError::Validation(format!("invalid URL `{candidate}`: {error}")))?;

    match parsed.scheme() {
        "http" | "https" if parsed.host_str().is_some_and(|host| !host.is_empty()) => {
            Ok(candidate.to_string())
        }
        "http" | "https" => Err(LibraryError::Validation(format!(
            "URL `{candidate}` has no host"
        ))),
        scheme => Err(LibraryError::Validation(format!(
            "URL `{candidate}` uses unsupported scheme `{scheme}`"
        ))),
    }
}

/// Validate every URL of a batch up front; a single bad entry rejects the whole batch.
pub fn validate_urls(raw: &[String]) -> Result<Vec<String>, LibraryError> {
    if raw.is_empty() {
        return Err(LibraryError::Validation(
            "select at least one URL to import".into(),
        ));
    }
    raw.iter().map(|url| validate_url(url)).collect()
}

/// Turn a comma-separated model answer into at most [`MAX_TAGS`] trimmed, lower-cased,
/// non-empty, distinct tags.
pub fn normalize_tags(raw: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    raw.split(',')
        .map(|tag| tag.trim().to_lowercase())
        .filter(|tag| !tag.is_empty())
        .filter(|tag| seen.insert(tag.clone()))
        .take(MAX_TAGS)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_tags_trims_lowercases_and_caps() {
        let tags = normalize_tags("Tech, Programming,, web dev ,JavaScript,extra,overflow");
        assert_eq!(
            tags,
            vec!["tech", "programming", "web dev", "javascript", "extra"]
        );
    }

    #[test]
    fn normalize_tags_drops_duplicates_before_capping() {
        let tags = normalize_tags("Rust, rust ,RUST, async, , tokio");
        assert_eq!(tags, vec!["rust", "async", "tokio"]);
        assert!(normalize_tags(" , ,").is_empty());
    }

    #[test]
    fn validate_url_accepts_http_and_https_only() {
        assert_eq!(
            validate_url("  https://example.com/article ").expect("valid"),
            "https://example.com/article"
        );
        assert!(validate_url("http://localhost:8080/x").is_ok());
        assert!(matches!(
            validate_url("not a url"),
            Err(LibraryError::Validation(_))
        ));
        assert!(matches!(
            validate_url("ftp://example.com/file"),
            Err(LibraryError::Validation(message)) if message.contains("ftp")
        ));
        assert!(validate_url("mailto:someone@example.com").is_err());
    }

    #[test]
    fn validate_urls_rejects_empty_and_mixed_batches() {
        assert!(validate_urls(&[]).is_err());
        assert!(validate_urls(&["https://a.dev".into(), "nope".into()]).is_err());
        assert_eq!(
            validate_urls(&["https://a.dev".into(), "https://b.dev".into()])
                .expect("valid")
                .len(),
            2
        );
    }

    #[test]
    fn sanitize_string_trims_and_drops_blank() {
        assert_eq!(sanitize_string(Some("  x ".into())), Some("x".into()));
        assert_eq!(sanitize_string(Some("   ".into())), None);
        assert_eq!(sanitize_string(None), None);
    }
}
