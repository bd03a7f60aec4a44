use url::Url;

/// True when `candidate` is an absolute `http`/`https` URL.
pub fn is_valid_image_url(candidate: &str) -> bool {
    let trimmed = candidate.trim();
    if trimmed.is_empty() {
        return false;
    }
    match Url::parse(trimmed) {
        Ok(parsed) => matches!(parsed.scheme(), "http" | "https") && parsed.has_host(),
        Err(_) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_https_urls() {
        assert!(is_valid_image_url("https://img.example.com/a.jpg"));
        assert!(is_valid_image_url("http://img.example.com/a.jpg?w=300"));
    }

    #[test]
    fn rejects_other_schemes_and_empty_input() {
        assert!(!is_valid_image_url("ftp://x.com/a.jpg"));
        assert!(!is_valid_image_url(""));
        assert!(!is_valid_image_url("   "));
        assert!(!is_valid_image_url("data:image/png;base64,AAAA"));
    }

    #[test]
    fn rejects_relative_and_malformed_urls() {
        assert!(!is_valid_image_url("/placeholder.svg?height=400&width=400"));
        assert!(!is_valid_image_url("https://"));
        assert!(!is_valid_image_url("not a url"));
    }
}
