use base64::Engine;
use base64::engine::general_purpose::STANDARD;

/// Encode `bytes` as `data:<mime>;base64,<payload>`
pub fn build_data_url(mime_type: &str, bytes: &[u8]) -> String {
    format!("data:{};base64,{}", mime_type, STANDARD.encode(bytes))
}

/// Split a base64 data URL into its media type and payload.
///
/// Returns `None` for anything that is not a well-formed base64 data URL.
pub fn parse_data_url(data_url: &str) -> Option<(&str, &str)> {
    let rest = data_url.strip_prefix("data:")?;
    let (mime, payload) = rest.split_once(";base64,")?;

    let mime_ok = !mime.is_empty()
        && mime
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '.' | '_' | '+' | '/'));
    let payload_ok = !payload.is_empty()
        && payload
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '/' | '='));

    (mime_ok && payload_ok).then_some((mime, payload))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_data_url() {
        assert_eq!(
            build_data_url("image/png", b"Hello"),
            "data:image/png;base64,SGVsbG8="
        );
    }

    #[test]
    fn test_parse_data_url() {
        let url = "data:application/pdf;base64,JVBERi0=";
        assert_eq!(parse_data_url(url), Some(("application/pdf", "JVBERi0=")));
    }

    #[test]
    fn test_parse_rejects_non_base64_urls() {
        assert_eq!(parse_data_url("data:text/plain,hello"), None);
        assert_eq!(parse_data_url("https://example.com/a.png"), None);
        assert_eq!(parse_data_url("data:image/png;base64,"), None);
        assert_eq!(parse_data_url("data:image/png;base64,ab cd"), None);
    }
}
