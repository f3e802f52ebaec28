use axum::http::HeaderValue;
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};

// RFC 5987 attr-char, minus the few marks some clients mishandle
const ATTR_CHAR: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~');

/// `Content-Disposition` for a download named `file_name`, per RFC 6266 §4.3.
pub fn attachment(file_name: &str) -> HeaderValue {
    let value = format!(
        "attachment; filename*=utf-8''{}",
        utf8_percent_encode(file_name, ATTR_CHAR)
    );
    HeaderValue::try_from(value).unwrap_or_else(|_| HeaderValue::from_static("attachment"))
}

pub fn inline() -> HeaderValue {
    HeaderValue::from_static("inline")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_name() {
        assert_eq!(
            attachment("photos.tar.gz"),
            "attachment; filename*=utf-8''photos.tar.gz"
        );
    }

    #[test]
    fn test_utf8_and_spaces_are_encoded() {
        assert_eq!(
            attachment("mix tape ♫.m3u"),
            "attachment; filename*=utf-8''mix%20tape%20%E2%99%AB.m3u"
        );
        assert_eq!(attachment("a;b\".zip"), "attachment; filename*=utf-8''a%3Bb%22.zip");
    }
}
