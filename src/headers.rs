//! Record header forwarding
//!
//! Filters, renames and sanitizes record headers into HTTP request headers.
//! Processing per header: include/exclude glob filtering, value text
//! normalization (null and undecodable values are skipped), name
//! sanitization, prefixing, comma concatenation on collisions, and finally
//! the static header set which overrides forwarded names.

use crate::config::HeaderForwardConfig;
use crate::record::RecordHeader;
use tracing::{debug, trace, warn};

/// Header forwarder configured once per task.
#[derive(Debug, Clone)]
pub struct HeaderForwarder {
    enabled: bool,
    include: Vec<String>,
    exclude: Vec<String>,
    prefix: String,
    static_headers: Vec<(String, String)>,
}

impl HeaderForwarder {
    pub fn new(config: &HeaderForwardConfig) -> Self {
        debug!(
            enabled = config.enabled,
            include = ?config.include,
            exclude = ?config.exclude,
            prefix = %config.prefix,
            static_count = config.static_headers.len(),
            "Header forwarder initialized"
        );
        Self {
            enabled: config.enabled,
            include: config.include.clone(),
            exclude: config.exclude.clone(),
            prefix: config.prefix.clone(),
            static_headers: config.static_headers.clone(),
        }
    }

    /// Convert record headers to HTTP header pairs.
    ///
    /// When forwarding is disabled only the static set is returned. Output
    /// preserves arrival order; colliding names concatenate values with `,`
    /// per the HTTP list rule.
    pub fn forward(&self, headers: &[RecordHeader]) -> Vec<(String, String)> {
        let mut out: Vec<(String, String)> = Vec::new();

        if self.enabled {
            for header in headers {
                if !self.should_include(&header.key) {
                    trace!(header = %header.key, "Header excluded by filtering rules");
                    continue;
                }

                let value = match header.value.as_text() {
                    Some(v) => v,
                    None => {
                        trace!(header = %header.key, "Skipping header with null or undecodable value");
                        continue;
                    }
                };

                let name = format!("{}{}", self.prefix, sanitize_header_name(&header.key));

                if let Some(existing) = out.iter_mut().find(|(n, _)| *n == name) {
                    existing.1.push(',');
                    existing.1.push_str(&value);
                } else {
                    out.push((name, value));
                }
            }
        }

        // Static headers merge last and win on conflict.
        for (name, value) in &self.static_headers {
            if let Some(existing) = out.iter_mut().find(|(n, _)| n == name) {
                existing.1 = value.clone();
            } else {
                out.push((name.clone(), value.clone()));
            }
        }

        out
    }

    /// Include list first (empty = all), then excludes.
    fn should_include(&self, name: &str) -> bool {
        if !self.include.is_empty() && !self.include.iter().any(|p| glob_matches(name, p)) {
            return false;
        }
        !self.exclude.iter().any(|p| glob_matches(name, p))
    }
}

/// Match a name against a glob where `*` matches any substring.
pub fn glob_matches(name: &str, pattern: &str) -> bool {
    if pattern == "*" {
        return true;
    }
    if !pattern.contains('*') {
        return name == pattern;
    }

    let segments: Vec<&str> = pattern.split('*').collect();
    let mut remaining = name;

    // First segment anchors at the start unless the pattern leads with '*'.
    if let Some(first) = segments.first() {
        if !first.is_empty() {
            match remaining.strip_prefix(first) {
                Some(rest) => remaining = rest,
                None => return false,
            }
        }
    }

    // Last segment anchors at the end unless the pattern trails with '*'.
    let last = segments.last().copied().unwrap_or("");
    let middle = &segments[1..segments.len().saturating_sub(1)];

    for segment in middle {
        if segment.is_empty() {
            continue;
        }
        match remaining.find(segment) {
            Some(pos) => remaining = &remaining[pos + segment.len()..],
            None => return false,
        }
    }

    if last.is_empty() {
        true
    } else {
        remaining.ends_with(last)
    }
}

/// Replace characters outside `[A-Za-z0-9._-]` with `-`; when the first
/// character is not an ASCII letter, prepend `X-`.
pub fn sanitize_header_name(name: &str) -> String {
    if name.is_empty() {
        warn!("Empty header name sanitized to X-");
        return "X-".to_string();
    }

    let mut sanitized: String = name
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '.' || c == '_' || c == '-' {
                c
            } else {
                '-'
            }
        })
        .collect();

    if !sanitized
        .chars()
        .next()
        .map(|c| c.is_ascii_alphabetic())
        .unwrap_or(false)
    {
        sanitized = format!("X-{}", sanitized);
    }

    sanitized
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::HeaderValue;

    fn header(key: &str, value: &str) -> RecordHeader {
        RecordHeader {
            key: key.to_string(),
            value: HeaderValue::String(value.to_string()),
        }
    }

    fn forwarder(config: HeaderForwardConfig) -> HeaderForwarder {
        HeaderForwarder::new(&config)
    }

    fn default_config() -> HeaderForwardConfig {
        HeaderForwardConfig {
            enabled: true,
            include: Vec::new(),
            exclude: Vec::new(),
            prefix: String::new(),
            static_headers: Vec::new(),
        }
    }

    // ---- 1. Pass-through with no filters ----

    #[test]
    fn test_forward_all_by_default() {
        let f = forwarder(default_config());
        let out = f.forward(&[header("trace-id", "abc"), header("span-id", "def")]);
        assert_eq!(
            out,
            vec![
                ("trace-id".to_string(), "abc".to_string()),
                ("span-id".to_string(), "def".to_string()),
            ]
        );
    }

    // ---- 2. Disabled forwarding returns only statics ----

    #[test]
    fn test_disabled_returns_static_only() {
        let mut config = default_config();
        config.enabled = false;
        config.static_headers = vec![("X-Env".to_string(), "prod".to_string())];
        let f = forwarder(config);
        let out = f.forward(&[header("trace-id", "abc")]);
        assert_eq!(out, vec![("X-Env".to_string(), "prod".to_string())]);
    }

    // ---- 3. Include whitelist ----

    #[test]
    fn test_include_whitelist() {
        let mut config = default_config();
        config.include = vec!["trace-*".to_string()];
        let f = forwarder(config);
        let out = f.forward(&[header("trace-id", "abc"), header("span-id", "def")]);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].0, "trace-id");
    }

    // ---- 4. Exclude applies after include ----

    #[test]
    fn test_exclude_after_include() {
        let mut config = default_config();
        config.include = vec!["*".to_string()];
        config.exclude = vec!["secret-*".to_string()];
        let f = forwarder(config);
        let out = f.forward(&[header("secret-token", "x"), header("public", "y")]);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].0, "public");
    }

    // ---- 5. Glob semantics ----

    #[test]
    fn test_glob_matching() {
        assert!(glob_matches("anything", "*"));
        assert!(glob_matches("trace-id", "trace-*"));
        assert!(glob_matches("x-trace", "*-trace"));
        assert!(glob_matches("a-middle-z", "a*z"));
        assert!(glob_matches("exact", "exact"));
        assert!(!glob_matches("exact2", "exact"));
        assert!(!glob_matches("span-id", "trace-*"));
        assert!(glob_matches("a-b-c", "*b*"));
        assert!(!glob_matches("a-b-c", "*x*"));
        assert!(glob_matches("abc", "a*b*c"));
        assert!(!glob_matches("acb", "a*b*c"));
    }

    // ---- 6. Null and undecodable values are skipped ----

    #[test]
    fn test_null_and_invalid_values_skipped() {
        let f = forwarder(default_config());
        let headers = vec![
            RecordHeader {
                key: "nullish".to_string(),
                value: HeaderValue::Null,
            },
            RecordHeader {
                key: "binary".to_string(),
                value: HeaderValue::Bytes(vec![0xff, 0xfe]),
            },
            header("kept", "v"),
        ];
        let out = f.forward(&headers);
        assert_eq!(out, vec![("kept".to_string(), "v".to_string())]);
    }

    // ---- 7. Typed values normalize to text ----

    #[test]
    fn test_typed_value_normalization() {
        let f = forwarder(default_config());
        let headers = vec![
            RecordHeader {
                key: "count".to_string(),
                value: HeaderValue::Int(7),
            },
            RecordHeader {
                key: "flag".to_string(),
                value: HeaderValue::Bool(true),
            },
            RecordHeader {
                key: "raw".to_string(),
                value: HeaderValue::Bytes(b"bytes".to_vec()),
            },
        ];
        let out = f.forward(&headers);
        assert_eq!(
            out,
            vec![
                ("count".to_string(), "7".to_string()),
                ("flag".to_string(), "true".to_string()),
                ("raw".to_string(), "bytes".to_string()),
            ]
        );
    }

    // ---- 8. Name sanitization ----

    #[test]
    fn test_sanitize_header_name() {
        assert_eq!(sanitize_header_name("valid-name_1.x"), "valid-name_1.x");
        assert_eq!(sanitize_header_name("has space"), "has-space");
        assert_eq!(sanitize_header_name("tab\tchar"), "tab-char");
        assert_eq!(sanitize_header_name("1starts-digit"), "X-1starts-digit");
        assert_eq!(sanitize_header_name("_underscore"), "X-_underscore");
        assert_eq!(sanitize_header_name("ünïcode"), "X--n-code");
    }

    // ---- 9. Prefix applied after sanitization ----

    #[test]
    fn test_prefix_applied() {
        let mut config = default_config();
        config.prefix = "kafka.".to_string();
        let f = forwarder(config);
        let out = f.forward(&[header("trace id", "v")]);
        assert_eq!(out, vec![("kafka.trace-id".to_string(), "v".to_string())]);
    }

    // ---- 10. Collisions concatenate in arrival order ----

    #[test]
    fn test_collision_concatenation() {
        let f = forwarder(default_config());
        let out = f.forward(&[header("dup", "first"), header("dup", "second")]);
        assert_eq!(out, vec![("dup".to_string(), "first,second".to_string())]);
    }

    // ---- 11. Sanitization-induced collisions also concatenate ----

    #[test]
    fn test_sanitized_collision() {
        let f = forwarder(default_config());
        let out = f.forward(&[header("a b", "1"), header("a:b", "2")]);
        assert_eq!(out, vec![("a-b".to_string(), "1,2".to_string())]);
    }

    // ---- 12. Static headers override forwarded values ----

    #[test]
    fn test_static_overrides_forwarded() {
        let mut config = default_config();
        config.static_headers = vec![
            ("dup".to_string(), "static-wins".to_string()),
            ("X-Extra".to_string(), "added".to_string()),
        ];
        let f = forwarder(config);
        let out = f.forward(&[header("dup", "forwarded")]);
        assert_eq!(
            out,
            vec![
                ("dup".to_string(), "static-wins".to_string()),
                ("X-Extra".to_string(), "added".to_string()),
            ]
        );
    }

    // ---- 13. Property: emitted names are sanitized and letter-led ----

    #[test]
    fn test_emitted_names_always_valid() {
        let f = forwarder(default_config());
        let inputs = ["x", "9lives", " lead", "mix:ed/chars", "日本語"];
        let headers: Vec<RecordHeader> = inputs.iter().map(|k| header(k, "v")).collect();
        for (name, _) in f.forward(&headers) {
            assert!(
                name.chars()
                    .all(|c| c.is_ascii_alphanumeric() || c == '.' || c == '_' || c == '-'),
                "invalid char in '{}'",
                name
            );
            assert!(
                name.chars().next().unwrap().is_ascii_alphabetic(),
                "'{}' does not start with a letter",
                name
            );
        }
    }
}
