use tracing_subscriber::fmt::MakeWriter;

/// A writer that redacts API keys and store credentials from log output.
pub struct RedactingWriter<W> {
    inner: W,
}

impl RedactingWriter<std::io::Stderr> {
    pub fn stderr() -> Self {
        Self {
            inner: std::io::stderr(),
        }
    }
}

impl<W: std::io::Write> std::io::Write for RedactingWriter<W> {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        let original = String::from_utf8_lossy(buf);
        let redacted = redact_secrets(&original);
        self.inner.write_all(redacted.as_bytes())?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.inner.flush()
    }
}

impl<'a> MakeWriter<'a> for RedactingWriter<std::io::Stderr> {
    type Writer = RedactingWriter<std::io::Stderr>;

    fn make_writer(&'a self) -> Self::Writer {
        RedactingWriter {
            inner: std::io::stderr(),
        }
    }
}

/// Replace known credential patterns with `[REDACTED]`.
pub fn redact_secrets(input: &str) -> String {
    static PATTERNS: std::sync::LazyLock<regex::Regex> = std::sync::LazyLock::new(|| {
        regex::Regex::new(
            r"(?x)
              sk-[A-Za-z0-9_\-]{20,}        # OpenAI keys, including sk-proj-
            | \bck_[A-Za-z0-9]{16,}         # WooCommerce consumer keys
            | \bcs_[A-Za-z0-9]{16,}         # WooCommerce consumer secrets
            | Basic\s+[A-Za-z0-9+/=]{8,}    # basic auth headers
            | Bearer\s+[A-Za-z0-9._\-]{8,}  # bearer tokens
            ",
        )
        .expect("redaction regex should compile")
    });

    PATTERNS.replace_all(input, "[REDACTED]").into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn redacts_openai_key() {
        let input = "key=sk-1234567890123456789012345";
        assert_eq!(redact_secrets(input), "key=[REDACTED]");
    }

    #[test]
    fn redacts_project_key() {
        let input = "sk-proj-abcdefghijklmnopqrstuvwxyz0123";
        assert_eq!(redact_secrets(input), "[REDACTED]");
    }

    #[test]
    fn redacts_woocommerce_credentials() {
        let input = "consumer ck_0123456789abcdef0123 secret cs_fedcba9876543210fedc";
        assert_eq!(
            redact_secrets(input),
            "consumer [REDACTED] secret [REDACTED]"
        );
    }

    #[test]
    fn redacts_authorization_headers() {
        let input = r#"{"Authorization":"Basic Y2tfYTpjc19iY2Rl"}"#;
        assert_eq!(redact_secrets(input), r#"{"Authorization":"[REDACTED]"}"#);
        assert_eq!(redact_secrets("Bearer abc.def-ghi"), "[REDACTED]");
    }

    #[test]
    fn leaves_normal_text_unchanged() {
        let input = "check availability for product 42 on 2025-03-01";
        assert_eq!(redact_secrets(input), input);
    }

    #[test]
    fn writer_redacts_before_forwarding() {
        let mut writer = RedactingWriter { inner: Vec::new() };
        let line = b"token sk-1234567890123456789012345\n";
        let written = writer.write(line).unwrap();
        assert_eq!(written, line.len());
        assert_eq!(String::from_utf8(writer.inner).unwrap(), "token [REDACTED]\n");
    }
}
