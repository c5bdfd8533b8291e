//! Strips live-reload and dev-server injections from served HTML.
//!
//! This is literal text surgery anchored on `</body>` / `</html>`, not a DOM
//! transform: everything outside the matched fragments is kept byte for byte.
//! Rules run in a fixed order and the order matters.

use std::sync::LazyLock;

use regex::Regex;
use tracing::warn;

const ROOT_CLOSE: &str = "</html>";

static RULES: LazyLock<Result<Rules, regex::Error>> = LazyLock::new(Rules::compile);

struct Rules {
    trailing_injection: Regex,
    signatures: Vec<Regex>,
    blank_runs: Regex,
}

impl Rules {
    fn compile() -> Result<Self, regex::Error> {
        let signatures = [
            // bootstrap call
            r"(?is)<script>document\.write\(.*?livereload\.js.*?\)</script>",
            // disconnect handler
            r"(?is)<script>\s*document\.addEventListener\(.*?LiveReloadDisconnect.*?\)</script>",
            // reload plugin class
            r"(?is)<script>\s*class\s+reloadPlugin.*?</script>",
            r#"(?is)<script[^>]*src=["'][^"']*livereload\.js[^"']*["'][^>]*></script>"#,
            r#"(?is)<script[^>]*src=["'][^"']*:(?:35729|35929)[^"']*["'][^>]*></script>"#,
        ]
        .into_iter()
        .map(Regex::new)
        .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            trailing_injection: Regex::new(
                r"(?is)(</body>)\s*<script>.*?livereload.*?</script>\s*(?:<script>.*?</script>\s*)*\s*(</html>)",
            )?,
            signatures,
            blank_runs: Regex::new(r"\n\s*\n\s*\n+")?,
        })
    }

    fn apply(&self, text: &str) -> String {
        let text = truncate_after_root_close(text);
        let mut text = self
            .trailing_injection
            .replace_all(text, "${1}${2}")
            .into_owned();
        for signature in &self.signatures {
            text = signature.replace_all(&text, "").into_owned();
        }
        let text = truncate_after_root_close(&text);
        let text = self.blank_runs.replace_all(text, "\n\n");

        let mut out = text.trim().to_string();
        if !out.ends_with(ROOT_CLOSE) {
            out.push('\n');
            out.push_str(ROOT_CLOSE);
        }
        out
    }
}

/// Returns the cleaned document. Never fails: if the rules are unusable the
/// input comes back untouched.
pub fn sanitize(input: &[u8]) -> Vec<u8> {
    match RULES.as_ref() {
        Ok(rules) => rules.apply(&String::from_utf8_lossy(input)).into_bytes(),
        Err(err) => {
            warn!("html sanitizer unavailable, keeping content as served: {err}");
            input.to_vec()
        }
    }
}

/// Cuts everything after the first case-sensitive `</html>`, keeping the tag.
fn truncate_after_root_close(text: &str) -> &str {
    match text.find(ROOT_CLOSE) {
        Some(at) => &text[..at + ROOT_CLOSE.len()],
        None => text,
    }
}
