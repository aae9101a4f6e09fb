use regex::{Captures, Regex};
use std::fmt;
use std::io::{self, Write};
use std::sync::{Arc, LazyLock};
use tracing_subscriber::fmt::MakeWriter;

static API_KEY_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\bsk-[a-zA-Z0-9_-]{16,}").expect("valid api key pattern"));

static TOKEN_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"["']?(?:api_key|apikey|token|secret)["']?\s*[:=]\s*["']?([a-zA-Z0-9_.-]{16,})["']?"#,
    )
    .expect("valid token pattern")
});

static BEARER_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"Bearer\s+[a-zA-Z0-9_.~+/=-]+").expect("valid bearer pattern"));

/// Redacts credentials from formatted log output
#[derive(Clone, Copy, Default)]
pub struct SecretScrubber;

impl SecretScrubber {
    pub const fn new() -> Self {
        Self
    }

    /// Scrub a message of sensitive data
    pub fn scrub_message(&self, message: &str) -> String {
        let scrubbed = API_KEY_PATTERN.replace_all(message, "[API_KEY_REDACTED]");
        let scrubbed = BEARER_PATTERN.replace_all(&scrubbed, "Bearer [TOKEN_REDACTED]");
        TOKEN_PATTERN
            .replace_all(&scrubbed, |caps: &Captures| {
                let full_match = &caps[0];
                full_match
                    .find([':', '='])
                    .map_or_else(|| "[REDACTED]".to_string(), |pos| {
                        format!("{}{}[REDACTED]", &full_match[..pos], &full_match[pos..=pos])
                    })
            })
            .into_owned()
    }
}

impl fmt::Debug for SecretScrubber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SecretScrubber").finish()
    }
}

/// `MakeWriter` that scrubs every formatted event before it reaches `inner`.
///
/// The fmt layer writes one event per `write` call, so scrubbing happens on
/// whole lines.
#[derive(Debug, Clone)]
pub struct ScrubbingMakeWriter<M> {
    inner: M,
    scrubber: Arc<SecretScrubber>,
}

impl<M> ScrubbingMakeWriter<M> {
    pub fn new(inner: M) -> Self {
        Self {
            inner,
            scrubber: Arc::new(SecretScrubber::new()),
        }
    }
}

impl<'a, M: MakeWriter<'a>> MakeWriter<'a> for ScrubbingMakeWriter<M> {
    type Writer = ScrubbingWriter<M::Writer>;

    fn make_writer(&'a self) -> Self::Writer {
        ScrubbingWriter {
            inner: self.inner.make_writer(),
            scrubber: Arc::clone(&self.scrubber),
        }
    }
}

pub struct ScrubbingWriter<W> {
    inner: W,
    scrubber: Arc<SecretScrubber>,
}

impl<W: Write> Write for ScrubbingWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let text = String::from_utf8_lossy(buf);
        self.inner
            .write_all(self.scrubber.scrub_message(&text).as_bytes())?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}
