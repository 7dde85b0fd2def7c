/// One parsed wire event: a `field: value` line from the raw stream
///
/// Ephemeral; produced by the tokenizer, consumed by the dispatcher, not
/// retained afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WireEvent {
    pub field: String,
    pub value: String,
    /// Original line as received, without the terminating newline
    pub raw: String,
}

impl WireEvent {
    /// Best-effort parse of one line; never fails
    ///
    /// `field: value` splits at the first colon with one leading space of
    /// the value stripped (SSE convention). A line with no colon yields the
    /// whole trimmed line as the field and an empty value. Blank lines yield
    /// nothing.
    fn parse(raw: &str) -> Option<Self> {
        let line = raw.trim_end_matches('\r');
        if line.trim().is_empty() {
            return None;
        }

        match line.split_once(':') {
            Some((field, value)) => Some(Self {
                field: field.trim().to_string(),
                value: value.strip_prefix(' ').unwrap_or(value).to_string(),
                raw: line.to_string(),
            }),
            None => Some(Self {
                field: line.trim().to_string(),
                value: String::new(),
                raw: line.to_string(),
            }),
        }
    }
}

/// Splits an incrementally appended byte stream into wire events
///
/// Fragments may cut lines anywhere; unterminated tails stay buffered until
/// a later `append` completes them. The raw buffer is retained so `body`
/// can return everything received; call `reset` to bound memory.
#[derive(Debug, Default)]
pub struct SseTokenizer {
    buf: Vec<u8>,
    cursor: usize,
}

impl SseTokenizer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a fragment and return every newly completed event, in order
    ///
    /// A fragment with no newline produces no events; a fragment closing
    /// several lines produces them all in one call.
    pub fn append(&mut self, fragment: impl AsRef<[u8]>) -> Vec<WireEvent> {
        self.buf.extend_from_slice(fragment.as_ref());

        let mut events = Vec::new();
        while let Some(pos) = self.buf[self.cursor..].iter().position(|&b| b == b'\n') {
            let end = self.cursor + pos;
            let line = String::from_utf8_lossy(&self.buf[self.cursor..end]).into_owned();
            self.cursor = end + 1;

            if let Some(event) = WireEvent::parse(&line) {
                events.push(event);
            }
        }
        events
    }

    /// Full raw buffer accumulated so far, including consumed lines
    pub fn body(&self) -> String {
        String::from_utf8_lossy(&self.buf).into_owned()
    }

    /// Bytes currently buffered
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// Discard the buffer and offset tracking
    pub fn reset(&mut self) {
        self.buf.clear();
        self.cursor = 0;
    }
}
