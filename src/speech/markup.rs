//! Speech synthesis markup (SSML) construction

/// Escape markup-significant characters before embedding text in a document
#[must_use]
pub fn escape_text(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            '/' => escaped.push_str("&#x2F;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

/// Build an SSML document for one utterance
///
/// Leading silence is zeroed so queued utterances flow into each other
/// without an audible gap. `ending_silence_ms` appends a trailing break,
/// used by filler phrases to hold the floor while the real reply is still
/// streaming.
#[must_use]
pub fn ssml_document(voice: &str, text: &str, ending_silence_ms: u64) -> String {
    let body = escape_text(text);
    if ending_silence_ms > 0 {
        format!(
            "<speak version='1.0' xmlns='http://www.w3.org/2001/10/synthesis' xmlns:mstts='http://www.w3.org/2001/mstts' xml:lang='en-US'><voice name='{voice}'><mstts:leadingsilence-exact value='0'/>{body}<break time='{ending_silence_ms}ms'/></voice></speak>"
        )
    } else {
        format!(
            "<speak version='1.0' xmlns='http://www.w3.org/2001/10/synthesis' xmlns:mstts='http://www.w3.org/2001/mstts' xml:lang='en-US'><voice name='{voice}'><mstts:leadingsilence-exact value='0'/>{body}</voice></speak>"
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_covers_markup_characters() {
        assert_eq!(
            escape_text(r#"a & b < c > d " e ' f / g"#),
            "a &amp; b &lt; c &gt; d &quot; e &#39; f &#x2F; g"
        );
    }

    #[test]
    fn test_plain_text_is_untouched() {
        assert_eq!(escape_text("Hello, world."), "Hello, world.");
    }

    #[test]
    fn test_document_embeds_voice_and_escaped_text() {
        let ssml = ssml_document("en-US-JennyNeural", "Tom & Jerry", 0);
        assert!(ssml.contains("name='en-US-JennyNeural'"));
        assert!(ssml.contains("Tom &amp; Jerry"));
        assert!(!ssml.contains("<break"));
    }

    #[test]
    fn test_document_zeroes_leading_silence() {
        let ssml = ssml_document("en-US-JennyNeural", "Hello.", 0);
        assert!(ssml.contains("xmlns:mstts='http://www.w3.org/2001/mstts'"));
        assert!(ssml.contains("<mstts:leadingsilence-exact value='0'/>"));
    }

    #[test]
    fn test_ending_silence_adds_break() {
        let ssml = ssml_document("en-US-JennyNeural", "One moment.", 2000);
        assert!(ssml.contains("<break time='2000ms'/>"));
    }
}
