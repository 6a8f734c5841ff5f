use std::fmt::{Display, Formatter};

use encoding_rs::{Decoder, DecoderResult, Encoding, UTF_8};

/// Coarse category of a chunk of process output, used for presentation only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Classification {
    Plain,
    Error,
    Warning,
    Success,
    Prompt,
}

impl Display for Classification {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        formatter.write_str(match self {
            Self::Plain => "plain",
            Self::Error => "error",
            Self::Warning => "warning",
            Self::Success => "success",
            Self::Prompt => "prompt",
        })
    }
}

const ERROR_MARKERS: [&str; 3] = ["error", "failed", "exception"];
const WARNING_MARKERS: [&str; 1] = ["warning"];
const SUCCESS_MARKERS: [&str; 2] = ["success", "completed"];

/// Classifies a chunk of output. The first matching rule wins, in the order
/// error, warning, success, prompt.
pub fn classify(text: &str) -> Classification {
    let lowercase = text.to_lowercase();
    let contains_any = |markers: &[&str]| markers.iter().any(|marker| lowercase.contains(marker));

    if contains_any(&ERROR_MARKERS) {
        Classification::Error
    } else if contains_any(&WARNING_MARKERS) {
        Classification::Warning
    } else if contains_any(&SUCCESS_MARKERS) {
        Classification::Success
    } else if text.trim_start().starts_with('>') {
        Classification::Prompt
    } else {
        Classification::Plain
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputEvent {
    pub text: String,
    pub classification: Classification,
}

impl OutputEvent {
    pub fn new(text: String) -> Self {
        let classification = classify(&text);
        Self {
            text,
            classification,
        }
    }
}

/// Incremental decoder for a run's output.
///
/// Chunks are decoded with the primary encoding, which is usually the
/// locale's (see [`crate::config::locale_encoding`]). A multi-byte sequence
/// split across two reads is held back until the rest arrives. A chunk that
/// is not valid in the primary encoding is shown as lossy UTF-8 instead of
/// failing the run.
pub struct OutputDecoder {
    encoding: &'static Encoding,
    decoder: Decoder,
}

impl OutputDecoder {
    pub fn new(encoding: &'static Encoding) -> Self {
        Self {
            encoding,
            decoder: encoding.new_decoder_without_bom_handling(),
        }
    }

    pub fn encoding(&self) -> &'static Encoding {
        self.encoding
    }

    pub fn decode(&mut self, chunk: &[u8]) -> String {
        if let Some(text) = self.decode_strict(chunk) {
            return text;
        }

        self.decoder = self.encoding.new_decoder_without_bom_handling();
        String::from_utf8_lossy(chunk).into_owned()
    }

    /// Flushes whatever is still held back once the stream has ended.
    pub fn finish(&mut self) -> Option<String> {
        let fresh = self.encoding.new_decoder_without_bom_handling();
        let mut decoder = std::mem::replace(&mut self.decoder, fresh);

        let mut text = String::with_capacity(decoder.max_utf8_buffer_length(0).unwrap_or(16));
        let _ = decoder.decode_to_string(&[], &mut text, true);

        (!text.is_empty()).then_some(text)
    }

    /// `None` when the chunk is malformed in the primary encoding.
    fn decode_strict(&mut self, chunk: &[u8]) -> Option<String> {
        let mut text = String::new();
        let mut input = chunk;

        loop {
            let needed = self
                .decoder
                .max_utf8_buffer_length_without_replacement(input.len())
                .unwrap_or(input.len() * 3 + 16);
            text.reserve(needed);

            let (result, read) =
                self.decoder
                    .decode_to_string_without_replacement(input, &mut text, false);
            input = &input[read..];

            match result {
                DecoderResult::InputEmpty => return Some(text),
                DecoderResult::OutputFull => {}
                DecoderResult::Malformed(_, _) => return None,
            }
        }
    }
}

impl Default for OutputDecoder {
    fn default() -> Self {
        Self::new(UTF_8)
    }
}

impl std::fmt::Debug for OutputDecoder {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        formatter
            .debug_struct("OutputDecoder")
            .field("encoding", &self.encoding.name())
            .finish_non_exhaustive()
    }
}
