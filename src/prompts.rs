//! Prompts for the vision-model OCR engine.
//!
//! The model is used as a plain transcriber: the grid parser downstream
//! expects raw lines with column gaps, not Markdown or JSON.

/// System prompt for transcribing a budget page image.
pub const TRANSCRIBE_SYSTEM_PROMPT: &str = r#"You are an OCR engine. Transcribe the text of the document image exactly as printed.

Rules:
1. Output plain text only, one printed line per output line, top to bottom.
2. Keep table rows on a single line and separate table cells with " | ".
3. Copy numbers, prices (R$ 1.234,56), codes and units exactly; never reformat or convert them.
4. Keep the original language and accents. Do not translate.
5. Do not add commentary, headings, Markdown or code fences.
6. If the image has no readable text, output nothing."#;

/// Language hint appended as a second system message.
///
/// `language` is a Tesseract-style code (`por`, `eng`, `spa`).
pub fn language_hint(language: &str) -> String {
    let name = match language {
        "por" => "Brazilian Portuguese",
        "eng" => "English",
        "spa" => "Spanish",
        other => other,
    };
    format!("The document is written in {name}.")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn language_names() {
        assert_eq!(language_hint("por"), "The document is written in Brazilian Portuguese.");
        assert_eq!(language_hint("deu"), "The document is written in deu.");
    }

    #[test]
    fn prompt_asks_for_cell_separators() {
        assert!(TRANSCRIBE_SYSTEM_PROMPT.contains(" | "));
    }
}
