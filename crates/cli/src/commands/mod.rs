pub mod ask;
pub mod check;
pub mod doctor;
pub mod onboard;
pub mod serve;
pub mod templates;

use propdesk_assistant::StructuredInput;

/// Interpret a command-line input: JSON when it parses, plain text otherwise.
pub fn parse_input(raw: Option<&str>) -> StructuredInput {
    match raw {
        None => StructuredInput::default(),
        Some(s) => serde_json::from_str(s)
            .map(StructuredInput::new)
            .unwrap_or_else(|_| StructuredInput::text(s)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_or_text_input() {
        assert_eq!(
            parse_input(Some(r#"{"address":"1 Main St"}"#)).to_json(),
            r#"{"address":"1 Main St"}"#
        );
        assert_eq!(parse_input(Some("add a search bar")).to_text(), "add a search bar");
        assert_eq!(parse_input(None).to_text(), "");
    }
}
