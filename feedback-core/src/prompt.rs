//! Prompt composition
//!
//! Builds the single text block sent as the user turn. Line order is fixed
//! and significant: language instruction, tone instruction, context, then
//! the message. Absent or blank optional fields produce no line.

use crate::types::GenerationRequest;

/// Compose the user prompt for a request
pub fn compose(request: &GenerationRequest) -> String {
    let mut lines = Vec::with_capacity(4);
    if let Some(language) = non_blank(&request.language) {
        lines.push(format!("Respond in {language}."));
    }
    if let Some(tone) = non_blank(&request.tone) {
        lines.push(format!("Tone: {tone}."));
    }
    if let Some(context) = non_blank(&request.context) {
        lines.push(format!("Context: {context}"));
    }
    lines.push(format!("Message: {}", request.message));
    lines.join("\n")
}

fn non_blank(field: &Option<String>) -> Option<&str> {
    field.as_deref().filter(|value| !value.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_only() {
        let request = GenerationRequest::new("The delivery was late");
        assert_eq!(compose(&request), "Message: The delivery was late");
    }

    #[test]
    fn test_all_fields_in_fixed_order() {
        let request = GenerationRequest {
            message: "The delivery was late".to_string(),
            context: Some("Order #123".to_string()),
            tone: Some("apologetic".to_string()),
            language: Some("Spanish".to_string()),
            ..GenerationRequest::default()
        };
        assert_eq!(
            compose(&request),
            "Respond in Spanish.\nTone: apologetic.\nContext: Order #123\nMessage: The delivery was late"
        );
    }

    #[test]
    fn test_blank_optionals_produce_no_lines() {
        let request = GenerationRequest {
            message: "hello".to_string(),
            tone: Some("  ".to_string()),
            language: Some(String::new()),
            ..GenerationRequest::default()
        };
        assert_eq!(compose(&request), "Message: hello");
    }
}
