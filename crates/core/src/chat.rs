//! Chat message vocabulary, validation and assistant reply texts.

use crate::error::CoreError;

// ---------------------------------------------------------------------------
// Roles and message types
// ---------------------------------------------------------------------------

pub const ROLE_USER: &str = "user";
pub const ROLE_ASSISTANT: &str = "assistant";
pub const ROLE_SYSTEM: &str = "system";

/// All valid message roles.
pub const VALID_ROLES: &[&str] = &[ROLE_USER, ROLE_ASSISTANT, ROLE_SYSTEM];

pub const MESSAGE_TYPE_TEXT: &str = "text";
pub const MESSAGE_TYPE_IMAGE: &str = "image";

/// All valid message types.
pub const VALID_MESSAGE_TYPES: &[&str] = &[MESSAGE_TYPE_TEXT, MESSAGE_TYPE_IMAGE];

// ---------------------------------------------------------------------------
// Validation constants
// ---------------------------------------------------------------------------

/// Title given to conversations created without one.
pub const DEFAULT_CONVERSATION_TITLE: &str = "New Chat";

/// Maximum conversation title length (characters).
pub const MAX_TITLE_LENGTH: usize = 200;

/// Maximum chat message length (characters).
pub const MAX_CONTENT_LENGTH: usize = 10_000;

pub fn validate_role(role: &str) -> Result<(), CoreError> {
    if VALID_ROLES.contains(&role) {
        Ok(())
    } else {
        Err(CoreError::Validation(format!(
            "Invalid message role '{role}'. Must be one of: {VALID_ROLES:?}"
        )))
    }
}

pub fn validate_message_type(message_type: &str) -> Result<(), CoreError> {
    if VALID_MESSAGE_TYPES.contains(&message_type) {
        Ok(())
    } else {
        Err(CoreError::Validation(format!(
            "Invalid message type '{message_type}'. Must be one of: {VALID_MESSAGE_TYPES:?}"
        )))
    }
}

/// Validate and normalise a conversation title, returning the trimmed value.
pub fn validate_title(title: &str) -> Result<String, CoreError> {
    let title = title.trim();
    if title.is_empty() {
        return Err(CoreError::Validation("Title cannot be empty".into()));
    }
    if title.chars().count() > MAX_TITLE_LENGTH {
        return Err(CoreError::Validation(format!(
            "Title exceeds maximum length of {MAX_TITLE_LENGTH} characters"
        )));
    }
    Ok(title.to_string())
}

/// Validate the content of a user-submitted chat message.
pub fn validate_content(content: &str) -> Result<(), CoreError> {
    if content.trim().is_empty() {
        return Err(CoreError::Validation("Message content cannot be empty".into()));
    }
    if content.chars().count() > MAX_CONTENT_LENGTH {
        return Err(CoreError::Validation(format!(
            "Message exceeds maximum length of {MAX_CONTENT_LENGTH} characters"
        )));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Assistant replies
// ---------------------------------------------------------------------------

/// Shown when both the primary and the fallback image provider failed.
pub const IMAGE_UNAVAILABLE_MESSAGE: &str =
    "Image generation is currently unavailable. Please try again later.";

/// Shown instead of a completion when no text provider is configured.
pub const TEXT_UNCONFIGURED_REPLY: &str = "I apologize, but I'm currently unable to generate \
    text responses because the text generation service is not configured. Please check the \
    server configuration and ensure a valid API key is provided.";

/// Reply attached to an image produced by the primary image model.
pub fn primary_image_reply(model_label: &str, request: &str) -> String {
    format!("I've created a high-quality image using {model_label} based on your request: \"{request}\"")
}

/// Reply attached to an image produced by the fallback provider.
pub fn fallback_image_reply(fallback_label: &str, primary_label: &str, request: &str) -> String {
    format!(
        "I've generated an image using {fallback_label} based on your request: \"{request}\" \
         ({primary_label} was unavailable)"
    )
}

/// Reply persisted when processing a message failed.
pub fn error_reply(detail: &str) -> String {
    format!("Sorry, I encountered an error: {detail}")
}
