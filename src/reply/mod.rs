//! Structured reply model, validation and media sanitizing.

pub mod media;
pub mod types;
pub mod validator;

pub use media::{canonical_video_url, extract_video_id, is_allowed_image_url};
pub use types::{ImageRef, StructuredReply};
pub use validator::{
    APOLOGY_TEXT, GENERIC_SUGGESTIONS, NO_CREDENTIALS_TEXT, ReplyValidator, Validated,
    is_structured, parse_object,
};
