//! Generative provider access: the client seam, the Gemini client and the
//! multi-credential invocation engine.

pub mod client;
pub mod engine;
pub mod error;
pub mod gemini;

pub use client::{GenerationRequest, ProviderClient};
pub use engine::InvocationEngine;
pub use error::{AttemptFailure, FailureClass, InvocationError, ProviderError};
pub use gemini::GeminiClient;
