//! Dialect detection and translation between the three supported wire
//! formats (OpenAI chat-completions, Gemini native, Anthropic messages)
//! and the internal OpenAI-shaped canonical pivot defined in
//! `meridian_schema::canonical`.

mod detect;
mod request;
mod response;
mod stream;

pub use detect::{Dialect, detect};
pub use request::to_canonical;
pub use response::from_canonical;
pub use stream::StreamTranslator;
