//! Concrete text-generation and speech-synthesis backends

mod chatterbox;
mod gemini;

pub use chatterbox::ChatterboxClient;
pub use gemini::GeminiGenerator;
