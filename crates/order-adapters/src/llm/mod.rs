//! Clientes del puerto LLM.

pub mod openai;
pub mod scripted;

pub use openai::OpenAiChatClient;
pub use scripted::ScriptedLlm;
