//! LLM provider implementations for BizCanvas.
//!
//! One client covers every OpenAI-compatible `/chat/completions` endpoint
//! (Groq, OpenAI, OpenRouter, vLLM, ...), which is where both the expert
//! generation model and the smaller summarization model live.

pub mod openai_compat;

pub use openai_compat::OpenAiCompatProvider;
