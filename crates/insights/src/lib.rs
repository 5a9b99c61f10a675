pub mod generator;
pub mod report;
pub mod summary;

pub use generator::{
    ChatMessage, ChatResponse, InsightsError, OllamaClient, TextGenerator, DEFAULT_BASE_URL,
    DEFAULT_MODEL,
};
pub use report::{build_prompt, generate_insights, write_insights, INSIGHTS_TABLE};
pub use summary::{summarize, to_markdown, MonthlySummary};
