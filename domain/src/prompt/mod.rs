//! Prompt domain
//!
//! Templates for the role assessment, synthesis and paste-parsing prompts.

mod template;

pub use template::PromptTemplate;
