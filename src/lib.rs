//! Todo Assist: owner-scoped task lists with LLM prioritization and emailed digests.

pub mod config;
pub mod digest;
pub mod error;
pub mod llm;
pub mod prioritize;
pub mod store;
pub mod todos;

#[cfg(test)]
pub(crate) mod test_support;
