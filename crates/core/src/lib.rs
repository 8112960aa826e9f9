//! # liftlog core
//!
//! Domain types, traits, and error definitions for the liftlog fitness agent.
//! This crate has **no framework dependencies**; it defines the domain model
//! the other crates implement against.
//!
//! Every external capability the agent leans on (LLM provider, tools,
//! fitness-log storage) is a trait here, so the orchestration core can be
//! driven by real backends in production and by scripted fakes in tests.

pub mod error;
pub mod message;
pub mod provider;
pub mod store;
pub mod tool;

// Re-export key types at crate root for ergonomics
pub use error::{Error, Result};
pub use message::{Message, MessageToolCall, Role};
pub use provider::{Provider, ProviderRequest, ProviderResponse, ToolDefinition};
pub use store::{
    FitnessStore, NewNutritionEntry, NewWorkoutSession, NutritionEntry, RESERVED_NUTRITION_KEYS,
    WorkoutSession,
};
pub use tool::{Tool, ToolCall, ToolEnvelope, ToolRegistry};
