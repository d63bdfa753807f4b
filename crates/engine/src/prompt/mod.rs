//! System instruction assembly.
//!
//! | Module | Role |
//! |---|---|
//! | [`composer`] | Budgeted assembly of titled sections |
//! | [`builder`] | Section table of the flow pipeline |
//! | [`classic`] | Single-block instruction of the classic pipeline |

pub mod builder;
pub mod classic;
pub mod composer;

pub use builder::{FlowInput, PromptBuilder};
pub use classic::{ClassicInput, build_classic_prompt};
pub use composer::{ComposedPrompt, PromptComposer, PromptSection, compose};
