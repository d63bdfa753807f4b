//! Text-generation providers for the affinity engine.
//!
//! All providers implement the `affinity_core::Provider` trait.
//! The router builds them from configuration and wraps the default in an
//! optional fallback chain.

pub mod fallback;
pub mod openai_compat;
pub mod router;

pub use fallback::FallbackProvider;
pub use openai_compat::OpenAiCompatProvider;
pub use router::{ProviderRouter, build_from_config, primary_from_config};
