//! Configuration module for Finn.
//!
//! Handles loading application settings and the widening vocabulary.

mod settings;
mod vocabulary;

pub use settings::{
    EmbeddingProvider, EmbeddingSettings, GeneralSettings, SearchSettings, Settings,
    StoreSettings,
};
pub use vocabulary::Vocabulary;
