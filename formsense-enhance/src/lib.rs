//! formsense-enhance library interface
//!
//! Classifies HTML form fields (semantic type, human label, validation) by
//! combining a rule-based enhancer with an optional local-LLM enhancer.

pub mod cache;
pub mod config;
pub mod enhancers;
pub mod inference;
pub mod merge;
pub mod service;
pub mod types;

pub use crate::config::{EnhancementConfig, EnhancementConfigPatch};
pub use crate::service::{FieldEnhancementService, FieldEnhancementServiceBuilder, BATCH_SIZE};
pub use crate::types::{
    ConfidenceLevel, ElementDescriptor, EnhanceError, EnhancementResult, EnhancementSource,
    FieldContext, FieldEnhancer, ValidationSpec,
};
