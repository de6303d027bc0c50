//! Language support for the translation service.
//!
//! - `registry`: single source of truth for the language codes the service accepts
//! - `language`: validated `Language` handle used in requests and glossary lookups
//!
//! # Example
//!
//! ```rust,ignore
//! use varnantar::i18n::{Language, LanguageRegistry};
//!
//! // Pivot language for summaries (English)
//! let canonical = Language::canonical();
//!
//! // Create language from code
//! let gujarati = Language::from_code("gu")?;
//!
//! // List every language that can be a translation target
//! let targets = LanguageRegistry::get().list_targets();
//! ```

mod language;
mod registry;

pub use language::{deserialize_target, Language};
pub use registry::{LanguageConfig, LanguageRegistry};
