pub mod config;
pub mod error;
pub mod glossary;
pub mod google;
pub mod handler;
pub mod i18n;
pub mod openai;
pub mod replacer;
pub mod security;
pub mod server;
pub mod translation;
