//! Hanviet - Hán-Việt lookup service
//!
//! Converts Chinese-character text into pinyin romanization and Vietnamese
//! translation. Translation goes through an ordered chain of free public
//! providers with per-provider retries and a flat-file result cache;
//! romanization is offline via the `pinyin` crate.

pub mod cache;
pub mod cli;
pub mod config;
pub mod error;
pub mod lookup;
pub mod pinyin;
pub mod translate;
pub mod web;
