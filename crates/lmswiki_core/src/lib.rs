pub mod catalog;
pub mod compare;
pub mod config;
pub mod coverage;
pub mod derive;
pub mod enrich;
pub mod error;
pub mod item;
pub mod output;
pub mod overrides;
pub mod pipeline;
pub mod render;
pub mod runtime;
