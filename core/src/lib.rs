//! Orchestration engine for product-research agent workflows.
//!
//! A free-text query is turned into a [`plan::Plan`] by the [`planner`], executed
//! by the [`executor`] against pluggable node backends, and condensed into a
//! [`finalize::Report`]. Everything that touches the network (LLM providers,
//! search, scraping) sits behind the traits in [`llm`] and [`backend`].

pub mod api;
pub mod backend;
pub mod config;
pub mod error;
pub mod executor;
pub mod finalize;
pub mod llm;
pub mod nodes;
pub mod plan;
pub mod planner;
pub mod workflow;
