//! Infrastructure layer: document store, repositories, orchestrator client,
//! command dispatch, configuration and startup initialization.

pub mod command_dispatcher;
pub mod config;
pub mod document_store;
pub mod initializer;
pub mod orchestrator;
pub mod repositories;

mod integration_tests;
