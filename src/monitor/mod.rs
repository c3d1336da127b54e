pub mod orchestrator;
pub mod pipeline;
