pub mod assets;
pub mod errors;
pub mod models;
pub mod options;
pub mod plugin;
pub mod priority;
pub mod request;
pub mod runs;
pub mod workflow;
