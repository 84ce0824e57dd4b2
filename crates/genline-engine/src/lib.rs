pub mod assets;
pub mod builder;
pub mod client;
pub mod dispatch;
pub mod merge;
pub mod pipeline;
pub mod seed;
pub mod workflow;

pub use client::{Balance, DryrunClient, GenerationClient, GenerationOutput};
pub use dispatch::{dispatch, Command, DispatchContext, Outcome, RenderResult};
pub use pipeline::Resolver;
