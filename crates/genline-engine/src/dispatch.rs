use std::path::PathBuf;

use genline_contracts::errors::ResolveError;
use genline_contracts::options::RawOptions;
use genline_contracts::plugin::PluginConfig;
use genline_contracts::request::ResolvedRequest;
use genline_contracts::runs::last_render::{LastRenderRecord, LastRenderStore};
use serde_json::{json, Map, Value};

use crate::client::{classify_failure, Balance, GenerationClient, GenerationOutput};
use crate::merge::merge_options;
use crate::pipeline::Resolver;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Help,
    Version,
    Last,
    Balance,
    Render,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RenderResult {
    pub request: ResolvedRequest,
    pub output: GenerationOutput,
    pub recorded: bool,
}

impl RenderResult {
    pub fn payload(&self) -> Map<String, Value> {
        let mut out = Map::new();
        out.insert("success".to_string(), json!(true));
        out.extend(self.request.echo_fields());
        out.insert("seeds".to_string(), json!(self.output.seeds));
        out.insert("projectId".to_string(), json!(self.output.project_id));
        out.insert("urls".to_string(), json!(self.output.urls));
        if let Some(path) = &self.output.local_path {
            out.insert("localPath".to_string(), json!(path));
        }
        out
    }
}

/// What an invocation ended with. Only the binary turns this into output
/// and an exit code.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Help,
    Version,
    Last(Option<LastRenderRecord>),
    Balance(Balance),
    Render(Box<RenderResult>),
    Error {
        error: ResolveError,
        prompt: Option<String>,
    },
}

impl Outcome {
    pub fn exit_code(&self) -> i32 {
        match self {
            Outcome::Error { .. } => 1,
            _ => 0,
        }
    }
}

/// Collaborators one invocation runs against.
pub struct DispatchContext {
    pub config_path: PathBuf,
    pub store: LastRenderStore,
    pub client: Box<dyn GenerationClient>,
}

impl DispatchContext {
    fn load_config(&self) -> Result<Option<PluginConfig>, ResolveError> {
        let config = PluginConfig::load(&self.config_path)?;
        if config.is_some() {
            tracing::debug!(path = %self.config_path.display(), "loaded plugin config");
        }
        Ok(config)
    }
}

pub fn dispatch(command: Command, raw: &RawOptions, context: &DispatchContext) -> Outcome {
    let result = match command {
        Command::Help => return Outcome::Help,
        Command::Version => return Outcome::Version,
        Command::Last => return Outcome::Last(context.store.load()),
        Command::Balance => balance(raw, context).map(Outcome::Balance),
        Command::Render => render(raw, context).map(|result| Outcome::Render(Box::new(result))),
    };
    result.unwrap_or_else(|error| {
        tracing::debug!(code = error.code(), error = %error, "invocation failed");
        Outcome::Error {
            error,
            prompt: raw.prompt.clone(),
        }
    })
}

fn balance(raw: &RawOptions, context: &DispatchContext) -> Result<Balance, ResolveError> {
    let config = context.load_config()?;
    let token_type = merge_options(raw, config.as_ref()).token_type;
    context
        .client
        .balance(token_type)
        .map_err(|err| ResolveError::GenerationFailed(format!("{err:#}")))
}

fn render(raw: &RawOptions, context: &DispatchContext) -> Result<RenderResult, ResolveError> {
    let config = context.load_config()?;
    let resolver = Resolver::new(config, context.store.load());
    let request = resolver.resolve(raw)?;

    tracing::info!(
        client = context.client.name(),
        mode = request.mode().as_str(),
        model = %request.model,
        timeout_sec = request.timeout_sec,
        "submitting generation"
    );
    let output = context
        .client
        .generate(&request)
        .map_err(|err| classify_failure(&err, &request))?;

    let record = LastRenderRecord::from_request(
        &request,
        Some(&output.project_id),
        &output.urls,
        &output.seeds,
        output.local_path.as_deref(),
    );
    let recorded = context.store.save_best_effort(&record);
    Ok(RenderResult {
        request,
        output,
        recorded,
    })
}
