use std::env;
use std::ffi::OsString;
use std::io::{self, Write};
use std::path::PathBuf;

use anyhow::Result;
use clap::error::{ContextKind, ContextValue, ErrorKind};
use clap::{CommandFactory, Parser};
use genline_contracts::assets::AssetSet;
use genline_contracts::errors::ResolveError;
use genline_contracts::options::{
    ExplicitFields, Network, OptionField, RawOptions, SeedStrategy, TokenType,
};
use genline_contracts::runs::last_render::LastRenderStore;
use genline_engine::{dispatch, Command, DispatchContext, DryrunClient, Outcome};
use serde_json::{json, Value};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Debug, Parser)]
#[command(
    name = "genline",
    about = "Resolve and submit image and video generation requests",
    disable_help_flag = true,
    disable_version_flag = true
)]
struct Cli {
    /// Prompt text; multiple words are joined with spaces.
    prompt: Vec<String>,
    #[arg(short = 'w', long)]
    width: Option<u32>,
    #[arg(short = 'h', long)]
    height: Option<u32>,
    #[arg(short = 'n', long)]
    count: Option<u32>,
    #[arg(short = 's', long)]
    seed: Option<u32>,
    /// random | prompt-hash
    #[arg(long)]
    seed_strategy: Option<String>,
    /// Reuse the seed of the previous render.
    #[arg(long)]
    last_seed: bool,
    #[arg(short = 'v', long)]
    video: bool,
    /// t2v | i2v | s2v | animate-move | animate-replace (aliases accepted)
    #[arg(long)]
    workflow: Option<String>,
    #[arg(long)]
    fps: Option<u32>,
    /// Clip length in seconds.
    #[arg(long)]
    duration: Option<f64>,
    #[arg(long)]
    frames: Option<u32>,
    /// Start reference image.
    #[arg(long = "ref")]
    reference: Option<String>,
    /// End reference image (i2v interpolation).
    #[arg(long)]
    ref_end: Option<String>,
    #[arg(long)]
    ref_audio: Option<String>,
    #[arg(long)]
    ref_video: Option<String>,
    /// Context image for editing; repeatable.
    #[arg(short = 'c', long = "context")]
    context: Vec<String>,
    /// Feed the previous render back in as a reference.
    #[arg(long)]
    last_image: bool,
    /// Show the previous render and exit.
    #[arg(long)]
    last: bool,
    /// spark | sogni
    #[arg(long)]
    token_type: Option<String>,
    /// fast | relaxed
    #[arg(long)]
    network: Option<String>,
    #[arg(long)]
    steps: Option<u32>,
    #[arg(long)]
    guidance: Option<f64>,
    #[arg(short = 'm', long)]
    model: Option<String>,
    /// Seconds to wait for the job.
    #[arg(long)]
    timeout: Option<u64>,
    /// Plugin config file (defaults to GENLINE_CONFIG, then <state dir>/config.json).
    #[arg(long)]
    config: Option<PathBuf>,
    /// Show the token balance and exit.
    #[arg(long)]
    balance: bool,
    #[arg(long)]
    json: bool,
    #[arg(short = 'q', long)]
    quiet: bool,
    #[arg(long)]
    help: bool,
    #[arg(long)]
    version: bool,
}

impl Cli {
    fn selected_command(&self) -> Command {
        if self.help {
            Command::Help
        } else if self.version {
            Command::Version
        } else if self.last {
            Command::Last
        } else if self.balance {
            Command::Balance
        } else {
            Command::Render
        }
    }

    fn prompt(&self) -> Option<String> {
        let joined = self.prompt.join(" ");
        let trimmed = joined.trim();
        (!trimmed.is_empty()).then(|| trimmed.to_string())
    }

    /// Builds the immutable option set, recording which flags were typed.
    fn raw_options(&self) -> Result<RawOptions, ResolveError> {
        let defaults = RawOptions::default();
        let explicit = ExplicitFields::new(
            [
                (OptionField::Width, self.width.is_some()),
                (OptionField::Height, self.height.is_some()),
                (OptionField::Count, self.count.is_some()),
                (OptionField::Seed, self.seed.is_some()),
                (OptionField::SeedStrategy, self.seed_strategy.is_some()),
                (OptionField::TokenType, self.token_type.is_some()),
                (OptionField::Network, self.network.is_some()),
                (OptionField::Workflow, self.workflow.is_some()),
                (OptionField::Fps, self.fps.is_some()),
                (OptionField::Duration, self.duration.is_some()),
                (OptionField::Frames, self.frames.is_some()),
                (OptionField::Steps, self.steps.is_some()),
                (OptionField::Guidance, self.guidance.is_some()),
                (OptionField::Model, self.model.is_some()),
                (OptionField::Timeout, self.timeout.is_some()),
            ]
            .into_iter()
            .filter_map(|(field, set)| set.then_some(field)),
        );

        Ok(RawOptions {
            prompt: self.prompt(),
            width: self.width.unwrap_or(defaults.width),
            height: self.height.unwrap_or(defaults.height),
            count: self.count.unwrap_or(defaults.count),
            seed: self.seed,
            seed_strategy: self
                .seed_strategy
                .as_deref()
                .map(SeedStrategy::parse)
                .transpose()?
                .unwrap_or(defaults.seed_strategy),
            last_seed: self.last_seed,
            token_type: self
                .token_type
                .as_deref()
                .map(TokenType::parse)
                .transpose()?
                .unwrap_or(defaults.token_type),
            network: self
                .network
                .as_deref()
                .map(Network::parse)
                .transpose()?
                .unwrap_or(defaults.network),
            video: self.video,
            workflow: self.workflow.clone(),
            fps: self.fps.unwrap_or(defaults.fps),
            duration_sec: self.duration.unwrap_or(defaults.duration_sec),
            frames: self.frames,
            steps: self.steps,
            guidance: self.guidance,
            model: self.model.clone(),
            timeout_sec: self.timeout,
            assets: AssetSet {
                image: self.reference.clone(),
                image_end: self.ref_end.clone(),
                audio: self.ref_audio.clone(),
                video: self.ref_video.clone(),
                context_images: self.context.clone(),
            },
            last_image: self.last_image,
            explicit,
        })
    }
}

/// Where state and plugin config live for this invocation.
#[derive(Debug, Clone, PartialEq)]
struct Paths {
    state_dir: PathBuf,
    config_path: PathBuf,
}

impl Paths {
    fn from_env(config_flag: Option<PathBuf>) -> Self {
        Self::resolve(
            non_empty_env("HOME"),
            non_empty_env("GENLINE_HOME"),
            non_empty_env("GENLINE_CONFIG"),
            config_flag,
        )
    }

    fn resolve(
        home: Option<String>,
        genline_home: Option<String>,
        genline_config: Option<String>,
        config_flag: Option<PathBuf>,
    ) -> Self {
        let state_dir = genline_home.map(PathBuf::from).unwrap_or_else(|| {
            home.map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("."))
                .join(".genline")
        });
        let config_path = config_flag
            .or_else(|| genline_config.map(PathBuf::from))
            .unwrap_or_else(|| state_dir.join("config.json"));
        Self {
            state_dir,
            config_path,
        }
    }
}

fn non_empty_env(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn init_tracing(quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| "warn".into())
    };
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .try_init();
}

/// Parser failures become INVALID_ARGUMENT naming the offending flag.
fn argument_error(err: &clap::Error) -> ResolveError {
    let flag = match err.get(ContextKind::InvalidArg) {
        Some(ContextValue::String(arg)) => arg
            .split_whitespace()
            .next()
            .unwrap_or_default()
            .to_string(),
        _ => "arguments".to_string(),
    };
    let reason = match (err.kind(), err.get(ContextKind::InvalidValue)) {
        (ErrorKind::ValueValidation | ErrorKind::InvalidValue, Some(ContextValue::String(value))) => {
            format!("'{value}' is not a valid value")
        }
        (ErrorKind::UnknownArgument, _) => "unknown flag".to_string(),
        _ => err
            .to_string()
            .lines()
            .next()
            .unwrap_or_default()
            .trim_start_matches("error: ")
            .to_string(),
    };
    ResolveError::InvalidArgument { flag, reason }
}

fn execute(cli: &Cli, paths: &Paths) -> Outcome {
    let command = cli.selected_command();
    let raw = match command {
        Command::Help | Command::Version => RawOptions::default(),
        _ => match cli.raw_options() {
            Ok(raw) => raw,
            Err(error) => {
                return Outcome::Error {
                    error,
                    prompt: cli.prompt(),
                }
            }
        },
    };
    let context = DispatchContext {
        config_path: paths.config_path.clone(),
        store: LastRenderStore::in_dir(&paths.state_dir),
        client: Box::new(DryrunClient::default()),
    };
    dispatch(command, &raw, &context)
}

fn usage() -> String {
    <Cli as CommandFactory>::command().render_help().to_string()
}

fn version() -> String {
    format!("genline {}", env!("CARGO_PKG_VERSION"))
}

fn json_payload(outcome: &Outcome) -> Value {
    match outcome {
        Outcome::Help => json!({"success": true, "type": "help", "usage": usage()}),
        Outcome::Version => {
            json!({"success": true, "type": "version", "version": env!("CARGO_PKG_VERSION")})
        }
        Outcome::Last(record) => json!({"success": true, "type": "last", "last": record}),
        Outcome::Balance(balance) => Value::Object(balance.payload()),
        Outcome::Render(result) => Value::Object(result.payload()),
        Outcome::Error { error, prompt } => {
            serde_json::to_value(error.payload(prompt.as_deref())).unwrap_or(Value::Null)
        }
    }
}

/// Text for stdout and stderr in the default, human-readable mode.
fn human_output(outcome: &Outcome, quiet: bool) -> (Vec<String>, Vec<String>) {
    match outcome {
        Outcome::Help => (vec![usage()], Vec::new()),
        Outcome::Version => (vec![version()], Vec::new()),
        Outcome::Last(None) => (vec!["No previous render recorded.".to_string()], Vec::new()),
        Outcome::Last(Some(record)) => (
            vec![serde_json::to_string_pretty(record).unwrap_or_default()],
            Vec::new(),
        ),
        Outcome::Balance(balance) => (
            vec![format!(
                "{} {} tokens available",
                balance.available,
                balance.token_type.as_str()
            )],
            Vec::new(),
        ),
        Outcome::Render(result) => {
            let request = &result.request;
            let mut lines = Vec::new();
            if !quiet {
                let workflow = request
                    .workflow()
                    .map(|workflow| format!(" [{workflow}]"))
                    .unwrap_or_default();
                lines.push(format!(
                    "{} {}x{} x{} with {}{} (seed {}, {})",
                    request.media_type(),
                    request.width,
                    request.height,
                    request.count,
                    request.model,
                    workflow,
                    request.seed,
                    request.seed_source.as_str()
                ));
            }
            lines.extend(result.output.urls.iter().cloned());
            (lines, Vec::new())
        }
        Outcome::Error { error, .. } => (
            Vec::new(),
            vec![
                format!("error [{}]: {}", error.code(), error),
                format!("hint: {}", error.hint()),
            ],
        ),
    }
}

fn emit(outcome: &Outcome, json_mode: bool, quiet: bool) -> Result<i32> {
    let mut stdout = io::stdout().lock();
    if json_mode {
        writeln!(stdout, "{}", json_payload(outcome))?;
    } else {
        let (out, err) = human_output(outcome, quiet);
        for line in out {
            writeln!(stdout, "{line}")?;
        }
        let mut stderr = io::stderr().lock();
        for line in err {
            writeln!(stderr, "{line}")?;
        }
    }
    Ok(outcome.exit_code())
}

/// Looks for an output switch in arguments clap rejected.
fn has_switch(args: &[OsString], names: &[&str]) -> bool {
    args.iter()
        .skip(1)
        .take_while(|arg| arg.as_os_str() != "--")
        .any(|arg| names.iter().any(|name| arg.as_os_str() == *name))
}

fn run(args: Vec<OsString>) -> Result<i32> {
    let cli = match Cli::try_parse_from(&args) {
        Ok(cli) => cli,
        Err(err) => {
            let quiet = has_switch(&args, &["--quiet", "-q"]);
            init_tracing(quiet);
            let outcome = Outcome::Error {
                error: argument_error(&err),
                prompt: None,
            };
            return emit(&outcome, has_switch(&args, &["--json"]), quiet);
        }
    };
    init_tracing(cli.quiet);

    let paths = Paths::from_env(cli.config.clone());
    tracing::debug!(
        state_dir = %paths.state_dir.display(),
        config = %paths.config_path.display(),
        "using paths"
    );
    let outcome = execute(&cli, &paths);
    emit(&outcome, cli.json, cli.quiet)
}

fn main() {
    match run(env::args_os().collect()) {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("genline error: {err:#}");
            std::process::exit(1);
        }
    }
}
