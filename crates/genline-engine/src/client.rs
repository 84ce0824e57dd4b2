use anyhow::Result;
use genline_contracts::errors::ResolveError;
use genline_contracts::options::TokenType;
use genline_contracts::request::ResolvedRequest;
use serde_json::{json, Map, Value};
use sha2::{Digest, Sha256};

#[derive(Debug, Clone, PartialEq)]
pub struct GenerationOutput {
    pub project_id: String,
    pub urls: Vec<String>,
    pub seeds: Vec<u32>,
    pub local_path: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Balance {
    pub token_type: TokenType,
    pub available: f64,
}

impl Balance {
    pub fn payload(&self) -> Map<String, Value> {
        let mut out = Map::new();
        out.insert("success".to_string(), json!(true));
        out.insert("type".to_string(), json!("balance"));
        out.insert("tokenType".to_string(), json!(self.token_type.as_str()));
        out.insert("available".to_string(), json!(self.available));
        out
    }
}

/// Submits resolved requests to a generation backend.
///
/// Implementations own authentication, job submission and the wait for
/// completion, bounded by `request.timeout_sec`.
pub trait GenerationClient {
    fn name(&self) -> &str;
    fn generate(&self, request: &ResolvedRequest) -> Result<GenerationOutput>;
    fn balance(&self, token_type: TokenType) -> Result<Balance>;
}

/// Maps a client failure onto the error taxonomy.
pub fn classify_failure(err: &anyhow::Error, request: &ResolvedRequest) -> ResolveError {
    let message = format!("{err:#}");
    let lowered = message.to_ascii_lowercase();
    if lowered.contains("timed out") || lowered.contains("timeout") {
        ResolveError::Timeout {
            seconds: request.timeout_sec,
        }
    } else {
        ResolveError::GenerationFailed(message)
    }
}

/// Offline client: derives stable ids and URLs from the request itself.
#[derive(Debug, Clone)]
pub struct DryrunClient {
    base_url: String,
    available: f64,
}

impl DryrunClient {
    pub fn new(base_url: impl Into<String>, available: f64) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            available,
        }
    }
}

impl Default for DryrunClient {
    fn default() -> Self {
        Self::new("dryrun://genline", 100.0)
    }
}

impl GenerationClient for DryrunClient {
    fn name(&self) -> &str {
        "dryrun"
    }

    fn generate(&self, request: &ResolvedRequest) -> Result<GenerationOutput> {
        let mut payload = request.echo_fields();
        payload.insert("timeoutSec".to_string(), json!(request.timeout_sec));
        let project_id = stable_hash(&Value::Object(payload));
        let ext = if request.mode().is_video() { "mp4" } else { "png" };
        let seeds = request.seeds();
        let urls = (0..seeds.len())
            .map(|idx| format!("{}/{}/{:02}.{}", self.base_url, project_id, idx, ext))
            .collect();
        tracing::debug!(client = self.name(), project_id = %project_id, "dryrun generation");
        Ok(GenerationOutput {
            project_id,
            urls,
            seeds,
            local_path: None,
        })
    }

    fn balance(&self, token_type: TokenType) -> Result<Balance> {
        Ok(Balance {
            token_type,
            available: self.available,
        })
    }
}

fn stable_hash(payload: &Value) -> String {
    let bytes = serde_json::to_vec(payload).unwrap_or_default();
    let digest = Sha256::digest(bytes);
    hex::encode(&digest[..8])
}
