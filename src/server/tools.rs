use crate::corpus::analyze_corpus;
use crate::server::sessions::{ServiceFactory, SessionRequest, SessionService};
use crate::state::AppState;
use crate::utils::LocaleFillError;
use rmcp::{
    handler::server::{tool::ToolRouter, wrapper::Parameters},
    model::*,
    tool, tool_handler, tool_router,
    ErrorData as McpError,
};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
#[schemars(description = "Parameters for analyzing a set of locale files")]
pub struct AnalyzeCorpusParams {
    #[schemars(description = "Paths to the source JSON locale files")]
    pub files: Vec<String>,
}

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
#[schemars(description = "Parameters to initialize a translation session")]
pub struct InitSessionParams {
    #[schemars(description = "Paths to the source JSON locale files (may be empty when resuming)")]
    #[serde(default)]
    pub files: Vec<String>,
    #[schemars(description = "Target language identifier, e.g. 'es'; also names the exported file")]
    pub target_language: Option<String>,
    #[schemars(description = "Optional JSON file with translations to start from")]
    pub seed_file: Option<String>,
    #[schemars(description = "Resume the stored translations of an earlier session")]
    pub resume_session_id: Option<String>,
    #[schemars(description = "Keys per request (default: 10)")]
    pub batch_size: Option<usize>,
    #[schemars(description = "Delay between automatic rounds in milliseconds (default: 15000)")]
    pub pacing_interval_ms: Option<u64>,
}

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
#[schemars(description = "Session identifier")]
pub struct SessionParams {
    #[schemars(description = "Session ID")]
    pub session_id: String,
}

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
#[schemars(description = "Parameters to merge a completion reply or pasted JSON into a session")]
pub struct SubmitReplyParams {
    #[schemars(description = "Session ID")]
    pub session_id: String,
    #[schemars(description = "Reply text containing a JSON object of translated keys")]
    pub reply: String,
}

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
#[schemars(description = "Parameters to export a session's translations")]
pub struct ExportTranslationParams {
    #[schemars(description = "Session ID")]
    pub session_id: String,
    #[schemars(description = "Directory to write <target_language>.json into")]
    pub output_dir: String,
}

#[derive(Clone)]
pub struct LocaleFillServer {
    sessions: SessionService,
    tool_router: ToolRouter<Self>,
}

fn to_mcp_error(e: LocaleFillError) -> McpError {
    match e {
        LocaleFillError::SessionNotFound(_)
        | LocaleFillError::FileNotFound(_)
        | LocaleFillError::CorpusParseError { .. }
        | LocaleFillError::MalformedResponse(_)
        | LocaleFillError::ConfigError(_) => McpError::invalid_params(e.to_string(), None),
        _ => McpError::internal_error(e.to_string(), None),
    }
}

fn json_result<T: Serialize>(value: &T) -> Result<CallToolResult, McpError> {
    let json_result = serde_json::to_string_pretty(value)
        .map_err(|e| McpError::internal_error(e.to_string(), None))?;
    Ok(CallToolResult::success(vec![Content::text(json_result)]))
}

#[tool_router]
impl LocaleFillServer {
    pub fn new(state: AppState, service_factory: ServiceFactory) -> Self {
        Self {
            sessions: SessionService::new(state, service_factory),
            tool_router: Self::tool_router(),
        }
    }

    #[tool(
        name = "analyze_corpus",
        description = "Parse a set of JSON locale files and report key counts, the number of keys common to all files, the estimated number of rounds and the token size of one prompt."
    )]
    async fn analyze_corpus(
        &self,
        params: Parameters<AnalyzeCorpusParams>,
    ) -> Result<CallToolResult, McpError> {
        let params = params.0;
        let batch_size = self.sessions.state().config.translation.batch_size;

        let metadata = analyze_corpus(&params.files, batch_size)
            .await
            .map_err(to_mcp_error)?;

        json_result(&metadata)
    }

    #[tool(
        name = "init_session",
        description = "Load source locale files and start a session for one target language. Returns session_id. Then either call run_translation, or loop get_next_prompt / submit_reply by hand."
    )]
    async fn init_session(
        &self,
        params: Parameters<InitSessionParams>,
    ) -> Result<CallToolResult, McpError> {
        let params = params.0;

        let created = self
            .sessions
            .init_session(SessionRequest {
                files: params.files.into_iter().map(PathBuf::from).collect(),
                target_language: params.target_language,
                seed_file: params.seed_file.map(PathBuf::from),
                resume_session_id: params.resume_session_id,
                batch_size: params.batch_size,
                pacing_interval_ms: params.pacing_interval_ms,
            })
            .await
            .map_err(to_mcp_error)?;

        json_result(&created)
    }

    #[tool(
        name = "get_next_prompt",
        description = "Get the next batch of untranslated keys and the prompt asking for them. An empty key list means every common key is translated."
    )]
    async fn get_next_prompt(
        &self,
        params: Parameters<SessionParams>,
    ) -> Result<CallToolResult, McpError> {
        let next = self
            .sessions
            .next_prompt(&params.0.session_id)
            .await
            .map_err(to_mcp_error)?;

        json_result(&next)
    }

    #[tool(
        name = "submit_reply",
        description = "Merge a completion reply or pasted JSON into the session. Text around the JSON object is ignored; returned values overwrite existing ones."
    )]
    async fn submit_reply(
        &self,
        params: Parameters<SubmitReplyParams>,
    ) -> Result<CallToolResult, McpError> {
        let params = params.0;

        let merged = self
            .sessions
            .submit_reply(&params.session_id, &params.reply)
            .await
            .map_err(to_mcp_error)?;

        json_result(&merged)
    }

    #[tool(
        name = "run_translation",
        description = "Start the automatic round loop for a session in the background. It stops when all keys are translated, on the first failed round, or when cancelled; progress so far is kept."
    )]
    async fn run_translation(
        &self,
        params: Parameters<SessionParams>,
    ) -> Result<CallToolResult, McpError> {
        let session_id = params.0.session_id;

        let _handle = self
            .sessions
            .start_run(&session_id)
            .await
            .map_err(to_mcp_error)?;

        json_result(&serde_json::json!({
            "session_id": session_id,
            "status": "running",
            "message": "Translation started. Poll get_translation_progress; call export_translation when it stops."
        }))
    }

    #[tool(
        name = "cancel_translation",
        description = "Stop a running automatic translation. An in-flight completion request or the wait between rounds is abandoned at once; translations merged so far are kept."
    )]
    async fn cancel_translation(
        &self,
        params: Parameters<SessionParams>,
    ) -> Result<CallToolResult, McpError> {
        let session_id = params.0.session_id;

        let cancelled = self
            .sessions
            .cancel_run(&session_id)
            .await
            .map_err(to_mcp_error)?;

        json_result(&serde_json::json!({
            "session_id": session_id,
            "cancelled": cancelled,
        }))
    }

    #[tool(
        name = "get_translation_progress",
        description = "Get the current progress of a translation session."
    )]
    async fn get_translation_progress(
        &self,
        params: Parameters<SessionParams>,
    ) -> Result<CallToolResult, McpError> {
        let progress = self
            .sessions
            .progress(&params.0.session_id)
            .await
            .map_err(to_mcp_error)?;

        json_result(&progress)
    }

    #[tool(
        name = "list_sessions",
        description = "List sessions saved in the checkpoint store. Pass a session_id to init_session as resume_session_id to continue it."
    )]
    async fn list_sessions(&self) -> Result<CallToolResult, McpError> {
        let stored = self.sessions.stored_sessions().map_err(to_mcp_error)?;
        json_result(&stored)
    }

    #[tool(
        name = "export_translation",
        description = "Write the session's translations to <output_dir>/<target_language>.json."
    )]
    async fn export_translation(
        &self,
        params: Parameters<ExportTranslationParams>,
    ) -> Result<CallToolResult, McpError> {
        let params = params.0;

        let path = self
            .sessions
            .export(&params.session_id, PathBuf::from(params.output_dir))
            .await
            .map_err(to_mcp_error)?;

        json_result(&serde_json::json!({
            "session_id": params.session_id,
            "path": path.display().to_string(),
        }))
    }

    pub fn router(&self) -> &ToolRouter<Self> {
        &self.tool_router
    }
}

#[tool_handler]
impl rmcp::handler::server::ServerHandler for LocaleFillServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: ProtocolVersion::V_2024_11_05,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: Implementation::from_build_env(),
            instructions: Some(
                r#"Locale Fill MCP Server

Fills in a new language for flat JSON locale files, ten keys at a time.

Workflow:
1. analyze_corpus - Check the source files (absolute paths)
2. init_session - Load the files and pick the target language, get session_id
3. Either:
   - run_translation - Let the server call the completion API round by round
     (get_translation_progress / cancel_translation while it runs), or
   - Loop get_next_prompt -> answer the prompt -> submit_reply
4. export_translation - Write <target_language>.json

list_sessions shows checkpointed sessions that init_session can resume."#
                    .to_string(),
            ),
        }
    }
}
