use std::sync::Arc;

use rmcp::{
    Json, ServerHandler,
    handler::server::router::tool::ToolRouter,
    handler::server::wrapper::Parameters,
    model::*,
    tool, tool_handler, tool_router,
};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use grounding::GroundedReply;
use mcp_common::openai::Message;

use crate::pipeline::{analyze_message, Concierge, MessageAnalysis, TurnOutcome};
use crate::rate_limit::RateLimiter;

#[derive(Clone)]
pub struct ConciergeServer {
    concierge: Arc<Concierge>,
    limiter: Option<RateLimiter>,
    tool_router: ToolRouter<ConciergeServer>,
}

impl ConciergeServer {
    pub fn new(concierge: Arc<Concierge>, limiter: Option<RateLimiter>) -> Self {
        Self {
            concierge,
            limiter,
            tool_router: Self::tool_router(),
        }
    }

    async fn gate(&self) -> Result<(), String> {
        if let Some(limiter) = &self.limiter {
            limiter.check().await?;
        }
        Ok(())
    }
}

#[derive(Debug, Deserialize, JsonSchema)]
struct RecommendParams {
    /// The user's message for this turn.
    message: String,
    /// Earlier turns, oldest first.
    #[serde(default)]
    history: Vec<Message>,
    /// Enables order-history personalisation when set.
    user_id: Option<String>,
}

#[derive(Debug, Deserialize, JsonSchema)]
struct GroundTextParams {
    /// The user's message; its budget and listing intent apply.
    message: String,
    assistant_text: String,
}

#[derive(Debug, Deserialize, JsonSchema)]
struct AnalyzeMessageParams {
    message: String,
}

#[derive(Debug, Serialize, JsonSchema)]
struct RefreshResponse {
    invalidated: bool,
}

fn non_empty(field: &str, value: &str) -> Result<(), String> {
    if value.trim().is_empty() {
        return Err(format!("{field} must not be empty"));
    }
    Ok(())
}

#[tool_router]
impl ConciergeServer {
    #[tool(description = "Run one concierge turn: fetch the catalog, ask the model, and return its reply with recommendation cards grounded in the live catalog and filtered by any budget in the message.")]
    async fn recommend(
        &self,
        Parameters(params): Parameters<RecommendParams>,
    ) -> Result<Json<TurnOutcome>, String> {
        self.gate().await?;
        non_empty("message", &params.message)?;
        let outcome = self
            .concierge
            .respond(params.message.trim(), &params.history, params.user_id.as_deref())
            .await;
        Ok(Json(outcome))
    }

    #[tool(description = "Ground supplied assistant text against the current catalog without calling the model. Returns the text and the cards it resolves to.")]
    async fn ground_text(
        &self,
        Parameters(params): Parameters<GroundTextParams>,
    ) -> Result<Json<GroundedReply>, String> {
        self.gate().await?;
        non_empty("message", &params.message)?;
        let reply = self
            .concierge
            .ground_text(&params.message, &params.assistant_text)
            .await
            .map_err(|e| format!("ground_text failed: {e}"))?;
        Ok(Json(reply))
    }

    #[tool(description = "Report the budget ceiling, price sensitivity and listing intent (restaurants or items) read from a user message.")]
    async fn analyze_message(
        &self,
        Parameters(params): Parameters<AnalyzeMessageParams>,
    ) -> Result<Json<MessageAnalysis>, String> {
        self.gate().await?;
        Ok(Json(analyze_message(&params.message)))
    }

    #[tool(description = "Drop cached catalog snapshots so the next turn reads the catalog fresh.")]
    async fn refresh_catalog(&self) -> Result<Json<RefreshResponse>, String> {
        self.gate().await?;
        let invalidated = self.concierge.refresh_catalog().await;
        Ok(Json(RefreshResponse { invalidated }))
    }
}

#[tool_handler]
impl ServerHandler for ConciergeServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: ProtocolVersion::V_2025_06_18,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: Implementation {
                name: "concierge".to_string(),
                version: env!("CARGO_PKG_VERSION").to_string(),
                title: None,
                icons: None,
                website_url: None,
            },
            instructions: Some(
                "Food ordering concierge MCP server. Call recommend with the user's message (and \
prior turns) to get a reply plus catalog-verified recommendation cards. Use ground_text to ground \
existing assistant text, analyze_message to inspect budget and intent, and refresh_catalog after \
catalog changes."
                    .to_string(),
            ),
        }
    }
}
