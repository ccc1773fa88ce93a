/// One conversational turn, end to end.
///
/// Snapshot and budget are resolved first, the model is called once under a
/// turn timeout, and its text is grounded against the same snapshot the
/// prompt was built from. Every failure below this point becomes a
/// `TurnOutcome` with a fallback text and no cards.
use std::sync::Arc;
use std::time::Duration;

use grounding::budget::{extract_budget, is_price_sensitive};
use grounding::intent::{classify_listing, ListingIntent};
use grounding::model::{format_price, RejectedCandidate};
use grounding::{Budget, CatalogSnapshot, GroundedReply, Grounder, RecommendationCard};
use mcp_common::openai::{Message, OpenAiClient};
use schemars::JsonSchema;
use serde::Serialize;
use tracing::{info, warn};

use crate::cache::SnapshotCache;
use crate::catalog::{CatalogSource, SnapshotLimits};
use crate::error::AppError;
use crate::prompt::{assemble_prompt, PromptContext};

const CATALOG_UNAVAILABLE_TEXT: &str =
    "I can't reach the restaurant catalog right now. Please check your connection and try again.";
const MODEL_UNAVAILABLE_TEXT: &str =
    "Sorry, I couldn't put together recommendations just now. Please try again in a moment.";
const RATE_LIMITED_TEXT: &str =
    "I'm getting a lot of requests at the moment. Please try again in a few seconds.";

#[derive(Debug, Clone)]
pub struct TurnSettings {
    pub model: String,
    pub temperature: Option<f32>,
    pub turn_timeout: Duration,
    pub history_limit: usize,
    pub limits: SnapshotLimits,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum TurnStatus {
    Grounded,
    CatalogUnavailable,
    ModelUnavailable,
}

#[derive(Debug, Clone, Serialize, JsonSchema)]
pub struct TurnOutcome {
    pub text: String,
    pub recommendations: Vec<RecommendationCard>,
    pub budget: Option<Budget>,
    pub cheapest_rejected: Option<RejectedCandidate>,
    /// Set when a budget emptied the list and something was rejected for price.
    pub budget_note: Option<String>,
    pub status: TurnStatus,
}

impl TurnOutcome {
    fn fallback(text: &str, budget: Option<Budget>, status: TurnStatus) -> Self {
        Self {
            text: text.to_string(),
            recommendations: Vec::new(),
            budget,
            cheapest_rejected: None,
            budget_note: None,
            status,
        }
    }

    fn grounded(reply: GroundedReply, budget: Option<Budget>) -> Self {
        let budget_note = match (budget, &reply.cheapest_rejected) {
            (Some(budget), Some(cheapest)) if reply.recommendations.is_empty() => Some(format!(
                "Nothing I suggested fits within {}. The cheapest option was {} at {}.",
                format_price(budget.ceiling()),
                cheapest.name,
                format_price(cheapest.price)
            )),
            _ => None,
        };
        Self {
            text: reply.text,
            recommendations: reply.recommendations,
            budget,
            cheapest_rejected: reply.cheapest_rejected,
            budget_note,
            status: TurnStatus::Grounded,
        }
    }
}

#[derive(Debug, Clone, Serialize, JsonSchema)]
pub struct MessageAnalysis {
    pub budget: Option<Budget>,
    pub price_sensitive: bool,
    pub listing_intent: ListingIntent,
}

pub fn analyze_message(message: &str) -> MessageAnalysis {
    MessageAnalysis {
        budget: extract_budget(message),
        price_sensitive: is_price_sensitive(message),
        listing_intent: classify_listing(message),
    }
}

pub struct Concierge {
    catalog: CatalogSource,
    cache: SnapshotCache,
    chat: Arc<OpenAiClient>,
    grounder: Grounder,
    settings: TurnSettings,
}

impl Concierge {
    pub fn new(
        catalog: CatalogSource,
        cache: SnapshotCache,
        chat: Arc<OpenAiClient>,
        grounder: Grounder,
        settings: TurnSettings,
    ) -> Self {
        Self {
            catalog,
            cache,
            chat,
            grounder,
            settings,
        }
    }

    pub async fn respond(
        &self,
        user_message: &str,
        history: &[Message],
        user_id: Option<&str>,
    ) -> TurnOutcome {
        let limits = self.settings.limits.for_user(user_id);
        let (snapshot, analysis) = tokio::join!(self.snapshot(&limits), async {
            analyze_message(user_message)
        });

        let snapshot = match snapshot {
            Ok(snapshot) => snapshot,
            Err(e) => {
                warn!(error = %e, "catalog snapshot unavailable, skipping model call");
                return TurnOutcome::fallback(
                    CATALOG_UNAVAILABLE_TEXT,
                    analysis.budget,
                    TurnStatus::CatalogUnavailable,
                );
            }
        };

        let messages = assemble_prompt(&PromptContext {
            user_message,
            history,
            snapshot: &snapshot,
            budget: analysis.budget,
            price_sensitive: analysis.price_sensitive,
            history_limit: self.settings.history_limit,
            suffix: &self.grounder.config().extractor.suffix,
        });

        let assistant_text = match self.complete(messages).await {
            Ok(text) => text,
            Err(e) => {
                warn!(error = %e, timeout = e.is_timeout(), "model call failed, returning fallback");
                let text = match &e {
                    AppError::Model(inner) if inner.is_rate_limited() => RATE_LIMITED_TEXT,
                    _ => MODEL_UNAVAILABLE_TEXT,
                };
                return TurnOutcome::fallback(text, analysis.budget, TurnStatus::ModelUnavailable);
            }
        };

        let reply = self.grounder.ground_with_budget(
            user_message,
            &assistant_text,
            &snapshot,
            analysis.budget,
        );
        info!(
            cards = reply.recommendations.len(),
            budget = ?analysis.budget.map(|b| b.ceiling()),
            "turn grounded"
        );
        TurnOutcome::grounded(reply, analysis.budget)
    }

    /// Grounds caller-supplied assistant text against the current snapshot.
    pub async fn ground_text(
        &self,
        user_message: &str,
        assistant_text: &str,
    ) -> Result<GroundedReply, AppError> {
        let snapshot = self.snapshot(&self.settings.limits).await?;
        Ok(self.grounder.ground(user_message, assistant_text, &snapshot))
    }

    pub async fn refresh_catalog(&self) -> bool {
        self.cache.invalidate_all().await
    }

    async fn snapshot(&self, limits: &SnapshotLimits) -> Result<CatalogSnapshot, AppError> {
        if let Some(snapshot) = self.cache.get_snapshot(limits).await {
            return Ok(snapshot);
        }
        let snapshot = self.catalog.fetch_snapshot(limits).await?;
        self.cache.set_snapshot(limits, &snapshot).await;
        Ok(snapshot)
    }

    async fn complete(&self, messages: Vec<Message>) -> Result<String, AppError> {
        let call = self.chat.complete_chat(
            &self.settings.model,
            messages,
            self.settings.temperature,
            None,
        );
        match tokio::time::timeout(self.settings.turn_timeout, call).await {
            Ok(result) => Ok(result?),
            Err(_) => Err(AppError::Timeout(self.settings.turn_timeout)),
        }
    }
}
