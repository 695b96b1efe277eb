//! Generation cycle. Orchestrates one request from settings to options.
//!
//! Flow: validate → extract reference (link imitation only) → describe images
//!       (DeepSeek only) → build prompt → provider router → normalize.
//!
//! Nothing survives the cycle: image bytes and extracted text are dropped
//! with the request, and the option list replaces any previous one wholesale.

use serde::Serialize;
use thiserror::Error;
use tracing::{info, warn};

use crate::extraction::{ExtractionError, Extractor};
use crate::generation::normalizer::{normalize, NormalizeError};
use crate::generation::prompt_builder::{build_caption_prompt, build_describe_request, ImageContext};
use crate::generation::prompts::NO_DESCRIPTION;
use crate::llm_client::prompts::VARIATION_COUNT;
use crate::llm_client::{InlineImage, LlmError, ProviderRouter, RouteKind};
use crate::models::content_option::ContentOption;
use crate::models::provider::{Provider, ProviderChoice};
use crate::models::settings::GenerationSettings;

// ────────────────────────────────────────────────────────────────────────────
// Errors
// ────────────────────────────────────────────────────────────────────────────

/// Every kind is terminal for the current cycle; nothing is retried.
#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("{0}")]
    Validation(String),

    #[error(transparent)]
    Extraction(#[from] ExtractionError),

    #[error(transparent)]
    Provider(#[from] LlmError),

    #[error(transparent)]
    Parse(#[from] NormalizeError),
}

// ────────────────────────────────────────────────────────────────────────────
// State machine
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CycleState {
    Idle,
    Extracting,
    Analyzing,
    Generating,
    Complete,
    Error,
}

impl CycleState {
    /// Linear order: optional steps may be skipped but never revisited.
    pub fn can_advance_to(self, next: CycleState) -> bool {
        use CycleState::*;
        match (self, next) {
            (_, Error) => !self.is_terminal(),
            (Idle, Extracting | Analyzing | Generating) => true,
            (Extracting, Analyzing | Generating) => true,
            (Analyzing, Generating) => true,
            (Generating, Complete) => true,
            (Complete | Error, Idle) => true,
            _ => false,
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, CycleState::Complete | CycleState::Error)
    }
}

/// Records the states one cycle passes through.
#[derive(Debug, Clone)]
pub struct GenerationCycle {
    states: Vec<CycleState>,
}

impl GenerationCycle {
    pub fn new() -> Self {
        Self {
            states: vec![CycleState::Idle],
        }
    }

    pub fn current(&self) -> CycleState {
        self.states.last().copied().unwrap_or(CycleState::Idle)
    }

    /// Moves to `next`. Returns false (and stays put) on an illegal transition.
    pub fn advance(&mut self, next: CycleState) -> bool {
        let current = self.current();
        if !current.can_advance_to(next) {
            warn!("Ignoring illegal cycle transition {:?} -> {:?}", current, next);
            return false;
        }
        info!("Cycle state: {:?} -> {:?}", current, next);
        self.states.push(next);
        true
    }

    pub fn states(&self) -> &[CycleState] {
        &self.states
    }
}

impl Default for GenerationCycle {
    fn default() -> Self {
        Self::new()
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Request / outcome
// ────────────────────────────────────────────────────────────────────────────

/// Everything the caller submits for one cycle.
#[derive(Debug, Clone)]
pub struct CycleRequest {
    pub settings: GenerationSettings,
    pub choice: ProviderChoice,
    pub images: Vec<InlineImage>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CycleOutcome {
    pub options: Vec<ContentOption>,
    pub provider: Provider,
    pub route: RouteKind,
    pub states: Vec<CycleState>,
}

// ────────────────────────────────────────────────────────────────────────────
// Pipeline
// ────────────────────────────────────────────────────────────────────────────

/// Runs one generation cycle end to end.
pub async fn run_cycle(
    router: &ProviderRouter,
    extractor: &Extractor,
    request: CycleRequest,
) -> Result<CycleOutcome, GenerationError> {
    let mut cycle = GenerationCycle::new();
    let provider = request.choice.provider;

    match drive(&mut cycle, router, extractor, request).await {
        Ok((options, route)) => {
            cycle.advance(CycleState::Complete);
            info!(
                "Cycle complete: {} options from {} ({:?})",
                options.len(),
                provider,
                route
            );
            Ok(CycleOutcome {
                options,
                provider,
                route,
                states: cycle.states().to_vec(),
            })
        }
        Err(e) => {
            cycle.advance(CycleState::Error);
            warn!("Cycle failed in {:?}: {e}", cycle.states());
            Err(e)
        }
    }
}

async fn drive(
    cycle: &mut GenerationCycle,
    router: &ProviderRouter,
    extractor: &Extractor,
    request: CycleRequest,
) -> Result<(Vec<ContentOption>, RouteKind), GenerationError> {
    let CycleRequest {
        settings,
        choice,
        images,
    } = request;

    // Step 1: Validation, no network before this passes
    if images.is_empty() {
        return Err(GenerationError::Validation(
            "Upload at least one image".to_string(),
        ));
    }
    settings.validate().map_err(GenerationError::Validation)?;

    // Step 2: Reference extraction (imitate from link)
    let settings = if settings.needs_extraction() {
        cycle.advance(CycleState::Extracting);
        let url = settings.reference_url.as_deref().unwrap_or_default();
        let content = extractor.extract(url).await?;
        info!("Extracted {} chars of reference text", content.chars().count());
        settings.with_reference_content(content)
    } else {
        settings
    };

    // Step 3: Provider-specific prompt assembly and call
    let response = match choice.provider {
        Provider::Gemini => {
            cycle.advance(CycleState::Generating);
            let prompt = build_caption_prompt(&settings, ImageContext::Attached);
            router.complete(&choice, &prompt.into_request(images)).await?
        }
        Provider::Deepseek => {
            cycle.advance(CycleState::Analyzing);
            let description = describe_images(router, images).await?;

            cycle.advance(CycleState::Generating);
            let prompt = build_caption_prompt(&settings, ImageContext::Described(&description));
            router.complete(&choice, &prompt.into_request(vec![])).await?
        }
    };

    // Step 4: Normalize
    let options = normalize(&response.text, &response.id_tag())?;
    if options.len() != VARIATION_COUNT {
        warn!(
            "Expected {} variations, model returned {}",
            VARIATION_COUNT,
            options.len()
        );
    }

    Ok((options, response.route))
}

/// Turns the images into text for text-only providers. Always uses Gemini;
/// the user's key belongs to the caption provider, not to this step.
async fn describe_images(
    router: &ProviderRouter,
    images: Vec<InlineImage>,
) -> Result<String, LlmError> {
    let analyst = ProviderChoice::new(Provider::Gemini, None);
    match router.complete(&analyst, &build_describe_request(images)).await {
        Ok(response) => Ok(response.text),
        Err(LlmError::EmptyContent(_)) => Ok(NO_DESCRIPTION.to_string()),
        Err(e) => Err(e),
    }
}
