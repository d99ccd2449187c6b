//! Generation orchestrator: validation, prompt building and dispatch for the
//! generated sections.
//!
//! Preconditions are checked in a fixed order and fail before any remote
//! call:
//!
//! 1. a research topic is set
//! 2. the assembled context is non-empty
//! 3. the provider has an API key
//! 4. the provider has a model
//!
//! A section slot moves `idle → generating → done | failed` and may be
//! re-entered from any terminal state. Each attempt clears the previous
//! content before dispatching.

use chrono::{DateTime, Utc};
use citeweave_core::error::{Error, ProviderError, ValidationError};
use citeweave_core::paper::{Paper, PaperId};
use citeweave_core::provider::{Generation, GenerationRequest, Provider, ProviderKind};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use tracing::{info, warn};

use crate::context::{AssembledContext, ContextAssembler};
use crate::prompt::{GENERATION_SYSTEM_INSTRUCTION, build_prompt};

/// The named output slots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SectionKind {
    Introduction,
    RelatedWorks,
}

impl SectionKind {
    pub const ALL: [SectionKind; 2] = [SectionKind::Introduction, SectionKind::RelatedWorks];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Introduction => "introduction",
            Self::RelatedWorks => "related_works",
        }
    }
}

impl std::fmt::Display for SectionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Introduction => write!(f, "Introduction"),
            Self::RelatedWorks => write!(f, "Related Works"),
        }
    }
}

impl std::str::FromStr for SectionKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace(['-', ' '], "_").as_str() {
            "introduction" | "intro" => Ok(Self::Introduction),
            "related_works" | "related_work" | "related" => Ok(Self::RelatedWorks),
            other => Err(format!(
                "Unknown section '{other}'. Use 'introduction' or 'related_works'."
            )),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SectionStatus {
    #[default]
    Idle,
    Generating,
    Done,
    Failed,
}

/// One output slot.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GeneratedSection {
    pub status: SectionStatus,

    #[serde(default)]
    pub content: String,

    /// Search grounding attached by the provider, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub grounding: Option<serde_json::Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    /// Model that produced the content
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl GeneratedSection {
    /// Start an attempt: clear everything from the previous one.
    pub fn begin(&mut self) {
        *self = Self {
            status: SectionStatus::Generating,
            updated_at: Some(Utc::now()),
            ..Self::default()
        };
    }

    pub fn complete(&mut self, generation: Generation) {
        self.status = SectionStatus::Done;
        self.content = generation.text;
        self.grounding = generation.grounding;
        self.model = Some(generation.model);
        self.error = None;
        self.updated_at = Some(Utc::now());
    }

    pub fn fail(&mut self, message: impl Into<String>) {
        self.status = SectionStatus::Failed;
        self.error = Some(message.into());
        self.updated_at = Some(Utc::now());
    }

    pub fn is_generating(&self) -> bool {
        self.status == SectionStatus::Generating
    }
}

/// The provider a generation goes to, with whatever credentials are set.
#[derive(Clone)]
pub struct ProviderTarget {
    pub kind: ProviderKind,
    pub api_key: Option<String>,
    pub model: Option<String>,
}

impl std::fmt::Debug for ProviderTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderTarget")
            .field("kind", &self.kind)
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .field("model", &self.model)
            .finish()
    }
}

/// Everything a generation reads from the workspace.
pub struct GenerationInput<'a> {
    pub section: SectionKind,
    pub topic: &'a str,
    pub selection: &'a HashSet<PaperId>,
    pub fallback_page: &'a [PaperId],
    pub cache: &'a HashMap<PaperId, Paper>,
    pub word_budget: usize,
}

/// A validated request, ready to dispatch.
#[derive(Debug, Clone)]
pub struct PreparedGeneration {
    pub section: SectionKind,
    pub provider: ProviderKind,
    pub request: GenerationRequest,
    pub context: AssembledContext,
}

/// Stateless; the slots live with the caller.
pub struct GenerationOrchestrator;

impl GenerationOrchestrator {
    /// Validate preconditions and build the request. No side effects.
    pub fn prepare(
        input: &GenerationInput<'_>,
        target: &ProviderTarget,
    ) -> Result<PreparedGeneration, ValidationError> {
        let topic = input.topic.trim();
        if topic.is_empty() {
            return Err(ValidationError::MissingTopic);
        }

        let context = ContextAssembler::new(input.word_budget).assemble(
            input.selection,
            input.fallback_page,
            input.cache,
        );
        if context.is_empty() {
            return Err(ValidationError::NoContext);
        }

        let api_key = non_blank(target.api_key.as_deref())
            .ok_or(ValidationError::MissingApiKey(target.kind))?;
        let model = non_blank(target.model.as_deref())
            .ok_or(ValidationError::MissingModel(target.kind))?;

        let prompt = build_prompt(input.section, topic, &context.text);

        Ok(PreparedGeneration {
            section: input.section,
            provider: target.kind,
            request: GenerationRequest {
                api_key: api_key.to_string(),
                model: model.to_string(),
                prompt,
                system_instruction: Some(GENERATION_SYSTEM_INSTRUCTION.to_string()),
            },
            context,
        })
    }

    /// Send one one-shot generation. No retry.
    pub async fn dispatch(
        provider: &dyn Provider,
        prepared: PreparedGeneration,
    ) -> Result<Generation, ProviderError> {
        info!(
            section = prepared.section.as_str(),
            provider = prepared.provider.as_str(),
            model = %prepared.request.model,
            papers = prepared.context.metadata.included,
            "Generating section"
        );

        let result = provider.generate_once(prepared.request).await;
        if let Err(e) = &result {
            warn!(section = prepared.section.as_str(), error = %e, "Section generation failed");
        }
        result
    }

    /// Validate, dispatch and record the outcome in `slot`.
    ///
    /// Validation failures leave the slot untouched. Provider failures are
    /// stored in the slot and also returned.
    pub async fn generate(
        input: &GenerationInput<'_>,
        target: &ProviderTarget,
        provider: &dyn Provider,
        slot: &mut GeneratedSection,
    ) -> Result<(), Error> {
        let prepared = Self::prepare(input, target)?;
        slot.begin();

        match Self::dispatch(provider, prepared).await {
            Ok(generation) => {
                slot.complete(generation);
                Ok(())
            }
            Err(e) => {
                slot.fail(e.to_string());
                Err(e.into())
            }
        }
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|s| !s.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::MockProvider;

    struct Fixture {
        selection: HashSet<PaperId>,
        page: Vec<PaperId>,
        cache: HashMap<PaperId, Paper>,
    }

    impl Fixture {
        fn with_page(ids: &[&str]) -> Self {
            let cache = ids
                .iter()
                .map(|id| (id.to_string(), Paper::new(*id, format!("Paper {id}"))))
                .collect();
            Self {
                selection: HashSet::new(),
                page: ids.iter().map(|s| s.to_string()).collect(),
                cache,
            }
        }

        fn empty() -> Self {
            Self::with_page(&[])
        }

        fn input<'a>(&'a self, topic: &'a str) -> GenerationInput<'a> {
            GenerationInput {
                section: SectionKind::Introduction,
                topic,
                selection: &self.selection,
                fallback_page: &self.page,
                cache: &self.cache,
                word_budget: 3000,
            }
        }
    }

    fn target(api_key: Option<&str>, model: Option<&str>) -> ProviderTarget {
        ProviderTarget {
            kind: ProviderKind::Gemini,
            api_key: api_key.map(String::from),
            model: model.map(String::from),
        }
    }

    #[test]
    fn preconditions_are_checked_in_order() {
        let empty = Fixture::empty();
        let full = Fixture::with_page(&["p1"]);
        let none = target(None, None);

        let err = GenerationOrchestrator::prepare(&empty.input("  "), &none).unwrap_err();
        assert_eq!(err, ValidationError::MissingTopic);

        let err = GenerationOrchestrator::prepare(&empty.input("llms"), &none).unwrap_err();
        assert_eq!(err, ValidationError::NoContext);
        assert_eq!(
            err.to_string(),
            "No papers available for context. Search for papers or select some first."
        );

        let err = GenerationOrchestrator::prepare(&full.input("llms"), &none).unwrap_err();
        assert_eq!(err, ValidationError::MissingApiKey(ProviderKind::Gemini));
        assert_eq!(err.to_string(), "API key for Gemini is not set.");

        let err = GenerationOrchestrator::prepare(&full.input("llms"), &target(Some("k"), Some(" ")))
            .unwrap_err();
        assert_eq!(err.to_string(), "No model selected for Gemini.");
    }

    #[test]
    fn prepared_request_carries_prompt_and_instruction() {
        let fixture = Fixture::with_page(&["p1"]);
        let prepared = GenerationOrchestrator::prepare(
            &fixture.input("protein design"),
            &target(Some("key"), Some("gemini-2.0-flash")),
        )
        .unwrap();
        assert_eq!(prepared.request.model, "gemini-2.0-flash");
        assert!(prepared.request.prompt.contains("[1] Title: Paper p1"));
        assert!(prepared.request.prompt.contains("\"protein design\""));
        assert_eq!(
            prepared.request.system_instruction.as_deref(),
            Some(GENERATION_SYSTEM_INSTRUCTION)
        );
    }

    #[tokio::test]
    async fn missing_key_makes_no_remote_call() {
        let fixture = Fixture::with_page(&["p1"]);
        let provider = MockProvider::new(ProviderKind::Gemini);
        let mut slot = GeneratedSection::default();

        let err = GenerationOrchestrator::generate(
            &fixture.input("topic"),
            &target(None, Some("gemini-2.0-flash")),
            &provider,
            &mut slot,
        )
        .await
        .unwrap_err();

        assert!(err.to_string().contains("API key for Gemini is not set"));
        assert_eq!(provider.generate_count(), 0);
        assert_eq!(slot, GeneratedSection::default());
    }

    #[tokio::test]
    async fn success_stores_text_and_grounding() {
        let fixture = Fixture::with_page(&["p1"]);
        let provider = MockProvider::new(ProviderKind::Gemini).with_generation(Ok(Generation {
            text: "Transformers changed NLP [1].".into(),
            grounding: Some(serde_json::json!({"webSearchQueries": ["transformers"]})),
            model: "gemini-2.0-flash-001".into(),
        }));
        let mut slot = GeneratedSection::default();

        GenerationOrchestrator::generate(
            &fixture.input("transformers"),
            &target(Some("key"), Some("gemini-2.0-flash")),
            &provider,
            &mut slot,
        )
        .await
        .unwrap();

        assert_eq!(slot.status, SectionStatus::Done);
        assert_eq!(slot.content, "Transformers changed NLP [1].");
        assert!(slot.grounding.is_some());
        assert!(slot.error.is_none());
        assert_eq!(provider.generate_count(), 1);
    }

    #[tokio::test]
    async fn failure_clears_previous_content_and_records_error() {
        let fixture = Fixture::with_page(&["p1"]);
        let provider = MockProvider::new(ProviderKind::Gemini).with_generation(Err(
            ProviderError::ApiError {
                status_code: 500,
                message: "backend unavailable".into(),
            },
        ));
        let mut slot = GeneratedSection {
            status: SectionStatus::Done,
            content: "Old introduction".into(),
            ..GeneratedSection::default()
        };

        let result = GenerationOrchestrator::generate(
            &fixture.input("transformers"),
            &target(Some("key"), Some("gemini-2.0-flash")),
            &provider,
            &mut slot,
        )
        .await;

        assert!(result.is_err());
        assert_eq!(slot.status, SectionStatus::Failed);
        assert!(slot.content.is_empty());
        assert!(slot.error.as_deref().unwrap().contains("backend unavailable"));
    }

    #[test]
    fn section_names_parse() {
        assert_eq!("introduction".parse::<SectionKind>().unwrap(), SectionKind::Introduction);
        assert_eq!("related-works".parse::<SectionKind>().unwrap(), SectionKind::RelatedWorks);
        assert_eq!("Related Works".parse::<SectionKind>().unwrap(), SectionKind::RelatedWorks);
        assert!("conclusion".parse::<SectionKind>().is_err());
        assert_eq!(
            serde_json::to_string(&SectionKind::RelatedWorks).unwrap(),
            "\"related_works\""
        );
    }

    #[test]
    fn begin_resets_the_slot() {
        let mut slot = GeneratedSection {
            status: SectionStatus::Failed,
            content: "partial".into(),
            error: Some("timeout".into()),
            ..GeneratedSection::default()
        };
        slot.begin();
        assert!(slot.is_generating());
        assert!(slot.content.is_empty());
        assert!(slot.error.is_none());
    }
}
