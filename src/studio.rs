//! The generation orchestrator.
//!
//! [`Studio`] is the single owner of everything the shell displays. Every
//! change goes through one of its intent methods. A submission runs in
//! three steps so an event loop can keep reading input while images render:
//! [`Studio::begin_submit`] validates and marks the studio busy,
//! [`PendingBatch::run`] fans the calls out, and [`Studio::finish_submit`]
//! records the outcome.

use crate::{
    credentials::{CredentialHost, CredentialStatus},
    download,
    error::{Result, StudioError},
    gemini::ImageGenerator,
    history::History,
    logger,
    models::{
        AspectRatio, GeneratedImage, GenerationSession, GenerationSettings,
        ImageGenerationRequest, ImageGenerationResponse, ImageModel, ImageSize, SettingsSnapshot,
    },
};
use chrono::Utc;
use futures::future::join_all;
use std::path::{Path, PathBuf};
use std::sync::Arc;

pub const PAID_KEY_REQUIRED: &str = "High-quality models require a paid API key.";
pub const SESSION_EXPIRED: &str = "API Session expired. Re-selecting key...";
pub const GENERIC_FAILURE: &str = "Generation failed.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IgnoredReason {
    BlankPrompt,
    Busy,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// Nothing happened and no banner was set.
    Ignored(IgnoredReason),
    /// Refused before any call went out.
    Rejected(String),
    Completed { session_id: String, images: usize },
    Failed(String),
    /// The key had expired; the picker ran and the user has to resubmit.
    Reauthenticated,
}

/// Result of trying to start a submission.
pub enum Submission {
    Dispatched(PendingBatch),
    Settled(SubmitOutcome),
}

#[derive(Debug, Clone)]
pub struct StudioState {
    prompt: String,
    settings: GenerationSettings,
    history: History,
    busy: bool,
    error: Option<String>,
    edit_source: Option<GeneratedImage>,
    credential: CredentialStatus,
    /// Highest id handed out so far, in epoch milliseconds.
    last_id: i64,
}

impl StudioState {
    fn new(mut settings: GenerationSettings) -> Self {
        settings.batch_size = settings.batch_size.max(1);
        Self {
            prompt: String::new(),
            settings,
            history: History::new(),
            busy: false,
            error: None,
            edit_source: None,
            credential: CredentialStatus::Unknown,
            last_id: 0,
        }
    }

    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    pub fn settings(&self) -> &GenerationSettings {
        &self.settings
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    pub fn is_busy(&self) -> bool {
        self.busy
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn edit_source(&self) -> Option<&GeneratedImage> {
        self.edit_source.as_ref()
    }

    pub fn credential(&self) -> CredentialStatus {
        self.credential
    }
}

/// A validated batch, detached from the studio so it can run while the
/// studio keeps handling intents.
#[derive(Debug, Clone)]
pub struct PendingBatch {
    prompt: String,
    settings: GenerationSettings,
    size: ImageSize,
    requests: Vec<ImageGenerationRequest>,
}

impl PendingBatch {
    pub fn requests(&self) -> &[ImageGenerationRequest] {
        &self.requests
    }

    /// Issues every request at once and waits for all of them to settle.
    /// Results keep request order whatever order they complete in.
    pub async fn run(self, generator: Arc<dyn ImageGenerator>) -> BatchResult {
        let _timer = logger::timer(&format!("batch of {}", self.requests.len()));

        let calls = self.requests.iter().cloned().map(|request| {
            let generator = Arc::clone(&generator);
            async move { generator.generate(request).await }
        });
        let result = join_all(calls).await.into_iter().collect::<Result<Vec<_>>>();

        BatchResult {
            prompt: self.prompt,
            settings: self.settings,
            size: self.size,
            result,
        }
    }
}

pub struct BatchResult {
    prompt: String,
    settings: GenerationSettings,
    size: ImageSize,
    result: Result<Vec<ImageGenerationResponse>>,
}

pub struct Studio {
    state: StudioState,
    generator: Arc<dyn ImageGenerator>,
    credentials: Arc<dyn CredentialHost>,
}

impl Studio {
    pub fn new(
        generator: Arc<dyn ImageGenerator>,
        credentials: Arc<dyn CredentialHost>,
        settings: GenerationSettings,
    ) -> Self {
        Self {
            state: StudioState::new(settings),
            generator,
            credentials,
        }
    }

    pub fn state(&self) -> &StudioState {
        &self.state
    }

    pub fn generator(&self) -> Arc<dyn ImageGenerator> {
        Arc::clone(&self.generator)
    }

    /// Asks the host once whether a key has been picked.
    pub async fn init(&mut self) {
        let selected = self.credentials.has_selected_credential().await;
        self.state.credential = if selected {
            CredentialStatus::Confirmed
        } else {
            CredentialStatus::Missing
        };
        log::info!("Credential status at startup: {:?}", self.state.credential);
    }

    pub fn set_prompt(&mut self, prompt: impl Into<String>) {
        self.state.prompt = prompt.into();
    }

    pub fn set_aspect_ratio(&mut self, aspect_ratio: AspectRatio) {
        self.state.settings.aspect_ratio = aspect_ratio;
    }

    pub fn set_model(&mut self, model: ImageModel) {
        self.state.settings.model = model;
    }

    pub fn set_image_size(&mut self, image_size: ImageSize) {
        self.state.settings.image_size = image_size;
    }

    pub fn set_batch_size(&mut self, batch_size: usize) {
        self.state.settings.batch_size = batch_size.max(1);
    }

    pub fn select_edit_source(&mut self, image_id: &str) -> Result<()> {
        let image = self
            .state
            .history
            .find_image(image_id)
            .cloned()
            .ok_or_else(|| StudioError::NotFound(format!("image {}", image_id)))?;
        self.state.edit_source = Some(image);
        Ok(())
    }

    pub fn clear_edit_source(&mut self) {
        self.state.edit_source = None;
    }

    pub fn dismiss_error(&mut self) {
        self.state.error = None;
    }

    /// Runs the host's key picker on demand.
    pub async fn reselect_credential(&mut self) -> Result<()> {
        match self.credentials.prompt_select_credential().await {
            Ok(()) => {
                self.state.credential = CredentialStatus::Confirmed;
                self.state.error = None;
                Ok(())
            }
            Err(e) => {
                self.state.error = Some(e.to_string());
                Err(e)
            }
        }
    }

    pub async fn download_image(&self, image_id: &str, dir: &Path) -> Result<PathBuf> {
        let image = self
            .state
            .history
            .find_image(image_id)
            .ok_or_else(|| StudioError::NotFound(format!("image {}", image_id)))?;
        download::download_image(&image.url, &image.id, dir).await
    }

    /// Validates a submission and, when accepted, marks the studio busy and
    /// hands back the batch to run. A non-empty `override_prompt` replaces
    /// the current prompt text; `override_size` replaces the size setting.
    pub fn begin_submit(
        &mut self,
        override_prompt: Option<&str>,
        override_size: Option<ImageSize>,
    ) -> Submission {
        let prompt = override_prompt
            .filter(|text| !text.is_empty())
            .unwrap_or(self.state.prompt.as_str())
            .to_string();

        if prompt.trim().is_empty() {
            return Submission::Settled(SubmitOutcome::Ignored(IgnoredReason::BlankPrompt));
        }
        if self.state.busy {
            log::debug!("Submission ignored, a batch is already in flight");
            return Submission::Settled(SubmitOutcome::Ignored(IgnoredReason::Busy));
        }

        let settings = self.state.settings.clone();
        if settings.model.is_premium() && !self.state.credential.is_confirmed() {
            log::warn!("{} needs a confirmed key", settings.model.label());
            self.state.error = Some(PAID_KEY_REQUIRED.to_string());
            return Submission::Settled(SubmitOutcome::Rejected(PAID_KEY_REQUIRED.to_string()));
        }

        self.state.busy = true;
        self.state.error = None;

        let count = settings.batch_size.max(1);
        let size = override_size.unwrap_or(settings.image_size);
        let source_image = self.state.edit_source.as_ref().map(|image| image.url.clone());
        let request = ImageGenerationRequest {
            prompt: prompt.clone(),
            aspect_ratio: settings.aspect_ratio,
            model: settings.model,
            image_size: size,
            source_image,
        };

        log::info!(
            "Dispatching {} request(s) to {} at {}",
            count,
            settings.model,
            settings.aspect_ratio
        );

        Submission::Dispatched(PendingBatch {
            requests: vec![request; count],
            prompt,
            settings,
            size,
        })
    }

    /// Applies a finished batch. Either one session is recorded or none.
    pub async fn finish_submit(&mut self, batch: BatchResult) -> SubmitOutcome {
        let outcome = match batch.result {
            Ok(responses) => {
                // Ids keep increasing even when batches finish within the
                // same few milliseconds.
                let base = Utc::now()
                    .timestamp_millis()
                    .max(self.state.last_id + 1);
                self.state.last_id = base + responses.len().saturating_sub(1) as i64;
                let session =
                    build_session(base, batch.prompt, &batch.settings, batch.size, responses);
                let outcome = SubmitOutcome::Completed {
                    session_id: session.id.clone(),
                    images: session.images.len(),
                };
                log::info!("Recorded session {} with {} image(s)", session.id, session.images.len());
                self.state.history.record(session);
                self.state.prompt.clear();
                self.state.edit_source = None;
                outcome
            }
            Err(e) if e.is_entity_not_found() => {
                log::error!("Image generation failed: {}", e);
                self.state.error = Some(SESSION_EXPIRED.to_string());
                self.state.credential = CredentialStatus::Missing;
                // The picker's completion is taken as a valid selection; the
                // host is not asked again.
                match self.credentials.prompt_select_credential().await {
                    Ok(()) => self.state.credential = CredentialStatus::Confirmed,
                    Err(picker) => log::warn!("Key picker did not complete: {}", picker),
                }
                SubmitOutcome::Reauthenticated
            }
            Err(e) => {
                log::error!("Image generation failed: {}", e);
                let message = e.to_string();
                let message = if message.trim().is_empty() {
                    GENERIC_FAILURE.to_string()
                } else {
                    message
                };
                self.state.error = Some(message.clone());
                SubmitOutcome::Failed(message)
            }
        };

        self.state.busy = false;
        outcome
    }

    pub async fn submit(
        &mut self,
        override_prompt: Option<&str>,
        override_size: Option<ImageSize>,
    ) -> SubmitOutcome {
        match self.begin_submit(override_prompt, override_size) {
            Submission::Settled(outcome) => outcome,
            Submission::Dispatched(batch) => {
                let result = batch.run(self.generator()).await;
                self.finish_submit(result).await
            }
        }
    }
}

fn build_session(
    millis: i64,
    prompt: String,
    settings: &GenerationSettings,
    size: ImageSize,
    responses: Vec<ImageGenerationResponse>,
) -> GenerationSession {
    let now = Utc::now();
    let recorded_size = settings.recorded_size(size);

    let images = responses
        .into_iter()
        .enumerate()
        .map(|(idx, response)| GeneratedImage {
            id: (millis + idx as i64).to_string(),
            url: response.url,
            timestamp: now,
            aspect_ratio: settings.aspect_ratio,
            model: settings.model,
            size: recorded_size,
        })
        .collect();

    GenerationSession {
        id: millis.to_string(),
        prompt,
        timestamp: now,
        images,
        settings: SettingsSnapshot {
            model: settings.model,
            aspect_ratio: settings.aspect_ratio,
            size: recorded_size,
        },
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use std::time::Duration;

    /// Answers call `n` after a delay that shrinks with `n`, so later calls
    /// finish first. Fails the call whose index is in `fail_on`.
    pub(crate) struct MockGenerator {
        pub calls: AtomicUsize,
        pub seen: Mutex<Vec<ImageGenerationRequest>>,
        pub fail_on: Option<(usize, String)>,
    }

    impl MockGenerator {
        pub(crate) fn new() -> Self {
            Self {
                calls: AtomicUsize::new(0),
                seen: Mutex::new(Vec::new()),
                fail_on: None,
            }
        }

        pub(crate) fn failing(index: usize, message: &str) -> Self {
            Self {
                fail_on: Some((index, message.to_string())),
                ..Self::new()
            }
        }
    }

    #[async_trait]
    impl ImageGenerator for MockGenerator {
        async fn generate(
            &self,
            request: ImageGenerationRequest,
        ) -> Result<ImageGenerationResponse> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst);
            self.seen.lock().unwrap().push(request.clone());
            tokio::time::sleep(Duration::from_millis(40u64.saturating_sub(n as u64 * 10))).await;

            if let Some((index, message)) = &self.fail_on {
                if *index == n {
                    return Err(StudioError::ServiceError {
                        status: 500,
                        message: message.clone(),
                    });
                }
            }
            Ok(ImageGenerationResponse {
                url: format!("data:image/png;base64,img{}", n),
                model: request.model,
            })
        }
    }

    /// Host whose picker counts invocations.
    pub(crate) struct MockHost {
        pub selected: bool,
        pub picker_fails: bool,
        pub prompts: AtomicUsize,
    }

    impl MockHost {
        pub(crate) fn new(selected: bool) -> Self {
            Self {
                selected,
                picker_fails: false,
                prompts: AtomicUsize::new(0),
            }
        }

        pub(crate) fn with_failing_picker(selected: bool) -> Self {
            Self {
                picker_fails: true,
                ..Self::new(selected)
            }
        }
    }

    #[async_trait]
    impl CredentialHost for MockHost {
        async fn has_selected_credential(&self) -> bool {
            self.selected
        }

        async fn prompt_select_credential(&self) -> Result<()> {
            self.prompts.fetch_add(1, Ordering::SeqCst);
            if self.picker_fails {
                return Err(StudioError::CredentialError("picker dismissed".into()));
            }
            Ok(())
        }

        fn api_key(&self) -> Option<String> {
            self.selected.then(|| "test-key".to_string())
        }
    }

    async fn studio_with(
        generator: Arc<MockGenerator>,
        host: Arc<MockHost>,
        settings: GenerationSettings,
    ) -> Studio {
        let mut studio = Studio::new(generator, host, settings);
        studio.init().await;
        studio
    }

    #[tokio::test]
    async fn red_balloon_batch_of_two() {
        let generator = Arc::new(MockGenerator::new());
        let settings = GenerationSettings::new()
            .with_aspect_ratio(AspectRatio::Square)
            .with_batch_size(2);
        let mut studio = studio_with(generator.clone(), Arc::new(MockHost::new(false)), settings).await;

        studio.set_prompt("a red balloon");
        let outcome = studio.submit(None, None).await;

        assert!(matches!(outcome, SubmitOutcome::Completed { images: 2, .. }));
        let seen = generator.seen.lock().unwrap().clone();
        assert_eq!(seen.len(), 2);
        assert!(seen.iter().all(|r| r.prompt == "a red balloon"
            && r.aspect_ratio == AspectRatio::Square
            && r.model == ImageModel::Flash
            && r.source_image.is_none()));

        let state = studio.state();
        assert_eq!(state.history().len(), 1);
        let session = state.history().latest().unwrap();
        assert_eq!(session.prompt, "a red balloon");
        assert_eq!(session.settings.size, None);
        let urls: Vec<&str> = session.images.iter().map(|i| i.url.as_str()).collect();
        assert_eq!(urls, vec!["data:image/png;base64,img0", "data:image/png;base64,img1"]);
        assert!(session.images.iter().all(|i| i.size.is_none()));
        assert!(!state.is_busy());
        assert_eq!(state.prompt(), "");
    }

    #[tokio::test]
    async fn image_order_follows_requests_not_completion() {
        let generator = Arc::new(MockGenerator::new());
        let settings = GenerationSettings::new().with_batch_size(4);
        let mut studio = studio_with(generator, Arc::new(MockHost::new(false)), settings).await;

        studio.submit(Some("four lanterns"), None).await;

        let session = studio.state().history().latest().unwrap();
        let urls: Vec<String> = session.images.iter().map(|i| i.url.clone()).collect();
        let expected: Vec<String> = (0..4).map(|n| format!("data:image/png;base64,img{}", n)).collect();
        assert_eq!(urls, expected);

        let base: i64 = session.id.parse().unwrap();
        let ids: Vec<i64> = session.images.iter().map(|i| i.id.parse().unwrap()).collect();
        assert_eq!(ids, vec![base, base + 1, base + 2, base + 3]);
    }

    #[tokio::test]
    async fn one_failure_discards_the_whole_batch() {
        let generator = Arc::new(MockGenerator::failing(1, "INTERNAL: backend unavailable"));
        let settings = GenerationSettings::new().with_batch_size(3);
        let mut studio = studio_with(generator.clone(), Arc::new(MockHost::new(true)), settings).await;

        studio.set_prompt("storm over the sea");
        let outcome = studio.submit(None, None).await;

        assert_eq!(outcome, SubmitOutcome::Failed("INTERNAL: backend unavailable".into()));
        assert_eq!(generator.calls.load(Ordering::SeqCst), 3);
        let state = studio.state();
        assert!(state.history().is_empty());
        assert_eq!(state.error(), Some("INTERNAL: backend unavailable"));
        assert_eq!(state.prompt(), "storm over the sea");
        assert!(!state.is_busy());
    }

    #[tokio::test]
    async fn premium_model_without_key_never_calls_out() {
        let generator = Arc::new(MockGenerator::new());
        let settings = GenerationSettings::new()
            .with_model(ImageModel::Pro)
            .with_image_size(ImageSize::TwoK);
        let mut studio = studio_with(generator.clone(), Arc::new(MockHost::new(false)), settings).await;

        studio.set_prompt("a red balloon");
        let outcome = studio.submit(None, None).await;

        assert_eq!(outcome, SubmitOutcome::Rejected(PAID_KEY_REQUIRED.into()));
        assert_eq!(generator.calls.load(Ordering::SeqCst), 0);
        assert_eq!(studio.state().error(), Some(PAID_KEY_REQUIRED));
        assert!(studio.state().history().is_empty());
        assert!(!studio.state().is_busy());
    }

    #[tokio::test]
    async fn premium_model_records_size() {
        let generator = Arc::new(MockGenerator::new());
        let settings = GenerationSettings::new()
            .with_model(ImageModel::Pro)
            .with_image_size(ImageSize::TwoK);
        let mut studio = studio_with(generator.clone(), Arc::new(MockHost::new(true)), settings).await;

        studio.submit(Some("city at dusk"), Some(ImageSize::FourK)).await;

        let seen = generator.seen.lock().unwrap().clone();
        assert_eq!(seen[0].image_size, ImageSize::FourK);
        let session = studio.state().history().latest().unwrap();
        assert_eq!(session.settings.size, Some(ImageSize::FourK));
        assert_eq!(session.images[0].size, Some(ImageSize::FourK));
    }

    #[tokio::test]
    async fn blank_and_busy_submissions_are_ignored() {
        let generator = Arc::new(MockGenerator::new());
        let mut studio =
            studio_with(generator.clone(), Arc::new(MockHost::new(false)), GenerationSettings::new()).await;

        studio.set_prompt("   ");
        assert_eq!(
            studio.submit(None, None).await,
            SubmitOutcome::Ignored(IgnoredReason::BlankPrompt)
        );
        assert_eq!(studio.state().error(), None);

        studio.set_prompt("first");
        let batch = match studio.begin_submit(None, None) {
            Submission::Dispatched(batch) => batch,
            Submission::Settled(outcome) => panic!("unexpected {:?}", outcome),
        };
        assert!(studio.state().is_busy());
        assert!(matches!(
            studio.begin_submit(Some("second"), None),
            Submission::Settled(SubmitOutcome::Ignored(IgnoredReason::Busy))
        ));

        let result = batch.run(studio.generator()).await;
        studio.finish_submit(result).await;
        assert_eq!(generator.calls.load(Ordering::SeqCst), 1);
        assert_eq!(studio.state().history().len(), 1);
    }

    #[tokio::test]
    async fn empty_override_falls_back_to_prompt() {
        let generator = Arc::new(MockGenerator::new());
        let mut studio =
            studio_with(generator.clone(), Arc::new(MockHost::new(false)), GenerationSettings::new()).await;

        studio.set_prompt("typed prompt");
        studio.submit(Some(""), None).await;
        assert_eq!(generator.seen.lock().unwrap()[0].prompt, "typed prompt");
    }

    #[tokio::test]
    async fn edit_source_is_sent_then_cleared() {
        let generator = Arc::new(MockGenerator::new());
        let mut studio =
            studio_with(generator.clone(), Arc::new(MockHost::new(false)), GenerationSettings::new()).await;

        studio.submit(Some("a cat"), None).await;
        let image_id = studio.state().history().latest().unwrap().images[0].id.clone();

        assert!(studio.select_edit_source("nope").is_err());
        studio.select_edit_source(&image_id).unwrap();
        assert!(studio.state().edit_source().is_some());

        studio.set_prompt("the same cat wearing a hat");
        studio.submit(None, None).await;

        let seen = generator.seen.lock().unwrap().clone();
        assert_eq!(seen[1].source_image.as_deref(), Some("data:image/png;base64,img0"));
        assert!(studio.state().edit_source().is_none());
        assert_eq!(studio.state().prompt(), "");
        assert_eq!(studio.state().history().len(), 2);
    }

    #[tokio::test]
    async fn expired_key_triggers_picker_without_retry() {
        let generator = Arc::new(MockGenerator::failing(0, "Requested entity was not found."));
        let host = Arc::new(MockHost::new(true));
        let settings = GenerationSettings::new().with_model(ImageModel::Pro);
        let mut studio = studio_with(generator.clone(), host.clone(), settings).await;

        let outcome = studio.submit(Some("neon koi"), None).await;

        assert_eq!(outcome, SubmitOutcome::Reauthenticated);
        assert_eq!(host.prompts.load(Ordering::SeqCst), 1);
        assert_eq!(generator.calls.load(Ordering::SeqCst), 1);
        assert_eq!(studio.state().credential(), CredentialStatus::Confirmed);
        assert_eq!(studio.state().error(), Some(SESSION_EXPIRED));
        assert!(studio.state().history().is_empty());
        assert!(!studio.state().is_busy());
    }

    #[tokio::test]
    async fn next_submission_clears_banner() {
        let generator = Arc::new(MockGenerator::new());
        let mut studio =
            studio_with(generator, Arc::new(MockHost::new(false)), GenerationSettings::new()).await;

        studio.set_model(ImageModel::Pro);
        studio.submit(Some("x"), None).await;
        assert!(studio.state().error().is_some());

        studio.set_model(ImageModel::Flash);
        studio.submit(Some("x"), None).await;
        assert_eq!(studio.state().error(), None);
    }

    #[tokio::test]
    async fn reselecting_confirms_credential() {
        let host = Arc::new(MockHost::new(false));
        let mut studio =
            studio_with(Arc::new(MockGenerator::new()), host.clone(), GenerationSettings::new()).await;
        assert_eq!(studio.state().credential(), CredentialStatus::Missing);

        studio.reselect_credential().await.unwrap();
        assert_eq!(studio.state().credential(), CredentialStatus::Confirmed);
        assert_eq!(host.prompts.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn downloads_generated_image() {
        let mut studio = studio_with(
            Arc::new(MockGenerator::new()),
            Arc::new(MockHost::new(false)),
            GenerationSettings::new(),
        )
        .await;
        studio.submit(Some("a lighthouse"), None).await;
        let image_id = studio.state().history().latest().unwrap().images[0].id.clone();

        let dir = tempfile::tempdir().unwrap();
        let path = studio.download_image(&image_id, dir.path()).await.unwrap();
        assert_eq!(path, dir.path().join(format!("nano-banana-{}.png", image_id)));

        assert!(studio.download_image("missing", dir.path()).await.is_err());
    }

    /// Answers immediately with a url numbered by call order.
    struct InstantGenerator {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl ImageGenerator for InstantGenerator {
        async fn generate(
            &self,
            request: ImageGenerationRequest,
        ) -> Result<ImageGenerationResponse> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(ImageGenerationResponse {
                url: format!("data:image/png;base64,fast{}", n),
                model: request.model,
            })
        }
    }

    #[tokio::test]
    async fn zero_batch_size_still_issues_one_call() {
        let generator = Arc::new(MockGenerator::new());
        let mut settings = GenerationSettings::new();
        settings.batch_size = 0;
        let mut studio = studio_with(generator.clone(), Arc::new(MockHost::new(false)), settings).await;

        assert_eq!(studio.state().settings().batch_size, 1);
        let outcome = studio.submit(Some("x"), None).await;

        assert!(matches!(outcome, SubmitOutcome::Completed { images: 1, .. }));
        assert_eq!(generator.calls.load(Ordering::SeqCst), 1);
        assert_eq!(studio.state().history().latest().unwrap().images.len(), 1);
    }

    #[tokio::test]
    async fn back_to_back_batches_get_distinct_ids() {
        let generator = Arc::new(InstantGenerator {
            calls: AtomicUsize::new(0),
        });
        let settings = GenerationSettings::new().with_batch_size(3);
        let mut studio = Studio::new(generator, Arc::new(MockHost::new(false)), settings);
        studio.init().await;

        studio.submit(Some("first"), None).await;
        studio.submit(Some("second"), None).await;
        studio.submit(Some("third"), None).await;

        let history = studio.state().history();
        let mut session_ids: Vec<&str> = history.sessions().iter().map(|s| s.id.as_str()).collect();
        let mut image_ids: Vec<i64> = history
            .sessions()
            .iter()
            .flat_map(|s| s.images.iter().map(|i| i.id.parse::<i64>().unwrap()))
            .collect();
        assert_eq!(image_ids.len(), 9);

        session_ids.sort();
        session_ids.dedup();
        assert_eq!(session_ids.len(), 3);
        image_ids.sort();
        image_ids.dedup();
        assert_eq!(image_ids.len(), 9);

        let second = history.session(session_ids[1]).unwrap();
        assert_eq!(second.prompt, "second");
        let first_of_second = &second.images[0].id;
        assert_eq!(
            history.find_image(first_of_second).map(|i| i.url.as_str()),
            Some("data:image/png;base64,fast3")
        );
    }

    #[tokio::test]
    async fn failed_picker_leaves_credential_missing() {
        let generator = Arc::new(MockGenerator::failing(0, "Requested entity was not found."));
        let host = Arc::new(MockHost::with_failing_picker(true));
        let settings = GenerationSettings::new().with_model(ImageModel::Pro);
        let mut studio = studio_with(generator, host.clone(), settings).await;

        let outcome = studio.submit(Some("neon koi"), None).await;

        assert_eq!(outcome, SubmitOutcome::Reauthenticated);
        assert_eq!(host.prompts.load(Ordering::SeqCst), 1);
        let state = studio.state();
        assert_eq!(state.credential(), CredentialStatus::Missing);
        assert_eq!(state.error(), Some(SESSION_EXPIRED));
        assert!(state.history().is_empty());
        assert!(!state.is_busy());

        assert_eq!(
            studio.submit(Some("neon koi"), None).await,
            SubmitOutcome::Rejected(PAID_KEY_REQUIRED.into())
        );
    }
}
