use crate::models::{GeneratedImage, GenerationSession};

/// Sessions of the current run, most recent first. Nothing is ever removed
/// or rewritten once recorded, and nothing survives the process.
#[derive(Debug, Clone, Default)]
pub struct History {
    sessions: Vec<GenerationSession>,
}

impl History {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn record(&mut self, session: GenerationSession) {
        self.sessions.insert(0, session);
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    pub fn sessions(&self) -> &[GenerationSession] {
        &self.sessions
    }

    pub fn latest(&self) -> Option<&GenerationSession> {
        self.sessions.first()
    }

    pub fn session(&self, session_id: &str) -> Option<&GenerationSession> {
        self.sessions.iter().find(|session| session.id == session_id)
    }

    pub fn find_image(&self, image_id: &str) -> Option<&GeneratedImage> {
        self.sessions
            .iter()
            .find_map(|session| session.image(image_id))
    }

    pub fn image_count(&self) -> usize {
        self.sessions.iter().map(|session| session.images.len()).sum()
    }
}
