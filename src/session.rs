use crate::config::{Profile, ToolMode};
use crate::core::error::TchatError;
use crate::dispatch::handoff::LanguageAgent;
use crate::providers::factory::BoundProvider;
use crate::providers::{LLMProvider, Message};
use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;

/// Ordered message history of one session. Only ever appended to.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Transcript {
    messages: Vec<Message>,
}

impl Transcript {
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    fn push(&mut self, message: Message) {
        self.messages.push(message);
    }

    /// Write the transcript as a pretty-printed JSON array, replacing any
    /// existing file.
    pub fn save(&self, path: &Path) -> Result<(), TchatError> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                fs::create_dir_all(parent)?;
            }
        }
        let json = serde_json::to_string_pretty(&self.messages)?;
        fs::write(path, json)?;
        Ok(())
    }

    pub fn load(path: &Path) -> Result<Transcript, TchatError> {
        let contents = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&contents)?)
    }

    /// Saved transcripts in `dir`, oldest first. A missing directory is empty.
    pub fn list(dir: &Path) -> Result<Vec<PathBuf>, TchatError> {
        if !dir.exists() {
            return Ok(Vec::new());
        }
        let mut files: Vec<PathBuf> = fs::read_dir(dir)?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|p| p.extension().is_some_and(|ext| ext == "json"))
            .collect();
        files.sort();
        Ok(files)
    }
}

/// Explicit context for one conversation: the bound profile, its provider and
/// the transcript. Passed to every turn instead of living in globals.
pub struct Session {
    id: String,
    started_at: DateTime<Local>,
    bound: BoundProvider,
    agent: Option<LanguageAgent>,
    transcript: Transcript,
}

impl Session {
    pub fn new(bound: BoundProvider) -> Self {
        let started_at = Local::now();
        let session = Self {
            id: started_at.format("%Y%m%d_%H%M%S").to_string(),
            started_at,
            bound,
            agent: None,
            transcript: Transcript::default(),
        };
        info!(
            session = %session.id,
            profile = session.profile().name(),
            "session started"
        );
        session
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn started_at(&self) -> DateTime<Local> {
        self.started_at
    }

    pub fn profile(&self) -> Profile {
        self.bound.profile
    }

    pub fn tool_mode(&self) -> ToolMode {
        self.bound.tool_mode
    }

    pub fn provider(&self) -> Arc<dyn LLMProvider> {
        Arc::clone(&self.bound.provider)
    }

    /// The language agent answering, or `None` for the main assistant.
    pub fn agent(&self) -> Option<LanguageAgent> {
        self.agent
    }

    pub fn hand_off(&mut self, agent: Option<LanguageAgent>) {
        if self.agent != agent {
            info!(
                session = %self.id,
                agent = agent.map_or("assistant", |a| a.name()),
                "handoff"
            );
        }
        self.agent = agent;
    }

    pub fn transcript(&self) -> &Transcript {
        &self.transcript
    }

    pub fn messages(&self) -> &[Message] {
        self.transcript.messages()
    }

    pub fn append(&mut self, message: Message) {
        self.transcript.push(message);
    }

    /// Bind a different profile. Only called between turns; the transcript
    /// carries over.
    pub fn rebind(&mut self, bound: BoundProvider) {
        info!(
            from = self.profile().name(),
            to = bound.profile.name(),
            "profile switched"
        );
        self.bound = bound;
    }

    pub fn default_transcript_path(&self, dir: &Path) -> PathBuf {
        dir.join(format!("{}.json", self.id))
    }

    /// End the session, flushing the transcript to `path`.
    pub fn finish(self, path: &Path) -> Result<PathBuf, TchatError> {
        self.transcript.save(path)?;
        info!(
            session = %self.id,
            messages = self.transcript.len(),
            path = %path.display(),
            "transcript written"
        );
        Ok(path.to_path_buf())
    }
}
