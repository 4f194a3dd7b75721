use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::time::{SystemTime, UNIX_EPOCH};

pub mod resolver;

use resolver::ImplementationParts;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GenerationMode {
    Standard,
    Assisted,
}

impl GenerationMode {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "standard" => Some(Self::Standard),
            "assisted" => Some(Self::Assisted),
            _ => None,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Standard => "standard",
            Self::Assisted => "assisted",
        }
    }
}

/// The fixed set of result tabs shown to the user. Both modes fill all five;
/// slots a pipeline does not natively produce are synthesized by the
/// resolver's fallback policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum TabSlot {
    Requirements,
    Schema,
    Implementation,
    Quality,
    Visualization,
}

impl TabSlot {
    pub const ALL: [TabSlot; 5] = [
        TabSlot::Requirements,
        TabSlot::Schema,
        TabSlot::Implementation,
        TabSlot::Quality,
        TabSlot::Visualization,
    ];

    pub fn title(self) -> &'static str {
        match self {
            TabSlot::Requirements => "Requirements",
            TabSlot::Schema => "Schema",
            TabSlot::Implementation => "Implementation",
            TabSlot::Quality => "Quality",
            TabSlot::Visualization => "Visualization",
        }
    }

    pub fn file_stem(self) -> &'static str {
        match self {
            TabSlot::Requirements => "requirements",
            TabSlot::Schema => "schema",
            TabSlot::Implementation => "implementation",
            TabSlot::Quality => "quality",
            TabSlot::Visualization => "visualization",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        let normalized = raw.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|slot| slot.file_stem() == normalized)
    }

    pub fn index(self) -> usize {
        Self::ALL
            .iter()
            .position(|slot| *slot == self)
            .unwrap_or(0)
    }

    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StandardStep {
    Schema,
    SampleData,
    ApiExamples,
    Visualization,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AssistedStep {
    Requirements,
    Schema,
    Implementation,
    Quality,
}

impl AssistedStep {
    pub const ALL: [AssistedStep; 4] = [
        AssistedStep::Requirements,
        AssistedStep::Schema,
        AssistedStep::Implementation,
        AssistedStep::Quality,
    ];
}

/// Generator-native step identifier, tagged by the pipeline that produced it.
/// The tag is fixed at session start, so events from the wrong pipeline are
/// rejected by the reducer instead of being shape-sniffed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StepId {
    Standard(StandardStep),
    Assisted(AssistedStep),
}

impl StepId {
    pub fn parse(mode: GenerationMode, raw: &str) -> Option<Self> {
        let normalized = raw.trim().to_ascii_lowercase();
        match mode {
            GenerationMode::Standard => match normalized.as_str() {
                "schema" => Some(Self::Standard(StandardStep::Schema)),
                "sample_data" => Some(Self::Standard(StandardStep::SampleData)),
                "api_examples" => Some(Self::Standard(StandardStep::ApiExamples)),
                "visualization" => Some(Self::Standard(StandardStep::Visualization)),
                _ => None,
            },
            GenerationMode::Assisted => match normalized.as_str() {
                "requirements" => Some(Self::Assisted(AssistedStep::Requirements)),
                "schema" => Some(Self::Assisted(AssistedStep::Schema)),
                "implementation" => Some(Self::Assisted(AssistedStep::Implementation)),
                "quality" => Some(Self::Assisted(AssistedStep::Quality)),
                _ => None,
            },
        }
    }

    pub fn wire_name(self) -> &'static str {
        match self {
            Self::Standard(StandardStep::Schema) => "schema",
            Self::Standard(StandardStep::SampleData) => "sample_data",
            Self::Standard(StandardStep::ApiExamples) => "api_examples",
            Self::Standard(StandardStep::Visualization) => "visualization",
            Self::Assisted(AssistedStep::Requirements) => "requirements",
            Self::Assisted(AssistedStep::Schema) => "schema",
            Self::Assisted(AssistedStep::Implementation) => "implementation",
            Self::Assisted(AssistedStep::Quality) => "quality",
        }
    }

    pub fn mode(self) -> GenerationMode {
        match self {
            Self::Standard(_) => GenerationMode::Standard,
            Self::Assisted(_) => GenerationMode::Assisted,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepResult {
    pub title: String,
    pub content: String,
    pub reasoning: String,
    pub agent: Option<String>,
}

/// One progress callback from the backing generator, already parsed into the
/// session's step vocabulary. `completion` is `Some` only for an explicit
/// step-completion event; progress-only events never touch tab content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgressEvent {
    pub step: StepId,
    pub agent: Option<String>,
    pub reasoning: String,
    pub current_step: Option<u32>,
    pub total_steps: Option<u32>,
    pub completion: Option<StepResult>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReasoningAuthor {
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReasoningEntry {
    pub id: u64,
    pub author: ReasoningAuthor,
    pub agent: Option<String>,
    pub text: String,
    pub at_epoch_ms: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GenerationError {
    #[error("Describe the database you want before generating.")]
    EmptyPrompt,
    #[error("Could not reach the generation service. Check your connection and API key.")]
    Connectivity,
    #[error("The generation service is rate limiting requests. Try again in a moment.")]
    RateLimited,
    #[error("Generation timed out after {0} seconds.")]
    TimedOut(u64),
    #[error("Generation failed: {0}")]
    Other(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Generating,
    Completed,
    Failed,
}

/// One generation session. Replaced wholesale on start and reset so
/// concurrently rendering views never observe a half-cleared session.
#[derive(Debug, Clone)]
pub struct GenerationSession {
    pub mode: GenerationMode,
    pub prompt: String,
    pub db_type: String,
    pub current_step: Option<TabSlot>,
    pub current_agent: Option<String>,
    pub error: Option<GenerationError>,
    phase: Phase,
    completed: BTreeSet<TabSlot>,
    tab_content: BTreeMap<TabSlot, StepResult>,
    raw_steps: HashMap<StepId, StepResult>,
    implementation: ImplementationParts,
    reasoning: Vec<ReasoningEntry>,
}

impl Default for GenerationSession {
    fn default() -> Self {
        Self {
            mode: GenerationMode::Standard,
            prompt: String::new(),
            db_type: String::new(),
            current_step: None,
            current_agent: None,
            error: None,
            phase: Phase::Idle,
            completed: BTreeSet::new(),
            tab_content: BTreeMap::new(),
            raw_steps: HashMap::new(),
            implementation: ImplementationParts::default(),
            reasoning: Vec::new(),
        }
    }
}

impl GenerationSession {
    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn is_generating(&self) -> bool {
        self.phase == Phase::Generating
    }

    pub fn completed(&self) -> &BTreeSet<TabSlot> {
        &self.completed
    }

    pub fn is_complete(&self, slot: TabSlot) -> bool {
        self.completed.contains(&slot)
    }

    pub fn tab_content(&self, slot: TabSlot) -> Option<&StepResult> {
        self.tab_content.get(&slot)
    }

    pub fn populated_tabs(&self) -> impl Iterator<Item = (TabSlot, &StepResult)> {
        self.tab_content.iter().map(|(slot, result)| (*slot, result))
    }

    pub fn raw_step(&self, step: StepId) -> Option<&StepResult> {
        self.raw_steps.get(&step)
    }

    pub fn reasoning(&self) -> &[ReasoningEntry] {
        &self.reasoning
    }
}

/// Single-writer reducer owning the generation lifecycle. All mutation flows
/// through `start`/`apply`/`fail`/`reset`; events tagged with a stale session
/// id are dropped, so callbacks from a discarded session can never touch the
/// current one.
#[derive(Debug)]
pub struct Orchestrator {
    next_session_id: u64,
    next_entry_id: u64,
    session_id: u64,
    session: GenerationSession,
}

impl Default for Orchestrator {
    fn default() -> Self {
        Self {
            next_session_id: 1,
            next_entry_id: 1,
            session_id: 0,
            session: GenerationSession::default(),
        }
    }
}

impl Orchestrator {
    pub fn session(&self) -> &GenerationSession {
        &self.session
    }

    pub fn session_id(&self) -> u64 {
        self.session_id
    }

    pub fn is_generating(&self) -> bool {
        self.session.is_generating()
    }

    pub fn start(
        &mut self,
        prompt: &str,
        db_type: &str,
        mode: GenerationMode,
    ) -> Result<u64, GenerationError> {
        let prompt = prompt.trim();
        if prompt.is_empty() {
            return Err(GenerationError::EmptyPrompt);
        }
        self.session_id = self.alloc_session_id();
        self.session = GenerationSession {
            mode,
            prompt: prompt.to_string(),
            db_type: db_type.trim().to_string(),
            phase: Phase::Generating,
            ..GenerationSession::default()
        };
        let seed = prompt.to_string();
        self.push_entry(ReasoningAuthor::User, None, seed);
        Ok(self.session_id)
    }

    /// Folds one progress callback into the session and returns the slots that
    /// newly completed. Events are applied strictly in receipt order; the
    /// implementation-tab merge depends on it.
    pub fn apply(&mut self, session_id: u64, event: ProgressEvent) -> Vec<TabSlot> {
        if session_id != self.session_id || self.session.phase != Phase::Generating {
            return Vec::new();
        }
        if event.step.mode() != self.session.mode {
            let text = format!(
                "Ignoring step \"{}\" from the wrong pipeline.",
                event.step.wire_name()
            );
            self.push_entry(ReasoningAuthor::Assistant, None, text);
            return Vec::new();
        }

        let slot = resolver::slot_for(event.step);
        self.session.current_step = Some(slot);
        if event.agent.is_some() {
            self.session.current_agent = event.agent.clone();
        }
        if !event.reasoning.trim().is_empty() {
            let agent = event.agent.clone();
            let text = event.reasoning.trim().to_string();
            self.push_entry(ReasoningAuthor::Assistant, agent, text);
        }

        let Some(result) = event.completion else {
            return Vec::new();
        };
        if result.content.trim().is_empty() {
            let text = format!(
                "Completion for step \"{}\" carried no content; ignoring it.",
                event.step.wire_name()
            );
            self.push_entry(ReasoningAuthor::Assistant, None, text);
            return Vec::new();
        }
        if self.session.raw_steps.contains_key(&event.step) {
            let text = format!(
                "Duplicate completion for step \"{}\" ignored; keeping the first result.",
                event.step.wire_name()
            );
            self.push_entry(ReasoningAuthor::Assistant, None, text);
            return Vec::new();
        }
        self.session.raw_steps.insert(event.step, result.clone());

        let mut newly = Vec::new();
        if self.session.implementation.absorb(event.step, result.clone()) {
            let merged = self.session.implementation.merged();
            self.session.tab_content.insert(TabSlot::Implementation, merged);
            // Both sub-documents must have arrived before the slot counts as
            // complete, or an early completion check would end the session
            // while the second half is still in flight.
            if self.session.implementation.is_complete()
                && self.session.completed.insert(TabSlot::Implementation)
            {
                newly.push(TabSlot::Implementation);
            }
        } else {
            self.session.tab_content.insert(slot, result);
            if self.session.completed.insert(slot) {
                newly.push(slot);
            }
        }

        let stubs = resolver::synthesized_after(
            self.session.mode,
            event.step,
            &self.session.prompt,
            &self.session.db_type,
            &self.session.raw_steps,
        );
        for (stub_slot, stub) in stubs {
            if self.session.tab_content.contains_key(&stub_slot) {
                continue;
            }
            self.session.tab_content.insert(stub_slot, stub);
            if self.session.completed.insert(stub_slot) {
                newly.push(stub_slot);
            }
        }

        if self.session.completed.len() == TabSlot::ALL.len() {
            self.session.phase = Phase::Completed;
            self.session.current_step = None;
            self.session.current_agent = None;
            self.push_entry(
                ReasoningAuthor::Assistant,
                None,
                "All five result tabs are ready.".to_string(),
            );
        }
        newly
    }

    /// Stops the session with a typed error. Tab content already merged stays
    /// visible; failure is not transactional.
    pub fn fail(&mut self, session_id: u64, error: GenerationError) {
        if session_id != self.session_id || self.session.phase != Phase::Generating {
            return;
        }
        let text = format!("Generation stopped: {error}");
        self.session.phase = Phase::Failed;
        self.session.error = Some(error);
        self.session.current_step = None;
        self.session.current_agent = None;
        self.push_entry(ReasoningAuthor::Assistant, None, text);
    }

    pub fn reset(&mut self) {
        self.session_id = self.alloc_session_id();
        self.session = GenerationSession::default();
    }

    /// Appends a system narration line regardless of phase (adapter stderr,
    /// contract-violation logging).
    pub fn note(&mut self, text: impl Into<String>) {
        self.push_entry(ReasoningAuthor::Assistant, None, text.into());
    }

    fn push_entry(&mut self, author: ReasoningAuthor, agent: Option<String>, text: String) {
        // Ids come from a counter, not the clock: same-tick bursts used to
        // collide under timestamp-derived ids.
        let id = self.next_entry_id;
        self.next_entry_id = self.next_entry_id.saturating_add(1);
        self.session.reasoning.push(ReasoningEntry {
            id,
            author,
            agent,
            text,
            at_epoch_ms: now_epoch_ms(),
        });
    }

    fn alloc_session_id(&mut self) -> u64 {
        let id = self.next_session_id;
        self.next_session_id = self.next_session_id.saturating_add(1);
        id
    }
}

fn now_epoch_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

#[cfg(test)]
#[path = "../tests/unit/generation_tests.rs"]
mod tests;
