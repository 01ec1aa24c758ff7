use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use alloy_primitives::{Address, B256};
use serde::{Deserialize, Serialize};

use crate::error::TaskError;

/// Opaque 32-byte task identifier. This *is* the keccak the chain gateway
/// matches on-chain events against, not a derived value looked up via a
/// linear scan — see DESIGN.md for the resolved open question.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(pub B256);

impl TaskId {
    pub fn random() -> Self {
        Self(B256::random())
    }

    pub fn from_request_hash(bytes: &[u8]) -> Self {
        Self(alloy_primitives::keccak256(bytes))
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        self.0.as_ref()
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for TaskId {
    type Err = alloy_primitives::hex::FromHexError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(s.parse()?))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TaskType {
    ImageGeneration,
    SummaryGeneration,
    Researcher,
    Writer,
    MarketResearch,
}

impl TaskType {
    pub fn label(&self) -> &'static str {
        match self {
            TaskType::ImageGeneration => "image-generation",
            TaskType::SummaryGeneration => "summary-generation",
            TaskType::Researcher => "researcher",
            TaskType::Writer => "writer",
            TaskType::MarketResearch => "market-research",
        }
    }

    pub fn from_label(label: &str) -> Result<Self, TaskError> {
        match label {
            "image-generation" => Ok(TaskType::ImageGeneration),
            "summary-generation" => Ok(TaskType::SummaryGeneration),
            "researcher" => Ok(TaskType::Researcher),
            "writer" => Ok(TaskType::Writer),
            "market-research" => Ok(TaskType::MarketResearch),
            other => Err(TaskError::UnsupportedTaskType(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImageStyle {
    Photorealistic,
    Illustration,
    Sketch,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResearchDepth {
    Shallow,
    Standard,
    Deep,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WriteTone {
    Neutral,
    Persuasive,
    Technical,
}

/// Per-`taskType` input payload. Replaces the source's dynamic
/// `Record<string, unknown>` with a closed, statically typed union: every
/// variant is validated once, at construction, against the bounds below.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "taskType", rename_all = "kebab-case")]
pub enum TaskInput {
    ImageGeneration {
        prompt: String,
        #[serde(default = "default_image_dim")]
        width: u32,
        #[serde(default = "default_image_dim")]
        height: u32,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        style: Option<ImageStyle>,
    },
    SummaryGeneration {
        text: String,
        #[serde(default = "default_max_sentences")]
        max_sentences: u32,
    },
    Researcher {
        query: String,
        #[serde(default)]
        depth: ResearchDepth,
    },
    Writer {
        brief: String,
        #[serde(default)]
        tone: WriteTone,
        #[serde(default = "default_target_words")]
        target_words: u32,
    },
    MarketResearch {
        sector: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        region: Option<String>,
        #[serde(default = "default_timeframe_days")]
        timeframe_days: u32,
    },
}

impl Default for ResearchDepth {
    fn default() -> Self {
        ResearchDepth::Standard
    }
}

impl Default for WriteTone {
    fn default() -> Self {
        WriteTone::Neutral
    }
}

fn default_image_dim() -> u32 {
    512
}
fn default_max_sentences() -> u32 {
    3
}
fn default_target_words() -> u32 {
    500
}
fn default_timeframe_days() -> u32 {
    30
}

impl TaskInput {
    pub fn task_type(&self) -> TaskType {
        match self {
            TaskInput::ImageGeneration { .. } => TaskType::ImageGeneration,
            TaskInput::SummaryGeneration { .. } => TaskType::SummaryGeneration,
            TaskInput::Researcher { .. } => TaskType::Researcher,
            TaskInput::Writer { .. } => TaskType::Writer,
            TaskInput::MarketResearch { .. } => TaskType::MarketResearch,
        }
    }

    /// Enforces the bounded-string / enumerated / numeric-range schema for
    /// this variant's `taskType`. Called once at task creation (C6).
    pub fn validate(&self) -> Result<(), TaskError> {
        let task_type = self.task_type();
        let violate = |reason: &str| TaskError::SchemaViolation {
            task_type,
            reason: reason.to_string(),
        };
        match self {
            TaskInput::ImageGeneration {
                prompt,
                width,
                height,
                ..
            } => {
                if prompt.is_empty() || prompt.chars().count() > 2_000 {
                    return Err(violate("prompt must be 1..=2000 characters"));
                }
                if !(64..=2048).contains(width) || !(64..=2048).contains(height) {
                    return Err(violate("width/height must be in 64..=2048"));
                }
            }
            TaskInput::SummaryGeneration {
                text,
                max_sentences,
            } => {
                if text.is_empty() || text.chars().count() > 50_000 {
                    return Err(violate("text must be 1..=50000 characters"));
                }
                if !(1..=20).contains(max_sentences) {
                    return Err(violate("max_sentences must be in 1..=20"));
                }
            }
            TaskInput::Researcher { query, .. } => {
                if query.is_empty() || query.chars().count() > 2_000 {
                    return Err(violate("query must be 1..=2000 characters"));
                }
            }
            TaskInput::Writer {
                brief,
                target_words,
                ..
            } => {
                if brief.is_empty() || brief.chars().count() > 5_000 {
                    return Err(violate("brief must be 1..=5000 characters"));
                }
                if !(50..=5_000).contains(target_words) {
                    return Err(violate("target_words must be in 50..=5000"));
                }
            }
            TaskInput::MarketResearch {
                sector,
                timeframe_days,
                ..
            } => {
                if sector.is_empty() || sector.chars().count() > 200 {
                    return Err(violate("sector must be 1..=200 characters"));
                }
                if !(1..=365).contains(timeframe_days) {
                    return Err(violate("timeframe_days must be in 1..=365"));
                }
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Pending,
    Created,
    Authorized,
    Running,
    Completed,
    Refunded,
    Failed,
}

impl TaskStatus {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            TaskStatus::Completed | TaskStatus::Refunded | TaskStatus::Failed
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthorizationRecord {
    pub signature: Vec<u8>,
    pub nonce: u64,
    pub expires_at: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    pub task_id: TaskId,
    pub task_type: TaskType,
    pub input_parameters: TaskInput,
    pub required_capabilities: BTreeSet<String>,
    pub deadline: u64,
    pub budget: u128,
    pub status: TaskStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assigned_worker: Option<Address>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub escrow_tx_hash: Option<B256>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result_hash: Option<Vec<u8>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub authorization: Option<AuthorizationRecord>,
    pub created_at: u64,
    pub updated_at: u64,
}

impl Task {
    /// Forms a new task in `Pending` status, enforcing I1/I3 at construction.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        task_id: TaskId,
        input_parameters: TaskInput,
        required_capabilities: Option<BTreeSet<String>>,
        deadline: u64,
        budget: u128,
        created_at: u64,
    ) -> Result<Self, TaskError> {
        input_parameters.validate()?;
        if budget == 0 {
            return Err(TaskError::NonPositiveBudget(budget));
        }
        if deadline <= created_at {
            return Err(TaskError::DeadlineNotAfterCreation {
                deadline,
                created_at,
            });
        }
        let task_type = input_parameters.task_type();
        let required_capabilities = required_capabilities.unwrap_or_else(|| {
            let mut set = BTreeSet::new();
            set.insert(task_type.label().to_string());
            set
        });
        Ok(Self {
            task_id,
            task_type,
            input_parameters,
            required_capabilities,
            deadline,
            budget,
            status: TaskStatus::Pending,
            assigned_worker: None,
            escrow_tx_hash: None,
            result_hash: None,
            authorization: None,
            created_at,
            updated_at: created_at,
        })
    }

    /// I4: once `status >= Created`, escrow tx and assigned worker are set.
    pub fn has_escrow(&self) -> bool {
        !matches!(self.status, TaskStatus::Pending)
    }
}
