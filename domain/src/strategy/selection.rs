//! Turn selection
//!
//! After every appended message the engine asks a [`TurnSelector`] who acts
//! next. Selectors are pure: the same transcript always yields the same
//! [`NextSpeaker`], and they never touch I/O.
//!
//! Two mechanisms are provided:
//!
//! - [`AllowListSelector`]: a declarative `speaker -> [next speakers]` map
//! - [`RoutingSelector`]: first agent, tool continuation, marker routing,
//!   and fall-through to the closing agent

use std::collections::{BTreeMap, BTreeSet, VecDeque};

use serde::{Deserialize, Serialize};

use crate::transcript::{Transcript, USER_SPEAKER};

/// Marker an agent emits once it has answered the question.
pub const QUESTION_ANSWERED_MARKER: &str = "QUESTION_ANSWERED";

/// Marker prefix a triage agent emits to hand over to a datasource agent,
/// e.g. `DATASOURCE_SELECTED:semantic_model`.
pub const DATASOURCE_SELECTED_MARKER: &str = "DATASOURCE_SELECTED:";

/// The selector's decision.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NextSpeaker {
    Agent(String),
    /// The strategy's designated closing agent
    Closing,
    /// Stop the exchange
    Terminate,
}

/// Decides which agent acts next.
pub trait TurnSelector: Send + Sync {
    fn select(&self, transcript: &Transcript) -> NextSpeaker;

    /// Every agent name this selector can ever return, excluding the
    /// closing agent reached through [`NextSpeaker::Closing`].
    fn reachable_agents(&self) -> BTreeSet<String>;
}

// ==================== Allow-list ====================

/// Declarative transition table.
///
/// The virtual speaker `"user"` is a valid key (who answers the ask) and a
/// valid target (hand the turn back to the user, which ends a single-ask
/// exchange). A speaker with no entry falls through to the closing agent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AllowListSelector {
    transitions: BTreeMap<String, Vec<String>>,
}

impl AllowListSelector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn allow(mut self, from: impl Into<String>, to: impl Into<String>) -> Self {
        let to = to.into();
        let targets = self.transitions.entry(from.into()).or_default();
        if !targets.contains(&to) {
            targets.push(to);
        }
        self
    }

    pub fn targets(&self, from: &str) -> &[String] {
        self.transitions.get(from).map(Vec::as_slice).unwrap_or(&[])
    }

    fn next_from(&self, speaker: &str) -> NextSpeaker {
        match self.targets(speaker).first() {
            Some(next) if next == USER_SPEAKER => NextSpeaker::Terminate,
            Some(next) => NextSpeaker::Agent(next.clone()),
            None => NextSpeaker::Closing,
        }
    }
}

impl TurnSelector for AllowListSelector {
    fn select(&self, transcript: &Transcript) -> NextSpeaker {
        let Some(last) = transcript.last() else {
            return self.next_from(USER_SPEAKER);
        };
        if last.is_tool_event() && !last.is_from_user() {
            return NextSpeaker::Agent(last.speaker.clone());
        }
        self.next_from(&last.speaker)
    }

    fn reachable_agents(&self) -> BTreeSet<String> {
        let mut seen = BTreeSet::new();
        let mut queue = VecDeque::from([USER_SPEAKER.to_string()]);
        while let Some(speaker) = queue.pop_front() {
            for next in self.targets(&speaker) {
                if next != USER_SPEAKER && seen.insert(next.clone()) {
                    queue.push_back(next.clone());
                }
            }
        }
        seen
    }
}

// ==================== Routing ====================

/// Programmatic selector.
///
/// | Last message | Next |
/// |---|---|
/// | none, or from the user | first agent |
/// | from the closing agent | terminate |
/// | tool-call request or result | the same agent |
/// | text with `DATASOURCE_SELECTED:<kw>` | agent routed for `kw` (closing if unknown) |
/// | any other text, including `QUESTION_ANSWERED` | closing agent |
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoutingSelector {
    first_agent: String,
    closing_agent: String,
    routes: BTreeMap<String, String>,
}

impl RoutingSelector {
    pub fn new(first_agent: impl Into<String>, closing_agent: impl Into<String>) -> Self {
        Self {
            first_agent: first_agent.into(),
            closing_agent: closing_agent.into(),
            routes: BTreeMap::new(),
        }
    }

    /// Route `DATASOURCE_SELECTED:<keyword>` to `agent`. Keywords are case-insensitive.
    pub fn with_route(mut self, keyword: impl AsRef<str>, agent: impl Into<String>) -> Self {
        self.routes
            .insert(keyword.as_ref().trim().to_lowercase(), agent.into());
        self
    }

    pub fn first_agent(&self) -> &str {
        &self.first_agent
    }

    /// Extract the keyword following the datasource marker, if present.
    pub fn selected_datasource(text: &str) -> Option<String> {
        let start = text.find(DATASOURCE_SELECTED_MARKER)? + DATASOURCE_SELECTED_MARKER.len();
        let keyword: String = text[start..]
            .trim_start()
            .chars()
            .take_while(|c| c.is_alphanumeric() || *c == '_' || *c == '-')
            .collect();
        if keyword.is_empty() {
            None
        } else {
            Some(keyword.to_lowercase())
        }
    }
}

impl TurnSelector for RoutingSelector {
    fn select(&self, transcript: &Transcript) -> NextSpeaker {
        let Some(last) = transcript.last() else {
            return NextSpeaker::Agent(self.first_agent.clone());
        };
        if last.is_from_user() {
            return NextSpeaker::Agent(self.first_agent.clone());
        }
        if last.speaker == self.closing_agent {
            return NextSpeaker::Terminate;
        }
        if last.is_tool_event() {
            return NextSpeaker::Agent(last.speaker.clone());
        }

        let text = last.as_text().unwrap_or_default();
        if let Some(keyword) = Self::selected_datasource(text) {
            return match self.routes.get(&keyword) {
                Some(agent) => NextSpeaker::Agent(agent.clone()),
                None => NextSpeaker::Closing,
            };
        }
        NextSpeaker::Closing
    }

    fn reachable_agents(&self) -> BTreeSet<String> {
        let mut agents: BTreeSet<String> = self.routes.values().cloned().collect();
        agents.insert(self.first_agent.clone());
        agents.insert(self.closing_agent.clone());
        agents
    }
}

// ==================== Either ====================

/// The selector held by a strategy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SpeakerSelector {
    AllowList(AllowListSelector),
    Routing(RoutingSelector),
}

impl TurnSelector for SpeakerSelector {
    fn select(&self, transcript: &Transcript) -> NextSpeaker {
        match self {
            SpeakerSelector::AllowList(s) => s.select(transcript),
            SpeakerSelector::Routing(s) => s.select(transcript),
        }
    }

    fn reachable_agents(&self) -> BTreeSet<String> {
        match self {
            SpeakerSelector::AllowList(s) => s.reachable_agents(),
            SpeakerSelector::Routing(s) => s.reachable_agents(),
        }
    }
}

impl From<AllowListSelector> for SpeakerSelector {
    fn from(selector: AllowListSelector) -> Self {
        SpeakerSelector::AllowList(selector)
    }
}

impl From<RoutingSelector> for SpeakerSelector {
    fn from(selector: RoutingSelector) -> Self {
        SpeakerSelector::Routing(selector)
    }
}
