use crate::models::Artifact;
use indexmap::IndexSet;

/// Asks whether a section's discovered artifacts may be removed.
///
/// Implementations must show `items` in full before deciding; the engine
/// never calls the gate with an empty list.
pub trait ConfirmationGate {
    fn confirm(&mut self, section: &str, items: &[Artifact]) -> bool;
}

/// The set of answers treated as "yes".
///
/// Comparison is case-insensitive on the trimmed answer. Anything else,
/// including an empty line, is a decline.
#[derive(Debug, Clone)]
pub struct AffirmativeTokens {
    tokens: IndexSet<String>,
}

impl AffirmativeTokens {
    pub fn new<I>(tokens: I) -> Self
    where
        I: IntoIterator,
        I::Item: AsRef<str>,
    {
        Self {
            tokens: tokens
                .into_iter()
                .map(|t| t.as_ref().trim().to_lowercase())
                .filter(|t| !t.is_empty())
                .collect(),
        }
    }

    pub fn is_affirmative(&self, answer: &str) -> bool {
        let answer = answer.trim().to_lowercase();
        !answer.is_empty() && self.tokens.contains(&answer)
    }

    /// Short hint for prompts, e.g. `y/yes`.
    pub fn hint(&self) -> String {
        self.tokens.iter().cloned().collect::<Vec<_>>().join("/")
    }
}

impl Default for AffirmativeTokens {
    fn default() -> Self {
        Self::new(crate::models::config::default_affirmative_tokens())
    }
}

/// Non-interactive decision policy.
#[derive(Debug, Clone)]
pub enum DecisionPolicy {
    AcceptAll,
    DeclineAll,
    /// Accept only the named sections.
    AcceptOnly(IndexSet<String>),
}

/// A gate whose answers are a pure function of its policy.
///
/// Every prompt it receives is kept for inspection.
#[derive(Debug, Clone)]
pub struct PolicyGate {
    policy: DecisionPolicy,
    prompts: Vec<(String, Vec<Artifact>)>,
}

impl PolicyGate {
    pub fn new(policy: DecisionPolicy) -> Self {
        Self {
            policy,
            prompts: Vec::new(),
        }
    }

    pub fn accept_all() -> Self {
        Self::new(DecisionPolicy::AcceptAll)
    }

    pub fn decline_all() -> Self {
        Self::new(DecisionPolicy::DeclineAll)
    }

    /// Sections the gate was asked about, with the items shown.
    pub fn prompts(&self) -> &[(String, Vec<Artifact>)] {
        &self.prompts
    }
}

impl ConfirmationGate for PolicyGate {
    fn confirm(&mut self, section: &str, items: &[Artifact]) -> bool {
        self.prompts.push((section.to_string(), items.to_vec()));
        match &self.policy {
            DecisionPolicy::AcceptAll => true,
            DecisionPolicy::DeclineAll => false,
            DecisionPolicy::AcceptOnly(sections) => sections.contains(section),
        }
    }
}
