//! Static display data: prompt suggestions and the sample history list.

/// Greeting shown at the top of every fresh session.
pub const WELCOME_MESSAGE: &str =
    "Hi! Ask me anything, or attach files and I will take them into account.";

/// Prompt suggestions offered before the first message.
pub const SUGGESTIONS: [&str; 4] = [
    "Summarize the attached document in five bullet points.",
    "What can you help me with?",
    "Draft a short status update for my team.",
    "Explain the key risks in this proposal.",
];

/// A past conversation shown in the history list. Display only.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistorySession {
    pub id: &'static str,
    pub title: &'static str,
    pub channel: &'static str,
    pub updated: &'static str,
    pub summary: &'static str,
}

/// Returns the suggestion prompts.
pub fn suggestions() -> &'static [&'static str] {
    &SUGGESTIONS
}

/// Returns the sample history list.
pub fn history() -> Vec<HistorySession> {
    vec![
        HistorySession {
            id: "hist-001",
            title: "Quarterly report review",
            channel: "Web",
            updated: "2 hours ago",
            summary: "Walked through revenue figures and flagged two inconsistencies.",
        },
        HistorySession {
            id: "hist-002",
            title: "Onboarding checklist",
            channel: "Teams",
            updated: "Yesterday",
            summary: "Built a first-week checklist for new support engineers.",
        },
        HistorySession {
            id: "hist-003",
            title: "Contract clause questions",
            channel: "Web",
            updated: "3 days ago",
            summary: "Compared termination clauses across two vendor agreements.",
        },
    ]
}
