//! The fixed six-step progression of a session.
//!
//! ```text
//! Introduction → Intuition → Closeness → MainQuestion → DateExperience → FreeChat
//! ```
//!
//! Normal flow only ever moves one step forward. The two exceptions are the
//! postponement of the main question (MainQuestion → Closeness, followed by a
//! scheduled return) and the operator-only jump.

use std::fmt::Display;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Stage {
    Introduction,
    Intuition,
    Closeness,
    MainQuestion,
    DateExperience,
    FreeChat,
}

impl Stage {
    pub const ALL: [Stage; 6] = [
        Stage::Introduction,
        Stage::Intuition,
        Stage::Closeness,
        Stage::MainQuestion,
        Stage::DateExperience,
        Stage::FreeChat,
    ];

    /// The successor in the fixed order, `None` for the last stage.
    pub fn next(self) -> Option<Stage> {
        match self {
            Stage::Introduction => Some(Stage::Intuition),
            Stage::Intuition => Some(Stage::Closeness),
            Stage::Closeness => Some(Stage::MainQuestion),
            Stage::MainQuestion => Some(Stage::DateExperience),
            Stage::DateExperience => Some(Stage::FreeChat),
            Stage::FreeChat => None,
        }
    }

    /// Stages where messaging and categorised questions are never limited.
    pub fn is_unlimited(self) -> bool {
        matches!(self, Stage::MainQuestion | Stage::FreeChat)
    }

    /// Title shown in the chat header.
    pub fn title(self) -> &'static str {
        match self {
            Stage::Introduction => "Знакомство",
            Stage::Intuition => "Интуиция",
            Stage::Closeness => "Сближение",
            Stage::MainQuestion => "Главный вопрос",
            Stage::DateExperience => "Свидание",
            Stage::FreeChat => "Свободное общение",
        }
    }
}

impl Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let stage = match self {
            Stage::Introduction => "Introduction",
            Stage::Intuition => "Intuition",
            Stage::Closeness => "Closeness",
            Stage::MainQuestion => "MainQuestion",
            Stage::DateExperience => "DateExperience",
            Stage::FreeChat => "FreeChat",
        };
        write!(f, "{stage}")
    }
}
