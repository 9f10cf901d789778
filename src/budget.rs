//! Per-stage resource counters.

use std::fmt::Display;

use serde::{Deserialize, Serialize};

use crate::config::BudgetDefaults;
use crate::stage::Stage;

/// A remaining-use counter.
///
/// `Finite(0)` means exhausted. Only stages flagged unlimited carry
/// `Unlimited`, a zero never stands in for "no limit".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Budget {
    Finite(u32),
    Unlimited,
}

impl Budget {
    pub fn is_exhausted(&self) -> bool {
        matches!(self, Budget::Finite(0))
    }

    /// Remaining uses, `None` when unlimited.
    pub fn remaining(&self) -> Option<u32> {
        match self {
            Budget::Finite(n) => Some(*n),
            Budget::Unlimited => None,
        }
    }

    /// Use one unit. Clamps at zero and never touches an unlimited budget.
    pub fn consume(&mut self) {
        if let Budget::Finite(n) = self {
            *n = n.saturating_sub(1);
        }
    }
}

/// What a budget counts, reported back in `BudgetExhausted`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BudgetResource {
    Messages,
    Questions,
    Category(QuestionCategory),
    DeepQuestions,
}

impl Display for BudgetResource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BudgetResource::Messages => write!(f, "Message"),
            BudgetResource::Questions => write!(f, "Question"),
            BudgetResource::Category(category) => write!(f, "{category} question"),
            BudgetResource::DeepQuestions => write!(f, "Deep question"),
        }
    }
}

/// Question categories of the Closeness stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum QuestionCategory {
    Closer,
    EvenCloser,
    InnerWorld,
}

impl QuestionCategory {
    pub const ALL: [QuestionCategory; 3] = [
        QuestionCategory::Closer,
        QuestionCategory::EvenCloser,
        QuestionCategory::InnerWorld,
    ];
}

impl Display for QuestionCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let category = match self {
            QuestionCategory::Closer => "Closer",
            QuestionCategory::EvenCloser => "EvenCloser",
            QuestionCategory::InnerWorld => "InnerWorld",
        };
        write!(f, "{category}")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryBudgets {
    pub closer: Budget,
    pub even_closer: Budget,
    pub inner_world: Budget,
}

impl CategoryBudgets {
    pub fn uniform(budget: Budget) -> Self {
        Self {
            closer: budget,
            even_closer: budget,
            inner_world: budget,
        }
    }

    pub fn get(&self, category: QuestionCategory) -> Budget {
        match category {
            QuestionCategory::Closer => self.closer,
            QuestionCategory::EvenCloser => self.even_closer,
            QuestionCategory::InnerWorld => self.inner_world,
        }
    }

    pub fn get_mut(&mut self, category: QuestionCategory) -> &mut Budget {
        match category {
            QuestionCategory::Closer => &mut self.closer,
            QuestionCategory::EvenCloser => &mut self.even_closer,
            QuestionCategory::InnerWorld => &mut self.inner_world,
        }
    }

    pub fn all_exhausted(&self) -> bool {
        QuestionCategory::ALL
            .iter()
            .all(|category| self.get(*category).is_exhausted())
    }
}

/// The counters gating the current stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageBudgets {
    pub messages: Budget,
    pub questions: Budget,
    pub categories: CategoryBudgets,
}

impl StageBudgets {
    /// Starting counters for `stage`.
    pub fn for_stage(stage: Stage, defaults: &BudgetDefaults) -> Self {
        let none = Budget::Finite(0);
        match stage {
            Stage::Introduction => Self {
                messages: Budget::Finite(defaults.introduction_messages),
                questions: none,
                categories: CategoryBudgets::uniform(none),
            },
            Stage::Intuition => Self {
                messages: Budget::Finite(defaults.intuition_messages),
                questions: Budget::Finite(defaults.intuition_questions),
                categories: CategoryBudgets::uniform(none),
            },
            Stage::Closeness => Self {
                messages: Budget::Finite(defaults.closeness_messages),
                questions: none,
                categories: CategoryBudgets::uniform(Budget::Finite(
                    defaults.closeness_questions_per_category,
                )),
            },
            Stage::DateExperience => Self {
                messages: Budget::Finite(defaults.date_experience_messages),
                questions: none,
                categories: CategoryBudgets::uniform(none),
            },
            Stage::MainQuestion | Stage::FreeChat => Self {
                messages: Budget::Unlimited,
                questions: Budget::Unlimited,
                categories: CategoryBudgets::uniform(Budget::Unlimited),
            },
        }
    }

    /// True when every counter relevant to `stage` is exhausted.
    pub fn exhausted_for(&self, stage: Stage) -> bool {
        match stage {
            Stage::Intuition => self.messages.is_exhausted() && self.questions.is_exhausted(),
            Stage::Closeness => self.messages.is_exhausted() && self.categories.all_exhausted(),
            _ => self.messages.is_exhausted(),
        }
    }
}
