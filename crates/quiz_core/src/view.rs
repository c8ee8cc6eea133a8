//! Render adapter: maps flow state to a display-ready view-model.
//!
//! Everything here is a pure function of the question list, the answer set
//! and the cursor. Front ends apply the resulting [`QuestionView`] to their
//! toolkit of choice.

use serde::Serialize;
use shared::domain::{Likert, Question};

use crate::answers::AnswerSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct AnswerChoice {
    pub value: u8,
    pub icon: &'static str,
    pub label: &'static str,
}

pub const ANSWER_CHOICES: [AnswerChoice; 5] = [
    AnswerChoice {
        value: 1,
        icon: "😞",
        label: "Strongly disagree",
    },
    AnswerChoice {
        value: 2,
        icon: "😕",
        label: "Disagree",
    },
    AnswerChoice {
        value: 3,
        icon: "😐",
        label: "Neutral",
    },
    AnswerChoice {
        value: 4,
        icon: "😊",
        label: "Agree",
    },
    AnswerChoice {
        value: 5,
        icon: "😄",
        label: "Strongly agree",
    },
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AnswerOption {
    pub value: u8,
    pub icon: &'static str,
    pub label: &'static str,
    pub selected: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Progress {
    pub answered: usize,
    pub total: usize,
    /// `answered / total` as a whole percentage, rounded half up.
    pub percent: u8,
    /// 1-based position of the displayed question.
    pub position: usize,
}

impl Progress {
    pub fn label(&self) -> String {
        format!("Question {} / {}", self.position, self.total)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NextAction {
    Next,
    ShowResults,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QuestionView {
    pub number: u32,
    pub text: String,
    pub options: Vec<AnswerOption>,
    pub progress: Progress,
    pub can_go_back: bool,
    pub can_go_next: bool,
    pub next_action: NextAction,
}

impl QuestionView {
    pub fn selected(&self) -> Option<u8> {
        self.options
            .iter()
            .find(|option| option.selected)
            .map(|option| option.value)
    }
}

/// Builds the view for the question at `cursor`. Returns `None` when the
/// cursor does not address a loaded question.
pub fn question_view(
    questions: &[Question],
    answers: &AnswerSet,
    cursor: usize,
) -> Option<QuestionView> {
    let question = questions.get(cursor)?;
    let saved = answers.get(cursor);
    let total = questions.len();
    let is_last = cursor + 1 == total;

    Some(QuestionView {
        number: question
            .order
            .filter(|order| *order > 0)
            .unwrap_or_else(|| u32::try_from(cursor + 1).unwrap_or(u32::MAX)),
        text: question.text.clone(),
        options: answer_options(saved),
        progress: progress(answers, cursor, total),
        can_go_back: cursor > 0,
        can_go_next: saved.is_some(),
        next_action: if is_last && answers.is_complete() {
            NextAction::ShowResults
        } else {
            NextAction::Next
        },
    })
}

fn answer_options(saved: Option<Likert>) -> Vec<AnswerOption> {
    ANSWER_CHOICES
        .iter()
        .map(|choice| AnswerOption {
            value: choice.value,
            icon: choice.icon,
            label: choice.label,
            selected: saved.map(Likert::value) == Some(choice.value),
        })
        .collect()
}

fn progress(answers: &AnswerSet, cursor: usize, total: usize) -> Progress {
    let answered = answers.answered_count();
    let percent = if total == 0 {
        0
    } else {
        ((answered * 200 + total) / (2 * total)).min(100) as u8
    };
    Progress {
        answered,
        total,
        percent,
        position: cursor + 1,
    }
}
