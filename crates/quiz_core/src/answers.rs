use shared::domain::Likert;

/// Per-question answer slots. Length is fixed at construction and always
/// matches the loaded question sequence.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AnswerSet {
    slots: Vec<Option<Likert>>,
}

impl AnswerSet {
    pub fn unanswered(len: usize) -> Self {
        Self {
            slots: vec![None; len],
        }
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<Likert> {
        self.slots.get(index).copied().flatten()
    }

    /// Records `value` at `index`. Out-of-range indices are ignored and
    /// reported as `false`.
    pub fn set(&mut self, index: usize, value: Likert) -> bool {
        match self.slots.get_mut(index) {
            Some(slot) => {
                *slot = Some(value);
                true
            }
            None => false,
        }
    }

    pub fn answered_count(&self) -> usize {
        self.slots.iter().filter(|slot| slot.is_some()).count()
    }

    pub fn first_unanswered(&self) -> Option<usize> {
        self.slots.iter().position(Option::is_none)
    }

    pub fn is_complete(&self) -> bool {
        self.first_unanswered().is_none()
    }

    /// The submission payload, available only once every slot is filled.
    pub fn completed(&self) -> Option<Vec<Likert>> {
        self.slots.iter().copied().collect()
    }

    pub fn as_slice(&self) -> &[Option<Likert>] {
        &self.slots
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn likert(value: u8) -> Likert {
        Likert::new(value).expect("likert")
    }

    #[test]
    fn starts_with_every_slot_empty() {
        let answers = AnswerSet::unanswered(4);
        assert_eq!(answers.len(), 4);
        assert_eq!(answers.answered_count(), 0);
        assert_eq!(answers.first_unanswered(), Some(0));
        assert!(answers.completed().is_none());
    }

    #[test]
    fn set_only_touches_target_slot() {
        let mut answers = AnswerSet::unanswered(3);
        assert!(answers.set(1, likert(4)));
        assert_eq!(answers.as_slice(), &[None, Some(likert(4)), None]);
        assert!(!answers.set(3, likert(2)));
        assert_eq!(answers.len(), 3);
    }

    #[test]
    fn completed_returns_values_in_order() {
        let mut answers = AnswerSet::unanswered(3);
        answers.set(2, likert(5));
        answers.set(0, likert(3));
        assert_eq!(answers.first_unanswered(), Some(1));

        answers.set(1, likert(1));
        assert!(answers.is_complete());
        assert_eq!(
            answers.completed(),
            Some(vec![likert(3), likert(1), likert(5)])
        );
    }
}
