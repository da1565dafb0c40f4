use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Habit {
    pub name: String,
    pub emoji: String,
}

impl Habit {
    pub fn new(name: &str, emoji: &str) -> Self {
        Self {
            name: name.into(),
            emoji: emoji.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HabitItem {
    #[serde(flatten)]
    pub habit: Habit,
    pub checked: bool,
}

/// Today's habit list. Lives only as long as its owner; nothing is persisted.
#[derive(Debug, Clone, Default, Serialize)]
pub struct HabitChecklist {
    items: Vec<HabitItem>,
}

impl HabitChecklist {
    pub fn new(habits: impl IntoIterator<Item = Habit>) -> Self {
        Self {
            items: habits
                .into_iter()
                .map(|habit| HabitItem {
                    habit,
                    checked: false,
                })
                .collect(),
        }
    }

    pub fn sample() -> Self {
        Self::new([
            Habit::new("Drink Water", "💧"),
            Habit::new("2-Min Meditation", "🧘"),
            Habit::new("Walk 500 Steps", "🚶"),
        ])
    }

    pub fn items(&self) -> &[HabitItem] {
        &self.items
    }

    /// Flip one habit; returns the new state, or `None` for an unknown index.
    pub fn toggle(&mut self, index: usize) -> Option<bool> {
        let item = self.items.get_mut(index)?;
        item.checked = !item.checked;
        Some(item.checked)
    }

    pub fn is_checked(&self, index: usize) -> bool {
        self.items.get(index).is_some_and(|item| item.checked)
    }

    pub fn completed_count(&self) -> usize {
        self.items.iter().filter(|item| item.checked).count()
    }
}
