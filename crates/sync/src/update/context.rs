use std::collections::VecDeque;

use crate::world::{EntityId, Team, World};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Appearance {
    Guard,
    Character(u8),
}

impl Appearance {
    pub fn for_player(team: Team, character: u8) -> Self {
        match team {
            Team::Guards => Self::Guard,
            _ => Self::Character(character),
        }
    }
}

/// Installs the animation set for a newly spawned player.
pub trait AnimationLoader {
    fn load(&mut self, world: &mut World, entity: EntityId, appearance: Appearance);
}

pub trait ChatLog {
    fn add_line(&mut self, line: &str);
}

/// Rebuilds tile and collision geometry, including objective entities, for a floor.
pub trait FloorBuilder {
    fn rebuild(&mut self, world: &mut World, floor: u32);
}

/// Everything the update system mutates outside its own tables.
pub struct UpdateContext<'a> {
    pub world: &'a mut World,
    pub animations: &'a mut dyn AnimationLoader,
    pub chat: &'a mut dyn ChatLog,
    pub floors: &'a mut dyn FloorBuilder,
}

/// Bounded scrollback of chat lines.
#[derive(Debug, Clone)]
pub struct ChatHistory {
    lines: VecDeque<String>,
    capacity: usize,
}

impl Default for ChatHistory {
    fn default() -> Self {
        Self::new(64)
    }
}

impl ChatHistory {
    pub fn new(capacity: usize) -> Self {
        Self {
            lines: VecDeque::with_capacity(capacity),
            capacity: capacity.max(1),
        }
    }

    pub fn lines(&self) -> impl Iterator<Item = &str> {
        self.lines.iter().map(String::as_str)
    }

    pub fn last(&self) -> Option<&str> {
        self.lines.back().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}

impl ChatLog for ChatHistory {
    fn add_line(&mut self, line: &str) {
        if self.lines.len() == self.capacity {
            self.lines.pop_front();
        }
        log::info!("[chat] {}", line);
        self.lines.push_back(line.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chat_history_drops_oldest() {
        let mut history = ChatHistory::new(2);
        history.add_line("one");
        history.add_line("two");
        history.add_line("three");

        assert_eq!(history.lines().collect::<Vec<_>>(), vec!["two", "three"]);
        assert_eq!(history.last(), Some("three"));
    }

    #[test]
    fn test_guards_share_one_appearance() {
        assert_eq!(Appearance::for_player(Team::Guards, 5), Appearance::Guard);
        assert_eq!(
            Appearance::for_player(Team::Hackers, 5),
            Appearance::Character(5)
        );
    }
}
