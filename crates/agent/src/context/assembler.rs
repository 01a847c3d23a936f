//! Context assembly: turn a stored message window into model input.
//!
//! The assembler takes the recent window (oldest first) and the user turn
//! that was just persisted, and produces:
//!
//! - `history`: prior turns in model vocabulary (`user` / `model`)
//! - `user_text`: the new turn, sent separately
//!
//! Rules, applied in order:
//!
//! 1. The current turn is removed from the window by message id, so it is
//!    sent exactly once whether or not the fetch already picked it up.
//! 2. Oldest turns are dropped until history + current turn fit in
//!    `max_messages`.
//! 3. Leading `model` turns are dropped; the history must open with a
//!    `user` turn.
//!
//! # Determinism
//!
//! Assembly is a pure function of its inputs. No clock, randomness, or I/O.

use pinchat_core::message::{Message, Turn, TurnRole};
use serde::{Deserialize, Serialize};

/// Model input built from stored messages.
#[derive(Debug, Clone, PartialEq)]
pub struct AssembledContext {
    /// Prior turns, oldest first.
    pub history: Vec<Turn>,
    /// The new user turn.
    pub user_text: String,
    pub metadata: AssemblyMetadata,
}

/// What assembly kept and dropped.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssemblyMetadata {
    /// Messages in the window handed in.
    pub window_size: usize,
    /// Turns kept in `history`.
    pub history_included: usize,
    pub drops: Vec<DropInfo>,
}

/// A group of window messages left out of the history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DropInfo {
    pub items_dropped: usize,
    pub reason: DropReason,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DropReason {
    /// The window already contained the current turn
    CurrentTurn,
    /// Older than the message bound allows
    OutsideWindow,
    /// Model turn at the start of the history
    LeadingModelTurn,
}

/// Default bound on history + current turn.
pub const DEFAULT_MAX_MESSAGES: usize = 20;

/// The context assembler. Stateless; create one and reuse it.
#[derive(Debug, Clone)]
pub struct ContextAssembler {
    max_messages: usize,
}

impl Default for ContextAssembler {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_MESSAGES)
    }
}

impl ContextAssembler {
    /// `max_messages` bounds history + current turn. Values below 1 are
    /// treated as 1 (current turn only).
    pub fn new(max_messages: usize) -> Self {
        Self {
            max_messages: max_messages.max(1),
        }
    }

    pub fn max_messages(&self) -> usize {
        self.max_messages
    }

    pub fn assemble(&self, window: &[Message], current: &Message) -> AssembledContext {
        let mut drops = Vec::new();

        let prior: Vec<&Message> = window.iter().filter(|m| m.id != current.id).collect();
        Self::record(&mut drops, window.len() - prior.len(), DropReason::CurrentTurn);

        let room = self.max_messages - 1;
        let skip = prior.len().saturating_sub(room);
        Self::record(&mut drops, skip, DropReason::OutsideWindow);

        let mut history: Vec<Turn> = prior[skip..].iter().map(|m| Turn::from(*m)).collect();

        let leading = history
            .iter()
            .take_while(|t| t.role == TurnRole::Model)
            .count();
        history.drain(..leading);
        Self::record(&mut drops, leading, DropReason::LeadingModelTurn);

        AssembledContext {
            metadata: AssemblyMetadata {
                window_size: window.len(),
                history_included: history.len(),
                drops,
            },
            history,
            user_text: current.text.clone(),
        }
    }

    fn record(drops: &mut Vec<DropInfo>, count: usize, reason: DropReason) {
        if count > 0 {
            drops.push(DropInfo {
                items_dropped: count,
                reason,
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};
    use pinchat_core::identity::IdentityId;
    use pinchat_core::message::Sender;

    /// Alternating user/ai messages, one second apart, oldest first.
    fn conversation(id: &IdentityId, n: usize) -> Vec<Message> {
        let base = Utc::now();
        (0..n)
            .map(|i| {
                let sender = if i % 2 == 0 { Sender::User } else { Sender::Ai };
                let mut msg = Message::new(id.clone(), sender, format!("m{i}"));
                msg.timestamp = base + Duration::seconds(i as i64);
                msg
            })
            .collect()
    }

    fn texts(turns: &[Turn]) -> Vec<&str> {
        turns.iter().map(|t| t.text.as_str()).collect()
    }

    #[test]
    fn maps_senders_to_model_roles() {
        let id = IdentityId::new();
        let window = conversation(&id, 4);
        let current = Message::user(id, "next");

        let ctx = ContextAssembler::default().assemble(&window, &current);
        let roles: Vec<_> = ctx.history.iter().map(|t| t.role).collect();
        assert_eq!(
            roles,
            vec![TurnRole::User, TurnRole::Model, TurnRole::User, TurnRole::Model]
        );
        assert_eq!(ctx.user_text, "next");
    }

    #[test]
    fn current_turn_in_window_is_sent_once() {
        let id = IdentityId::new();
        let mut window = conversation(&id, 4);
        let current = Message::user(id, "now");
        window.push(current.clone());

        let ctx = ContextAssembler::default().assemble(&window, &current);
        assert_eq!(texts(&ctx.history), vec!["m0", "m1", "m2", "m3"]);
        assert_eq!(ctx.user_text, "now");
        assert!(ctx.metadata.drops.contains(&DropInfo {
            items_dropped: 1,
            reason: DropReason::CurrentTurn,
        }));
    }

    #[test]
    fn current_turn_with_same_text_but_different_id_is_kept() {
        let id = IdentityId::new();
        let earlier = Message::user(id.clone(), "again");
        let current = Message::user(id, "again");

        let ctx = ContextAssembler::default().assemble(&[earlier], &current);
        assert_eq!(texts(&ctx.history), vec!["again"]);
    }

    #[test]
    fn history_plus_current_is_bounded() {
        let id = IdentityId::new();
        let mut window = conversation(&id, 31);
        let current = Message::user(id, "latest");
        window.push(current.clone());

        let ctx = ContextAssembler::new(20).assemble(&window, &current);
        assert_eq!(ctx.history.len() + 1, 20);
        assert_eq!(ctx.history.first().unwrap().text, "m12");
        assert_eq!(ctx.history.last().unwrap().text, "m30");
    }

    #[test]
    fn bound_can_expose_a_model_turn_at_the_head() {
        let id = IdentityId::new();
        let window = conversation(&id, 30);
        let current = Message::user(id, "latest");

        // Keeping m11..m29 would open with a model turn; it is dropped.
        let ctx = ContextAssembler::new(20).assemble(&window, &current);
        assert_eq!(ctx.history.len(), 18);
        assert_eq!(ctx.history.first().unwrap().role, TurnRole::User);
        assert_eq!(ctx.history.first().unwrap().text, "m12");
    }

    #[test]
    fn oldest_dropped_first() {
        let id = IdentityId::new();
        let window = conversation(&id, 10);
        let current = Message::user(id, "q");

        let ctx = ContextAssembler::new(5).assemble(&window, &current);
        // Room for four prior turns.
        assert_eq!(texts(&ctx.history), vec!["m6", "m7", "m8", "m9"]);
        assert_eq!(
            ctx.metadata.drops,
            vec![DropInfo {
                items_dropped: 6,
                reason: DropReason::OutsideWindow,
            }]
        );
    }

    #[test]
    fn leading_model_turns_dropped() {
        let id = IdentityId::new();
        let window = vec![
            Message::ai(id.clone(), "greeting"),
            Message::ai(id.clone(), "still me"),
            Message::user(id.clone(), "hello"),
            Message::ai(id.clone(), "hi"),
        ];
        let current = Message::user(id, "how are you");

        let ctx = ContextAssembler::default().assemble(&window, &current);
        assert_eq!(texts(&ctx.history), vec!["hello", "hi"]);
        assert_eq!(ctx.metadata.history_included, 2);
    }

    #[test]
    fn empty_window_gives_empty_history() {
        let id = IdentityId::new();
        let current = Message::user(id, "first ever");

        let ctx = ContextAssembler::default().assemble(&[], &current);
        assert!(ctx.history.is_empty());
        assert!(ctx.metadata.drops.is_empty());
        assert_eq!(ctx.user_text, "first ever");
    }

    #[test]
    fn bound_of_one_sends_only_current() {
        let id = IdentityId::new();
        let window = conversation(&id, 6);
        let current = Message::user(id, "solo");

        let ctx = ContextAssembler::new(0).assemble(&window, &current);
        assert_eq!(ContextAssembler::new(0).max_messages(), 1);
        assert!(ctx.history.is_empty());
    }

    #[test]
    fn assembly_is_idempotent() {
        let id = IdentityId::new();
        let mut window = conversation(&id, 25);
        let current = Message::user(id, "same input");
        window.push(current.clone());

        let asm = ContextAssembler::default();
        let first = asm.assemble(&window, &current);
        let second = asm.assemble(&window, &current);
        assert_eq!(first, second);
    }
}
