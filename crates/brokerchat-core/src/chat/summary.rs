//! Session list derivation.
//!
//! Sessions are not stored; the list is computed from the turn log by keeping
//! the most recent turn of each session.

use std::collections::HashMap;

use brokerchat_types::turn::{ConversationTurn, SessionSummary};
use uuid::Uuid;

/// Group turns by session, keep each session's latest turn, newest first.
///
/// Ties on `created_at` within a session go to the turn that appears later in
/// `turns`, which matches storage insertion order.
pub fn derive_summaries(turns: &[ConversationTurn]) -> Vec<SessionSummary> {
    let mut latest: HashMap<Uuid, &ConversationTurn> = HashMap::new();

    for turn in turns {
        latest
            .entry(turn.session_id)
            .and_modify(|current| {
                if turn.created_at >= current.created_at {
                    *current = turn;
                }
            })
            .or_insert(turn);
    }

    let mut summaries: Vec<SessionSummary> = latest
        .into_values()
        .map(|turn| SessionSummary {
            session_id: turn.session_id,
            last_message_at: turn.created_at,
            preview_message: turn.message.clone(),
        })
        .collect();
    sort_summaries(&mut summaries);
    summaries
}

/// Replace (or add) the summary for `summary.session_id` and keep the list
/// sorted newest first.
pub fn upsert_summary(summaries: &mut Vec<SessionSummary>, summary: SessionSummary) {
    summaries.retain(|s| s.session_id != summary.session_id);
    summaries.push(summary);
    sort_summaries(summaries);
}

fn sort_summaries(summaries: &mut [SessionSummary]) {
    // Stable on equal timestamps so repeated derivations don't reshuffle rows.
    summaries.sort_by(|a, b| {
        b.last_message_at
            .cmp(&a.last_message_at)
            .then_with(|| a.session_id.cmp(&b.session_id))
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use brokerchat_types::turn::Sender;
    use chrono::{Duration, TimeZone, Utc};

    fn turn_at(session_id: Uuid, minutes: i64, message: &str) -> ConversationTurn {
        ConversationTurn {
            id: Uuid::now_v7(),
            user_id: Uuid::nil(),
            session_id,
            sender: Sender::User,
            message: message.to_string(),
            created_at: Utc.with_ymd_and_hms(2026, 3, 1, 9, 0, 0).unwrap()
                + Duration::minutes(minutes),
        }
    }

    #[test]
    fn test_empty_log_has_no_sessions() {
        assert!(derive_summaries(&[]).is_empty());
    }

    #[test]
    fn test_one_summary_per_session_with_latest_turn() {
        let a = Uuid::now_v7();
        let b = Uuid::now_v7();
        let turns = vec![
            turn_at(a, 0, "a first"),
            turn_at(b, 1, "b first"),
            turn_at(a, 5, "a latest"),
            turn_at(b, 2, "b latest"),
            turn_at(a, 3, "a middle"),
        ];

        let summaries = derive_summaries(&turns);
        assert_eq!(summaries.len(), 2);
        assert_eq!(summaries[0].session_id, a);
        assert_eq!(summaries[0].preview_message, "a latest");
        assert_eq!(summaries[1].session_id, b);
        assert_eq!(summaries[1].preview_message, "b latest");
    }

    #[test]
    fn test_sorted_descending_by_last_message() {
        let sessions: Vec<Uuid> = (0..4).map(|_| Uuid::now_v7()).collect();
        let turns: Vec<_> = sessions
            .iter()
            .enumerate()
            .map(|(i, id)| turn_at(*id, i as i64 * 10, "x"))
            .collect();

        let summaries = derive_summaries(&turns);
        let order: Vec<Uuid> = summaries.iter().map(|s| s.session_id).collect();
        let expected: Vec<Uuid> = sessions.into_iter().rev().collect();
        assert_eq!(order, expected);
        assert!(summaries
            .windows(2)
            .all(|w| w[0].last_message_at >= w[1].last_message_at));
    }

    #[test]
    fn test_equal_timestamps_prefer_later_row() {
        let a = Uuid::now_v7();
        let turns = vec![turn_at(a, 1, "user said"), turn_at(a, 1, "ai replied")];
        let summaries = derive_summaries(&turns);
        assert_eq!(summaries[0].preview_message, "ai replied");
    }

    #[test]
    fn test_upsert_moves_session_to_top() {
        let a = Uuid::now_v7();
        let b = Uuid::now_v7();
        let mut summaries = derive_summaries(&[turn_at(a, 0, "old a"), turn_at(b, 5, "b")]);
        assert_eq!(summaries[0].session_id, b);

        let later = summaries[0].last_message_at + Duration::minutes(1);
        upsert_summary(
            &mut summaries,
            SessionSummary {
                session_id: a,
                last_message_at: later,
                preview_message: "new a".to_string(),
            },
        );

        assert_eq!(summaries.len(), 2);
        assert_eq!(summaries[0].session_id, a);
        assert_eq!(summaries[0].preview_message, "new a");
    }

    #[test]
    fn test_upsert_adds_new_session() {
        let mut summaries = Vec::new();
        let id = Uuid::now_v7();
        upsert_summary(
            &mut summaries,
            SessionSummary {
                session_id: id,
                last_message_at: Utc::now(),
                preview_message: "FHA rates are...".to_string(),
            },
        );
        assert_eq!(summaries.len(), 1);
        assert_eq!(summaries[0].session_id, id);
    }
}
