//! Recency buckets for the conversation sidebar

use chrono::{DateTime, Duration, Local, Months};
use strum::{EnumIter, IntoEnumIterator};

use crate::backend::ConversationSummary;

/// Placeholder shown when there is nothing to group
pub const EMPTY_HISTORY: &str = "No conversations yet";

/// Fixed recency categories, in presentation order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter)]
pub enum TimeBucket {
    Today,
    Yesterday,
    LastWeek,
    LastMonth,
    Older,
}

impl TimeBucket {
    pub fn label(self) -> &'static str {
        match self {
            TimeBucket::Today => "Today",
            TimeBucket::Yesterday => "Yesterday",
            TimeBucket::LastWeek => "Last 7 Days",
            TimeBucket::LastMonth => "Last Month",
            TimeBucket::Older => "Older",
        }
    }

    /// Bucket for a conversation last touched at `updated`, relative to `now`.
    ///
    /// Today and Yesterday compare calendar days; the week and month windows are
    /// elapsed-time thresholds that include their boundary.
    pub fn classify(updated: DateTime<Local>, now: DateTime<Local>) -> TimeBucket {
        let today = now.date_naive();
        let day = updated.date_naive();

        if day == today {
            return TimeBucket::Today;
        }
        if today.pred_opt() == Some(day) {
            return TimeBucket::Yesterday;
        }
        if updated >= now - Duration::days(7) {
            return TimeBucket::LastWeek;
        }
        let month_ago = now.checked_sub_months(Months::new(1)).unwrap_or(now - Duration::days(30));
        if updated >= month_ago {
            TimeBucket::LastMonth
        } else {
            TimeBucket::Older
        }
    }
}

/// A non-empty sidebar section
#[derive(Debug, Clone)]
pub struct HistoryGroup<'a> {
    pub bucket: TimeBucket,
    pub conversations: Vec<&'a ConversationSummary>,
}

/// Group conversations into non-empty buckets, newest first within each.
///
/// Conversations without a usable `last_updated` land in Older.
pub fn group_conversations(
    conversations: &[ConversationSummary],
    now: DateTime<Local>,
) -> Vec<HistoryGroup<'_>> {
    let mut groups: Vec<HistoryGroup<'_>> = TimeBucket::iter()
        .map(|bucket| HistoryGroup {
            bucket,
            conversations: Vec::new(),
        })
        .collect();

    for conversation in conversations {
        let bucket = conversation
            .last_updated
            .map(|updated| TimeBucket::classify(updated, now))
            .unwrap_or(TimeBucket::Older);
        if let Some(group) = groups.iter_mut().find(|group| group.bucket == bucket) {
            group.conversations.push(conversation);
        }
    }

    for group in &mut groups {
        group
            .conversations
            .sort_by(|a, b| b.last_updated.cmp(&a.last_updated));
    }

    groups.retain(|group| !group.conversations.is_empty());
    groups
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn summary(id: &str, updated: Option<DateTime<Local>>) -> ConversationSummary {
        ConversationSummary {
            conversation_id: id.to_string(),
            last_message: format!("about {id}"),
            last_updated: updated,
            message_count: 1,
        }
    }

    fn noon() -> DateTime<Local> {
        Local
            .with_ymd_and_hms(2024, 6, 20, 12, 0, 0)
            .earliest()
            .expect("fixture should exist")
    }

    #[test]
    fn classifies_each_window() {
        let now = noon();
        assert_eq!(TimeBucket::classify(now, now), TimeBucket::Today);
        assert_eq!(TimeBucket::classify(now - Duration::days(1), now), TimeBucket::Yesterday);
        assert_eq!(TimeBucket::classify(now - Duration::days(3), now), TimeBucket::LastWeek);
        assert_eq!(TimeBucket::classify(now - Duration::days(10), now), TimeBucket::LastMonth);
        assert_eq!(TimeBucket::classify(now - Duration::days(40), now), TimeBucket::Older);
    }

    #[test]
    fn window_boundaries_are_inclusive() {
        let now = noon();
        assert_eq!(TimeBucket::classify(now - Duration::days(7), now), TimeBucket::LastWeek);
        let month_ago = now
            .checked_sub_months(Months::new(1))
            .expect("fixture should exist");
        assert_eq!(TimeBucket::classify(month_ago, now), TimeBucket::LastMonth);
        assert_eq!(
            TimeBucket::classify(month_ago - Duration::seconds(1), now),
            TimeBucket::Older
        );
    }

    #[test]
    fn yesterday_is_a_calendar_day_not_24_hours() {
        let now = Local
            .with_ymd_and_hms(2024, 6, 20, 0, 30, 0)
            .earliest()
            .expect("fixture should exist");
        let late_last_night = now - Duration::hours(1);
        assert_eq!(TimeBucket::classify(late_last_night, now), TimeBucket::Yesterday);
        let early_today = now - Duration::minutes(20);
        assert_eq!(TimeBucket::classify(early_today, now), TimeBucket::Today);
    }

    #[test]
    fn groups_in_fixed_order_and_sorts_newest_first() {
        let now = noon();
        let conversations = vec![
            summary("old", Some(now - Duration::days(90))),
            summary("morning", Some(now - Duration::hours(3))),
            summary("just-now", Some(now)),
            summary("undated", None),
            summary("last-week", Some(now - Duration::days(5))),
        ];

        let groups = group_conversations(&conversations, now);
        let buckets: Vec<_> = groups.iter().map(|group| group.bucket).collect();
        assert_eq!(buckets, vec![TimeBucket::Today, TimeBucket::LastWeek, TimeBucket::Older]);

        let today: Vec<_> = groups[0]
            .conversations
            .iter()
            .map(|c| c.conversation_id.as_str())
            .collect();
        assert_eq!(today, vec!["just-now", "morning"]);

        let older: Vec<_> = groups[2]
            .conversations
            .iter()
            .map(|c| c.conversation_id.as_str())
            .collect();
        assert_eq!(older, vec!["old", "undated"]);
    }

    #[test]
    fn empty_input_has_no_groups() {
        assert!(group_conversations(&[], noon()).is_empty());
    }

    #[test]
    fn labels_match_sidebar_headers() {
        let labels: Vec<_> = TimeBucket::iter().map(TimeBucket::label).collect();
        assert_eq!(labels, vec!["Today", "Yesterday", "Last 7 Days", "Last Month", "Older"]);
    }
}
