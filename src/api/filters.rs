//! Query-string filters for the message listing.

use chrono::{Days, NaiveDate, NaiveTime, TimeZone, Utc};
use serde::Deserialize;
use sqlx::{QueryBuilder, Sqlite};
use uuid::Uuid;

/// `?conversation_id=&sender=&created_at_after=YYYY-MM-DD&created_at_before=YYYY-MM-DD`
///
/// Both date bounds are inclusive and compared against `sent_at` in UTC.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct MessageFilter {
    pub conversation_id: Option<Uuid>,
    pub sender: Option<Uuid>,
    pub created_at_after: Option<NaiveDate>,
    pub created_at_before: Option<NaiveDate>,
}

impl MessageFilter {
    /// Append one `AND` condition per field that is set.
    pub fn apply(&self, qb: &mut QueryBuilder<'_, Sqlite>) {
        if let Some(conversation_id) = self.conversation_id {
            qb.push(" AND conversation_id = ").push_bind(conversation_id);
        }
        if let Some(sender) = self.sender {
            qb.push(" AND sender_id = ").push_bind(sender);
        }
        if let Some(after) = self.created_at_after {
            let from = Utc.from_utc_datetime(&after.and_time(NaiveTime::MIN));
            qb.push(" AND sent_at >= ").push_bind(from);
        }
        if let Some(before) = self.created_at_before {
            // Upper bound is the start of the following day, exclusive.
            if let Some(next_day) = before.checked_add_days(Days::new(1)) {
                let until = Utc.from_utc_datetime(&next_day.and_time(NaiveTime::MIN));
                qb.push(" AND sent_at < ").push_bind(until);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_set_fields_add_conditions() {
        let mut qb = QueryBuilder::<Sqlite>::new("SELECT * FROM messages WHERE 1 = 1");
        MessageFilter::default().apply(&mut qb);
        assert_eq!(qb.sql(), "SELECT * FROM messages WHERE 1 = 1");

        let filter = MessageFilter {
            conversation_id: Some(Uuid::new_v4()),
            sender: Some(Uuid::new_v4()),
            created_at_after: NaiveDate::from_ymd_opt(2024, 5, 1),
            created_at_before: NaiveDate::from_ymd_opt(2024, 5, 31),
        };
        let mut qb = QueryBuilder::<Sqlite>::new("SELECT * FROM messages WHERE 1 = 1");
        filter.apply(&mut qb);
        assert_eq!(
            qb.sql(),
            "SELECT * FROM messages WHERE 1 = 1 AND conversation_id = ? AND sender_id = ? \
             AND sent_at >= ? AND sent_at < ?"
        );
    }

    #[test]
    fn test_parses_query_string() {
        let id = Uuid::new_v4();
        let query = format!("sender={id}&created_at_after=2024-01-02");
        let filter: MessageFilter = from_query(&query);
        assert_eq!(filter.sender, Some(id));
        assert_eq!(filter.created_at_after, NaiveDate::from_ymd_opt(2024, 1, 2));
        assert_eq!(filter.conversation_id, None);
    }

    fn from_query(query: &str) -> MessageFilter {
        use axum::extract::Query;
        use axum::http::Uri;

        let uri: Uri = format!("/api/messages?{query}").parse().unwrap();
        Query::<MessageFilter>::try_from_uri(&uri).unwrap().0
    }
}
