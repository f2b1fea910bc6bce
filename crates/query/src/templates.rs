//! Query text templates.

use chatlog_core::{date_string, PartitionKey};
use chrono::NaiveDate;
use std::collections::BTreeSet;

/// Quotes a value as a SQL string literal.
fn quote(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

/// Joins a table root and a partition prefix into a location URI with a
/// trailing slash.
pub fn partition_location(table_location: &str, key: &PartitionKey) -> String {
    format!("{}/{}/", table_location.trim_end_matches('/'), key.prefix())
}

/// Renders one `ALTER TABLE ... ADD IF NOT EXISTS` statement registering every
/// key. Duplicate keys are rendered once. Returns `None` when there is
/// nothing to register.
pub fn partition_statement<'a, I>(
    database: &str,
    table: &str,
    keys: I,
    table_location: Option<&str>,
) -> Option<String>
where
    I: IntoIterator<Item = &'a PartitionKey>,
{
    let keys: BTreeSet<&PartitionKey> = keys.into_iter().collect();
    if keys.is_empty() {
        return None;
    }

    let partitions: Vec<String> = keys
        .iter()
        .map(|key| {
            let mut clause = format!(
                "PARTITION (channel = {}, date_string = {})",
                quote(&key.channel),
                quote(&key.date_string())
            );
            if let Some(root) = table_location {
                clause.push_str(&format!(
                    " LOCATION {}",
                    quote(&partition_location(root, key))
                ));
            }
            clause
        })
        .collect();

    Some(format!(
        "ALTER TABLE {}.{} ADD IF NOT EXISTS {};",
        database,
        table,
        partitions.join(" ")
    ))
}

/// Parameters of a top chatters query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopChattersQuery<'a> {
    pub database: &'a str,
    pub table: &'a str,
    pub start: NaiveDate,
    pub end: NaiveDate,
    /// Restricts to one channel; all channels when `None`.
    pub channel: Option<&'a str>,
    pub limit: u32,
}

impl TopChattersQuery<'_> {
    /// Renders the aggregation. Result rows are `(message_count, username)`.
    pub fn render(&self) -> String {
        let channel_filter = self
            .channel
            .map(|c| format!(" AND channel = {}", quote(c)))
            .unwrap_or_default();

        format!(
            "SELECT count(*) AS message_count, username FROM {}.{} \
             WHERE date_string BETWEEN {} AND {}{} \
             GROUP BY username ORDER BY message_count DESC LIMIT {}",
            self.database,
            self.table,
            quote(&date_string(self.start)),
            quote(&date_string(self.end)),
            channel_filter,
            self.limit
        )
    }
}
