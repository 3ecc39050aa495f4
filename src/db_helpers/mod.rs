mod favorite_helpers;
mod ingest_helpers;
mod truck_helpers;
mod user_helpers;

pub use favorite_helpers::*;
pub use ingest_helpers::*;
pub use truck_helpers::*;
pub use user_helpers::*;

/// Appends SQL fragments behind a separator and keeps their bound values in
/// placeholder order. Fragments only ever contain `?` placeholders.
struct QueryBuilder {
    query: String,
    params: Vec<String>,
    separator: &'static str,
}

impl QueryBuilder {
    fn new(initial: &str, separator: &'static str) -> Self {
        Self {
            query: initial.to_owned(),
            params: vec![],
            separator,
        }
    }

    fn add_clause(mut self, clause: &str, params: Vec<String>) -> Self {
        debug_assert_eq!(clause.matches('?').count(), params.len());
        self.query.push_str(self.separator);
        self.query.push_str(clause);
        self.params.extend(params);
        self
    }

    fn build(self) -> (String, Vec<String>) {
        (self.query, self.params)
    }
}

fn is_unique_violation(error: &sqlx::Error) -> bool {
    matches!(error, sqlx::Error::Database(e) if e.is_unique_violation())
}

fn is_foreign_key_violation(error: &sqlx::Error) -> bool {
    matches!(error, sqlx::Error::Database(e) if e.is_foreign_key_violation())
}
