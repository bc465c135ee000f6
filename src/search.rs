use tracing::debug;

use crate::error::ApiError;
use crate::models::Paper;

pub const MAX_QUERY_CHARS: usize = 200;
pub const MIN_LIMIT: u32 = 1;
pub const MAX_LIMIT: u32 = 50;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchTicket {
    pub id: u64,
    pub query: String,
    pub limit: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchRejected {
    EmptyQuery,
    QueryTooLong,
    Busy,
}

#[derive(Debug)]
pub enum SearchOutcome {
    Found(Vec<Paper>),
    Empty,
    Failed(ApiError),
}

impl From<Result<Vec<Paper>, ApiError>> for SearchOutcome {
    fn from(result: Result<Vec<Paper>, ApiError>) -> Self {
        match result {
            Ok(papers) if papers.is_empty() => SearchOutcome::Empty,
            Ok(papers) => SearchOutcome::Found(papers),
            Err(e) => SearchOutcome::Failed(e),
        }
    }
}

pub fn clamp_limit(limit: u32) -> u32 {
    limit.clamp(MIN_LIMIT, MAX_LIMIT)
}

/// Admits one outstanding search at a time.
#[derive(Debug, Default)]
pub struct SearchController {
    in_flight: Option<u64>,
    next_id: u64,
}

impl SearchController {
    pub fn begin(&mut self, query: &str, limit: u32) -> Result<SearchTicket, SearchRejected> {
        let query = query.trim();
        if query.is_empty() {
            return Err(SearchRejected::EmptyQuery);
        }
        if query.chars().count() > MAX_QUERY_CHARS {
            return Err(SearchRejected::QueryTooLong);
        }
        if self.in_flight.is_some() {
            return Err(SearchRejected::Busy);
        }

        self.next_id += 1;
        self.in_flight = Some(self.next_id);
        debug!("search #{} started for {:?}", self.next_id, query);

        Ok(SearchTicket {
            id: self.next_id,
            query: query.to_string(),
            limit: clamp_limit(limit),
        })
    }

    /// Releases the busy state. Returns false for a ticket that is not the
    /// outstanding one.
    pub fn finish(&mut self, ticket: &SearchTicket) -> bool {
        if self.in_flight == Some(ticket.id) {
            self.in_flight = None;
            true
        } else {
            false
        }
    }

    pub fn is_busy(&self) -> bool {
        self.in_flight.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::fixtures::paper;

    #[test]
    fn test_blank_query_is_rejected_without_ticket() {
        let mut search = SearchController::default();
        assert_eq!(search.begin("   \t", 10), Err(SearchRejected::EmptyQuery));
        assert!(!search.is_busy());
    }

    #[test]
    fn test_overlong_query_is_rejected() {
        let mut search = SearchController::default();
        let query = "q".repeat(MAX_QUERY_CHARS + 1);
        assert_eq!(search.begin(&query, 10), Err(SearchRejected::QueryTooLong));
    }

    #[test]
    fn test_second_search_while_busy_is_rejected() {
        let mut search = SearchController::default();
        let ticket = search.begin(" transformers ", 10).unwrap();
        assert_eq!(ticket.query, "transformers");
        assert_eq!(search.begin("other", 10), Err(SearchRejected::Busy));

        assert!(search.finish(&ticket));
        assert!(!search.is_busy());
        assert!(search.begin("other", 10).is_ok());
    }

    #[test]
    fn test_limit_is_clamped() {
        let mut search = SearchController::default();
        assert_eq!(search.begin("a", 0).unwrap().limit, MIN_LIMIT);
        search.in_flight = None;
        assert_eq!(search.begin("a", 500).unwrap().limit, MAX_LIMIT);
    }

    #[test]
    fn test_outcome_classification() {
        assert!(matches!(SearchOutcome::from(Ok::<Vec<Paper>, ApiError>(vec![])), SearchOutcome::Empty));
        assert!(matches!(
            SearchOutcome::from(Ok::<_, ApiError>(vec![paper("1", "t")])),
            SearchOutcome::Found(ref p) if p.len() == 1
        ));
        assert!(matches!(
            SearchOutcome::from(Err::<Vec<Paper>, _>(ApiError::Status { status: 500, body: String::new() })),
            SearchOutcome::Failed(_)
        ));
    }
}
