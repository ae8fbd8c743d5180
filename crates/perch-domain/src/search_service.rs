use std::sync::Arc;

use tracing::debug;

use crate::error::{DomainError, DomainResult};
use crate::repository::SearchRepository;
use crate::search::{SearchHit, SearchRequest};
use crate::user::Principal;

/// Domain service for cross-entity ranked search
pub struct SearchService {
    repository: Arc<dyn SearchRepository>,
}

impl SearchService {
    pub fn new(repository: Arc<dyn SearchRepository>) -> Self {
        Self { repository }
    }

    /// Run a free-text search across organizations, applications, devices
    /// and gateways visible to the principal, ranked by similarity score.
    pub async fn search(
        &self,
        principal: &Principal,
        request: SearchRequest,
    ) -> DomainResult<Vec<SearchHit>> {
        if request.limit < 0 {
            return Err(DomainError::InvalidArgument(format!(
                "limit must be non-negative, got {}",
                request.limit
            )));
        }
        if request.offset < 0 {
            return Err(DomainError::InvalidArgument(format!(
                "offset must be non-negative, got {}",
                request.offset
            )));
        }

        debug!(
            username = %principal.username,
            is_admin = principal.is_admin,
            query = %request.query,
            limit = request.limit,
            offset = request.offset,
            "Running global search"
        );

        let hits = self
            .repository
            .global_search(principal, &request.query, request.limit, request.offset)
            .await?;

        debug!(count = hits.len(), "Global search finished");
        Ok(hits)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::MockSearchRepository;
    use crate::search::EntityKind;

    fn request(query: &str, limit: i64, offset: i64) -> SearchRequest {
        SearchRequest {
            query: query.to_string(),
            limit,
            offset,
        }
    }

    #[tokio::test]
    async fn test_search_delegates_to_repository() {
        let mut mock_repo = MockSearchRepository::new();
        mock_repo
            .expect_global_search()
            .withf(|principal, query, limit, offset| {
                principal.username == "alice" && query == "weather" && *limit == 10 && *offset == 0
            })
            .times(1)
            .return_once(|_, _, _, _| {
                Ok(vec![SearchHit::Application {
                    score: 0.6,
                    organization_id: 1,
                    organization_name: "org-a".to_string(),
                    application_id: 5,
                    application_name: "weather-app".to_string(),
                }])
            });

        let service = SearchService::new(Arc::new(mock_repo));
        let principal = Principal::new("alice", false);

        let hits = service
            .search(&principal, request("weather", 10, 0))
            .await
            .unwrap();

        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].kind(), EntityKind::Application);
        assert!(hits[0].score() > 0.0);
    }

    #[tokio::test]
    async fn test_search_rejects_negative_limit() {
        // Repository must never be consulted when arguments are invalid.
        let mock_repo = MockSearchRepository::new();
        let service = SearchService::new(Arc::new(mock_repo));
        let principal = Principal::new("alice", false);

        let result = service.search(&principal, request("q", -1, 0)).await;
        assert!(matches!(result, Err(DomainError::InvalidArgument(_))));
    }

    #[tokio::test]
    async fn test_search_rejects_negative_offset() {
        let mock_repo = MockSearchRepository::new();
        let service = SearchService::new(Arc::new(mock_repo));
        let principal = Principal::new("alice", false);

        let result = service.search(&principal, request("q", 10, -5)).await;
        assert!(matches!(result, Err(DomainError::InvalidArgument(_))));
    }

    #[tokio::test]
    async fn test_search_preserves_error_kind() {
        let mut mock_repo = MockSearchRepository::new();
        mock_repo
            .expect_global_search()
            .times(1)
            .return_once(|_, _, _, _| Err(DomainError::Cancelled));

        let service = SearchService::new(Arc::new(mock_repo));
        let principal = Principal::new("alice", false);

        let result = service.search(&principal, request("q", 10, 0)).await;
        assert!(matches!(result, Err(DomainError::Cancelled)));
    }
}
