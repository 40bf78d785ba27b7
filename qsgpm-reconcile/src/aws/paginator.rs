//! Token-based pagination over the listing operations of [`QuickSightApi`].

use async_trait::async_trait;

use super::{
    ListGroupMembershipsRequest, ListGroupsRequest, ListUsersRequest, Page, QuickSightApi,
};
use crate::error::{QsgpmError, QsgpmResult};
use crate::types::User;

/// A listing request that can be re-issued with a continuation token.
#[async_trait]
pub trait PagedRequest: Clone + Send + Sync {
    type Item: Send;

    fn with_next_token(&self, next_token: Option<String>) -> Self;

    async fn fetch(&self, client: &dyn QuickSightApi) -> QsgpmResult<Page<Self::Item>>;
}

#[async_trait]
impl PagedRequest for ListUsersRequest {
    type Item = User;

    fn with_next_token(&self, next_token: Option<String>) -> Self {
        Self {
            next_token,
            ..self.clone()
        }
    }

    async fn fetch(&self, client: &dyn QuickSightApi) -> QsgpmResult<Page<User>> {
        client.list_users(self).await
    }
}

#[async_trait]
impl PagedRequest for ListGroupsRequest {
    type Item = String;

    fn with_next_token(&self, next_token: Option<String>) -> Self {
        Self {
            next_token,
            ..self.clone()
        }
    }

    async fn fetch(&self, client: &dyn QuickSightApi) -> QsgpmResult<Page<String>> {
        client.list_groups(self).await
    }
}

#[async_trait]
impl PagedRequest for ListGroupMembershipsRequest {
    type Item = String;

    fn with_next_token(&self, next_token: Option<String>) -> Self {
        Self {
            next_token,
            ..self.clone()
        }
    }

    async fn fetch(&self, client: &dyn QuickSightApi) -> QsgpmResult<Page<String>> {
        client.list_group_memberships(self).await
    }
}

/// Continuation state shared by every paginator.
#[derive(Debug, Clone)]
struct PageCursor {
    next_token: Option<String>,
    first_page: bool,
}

impl PageCursor {
    fn new(next_token: Option<String>) -> Self {
        Self {
            next_token,
            first_page: true,
        }
    }

    fn has_more_pages(&self) -> bool {
        self.first_page || self.next_token.as_deref().is_some_and(|token| !token.is_empty())
    }

    /// Record the token returned with a page. A token equal to the previous one
    /// ends iteration instead of looping forever.
    fn advance(&mut self, next_token: Option<String>) {
        let previous = self.next_token.take();
        self.first_page = false;
        self.next_token = match (previous, next_token) {
            (Some(previous), Some(next)) if previous == next => None,
            (_, next) => next,
        };
    }
}

/// Lazily fetches successive pages of a listing.
pub struct Paginator<'a, R> {
    client: &'a dyn QuickSightApi,
    request: R,
    cursor: PageCursor,
}

pub type UsersPaginator<'a> = Paginator<'a, ListUsersRequest>;
pub type GroupsPaginator<'a> = Paginator<'a, ListGroupsRequest>;
pub type GroupMembershipsPaginator<'a> = Paginator<'a, ListGroupMembershipsRequest>;

impl<'a, R: PagedRequest> Paginator<'a, R> {
    pub fn new(client: &'a dyn QuickSightApi, request: R) -> Self {
        Self {
            client,
            cursor: PageCursor::new(None),
            request,
        }
    }

    pub fn has_more_pages(&self) -> bool {
        self.cursor.has_more_pages()
    }

    /// Fetch the next page. Fails with [`QsgpmError::NoMorePages`] once exhausted.
    pub async fn next_page(&mut self) -> QsgpmResult<Vec<R::Item>> {
        if !self.has_more_pages() {
            return Err(QsgpmError::NoMorePages);
        }
        let request = self.request.with_next_token(self.cursor.next_token.clone());
        let page = request.fetch(self.client).await?;
        self.cursor.advance(page.next_token);
        Ok(page.items)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cursor_first_page_always_available() {
        let cursor = PageCursor::new(None);
        assert!(cursor.has_more_pages());
    }

    #[test]
    fn test_cursor_follows_tokens_until_exhausted() {
        let mut cursor = PageCursor::new(None);
        cursor.advance(Some("t1".to_string()));
        assert!(cursor.has_more_pages());
        cursor.advance(None);
        assert!(!cursor.has_more_pages());
    }

    #[test]
    fn test_cursor_empty_token_ends_iteration() {
        let mut cursor = PageCursor::new(None);
        cursor.advance(Some(String::new()));
        assert!(!cursor.has_more_pages());
    }

    #[test]
    fn test_cursor_duplicate_token_ends_iteration() {
        let mut cursor = PageCursor::new(None);
        cursor.advance(Some("t1".to_string()));
        cursor.advance(Some("t1".to_string()));
        assert!(!cursor.has_more_pages());
    }
}
