//! Pull-based pagination over tile listings

use crate::client::CatalogClient;
use crate::error::{Error, Result};
use crate::models::Tile;
use futures::Stream;
use std::collections::VecDeque;
use std::time::Duration;

#[derive(Debug)]
enum PagerState {
    /// Nothing fetched yet; holds the listing URL
    Idle(String),
    /// Holds the `links.next` URL of the last page
    HasCursor(String),
    /// Reported once the buffered tiles are drained
    Failed(Error),
    Done,
}

/// Lazy sequence of the tiles of one collection.
///
/// Pages are fetched only when [`TilePager::next`] runs out of buffered
/// tiles, so dropping the pager early skips the remaining pages. A failed
/// fetch is yielded once as `Some(Err(_))`, after which the pager is done.
/// The sequence cannot be restarted.
pub struct TilePager<'a> {
    client: &'a CatalogClient,
    state: PagerState,
    buffered: VecDeque<Tile>,
    page_delay: Duration,
    pages_fetched: usize,
}

impl<'a> TilePager<'a> {
    pub(crate) fn new(client: &'a CatalogClient, url: String, page_delay: Duration) -> Self {
        Self {
            client,
            state: PagerState::Idle(url),
            buffered: VecDeque::new(),
            page_delay,
            pages_fetched: 0,
        }
    }

    /// Next tile, `None` once every page has been consumed
    pub async fn next(&mut self) -> Option<Result<Tile>> {
        loop {
            if let Some(tile) = self.buffered.pop_front() {
                return Some(Ok(tile));
            }

            // Done until the fetch below succeeds, so errors and dropped futures end the sequence
            let url = match std::mem::replace(&mut self.state, PagerState::Done) {
                PagerState::Done => return None,
                PagerState::Failed(e) => return Some(Err(e)),
                PagerState::Idle(url) => url,
                PagerState::HasCursor(url) => {
                    if !self.page_delay.is_zero() {
                        tokio::time::sleep(self.page_delay).await;
                    }
                    url
                }
            };

            tracing::debug!(%url, page = self.pages_fetched + 1, "fetching tile page");
            let page = match self.client.fetch_page(&url).await {
                Ok(page) => page,
                Err(e) => return Some(Err(e)),
            };

            self.pages_fetched += 1;
            self.buffered.extend(page.items);
            match page.next_cursor {
                Some(next) if next == url => {
                    tracing::warn!(%url, "tile page links to itself, stopping");
                    self.state = PagerState::Failed(Error::Upstream {
                        status: 200,
                        body: format!("links.next of {} points back to the same page", url),
                    });
                }
                Some(next) => self.state = PagerState::HasCursor(next),
                None => {}
            }
        }
    }

    /// Number of page requests issued so far
    pub fn pages_fetched(&self) -> usize {
        self.pages_fetched
    }

    /// True once the last page has been fetched and drained, or after an error
    /// has been yielded
    pub fn is_done(&self) -> bool {
        matches!(self.state, PagerState::Done) && self.buffered.is_empty()
    }

    /// Drain the remaining tiles, stopping at the first error
    pub async fn collect_all(mut self) -> Result<Vec<Tile>> {
        let mut tiles = Vec::new();
        while let Some(tile) = self.next().await {
            tiles.push(tile?);
        }
        Ok(tiles)
    }

    /// Adapt into a [`Stream`] driven by [`TilePager::next`]
    pub fn into_stream(self) -> impl Stream<Item = Result<Tile>> + 'a {
        futures::stream::unfold(self, |mut pager| async move {
            pager.next().await.map(|item| (item, pager))
        })
    }
}
