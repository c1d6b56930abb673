//! Pagination bookkeeping for browsing a catalog.
//!
//! The browser UI keeps the same fields in one state object it passes
//! through its update functions; `dramashort list` drives this type the same
//! way: fetch at [`BrowseState::request`], fold the page in with
//! [`BrowseState::apply`], repeat while [`BrowseState::has_more`].

use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::errors::AppError;

use super::{CatalogPage, CatalogSource, Pagination};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ViewMode {
    #[default]
    Grid,
    List,
}

impl FromStr for ViewMode {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "grid" => Ok(Self::Grid),
            "list" => Ok(Self::List),
            other => Err(AppError::validation(format!(
                "view must be 'grid' or 'list', got '{other}'"
            ))),
        }
    }
}

/// Where to fetch the next page from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub source: CatalogSource,
    pub offset: u64,
    pub page: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BrowseState {
    pub source: CatalogSource,
    pub offset: u64,
    /// 1-based, only meaningful for page-numbered sources
    pub page: u32,
    pub has_more: bool,
    pub view: ViewMode,
    /// Cards received so far for this source
    pub loaded: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl BrowseState {
    pub fn new(source: CatalogSource) -> Self {
        Self {
            source,
            offset: 0,
            page: 1,
            has_more: true,
            view: ViewMode::default(),
            loaded: 0,
            error: None,
        }
    }

    pub fn with_view(mut self, view: ViewMode) -> Self {
        self.view = view;
        self
    }

    /// Start over on another source, keeping the view preference
    pub fn switch_source(self, source: CatalogSource) -> Self {
        Self::new(source).with_view(self.view)
    }

    pub fn is_first_page(&self) -> bool {
        self.offset == 0 && self.page == 1
    }

    pub fn request(&self) -> PageRequest {
        PageRequest {
            source: self.source,
            offset: self.offset,
            page: self.page,
        }
    }

    /// Fold a fetched page into the state.
    ///
    /// Offset sources advance by the number of cards received and keep going
    /// while upstream says so or the page came back full. Numbered sources
    /// trust `has_more` and `next_page`. A failed or empty page ends paging.
    pub fn apply(mut self, page: &CatalogPage, items_per_page: u32) -> Self {
        if !page.is_ok() {
            let message = page
                .error
                .clone()
                .unwrap_or_else(|| format!("Invalid response from {}", self.source));
            return self.fail(message);
        }
        let received = page.data.len();
        self.error = None;
        if received == 0 {
            self.has_more = false;
            return self;
        }
        self.loaded += received;

        match self.source.pagination() {
            Pagination::Offset => {
                self.offset = self.offset.saturating_add(received as u64);
                self.has_more = page.has_more || received >= items_per_page as usize;
            }
            Pagination::Page => {
                self.has_more = page.has_more;
                if self.has_more {
                    self.page = page.next_page.unwrap_or(self.page.saturating_add(1));
                }
            }
        }
        self
    }

    /// A fetch failed; stop paging and remember why
    pub fn fail(mut self, message: impl Into<String>) -> Self {
        self.has_more = false;
        self.error = Some(message.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::models::{DramaCard, INVALID_RESPONSE};

    fn cards(source: CatalogSource, n: usize) -> Vec<DramaCard> {
        (0..n)
            .map(|i| crate::catalog::models::card(source, &serde_json::json!({ "id": i }), "cover"))
            .collect()
    }

    fn ok_page(source: CatalogSource, n: usize, has_more: bool) -> CatalogPage {
        CatalogPage {
            code: 0,
            success: true,
            data: cards(source, n),
            has_more,
            next_offset: None,
            next_page: None,
            total: None,
            error: None,
        }
    }

    #[test]
    fn offset_source_advances_by_received_count() {
        let state = BrowseState::new(CatalogSource::Melolo)
            .apply(&ok_page(CatalogSource::Melolo, 12, false), 12);
        assert_eq!(state.offset, 12);
        assert!(state.has_more, "a full page keeps paging");

        let state = state.apply(&ok_page(CatalogSource::Melolo, 5, false), 12);
        assert_eq!(state.offset, 17);
        assert_eq!(state.loaded, 17);
        assert!(!state.has_more);
    }

    #[test]
    fn offset_saturates_instead_of_wrapping() {
        let mut state = BrowseState::new(CatalogSource::Netshort);
        state.offset = u64::MAX - 2;
        let state = state.apply(&ok_page(CatalogSource::Netshort, 5, true), 12);
        assert_eq!(state.offset, u64::MAX);
        assert_eq!(state.loaded, 5);
    }

    #[test]
    fn page_source_follows_next_page() {
        let mut page = ok_page(CatalogSource::Dramabox, 10, true);
        page.next_page = Some(4);
        let state = BrowseState::new(CatalogSource::Dramabox).apply(&page, 12);
        assert_eq!(state.page, 4);
        assert_eq!(state.offset, 0);
        assert!(state.has_more);
    }

    #[test]
    fn failed_page_stops_paging() {
        let state = BrowseState::new(CatalogSource::Netshort)
            .apply(&CatalogPage::failed(INVALID_RESPONSE), 12);
        assert!(!state.has_more);
        assert_eq!(state.error.as_deref(), Some(INVALID_RESPONSE));
        assert!(state.is_first_page());
    }

    #[test]
    fn empty_page_stops_paging() {
        let state = BrowseState::new(CatalogSource::Melolo)
            .apply(&ok_page(CatalogSource::Melolo, 0, true), 12);
        assert!(!state.has_more);
        assert!(state.error.is_none());
    }

    #[test]
    fn switching_source_resets_position_but_keeps_view() {
        let state = BrowseState::new(CatalogSource::Melolo)
            .with_view(ViewMode::List)
            .apply(&ok_page(CatalogSource::Melolo, 12, true), 12)
            .switch_source(CatalogSource::Dramabox);
        assert_eq!(state, BrowseState::new(CatalogSource::Dramabox).with_view(ViewMode::List));
    }

    #[test]
    fn view_mode_parses_storage_values() {
        assert_eq!("list".parse::<ViewMode>().unwrap(), ViewMode::List);
        assert!("table".parse::<ViewMode>().is_err());
    }
}
