//! Listing store: the accumulated collection, active filters, filtered view,
//! pagination and detail overlay, driven by discrete events.
//!
//! Every event is handled by [`StoreState::handle`], which consumes the
//! current state and returns the next one together with the effects the
//! caller must execute (fetches to start or cancel). The store itself never
//! performs I/O.
//!
//! ```text
//! Scrolled / AdvancePage -> Effect::Fetch -> FetchCompleted -> append -> refilter
//! FilterChanged                                              -> refilter
//! ```

use tracing::{debug, info, warn};

use crate::fetch::{FetchError, ListingPage, PAGE_SIZE, PageRequest};
use crate::filter::{FilterCriteria, FilterField};
use crate::models::ListingRecord;
use crate::scroll::{DEFAULT_THRESHOLD, ScrollMetrics, ScrollTrigger};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaginationState {
    /// Next page to load, 1-based. Only ever increases.
    pub page_number: u32,
    pub page_size: u32,
    /// Page currently being fetched, if any.
    pub in_flight: Option<u32>,
    /// Set once the endpoint returned a short page or the advertised total.
    pub exhausted: bool,
}

impl PaginationState {
    pub fn pages_loaded(&self) -> u32 {
        self.page_number - 1
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Overlay {
    #[default]
    Hidden,
    Shown { id: String },
}

#[derive(Debug, Clone)]
pub enum StoreEvent {
    AdvancePage,
    Scrolled(ScrollMetrics),
    FilterChanged { field: FilterField, value: String },
    ClearFilters,
    FetchCompleted {
        request_id: u64,
        page: u32,
        result: Result<ListingPage, FetchError>,
    },
    ViewDetails(String),
    CloseDetails,
    Teardown,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    Fetch {
        request_id: u64,
        page: u32,
        request: PageRequest,
    },
    CancelFetches,
}

#[derive(Debug, Clone)]
pub struct StoreState {
    records: Vec<ListingRecord>,
    filters: FilterCriteria,
    filtered: Vec<usize>,
    pagination: PaginationState,
    overlay: Overlay,
    scroll: ScrollTrigger,
    last_error: Option<FetchError>,
    in_flight_request: Option<u64>,
    next_request_id: u64,
    total_count: Option<u64>,
    closed: bool,
}

impl StoreState {
    pub fn new(page_size: u32, scroll_threshold: u32) -> Self {
        Self {
            records: Vec::new(),
            filters: FilterCriteria::default(),
            filtered: Vec::new(),
            pagination: PaginationState {
                page_number: 1,
                page_size,
                in_flight: None,
                exhausted: false,
            },
            overlay: Overlay::Hidden,
            scroll: ScrollTrigger::new(scroll_threshold),
            last_error: None,
            in_flight_request: None,
            next_request_id: 1,
            total_count: None,
            closed: false,
        }
    }

    pub fn records(&self) -> &[ListingRecord] {
        &self.records
    }

    /// The filtered view, in fetch order.
    pub fn filtered(&self) -> impl Iterator<Item = &ListingRecord> + '_ {
        self.filtered.iter().map(|&i| &self.records[i])
    }

    pub fn filtered_len(&self) -> usize {
        self.filtered.len()
    }

    pub fn filtered_at(&self, index: usize) -> Option<&ListingRecord> {
        self.filtered.get(index).map(|&i| &self.records[i])
    }

    pub fn filters(&self) -> &FilterCriteria {
        &self.filters
    }

    pub fn pagination(&self) -> &PaginationState {
        &self.pagination
    }

    pub fn overlay(&self) -> &Overlay {
        &self.overlay
    }

    /// Record shown in the detail overlay.
    pub fn detail_record(&self) -> Option<&ListingRecord> {
        match &self.overlay {
            Overlay::Shown { id } => self.records.iter().find(|r| &r.id == id),
            Overlay::Hidden => None,
        }
    }

    pub fn last_error(&self) -> Option<&FetchError> {
        self.last_error.as_ref()
    }

    pub fn total_count(&self) -> Option<u64> {
        self.total_count
    }

    pub fn is_loading(&self) -> bool {
        self.pagination.in_flight.is_some()
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    pub fn handle(mut self, event: StoreEvent) -> (Self, Vec<Effect>) {
        if self.closed {
            debug!(?event, "store closed, ignoring event");
            return (self, Vec::new());
        }

        let mut effects = Vec::new();
        match event {
            StoreEvent::AdvancePage => self.advance(&mut effects),
            StoreEvent::Scrolled(metrics) => {
                if self.scroll.observe(metrics) {
                    debug!(
                        distance = metrics.distance_to_bottom(),
                        threshold = self.scroll.threshold(),
                        "near bottom, advancing"
                    );
                    self.advance(&mut effects);
                }
            }
            StoreEvent::FilterChanged { field, value } => {
                self.filters.set(field, &value);
                self.refilter();
            }
            StoreEvent::ClearFilters => {
                self.filters = FilterCriteria::default();
                self.refilter();
            }
            StoreEvent::FetchCompleted { request_id, page, result } => {
                self.complete(request_id, page, result);
            }
            StoreEvent::ViewDetails(id) => {
                if self.records.iter().any(|r| r.id == id) {
                    self.overlay = Overlay::Shown { id };
                } else {
                    warn!(%id, "view details requested for unknown listing");
                }
            }
            StoreEvent::CloseDetails => self.overlay = Overlay::Hidden,
            StoreEvent::Teardown => {
                self.closed = true;
                self.pagination.in_flight = None;
                self.in_flight_request = None;
                effects.push(Effect::CancelFetches);
            }
        }
        (self, effects)
    }

    fn advance(&mut self, effects: &mut Vec<Effect>) {
        if let Some(page) = self.pagination.in_flight {
            debug!(page, "page advance coalesced, fetch already in flight");
            return;
        }
        if self.pagination.exhausted {
            debug!("page advance ignored, listings exhausted");
            return;
        }

        let page = self.pagination.page_number;
        let request_id = self.next_request_id;
        self.next_request_id += 1;
        self.pagination.in_flight = Some(page);
        self.in_flight_request = Some(request_id);

        effects.push(Effect::Fetch {
            request_id,
            page,
            request: PageRequest::for_page(page, self.pagination.page_size),
        });
    }

    fn complete(&mut self, request_id: u64, page: u32, result: Result<ListingPage, FetchError>) {
        if self.in_flight_request != Some(request_id) {
            warn!(request_id, page, "discarding stale listing response");
            return;
        }
        self.in_flight_request = None;
        self.pagination.in_flight = None;

        match result {
            Ok(listing_page) => {
                let received = listing_page.records.len();
                self.records.extend(listing_page.records);
                self.pagination.page_number = page + 1;
                self.last_error = None;
                if listing_page.total_count.is_some() {
                    self.total_count = listing_page.total_count;
                }

                // compare offsets, not record counts: the endpoint may repeat
                // listings across pages
                let short_page = received < self.pagination.page_size as usize;
                let next_offset = u64::from(page) * u64::from(self.pagination.page_size);
                let reached_total = self.total_count.is_some_and(|total| next_offset >= total);
                self.pagination.exhausted = short_page || reached_total;

                // the filtered view may not have grown, so a view parked at
                // the bottom must still be able to ask for the next page
                if received > 0 {
                    self.scroll.rearm();
                }

                info!(page, received, total = self.records.len(), "listings page loaded");
                self.refilter();
            }
            Err(err) => {
                // page_number is left alone so the next advance retries this page
                warn!(page, error = %err, "listing fetch failed");
                self.last_error = Some(err);
            }
        }
    }

    fn refilter(&mut self) {
        self.filtered = self
            .records
            .iter()
            .enumerate()
            .filter(|(_, record)| self.filters.matches(record))
            .map(|(i, _)| i)
            .collect();
    }
}

impl Default for StoreState {
    fn default() -> Self {
        Self::new(PAGE_SIZE, DEFAULT_THRESHOLD)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::sample;

    fn page_of(ids: &[&str]) -> ListingPage {
        ListingPage {
            records: ids.iter().map(|id| sample(id, "Engineer", "Acme")).collect(),
            total_count: None,
        }
    }

    fn full_page(prefix: &str) -> ListingPage {
        let ids: Vec<String> = (0..PAGE_SIZE).map(|i| format!("{}-{}", prefix, i)).collect();
        let refs: Vec<&str> = ids.iter().map(String::as_str).collect();
        page_of(&refs)
    }

    fn fetch_of(effects: &[Effect]) -> (u64, u32, PageRequest) {
        match effects {
            [Effect::Fetch { request_id, page, request }] => (*request_id, *page, *request),
            other => panic!("expected a single fetch, got {:?}", other),
        }
    }

    fn ids(state: &StoreState) -> Vec<String> {
        state.filtered().map(|r| r.id.clone()).collect()
    }

    #[test]
    fn test_initial_state() {
        let state = StoreState::default();
        assert!(state.records().is_empty());
        assert_eq!(state.pagination().page_number, 1);
        assert_eq!(state.pagination().page_size, 10);
        assert!(state.filters().is_empty());
        assert_eq!(state.overlay(), &Overlay::Hidden);
    }

    #[test]
    fn test_advance_requests_next_page() {
        let (state, effects) = StoreState::default().handle(StoreEvent::AdvancePage);
        let (id, page, request) = fetch_of(&effects);
        assert_eq!(page, 1);
        assert_eq!(request, PageRequest { limit: 10, offset: 0 });
        assert!(state.is_loading());

        let (state, _) = state.handle(StoreEvent::FetchCompleted {
            request_id: id,
            page,
            result: Ok(full_page("p1")),
        });
        let (state, _) = state.handle(StoreEvent::FetchCompleted {
            request_id: 99,
            page: 2,
            result: Ok(full_page("late")),
        });
        assert_eq!(state.records().len(), 10);

        let (state, effects) = state.handle(StoreEvent::AdvancePage);
        let (id, page, request) = fetch_of(&effects);
        assert_eq!(page, 2);
        assert_eq!(request.offset, 10);

        let (state, _) = state.handle(StoreEvent::FetchCompleted {
            request_id: id,
            page,
            result: Ok(full_page("p2")),
        });
        let (_, effects) = state.handle(StoreEvent::AdvancePage);
        let (_, page, request) = fetch_of(&effects);
        assert_eq!(page, 3);
        assert_eq!(request, PageRequest { limit: 10, offset: 20 });
    }

    #[test]
    fn test_successful_fetch_appends_in_order() {
        let (state, effects) = StoreState::default().handle(StoreEvent::AdvancePage);
        let (id, page, _) = fetch_of(&effects);
        let (state, _) = state.handle(StoreEvent::FetchCompleted {
            request_id: id,
            page,
            result: Ok(full_page("a")),
        });

        let (state, effects) = state.handle(StoreEvent::AdvancePage);
        let (id, page, _) = fetch_of(&effects);
        let (state, _) = state.handle(StoreEvent::FetchCompleted {
            request_id: id,
            page,
            result: Ok(page_of(&["z", "a-0", "y"])),
        });

        assert_eq!(state.records().len(), 13);
        let tail: Vec<&str> = state.records()[10..].iter().map(|r| r.id.as_str()).collect();
        assert_eq!(tail, vec!["z", "a-0", "y"]);
        assert_eq!(state.records()[0].id, "a-0");
        assert_eq!(state.pagination().page_number, 3);
    }

    #[test]
    fn test_advance_while_in_flight_is_coalesced() {
        let (state, effects) = StoreState::default().handle(StoreEvent::AdvancePage);
        assert_eq!(effects.len(), 1);
        let (state, effects) = state.handle(StoreEvent::AdvancePage);
        assert!(effects.is_empty());
        assert_eq!(state.pagination().in_flight, Some(1));
    }

    #[test]
    fn test_failed_fetch_keeps_collection_and_retries_page() {
        let (state, effects) = StoreState::default().handle(StoreEvent::AdvancePage);
        let (id, page, _) = fetch_of(&effects);
        let (state, _) = state.handle(StoreEvent::FetchCompleted {
            request_id: id,
            page,
            result: Ok(full_page("a")),
        });

        let (state, effects) = state.handle(StoreEvent::AdvancePage);
        let (id, page, _) = fetch_of(&effects);
        let (state, _) = state.handle(StoreEvent::FetchCompleted {
            request_id: id,
            page,
            result: Err(FetchError::BadStatus { status: 500 }),
        });

        assert_eq!(state.records().len(), 10);
        assert_eq!(state.last_error(), Some(&FetchError::BadStatus { status: 500 }));
        assert!(!state.is_loading());
        assert_eq!(state.pagination().page_number, 2);

        let (state, effects) = state.handle(StoreEvent::AdvancePage);
        let (id, page, _) = fetch_of(&effects);
        assert_eq!(page, 2);
        let (state, _) = state.handle(StoreEvent::FetchCompleted {
            request_id: id,
            page,
            result: Ok(full_page("b")),
        });
        assert!(state.last_error().is_none());
    }

    #[test]
    fn test_short_page_exhausts() {
        let (state, effects) = StoreState::default().handle(StoreEvent::AdvancePage);
        let (id, page, _) = fetch_of(&effects);
        let (state, _) = state.handle(StoreEvent::FetchCompleted {
            request_id: id,
            page,
            result: Ok(page_of(&["only"])),
        });
        assert!(state.pagination().exhausted);
        let (_, effects) = state.handle(StoreEvent::AdvancePage);
        assert!(effects.is_empty());
    }

    #[test]
    fn test_total_count_exhausts() {
        let (state, effects) = StoreState::default().handle(StoreEvent::AdvancePage);
        let (id, page, _) = fetch_of(&effects);
        let mut listing = full_page("a");
        listing.total_count = Some(10);
        let (state, _) = state.handle(StoreEvent::FetchCompleted {
            request_id: id,
            page,
            result: Ok(listing),
        });
        assert_eq!(state.total_count(), Some(10));
        assert!(state.pagination().exhausted);
    }

    #[test]
    fn test_filter_changes_recompute_view() {
        let (state, effects) = StoreState::default().handle(StoreEvent::AdvancePage);
        let (id, page, _) = fetch_of(&effects);
        let mut listing = page_of(&["1", "2"]);
        listing.records[0].min_experience = Some(2.0);
        listing.records[1].role = "Manager".to_string();
        listing.records[1].min_experience = Some(5.0);
        let (state, _) = state.handle(StoreEvent::FetchCompleted {
            request_id: id,
            page,
            result: Ok(listing),
        });
        assert_eq!(ids(&state), vec!["1", "2"]);

        let (state, _) = state.handle(StoreEvent::FilterChanged {
            field: FilterField::MinExperience,
            value: "3".to_string(),
        });
        assert_eq!(ids(&state), vec!["2"]);
        assert_eq!(state.records().len(), 2);

        let (state, _) = state.handle(StoreEvent::ClearFilters);
        assert_eq!(ids(&state), vec!["1", "2"]);
    }

    #[test]
    fn test_new_records_respect_active_filters() {
        let (state, _) = StoreState::default().handle(StoreEvent::FilterChanged {
            field: FilterField::CompanyName,
            value: "initech".to_string(),
        });
        let (state, effects) = state.handle(StoreEvent::AdvancePage);
        let (id, page, _) = fetch_of(&effects);
        let mut listing = page_of(&["1", "2", "3"]);
        listing.records[1].company_name = "Initech".to_string();
        let (state, _) = state.handle(StoreEvent::FetchCompleted {
            request_id: id,
            page,
            result: Ok(listing),
        });
        assert_eq!(ids(&state), vec!["2"]);
        assert_eq!(state.filtered_at(0).map(|r| r.id.as_str()), Some("2"));
        assert!(state.filtered_at(1).is_none());
    }

    #[test]
    fn test_scroll_near_bottom_advances_once() {
        let far = ScrollMetrics { scroll_top: 0, scroll_height: 500, client_height: 300 };
        let near = ScrollMetrics { scroll_top: 170, ..far };

        let (state, effects) = StoreState::default().handle(StoreEvent::Scrolled(far));
        assert!(effects.is_empty());
        let (state, effects) = state.handle(StoreEvent::Scrolled(near));
        assert_eq!(effects.len(), 1);
        let (_, effects) = state.handle(StoreEvent::Scrolled(near));
        assert!(effects.is_empty());
    }

    #[test]
    fn test_scroll_at_bottom_keeps_paging_when_filter_hides_new_records() {
        let (mut state, _) = StoreState::default().handle(StoreEvent::FilterChanged {
            field: FilterField::Role,
            value: "manager".to_string(),
        });
        // nothing matches, so the view height never changes
        let parked = ScrollMetrics { scroll_top: 0, scroll_height: 0, client_height: 40 };

        for expected_page in 1..=3 {
            let (next, effects) = state.handle(StoreEvent::Scrolled(parked));
            let (id, page, _) = fetch_of(&effects);
            assert_eq!(page, expected_page);
            let (next, _) = next.handle(StoreEvent::FetchCompleted {
                request_id: id,
                page,
                result: Ok(full_page(&format!("p{}", page))),
            });
            assert_eq!(next.filtered_len(), 0);
            state = next;
        }
        assert_eq!(state.records().len(), 30);
    }

    #[test]
    fn test_repeated_listings_do_not_exhaust_early() {
        let (state, effects) = StoreState::default().handle(StoreEvent::AdvancePage);
        let (id, page, _) = fetch_of(&effects);
        // ten listings plus five repeats of the first ones
        let mut listing = full_page("a");
        let repeats: Vec<ListingRecord> = listing.records[..5].to_vec();
        listing.records.extend(repeats);
        listing.total_count = Some(15);
        let (state, _) = state.handle(StoreEvent::FetchCompleted {
            request_id: id,
            page,
            result: Ok(listing),
        });
        assert_eq!(state.records().len(), 15);
        assert!(!state.pagination().exhausted);

        let (state, effects) = state.handle(StoreEvent::AdvancePage);
        let (id, page, request) = fetch_of(&effects);
        assert_eq!(request.offset, 10);
        let mut listing = page_of(&["b-0", "b-1", "b-2", "b-3", "b-4"]);
        listing.total_count = Some(15);
        let (state, _) = state.handle(StoreEvent::FetchCompleted {
            request_id: id,
            page,
            result: Ok(listing),
        });
        assert!(state.pagination().exhausted);
    }

    #[test]
    fn test_overlay_tracks_selected_record() {
        let (state, effects) = StoreState::default().handle(StoreEvent::AdvancePage);
        let (id, page, _) = fetch_of(&effects);
        let (state, _) = state.handle(StoreEvent::FetchCompleted {
            request_id: id,
            page,
            result: Ok(page_of(&["first", "second"])),
        });

        let (state, _) = state.handle(StoreEvent::ViewDetails("second".to_string()));
        assert_eq!(state.overlay(), &Overlay::Shown { id: "second".to_string() });
        assert_eq!(state.detail_record().map(|r| r.id.as_str()), Some("second"));

        let (state, _) = state.handle(StoreEvent::ViewDetails("missing".to_string()));
        assert_eq!(state.detail_record().map(|r| r.id.as_str()), Some("second"));

        let (state, _) = state.handle(StoreEvent::CloseDetails);
        assert_eq!(state.overlay(), &Overlay::Hidden);
        assert!(state.detail_record().is_none());
    }

    #[test]
    fn test_teardown_cancels_and_ignores_later_events() {
        let (state, effects) = StoreState::default().handle(StoreEvent::AdvancePage);
        let (id, page, _) = fetch_of(&effects);
        let (state, effects) = state.handle(StoreEvent::Teardown);
        assert_eq!(effects, vec![Effect::CancelFetches]);
        assert!(state.is_closed());

        let (state, effects) = state.handle(StoreEvent::FetchCompleted {
            request_id: id,
            page,
            result: Ok(full_page("a")),
        });
        assert!(effects.is_empty());
        assert!(state.records().is_empty());
        let (_, effects) = state.handle(StoreEvent::AdvancePage);
        assert!(effects.is_empty());
    }
}
