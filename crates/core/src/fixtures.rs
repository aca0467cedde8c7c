//! In-memory collaborators for exercising the pipeline without network access.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;

use crate::domain::company::{Company, CompanyId};
use crate::domain::crm::{Board, BoardId, FieldValues, ItemId};
use crate::domain::customer::CustomerId;
use crate::domain::quote::{ContactId, CustomerRef, PersonRef, Quote, QuoteId, QuoteStatus};
use crate::sync::ports::{
    CrmClient, CrmError, QuoteQuery, QuoteSource, QuoteSourceFactory, SourceError,
};

fn locked<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// A `Complete` / `Quote: Won` quote owned by `customer`.
pub fn active_quote(id: i64, customer: i64, company_name: &str) -> Quote {
    Quote {
        id: QuoteId(id),
        stage: Some("Complete".to_string()),
        status: Some(QuoteStatus { name: Some("Quote: Won".to_string()) }),
        customer: Some(CustomerRef {
            id: Some(CustomerId(customer)),
            company_name: Some(company_name.to_string()),
            ..CustomerRef::default()
        }),
        ..Quote::default()
    }
}

impl Quote {
    pub fn with_customer_contact(mut self, id: i64, given_name: &str, family_name: &str) -> Self {
        self.customer_contact = Some(PersonRef {
            id: Some(ContactId(id)),
            given_name: Some(given_name.to_string()),
            family_name: Some(family_name.to_string()),
        });
        self
    }
}

#[derive(Debug)]
pub struct InMemoryQuoteSource {
    companies: Vec<Company>,
    quotes: Vec<Quote>,
    companies_error: Option<SourceError>,
    quotes_error: Option<SourceError>,
    quote_requests: AtomicUsize,
    last_query: Mutex<Option<QuoteQuery>>,
}

impl InMemoryQuoteSource {
    /// One named company owning every given quote.
    pub fn with_quotes(quotes: Vec<Quote>) -> Self {
        Self {
            companies: vec![Company {
                id: CompanyId(0),
                name: Some("Northwind Services".to_string()),
            }],
            quotes,
            companies_error: None,
            quotes_error: None,
            quote_requests: AtomicUsize::new(0),
            last_query: Mutex::new(None),
        }
    }

    pub fn with_companies(mut self, companies: Vec<Company>) -> Self {
        self.companies = companies;
        self
    }

    pub fn failing_companies(mut self, error: SourceError) -> Self {
        self.companies_error = Some(error);
        self
    }

    pub fn failing_quotes(mut self, error: SourceError) -> Self {
        self.quotes_error = Some(error);
        self
    }

    /// Number of quote listings requested so far.
    pub fn quote_requests(&self) -> usize {
        self.quote_requests.load(Ordering::SeqCst)
    }

    pub fn last_query(&self) -> Option<QuoteQuery> {
        locked(&self.last_query).clone()
    }
}

#[async_trait]
impl QuoteSource for InMemoryQuoteSource {
    async fn list_companies(&self) -> Result<Vec<Company>, SourceError> {
        match &self.companies_error {
            Some(error) => Err(error.clone()),
            None => Ok(self.companies.clone()),
        }
    }

    async fn list_quotes_with_details(
        &self,
        _company_id: CompanyId,
        query: &QuoteQuery,
    ) -> Result<Vec<Quote>, SourceError> {
        self.quote_requests.fetch_add(1, Ordering::SeqCst);
        *locked(&self.last_query) = Some(query.clone());
        match &self.quotes_error {
            Some(error) => Err(error.clone()),
            None => Ok(self.quotes.clone()),
        }
    }
}

/// Hands out the same in-memory source whatever base URL is requested.
#[derive(Debug)]
pub struct InMemorySourceFactory {
    source: Arc<InMemoryQuoteSource>,
    requested: Mutex<Vec<String>>,
}

impl InMemorySourceFactory {
    pub fn new(source: InMemoryQuoteSource) -> Self {
        Self { source: Arc::new(source), requested: Mutex::new(Vec::new()) }
    }

    pub fn source(&self) -> &InMemoryQuoteSource {
        &self.source
    }

    pub fn requested_urls(&self) -> Vec<String> {
        locked(&self.requested).clone()
    }
}

impl QuoteSourceFactory for InMemorySourceFactory {
    fn connect(&self, base_url: &str) -> Arc<dyn QuoteSource> {
        locked(&self.requested).push(base_url.to_string());
        self.source.clone()
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct RecordedCall {
    pub board_id: BoardId,
    pub item_name: String,
    pub fields: FieldValues,
}

/// CRM double that records every create call and assigns `item-N` ids.
#[derive(Debug, Default)]
pub struct RecordingCrm {
    calls: Mutex<Vec<RecordedCall>>,
    failing_names: Vec<String>,
    boards: Vec<Board>,
    boards_error: Option<CrmError>,
}

impl RecordingCrm {
    /// Rejects creation of any item named exactly `item_name`.
    pub fn failing_on(mut self, item_name: &str) -> Self {
        self.failing_names.push(item_name.to_string());
        self
    }

    pub fn with_boards(mut self, boards: Vec<Board>) -> Self {
        self.boards = boards;
        self
    }

    pub fn failing_boards(mut self, error: CrmError) -> Self {
        self.boards_error = Some(error);
        self
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        locked(&self.calls).clone()
    }
}

#[async_trait]
impl CrmClient for RecordingCrm {
    async fn create_item(
        &self,
        board_id: &BoardId,
        item_name: &str,
        fields: &FieldValues,
    ) -> Result<ItemId, CrmError> {
        let mut calls = locked(&self.calls);
        calls.push(RecordedCall {
            board_id: board_id.clone(),
            item_name: item_name.to_string(),
            fields: fields.clone(),
        });

        if self.failing_names.iter().any(|name| name == item_name) {
            return Err(CrmError::Api(format!("could not create item `{item_name}`")));
        }
        Ok(ItemId(format!("item-{}", calls.len())))
    }

    async fn list_boards(&self) -> Result<Vec<Board>, CrmError> {
        match &self.boards_error {
            Some(error) => Err(error.clone()),
            None => Ok(self.boards.clone()),
        }
    }
}
