//! Data API client
//!
//! Reads rows with `GET {project}/rest/v1/{table}` using PostgREST-style query
//! parameters built by [`Query`].

use crate::config::BackendConfig;
use crate::envelope::FetchResponse;
use crate::error::{BackendError, Result};
use crate::fetch::fetch_with_retry;
use crate::observability::{AttemptCounter, RequestLog, tracing_observer};
use crate::options::FetchOptions;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::sync::Arc;
use url::Url;

/// A read query against one table.
///
/// ```rust
/// use bizdesk_backend::Query;
///
/// let query = Query::table("invoices")
///     .select("id,total,client:clients(name)")
///     .eq("status", "overdue")
///     .order("due_date", false)
///     .limit(20);
/// assert_eq!(query.table_name(), "invoices");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Query {
    table: String,
    select: String,
    filters: Vec<(String, String)>,
    order: Option<String>,
    limit: Option<usize>,
}

impl Query {
    /// Select every column of `table`.
    pub fn table(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            select: "*".to_string(),
            filters: Vec::new(),
            order: None,
            limit: None,
        }
    }

    /// Columns to return (PostgREST `select` syntax).
    pub fn select(mut self, columns: impl Into<String>) -> Self {
        self.select = columns.into();
        self
    }

    /// Keep rows where `column` equals `value`.
    pub fn eq(mut self, column: impl Into<String>, value: impl ToString) -> Self {
        self.filters
            .push((column.into(), format!("eq.{}", value.to_string())));
        self
    }

    /// Sort by `column`.
    pub fn order(mut self, column: impl Into<String>, ascending: bool) -> Self {
        let direction = if ascending { "asc" } else { "desc" };
        self.order = Some(format!("{}.{direction}", column.into()));
        self
    }

    /// Return at most `limit` rows.
    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// The table being queried.
    pub fn table_name(&self) -> &str {
        &self.table
    }

    fn path(&self) -> String {
        format!("rest/v1/{}", self.table)
    }

    fn apply(&self, url: &mut Url) {
        let mut pairs = url.query_pairs_mut();
        pairs.append_pair("select", &self.select);
        for (column, filter) in &self.filters {
            pairs.append_pair(column, filter);
        }
        if let Some(order) = &self.order {
            pairs.append_pair("order", order);
        }
        if let Some(limit) = self.limit {
            pairs.append_pair("limit", &limit.to_string());
        }
    }
}

/// PostgREST error body.
#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    code: String,
    message: String,
}

/// Client for the backend's data API.
#[derive(Clone)]
pub struct RestClient {
    http: Arc<reqwest::Client>,
    config: Arc<BackendConfig>,
}

impl RestClient {
    /// Create a client for `config`.
    pub fn new(config: BackendConfig) -> std::result::Result<Self, BackendError> {
        let http = config.http_client()?;
        Ok(Self {
            http: Arc::new(http),
            config: Arc::new(config),
        })
    }

    /// Fetch every row matching `query`, once. An empty result is `Some(vec![])`.
    pub async fn fetch_all<T>(&self, query: &Query) -> FetchResponse<Vec<T>>
    where
        T: DeserializeOwned,
    {
        self.fetch_all_at(query, None).await
    }

    /// Fetch the first row matching `query`, once. No row is `None`.
    pub async fn fetch_one<T>(&self, query: &Query) -> FetchResponse<T>
    where
        T: DeserializeOwned,
    {
        self.fetch_one_at(query, None).await
    }

    /// [`fetch_one`](Self::fetch_one) under [`fetch_with_retry`]: a missing row
    /// is retried like a transient failure.
    pub async fn fetch_one_with_retry<T>(&self, query: &Query, options: &FetchOptions) -> Result<T>
    where
        T: DeserializeOwned + Send,
    {
        let options = observed(query, options);
        let attempts = AttemptCounter::default();
        fetch_with_retry(|| self.fetch_one_at(query, Some(attempts.next())), &options).await
    }

    /// [`fetch_all`](Self::fetch_all) under [`fetch_with_retry`].
    pub async fn fetch_all_with_retry<T>(
        &self,
        query: &Query,
        options: &FetchOptions,
    ) -> Result<Vec<T>>
    where
        T: DeserializeOwned + Send,
    {
        let options = observed(query, options);
        let attempts = AttemptCounter::default();
        fetch_with_retry(|| self.fetch_all_at(query, Some(attempts.next())), &options).await
    }

    async fn fetch_all_at<T>(&self, query: &Query, attempt: Option<u32>) -> FetchResponse<Vec<T>>
    where
        T: DeserializeOwned,
    {
        let rows = self.get_rows(query, attempt).await?;
        rows.into_iter()
            .map(|row| serde_json::from_value(row).map_err(|e| BackendError::Decode(e.to_string())))
            .collect::<std::result::Result<Vec<T>, _>>()
            .map(Some)
    }

    async fn fetch_one_at<T>(&self, query: &Query, attempt: Option<u32>) -> FetchResponse<T>
    where
        T: DeserializeOwned,
    {
        let query = query.clone().limit(1);
        let Some(row) = self.get_rows(&query, attempt).await?.into_iter().next() else {
            return Ok(None);
        };
        serde_json::from_value(row)
            .map(Some)
            .map_err(|e| BackendError::Decode(e.to_string()))
    }

    async fn get_rows(
        &self,
        query: &Query,
        attempt: Option<u32>,
    ) -> std::result::Result<Vec<Value>, BackendError> {
        let path = query.path();
        let mut url = self.config.endpoint(&path)?;
        query.apply(&mut url);

        let request = RequestLog::start("GET", &path).with_attempt(attempt);
        request.sent();

        let response = match self.http.get(url).send().await {
            Ok(response) => response,
            Err(e) => {
                request.send_failed(&e.to_string());
                return Err(e.into());
            }
        };

        let status = response.status();
        let bytes = response.bytes().await?;
        let meta = request.response(status.as_u16(), bytes.len());

        if !status.is_success() {
            let err = match serde_json::from_slice::<ApiErrorBody>(&bytes) {
                Ok(body) => BackendError::Api {
                    status: Some(status.as_u16()),
                    code: body.code,
                    message: body.message,
                },
                Err(_) => BackendError::Http {
                    status: status.as_u16(),
                    message: String::from_utf8_lossy(&bytes).trim().to_string(),
                },
            };
            meta.log_error(&err.to_string());
            return Err(err);
        }

        meta.log_success();
        serde_json::from_slice::<Vec<Value>>(&bytes).map_err(|e| BackendError::Decode(e.to_string()))
    }
}

fn observed(query: &Query, options: &FetchOptions) -> FetchOptions {
    if options.has_observer() {
        return options.clone();
    }
    options.clone().observer(tracing_observer(query.table_name()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_url() {
        let config = BackendConfig::new("https://abc.supabase.co", "anon").unwrap();
        let query = Query::table("clients")
            .select("id,name")
            .eq("tenant_id", 42)
            .order("name", true)
            .limit(10);

        let mut url = config.endpoint(&query.path()).unwrap();
        query.apply(&mut url);
        assert_eq!(
            url.as_str(),
            "https://abc.supabase.co/rest/v1/clients?select=id%2Cname&tenant_id=eq.42&order=name.asc&limit=10"
        );
    }

    #[test]
    fn test_query_defaults_to_all_columns() {
        let query = Query::table("invoices");
        let mut url = Url::parse("http://localhost/rest/v1/invoices").unwrap();
        query.apply(&mut url);
        assert_eq!(url.query(), Some("select=*"));
    }
}
