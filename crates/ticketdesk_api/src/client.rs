use crate::config::ApiConfig;
use crate::error::{ApiError, Result};
use crate::models::{DirectoryUser, PageCursor, TicketPayload, TicketRecord, UserProfile};
use crate::rate_limiter::RateLimiter;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, IF_MATCH, USER_AGENT};
use reqwest::{Client as HttpClient, Method, RequestBuilder, Response, StatusCode, Url};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{Map, Value};

const ODATA_VERSION: &str = "4.0";

/// Which service a request is addressed to. Each has its own root and bearer token.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Service {
    Records,
    Directory,
}

#[derive(Clone)]
pub struct ApiClient {
    http: HttpClient,
    config: ApiConfig,
    limiter: RateLimiter,
}

/// One filtered, ordered page request against the ticket table.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListRequest {
    pub filter: Option<String>,
    pub page_size: u32,
    pub skip_token: Option<String>,
    pub order_by: Vec<String>,
}

/// A decoded list response: the rows in server order plus where the next page comes from.
#[derive(Debug, Clone)]
pub struct TicketPage {
    pub records: Vec<TicketRecord>,
    pub cursor: PageCursor,
}

#[derive(Deserialize)]
struct ListEnvelope<T> {
    #[serde(default = "Vec::new")]
    value: Vec<T>,
    #[serde(flatten)]
    metadata: Map<String, Value>,
}

impl ApiClient {
    pub fn new(config: ApiConfig) -> Result<Self> {
        let http = build_http_client(&config)?;
        let limiter = RateLimiter::new(config.cooldown);
        Ok(Self {
            http,
            config,
            limiter,
        })
    }

    pub fn config(&self) -> &ApiConfig {
        &self.config
    }

    /// Base URL that relative next-page links are resolved against.
    pub fn environment_base(&self) -> Result<Url> {
        let base = format!("{}/", self.config.environment_url.trim_end_matches('/'));
        Url::parse(&base).map_err(|err| ApiError::Other(err.to_string()))
    }

    pub async fn list_tickets(&self, request: &ListRequest) -> Result<TicketPage> {
        let mut params: Vec<(&str, String)> = Vec::new();
        if let Some(filter) = request.filter.as_deref().filter(|f| !f.is_empty()) {
            params.push(("$filter", filter.to_string()));
        }
        if !request.order_by.is_empty() {
            params.push(("$orderby", request.order_by.join(",")));
        }
        if let Some(token) = request.skip_token.as_deref().filter(|t| !t.is_empty()) {
            params.push(("$skiptoken", token.to_string()));
        }

        tracing::debug!(
            "records:list has_filter={} page_size={} continued={}",
            request.filter.is_some(),
            request.page_size,
            request.skip_token.is_some()
        );

        let path = self.config.entity_set.clone();
        let builder = self
            .request(Service::Records, Method::GET, &path)
            .query(&params)
            .header("Prefer", format!("odata.maxpagesize={}", request.page_size.max(1)));
        let envelope: ListEnvelope<TicketRecord> = self.execute_json(builder).await?;

        Ok(TicketPage {
            records: envelope.value,
            cursor: PageCursor::from_metadata(&envelope.metadata),
        })
    }

    pub async fn get_ticket(&self, id: &str) -> Result<TicketRecord> {
        let path = self.row_path(id);
        let builder = self.request(Service::Records, Method::GET, &path);
        self.execute_json(builder).await
    }

    pub async fn create_ticket(&self, payload: &TicketPayload) -> Result<()> {
        let path = self.config.entity_set.clone();
        let builder = self.request(Service::Records, Method::POST, &path).json(payload);
        self.execute_empty(builder).await
    }

    /// Writes the editable columns of an existing row. `If-Match: *` keeps a
    /// missing row from being created by the PATCH.
    pub async fn update_ticket(&self, id: &str, payload: &TicketPayload) -> Result<()> {
        let path = self.row_path(id);
        let builder = self
            .request(Service::Records, Method::PATCH, &path)
            .header(IF_MATCH, "*")
            .json(payload);
        self.execute_empty(builder).await
    }

    pub async fn search_users(&self, text: &str, limit: u32) -> Result<Vec<DirectoryUser>> {
        let search = directory_search_expression(text);
        let params = [
            ("$search", search),
            ("$top", limit.clamp(1, 999).to_string()),
        ];
        let builder = self
            .request(Service::Directory, Method::GET, "users")
            .query(&params)
            .header("ConsistencyLevel", "eventual");
        let envelope: ListEnvelope<DirectoryUser> = self.execute_json(builder).await?;
        Ok(envelope.value)
    }

    pub async fn get_my_profile(&self) -> Result<UserProfile> {
        let builder = self.request(Service::Directory, Method::GET, "me");
        self.execute_json(builder).await
    }

    fn row_path(&self, id: &str) -> String {
        format!("{}({})", self.config.entity_set, id.trim())
    }

    fn url_for(&self, service: Service, path: &str) -> String {
        let mut base = match service {
            Service::Records => self.config.record_root(),
            Service::Directory => self.config.directory_root(),
        };
        base.push_str(path.trim_start_matches('/'));
        base
    }

    fn request(&self, service: Service, method: Method, path: &str) -> RequestBuilder {
        let token = match service {
            Service::Records => self.config.token.as_str(),
            Service::Directory => self.config.directory_bearer(),
        };
        self.http
            .request(method, self.url_for(service, path))
            .bearer_auth(token)
    }

    async fn execute_json<T>(&self, builder: RequestBuilder) -> Result<T>
    where
        T: DeserializeOwned,
    {
        self.limiter.hit().await;
        let response = builder.send().await?;
        Self::parse_json(response).await
    }

    async fn execute_empty(&self, builder: RequestBuilder) -> Result<()> {
        self.limiter.hit().await;
        let response = builder.send().await?;
        Self::ensure_success(response).await
    }

    async fn parse_json<T>(response: Response) -> Result<T>
    where
        T: DeserializeOwned,
    {
        let status = response.status();
        if status.is_success() {
            response.json::<T>().await.map_err(ApiError::from)
        } else {
            Err(Self::failure(status, response).await)
        }
    }

    async fn ensure_success(response: Response) -> Result<()> {
        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            Err(Self::failure(status, response).await)
        }
    }

    async fn failure(status: StatusCode, response: Response) -> ApiError {
        let body = response.text().await.unwrap_or_default();
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            let detail = ApiError::from_response(status, &body);
            ApiError::Authentication(format!("Access denied ({}) - {}", status, detail))
        } else {
            ApiError::from_response(status, &body)
        }
    }
}

fn build_http_client(config: &ApiConfig) -> Result<HttpClient> {
    let mut headers = HeaderMap::new();
    headers.insert(USER_AGENT, header_value(config.user_agent.clone())?);
    headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
    headers.insert("OData-Version", HeaderValue::from_static(ODATA_VERSION));
    headers.insert("OData-MaxVersion", HeaderValue::from_static(ODATA_VERSION));

    HttpClient::builder()
        .default_headers(headers)
        .timeout(config.timeout)
        .connect_timeout(config.connect_timeout)
        .build()
        .map_err(|err| ApiError::Other(err.to_string()))
}

fn header_value(value: String) -> Result<HeaderValue> {
    HeaderValue::from_str(&value).map_err(|err| ApiError::Other(err.to_string()))
}

/// Directory `$search` clause matching the text against name, mail and principal name.
fn directory_search_expression(text: &str) -> String {
    let term = text.trim().replace('"', "");
    format!(
        "\"displayName:{term}\" OR \"mail:{term}\" OR \"userPrincipalName:{term}\""
    )
}
