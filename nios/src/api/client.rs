use reqwest::{Method, RequestBuilder};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tfplug::context::Context;

use super::common::{ApiQueryParams, WapiErrorDetails, WapiErrorResponse, WapiObject, WapiResult};
use super::error::ApiError;
use crate::utils::extattrs::INTERNAL_ID_KEY;

pub const DEFAULT_WAPI_VERSION: &str = "2.13.6";
pub const DEFAULT_TIMEOUT_SECONDS: u64 = 60;

/// NIOS WAPI client
#[derive(Clone)]
pub struct Client {
    inner: Arc<ClientInner>,
}

struct ClientInner {
    http_client: reqwest::Client,
    base_url: String,
    username: String,
    password: String,
    timeout_seconds: u64,
}

#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub host_url: String,
    pub username: String,
    pub password: String,
    pub wapi_version: String,
    pub insecure: bool,
    pub timeout_seconds: u64,
}

impl ClientConfig {
    pub fn new(host_url: &str, username: &str, password: &str) -> Self {
        Self {
            host_url: host_url.to_string(),
            username: username.to_string(),
            password: password.to_string(),
            wapi_version: DEFAULT_WAPI_VERSION.to_string(),
            insecure: false,
            timeout_seconds: DEFAULT_TIMEOUT_SECONDS,
        }
    }
}

impl Client {
    pub fn new(config: ClientConfig) -> Result<Self, ApiError> {
        let host = config.host_url.trim_end_matches('/');
        let parsed = url::Url::parse(host).map_err(|e| ApiError::InvalidUrl(format!("{}: {}", host, e)))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(ApiError::InvalidUrl(format!(
                "{}: scheme must be http or https",
                host
            )));
        }

        let http_client = reqwest::Client::builder()
            .danger_accept_invalid_certs(config.insecure)
            .timeout(Duration::from_secs(config.timeout_seconds))
            .connect_timeout(Duration::from_secs(config.timeout_seconds.min(10)))
            .build()?;

        let base_url = format!(
            "{}/wapi/v{}",
            host,
            config.wapi_version.trim_start_matches('v')
        );

        Ok(Self {
            inner: Arc::new(ClientInner {
                http_client,
                base_url,
                username: config.username,
                password: config.password,
                timeout_seconds: config.timeout_seconds,
            }),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.inner.base_url
    }

    /// Execute a GET request
    pub async fn get<T: DeserializeOwned>(
        &self,
        ctx: &Context,
        path: &str,
        params: &ApiQueryParams,
    ) -> Result<T, ApiError> {
        let request = self.request(Method::GET, path, params);
        self.execute(ctx, request, path).await
    }

    /// Execute a POST request
    pub async fn post<T: DeserializeOwned, B: Serialize>(
        &self,
        ctx: &Context,
        path: &str,
        params: &ApiQueryParams,
        body: &B,
    ) -> Result<T, ApiError> {
        let request = self.request(Method::POST, path, params).json(body);
        self.execute(ctx, request, path).await
    }

    /// Execute a PUT request
    pub async fn put<T: DeserializeOwned, B: Serialize>(
        &self,
        ctx: &Context,
        path: &str,
        params: &ApiQueryParams,
        body: &B,
    ) -> Result<T, ApiError> {
        let request = self.request(Method::PUT, path, params).json(body);
        self.execute(ctx, request, path).await
    }

    /// Execute a DELETE request
    pub async fn delete<T: DeserializeOwned>(
        &self,
        ctx: &Context,
        path: &str,
        params: &ApiQueryParams,
    ) -> Result<T, ApiError> {
        let request = self.request(Method::DELETE, path, params);
        self.execute(ctx, request, path).await
    }

    /// Typed operations for one WAPI object type
    pub fn objects<'a>(&'a self, object_type: &'a str) -> ObjectsApi<'a> {
        ObjectsApi {
            client: self,
            object_type,
        }
    }

    fn request(&self, method: Method, path: &str, params: &ApiQueryParams) -> RequestBuilder {
        let url = format!(
            "{}/{}{}",
            self.inner.base_url,
            path.trim_start_matches('/'),
            params.to_query_string()
        );
        tracing::debug!("{} request to: {}", method, url);

        self.inner
            .http_client
            .request(method, url)
            .basic_auth(&self.inner.username, Some(&self.inner.password))
    }

    /// Send once; failures are terminal for the calling operation
    async fn execute<T: DeserializeOwned>(
        &self,
        ctx: &Context,
        request: RequestBuilder,
        path: &str,
    ) -> Result<T, ApiError> {
        let response = match ctx.run(request.send()).await? {
            Ok(response) => response,
            Err(e) if e.is_timeout() => {
                return Err(ApiError::Timeout(self.inner.timeout_seconds));
            }
            Err(e) => return Err(ApiError::RequestError(e)),
        };

        let status = response.status();
        tracing::debug!("Response status for {}: {}", path, status);

        if status.is_success() {
            return self.parse_success_response(response).await;
        }

        if status == reqwest::StatusCode::UNAUTHORIZED {
            return Err(ApiError::AuthError);
        }

        self.handle_error_response(response).await
    }

    async fn parse_success_response<T: DeserializeOwned>(
        &self,
        response: reqwest::Response,
    ) -> Result<T, ApiError> {
        let text = response.text().await?;
        tracing::debug!("API response body: {}", text);

        match serde_json::from_str::<WapiResult<T>>(&text) {
            Ok(wrapper) => Ok(wrapper.result),
            Err(_) => match serde_json::from_str::<T>(&text) {
                Ok(data) => Ok(data),
                Err(e) => {
                    tracing::error!("Failed to deserialize response: {}, body: {}", e, text);
                    Err(ApiError::ParseError(format!(
                        "Failed to parse response: {}",
                        e
                    )))
                }
            },
        }
    }

    async fn handle_error_response<T>(&self, response: reqwest::Response) -> Result<T, ApiError> {
        let status = response.status().as_u16();
        let text = response
            .text()
            .await
            .unwrap_or_else(|_| "Unknown error".to_string());
        tracing::error!("API error response ({}): {}", status, text);

        let details = serde_json::from_str::<WapiErrorResponse>(&text)
            .ok()
            .map(|body| {
                Box::new(WapiErrorDetails {
                    code: body.code,
                    text: body.text.or(body.error),
                })
            });

        Err(ApiError::ApiError {
            status,
            message: text,
            details,
        })
    }
}

/// CRUD on one object type; every call asks for `_return_as_object=1`
pub struct ObjectsApi<'a> {
    client: &'a Client,
    object_type: &'a str,
}

impl<'a> ObjectsApi<'a> {
    pub async fn create(
        &self,
        ctx: &Context,
        body: &WapiObject,
        return_fields: &[&str],
    ) -> Result<WapiObject, ApiError> {
        let params = ApiQueryParams::new()
            .return_fields_plus(return_fields)
            .return_as_object();
        self.client.post(ctx, self.object_type, &params, body).await
    }

    pub async fn get(
        &self,
        ctx: &Context,
        reference: &str,
        return_fields: &[&str],
    ) -> Result<WapiObject, ApiError> {
        let params = ApiQueryParams::new()
            .return_fields_plus(return_fields)
            .return_as_object();
        self.client.get(ctx, reference, &params).await
    }

    /// List objects; `params` carries field and extensible attribute filters
    pub async fn list(
        &self,
        ctx: &Context,
        params: ApiQueryParams,
        return_fields: &[&str],
    ) -> Result<Vec<WapiObject>, ApiError> {
        let params = params.return_fields_plus(return_fields).return_as_object();
        self.client.get(ctx, self.object_type, &params).await
    }

    pub async fn update(
        &self,
        ctx: &Context,
        reference: &str,
        body: &WapiObject,
        return_fields: &[&str],
    ) -> Result<WapiObject, ApiError> {
        let params = ApiQueryParams::new()
            .return_fields_plus(return_fields)
            .return_as_object();
        self.client.put(ctx, reference, &params, body).await
    }

    /// Returns the reference of the deleted object
    pub async fn delete(&self, ctx: &Context, reference: &str) -> Result<String, ApiError> {
        self.client
            .delete(ctx, reference, &ApiQueryParams::new().return_as_object())
            .await
    }

    /// Locate an object by its tracking extensible attribute
    pub async fn find_by_internal_id(
        &self,
        ctx: &Context,
        internal_id: &str,
        return_fields: &[&str],
    ) -> Result<Option<WapiObject>, ApiError> {
        let params = ApiQueryParams::new()
            .ext_attr_filter(INTERNAL_ID_KEY, internal_id)
            .proxy_search_gm();
        let mut found = self.list(ctx, params, return_fields).await?;
        if found.len() > 1 {
            tracing::warn!(
                "{} {} objects carry internal id {}, using the first",
                found.len(),
                self.object_type,
                internal_id
            );
        }
        Ok(if found.is_empty() {
            None
        } else {
            Some(found.swap_remove(0))
        })
    }
}
