/// 测试页面 HTTP 客户端
///
/// 封装浏览器风格的请求头、超时和重定向设置
use crate::config::Config;
use crate::error::{AppError, AppResult, FetchError};
use reqwest::header::{self, HeaderMap, HeaderValue};
use reqwest::{redirect, Client, StatusCode};
use tracing::debug;

/// 一次请求的结果
#[derive(Debug, Clone)]
pub struct FetchResponse {
    pub status: StatusCode,
    pub body: String,
}

impl FetchResponse {
    /// 服务端的临时错误，值得等待后重试
    pub fn is_transient(&self) -> bool {
        is_transient_status(self.status)
    }
}

/// 429 / 500 / 502 / 503 / 504
pub fn is_transient_status(status: StatusCode) -> bool {
    matches!(
        status,
        StatusCode::TOO_MANY_REQUESTS
            | StatusCode::INTERNAL_SERVER_ERROR
            | StatusCode::BAD_GATEWAY
            | StatusCode::SERVICE_UNAVAILABLE
            | StatusCode::GATEWAY_TIMEOUT
    )
}

/// 测试页面客户端
pub struct PageClient {
    client: Client,
    base_url: String,
}

impl PageClient {
    /// 创建新的页面客户端
    pub fn new(config: &Config) -> AppResult<Self> {
        let client = Client::builder()
            .default_headers(default_headers(config)?)
            .timeout(config.request_timeout())
            .redirect(redirect::Policy::limited(config.max_redirects))
            .build()
            .map_err(|source| FetchError::ClientBuildFailed { source })?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    /// 页面地址
    pub fn url_for(&self, test_id: u64) -> String {
        format!("{}/{}", self.base_url, test_id)
    }

    /// 下载一个测试页面
    ///
    /// 非 2xx 状态码不算错误，由调用方根据 `status` 决定如何处理。
    pub async fn fetch(&self, test_id: u64) -> AppResult<FetchResponse> {
        let url = self.url_for(test_id);
        debug!("GET {}", url);

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| AppError::request_failed(url.clone(), e))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|source| FetchError::BodyReadFailed {
                url: url.clone(),
                source,
            })?;

        Ok(FetchResponse { status, body })
    }
}

fn default_headers(config: &Config) -> AppResult<HeaderMap> {
    let mut headers = HeaderMap::new();
    let mut put = |name: header::HeaderName, label: &'static str, value: &str| -> AppResult<()> {
        let value = HeaderValue::from_str(value)
            .map_err(|_| FetchError::InvalidHeader { name: label })?;
        headers.insert(name, value);
        Ok(())
    };

    put(header::USER_AGENT, "User-Agent", &config.user_agent)?;
    put(
        header::ACCEPT,
        "Accept",
        "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8",
    )?;
    put(
        header::ACCEPT_LANGUAGE,
        "Accept-Language",
        "ru-RU,ru;q=0.9,en-US;q=0.8,en;q=0.7",
    )?;
    put(header::REFERER, "Referer", &config.referer)?;
    if !config.cookie.is_empty() {
        put(header::COOKIE, "Cookie", &config.cookie)?;
    }

    Ok(headers)
}
