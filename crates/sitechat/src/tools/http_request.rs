//! Generic HTTP request tool

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::fmt;
use std::str::FromStr;

use super::{parse_args, Tool, ToolOutcome};
use crate::error::{Error, Result};

/// Methods the tool is allowed to send
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Delete,
}

impl FromStr for HttpMethod {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_uppercase().as_str() {
            "GET" => Ok(Self::Get),
            "POST" => Ok(Self::Post),
            "PUT" => Ok(Self::Put),
            "DELETE" => Ok(Self::Delete),
            other => Err(Error::InvalidArgument(format!(
                "Invalid HTTP method: {}. Supported methods are GET, POST, PUT, DELETE.",
                other
            ))),
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Delete => "DELETE",
        };
        f.write_str(name)
    }
}

/// Status and body of a completed request
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HttpResponse {
    pub status_code: u16,
    /// Body as text, `"No content"` when empty
    pub content: String,
}

/// Send a request; POST and PUT carry `data` as a JSON body.
///
/// An unknown method is rejected before any network traffic. Transport
/// failures are returned as `ToolOutcome::Failed`; any HTTP status counts as
/// a completed request.
pub async fn http_request(
    client: &Client,
    url: &str,
    method: &str,
    data: Option<&Value>,
) -> Result<ToolOutcome<HttpResponse>> {
    let method: HttpMethod = method.parse()?;

    let request = match method {
        HttpMethod::Get => client.get(url),
        HttpMethod::Delete => client.delete(url),
        HttpMethod::Post => client.post(url),
        HttpMethod::Put => client.put(url),
    };
    let request = match (method, data) {
        (HttpMethod::Post | HttpMethod::Put, Some(body)) => request.json(body),
        _ => request,
    };

    tracing::debug!("{} {}", method, url);

    let response = match request.send().await {
        Ok(response) => response,
        Err(e) => return Ok(ToolOutcome::Failed(format!("HTTP request failed: {}", e))),
    };

    let status_code = response.status().as_u16();
    let body = match response.bytes().await {
        Ok(body) => body,
        Err(e) => return Ok(ToolOutcome::Failed(format!("HTTP request failed: {}", e))),
    };

    let content = if body.is_empty() {
        "No content".to_string()
    } else {
        String::from_utf8_lossy(&body).into_owned()
    };

    Ok(ToolOutcome::Ok(HttpResponse {
        status_code,
        content,
    }))
}

#[derive(Deserialize)]
struct HttpArgs {
    url: String,
    method: String,
    #[serde(default)]
    data: Option<Value>,
}

/// `http_tool`: lets the agent call URLs, e.g. a lead submission URL
pub struct HttpTool {
    client: Client,
}

impl HttpTool {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Tool for HttpTool {
    fn name(&self) -> &str {
        "http_tool"
    }

    fn description(&self) -> &str {
        "Sends an HTTP request (GET, POST, PUT, DELETE) to a given URL and returns the status \
         code and content. POST and PUT send `data` as a JSON body. Do not use this tool when \
         no URL is available."
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "url": {"type": "string", "description": "Absolute URL to call"},
                "method": {"type": "string", "enum": ["GET", "POST", "PUT", "DELETE"]},
                "data": {"type": "object", "description": "JSON body for POST and PUT"}
            },
            "required": ["url", "method"]
        })
    }

    async fn call(&self, args: Value) -> Result<String> {
        let args: HttpArgs = parse_args(self.name(), args)?;

        match http_request(&self.client, &args.url, &args.method, args.data.as_ref()).await? {
            ToolOutcome::Ok(response) => Ok(serde_json::to_string(&response)?),
            ToolOutcome::Failed(message) => Ok(message),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn test_method_parsing() {
        assert_eq!("get".parse::<HttpMethod>().unwrap(), HttpMethod::Get);
        assert_eq!("Delete".parse::<HttpMethod>().unwrap(), HttpMethod::Delete);
        assert!(matches!(
            "PATCH".parse::<HttpMethod>(),
            Err(Error::InvalidArgument(_))
        ));
    }

    #[tokio::test]
    async fn test_invalid_method_sends_nothing() {
        let server = MockServer::start().await;
        Mock::given(wiremock::matchers::any())
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let err = http_request(&Client::new(), &server.uri(), "patch", None)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::InvalidArgument(_)));
    }

    #[tokio::test]
    async fn test_post_json_and_empty_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/leads"))
            .and(body_json(json!({"email": "a@example.com"})))
            .respond_with(ResponseTemplate::new(201))
            .mount(&server)
            .await;

        let data = json!({"email": "a@example.com"});
        let outcome = http_request(
            &Client::new(),
            &format!("{}/leads", server.uri()),
            "post",
            Some(&data),
        )
        .await
        .unwrap();

        assert_eq!(
            outcome,
            ToolOutcome::Ok(HttpResponse {
                status_code: 201,
                content: "No content".to_string()
            })
        );
    }

    #[tokio::test]
    async fn test_error_status_is_not_a_failure() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404).set_body_string("missing"))
            .mount(&server)
            .await;

        let outcome = http_request(&Client::new(), &server.uri(), "GET", None)
            .await
            .unwrap();
        assert_eq!(
            outcome,
            ToolOutcome::Ok(HttpResponse {
                status_code: 404,
                content: "missing".to_string()
            })
        );
    }

    #[tokio::test]
    async fn test_transport_failure_is_soft() {
        let outcome = http_request(&Client::new(), "http://127.0.0.1:1/", "GET", None)
            .await
            .unwrap();
        match outcome {
            ToolOutcome::Failed(message) => assert!(message.starts_with("HTTP request failed:")),
            other => panic!("expected failure, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_tool_renders_json() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("ok"))
            .mount(&server)
            .await;

        let tool = HttpTool::new(Client::new());
        let out = tool
            .call(json!({"url": server.uri(), "method": "GET"}))
            .await
            .unwrap();
        assert_eq!(out, r#"{"status_code":200,"content":"ok"}"#);
    }
}
