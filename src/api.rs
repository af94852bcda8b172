use reqwest::{Client, ClientBuilder};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::time::sleep;
use tracing::{info, warn};

use crate::config::{ApiConfig, ProcessingConfig};
use crate::error::{PipelineError, Result};

// OpenRouter API 响应结构
#[derive(Debug, Deserialize)]
pub struct OpenRouterResponse {
    pub choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
pub struct Choice {
    pub message: Message,
}

#[derive(Debug, Deserialize)]
pub struct Message {
    pub content: String,
}

#[derive(Debug, Serialize)]
pub struct OpenRouterRequest {
    pub model: String,
    pub messages: Vec<RequestMessage>,
    pub max_tokens: u32,
    pub temperature: f32,
}

#[derive(Debug, Serialize)]
pub struct RequestMessage {
    pub role: String,
    pub content: String,
}

pub struct ApiClient {
    client: Client,
    api: ApiConfig,
    processing: ProcessingConfig,
}

impl ApiClient {
    pub fn new(api: ApiConfig, processing: ProcessingConfig) -> Result<Self> {
        let client = ClientBuilder::new()
            .timeout(Duration::from_secs(processing.request_timeout_seconds))
            .build()?;

        Ok(ApiClient {
            client,
            api,
            processing,
        })
    }

    pub fn has_api_key(&self) -> bool {
        !self.api.openrouter_key.trim().is_empty()
    }

    pub fn model(&self) -> &str {
        &self.api.models.tokenizer_model
    }

    /// 发送单条用户消息，返回模型回复的文本
    pub async fn chat(&self, prompt: String, max_tokens: u32) -> Result<String> {
        let request = OpenRouterRequest {
            model: self.model().to_string(),
            messages: vec![RequestMessage {
                role: "user".to_string(),
                content: prompt,
            }],
            max_tokens,
            temperature: 0.1,
        };

        let response = self.make_request_with_retry(&request).await?;
        response
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content)
            .ok_or_else(|| PipelineError::Api("响应中没有 choices".to_string()))
    }

    // 带重试机制的API请求函数
    pub async fn make_request_with_retry(&self, request: &OpenRouterRequest) -> Result<OpenRouterResponse> {
        let url = format!("{}/chat/completions", self.api.base_url.trim_end_matches('/'));
        let mut last_error = None;

        for attempt in 0..=self.processing.max_retries {
            if attempt > 0 {
                let delay = Duration::from_millis(self.processing.request_delay_ms * (attempt as u64 + 1));
                info!("    ⏳ 重试 {}/{} 次，等待 {:?}...", attempt, self.processing.max_retries, delay);
                sleep(delay).await;
            }

            match self.client
                .post(&url)
                .header("Authorization", format!("Bearer {}", self.api.openrouter_key))
                .header("Content-Type", "application/json")
                .json(request)
                .send()
                .await
            {
                Ok(response) => {
                    if response.status().is_success() {
                        match response.json::<OpenRouterResponse>().await {
                            Ok(api_response) => {
                                if attempt > 0 {
                                    info!("    ✅ 重试成功！");
                                }
                                return Ok(api_response);
                            }
                            Err(e) => {
                                let error_msg = format!("JSON解析失败: {}", e);
                                warn!("    ❌ 尝试 {}: {}", attempt + 1, error_msg);
                                last_error = Some(PipelineError::Api(error_msg));
                            }
                        }
                    } else {
                        let status = response.status();
                        let error_text = response.text().await.unwrap_or_default();
                        let error_msg = format!("API请求失败 (状态码: {}): {}", status, error_text);
                        warn!("    ❌ 尝试 {}: {}", attempt + 1, error_msg);
                        last_error = Some(PipelineError::Api(error_msg));
                    }
                }
                Err(e) => {
                    warn!("    ❌ 尝试 {}: 网络请求失败: {}", attempt + 1, e);
                    last_error = Some(PipelineError::Http(e));
                }
            }
        }

        Err(last_error.unwrap_or_else(|| PipelineError::Api("所有重试都失败了".to_string())))
    }
}

/// 截取回复中第一个 '{' 到最后一个 '}' 之间的 JSON
pub fn extract_json_object(content: &str) -> &str {
    let json_start = content.find('{').unwrap_or(0);
    let json_end = content.rfind('}').map(|i| i + 1).unwrap_or(content.len());
    if json_start >= json_end {
        return content;
    }
    &content[json_start..json_end]
}
