#![allow(dead_code)]

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use techne_ai::{
    AiError, Capabilities, ChatRequest, Config, GeneratedImage, ImageData, ImageGeneration,
    ImageRequest, LLMProvider, Message, NetworkError, NetworkFailure, Orchestrator, ProviderReply,
    ProviderRegistry, Usage,
};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;

/// What a scripted provider does on its next call.
pub enum Step {
    Reply(&'static str),
    Upstream(u16, &'static str),
    Refused,
}

#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub message: String,
    pub model: String,
    pub system_message: String,
    pub temperature: f32,
    pub max_tokens: u32,
    pub history: Vec<Message>,
}

/// In-process provider that replays a script and records every request.
pub struct ScriptedProvider {
    name: &'static str,
    images: bool,
    script: Mutex<VecDeque<Step>>,
    calls: Mutex<Vec<RecordedCall>>,
}

impl ScriptedProvider {
    pub fn new(name: &'static str) -> Arc<Self> {
        Arc::new(Self {
            name,
            images: false,
            script: Mutex::new(VecDeque::new()),
            calls: Mutex::new(Vec::new()),
        })
    }

    pub fn with_images(name: &'static str) -> Arc<Self> {
        Arc::new(Self {
            name,
            images: true,
            script: Mutex::new(VecDeque::new()),
            calls: Mutex::new(Vec::new()),
        })
    }

    pub fn push(&self, step: Step) {
        self.script.lock().unwrap().push_back(step);
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn last_call(&self) -> RecordedCall {
        self.calls().pop().expect("provider was never called")
    }
}

#[async_trait]
impl LLMProvider for ScriptedProvider {
    fn name(&self) -> &str {
        self.name
    }

    fn available_models(&self) -> Vec<String> {
        vec![
            format!("{}-large", self.name),
            format!("{}-small", self.name),
        ]
    }

    fn default_model(&self) -> &str {
        match self.name {
            "openai" => "openai-large",
            "local" => "local-large",
            "anthropic" => "anthropic-large",
            _ => "scripted-default",
        }
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities {
            image_generation: self.images,
        }
    }

    async fn send_message(&self, request: &ChatRequest<'_>) -> Result<ProviderReply, AiError> {
        self.calls.lock().unwrap().push(RecordedCall {
            message: request.message.to_string(),
            model: request.model.to_string(),
            system_message: request.system_message.to_string(),
            temperature: request.temperature,
            max_tokens: request.max_tokens,
            history: request.conversation_history.to_vec(),
        });

        let step = self.script.lock().unwrap().pop_front();
        match step {
            None => Ok(ProviderReply {
                content: format!("echo: {}", request.message),
                model: request.model.to_string(),
                usage: Some(Usage::new(Some(3), Some(2))),
            }),
            Some(Step::Reply(text)) => Ok(ProviderReply {
                content: text.to_string(),
                model: request.model.to_string(),
                usage: None,
            }),
            Some(Step::Upstream(status, body)) => Err(AiError::Upstream {
                provider: self.name.to_string(),
                status,
                body: body.to_string(),
            }),
            Some(Step::Refused) => Err(AiError::Network(
                NetworkError::new(
                    self.name,
                    "http://localhost:1234/v1",
                    NetworkFailure::ConnectionRefused,
                    "tcp connect error",
                )
                .local(),
            )),
        }
    }

    async fn generate_image(&self, request: &ImageRequest<'_>) -> Result<ImageGeneration, AiError> {
        if !self.images {
            return Err(AiError::Capability {
                provider: self.name.to_string(),
                operation: "image generation",
            });
        }
        Ok(ImageGeneration {
            images: (0..request.count)
                .map(|_| GeneratedImage {
                    mime_type: "image/png".to_string(),
                    data: ImageData::Base64("aGVsbG8=".to_string()),
                })
                .collect(),
            provider: self.name.to_string(),
            model: request.model.to_string(),
        })
    }

    fn default_image_model(&self) -> Option<&str> {
        self.images.then_some("image-model")
    }
}

pub fn orchestrator_with(providers: &[Arc<ScriptedProvider>], config: Config) -> Orchestrator {
    let mut registry = ProviderRegistry::new(config.auto_preference());
    for provider in providers {
        registry.register(provider.name, provider.clone());
    }
    Orchestrator::with_registry(registry, config)
}

/// How the stub server answers one connection.
pub enum Reply {
    Json(u16, String),
    /// Read the request, then hang up without answering.
    Hangup,
    /// Answer after a pause.
    Delayed(Duration, u16, String),
}

/// A one-request-per-connection HTTP/1.1 responder on 127.0.0.1.
pub struct StubServer {
    pub base_url: String,
    requests: Arc<Mutex<Vec<String>>>,
    handle: JoinHandle<()>,
}

impl StubServer {
    pub async fn start(replies: Vec<Reply>) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let requests = Arc::new(Mutex::new(Vec::new()));
        let seen = requests.clone();

        let handle = tokio::spawn(async move {
            for reply in replies {
                let Ok((mut socket, _)) = listener.accept().await else {
                    return;
                };
                let raw = read_request(&mut socket).await;
                seen.lock().unwrap().push(raw);
                match reply {
                    Reply::Json(status, body) => write_response(&mut socket, status, &body).await,
                    Reply::Hangup => drop(socket),
                    Reply::Delayed(pause, status, body) => {
                        tokio::time::sleep(pause).await;
                        write_response(&mut socket, status, &body).await;
                    }
                }
            }
        });

        Self {
            base_url: format!("http://{}", addr),
            requests,
            handle,
        }
    }

    /// Raw requests (head and body) in arrival order.
    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }

    /// JSON body of the `index`th request.
    pub fn body(&self, index: usize) -> serde_json::Value {
        let raw = &self.requests()[index];
        let body = raw.split_once("\r\n\r\n").map(|(_, b)| b).unwrap_or_default();
        serde_json::from_str(body).unwrap()
    }
}

impl Drop for StubServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

async fn read_request(socket: &mut TcpStream) -> String {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];
    loop {
        let n = socket.read(&mut chunk).await.unwrap_or(0);
        if n == 0 {
            break;
        }
        buf.extend_from_slice(&chunk[..n]);
        let text = String::from_utf8_lossy(&buf);
        if let Some((head, body)) = text.split_once("\r\n\r\n") {
            let length = head
                .lines()
                .find_map(|line| {
                    let (name, value) = line.split_once(':')?;
                    name.eq_ignore_ascii_case("content-length")
                        .then(|| value.trim().parse::<usize>().ok())
                        .flatten()
                })
                .unwrap_or(0);
            if body.len() >= length {
                break;
            }
        }
    }
    String::from_utf8_lossy(&buf).into_owned()
}

async fn write_response(socket: &mut TcpStream, status: u16, body: &str) {
    let response = format!(
        "HTTP/1.1 {} Stub\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
        status,
        body.len(),
        body
    );
    let _ = socket.write_all(response.as_bytes()).await;
    let _ = socket.shutdown().await;
}

/// A localhost port with nothing listening on it.
pub async fn closed_port() -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    listener.local_addr().unwrap().port()
}

pub fn chat_completion(content: &str, model: &str) -> String {
    serde_json::json!({
        "id": "chatcmpl-1",
        "object": "chat.completion",
        "model": model,
        "choices": [{
            "index": 0,
            "message": {"role": "assistant", "content": content},
            "finish_reason": "stop"
        }],
        "usage": {"prompt_tokens": 12, "completion_tokens": 5, "total_tokens": 17}
    })
    .to_string()
}
