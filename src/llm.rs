//! Programming questions answered by a hosted language model.
//!
//! [`Gemini`] talks to the `generateContent` REST endpoint with a blocking
//! client. [`ProgrammingHelper`] wraps whatever [`Completion`] is available
//! and always produces something to say back.

use std::time::Duration;

use log::{debug, error};
use serde::{Deserialize, Serialize};

use crate::config::LlmConfig;
use crate::error::{Error, Result};

/// A text completion service.
pub trait Completion {
    fn complete(&self, prompt: &str) -> Result<String>;
}

#[derive(Serialize)]
struct GenerateRequest<'a> {
    contents: Vec<Content<'a>>,
}

#[derive(Serialize)]
struct Content<'a> {
    parts: Vec<RequestPart<'a>>,
}

#[derive(Serialize)]
struct RequestPart<'a> {
    text: &'a str,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    #[serde(default)]
    text: String,
}

impl GenerateResponse {
    /// Text of the first candidate, all parts concatenated.
    fn text(self) -> Result<String> {
        let text: String = self
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .map(|c| c.parts.into_iter().map(|p| p.text).collect())
            .unwrap_or_default();
        if text.trim().is_empty() {
            return Err(Error::Llm("Response contained no text".to_string()));
        }
        Ok(text)
    }
}

/// Google Gemini client.
pub struct Gemini {
    client: reqwest::blocking::Client,
    api_key: String,
    url: String,
}

impl Gemini {
    /// Creates a client for the configured model.
    ///
    /// # Errors
    ///
    /// Returns error if the API key is empty or the HTTP client cannot be built
    pub fn new(api_key: String, config: &LlmConfig) -> Result<Self> {
        if api_key.trim().is_empty() {
            return Err(Error::Config(format!(
                "{} is not set",
                config.api_key_env
            )));
        }
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self {
            client,
            api_key,
            url: format!(
                "{}/models/{}:generateContent",
                config.endpoint.trim_end_matches('/'),
                config.model
            ),
        })
    }

    /// Reads the API key from the environment variable named in the config.
    pub fn from_env(config: &LlmConfig) -> Result<Self> {
        let api_key = std::env::var(&config.api_key_env)
            .map_err(|_| Error::Config(format!("{} is not set", config.api_key_env)))?;
        Self::new(api_key, config)
    }
}

impl Completion for Gemini {
    fn complete(&self, prompt: &str) -> Result<String> {
        debug!(
            "Sending {} characters to {}",
            prompt.len(),
            self.url
        );
        let request = GenerateRequest {
            contents: vec![Content {
                parts: vec![RequestPart { text: prompt }],
            }],
        };
        let response = self
            .client
            .post(&self.url)
            .header("x-goog-api-key", &self.api_key)
            .json(&request)
            .send()?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            error!("Gemini API error {status}: {body}");
            return Err(Error::Llm(format!("Gemini API error {status}")));
        }

        let response: GenerateResponse = response.json()?;
        response.text()
    }
}

pub const NOT_INITIALIZED: &str = "Sorry, the programming help module is not initialized.";

/// Wraps a programming question in the instruction template.
pub fn programming_prompt(question: &str) -> String {
    format!("Expert programmer assistant. Answer concisely. Question: {question}")
}

/// Answers programming questions, degrading to an apology.
pub struct ProgrammingHelper {
    model: Option<Box<dyn Completion>>,
}

impl ProgrammingHelper {
    pub fn new(model: Box<dyn Completion>) -> Self {
        Self { model: Some(model) }
    }

    /// A helper that only ever answers with [`NOT_INITIALIZED`].
    pub fn disabled() -> Self {
        Self { model: None }
    }

    pub fn answer(&self, question: &str) -> String {
        let Some(model) = &self.model else {
            return NOT_INITIALIZED.to_string();
        };
        match model.complete(&programming_prompt(question)) {
            Ok(answer) => answer,
            Err(err) => {
                error!("Programming question failed: {err}");
                format!("Sorry, I couldn't get an answer. Error: {err}")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    struct Echo {
        prompts: Rc<RefCell<Vec<String>>>,
    }

    impl Completion for Echo {
        fn complete(&self, prompt: &str) -> Result<String> {
            self.prompts.borrow_mut().push(prompt.to_string());
            Ok("Use a HashMap.".to_string())
        }
    }

    struct Broken;

    impl Completion for Broken {
        fn complete(&self, _prompt: &str) -> Result<String> {
            Err(Error::Llm("quota exceeded".to_string()))
        }
    }

    #[test]
    fn test_answer_wraps_question() {
        let prompts = Rc::new(RefCell::new(Vec::new()));
        let helper = ProgrammingHelper::new(Box::new(Echo {
            prompts: prompts.clone(),
        }));
        assert_eq!(helper.answer("explain hash maps"), "Use a HashMap.");
        assert_eq!(
            prompts.borrow().as_slice(),
            ["Expert programmer assistant. Answer concisely. Question: explain hash maps"]
        );
    }

    #[test]
    fn test_disabled_helper_apologizes() {
        assert_eq!(ProgrammingHelper::disabled().answer("what is rust"), NOT_INITIALIZED);
    }

    #[test]
    fn test_failure_is_spoken() {
        let helper = ProgrammingHelper::new(Box::new(Broken));
        assert_eq!(
            helper.answer("code for fizzbuzz"),
            "Sorry, I couldn't get an answer. Error: Language model error: quota exceeded"
        );
    }

    #[test]
    fn test_empty_api_key_is_rejected() {
        let result = Gemini::new("  ".to_string(), &LlmConfig::default());
        assert!(matches!(result, Err(Error::Config(msg)) if msg == "GEMINI_API_KEY is not set"));
    }

    #[test]
    fn test_request_body() {
        let request = GenerateRequest {
            contents: vec![Content {
                parts: vec![RequestPart { text: "hi" }],
            }],
        };
        assert_eq!(
            serde_json::to_value(&request).unwrap(),
            serde_json::json!({"contents": [{"parts": [{"text": "hi"}]}]})
        );
    }

    #[test]
    fn test_response_text() {
        let body = r#"{
            "candidates": [{
                "content": {"parts": [{"text": "A closure "}, {"text": "captures its environment."}], "role": "model"},
                "finishReason": "STOP"
            }],
            "usageMetadata": {"totalTokenCount": 12}
        }"#;
        let response: GenerateResponse = serde_json::from_str(body).unwrap();
        assert_eq!(response.text().unwrap(), "A closure captures its environment.");
    }

    #[test]
    fn test_blocked_response_is_error() {
        let body = r#"{"promptFeedback": {"blockReason": "SAFETY"}}"#;
        let response: GenerateResponse = serde_json::from_str(body).unwrap();
        assert!(matches!(response.text(), Err(Error::Llm(_))));
    }

    #[test]
    fn test_url() {
        let gemini = Gemini::new("key".to_string(), &LlmConfig::default()).unwrap();
        assert_eq!(
            gemini.url,
            "https://generativelanguage.googleapis.com/v1beta/models/gemini-2.5-pro:generateContent"
        );
    }
}
