//! Output format tests.
//!
//! Every tool call, successful or not, returns exactly one text item holding
//! a JSON object whose `status` agrees with the result's `is_error` flag.

use rmcp::model::{CallToolResult, RawContent};
use serde_json::Value;

/// Parse and check the JSON body of a tool result.
pub fn validate_tool_result(result: &CallToolResult) -> Result<Value, String> {
    if result.content.len() != 1 {
        return Err(format!("Expected exactly one content item, got {}", result.content.len()));
    }

    let text = match &result.content[0].raw {
        RawContent::Text(text) => &text.text,
        other => return Err(format!("Expected text content, got {:?}", other)),
    };

    let body: Value = serde_json::from_str(text).map_err(|e| format!("Content is not JSON: {}", e))?;
    let is_error = result.is_error.unwrap_or(false);

    match body.get("status").and_then(Value::as_str) {
        Some("success") if !is_error => Ok(body),
        Some("error") if is_error => {
            if body.get("message").and_then(Value::as_str).is_some_and(|m| !m.is_empty()) {
                Ok(body)
            } else {
                Err("Error result must carry a message".to_string())
            }
        }
        other => Err(format!("status {:?} disagrees with is_error={}", other, is_error)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use flux_mcp_common::{Config, Error, Result as FluxResult};
    use flux_mcp_image::{
        FluxEditParams, FluxGenerateParams, FluxServer, GenerationMeta, GenerationOutput, ImageGenerator, OutputFormat,
    };
    use proptest::prelude::*;
    use rmcp::model::Content;
    use std::sync::Arc;

    /// Succeeds for generation, times out for edits.
    struct CannedGenerator;

    #[async_trait]
    impl ImageGenerator for CannedGenerator {
        async fn generate(&self, prompt: &str, _input: Option<&str>, _scale: Option<f64>) -> FluxResult<GenerationOutput> {
            Ok(GenerationOutput {
                image_url: format!("https://delivery.test/{}.jpg", prompt.len()),
                meta: GenerationMeta {
                    request_id: "req".to_string(),
                    model: "flux-pro-1.1".to_string(),
                    operation: None,
                    original_image: None,
                    result: serde_json::json!({"prompt": prompt}),
                },
            })
        }

        async fn edit_image(
            &self,
            _prompt: &str,
            _image_url: &str,
            _aspect_ratio: Option<&str>,
            _seed: Option<i64>,
            _output_format: OutputFormat,
        ) -> FluxResult<GenerationOutput> {
            Err(Error::poll_timeout("req", 180.0))
        }
    }

    fn canned_server() -> FluxServer {
        FluxServer::with_generator(Config::default(), Arc::new(CannedGenerator))
    }

    #[test]
    fn test_validator_rejects_mismatched_flag() {
        let result = CallToolResult::error(vec![Content::text(r#"{"status":"success"}"#)]);
        assert!(validate_tool_result(&result).is_err());

        let result = CallToolResult::success(vec![Content::text("plain text")]);
        assert!(validate_tool_result(&result).is_err());
    }

    #[tokio::test]
    async fn test_generate_success_output() {
        let result = canned_server()
            .generate(FluxGenerateParams {
                prompt: "a kite".to_string(),
                input_image: None,
                guidance_scale: None,
            })
            .await
            .unwrap();

        let body = validate_tool_result(&result).unwrap();
        assert_eq!(body["image"], "https://delivery.test/6.jpg");
        assert_eq!(body["meta"]["request_id"], "req");
        assert_eq!(body["meta"]["result"]["prompt"], "a kite");
    }

    #[tokio::test]
    async fn test_edit_failure_output() {
        let result = canned_server()
            .edit_image(FluxEditParams {
                prompt: "p".to_string(),
                image_url: "https://x.test/a.png".to_string(),
                aspect_ratio: None,
                seed: None,
                output_format: OutputFormat::Jpeg,
            })
            .await
            .unwrap();

        let body = validate_tool_result(&result).unwrap();
        assert!(body["message"].as_str().unwrap().contains("timed out"));
    }

    proptest! {
        /// Any accepted prompt yields a well-formed success result.
        #[test]
        fn generate_output_is_well_formed(prompt in "[a-zA-Z0-9 ]{0,30}[a-zA-Z0-9]") {
            let runtime = tokio::runtime::Runtime::new().unwrap();
            let result = runtime
                .block_on(canned_server().generate(FluxGenerateParams {
                    prompt: prompt.clone(),
                    input_image: None,
                    guidance_scale: None,
                }))
                .unwrap();

            let body = validate_tool_result(&result);
            prop_assert!(body.is_ok(), "{:?}", body.err());
        }
    }
}
