//! Input parameter validation tests.
//!
//! Invalid tool input must be rejected with field-level details before any
//! request leaves the process, and surface as an error tool result.

#[cfg(test)]
mod tests {
    use flux_mcp_common::Config;
    use flux_mcp_image::{EditResponse, FluxEditParams, FluxGenerateParams, FluxServer, GenerateResponse, OutputFormat};
    use proptest::prelude::*;

    fn edit(prompt: &str, image_url: &str, aspect_ratio: Option<&str>) -> FluxEditParams {
        FluxEditParams {
            prompt: prompt.to_string(),
            image_url: image_url.to_string(),
            aspect_ratio: aspect_ratio.map(str::to_string),
            seed: None,
            output_format: OutputFormat::Jpeg,
        }
    }

    #[test]
    fn test_generate_params_reject_blank_prompt() {
        let params = FluxGenerateParams {
            prompt: "\t \n".to_string(),
            input_image: None,
            guidance_scale: None,
        };
        let errors = params.validate().unwrap_err();
        assert!(errors.iter().any(|e| e.field == "prompt"));
    }

    #[test]
    fn test_generate_params_reject_non_positive_guidance() {
        for scale in [0.0, -1.0, f64::INFINITY] {
            let params = FluxGenerateParams {
                prompt: "a cat".to_string(),
                input_image: None,
                guidance_scale: Some(scale),
            };
            let errors = params.validate().unwrap_err();
            assert!(errors.iter().any(|e| e.field == "guidance_scale"), "scale {}", scale);
        }
    }

    #[test]
    fn test_edit_params_reject_malformed_aspect_ratio() {
        for ratio in ["16x9", "16:", ":9", "wide", "0:1"] {
            let errors = edit("p", "https://x.test/a.png", Some(ratio)).validate().unwrap_err();
            assert!(errors.iter().any(|e| e.field == "aspect_ratio"), "ratio {}", ratio);
        }
        assert!(edit("p", "https://x.test/a.png", Some("21:9")).validate().is_ok());
    }

    #[tokio::test]
    async fn test_invalid_input_without_key_is_error_result() {
        let server = FluxServer::new(Config::default());
        let result = server.edit_image(edit("", "", None)).await.unwrap();
        assert_eq!(result.is_error, Some(true));
    }

    #[tokio::test]
    async fn test_validation_messages_name_the_field() {
        let config = Config {
            api_key: Some("key".to_string()),
            ..Config::default()
        };
        let handler = flux_mcp_image::FluxHandler::new(&config).unwrap();
        match handler.generate(FluxGenerateParams {
            prompt: String::new(),
            input_image: None,
            guidance_scale: None,
        })
        .await
        {
            GenerateResponse::Error { message } => assert!(message.contains("prompt")),
            other => panic!("expected error, got {:?}", other),
        }

        match handler.edit_image(edit("hat", "", None)).await {
            EditResponse::Error { message } => assert!(message.contains("image_url")),
            other => panic!("expected error, got {:?}", other),
        }
    }

    proptest! {
        /// Whitespace-only prompts are always rejected.
        #[test]
        fn blank_prompts_rejected(prompt in "[ \\t\\n]{0,10}") {
            let params = FluxGenerateParams { prompt, input_image: None, guidance_scale: None };
            prop_assert!(params.validate().is_err());
        }

        /// Well-formed ratios and non-empty inputs pass validation.
        #[test]
        fn well_formed_edit_params_accepted(
            prompt in "[a-z]{1,20}",
            w in 1u32..50,
            h in 1u32..50,
        ) {
            let ratio = format!("{}:{}", w, h);
            prop_assert!(edit(&prompt, "data:image/png;base64,AA==", Some(&ratio)).validate().is_ok());
        }
    }
}
