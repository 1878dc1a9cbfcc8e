//! Tool schema validity tests.
//!
//! Every registered tool must carry a description and an object schema
//! listing its parameters, with required parameters marked as such.

use serde_json::Value;

/// Validates that a JSON schema has the required structure.
fn validate_json_schema(schema: &Value) -> Result<(), String> {
    let obj = schema
        .as_object()
        .ok_or_else(|| "Schema must be an object".to_string())?;

    match obj.get("type") {
        Some(t) if t == "object" => {}
        other => return Err(format!("Expected type 'object', got {:?}", other)),
    }

    if !obj.get("properties").is_some_and(Value::is_object) {
        return Err("Properties must be an object".to_string());
    }

    Ok(())
}

/// Validates that a tool has required fields.
fn validate_tool(tool: &rmcp::model::Tool) -> Result<(), String> {
    if tool.name.is_empty() {
        return Err("Tool name cannot be empty".to_string());
    }

    if tool.description.as_ref().is_none_or(|d| d.is_empty()) {
        return Err(format!("Tool '{}' must have a description", tool.name));
    }

    let schema_value =
        serde_json::to_value(&*tool.input_schema).map_err(|e| format!("Failed to serialize schema: {}", e))?;
    validate_json_schema(&schema_value)
}

/// Names listed under `required` in a tool schema.
fn required_fields(tool: &rmcp::model::Tool) -> Vec<String> {
    tool.input_schema
        .get("required")
        .and_then(Value::as_array)
        .map(|r| r.iter().filter_map(|v| v.as_str().map(str::to_string)).collect())
        .unwrap_or_default()
}

fn tool_named(name: &str) -> rmcp::model::Tool {
    flux_mcp_image::server::tools()
        .into_iter()
        .find(|t| t.name == name)
        .unwrap_or_else(|| panic!("tool {} not registered", name))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_json_schema_validation() {
        let valid = serde_json::json!({
            "type": "object",
            "properties": {"prompt": {"type": "string"}},
            "required": ["prompt"]
        });
        assert!(validate_json_schema(&valid).is_ok());

        assert!(validate_json_schema(&serde_json::json!({"type": "string"})).is_err());
        assert!(validate_json_schema(&serde_json::json!("not an object")).is_err());
    }

    #[test]
    fn test_all_tools_are_valid() {
        for tool in flux_mcp_image::server::tools() {
            validate_tool(&tool).unwrap();
        }
    }

    #[test]
    fn test_generate_schema_requires_only_prompt() {
        let tool = tool_named("flux_generate");
        assert_eq!(required_fields(&tool), vec!["prompt".to_string()]);

        let properties = tool.input_schema.get("properties").unwrap();
        for field in ["prompt", "input_image", "guidance_scale"] {
            assert!(properties.get(field).is_some(), "missing property {}", field);
        }
    }

    #[test]
    fn test_edit_schema_requires_prompt_and_image() {
        let tool = tool_named("flux_edit_image");
        let mut required = required_fields(&tool);
        required.sort();
        assert_eq!(required, vec!["image_url".to_string(), "prompt".to_string()]);

        let properties = tool.input_schema.get("properties").unwrap();
        for field in ["aspect_ratio", "seed", "output_format"] {
            assert!(properties.get(field).is_some(), "missing property {}", field);
        }
    }

    proptest! {
        /// Any argument object matching the edit schema's shape deserializes.
        #[test]
        fn edit_arguments_matching_schema_deserialize(
            prompt in "[a-zA-Z ]{1,40}",
            image in "https://[a-z]{1,10}\\.test/[a-z]{1,8}\\.png",
            seed in proptest::option::of(any::<i64>()),
            png in any::<bool>(),
        ) {
            let format = if png { "png" } else { "jpeg" };
            let mut args = serde_json::json!({
                "prompt": prompt,
                "image_url": image,
                "output_format": format,
            });
            if let Some(seed) = seed {
                args["seed"] = seed.into();
            }

            let parsed: Result<flux_mcp_image::FluxEditParams, _> = serde_json::from_value(args);
            prop_assert!(parsed.is_ok());
        }
    }
}
