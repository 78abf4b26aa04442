//! Subcommand implementations

use std::collections::HashMap;
use std::path::Path;

use graph_flow::Context;
use node_engine::{ExecutorExtensions, NodeRegistry, PortOptionsQuery};
use powerpack_nodes::ImageBatch;
use serde_json::Value;

use crate::cli::RunArgs;
use crate::error::{CliError, Result};

/// One line per node type, grouped by category
pub fn list(registry: &NodeRegistry) -> String {
    let mut lines = Vec::new();
    let mut categories: Vec<_> = registry.metadata_by_category().into_iter().collect();
    categories.sort_by_key(|(category, _)| category.menu_path());

    for (category, mut nodes) in categories {
        nodes.sort_by(|a, b| a.node_type.cmp(&b.node_type));
        lines.push(category.menu_path().to_string());
        for meta in nodes {
            lines.push(format!("  {:<32} {}", meta.node_type, meta.label));
        }
    }
    lines.join("\n")
}

pub fn describe(registry: &NodeRegistry, node_type: &str) -> Result<String> {
    let meta = registry
        .get_metadata(node_type)
        .ok_or_else(|| CliError::UnknownNodeType(node_type.to_string()))?;
    Ok(serde_json::to_string_pretty(meta)?)
}

pub async fn options(
    registry: &NodeRegistry,
    extensions: &ExecutorExtensions,
    node_type: &str,
    port: &str,
    query: PortOptionsQuery,
) -> Result<String> {
    if !registry.has_node_type(node_type) {
        return Err(CliError::UnknownNodeType(node_type.to_string()));
    }
    let result = registry
        .query_port_options(node_type, port, &query, extensions)
        .await?;
    match result {
        Some(result) => Ok(result
            .options
            .iter()
            .map(|o| o.label.as_str())
            .collect::<Vec<_>>()
            .join("\n")),
        None => Err(CliError::InvalidInputs(format!(
            "{node_type}.{port} has no dynamic options"
        ))),
    }
}

/// Parse the `--inputs` / `--inputs-file` object into a port map
pub fn parse_inputs(text: Option<&str>) -> Result<HashMap<String, Value>> {
    let Some(text) = text.map(str::trim).filter(|t| !t.is_empty()) else {
        return Ok(HashMap::new());
    };
    match serde_json::from_str::<Value>(text)? {
        Value::Object(map) => Ok(map.into_iter().collect()),
        other => Err(CliError::InvalidInputs(format!(
            "expected a JSON object, got {other}"
        ))),
    }
}

/// Decode an image file into a single-image float batch
pub fn load_image(path: &Path) -> Result<ImageBatch> {
    let image_error = |reason: String| CliError::Image {
        path: path.display().to_string(),
        reason,
    };
    let decoded = image::open(path).map_err(|e| image_error(e.to_string()))?;

    let (width, height, channels, bytes) = if decoded.color().has_alpha() {
        let rgba = decoded.to_rgba8();
        (rgba.width(), rgba.height(), 4, rgba.into_raw())
    } else {
        let rgb = decoded.to_rgb8();
        (rgb.width(), rgb.height(), 3, rgb.into_raw())
    };

    let data = bytes.iter().map(|b| f32::from(*b) / 255.0).collect();
    ImageBatch::new(1, height as usize, width as usize, channels, data)
        .map_err(|e| image_error(e.to_string()))
}

pub async fn run(
    registry: &NodeRegistry,
    extensions: &ExecutorExtensions,
    args: &RunArgs,
) -> Result<String> {
    if !registry.has_node_type(&args.node_type) {
        return Err(CliError::UnknownNodeType(args.node_type.clone()));
    }

    let text = match &args.inputs_file {
        Some(path) => Some(std::fs::read_to_string(path)?),
        None => args.inputs.clone(),
    };
    let mut inputs = parse_inputs(text.as_deref())?;
    if let Some(path) = &args.image {
        inputs.insert("image".to_string(), serde_json::to_value(load_image(path)?)?);
    }

    let executor = registry.get_executor(&args.node_type)?;
    let outputs = executor
        .execute(&args.task_id, inputs, &Context::new(), extensions)
        .await?;

    let sorted: std::collections::BTreeMap<_, _> = outputs.into_iter().collect();
    Ok(serde_json::to_string_pretty(&sorted)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use powerpack_nodes::{build_registry, setup_extensions, PowerpackConfig};
    use serde_json::json;
    use tempfile::tempdir;

    fn run_args(node_type: &str, inputs: &str) -> RunArgs {
        RunArgs {
            node_type: node_type.to_string(),
            inputs: Some(inputs.to_string()),
            inputs_file: None,
            image: None,
            task_id: "node".to_string(),
        }
    }

    #[test]
    fn test_parse_inputs() {
        assert!(parse_inputs(None).unwrap().is_empty());
        assert!(parse_inputs(Some("  ")).unwrap().is_empty());
        let inputs = parse_inputs(Some(r#"{"width": 500}"#)).unwrap();
        assert_eq!(inputs["width"], json!(500));
        assert!(matches!(
            parse_inputs(Some("[1, 2]")),
            Err(CliError::InvalidInputs(_))
        ));
    }

    #[test]
    fn test_list_and_describe() {
        let registry = build_registry();
        let listing = list(&registry);
        assert!(listing.contains("power-lora-selector"));
        assert!(listing.contains("PowerPack/Save"));

        let descriptor = describe(&registry, "power-res").unwrap();
        assert!(descriptor.contains("\"batch_size\""));
        assert!(matches!(
            describe(&registry, "nope"),
            Err(CliError::UnknownNodeType(_))
        ));
    }

    #[tokio::test]
    async fn test_run_power_res() {
        let dir = tempdir().unwrap();
        let mut extensions = ExecutorExtensions::new();
        setup_extensions(
            &mut extensions,
            PowerpackConfig {
                presets_dir: dir.path().to_path_buf(),
                ..PowerpackConfig::default()
            },
        );

        let registry = build_registry();
        let output = run(
            &registry,
            &extensions,
            &run_args("power-res", r#"{"width": 500, "height": 10, "manual_override": true}"#),
        )
        .await
        .unwrap();

        let value: Value = serde_json::from_str(&output).unwrap();
        assert_eq!(value["width"], json!(504));
        assert_eq!(value["height"], json!(64));
    }

    #[tokio::test]
    async fn test_run_save_with_image_file() {
        let dir = tempdir().unwrap();
        let source = dir.path().join("source.png");
        image::RgbImage::from_pixel(4, 4, image::Rgb([10, 20, 30]))
            .save(&source)
            .unwrap();

        let mut extensions = ExecutorExtensions::new();
        setup_extensions(
            &mut extensions,
            PowerpackConfig {
                output_dir: dir.path().join("out"),
                ..PowerpackConfig::default()
            },
        );

        let mut args = run_args("power-save-image", r#"{"share_output_path": "cli"}"#);
        args.image = Some(source);
        run(&build_registry(), &extensions, &args).await.unwrap();

        let written: Vec<_> = std::fs::read_dir(dir.path().join("out/cli"))
            .unwrap()
            .collect();
        assert_eq!(written.len(), 1);
    }
}
