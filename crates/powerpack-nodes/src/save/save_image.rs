//! Save Image Task
//!
//! Output node writing up to two artifacts per run into the sandboxed output
//! root: a lightweight share image and a full-flow PNG plus a JSON dump of the
//! host graph. Both directories are checked before anything is written.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Local};
use graph_flow::{Context, NextAction, Task, TaskResult};
use node_engine::{
    ExecutionMode, ExecutorExtensions, NodeCategory, PortDataType, PortMetadata, TaskDescriptor,
    TaskMetadata,
};
use serde_json::json;

use super::encode::{encode_jpeg, encode_png, Pixels};
use super::metadata::{GenerationParameters, HostGraph, WorkflowDump};
use super::paths::OutputSandbox;
use crate::config::PowerpackConfig;
use crate::error::Result;
use crate::inputs::NodeInputs;
use crate::setup::config_from;
use crate::tensor::ImageBatch;

/// Share artifact container
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ImageFormat {
    #[default]
    Png,
    Jpeg,
}

impl ImageFormat {
    /// Combo value; unknown values fall back to PNG
    pub fn parse(value: &str) -> Self {
        match value.trim().to_ascii_uppercase().as_str() {
            "JPEG" | "JPG" => Self::Jpeg,
            _ => Self::Png,
        }
    }

    fn extension(self) -> &'static str {
        match self {
            Self::Png => "png",
            Self::Jpeg => "jpg",
        }
    }
}

/// Everything one save needs
#[derive(Debug, Clone)]
pub struct SaveRequest {
    pub image: ImageBatch,
    pub share_output_path: String,
    pub full_output_path: String,
    pub save_share_image: bool,
    pub save_full_flow: bool,
    pub filename_prefix: String,
    pub format: ImageFormat,
    pub jpeg_quality: u8,
    pub parameters: GenerationParameters,
    pub graph: HostGraph,
}

impl SaveRequest {
    /// Request with widget defaults for `image`
    pub fn new(image: ImageBatch) -> Self {
        Self {
            image,
            share_output_path: "output/share".to_string(),
            full_output_path: "output/full".to_string(),
            save_share_image: true,
            save_full_flow: false,
            filename_prefix: "power".to_string(),
            format: ImageFormat::Png,
            jpeg_quality: 95,
            parameters: GenerationParameters::default(),
            graph: HostGraph::default(),
        }
    }
}

/// Paths written by one save
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SavedArtifacts {
    pub share: Option<PathBuf>,
    pub full_png: Option<PathBuf>,
    pub workflow_txt: Option<PathBuf>,
}

impl SavedArtifacts {
    pub fn count(&self) -> usize {
        [&self.share, &self.full_png, &self.workflow_txt]
            .iter()
            .filter(|p| p.is_some())
            .count()
    }
}

fn write_file(path: &Path, bytes: &[u8]) -> Result<()> {
    std::fs::write(path, bytes)?;
    Ok(())
}

/// Save Image Task
///
/// # Inputs (from context)
/// - `{task_id}.input.image` - [`ImageBatch`] to save (first element only)
/// - `{task_id}.input.share_output_path` / `full_output_path` - Directory templates
/// - `{task_id}.input.save_share_image` / `save_full_flow` - Artifact switches
/// - `{task_id}.input.filename_prefix`, `format`, `jpeg_quality`
/// - generation settings: `positive_prompt`, `negative_prompt`, `model_name`,
///   `seed`, `steps`, `cfg`, `sampler`, `scheduler`, `width`, `height`
/// - hidden, host-provided: `prompt`, `extra_pnginfo`
///
/// # Outputs
/// None. The result message lists the number of files written.
#[derive(Clone)]
pub struct SaveImageTask {
    task_id: String,
    sandbox: OutputSandbox,
}

impl SaveImageTask {
    pub const PORT_IMAGE: &'static str = "image";
    pub const PORT_SHARE_OUTPUT_PATH: &'static str = "share_output_path";
    pub const PORT_FULL_OUTPUT_PATH: &'static str = "full_output_path";
    pub const PORT_SAVE_SHARE_IMAGE: &'static str = "save_share_image";
    pub const PORT_SAVE_FULL_FLOW: &'static str = "save_full_flow";
    pub const PORT_FILENAME_PREFIX: &'static str = "filename_prefix";
    pub const PORT_FORMAT: &'static str = "format";
    pub const PORT_JPEG_QUALITY: &'static str = "jpeg_quality";
    pub const PORT_PROMPT: &'static str = "prompt";
    pub const PORT_EXTRA_PNGINFO: &'static str = "extra_pnginfo";

    pub fn new(task_id: impl Into<String>, output_root: impl Into<PathBuf>) -> Self {
        Self {
            task_id: task_id.into(),
            sandbox: OutputSandbox::new(output_root),
        }
    }

    pub fn from_extensions(task_id: &str, extensions: &ExecutorExtensions) -> Self {
        let config: Arc<PowerpackConfig> = config_from(extensions);
        Self::new(task_id, config.output_dir.clone())
    }

    /// Write the requested artifacts, stamping names with `now`.
    pub fn save(&self, request: &SaveRequest, now: DateTime<Local>) -> Result<SavedArtifacts> {
        let share_dir = request
            .save_share_image
            .then(|| self.sandbox.check(&request.share_output_path, &now))
            .transpose()?;
        let full_dir = request
            .save_full_flow
            .then(|| self.sandbox.check(&request.full_output_path, &now))
            .transpose()?;

        let mut saved = SavedArtifacts::default();
        if share_dir.is_none() && full_dir.is_none() {
            return Ok(saved);
        }

        let stem = format!("{}_{}", request.filename_prefix, now.format("%Y%m%d_%H%M%S"));
        let pixels = Pixels::from_batch(&request.image)?;
        let parameters = request.parameters.format();

        if let Some(dir) = share_dir {
            std::fs::create_dir_all(&dir)?;
            let path = dir.join(format!("{stem}.{}", request.format.extension()));
            let bytes = match request.format {
                ImageFormat::Png => encode_png(&pixels, &[("parameters", parameters.clone())])?,
                ImageFormat::Jpeg => encode_jpeg(&pixels, request.jpeg_quality, &parameters)?,
            };
            write_file(&path, &bytes)?;
            log::info!("Share image saved: {}", path.display());
            saved.share = Some(path);
        }

        if let Some(dir) = full_dir {
            std::fs::create_dir_all(&dir)?;
            let png_path = dir.join(format!("{stem}_full.png"));
            let bytes = encode_png(&pixels, &request.graph.text_chunks(&parameters))?;
            write_file(&png_path, &bytes)?;

            let txt_path = dir.join(format!("{stem}_workflow.txt"));
            let dump = WorkflowDump::new(&parameters, &request.graph).to_pretty_json()?;
            write_file(&txt_path, dump.as_bytes())?;

            log::info!(
                "Full flow saved: png={} txt={}",
                png_path.display(),
                txt_path.display()
            );
            saved.full_png = Some(png_path);
            saved.workflow_txt = Some(txt_path);
        }

        Ok(saved)
    }

    async fn read_request(&self, inputs: &NodeInputs<'_>) -> Result<SaveRequest> {
        let image: ImageBatch = inputs.require(Self::PORT_IMAGE).await?;
        let defaults = SaveRequest::new(image);
        let format: String = inputs.get_or(Self::PORT_FORMAT, "PNG".to_string()).await;

        let parameters = GenerationParameters {
            positive_prompt: inputs.get_or("positive_prompt", String::new()).await,
            negative_prompt: inputs.get_or("negative_prompt", String::new()).await,
            model_name: inputs.get_or("model_name", String::new()).await,
            seed: inputs.int("seed").await.unwrap_or(0),
            steps: inputs.int_or("steps", 0).await,
            cfg: inputs.get_or("cfg", 0.0f64).await,
            sampler: inputs.get_or("sampler", String::new()).await,
            scheduler: inputs.get_or("scheduler", String::new()).await,
            width: inputs.int_or("width", 0).await,
            height: inputs.int_or("height", 0).await,
        };

        Ok(SaveRequest {
            share_output_path: inputs
                .get_or(Self::PORT_SHARE_OUTPUT_PATH, defaults.share_output_path.clone())
                .await,
            full_output_path: inputs
                .get_or(Self::PORT_FULL_OUTPUT_PATH, defaults.full_output_path.clone())
                .await,
            save_share_image: inputs
                .get_or(Self::PORT_SAVE_SHARE_IMAGE, defaults.save_share_image)
                .await,
            save_full_flow: inputs
                .get_or(Self::PORT_SAVE_FULL_FLOW, defaults.save_full_flow)
                .await,
            filename_prefix: inputs
                .get_or(Self::PORT_FILENAME_PREFIX, defaults.filename_prefix.clone())
                .await,
            format: ImageFormat::parse(&format),
            jpeg_quality: inputs
                .get_or(Self::PORT_JPEG_QUALITY, defaults.jpeg_quality)
                .await,
            parameters,
            graph: HostGraph {
                prompt: inputs.value(Self::PORT_PROMPT).await,
                extra_pnginfo: inputs.value(Self::PORT_EXTRA_PNGINFO).await,
            },
            ..defaults
        })
    }

    fn string_port(id: &str, label: &str, default: &str) -> PortMetadata {
        PortMetadata::optional(id, label, PortDataType::String).with_default(json!(default))
    }

    fn int_port(id: &str, label: &str) -> PortMetadata {
        PortMetadata::optional(id, label, PortDataType::Int).with_default(json!(0))
    }
}

impl TaskDescriptor for SaveImageTask {
    fn descriptor() -> TaskMetadata {
        TaskMetadata {
            node_type: "power-save-image".to_string(),
            category: NodeCategory::Save,
            label: "Power Save Image".to_string(),
            description: "Saves a share image and an optional full-flow PNG with workflow dump"
                .to_string(),
            inputs: vec![
                PortMetadata::required(Self::PORT_IMAGE, "Image", PortDataType::Image),
                PortMetadata::required(
                    Self::PORT_SHARE_OUTPUT_PATH,
                    "Share Output Path",
                    PortDataType::String,
                )
                .with_default(json!("output/share")),
                PortMetadata::required(
                    Self::PORT_FULL_OUTPUT_PATH,
                    "Full Output Path",
                    PortDataType::String,
                )
                .with_default(json!("output/full")),
                PortMetadata::required(
                    Self::PORT_SAVE_SHARE_IMAGE,
                    "Save Share Image",
                    PortDataType::Boolean,
                )
                .with_default(json!(true)),
                PortMetadata::required(
                    Self::PORT_SAVE_FULL_FLOW,
                    "Save Full Flow",
                    PortDataType::Boolean,
                )
                .with_default(json!(false)),
                PortMetadata::required(
                    Self::PORT_FILENAME_PREFIX,
                    "Filename Prefix",
                    PortDataType::String,
                )
                .with_default(json!("power")),
                PortMetadata::required(Self::PORT_FORMAT, "Format", PortDataType::Combo)
                    .with_default(json!("PNG"))
                    .with_options(["PNG", "JPEG"]),
                Self::string_port("positive_prompt", "Positive Prompt", "").multiline(),
                Self::string_port("negative_prompt", "Negative Prompt", "").multiline(),
                Self::string_port("model_name", "Model Name", ""),
                Self::int_port("seed", "Seed"),
                Self::int_port("steps", "Steps"),
                PortMetadata::optional("cfg", "CFG", PortDataType::Float).with_default(json!(0.0)),
                Self::string_port("sampler", "Sampler", ""),
                Self::string_port("scheduler", "Scheduler", ""),
                Self::int_port("width", "Width"),
                Self::int_port("height", "Height"),
                PortMetadata::optional(Self::PORT_JPEG_QUALITY, "JPEG Quality", PortDataType::Int)
                    .with_default(json!(95))
                    .with_range(70.0, 100.0, 1.0),
                PortMetadata::optional(Self::PORT_PROMPT, "Prompt Graph", PortDataType::Json)
                    .hidden(),
                PortMetadata::optional(Self::PORT_EXTRA_PNGINFO, "Extra PNG Info", PortDataType::Json)
                    .hidden(),
            ],
            outputs: vec![],
            execution_mode: ExecutionMode::Output,
        }
    }
}

inventory::submit!(node_engine::DescriptorFn(SaveImageTask::descriptor));

inventory::submit!(node_engine::TaskFactoryFn {
    node_type: "power-save-image",
    build: |task_id, extensions| Box::new(SaveImageTask::from_extensions(task_id, extensions)),
});

#[async_trait]
impl Task for SaveImageTask {
    fn id(&self) -> &str {
        &self.task_id
    }

    async fn run(&self, context: Context) -> graph_flow::Result<TaskResult> {
        let inputs = NodeInputs::new(&context, &self.task_id);
        let request = self.read_request(&inputs).await?;

        log::debug!(
            "SaveImageTask {}: share={} full={} format={:?}",
            self.task_id,
            request.save_share_image,
            request.save_full_flow,
            request.format
        );

        let saved = self.save(&request, Local::now())?;

        Ok(TaskResult::new(
            Some(format!("Saved {} file(s)", saved.count())),
            NextAction::Continue,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PowerpackError;
    use chrono::TimeZone;
    use node_engine::ContextKeys;
    use std::fs::File;
    use std::io::BufReader;
    use tempfile::tempdir;

    fn fixed_now() -> DateTime<Local> {
        Local.with_ymd_and_hms(2025, 6, 1, 9, 30, 15).unwrap()
    }

    fn test_image() -> ImageBatch {
        ImageBatch::new(1, 2, 2, 3, vec![0.5; 12]).unwrap()
    }

    fn test_request() -> SaveRequest {
        let mut request = SaveRequest::new(test_image());
        request.share_output_path = "share".to_string();
        request.full_output_path = "full/[time(%Y)]".to_string();
        request.parameters = GenerationParameters {
            positive_prompt: "a lighthouse".to_string(),
            negative_prompt: "fog".to_string(),
            model_name: "flux.safetensors".to_string(),
            seed: 7,
            steps: 25,
            cfg: 3.5,
            sampler: "euler".to_string(),
            scheduler: "simple".to_string(),
            width: 2,
            height: 2,
        };
        request
    }

    fn png_texts(path: &Path) -> Vec<(String, String)> {
        let decoder = png::Decoder::new(BufReader::new(File::open(path).unwrap()));
        let reader = decoder.read_info().unwrap();
        reader
            .info()
            .uncompressed_latin1_text
            .iter()
            .map(|c| (c.keyword.clone(), c.text.clone()))
            .collect()
    }

    fn files_in(dir: &Path) -> Vec<String> {
        let mut names: Vec<String> = std::fs::read_dir(dir)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().to_string())
            .collect();
        names.sort();
        names
    }

    #[test]
    fn test_share_only_png() {
        let dir = tempdir().unwrap();
        let task = SaveImageTask::new("save", dir.path());
        let request = test_request();

        let saved = task.save(&request, fixed_now()).unwrap();
        assert_eq!(saved.count(), 1);

        let share_dir = dir.path().join("share");
        assert_eq!(files_in(&share_dir), vec!["power_20250601_093015.png"]);
        assert!(!dir.path().join("full").exists());

        let texts = png_texts(&share_dir.join("power_20250601_093015.png"));
        assert_eq!(
            texts,
            vec![(
                "parameters".to_string(),
                "a lighthouse\nNegative prompt: fog\nSteps: 25, Sampler: euler, Schedule type: simple, CFG scale: 3.5, Seed: 7, Size: 2x2, Model: flux.safetensors".to_string()
            )]
        );
    }

    #[test]
    fn test_both_flags_write_three_files() {
        let dir = tempdir().unwrap();
        let task = SaveImageTask::new("save", dir.path());
        let mut request = test_request();
        request.save_full_flow = true;
        request.graph = HostGraph {
            prompt: Some(json!({"3": {"class_type": "KSampler"}})),
            extra_pnginfo: Some(json!({"workflow": {"nodes": [1, 2]}})),
        };

        let saved = task.save(&request, fixed_now()).unwrap();
        assert_eq!(saved.count(), 3);

        let full_dir = dir.path().join("full/2025");
        assert_eq!(
            files_in(&full_dir),
            vec![
                "power_20250601_093015_full.png",
                "power_20250601_093015_workflow.txt"
            ]
        );

        let keys: Vec<String> = png_texts(&full_dir.join("power_20250601_093015_full.png"))
            .into_iter()
            .map(|(k, _)| k)
            .collect();
        assert_eq!(keys, vec!["parameters", "prompt", "workflow"]);

        let dump: serde_json::Value = serde_json::from_str(
            &std::fs::read_to_string(full_dir.join("power_20250601_093015_workflow.txt")).unwrap(),
        )
        .unwrap();
        let dump_keys: Vec<&String> = dump.as_object().unwrap().keys().collect();
        assert_eq!(dump_keys, vec!["parameters", "prompt", "workflow", "extra_pnginfo"]);
        assert_eq!(dump["workflow"], json!({"nodes": [1, 2]}));
        assert_eq!(dump["prompt"]["3"]["class_type"], "KSampler");
    }

    #[test]
    fn test_full_flow_without_graph() {
        let dir = tempdir().unwrap();
        let task = SaveImageTask::new("save", dir.path());
        let mut request = test_request();
        request.save_share_image = false;
        request.save_full_flow = true;
        request.graph.prompt = Some(json!("not a graph"));

        task.save(&request, fixed_now()).unwrap();

        let full_dir = dir.path().join("full/2025");
        let keys: Vec<String> = png_texts(&full_dir.join("power_20250601_093015_full.png"))
            .into_iter()
            .map(|(k, _)| k)
            .collect();
        assert_eq!(keys, vec!["parameters"]);

        let dump: serde_json::Value = serde_json::from_str(
            &std::fs::read_to_string(full_dir.join("power_20250601_093015_workflow.txt")).unwrap(),
        )
        .unwrap();
        assert!(dump["prompt"].is_null());
        assert!(dump["extra_pnginfo"].is_null());
        assert!(!dir.path().join("share").exists());
    }

    #[test]
    fn test_jpeg_share() {
        let dir = tempdir().unwrap();
        let task = SaveImageTask::new("save", dir.path());
        let mut request = test_request();
        request.format = ImageFormat::Jpeg;
        request.jpeg_quality = 80;

        let saved = task.save(&request, fixed_now()).unwrap();
        let path = saved.share.unwrap();
        assert_eq!(path.file_name().unwrap(), "power_20250601_093015.jpg");

        let bytes = std::fs::read(&path).unwrap();
        assert!(bytes.windows(6).any(|w| w == b"Exif\0\0"));
        assert!(image::load_from_memory(&bytes).is_ok());
    }

    #[test]
    fn test_traversal_rejected_before_any_write() {
        let dir = tempdir().unwrap();
        let task = SaveImageTask::new("save", dir.path().join("out"));

        let mut request = test_request();
        request.share_output_path = "../../etc".to_string();
        let err = task.save(&request, fixed_now()).unwrap_err();
        assert!(matches!(err, PowerpackError::PathSecurity { .. }));

        let mut request = test_request();
        request.save_full_flow = true;
        request.full_output_path = "full/../../escape".to_string();
        let err = task.save(&request, fixed_now()).unwrap_err();
        assert!(matches!(err, PowerpackError::PathSecurity { .. }));

        assert!(!dir.path().join("out").exists());
    }

    #[test]
    fn test_full_phase_failure_keeps_share() {
        let dir = tempdir().unwrap();
        let task = SaveImageTask::new("save", dir.path());
        let mut request = test_request();
        request.save_full_flow = true;

        // A directory squatting on the full-flow file name makes that write fail.
        let blocked = dir.path().join("full/2025/power_20250601_093015_full.png");
        std::fs::create_dir_all(&blocked).unwrap();

        let err = task.save(&request, fixed_now()).unwrap_err();
        assert!(matches!(err, PowerpackError::Io(_)));

        let share_dir = dir.path().join("share");
        assert_eq!(files_in(&share_dir), vec!["power_20250601_093015.png"]);
        assert!(!dir
            .path()
            .join("full/2025/power_20250601_093015_workflow.txt")
            .exists());
    }

    #[test]
    fn test_no_flags_is_noop() {
        let dir = tempdir().unwrap();
        let task = SaveImageTask::new("save", dir.path().join("out"));
        let mut request = test_request();
        request.save_share_image = false;

        let saved = task.save(&request, fixed_now()).unwrap();
        assert_eq!(saved, SavedArtifacts::default());
        assert!(!dir.path().join("out").exists());
    }

    #[test]
    fn test_format_parse() {
        assert_eq!(ImageFormat::parse("JPEG"), ImageFormat::Jpeg);
        assert_eq!(ImageFormat::parse("jpg"), ImageFormat::Jpeg);
        assert_eq!(ImageFormat::parse("PNG"), ImageFormat::Png);
        assert_eq!(ImageFormat::parse("webp"), ImageFormat::Png);
    }

    #[tokio::test]
    async fn test_run_reads_context() {
        let dir = tempdir().unwrap();
        let task = SaveImageTask::new("save", dir.path());
        let context = Context::new();
        let key = |port: &str| ContextKeys::input("save", port);
        context.set(key("image"), test_image()).await;
        context.set(key("share_output_path"), "runs").await;
        context.set(key("filename_prefix"), "cli").await;
        context.set(key("cfg"), 7.0).await;
        context
            .set(key("extra_pnginfo"), json!({"workflow": {"id": "w"}}))
            .await;

        let result = task.run(context).await.unwrap();
        assert_eq!(result.response.as_deref(), Some("Saved 1 file(s)"));

        let files = files_in(&dir.path().join("runs"));
        assert_eq!(files.len(), 1);
        assert!(files[0].starts_with("cli_") && files[0].ends_with(".png"));
        let texts = png_texts(&dir.path().join("runs").join(&files[0]));
        assert!(texts[0].1.contains("CFG scale: 7.0"));
    }

    #[tokio::test]
    async fn test_run_records_integers_as_given() {
        let dir = tempdir().unwrap();
        let task = SaveImageTask::new("save", dir.path());
        let context = Context::new();
        let key = |port: &str| ContextKeys::input("save", port);
        context.set(key("image"), test_image()).await;
        context.set(key("share_output_path"), "runs").await;
        context.set(key("seed"), -5).await;
        context.set(key("steps"), 20.0).await;
        context.set(key("width"), "832").await;

        task.run(context).await.unwrap();

        let files = files_in(&dir.path().join("runs"));
        let texts = png_texts(&dir.path().join("runs").join(&files[0]));
        assert!(texts[0].1.contains("Steps: 20,"));
        assert!(texts[0].1.contains("Seed: -5,"));
        assert!(texts[0].1.contains("Size: 832x0,"));
    }

    #[tokio::test]
    async fn test_run_without_image_fails() {
        let dir = tempdir().unwrap();
        let task = SaveImageTask::new("save", dir.path());
        assert!(task.run(Context::new()).await.is_err());
    }
}
