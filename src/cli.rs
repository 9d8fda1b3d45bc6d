use crate::canvas::changeset::{apply_change_set, parse_change_set};
use crate::canvas::compute_document_scene;
use crate::config::{Config, load_config};
use crate::issues::{InMemoryIssues, IssueRepository, NoIssues};
use crate::model::Document;
use crate::render::{render_svg, write_output_svg};
use crate::scene_dump::{scene_to_json, write_scene_dump};
use crate::store::{JsonFileStore, SnapshotStore};
use anyhow::Result;
use clap::{Parser, ValueEnum};
use std::io::{self, Read};
use std::path::{Path, PathBuf};

#[derive(Parser, Debug)]
#[command(name = "okrc", version, about = "Route and preview OKR canvases")]
pub struct Args {
    /// Document snapshot (.json) or '-' for stdin
    #[arg(short = 'i', long = "input")]
    pub input: Option<PathBuf>,

    /// Output file, or a directory with --all. Defaults to stdout for SVG/JSON.
    #[arg(short = 'o', long = "output")]
    pub output: Option<PathBuf>,

    /// Key result whose canvas is drawn. Defaults to the first canvas.
    #[arg(short = 'k', long = "keyResult")]
    pub key_result: Option<String>,

    /// Draw every canvas in the document
    #[arg(long = "all", conflicts_with = "key_result")]
    pub all: bool,

    /// Change set (JSON/JSON5) merged into the canvas before drawing
    #[arg(long = "changes")]
    pub changes: Option<PathBuf>,

    /// Write the document back here after merging changes
    #[arg(long = "save", requires = "changes")]
    pub save: Option<PathBuf>,

    /// Issue status snapshot: { "KEY-1": "indeterminate", ... }
    #[arg(long = "issues")]
    pub issues: Option<PathBuf>,

    /// Output format
    #[arg(short = 'e', long = "outputFormat", value_enum, default_value = "svg")]
    pub output_format: OutputFormat,

    /// Config JSON file (theme, themeVariables, canvas)
    #[arg(short = 'c', long = "configFile")]
    pub config: Option<PathBuf>,

    /// Width
    #[arg(short = 'w', long = "width", default_value_t = 1200.0)]
    pub width: f32,

    /// Height
    #[arg(short = 'H', long = "height", default_value_t = 800.0)]
    pub height: f32,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Svg,
    Png,
    Json,
}

impl OutputFormat {
    fn extension(self) -> &'static str {
        match self {
            OutputFormat::Svg => "svg",
            OutputFormat::Png => "png",
            OutputFormat::Json => "json",
        }
    }
}

pub fn run() -> Result<()> {
    let args = Args::parse();
    let mut config = load_config(args.config.as_deref())?;
    config.render.width = args.width;
    config.render.height = args.height;

    let input = read_input(args.input.as_deref())?;
    let mut document = Document::from_json(&input)?;
    let issues: Box<dyn IssueRepository> = match args.issues.as_deref() {
        Some(path) => Box::new(InMemoryIssues::from_json(&std::fs::read_to_string(path)?)?),
        None => Box::new(NoIssues),
    };

    if args.all {
        let ids: Vec<String> = document.canvases.keys().cloned().collect();
        if ids.is_empty() {
            return Err(anyhow::anyhow!("Document has no canvases"));
        }
        let outputs = resolve_multi_outputs(args.output.as_deref(), args.output_format, &ids)?;
        for (id, output) in ids.iter().zip(outputs) {
            emit(&document, id, issues.as_ref(), &config, args.output_format, Some(output.as_path()))?;
        }
        return Ok(());
    }

    let key_result = pick_key_result(&document, args.key_result.as_deref())?;

    if let Some(path) = args.changes.as_deref() {
        let set = parse_change_set(&std::fs::read_to_string(path)?)?;
        let report = apply_change_set(&mut document, &key_result, &set, &config.canvas);
        eprintln!("{}", serde_json::to_string_pretty(&report)?);
        if let Some(save) = args.save.as_deref() {
            JsonFileStore::new(save).save(&document)?;
        }
    }

    emit(
        &document,
        &key_result,
        issues.as_ref(),
        &config,
        args.output_format,
        args.output.as_deref(),
    )
}

fn emit(
    document: &Document,
    key_result: &str,
    issues: &dyn IssueRepository,
    config: &Config,
    format: OutputFormat,
    output: Option<&Path>,
) -> Result<()> {
    let scene = compute_document_scene(document, key_result, issues, &config.canvas)
        .unwrap_or_default();
    match format {
        OutputFormat::Svg => {
            let svg = render_svg(&scene, &config.theme, &config.canvas.groups, &config.render);
            write_output_svg(&svg, output)?;
        }
        OutputFormat::Json => match output {
            Some(path) => write_scene_dump(path, &scene)?,
            None => println!("{}", scene_to_json(&scene)?),
        },
        OutputFormat::Png => {
            let output = ensure_output(output, "png")?;
            let svg = render_svg(&scene, &config.theme, &config.canvas.groups, &config.render);
            write_png(&svg, &output, config)?;
        }
    }
    Ok(())
}

#[cfg(feature = "png")]
fn write_png(svg: &str, output: &Path, config: &Config) -> Result<()> {
    crate::render::write_output_png(svg, output, &config.render)
}

#[cfg(not(feature = "png"))]
fn write_png(_svg: &str, _output: &Path, _config: &Config) -> Result<()> {
    Err(anyhow::anyhow!("PNG output requires the `png` feature"))
}

/// A canvas may be drawn before anything was placed on it, so an explicit id
/// only has to name a key result or an existing canvas.
fn pick_key_result(document: &Document, requested: Option<&str>) -> Result<String> {
    if let Some(id) = requested {
        let known = document.canvases.contains_key(id)
            || document.key_results.iter().any(|kr| kr.id == id);
        if !known {
            return Err(anyhow::anyhow!("Unknown key result: {id}"));
        }
        return Ok(id.to_string());
    }
    document
        .canvases
        .keys()
        .next()
        .or_else(|| document.key_results.first().map(|kr| &kr.id))
        .cloned()
        .ok_or_else(|| anyhow::anyhow!("Document has no key results"))
}

fn read_input(path: Option<&Path>) -> Result<String> {
    if let Some(path) = path
        && path != Path::new("-")
    {
        return Ok(std::fs::read_to_string(path)?);
    }
    let mut buf = String::new();
    io::stdin().read_to_string(&mut buf)?;
    Ok(buf)
}

fn ensure_output(output: Option<&Path>, ext: &str) -> Result<PathBuf> {
    if let Some(path) = output {
        return Ok(path.to_path_buf());
    }
    Err(anyhow::anyhow!("Output path required for {} output", ext))
}

fn resolve_multi_outputs(
    output: Option<&Path>,
    format: OutputFormat,
    ids: &[String],
) -> Result<Vec<PathBuf>> {
    let ext = format.extension();
    let base = output.ok_or_else(|| anyhow::anyhow!("Output path required with --all"))?;
    if base.is_dir() {
        return Ok(ids
            .iter()
            .map(|id| base.join(format!("{}.{}", file_safe(id), ext)))
            .collect());
    }
    let stem = base.file_stem().and_then(|s| s.to_str()).unwrap_or("canvas");
    let parent = base.parent().unwrap_or_else(|| Path::new("."));
    Ok(ids
        .iter()
        .map(|id| parent.join(format!("{}-{}.{}", stem, file_safe(id), ext)))
        .collect())
}

fn file_safe(id: &str) -> String {
    id.chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Canvas, KeyResult};

    fn document() -> Document {
        let mut doc = Document::new();
        doc.key_results.push(KeyResult {
            id: "kr-1".into(),
            objective_id: "o-1".into(),
            title: "Grow".into(),
        });
        doc.key_results.push(KeyResult {
            id: "kr-2".into(),
            objective_id: "o-1".into(),
            title: "Retain".into(),
        });
        doc.canvases.insert("kr-2".into(), Canvas::new());
        doc
    }

    #[test]
    fn default_key_result_prefers_existing_canvas() {
        let doc = document();
        assert_eq!(pick_key_result(&doc, None).unwrap(), "kr-2");
        assert_eq!(pick_key_result(&doc, Some("kr-1")).unwrap(), "kr-1");
        assert!(pick_key_result(&doc, Some("kr-9")).is_err());
        assert!(pick_key_result(&Document::new(), None).is_err());
    }

    #[test]
    fn multi_outputs_use_canvas_ids() {
        let dir = tempfile::tempdir().unwrap();
        let ids = vec!["kr-1".to_string(), "kr/2".to_string()];
        let outputs = resolve_multi_outputs(Some(dir.path()), OutputFormat::Svg, &ids).unwrap();
        assert_eq!(outputs[0], dir.path().join("kr-1.svg"));
        assert_eq!(outputs[1], dir.path().join("kr_2.svg"));

        let outputs =
            resolve_multi_outputs(Some(Path::new("out/board.json")), OutputFormat::Json, &ids)
                .unwrap();
        assert_eq!(outputs[0], Path::new("out/board-kr-1.json"));
        assert!(resolve_multi_outputs(None, OutputFormat::Png, &ids).is_err());
    }
}
