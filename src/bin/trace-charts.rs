use anyhow::{Context, Result, bail};
use clap::{Args, Parser, Subcommand, ValueEnum};
use serde_json::Value;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use trace_charts::{ChartEnv, ChartRegistry, DataFormat, Document, ImageFormat, Settings, storage};

/// Container id the CLI renders into.
const CONTAINER: &str = "chart";

#[derive(Parser, Debug)]
#[command(
    name = "trace-charts",
    version,
    about = "Render system-trace charts to SVG/PNG/JPEG or export their normalized data"
)]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Render a chart from a JSON payload.
    Render(RenderArgs),
    /// List the available themes.
    Themes(ConfigArgs),
    /// List the registered chart types.
    Types,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum OutFormat {
    Svg,
    Png,
    Jpg,
    Json,
    Csv,
    Tsv,
}

#[derive(Args, Debug)]
struct ConfigArgs {
    /// Settings file (defaults to <config dir>/trace-charts/settings.json).
    #[arg(long)]
    config: Option<PathBuf>,
}

#[derive(Args, Debug)]
struct RenderArgs {
    /// Chart type: pie, bar, line, heatmap, timeline or flow.
    #[arg(short = 't', long = "type")]
    chart_type: String,
    /// JSON payload file, or `-` for stdin.
    #[arg(short, long)]
    data: PathBuf,
    /// Output path.
    #[arg(short, long)]
    out: PathBuf,
    /// Output format. If omitted, inferred from --out extension.
    #[arg(long, value_enum)]
    format: Option<OutFormat>,
    /// Chart options as a JSON object, e.g. '{"title":"Reads","sortData":false}'.
    #[arg(long)]
    options: Option<String>,
    /// Theme name (overrides settings).
    #[arg(long)]
    theme: Option<String>,
    /// Chart width in pixels (overrides settings).
    #[arg(long)]
    width: Option<f64>,
    /// Chart height in pixels (overrides settings).
    #[arg(long)]
    height: Option<f64>,
    #[command(flatten)]
    config: ConfigArgs,
}

fn infer_format(path: &Path) -> Result<OutFormat> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("svg")
        .to_ascii_lowercase();
    Ok(match ext.as_str() {
        "svg" => OutFormat::Svg,
        "png" => OutFormat::Png,
        "jpg" | "jpeg" => OutFormat::Jpg,
        "json" => OutFormat::Json,
        "csv" => OutFormat::Csv,
        "tsv" => OutFormat::Tsv,
        other => bail!("cannot infer output format from extension `.{other}`; pass --format"),
    })
}

fn read_payload(path: &Path) -> Result<Value> {
    let text = if path == Path::new("-") {
        let mut buf = String::new();
        std::io::stdin()
            .read_to_string(&mut buf)
            .context("read payload from stdin")?;
        buf
    } else {
        std::fs::read_to_string(path).with_context(|| format!("read payload {}", path.display()))?
    };
    serde_json::from_str(&text).context("payload is not valid JSON")
}

fn load_settings(args: &ConfigArgs) -> Result<Settings> {
    Settings::load(args.config.as_deref()).with_context(|| match &args.config {
        Some(p) => format!("load settings {}", p.display()),
        None => "load settings".to_string(),
    })
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    let cli = Cli::parse();
    match cli.cmd {
        Command::Render(args) => cmd_render(args),
        Command::Themes(args) => cmd_themes(args),
        Command::Types => {
            ChartRegistry::with_builtin(ChartEnv::default())
                .types()
                .iter()
                .for_each(|t| println!("{t}"));
            Ok(())
        }
    }
}

fn cmd_render(args: RenderArgs) -> Result<()> {
    let mut settings = load_settings(&args.config)?;
    if let Some(theme) = &args.theme {
        settings.theme = Some(theme.clone());
    }
    if let Some(w) = args.width {
        settings.width = w;
    }
    if let Some(h) = args.height {
        settings.height = h;
    }
    let format = match args.format {
        Some(f) => f,
        None => infer_format(&args.out)?,
    };
    let overrides: Value = match &args.options {
        Some(raw) => serde_json::from_str(raw).context("--options is not valid JSON")?,
        None => Value::Object(Default::default()),
    };
    let payload = read_payload(&args.data)?;

    let document = Rc::new(Document::new(settings.width, settings.height));
    document.add_container(CONTAINER, settings.width, settings.height);
    let env = ChartEnv::new(Rc::clone(&document));
    settings.apply(&env).context("apply settings")?;
    let registry = ChartRegistry::with_builtin(env);
    let options = settings.chart_options(&overrides);
    let handle = registry
        .create_with_data(&args.chart_type, CONTAINER, &options, &payload)
        .with_context(|| format!("render {} chart", args.chart_type))?;
    let mut chart = handle.borrow_mut();
    chart.settle()?;
    let records = chart.record_count();

    match format {
        OutFormat::Svg | OutFormat::Png | OutFormat::Jpg => {
            if let Some(panel) = document.panel(CONTAINER) {
                bail!("nothing to draw: {}", panel.message);
            }
            if format == OutFormat::Svg {
                let svg = chart.svg().context("chart produced no surface")?;
                storage::write_text(&svg, &args.out)?;
            } else {
                let image = if format == OutFormat::Png { ImageFormat::Png } else { ImageFormat::Jpeg };
                storage::write_bytes(&chart.export_image(image)?, &args.out)?;
            }
        }
        OutFormat::Json | OutFormat::Csv | OutFormat::Tsv => {
            let data = match format {
                OutFormat::Json => DataFormat::Json,
                OutFormat::Csv => DataFormat::Csv,
                _ => DataFormat::Tsv,
            };
            storage::write_text(&chart.export_data(data)?, &args.out)?;
        }
    }
    eprintln!(
        "Wrote {} chart ({} records) to {}",
        args.chart_type,
        records,
        args.out.display()
    );
    Ok(())
}

fn cmd_themes(args: ConfigArgs) -> Result<()> {
    let settings = load_settings(&args)?;
    let env = ChartEnv::default();
    settings.apply(&env).context("apply settings")?;
    let current = env.themes.current_name();
    for name in env.themes.names() {
        let theme = env.themes.get(Some(name.as_str()));
        let marker = if name == current { "*" } else { " " };
        println!("{marker} {name:<16} background={} text={} accent={}", theme.background, theme.text, theme.accent);
    }
    Ok(())
}
