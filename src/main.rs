//! 频谱帧指纹 - 命令行
//!
//! 三种模式：拍照 (GIF)、学习一个标签、连续推理

use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, Parser, Subcommand};
use tokio::sync::mpsc;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use spectral_points::core::animation::{LumaBandSegmenter, Segmenter};
use spectral_points::utils::time::format_mmss_ms;
use spectral_points::{
    CaptureConfig, EmbeddingConfig, Engine, EngineEvent, FrameSource, ImageDirSource,
    ProjectionScalar, Representation, SyntheticSource,
};

#[derive(Parser, Debug)]
#[command(name = "spectral-points", about = "Spectral frame fingerprints")]
struct Cli {
    #[command(flatten)]
    common: CommonArgs,

    #[command(subcommand)]
    command: Command,
}

#[derive(Args, Debug)]
struct CommonArgs {
    /// 图像目录帧源 (代替相机设备)
    #[arg(long, global = true)]
    frames: Option<PathBuf>,

    /// 使用合成帧源 (未指定 --frames 时的默认行为)
    #[arg(long, global = true, conflicts_with = "frames")]
    synthetic: bool,

    /// 读完图像目录后从头循环
    #[arg(long = "loop", global = true)]
    looping: bool,

    /// 点存储文件
    #[arg(long, global = true, default_value = "points.json")]
    store: PathBuf,

    /// 嵌入配置 (JSON)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// 系数表示
    #[arg(long, global = true, value_enum)]
    representation: Option<Representation>,

    /// 投影标量
    #[arg(long, global = true, value_enum)]
    projection: Option<ProjectionScalar>,

    /// 输出调试日志
    #[arg(long, short, global = true)]
    verbose: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// 采集若干帧并写成 GIF
    Picture {
        /// 帧数
        #[arg(long, default_value_t = 32)]
        count: usize,
        /// 额外写一份去背景的 GIF
        #[arg(long)]
        segmentation: bool,
        #[arg(long, default_value = "webcamera.gif")]
        out: PathBuf,
        #[arg(long, default_value = "segmented.gif")]
        segmented_out: PathBuf,
    },
    /// 采一帧并学习到标签下
    Learn {
        label: String,
        /// 采集前等待的秒数
        #[arg(long, default_value_t = 5)]
        delay_secs: u64,
    },
    /// 连续推理
    Infer {
        /// 处理的最大帧数
        #[arg(long)]
        max_frames: Option<usize>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // 初始化日志
    let level = if cli.common.verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let config = embedding_config(&cli.common)?;
    let source = frame_source(&cli.common)?;

    match cli.command {
        Command::Picture {
            count,
            segmentation,
            out,
            segmented_out,
        } => {
            let engine = Engine::new(config)?.with_capture_config(CaptureConfig {
                picture_frames: count,
                ..Default::default()
            });
            let segmenter = LumaBandSegmenter::default();
            let segmented = segmentation.then(|| (segmented_out, &segmenter as &dyn Segmenter));
            let written = engine.run_picture(source, &out, segmented).await?;
            info!("拍照完成: {} 帧", written);
        }
        Command::Learn { label, delay_secs } => {
            let engine = Engine::new(config)?;
            engine
                .run_learn(source, &cli.common.store, &label, Duration::from_secs(delay_secs))
                .await?;
        }
        Command::Infer { max_frames } => {
            let (event_tx, event_rx) = mpsc::unbounded_channel();
            let engine = Engine::new(config)?.with_event_channel(event_tx);

            let printer = tokio::spawn(print_events(event_rx));
            let stats = engine.run_infer(source, &cli.common.store, max_frames).await?;
            drop(engine);
            printer.await?;

            info!(
                "推理结束: {} 帧, {} 次匹配, {} 次投影, {} 次投影失败",
                stats.frames, stats.matched, stats.projected, stats.projection_failures
            );
        }
    }

    Ok(())
}

fn embedding_config(args: &CommonArgs) -> anyhow::Result<EmbeddingConfig> {
    let mut config = match &args.config {
        Some(path) => EmbeddingConfig::from_json_file(path)?,
        None => EmbeddingConfig::default(),
    };
    if let Some(representation) = args.representation {
        config.representation = representation;
    }
    if let Some(projection) = args.projection {
        config.projection = projection;
    }
    config.validate()?;
    Ok(config)
}

fn frame_source(args: &CommonArgs) -> anyhow::Result<Box<dyn FrameSource>> {
    let source: Box<dyn FrameSource> = match &args.frames {
        Some(dir) if !args.synthetic => Box::new(ImageDirSource::open(dir)?.looping(args.looping)),
        _ => {
            if !args.synthetic {
                info!("未指定 --frames，使用合成帧源");
            }
            Box::new(SyntheticSource::new(64, 48))
        }
    };
    Ok(source)
}

/// 每帧打印标签与距离，有坐标时接着打印坐标
async fn print_events(mut rx: mpsc::UnboundedReceiver<EngineEvent>) {
    while let Some(event) = rx.recv().await {
        match event {
            EngineEvent::Matched {
                timestamp,
                label,
                distance,
            } => println!("[{}] {} {:.6}", format_mmss_ms(timestamp % 3600.0), label, distance),
            EngineEvent::NoMatch { timestamp } => {
                println!("[{}] no match", format_mmss_ms(timestamp % 3600.0))
            }
            EngineEvent::Projected { coordinate, .. } => {
                println!("    {:.6} {:.6}", coordinate.x, coordinate.y)
            }
            EngineEvent::ProjectionFailed { label, reason, .. } => {
                println!("    projection skipped for {}: {}", label, reason)
            }
            EngineEvent::Learned { .. } => {}
        }
    }
}
