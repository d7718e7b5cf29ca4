use std::path::Path;

use clap::Parser;
use vshort_media::{check_ffmpeg, check_ffprobe, check_ytdlp};
use vshort_worker::{PipelineConfig, SelectionMode, StoreKind};

#[derive(Debug, Parser)]
#[command(name = "worker-selfcheck", about = "Check tools and environment for vshort-worker")]
struct Args {
    /// Also check what the bot loop needs
    #[arg(long)]
    poll: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    dotenvy::dotenv().ok();
    let config = PipelineConfig::from_env()?;

    println!(
        "worker-selfcheck: starting with work_dir={}",
        config.work_dir.display()
    );
    ensure_workdir(&config.work_dir).await?;

    for (name, found) in [
        ("ffmpeg", check_ffmpeg()),
        ("ffprobe", check_ffprobe()),
        ("yt-dlp", check_ytdlp()),
    ] {
        let path = found.map_err(|e| anyhow::anyhow!("{} not available: {}", name, e))?;
        println!("worker-selfcheck: {} at {}", name, path.display());
    }

    ensure_env_present(&required_env(&config, args.poll))?;
    config.validate()?;

    println!("worker-selfcheck: ok");
    Ok(())
}

async fn ensure_workdir<P: AsRef<Path>>(path: P) -> anyhow::Result<()> {
    let path = path.as_ref();
    tokio::fs::create_dir_all(path).await?;
    Ok(())
}

fn required_env(config: &PipelineConfig, poll: bool) -> Vec<&'static str> {
    let mut vars = Vec::new();
    if poll {
        vars.push("TELEGRAM_TOKEN");
    }
    if config.selection_mode == SelectionMode::Ai {
        vars.push("GEMINI_API_KEY");
    }
    if config.store_kind == StoreKind::Redis {
        vars.push("REDIS_URL");
    }
    vars
}

fn ensure_env_present(vars: &[&str]) -> anyhow::Result<()> {
    for var in vars {
        if std::env::var(var).map(|v| v.trim().is_empty()).unwrap_or(true) {
            return Err(anyhow::anyhow!("missing required env var {}", var));
        }
    }
    Ok(())
}
