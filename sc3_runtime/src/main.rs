use std::env;
use std::path::PathBuf;
use std::process::ExitCode;
use std::thread;
use std::time::{Duration, Instant};

use log::{error, info, warn};
use sc3_runtime::{Runtime, RuntimeError};

const FRAME: Duration = Duration::from_micros(16_667);

struct Args {
    project_root: PathBuf,
    max_frames: Option<u64>,
}

fn parse_args() -> Result<Args, String> {
    let args: Vec<String> = env::args().collect();
    let value_of = |flag: &str| -> Result<Option<&String>, String> {
        match args.iter().position(|a| a == flag) {
            Some(i) => args
                .get(i + 1)
                .map(Some)
                .ok_or_else(|| format!("{flag} needs a value")),
            None => Ok(None),
        }
    };

    let project_root = match value_of("--path")? {
        Some(path) => PathBuf::from(path),
        None => env::current_dir().map_err(|err| err.to_string())?,
    };
    let max_frames = value_of("--ticks")?
        .map(|t| t.parse::<u64>().map_err(|err| format!("--ticks: {err}")))
        .transpose()?;

    Ok(Args {
        project_root,
        max_frames,
    })
}

fn run(args: Args) -> Result<(), RuntimeError> {
    let mut runtime = Runtime::load(&args.project_root)?;
    info!(
        "running `{}` from {}",
        runtime.config().game.name,
        args.project_root.display()
    );

    let delta = FRAME.as_secs_f32();
    while !runtime.is_finished() {
        if args.max_frames.is_some_and(|max| runtime.frame() >= max) {
            warn!("stopping after {} frames with threads still live", runtime.frame());
            break;
        }
        let started = Instant::now();
        runtime.update(delta)?;
        if let Some(rest) = FRAME.checked_sub(started.elapsed()) {
            thread::sleep(rest);
        }
    }

    info!("finished after {} frames", runtime.frame());
    Ok(())
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let args = match parse_args() {
        Ok(args) => args,
        Err(err) => {
            eprintln!("usage: sc3_runtime [--path <project>] [--ticks <frames>]\n{err}");
            return ExitCode::from(2);
        }
    };

    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("{err}");
            ExitCode::FAILURE
        }
    }
}
