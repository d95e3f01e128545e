use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use clap::Parser;
use serde::Serialize;

use lullwatch::{
    cli::{Cli, OutputFormat},
    config::LullwatchConfig,
    lifecycle::{WatcherPool, WorkerLifecycle},
    watcher::DirWatcher,
    FileChange,
};

fn main() -> Result<()> {
    let cli = Cli::parse();

    if let Err(err) = cli.validate() {
        eprintln!("Error: {}", err);
        std::process::exit(1);
    }

    cli.setup_logging();

    let config = cli.effective_config()?;
    let mut app = WatchApp {
        dirs: cli.watch_dirs(),
        config,
        output: cli.output.clone(),
        pool: WatcherPool::new(),
    };

    app.on_create()?;

    tracing::info!(
        "Watching {} directories, quiet period {}s",
        app.pool.len(),
        app.config.watcher.quiet_period_secs
    );

    if matches!(cli.output, OutputFormat::Text) {
        for watcher in app.pool.watchers() {
            println!("Watching: {}", watcher.dir().display());
        }
        println!("Press Ctrl+C to quit");
        println!("---");
    }

    let result = run_until_interrupted(&app.pool);
    app.on_exit();
    result
}

struct WatchApp {
    dirs: Vec<PathBuf>,
    config: LullwatchConfig,
    output: OutputFormat,
    pool: WatcherPool,
}

impl WorkerLifecycle for WatchApp {
    fn on_create(&mut self) -> Result<()> {
        for dir in &self.dirs {
            let output = self.output.clone();
            let label = dir.display().to_string();
            let watcher = DirWatcher::with_config(dir, &self.config.watcher, move |changes| {
                print_report(&output, &label, &changes);
            })?;
            self.pool.register(watcher);
        }
        Ok(())
    }

    fn on_exit(&mut self) {
        std::mem::take(&mut self.pool).shutdown();
    }
}

fn run_until_interrupted(pool: &WatcherPool) -> Result<()> {
    let running = Arc::new(AtomicBool::new(true));
    let r = running.clone();
    ctrlc::set_handler(move || {
        r.store(false, Ordering::SeqCst);
    })?;

    while running.load(Ordering::SeqCst) {
        if pool.running_count() == 0 {
            tracing::warn!("All watchers have terminated, exiting");
            break;
        }
        std::thread::sleep(Duration::from_millis(200));
    }

    Ok(())
}

fn print_report(output: &OutputFormat, dir: &str, changes: &[FileChange]) {
    match output {
        OutputFormat::Text => print_text_report(dir, changes),
        OutputFormat::Json => print_json_report(dir, changes),
    }
}

fn print_text_report(dir: &str, changes: &[FileChange]) {
    let time_str = chrono::Local::now().format("%H:%M:%S");

    println!("[{}] {}: {} change(s)", time_str, dir, changes.len());
    for change in changes {
        println!("  {}", change);
    }
    println!();
}

#[derive(Serialize)]
struct ChangeReport<'a> {
    time: String,
    dir: &'a str,
    changes: &'a [FileChange],
}

fn print_json_report(dir: &str, changes: &[FileChange]) {
    let report = ChangeReport {
        time: chrono::Local::now().to_rfc3339(),
        dir,
        changes,
    };

    match serde_json::to_string(&report) {
        Ok(line) => println!("{}", line),
        Err(err) => tracing::error!("Failed to serialize report: {}", err),
    }
}
