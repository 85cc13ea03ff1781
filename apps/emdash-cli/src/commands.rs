//! Subcommand handlers

use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context as _, Result};
use emdash_engine::{document, EmDashEngine, EngineConfig};
use run_log::RunLog;
use serde_json::json;
use shared_types::{Finding, ProcessingRun};
use tracing::{error, info, warn};

use crate::Command;

/// Everything a command needs, built once per invocation
pub struct Context {
    engine: EmDashEngine,
    log: Option<RunLog>,
}

impl Context {
    pub async fn new(config_path: Option<&Path>, database_url: &str, use_log: bool) -> Result<Self> {
        let config = match config_path {
            Some(path) => EngineConfig::from_file(path)?,
            None => EngineConfig::default(),
        };
        let engine = EmDashEngine::from_config(config)?;
        info!("Loaded {} replacement rules", engine.rules().len());

        let log = if use_log {
            match RunLog::connect(database_url).await {
                Ok(log) => Some(log),
                Err(e) => {
                    warn!("Run log unavailable, continuing without it: {}", e);
                    None
                }
            }
        } else {
            None
        };

        Ok(Self { engine, log })
    }

    fn threshold(&self, requested: Option<f64>) -> Result<f64> {
        let threshold = requested.unwrap_or(self.engine.config().confidence_threshold);
        if !(0.0..=1.0).contains(&threshold) {
            bail!("Threshold must be in [0, 1], got {}", threshold);
        }
        Ok(threshold)
    }

    async fn persist_findings(&self, document_id: &str, findings: &[Finding]) {
        if let Some(log) = &self.log {
            if let Err(e) = log.record_findings(document_id, findings).await {
                warn!("Could not log findings for {}: {}", document_id, e);
            }
        }
    }

    async fn persist_run(&self, run: &ProcessingRun) {
        if let Some(log) = &self.log {
            if let Err(e) = log.record_run(run).await {
                warn!("Could not log run {}: {}", run.id(), e);
            }
        }
    }

    async fn logged_findings(&self, document_id: &str) -> Result<Vec<Finding>> {
        let log = self
            .log
            .as_ref()
            .context("--from-log needs the run log, which is unavailable")?;
        let findings = log.load_findings(document_id).await?;
        if findings.is_empty() {
            bail!("No logged findings for {}; run `analyze` first", document_id);
        }
        Ok(findings)
    }
}

/// Options shared by every file of one `apply` invocation
struct ApplyOptions {
    threshold: f64,
    dry_run: bool,
    output: Option<PathBuf>,
    backup: bool,
    from_log: bool,
}

pub async fn run(ctx: &Context, command: Command) -> Result<()> {
    match command {
        Command::Analyze {
            files,
            threshold,
            json,
        } => {
            let threshold = ctx.threshold(threshold)?;
            let mut failed = 0;
            for file in &files {
                if let Err(e) = analyze_file(ctx, file, threshold, json).await {
                    error!("{}: {:#}", file.display(), e);
                    failed += 1;
                }
            }
            summarize(failed, files.len())
        }
        Command::Apply {
            files,
            threshold,
            dry_run,
            output,
            no_backup,
            from_log,
        } => {
            if output.is_some() && files.len() > 1 {
                bail!("--output can only be used with a single file");
            }
            let options = ApplyOptions {
                threshold: ctx.threshold(threshold)?,
                dry_run,
                output,
                backup: !no_backup,
                from_log,
            };
            let mut failed = 0;
            for file in &files {
                if let Err(e) = apply_file(ctx, file, &options).await {
                    error!("{}: {:#}", file.display(), e);
                    failed += 1;
                }
            }
            summarize(failed, files.len())
        }
        Command::Rules => {
            for (position, rule) in ctx.engine.rules().iter().enumerate() {
                println!(
                    "{:>2}. {:<24} {:<26} -> {:?} (base {}{}) {}",
                    position + 1,
                    rule.id,
                    rule.category.label(),
                    rule.replacement,
                    rule.confidence,
                    if rule.high_specificity { ", specific" } else { "" },
                    rule.description
                );
            }
            Ok(())
        }
        Command::Runs { limit } => {
            let log = ctx.log.as_ref().context("Run log unavailable")?;
            let runs = log.recent_runs(limit).await?;
            println!("{}", serde_json::to_string_pretty(&runs)?);
            Ok(())
        }
    }
}

fn summarize(failed: usize, total: usize) -> Result<()> {
    if failed > 0 {
        bail!("{} of {} files failed", failed, total);
    }
    Ok(())
}

async fn analyze_file(ctx: &Context, path: &Path, threshold: f64, full: bool) -> Result<()> {
    let document_id = path.display().to_string();
    let file = File::open(path).with_context(|| format!("Cannot open {}", document_id))?;
    let findings = ctx
        .engine
        .analyzer()
        .analyze_reader(&document_id, BufReader::new(file))?;

    let report = ctx.engine.report(&findings, threshold);
    ctx.persist_findings(&document_id, &findings).await;

    let output = if full {
        json!({ "document": document_id, "report": report, "findings": findings })
    } else {
        json!({ "document": document_id, "report": report })
    };
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

async fn apply_file(ctx: &Context, path: &Path, options: &ApplyOptions) -> Result<()> {
    let document_id = path.display().to_string();

    let source = document::read_document(path)?;
    let findings = if options.from_log {
        ctx.logged_findings(&document_id).await?
    } else {
        let findings = ctx.engine.analyze(&source.text);
        ctx.persist_findings(&document_id, &findings).await;
        findings
    };

    let overwriting = !options.dry_run && options.output.is_none();
    if overwriting && options.backup {
        document::create_backup(path)?;
    }

    match ctx.engine.applier().apply_and_write(
        &source,
        options.output.as_deref().unwrap_or(path),
        &findings,
        options.threshold,
        options.dry_run,
    ) {
        Ok(outcome) => {
            ctx.persist_run(&outcome.run).await;
            let output = json!({
                "document": document_id,
                "run_id": outcome.run.id(),
                "dry_run": outcome.run.dry_run(),
                "status": outcome.run.status(),
                "report": outcome.run.report(),
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
            Ok(())
        }
        Err(failure) => {
            if let Some(run) = &failure.run {
                ctx.persist_run(run).await;
            }
            Err(failure.into())
        }
    }
}
