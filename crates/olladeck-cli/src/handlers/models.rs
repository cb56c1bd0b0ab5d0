//! Model command handlers.

use anyhow::Result;
use olladeck_core::domain::{ActionOutcome, ModelDescriptor, RunningModelDescriptor};

use crate::bootstrap::CliContext;
use crate::error::CliError;
use crate::presentation::{
    format_bytes, format_optional, print_json, print_separator, truncate_string,
};

pub async fn list(ctx: &CliContext) -> Result<()> {
    let models = ctx.panel.list_models().await.map_err(CliError::from)?;
    if ctx.json {
        print_json(&models)?;
        return Ok(());
    }

    if models.is_empty() {
        println!("No models installed.");
        println!("Use 'olladeck models pull <name>' to download one.");
        return Ok(());
    }
    print_model_table(&models);
    Ok(())
}

fn print_model_table(models: &[ModelDescriptor]) {
    println!("{:<32} {:<10} {:<14} Modified", "Name", "Size", "Digest");
    print_separator(80);
    for model in models {
        println!(
            "{:<32} {:<10} {:<14} {}",
            truncate_string(&model.name, 31),
            format_bytes(model.size),
            truncate_string(&model.digest, 12),
            model.modified_at
        );
    }
}

pub async fn ps(ctx: &CliContext) -> Result<()> {
    let running = ctx
        .panel
        .list_running_models()
        .await
        .map_err(CliError::from)?;
    if ctx.json {
        print_json(&running)?;
        return Ok(());
    }

    if running.is_empty() {
        println!("No models loaded.");
        return Ok(());
    }
    print_running_table(&running);
    Ok(())
}

fn print_running_table(running: &[RunningModelDescriptor]) {
    println!(
        "{:<32} {:<10} {:<14} {:<10} Until",
        "Name", "Status", "ID", "Size"
    );
    print_separator(90);
    for model in running {
        println!(
            "{:<32} {:<10} {:<14} {:<10} {}",
            truncate_string(&model.name, 31),
            model.status,
            truncate_string(model.instance_id.as_deref().unwrap_or("--"), 12),
            model.size.map_or_else(|| "--".to_string(), format_bytes),
            format_optional(model.expires_at.as_deref(), "--")
        );
    }
}

pub async fn pull(ctx: &CliContext, name: &str) -> Result<()> {
    if !ctx.json {
        println!("Pulling {name}; this can take a while...");
    }
    let outcome = ctx.panel.pull_model(name).await.map_err(CliError::from)?;
    report(ctx, &outcome)
}

pub async fn remove(ctx: &CliContext, name: &str) -> Result<()> {
    let outcome = ctx.panel.delete_model(name).await.map_err(CliError::from)?;
    report(ctx, &outcome)
}

pub async fn stop(ctx: &CliContext, name: &str) -> Result<()> {
    let outcome = ctx.panel.stop_model(name).await.map_err(CliError::from)?;
    report(ctx, &outcome)
}

fn report(ctx: &CliContext, outcome: &ActionOutcome) -> Result<()> {
    if ctx.json {
        print_json(outcome)?;
    } else {
        println!("{}", outcome.message);
    }
    Ok(())
}
