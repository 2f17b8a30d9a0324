use std::path::Path;

use anyhow::{anyhow, Result};
use clap::Args;
use colored::Colorize;
use manuscript_views::{derive_view, DeriveInput, ViewKind};
use serde_json::{json, Value};

use crate::config::Config;
use crate::store::Store;

#[derive(Debug, Args)]
pub struct ViewArgs {
    /// referenceOutline, comments, history or mindMapGraph
    pub view: String,

    /// View params as a JSON object
    #[arg(short, long, default_value = "{}")]
    pub params: String,
}

pub fn view(args: ViewArgs, cwd: &Path, config: &Config) -> Result<()> {
    let kind: ViewKind = args.view.parse().map_err(|_| {
        let known: Vec<&str> = ViewKind::ALL.iter().map(|k| k.as_str()).collect();
        anyhow!("unknown view `{}`. Use: {}", args.view, known.join(", "))
    })?;
    let mut params: Value = serde_json::from_str(&args.params)?;

    let store = Store::new(cwd, config);
    let (state, log) = store.load()?;

    // history reads the project's own log unless entries are given
    if kind == ViewKind::History && params.get("entries").is_none() {
        let entries = log.to_value()["events"].clone();
        if !params.is_object() {
            params = json!({});
        }
        if let Some(obj) = params.as_object_mut() {
            obj.insert("entries".to_string(), entries);
        }
    }

    let capabilities = config.capability_snapshot();
    let result = derive_view(kind, DeriveInput::new(&state, &params, &capabilities));

    println!("{}", serde_json::to_string_pretty(&result)?);
    if !result.ok {
        return Err(anyhow!("{} view failed", kind.to_string().yellow()));
    }
    Ok(())
}
