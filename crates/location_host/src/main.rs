//! Oxide Location - drive a page's location object from the command line.

use anyhow::{bail, Context, Result};
use clap::Parser;
use serde_json::json;
use tracing::info;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use browser_security::Origin;
use dom::NavigationRequest;
use location_host::{BrowserConfig, Page};
use web_apis::{JsValue, PropertyKey};

/// Oxide Location - inspect and navigate a page through its location object
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// URL to open
    #[arg(default_value = "about:blank")]
    url: String,

    /// Assign a location member, as FIELD=VALUE (repeatable)
    #[arg(long = "set", value_name = "FIELD=VALUE")]
    sets: Vec<String>,

    /// Call location.assign() with this URL
    #[arg(long)]
    assign: Option<String>,

    /// Call location.replace() with this URL
    #[arg(long)]
    replace: Option<String>,

    /// Call location.reload()
    #[arg(long)]
    reload: bool,

    /// Origin the script runs as (defaults to the page's own origin)
    #[arg(long)]
    caller: Option<String>,

    /// Treat every caller as same-origin
    #[arg(long)]
    single_origin: bool,

    /// JSON configuration file
    #[arg(long)]
    config: Option<String>,

    /// Document encoding label
    #[arg(long)]
    encoding: Option<String>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

/// A single scripted action on the location object.
#[derive(Debug, PartialEq)]
enum Action {
    Set(String, String),
    Call(&'static str, Option<String>),
}

impl Args {
    fn actions(&self) -> Result<Vec<Action>> {
        let mut actions = Vec::new();

        for set in &self.sets {
            let Some((field, value)) = set.split_once('=') else {
                bail!("Expected FIELD=VALUE, got \"{}\"", set);
            };
            actions.push(Action::Set(field.to_string(), value.to_string()));
        }
        if let Some(url) = &self.assign {
            actions.push(Action::Call("assign", Some(url.clone())));
        }
        if let Some(url) = &self.replace {
            actions.push(Action::Call("replace", Some(url.clone())));
        }
        if self.reload {
            actions.push(Action::Call("reload", None));
        }

        Ok(actions)
    }

    fn browser_config(&self) -> Result<BrowserConfig> {
        let mut config = match &self.config {
            Some(path) => {
                let json = std::fs::read_to_string(path)
                    .with_context(|| format!("Failed to read config file {}", path))?;
                BrowserConfig::from_json_str(&json)?
            }
            None => BrowserConfig::default(),
        };

        if self.single_origin {
            config = config.with_origin_policy(browser_security::OriginPolicy::SingleOrigin);
        }
        if let Some(encoding) = &self.encoding {
            config = config.with_default_encoding(encoding);
        }

        Ok(config)
    }
}

fn run_action(page: &Page, caller: &Origin, action: &Action) -> Result<Vec<NavigationRequest>> {
    let location = page.location();

    match action {
        Action::Set(field, value) => {
            location.set(caller, PropertyKey::from(field.as_str()), JsValue::from(value.as_str()))?;
        }
        Action::Call(method, argument) => {
            let args: Vec<JsValue> = argument.iter().map(|a| JsValue::from(a.as_str())).collect();
            location.invoke(caller, method, &args)?;
        }
    }

    let committed = page.process_navigations();
    for request in &committed {
        info!("Committed {} ({:?})", request.url, request.flags);
    }
    Ok(committed)
}

fn snapshot(page: &Page, navigations: &[NavigationRequest]) -> Result<serde_json::Value> {
    let proxy = page.location();
    let location = proxy.location();

    Ok(json!({
        "href": location.href()?,
        "origin": location.origin()?,
        "protocol": location.protocol()?,
        "host": location.host()?,
        "hostname": location.hostname()?,
        "port": location.port()?,
        "pathname": location.pathname()?,
        "search": location.search()?,
        "hash": location.hash()?,
        "navigations": navigations
            .iter()
            .map(|request| json!({
                "url": request.url.as_str(),
                "replacement": request.is_replacement(),
                "reload": request.is_reload(),
            }))
            .collect::<Vec<_>>(),
        "history": page.history().iter().map(|url| url.as_str()).collect::<Vec<_>>(),
    }))
}

fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    let default_level = if args.verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    info!("Oxide Location v{}", location_host::VERSION);

    let config = args.browser_config()?;
    let actions = args.actions()?;
    let page = Page::open(config, &args.url)?;

    let caller = match &args.caller {
        Some(origin) => Some(Origin::parse(origin).with_context(|| format!("Invalid caller origin {}", origin))?),
        None => None,
    };

    let mut navigations = Vec::new();
    let mut error = None;
    for action in &actions {
        let caller = caller.clone().unwrap_or_else(|| page.origin());
        match run_action(&page, &caller, action) {
            Ok(committed) => navigations.extend(committed),
            Err(e) => {
                error = Some(e);
                break;
            }
        }
    }

    let mut output = snapshot(&page, &navigations)?;
    if let Some(e) = error {
        let name = e
            .downcast_ref::<common::BrowserError>()
            .map(|e| e.dom_exception_name())
            .unwrap_or("Error");
        output["error"] = json!({ "name": name, "message": e.to_string() });
    }

    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}
