// shoplist/src/main.rs

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use std::{fmt::Write as _, path::{Path, PathBuf}, sync::Arc};
use tracing::info;

use shoplist::{
    config::{patch_for, Config, ConfigManager, Scope},
    logging, FileStore, ListPersistence, ListState, ShoppingSession,
};

#[derive(Parser)]
#[command(name = "shoplist", version, about = "Personal shopping list")]
struct Cli {
    /// Workspace root; `.shoplist/config.toml` under it is the workspace config layer
    #[arg(long, default_value = ".")]
    root: PathBuf,
    /// Store the list here for this run (overrides storage.dir)
    #[arg(long)]
    data_dir: Option<PathBuf>,
    /// Autosave quiet period for this run (overrides autosave.debounce_ms)
    #[arg(long)]
    debounce_ms: Option<u64>,
    #[command(subcommand)]
    cmd: Option<Cmd>,
}

#[derive(Subcommand)]
enum Cmd {
    /// Print the list
    List {
        #[arg(long)]
        json: bool,
    },
    /// Add an item; words are joined with spaces
    Add {
        #[arg(required = true)]
        name: Vec<String>,
    },
    /// Rename an item
    Edit {
        id: String,
        #[arg(required = true)]
        name: Vec<String>,
    },
    /// Flip an item's purchased flag
    Toggle { id: String },
    /// Delete an item
    Rm { id: String },
    /// Remove every item (needs --yes)
    Clear {
        #[arg(long)]
        yes: bool,
    },
    /// Delete the saved copy from disk (needs --yes)
    Forget {
        #[arg(long)]
        yes: bool,
    },
    #[command(subcommand)]
    Config(ConfigCmd),
}

#[derive(Subcommand)]
enum ConfigCmd {
    /// Print the merged configuration
    Show,
    /// Persist one setting, e.g. `config set autosave.debounce_ms 100`
    Set {
        path: String,
        value: String,
        #[arg(long, value_enum, default_value_t = ScopeArg::Workspace)]
        scope: ScopeArg,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum ScopeArg { User, Workspace }

impl From<ScopeArg> for Scope {
    fn from(s: ScopeArg) -> Self {
        match s { ScopeArg::User => Scope::User, ScopeArg::Workspace => Scope::Workspace }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let cfg = ConfigManager::load(&cli.root).context("load configuration")?;
    let mut overlay = Config::default();
    overlay.storage.dir = cli.data_dir.clone();
    overlay.autosave.debounce_ms = cli.debounce_ms;
    cfg.apply_runtime_overlay(overlay)?;
    let config = cfg.get();
    logging::init(config.logging.filter.as_deref());

    match plan(cli.cmd)? {
        Plan::Config(c) => run_config(&cfg, c),
        Plan::List(op) => run_list(&cli.root, &config, op).await,
    }
}

enum Plan {
    Config(ConfigCmd),
    List(ListOp),
}

/// Sorts the command into config edits and list operations; destructive
/// list commands without `--yes` stop here.
fn plan(cmd: Option<Cmd>) -> Result<Plan> {
    let op = match cmd.unwrap_or(Cmd::List { json: false }) {
        Cmd::Config(c) => return Ok(Plan::Config(c)),
        Cmd::Clear { yes: false } => bail!("refusing to clear the list without --yes"),
        Cmd::Forget { yes: false } => bail!("refusing to delete the saved list without --yes"),
        Cmd::Clear { yes: true } => ListOp::Clear,
        Cmd::Forget { yes: true } => ListOp::Forget,
        Cmd::List { json } => ListOp::Show { json },
        Cmd::Add { name } => ListOp::Add { name: name.join(" ") },
        Cmd::Edit { id, name } => ListOp::Edit { id, name: name.join(" ") },
        Cmd::Toggle { id } => ListOp::Toggle { id },
        Cmd::Rm { id } => ListOp::Remove { id },
    };
    Ok(Plan::List(op))
}

/// A command that opens the list.
enum ListOp {
    Show { json: bool },
    Add { name: String },
    Edit { id: String, name: String },
    Toggle { id: String },
    Remove { id: String },
    Clear,
    Forget,
}

fn run_config(cfg: &ConfigManager, cmd: ConfigCmd) -> Result<()> {
    match cmd {
        ConfigCmd::Show => print!("{}", toml::to_string_pretty(&cfg.get())?),
        ConfigCmd::Set { path, value, scope } => {
            let scope = Scope::from(scope);
            cfg.write_patch(scope, &patch_for(&path, &value)?)?;
            let file = cfg.path(scope).map(|p| p.display().to_string()).unwrap_or_default();
            println!("{path} = {value} ({file})");
        }
    }
    Ok(())
}

async fn run_list(root: &Path, config: &Config, op: ListOp) -> Result<()> {
    let dir = config.data_dir(root);
    info!(dir = %dir.display(), "opening shopping list");
    let backend = Arc::new(FileStore::new(dir));
    let persistence = Arc::new(ListPersistence::new(backend, config.storage_key()));
    let mut session = ShoppingSession::open(persistence, config.session_options()).await;
    if let Some(e) = &session.state().error { eprintln!("warning: {e}"); }

    let mut json = false;
    let outcome: Result<Option<String>> = match op {
        ListOp::Show { json: j } => { json = j; Ok(None) }
        ListOp::Add { name } => session.add_item(&name).map(|id| Some(format!("added {id}"))).context("add item"),
        ListOp::Edit { id, name } => session.edit_item(&id, &name).map(|_| Some(format!("renamed {id}"))).context("edit item"),
        ListOp::Toggle { id } => Ok((!session.toggle_item(&id)).then(|| format!("no item {id}"))),
        ListOp::Remove { id } => Ok(Some(if session.delete_item(&id) { format!("removed {id}") } else { format!("no item {id}") })),
        ListOp::Clear => { session.clear_list(); Ok(Some("list cleared".into())) }
        ListOp::Forget => session.forget_saved().await.map(|_| Some("saved list deleted".to_string())).context("delete saved list"),
    };

    let (state, saved) = session.close().await;
    let note = outcome?;
    saved.context("save shopping list")?;
    if let Some(n) = note { eprintln!("{n}"); }
    if json {
        println!("{}", serde_json::to_string_pretty(&state)?);
    } else {
        print!("{}", render(&state));
    }
    Ok(())
}

fn render(state: &ListState) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Shopping List  {}/{} purchased", state.purchased_count(), state.len());
    if state.is_empty() {
        out.push_str("No items in your shopping list\n");
    }
    for it in &state.items {
        let _ = writeln!(out, "- [{}] {} ({})", if it.purchased { "x" } else { " " }, it.name, it.id);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use shoplist::Item;

    #[test]
    fn renders_summary_and_rows() {
        let state = ListState::with_items(vec![Item::new("1", "Milk"), Item::new("2", "Eggs").purchased(true)]);
        assert_eq!(render(&state), "Shopping List  1/2 purchased\n- [ ] Milk (1)\n- [x] Eggs (2)\n");
    }

    #[test]
    fn renders_empty_list() {
        assert!(render(&ListState::default()).contains("No items"));
    }

    #[test]
    fn commands_are_planned_before_the_list_opens() {
        assert!(matches!(plan(None).unwrap(), Plan::List(ListOp::Show { json: false })));
        assert!(matches!(plan(Some(Cmd::Config(ConfigCmd::Show))).unwrap(), Plan::Config(ConfigCmd::Show)));
        assert!(matches!(
            plan(Some(Cmd::Add { name: vec!["oat".into(), "milk".into()] })).unwrap(),
            Plan::List(ListOp::Add { ref name }) if name == "oat milk"
        ));
        assert!(plan(Some(Cmd::Clear { yes: false })).is_err());
        assert!(plan(Some(Cmd::Forget { yes: false })).is_err());
        assert!(matches!(plan(Some(Cmd::Clear { yes: true })).unwrap(), Plan::List(ListOp::Clear)));
    }

    #[test]
    fn cli_parses() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
        let cli = Cli::try_parse_from(["shoplist", "--data-dir", "/tmp/x", "add", "oat", "milk"]).unwrap();
        assert!(matches!(cli.cmd, Some(Cmd::Add { ref name }) if name == &["oat", "milk"]));
    }
}
