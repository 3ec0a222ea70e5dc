use std::env;
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use codebasenotes_annotations::AnnotationService;

#[derive(Parser)]
#[command(
    name = "codebasenotes",
    about = "Attach free-text notes to files and folders in a project tree",
    author,
    version
)]
struct Cli {
    /// 指定工作區根目錄；預設為目前目錄。 / Workspace root (defaults to current directory).
    #[arg(long, global = true, value_name = "PATH")]
    workspace: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// 為相對路徑設定註解。 / Set the annotation for a relative path.
    Set { path: String, text: String },
    /// 印出相對路徑的註解；沒有註解時輸出空白。 / Print the annotation (empty when absent).
    Get { path: String },
    /// 移除相對路徑的註解節點。 / Remove the annotation node for a path.
    Remove { path: String },
    /// 將註解搬移到新路徑（僅搬移該節點的註解值）。 / Move a single annotation value to a new path.
    #[command(name = "move")]
    Move { old: String, new: String },
    /// 列出所有註解，一行一筆 `path<TAB>annotation`。 / List every annotation as `path<TAB>annotation`.
    List {
        /// 依註解內容排序輸出。 / Sort output by annotation text.
        #[arg(long)]
        sort_annotation: bool,
    },
    /// 清除被忽略或空白的節點並立即存檔。 / Drop ignored/empty nodes and save.
    Prune,
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();
    let workspace = match cli.workspace {
        Some(path) => path,
        None => env::current_dir().context("could not determine the current directory")?,
    };
    let mut service = AnnotationService::open(&workspace)
        .with_context(|| format!("could not open annotations in {}", workspace.display()))?;

    match cli.command {
        Commands::Set { path, text } => {
            let accepted = service
                .set_annotation(&path, text)
                .with_context(|| format!("could not save the annotation for {path}"))?;
            if !accepted {
                bail!("{path} is ignored by .gitignore and cannot be annotated");
            }
        }
        Commands::Get { path } => {
            println!("{}", service.annotation(&path));
        }
        Commands::Remove { path } => {
            service
                .remove_annotation(&path)
                .with_context(|| format!("could not remove the annotation for {path}"))?;
        }
        Commands::Move { old, new } => {
            service
                .move_annotation(&old, &new)
                .with_context(|| format!("could not move the annotation from {old} to {new}"))?;
        }
        Commands::List { sort_annotation } => {
            let mut entries = service.list_all();
            if sort_annotation {
                entries.sort_by(|a, b| a.annotation.cmp(&b.annotation));
            }
            for entry in entries {
                println!("{}\t{}", entry.path, entry.annotation);
            }
        }
        Commands::Prune => {
            service.prune().context("could not prune the annotations")?;
        }
    }

    Ok(())
}
