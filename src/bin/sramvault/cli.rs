use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Операторский CLI для sidecar-БД снапшотов SRAM
#[derive(Parser, Debug)]
#[command(name = "sramvault", version, about = "SramVault sidecar tool")]
pub struct Cli {
    #[command(subcommand)]
    pub cmd: Cmd,
}

impl Cli {
    pub fn parse_args() -> Self {
        <Self as Parser>::parse()
    }
}

#[derive(Subcommand, Debug)]
pub enum Cmd {
    /// List snapshots newest-first (id, time, crc, size, tag, integrity)
    List {
        /// Sidecar DB (<save>.sqlite3)
        #[arg(long)]
        db: PathBuf,
        #[arg(long, default_value_t = false)]
        json: bool,
    },
    /// Recompute CRC32 of every row and report which one a mount would restore
    Verify {
        #[arg(long)]
        db: PathBuf,
        #[arg(long, default_value_t = false)]
        json: bool,
    },
    /// Write the newest intact snapshot into a flat save file
    Export {
        #[arg(long)]
        db: PathBuf,
        /// Output file (written via tmp+rename)
        #[arg(long)]
        out: PathBuf,
    },
    /// Import a legacy flat save into <save>.sqlite3 (no-op if the sidecar exists)
    Import {
        #[arg(long)]
        save: PathBuf,
    },
    /// Pin the newest intact snapshot under a tag (pinned rows are never trimmed)
    Pin {
        #[arg(long)]
        db: PathBuf,
        #[arg(long)]
        tag: String,
    },
    /// Bring the sidecar schema up to date and print the migration ledger
    Migrate {
        #[arg(long)]
        db: PathBuf,
        #[arg(long, default_value_t = false)]
        json: bool,
    },
}
