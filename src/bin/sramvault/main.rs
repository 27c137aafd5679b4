use anyhow::Result;
use env_logger::{Builder, Env};
use log::error;

mod cli;
mod util;
mod cmd_list;
mod cmd_verify;
mod cmd_export;
mod cmd_import;
mod cmd_pin;
mod cmd_migrate;

fn init_logger() {
    // Уровень берём из RUST_LOG, иначе дефолт: info.
    // Пример: RUST_LOG=debug ./sramvault list --db game.sav.sqlite3
    Builder::from_env(Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();
}

fn main() {
    init_logger();

    if let Err(e) = run() {
        error!("{:#}", e);
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = cli::Cli::parse_args();
    match cli.cmd {
        cli::Cmd::List { db, json } => cmd_list::exec(db, json),

        cli::Cmd::Verify { db, json } => cmd_verify::exec(db, json),

        cli::Cmd::Export { db, out } => cmd_export::exec(db, out),

        cli::Cmd::Import { save } => cmd_import::exec(save),

        cli::Cmd::Pin { db, tag } => cmd_pin::exec(db, tag),

        cli::Cmd::Migrate { db, json } => cmd_migrate::exec(db, json),
    }
}
