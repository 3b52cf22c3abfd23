use crate::cli::run;

mod annotate;
pub mod cli;
mod config;
mod deezer;
pub mod dom;
pub mod domain;
mod error;
mod page;

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    if let Err(e) = run() {
        log::error!("{e:#}");
        std::process::exit(1);
    }
}
