extern crate serde;
extern crate serde_json;

use anyhow::Result;

#[macro_use]
extern crate serde_derive;

mod cli;
mod common;
mod config;
mod export;
mod feed;
mod normalize;
mod push;
mod views;
mod youtube;

fn main() -> Result<()> {
    cli::main()
}
