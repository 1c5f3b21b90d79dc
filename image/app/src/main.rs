/*++

Licensed under the Apache-2.0 license.

File Name:

   main.rs

Abstract:

    Main entry point for the boot0 imaging application

--*/
use std::path::PathBuf;

use clap::{arg, value_parser, Command};
use log::LevelFilter;
use simple_logger::SimpleLogger;

mod config;
mod create;
mod inspect;
mod verify;

/// Entry point
fn main() {
    let sub_cmds = vec![
        Command::new("create")
            .about("Create a signed boot0 image")
            .arg(
                arg!(--"config" <FILE> "Image configuration file")
                    .required(true)
                    .value_parser(value_parser!(PathBuf)),
            )
            .arg(
                arg!(--"payload" <FILE> "Payload binary")
                    .required(true)
                    .value_parser(value_parser!(PathBuf)),
            )
            .arg(
                arg!(--"out" <FILE> "Output file")
                    .required(true)
                    .value_parser(value_parser!(PathBuf)),
            ),
        Command::new("inspect")
            .about("Print the layout of a boot0 image")
            .arg(
                arg!(--"image" <FILE> "Boot0 image")
                    .required(true)
                    .value_parser(value_parser!(PathBuf)),
            ),
        Command::new("verify")
            .about("Verify a boot0 image against a policy")
            .arg(
                arg!(--"config" <FILE> "Image configuration file")
                    .required(true)
                    .value_parser(value_parser!(PathBuf)),
            )
            .arg(
                arg!(--"image" <FILE> "Boot0 image or carrier dump")
                    .required(true)
                    .value_parser(value_parser!(PathBuf)),
            ),
    ];

    let cmd = Command::new("boot0-image")
        .arg_required_else_help(true)
        .arg(
            arg!(--"log-level" <LEVEL> "Log level")
                .required(false)
                .global(true)
                .default_value("info")
                .value_parser(["off", "error", "warn", "info", "debug", "trace"]),
        )
        .subcommands(sub_cmds)
        .about("Boot0 imaging tools")
        .get_matches();

    let level = cmd
        .get_one::<String>("log-level")
        .and_then(|level| level.parse().ok())
        .unwrap_or(LevelFilter::Info);
    let _ = SimpleLogger::new().with_level(level).init();

    let result = match cmd.subcommand() {
        Some(("create", args)) => create::run_cmd(args),
        Some(("inspect", args)) => inspect::run_cmd(args),
        Some(("verify", args)) => verify::run_cmd(args),
        _ => unreachable!(),
    };

    if let Err(err) = result {
        log::error!("{err:#}");
        std::process::exit(1);
    }
}
