use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;
use kiwire_connect::{ConnectError, NetPin};
use serde::Serialize;

use crate::session::SessionArgs;

#[derive(Args, Debug)]
pub struct ListArgs {
    #[arg(value_name = "SCHEMATIC", value_hint = clap::ValueHint::FilePath)]
    pub schematic: PathBuf,

    /// Print JSON instead of text
    #[arg(long)]
    pub json: bool,

    /// Also print every pin and its position
    #[arg(short, long)]
    pub pins: bool,
}

#[derive(Args, Debug)]
pub struct PositionArgs {
    #[arg(value_name = "SCHEMATIC", value_hint = clap::ValueHint::FilePath)]
    pub schematic: PathBuf,

    /// Reference designator
    pub reference: String,

    /// Pin name or number; the component origin when omitted
    pub pin: Option<String>,

    #[arg(long)]
    pub json: bool,
}

#[derive(Args, Debug)]
pub struct NetsArgs {
    #[arg(value_name = "SCHEMATIC", value_hint = clap::ValueHint::FilePath)]
    pub schematic: PathBuf,

    #[arg(long)]
    pub json: bool,
}

#[derive(Args, Debug)]
pub struct UnconnectedArgs {
    #[arg(value_name = "SCHEMATIC", value_hint = clap::ValueHint::FilePath)]
    pub schematic: PathBuf,

    #[arg(long)]
    pub json: bool,
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value).context("Failed to serialize output")?;
    println!("{json}");
    Ok(())
}

pub fn list(args: ListArgs, session: &SessionArgs) -> Result<()> {
    let session = session.open(&args.schematic)?;
    let components = session.resolver().components();

    if args.json {
        return print_json(components);
    }

    for component in components {
        let value = if component.value.is_empty() {
            String::new()
        } else {
            format!(" {}", component.value)
        };
        println!(
            "{}{} ({}, {} pins)",
            component.reference.bold(),
            value,
            component.lib_id,
            component.pins.len()
        );
        if args.pins {
            for pin in &component.pins {
                println!(
                    "  {:<8} {:>9.4} {:>9.4}",
                    pin.designator, pin.position.x, pin.position.y
                );
            }
        }
    }
    Ok(())
}

#[derive(Serialize)]
struct Located<'a> {
    reference: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pin: Option<&'a str>,
    x: f64,
    y: f64,
}

pub fn position(args: PositionArgs, session: &SessionArgs) -> Result<()> {
    let session = session.open(&args.schematic)?;

    let position = match &args.pin {
        Some(pin) => session.resolver().resolve_pin(&args.reference, pin)?,
        None => session
            .schematic()
            .symbol_position(&args.reference)
            .ok_or_else(|| ConnectError::ComponentNotFound(args.reference.clone()))?,
    };

    if args.json {
        return print_json(&Located {
            reference: &args.reference,
            pin: args.pin.as_deref(),
            x: position.x,
            y: position.y,
        });
    }
    println!("{} {}", position.x, position.y);
    Ok(())
}

fn pin_list(pins: &[NetPin]) -> String {
    pins.iter()
        .map(|p| format!("{}.{}", p.reference, p.pin))
        .collect::<Vec<_>>()
        .join(" ")
}

pub fn nets(args: NetsArgs, session: &SessionArgs) -> Result<()> {
    let session = session.open(&args.schematic)?;
    let nets = session.resolver().nets();

    if args.json {
        return print_json(&nets);
    }

    for net in &nets {
        let name = if net.explicit {
            net.name.bold()
        } else {
            net.name.dimmed()
        };
        println!("{name}: {}", pin_list(&net.pins));
    }
    Ok(())
}

pub fn unconnected(args: UnconnectedArgs, session: &SessionArgs) -> Result<()> {
    let session = session.open(&args.schematic)?;
    let pins: Vec<NetPin> = session
        .resolver()
        .find_unconnected_pins()
        .map(|(reference, pin)| NetPin {
            reference: reference.to_string(),
            pin: pin.to_string(),
        })
        .collect();

    if args.json {
        return print_json(&pins);
    }

    if pins.is_empty() {
        println!("{}", "All pins connected".green());
        return Ok(());
    }
    for pin in &pins {
        println!("{}.{}", pin.reference.yellow(), pin.pin);
    }
    eprintln!("{} unconnected pins", pins.len());
    Ok(())
}
