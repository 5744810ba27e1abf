use std::path::PathBuf;

use anyhow::Result;
use clap::Args;
use colored::Colorize;
use kiwire_connect::recipes;
use kiwire_connect::{Connection, Endpoint};

use crate::session::{save, SessionArgs};

#[derive(Args, Debug)]
pub struct ConnectArgs {
    #[arg(value_name = "SCHEMATIC", value_hint = clap::ValueHint::FilePath)]
    pub schematic: PathBuf,

    /// REF.PIN, x,y or a net name
    pub a: Endpoint,

    /// REF.PIN, x,y or a net name
    pub b: Endpoint,

    /// Name the resulting net, renaming any existing net
    #[arg(long, value_name = "NAME")]
    pub net: Option<String>,
}

fn report(connection: &Connection) -> String {
    if connection.is_noop() {
        return format!("already on {}", connection.net.bold());
    }
    let mut parts = vec![format!("{} wires", connection.wires.len())];
    if !connection.junctions.is_empty() {
        parts.push(format!("{} junctions", connection.junctions.len()));
    }
    if connection.label.is_some() {
        parts.push("label".to_string());
    }
    format!("{} ({})", connection.net.bold(), parts.join(", "))
}

pub fn execute(args: ConnectArgs, session: &SessionArgs) -> Result<()> {
    let mut session = session.open(&args.schematic)?;
    let connection = session
        .resolver_mut()
        .connect(&args.a, &args.b, args.net.as_deref())?;
    println!(
        "{} {} to {}: {}",
        "Connected".green(),
        args.a,
        args.b,
        report(&connection)
    );

    if connection.is_noop() {
        return Ok(());
    }
    save(&mut session)
}

#[derive(Args, Debug)]
pub struct PowerArgs {
    #[arg(value_name = "SCHEMATIC", value_hint = clap::ValueHint::FilePath)]
    pub schematic: PathBuf,

    /// Net to tie supply pins to, e.g. +3V3
    pub rail: String,

    /// Only these components (repeatable); all when omitted
    #[arg(long = "component", short = 'c', value_name = "REF")]
    pub components: Vec<String>,
}

#[derive(Args, Debug)]
pub struct GroundArgs {
    #[arg(value_name = "SCHEMATIC", value_hint = clap::ValueHint::FilePath)]
    pub schematic: PathBuf,

    #[arg(long = "component", short = 'c', value_name = "REF")]
    pub components: Vec<String>,
}

/// Print the tally. Returns whether anything was drawn.
fn summarize(connections: &[Connection], net: &str) -> bool {
    let added = connections.iter().filter(|c| !c.is_noop()).count();
    println!(
        "{} {added} pins to {} ({} already there)",
        "Connected".green(),
        net.bold(),
        connections.len() - added
    );
    added > 0
}

pub fn power(args: PowerArgs, session: &SessionArgs) -> Result<()> {
    let mut session = session.open(&args.schematic)?;
    let selected: Vec<&str> = args.components.iter().map(String::as_str).collect();
    let filter = (!selected.is_empty()).then_some(selected.as_slice());

    let connections = recipes::connect_power(session.resolver_mut(), &args.rail, filter)?;
    if !summarize(&connections, &args.rail) {
        return Ok(());
    }
    save(&mut session)
}

pub fn ground(args: GroundArgs, session: &SessionArgs) -> Result<()> {
    let mut session = session.open(&args.schematic)?;
    let selected: Vec<&str> = args.components.iter().map(String::as_str).collect();
    let filter = (!selected.is_empty()).then_some(selected.as_slice());

    let connections = recipes::connect_grounds(session.resolver_mut(), filter)?;
    if !summarize(&connections, recipes::GROUND_NET) {
        return Ok(());
    }
    save(&mut session)
}
