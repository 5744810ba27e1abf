use std::path::PathBuf;

use anyhow::Result;
use clap::Args;
use kiwire_connect::Endpoint;
use kiwire_schematic::{LabelKind, Mirror, Position, SymbolPlacement};

use crate::session::{parse_position, save, SessionArgs};

fn parse_mirror(s: &str) -> Result<Mirror, String> {
    Mirror::parse(s).ok_or_else(|| format!("mirror must be x or y, not '{s}'"))
}

#[derive(Args, Debug)]
pub struct AddSymbolArgs {
    #[arg(value_name = "SCHEMATIC", value_hint = clap::ValueHint::FilePath)]
    pub schematic: PathBuf,

    /// Library identifier, e.g. Device:R
    #[arg(value_name = "LIB_ID")]
    pub lib_id: String,

    pub reference: String,

    #[arg(long, value_name = "X,Y", value_parser = parse_position)]
    pub at: Position,

    #[arg(long)]
    pub value: Option<String>,

    #[arg(long)]
    pub footprint: Option<String>,

    /// Degrees counter-clockwise: 0, 90, 180 or 270
    #[arg(long, default_value_t = 0.0)]
    pub rotation: f64,

    #[arg(long, value_parser = parse_mirror)]
    pub mirror: Option<Mirror>,

    #[arg(long, default_value_t = 1)]
    pub unit: u32,
}

pub fn add_symbol(args: AddSymbolArgs, session: &SessionArgs) -> Result<()> {
    let mut session = session.open(&args.schematic)?;

    let mut placement = SymbolPlacement::new(&args.lib_id, &args.reference, args.at)
        .rotation(args.rotation)
        .unit(args.unit);
    if let Some(value) = &args.value {
        placement = placement.value(value);
    }
    if let Some(footprint) = &args.footprint {
        placement = placement.footprint(footprint);
    }
    if let Some(mirror) = args.mirror {
        placement = placement.mirror(mirror);
    }

    let uuid = session.resolver_mut().add_symbol(&placement)?;
    println!("Placed {} ({}) {uuid}", args.reference, args.lib_id);
    save(&mut session)
}

#[derive(Args, Debug)]
pub struct AddWireArgs {
    #[arg(value_name = "SCHEMATIC", value_hint = clap::ValueHint::FilePath)]
    pub schematic: PathBuf,

    /// Two or more x,y points
    #[arg(value_name = "X,Y", num_args = 2.., required = true, value_parser = parse_position)]
    pub points: Vec<Position>,
}

pub fn add_wire(args: AddWireArgs, session: &SessionArgs) -> Result<()> {
    let mut session = session.open(&args.schematic)?;
    let uuids = session.resolver_mut().add_wire(&args.points)?;
    println!("Added {} wire segments", uuids.len());
    save(&mut session)
}

#[derive(Args, Debug)]
pub struct AddJunctionArgs {
    #[arg(value_name = "SCHEMATIC", value_hint = clap::ValueHint::FilePath)]
    pub schematic: PathBuf,

    #[arg(long, value_name = "X,Y", value_parser = parse_position)]
    pub at: Position,
}

pub fn add_junction(args: AddJunctionArgs, session: &SessionArgs) -> Result<()> {
    let mut session = session.open(&args.schematic)?;
    let uuid = session.resolver_mut().add_junction(args.at)?;
    println!("Added junction {uuid}");
    save(&mut session)
}

#[derive(Args, Debug)]
pub struct AddLabelArgs {
    #[arg(value_name = "SCHEMATIC", value_hint = clap::ValueHint::FilePath)]
    pub schematic: PathBuf,

    pub text: String,

    #[arg(long, value_name = "X,Y", value_parser = parse_position)]
    pub at: Position,

    #[arg(long, default_value_t = 0.0)]
    pub angle: f64,

    /// Place a global label
    #[arg(long)]
    pub global: bool,
}

pub fn add_label(args: AddLabelArgs, session: &SessionArgs) -> Result<()> {
    let mut session = session.open(&args.schematic)?;
    let kind = if args.global {
        LabelKind::Global
    } else {
        LabelKind::Local
    };
    let uuid = session
        .resolver_mut()
        .add_label(&args.text, args.at, args.angle, kind)?;
    println!("Added label {} {uuid}", args.text);
    save(&mut session)
}

#[derive(Args, Debug)]
pub struct NoConnectArgs {
    #[arg(value_name = "SCHEMATIC", value_hint = clap::ValueHint::FilePath)]
    pub schematic: PathBuf,

    /// REF.PIN or x,y
    pub target: Endpoint,
}

pub fn no_connect(args: NoConnectArgs, session: &SessionArgs) -> Result<()> {
    let mut session = session.open(&args.schematic)?;
    let resolver = session.resolver_mut();
    let uuid = match &args.target {
        Endpoint::Pin { reference, pin } => resolver.mark_no_connect(reference, pin)?,
        Endpoint::Point(position) => resolver.add_no_connect(*position)?,
        Endpoint::Net(name) => {
            anyhow::bail!("A no-connect needs a pin or a point, not net '{name}'")
        }
    };
    println!("Marked {} no-connect {uuid}", args.target);
    save(&mut session)
}

#[derive(Args, Debug)]
pub struct MoveArgs {
    #[arg(value_name = "SCHEMATIC", value_hint = clap::ValueHint::FilePath)]
    pub schematic: PathBuf,

    pub reference: String,

    #[arg(long, value_name = "X,Y", value_parser = parse_position)]
    pub to: Position,
}

pub fn move_symbol(args: MoveArgs, session: &SessionArgs) -> Result<()> {
    let mut session = session.open(&args.schematic)?;
    session.resolver_mut().move_symbol(&args.reference, args.to)?;
    println!("Moved {} to {},{}", args.reference, args.to.x, args.to.y);
    save(&mut session)
}
