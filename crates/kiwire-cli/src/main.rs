use clap::{Parser, Subcommand};

mod connect;
mod edit;
mod inspect;
mod session;

#[derive(Parser)]
#[command(name = "kiwire")]
#[command(about = "Symbolic wiring for KiCad schematics", long_about = None)]
struct Cli {
    #[command(flatten)]
    session: session::SessionArgs,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List placed components and their pins
    #[command(alias = "ls")]
    List(inspect::ListArgs),

    /// Print the position of a component or one of its pins
    Position(inspect::PositionArgs),

    /// Print every net and its pins
    Nets(inspect::NetsArgs),

    /// Print pins that are on no net and not marked no-connect
    Unconnected(inspect::UnconnectedArgs),

    /// Place a library symbol
    AddSymbol(edit::AddSymbolArgs),

    /// Draw a wire through two or more points
    AddWire(edit::AddWireArgs),

    AddJunction(edit::AddJunctionArgs),

    /// Place a net label
    AddLabel(edit::AddLabelArgs),

    /// Mark a pin or point as intentionally unconnected
    NoConnect(edit::NoConnectArgs),

    /// Move every unit of a component
    Move(edit::MoveArgs),

    /// Connect two endpoints with wires, junctions and labels
    #[command(alias = "c")]
    Connect(connect::ConnectArgs),

    /// Tie supply pins (VCC/VDD/PWR) to a power net
    Power(connect::PowerArgs),

    /// Tie GND pins to the GND net
    Ground(connect::GroundArgs),
}

fn main() -> anyhow::Result<()> {
    env_logger::init();

    let cli = Cli::parse();
    let session = &cli.session;

    match cli.command {
        Commands::List(args) => inspect::list(args, session),
        Commands::Position(args) => inspect::position(args, session),
        Commands::Nets(args) => inspect::nets(args, session),
        Commands::Unconnected(args) => inspect::unconnected(args, session),
        Commands::AddSymbol(args) => edit::add_symbol(args, session),
        Commands::AddWire(args) => edit::add_wire(args, session),
        Commands::AddJunction(args) => edit::add_junction(args, session),
        Commands::AddLabel(args) => edit::add_label(args, session),
        Commands::NoConnect(args) => edit::no_connect(args, session),
        Commands::Move(args) => edit::move_symbol(args, session),
        Commands::Connect(args) => connect::execute(args, session),
        Commands::Power(args) => connect::power(args, session),
        Commands::Ground(args) => connect::ground(args, session),
    }
}
