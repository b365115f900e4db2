use std::fs;
use std::path::PathBuf;

use anyhow::{anyhow, Context, Result};
use clap::{ArgAction, Parser, Subcommand};
use tracing::{info, Level};
use tracing_subscriber::util::SubscriberInitExt;

use wyrm_core::glyph::decode;
use wyrm_core::{Bundle, WindowKind};
use wyrmpack::assets::load_dir;
use wyrmpack::preview::{self, Rendered, SayOptions};
use wyrmpack::script::decode_entry;

#[derive(Parser)]
#[command(name = "wyrmpack")]
#[command(version, about = "Window and dialogue bundle tool", long_about = None)]
struct Cli {
    /// More logging; repeat for more
    #[arg(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate an asset directory and write a bundle image
    Build {
        /// Asset directory
        #[arg(default_value = "assets")]
        assets: PathBuf,

        /// Output image path
        #[arg(short, long, default_value = "wyrm.bin")]
        output: PathBuf,
    },

    /// Validate an asset directory without writing anything
    Check {
        #[arg(default_value = "assets")]
        assets: PathBuf,
    },

    /// Paint one window headlessly and print its tiles
    Preview {
        #[arg(default_value = "assets")]
        assets: PathBuf,

        /// Window kind, e.g. status, inventory, yes_no
        #[arg(short, long)]
        window: String,

        /// Entry ids for list windows
        #[arg(short, long, value_delimiter = ',')]
        entries: Vec<u8>,

        /// Quantities, parallel to the entries
        #[arg(short, long, value_delimiter = ',')]
        quantities: Vec<u8>,

        /// Give up after this many ticks
        #[arg(long, default_value_t = 600)]
        limit: u32,
    },

    /// Flow one dialogue entry into the dialogue window
    Say {
        #[arg(default_value = "assets")]
        assets: PathBuf,

        /// Dialogue entry number
        #[arg(short, long)]
        entry: usize,

        /// Press A every n ticks to get past waits
        #[arg(short, long)]
        press_every: Option<u32>,

        #[arg(long, default_value_t = 0)]
        amount: u32,

        #[arg(long, default_value_t = 0)]
        item: u8,

        #[arg(long, default_value_t = 0)]
        spell: u8,

        #[arg(long, default_value_t = 0)]
        enemy: u8,

        #[arg(long, default_value_t = 2000)]
        limit: u32,
    },

    /// List what a bundle image holds
    Dump {
        /// Bundle image
        image: PathBuf,
    },
}

fn setup_logging(verbose: u8) {
    let level = match verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .compact()
        .finish()
        .init();
}

fn print_rendered(rendered: &Rendered) {
    for line in &rendered.lines {
        println!("|{}|", line);
    }
    println!(
        "{}; {} ticks, {} patches, {} cues",
        rendered.outcome,
        rendered.ticks,
        rendered.patches,
        rendered.cues.len()
    );
}

fn dump(image: &[u8]) -> Result<()> {
    let bundle = Bundle::load(image)?;

    println!("windows:");
    for (kind, program) in bundle.windows.iter() {
        let rows = program.height_rows().map_or_else(|| "list".to_string(), |rows| rows.to_string());
        println!("  {:<16} {:>2} x {:<4} at {:?}", kind.name(), program.width, rows, program.anchor);
    }

    println!("content:");
    for (kind, id, record) in bundle.content.entries() {
        println!(
            "  {:<9} {:>3}  {:<12} {:<12} {:>5}",
            format!("{:?}", kind),
            id,
            decode(&record.first),
            decode(&record.second),
            record.cost
        );
    }

    println!("dialogue:");
    for n in 0..bundle.text.len() {
        if let Some(entry) = bundle.text.entry(n) {
            println!("  {:>3}  {}", n, decode_entry(entry));
        }
    }
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    setup_logging(cli.verbose);

    match cli.command {
        Commands::Build { assets, output } => {
            let assets = load_dir(&assets)?;
            let image = assets.bundle.write()?;
            fs::write(&output, &image).with_context(|| format!("writing {}", output.display()))?;
            info!("wrote {} ({} bytes)", output.display(), image.len());
        }
        Commands::Check { assets } => {
            load_dir(&assets)?;
            info!("{} is valid", assets.display());
        }
        Commands::Preview { assets, window, entries, quantities, limit } => {
            let kind = WindowKind::from_name(&window).ok_or_else(|| anyhow!("no window kind named '{}'", window))?;
            let assets = load_dir(&assets)?;
            print_rendered(&preview::window(&assets, kind, &entries, &quantities, limit)?);
        }
        Commands::Say { assets, entry, press_every, amount, item, spell, enemy, limit } => {
            let assets = load_dir(&assets)?;
            let options = SayOptions { entry, press_every, amount, item, spell, enemy, limit };
            print_rendered(&preview::say(&assets, options)?);
        }
        Commands::Dump { image } => {
            let bytes = fs::read(&image).with_context(|| format!("reading {}", image.display()))?;
            dump(&bytes)?;
        }
    }
    Ok(())
}
