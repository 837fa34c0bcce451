// CLASSIFICATION: COMMUNITY
// Filename: iosctl.rs v0.1
// Author: Lukas Bower
// Date Modified: 2027-08-13

use clap::{Parser, Subcommand};
use ios_ipc::device::lock;
use ios_ipc::memory_layout;
use ios_ipc::net::kd::{area_code, hardware_model, make_user_id};
use ios_ipc::{FlatMemory, IpcConfig, IpcResult, Kernel, RecordingInterface};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "iosctl", about = "Inspect the IOS IPC layer", version = "0.1")]
struct Cli {
    /// TOML file with IpcConfig overrides
    #[arg(long)]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List the standard device table
    Devices,
    /// Print the low-memory layout of an IOS version
    Layout { ios: u16 },
    /// Derive the WiiConnect24 user id for the configured console
    UserId {
        #[arg(long, default_value_t = 0)]
        counter: u16,
    },
}

fn main() {
    env_logger::init();
    let cli = Cli::parse();
    if let Err(e) = run(cli) {
        eprintln!("iosctl: {e}");
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> IpcResult<()> {
    let config = match &cli.config {
        Some(path) => IpcConfig::load(path)?,
        None => IpcConfig::default(),
    };
    match cli.command {
        Commands::Devices => {
            let kernel = Kernel::new(
                config,
                Box::new(FlatMemory::new(0x4000)),
                Box::new(RecordingInterface::new()),
            )?;
            for device in kernel.devices().all()? {
                let dev = lock(&device);
                println!("{:>3}  {}", dev.id(), dev.name());
            }
        }
        Commands::Layout { ios } => match memory_layout::lookup(u64::from(ios)) {
            Some(v) => {
                println!("IOS{}  version {:#x}  date {:#010x}", v.ios_number, v.ios_version, v.ios_date);
                println!("mem2 end          {:#010x}", v.mem2_end);
                println!("mem2 arena        {:#010x}..{:#010x}", v.mem2_arena_begin, v.mem2_arena_end);
                println!("ipc buffer        {:#010x}..{:#010x}", v.ipc_buffer_begin, v.ipc_buffer_end);
                println!("unknown           {:#010x}..{:#010x}", v.unknown_begin, v.unknown_end);
                println!("ram vendor        {:#010x}", v.ram_vendor);
            }
            None => {
                eprintln!("IOS{ios} is not in the layout table");
                std::process::exit(2);
            }
        },
        Commands::UserId { counter } => {
            let (id, ret) = make_user_id(
                config.hollywood_id,
                counter,
                hardware_model(&config.model),
                area_code(&config.area),
            );
            println!("{id:016} (status {ret})");
        }
    }
    Ok(())
}
