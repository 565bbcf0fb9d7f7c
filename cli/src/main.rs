//! logsync CLI — show engine defaults and version info.
//!
//! Usage:
//! ```bash
//! logsync info
//! logsync version
//! ```

use std::env;
use std::process;

use logsync_core::SyncConfig;

fn main() {
    let args: Vec<String> = env::args().collect();
    if args.len() < 2 {
        print_usage();
        process::exit(1);
    }

    match args[1].as_str() {
        "info" => cmd_info(),
        "version" | "--version" | "-V" => {
            println!("logsync {}", env!("CARGO_PKG_VERSION"));
        }
        "help" | "--help" | "-h" => print_usage(),
        other => {
            eprintln!("Unknown command: {other}");
            print_usage();
            process::exit(1);
        }
    }
}

fn print_usage() {
    println!("logsync {}", env!("CARGO_PKG_VERSION"));
    println!("Restart-safe contract log synchronization engine\n");
    println!("USAGE:");
    println!("    logsync <COMMAND>\n");
    println!("COMMANDS:");
    println!("    info     Show LogSync engine defaults");
    println!("    version  Print version");
    println!("    help     Print this help");
}

fn cmd_info() {
    let defaults = SyncConfig::default();
    println!("LogSync v{}", env!("CARGO_PKG_VERSION"));
    println!("  Default block batch: {} blocks/window", defaults.block_batch);
    println!("  Default gate capacity: {} heights", defaults.gate_capacity);
    println!("  Default retry backoff: {} ms", defaults.retry_backoff_ms);
    println!("  Handler failure policy: {:?}", defaults.on_handler_failure);
    println!("  Storage backends: memory, SQLite (feature: sqlite)");
    println!("  Sources: EVM JSON-RPC (eth_getLogs)");
}
