use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "ssd")]
#[command(about = "Simulated 100-LBA SSD with a write-back buffer", long_about = None)]
pub struct Cli {
    /// Directory holding the block array, buffer and output files
    #[arg(long, env = "SSD_DATA_DIR", default_value = ".", global = true)]
    pub data_dir: PathBuf,

    /// Seconds to wait for another process to release the device
    #[arg(long, env = "SSD_LOCK_TIMEOUT_SECS", default_value_t = 10, global = true)]
    pub lock_timeout_secs: u64,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Execute one command: R <lba> | W <lba> <value> | E <lba> <size> | F
    Run {
        #[arg(value_name = "MODE_AND_ARGS", trailing_var_arg = true, allow_hyphen_values = true)]
        tokens: Vec<String>,
    },
    /// Read commands from stdin, one per line, printing one result per line
    Serve,
    /// Zero every LBA and empty the buffer
    Format,
    /// Print the buffer slots and non-zero LBAs
    Debug,
}
