//! pitest: command-line access to the piControl process image
//!
//! Reads and writes named variables, lists attached modules, resets the
//! driver and triggers firmware updates.
//!
//! ## Configuration
//! - PICONTROL__DEVICE__PATH: device node (default: /dev/piControl0)
//! - PICONTROL_CONFIG: YAML file with the same settings (optional)
//! - PICONTROL_LOG: log filter, written to stderr (default: info)

use std::io;
use std::process::ExitCode;

use tracing::debug;

use picontrol::cli::{self, UsageError};
use picontrol::config::Config;
use picontrol::utils::bootstrap::init_tracing;
use picontrol::PiControl;

fn main() -> ExitCode {
    init_tracing();

    let mut args = std::env::args();
    let program = args.next().unwrap_or_else(|| "pitest".to_string());

    let command = match cli::parse(args) {
        Ok(command) => command,
        Err(e) => {
            if e != UsageError::Help {
                eprintln!("{e}");
            }
            eprint!("{}", cli::usage(&program));
            return ExitCode::FAILURE;
        }
    };

    let config = match Config::load(None) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("invalid configuration: {e}");
            return ExitCode::FAILURE;
        }
    };
    debug!(device = %config.device.path.display(), ?command, "running");

    let mut pi = PiControl::from_config(&config);
    let result = cli::run(&mut pi, &command, &mut io::stdout().lock());
    let _ = pi.close();

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{e}");
            ExitCode::FAILURE
        }
    }
}
