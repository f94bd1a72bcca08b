//! `pitest` command line.
//!
//! Parsing and rendering live here so they can be driven against any
//! [`Driver`]; the binary only wires them to the real device and stdout.

use std::io::Write;

use crate::abi::DeviceInfo;
use crate::codec::{self, Value};
use crate::control::{DriverEvent, PiControl};
use crate::error::PiControlError;
use crate::transport::Driver;

/// Output format of `read`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Format {
    #[default]
    Decimal,
    Hex,
    Binary,
}

impl Format {
    fn parse(value: &str) -> Result<Self, UsageError> {
        match value.chars().next() {
            Some('d') => Ok(Format::Decimal),
            Some('h') => Ok(Format::Hex),
            Some('b') => Ok(Format::Binary),
            _ => Err(UsageError::InvalidValue {
                flag: "-f",
                value: value.to_string(),
            }),
        }
    }
}

/// A parsed `pitest` invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CliCommand {
    Read {
        name: String,
        format: Format,
        quiet: bool,
    },
    Write {
        name: String,
        value: u32,
    },
    Variable {
        name: String,
    },
    List,
    Reset,
    Wait,
    Firmware {
        address: u32,
    },
    Counter {
        address: u8,
        bitfield: u16,
    },
}

/// Bad command line. Always answered with the usage text and status 1.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum UsageError {
    #[error("a subcommand is required")]
    MissingCommand,

    #[error("help requested")]
    Help,

    #[error("invalid command '{0}'")]
    UnknownCommand(String),

    #[error("unknown flag '{flag}' for {command}")]
    UnknownFlag { command: &'static str, flag: String },

    #[error("flag {0} needs a value")]
    MissingValue(&'static str),

    #[error("{command} requires {flag}")]
    MissingFlag {
        command: &'static str,
        flag: &'static str,
    },

    #[error("invalid value '{value}' for {flag}")]
    InvalidValue { flag: &'static str, value: String },
}

/// Failure while running a parsed command.
#[derive(Debug, thiserror::Error)]
pub enum CliError {
    #[error(transparent)]
    PiControl(#[from] PiControlError),

    #[error("cannot write output: {0}")]
    Output(#[from] std::io::Error),
}

/// Usage text, printed on any [`UsageError`].
pub fn usage(program: &str) -> String {
    format!(
        "a subcommand is required, valid options are [read|write|variable|ls|reset|wait|firmware|counter]:
read     -n NAME [-f d|h|b] [-q]  read variable value
write    -n NAME -v VALUE         write variable value
variable -n NAME                  show variable info
ls                                list devices
reset                             reset the driver
wait                              wait for the next driver event
firmware [-a ADDRESS]             update module firmware (0: all modules)
counter  -a ADDRESS -b BITFIELD   reset DIO counters

For example to read the RevPi Core LED:
{program} read -n RevPiLED
"
    )
}

struct Flags {
    command: &'static str,
    values: Vec<(&'static str, String)>,
    switches: Vec<&'static str>,
}

impl Flags {
    /// Accepts `-x VALUE`, `-x=VALUE` and the `--x` spellings of each.
    fn parse(
        command: &'static str,
        args: &[String],
        valued: &[&'static str],
        switches: &[&'static str],
    ) -> Result<Self, UsageError> {
        let mut flags = Flags {
            command,
            values: Vec::new(),
            switches: Vec::new(),
        };

        let mut iter = args.iter();
        while let Some(arg) = iter.next() {
            let unknown = || UsageError::UnknownFlag {
                command,
                flag: arg.clone(),
            };
            let body = arg
                .strip_prefix("--")
                .or_else(|| arg.strip_prefix('-'))
                .ok_or_else(unknown)?;
            let (key, inline) = match body.split_once('=') {
                Some((key, value)) => (key, Some(value.to_string())),
                None => (body, None),
            };

            if let Some(flag) = valued.iter().copied().find(|f| f[1..] == *key) {
                let value = match inline {
                    Some(value) => value,
                    None => iter.next().cloned().ok_or(UsageError::MissingValue(flag))?,
                };
                flags.values.push((flag, value));
            } else if let Some(flag) = switches.iter().copied().find(|f| f[1..] == *key) {
                flags.switches.push(flag);
            } else if key == "h" || key == "help" {
                return Err(UsageError::Help);
            } else {
                return Err(unknown());
            }
        }
        Ok(flags)
    }

    /// Last value given for `flag`.
    fn value(&self, flag: &str) -> Option<&str> {
        self.values
            .iter()
            .rev()
            .find(|(f, _)| *f == flag)
            .map(|(_, v)| v.as_str())
    }

    fn required(&self, flag: &'static str) -> Result<&str, UsageError> {
        match self.value(flag) {
            Some(value) if !value.is_empty() => Ok(value),
            _ => Err(UsageError::MissingFlag {
                command: self.command,
                flag,
            }),
        }
    }

    fn switch(&self, flag: &str) -> bool {
        self.switches.iter().any(|s| *s == flag)
    }
}

/// Parses a decimal or `0x`-prefixed hexadecimal number.
fn parse_number<T: TryFrom<u64>>(flag: &'static str, value: &str) -> Result<T, UsageError> {
    let parsed = match value
        .strip_prefix("0x")
        .or_else(|| value.strip_prefix("0X"))
    {
        Some(hex) => u64::from_str_radix(hex, 16),
        None => value.parse::<u64>(),
    };
    parsed
        .ok()
        .and_then(|n| T::try_from(n).ok())
        .ok_or_else(|| UsageError::InvalidValue {
            flag,
            value: value.to_string(),
        })
}

/// Parses the arguments following the program name.
pub fn parse<I>(args: I) -> Result<CliCommand, UsageError>
where
    I: IntoIterator<Item = String>,
{
    let mut args = args.into_iter();
    let command = args.next().ok_or(UsageError::MissingCommand)?;
    let rest: Vec<String> = args.collect();

    match command.as_str() {
        "-h" | "--help" | "help" => Err(UsageError::Help),
        "read" => {
            let flags = Flags::parse("read", &rest, &["-n", "-f"], &["-q"])?;
            Ok(CliCommand::Read {
                name: flags.required("-n")?.to_string(),
                format: flags
                    .value("-f")
                    .map(Format::parse)
                    .transpose()?
                    .unwrap_or_default(),
                quiet: flags.switch("-q"),
            })
        }
        "write" => {
            let flags = Flags::parse("write", &rest, &["-n", "-v"], &[])?;
            Ok(CliCommand::Write {
                name: flags.required("-n")?.to_string(),
                value: parse_number("-v", flags.required("-v")?)?,
            })
        }
        "variable" => {
            let flags = Flags::parse("variable", &rest, &["-n"], &[])?;
            Ok(CliCommand::Variable {
                name: flags.required("-n")?.to_string(),
            })
        }
        "ls" => {
            Flags::parse("ls", &rest, &[], &[])?;
            Ok(CliCommand::List)
        }
        "reset" => {
            Flags::parse("reset", &rest, &[], &[])?;
            Ok(CliCommand::Reset)
        }
        "wait" => {
            Flags::parse("wait", &rest, &[], &[])?;
            Ok(CliCommand::Wait)
        }
        "firmware" => {
            let flags = Flags::parse("firmware", &rest, &["-a"], &[])?;
            let address = match flags.value("-a") {
                Some(value) => parse_number("-a", value)?,
                None => 0,
            };
            Ok(CliCommand::Firmware { address })
        }
        "counter" => {
            let flags = Flags::parse("counter", &rest, &["-a", "-b"], &[])?;
            Ok(CliCommand::Counter {
                address: parse_number("-a", flags.required("-a")?)?,
                bitfield: parse_number("-b", flags.required("-b")?)?,
            })
        }
        other => Err(UsageError::UnknownCommand(other.to_string())),
    }
}

/// Runs `command` against `pi`, writing what the user sees to `out`.
pub fn run<D, W>(pi: &mut PiControl<D>, command: &CliCommand, out: &mut W) -> Result<(), CliError>
where
    D: Driver,
    W: Write,
{
    match command {
        CliCommand::Read {
            name,
            format,
            quiet,
        } => {
            if !quiet {
                writeln!(out, "reading variable: {name}")?;
            }
            let reading = pi.read_variable(name)?;
            render_value(out, name, reading.value, *format, *quiet)?;
        }
        CliCommand::Write { name, value } => {
            writeln!(out, "writing variable: {name}, value: {value}")?;
            let written = pi.write_variable(name, *value)?;
            let v = written.value.as_u32();
            writeln!(
                out,
                "written value {v} dec (={v:02x} hex) to offset {}.",
                written.variable.address
            )?;
        }
        CliCommand::Variable { name } => {
            writeln!(out, "reading variable info: {name}")?;
            let variable = pi.variable_info(name)?;
            writeln!(out, "variable name: {}", variable.name)?;
            writeln!(out, "       offset: {}", variable.address)?;
            writeln!(out, "       length: {}", variable.length)?;
            writeln!(out, "          bit: {}", variable.bit)?;
        }
        CliCommand::List => {
            let devices = pi.device_list()?;
            render_devices(out, &devices)?;
        }
        CliCommand::Reset => pi.reset()?,
        CliCommand::Wait => match pi.wait_for_event()? {
            DriverEvent::Reset => writeln!(out, "event: reset")?,
            DriverEvent::Other(code) => writeln!(out, "event: {code}")?,
        },
        CliCommand::Firmware { address } => {
            let update = pi.update_firmware(*address)?;
            writeln!(out, "firmware update result: {}", update.result)?;
            if let Some(message) = update.message {
                writeln!(out, "{message}")?;
            }
        }
        CliCommand::Counter { address, bitfield } => {
            let result = pi.reset_counter(*address, *bitfield)?;
            writeln!(
                out,
                "reset counters 0x{bitfield:04x} of module {address}: {result}"
            )?;
        }
    }
    Ok(())
}

fn render_value<W: Write>(
    out: &mut W,
    name: &str,
    value: Value,
    format: Format,
    quiet: bool,
) -> std::io::Result<()> {
    let v = value.as_u32();
    let Ok(bytes) = codec::encode(value) else {
        // Bits have no byte form.
        return if quiet {
            writeln!(out, "{v}")
        } else {
            writeln!(out, "Bit value: {v}")
        };
    };
    let size = bytes.len();

    match (format, quiet) {
        (Format::Hex, false) => writeln!(
            out,
            "{size} byte-value of {name}: {} hex bytes (={v} dec)",
            hex::encode(&bytes)
        ),
        (Format::Hex, true) => writeln!(out, "{v:x}"),
        (Format::Binary, quiet) => {
            if !quiet {
                write!(out, "{size} byte value of {name}: ")?;
            }
            let spaced: Vec<String> = v.to_le_bytes().iter().map(|b| format!("{b:02x}")).collect();
            writeln!(out, "binary value: {}", spaced.join(" "))
        }
        (Format::Decimal, false) => writeln!(
            out,
            "{size} byte-value of {name}: {v} dec (={} hex bytes)",
            hex::encode(&bytes)
        ),
        (Format::Decimal, true) => writeln!(out, "{v}"),
    }
}

fn render_devices<W: Write>(out: &mut W, devices: &[DeviceInfo]) -> std::io::Result<()> {
    writeln!(out, "Found {} devices:", devices.len())?;
    for device in devices {
        writeln!(
            out,
            "Address: {} module type: {} (0x{:x}) {} V{}.{}",
            device.address,
            device.module_type,
            device.module_type,
            device.module_name(),
            device.sw_major,
            device.sw_minor
        )?;

        if device.active {
            writeln!(out, "Module is present")?;
        } else if device.is_disconnected() {
            writeln!(out, "Module is NOT present, data is NOT available!!!")?;
        } else {
            writeln!(out, "Module is present, but NOT CONFIGURED!!!")?;
        }

        writeln!(
            out,
            "     input offset: {} length: {}",
            device.input_offset, device.input_length
        )?;
        writeln!(
            out,
            "    output offset: {} length: {}",
            device.output_offset, device.output_length
        )?;
        writeln!(out)?;
    }
    Ok(())
}
