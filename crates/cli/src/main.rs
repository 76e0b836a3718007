//! open-ragnok CLI: command-line mouse configuration tool.

use std::time::Duration;

use anyhow::Result;
use clap::{Parser, Subcommand};
use open_ragnok_core::keymap;
use open_ragnok_core::macros::{self, MacroDefinition};
use open_ragnok_core::session::Session;
use open_ragnok_core::settings::{Rgb, Toggle};

/// Connect to the first supported mouse and apply the CLI-wide timeout.
fn open_session(timeout_ms: u64) -> Result<Session> {
    let mut session = Session::connect()?;
    session.set_read_timeout(Duration::from_millis(timeout_ms));
    Ok(session)
}

/// Resolve a trigger key name (letter, digit, or f1-f12) to its HID usage.
fn parse_key(name: &str) -> Result<u8> {
    keymap::key_from_name(name).ok_or_else(|| {
        anyhow::anyhow!("Unknown key '{name}'. Use a letter, a digit, or f1-f12")
    })
}

fn show<T: std::fmt::Display>(value: Option<T>) -> String {
    value.map_or_else(|| "unknown".to_string(), |v| v.to_string())
}

fn show_switch(value: Option<bool>) -> &'static str {
    match value {
        Some(true) => "on",
        Some(false) => "off",
        None => "unknown",
    }
}

#[derive(Parser)]
#[command(
    name = "open-ragnok",
    version,
    about = "Open-source Ragnok 2 mouse configuration",
    after_long_help = open_ragnok_core::safety::BRICKING_DISCLAIMER
)]
struct Cli {
    /// Per-command reply timeout in milliseconds.
    #[arg(long, global = true, default_value_t = 500)]
    timeout_ms: u64,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List connected Ragnok mice.
    ListDevices,
    /// Show the full device configuration.
    Status {
        /// Print machine-readable JSON instead of text.
        #[arg(long)]
        json: bool,
    },
    /// Get the DPI of the active level.
    GetDpi,
    /// Set DPI on the active level (100-25500, multiples of 100).
    SetDpi {
        /// DPI value to set.
        value: u32,
    },
    /// Switch to one of the five stored DPI levels.
    SetDpiLevel {
        /// Level index (0-4).
        level: u8,
    },
    /// Get current polling rate.
    GetRate,
    /// Set polling rate (125, 250, 500, or 1000 Hz).
    SetRate {
        /// Polling rate in Hz.
        value: u16,
    },
    /// Switch a sensor option on or off.
    SetToggle {
        /// Option: ripple, snap, or sync.
        name: String,
        /// State: on or off.
        state: String,
    },
    /// Select the LED effect (1-5; mode 2 is steady color).
    SetLedMode {
        /// Effect mode number.
        mode: u8,
        /// Color as RRGGBB hex, honored by mode 2 only.
        #[arg(long)]
        color: Option<String>,
    },
    /// Adjust LED brightness and/or effect speed (1-10).
    SetLed {
        #[arg(long)]
        brightness: Option<u8>,
        #[arg(long)]
        speed: Option<u8>,
    },
    /// Program the button-4 typing macro and arm it.
    ProgramMacro {
        /// Text the mouse will type.
        text: String,
        /// Hold time per keypress, in milliseconds.
        #[arg(long, default_value_t = macros::PRESS_DELAY_DEFAULT_MS)]
        press_delay_ms: u16,
        /// Gap between keypresses, in milliseconds.
        #[arg(long, default_value_t = macros::INTER_KEY_DELAY_DEFAULT_MS)]
        inter_key_delay_ms: u16,
    },
    /// Point button 4 at its macro slot without reprogramming it.
    BindMacro,
    /// Restore button 4 to its stock Back action.
    UnbindMacro,
    /// Show what is stored in the macro slots.
    MacroInfo,
    /// Bind a typing macro to a keyboard key.
    SetKeyMacro {
        /// Trigger key: a letter, a digit, or f1-f12.
        key: String,
        /// Text the mouse will type.
        text: String,
        /// Hold time per keypress, in milliseconds.
        #[arg(long, default_value_t = macros::PRESS_DELAY_DEFAULT_MS)]
        press_delay_ms: u16,
        /// Gap between keypresses, in milliseconds.
        #[arg(long, default_value_t = macros::INTER_KEY_DELAY_DEFAULT_MS)]
        inter_key_delay_ms: u16,
    },
    /// Remove the macro bound to a keyboard key.
    ClearKeyMacro {
        /// Trigger key: a letter, a digit, or f1-f12.
        key: String,
    },
    /// Read the battery level.
    Battery,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::ListDevices => {
            let devices = open_ragnok_core::transport::discover_devices()?;
            if devices.is_empty() {
                println!("No Ragnok mice found.");
                println!("Ensure your mouse is connected and udev rules are set up.");
            } else {
                for dev in &devices {
                    println!(
                        "{} (VID: 0x{:04X}, PID: 0x{:04X}, path: {})",
                        dev.model.name(),
                        dev.vid,
                        dev.pid,
                        dev.path
                    );
                }
            }
        }
        Commands::Status { json } => {
            let session = open_session(cli.timeout_ms)?;
            let settings = session.settings();
            if json {
                println!("{}", serde_json::to_string_pretty(settings)?);
            } else {
                println!("Ragnok 2 configuration:");
                println!("  DPI: {} (level {})", show(settings.dpi), show(settings.dpi_level));
                println!("  Polling rate: {}", show(settings.polling_rate));
                println!("  Ripple control: {}", show_switch(settings.ripple_control));
                println!("  Angle snap: {}", show_switch(settings.angle_snap));
                println!("  Motion sync: {}", show_switch(settings.motion_sync));
                match settings.led {
                    Some(led) => println!(
                        "  LED: {}, {}, speed {}, brightness {}",
                        led.mode, led.color, led.speed, led.brightness
                    ),
                    None => println!("  LED: unknown"),
                }
                println!(
                    "  Button 4: {}",
                    match settings.button4_macro {
                        Some(true) => "typing macro",
                        Some(false) => "stock Back action",
                        None => "unknown",
                    }
                );
                match settings.macro_triggers {
                    Some(triggers) => {
                        let bound: Vec<String> = triggers
                            .iter()
                            .filter(|&&t| t != 0)
                            .map(|&t| keymap::usage_label(t))
                            .collect();
                        if bound.is_empty() {
                            println!("  Key macros: none");
                        } else {
                            println!("  Key macros: {}", bound.join(", "));
                        }
                    }
                    None => println!("  Key macros: unknown"),
                }
            }
        }
        Commands::GetDpi => {
            let mut session = open_session(cli.timeout_ms)?;
            let dpi = session.read_dpi()?;
            println!("Current DPI: {dpi}");
        }
        Commands::SetDpi { value } => {
            let mut session = open_session(cli.timeout_ms)?;
            session.set_dpi(value)?;
            println!("DPI set to {value}");
        }
        Commands::SetDpiLevel { level } => {
            let mut session = open_session(cli.timeout_ms)?;
            let dpi = session.set_dpi_level(level)?;
            println!("DPI level {level} selected ({dpi} DPI)");
        }
        Commands::GetRate => {
            let mut session = open_session(cli.timeout_ms)?;
            let rate = session.read_polling_rate()?;
            println!("Current polling rate: {} Hz", rate.as_hz());
        }
        Commands::SetRate { value } => {
            let mut session = open_session(cli.timeout_ms)?;
            session.set_polling_rate(value)?;
            println!("Polling rate set to {value} Hz");
        }
        Commands::SetToggle { name, state } => {
            let toggle = Toggle::from_name(&name).ok_or_else(|| {
                anyhow::anyhow!("Unknown option '{name}'. Valid options: ripple, snap, sync")
            })?;
            let enabled = match state.as_str() {
                "on" => true,
                "off" => false,
                other => anyhow::bail!("Expected 'on' or 'off', got '{other}'"),
            };
            let mut session = open_session(cli.timeout_ms)?;
            session.set_toggle(toggle, enabled)?;
            println!("{} is now {state}", toggle.label());
        }
        Commands::SetLedMode { mode, color } => {
            let color = match color {
                Some(hex) => Some(Rgb::from_hex(&hex).ok_or_else(|| {
                    anyhow::anyhow!("Invalid color '{hex}'. Expected RRGGBB hex")
                })?),
                None => None,
            };
            let mut session = open_session(cli.timeout_ms)?;
            session.set_led_mode(mode, color)?;
            println!("LED effect set to mode {mode}");
        }
        Commands::SetLed { brightness, speed } => {
            if brightness.is_none() && speed.is_none() {
                anyhow::bail!("Nothing to change. Pass --brightness and/or --speed");
            }
            let mut session = open_session(cli.timeout_ms)?;
            session.set_led_levels(brightness, speed)?;
            if let Some(b) = brightness {
                println!("LED brightness set to {b}");
            }
            if let Some(s) = speed {
                println!("LED speed set to {s}");
            }
        }
        Commands::ProgramMacro {
            text,
            press_delay_ms,
            inter_key_delay_ms,
        } => {
            let def = MacroDefinition::from_text(&text, press_delay_ms, inter_key_delay_ms)?;
            let mut session = open_session(cli.timeout_ms)?;
            session.set_button4_macro(&def)?;
            println!("Button 4 now types {text:?} ({} events)", def.len());
        }
        Commands::BindMacro => {
            let mut session = open_session(cli.timeout_ms)?;
            session.bind_button4(true)?;
            println!("Button 4 armed to fire its macro slot");
        }
        Commands::UnbindMacro => {
            let mut session = open_session(cli.timeout_ms)?;
            session.bind_button4(false)?;
            println!("Button 4 restored to its stock Back action");
        }
        Commands::MacroInfo => {
            let mut session = open_session(cli.timeout_ms)?;
            let info = session.button4_macro_info()?;
            let health = if info.checksum_ok {
                ""
            } else {
                " (incomplete write, disarmed)"
            };
            println!("Button 4 slot: '{}', {} events{health}", info.name, info.events);
            let triggers = session.macro_triggers()?;
            for (slot, &trigger) in triggers.iter().enumerate() {
                if trigger == 0 {
                    continue;
                }
                let info = session.keyboard_macro_info(slot as u8)?;
                let health = if info.checksum_ok {
                    ""
                } else {
                    " (incomplete write, disarmed)"
                };
                println!(
                    "Key {}: '{}', {} events{health}",
                    keymap::usage_label(trigger),
                    info.name,
                    info.events
                );
            }
        }
        Commands::SetKeyMacro {
            key,
            text,
            press_delay_ms,
            inter_key_delay_ms,
        } => {
            let trigger = parse_key(&key)?;
            let def = MacroDefinition::from_text(&text, press_delay_ms, inter_key_delay_ms)?;
            let mut session = open_session(cli.timeout_ms)?;
            let slot = session.set_keyboard_macro(trigger, &def)?;
            println!("Key {key} now types {text:?} (slot {slot})");
        }
        Commands::ClearKeyMacro { key } => {
            let trigger = parse_key(&key)?;
            let mut session = open_session(cli.timeout_ms)?;
            if session.clear_keyboard_macro(trigger)? {
                println!("Key {key} unbound");
            } else {
                println!("Key {key} was not bound to a macro");
            }
        }
        Commands::Battery => {
            let mut session = open_session(cli.timeout_ms)?;
            let report = session.read_battery()?;
            if report.charging {
                println!("Battery: {}% (charging)", report.percent);
            } else {
                println!("Battery: {}%", report.percent);
            }
        }
    }

    Ok(())
}
