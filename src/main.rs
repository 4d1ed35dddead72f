//! # PeriPage CLI
//!
//! Command-line front end for PeriPage thermal printers.
//!
//! ## Usage
//!
//! ```bash
//! # Print a line of text with the device font
//! peripage -m 00:15:83:AA:BB:CC -p A6 --text "Hello"
//!
//! # Print stdin line by line, then feed 100 rows
//! dmesg | peripage -m 00:15:83:AA:BB:CC -p A6 --stream --break 100
//!
//! # Print an image at the darkest setting
//! peripage -m 00:15:83:AA:BB:CC -p A6p -c 2 --image cat.png
//!
//! # Print a QR code
//! peripage -m 00:15:83:AA:BB:CC -p A6 --qr "https://example.com"
//!
//! # Render a text file with a TrueType font
//! peripage -m /dev/rfcomm0 -p A40 --textfile notes.txt --fontfile DejaVuSansMono.ttf --fontsize 28
//!
//! # Ask the printer to introduce itself
//! peripage -m 00:15:83:AA:BB:CC -p A6 --introduce
//! ```
//!
//! Set `RUST_LOG=debug` to see every frame sent.

use std::io::{self, BufRead};
use std::path::PathBuf;

use clap::{Args, Parser};

use peripage::{
    Concentration, FontSource, PeripageError, Printer, PrinterType, ResamplePolicy,
    TextFileOptions, protocol::DeviceInfo,
};

/// Print on a PeriPage printer via Bluetooth
#[derive(Parser, Debug)]
#[command(name = "peripage")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Bluetooth MAC address of the printer, or a bound /dev/rfcommN device
    #[arg(short, long)]
    mac: String,

    /// Printer model (A6, A6p, A40, A40p)
    #[arg(short, long)]
    printer: PrinterType,

    /// Concentration (print heat), 0-2
    #[arg(short, long, default_value_t = 0, value_parser = clap::value_parser!(u8).range(0..=2))]
    concentration: u8,

    /// Blank rows fed after the printed content, 0-255
    #[arg(short = 'b', long = "break", default_value_t = 0, value_parser = clap::value_parser!(u16).range(0..=255))]
    break_size: u16,

    #[command(flatten)]
    action: Action,

    /// Font file used with --textfile (built-in bitmap font if omitted)
    #[arg(long, value_name = "FILE")]
    fontfile: Option<PathBuf>,

    /// Font size in pixels used with --textfile
    #[arg(long, default_value_t = 20)]
    fontsize: u32,

    /// Blank pixel rows between lines used with --textfile
    #[arg(long, default_value_t = 2)]
    linebreak: usize,
}

#[derive(Args, Debug)]
#[group(required = true, multiple = false)]
struct Action {
    /// ASCII text to print; other characters are dropped
    #[arg(short, long)]
    text: Option<String>,

    /// Print text from stdin, line by line; other characters are dropped
    #[arg(short, long)]
    stream: bool,

    /// Path of an image to print
    #[arg(short, long, value_name = "FILE")]
    image: Option<PathBuf>,

    /// String to print as a QR code
    #[arg(short, long)]
    qr: Option<String>,

    /// Ask the printer to introduce itself
    #[arg(short = 'e', long)]
    introduce: bool,

    /// Path of a text file to render and print
    #[arg(long, value_name = "FILE")]
    textfile: Option<PathBuf>,
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    if let Err(e) = run(Cli::parse()) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<(), PeripageError> {
    let concentration = Concentration::try_from(cli.concentration)?;
    let mut printer = Printer::new(cli.printer);

    printer.session(&cli.mac, |printer| {
        printer.reset()?;

        if cli.action.introduce {
            let reply = printer.get_device_full()?;
            println!("{}", DeviceInfo::new(reply).text());
            return Ok(());
        }

        printer.set_concentration(concentration)?;

        if let Some(path) = &cli.action.textfile {
            let options = TextFileOptions {
                font: cli
                    .fontfile
                    .clone()
                    .map_or(FontSource::Builtin, FontSource::File),
                font_size: cli.fontsize as f32,
                line_break: cli.linebreak,
                ..Default::default()
            };
            printer.print_txt_file(path, &options)?;
        } else if cli.action.stream {
            for line in io::stdin().lock().lines() {
                printer.println_ascii(line?.trim_end())?;
            }
        } else if let Some(text) = &cli.action.text {
            let text = text.trim_end();
            if !text.is_empty() {
                printer.print_ascii(text)?;
                printer.flush_ascii()?;
            }
        } else if let Some(path) = &cli.action.image {
            let image = image::open(path)?;
            printer.print_image(&image, ResamplePolicy::Box)?;
        } else if let Some(content) = &cli.action.qr {
            printer.print_qr(content)?;
        }

        printer.print_break(cli.break_size)
    })
}
