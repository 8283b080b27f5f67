//! termshim probe - exercise the primitives against the current terminal
//!
//! Handy for checking what a terminal (or a kernel's TIOCSTI policy) allows
//! before wiring termshim into an interactive tool.

use std::io::{self, Read, Write};
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use termshim::{
    mask_interrupt_signal, wait_for_interrupt_signal, Config, InterruptWaiter, Terminal,
    WaitOutcome,
};

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const EOT: u8 = 0x04;

#[derive(Debug)]
enum Command {
    Size,
    Keys,
    WaitInterrupt(Option<Duration>),
    Inject(String),
}

fn main() -> ExitCode {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();

    let args: Vec<String> = std::env::args().collect();

    let mut config_path: Option<PathBuf> = None;
    let mut commands = Vec::new();

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--size" => commands.push(Command::Size),
            "--keys" => commands.push(Command::Keys),
            "--wait-int" => {
                let timeout = args
                    .get(i + 1)
                    .and_then(|s| s.parse::<u64>().ok())
                    .map(Duration::from_secs);
                if timeout.is_some() {
                    i += 1;
                }
                commands.push(Command::WaitInterrupt(timeout));
            },
            "--inject" => {
                i += 1;
                match args.get(i) {
                    Some(text) => commands.push(Command::Inject(text.clone())),
                    None => {
                        eprintln!("--inject needs a value");
                        return ExitCode::FAILURE;
                    },
                }
            },
            "-c" | "--config" => {
                i += 1;
                config_path = args.get(i).map(PathBuf::from);
            },
            "-h" | "--help" => {
                print_help();
                return ExitCode::SUCCESS;
            },
            other => {
                eprintln!("Unknown option: {}", other);
                return ExitCode::FAILURE;
            },
        }
        i += 1;
    }

    if commands.is_empty() {
        commands.push(Command::Size);
    }

    let config = match Config::load(config_path.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{}", e);
            return ExitCode::FAILURE;
        },
    };
    tracing::debug!(?config, "Loaded config");

    let mut terminal = Terminal::stdio_with_config(config);

    for command in commands {
        if let Err(e) = run(&mut terminal, &command) {
            tracing::error!("{:?} failed: {}", command, e);
            return ExitCode::FAILURE;
        }
    }

    ExitCode::SUCCESS
}

fn run(terminal: &mut Terminal<'static>, command: &Command) -> termshim::Result<()> {
    match command {
        Command::Size => {
            let size = terminal.size()?;
            println!("{} rows x {} cols", size.rows, size.cols);
        },
        Command::Keys => {
            let _raw = terminal.raw_mode()?;
            println!("Raw mode: press keys to see their bytes, q or Ctrl-D to stop");
            print_keys();
        },
        Command::WaitInterrupt(timeout) => {
            mask_interrupt_signal()?;
            println!("SIGINT masked, press Ctrl-C");
            match timeout {
                None => {
                    wait_for_interrupt_signal()?;
                    println!("Caught SIGINT");
                },
                Some(timeout) => {
                    let waiter = InterruptWaiter::new(terminal.config());
                    match waiter.wait(Some(*timeout))? {
                        WaitOutcome::Interrupted => println!("Caught SIGINT"),
                        WaitOutcome::TimedOut => println!("No SIGINT within {:?}", timeout),
                        WaitOutcome::Cancelled => println!("Wait cancelled"),
                    }
                },
            }
        },
        Command::Inject(text) => {
            terminal.inject_input(text)?;
            tracing::info!("Injected {} bytes", text.len());
        },
    }

    Ok(())
}

fn print_keys() {
    let mut stdin = io::stdin();
    let mut stdout = io::stdout();
    let mut buf = [0u8; 16];

    loop {
        let n = match stdin.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) => {
                tracing::error!("Read error: {}", e);
                break;
            },
        };

        let bytes = &buf[..n];
        // No OPOST changes are made, so \n still maps to \r\n
        let _ = writeln!(stdout, "{:02x?}", bytes);
        let _ = stdout.flush();

        if bytes.contains(&b'q') || bytes.contains(&EOT) {
            break;
        }
    }
}

fn print_help() {
    println!("termshim probe - exercise raw terminal primitives");
    println!();
    println!("Usage: termshim-probe [OPTIONS]");
    println!();
    println!("Options:");
    println!("  --size               Print the terminal size (default)");
    println!("  --keys               Enter raw mode and print key bytes until q");
    println!("  --wait-int [SECS]    Mask SIGINT and wait for it, optionally bounded");
    println!("  --inject <TEXT>      Push TEXT onto the terminal input queue");
    println!("  -c, --config <FILE>  JSON config file");
    println!("  -h, --help           Show this help message");
    println!();
    println!("Environment: TERMSHIM_APPLY_MODE, TERMSHIM_RESTORE_ON_DROP,");
    println!("TERMSHIM_WAIT_POLL_MS, RUST_LOG");
}
