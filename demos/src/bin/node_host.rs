//! Node firmware hosted on Linux (POSIX)
//!
//! Boots the firmware against a simulated board and flash, then runs the
//! cooperative main loop with stdin as the console UART. Each console line
//! is a command:
//!
//! - `post <prio> <text>`: defer a callable that prints `text` at priority
//!   `prio` (0 low, 1 medium, 2 high)
//! - `burst <n>`: defer `n` callables at once to show queue overflow
//! - `stats`: print task queue statistics
//! - `restart`: restart the board and boot again
//! - `quit`: leave the main loop
//!
//! Start with `--flash-configured` different from `--flash-detected` to see
//! the reformat-and-reboot path.

use std::io::{self, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::{anyhow, bail, Context, Result};
use clap::Parser;
use log::LevelFilter;
use node_boot::{BootOutcome, BootSequencer, ConsoleInput, Platform};
use node_posix::{
    install_shutdown_handler, request_shutdown, scheduler_config, shutdown_requested, spawn_reader,
    HostPlatform, MemStorage, RxBuffer, StdoutLogger,
};
use node_sched::{Scheduler, TaskHandler, TaskParam, TaskPriority};

type Callback = Box<dyn FnOnce(&App, TaskPriority) + Send>;

#[derive(Parser, Debug)]
#[command(author, version, about = "Node firmware on a simulated board")]
struct Opts {
    /// Flash size the image is configured for, in bytes
    #[arg(long, default_value_t = 4 << 20, value_name = "BYTES")]
    flash_configured: u32,

    /// Flash size present on the simulated board, in bytes
    #[arg(long, default_value_t = 4 << 20, value_name = "BYTES")]
    flash_detected: u32,

    /// Make platform bring-up fail
    #[arg(long)]
    fail_platform: bool,

    /// Log level (off, error, warn, info, debug, trace)
    #[arg(long, default_value = "info", value_name = "LEVEL")]
    log_level: String,
}

/// Application root: everything handlers can reach
struct App {
    sched: Scheduler<App, Callback>,
    console: ConsoleInput,
    rx: Arc<RxBuffer>,
    restart: AtomicBool,
}

impl App {
    fn take_restart(&self) -> bool {
        self.restart.swap(false, Ordering::SeqCst)
    }
}

impl AsRef<Scheduler<App, Callback>> for App {
    fn as_ref(&self) -> &Scheduler<App, Callback> {
        &self.sched
    }
}

/// Runtime start: the boot sequence's last word
struct StartRuntime;

impl TaskHandler<App> for StartRuntime {
    fn run(_app: &App, param: TaskParam, priority: TaskPriority) {
        log::info!("runtime started (param '{}', {})", param.raw() as u8 as char, priority);
        println!("node-host ready; commands: post <prio> <text>, burst <n>, stats, restart, quit");
        prompt();
    }
}

/// Console input: drains whatever lines the UART buffered
struct HandleInput;

impl TaskHandler<App> for HandleInput {
    fn run(app: &App, param: TaskParam, _priority: TaskPriority) {
        let mut handled = false;
        while let Some(line) = app.rx.take_line(param.as_bool()) {
            match Command::parse(&line) {
                Ok(command) => command.execute(app),
                Err(err) => println!("error: {err}"),
            }
            handled = true;
        }
        if handled {
            prompt();
        }
    }
}

#[derive(Debug, PartialEq)]
enum Command {
    Empty,
    Post { priority: u8, text: String },
    Burst(usize),
    Stats,
    Restart,
    Quit,
}

impl Command {
    fn parse(line: &str) -> Result<Self> {
        let line = line.trim();
        let (word, rest) = line.split_once(char::is_whitespace).unwrap_or((line, ""));
        let rest = rest.trim();
        match word {
            "" => Ok(Command::Empty),
            "post" => {
                let (prio, text) = rest
                    .split_once(char::is_whitespace)
                    .ok_or_else(|| anyhow!("usage: post <prio> <text>"))?;
                let priority = prio
                    .parse()
                    .with_context(|| format!("bad priority '{prio}'"))?;
                Ok(Command::Post {
                    priority,
                    text: text.trim().to_string(),
                })
            }
            "burst" => {
                let count = rest
                    .parse()
                    .with_context(|| format!("bad count '{rest}'"))?;
                Ok(Command::Burst(count))
            }
            "stats" => Ok(Command::Stats),
            "restart" => Ok(Command::Restart),
            "quit" | "exit" => Ok(Command::Quit),
            other => bail!("unknown command '{other}'"),
        }
    }

    fn execute(self, app: &App) {
        match self {
            Command::Empty => {}
            Command::Post { priority, text } => {
                let callable: Callback = Box::new(move |_app: &App, prio: TaskPriority| {
                    println!("[{prio}] {text}");
                });
                if let Err(err) = app.sched.defer_raw(priority, callable) {
                    println!("error: {err}");
                }
            }
            Command::Burst(count) => {
                let mut posted = 0;
                for n in 0..count {
                    let callable: Callback = Box::new(move |_app: &App, prio: TaskPriority| {
                        println!("[{prio}] burst #{n}");
                    });
                    match app.sched.defer(TaskPriority::Medium, callable) {
                        Ok(()) => posted += 1,
                        Err(err) => {
                            println!("error: {err} (#{n})");
                        }
                    }
                }
                println!("burst: {posted} of {count} posted");
            }
            Command::Stats => {
                let stats = app.sched.queue().stats();
                println!(
                    "queue: {}/{} queued, high water {}, {} overflows; {} callables pending",
                    stats.queued,
                    stats.capacity,
                    stats.high_water,
                    stats.overflows,
                    app.sched.callbacks().len()
                );
            }
            Command::Restart => {
                app.restart.store(true, Ordering::SeqCst);
                app.sched.stop();
            }
            Command::Quit => {
                request_shutdown();
                app.sched.stop();
            }
        }
    }
}

/// `log` errors only implement `std::error::Error` with its `std` feature,
/// so they are carried into `anyhow` by message.
fn parse_level(name: &str) -> Result<LevelFilter> {
    name.parse().map_err(|err| anyhow!("bad log level '{name}': {err}"))
}

fn prompt() {
    print!("> ");
    let _ = io::stdout().flush();
}

fn main() -> Result<()> {
    let opts = Opts::parse();

    let level = parse_level(&opts.log_level)?;
    StdoutLogger::init(level).map_err(|err| anyhow!("logger: {err}"))?;
    install_shutdown_handler().context("installing Ctrl-C handler")?;

    let sched: Scheduler<App, Callback> = Scheduler::new(scheduler_config("node-host"));
    let start = sched.register::<StartRuntime>()?;
    let input = sched.register::<HandleInput>()?;
    let app: &'static App = Box::leak(Box::new(App {
        sched,
        console: ConsoleInput::new(input),
        rx: Arc::new(RxBuffer::default()),
        restart: AtomicBool::new(false),
    }));

    let reader = spawn_reader(io::stdin(), Arc::clone(&app.rx), move |force| {
        app.console.notify(&app.sched, force)
    })
    .context("starting console reader")?;

    let mut platform = if opts.fail_platform {
        HostPlatform::failing()
    } else {
        HostPlatform::new()
    };
    let mut storage = MemStorage::new(opts.flash_configured, opts.flash_detected);
    let mut boot = BootSequencer::new(start);

    loop {
        match boot.run(&mut platform, &mut storage, &app.sched) {
            BootOutcome::Started => {}
            BootOutcome::Rebooting => continue,
            BootOutcome::Halted => bail!("platform init failed; runtime not started"),
            BootOutcome::StartDropped => bail!("runtime start task could not be queued"),
        }

        app.sched
            .run_while(app, || !shutdown_requested() && !reader.is_finished());

        // work queued before the loop stopped still runs
        let settled = app.sched.run_until_idle(app);
        if settled > 0 {
            log::debug!("{settled} task(s) settled after main loop stopped");
        }

        if app.take_restart() && !shutdown_requested() {
            platform.restart();
            continue;
        }
        break;
    }

    println!();
    log::info!(
        "exiting after {} restart(s), {} console event(s) dropped",
        platform.restarts(),
        app.console.dropped()
    );
    Ok(())
}
