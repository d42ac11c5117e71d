//! xs: a small shell on top of the xs input engine
//!
//! Usage:
//!   xs                      # interactive when stdin is a terminal
//!   xs script.xs args...    # run a script
//!   xs -c 'echo hi'         # run one command string
//!   xs -s args...           # read commands from stdin

use clap::Parser as ClapParser;
use std::fs::File;
use std::io::{self, IsTerminal};
use std::os::fd::{FromRawFd, OwnedFd};
use std::process;
use tracing::{debug, warn};
use xs_input::{
    Input, InputConfig, Interrupts, RunFlags, RustylineReader, Signal, Value, exit_status,
    terminal, true_value,
};

mod shell;
mod vars;

use shell::Shell;
use vars::Vars;

/// Log filter used when RUST_LOG is not set
const DEFAULT_LOG_FILTER: &str = "xs=warn,xs_input=warn";

/// Run at startup by login shells
const LOGIN_RC: &str = ".xsrc";

/// Run at startup by interactive shells
const INTERACTIVE_RC: &str = ".xsin";

#[derive(ClapParser, Debug)]
#[command(name = "xs")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "xs - a small extensible shell", long_about = None)]
struct Cli {
    /// Run COMMAND instead of reading a script or stdin
    #[arg(short = 'c', value_name = "COMMAND", conflicts_with = "stdin")]
    command: Option<String>,

    /// Read commands from stdin even when arguments are given
    #[arg(short = 's')]
    stdin: bool,

    /// Force interactive mode
    #[arg(short = 'i')]
    interactive: bool,

    /// Act as a login shell (runs ~/.xsrc)
    #[arg(short = 'l')]
    login: bool,

    /// Exit as soon as a command returns false
    #[arg(short = 'e')]
    exit_on_false: bool,

    /// Echo input as it is read
    #[arg(short = 'v')]
    echo_input: bool,

    /// Print each command before running it
    #[arg(short = 'x')]
    print_commands: bool,

    /// Parse commands without running them
    #[arg(short = 'n')]
    no_exec: bool,

    /// Skip the startup files
    #[arg(short = 'Z')]
    no_rc: bool,

    /// Script to run, followed by its arguments (or just arguments with -c/-s)
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    args: Vec<String>,
}

impl Cli {
    fn run_flags(&self) -> RunFlags {
        let mut flags = RunFlags::empty();
        flags.set(RunFlags::EXIT_ON_FALSE, self.exit_on_false);
        flags.set(RunFlags::ECHO_INPUT, self.echo_input);
        flags.set(RunFlags::PRINT_COMMANDS, self.print_commands);
        flags.set(RunFlags::NO_EXEC, self.no_exec);
        flags
    }

    /// Whether commands come from stdin rather than -c or a script
    fn reads_stdin(&self) -> bool {
        self.command.is_none() && (self.stdin || self.args.is_empty())
    }
}

fn main() {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(DEFAULT_LOG_FILTER)),
        )
        .with_writer(io::stderr)
        .init();

    let status = match run(cli) {
        Ok(value) => exit_status(&value),
        Err(Signal::Exit(status)) => status,
        Err(e) => {
            eprintln!("xs: {}", e);
            1
        }
    };
    process::exit(status);
}

fn run(cli: Cli) -> Result<Value, Signal> {
    let vars = Vars::from_env();
    let interactive = cli.interactive || (cli.reads_stdin() && io::stdin().is_terminal());
    let mut flags = cli.run_flags();
    flags.set(RunFlags::INTERACTIVE, interactive);
    debug!(?flags, "starting");

    let interrupts = Interrupts::new();
    let mut input = Input::new(InputConfig::from_env()).with_interrupts(interrupts.clone());
    if interactive {
        input = attach_editor(input, &vars, &interrupts);
        input.init_history();
    }

    // Script arguments are visible as $*; the script itself as $0.
    let script_args = if cli.reads_stdin() || cli.command.is_some() {
        cli.args.clone()
    } else {
        cli.args[1..].to_vec()
    };
    vars.set("*", script_args);
    if !cli.reads_stdin()
        && cli.command.is_none()
        && let Some(script) = cli.args.first()
    {
        vars.set("0", vec![script.clone()]);
    }

    let mut shell = Shell::new(vars);

    if !cli.no_rc {
        if cli.login {
            run_rc_file(&mut input, &mut shell, LOGIN_RC)?;
        }
        if interactive {
            run_rc_file(&mut input, &mut shell, INTERACTIVE_RC)?;
        }
    }

    if let Some(command) = &cli.command {
        return input.run_from_string(command, None, flags, &mut shell);
    }
    if !cli.reads_stdin() {
        let path = &cli.args[0];
        let file = File::open(path).map_err(|e| Signal::error("xs", format!("{}: {}", path, e)))?;
        return input.run_from_descriptor(
            OwnedFd::from(file),
            Some(path.as_str()),
            flags,
            &mut shell,
        );
    }

    // SAFETY: descriptor 0 is open for the life of the process and nothing
    // else in the shell reads from or closes it.
    let stdin = unsafe { OwnedFd::from_raw_fd(libc::STDIN_FILENO) };
    input.run_from_descriptor(stdin, None, flags, &mut shell)
}

/// Install the line editor and the signal plumbing an interactive session
/// needs. Falls back to plain descriptor reads if the editor is unavailable.
fn attach_editor(input: Input, vars: &Vars, interrupts: &Interrupts) -> Input {
    if let Err(e) = interrupts.install() {
        warn!(error = %e, "could not route SIGINT");
    }
    if let Err(e) = terminal::install_resize_handler() {
        warn!(error = %e, "could not watch for terminal resizes");
    }
    match RustylineReader::new(Box::new(vars.clone()), interrupts.clone()) {
        Ok(reader) => input.with_editor(Box::new(reader)),
        Err(e) => {
            warn!(error = %e, "line editor unavailable; reading stdin directly");
            input
        }
    }
}

/// Run `~/name` if it exists. Errors are reported and startup continues;
/// only `exit` ends the shell.
fn run_rc_file(input: &mut Input, shell: &mut Shell, name: &str) -> Result<Value, Signal> {
    let Some(path) = home::home_dir().map(|home| home.join(name)) else {
        return Ok(true_value());
    };
    let Ok(file) = File::open(&path) else {
        debug!(path = %path.display(), "no startup file");
        return Ok(true_value());
    };
    let name = path.display().to_string();
    let fd = OwnedFd::from(file);
    match input.run_from_descriptor(fd, Some(name.as_str()), RunFlags::empty(), shell) {
        Err(Signal::Exit(status)) => Err(Signal::Exit(status)),
        Err(e) => {
            eprintln!("xs: {}", e);
            Ok(true_value())
        }
        ok => ok,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("xs").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn test_flags_map_to_run_flags() {
        let cli = parse(&["-e", "-v", "-x", "-n"]);
        assert_eq!(
            cli.run_flags(),
            RunFlags::EXIT_ON_FALSE
                | RunFlags::ECHO_INPUT
                | RunFlags::PRINT_COMMANDS
                | RunFlags::NO_EXEC
        );
    }

    #[test]
    fn test_input_selection() {
        assert!(parse(&[]).reads_stdin());
        assert!(!parse(&["script.xs", "a"]).reads_stdin());
        assert!(parse(&["-s", "a", "b"]).reads_stdin());
        assert!(!parse(&["-c", "echo hi"]).reads_stdin());
    }

    #[test]
    fn test_script_arguments_keep_their_dashes() {
        let cli = parse(&["script.xs", "-x", "--flag"]);
        assert_eq!(cli.args, vec!["script.xs", "-x", "--flag"]);
        assert!(!cli.print_commands);
    }

    #[test]
    #[serial]
    fn test_rc_file_errors_do_not_stop_startup() {
        let home = tempfile::tempdir().unwrap();
        std::fs::write(home.path().join(LOGIN_RC), "rc = loaded\nno-such-command-xs\n").unwrap();
        let saved = std::env::var_os("HOME");
        unsafe {
            std::env::set_var("HOME", home.path());
        }

        let vars = Vars::new();
        let mut shell = Shell::new(vars.clone());
        let mut input = Input::new(InputConfig::new());
        let result = run_rc_file(&mut input, &mut shell, LOGIN_RC);

        unsafe {
            match saved {
                Some(h) => std::env::set_var("HOME", h),
                None => std::env::remove_var("HOME"),
            }
        }
        assert!(result.is_ok());
        assert_eq!(vars.get("rc"), Some(vec!["loaded".to_string()]));
        assert_eq!(input.depth(), 0);
    }
}
