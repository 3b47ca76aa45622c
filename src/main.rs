//! cros-policy-tool - install Chrome managed policy on ChromeOS.
//!
//! Without an action flag an interactive menu is shown.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, Parser};
use signal_hook::consts::SIGINT;

use cros_policy_tool::acquire::ToolFetcher;
use cros_policy_tool::commands::{self, Session};
use cros_policy_tool::config::{Config, Overrides};
use cros_policy_tool::overlay::BindMounter;
use cros_policy_tool::prompt::{AutoConfirm, Prompter, TerminalPrompter};
use cros_policy_tool::verity::MakeDevSsd;
use cros_policy_tool::{guard, logger, menu};

#[derive(Parser)]
#[command(name = "cros-policy-tool", version)]
#[command(about = "Install Chrome managed policy on ChromeOS")]
#[command(
    after_help = "QUICK START:\n  cros-policy-tool --check      See what works on this device\n  cros-policy-tool -t           Apply until next reboot\n  cros-policy-tool              Interactive menu"
)]
struct Cli {
    #[command(flatten)]
    action: ActionArgs,

    /// Download the policy again before applying it
    #[arg(short, long)]
    update: bool,

    /// Answer yes to every confirmation
    #[arg(short = 'y', long)]
    yes: bool,

    /// Show skipped entries and other detail
    #[arg(short, long)]
    verbose: bool,

    /// Policy document to install [env: POLICY_PATH]
    #[arg(long, value_name = "PATH")]
    policy: Option<PathBuf>,

    /// URL to download the policy from [env: POLICY_URL]
    #[arg(long)]
    url: Option<String>,

    /// Disk passed to the verified boot tool [env: POLICY_DEVICE]
    #[arg(long, value_name = "DEVICE")]
    device: Option<String>,

    /// Verified boot tool [env: VBOOT_TOOL]
    #[arg(long, value_name = "PATH")]
    tool: Option<PathBuf>,

    /// Where the temporary /etc copy is staged [env: OVERLAY_ROOT]
    #[arg(long, value_name = "DIR")]
    overlay: Option<PathBuf>,
}

#[derive(Args)]
#[group(multiple = false)]
struct ActionArgs {
    /// Apply the policy until the next reboot (overlay over /etc)
    #[arg(short, long)]
    temporary: bool,

    /// Write the policy into /etc (needs rootfs verification disabled)
    #[arg(short, long)]
    permanent: bool,

    /// Remove rootfs verification from partitions 2 and 4
    #[arg(short, long)]
    disable_verification: bool,

    /// Download the policy and exit
    #[arg(short, long)]
    fetch: bool,

    /// Check what works on this device
    #[arg(short, long)]
    check: bool,

    /// Print the effective configuration as JSON
    #[arg(long)]
    show_config: bool,
}

/// Print a newline on Ctrl-C so the shell prompt starts on a fresh line, then
/// die the way an unhandled SIGINT would.
fn install_interrupt_handler() -> Result<()> {
    // SAFETY: the handler only calls write(2) on fd 2 and re-raises the signal,
    // both async-signal-safe.
    unsafe {
        signal_hook::low_level::register(SIGINT, || {
            let _ = nix::unistd::write(std::io::stderr(), b"\n");
            let _ = signal_hook::low_level::emulate_default_handler(SIGINT);
        })
    }
    .context("Failed to install SIGINT handler")?;
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Load .env if present
    dotenvy::dotenv().ok();
    let config = Config::load().apply_overrides(Overrides {
        policy_path: cli.policy,
        policy_url: cli.url,
        device: cli.device,
        vboot_tool: cli.tool,
        overlay_root: cli.overlay,
        assume_yes: cli.yes,
        verbose: cli.verbose,
    });

    logger::init(config.verbose).context("Failed to set up logging")?;
    install_interrupt_handler()?;

    let action = &cli.action;
    if action.show_config {
        return commands::cmd_show_config(&config);
    }
    if action.check {
        return commands::cmd_preflight(&config);
    }

    guard::require_root()?;

    let terminal = TerminalPrompter::stdio();
    let needs_confirmation = action.permanent || action.disable_verification;
    guard::require_terminal(needs_confirmation, config.assume_yes, terminal.is_attached())?;

    let mut prompter: Box<dyn Prompter> = if config.assume_yes {
        Box::new(AutoConfirm::new(terminal))
    } else {
        Box::new(terminal)
    };
    let fetcher = ToolFetcher::detect();
    let mut session = Session::new(
        &config,
        prompter.as_mut(),
        &fetcher,
        &BindMounter,
        &MakeDevSsd,
    );

    if action.temporary {
        commands::cmd_apply_temporary(&mut session, cli.update)
    } else if action.permanent {
        commands::cmd_apply_permanent(&mut session, cli.update)
    } else if action.disable_verification {
        commands::cmd_disable_verification(&mut session)
    } else if action.fetch {
        commands::cmd_fetch(&mut session)
    } else {
        menu::run_menu(&mut session, cli.update)
    }
}
